// src/utils.rs
use crate::annotation::placement::Viewport;
use gloo::file::{Blob, ObjectUrl};
use gloo::utils::document;
use wasm_bindgen::JsCast;
use web_sys::{window, HtmlAnchorElement};

/// Get the base path the page is served under, e.g. `/grader` when the
/// app lives at `https://host/grader/`.
pub fn get_base_url() -> String {
    if let Some(window) = window() {
        if let Ok(pathname) = window.location().pathname() {
            return base_from_pathname(&pathname);
        }
    }
    String::new()
}

fn base_from_pathname(pathname: &str) -> String {
    match pathname.trim_end_matches("index.html").rfind('/') {
        Some(idx) if idx > 0 => pathname[..idx].to_string(),
        _ => String::new(),
    }
}

/// Build a resource URL with the correct base path
pub fn resource_url(path: &str) -> String {
    join_base(&get_base_url(), path)
}

fn join_base(base: &str, path: &str) -> String {
    let clean_path = path.trim_start_matches('/');

    if base.is_empty() {
        format!("/{}", clean_path)
    } else {
        format!("{}/{}", base, clean_path)
    }
}

/// Scroll offset and inner size of the window.
pub fn current_viewport() -> Option<Viewport> {
    let window = window()?;
    Some(Viewport {
        scroll_x: window.scroll_x().ok()?,
        scroll_y: window.scroll_y().ok()?,
        width: window.inner_width().ok()?.as_f64()?,
        height: window.inner_height().ok()?.as_f64()?,
    })
}

pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Hand `bytes` to the browser as a file download.
pub fn save_bytes_as(bytes: &[u8], filename: &str, mime: &str) -> Result<(), String> {
    let blob = Blob::new_with_options(bytes, Some(mime));
    let url = ObjectUrl::from(blob);

    let anchor = document()
        .create_element("a")
        .map_err(|e| format!("Failed to create link: {:?}", e))?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(|_| "Created element is not a link".to_string())?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    let body = document().body().ok_or("Document has no body")?;
    body.append_child(&anchor)
        .map_err(|e| format!("Failed to attach link: {:?}", e))?;
    anchor.click();
    anchor.remove();
    Ok(())
}
