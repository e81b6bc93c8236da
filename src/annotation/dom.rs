// src/annotation/dom.rs
use super::{
    embed_text, AnnotationError, AnnotationSurface, MarkSpec, SelectionSnapshot, EMBED_CLASS,
    FLATTENED_ATTR, MARK_CLASS,
};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, DocumentFragment, Element, Range, Selection};

/// Annotation surface backed by the live results panel.
pub struct DomSurface {
    panel: Element,
    document: Document,
}

impl DomSurface {
    pub fn new(panel: Element) -> Option<Self> {
        let document = panel.owner_document()?;
        Some(Self { panel, document })
    }

    pub fn panel(&self) -> &Element {
        &self.panel
    }

    fn selection() -> Option<Selection> {
        web_sys::window()?.get_selection().ok().flatten()
    }

    fn marks(&self) -> Vec<Element> {
        let list = match self.panel.query_selector_all(&format!(".{}", MARK_CLASS)) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Could not query annotation marks: {:?}", e);
                return Vec::new();
            }
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }
}

fn js_err(context: &str, e: JsValue) -> AnnotationError {
    AnnotationError::Mutation(format!("{}: {:?}", context, e))
}

impl AnnotationSurface for DomSurface {
    type Range = Range;
    type Position = Range;
    type Fragment = DocumentFragment;
    type Node = Element;

    fn current_selection(&self) -> Option<SelectionSnapshot<Range>> {
        let selection = Self::selection()?;
        if selection.range_count() == 0 {
            return None;
        }
        let range = selection.get_range_at(0).ok()?.clone_range();
        let inside_panel = self.panel.contains(selection.anchor_node().as_ref())
            && self.panel.contains(selection.focus_node().as_ref());
        Some(SelectionSnapshot {
            range,
            collapsed: selection.is_collapsed(),
            inside_panel,
        })
    }

    fn remove_and_capture(
        &mut self,
        range: &Range,
    ) -> Result<(DocumentFragment, Range), AnnotationError> {
        let fragment = range
            .extract_contents()
            .map_err(|e| AnnotationError::InvalidRange(format!("{:?}", e)))?;
        // After extraction the range is collapsed where the content was.
        Ok((fragment, range.clone()))
    }

    fn insert_fragment_wrapped(
        &mut self,
        at: Range,
        fragment: DocumentFragment,
        mark: &MarkSpec,
    ) -> Result<Element, AnnotationError> {
        let span = self
            .document
            .create_element(&mark.tag)
            .map_err(|e| js_err("create mark", e))?;
        span.set_class_name(&mark.class);
        span.set_attribute("title", &mark.comment)
            .map_err(|e| js_err("set title", e))?;
        span.set_attribute("style", "cursor: help;")
            .map_err(|e| js_err("set style", e))?;
        span.append_child(&fragment)
            .map_err(|e| js_err("append fragment", e))?;
        at.insert_node(&span)
            .map_err(|e| js_err("insert mark", e))?;
        Ok(span)
    }

    fn overlaps_mark(&self, range: &Range) -> bool {
        self.marks()
            .iter()
            .any(|mark| range.intersects_node(mark).unwrap_or(false))
    }

    fn clear_selection(&mut self) {
        if let Some(selection) = Self::selection() {
            if let Err(e) = selection.remove_all_ranges() {
                log::warn!("Could not clear selection: {:?}", e);
            }
        }
    }

    fn flatten_marks(&mut self) -> Result<usize, AnnotationError> {
        let mut count = 0;
        for mark in self.marks() {
            if mark.has_attribute(FLATTENED_ATTR) {
                continue;
            }
            let comment = match mark.get_attribute("title") {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            let Some(parent) = mark.parent_node() else {
                continue;
            };
            let inline = self
                .document
                .create_element("mark")
                .map_err(|e| js_err("create note", e))?;
            inline.set_class_name(EMBED_CLASS);
            inline.set_text_content(Some(&embed_text(&comment)));
            parent
                .insert_before(&inline, mark.next_sibling().as_ref())
                .map_err(|e| js_err("insert note", e))?;
            mark.set_attribute(FLATTENED_ATTR, "true")
                .map_err(|e| js_err("flag mark", e))?;
            count += 1;
        }
        Ok(count)
    }
}
