// src/components/preset_manager.rs
use crate::grading_data::GradingSettings;
use crate::presets::{Feedback, FeedbackTone, PresetStore};
use web_sys::{HtmlInputElement, HtmlSelectElement};
use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct PresetManagerProps {
    /// Current form values; saved as-is under the entered name.
    pub settings: GradingSettings,
    pub presets_key: String,
    pub on_apply: Callback<GradingSettings>,
}

#[function_component(PresetManager)]
pub fn preset_manager(props: &PresetManagerProps) -> Html {
    let name = use_state(String::new);
    let selected = use_state(String::new);
    let feedback = use_state(|| None::<Feedback>);

    // Bumped after every write so the dropdown re-reads storage
    let revision = use_state(|| 0u32);
    let names = use_memo((props.presets_key.clone(), *revision), |(key, _)| {
        PresetStore::local(key).names()
    });

    let on_name_input = {
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            name.set(input.value());
        })
    };

    let on_save = {
        let name = name.clone();
        let feedback = feedback.clone();
        let revision = revision.clone();
        let selected = selected.clone();
        let key = props.presets_key.clone();
        let settings = props.settings.clone();
        Callback::from(move |_: MouseEvent| {
            let mut store = PresetStore::local(&key);
            let fb = store.save(&name, &settings);
            log::info!("{}", fb.message);
            if fb.tone != FeedbackTone::Danger {
                selected.set(name.trim().to_string());
                name.set(String::new());
                revision.set(*revision + 1);
            }
            feedback.set(Some(fb));
        })
    };

    let on_load = {
        let feedback = feedback.clone();
        let selected = selected.clone();
        let key = props.presets_key.clone();
        let on_apply = props.on_apply.clone();
        Callback::from(move |e: Event| {
            let select: HtmlSelectElement = e.target_unchecked_into();
            let preset = select.value();
            selected.set(preset.clone());
            if preset.is_empty() {
                return;
            }
            match PresetStore::local(&key).apply(&preset) {
                Ok((settings, fb)) => {
                    on_apply.emit(settings);
                    feedback.set(Some(fb));
                }
                Err(fb) => {
                    log::warn!("{}", fb.message);
                    feedback.set(Some(fb));
                }
            }
        })
    };

    let on_delete = {
        let feedback = feedback.clone();
        let selected = selected.clone();
        let revision = revision.clone();
        let key = props.presets_key.clone();
        Callback::from(move |_: MouseEvent| {
            let mut store = PresetStore::local(&key);
            let fb = store.delete(&selected);
            if fb.tone != FeedbackTone::Danger {
                selected.set(String::new());
                revision.set(*revision + 1);
            }
            feedback.set(Some(fb));
        })
    };

    html! {
        <div class="card mb-3 p-2">
            <label class="form-label fw-bold">{"Grading Presets"}</label>
            <div class="input-group mb-2">
                <input
                    type="text"
                    id="preset-name"
                    class="form-control"
                    placeholder="Preset Name"
                    value={(*name).clone()}
                    oninput={on_name_input}
                />
                <button type="button" id="save-preset-btn" class="btn btn-outline-success" onclick={on_save}>
                    {"Save"}
                </button>
            </div>
            <div class="input-group">
                <select id="load-preset-select" class="form-select" onchange={on_load}>
                    <option value="" selected={selected.is_empty()}>{"-- Load Preset --"}</option>
                    {for names.iter().map(|n| html! {
                        <option value={n.clone()} selected={*selected == *n}>{n.clone()}</option>
                    })}
                </select>
                <button type="button" id="delete-preset-btn" class="btn btn-outline-danger" onclick={on_delete}>
                    {"Delete"}
                </button>
            </div>
            <div id="preset-feedback" class={feedback.as_ref().map(|f| f.tone.css_class()).unwrap_or("mt-1")}>
                { feedback.as_ref().map(|f| f.message.clone()).unwrap_or_default() }
            </div>
        </div>
    }
}
