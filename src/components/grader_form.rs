// src/components/grader_form.rs
use crate::api::{preferred_model, validate_submission, AnalysisRequest, GraderApi};
use crate::app_config::AppConfig;
use crate::components::preset_manager::PresetManager;
use crate::grading_data::*;
use crate::utils::capitalize;
use web_sys::{File, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};
use yew::prelude::*;

/// What the form reports up to the app.
pub enum FormEvent {
    Submit(AnalysisRequest, Option<File>),
    Invalid(String),
}

#[derive(Properties, PartialEq)]
pub struct GraderFormProps {
    pub config: AppConfig,
    pub busy: bool,
    pub on_event: Callback<FormEvent>,
}

pub enum FormMsg {
    SetUrl(String),
    FetchModels,
    ModelsLoaded(Result<Vec<String>, String>),
    SelectModel(String),
    SetTone(String),
    SetStrictness(String),
    SetGradeLevel(String),
    SelectRubric(String),
    ToggleCriterion(Criterion, bool),
    SetWeight(Criterion, u32),
    SetInstructions(String),
    SetEssayText(String),
    FileChosen(Option<File>),
    ApplySettings(GradingSettings),
    Submit,
}

#[derive(Clone, PartialEq)]
enum ModelsStatus {
    NotFetched,
    Fetching,
    Loaded,
    Failed(String),
}

pub struct GraderForm {
    settings: GradingSettings,
    models: Vec<String>,
    models_status: ModelsStatus,
    essay_text: String,
    file: Option<File>,
}

impl Component for GraderForm {
    type Message = FormMsg;
    type Properties = GraderFormProps;

    fn create(ctx: &Context<Self>) -> Self {
        let settings = GradingSettings {
            ollama_url: ctx.props().config.default_ollama_url.clone(),
            ..GradingSettings::default()
        };
        Self {
            settings,
            models: Vec::new(),
            models_status: ModelsStatus::NotFetched,
            essay_text: String::new(),
            file: None,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            FormMsg::SetUrl(url) => {
                self.settings.ollama_url = url;
                false
            }
            FormMsg::FetchModels => {
                let url = self.settings.ollama_url.trim().to_string();
                if url.is_empty() {
                    self.models_status =
                        ModelsStatus::Failed("Please enter the Ollama server URL.".to_string());
                    return true;
                }
                // Select stays disabled until the list arrives
                self.models_status = ModelsStatus::Fetching;
                let api = GraderApi::new(ctx.props().config.clone());
                ctx.link().send_future(async move {
                    FormMsg::ModelsLoaded(api.fetch_models(&url).await)
                });
                true
            }
            FormMsg::ModelsLoaded(res) => {
                match res {
                    Ok(models) => {
                        // Pre-select a known good model
                        if let Some(model) = preferred_model(&models) {
                            self.settings.ollama_model = model;
                        }
                        self.models = models;
                        self.models_status = ModelsStatus::Loaded;
                    }
                    Err(e) => {
                        log::error!("Error fetching models: {}", e);
                        self.models.clear();
                        self.models_status = ModelsStatus::Failed(format!("Error: {}", e));
                    }
                }
                true
            }
            FormMsg::SelectModel(model) => {
                self.settings.ollama_model = model;
                true
            }
            FormMsg::SetTone(tone) => {
                self.settings.tone = tone;
                true
            }
            FormMsg::SetStrictness(strictness) => {
                self.settings.strictness = strictness;
                true
            }
            FormMsg::SetGradeLevel(level) => {
                self.settings.grade_level = level;
                true
            }
            // Rubric replaces criteria and weights wholesale
            FormMsg::SelectRubric(name) => {
                self.settings.apply_rubric(&name);
                true
            }
            FormMsg::ToggleCriterion(criterion, checked) => {
                self.settings.set_checked(criterion, checked);
                true
            }
            FormMsg::SetWeight(criterion, value) => {
                self.settings.set_weight(criterion, value);
                true
            }
            // Free-text inputs keep their own DOM value; no re-render
            FormMsg::SetInstructions(text) => {
                self.settings.instructions = text;
                false
            }
            FormMsg::SetEssayText(text) => {
                self.essay_text = text;
                false
            }
            FormMsg::FileChosen(file) => {
                self.file = file;
                false
            }
            FormMsg::ApplySettings(settings) => {
                self.settings = settings;
                true
            }
            // Validation errors go up to the app's error region
            FormMsg::Submit => {
                let event = match validate_submission(
                    &self.settings.ollama_model,
                    self.file.is_some(),
                    &self.essay_text,
                ) {
                    Ok(essay) => FormEvent::Submit(
                        AnalysisRequest {
                            settings: self.settings.clone(),
                            essay,
                        },
                        self.file.clone(),
                    ),
                    Err(message) => FormEvent::Invalid(message),
                };
                ctx.props().on_event.emit(event);
                false
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let onsubmit = ctx.link().callback(|e: SubmitEvent| {
            e.prevent_default();
            FormMsg::Submit
        });

        html! {
            <form id="upload-form" class="mb-3" {onsubmit}>
                { self.render_server_card(ctx) }
                <PresetManager
                    settings={self.settings.clone()}
                    presets_key={ctx.props().config.presets_key.clone()}
                    on_apply={ctx.link().callback(FormMsg::ApplySettings)}
                />
                { self.render_essay_inputs(ctx) }
                { self.render_style_selects(ctx) }
                { self.render_criteria(ctx) }
                { self.render_weights(ctx) }
                <div class="mb-3">
                    <label class="form-label">{"Instructions"}</label>
                    <textarea
                        name="instructions"
                        rows="4"
                        class="form-control"
                        placeholder="e.g., Focus on argument strength and tone"
                        value={self.settings.instructions.clone()}
                        oninput={ctx.link().callback(|e: InputEvent| {
                            let area: HtmlTextAreaElement = e.target_unchecked_into();
                            FormMsg::SetInstructions(area.value())
                        })}
                    />
                </div>
                <button type="submit" class="btn btn-primary w-100 mb-2" disabled={ctx.props().busy}>
                    {"Analyze"}
                </button>
            </form>
        }
    }
}

impl GraderForm {
    fn render_server_card(&self, ctx: &Context<Self>) -> Html {
        let fetching = self.models_status == ModelsStatus::Fetching;
        let on_fetch = ctx.link().callback(|_: MouseEvent| FormMsg::FetchModels);

        let placeholder = match &self.models_status {
            ModelsStatus::NotFetched => Some("-- Enter URL & Fetch --"),
            ModelsStatus::Fetching => Some("Fetching..."),
            ModelsStatus::Failed(_) => Some("Error fetching"),
            ModelsStatus::Loaded if self.models.is_empty() => Some("No models found"),
            ModelsStatus::Loaded => None,
        };
        // A model restored from a preset may not be in the fetched list yet.
        let restored = (!self.settings.ollama_model.is_empty()
            && !self.models.contains(&self.settings.ollama_model))
        .then(|| self.settings.ollama_model.clone());
        let disabled = fetching || (self.models.is_empty() && restored.is_none());

        html! {
            <div class="card mb-3 p-2">
                <label class="form-label fw-bold">{"Ollama Server"}</label>
                <div class="input-group mb-2">
                    <span class="input-group-text">{"URL"}</span>
                    <input
                        type="text"
                        id="ollama-url"
                        class="form-control"
                        placeholder="e.g., http://192.168.1.100:11434"
                        value={self.settings.ollama_url.clone()}
                        oninput={ctx.link().callback(|e: InputEvent| {
                            let input: HtmlInputElement = e.target_unchecked_into();
                            FormMsg::SetUrl(input.value())
                        })}
                    />
                </div>
                <div class="input-group mb-2">
                    <span class="input-group-text">{"Model"}</span>
                    <select
                        id="ollama-model"
                        class="form-select"
                        disabled={disabled}
                        onchange={ctx.link().callback(|e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            FormMsg::SelectModel(select.value())
                        })}
                    >
                        if let Some(text) = placeholder {
                            <option value="">{text}</option>
                        }
                        if let Some(model) = restored {
                            <option value={model.clone()} selected={true}>{model}</option>
                        }
                        {for self.models.iter().map(|model| html! {
                            <option
                                value={model.clone()}
                                selected={&self.settings.ollama_model == model}
                            >
                                {model.clone()}
                            </option>
                        })}
                    </select>
                </div>
                <button
                    type="button"
                    id="fetch-models-btn"
                    class="btn btn-secondary btn-sm w-100"
                    disabled={fetching}
                    onclick={on_fetch}
                >
                    {"Fetch Models"}
                </button>
                <div id="model-fetch-error" class="text-danger mt-1 small">
                    if let ModelsStatus::Failed(e) = &self.models_status {
                        {e.clone()}
                    }
                </div>
            </div>
        }
    }

    fn render_essay_inputs(&self, ctx: &Context<Self>) -> Html {
        html! {
            <>
                <div class="mb-3">
                    <label class="form-label">{"Upload Essay"}</label>
                    <input
                        type="file"
                        name="file"
                        class="form-control"
                        accept=".txt"
                        onchange={ctx.link().callback(|e: Event| {
                            let input: HtmlInputElement = e.target_unchecked_into();
                            FormMsg::FileChosen(input.files().and_then(|files| files.get(0)))
                        })}
                    />
                </div>
                <div class="mb-3">
                    <label class="form-label">{"Or paste essay text"}</label>
                    <textarea
                        name="text_input"
                        rows="6"
                        class="form-control"
                        oninput={ctx.link().callback(|e: InputEvent| {
                            let area: HtmlTextAreaElement = e.target_unchecked_into();
                            FormMsg::SetEssayText(area.value())
                        })}
                    />
                </div>
            </>
        }
    }

    fn render_style_selects(&self, ctx: &Context<Self>) -> Html {
        let s = &self.settings;
        html! {
            <>
                <div class="mb-3">
                    <label class="form-label">{"AI Tone"}</label>
                    <select id="tone" class="form-select"
                        onchange={ctx.link().callback(|e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            FormMsg::SetTone(select.value())
                        })}
                    >
                        {for TONES.iter().map(|t| option(t, &capitalize(t), s.tone == *t))}
                    </select>
                </div>
                <div class="mb-3">
                    <label class="form-label">{"Strictness Level"}</label>
                    <select id="strictness" class="form-select"
                        onchange={ctx.link().callback(|e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            FormMsg::SetStrictness(select.value())
                        })}
                    >
                        {for STRICTNESS_LEVELS.iter().map(|l| option(l, &capitalize(l), s.strictness == *l))}
                    </select>
                </div>
                <div class="mb-3">
                    <label class="form-label">{"Rubric Preset"}</label>
                    <select id="preset" class="form-select"
                        onchange={ctx.link().callback(|e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            FormMsg::SelectRubric(select.value())
                        })}
                    >
                        { option("", "-- Select preset --", s.rubric_preset.is_empty()) }
                        {for RUBRIC_PRESETS.iter().map(|p| option(p.name, p.name, s.rubric_preset == p.name))}
                    </select>
                </div>
                <div class="mb-3">
                    <label class="form-label">{"Grade Level"}</label>
                    <select id="grade_level" class="form-select"
                        onchange={ctx.link().callback(|e: Event| {
                            let select: HtmlSelectElement = e.target_unchecked_into();
                            FormMsg::SetGradeLevel(select.value())
                        })}
                    >
                        {for GRADE_LEVELS.iter().map(|g| option(g, g, s.grade_level == *g))}
                    </select>
                </div>
            </>
        }
    }

    fn render_criteria(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="card mb-3 p-2">
                <label class="form-label">{"Focus criteria"}</label>
                {for Criterion::ALL.iter().map(|c| {
                    let criterion = *c;
                    html! {
                        <div class="form-check">
                            <input
                                class="form-check-input"
                                type="checkbox"
                                name="criteria"
                                value={criterion.key()}
                                checked={self.settings.is_checked(criterion)}
                                onchange={ctx.link().callback(move |e: Event| {
                                    let input: HtmlInputElement = e.target_unchecked_into();
                                    FormMsg::ToggleCriterion(criterion, input.checked())
                                })}
                            />
                            <label class="form-check-label">{criterion.label()}</label>
                        </div>
                    }
                })}
            </div>
        }
    }

    fn render_weights(&self, ctx: &Context<Self>) -> Html {
        let total = self.settings.weight_total();
        let total_style = if self.settings.weights_balanced() {
            "color: inherit; font-weight: normal;"
        } else {
            "color: red; font-weight: bold;"
        };

        html! {
            <div class="card mb-3 p-2">
                <label class="form-label">
                    {"Rubric Weights (Total "}
                    <span id="weight-total" style={total_style}>{total.to_string()}</span>
                    {"%)"}
                </label>
                <div id="weights-container">
                    {for Criterion::ALL.iter().map(|c| {
                        let criterion = *c;
                        let display = if self.settings.is_checked(criterion) { "display: block;" } else { "display: none;" };
                        html! {
                            <div class="weight-input" data-criteria={criterion.key()} style={display}>
                                {format!("{}: ", criterion.label())}
                                <input
                                    type="number"
                                    name={criterion.weight_field()}
                                    min="0"
                                    max="100"
                                    class="form-control"
                                    value={self.settings.weight(criterion).to_string()}
                                    oninput={ctx.link().callback(move |e: InputEvent| {
                                        let input: HtmlInputElement = e.target_unchecked_into();
                                        FormMsg::SetWeight(criterion, input.value().trim().parse().unwrap_or(0))
                                    })}
                                />
                            </div>
                        }
                    })}
                </div>
            </div>
        }
    }
}

fn option(value: &str, label: &str, selected: bool) -> Html {
    html! {
        <option value={value.to_string()} {selected}>{label.to_string()}</option>
    }
}
