// src/main.rs
mod annotation;
mod api;
mod app_config;
mod components;
mod grading_data;
mod presets;
mod utils;

use api::GraderApi;
use app_config::AppConfig;
use components::grader_form::{FormEvent, GraderForm};
use components::results_panel::ResultsPanel;
use grading_data::AnalysisResult;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

pub enum AppMsg {
    ConfigLoaded(AppConfig),
    Form(FormEvent),
    AnalysisFinished(Result<AnalysisResult, String>),
}

pub struct App {
    config: Option<AppConfig>,
    analyzing: bool,
    analyze_error: Option<String>,
    result: Option<Rc<AnalysisResult>>,
    // bumped whenever the results panel must be re-rendered from scratch
    result_generation: u64,
}

impl Component for App {
    type Message = AppMsg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let link = ctx.link().clone();
        spawn_local(async move {
            let config = app_config::load_config().await;
            link.send_message(AppMsg::ConfigLoaded(config));
        });

        Self {
            config: None,
            analyzing: false,
            analyze_error: None,
            result: None,
            result_generation: 0,
        }
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            AppMsg::ConfigLoaded(config) => {
                self.config = Some(config);
                true
            }
            AppMsg::Form(FormEvent::Invalid(message)) => {
                self.analyze_error = Some(message);
                true
            }
            AppMsg::Form(FormEvent::Submit(request, file)) => {
                let Some(config) = self.config.clone() else {
                    return false;
                };
                self.analyzing = true;
                self.analyze_error = None;
                self.result = None;
                self.result_generation += 1;

                let api = GraderApi::new(config);
                ctx.link().send_future(async move {
                    let result = api.analyze(&request, file.as_ref()).await;
                    AppMsg::AnalysisFinished(result)
                });
                true
            }
            AppMsg::AnalysisFinished(res) => {
                self.analyzing = false;
                match res {
                    Ok(result) => {
                        self.result = Some(Rc::new(result));
                        self.result_generation += 1;
                    }
                    Err(e) => {
                        log::error!("Analysis Error: {}", e);
                        self.analyze_error = Some(format!("Error: {}", e));
                    }
                }
                true
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let Some(config) = self.config.clone() else {
            return html! {
                <div class="container app-container">
                    <header class="app-header">
                        <h1>{"English Paper Grader"}</h1>
                    </header>
                    <main class="app-main">
                        <div class="loading">{"Loading..."}</div>
                    </main>
                </div>
            };
        };

        let on_form = ctx.link().callback(AppMsg::Form);

        html! {
            <div class="container app-container">
                <header class="app-header">
                    <h1>{"English Paper Grader"}</h1>
                </header>

                <main class="app-main">
                    <GraderForm
                        config={config.clone()}
                        busy={self.analyzing}
                        on_event={on_form}
                    />

                    <div class="analyze-status">
                        if self.analyzing {
                            <span id="spinner" class="spinner-border spinner-border-sm" role="status"></span>
                        }
                        <div id="analyze-error" class="text-danger mt-2">
                            { self.analyze_error.clone().unwrap_or_default() }
                        </div>
                    </div>

                    <ResultsPanel
                        config={config}
                        result={self.result.clone()}
                        generation={self.result_generation}
                    />
                </main>
            </div>
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
