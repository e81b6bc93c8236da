// src/components/results_panel.rs
use crate::annotation::controller::{
    AnnotationController, ConfirmOutcome, MouseDownAction, PointerTarget,
};
use crate::annotation::dom::DomSurface;
use crate::annotation::placement::{Placement, Point, Size};
use crate::annotation::AnnotationSurface;
use crate::api::GraderApi;
use crate::app_config::AppConfig;
use crate::grading_data::AnalysisResult;
use crate::utils::{capitalize, current_viewport, save_bytes_as};
use gloo::events::EventListener;
use gloo::timers::callback::Timeout;
use gloo::utils::document;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use web_sys::{Element, HtmlElement, HtmlInputElement, HtmlTextAreaElement, Node};
use yew::prelude::*;

const REPORT_FILENAME: &str = "graded_essay.pdf";
const REPORT_MIME: &str = "application/pdf";

#[derive(Properties, PartialEq)]
pub struct ResultsPanelProps {
    pub config: AppConfig,
    pub result: Option<Rc<AnalysisResult>>,
    /// Changes whenever a new result replaces the panel contents.
    pub generation: u64,
}

pub enum ResultsMsg {
    PanelMouseUp(MouseEvent),
    DocumentMouseDown(PointerTarget),
    RecheckSelection,
    SetComment(String),
    SaveComment,
    CancelComment,
    SetGrade(String),
    EmbedComments,
    Download,
    DownloadFinished(Result<(), String>),
}

pub struct ResultsPanel {
    panel_ref: NodeRef,
    popup_ref: NodeRef,
    comment_ref: NodeRef,
    controller: Option<AnnotationController<DomSurface>>,
    // generation whose HTML is currently in the panel
    injected: Option<u64>,
    comment: String,
    focus_comment: bool,
    grade: String,
    notice: Option<String>,
    downloading: bool,
    download_error: Option<String>,
    _mousedown: Option<EventListener>,
}

impl Component for ResultsPanel {
    type Message = ResultsMsg;
    type Properties = ResultsPanelProps;

    fn create(ctx: &Context<Self>) -> Self {
        Self {
            panel_ref: NodeRef::default(),
            popup_ref: NodeRef::default(),
            comment_ref: NodeRef::default(),
            controller: None,
            injected: None,
            comment: String::new(),
            focus_comment: false,
            grade: grade_of(ctx.props()),
            notice: None,
            downloading: false,
            download_error: None,
            _mousedown: None,
        }
    }

    fn changed(&mut self, ctx: &Context<Self>, old_props: &Self::Properties) -> bool {
        if ctx.props().generation != old_props.generation {
            // The old marks and the pending range die with the old HTML.
            if let Some(controller) = self.controller.as_mut() {
                controller.dismiss();
            }
            self.comment.clear();
            self.grade = grade_of(ctx.props());
            self.notice = None;
            self.download_error = None;
        }
        true
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            ResultsMsg::PanelMouseUp(event) => {
                // Size first: placement needs the popup's real dimensions
                let Some(size) = self.measure_popup() else {
                    return false;
                };
                let Some(viewport) = current_viewport() else {
                    log::warn!("Viewport unavailable; popup not shown");
                    return false;
                };
                let Some(controller) = self.controller.as_mut() else {
                    return false;
                };
                let cursor = Point {
                    x: event.page_x() as f64,
                    y: event.page_y() as f64,
                };
                // Collapsed or outside-panel selections leave the popup closed
                if controller.on_mouse_up(cursor, size, viewport).is_none() {
                    return false;
                }
                // Fresh comment box, focused once the popup is rendered
                self.comment.clear();
                self.notice = None;
                self.focus_comment = true;
                true
            }
            ResultsMsg::DocumentMouseDown(target) => {
                let Some(controller) = self.controller.as_mut() else {
                    return false;
                };
                match controller.on_mouse_down(target) {
                    MouseDownAction::Ignore => false,
                    // Clicked away from both popup and panel
                    MouseDownAction::Dismissed => true,
                    MouseDownAction::RecheckDeferred => {
                        // The browser updates the selection after mousedown.
                        let link = ctx.link().clone();
                        Timeout::new(0, move || link.send_message(ResultsMsg::RecheckSelection))
                            .forget();
                        false
                    }
                }
            }
            // Close the popup if the click inside the panel dropped the selection
            ResultsMsg::RecheckSelection => self
                .controller
                .as_mut()
                .map(|c| c.recheck_selection())
                .unwrap_or(false),
            ResultsMsg::SetComment(text) => {
                self.comment = text;
                false
            }
            ResultsMsg::SaveComment => {
                let Some(controller) = self.controller.as_mut() else {
                    return false;
                };
                // confirm always leaves the controller idle
                match controller.confirm(&self.comment) {
                    ConfirmOutcome::Applied(mark) => {
                        log::info!("Annotation added: {}", mark.get_attribute("title").unwrap_or_default());
                    }
                    ConfirmOutcome::Discarded => {}
                    ConfirmOutcome::RejectedOverlap => {
                        self.notice = Some(
                            "That selection overlaps an existing annotation.".to_string(),
                        );
                    }
                    ConfirmOutcome::Failed(e) => {
                        self.notice = Some(format!("Could not add annotation: {}", e));
                    }
                }
                self.comment.clear();
                true
            }
            ResultsMsg::CancelComment => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.dismiss();
                }
                self.comment.clear();
                true
            }
            ResultsMsg::SetGrade(grade) => {
                self.grade = grade;
                false
            }
            ResultsMsg::EmbedComments => {
                if let Some(controller) = self.controller.as_mut() {
                    match controller.surface_mut().flatten_marks() {
                        Ok(count) => log::info!("Embedded {} teacher comments", count),
                        Err(e) => {
                            log::error!("Error embedding comments: {}", e);
                            self.notice = Some(format!("Could not embed comments: {}", e));
                            return true;
                        }
                    }
                }
                false
            }
            ResultsMsg::Download => {
                let Some(result) = ctx.props().result.clone() else {
                    return false;
                };
                let Some(controller) = self.controller.as_mut() else {
                    return false;
                };
                // Comments go into the report as inline text
                controller.dismiss();
                if let Err(e) = controller.surface_mut().flatten_marks() {
                    log::error!("Error embedding comments: {}", e);
                }
                let annotated_html = controller.surface().panel().inner_html();

                // The grade field may have been edited by hand
                let mut report = (*result).clone();
                report.grade = self.grade.clone();
                self.downloading = true;
                self.download_error = None;

                let api = GraderApi::new(ctx.props().config.clone());
                ctx.link().send_future(async move {
                    let saved = match api.download_report(&report, &annotated_html).await {
                        Ok(bytes) => save_bytes_as(&bytes, REPORT_FILENAME, REPORT_MIME),
                        Err(e) => Err(e),
                    };
                    ResultsMsg::DownloadFinished(saved)
                });
                true
            }
            ResultsMsg::DownloadFinished(res) => {
                self.downloading = false;
                match res {
                    Ok(()) => log::info!("Saved {}", REPORT_FILENAME),
                    Err(e) => {
                        log::error!("Download Error: {}", e);
                        self.download_error = Some(format!("Could not download PDF: {}", e));
                    }
                }
                true
            }
        }
    }

    fn rendered(&mut self, ctx: &Context<Self>, first_render: bool) {
        // Panel and popup exist only after the first render
        if first_render {
            self.attach(ctx);
        }

        // New result: replace the panel HTML, dropping any old marks
        let generation = ctx.props().generation;
        if self.injected != Some(generation) {
            if let Some(panel) = self.panel_ref.cast::<Element>() {
                let html = ctx
                    .props()
                    .result
                    .as_ref()
                    .map(|r| r.annotated.as_str())
                    .unwrap_or("");
                panel.set_inner_html(html);
                self.injected = Some(generation);
            }
        }

        // Popup is visible now, so focus can land
        if self.focus_comment {
            self.focus_comment = false;
            if let Some(input) = self.comment_ref.cast::<HtmlTextAreaElement>() {
                if let Err(e) = input.focus() {
                    log::warn!("Could not focus comment box: {:?}", e);
                }
            }
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        let result = ctx.props().result.as_deref();
        let visibility = if result.is_some() { "" } else { "display: none;" };

        html! {
            <div id="results" style={visibility}>
                <div class="results-summary">
                    if let Some(result) = result {
                        { self.render_summary(ctx, result) }
                    }
                </div>
                <h4>{"Annotated Essay"}</h4>
                <p class="text-muted small">
                    {"Select text in the essay to add a comment."}
                </p>
                <div
                    id="annotated"
                    class="border p-3 mb-2"
                    ref={self.panel_ref.clone()}
                    onmouseup={ctx.link().callback(ResultsMsg::PanelMouseUp)}
                ></div>
                <div class="text-warning small mb-2">
                    { self.notice.clone().unwrap_or_default() }
                </div>
                <div class="results-feedback">
                    if let Some(result) = result {
                        { self.render_feedback(result) }
                    }
                </div>
                { self.render_actions(ctx) }
                { self.render_popup(ctx) }
            </div>
        }
    }
}

impl ResultsPanel {
    /// Wire the controller to the panel and listen for mouse-downs anywhere
    /// in the document.
    fn attach(&mut self, ctx: &Context<Self>) {
        match self.panel_ref.cast::<Element>().and_then(DomSurface::new) {
            Some(surface) => self.controller = Some(AnnotationController::new(surface)),
            None => {
                log::error!("Annotation panel not mounted");
                return;
            }
        }

        // Dropped with the component, which removes the listener
        let link = ctx.link().clone();
        let popup_ref = self.popup_ref.clone();
        let panel_ref = self.panel_ref.clone();
        let listener = EventListener::new(&document(), "mousedown", move |event| {
            let target = event
                .target()
                .and_then(|t| t.dyn_into::<Node>().ok());
            let inside = |node_ref: &NodeRef| {
                node_ref
                    .get()
                    .map(|n| n.contains(target.as_ref()))
                    .unwrap_or(false)
            };
            let pointer = if inside(&popup_ref) {
                PointerTarget::Popup
            } else if inside(&panel_ref) {
                PointerTarget::Panel
            } else {
                PointerTarget::Elsewhere
            };
            link.send_message(ResultsMsg::DocumentMouseDown(pointer));
        });
        self._mousedown = Some(listener);
    }

    /// Size of the popup as it would be shown. The popup is displayed hidden
    /// for the measurement and its style put back afterwards.
    fn measure_popup(&self) -> Option<Size> {
        let popup = self.popup_ref.cast::<HtmlElement>()?;
        let previous = popup.get_attribute("style");
        if let Err(e) = popup.set_attribute(
            "style",
            "position: absolute; visibility: hidden; display: block; left: 0px; top: 0px;",
        ) {
            log::warn!("Could not show popup for measuring: {:?}", e);
        }
        let size = Size {
            width: popup.offset_width() as f64,
            height: popup.offset_height() as f64,
        };
        let restored = match previous {
            Some(style) => popup.set_attribute("style", &style),
            None => popup.remove_attribute("style"),
        };
        if let Err(e) = restored {
            log::warn!("Could not restore popup style: {:?}", e);
        }
        Some(size)
    }

    fn render_summary(&self, ctx: &Context<Self>, result: &AnalysisResult) -> Html {
        html! {
            <>
                <h4>{"Original Essay"}</h4>
                <pre id="original" class="border p-3 mb-3">{result.original.clone()}</pre>
                <div class="mb-3">
                    <label class="form-label fw-bold">{"Grade"}</label>
                    <input
                        type="text"
                        id="grade"
                        class="form-control"
                        value={self.grade.clone()}
                        oninput={ctx.link().callback(|e: InputEvent| {
                            let input: HtmlInputElement = e.target_unchecked_into();
                            ResultsMsg::SetGrade(input.value())
                        })}
                    />
                </div>
            </>
        }
    }

    fn render_feedback(&self, result: &AnalysisResult) -> Html {
        html! {
            <>
                <h5>{"Detailed Scores"}</h5>
                <ul id="scores">
                    if result.detailed_scores.is_empty() {
                        <li>{"Not provided"}</li>
                    }
                    {for result.detailed_scores.iter().map(|(criterion, score)| html! {
                        <li><strong>{format!("{}: ", capitalize(criterion))}</strong>{score.clone()}</li>
                    })}
                </ul>
                <h5>{"Strengths"}</h5>
                <p id="strengths">{result.strengths.clone()}</p>
                <h5>{"Weaknesses"}</h5>
                <p id="weaknesses">{result.weaknesses.clone()}</p>
                <h5>{"Suggestions"}</h5>
                <p id="suggestions">{result.suggestions.clone()}</p>
            </>
        }
    }

    fn render_actions(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="mb-3">
                <button
                    type="button"
                    class="btn btn-outline-secondary me-2"
                    onclick={ctx.link().callback(|_| ResultsMsg::EmbedComments)}
                >
                    {"Embed Teacher Comments Inline"}
                </button>
                <button
                    type="button"
                    id="download-btn"
                    class="btn btn-success"
                    disabled={self.downloading}
                    onclick={ctx.link().callback(|_| ResultsMsg::Download)}
                >
                    { if self.downloading { "Preparing PDF..." } else { "Download PDF" } }
                </button>
                <div id="download-error" class="text-danger mt-2">
                    { self.download_error.clone().unwrap_or_default() }
                </div>
            </div>
        }
    }

    fn render_popup(&self, ctx: &Context<Self>) -> Html {
        let placement = self.controller.as_ref().and_then(|c| c.placement());

        html! {
            <div id="annotate-menu" class="card p-2 shadow" ref={self.popup_ref.clone()} style={popup_style(placement)}>
                <textarea
                    id="comment-input"
                    class="form-control mb-2"
                    rows="2"
                    placeholder="Add a comment..."
                    ref={self.comment_ref.clone()}
                    value={self.comment.clone()}
                    oninput={ctx.link().callback(|e: InputEvent| {
                        let area: HtmlTextAreaElement = e.target_unchecked_into();
                        ResultsMsg::SetComment(area.value())
                    })}
                    onkeydown={ctx.link().batch_callback(|e: KeyboardEvent| {
                        (e.key() == "Escape").then_some(ResultsMsg::CancelComment)
                    })}
                />
                <div class="d-flex gap-2">
                    <button
                        type="button"
                        class="btn btn-primary btn-sm"
                        onclick={ctx.link().callback(|_| ResultsMsg::SaveComment)}
                    >
                        {"Save"}
                    </button>
                    <button
                        type="button"
                        class="btn btn-secondary btn-sm"
                        onclick={ctx.link().callback(|_| ResultsMsg::CancelComment)}
                    >
                        {"Cancel"}
                    </button>
                </div>
            </div>
        }
    }
}

fn grade_of(props: &ResultsPanelProps) -> String {
    props
        .result
        .as_ref()
        .map(|r| r.grade.clone())
        .unwrap_or_default()
}

fn popup_style(placement: Option<Placement>) -> String {
    match placement {
        Some(p) => format!(
            "position: absolute; z-index: 1000; display: block; {}",
            p.to_style()
        ),
        None => "position: absolute; z-index: 1000; display: none;".to_string(),
    }
}
