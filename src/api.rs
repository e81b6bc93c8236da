// src/api.rs
//
// Requests to the grading backend. Every call is a single multipart POST;
// failures come back as display-ready strings.

use crate::app_config::AppConfig;
use crate::grading_data::{AnalysisResult, Criterion, GradingSettings};
use gloo_net::http::{Request, Response};
use serde::Deserialize;
use serde_json::Value;
use web_sys::{File, FormData};

/// Model name fragments preferred when pre-selecting a model.
const PREFERRED_MODELS: [&str; 3] = ["llama3", "mistral", "phi3"];

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    models: Vec<String>,
}

/// Which model the dropdown should start on: the last preferred match, or
/// the first model when none match.
pub fn preferred_model(models: &[String]) -> Option<String> {
    models
        .iter()
        .rev()
        .find(|m| PREFERRED_MODELS.iter().any(|p| m.contains(p)))
        .or_else(|| models.first())
        .cloned()
}

/// Best human-readable reason out of an error response body.
pub fn error_detail(status: u16, body: Option<&Value>) -> String {
    body.and_then(|b| b.get("detail").or_else(|| b.get("error")))
        .filter(|v| !v.is_null())
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| format!("HTTP error {}", status))
}

/// Where the essay comes from. The file handle itself stays with the form.
#[derive(Debug, Clone, PartialEq)]
pub enum EssayInput {
    File,
    Text(String),
}

/// Check the form before anything is sent.
pub fn validate_submission(model: &str, has_file: bool, text: &str) -> Result<EssayInput, String> {
    if model.is_empty() {
        return Err("Please fetch models and select one.".to_string());
    }
    let text = text.trim();
    match (has_file, text.is_empty()) {
        (false, true) => Err("Please upload an essay file OR paste text directly.".to_string()),
        (true, false) => Err("Please provide either a file OR pasted text, not both.".to_string()),
        (true, true) => Ok(EssayInput::File),
        (false, false) => Ok(EssayInput::Text(text.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub settings: GradingSettings,
    pub essay: EssayInput,
}

impl AnalysisRequest {
    /// Text fields of the analyze form, in the order they are appended.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let s = &self.settings;
        let mut fields = vec![
            ("ollama_url".to_string(), s.ollama_url.clone()),
            ("ollama_model".to_string(), s.ollama_model.clone()),
            ("tone".to_string(), s.tone.clone()),
            ("strictness".to_string(), s.strictness.clone()),
            ("grade_level".to_string(), s.grade_level.clone()),
            ("preset".to_string(), s.rubric_preset.clone()),
            ("criteria".to_string(), s.criteria_field()),
        ];
        for c in Criterion::ALL {
            fields.push((c.weight_field(), s.weight(c).to_string()));
        }
        fields.push(("instructions".to_string(), s.instructions.clone()));
        if let EssayInput::Text(text) = &self.essay {
            fields.push(("text_input".to_string(), text.clone()));
        }
        fields
    }
}

/// Fields of the PDF report request.
pub fn report_fields(result: &AnalysisResult, annotated_html: &str) -> Vec<(String, String)> {
    let scores = serde_json::to_string(&result.detailed_scores).unwrap_or_else(|_| "{}".to_string());
    vec![
        ("original_essay".to_string(), result.original.clone()),
        ("annotated_html".to_string(), annotated_html.to_string()),
        ("grade".to_string(), result.grade.clone()),
        ("detailed_scores".to_string(), scores),
        ("strengths".to_string(), result.strengths.clone()),
        ("weaknesses".to_string(), result.weaknesses.clone()),
        ("suggestions".to_string(), result.suggestions.clone()),
    ]
}

fn form_data(fields: &[(String, String)]) -> Result<FormData, String> {
    let form = FormData::new().map_err(|e| format!("Failed to build form: {:?}", e))?;
    for (name, value) in fields {
        form.append_with_str(name, value)
            .map_err(|e| format!("Failed to add {}: {:?}", name, e))?;
    }
    Ok(form)
}

async fn post_form(url: &str, form: FormData) -> Result<Response, String> {
    Request::post(url)
        .body(form)
        .map_err(|e| format!("Failed to build request: {:?}", e))?
        .send()
        .await
        .map_err(|e| format!("Request to {} failed: {:?}", url, e))
}

async fn failure_detail(resp: Response) -> String {
    let status = resp.status();
    let body = resp.json::<Value>().await.ok();
    error_detail(status, body.as_ref())
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraderApi {
    config: AppConfig,
}

impl GraderApi {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn fetch_models(&self, ollama_url: &str) -> Result<Vec<String>, String> {
        let form = form_data(&[("ollama_url".to_string(), ollama_url.to_string())])?;
        let resp = post_form(&self.config.get_models_url(), form).await?;
        if !resp.ok() {
            let detail = failure_detail(resp).await;
            log::error!("Error response from model listing: {}", detail);
            return Err(detail);
        }
        let body = resp
            .json::<ModelsResponse>()
            .await
            .map_err(|e| format!("Invalid model list: {:?}", e))?;
        log::info!("Fetched {} models from {}", body.models.len(), ollama_url);
        Ok(body.models)
    }

    pub async fn analyze(
        &self,
        request: &AnalysisRequest,
        file: Option<&File>,
    ) -> Result<AnalysisResult, String> {
        let form = form_data(&request.form_fields())?;
        if let (EssayInput::File, Some(file)) = (&request.essay, file) {
            form.append_with_blob_and_filename("file", file, &file.name())
                .map_err(|e| format!("Failed to attach file: {:?}", e))?;
        }

        let resp = post_form(&self.config.analyze_url(), form).await?;
        if !resp.ok() {
            return Err(format!("Analysis failed: {}", failure_detail(resp).await));
        }
        let result = resp
            .json::<AnalysisResult>()
            .await
            .map_err(|e| format!("Invalid analysis response: {:?}", e))?;
        if let Some(error) = result.error.clone().filter(|e| !e.is_empty()) {
            return Err(error);
        }
        log::info!("Analysis complete. Grade: {}", result.grade);
        Ok(result)
    }

    /// Request the PDF report and return its bytes.
    pub async fn download_report(
        &self,
        result: &AnalysisResult,
        annotated_html: &str,
    ) -> Result<Vec<u8>, String> {
        let form = form_data(&report_fields(result, annotated_html))?;
        let resp = post_form(&self.config.download_url(), form).await?;
        if !resp.ok() {
            return Err(format!("Download failed: {}", failure_detail(resp).await));
        }
        resp.binary()
            .await
            .map_err(|e| format!("Failed to read report: {:?}", e))
    }
}
