// src/app_config.rs
use crate::grading_data::DEFAULT_OLLAMA_URL;
use crate::utils::resource_url;
use gloo_net::http::Request;
use serde::{Deserialize, Serialize};

pub const CONFIG_PATH: &str = "public/grader.json";
pub const DEFAULT_PRESETS_KEY: &str = "gradingPresets";

/// Client configuration, read from `public/grader.json` when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prefix for the backend endpoints; empty means same origin.
    #[serde(default)]
    pub api_base: String,
    #[serde(default = "default_ollama_url")]
    pub default_ollama_url: String,
    #[serde(default = "default_presets_key")]
    pub presets_key: String,
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

fn default_presets_key() -> String {
    DEFAULT_PRESETS_KEY.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            default_ollama_url: default_ollama_url(),
            presets_key: default_presets_key(),
        }
    }
}

impl AppConfig {
    pub fn endpoint(&self, path: &str) -> String {
        let clean_path = path.trim_start_matches('/');
        let base = self.api_base.trim_end_matches('/');
        if base.is_empty() {
            format!("/{}", clean_path)
        } else {
            format!("{}/{}", base, clean_path)
        }
    }

    pub fn get_models_url(&self) -> String {
        self.endpoint("get_models")
    }

    pub fn analyze_url(&self) -> String {
        self.endpoint("analyze")
    }

    pub fn download_url(&self) -> String {
        self.endpoint("download")
    }
}

/// Fetch the config file; any failure falls back to defaults.
pub async fn load_config() -> AppConfig {
    let cache_bust = js_sys::Date::now() as u64;
    let url = format!("{}?v={}", resource_url(CONFIG_PATH), cache_bust);
    match Request::get(&url).send().await {
        Ok(resp) => {
            if resp.ok() {
                match resp.json::<AppConfig>().await {
                    Ok(config) => {
                        log::info!("Loaded client config from {}", url);
                        config
                    }
                    Err(e) => {
                        log::warn!("Failed to parse {}: {:?}", url, e);
                        AppConfig::default()
                    }
                }
            } else {
                log::warn!("No client config at {}, using defaults", url);
                AppConfig::default()
            }
        }
        Err(e) => {
            log::warn!("Failed to fetch {}: {:?}", url, e);
            AppConfig::default()
        }
    }
}
