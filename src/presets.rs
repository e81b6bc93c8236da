// src/presets.rs
use crate::grading_data::{GradingSettings, DEFAULT_OLLAMA_URL};
use gloo::storage::errors::StorageError;
use gloo::storage::{LocalStorage, Storage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const PRESET_BOOK_VERSION: u32 = 1;

/// Named form configurations, stored wholesale under one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetBook {
    pub version: u32,
    pub presets: BTreeMap<String, GradingSettings>,
    /// Stored entries that don't parse; written back untouched.
    #[serde(skip)]
    pub unreadable: BTreeMap<String, Value>,
}

impl Default for PresetBook {
    fn default() -> Self {
        Self {
            version: PRESET_BOOK_VERSION,
            presets: BTreeMap::new(),
            unreadable: BTreeMap::new(),
        }
    }
}

impl PresetBook {
    /// Read either the versioned record or a legacy bare `name -> settings`
    /// map. Entries that don't parse are set aside with a warning.
    pub fn from_value(value: Value) -> Result<PresetBook, String> {
        let Value::Object(mut map) = value else {
            return Err("preset record is not an object".to_string());
        };

        let versioned = matches!(map.get("version"), Some(Value::Number(_)))
            && matches!(map.get("presets"), Some(Value::Object(_)));
        let entries = if versioned {
            match map.remove("presets") {
                Some(Value::Object(entries)) => entries,
                _ => serde_json::Map::new(),
            }
        } else {
            log::info!("Upgrading unversioned preset record");
            map
        };

        let mut presets = BTreeMap::new();
        let mut unreadable = BTreeMap::new();
        for (name, raw) in entries {
            match serde_json::from_value::<GradingSettings>(raw.clone()) {
                Ok(settings) => {
                    presets.insert(name, settings);
                }
                Err(e) => {
                    log::warn!("Keeping unreadable preset {} as-is: {}", name, e);
                    unreadable.insert(name, raw);
                }
            }
        }
        Ok(PresetBook {
            version: PRESET_BOOK_VERSION,
            presets,
            unreadable,
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.presets.keys().cloned().collect()
    }

    /// Storage form: the parsed presets plus any unreadable entries that a
    /// newer preset of the same name hasn't replaced.
    pub fn to_value(&self) -> Result<Value, String> {
        let mut value = serde_json::to_value(self)
            .map_err(|e| format!("Failed to serialize presets: {}", e))?;
        if let Some(Value::Object(presets)) = value.get_mut("presets") {
            for (name, raw) in &self.unreadable {
                presets.entry(name.clone()).or_insert_with(|| raw.clone());
            }
        }
        Ok(value)
    }
}

/// Where the preset record lives.
pub trait PresetBackend {
    fn load(&self) -> Result<Option<Value>, String>;
    fn store(&mut self, value: &Value) -> Result<(), String>;
}

/// Browser local storage.
pub struct LocalStorageBackend {
    key: String,
}

impl LocalStorageBackend {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
        }
    }
}

impl PresetBackend for LocalStorageBackend {
    fn load(&self) -> Result<Option<Value>, String> {
        match LocalStorage::get::<Value>(&self.key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(format!("Failed to read presets: {}", e)),
        }
    }

    fn store(&mut self, value: &Value) -> Result<(), String> {
        LocalStorage::set(&self.key, value).map_err(|e| format!("Failed to save presets: {}", e))
    }
}

/// Keeps the record in memory for the tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryBackend {
    pub value: Option<Value>,
}

#[cfg(test)]
impl PresetBackend for MemoryBackend {
    fn load(&self) -> Result<Option<Value>, String> {
        Ok(self.value.clone())
    }

    fn store(&mut self, value: &Value) -> Result<(), String> {
        self.value = Some(value.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackTone {
    Success,
    Info,
    Danger,
}

impl FeedbackTone {
    pub fn css_class(&self) -> &'static str {
        match self {
            FeedbackTone::Success => "text-success mt-1",
            FeedbackTone::Info => "text-info mt-1",
            FeedbackTone::Danger => "text-danger mt-1",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub message: String,
    pub tone: FeedbackTone,
}

impl Feedback {
    fn new(tone: FeedbackTone, message: String) -> Self {
        Self { message, tone }
    }
}

pub struct PresetStore<B: PresetBackend> {
    backend: B,
}

impl PresetStore<LocalStorageBackend> {
    pub fn local(key: &str) -> Self {
        Self::new(LocalStorageBackend::new(key))
    }
}

impl<B: PresetBackend> PresetStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The current record. Corrupt data reads as empty so the page keeps
    /// working; it is overwritten by the next save.
    pub fn book(&self) -> PresetBook {
        match self.backend.load() {
            Ok(Some(value)) => PresetBook::from_value(value).unwrap_or_else(|e| {
                log::warn!("Ignoring stored presets: {}", e);
                PresetBook::default()
            }),
            Ok(None) => PresetBook::default(),
            Err(e) => {
                log::warn!("{}", e);
                PresetBook::default()
            }
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.book().names()
    }

    pub fn save(&mut self, name: &str, settings: &GradingSettings) -> Feedback {
        let name = name.trim();
        if name.is_empty() {
            return Feedback::new(FeedbackTone::Danger, "Please enter a preset name.".to_string());
        }
        let mut book = self.book();
        book.unreadable.remove(name);
        book.presets.insert(name.to_string(), settings.clone());
        match self.write(&book) {
            Ok(()) => Feedback::new(FeedbackTone::Success, format!("Preset \"{}\" saved!", name)),
            Err(e) => Feedback::new(FeedbackTone::Danger, e),
        }
    }

    /// Resolve a saved preset into full form settings: its rubric is applied
    /// first, then the saved fields override it.
    pub fn apply(&self, name: &str) -> Result<(GradingSettings, Feedback), Feedback> {
        let book = self.book();
        let saved = book.presets.get(name).ok_or_else(|| {
            Feedback::new(FeedbackTone::Danger, format!("Preset \"{}\" not found.", name))
        })?;

        let mut settings = GradingSettings::default();
        settings.apply_rubric(&saved.rubric_preset);
        settings.ollama_url = if saved.ollama_url.trim().is_empty() {
            DEFAULT_OLLAMA_URL.to_string()
        } else {
            saved.ollama_url.clone()
        };
        settings.ollama_model = saved.ollama_model.clone();
        if !saved.tone.is_empty() {
            settings.tone = saved.tone.clone();
        }
        if !saved.strictness.is_empty() {
            settings.strictness = saved.strictness.clone();
        }
        settings.grade_level = saved.grade_level.clone();
        settings.criteria = saved.criteria.clone();
        settings.criteria.sort();
        settings.criteria.dedup();
        settings.weight_grammar = saved.weight_grammar;
        settings.weight_vocabulary = saved.weight_vocabulary;
        settings.weight_coherence = saved.weight_coherence;
        settings.weight_spelling = saved.weight_spelling;
        settings.weight_structure = saved.weight_structure;
        settings.instructions = saved.instructions.clone();

        Ok((
            settings,
            Feedback::new(FeedbackTone::Info, format!("Preset \"{}\" applied.", name)),
        ))
    }

    pub fn delete(&mut self, name: &str) -> Feedback {
        if name.is_empty() {
            return Feedback::new(
                FeedbackTone::Danger,
                "Please select a preset to delete.".to_string(),
            );
        }
        let mut book = self.book();
        let removed = book.presets.remove(name).is_some();
        if !removed && book.unreadable.remove(name).is_none() {
            return Feedback::new(FeedbackTone::Danger, format!("Preset \"{}\" not found.", name));
        }
        match self.write(&book) {
            Ok(()) => Feedback::new(FeedbackTone::Success, format!("Preset \"{}\" deleted.", name)),
            Err(e) => Feedback::new(FeedbackTone::Danger, e),
        }
    }

    fn write(&mut self, book: &PresetBook) -> Result<(), String> {
        let value = book.to_value()?;
        self.backend.store(&value)
    }
}
