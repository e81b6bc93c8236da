// src/grading_data.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Criterion {
    Grammar,
    Vocabulary,
    Coherence,
    Spelling,
    Structure,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Grammar,
        Criterion::Vocabulary,
        Criterion::Coherence,
        Criterion::Spelling,
        Criterion::Structure,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Criterion::Grammar => "grammar",
            Criterion::Vocabulary => "vocabulary",
            Criterion::Coherence => "coherence",
            Criterion::Spelling => "spelling",
            Criterion::Structure => "structure",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Criterion::Grammar => "Grammar",
            Criterion::Vocabulary => "Vocabulary",
            Criterion::Coherence => "Coherence",
            Criterion::Spelling => "Spelling",
            Criterion::Structure => "Structure",
        }
    }

    pub fn from_key(key: &str) -> Option<Criterion> {
        Criterion::ALL.into_iter().find(|c| c.key() == key)
    }

    /// Form field carrying this criterion's weight.
    pub fn weight_field(&self) -> String {
        format!("weight_{}", self.key())
    }
}

/// Built-in rubric templates offered in the rubric dropdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RubricPreset {
    pub name: &'static str,
    pub weights: &'static [(Criterion, u32)],
}

pub static RUBRIC_PRESETS: [RubricPreset; 3] = [
    RubricPreset {
        name: "AP",
        weights: &[
            (Criterion::Grammar, 25),
            (Criterion::Vocabulary, 25),
            (Criterion::Coherence, 25),
            (Criterion::Structure, 25),
        ],
    },
    RubricPreset {
        name: "IELTS",
        weights: &[
            (Criterion::Grammar, 30),
            (Criterion::Vocabulary, 25),
            (Criterion::Coherence, 25),
            (Criterion::Spelling, 20),
        ],
    },
    RubricPreset {
        name: "TOEFL",
        weights: &[
            (Criterion::Grammar, 35),
            (Criterion::Vocabulary, 30),
            (Criterion::Coherence, 35),
        ],
    },
];

impl RubricPreset {
    pub fn find(name: &str) -> Option<&'static RubricPreset> {
        RUBRIC_PRESETS.iter().find(|p| p.name == name)
    }
}

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const TONES: [&str; 4] = ["formal", "encouraging", "detailed", "concise"];
pub const STRICTNESS_LEVELS: [&str; 3] = ["lenient", "balanced", "strict"];
pub const GRADE_LEVELS: [&str; 8] = [
    "Elementary",
    "Middle School",
    "9th Grade",
    "10th Grade",
    "11th Grade",
    "12th Grade",
    "College Freshman",
    "College Sophomore",
];

/// Everything the grading form lets the user configure. Serialized field
/// names follow the stored preset format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingSettings {
    #[serde(default)]
    pub ollama_url: String,
    #[serde(default)]
    pub ollama_model: String,
    #[serde(default = "default_tone")]
    pub tone: String,
    #[serde(default = "default_strictness")]
    pub strictness: String,
    #[serde(default)]
    pub rubric_preset: String,
    #[serde(default)]
    pub grade_level: String,
    #[serde(default, deserialize_with = "known_criteria")]
    pub criteria: Vec<Criterion>,
    #[serde(rename = "weight_grammar", default, deserialize_with = "lenient_weight")]
    pub weight_grammar: u32,
    #[serde(rename = "weight_vocabulary", default, deserialize_with = "lenient_weight")]
    pub weight_vocabulary: u32,
    #[serde(rename = "weight_coherence", default, deserialize_with = "lenient_weight")]
    pub weight_coherence: u32,
    #[serde(rename = "weight_spelling", default, deserialize_with = "lenient_weight")]
    pub weight_spelling: u32,
    #[serde(rename = "weight_structure", default, deserialize_with = "lenient_weight")]
    pub weight_structure: u32,
    #[serde(default)]
    pub instructions: String,
}

fn default_tone() -> String {
    "formal".to_string()
}

fn default_strictness() -> String {
    "balanced".to_string()
}

/// Older presets stored weights as the raw input strings.
fn lenient_weight<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Weight {
        Num(u32),
        Text(String),
        Null(()),
    }
    Ok(match Weight::deserialize(deserializer)? {
        Weight::Num(n) => n,
        Weight::Text(s) => s.trim().parse().unwrap_or(0),
        Weight::Null(()) => 0,
    })
}

/// Criteria this build doesn't know are dropped instead of failing the
/// whole preset.
fn known_criteria<'de, D>(deserializer: D) -> Result<Vec<Criterion>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    let mut criteria = Vec::new();
    for item in items {
        match item.as_str().and_then(Criterion::from_key) {
            Some(c) if !criteria.contains(&c) => criteria.push(c),
            Some(_) => {}
            None => log::warn!("Ignoring unknown criterion {}", item),
        }
    }
    Ok(criteria)
}

impl Default for GradingSettings {
    fn default() -> Self {
        Self {
            ollama_url: DEFAULT_OLLAMA_URL.to_string(),
            ollama_model: String::new(),
            tone: default_tone(),
            strictness: default_strictness(),
            rubric_preset: String::new(),
            grade_level: GRADE_LEVELS[0].to_string(),
            criteria: vec![
                Criterion::Grammar,
                Criterion::Vocabulary,
                Criterion::Coherence,
                Criterion::Spelling,
            ],
            weight_grammar: 25,
            weight_vocabulary: 25,
            weight_coherence: 25,
            weight_spelling: 25,
            weight_structure: 0,
            instructions: String::new(),
        }
    }
}

impl GradingSettings {
    pub fn weight(&self, criterion: Criterion) -> u32 {
        match criterion {
            Criterion::Grammar => self.weight_grammar,
            Criterion::Vocabulary => self.weight_vocabulary,
            Criterion::Coherence => self.weight_coherence,
            Criterion::Spelling => self.weight_spelling,
            Criterion::Structure => self.weight_structure,
        }
    }

    pub fn set_weight(&mut self, criterion: Criterion, value: u32) {
        match criterion {
            Criterion::Grammar => self.weight_grammar = value,
            Criterion::Vocabulary => self.weight_vocabulary = value,
            Criterion::Coherence => self.weight_coherence = value,
            Criterion::Spelling => self.weight_spelling = value,
            Criterion::Structure => self.weight_structure = value,
        }
    }

    pub fn is_checked(&self, criterion: Criterion) -> bool {
        self.criteria.contains(&criterion)
    }

    pub fn set_checked(&mut self, criterion: Criterion, checked: bool) {
        self.criteria.retain(|c| *c != criterion);
        if checked {
            self.criteria.push(criterion);
            self.criteria.sort();
        }
    }

    /// Sum of the weights of checked criteria; hidden weights don't count.
    pub fn weight_total(&self) -> u32 {
        self.criteria.iter().map(|c| self.weight(*c)).sum()
    }

    pub fn weights_balanced(&self) -> bool {
        self.weight_total() == 100
    }

    /// Apply a built-in rubric: check exactly its criteria, take its weights
    /// and zero the rest. An unknown or empty name clears everything.
    pub fn apply_rubric(&mut self, name: &str) {
        self.rubric_preset = name.to_string();
        self.criteria.clear();
        for c in Criterion::ALL {
            self.set_weight(c, 0);
        }
        match RubricPreset::find(name) {
            Some(preset) => {
                for (criterion, weight) in preset.weights {
                    self.set_checked(*criterion, true);
                    self.set_weight(*criterion, *weight);
                }
            }
            None => {
                if !name.is_empty() {
                    log::warn!("Unknown rubric preset: {}", name);
                }
            }
        }
    }

    /// Criteria as the backend expects them, e.g. "grammar, vocabulary".
    pub fn criteria_field(&self) -> String {
        self.criteria
            .iter()
            .map(|c| c.key())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// What the analyze endpoint returns. Null or blank fields fall back to the
/// same placeholders as missing ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub original: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub annotated: String,
    #[serde(default = "not_available", deserialize_with = "text_or_not_available")]
    pub grade: String,
    #[serde(default, deserialize_with = "lenient_scores")]
    pub detailed_scores: BTreeMap<String, String>,
    #[serde(default = "not_provided", deserialize_with = "text_or_not_provided")]
    pub strengths: String,
    #[serde(default = "not_provided", deserialize_with = "text_or_not_provided")]
    pub weaknesses: String,
    #[serde(default = "not_provided", deserialize_with = "text_or_not_provided")]
    pub suggestions: String,
    #[serde(default)]
    pub error: Option<String>,
}

fn not_available() -> String {
    "N/A".to_string()
}

fn not_provided() -> String {
    "Not provided".to_string()
}

/// A JSON scalar as display text; `None` for null, blank strings and
/// anything that isn't a scalar.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn text_or_not_available<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(not_available))
}

fn text_or_not_provided<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_else(not_provided))
}

/// Scores may come back as numbers, strings or null.
fn lenient_scores<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(map) = Value::deserialize(deserializer)? else {
        return Ok(BTreeMap::new());
    };
    Ok(map
        .into_iter()
        .filter_map(|(criterion, score)| scalar_text(score).map(|s| (criterion, s)))
        .collect())
}
