use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Conventional commit types offered in the picker, in tie-break order.
pub const DEFAULT_KEYWORDS: [&str; 10] = [
    "fix", "feat", "build", "chore", "ci", "docs", "style", "refactor", "perf", "test",
];

pub const DEFAULT_URL: &str = "http://localhost:11434";

const fn default_timeout() -> u64 {
    300
}

/// Sampling parameters forwarded to the model.
///
/// `temperature` is the only option with a known type; everything else is
/// passed through to the server untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ModelOptions {
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.extra.is_empty()
    }
}

/// Immutable per-run inputs for generation, built once at startup.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub endpoint: Url,
    pub model: String,
    pub headers: BTreeMap<String, String>,
    pub options: ModelOptions,
    /// Every known commit type, used as the fallback set during extraction
    pub keywords: Vec<String>,
    pub timeout: Duration,
}

/// Contents of the optional `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FileConfig {
    pub keywords: Vec<String>,
    pub timeout_secs: u64,
    pub theme: ThemeConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(ToString::to_string).collect(),
            timeout_secs: default_timeout(),
            theme: ThemeConfig::default(),
        }
    }
}

/// Colour names as written in `config.toml`; see `ui::Theme` for the parsed form.
#[allow(clippy::struct_field_names)]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeConfig {
    pub text_color: String,
    pub subtext_color: String,
    pub alt_text_color: String,
    pub accent_color: String,
    pub button_color: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            text_color: "#cdd6f4".to_string(),
            subtext_color: "#a6adc8".to_string(),
            alt_text_color: "#bac2de".to_string(),
            accent_color: "#89dceb".to_string(),
            button_color: "#313244".to_string(),
        }
    }
}
