// Configuration management

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;
use crate::models::{FileConfig, GenerationConfig, ModelOptions, ThemeConfig, DEFAULT_URL};

const APP_DIR: &str = "quick-commit";
const HEADER_PREFIX: &str = "QC_HEADER_";
const OPTION_PREFIX: &str = "QC_OPTION_";

/// Everything read at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub generation: GenerationConfig,
    pub theme: ThemeConfig,
    /// Non-fatal problems to show the user before the UI takes over the terminal
    pub warnings: Vec<String>,
}

pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR))
}

pub fn get_env_path(config_dir: &Path) -> PathBuf {
    config_dir.join("quick-commit.env")
}

pub fn get_config_path(config_dir: &Path) -> PathBuf {
    config_dir.join("config.toml")
}

pub fn get_log_path(config_dir: &Path) -> PathBuf {
    config_dir.join("quick-commit.log")
}

/// Read `config.toml`, falling back to defaults when the file does not exist.
pub fn load_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;

    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Load the env file and `config.toml` from the user config directory, then
/// build the configuration from the process environment.
pub fn load() -> Result<Config, ConfigError> {
    let mut warnings = Vec::new();
    let mut file = FileConfig::default();

    match get_config_dir() {
        Some(dir) => {
            let env_path = get_env_path(&dir);
            if dotenvy::from_path(&env_path).is_err() {
                warnings.push(format!("warning: could not load {}", env_path.display()));
            }
            file = load_file_config(&get_config_path(&dir))?;
        }
        None => warnings.push("warning: could not get config dir".to_string()),
    }

    let mut config = Config::from_vars(std::env::vars(), file)?;
    warnings.append(&mut config.warnings);
    config.warnings = warnings;
    Ok(config)
}

impl Config {
    /// Build the configuration from `QC_*` variables and the parsed config file.
    pub fn from_vars<I>(vars: I, file: FileConfig) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut warnings = Vec::new();
        let mut url = None;
        let mut model = None;
        let mut headers = BTreeMap::new();
        let mut options = ModelOptions::default();

        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(HEADER_PREFIX) {
                headers.insert(name.to_string(), value);
                continue;
            }

            if let Some(name) = key.strip_prefix(OPTION_PREFIX) {
                let name = name.to_lowercase();
                if name == "temperature" {
                    let temperature = value
                        .trim()
                        .parse::<f32>()
                        .map_err(|_| ConfigError::InvalidTemperature(value.clone()))?;
                    options.temperature = Some(temperature);
                } else {
                    options.extra.insert(name, parse_option_value(&value));
                }
                continue;
            }

            match key.as_str() {
                "QC_URL" if !value.is_empty() => url = Some(value),
                "QC_MODEL" if !value.is_empty() => model = Some(value),
                _ => {}
            }
        }

        let url = url.unwrap_or_else(|| {
            warnings.push(format!("warning: 'QC_URL' not set, defaulting to {DEFAULT_URL}"));
            DEFAULT_URL.to_string()
        });
        let endpoint = Url::parse(&url).map_err(|err| ConfigError::InvalidUrl {
            url: url.clone(),
            reason: err.to_string(),
        })?;

        let model = model.ok_or(ConfigError::MissingModel)?;

        let keywords = if file.keywords.is_empty() {
            FileConfig::default().keywords
        } else {
            file.keywords
        };

        Ok(Self {
            generation: GenerationConfig {
                endpoint,
                model,
                headers,
                options,
                keywords,
                timeout: Duration::from_secs(file.timeout_secs),
            },
            theme: file.theme,
            warnings,
        })
    }
}

/// Numbers and booleans keep their JSON type, anything else stays a string.
fn parse_option_value(value: &str) -> serde_json::Value {
    match serde_json::from_str::<serde_json::Value>(value) {
        Ok(parsed @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => parsed,
        _ => serde_json::Value::String(value.to_string()),
    }
}
