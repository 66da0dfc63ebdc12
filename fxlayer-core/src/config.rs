//! Pipeline configuration (TOML) and secrets (environment).
//!
//! Configuration is loaded once at startup and passed explicitly; nothing
//! below reads global state after [`PipelineConfig::load`] returns.

use crate::data::store::ArtifactStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "fxlayer.toml";

pub const PROVIDER_KEY_VAR: &str = "EXCHANGERATE_API_KEY";
pub const TEXTGEN_KEY_VAR: &str = "OPENAI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(String),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("missing secret: set {0} in the environment or .env")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory of the artifact store.
    pub data_root: PathBuf,
    /// Currency the provider is asked to quote against.
    pub fetch_base: String,
    /// Currency gold values are expressed in.
    pub pivot: String,
    pub provider_url: String,
    pub textgen_url: String,
    pub textgen_model: String,
    /// Default selection for `view` / `view-silver`.
    pub view_currencies: Vec<String>,
    /// Currencies quoted to the text generator.
    pub summary_currencies: Vec<String>,
    /// Default `--top` for `compare`.
    pub compare_top: usize,
    /// Upper bound on stored summary paragraphs.
    pub max_paragraphs: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            fetch_base: "USD".into(),
            pivot: "BRL".into(),
            provider_url: "https://v6.exchangerate-api.com/v6".into(),
            textgen_url: "https://api.openai.com/v1/chat/completions".into(),
            textgen_model: "gpt-4o-mini".into(),
            view_currencies: codes(&["USD", "EUR", "BRL", "GBP", "JPY"]),
            summary_currencies: codes(&["USD", "EUR", "GBP", "JPY", "ARS"]),
            compare_top: 10,
            max_paragraphs: 3,
        }
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

impl PipelineConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate. Currency codes are uppercased.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let mut config: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.canonicalize();
        config.validate()?;
        Ok(config)
    }

    /// Load `.env`, then the explicit config file, else `fxlayer.toml` when
    /// present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::from_file(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn canonicalize(&mut self) {
        self.fetch_base = self.fetch_base.trim().to_uppercase();
        self.pivot = self.pivot.trim().to_uppercase();
        for list in [&mut self.view_currencies, &mut self.summary_currencies] {
            for code in list.iter_mut() {
                *code = code.trim().to_uppercase();
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_code("fetch_base", &self.fetch_base)?;
        check_code("pivot", &self.pivot)?;
        for code in &self.view_currencies {
            check_code("view_currencies", code)?;
        }
        for code in &self.summary_currencies {
            check_code("summary_currencies", code)?;
        }
        if self.compare_top == 0 {
            return Err(ConfigError::Invalid {
                field: "compare_top",
                reason: "must be at least 1".into(),
            });
        }
        if self.max_paragraphs == 0 {
            return Err(ConfigError::Invalid {
                field: "max_paragraphs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.data_root, &self.pivot)
    }
}

fn check_code(field: &'static str, code: &str) -> Result<(), ConfigError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("'{code}' is not a 3-letter currency code"),
        })
    }
}

/// API keys read from the environment.
#[derive(Clone, Default)]
pub struct Credentials {
    provider_key: Option<String>,
    textgen_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("provider_key", &self.provider_key.as_ref().map(|_| "***"))
            .field("textgen_key", &self.textgen_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            provider_key: non_empty_var(PROVIDER_KEY_VAR),
            textgen_key: non_empty_var(TEXTGEN_KEY_VAR),
        }
    }

    pub fn new(provider_key: Option<String>, textgen_key: Option<String>) -> Self {
        Self {
            provider_key,
            textgen_key,
        }
    }

    pub fn require_provider_key(&self) -> Result<&str, ConfigError> {
        self.provider_key
            .as_deref()
            .ok_or(ConfigError::MissingSecret(PROVIDER_KEY_VAR))
    }

    pub fn require_textgen_key(&self) -> Result<&str, ConfigError> {
        self.textgen_key
            .as_deref()
            .ok_or(ConfigError::MissingSecret(TEXTGEN_KEY_VAR))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
