use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::viewer::ShowMode;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "no Gemini API key: set GEMINI_API_KEY or GOOGLE_API_KEY, or configure backend.gemini.api_key_cmd"
    )]
    MissingApiKey,
    #[error("api_key_cmd failed: {0}")]
    KeyCommand(#[from] std::io::Error),
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub output: OutputConfig,
    pub glyph: GlyphConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub gemini: GeminiConfig,
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeminiConfig {
    /// Command to run to get API key (e.g., "pass show google/gemini").
    /// The command is run via `sh -c`.
    pub api_key_cmd: Option<String>,
    /// Model to use.
    pub model: String,
    /// API root override. Defaults to the public v1beta endpoint.
    pub base_url: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_cmd: None,
            model: gf_backend::gemini::DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }
}

const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

impl GeminiConfig {
    /// Resolve the API key from api_key_cmd, then GEMINI_API_KEY, then GOOGLE_API_KEY.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<String, ConfigError> {
        if let Some(cmd) = &self.api_key_cmd {
            let output = Command::new("sh").arg("-c").arg(cmd).output()?;

            if output.status.success() {
                let key = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !key.is_empty() {
                    return Ok(key);
                }
            }
            tracing::warn!("api_key_cmd produced no key, falling back to environment");
        }

        API_KEY_VARS
            .iter()
            .filter_map(|name| env(*name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for generated images. Defaults to the current directory.
    pub dir: Option<String>,
    pub filename_prefix: String,
    pub show: ShowMode,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            filename_prefix: "glyphforge".to_string(),
            show: ShowMode::Auto,
        }
    }
}

impl OutputConfig {
    pub fn resolve_dir(&self) -> PathBuf {
        self.dir
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct GlyphConfig {
    pub default_preset: String,
    /// Directory searched for `<name>.toml` recipes before the built-ins.
    pub recipes_dir: Option<String>,
}

impl Default for GlyphConfig {
    fn default() -> Self {
        Self {
            default_preset: "monster".to_string(),
            recipes_dir: None,
        }
    }
}

impl GlyphConfig {
    /// Resolve the recipes directory, using the configured path or the XDG default.
    pub fn resolve_recipes_dir(&self) -> PathBuf {
        if let Some(ref custom) = self.recipes_dir {
            return expand_home(custom);
        }
        config_base().join("glyphforge").join("recipes")
    }
}

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when neither GLYPHFORGE_LOG nor -v is given.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or the default location when `None`.
    ///
    /// A missing file yields defaults. A malformed one is reported and also
    /// yields defaults, so a typo never blocks `stack`.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(config_path);
        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("warning: failed to parse {}: {e}", path.display());
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(path),
    }
}

fn config_base() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        })
}

pub fn config_path() -> PathBuf {
    config_base().join("glyphforge").join("config.toml")
}
