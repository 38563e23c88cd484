//! Client configuration.
//!
//! Resolution order, later wins:
//! 1. built-in defaults
//! 2. the TOML file (`--config`, or `<config dir>/chap/config.toml` when present)
//! 3. `CHAP_MODEL` / `CHAP_API_BASE`
//!
//! The API key only comes from the environment (`GEMINI_API_KEY`, then
//! `GOOGLE_API_KEY`).

use chrono_tz::Tz;
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const GEMINI_OPENAI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no API key found, set GEMINI_API_KEY or GOOGLE_API_KEY")]
    MissingApiKey,
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip)]
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    /// Falls back to `model`.
    pub vision_model: Option<String>,
    pub image_model: String,
    pub system_prompt: Option<String>,
    pub max_tool_rounds: u32,
    pub stream: bool,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub timezone: Tz,
    pub search_root: PathBuf,
    pub trash_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Split with shell quoting rules; the URL is appended as the last argument.
    pub browser_command: String,
    pub confirm_empty_trash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: GEMINI_OPENAI_BASE.to_string(),
            model: "gemini-2.5-flash".to_string(),
            vision_model: None,
            image_model: "imagen-3.0-generate-002".to_string(),
            system_prompt: None,
            max_tool_rounds: 10,
            stream: true,
            tools: ToolsConfig::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        let browser_command = if cfg!(target_os = "macos") {
            "open -a Safari"
        } else {
            "xdg-open"
        };
        Self {
            timezone: chrono_tz::America::New_York,
            search_root: PathBuf::from("~/Desktop"),
            trash_dir: PathBuf::from("~/.Trash"),
            output_dir: PathBuf::from("generated_images"),
            browser_command: browser_command.to_string(),
            confirm_empty_trash: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("image_model", &self.image_model)
            .field("system_prompt", &self.system_prompt)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("stream", &self.stream)
            .field("tools", &self.tools)
            .finish()
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_path() {
                Some(path) if path.is_file() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.expand_paths(dirs::home_dir().as_deref());
        debug!(?config, "loaded configuration");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(&self.model)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(model) = var("CHAP_MODEL") {
            self.model = model;
        }
        if let Some(api_base) = var("CHAP_API_BASE") {
            self.api_base = api_base;
        }
        self.api_key = var("GEMINI_API_KEY")
            .or_else(|| var("GOOGLE_API_KEY"))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;
        Ok(())
    }

    fn expand_paths(&mut self, home: Option<&Path>) {
        let tools = &mut self.tools;
        for path in [
            &mut tools.search_root,
            &mut tools.trash_dir,
            &mut tools.output_dir,
        ] {
            *path = expand_home(path, home);
        }
    }
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chap").join("config.toml"))
}

fn expand_home(path: &Path, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            model = "gemini-2.5-pro"
            system_prompt = "be brief"

            [tools]
            timezone = "Europe/Berlin"
            confirm_empty_trash = false
            "#,
        )
        .unwrap();
        assert_eq!(config.model, "gemini-2.5-pro");
        assert_eq!(config.vision_model(), "gemini-2.5-pro");
        assert_eq!(config.system_prompt.as_deref(), Some("be brief"));
        assert_eq!(config.max_tool_rounds, 10);
        assert!(config.stream);
        assert_eq!(config.tools.timezone, chrono_tz::Europe::Berlin);
        assert!(!config.tools.confirm_empty_trash);
        assert_eq!(config.tools.output_dir, PathBuf::from("generated_images"));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let result = toml::from_str::<Config>("[tools]\ntimezone = \"Mars/Olympus\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn file_errors_name_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        assert!(matches!(Config::from_file(&path), Err(ConfigError::Read { .. })));

        fs::write(&path, "max_tool_rounds = \"many\"").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn env_overrides_and_key_fallback() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("GOOGLE_API_KEY", "google-key"),
                ("CHAP_MODEL", "gemini-2.0-flash"),
            ]))
            .unwrap();
        assert_eq!(config.api_key, "google-key");
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.api_base, GEMINI_OPENAI_BASE);

        config
            .apply_env(env(&[("GEMINI_API_KEY", "gemini-key"), ("GOOGLE_API_KEY", "other")]))
            .unwrap();
        assert_eq!(config.api_key, "gemini-key");
    }

    #[test]
    fn missing_key_is_an_error() {
        let mut config = Config::default();
        let result = config.apply_env(env(&[("GEMINI_API_KEY", "  ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn home_prefix_is_expanded() {
        let mut config = Config::default();
        config.expand_paths(Some(Path::new("/home/sam")));
        assert_eq!(config.tools.search_root, PathBuf::from("/home/sam/Desktop"));
        assert_eq!(config.tools.trash_dir, PathBuf::from("/home/sam/.Trash"));
        assert_eq!(config.tools.output_dir, PathBuf::from("generated_images"));
    }

    #[test]
    fn debug_redacts_key() {
        let config = Config {
            api_key: "secret".to_string(),
            ..Config::default()
        };
        assert!(!format!("{config:?}").contains("secret"));
    }
}
