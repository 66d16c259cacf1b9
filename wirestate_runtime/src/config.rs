//! Engine configuration.
//!
//! Loaded from TOML (every field optional), then overridden from the
//! environment. The checksum secret is required before an engine can be
//! built; everything else has a working default.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_APP_KEY: &str = "WIRESTATE_APP_KEY";
pub const ENV_RENDER_ON_REDIRECT: &str = "WIRESTATE_RENDER_ON_REDIRECT";
pub const ENV_INJECT_ASSETS: &str = "WIRESTATE_INJECT_ASSETS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no app key configured (set `app_key` or WIRESTATE_APP_KEY)")]
    MissingAppKey,
    #[error("{name} must be a boolean flag, got {value:?}")]
    InvalidFlag { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigateConfig {
    pub show_progress_bar: bool,
    pub progress_bar_color: String,
}

impl Default for NavigateConfig {
    fn default() -> Self {
        Self {
            show_progress_bar: true,
            progress_bar_color: "#2299dd".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WireConfig {
    /// Prefix of every component's default view path.
    pub view_prefix: String,
    /// Default layout for full-page components.
    pub layout: String,
    /// Splice pooled page-level assets into full HTML responses.
    pub inject_assets: bool,
    /// Keep rendering after a redirect instead of skipping the render.
    pub render_on_redirect: bool,
    pub locale: String,
    pub update_uri: String,
    pub asset_version: String,
    /// Checksum secret. Never serialized back out.
    #[serde(skip_serializing)]
    pub app_key: Option<String>,
    pub navigate: NavigateConfig,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            view_prefix: "wirestate".to_string(),
            layout: "components.layouts.main".to_string(),
            inject_assets: true,
            render_on_redirect: false,
            locale: "en".to_string(),
            update_uri: "/wirestate/update".to_string(),
            asset_version: "0.1.0".to_string(),
            app_key: None,
            navigate: NavigateConfig::default(),
        }
    }
}

impl WireConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn with_app_key(mut self, key: impl Into<String>) -> Self {
        self.app_key = Some(key.into());
        self
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_APP_KEY).filter(|k| !k.is_empty()) {
            self.app_key = Some(key);
        }
        if let Some(raw) = lookup(ENV_RENDER_ON_REDIRECT) {
            self.render_on_redirect = parse_flag(ENV_RENDER_ON_REDIRECT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_INJECT_ASSETS) {
            self.inject_assets = parse_flag(ENV_INJECT_ASSETS, &raw)?;
        }
        Ok(())
    }

    pub fn app_key(&self) -> Result<&str, ConfigError> {
        self.app_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingAppKey)
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = WireConfig::from_toml_str("").unwrap();
        assert_eq!(config, WireConfig::default());
        assert_eq!(config.navigate.progress_bar_color, "#2299dd");
        assert!(matches!(config.app_key(), Err(ConfigError::MissingAppKey)));
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let raw = r#"
            layout = "layouts.app"
            render_on_redirect = true
            app_key = "s3cret"

            [navigate]
            show_progress_bar = false
        "#;
        let config = WireConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.layout, "layouts.app");
        assert!(config.render_on_redirect);
        assert!(!config.navigate.show_progress_bar);
        assert_eq!(config.navigate.progress_bar_color, "#2299dd");
        assert_eq!(config.app_key().unwrap(), "s3cret");
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            (ENV_APP_KEY, "from-env"),
            (ENV_INJECT_ASSETS, "off"),
            (ENV_RENDER_ON_REDIRECT, "1"),
        ]
        .into_iter()
        .collect();
        let mut config = WireConfig::default().with_app_key("from-file");
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.app_key().unwrap(), "from-env");
        assert!(!config.inject_assets);
        assert!(config.render_on_redirect);
    }

    #[test]
    fn bad_flag_is_rejected() {
        let mut config = WireConfig::default();
        let err = config
            .apply_overrides(|name| (name == ENV_INJECT_ASSETS).then(|| "maybe".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidFlag { .. }));
    }

    #[test]
    fn unknown_toml_type_is_parse_error() {
        assert!(matches!(
            WireConfig::from_toml_str("inject_assets = \"sometimes\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
