//! Configuration Management
//!
//! Handles persistent settings storage for xdmctl and loading of the
//! developer-console credential file.

use crate::platform::auth::DEFAULT_IMS_URL;
use crate::platform::client::DEFAULT_BASE_URL;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_SANDBOX: &str = "prod";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_sandbox() -> String {
    DEFAULT_SANDBOX.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_ims_url() -> String {
    DEFAULT_IMS_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// User settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the developer-console credential file
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,
    /// Sandbox selected through the `x-sandbox-name` header
    #[serde(default = "default_sandbox")]
    pub sandbox: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_ims_url")]
    pub ims_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Global-resource snapshot to use instead of the embedded one
    #[serde(default)]
    pub globals_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            credentials_file: None,
            sandbox: default_sandbox(),
            base_url: default_base_url(),
            ims_url: default_ims_url(),
            timeout_secs: default_timeout_secs(),
            globals_file: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("xdmctl").join("config.json"))
    }

    /// Load settings from disk, falling back to defaults, then apply environment overrides
    pub fn load() -> Self {
        let mut settings = match Self::settings_path() {
            Some(path) if path.exists() => Self::load_or_default(&path),
            _ => Self::default(),
        };
        settings.apply_env();
        settings
    }

    /// Load a settings file, using defaults when it cannot be read or parsed
    pub fn load_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!("Ignoring settings file, using defaults: {:#}", e);
            Self::default()
        })
    }

    /// Load settings from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(path) = std::env::var("XDM_CREDENTIALS") {
            self.credentials_file = Some(PathBuf::from(path));
        }
        if let Ok(sandbox) = std::env::var("XDM_SANDBOX") {
            if sandbox.is_empty() {
                tracing::warn!("Ignoring empty XDM_SANDBOX");
            } else {
                self.sandbox = sandbox;
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings file {}", path.display()))?;

        Ok(())
    }

    /// Make `sandbox` the default in the settings file at `path`, keeping its other fields
    pub fn save_sandbox(path: &Path, sandbox: &str) -> Result<Self> {
        if sandbox.is_empty() {
            bail!("Sandbox name must not be empty");
        }
        let mut settings = if path.exists() {
            Self::load_from(path)?
        } else {
            Self::default()
        };
        settings.sandbox = sandbox.to_string();
        settings.save_to(path)?;
        Ok(settings)
    }
}

/// OAuth server-to-server credentials as downloaded from the developer console
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    #[serde(rename = "CLIENT_ID")]
    pub client_id: String,
    #[serde(rename = "CLIENT_SECRETS")]
    pub client_secrets: Vec<String>,
    #[serde(rename = "ORG_ID")]
    pub org_id: String,
    #[serde(rename = "SCOPES", default)]
    pub scopes: Vec<String>,
}

impl Credentials {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse credentials file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"sandbox": "stage"}"#).unwrap();
        assert_eq!(settings.sandbox, "stage");
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.ims_url, DEFAULT_IMS_URL);
        assert_eq!(settings.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert!(settings.credentials_file.is_none());
    }

    #[test]
    fn test_settings_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let settings = Settings {
            sandbox: "dev".to_string(),
            timeout_secs: 5,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.sandbox, "dev");
        assert_eq!(loaded.timeout_secs, 5);
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(Settings::load_from(&path).is_err());
        let settings = Settings::load_or_default(&path);
        assert_eq!(settings.sandbox, DEFAULT_SANDBOX);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_save_sandbox_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xdmctl").join("config.json");

        let settings = Settings::save_sandbox(&path, "dev").unwrap();
        assert_eq!(settings.sandbox, "dev");
        assert_eq!(Settings::load_from(&path).unwrap().sandbox, "dev");
    }

    #[test]
    fn test_save_sandbox_keeps_other_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        Settings {
            timeout_secs: 7,
            credentials_file: Some(PathBuf::from("/tmp/auth.json")),
            ..Settings::default()
        }
        .save_to(&path)
        .unwrap();

        Settings::save_sandbox(&path, "stage").unwrap();
        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(loaded.sandbox, "stage");
        assert_eq!(loaded.timeout_secs, 7);
        assert_eq!(loaded.credentials_file, Some(PathBuf::from("/tmp/auth.json")));
    }

    #[test]
    fn test_save_sandbox_rejects_empty_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(Settings::save_sandbox(&path, "").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_credentials_parse_console_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(
            &path,
            r#"{
                "CLIENT_ID": "abc123",
                "CLIENT_SECRETS": ["p8e-secret"],
                "ORG_ID": "1234@AdobeOrg",
                "SCOPES": ["openid", "AdobeID", "read_organizations"],
                "TECHNICAL_ACCOUNT_ID": "ignored@techacct.adobe.com"
            }"#,
        )
        .unwrap();

        let credentials = Credentials::load(&path).unwrap();
        assert_eq!(credentials.client_id, "abc123");
        assert_eq!(credentials.client_secrets, vec!["p8e-secret"]);
        assert_eq!(credentials.org_id, "1234@AdobeOrg");
        assert_eq!(credentials.scopes.len(), 3);
    }

    #[test]
    fn test_credentials_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Credentials::load(&dir.path().join("missing.json")).is_err());
    }
}
