//! Toolkit configuration
//!
//! Connection settings and the institution-specific identifier rules.
//! Pattern prefixes vary by institution, so they are configuration with
//! defaults rather than constants.
//!
//! Values are read from a YAML file (default location under the user's
//! config directory) and may be overridden by environment variables:
//! `FBT_OKAPI_URL`, `FBT_TENANT`, `FBT_TOKEN`, `FBT_BACKUP_DIR`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::error::FolioError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the platform's API gateway.
    pub okapi_url: String,

    /// Tenant identifier sent with every request.
    pub tenant: String,

    /// Bearer token. Usually supplied via `FBT_TOKEN` rather than the
    /// config file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Where pre-mutation snapshots are written. Defaults to the user's
    /// data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,

    /// Leading digits that mark a long numeric token as an item barcode.
    pub item_barcode_prefix: String,

    /// Prefix of item human-readable identifiers.
    pub item_hrid_prefix: String,

    /// Prefix of holdings human-readable identifiers.
    pub holdings_hrid_prefix: String,

    /// Prefix of institutional accession numbers.
    pub accession_prefix: String,

    /// Width to zero-pad short numeric tokens to when probing user
    /// barcodes a second time. `None` disables the retry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_barcode_pad_width: Option<usize>,

    /// Whether loan traversals follow open loans only by default.
    pub open_loans_only: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            okapi_url: String::new(),
            tenant: String::new(),
            token: None,
            backup_dir: None,
            item_barcode_prefix: "350".to_string(),
            item_hrid_prefix: "it".to_string(),
            holdings_hrid_prefix: "ho".to_string(),
            accession_prefix: "clc".to_string(),
            user_barcode_pad_width: Some(7),
            open_loans_only: true,
        }
    }
}

impl Config {
    /// Load configuration, merging (in increasing precedence) defaults,
    /// the config file, and environment variables.
    ///
    /// An explicitly given path must exist; the default path is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, FolioError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, FolioError> {
        let content = fs::read_to_string(path).map_err(|e| {
            FolioError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_yml::from_str(&content).map_err(|e| {
            FolioError::Config(format!("cannot parse {}: {}", path.display(), e))
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = env::var("FBT_OKAPI_URL") {
            self.okapi_url = url;
        }
        if let Ok(tenant) = env::var("FBT_TENANT") {
            self.tenant = tenant;
        }
        if let Ok(token) = env::var("FBT_TOKEN") {
            self.token = Some(token);
        }
        if let Ok(dir) = env::var("FBT_BACKUP_DIR") {
            self.backup_dir = Some(PathBuf::from(dir));
        }
    }

    /// Default config file location (`<config dir>/fbt/config.yml`).
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "fbt").map(|dirs| dirs.config_dir().join("config.yml"))
    }

    /// Effective backup directory.
    pub fn backup_dir(&self) -> Result<PathBuf, FolioError> {
        if let Some(dir) = &self.backup_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("", "", "fbt")
            .map(|dirs| dirs.data_dir().join("backups"))
            .ok_or_else(|| {
                FolioError::Config("no backup directory configured and no home directory".into())
            })
    }

    /// Check that the settings needed to reach the platform are present
    /// and well formed. Does not touch the network.
    pub fn require_connection(&self) -> Result<(), FolioError> {
        if self.okapi_url.is_empty() {
            return Err(FolioError::Config(
                "okapi_url is not set (config file or FBT_OKAPI_URL)".into(),
            ));
        }
        if reqwest::Url::parse(&self.okapi_url).is_err() {
            return Err(FolioError::Config(format!(
                "okapi_url is not a valid URL: {}",
                self.okapi_url
            )));
        }
        if self.tenant.is_empty() {
            return Err(FolioError::Config(
                "tenant is not set (config file or FBT_TENANT)".into(),
            ));
        }
        if self.token.as_deref().unwrap_or("").is_empty() {
            return Err(FolioError::Config(
                "no API token available (config file or FBT_TOKEN)".into(),
            ));
        }
        Ok(())
    }

    /// The config body as YAML with the token masked, for display.
    pub fn redacted_yaml(&self) -> Result<String, FolioError> {
        let mut shown = self.clone();
        if shown.token.is_some() {
            shown.token = Some("********".to_string());
        }
        serde_yml::to_string(&shown)
            .map_err(|e| FolioError::Config(format!("cannot render config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.item_barcode_prefix, "350");
        assert_eq!(config.item_hrid_prefix, "it");
        assert_eq!(config.holdings_hrid_prefix, "ho");
        assert_eq!(config.accession_prefix, "clc");
        assert_eq!(config.user_barcode_pad_width, Some(7));
        assert!(config.open_loans_only);
    }

    #[test]
    fn test_parse_partial_file() {
        let yaml = "okapi_url: https://folio.example.edu\ntenant: diku\naccession_prefix: abc\n";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.okapi_url, "https://folio.example.edu");
        assert_eq!(config.accession_prefix, "abc");
        // Unmentioned knobs keep their defaults.
        assert_eq!(config.item_barcode_prefix, "350");
    }

    #[test]
    fn test_require_connection_reports_missing_pieces() {
        let mut config = Config::default();
        assert!(matches!(
            config.require_connection(),
            Err(FolioError::Config(_))
        ));

        config.okapi_url = "not a url".to_string();
        assert!(matches!(
            config.require_connection(),
            Err(FolioError::Config(_))
        ));

        config.okapi_url = "https://folio.example.edu".to_string();
        config.tenant = "diku".to_string();
        config.token = Some("tok".to_string());
        assert!(config.require_connection().is_ok());
    }

    #[test]
    fn test_redacted_yaml_masks_token() {
        let mut config = Config::default();
        config.token = Some("secret-token".to_string());
        let yaml = config.redacted_yaml().unwrap();
        assert!(!yaml.contains("secret-token"));
        assert!(yaml.contains("********"));
    }
}
