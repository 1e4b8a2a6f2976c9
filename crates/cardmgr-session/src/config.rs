//! Process configuration: reader defaults and the store location, loaded
//! from an optional TOML file and overlaid with environment variables.
//!
//! This is unrelated to the keyset YAML grammar the store imports/exports
//! (`cardmgr_store::yaml`) — that is persisted card-management data; this
//! is how one process instance is told where to find it and how to talk
//! to a reader.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const ENV_STORE_PATH: &str = "CARDMGR_STORE_PATH";
const ENV_READER_TIMEOUT_MS: &str = "CARDMGR_READER_TIMEOUT_MS";
const ENV_ISD_AID: &str = "CARDMGR_ISD_AID";
const ENV_SECURITY_LEVEL: &str = "CARDMGR_SECURITY_LEVEL";

/// Process configuration: where the store lives and what a new [`Session`]
/// assumes unless a caller overrides it per call.
///
/// [`Session`]: crate::facade::Session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Path to the SQLite store file.
    pub store_path: PathBuf,
    /// Milliseconds `connect` blocks waiting for a card, `0` = wait forever.
    pub reader_timeout_ms: u64,
    /// Issuer Security Domain AID to select, overriding
    /// [`cardmgr_globalplatform::constants::DEFAULT_ISD_AID`].
    pub isd_aid: Option<Vec<u8>>,
    /// Security level (1, 2 or 3) `establish_secure_channel` requests when
    /// the caller does not specify one.
    pub default_security_level: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("cardmgr.db"),
            reader_timeout_ms: 5_000,
            isd_aid: None,
            default_security_level: 1,
        }
    }
}

/// TOML-deserializable mirror of [`Config`]; every field optional so a file
/// may override just the fields it cares about.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawConfig {
    store_path: Option<PathBuf>,
    reader_timeout_ms: Option<u64>,
    isd_aid: Option<String>,
    default_security_level: Option<u8>,
}

impl Config {
    fn apply_raw(mut self, raw: RawConfig) -> Result<Self> {
        if let Some(path) = raw.store_path {
            self.store_path = path;
        }
        if let Some(timeout) = raw.reader_timeout_ms {
            self.reader_timeout_ms = timeout;
        }
        if let Some(aid_hex) = raw.isd_aid {
            self.isd_aid = Some(hex::decode(aid_hex)?);
        }
        if let Some(level) = raw.default_security_level {
            self.default_security_level = level;
        }
        Ok(self)
    }

    /// Load from `path` (TOML), falling back to defaults for any field the
    /// file does not set.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let raw: RawConfig = toml::from_str(&text)?;
        Self::default().apply_raw(raw)
    }

    /// Overlay environment variables onto `self`, in order:
    /// `CARDMGR_STORE_PATH`, `CARDMGR_READER_TIMEOUT_MS`, `CARDMGR_ISD_AID`
    /// (hex), `CARDMGR_SECURITY_LEVEL`.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var(ENV_STORE_PATH) {
            self.store_path = PathBuf::from(path);
        }
        if let Ok(timeout) = std::env::var(ENV_READER_TIMEOUT_MS) {
            self.reader_timeout_ms = timeout.parse().map_err(|_| Error::InvalidConfigValue {
                field: ENV_READER_TIMEOUT_MS,
                value: timeout.clone(),
            })?;
        }
        if let Ok(aid_hex) = std::env::var(ENV_ISD_AID) {
            self.isd_aid = Some(hex::decode(aid_hex)?);
        }
        if let Ok(level) = std::env::var(ENV_SECURITY_LEVEL) {
            self.default_security_level = level.parse().map_err(|_| Error::InvalidConfigValue {
                field: ENV_SECURITY_LEVEL,
                value: level.clone(),
            })?;
        }
        Ok(self)
    }

    /// Load an optional TOML file, then apply environment overrides on top
    /// (the standard "file for defaults, env for the deployment" order).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.default_security_level, 1);
        assert!(config.isd_aid.is_none());
    }

    #[test]
    fn file_overrides_only_set_fields() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("cardmgr-session-test-{:?}.toml", std::thread::current().id()));
        std::fs::write(&path, "reader-timeout-ms = 9000\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.reader_timeout_ms, 9000);
        assert_eq!(config.store_path, PathBuf::from("cardmgr.db"));
    }

    #[test]
    fn parses_isd_aid_hex() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("cardmgr-session-test-aid-{:?}.toml", std::thread::current().id()));
        std::fs::write(&path, "isd-aid = \"A000000151000000\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.isd_aid.unwrap(), hex::decode("A000000151000000").unwrap());
    }
}
