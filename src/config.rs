//! Configuration loading from a TOML file, overridable by process flags.

use std::{fs, io::ErrorKind, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default location used to store persistent data.
pub const DEFAULT_ROOT: &str = "/var/lib/capstan/";
/// Default path to the config file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/capstan/config.toml";
/// Default logging level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Default upload cap, in bytes.
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 2 * 1_048_576;

/// Runtime settings, read from a TOML key-value file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory where alert and feed documents are kept.
    pub root: PathBuf,
    /// Logging level filter, e.g. `info` or `capstan=debug`.
    pub log_level: String,
    /// Maximum file size permitted for uploads, in bytes.
    pub max_upload_size: u64,
    /// Public base URL used when building feed links; normalized to end
    /// with a slash.
    pub host_name: String,
    /// HTTP bind address.
    pub bind: String,
    /// Human-readable feed title.
    pub feed_title: String,
    /// Name recorded as the feed author.
    pub feed_author: String,
    /// URL of the feed logo image, if any.
    pub feed_logo: String,
    /// Seconds between feed regeneration runs while serving.
    pub feed_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            log_level: DEFAULT_LOG_LEVEL.into(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            host_name: "http://localhost:8080/".into(),
            bind: "0.0.0.0:8080".into(),
            feed_title: "Current Alerts".into(),
            feed_author: "webmaster@localhost".into(),
            feed_logo: String::new(),
            feed_interval_secs: 300,
        }
    }
}

impl Config {
    /// Load configuration from `path`. A missing file yields the defaults;
    /// any other read or parse failure is an error.
    pub fn load(path: &str) -> Result<Self> {
        let data = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let mut cfg: Self = toml::from_str(&data)?;
        if !cfg.host_name.ends_with('/') {
            cfg.host_name.push('/');
        }
        Ok(cfg)
    }
}
