//! Server configuration
//!
//! Read from the environment (after `.env` is loaded by `main`). Every key
//! has a default so the service starts with no configuration at all.

use std::path::PathBuf;

use thiserror::Error;
use zipship_domain::deploy::{
    EndpointProfile, DEFAULT_LEGACY_MAX_FORM_BYTES, DEFAULT_MAX_FORM_BYTES,
};

pub const ENV_HOST: &str = "ZIPSHIP_HOST";
pub const ENV_PORT: &str = "ZIPSHIP_PORT";
pub const ENV_MAX_FORM_BYTES: &str = "ZIPSHIP_MAX_FORM_BYTES";
pub const ENV_LEGACY_MAX_FORM_BYTES: &str = "ZIPSHIP_LEGACY_MAX_FORM_BYTES";
pub const ENV_SCRIPT_DIR: &str = "ZIPSHIP_SCRIPT_DIR";
pub const ENV_UPLOAD_DIR: &str = "ZIPSHIP_UPLOAD_DIR";
pub const ENV_SPOOL_DIR: &str = "ZIPSHIP_SPOOL_DIR";
pub const ENV_SHELL: &str = "ZIPSHIP_SHELL";
pub const ENV_LOG_FORMAT: &str = "ZIPSHIP_LOG_FORMAT";

/// Invalid configuration value
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Form limit of the streaming endpoints
    pub max_form_bytes: u64,
    /// Form limit of the buffered `/upload` endpoint
    pub legacy_max_form_bytes: u64,
    /// Working directory of `/run-script` when no target is sent
    pub script_dir: PathBuf,
    /// Target of `/upload` when no target is sent
    pub upload_dir: PathBuf,
    /// Where multipart file parts are spooled before validation completes
    pub spool_dir: PathBuf,
    /// Shell program commands are handed to
    pub shell: String,
    /// Emit logs as JSON lines
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
            legacy_max_form_bytes: DEFAULT_LEGACY_MAX_FORM_BYTES,
            script_dir: PathBuf::from("./tmp"),
            upload_dir: PathBuf::from("./uploads"),
            spool_dir: std::env::temp_dir(),
            shell: zipship_local::ShellCommandRunner::default().shell().to_string(),
            json_logs: false,
        }
    }
}

impl ServerConfig {
    /// Build the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            host: get(ENV_HOST).unwrap_or(defaults.host),
            port: parse(ENV_PORT, get(ENV_PORT))?.unwrap_or(defaults.port),
            max_form_bytes: parse(ENV_MAX_FORM_BYTES, get(ENV_MAX_FORM_BYTES))?
                .unwrap_or(defaults.max_form_bytes),
            legacy_max_form_bytes: parse(
                ENV_LEGACY_MAX_FORM_BYTES,
                get(ENV_LEGACY_MAX_FORM_BYTES),
            )?
            .unwrap_or(defaults.legacy_max_form_bytes),
            script_dir: get(ENV_SCRIPT_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.script_dir),
            upload_dir: get(ENV_UPLOAD_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            spool_dir: get(ENV_SPOOL_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.spool_dir),
            shell: get(ENV_SHELL).unwrap_or(defaults.shell),
            json_logs: match get(ENV_LOG_FORMAT).as_deref() {
                None | Some("text") => false,
                Some("json") => true,
                Some(other) => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_LOG_FORMAT,
                        value: other.to_string(),
                        reason: "expected `text` or `json`".to_string(),
                    })
                }
            },
        })
    }

    /// Address the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Endpoint profiles derived from this configuration
    pub fn profiles(&self) -> Profiles {
        Profiles {
            upload_only: EndpointProfile::upload_only(self.max_form_bytes),
            upload_script: EndpointProfile::upload_script(self.max_form_bytes),
            run_script: EndpointProfile::run_script(self.max_form_bytes, self.script_dir.clone()),
            upload: EndpointProfile::buffered_upload(
                self.legacy_max_form_bytes,
                self.upload_dir.clone(),
            ),
        }
    }
}

/// One profile per endpoint
#[derive(Debug, Clone)]
pub struct Profiles {
    pub upload_only: EndpointProfile,
    pub upload_script: EndpointProfile,
    pub run_script: EndpointProfile,
    pub upload: EndpointProfile,
}

fn parse<T>(key: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|value| {
            value
                .trim()
                .parse::<T>()
                .map_err(|err| ConfigError::InvalidValue {
                    key,
                    reason: err.to_string(),
                    value,
                })
        })
        .transpose()
}
