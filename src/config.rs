//! Process configuration
//!
//! Everything here is read once at startup and then shared read-only.
//! The webhook uses [`StorageDefaults`] as the lowest layer of the claim
//! parameter resolution; `main` uses [`OperatorMode`] to decide which
//! subsystems to start.

use std::fmt;
use std::str::FromStr;

/// Built-in default claim size
pub const DEFAULT_SIZE: &str = "10Gi";
/// Built-in default storage class
pub const DEFAULT_STORAGE_CLASS: &str = "standard";
/// Built-in default access mode list
pub const DEFAULT_ACCESS_MODES: &str = "ReadWriteOnce";

/// Environment variable overriding [`DEFAULT_SIZE`]
pub const ENV_DEFAULT_SIZE: &str = "DEFAULT_SIZE";
/// Environment variable overriding [`DEFAULT_STORAGE_CLASS`]
pub const ENV_DEFAULT_STORAGE_CLASS: &str = "DEFAULT_STORAGE_CLASS";
/// Environment variable overriding [`DEFAULT_ACCESS_MODES`]
pub const ENV_DEFAULT_ACCESS_MODES: &str = "DEFAULT_ACCESS_MODES";
/// Environment variable selecting which subsystems run
pub const ENV_OPERATOR_MODE: &str = "OPERATOR_MODE";
/// Environment variable overriding the webhook listen port
pub const ENV_WEBHOOK_PORT: &str = "WEBHOOK_PORT";

/// Return the first candidate whose trimmed form is non-empty.
///
/// Candidates are examined strictly left to right. The winning value is
/// returned as written, untrimmed. Returns `""` when nothing qualifies.
pub fn pick<'a>(candidates: &[&'a str]) -> &'a str {
    candidates
        .iter()
        .copied()
        .find(|candidate| !candidate.trim().is_empty())
        .unwrap_or("")
}

/// Operator-wide defaults for converted volumes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageDefaults {
    pub size: String,
    pub storage_class: String,
    pub access_modes: String,
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE.to_string(),
            storage_class: DEFAULT_STORAGE_CLASS.to_string(),
            access_modes: DEFAULT_ACCESS_MODES.to_string(),
        }
    }
}

impl StorageDefaults {
    /// Load defaults from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load defaults through an arbitrary key lookup.
    ///
    /// Blank values count as absent and fall back to the built-in default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str, fallback: &str| {
            let value = lookup(key).unwrap_or_default();
            pick(&[value.as_str(), fallback]).to_string()
        };

        Self {
            size: read(ENV_DEFAULT_SIZE, DEFAULT_SIZE),
            storage_class: read(ENV_DEFAULT_STORAGE_CLASS, DEFAULT_STORAGE_CLASS),
            access_modes: read(ENV_DEFAULT_ACCESS_MODES, DEFAULT_ACCESS_MODES),
        }
    }
}

/// Which subsystems this process runs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OperatorMode {
    /// Webhook server and controller in the same process
    #[default]
    All,
    /// Admission webhook only
    Webhook,
    /// Reconciliation controller only
    Controller,
}

impl OperatorMode {
    /// Read the mode from `OPERATOR_MODE`, defaulting to [`OperatorMode::All`]
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(ENV_OPERATOR_MODE) {
            Ok(value) if !value.trim().is_empty() => value.parse(),
            _ => Ok(Self::default()),
        }
    }

    pub fn runs_webhook(&self) -> bool {
        matches!(self, OperatorMode::All | OperatorMode::Webhook)
    }

    pub fn runs_controller(&self) -> bool {
        matches!(self, OperatorMode::All | OperatorMode::Controller)
    }
}

impl FromStr for OperatorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(OperatorMode::All),
            "webhook" => Ok(OperatorMode::Webhook),
            "controller" => Ok(OperatorMode::Controller),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

impl fmt::Display for OperatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorMode::All => write!(f, "all"),
            OperatorMode::Webhook => write!(f, "webhook"),
            OperatorMode::Controller => write!(f, "controller"),
        }
    }
}

/// Webhook listen port from `WEBHOOK_PORT`, or `default` when unset or blank
pub fn webhook_port_from_env(default: u16) -> Result<u16, ConfigError> {
    parse_port(std::env::var(ENV_WEBHOOK_PORT).ok().as_deref(), default)
}

fn parse_port(value: Option<&str>, default: u16) -> Result<u16, ConfigError> {
    match value.map(str::trim) {
        None | Some("") => Ok(default),
        Some(raw) => match raw.parse::<u16>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidPort(raw.to_string())),
            Ok(port) => Ok(port),
        },
    }
}

/// Errors raised while reading process configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid OPERATOR_MODE '{0}': expected one of all, webhook, controller")]
    InvalidMode(String),

    #[error("invalid WEBHOOK_PORT '{0}': expected a port number between 1 and 65535")]
    InvalidPort(String),
}
