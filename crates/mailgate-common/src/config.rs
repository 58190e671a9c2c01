//! Configuration for MailGate
//!
//! The configuration is loaded once at startup and shared read-only for the
//! lifetime of the process; nothing mutates it afterwards. Deployments
//! configure the responder through `MAILGATE_*` environment variables or,
//! when `MAILGATE_CONFIG` points at a TOML file, through that file.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Immutable configuration snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Domains this deployment is authoritative for, lower-cased, without
    /// a leading `@`. Required; governs the anonymous relay policy.
    pub local_domains: Vec<String>,

    /// IP address handed to the proxy as `Auth-Server`. When unset, the
    /// address of this host is resolved at response time.
    pub public_server_ip: Option<String>,

    /// Name of the shared-secret response header. Must be configured
    /// together with `auth_key_value` or not at all.
    pub auth_key_header: Option<String>,

    /// Value of the shared-secret response header.
    pub auth_key_value: Option<String>,

    /// Seconds the proxy should wait before letting the client retry after
    /// an auth failure, copied verbatim into `Auth-Wait`.
    pub wait_on_error: Option<String>,

    /// Upper bound on a single directory lookup or password verification
    #[serde(default = "default_directory_timeout")]
    pub directory_timeout_secs: u64,

    /// Dump request headers (password masked) to the log
    #[serde(default)]
    pub debug: bool,

    /// When false the responder answers 403 to every auth query
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// HTTP listen address
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Optional TOML file of `name = "argon2 hash"` entries backing the
    /// built-in in-memory directory.
    pub users_file: Option<PathBuf>,
}

fn default_directory_timeout() -> u64 {
    5
}

fn default_enabled() -> bool {
    true
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.normalized()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> crate::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Load configuration from `MAILGATE_CONFIG` when set, otherwise from
    /// the environment
    pub fn load() -> crate::Result<Self> {
        match std::env::var("MAILGATE_CONFIG") {
            Ok(path) => Self::from_file(std::path::Path::new(&path)),
            Err(_) => Self::from_env(),
        }
    }

    /// Build a configuration from an environment-style variable lookup.
    ///
    /// Factored out of [`Config::from_env`] so the variable surface is
    /// testable without touching the process environment.
    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let local_domains = get("MAILGATE_LOCAL_DOMAINS")
            .unwrap_or_default()
            .split(',')
            .map(str::to_string)
            .collect();

        let directory_timeout_secs = match get("MAILGATE_DIRECTORY_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                crate::Error::Config(format!(
                    "MAILGATE_DIRECTORY_TIMEOUT_SECS must be a number of seconds, got {:?}",
                    raw
                ))
            })?,
            None => default_directory_timeout(),
        };

        let config = Config {
            local_domains,
            public_server_ip: get("MAILGATE_PUBLIC_IP"),
            auth_key_header: get("MAILGATE_AUTH_KEY_HEADER"),
            auth_key_value: get("MAILGATE_AUTH_KEY_VALUE"),
            wait_on_error: get("MAILGATE_WAIT_ON_ERROR"),
            directory_timeout_secs,
            debug: get("MAILGATE_DEBUG")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            // enabled by default, an explicit "false" switches the responder off
            enabled: !get("MAILGATE_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("false"))
                .unwrap_or(false),
            bind: get("MAILGATE_BIND").unwrap_or_else(default_bind),
            users_file: get("MAILGATE_USERS_FILE").map(PathBuf::from),
        };

        config.normalized()
    }

    /// Canonicalize and validate the snapshot.
    ///
    /// Domain entries are trimmed and lower-cased, empty entries dropped.
    /// An empty domain list and a half-configured shared-secret pair are
    /// both fatal: the caller keeps serving but answers 5xx.
    fn normalized(mut self) -> crate::Result<Self> {
        self.local_domains = self
            .local_domains
            .iter()
            .map(|d| d.trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();

        if self.local_domains.is_empty() {
            return Err(crate::Error::Config(
                "MAILGATE_LOCAL_DOMAINS must list at least one local domain".to_string(),
            ));
        }

        self.public_server_ip = none_if_empty(self.public_server_ip);
        self.auth_key_header = none_if_empty(self.auth_key_header);
        self.auth_key_value = none_if_empty(self.auth_key_value);
        self.wait_on_error = none_if_empty(self.wait_on_error);

        if self.auth_key_header.is_some() != self.auth_key_value.is_some() {
            return Err(crate::Error::Config(
                "auth key header and value must be configured together".to_string(),
            ));
        }

        Ok(self)
    }
}

fn none_if_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
