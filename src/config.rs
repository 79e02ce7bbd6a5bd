//! Configuration loading and validation.
//!
//! Every field has a built-in default matching the production setup, so a
//! run with no configuration file regenerates the standard Unbound blocklist.
//! A TOML file may override any subset of the fields.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result, ValidationError};
use crate::service::CommandSpec;

/// URL of the file listing regular expressions matching always-permitted zones.
pub const DEFAULT_ALLOW_PATTERNS_URL: &str =
    "https://raw.githubusercontent.com/derat/dns-lists/master/allow-patterns";

/// URLs of hosts files listing zones to deny. Entries are mapped to `0.0.0.0`.
pub const DEFAULT_DENY_HOSTS_URLS: &[&str] = &[
    "https://raw.githubusercontent.com/derat/dns-lists/master/deny-hosts",
    "https://raw.githubusercontent.com/StevenBlack/hosts/master/hosts",
];

/// Path where the Unbound config file is written.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/unbound/unbound.conf.d/blocklist.conf";

/// Main configuration for a blocklist run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// URL of the allow-list document (one regular expression per line).
    #[serde(default = "default_allow_patterns_url")]
    pub allow_patterns_url: String,

    /// URLs of the hosts-format deny-lists, rendered in this order.
    #[serde(default = "default_deny_hosts_urls")]
    pub deny_hosts_urls: Vec<String>,

    /// Destination of the generated Unbound configuration.
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// HTTP request timeout in seconds. Zero leaves the transport default.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,

    /// Syntax checker. The path of the file to check is appended.
    #[serde(default = "default_check_command")]
    pub check_command: CommandSpec,

    /// Command restarting or reloading the resolver.
    #[serde(default = "default_reload_command")]
    pub reload_command: CommandSpec,

    /// Check the staged file before promoting it instead of checking the
    /// installed file afterwards.
    #[serde(default)]
    pub validate_before_promote: bool,

    /// Hold a lock file next to the destination for the whole run.
    #[serde(default = "default_run_lock")]
    pub run_lock: bool,

    /// Permission bits of the installed file (Unix only).
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_patterns_url: default_allow_patterns_url(),
            deny_hosts_urls: default_deny_hosts_urls(),
            config_path: default_config_path(),
            http_timeout_secs: default_http_timeout(),
            check_command: default_check_command(),
            reload_command: default_reload_command(),
            validate_before_promote: false,
            run_lock: default_run_lock(),
            file_mode: default_file_mode(),
        }
    }
}

fn default_allow_patterns_url() -> String {
    DEFAULT_ALLOW_PATTERNS_URL.to_string()
}

fn default_deny_hosts_urls() -> Vec<String> {
    DEFAULT_DENY_HOSTS_URLS
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}

const fn default_http_timeout() -> u64 {
    30
}

fn default_check_command() -> CommandSpec {
    CommandSpec::new("unbound-checkconf", Vec::<String>::new())
}

fn default_reload_command() -> CommandSpec {
    CommandSpec::new("service", ["unbound", "restart"])
}

const fn default_run_lock() -> bool {
    true
}

const fn default_file_mode() -> u32 {
    0o644
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate().map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Timeout applied to every HTTP request, if any.
    #[must_use]
    pub const fn http_timeout(&self) -> Option<Duration> {
        if self.http_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.http_timeout_secs))
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.allow_patterns_url.is_empty() {
            return Err(ValidationError::EmptyAllowPatternsUrl);
        }
        validate_url(&self.allow_patterns_url)?;

        if self.deny_hosts_urls.is_empty() {
            return Err(ValidationError::NoDenySources);
        }
        for url in &self.deny_hosts_urls {
            validate_url(url)?;
        }

        if self.config_path.file_name().is_none() {
            return Err(ValidationError::InvalidConfigPath {
                path: self.config_path.clone(),
            });
        }

        if self.file_mode > 0o7777 {
            return Err(ValidationError::InvalidFileMode {
                mode: self.file_mode,
            });
        }

        Ok(())
    }
}

fn validate_url(url: &str) -> std::result::Result<(), ValidationError> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl {
            url: url.to_string(),
        })
    }
}
