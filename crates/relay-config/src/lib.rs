// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration loading, validation, and merging for cli-relay.
//!
//! This crate provides [`RelayConfig`], the daemon's runtime settings,
//! together with helpers for loading from TOML files, applying environment
//! overrides, merging overlays, and producing advisory [`ConfigWarning`]s.
#![deny(unsafe_code)]
#![warn(missing_docs)]

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration loading or validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file was not found.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },

    /// The file exists but could not be read.
    #[error("failed to read config {path}: {reason}")]
    ReadError {
        /// Path that was requested.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// The file could not be parsed as valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse error detail.
        reason: String,
    },

    /// Semantic validation failed (one or more problems).
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Individual validation failure messages.
        reasons: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Advisory-level issues that do not prevent operation but deserve attention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The alias table does not contain the default alias as a target.
    UnknownDefaultAlias {
        /// The configured default alias.
        alias: String,
    },
    /// The CLI arguments do not request stream-json output.
    NonStreamingOutput {
        /// The configured CLI command.
        command: String,
    },
    /// The server binds to a non-loopback address.
    PublicBind {
        /// The configured bind address.
        bind: String,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::UnknownDefaultAlias { alias } => {
                write!(f, "default alias '{alias}' is not the target of any model alias")
            }
            ConfigWarning::NonStreamingOutput { command } => {
                write!(
                    f,
                    "cli '{command}' args do not include '--output-format stream-json'"
                )
            }
            ConfigWarning::PublicBind { bind } => {
                write!(f, "binding to non-loopback address '{bind}'")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Config types
// ---------------------------------------------------------------------------

/// Top-level runtime configuration for the relay daemon.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct RelayConfig {
    /// Socket address the HTTP server binds to.
    pub bind: String,

    /// Log level (e.g. `"debug"`, `"info"`, `"warn"`).
    pub log_level: String,

    /// Provider name reported by `/health`.
    pub provider: String,

    /// Capacity of the per-request outbound SSE frame channel.
    pub channel_buffer: usize,

    /// Origins allowed by CORS. Empty disables the CORS layer.
    pub cors_origins: Vec<String>,

    /// How to launch the assistant CLI.
    pub cli: CliSection,

    /// Model alias resolution.
    pub models: ModelsSection,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.into(),
            log_level: "info".into(),
            provider: DEFAULT_PROVIDER.into(),
            channel_buffer: DEFAULT_CHANNEL_BUFFER,
            cors_origins: Vec::new(),
            cli: CliSection::default(),
            models: ModelsSection::default(),
        }
    }
}

/// The `[cli]` table: command line of the assistant process.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct CliSection {
    /// Executable to spawn.
    pub command: String,
    /// Base arguments; `--model` and `--session-id` are appended per request.
    pub args: Vec<String>,
    /// Optional working directory for the process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,
    /// Extra environment variables for the process.
    pub env: BTreeMap<String, String>,
}

impl Default for CliSection {
    fn default() -> Self {
        Self {
            command: "claude".into(),
            args: DEFAULT_CLI_ARGS.iter().map(|s| (*s).to_string()).collect(),
            cwd: None,
            env: BTreeMap::new(),
        }
    }
}

/// The `[models]` table: alias table and defaults.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(default)]
pub struct ModelsSection {
    /// Alias used when a requested model cannot be resolved.
    pub default_alias: String,
    /// Provider prefix stripped before the second lookup.
    pub provider_prefix: String,
    /// Model name reported before the process announces one.
    pub fallback_model: String,
    /// Requested model name → CLI alias. Empty means the built-in table.
    pub aliases: BTreeMap<String, String>,
}

impl Default for ModelsSection {
    fn default() -> Self {
        Self {
            default_alias: "opus".into(),
            provider_prefix: "claude-code-cli/".into(),
            fallback_model: "claude-sonnet-4".into(),
            aliases: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default bind address.
pub const DEFAULT_BIND: &str = "127.0.0.1:3456";

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "claude-code-cli";

/// Default SSE channel capacity.
pub const DEFAULT_CHANNEL_BUFFER: usize = 64;

/// Default CLI arguments (print mode with incremental stream-json output).
pub const DEFAULT_CLI_ARGS: &[&str] = &[
    "--print",
    "--output-format",
    "stream-json",
    "--verbose",
    "--include-partial-messages",
];

/// Upper bound for `channel_buffer`.
const MAX_CHANNEL_BUFFER: usize = 65_536;

/// Recognised log levels.
const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Environment variables consulted by [`apply_env_overrides`].
pub const ENV_BIND: &str = "RELAY_BIND";
/// Log level override.
pub const ENV_LOG_LEVEL: &str = "RELAY_LOG_LEVEL";
/// CLI command override.
pub const ENV_CLI_COMMAND: &str = "RELAY_CLI_COMMAND";
/// Default alias override.
pub const ENV_DEFAULT_MODEL: &str = "RELAY_DEFAULT_MODEL";

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a [`RelayConfig`] from an optional TOML file path.
///
/// * If `path` is `Some`, reads and parses the file.
/// * If `path` is `None`, returns [`RelayConfig::default()`].
///
/// Environment variable overrides are applied on top in both cases.
pub fn load_config(path: Option<&Path>) -> Result<RelayConfig, ConfigError> {
    let mut config = match path {
        Some(p) => {
            let content = std::fs::read_to_string(p).map_err(|e| {
                let path = p.display().to_string();
                if e.kind() == std::io::ErrorKind::NotFound {
                    ConfigError::FileNotFound { path }
                } else {
                    ConfigError::ReadError {
                        path,
                        reason: e.to_string(),
                    }
                }
            })?;
            parse_toml(&content)?
        }
        None => RelayConfig::default(),
    };
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a TOML string into a [`RelayConfig`].
pub fn parse_toml(content: &str) -> Result<RelayConfig, ConfigError> {
    toml::from_str::<RelayConfig>(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Env overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides from the process environment.
///
/// Recognised variables:
/// - `RELAY_BIND`
/// - `RELAY_LOG_LEVEL`
/// - `RELAY_CLI_COMMAND`
/// - `RELAY_DEFAULT_MODEL`
pub fn apply_env_overrides(config: &mut RelayConfig) {
    apply_overrides_with(config, |key| std::env::var(key).ok());
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_with<F>(config: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = lookup(ENV_BIND) {
        config.bind = val;
    }
    if let Some(val) = lookup(ENV_LOG_LEVEL) {
        config.log_level = val;
    }
    if let Some(val) = lookup(ENV_CLI_COMMAND) {
        config.cli.command = val;
    }
    if let Some(val) = lookup(ENV_DEFAULT_MODEL) {
        config.models.default_alias = val;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a parsed configuration, returning advisory warnings.
///
/// Hard errors (empty command, bad log level, out-of-range buffer) are
/// returned as a [`ConfigError::ValidationError`]; soft issues come back as
/// warnings.
pub fn validate_config(config: &RelayConfig) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<ConfigWarning> = Vec::new();

    if !VALID_LOG_LEVELS.contains(&config.log_level.as_str()) {
        errors.push(format!("invalid log_level '{}'", config.log_level));
    }

    if config.bind.trim().is_empty() {
        errors.push("bind address must not be empty".into());
    } else if !is_loopback_bind(&config.bind) {
        warnings.push(ConfigWarning::PublicBind {
            bind: config.bind.clone(),
        });
    }

    if config.channel_buffer == 0 || config.channel_buffer > MAX_CHANNEL_BUFFER {
        errors.push(format!(
            "channel_buffer {} out of range (1..={MAX_CHANNEL_BUFFER})",
            config.channel_buffer
        ));
    }

    for origin in &config.cors_origins {
        if origin.trim().is_empty() {
            errors.push("cors_origins entries must not be empty".into());
        }
    }

    if config.cli.command.trim().is_empty() {
        errors.push("cli command must not be empty".into());
    } else if !config
        .cli
        .args
        .windows(2)
        .any(|w| w[0] == "--output-format" && w[1] == "stream-json")
    {
        warnings.push(ConfigWarning::NonStreamingOutput {
            command: config.cli.command.clone(),
        });
    }

    let models = &config.models;
    if models.default_alias.trim().is_empty() {
        errors.push("models.default_alias must not be empty".into());
    }
    for (name, alias) in &models.aliases {
        if name.is_empty() || alias.trim().is_empty() {
            errors.push(format!("model alias '{name}' -> '{alias}' has an empty side"));
        }
    }
    if !models.aliases.is_empty()
        && !models.aliases.values().any(|a| *a == models.default_alias)
    {
        warnings.push(ConfigWarning::UnknownDefaultAlias {
            alias: models.default_alias.clone(),
        });
    }

    if errors.is_empty() {
        Ok(warnings)
    } else {
        Err(ConfigError::ValidationError { reasons: errors })
    }
}

fn is_loopback_bind(bind: &str) -> bool {
    bind.starts_with("127.") || bind.starts_with("localhost") || bind.starts_with("[::1]")
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

/// Merge two configurations. Values in `overlay` take precedence over `base`
/// wherever the overlay differs from [`RelayConfig::default()`].
///
/// Alias tables and CLI env tables are combined; on key collisions the
/// overlay entry wins.
pub fn merge_configs(base: RelayConfig, overlay: RelayConfig) -> RelayConfig {
    let defaults = RelayConfig::default();
    let pick = |b: String, o: String, d: &str| if o != d { o } else { b };

    let mut aliases = base.models.aliases;
    aliases.extend(overlay.models.aliases);
    let mut env = base.cli.env;
    env.extend(overlay.cli.env);

    RelayConfig {
        bind: pick(base.bind, overlay.bind, &defaults.bind),
        log_level: pick(base.log_level, overlay.log_level, &defaults.log_level),
        provider: pick(base.provider, overlay.provider, &defaults.provider),
        channel_buffer: if overlay.channel_buffer != defaults.channel_buffer {
            overlay.channel_buffer
        } else {
            base.channel_buffer
        },
        cors_origins: if overlay.cors_origins.is_empty() {
            base.cors_origins
        } else {
            overlay.cors_origins
        },
        cli: CliSection {
            command: pick(base.cli.command, overlay.cli.command, &defaults.cli.command),
            args: if overlay.cli.args != defaults.cli.args {
                overlay.cli.args
            } else {
                base.cli.args
            },
            cwd: overlay.cli.cwd.or(base.cli.cwd),
            env,
        },
        models: ModelsSection {
            default_alias: pick(
                base.models.default_alias,
                overlay.models.default_alias,
                &defaults.models.default_alias,
            ),
            provider_prefix: pick(
                base.models.provider_prefix,
                overlay.models.provider_prefix,
                &defaults.models.provider_prefix,
            ),
            fallback_model: pick(
                base.models.fallback_model,
                overlay.models.fallback_model,
                &defaults.models.fallback_model,
            ),
            aliases,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
