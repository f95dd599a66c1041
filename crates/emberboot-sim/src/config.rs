//! TOML-based configuration for the simulation harness.

use std::path::Path;

use serde::Deserialize;

use emberboot_core::SupervisorConfig;

use crate::error::SimError;

/// Top-level simulation configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub supervisor: SupervisorSection,
    #[serde(default)]
    pub flash: FlashSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, SimError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SimError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, SimError> {
        toml::from_str(s).map_err(|e| SimError::Config(format!("failed to parse config: {e}")))
    }
}

/// The `[supervisor]` section: timeout windows in milliseconds.
#[derive(Debug, Deserialize)]
pub struct SupervisorSection {
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,
    #[serde(default = "default_validation_timeout_ms")]
    pub validation_timeout_ms: u64,
    #[serde(default = "default_error_heal_ms")]
    pub error_heal_ms: u64,
    #[serde(default = "default_recovery_heal_ms")]
    pub recovery_heal_ms: u64,
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_validation_timeout_ms() -> u64 {
    5_000
}

fn default_error_heal_ms() -> u64 {
    5_000
}

fn default_recovery_heal_ms() -> u64 {
    10_000
}

impl Default for SupervisorSection {
    fn default() -> Self {
        Self {
            session_timeout_ms: default_session_timeout_ms(),
            validation_timeout_ms: default_validation_timeout_ms(),
            error_heal_ms: default_error_heal_ms(),
            recovery_heal_ms: default_recovery_heal_ms(),
        }
    }
}

impl SupervisorSection {
    /// Convert to the core's microsecond-based configuration.
    pub fn to_supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            session_timeout_us: self.session_timeout_ms * 1_000,
            validation_timeout_us: self.validation_timeout_ms * 1_000,
            error_heal_us: self.error_heal_ms * 1_000,
            recovery_heal_us: self.recovery_heal_ms * 1_000,
        }
    }
}

/// The `[flash]` section.
#[derive(Debug, Deserialize)]
pub struct FlashSection {
    /// Simulated write duration in microseconds.
    #[serde(default = "default_write_latency_us")]
    pub write_latency_us: u64,
}

fn default_write_latency_us() -> u64 {
    2_000
}

impl Default for FlashSection {
    fn default() -> Self {
        Self {
            write_latency_us: default_write_latency_us(),
        }
    }
}

/// The `[logging]` section.
#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
