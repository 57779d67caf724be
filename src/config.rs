//! Stack configuration: thresholds, timeouts, capacities, and the node's
//! own identity. Deserialized from TOML by the `rrc` binary; library code
//! only ever receives an already-validated `Config` value.

use serde::{Deserialize, Serialize};

/// Hard upper bound on frame/message payload size, matching the source's
/// POSIX-IPC ("modern") core (see SPEC_FULL.md §3.1). `Config::mtu` may be
/// set to any value `<= MAX_MTU`.
pub const MAX_MTU: usize = 2800;

/// Per-neighbor link-quality thresholds and change-detection triggers
/// (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    pub rssi_active_dbm: f32,
    pub snr_active_db: f32,
    pub per_active_pct: f32,

    pub rssi_change_db: f32,
    pub snr_change_db: f32,
    pub per_change_pct: f32,

    /// Stricter usability gate consumed by the scheduler (§4.3).
    pub rssi_usable_dbm: f32,
    pub snr_usable_db: f32,
    pub per_usable_pct: f32,

    /// A neighbor reading older than this is treated as unknown/unusable.
    pub staleness_ms: u64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            rssi_active_dbm: -85.0,
            snr_active_db: 10.0,
            per_active_pct: 10.0,

            rssi_change_db: 5.0,
            snr_change_db: 3.0,
            per_change_pct: 5.0,

            rssi_usable_dbm: -85.0,
            snr_usable_db: 12.0,
            per_usable_pct: 5.0,

            staleness_ms: 500,
        }
    }
}

/// Protocol timeouts (§4.4, §4.5, §4.6, §5).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Timeouts {
    pub max_scan_time_ms: u64,
    pub nc_slot_timeout_ms: u64,
    pub inactivity_timeout_s: u64,
    pub setup_timeout_s: u64,
    pub request_deadline_ms: u64,
    pub slot_check_deadline_ms: u64,
    pub voice_cc_deadline_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            max_scan_time_ms: 200,
            nc_slot_timeout_ms: 2000,
            inactivity_timeout_s: 30,
            setup_timeout_s: 10,
            request_deadline_ms: 5000,
            slot_check_deadline_ms: 10,
            voice_cc_deadline_ms: 2000,
        }
    }
}

/// Fixed queue capacities (§3).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Capacities {
    pub analog_voice: usize,
    pub data: usize,
    pub rx_relay: usize,
    pub nc: usize,
}

impl Default for Capacities {
    fn default() -> Self {
        Self {
            analog_voice: 16,
            data: 16,
            rx_relay: 16,
            nc: 16,
        }
    }
}

/// Top-level RRC configuration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub node_id: u8,
    /// Effective MTU for admission; must be `<= MAX_MTU`.
    pub mtu: usize,
    /// Initial TTL stamped on newly admitted frames (10-16 per spec).
    pub initial_ttl: u8,
    pub thresholds: Thresholds,
    pub timeouts: Timeouts,
    pub capacities: Capacities,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node_id: 0,
            mtu: 256,
            initial_ttl: 12,
            thresholds: Thresholds::default(),
            timeouts: Timeouts::default(),
            capacities: Capacities::default(),
        }
    }
}

/// Errors that can occur while loading or validating a `Config`.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    MtuTooLarge { requested: usize, max: usize },
    InitialTtlZero,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read config file: {e}"),
            ConfigError::Parse(e) => write!(f, "failed to parse config file: {e}"),
            ConfigError::MtuTooLarge { requested, max } => {
                write!(f, "configured MTU {requested} exceeds maximum {max}")
            }
            ConfigError::InitialTtlZero => write!(f, "initial_ttl must be > 0"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Loads and validates a `Config` from a TOML file on disk.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let cfg: Config = toml::from_str(&text).map_err(ConfigError::Parse)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mtu > MAX_MTU {
            return Err(ConfigError::MtuTooLarge {
                requested: self.mtu,
                max: MAX_MTU,
            });
        }
        if self.initial_ttl == 0 {
            return Err(ConfigError::InitialTtlZero);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn mtu_over_max_rejected() {
        let mut cfg = Config::default();
        cfg.mtu = MAX_MTU + 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::MtuTooLarge { .. })));
    }

    #[test]
    fn zero_ttl_rejected() {
        let mut cfg = Config::default();
        cfg.initial_ttl = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InitialTtlZero)));
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: Config = toml::from_str("node_id = 42\n").unwrap();
        assert_eq!(cfg.node_id, 42);
        assert_eq!(cfg.mtu, Config::default().mtu);
    }
}
