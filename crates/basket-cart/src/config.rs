//! # Cart Configuration
//!
//! Configuration for the client cart: how login settles and where the
//! anonymous cart is persisted.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BASKET_SETTLE=delay                                                │
//! │     BASKET_SETTLE_DELAY_MS=300                                         │
//! │     BASKET_LOCAL_SNAPSHOT=/tmp/local-cart.json                         │
//! │     BASKET_LOCAL_PERSIST=false                                         │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/basket-cart/basket.toml (Linux)                          │
//! │     ~/Library/Application Support/com.basket.cart/basket.toml (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     settle = readiness, persisted local cart at the data dir           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # basket.toml
//! [session]
//! settle = "readiness"   # readiness | delay
//! settle_delay_ms = 300  # only used when settle = "delay"
//!
//! [local]
//! persist = true
//! snapshot_path = "/var/lib/basket/local-cart.json"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use basket_store::SnapshotFile;

use crate::error::{CartError, CartResult};

/// Upper bound accepted for `settle_delay_ms`.
pub const MAX_SETTLE_DELAY_MS: u64 = 60_000;

// =============================================================================
// Settle Mode
// =============================================================================

/// How the client decides the auth session has settled after login.
///
/// ## Mode Behavior
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  READINESS (Default)                                                   │
/// │  ───────────────────                                                   │
/// │  LoggedIn ──► pending ──► Settled event ──► merge + switch to remote   │
/// │                                                                         │
/// │  DELAY                                                                 │
/// │  ─────                                                                 │
/// │  LoggedIn ──► pending ──► settle_delay_ms ──► merge + switch           │
/// │                                                                         │
/// │  Either way, LoggedOut while pending cancels the switch.               │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleMode {
    /// Wait for the auth collaborator's readiness event.
    #[default]
    Readiness,

    /// Wait a fixed delay after login.
    Delay,
}

impl std::fmt::Display for SettleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettleMode::Readiness => write!(f, "readiness"),
            SettleMode::Delay => write!(f, "delay"),
        }
    }
}

impl std::str::FromStr for SettleMode {
    type Err = CartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "readiness" | "ready" | "event" => Ok(SettleMode::Readiness),
            "delay" | "timer" => Ok(SettleMode::Delay),
            other => Err(CartError::InvalidConfig(format!(
                "Unknown settle mode: '{}'. Valid options: readiness, delay",
                other
            ))),
        }
    }
}

/// Resolved settle behavior handed to the client manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    Readiness,
    Delay(Duration),
}

// =============================================================================
// Session Settings
// =============================================================================

/// Login/logout behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub settle: SettleMode,

    /// Delay before switching to remote in `delay` mode (milliseconds).
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

fn default_settle_delay() -> u64 {
    300
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings {
            settle: SettleMode::default(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

// =============================================================================
// Local Settings
// =============================================================================

/// Anonymous cart persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalSettings {
    /// Persist the local cart across restarts.
    #[serde(default = "default_true")]
    pub persist: bool,

    /// Snapshot location. Defaults to the platform data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_path: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for LocalSettings {
    fn default() -> Self {
        LocalSettings {
            persist: true,
            snapshot_path: None,
        }
    }
}

// =============================================================================
// Main Cart Configuration
// =============================================================================

/// Complete cart configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default)]
    pub session: SessionSettings,

    #[serde(default)]
    pub local: LocalSettings,
}

impl CartConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// In-memory local cart, readiness settle. Used by tests and the demo.
    pub fn ephemeral() -> Self {
        CartConfig {
            local: LocalSettings {
                persist: false,
                snapshot_path: None,
            },
            ..Default::default()
        }
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (basket.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CartResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading cart config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load cart config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CartResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CartError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CartError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| CartError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Cart config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CartResult<()> {
        if self.session.settle == SettleMode::Delay {
            if self.session.settle_delay_ms == 0 {
                return Err(CartError::InvalidConfig(
                    "settle_delay_ms must be greater than 0 in delay mode".into(),
                ));
            }
            if self.session.settle_delay_ms > MAX_SETTLE_DELAY_MS {
                return Err(CartError::InvalidConfig(format!(
                    "settle_delay_ms must be at most {}",
                    MAX_SETTLE_DELAY_MS
                )));
            }
        }

        if let Some(ref path) = self.local.snapshot_path {
            if path.as_os_str().is_empty() {
                return Err(CartError::InvalidConfig("snapshot_path must not be empty".into()));
            }
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(mode) = std::env::var("BASKET_SETTLE") {
            match mode.parse() {
                Ok(parsed) => {
                    debug!(mode = %mode, "Overriding settle mode from environment");
                    self.session.settle = parsed;
                }
                Err(_) => warn!(mode = %mode, "Unknown settle mode in environment"),
            }
        }

        if let Ok(delay) = std::env::var("BASKET_SETTLE_DELAY_MS") {
            if let Ok(ms) = delay.parse::<u64>() {
                self.session.settle_delay_ms = ms;
            }
        }

        if let Ok(path) = std::env::var("BASKET_LOCAL_SNAPSHOT") {
            debug!(path = %path, "Overriding local snapshot path from environment");
            self.local.snapshot_path = Some(PathBuf::from(path));
        }

        if let Ok(persist) = std::env::var("BASKET_LOCAL_PERSIST") {
            match persist.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.local.persist = true,
                "0" | "false" | "no" => self.local.persist = false,
                _ => warn!(value = %persist, "Unknown BASKET_LOCAL_PERSIST value"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "basket", "cart")
            .map(|dirs| dirs.config_dir().join("basket.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Returns the settle behavior for the client manager.
    pub fn settle_strategy(&self) -> SettleStrategy {
        match self.session.settle {
            SettleMode::Readiness => SettleStrategy::Readiness,
            SettleMode::Delay => {
                SettleStrategy::Delay(Duration::from_millis(self.session.settle_delay_ms))
            }
        }
    }

    /// Snapshot file for the local cart, if persistence is on and a path
    /// can be determined.
    pub fn local_snapshot(&self) -> Option<SnapshotFile> {
        if !self.local.persist {
            return None;
        }
        match self.local.snapshot_path {
            Some(ref path) => Some(SnapshotFile::new(path.clone())),
            None => SnapshotFile::at_default_path(),
        }
    }
}
