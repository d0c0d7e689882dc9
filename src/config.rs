//! Engine configuration.
//!
//! Embedders usually deserialise [`EngineConfig`] from their own settings
//! file. [`EngineConfig::from_env`] covers deployments that configure the
//! engine through environment variables only.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable overriding the invitation validity window, in hours.
pub const INVITATION_TTL_HOURS_VAR: &str = "TENANTRY_INVITATION_TTL_HOURS";

/// Default invitation validity window: seven days.
pub const DEFAULT_INVITATION_TTL_HOURS: u32 = 7 * 24;

/// Longest accepted invitation validity window: one year.
const MAX_INVITATION_TTL_HOURS: u32 = 366 * 24;

/// Tunables for the authorization and tenancy engine.
///
/// # Examples
///
/// ```
/// use tenantry::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.invitation_ttl().num_days(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEngineConfig")]
pub struct EngineConfig {
    invitation_ttl_hours: u32,
}

/// Unvalidated wire form of [`EngineConfig`].
#[derive(Deserialize)]
#[serde(default)]
struct RawEngineConfig {
    invitation_ttl_hours: u32,
}

impl Default for RawEngineConfig {
    fn default() -> Self {
        Self {
            invitation_ttl_hours: DEFAULT_INVITATION_TTL_HOURS,
        }
    }
}

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = ConfigError;

    fn try_from(raw: RawEngineConfig) -> Result<Self, Self::Error> {
        Self::with_invitation_ttl_hours(raw.invitation_ttl_hours)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invitation_ttl_hours: DEFAULT_INVITATION_TTL_HOURS,
        }
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set but does not parse as the expected type.
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Raw value that failed to parse.
        value: String,
    },

    /// The invitation TTL is zero or exceeds the supported maximum.
    #[error("invitation TTL of {0} hours is outside 1..=8784")]
    InvitationTtlOutOfRange(u32),
}

impl EngineConfig {
    /// Builds a configuration with an explicit invitation TTL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvitationTtlOutOfRange`] when `hours` is zero
    /// or longer than a year.
    pub const fn with_invitation_ttl_hours(hours: u32) -> Result<Self, ConfigError> {
        if hours == 0 || hours > MAX_INVITATION_TTL_HOURS {
            return Err(ConfigError::InvitationTtlOutOfRange(hours));
        }
        Ok(Self {
            invitation_ttl_hours: hours,
        })
    }

    /// Loads configuration from the process environment, falling back to
    /// defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let Some(raw) = lookup(INVITATION_TTL_HOURS_VAR) else {
            return Ok(Self::default());
        };
        let hours = raw
            .trim()
            .parse::<u32>()
            .map_err(|_| ConfigError::InvalidNumber {
                name: INVITATION_TTL_HOURS_VAR,
                value: raw.clone(),
            })?;
        Self::with_invitation_ttl_hours(hours)
    }

    /// How long an issued invitation stays acceptable, in hours.
    #[must_use]
    pub const fn invitation_ttl_hours(&self) -> u32 {
        self.invitation_ttl_hours
    }

    /// Returns the invitation validity window.
    #[must_use]
    pub fn invitation_ttl(&self) -> TimeDelta {
        TimeDelta::hours(i64::from(self.invitation_ttl_hours))
    }
}
