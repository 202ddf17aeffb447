//! # Scoreboard Settings
//!
//! Values loaded once at startup and handed to boards at construction.
//! Boards never read settings again while rendering.
//!
//! ```toml
//! update_interval_ticks = 20
//! capability_tier = "full"
//! prefix = "&7Oroboros //"
//! tick_millis = 50
//! ```
//!
//! Older files used `update_delay_ticks` and `plugin_prefix`. Those keys
//! are still accepted. The retired `locale` key is ignored.

use std::path::Path;

use serde::Deserialize;

use crate::dedup::CapabilityTier;
use crate::error::{ScoreboardError, ScoreboardResult};
use crate::{DEFAULT_UPDATE_INTERVAL_TICKS, HOST_TICK_MILLIS};

/// Scoreboard configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScoreboardSettings {
    /// Host ticks between two frames. Default: 20.
    #[serde(alias = "update_delay_ticks")]
    pub update_interval_ticks: u32,

    /// Display tier of the connected clients. Default: full.
    pub capability_tier: CapabilityTier,

    /// Prefix of operator log events, `&` color codes allowed.
    /// Logged without its color codes.
    #[serde(alias = "plugin_prefix")]
    pub prefix: String,

    /// Length of one host tick for the threaded scheduler. Default: 50.
    pub tick_millis: u64,
}

impl Default for ScoreboardSettings {
    fn default() -> Self {
        Self {
            update_interval_ticks: DEFAULT_UPDATE_INTERVAL_TICKS,
            capability_tier: CapabilityTier::Full,
            prefix: "&7Oroboros //".to_string(),
            tick_millis: HOST_TICK_MILLIS,
        }
    }
}

/// Construction values for one board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Board title, `&` color codes allowed.
    pub title: String,
    /// Host ticks between two frames.
    pub update_interval_ticks: u32,
    /// Display tier.
    pub tier: CapabilityTier,
    /// Operator log prefix.
    pub log_prefix: String,
}

impl ScoreboardSettings {
    /// Parses and validates settings from TOML text.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the text is not valid TOML or a value is out of range.
    pub fn from_toml_str(text: &str) -> ScoreboardResult<Self> {
        let settings: Self =
            toml::from_str(text).map_err(|e| ScoreboardError::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is invalid.
    pub fn load(path: impl AsRef<Path>) -> ScoreboardResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScoreboardError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;

        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            interval_ticks = settings.update_interval_ticks,
            tier = ?settings.capability_tier,
            "scoreboard settings loaded"
        );
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns error on a zero update interval or tick length.
    pub fn validate(&self) -> ScoreboardResult<()> {
        if self.update_interval_ticks == 0 {
            return Err(ScoreboardError::InvalidConfig(
                "update_interval_ticks must be at least 1".to_string(),
            ));
        }
        if self.tick_millis == 0 {
            return Err(ScoreboardError::InvalidConfig(
                "tick_millis must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Construction values for a board with the given title.
    #[must_use]
    pub fn board_config(&self, title: impl Into<String>) -> BoardConfig {
        BoardConfig {
            title: title.into(),
            update_interval_ticks: self.update_interval_ticks,
            tier: self.capability_tier,
            log_prefix: self.prefix.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let settings = ScoreboardSettings::from_toml_str("").unwrap();
        assert_eq!(settings, ScoreboardSettings::default());
        assert_eq!(settings.update_interval_ticks, 20);
        assert_eq!(settings.prefix, "&7Oroboros //");
    }

    #[test]
    fn test_full_file() {
        let settings = ScoreboardSettings::from_toml_str(
            r#"
            update_interval_ticks = 5
            capability_tier = "reduced"
            prefix = "&cArena //"
            tick_millis = 25
            "#,
        )
        .unwrap();

        assert_eq!(settings.update_interval_ticks, 5);
        assert_eq!(settings.capability_tier, CapabilityTier::Reduced);
        assert_eq!(settings.prefix, "&cArena //");
        assert_eq!(settings.tick_millis, 25);
    }

    #[test]
    fn test_legacy_keys() {
        let settings = ScoreboardSettings::from_toml_str(
            r#"
            update_delay_ticks = 40
            plugin_prefix = "&7Old //"
            locale = "cs"
            "#,
        )
        .unwrap();

        assert_eq!(settings.update_interval_ticks, 40);
        assert_eq!(settings.prefix, "&7Old //");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = ScoreboardSettings::from_toml_str("update_interval_ticks = 0").unwrap_err();
        assert!(matches!(err, ScoreboardError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_tier_rejected() {
        let err = ScoreboardSettings::from_toml_str(r#"capability_tier = "huge""#).unwrap_err();
        assert!(matches!(err, ScoreboardError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ScoreboardSettings::load("/nonexistent/scoreboard.toml").unwrap_err();
        assert!(matches!(err, ScoreboardError::InvalidConfig(_)));
    }

    #[test]
    fn test_board_config() {
        let settings = ScoreboardSettings {
            update_interval_ticks: 7,
            capability_tier: CapabilityTier::Reduced,
            ..ScoreboardSettings::default()
        };
        let config = settings.board_config("&6Lobby");
        assert_eq!(
            config,
            BoardConfig {
                title: "&6Lobby".to_string(),
                update_interval_ticks: 7,
                tier: CapabilityTier::Reduced,
                log_prefix: "&7Oroboros //".to_string(),
            }
        );
    }
}
