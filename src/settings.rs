//! Bridge settings
//!
//! Loaded from TOML:
//!
//! ```toml
//! [hydration]
//! defer_delay_ms = 1
//!
//! [query]
//! skip_redundant_refetch = true
//! ```
//!
//! Every section and key is optional; unknown keys are rejected.

use std::path::PathBuf;
use std::time::Duration;

use graphql_stores_core::DEFAULT_DEFER_DELAY;
use serde::{Deserialize, Serialize};

/// Longest accepted standalone unmark delay.
pub const MAX_DEFER_DELAY_MS: u64 = 60_000;

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	/// Hydration window settings.
	pub hydration: HydrationSettings,
	/// Query bridge settings.
	pub query: QuerySettings,
}

/// Settings for the restoring window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HydrationSettings {
	/// Delay before a standalone restore closes its window, in milliseconds.
	///
	/// Zero closes it on the next scheduler tick.
	pub defer_delay_ms: u64,
}

impl HydrationSettings {
	/// The delay as a [`Duration`].
	pub fn defer_delay(&self) -> Duration {
		Duration::from_millis(self.defer_delay_ms)
	}
}

impl Default for HydrationSettings {
	fn default() -> Self {
		Self {
			defer_delay_ms: DEFAULT_DEFER_DELAY.as_millis() as u64,
		}
	}
}

/// Settings for query handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySettings {
	/// Answer `refetch` from the current result when nobody ever subscribed
	/// and the variables did not change.
	pub skip_redundant_refetch: bool,
}

impl Default for QuerySettings {
	fn default() -> Self {
		Self {
			skip_redundant_refetch: true,
		}
	}
}

impl Settings {
	/// Creates settings with every default.
	pub fn new() -> Self {
		Self::default()
	}

	/// Parses and validates settings from TOML text.
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		let settings: Settings = toml::from_str(contents)
			.map_err(|e| SettingsError::ParseError(format!("TOML parse error: {}", e)))?;
		settings.validate()?;
		Ok(settings)
	}

	/// Loads and validates settings from a TOML file.
	pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
		let path = path.into();
		let contents = std::fs::read_to_string(&path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;
		Self::from_toml_str(&contents)
	}

	/// Checks that every value is within its accepted range.
	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.hydration.defer_delay_ms > MAX_DEFER_DELAY_MS {
			return Err(SettingsError::ValidationError(format!(
				"hydration.defer_delay_ms must be at most {} (got {})",
				MAX_DEFER_DELAY_MS, self.hydration.defer_delay_ms
			)));
		}
		Ok(())
	}
}

/// Errors raised while loading settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Validation error: {0}")]
	ValidationError(String),
}
