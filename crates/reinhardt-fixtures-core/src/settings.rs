//! Loader settings.
//!
//! Settings can be built in code, read from a TOML file or taken from
//! environment variables. Later sources are applied on top of earlier ones by
//! chaining [`FixtureSettings::merge_env`] after a file load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FixtureError, FixtureResult};

/// Default environment variable prefix.
pub const ENV_PREFIX: &str = "REINHARDT_FIXTURES_";

/// Default maximum length of a nested item-load chain.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Settings controlling the fixture loader.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures_core::FixtureSettings;
///
/// let settings = FixtureSettings::from_toml_str("max_depth = 8\nstrict_teardown = true").unwrap();
/// assert_eq!(settings.max_depth, 8);
/// assert!(settings.strict_teardown);
/// assert!(settings.leak_check);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSettings {
	/// Maximum number of items that may be mid-load at the same time.
	pub max_depth: usize,

	/// Panic when a scoped guard fails to unload its fixture on drop.
	///
	/// When disabled the failure is logged. A guard dropped during unwinding
	/// never panics.
	pub strict_teardown: bool,

	/// Warn when a registry is dropped while items are still loaded.
	pub leak_check: bool,
}

impl Default for FixtureSettings {
	fn default() -> Self {
		Self {
			max_depth: DEFAULT_MAX_DEPTH,
			strict_teardown: false,
			leak_check: true,
		}
	}
}

impl FixtureSettings {
	/// Creates default settings.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the maximum load-chain depth.
	pub fn with_max_depth(mut self, depth: usize) -> Self {
		self.max_depth = depth;
		self
	}

	/// Sets the strict teardown flag.
	pub fn with_strict_teardown(mut self, strict: bool) -> Self {
		self.strict_teardown = strict;
		self
	}

	/// Sets the leak check flag.
	pub fn with_leak_check(mut self, enabled: bool) -> Self {
		self.leak_check = enabled;
		self
	}

	/// Parses settings from TOML. Missing keys keep their defaults.
	pub fn from_toml_str(content: &str) -> FixtureResult<Self> {
		let settings: Self = toml::from_str(content)?;
		settings.validate()
	}

	/// Reads settings from a TOML file.
	pub fn from_file(path: &Path) -> FixtureResult<Self> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Reads settings from environment variables with the default prefix.
	pub fn from_env() -> FixtureResult<Self> {
		Self::default().merge_env(ENV_PREFIX)
	}

	/// Reads settings from environment variables with a custom prefix.
	pub fn from_env_with_prefix(prefix: &str) -> FixtureResult<Self> {
		Self::default().merge_env(prefix)
	}

	/// Overrides fields from `{prefix}MAX_DEPTH`, `{prefix}STRICT_TEARDOWN`
	/// and `{prefix}LEAK_CHECK` when they are set.
	pub fn merge_env(self, prefix: &str) -> FixtureResult<Self> {
		self.merge_vars(prefix, |key| std::env::var(key).ok())
	}

	fn merge_vars(
		mut self,
		prefix: &str,
		lookup: impl Fn(&str) -> Option<String>,
	) -> FixtureResult<Self> {
		if let Some(raw) = lookup(&format!("{prefix}MAX_DEPTH")) {
			self.max_depth = raw.trim().parse().map_err(|_| {
				FixtureError::Settings(format!("{prefix}MAX_DEPTH must be an integer, got '{raw}'"))
			})?;
		}
		if let Some(raw) = lookup(&format!("{prefix}STRICT_TEARDOWN")) {
			self.strict_teardown = parse_flag(&format!("{prefix}STRICT_TEARDOWN"), &raw)?;
		}
		if let Some(raw) = lookup(&format!("{prefix}LEAK_CHECK")) {
			self.leak_check = parse_flag(&format!("{prefix}LEAK_CHECK"), &raw)?;
		}
		self.validate()
	}

	fn validate(self) -> FixtureResult<Self> {
		if self.max_depth == 0 {
			return Err(FixtureError::Settings(
				"max_depth must be at least 1".to_string(),
			));
		}
		Ok(self)
	}
}

fn parse_flag(key: &str, raw: &str) -> FixtureResult<bool> {
	match raw.trim().to_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" => Ok(false),
		_ => Err(FixtureError::Settings(format!(
			"{key} must be a boolean, got '{raw}'"
		))),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;
	use std::io::Write;
	use tempfile::NamedTempFile;

	#[rstest]
	fn test_defaults() {
		let settings = FixtureSettings::default();
		assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
		assert!(!settings.strict_teardown);
		assert!(settings.leak_check);
	}

	#[rstest]
	fn test_builder() {
		let settings = FixtureSettings::new()
			.with_max_depth(3)
			.with_strict_teardown(true)
			.with_leak_check(false);
		assert_eq!(settings.max_depth, 3);
		assert!(settings.strict_teardown);
		assert!(!settings.leak_check);
	}

	#[rstest]
	fn test_partial_toml_keeps_defaults() {
		let settings = FixtureSettings::from_toml_str("leak_check = false").unwrap();
		assert_eq!(settings.max_depth, DEFAULT_MAX_DEPTH);
		assert!(!settings.leak_check);
	}

	#[rstest]
	fn test_zero_depth_rejected() {
		let result = FixtureSettings::from_toml_str("max_depth = 0");
		assert!(matches!(result, Err(FixtureError::Settings(_))));
	}

	#[rstest]
	fn test_invalid_toml() {
		let result = FixtureSettings::from_toml_str("max_depth = \"deep\"");
		assert!(matches!(result, Err(FixtureError::TomlError(_))));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = NamedTempFile::with_suffix(".toml").unwrap();
		writeln!(file, "max_depth = 12").unwrap();
		let settings = FixtureSettings::from_file(file.path()).unwrap();
		assert_eq!(settings.max_depth, 12);
	}

	#[rstest]
	fn test_merge_vars_overrides() {
		let vars: HashMap<&str, &str> = [
			("APP_MAX_DEPTH", "7"),
			("APP_STRICT_TEARDOWN", "yes"),
			("APP_LEAK_CHECK", "off"),
		]
		.into_iter()
		.collect();

		let settings = FixtureSettings::default()
			.merge_vars("APP_", |key| vars.get(key).map(|v| v.to_string()))
			.unwrap();

		assert_eq!(settings.max_depth, 7);
		assert!(settings.strict_teardown);
		assert!(!settings.leak_check);
	}

	#[rstest]
	#[case("APP_MAX_DEPTH", "many")]
	#[case("APP_LEAK_CHECK", "maybe")]
	fn test_merge_vars_rejects_garbage(#[case] key: &str, #[case] value: &str) {
		let result = FixtureSettings::default().merge_vars("APP_", |k| {
			(k == key).then(|| value.to_string())
		});
		assert!(matches!(result, Err(FixtureError::Settings(_))));
	}
}
