//! Fixture document formats.

use std::path::Path;

/// Supported fixture document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub enum DocumentFormat {
	/// JSON format (default).
	#[default]
	Json,

	/// YAML format (requires `yaml` feature).
	Yaml,
}

impl DocumentFormat {
	/// Determines the document format from a file extension.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures_core::document::DocumentFormat;
	/// assert_eq!(DocumentFormat::from_extension("json"), Some(DocumentFormat::Json));
	/// assert_eq!(DocumentFormat::from_extension("YML"), Some(DocumentFormat::Yaml));
	/// assert_eq!(DocumentFormat::from_extension("toml"), None);
	/// ```
	pub fn from_extension(ext: &str) -> Option<Self> {
		match ext.to_lowercase().as_str() {
			"json" => Some(Self::Json),
			"yaml" | "yml" => Some(Self::Yaml),
			_ => None,
		}
	}

	/// Determines the document format from a file path.
	pub fn from_path(path: &Path) -> Option<Self> {
		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(Self::from_extension)
	}

	/// Returns the canonical file extension.
	pub fn extension(&self) -> &'static str {
		match self {
			Self::Json => "json",
			Self::Yaml => "yaml",
		}
	}
}

impl std::fmt::Display for DocumentFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Json => write!(f, "JSON"),
			Self::Yaml => write!(f, "YAML"),
		}
	}
}
