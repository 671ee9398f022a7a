//! Fixture document parsing.
//!
//! Documents are either an object with a `fixtures` list or a bare list of
//! fixture declarations. Parsing validates names and directive syntax so that
//! registration only fails on problems that depend on the registry.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::{DocumentFormat, FieldDirective, FixtureDocument, FixtureSpec};
use crate::error::{FixtureError, FixtureResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocument {
	Wrapped(FixtureDocument),
	Bare(Vec<FixtureSpec>),
}

impl From<RawDocument> for FixtureDocument {
	fn from(raw: RawDocument) -> Self {
		match raw {
			RawDocument::Wrapped(document) => document,
			RawDocument::Bare(fixtures) => Self { fixtures },
		}
	}
}

/// Parser for fixture documents.
///
/// Supports JSON and YAML (YAML requires the `yaml` feature).
#[derive(Debug, Default)]
pub struct DocumentParser;

impl DocumentParser {
	/// Creates a new document parser.
	pub fn new() -> Self {
		Self
	}

	/// Parses a document file, detecting the format from its extension.
	///
	/// # Errors
	///
	/// Returns an error if:
	/// - The file extension is not recognized
	/// - The file cannot be read
	/// - The content is not a valid document
	pub fn parse_file(&self, path: &Path) -> FixtureResult<FixtureDocument> {
		let format = DocumentFormat::from_path(path).ok_or_else(|| {
			FixtureError::UnsupportedExtension(
				path.extension()
					.and_then(|e| e.to_str())
					.unwrap_or("(none)")
					.to_string(),
			)
		})?;
		let content = std::fs::read_to_string(path)?;
		tracing::debug!(path = %path.display(), format = %format, "Parsing fixture document");
		self.parse_str(&content, format)
	}

	/// Parses a document from a string.
	pub fn parse_str(&self, content: &str, format: DocumentFormat) -> FixtureResult<FixtureDocument> {
		let document = match format {
			DocumentFormat::Json => self.parse_json(content)?,
			DocumentFormat::Yaml => self.parse_yaml(content)?,
		};
		self.validate(&document)?;
		Ok(document)
	}

	fn parse_json(&self, content: &str) -> FixtureResult<FixtureDocument> {
		let raw: RawDocument = serde_json::from_str(content)?;
		Ok(raw.into())
	}

	#[cfg(feature = "yaml")]
	fn parse_yaml(&self, content: &str) -> FixtureResult<FixtureDocument> {
		let raw: RawDocument = serde_yaml::from_str(content)?;
		Ok(raw.into())
	}

	#[cfg(not(feature = "yaml"))]
	fn parse_yaml(&self, _content: &str) -> FixtureResult<FixtureDocument> {
		Err(FixtureError::UnsupportedExtension(
			"YAML support requires the 'yaml' feature".to_string(),
		))
	}

	/// Checks names and directives of a parsed document.
	pub fn validate(&self, document: &FixtureDocument) -> FixtureResult<()> {
		let mut fixtures = HashSet::new();
		for spec in &document.fixtures {
			validate_name("fixture", &spec.name)?;
			if !fixtures.insert(spec.name.as_str()) {
				return Err(FixtureError::DuplicateFixture(spec.name.clone()));
			}

			let mut items = HashSet::new();
			for item in &spec.items {
				validate_name("item", &item.name)?;
				if !items.insert(item.name.as_str()) {
					return Err(FixtureError::DuplicateItem {
						fixture: spec.name.clone(),
						item: item.name.clone(),
					});
				}
				for (field, value) in &item.fields {
					if let FieldDirective::Sibling(target) = FieldDirective::parse(value)? {
						if &target == field {
							return Err(FixtureError::InvalidDocument(format!(
								"field '{}' of {}.{} reads itself",
								field, spec.name, item.name
							)));
						}
					}
				}
			}
		}
		Ok(())
	}
}

fn validate_name(kind: &str, name: &str) -> FixtureResult<()> {
	if name.is_empty() || name.contains('.') {
		return Err(FixtureError::InvalidDocument(format!(
			"{} name '{}' must be non-empty and must not contain '.'",
			kind, name
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;
	use std::io::Write;
	use tempfile::NamedTempFile;

	const ACCOUNTS: &str = r#"{
		"fixtures": [
			{
				"name": "BasicAccounts",
				"backend": "accounts",
				"items": [
					{"name": "first", "fields": {"x": 42, "y": 21}},
					{"name": "second", "fields": {"x": 11, "y": 99}}
				]
			},
			{
				"name": "AdvancedAccounts",
				"extends": ["BasicAccounts"],
				"items": [{"name": "third", "fields": {"x": 2, "y": 4}}]
			}
		]
	}"#;

	#[rstest]
	fn test_parse_wrapped_json() {
		let document = DocumentParser::new()
			.parse_str(ACCOUNTS, DocumentFormat::Json)
			.unwrap();

		assert_eq!(document.fixtures.len(), 2);
		assert_eq!(document.fixtures[0].backend.as_deref(), Some("accounts"));
		assert_eq!(document.fixtures[1].extends, vec!["BasicAccounts".to_string()]);
		assert_eq!(document.fixtures[0].items[1].fields["y"], json!(99));
	}

	#[rstest]
	fn test_parse_bare_list() {
		let document = DocumentParser::new()
			.parse_str(r#"[{"name": "Solo", "items": [{"name": "only"}]}]"#, DocumentFormat::Json)
			.unwrap();

		assert_eq!(document.fixtures[0].name, "Solo");
		assert!(document.fixtures[0].items[0].fields.is_empty());
	}

	#[rstest]
	fn test_field_order_preserved() {
		let document = DocumentParser::new()
			.parse_str(
				r#"[{"name": "F", "items": [{"name": "i", "fields": {"z": 1, "a": 2, "m": 3}}]}]"#,
				DocumentFormat::Json,
			)
			.unwrap();
		let names: Vec<&str> = document.fixtures[0].items[0]
			.fields
			.keys()
			.map(String::as_str)
			.collect();
		assert_eq!(names, vec!["z", "a", "m"]);
	}

	#[rstest]
	#[case(r#"[{"name": "A"}, {"name": "A"}]"#)]
	#[case(r#"[{"name": "A", "items": [{"name": "x"}, {"name": "x"}]}]"#)]
	#[case(r#"[{"name": "A.B"}]"#)]
	#[case(r#"[{"name": "A", "items": [{"name": "x", "fields": {"y": {"$ref": "Nope"}}}]}]"#)]
	#[case(r#"[{"name": "A", "items": [{"name": "x", "fields": {"y": {"$self": "y"}}}]}]"#)]
	fn test_invalid_documents_rejected(#[case] content: &str) {
		assert!(
			DocumentParser::new()
				.parse_str(content, DocumentFormat::Json)
				.is_err()
		);
	}

	#[rstest]
	fn test_malformed_json_is_json_error() {
		let result = DocumentParser::new().parse_str("{not json", DocumentFormat::Json);
		assert!(matches!(result, Err(FixtureError::JsonError(_))));
	}

	#[rstest]
	fn test_parse_file() {
		let mut file = NamedTempFile::with_suffix(".json").unwrap();
		file.write_all(ACCOUNTS.as_bytes()).unwrap();

		let document = DocumentParser::new().parse_file(file.path()).unwrap();
		assert_eq!(document.fixtures.len(), 2);
	}

	#[rstest]
	fn test_parse_file_unknown_extension() {
		let file = NamedTempFile::with_suffix(".xml").unwrap();
		assert!(matches!(
			DocumentParser::new().parse_file(file.path()),
			Err(FixtureError::UnsupportedExtension(ext)) if ext == "xml"
		));
	}

	#[cfg(feature = "yaml")]
	#[rstest]
	fn test_parse_yaml() {
		let content = r#"
fixtures:
  - name: DerivedAccounts
    backend: accounts
    items:
      - name: base
        fields: { x: 70, y: 77 }
      - name: fifth
        extends: base
        fields:
          y: 81
          label: { $self: y }
"#;
		let document = DocumentParser::new()
			.parse_str(content, DocumentFormat::Yaml)
			.unwrap();
		let fifth = &document.fixtures[0].items[1];
		assert_eq!(fifth.extends.as_deref(), Some("base"));
		assert_eq!(fifth.fields["label"], json!({"$self": "y"}));
	}

	#[cfg(not(feature = "yaml"))]
	#[rstest]
	fn test_yaml_requires_feature() {
		assert!(matches!(
			DocumentParser::new().parse_str("fixtures: []", DocumentFormat::Yaml),
			Err(FixtureError::UnsupportedExtension(_))
		));
	}
}
