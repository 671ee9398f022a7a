//! Fixture document tests using files on disk.

mod common;

use std::io::Write;

use common::CountingBackend;
use reinhardt_fixtures_core::prelude::*;
use rstest::*;
use serde_json::json;
use tempfile::NamedTempFile;

const ACCOUNTS_JSON: &str = r#"{
	"fixtures": [
		{
			"name": "BasicAccounts",
			"backend": "accounts",
			"items": [
				{"name": "first", "fields": {"x": 42, "y": {"$self": "half"}, "half": 21}},
				{"name": "second", "fields": {"x": 11, "y": 99}}
			]
		},
		{
			"name": "DependentAccounts",
			"backend": "accounts",
			"items": [
				{"name": "fourth", "fields": {
					"x": {"$ref": "BasicAccounts.first"},
					"y": {"$ref": "BasicAccounts.second.y"}
				}}
			]
		}
	]
}"#;

fn write_document(suffix: &str, content: &str) -> NamedTempFile {
	let mut file = NamedTempFile::with_suffix(suffix).unwrap();
	file.write_all(content.as_bytes()).unwrap();
	file
}

#[rstest]
fn test_register_json_file() {
	let backend = CountingBackend::new();
	let file = write_document(".json", ACCOUNTS_JSON);
	let mut registry = FixtureRegistry::new();

	let ids = DocumentLoader::new()
		.with_backend("accounts", backend.clone())
		.register_file(&mut registry, file.path())
		.unwrap();
	assert_eq!(ids.len(), 2);

	registry
		.with_fixture(ids[1], |registry| {
			let fourth = registry.item_id(ids[1], "fourth")?;
			assert_eq!(registry.instance(fourth)?.get("y"), Some(&json!(99)));
			assert_eq!(registry.instance(fourth)?.get("x"), Some(&json!(1)));
			Ok(())
		})
		.unwrap();

	assert_eq!(backend.created(), 3);
	assert!(backend.live().is_empty());
}

#[rstest]
fn test_register_file_missing() {
	let mut registry = FixtureRegistry::new();
	let result = DocumentLoader::new().register_file(
		&mut registry,
		std::path::Path::new("/nonexistent/fixtures.json"),
	);
	assert!(matches!(result, Err(FixtureError::IoError(_))));
}

#[cfg(feature = "yaml")]
#[rstest]
fn test_register_yaml_file() {
	let backend = CountingBackend::new();
	let file = write_document(
		".yml",
		r#"
- name: DerivedAccounts
  backend: accounts
  items:
    - name: base
      fields: { x: 70, y: 77 }
    - name: fifth
      extends: base
      fields: { y: 81 }
"#,
	);
	let mut registry = FixtureRegistry::new();
	let ids = DocumentLoader::new()
		.with_backend("accounts", backend)
		.register_file(&mut registry, file.path())
		.unwrap();

	let fifth = registry.item_id(ids[0], "fifth").unwrap();
	let instance = registry.load_item(fifth).unwrap();
	assert_eq!(instance.get("x"), Some(&json!(70)));
	assert_eq!(instance.get("y"), Some(&json!(81)));
	registry.unload_item(fifth).unwrap();
}
