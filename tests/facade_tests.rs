//! Facade re-export tests.

use std::sync::Arc;

use reinhardt_fixtures::document::{DocumentFormat, DocumentLoader, DocumentParser};
use reinhardt_fixtures::{FixtureRegistry, FixtureSettings};
use rstest::*;
use serde_json::json;

#[cfg(feature = "memory")]
#[rstest]
fn test_document_against_memory_store() {
	use reinhardt_fixtures::{EntitySchema, MemoryStore};

	let store = MemoryStore::new();
	store
		.register(EntitySchema::new("Account").with_default("y", 1).with_index("x"))
		.unwrap();
	let document = DocumentParser::new()
		.parse_str(
			r#"[{"name": "Accounts", "backend": "account", "items": [
				{"name": "first", "fields": {"x": 42}},
				{"name": "copy", "fields": {"x": {"$ref": "Accounts.first.x"}}}
			]}]"#,
			DocumentFormat::Json,
		)
		.unwrap();

	let mut registry = FixtureRegistry::with_settings(FixtureSettings::default());
	let ids = DocumentLoader::new()
		.with_backend("account", Arc::new(store.backend("Account")))
		.register(&mut registry, &document)
		.unwrap();

	registry
		.with_fixture(ids[0], |_| {
			let rows = store.find_by("Account", "x", &json!(42)).unwrap();
			assert_eq!(rows.len(), 2);
			assert!(rows.iter().all(|row| row["y"] == json!(1)));
			Ok(())
		})
		.unwrap();
	assert!(store.is_empty());
}

#[rstest]
fn test_settings_reexported() {
	let settings = FixtureSettings::from_toml_str("leak_check = false").unwrap();
	assert!(!settings.leak_check);
	assert_eq!(settings.max_depth, 100);
}
