//! Registration of fixture documents.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;

use super::{DocumentParser, FieldDirective, FixtureDocument, ItemSpec};
use crate::backend::FixtureBackend;
use crate::definition::{FixtureBuilder, FixtureId, ItemBuilder};
use crate::error::{FixtureError, FixtureResult};
use crate::registry::FixtureRegistry;

/// Turns fixture documents into registered fixtures.
///
/// Backends are referenced by name from the documents and must be added with
/// [`with_backend`](Self::with_backend) first. Parents named in `extends` must
/// be registered already or appear earlier in the same document, and an item
/// `extends` must name an earlier item of its fixture or an inherited one. `$ref`
/// directives are looked up by name when the item is loaded, so they may
/// point at fixtures registered later.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use reinhardt_fixtures_core::document::{DocumentFormat, DocumentLoader, DocumentParser};
/// use reinhardt_fixtures_core::{
///     FieldValues, FixtureBackend, FixtureRegistry, FixtureResult, Instance, ItemDescriptor,
/// };
///
/// struct EchoBackend;
///
/// impl FixtureBackend for EchoBackend {
///     fn create_instance(&self, _: &ItemDescriptor, values: &FieldValues) -> FixtureResult<Option<Instance>> {
///         Ok(Some(Instance::new(values.clone())))
///     }
///
///     fn destroy_instance(&self, _: &ItemDescriptor, _: &Instance) -> FixtureResult<()> {
///         Ok(())
///     }
/// }
///
/// let document = DocumentParser::new()
///     .parse_str(
///         r#"[{"name": "Points", "backend": "echo", "items": [
///             {"name": "origin", "fields": {"x": 0, "y": {"$self": "x"}}}
///         ]}]"#,
///         DocumentFormat::Json,
///     )
///     .unwrap();
///
/// let mut registry = FixtureRegistry::new();
/// let ids = DocumentLoader::new()
///     .with_backend("echo", Arc::new(EchoBackend))
///     .register(&mut registry, &document)
///     .unwrap();
///
/// let origin = registry.item_id(ids[0], "origin").unwrap();
/// assert_eq!(registry.load_item(origin).unwrap().get("y"), Some(&serde_json::json!(0)));
/// registry.unload_item(origin).unwrap();
/// ```
#[derive(Default)]
pub struct DocumentLoader {
	backends: IndexMap<String, Arc<dyn FixtureBackend>>,
	parser: DocumentParser,
}

impl DocumentLoader {
	/// Creates a loader without backends.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes a backend available to documents under `name`.
	pub fn with_backend(mut self, name: impl Into<String>, backend: Arc<dyn FixtureBackend>) -> Self {
		self.backends.insert(name.into(), backend);
		self
	}

	/// Parses a document file and registers its fixtures.
	pub fn register_file(
		&self,
		registry: &mut FixtureRegistry,
		path: &Path,
	) -> FixtureResult<Vec<FixtureId>> {
		let document = self.parser.parse_file(path)?;
		self.register(registry, &document)
	}

	/// Registers every fixture of a document, returning their ids in document
	/// order.
	///
	/// Backend names, parent fixtures, item bases named by `extends` and
	/// fixture-name clashes are checked for the whole document before anything
	/// is registered.
	pub fn register(
		&self,
		registry: &mut FixtureRegistry,
		document: &FixtureDocument,
	) -> FixtureResult<Vec<FixtureId>> {
		self.parser.validate(document)?;
		self.check_references(registry, document)?;

		let mut ids = Vec::with_capacity(document.fixtures.len());
		for spec in &document.fixtures {
			let mut builder = FixtureBuilder::new(spec.name.as_str());
			for parent in &spec.extends {
				builder = builder.extends(registry.fixture_id(parent)?);
			}
			if let Some(name) = &spec.backend {
				builder = builder.with_backend(self.backend(name)?);
			}
			for item in &spec.items {
				builder = builder.with_item(build_item(item)?);
			}
			ids.push(registry.register(builder)?);
		}
		tracing::debug!(fixtures = ids.len(), "Registered fixture document");
		Ok(ids)
	}

	fn backend(&self, name: &str) -> FixtureResult<Arc<dyn FixtureBackend>> {
		self.backends.get(name).cloned().ok_or_else(|| {
			FixtureError::InvalidDocument(format!("backend '{}' is not registered", name))
		})
	}

	fn check_references(
		&self,
		registry: &FixtureRegistry,
		document: &FixtureDocument,
	) -> FixtureResult<()> {
		// Item names visible in each fixture of the document, inherited included.
		let mut declared: HashMap<&str, HashSet<String>> = HashMap::new();
		for spec in &document.fixtures {
			if registry.fixture_id(&spec.name).is_ok() {
				return Err(FixtureError::DuplicateFixture(spec.name.clone()));
			}
			if let Some(name) = &spec.backend {
				self.backend(name)?;
			}

			let mut visible = HashSet::new();
			for parent in &spec.extends {
				match declared.get(parent.as_str()) {
					Some(items) => visible.extend(items.iter().cloned()),
					None => {
						for ancestor in registry.linearize(registry.fixture_id(parent)?) {
							visible.extend(registry.definition(ancestor)?.items().keys().cloned());
						}
					}
				}
			}
			let mut own = HashSet::new();
			for item in &spec.items {
				if let Some(base) = &item.extends {
					if !own.contains(base) && !visible.contains(base) {
						return Err(FixtureError::UnknownItem {
							fixture: spec.name.clone(),
							item: base.clone(),
						});
					}
				}
				own.insert(item.name.clone());
			}
			visible.extend(own);
			declared.insert(spec.name.as_str(), visible);
		}
		Ok(())
	}
}

impl fmt::Debug for DocumentLoader {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DocumentLoader")
			.field("backends", &self.backends.keys().collect::<Vec<_>>())
			.finish()
	}
}

fn build_item(spec: &ItemSpec) -> FixtureResult<ItemBuilder> {
	let mut item = ItemBuilder::new(spec.name.as_str());
	if let Some(base) = &spec.extends {
		item = item.extends(base.as_str());
	}
	for (name, value) in &spec.fields {
		item = match FieldDirective::parse(value)? {
			FieldDirective::Literal(value) => item.value(name.as_str(), value),
			FieldDirective::Sibling(attribute) => {
				item.computed(name.as_str(), move |scope| Ok(scope.get(&attribute)?.clone()))
			}
			FieldDirective::PrimaryKey { fixture, item: target } => {
				item.computed(name.as_str(), move |scope| {
					let id = scope.lookup(&fixture, &target)?;
					scope.primary_key(id)
				})
			}
			FieldDirective::Field {
				fixture,
				item: target,
				field,
			} => item.computed(name.as_str(), move |scope| {
				let id = scope.lookup(&fixture, &target)?;
				Ok(scope.field(id, &field)?.clone())
			}),
		};
	}
	Ok(item)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::document::DocumentFormat;
	use crate::test_support::RecordingBackend;
	use rstest::{fixture, rstest};
	use serde_json::json;

	#[fixture]
	fn backend() -> Arc<RecordingBackend> {
		Arc::new(RecordingBackend::new())
	}

	fn parse(content: &str) -> FixtureDocument {
		DocumentParser::new()
			.parse_str(content, DocumentFormat::Json)
			.unwrap()
	}

	#[rstest]
	fn test_register_resolves_directives(backend: Arc<RecordingBackend>) {
		let document = parse(
			r#"[
				{"name": "Basic", "backend": "rec", "items": [
					{"name": "first", "fields": {"x": 42, "y": {"$self": "x"}}},
					{"name": "second", "fields": {"x": 11, "y": 99}}
				]},
				{"name": "Dependent", "backend": "rec", "items": [
					{"name": "fourth", "fields": {
						"x": {"$ref": "Basic.first"},
						"y": {"$ref": "Basic.second.y"}
					}}
				]}
			]"#,
		);
		let mut registry = FixtureRegistry::new();
		let ids = DocumentLoader::new()
			.with_backend("rec", backend.clone())
			.register(&mut registry, &document)
			.unwrap();
		assert_eq!(ids.len(), 2);

		let fourth = registry.item_id(ids[1], "fourth").unwrap();
		let instance = registry.load_item(fourth).unwrap().clone();
		let first = registry.item_id(ids[0], "first").unwrap();
		assert_eq!(instance.get("x"), registry.instance(first).unwrap().get("id"));
		assert_eq!(instance.get("y"), Some(&json!(99)));
		assert_eq!(registry.instance(first).unwrap().get("y"), Some(&json!(42)));

		registry.unload_item(fourth).unwrap();
		assert!(registry.loaded_items().is_empty());
	}

	#[rstest]
	fn test_extends_and_backend_inheritance(backend: Arc<RecordingBackend>) {
		let document = parse(
			r#"[
				{"name": "Basic", "backend": "rec", "items": [{"name": "first", "fields": {"x": 1}}]},
				{"name": "Advanced", "extends": ["Basic"], "items": [
					{"name": "third", "extends": "first", "fields": {"y": 4}}
				]}
			]"#,
		);
		let mut registry = FixtureRegistry::new();
		let ids = DocumentLoader::new()
			.with_backend("rec", backend)
			.register(&mut registry, &document)
			.unwrap();

		assert!(registry.definition(ids[1]).unwrap().has_backend());
		let third = registry.item_id(ids[1], "third").unwrap();
		let descriptor = registry.descriptor(third).unwrap();
		assert_eq!(descriptor.value("x"), Some(&json!(1)));
		assert_eq!(descriptor.value("y"), Some(&json!(4)));
	}

	#[rstest]
	fn test_unknown_backend_registers_nothing(backend: Arc<RecordingBackend>) {
		let document = parse(
			r#"[
				{"name": "Good", "backend": "rec"},
				{"name": "Bad", "backend": "missing"}
			]"#,
		);
		let mut registry = FixtureRegistry::new();
		let result = DocumentLoader::new()
			.with_backend("rec", backend)
			.register(&mut registry, &document);

		assert!(matches!(result, Err(FixtureError::InvalidDocument(_))));
		assert_eq!(registry.fixtures().count(), 0);
	}

	#[rstest]
	fn test_unknown_parent_rejected() {
		let document = parse(r#"[{"name": "Child", "extends": ["Later"]}, {"name": "Later"}]"#);
		let mut registry = FixtureRegistry::new();
		assert!(matches!(
			DocumentLoader::new().register(&mut registry, &document),
			Err(FixtureError::UnknownFixture(name)) if name == "Later"
		));
	}

	#[rstest]
	#[case::unknown_base(r#"[
		{"name": "Good", "backend": "rec", "items": [{"name": "first"}]},
		{"name": "Bad", "extends": ["Good"], "items": [{"name": "third", "extends": "missing"}]}
	]"#)]
	#[case::later_sibling(r#"[
		{"name": "Good", "backend": "rec", "items": [{"name": "first"}]},
		{"name": "Bad", "backend": "rec", "items": [
			{"name": "third", "extends": "fourth"},
			{"name": "fourth"}
		]}
	]"#)]
	fn test_unknown_item_base_registers_nothing(backend: Arc<RecordingBackend>, #[case] content: &str) {
		let mut registry = FixtureRegistry::new();
		let result = DocumentLoader::new()
			.with_backend("rec", backend)
			.register(&mut registry, &parse(content));

		assert!(matches!(
			result,
			Err(FixtureError::UnknownItem { ref fixture, .. }) if fixture == "Bad"
		));
		assert_eq!(registry.fixtures().count(), 0);
	}

	#[rstest]
	fn test_item_base_inherited_from_registered_fixture(backend: Arc<RecordingBackend>) {
		let loader = DocumentLoader::new().with_backend("rec", backend);
		let mut registry = FixtureRegistry::new();
		loader
			.register(
				&mut registry,
				&parse(r#"[{"name": "Base", "backend": "rec", "items": [{"name": "first", "fields": {"x": 1}}]}]"#),
			)
			.unwrap();
		let ids = loader
			.register(
				&mut registry,
				&parse(r#"[
					{"name": "Middle", "extends": ["Base"]},
					{"name": "Leaf", "extends": ["Middle"], "items": [
						{"name": "copy", "extends": "first", "fields": {"y": 2}}
					]}
				]"#),
			)
			.unwrap();

		let copy = registry.item_id(ids[1], "copy").unwrap();
		assert_eq!(registry.descriptor(copy).unwrap().value("x"), Some(&json!(1)));
	}

	#[rstest]
	fn test_reference_to_fixture_registered_later(backend: Arc<RecordingBackend>) {
		let loader = DocumentLoader::new().with_backend("rec", backend);
		let mut registry = FixtureRegistry::new();
		let early = loader
			.register(
				&mut registry,
				&parse(r#"[{"name": "Early", "backend": "rec", "items": [
					{"name": "item", "fields": {"target": {"$ref": "Late.item"}}}
				]}]"#),
			)
			.unwrap();
		loader
			.register(
				&mut registry,
				&parse(r#"[{"name": "Late", "backend": "rec", "items": [{"name": "item"}]}]"#),
			)
			.unwrap();

		registry.load(early[0]).unwrap();
		assert_eq!(registry.loaded_items().len(), 2);
		registry.unload(early[0]).unwrap();
		assert!(registry.loaded_items().is_empty());
	}
}
