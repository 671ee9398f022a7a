//! Error types for the fixture engine.
//!
//! Every variant is fatal for the operation that produced it: the loader never
//! retries or swallows an error, it propagates to the caller of
//! [`load`](crate::FixtureRegistry::load),
//! [`load_item`](crate::FixtureRegistry::load_item) or the scoped-use guard.

use thiserror::Error;

/// Errors that can occur while declaring, loading or unloading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// A resolution round made no progress while computed attributes remained.
	#[error(
		"Circular attribute dependency in {fixture}.{item}: {} cannot be resolved",
		attributes.join(", ")
	)]
	CircularAttributeDependency {
		/// Fixture owning the item.
		fixture: String,
		/// Item whose attributes form the cycle.
		item: String,
		/// Attributes still unresolved when the round stalled.
		attributes: Vec<String>,
	},

	/// Loading an item re-triggered an item that is already mid-load.
	#[error("Circular item dependency detected: {item}\n  Path: {path}")]
	CircularItemDependency {
		/// Qualified name of the item requested twice.
		item: String,
		/// Load chain in the form `A -> B -> A`.
		path: String,
		/// The attribute access failure that requested the item.
		#[source]
		cause: Box<FixtureError>,
	},

	/// A computed attribute reached its own item through a cross-item lookup.
	#[error(
		"Attribute '{attribute}' of {fixture}.{item} references its own item; \
		 read sibling attributes through AttrScope::get instead"
	)]
	SelfReferenceMisuse {
		/// Fixture owning the item.
		fixture: String,
		/// Item being resolved.
		item: String,
		/// Attribute that performed the lookup.
		attribute: String,
	},

	/// The backend broke its contract, or an item id does not belong here.
	#[error("Backend contract violation: {0}")]
	BackendContractViolation(String),

	/// Unload requested for an item or fixture that is not loaded.
	#[error("Reference count misuse: {0}")]
	ReferenceCountMisuse(String),

	/// No definition in the inheritance chain supplies a backend.
	#[error(
		"Fixture '{fixture}' has no backend; register one on the fixture or one of its ancestors"
	)]
	MissingBackend {
		/// Fixture whose item was being loaded or unloaded.
		fixture: String,
	},

	/// The item's instance was requested while it is not loaded.
	#[error("Fixture item {fixture}.{item} is not loaded")]
	NotLoaded {
		/// Fixture owning the item.
		fixture: String,
		/// Item name.
		item: String,
	},

	/// No fixture is registered under this name.
	#[error("Fixture not found: {0}")]
	UnknownFixture(String),

	/// The fixture (or its ancestors) has no item with this name.
	#[error("Fixture item not found: {fixture}.{item}")]
	UnknownItem {
		/// Fixture searched.
		fixture: String,
		/// Item name.
		item: String,
	},

	/// An attribute read named neither a value nor a computed attribute.
	#[error("Unknown attribute '{attribute}' on {fixture}.{item}")]
	UnknownAttribute {
		/// Fixture owning the item.
		fixture: String,
		/// Item name.
		item: String,
		/// Attribute name.
		attribute: String,
	},

	/// A fixture with this name is already registered.
	#[error("Fixture already registered: {0}")]
	DuplicateFixture(String),

	/// The same item name was declared twice in one fixture.
	#[error("Duplicate item '{item}' in fixture '{fixture}'")]
	DuplicateItem {
		/// Fixture being declared.
		fixture: String,
		/// Repeated item name.
		item: String,
	},

	/// A value could not be converted to the requested type.
	#[error("Invalid value for '{attribute}': {message}")]
	InvalidValue {
		/// Attribute being read.
		attribute: String,
		/// Conversion failure.
		message: String,
	},

	/// The chain of nested item loads grew beyond the configured limit.
	#[error(
		"Maximum load depth exceeded: {0}\nThis likely indicates an extremely deep or circular dependency chain."
	)]
	MaxDepthExceeded(usize),

	/// The backend failed to create or destroy an entity.
	#[error("Backend error: {0}")]
	Backend(String),

	/// A fixture document is structurally invalid.
	#[error("Invalid fixture document: {0}")]
	InvalidDocument(String),

	/// Settings could not be loaded.
	#[error("Settings error: {0}")]
	Settings(String),

	/// Unsupported document file extension.
	#[error("Unsupported file extension: {0}")]
	UnsupportedExtension(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// TOML deserialization error.
	#[error("TOML error: {0}")]
	TomlError(#[from] toml::de::Error),

	/// YAML serialization/deserialization error (when yaml feature is enabled).
	#[cfg(feature = "yaml")]
	#[error("YAML error: {0}")]
	YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;
