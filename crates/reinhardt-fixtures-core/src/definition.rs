//! Fixture definitions and their builders.
//!
//! A fixture is declared with a [`FixtureBuilder`] holding [`ItemBuilder`]s and
//! registered through [`FixtureRegistry::register`](crate::FixtureRegistry::register),
//! which resolves inheritance once into flat per-item value and attribute maps.
//!
//! # Example
//!
//! ```
//! use reinhardt_fixtures_core::{FixtureBuilder, FixtureRegistry, ItemBuilder};
//! use serde_json::json;
//!
//! let mut registry = FixtureRegistry::new();
//! let accounts = registry
//!     .register(
//!         FixtureBuilder::new("Accounts")
//!             .with_item(
//!                 ItemBuilder::new("first")
//!                     .value("x", 42)
//!                     .computed("y", |scope| Ok(json!(scope.get_as::<i64>("x")? / 2))),
//!             )
//!             .with_item(ItemBuilder::new("second").value("x", 11).value("y", 99)),
//!     )
//!     .unwrap();
//!
//! let first = registry.item_id(accounts, "first").unwrap();
//! assert_eq!(registry.descriptor(first).unwrap().value("x"), Some(&json!(42)));
//! ```

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::backend::FixtureBackend;
use crate::item::{AttributeFn, ItemId};
use crate::scope::{AttrResult, AttrScope};

/// Handle to a fixture registered in a [`FixtureRegistry`](crate::FixtureRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(pub(crate) usize);

impl FixtureId {
	/// Position of the fixture in its registry.
	pub fn index(&self) -> usize {
		self.0
	}
}

/// A registered fixture definition.
pub struct FixtureDefinition {
	pub(crate) id: FixtureId,
	pub(crate) name: String,
	pub(crate) parents: Vec<FixtureId>,
	pub(crate) backend: Option<Arc<dyn FixtureBackend>>,
	pub(crate) items: IndexMap<String, ItemId>,
}

impl FixtureDefinition {
	/// Returns the fixture id.
	pub fn id(&self) -> FixtureId {
		self.id
	}

	/// Returns the fixture name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the direct parents in declaration order.
	pub fn parents(&self) -> &[FixtureId] {
		&self.parents
	}

	/// Returns the items declared by this fixture itself, in declaration order.
	pub fn items(&self) -> &IndexMap<String, ItemId> {
		&self.items
	}

	/// Returns true if this fixture or one of its ancestors supplied a backend.
	pub fn has_backend(&self) -> bool {
		self.backend.is_some()
	}
}

impl fmt::Debug for FixtureDefinition {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureDefinition")
			.field("id", &self.id)
			.field("name", &self.name)
			.field("parents", &self.parents)
			.field("has_backend", &self.backend.is_some())
			.field("items", &self.items)
			.finish()
	}
}

/// An attribute as declared, before inheritance is applied.
#[derive(Debug, Clone)]
pub(crate) enum Declared {
	Value(Value),
	Computed(AttributeFn),
}

/// Builder for one fixture item.
#[derive(Debug, Clone)]
pub struct ItemBuilder {
	pub(crate) name: String,
	pub(crate) extends: Option<String>,
	pub(crate) attributes: IndexMap<String, Declared>,
}

impl ItemBuilder {
	/// Starts an item declaration.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			extends: None,
			attributes: IndexMap::new(),
		}
	}

	/// Returns the item name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Inherits values and attributes from another item of the same fixture
	/// or of one of its ancestors.
	pub fn extends(mut self, base: impl Into<String>) -> Self {
		self.extends = Some(base.into());
		self
	}

	/// Declares a fixed value.
	pub fn value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.attributes
			.insert(name.into(), Declared::Value(value.into()));
		self
	}

	/// Declares a computed attribute receiving the resolution scope.
	pub fn computed<F>(self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn(&AttrScope<'_>) -> AttrResult + Send + Sync + 'static,
	{
		self.attribute(name, AttributeFn::scoped(f))
	}

	/// Declares a computed attribute without scope access.
	pub fn computed_plain<F>(self, name: impl Into<String>, f: F) -> Self
	where
		F: Fn() -> AttrResult + Send + Sync + 'static,
	{
		self.attribute(name, AttributeFn::plain(f))
	}

	/// Declares an attribute holding another item's primary key.
	pub fn reference(self, name: impl Into<String>, target: ItemId) -> Self {
		self.computed(name, move |scope| scope.primary_key(target))
	}

	/// Declares an attribute copying a field of another item's instance.
	pub fn reference_field(
		self,
		name: impl Into<String>,
		target: ItemId,
		field: impl Into<String>,
	) -> Self {
		let field = field.into();
		self.computed(name, move |scope| Ok(scope.field(target, &field)?.clone()))
	}

	/// Declares a computed attribute from an existing function.
	pub fn attribute(mut self, name: impl Into<String>, f: AttributeFn) -> Self {
		self.attributes.insert(name.into(), Declared::Computed(f));
		self
	}
}

/// Builder for a fixture definition.
pub struct FixtureBuilder {
	pub(crate) name: String,
	pub(crate) parents: Vec<FixtureId>,
	pub(crate) backend: Option<Arc<dyn FixtureBackend>>,
	pub(crate) items: Vec<ItemBuilder>,
}

impl FixtureBuilder {
	/// Starts a fixture declaration.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			parents: Vec::new(),
			backend: None,
			items: Vec::new(),
		}
	}

	/// Returns the fixture name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Adds a parent fixture. Parents are searched in the order added.
	pub fn extends(mut self, parent: FixtureId) -> Self {
		self.parents.push(parent);
		self
	}

	/// Sets the backend used to persist this fixture's items.
	///
	/// Without one the nearest ancestor's backend is used.
	pub fn with_backend(mut self, backend: Arc<dyn FixtureBackend>) -> Self {
		self.backend = Some(backend);
		self
	}

	/// Adds an item.
	pub fn with_item(mut self, item: ItemBuilder) -> Self {
		self.items.push(item);
		self
	}
}

impl fmt::Debug for FixtureBuilder {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FixtureBuilder")
			.field("name", &self.name)
			.field("parents", &self.parents)
			.field("has_backend", &self.backend.is_some())
			.field("items", &self.items)
			.finish()
	}
}
