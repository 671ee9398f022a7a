//! Item descriptors and their runtime load state.
//!
//! An [`ItemDescriptor`] is the static description of one fixture item (fixed
//! values plus computed attribute functions) together with its load state.
//! Descriptors are owned by a [`FixtureRegistry`](crate::FixtureRegistry) and
//! mutated only by the loader.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::definition::FixtureId;
use crate::scope::{AttrResult, AttrScope};

/// Attribute name to value mapping used for fixed and resolved values.
pub type FieldValues = IndexMap<String, Value>;

/// Handle to an item registered in a [`FixtureRegistry`](crate::FixtureRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub(crate) usize);

impl ItemId {
	/// Position of the item in its registry.
	pub fn index(&self) -> usize {
		self.0
	}
}

/// A materialized entity as reported by the backend.
///
/// Holds the full field set of the persisted entity, which may include
/// backend-generated fields (identifiers, defaults) beyond the resolved values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Instance {
	fields: FieldValues,
}

impl Instance {
	/// Creates an instance from its fields.
	pub fn new(fields: FieldValues) -> Self {
		Self { fields }
	}

	/// Returns a field value.
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	/// Returns all fields.
	pub fn fields(&self) -> &FieldValues {
		&self.fields
	}

	/// Consumes the instance, returning its fields.
	pub fn into_fields(self) -> FieldValues {
		self.fields
	}
}

impl From<FieldValues> for Instance {
	fn from(fields: FieldValues) -> Self {
		Self::new(fields)
	}
}

/// A computed attribute function.
///
/// Functions take either no argument or the resolution-time [`AttrScope`],
/// which gives access to sibling attributes and to other items.
#[derive(Clone)]
pub enum AttributeFn {
	/// Function without access to the scope.
	Plain(Arc<dyn Fn() -> AttrResult + Send + Sync>),
	/// Function receiving the resolution scope.
	Scoped(Arc<dyn Fn(&AttrScope<'_>) -> AttrResult + Send + Sync>),
}

impl AttributeFn {
	/// Wraps a scope-receiving function.
	pub fn scoped<F>(f: F) -> Self
	where
		F: Fn(&AttrScope<'_>) -> AttrResult + Send + Sync + 'static,
	{
		Self::Scoped(Arc::new(f))
	}

	/// Wraps a zero-argument function.
	pub fn plain<F>(f: F) -> Self
	where
		F: Fn() -> AttrResult + Send + Sync + 'static,
	{
		Self::Plain(Arc::new(f))
	}

	/// Invokes the function, passing the scope when it accepts one.
	pub(crate) fn call(&self, scope: &AttrScope<'_>) -> AttrResult {
		match self {
			Self::Plain(f) => f(),
			Self::Scoped(f) => f(scope),
		}
	}

	/// Returns true if the function receives the scope.
	pub fn takes_scope(&self) -> bool {
		matches!(self, Self::Scoped(_))
	}
}

impl fmt::Debug for AttributeFn {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Plain(_) => f.write_str("AttributeFn::Plain(..)"),
			Self::Scoped(_) => f.write_str("AttributeFn::Scoped(..)"),
		}
	}
}

/// Runtime state of an item.
///
/// The instance and the list of pulled-in dependencies only exist while the
/// item is loaded, so a positive load count always comes with an instance.
#[derive(Debug, Clone, Default)]
pub enum LoadState {
	/// Not materialized.
	#[default]
	Unloaded,
	/// Materialized and held by `count` loads.
	Loaded {
		/// Number of outstanding loads, always at least 1.
		count: usize,
		/// The backend entity.
		instance: Instance,
		/// Items loaded only to satisfy this item's attributes, in pull-in order.
		pulled_in: Vec<ItemId>,
	},
}

/// Static description and runtime state of one fixture item.
#[derive(Debug)]
pub struct ItemDescriptor {
	pub(crate) id: ItemId,
	pub(crate) name: String,
	pub(crate) fixture: FixtureId,
	pub(crate) fixture_name: String,
	pub(crate) values: FieldValues,
	pub(crate) deps: IndexMap<String, AttributeFn>,
	pub(crate) state: LoadState,
}

impl ItemDescriptor {
	/// Returns the item's id.
	pub fn id(&self) -> ItemId {
		self.id
	}

	/// Returns the item name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Returns the owning fixture.
	pub fn fixture(&self) -> FixtureId {
		self.fixture
	}

	/// Returns the owning fixture's name.
	pub fn fixture_name(&self) -> &str {
		&self.fixture_name
	}

	/// Returns `Fixture.item`.
	pub fn qualified_name(&self) -> String {
		format!("{}.{}", self.fixture_name, self.name)
	}

	/// Returns the merged fixed values.
	pub fn values(&self) -> &FieldValues {
		&self.values
	}

	/// Returns a fixed value.
	pub fn value(&self, name: &str) -> Option<&Value> {
		self.values.get(name)
	}

	/// Returns the merged computed attributes.
	pub fn deps(&self) -> &IndexMap<String, AttributeFn> {
		&self.deps
	}

	/// Returns the names of the computed attributes in declaration order.
	pub fn computed_names(&self) -> impl Iterator<Item = &str> {
		self.deps.keys().map(String::as_str)
	}

	/// Returns the runtime state.
	pub fn state(&self) -> &LoadState {
		&self.state
	}

	/// Returns the number of outstanding loads.
	pub fn load_count(&self) -> usize {
		match &self.state {
			LoadState::Unloaded => 0,
			LoadState::Loaded { count, .. } => *count,
		}
	}

	/// Returns true if the item is materialized.
	pub fn is_loaded(&self) -> bool {
		matches!(self.state, LoadState::Loaded { .. })
	}

	/// Returns the materialized instance.
	pub fn instance(&self) -> Option<&Instance> {
		match &self.state {
			LoadState::Unloaded => None,
			LoadState::Loaded { instance, .. } => Some(instance),
		}
	}

	/// Returns the items pulled in by the current load.
	pub fn pulled_in(&self) -> &[ItemId] {
		match &self.state {
			LoadState::Unloaded => &[],
			LoadState::Loaded { pulled_in, .. } => pulled_in,
		}
	}
}

/// Result of looking an item up by name.
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'a> {
	/// The item is not loaded; the descriptor is returned.
	Unloaded(&'a ItemDescriptor),
	/// The item is loaded; its instance is returned.
	Loaded(&'a Instance),
}

impl<'a> ItemRef<'a> {
	/// Returns the instance if loaded.
	pub fn instance(&self) -> Option<&'a Instance> {
		match *self {
			Self::Loaded(instance) => Some(instance),
			Self::Unloaded(_) => None,
		}
	}

	/// Returns the descriptor if unloaded.
	pub fn descriptor(&self) -> Option<&'a ItemDescriptor> {
		match *self {
			Self::Unloaded(descriptor) => Some(descriptor),
			Self::Loaded(_) => None,
		}
	}

	/// Returns true for [`ItemRef::Loaded`].
	pub fn is_loaded(&self) -> bool {
		matches!(self, Self::Loaded(_))
	}
}
