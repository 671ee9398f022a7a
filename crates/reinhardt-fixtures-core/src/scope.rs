//! Resolution-time view used by computed attributes.
//!
//! An [`AttrScope`] is handed to every scoped [`AttributeFn`](crate::AttributeFn)
//! while its item is being loaded. It answers two kinds of reads:
//!
//! - sibling attributes of the same item ([`AttrScope::get`]), which may not be
//!   computed yet and then defer the attribute to the next round;
//! - other items ([`AttrScope::item`], [`AttrScope::field`],
//!   [`AttrScope::primary_key`]), which ask the loader to load them first when
//!   they are not materialized.
//!
//! Both conditions are reported as [`Deferred`] values, never as panics, so an
//! attribute function simply propagates them with `?`.

use std::cell::Cell;

use indexmap::IndexSet;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FixtureError;
use crate::item::{FieldValues, Instance, ItemDescriptor, ItemId};
use crate::registry::FixtureRegistry;

/// Why an attribute function could not produce a value yet.
#[derive(Debug)]
pub enum Deferred {
	/// A sibling attribute scheduled in the current round was read.
	LaterRound {
		/// The sibling attribute that is not computed yet.
		attribute: String,
	},
	/// Another item must be loaded first.
	Item {
		/// The item to load.
		item: ItemId,
		/// The failed access that triggered the request.
		cause: Box<FixtureError>,
	},
	/// A hard failure.
	Failed(FixtureError),
}

impl From<FixtureError> for Deferred {
	fn from(error: FixtureError) -> Self {
		Self::Failed(error)
	}
}

impl From<serde_json::Error> for Deferred {
	fn from(error: serde_json::Error) -> Self {
		Self::Failed(FixtureError::JsonError(error))
	}
}

/// Return type of computed attribute functions.
pub type AttrResult = Result<Value, Deferred>;

/// Outcome of one attribute-function invocation, as seen by the loader.
#[derive(Debug)]
pub(crate) enum Resolution {
	Ready(Value),
	NeedsItem {
		item: ItemId,
		cause: Box<FixtureError>,
	},
	NeedsLaterRound,
}

impl Resolution {
	pub(crate) fn from_result(result: AttrResult) -> Result<Self, FixtureError> {
		match result {
			Ok(value) => Ok(Self::Ready(value)),
			Err(Deferred::LaterRound { .. }) => Ok(Self::NeedsLaterRound),
			Err(Deferred::Item { item, cause }) => Ok(Self::NeedsItem { item, cause }),
			Err(Deferred::Failed(error)) => Err(error),
		}
	}
}

/// RAII guard raising the registry's resolution depth for one attribute call.
pub(crate) struct DepthGuard<'a> {
	depth: &'a Cell<usize>,
}

impl<'a> DepthGuard<'a> {
	pub(crate) fn enter(depth: &'a Cell<usize>) -> Self {
		depth.set(depth.get() + 1);
		Self { depth }
	}
}

impl Drop for DepthGuard<'_> {
	fn drop(&mut self) {
		self.depth.set(self.depth.get().saturating_sub(1));
	}
}

/// Resolution-time view over an item's working values and the registry.
pub struct AttrScope<'a> {
	registry: &'a FixtureRegistry,
	item: &'a ItemDescriptor,
	attribute: &'a str,
	values: &'a FieldValues,
	scheduled: &'a IndexSet<String>,
}

impl<'a> AttrScope<'a> {
	pub(crate) fn new(
		registry: &'a FixtureRegistry,
		item: &'a ItemDescriptor,
		attribute: &'a str,
		values: &'a FieldValues,
		scheduled: &'a IndexSet<String>,
	) -> Self {
		Self {
			registry,
			item,
			attribute,
			values,
			scheduled,
		}
	}

	/// The item being resolved.
	pub fn item_id(&self) -> ItemId {
		self.item.id
	}

	/// The attribute being computed.
	pub fn attribute(&self) -> &str {
		self.attribute
	}

	/// Number of attribute calls in progress, including this one.
	pub fn depth(&self) -> usize {
		self.registry.resolution_depth()
	}

	/// Reads a sibling attribute of the item being resolved.
	///
	/// Already-resolved values win. A computed attribute still scheduled in this
	/// round defers the caller to the next round.
	pub fn get(&self, name: &str) -> Result<&'a Value, Deferred> {
		if let Some(value) = self.values.get(name) {
			return Ok(value);
		}
		if self.scheduled.contains(name) {
			return Err(Deferred::LaterRound {
				attribute: name.to_string(),
			});
		}
		Err(Deferred::Failed(FixtureError::UnknownAttribute {
			fixture: self.item.fixture_name.clone(),
			item: self.item.name.clone(),
			attribute: name.to_string(),
		}))
	}

	/// Reads a sibling attribute and deserializes it.
	pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T, Deferred> {
		let value = self.get(name)?;
		serde_json::from_value(value.clone()).map_err(|e| {
			Deferred::Failed(FixtureError::InvalidValue {
				attribute: name.to_string(),
				message: e.to_string(),
			})
		})
	}

	/// Returns another item's instance, requesting a load if needed.
	pub fn item(&self, id: ItemId) -> Result<&'a Instance, Deferred> {
		let registry = self.registry;
		let target = registry.descriptor(id)?;
		match target.instance() {
			Some(instance) if id != self.item.id => Ok(instance),
			_ => Err(Deferred::Item {
				item: id,
				cause: Box::new(FixtureError::NotLoaded {
					fixture: target.fixture_name.clone(),
					item: target.name.clone(),
				}),
			}),
		}
	}

	/// Returns a field of another item's instance.
	pub fn field(&self, id: ItemId, name: &str) -> Result<&'a Value, Deferred> {
		let instance = self.item(id)?;
		instance.get(name).ok_or_else(|| {
			let target = &self.registry.items[id.0];
			Deferred::Failed(FixtureError::UnknownAttribute {
				fixture: target.fixture_name.clone(),
				item: target.name.clone(),
				attribute: name.to_string(),
			})
		})
	}

	/// Returns another item's primary key as reported by its backend.
	pub fn primary_key(&self, id: ItemId) -> Result<Value, Deferred> {
		let instance = self.item(id)?;
		let target = &self.registry.items[id.0];
		let backend = self.registry.backend_for(id)?;
		Ok(backend.primary_key(target, instance)?)
	}

	/// Finds an item by fixture and item name.
	pub fn lookup(&self, fixture: &str, item: &str) -> Result<ItemId, Deferred> {
		let fixture = self.registry.fixture_id(fixture)?;
		Ok(self.registry.item_id(fixture, item)?)
	}
}
