//! Fixture registry.
//!
//! The registry owns every fixture definition and item descriptor of a test
//! suite. Definitions are immutable once registered; only item load state
//! changes afterwards, through [`load`](FixtureRegistry::load),
//! [`load_item`](FixtureRegistry::load_item) and their unload counterparts.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::backend::FixtureBackend;
use crate::definition::{Declared, FixtureBuilder, FixtureDefinition, FixtureId, ItemBuilder};
use crate::error::{FixtureError, FixtureResult};
use crate::item::{AttributeFn, FieldValues, Instance, ItemDescriptor, ItemId, ItemRef, LoadState};
use crate::settings::FixtureSettings;

/// Owner of fixture definitions, item descriptors and loader state.
///
/// The registry is single-threaded: every load and unload goes through
/// `&mut self`.
pub struct FixtureRegistry {
	pub(crate) settings: FixtureSettings,
	pub(crate) fixtures: Vec<FixtureDefinition>,
	pub(crate) items: Vec<ItemDescriptor>,
	pub(crate) by_name: IndexMap<String, FixtureId>,
	/// Items whose load is in progress, outermost first.
	pub(crate) loading: Vec<ItemId>,
	pub(crate) resolution_depth: Cell<usize>,
}

impl FixtureRegistry {
	/// Creates an empty registry with default settings.
	pub fn new() -> Self {
		Self::with_settings(FixtureSettings::default())
	}

	/// Creates an empty registry with the given settings.
	pub fn with_settings(settings: FixtureSettings) -> Self {
		Self {
			settings,
			fixtures: Vec::new(),
			items: Vec::new(),
			by_name: IndexMap::new(),
			loading: Vec::new(),
			resolution_depth: Cell::new(0),
		}
	}

	/// Returns the registry settings.
	pub fn settings(&self) -> &FixtureSettings {
		&self.settings
	}

	/// Registers a fixture, resolving item inheritance into flat maps.
	///
	/// An item redeclaring an inherited item of the same name overrides it
	/// attribute by attribute; [`ItemBuilder::extends`] names the base item
	/// explicitly.
	pub fn register(&mut self, builder: FixtureBuilder) -> FixtureResult<FixtureId> {
		if self.by_name.contains_key(&builder.name) {
			return Err(FixtureError::DuplicateFixture(builder.name));
		}
		for parent in &builder.parents {
			self.definition(*parent)?;
		}

		let id = FixtureId(self.fixtures.len());
		let ancestors = self.linearize_parents(&builder.parents);
		let backend = builder.backend.or_else(|| {
			ancestors
				.iter()
				.rev()
				.find_map(|f| self.fixtures[f.0].backend.clone())
		});

		let mut own: IndexMap<String, ItemId> = IndexMap::new();
		let mut descriptors: Vec<ItemDescriptor> = Vec::with_capacity(builder.items.len());
		for item in builder.items {
			if own.contains_key(&item.name) {
				return Err(FixtureError::DuplicateItem {
					fixture: builder.name,
					item: item.name,
				});
			}
			let (values, deps) =
				self.merge_item(&builder.name, &ancestors, &own, &descriptors, &item)?;
			let item_id = ItemId(self.items.len() + descriptors.len());
			own.insert(item.name.clone(), item_id);
			descriptors.push(ItemDescriptor {
				id: item_id,
				name: item.name,
				fixture: id,
				fixture_name: builder.name.clone(),
				values,
				deps,
				state: LoadState::Unloaded,
			});
		}

		tracing::debug!(
			fixture = %builder.name,
			parents = builder.parents.len(),
			items = own.len(),
			"Registered fixture"
		);

		self.items.extend(descriptors);
		self.by_name.insert(builder.name.clone(), id);
		self.fixtures.push(FixtureDefinition {
			id,
			name: builder.name,
			parents: builder.parents,
			backend,
			items: own,
		});
		Ok(id)
	}

	/// Computes the flat values and attributes of an item being registered.
	fn merge_item(
		&self,
		fixture: &str,
		ancestors: &[FixtureId],
		own: &IndexMap<String, ItemId>,
		pending: &[ItemDescriptor],
		item: &ItemBuilder,
	) -> FixtureResult<(FieldValues, IndexMap<String, AttributeFn>)> {
		let base_name = item.extends.as_deref().unwrap_or(&item.name);
		let base = match own.get(base_name) {
			Some(id) if item.extends.is_some() => Some(&pending[id.0 - self.items.len()]),
			_ => ancestors.iter().rev().find_map(|f| {
				self.fixtures[f.0]
					.items
					.get(base_name)
					.map(|id| &self.items[id.0])
			}),
		};
		if base.is_none() && item.extends.is_some() {
			return Err(FixtureError::UnknownItem {
				fixture: fixture.to_string(),
				item: base_name.to_string(),
			});
		}

		let (mut values, mut deps) = base
			.map(|b| (b.values.clone(), b.deps.clone()))
			.unwrap_or_default();
		for (name, declared) in &item.attributes {
			match declared {
				Declared::Value(value) => {
					deps.shift_remove(name);
					values.insert(name.clone(), value.clone());
				}
				Declared::Computed(f) => {
					values.shift_remove(name);
					deps.insert(name.clone(), f.clone());
				}
			}
		}
		Ok((values, deps))
	}

	/// Returns the inheritance chain of a fixture, ancestors first and the
	/// fixture itself last. Each fixture appears once.
	pub fn linearize(&self, fixture: FixtureId) -> Vec<FixtureId> {
		let mut seen = HashSet::new();
		let mut order = Vec::new();
		self.visit(fixture, &mut seen, &mut order);
		order
	}

	fn linearize_parents(&self, parents: &[FixtureId]) -> Vec<FixtureId> {
		let mut seen = HashSet::new();
		let mut order = Vec::new();
		for parent in parents {
			self.visit(*parent, &mut seen, &mut order);
		}
		order
	}

	fn visit(&self, fixture: FixtureId, seen: &mut HashSet<FixtureId>, order: &mut Vec<FixtureId>) {
		if !seen.insert(fixture) {
			return;
		}
		for parent in &self.fixtures[fixture.0].parents {
			self.visit(*parent, seen, order);
		}
		order.push(fixture);
	}

	/// Returns every item owned by the fixture's inheritance chain, ancestors
	/// first and each fixture's items in declaration order.
	pub(crate) fn chain_items(&self, fixture: FixtureId) -> Vec<ItemId> {
		self.linearize(fixture)
			.into_iter()
			.flat_map(|f| self.fixtures[f.0].items.values().copied())
			.collect()
	}

	/// Finds a fixture by name.
	pub fn fixture_id(&self, name: &str) -> FixtureResult<FixtureId> {
		self.by_name
			.get(name)
			.copied()
			.ok_or_else(|| FixtureError::UnknownFixture(name.to_string()))
	}

	/// Returns a fixture definition.
	pub fn definition(&self, fixture: FixtureId) -> FixtureResult<&FixtureDefinition> {
		self.fixtures
			.get(fixture.0)
			.ok_or_else(|| FixtureError::UnknownFixture(format!("#{}", fixture.0)))
	}

	/// Returns all fixture definitions in registration order.
	pub fn fixtures(&self) -> impl Iterator<Item = &FixtureDefinition> {
		self.fixtures.iter()
	}

	/// Finds an item by name, searching the fixture first and then its
	/// ancestors from most to least specific.
	pub fn item_id(&self, fixture: FixtureId, name: &str) -> FixtureResult<ItemId> {
		let definition = self.definition(fixture)?;
		self.linearize(fixture)
			.into_iter()
			.rev()
			.find_map(|f| self.fixtures[f.0].items.get(name).copied())
			.ok_or_else(|| FixtureError::UnknownItem {
				fixture: definition.name.clone(),
				item: name.to_string(),
			})
	}

	/// Looks an item up by name, returning its instance when loaded and its
	/// descriptor otherwise.
	pub fn get(&self, fixture: FixtureId, name: &str) -> FixtureResult<ItemRef<'_>> {
		let id = self.item_id(fixture, name)?;
		let item = &self.items[id.0];
		Ok(match item.instance() {
			Some(instance) => ItemRef::Loaded(instance),
			None => ItemRef::Unloaded(item),
		})
	}

	/// Returns an item descriptor.
	///
	/// An id that was not issued by this registry is a contract violation.
	pub fn descriptor(&self, id: ItemId) -> FixtureResult<&ItemDescriptor> {
		self.items.get(id.0).ok_or_else(|| {
			FixtureError::BackendContractViolation(format!(
				"item #{} is not owned by this registry",
				id.0
			))
		})
	}

	/// Returns a loaded item's instance.
	pub fn instance(&self, id: ItemId) -> FixtureResult<&Instance> {
		let item = self.descriptor(id)?;
		item.instance().ok_or_else(|| FixtureError::NotLoaded {
			fixture: item.fixture_name.clone(),
			item: item.name.clone(),
		})
	}

	/// Returns the ids of all loaded items.
	pub fn loaded_items(&self) -> Vec<ItemId> {
		self.items
			.iter()
			.filter(|item| item.is_loaded())
			.map(|item| item.id)
			.collect()
	}

	/// Returns the backend responsible for an item.
	pub fn backend_for(&self, id: ItemId) -> FixtureResult<Arc<dyn FixtureBackend>> {
		let item = self.descriptor(id)?;
		self.fixtures[item.fixture.0]
			.backend
			.clone()
			.ok_or_else(|| FixtureError::MissingBackend {
				fixture: item.fixture_name.clone(),
			})
	}

	/// Number of attribute functions currently executing.
	pub fn resolution_depth(&self) -> usize {
		self.resolution_depth.get()
	}

	/// Returns true while an attribute function is executing.
	pub fn is_resolving(&self) -> bool {
		self.resolution_depth() > 0
	}
}

impl Default for FixtureRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for FixtureRegistry {
	fn drop(&mut self) {
		if !self.settings.leak_check {
			return;
		}
		let leaked: Vec<String> = self
			.items
			.iter()
			.filter(|item| item.is_loaded())
			.map(ItemDescriptor::qualified_name)
			.collect();
		if !leaked.is_empty() {
			tracing::warn!(
				items = ?leaked,
				"Fixture registry dropped while items are still loaded; their entities were not destroyed"
			);
		}
	}
}
