//! Loading and unloading of fixture items.
//!
//! Loading an item resolves its computed attributes in rounds, pulls in the
//! items those attributes read, and hands the final values to the backend.
//! Load counts make repeated loads idempotent: only the first load creates the
//! entity and only the matching last unload destroys it, together with the
//! items it pulled in.
//!
//! A load that fails is rolled back: the dependencies it pulled in are
//! unloaded again and the item stays unloaded. The same holds when an
//! attribute function panics; the panic is resumed after the rollback.

use std::panic::{self, AssertUnwindSafe};

use indexmap::IndexSet;
use serde_json::Value;

use crate::definition::FixtureId;
use crate::error::{FixtureError, FixtureResult};
use crate::item::{AttributeFn, FieldValues, Instance, ItemId, LoadState};
use crate::registry::FixtureRegistry;
use crate::scope::{AttrScope, DepthGuard, Resolution};

impl FixtureRegistry {
	/// Loads every item of a fixture and its ancestors, ancestors first.
	///
	/// If one item fails, the items loaded by this call are unloaded again in
	/// reverse order before the error is returned.
	pub fn load(&mut self, fixture: FixtureId) -> FixtureResult<()> {
		self.definition(fixture)?;
		let items = self.chain_items(fixture);
		let mut loaded: Vec<ItemId> = Vec::with_capacity(items.len());
		for id in items {
			if let Err(error) = self.acquire(id) {
				self.release_all(&loaded);
				return Err(error);
			}
			loaded.push(id);
		}
		tracing::debug!(
			fixture = %self.fixtures[fixture.0].name,
			items = loaded.len(),
			"Loaded fixture"
		);
		Ok(())
	}

	/// Unloads every item of a fixture and its ancestors, in the reverse of
	/// the order used by [`load`](Self::load).
	///
	/// Nothing is unloaded if any of the items is not loaded.
	pub fn unload(&mut self, fixture: FixtureId) -> FixtureResult<()> {
		let name = self.definition(fixture)?.name.clone();
		let items = self.chain_items(fixture);
		if let Some(id) = items.iter().find(|id| !self.items[id.0].is_loaded()) {
			return Err(FixtureError::ReferenceCountMisuse(format!(
				"fixture '{}' unloaded more times than loaded ({} is not loaded)",
				name,
				self.items[id.0].qualified_name()
			)));
		}
		for id in items.into_iter().rev() {
			self.unload_item(id)?;
		}
		tracing::debug!(fixture = %name, "Unloaded fixture");
		Ok(())
	}

	/// Loads one item and returns its instance.
	///
	/// If the item is already loaded its count is bumped and nothing is
	/// resolved or created.
	pub fn load_item(&mut self, id: ItemId) -> FixtureResult<&Instance> {
		self.acquire(id)?;
		self.instance(id)
	}

	/// Releases one load of an item.
	///
	/// The last release destroys the entity and then releases the items that
	/// were pulled in by its load, in the order they were pulled in.
	pub fn unload_item(&mut self, id: ItemId) -> FixtureResult<()> {
		let backend = match self.descriptor(id)?.state {
			LoadState::Unloaded => {
				return Err(FixtureError::ReferenceCountMisuse(format!(
					"too many attempts to unload {}",
					self.items[id.0].qualified_name()
				)));
			}
			LoadState::Loaded { count, .. } if count > 1 => None,
			LoadState::Loaded { .. } => Some(self.backend_for(id)?),
		};

		let item = &mut self.items[id.0];
		let Some(backend) = backend else {
			if let LoadState::Loaded { count, .. } = &mut item.state {
				*count -= 1;
				tracing::trace!(
					fixture = %item.fixture_name,
					item = %item.name,
					count = *count,
					"Released fixture item"
				);
			}
			return Ok(());
		};

		let LoadState::Loaded {
			instance,
			pulled_in,
			..
		} = std::mem::take(&mut item.state)
		else {
			return Ok(());
		};
		if let Err(error) = backend.destroy_instance(item, &instance) {
			item.state = LoadState::Loaded {
				count: 1,
				instance,
				pulled_in,
			};
			return Err(error);
		}
		tracing::debug!(
			fixture = %item.fixture_name,
			item = %item.name,
			pulled_in = pulled_in.len(),
			"Destroyed fixture item"
		);

		let mut first_error = None;
		for dependency in pulled_in {
			if let Err(error) = self.unload_item(dependency) {
				tracing::warn!(
					item = %self.items[dependency.0].qualified_name(),
					error = %error,
					"Failed to release pulled-in fixture item"
				);
				first_error.get_or_insert(error);
			}
		}
		first_error.map_or(Ok(()), Err)
	}

	/// Loads an item without borrowing its instance.
	pub(crate) fn acquire(&mut self, id: ItemId) -> FixtureResult<()> {
		self.descriptor(id)?;
		let item = &mut self.items[id.0];
		if let LoadState::Loaded { count, .. } = &mut item.state {
			*count += 1;
			tracing::trace!(
				fixture = %item.fixture_name,
				item = %item.name,
				count = *count,
				"Fixture item already loaded"
			);
			return Ok(());
		}

		if self.loading.len() >= self.settings.max_depth {
			return Err(FixtureError::MaxDepthExceeded(self.loading.len() + 1));
		}
		self.backend_for(id)?;

		self.loading.push(id);
		let mut pulled_in = Vec::new();
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
			self.materialize(id, &mut pulled_in)
		}));
		self.loading.pop();

		match outcome {
			Err(payload) => {
				// Panicking attribute function: roll back, then keep unwinding.
				self.release_all(&pulled_in);
				panic::resume_unwind(payload);
			}
			Ok(Ok(instance)) => {
				let item = &mut self.items[id.0];
				tracing::debug!(
					fixture = %item.fixture_name,
					item = %item.name,
					pulled_in = pulled_in.len(),
					"Loaded fixture item"
				);
				item.state = LoadState::Loaded {
					count: 1,
					instance,
					pulled_in,
				};
				Ok(())
			}
			Ok(Err(error)) => {
				self.release_all(&pulled_in);
				Err(error)
			}
		}
	}

	/// Resolves all values of an item and asks the backend for an instance.
	fn materialize(&mut self, id: ItemId, pulled_in: &mut Vec<ItemId>) -> FixtureResult<Instance> {
		let values = self.resolve_values(id, pulled_in)?;
		let backend = self.backend_for(id)?;
		let item = &self.items[id.0];
		backend.create_instance(item, &values)?.ok_or_else(|| {
			FixtureError::BackendContractViolation(format!(
				"backend returned no instance for {}",
				item.qualified_name()
			))
		})
	}

	/// Resolves computed attributes in rounds until all are known.
	fn resolve_values(
		&mut self,
		id: ItemId,
		pulled_in: &mut Vec<ItemId>,
	) -> FixtureResult<FieldValues> {
		let item = &self.items[id.0];
		let mut values = item.values.clone();
		let mut pending: Vec<(String, AttributeFn)> = item
			.deps
			.iter()
			.map(|(name, f)| (name.clone(), f.clone()))
			.collect();

		let mut round = 0usize;
		while !pending.is_empty() {
			round += 1;
			let scheduled: IndexSet<String> = pending.iter().map(|(name, _)| name.clone()).collect();
			let mut deferred = Vec::new();
			for (name, f) in std::mem::take(&mut pending) {
				match self.resolve_attribute(id, &name, &f, &values, &scheduled, pulled_in)? {
					Some(value) => {
						values.insert(name, value);
					}
					None => deferred.push((name, f)),
				}
			}

			if deferred.len() == scheduled.len() {
				let item = &self.items[id.0];
				return Err(FixtureError::CircularAttributeDependency {
					fixture: item.fixture_name.clone(),
					item: item.name.clone(),
					attributes: deferred.into_iter().map(|(name, _)| name).collect(),
				});
			}
			tracing::trace!(
				item = %self.items[id.0].qualified_name(),
				round,
				remaining = deferred.len(),
				"Finished attribute resolution round"
			);
			pending = deferred;
		}
		Ok(values)
	}

	/// Computes one attribute, loading the items it reads.
	///
	/// Returns `None` when the attribute has to wait for the next round.
	fn resolve_attribute(
		&mut self,
		id: ItemId,
		name: &str,
		f: &AttributeFn,
		values: &FieldValues,
		scheduled: &IndexSet<String>,
		pulled_in: &mut Vec<ItemId>,
	) -> FixtureResult<Option<Value>> {
		loop {
			match self.invoke(id, name, f, values, scheduled)? {
				Resolution::Ready(value) => return Ok(Some(value)),
				Resolution::NeedsLaterRound => {
					tracing::trace!(
						item = %self.items[id.0].qualified_name(),
						attribute = name,
						"Attribute deferred to next round"
					);
					return Ok(None);
				}
				Resolution::NeedsItem { item, cause } => {
					self.descriptor(item)?;
					if item == id {
						let current = &self.items[id.0];
						return Err(FixtureError::SelfReferenceMisuse {
							fixture: current.fixture_name.clone(),
							item: current.name.clone(),
							attribute: name.to_string(),
						});
					}
					if self.loading.contains(&item) || pulled_in.contains(&item) {
						return Err(self.cycle_error(item, cause));
					}
					tracing::debug!(
						item = %self.items[id.0].qualified_name(),
						attribute = name,
						dependency = %self.items[item.0].qualified_name(),
						"Pulling in fixture item"
					);
					self.acquire(item)?;
					pulled_in.push(item);
				}
			}
		}
	}

	/// Runs one attribute function with the resolution depth raised.
	fn invoke(
		&self,
		id: ItemId,
		name: &str,
		f: &AttributeFn,
		values: &FieldValues,
		scheduled: &IndexSet<String>,
	) -> FixtureResult<Resolution> {
		let _depth = DepthGuard::enter(&self.resolution_depth);
		let scope = AttrScope::new(self, &self.items[id.0], name, values, scheduled);
		Resolution::from_result(f.call(&scope))
	}

	/// Builds the error for an item requested again while its load is pending.
	fn cycle_error(&self, item: ItemId, cause: Box<FixtureError>) -> FixtureError {
		let start = self
			.loading
			.iter()
			.position(|id| *id == item)
			.unwrap_or(self.loading.len().saturating_sub(1));
		let mut path: Vec<String> = self.loading[start..]
			.iter()
			.map(|id| self.items[id.0].qualified_name())
			.collect();
		path.push(self.items[item.0].qualified_name());
		FixtureError::CircularItemDependency {
			item: self.items[item.0].qualified_name(),
			path: path.join(" -> "),
			cause,
		}
	}

	/// Releases items in reverse order, logging failures.
	fn release_all(&mut self, items: &[ItemId]) {
		for id in items.iter().rev() {
			if let Err(error) = self.unload_item(*id) {
				tracing::warn!(
					item = %self.items[id.0].qualified_name(),
					error = %error,
					"Failed to roll back fixture item"
				);
			}
		}
	}
}
