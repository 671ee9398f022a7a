//! Fixture backend over a [`MemoryStore`].

use reinhardt_fixtures_core::{
	DEFAULT_PRIMARY_KEY, FieldValues, FixtureBackend, FixtureError, FixtureResult, Instance,
	ItemDescriptor,
};

use crate::store::MemoryStore;

/// Persists fixture items as rows of one entity type.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
	store: MemoryStore,
	entity: String,
}

impl MemoryBackend {
	/// Creates a backend writing `entity` rows to `store`.
	pub fn new(store: MemoryStore, entity: impl Into<String>) -> Self {
		Self {
			store,
			entity: entity.into(),
		}
	}

	/// The entity type written by this backend.
	pub fn entity(&self) -> &str {
		&self.entity
	}

	/// The underlying store.
	pub fn store(&self) -> &MemoryStore {
		&self.store
	}
}

impl FixtureBackend for MemoryBackend {
	fn create_instance(
		&self,
		item: &ItemDescriptor,
		values: &FieldValues,
	) -> FixtureResult<Option<Instance>> {
		let row = self.store.insert(&self.entity, values)?;
		tracing::debug!(
			entity = %self.entity,
			item = %item.qualified_name(),
			id = ?row.get(DEFAULT_PRIMARY_KEY),
			"Created fixture row"
		);
		Ok(Some(Instance::new(row)))
	}

	fn destroy_instance(&self, item: &ItemDescriptor, instance: &Instance) -> FixtureResult<()> {
		let id = instance
			.get(DEFAULT_PRIMARY_KEY)
			.and_then(|id| id.as_u64())
			.ok_or_else(|| {
				FixtureError::Backend(format!(
					"{} has no integer '{}' field",
					item.qualified_name(),
					DEFAULT_PRIMARY_KEY
				))
			})?;
		self.store.delete(&self.entity, id)?;
		tracing::debug!(
			entity = %self.entity,
			item = %item.qualified_name(),
			id,
			"Deleted fixture row"
		);
		Ok(())
	}
}
