//! Backend adapter contract.
//!
//! A backend persists the entities behind fixture items. The engine calls
//! [`FixtureBackend::create_instance`] exactly once per materialization and
//! [`FixtureBackend::destroy_instance`] exactly once per successful creation.

use serde_json::Value;

use crate::error::{FixtureError, FixtureResult};
use crate::item::{FieldValues, Instance, ItemDescriptor};

/// Field read by the default [`FixtureBackend::primary_key`].
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// Trait for persisting fixture items.
///
/// Implement this trait once per storage technology.
///
/// # Example
///
/// ```
/// use reinhardt_fixtures_core::{FieldValues, FixtureBackend, FixtureResult, Instance, ItemDescriptor};
///
/// struct EchoBackend;
///
/// impl FixtureBackend for EchoBackend {
///     fn create_instance(
///         &self,
///         _item: &ItemDescriptor,
///         values: &FieldValues,
///     ) -> FixtureResult<Option<Instance>> {
///         Ok(Some(Instance::new(values.clone())))
///     }
///
///     fn destroy_instance(&self, _item: &ItemDescriptor, _instance: &Instance) -> FixtureResult<()> {
///         Ok(())
///     }
/// }
/// ```
pub trait FixtureBackend: Send + Sync {
	/// Persists an entity built from the fully-resolved values.
	///
	/// Returning `Ok(None)` is a contract violation reported by the loader.
	fn create_instance(
		&self,
		item: &ItemDescriptor,
		values: &FieldValues,
	) -> FixtureResult<Option<Instance>>;

	/// Removes a previously created entity.
	fn destroy_instance(&self, item: &ItemDescriptor, instance: &Instance) -> FixtureResult<()>;

	/// Returns the identifier other items use to reference this one.
	///
	/// The default implementation reads the `id` field.
	fn primary_key(&self, item: &ItemDescriptor, instance: &Instance) -> FixtureResult<Value> {
		instance
			.get(DEFAULT_PRIMARY_KEY)
			.filter(|value| !value.is_null())
			.cloned()
			.ok_or_else(|| {
				FixtureError::Backend(format!(
					"{} has no '{}' field",
					item.qualified_name(),
					DEFAULT_PRIMARY_KEY
				))
			})
	}
}
