//! Scoped fixture use.
//!
//! [`FixtureRegistry::scoped`] loads a fixture and returns a [`FixtureGuard`]
//! that unloads it again when dropped, also while unwinding from a panic. The
//! guard dereferences to the registry, so guards nest:
//!
//! ```
//! use std::sync::Arc;
//! use reinhardt_fixtures_core::{
//!     FieldValues, FixtureBackend, FixtureBuilder, FixtureRegistry, FixtureResult, Instance,
//!     ItemBuilder, ItemDescriptor,
//! };
//!
//! struct EchoBackend;
//!
//! impl FixtureBackend for EchoBackend {
//!     fn create_instance(&self, _: &ItemDescriptor, values: &FieldValues) -> FixtureResult<Option<Instance>> {
//!         Ok(Some(Instance::new(values.clone())))
//!     }
//!
//!     fn destroy_instance(&self, _: &ItemDescriptor, _: &Instance) -> FixtureResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = FixtureRegistry::new();
//! let accounts = registry
//!     .register(
//!         FixtureBuilder::new("Accounts")
//!             .with_backend(Arc::new(EchoBackend))
//!             .with_item(ItemBuilder::new("first").value("x", 42)),
//!     )
//!     .unwrap();
//!
//! {
//!     let mut outer = registry.scoped(accounts).unwrap();
//!     let inner = outer.scoped(accounts).unwrap();
//!     assert!(inner.get(accounts, "first").unwrap().is_loaded());
//! }
//! assert!(registry.loaded_items().is_empty());
//! ```

use std::ops::{Deref, DerefMut};

use crate::definition::FixtureId;
use crate::error::FixtureResult;
use crate::registry::FixtureRegistry;

/// RAII guard holding one load of a fixture.
///
/// Dropping the guard unloads the fixture. Failures during drop are logged,
/// or turn into a panic when [`strict_teardown`](crate::FixtureSettings::strict_teardown)
/// is enabled and the thread is not already panicking. Use
/// [`release`](Self::release) to observe the unload result instead.
pub struct FixtureGuard<'a> {
	registry: &'a mut FixtureRegistry,
	fixture: FixtureId,
	armed: bool,
}

impl<'a> FixtureGuard<'a> {
	/// The guarded fixture.
	pub fn fixture(&self) -> FixtureId {
		self.fixture
	}

	/// Unloads the fixture now and returns the outcome.
	pub fn release(mut self) -> FixtureResult<()> {
		self.armed = false;
		self.registry.unload(self.fixture)
	}
}

impl Deref for FixtureGuard<'_> {
	type Target = FixtureRegistry;

	fn deref(&self) -> &Self::Target {
		self.registry
	}
}

impl DerefMut for FixtureGuard<'_> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.registry
	}
}

impl Drop for FixtureGuard<'_> {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		if let Err(error) = self.registry.unload(self.fixture) {
			let fixture = self
				.registry
				.definition(self.fixture)
				.map(|definition| definition.name().to_string())
				.unwrap_or_default();
			if self.registry.settings.strict_teardown && !std::thread::panicking() {
				panic!("Failed to unload fixture '{}': {}", fixture, error);
			}
			tracing::error!(fixture = %fixture, error = %error, "Failed to unload fixture on drop");
		}
	}
}

impl FixtureRegistry {
	/// Loads a fixture and returns a guard that unloads it on drop.
	pub fn scoped(&mut self, fixture: FixtureId) -> FixtureResult<FixtureGuard<'_>> {
		self.load(fixture)?;
		Ok(FixtureGuard {
			registry: self,
			fixture,
			armed: true,
		})
	}

	/// Runs `f` with a fixture loaded.
	///
	/// The fixture is unloaded afterwards whether `f` succeeds, fails or
	/// panics. An error from `f` takes precedence over an unload error.
	pub fn with_fixture<R, F>(&mut self, fixture: FixtureId, f: F) -> FixtureResult<R>
	where
		F: FnOnce(&mut FixtureRegistry) -> FixtureResult<R>,
	{
		let mut guard = self.scoped(fixture)?;
		let outcome = f(&mut guard);
		let released = guard.release();
		match outcome {
			Ok(value) => released.map(|()| value),
			Err(error) => {
				if let Err(unload_error) = released {
					tracing::warn!(error = %unload_error, "Fixture unload failed after an earlier error");
				}
				Err(error)
			}
		}
	}
}

/// Wraps `f` so that it runs with `fixture` loaded.
///
/// Wrappers compose: `wrap(a, wrap(b, f))` loads `a`, then `b`, and unloads
/// them in reverse. Items shared by both are materialized once.
pub fn wrap<R, F>(
	fixture: FixtureId,
	f: F,
) -> impl FnOnce(&mut FixtureRegistry) -> FixtureResult<R>
where
	F: FnOnce(&mut FixtureRegistry) -> FixtureResult<R>,
{
	move |registry: &mut FixtureRegistry| registry.with_fixture(fixture, f)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::FixtureSettings;
	use crate::definition::{FixtureBuilder, ItemBuilder};
	use crate::error::FixtureError;
	use crate::test_support::RecordingBackend;
	use rstest::{fixture, rstest};
	use std::panic::{AssertUnwindSafe, catch_unwind};
	use std::sync::Arc;

	#[fixture]
	fn backend() -> Arc<RecordingBackend> {
		Arc::new(RecordingBackend::new())
	}

	fn setup(backend: Arc<RecordingBackend>) -> (FixtureRegistry, FixtureId, FixtureId) {
		let mut registry = FixtureRegistry::new();
		let basic = registry
			.register(
				FixtureBuilder::new("Basic")
					.with_backend(backend)
					.with_item(ItemBuilder::new("first").value("x", 42))
					.with_item(ItemBuilder::new("second").value("x", 11)),
			)
			.unwrap();
		let advanced = registry
			.register(
				FixtureBuilder::new("Advanced")
					.extends(basic)
					.with_item(ItemBuilder::new("third").value("x", 2)),
			)
			.unwrap();
		(registry, basic, advanced)
	}

	#[rstest]
	fn test_guard_unloads_on_drop(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, _) = setup(backend.clone());
		{
			let guard = registry.scoped(basic).unwrap();
			assert_eq!(guard.loaded_items().len(), 2);
			assert_eq!(guard.fixture(), basic);
		}
		assert!(registry.loaded_items().is_empty());
		assert_eq!(backend.destroyed(), 2);
	}

	#[rstest]
	fn test_nested_guards_materialize_once(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, advanced) = setup(backend.clone());
		{
			let mut outer = registry.scoped(basic).unwrap();
			{
				let inner = outer.scoped(advanced).unwrap();
				assert_eq!(inner.loaded_items().len(), 3);
			}
			assert_eq!(outer.loaded_items().len(), 2);
		}
		assert_eq!(backend.created(), 3);
		assert_eq!(backend.destroyed(), 3);
	}

	#[rstest]
	fn test_guard_unloads_while_unwinding(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, _) = setup(backend.clone());
		let result = catch_unwind(AssertUnwindSafe(|| {
			let _guard = registry.scoped(basic).unwrap();
			panic!("test body failed");
		}));
		assert!(result.is_err());
		assert!(registry.loaded_items().is_empty());
		assert_eq!(backend.destroyed(), 2);
	}

	#[rstest]
	fn test_release_reports_unload_error(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, _) = setup(backend);
		let first = registry.item_id(basic, "first").unwrap();
		let mut guard = registry.scoped(basic).unwrap();
		guard.unload_item(first).unwrap();

		assert!(matches!(
			guard.release(),
			Err(FixtureError::ReferenceCountMisuse(_))
		));
		let second = registry.item_id(basic, "second").unwrap();
		registry.unload_item(second).unwrap();
	}

	#[rstest]
	fn test_strict_teardown_panics_on_failed_unload(backend: Arc<RecordingBackend>) {
		let mut registry =
			FixtureRegistry::with_settings(FixtureSettings::default().with_strict_teardown(true));
		let basic = registry
			.register(
				FixtureBuilder::new("Basic")
					.with_backend(backend)
					.with_item(ItemBuilder::new("first").value("x", 42)),
			)
			.unwrap();
		let first = registry.item_id(basic, "first").unwrap();

		let result = catch_unwind(AssertUnwindSafe(|| {
			let mut guard = registry.scoped(basic).unwrap();
			guard.unload_item(first).unwrap();
		}));
		assert!(result.is_err());
	}

	#[rstest]
	fn test_with_fixture_returns_body_result(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, _) = setup(backend.clone());
		let x = registry
			.with_fixture(basic, |registry| {
				let first = registry.item_id(basic, "first")?;
				Ok(registry.instance(first)?.get("x").cloned())
			})
			.unwrap();

		assert_eq!(x, Some(serde_json::json!(42)));
		assert!(registry.loaded_items().is_empty());
	}

	#[rstest]
	fn test_with_fixture_unloads_after_body_error(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, _) = setup(backend.clone());
		let result: FixtureResult<()> = registry.with_fixture(basic, |_| {
			Err(FixtureError::Backend("body failed".to_string()))
		});

		assert!(matches!(result, Err(FixtureError::Backend(_))));
		assert!(registry.loaded_items().is_empty());
	}

	#[rstest]
	fn test_wrap_composes(backend: Arc<RecordingBackend>) {
		let (mut registry, basic, advanced) = setup(backend.clone());
		let test = wrap(
			basic,
			wrap(advanced, |registry: &mut FixtureRegistry| {
				Ok(registry.loaded_items().len())
			}),
		);

		assert_eq!(test(&mut registry).unwrap(), 3);
		assert!(registry.loaded_items().is_empty());
		assert_eq!(backend.created(), 3);
	}
}
