//! Shared helpers for fixture engine integration tests.

use std::sync::Arc;

use parking_lot::Mutex;
use reinhardt_fixtures_core::prelude::*;
use serde_json::json;

/// Backend that assigns sequential ids and counts calls.
#[derive(Default)]
pub struct CountingBackend {
	next_id: Mutex<u64>,
	live: Mutex<Vec<String>>,
	created: Mutex<usize>,
	destroyed: Mutex<usize>,
	fail_destroy: Mutex<bool>,
}

#[allow(dead_code)]
impl CountingBackend {
	pub fn new() -> Arc<Self> {
		Arc::new(Self::default())
	}

	pub fn created(&self) -> usize {
		*self.created.lock()
	}

	pub fn destroyed(&self) -> usize {
		*self.destroyed.lock()
	}

	/// Qualified names of entities currently persisted.
	pub fn live(&self) -> Vec<String> {
		self.live.lock().clone()
	}

	pub fn fail_destroy(&self, fail: bool) {
		*self.fail_destroy.lock() = fail;
	}
}

impl FixtureBackend for CountingBackend {
	fn create_instance(
		&self,
		item: &ItemDescriptor,
		values: &FieldValues,
	) -> FixtureResult<Option<Instance>> {
		let mut next_id = self.next_id.lock();
		*next_id += 1;
		let mut fields = values.clone();
		fields.insert("id".to_string(), json!(*next_id));
		*self.created.lock() += 1;
		self.live.lock().push(item.qualified_name());
		Ok(Some(Instance::new(fields)))
	}

	fn destroy_instance(&self, item: &ItemDescriptor, _instance: &Instance) -> FixtureResult<()> {
		if *self.fail_destroy.lock() {
			return Err(FixtureError::Backend(format!(
				"cannot destroy {}",
				item.qualified_name()
			)));
		}
		*self.destroyed.lock() += 1;
		let name = item.qualified_name();
		self.live.lock().retain(|live| live != &name);
		Ok(())
	}
}

/// Registers `BasicAccounts` with `first` and `second`.
#[allow(dead_code)]
pub fn basic_accounts(registry: &mut FixtureRegistry, backend: Arc<CountingBackend>) -> FixtureId {
	registry
		.register(
			FixtureBuilder::new("BasicAccounts")
				.with_backend(backend)
				.with_item(ItemBuilder::new("first").value("x", 42).value("y", 21))
				.with_item(ItemBuilder::new("second").value("x", 11).value("y", 99)),
		)
		.unwrap()
}
