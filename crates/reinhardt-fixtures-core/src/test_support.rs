//! Backend used by the unit tests of this crate.

use parking_lot::Mutex;
use serde_json::json;

use crate::backend::FixtureBackend;
use crate::error::FixtureResult;
use crate::item::{FieldValues, Instance, ItemDescriptor};

/// Backend that assigns sequential ids and records every call.
#[derive(Default)]
pub(crate) struct RecordingBackend {
	next_id: Mutex<u64>,
	created: Mutex<Vec<String>>,
	destroyed: Mutex<Vec<String>>,
	return_nothing: bool,
}

impl RecordingBackend {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn returning_nothing(mut self) -> Self {
		self.return_nothing = true;
		self
	}

	pub(crate) fn created(&self) -> usize {
		self.created.lock().len()
	}

	pub(crate) fn destroyed(&self) -> usize {
		self.destroyed.lock().len()
	}

	pub(crate) fn created_names(&self) -> Vec<String> {
		self.created.lock().clone()
	}

	pub(crate) fn destroyed_names(&self) -> Vec<String> {
		self.destroyed.lock().clone()
	}
}

impl FixtureBackend for RecordingBackend {
	fn create_instance(
		&self,
		item: &ItemDescriptor,
		values: &FieldValues,
	) -> FixtureResult<Option<Instance>> {
		if self.return_nothing {
			return Ok(None);
		}
		let mut next_id = self.next_id.lock();
		*next_id += 1;
		let mut fields = values.clone();
		fields.insert("id".to_string(), json!(*next_id));
		self.created.lock().push(item.qualified_name());
		Ok(Some(Instance::new(fields)))
	}

	fn destroy_instance(&self, item: &ItemDescriptor, _instance: &Instance) -> FixtureResult<()> {
		self.destroyed.lock().push(item.qualified_name());
		Ok(())
	}
}
