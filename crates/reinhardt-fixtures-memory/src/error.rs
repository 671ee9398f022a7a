//! Error types for the in-memory store.

use reinhardt_fixtures_core::FixtureError;
use thiserror::Error;

/// Errors raised by [`MemoryStore`](crate::MemoryStore).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
	/// No schema is registered for the entity.
	#[error("Unknown entity: {0}")]
	UnknownEntity(String),

	/// A schema with this name is already registered.
	#[error("Entity already registered: {0}")]
	DuplicateEntity(String),

	/// A row with this id already exists.
	#[error("Duplicate id {id} for entity {entity}")]
	DuplicateId {
		/// Entity name.
		entity: String,
		/// Conflicting id.
		id: u64,
	},

	/// No row with this id exists.
	#[error("{entity} with id {id} not found")]
	NotFound {
		/// Entity name.
		entity: String,
		/// Missing id.
		id: u64,
	},

	/// A value could not be stored.
	#[error("Invalid value for {entity}.{field}: {message}")]
	InvalidValue {
		/// Entity name.
		entity: String,
		/// Field name.
		field: String,
		/// What is wrong with the value.
		message: String,
	},
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<StoreError> for FixtureError {
	fn from(error: StoreError) -> Self {
		FixtureError::Backend(error.to_string())
	}
}
