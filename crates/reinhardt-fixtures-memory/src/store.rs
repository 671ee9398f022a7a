//! In-memory entity store.
//!
//! Rows are field maps keyed by an auto-incremented `id`. Each row also gets a
//! derived `key` field of the form `{Entity}{id}`. Fields listed as indexed on
//! the [`EntitySchema`] are kept in secondary indexes used by
//! [`MemoryStore::find_by`].
//!
//! ## Example
//!
//! ```
//! use reinhardt_fixtures_memory::{EntitySchema, MemoryStore};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store
//!     .register(EntitySchema::new("Account").with_default("x", 0).with_index("x"))
//!     .unwrap();
//!
//! let row = store.insert("Account", &[("x".to_string(), json!(42))].into_iter().collect()).unwrap();
//! assert_eq!(row["key"], json!("Account1"));
//! assert_eq!(store.find_by("Account", "x", &json!(42)).unwrap().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use reinhardt_fixtures_core::{DEFAULT_PRIMARY_KEY, FieldValues};
use serde_json::Value;

use crate::backend::MemoryBackend;
use crate::error::{StoreError, StoreResult};

/// Name of the derived key field.
pub const KEY_FIELD: &str = "key";

/// Shape of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
	name: String,
	defaults: FieldValues,
	indexed: Vec<String>,
}

impl EntitySchema {
	/// Creates a schema without defaults or indexes.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			defaults: FieldValues::new(),
			indexed: Vec::new(),
		}
	}

	/// Sets the value a field takes when a row does not provide it.
	pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
		self.defaults.insert(field.into(), value.into());
		self
	}

	/// Maintains a secondary index on a field.
	pub fn with_index(mut self, field: impl Into<String>) -> Self {
		let field = field.into();
		if !self.indexed.contains(&field) {
			self.indexed.push(field);
		}
		self
	}

	/// Entity name.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Default field values.
	pub fn defaults(&self) -> &FieldValues {
		&self.defaults
	}

	/// Indexed fields.
	pub fn indexed(&self) -> &[String] {
		&self.indexed
	}
}

struct Table {
	schema: EntitySchema,
	rows: BTreeMap<u64, FieldValues>,
	next_id: u64,
	// field -> serialized value -> ids
	indexes: HashMap<String, HashMap<String, BTreeSet<u64>>>,
}

impl Table {
	fn new(schema: EntitySchema) -> Self {
		let indexes = schema
			.indexed
			.iter()
			.map(|field| (field.clone(), HashMap::new()))
			.collect();
		Self {
			schema,
			rows: BTreeMap::new(),
			next_id: 1,
			indexes,
		}
	}

	fn index(&mut self, id: u64, row: &FieldValues) {
		for (field, index) in &mut self.indexes {
			if let Some(value) = row.get(field) {
				index.entry(value.to_string()).or_default().insert(id);
			}
		}
	}

	fn unindex(&mut self, id: u64, row: &FieldValues) {
		for (field, index) in &mut self.indexes {
			let Some(value) = row.get(field) else {
				continue;
			};
			let key = value.to_string();
			if let Some(ids) = index.get_mut(&key) {
				ids.remove(&id);
				if ids.is_empty() {
					index.remove(&key);
				}
			}
		}
	}
}

/// Thread-safe in-memory store of entity rows.
///
/// Cloning the store is cheap; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
	tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl MemoryStore {
	/// Creates an empty store.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers an entity type.
	pub fn register(&self, schema: EntitySchema) -> StoreResult<()> {
		let mut tables = self.tables.write();
		if tables.contains_key(&schema.name) {
			return Err(StoreError::DuplicateEntity(schema.name));
		}
		tables.insert(schema.name.clone(), Table::new(schema));
		Ok(())
	}

	/// Returns the schema of an entity type.
	pub fn schema(&self, entity: &str) -> Option<EntitySchema> {
		self.tables
			.read()
			.get(entity)
			.map(|table| table.schema.clone())
	}

	/// Inserts a row and returns it as stored.
	///
	/// Missing fields take the schema defaults. A non-null `id` is kept,
	/// otherwise the next free id is assigned.
	pub fn insert(&self, entity: &str, values: &FieldValues) -> StoreResult<FieldValues> {
		let mut tables = self.tables.write();
		let table = tables
			.get_mut(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;

		let id = match values.get(DEFAULT_PRIMARY_KEY) {
			None | Some(Value::Null) => table.next_id,
			Some(value) => value
				.as_u64()
				.filter(|id| *id > 0)
				.ok_or_else(|| StoreError::InvalidValue {
					entity: entity.to_string(),
					field: DEFAULT_PRIMARY_KEY.to_string(),
					message: format!("expected a positive integer, got {}", value),
				})?,
		};
		if table.rows.contains_key(&id) {
			return Err(StoreError::DuplicateId {
				entity: entity.to_string(),
				id,
			});
		}
		let following = id.checked_add(1).ok_or_else(|| StoreError::InvalidValue {
			entity: entity.to_string(),
			field: DEFAULT_PRIMARY_KEY.to_string(),
			message: format!("id {} leaves no room for further ids", id),
		})?;
		table.next_id = table.next_id.max(following);

		let mut row = table.schema.defaults.clone();
		for (field, value) in values {
			row.insert(field.clone(), value.clone());
		}
		row.insert(DEFAULT_PRIMARY_KEY.to_string(), Value::from(id));
		row.insert(KEY_FIELD.to_string(), Value::from(format!("{}{}", entity, id)));

		table.index(id, &row);
		table.rows.insert(id, row.clone());
		tracing::trace!(entity, id, "Inserted row");
		Ok(row)
	}

	/// Removes a row and returns it.
	pub fn delete(&self, entity: &str, id: u64) -> StoreResult<FieldValues> {
		let mut tables = self.tables.write();
		let table = tables
			.get_mut(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;
		let row = table.rows.remove(&id).ok_or_else(|| StoreError::NotFound {
			entity: entity.to_string(),
			id,
		})?;
		table.unindex(id, &row);
		tracing::trace!(entity, id, "Deleted row");
		Ok(row)
	}

	/// Returns a row by id.
	pub fn get(&self, entity: &str, id: u64) -> Option<FieldValues> {
		self.tables
			.read()
			.get(entity)
			.and_then(|table| table.rows.get(&id).cloned())
	}

	/// Returns the rows whose `field` equals `value`, in id order.
	///
	/// Indexed fields are answered from the index, others by a scan.
	pub fn find_by(&self, entity: &str, field: &str, value: &Value) -> StoreResult<Vec<FieldValues>> {
		let tables = self.tables.read();
		let table = tables
			.get(entity)
			.ok_or_else(|| StoreError::UnknownEntity(entity.to_string()))?;

		if let Some(index) = table.indexes.get(field) {
			let rows = index
				.get(&value.to_string())
				.into_iter()
				.flatten()
				.filter_map(|id| table.rows.get(id).cloned())
				.collect();
			return Ok(rows);
		}
		Ok(table
			.rows
			.values()
			.filter(|row| row.get(field) == Some(value))
			.cloned()
			.collect())
	}

	/// Number of rows of one entity type.
	pub fn count(&self, entity: &str) -> usize {
		self.tables
			.read()
			.get(entity)
			.map_or(0, |table| table.rows.len())
	}

	/// Number of rows across all entity types.
	pub fn len(&self) -> usize {
		self.tables.read().values().map(|table| table.rows.len()).sum()
	}

	/// Returns true if no rows are stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Removes every row, keeping the registered schemas and id counters.
	pub fn clear(&self) {
		for table in self.tables.write().values_mut() {
			table.rows.clear();
			for index in table.indexes.values_mut() {
				index.clear();
			}
		}
	}

	/// Returns a fixture backend persisting rows of `entity` in this store.
	pub fn backend(&self, entity: impl Into<String>) -> MemoryBackend {
		MemoryBackend::new(self.clone(), entity)
	}
}

impl std::fmt::Debug for MemoryStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let tables = self.tables.read();
		let mut counts: Vec<(&String, usize)> = tables
			.iter()
			.map(|(name, table)| (name, table.rows.len()))
			.collect();
		counts.sort();
		f.debug_struct("MemoryStore").field("rows", &counts).finish()
	}
}
