//! In-memory entity store for Reinhardt fixture tests.
//!
//! [`MemoryStore`] keeps rows of registered entity types behind a
//! `parking_lot::RwLock`, assigns ids, derives a `key` field and maintains
//! secondary indexes. [`MemoryBackend`] plugs a store into the fixture engine
//! so that loading a fixture inserts rows and unloading deletes them.
//!
//! ```
//! use std::sync::Arc;
//! use reinhardt_fixtures_core::{FixtureBuilder, FixtureRegistry, ItemBuilder};
//! use reinhardt_fixtures_memory::{EntitySchema, MemoryStore};
//! use serde_json::json;
//!
//! let store = MemoryStore::new();
//! store.register(EntitySchema::new("Account").with_index("x")).unwrap();
//!
//! let mut registry = FixtureRegistry::new();
//! let accounts = registry
//!     .register(
//!         FixtureBuilder::new("Accounts")
//!             .with_backend(Arc::new(store.backend("Account")))
//!             .with_item(ItemBuilder::new("first").value("x", 42)),
//!     )
//!     .unwrap();
//!
//! registry
//!     .with_fixture(accounts, |_| {
//!         assert_eq!(store.find_by("Account", "x", &json!(42)).unwrap().len(), 1);
//!         Ok(())
//!     })
//!     .unwrap();
//! assert!(store.is_empty());
//! ```

#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod store;

pub use backend::MemoryBackend;
pub use error::{StoreError, StoreResult};
pub use store::{EntitySchema, KEY_FIELD, MemoryStore};
