//! # Reinhardt Fixtures
//!
//! Declarative test-data fixtures: named groups of items persisted through a
//! backend, loaded and unloaded with reference counting so that nested and
//! repeated use is cheap and always balanced.
//!
//! ## Crates
//!
//! - [`core`] - Registry, loader, scoped guards and fixture documents
//! - [`memory`] - In-memory entity store and backend (feature `memory`)
//!
//! ## Features
//!
//! - `memory` - In-memory store (enabled by default)
//! - `yaml` - YAML fixture documents
//! - `full` - All features enabled
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "memory")]
//! # {
//! use std::sync::Arc;
//! use reinhardt_fixtures::prelude::*;
//! use reinhardt_fixtures::memory::{EntitySchema, MemoryStore};
//!
//! let store = MemoryStore::new();
//! store.register(EntitySchema::new("Account")).unwrap();
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
//! let guard = registry.scoped(accounts).unwrap();
//! assert_eq!(store.len(), 1);
//! drop(guard);
//! assert!(store.is_empty());
//! # }
//! ```

#![warn(missing_docs)]

pub use reinhardt_fixtures_core as core;
#[cfg(feature = "memory")]
pub use reinhardt_fixtures_memory as memory;

pub use reinhardt_fixtures_core::{
	AttrResult, AttrScope, AttributeFn, Deferred, FieldValues, FixtureBackend, FixtureBuilder,
	FixtureDefinition, FixtureError, FixtureGuard, FixtureId, FixtureRegistry, FixtureResult,
	FixtureSettings, Instance, ItemBuilder, ItemDescriptor, ItemId, ItemRef, LoadState, document,
	prelude, wrap,
};

#[cfg(feature = "memory")]
pub use reinhardt_fixtures_memory::{EntitySchema, MemoryBackend, MemoryStore};
