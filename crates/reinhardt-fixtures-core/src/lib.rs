//! Declarative test-data fixtures for the Reinhardt framework.
//!
//! A fixture is a named group of items, each describing one entity to persist
//! through a [`FixtureBackend`]. Items carry fixed values and computed
//! attributes; computed attributes may read other attributes of the same item
//! or fields of items in other fixtures, which are then loaded on demand.
//!
//! - **Reference counting**: repeated or nested loads of the same item create
//!   its entity once and destroy it on the matching last unload.
//! - **Iterative resolution**: computed attributes are resolved in rounds, so
//!   declaration order never matters; a round without progress is reported as
//!   a circular attribute dependency.
//! - **Lazy pull-in**: items read by a computed attribute are loaded first and
//!   released together with the item that needed them.
//! - **Inheritance**: fixtures extend other fixtures and items extend items,
//!   overriding values and attributes by name.
//!
//! # Features
//!
//! JSON fixture documents are always available.
//!
//! - `yaml` - YAML fixture documents
//! - `full` - All features enabled
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use reinhardt_fixtures_core::prelude::*;
//! use serde_json::json;
//!
//! struct EchoBackend;
//!
//! impl FixtureBackend for EchoBackend {
//!     fn create_instance(&self, _: &ItemDescriptor, values: &FieldValues) -> FixtureResult<Option<Instance>> {
//!         let mut fields = values.clone();
//!         fields.insert("id".to_string(), json!(1));
//!         Ok(Some(Instance::new(fields)))
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
//!             .with_item(
//!                 ItemBuilder::new("first")
//!                     .value("x", 42)
//!                     .computed("y", |scope| Ok(json!(scope.get_as::<i64>("x")? / 2))),
//!             ),
//!     )
//!     .unwrap();
//!
//! registry
//!     .with_fixture(accounts, |registry| {
//!         let first = registry.item_id(accounts, "first")?;
//!         assert_eq!(registry.instance(first)?.get("y"), Some(&json!(21)));
//!         Ok(())
//!     })
//!     .unwrap();
//! assert!(registry.loaded_items().is_empty());
//! ```
//!
//! # Architecture
//!
//! - [`FixtureRegistry`] - Owns definitions and item state, drives loading
//! - [`FixtureBuilder`] / [`ItemBuilder`] - Declaration API
//! - [`AttrScope`] - Resolution-time view handed to computed attributes
//! - [`FixtureGuard`] / [`wrap`] - Scoped use with guaranteed unload
//! - [`document`] - JSON/YAML fixture documents
//! - [`FixtureSettings`] - Depth limit and teardown policy

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod definition;
pub mod document;
pub mod error;
pub mod guard;
pub mod item;
mod loader;
pub mod prelude;
pub mod registry;
pub mod scope;
pub mod settings;

#[cfg(test)]
mod test_support;

// Re-export commonly used types at crate root
pub use backend::{DEFAULT_PRIMARY_KEY, FixtureBackend};
pub use definition::{FixtureBuilder, FixtureDefinition, FixtureId, ItemBuilder};
pub use error::{FixtureError, FixtureResult};
pub use guard::{FixtureGuard, wrap};
pub use item::{AttributeFn, FieldValues, Instance, ItemDescriptor, ItemId, ItemRef, LoadState};
pub use registry::FixtureRegistry;
pub use scope::{AttrResult, AttrScope, Deferred};
pub use settings::FixtureSettings;
