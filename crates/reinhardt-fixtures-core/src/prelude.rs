//! Convenience re-exports for common usage.
//!
//! ```
//! use reinhardt_fixtures_core::prelude::*;
//!
//! let registry = FixtureRegistry::with_settings(FixtureSettings::default().with_max_depth(16));
//! assert_eq!(registry.settings().max_depth, 16);
//! ```

// Error types
pub use crate::error::{FixtureError, FixtureResult};

// Declaration
pub use crate::definition::{FixtureBuilder, FixtureId, ItemBuilder};
pub use crate::item::{AttributeFn, FieldValues, Instance, ItemDescriptor, ItemId, ItemRef};
pub use crate::scope::{AttrResult, AttrScope, Deferred};

// Loading
pub use crate::backend::FixtureBackend;
pub use crate::guard::{FixtureGuard, wrap};
pub use crate::registry::FixtureRegistry;
pub use crate::settings::FixtureSettings;

// Documents
pub use crate::document::{DocumentFormat, DocumentLoader, DocumentParser, FixtureDocument};
