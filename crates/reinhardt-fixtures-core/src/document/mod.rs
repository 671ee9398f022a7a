//! Data-driven fixture documents.
//!
//! A document declares fixtures as JSON or YAML instead of builder calls:
//!
//! ```json
//! {
//!   "fixtures": [
//!     {
//!       "name": "BasicAccounts",
//!       "backend": "accounts",
//!       "items": [
//!         { "name": "first", "fields": { "x": 42, "y": 21 } },
//!         { "name": "second", "fields": { "x": 11, "y": 99 } }
//!       ]
//!     },
//!     {
//!       "name": "DependentAccounts",
//!       "backend": "accounts",
//!       "items": [
//!         {
//!           "name": "fourth",
//!           "fields": {
//!             "x": { "$ref": "BasicAccounts.first" },
//!             "y": { "$ref": "BasicAccounts.second.key" }
//!           }
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Field values are literals or one of the directives described on
//! [`FieldDirective`]. Documents are parsed with [`DocumentParser`] and turned
//! into registered fixtures with [`DocumentLoader`].

mod format;
mod loader;
mod parser;

pub use format::DocumentFormat;
pub use loader::DocumentLoader;
pub use parser::DocumentParser;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{FixtureError, FixtureResult};

/// Key of the directive reading another item's primary key or field.
pub const REF_KEY: &str = "$ref";

/// Key of the directive reading another attribute of the same item.
pub const SELF_KEY: &str = "$self";

/// A parsed fixture document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixtureDocument {
	/// Fixture declarations, parents before children.
	pub fixtures: Vec<FixtureSpec>,
}

/// Declaration of one fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSpec {
	/// Fixture name, unique per registry.
	pub name: String,

	/// Name of the backend registered on the [`DocumentLoader`].
	///
	/// Without one the nearest parent's backend is used.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub backend: Option<String>,

	/// Parent fixtures, most general first.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub extends: Vec<String>,

	/// Items in declaration order.
	#[serde(default)]
	pub items: Vec<ItemSpec>,
}

/// Declaration of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSpec {
	/// Item name, unique within its fixture.
	pub name: String,

	/// Base item whose fields are inherited.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub extends: Option<String>,

	/// Field values and directives.
	#[serde(default)]
	pub fields: IndexMap<String, Value>,
}

/// Interpretation of a field value in a document.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDirective {
	/// A plain value.
	Literal(Value),
	/// `{"$ref": "Fixture.item"}`: the primary key of another item.
	PrimaryKey {
		/// Fixture name.
		fixture: String,
		/// Item name.
		item: String,
	},
	/// `{"$ref": "Fixture.item.field"}`: a field of another item's instance.
	Field {
		/// Fixture name.
		fixture: String,
		/// Item name.
		item: String,
		/// Field name.
		field: String,
	},
	/// `{"$self": "attr"}`: another attribute of the same item.
	Sibling(String),
}

impl FieldDirective {
	/// Interprets a field value.
	///
	/// Only single-key objects keyed by `$ref` or `$self` are directives; any
	/// other value is a literal.
	///
	/// # Example
	///
	/// ```
	/// # use reinhardt_fixtures_core::document::FieldDirective;
	/// # use serde_json::json;
	/// assert_eq!(
	///     FieldDirective::parse(&json!({"$ref": "Accounts.first"})).unwrap(),
	///     FieldDirective::PrimaryKey { fixture: "Accounts".into(), item: "first".into() }
	/// );
	/// assert_eq!(
	///     FieldDirective::parse(&json!({"$self": "x"})).unwrap(),
	///     FieldDirective::Sibling("x".into())
	/// );
	/// assert_eq!(FieldDirective::parse(&json!(7)).unwrap(), FieldDirective::Literal(json!(7)));
	/// ```
	pub fn parse(value: &Value) -> FixtureResult<Self> {
		let Some(object) = value.as_object().filter(|o| o.len() == 1) else {
			return Ok(Self::Literal(value.clone()));
		};
		if let Some(target) = object.get(REF_KEY) {
			let target = directive_target(REF_KEY, target)?;
			let parts: Vec<&str> = target.split('.').collect();
			if parts.iter().any(|part| part.is_empty()) {
				return Err(invalid_ref(target));
			}
			return match parts.as_slice() {
				[fixture, item] => Ok(Self::PrimaryKey {
					fixture: fixture.to_string(),
					item: item.to_string(),
				}),
				[fixture, item, field] => Ok(Self::Field {
					fixture: fixture.to_string(),
					item: item.to_string(),
					field: field.to_string(),
				}),
				_ => Err(invalid_ref(target)),
			};
		}
		if let Some(target) = object.get(SELF_KEY) {
			return Ok(Self::Sibling(directive_target(SELF_KEY, target)?.to_string()));
		}
		Ok(Self::Literal(value.clone()))
	}
}

fn directive_target<'v>(key: &str, value: &'v Value) -> FixtureResult<&'v str> {
	value
		.as_str()
		.filter(|target| !target.is_empty())
		.ok_or_else(|| FixtureError::InvalidDocument(format!("'{}' expects a non-empty string", key)))
}

fn invalid_ref(target: &str) -> FixtureError {
	FixtureError::InvalidDocument(format!(
		"'{}' target '{}' must be 'Fixture.item' or 'Fixture.item.field'",
		REF_KEY, target
	))
}
