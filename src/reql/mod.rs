//! ReQL (RethinkDB Query Language) term trees.
//!
//! This module holds the data model and the construction primitives:
//!
//! - **Term Types**: the closed enumeration of operation codes
//! - **AST**: `Term` nodes (operation nodes and datum leaves)
//! - **Datum**: JSON-like literal values
//! - **Value**: raw host values awaiting normalization
//! - **Predicates**: type and shape classifiers
//! - **Normalizer & Builder**: `Value` → `Term` conversion and node assembly
//!
//! # Example
//!
//! ```rust
//! use reql_builder::reql::{create_term, normalize, TermType, Value};
//!
//! let table = create_term(TermType::Table, vec![Value::from("users")], vec![]).unwrap();
//! let query = create_term(
//!     TermType::Filter,
//!     vec![Value::from(table), Value::object([("active", true)])],
//!     vec![],
//! )
//! .unwrap();
//! assert_eq!(normalize(query.clone()).unwrap(), query);
//! ```

pub mod ast;
pub mod builder;
pub mod datum;
pub mod normalize;
pub mod predicates;
pub mod terms;
pub mod value;

pub use ast::{Term, TermBuilder};
pub use builder::{create_term, term_assoc, term_from_datum, Options};
pub use datum::Datum;
pub use normalize::{normalize, Normalizer, DEFAULT_NESTING_DEPTH};
pub use terms::TermType;
pub use value::Value;
