//! Commands: descriptors, the builtin table, the registry and the textual
//! expression form that resolves through it.
//!
//! ```rust
//! use reql_builder::query::global;
//! use reql_builder::reql::{TermType, Value};
//!
//! let direct = global()
//!     .dispatch("insert", vec![
//!         Value::from(global().dispatch("table", vec![Value::from("users")], vec![]).unwrap()),
//!         Value::object([("name", "ada")]),
//!     ], vec![])
//!     .unwrap();
//! let parsed = global().build(r#"(insert (table "users") {"name" "ada"})"#).unwrap();
//! assert_eq!(parsed, direct);
//! assert_eq!(parsed.term_type(), TermType::Insert);
//! ```

pub mod commands;
pub mod descriptor;
pub mod dsl;
pub mod func;
pub mod registry;

pub use commands::{builtin, register_builtins, ALIASES, BUILTINS};
pub use descriptor::{Check, CommandDescriptor, Constructor, OptSpec};
pub use func::{func, func_arity, var};
pub use registry::{global, CommandRegistry};
