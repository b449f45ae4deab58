//! Typed entry points for the most common commands.
//!
//! Every function here goes through the builtin descriptor of the same
//! name, so the checks are exactly those applied by [`CommandRegistry`].
//! Living under `r::` keeps names such as `map`, `filter` or `time` from
//! shadowing anything at the call site.
//!
//! ```rust
//! use reql_builder::r;
//!
//! let users = r::table("users").unwrap();
//! let query = r::between(users, 1, 10, Some("code")).unwrap();
//! assert_eq!(query.optargs().len(), 1);
//! ```
//!
//! [`CommandRegistry`]: crate::query::CommandRegistry

use crate::error::{Error, Result};
use crate::query::{builtin, global};
use crate::reql::{normalize, Options, Term, Value};

pub use crate::query::func::{func, var};

fn invoke(name: &str, args: Vec<Value>, options: Options) -> Result<Term> {
    builtin(name)
        .ok_or_else(|| Error::Registry(format!("Unknown command '{}'", name)))?
        .call(args, options)
}

fn index_option(index: Option<&str>) -> Options {
    index
        .map(|index| vec![("index".to_string(), Value::from(index))])
        .unwrap_or_default()
}

/// Any value as a term.
pub fn expr(value: impl Into<Value>) -> Result<Term> {
    normalize(value)
}

/// Invoke a command of the process-wide registry by name.
pub fn call(name: &str, args: Vec<Value>, options: Options) -> Result<Term> {
    global().dispatch(name, args, options)
}

pub fn db(name: &str) -> Result<Term> {
    invoke("db", vec![Value::from(name)], vec![])
}

pub fn table(name: &str) -> Result<Term> {
    invoke("table", vec![Value::from(name)], vec![])
}

/// `table` scoped to a database term.
pub fn db_table(db: Term, name: &str) -> Result<Term> {
    invoke("table", vec![Value::from(db), Value::from(name)], vec![])
}

pub fn table_create(name: &str, options: Options) -> Result<Term> {
    invoke("table_create", vec![Value::from(name)], options)
}

pub fn get(table: Term, key: impl Into<Value>) -> Result<Term> {
    invoke("get", vec![Value::from(table), key.into()], vec![])
}

pub fn get_all<K: Into<Value>>(table: Term, keys: Vec<K>, index: Option<&str>) -> Result<Term> {
    let args = std::iter::once(Value::from(table))
        .chain(keys.into_iter().map(Into::into))
        .collect();
    invoke("get_all", args, index_option(index))
}

pub fn between(
    selection: Term,
    lower: impl Into<Value>,
    upper: impl Into<Value>,
    index: Option<&str>,
) -> Result<Term> {
    invoke(
        "between",
        vec![Value::from(selection), lower.into(), upper.into()],
        index_option(index),
    )
}

/// `predicate` is either a one-parameter function or a template object.
pub fn filter(sequence: Term, predicate: impl Into<Value>) -> Result<Term> {
    invoke("filter", vec![Value::from(sequence), predicate.into()], vec![])
}

pub fn insert(table: Term, documents: impl Into<Value>, options: Options) -> Result<Term> {
    invoke("insert", vec![Value::from(table), documents.into()], options)
}

pub fn update(selection: Term, changes: impl Into<Value>, options: Options) -> Result<Term> {
    invoke("update", vec![Value::from(selection), changes.into()], options)
}

pub fn delete(selection: Term, options: Options) -> Result<Term> {
    invoke("delete", vec![Value::from(selection)], options)
}

pub fn map(sequence: Term, f: Term) -> Result<Term> {
    invoke("map", vec![Value::from(sequence), Value::from(f)], vec![])
}

pub fn reduce(sequence: Term, f: Term) -> Result<Term> {
    invoke("reduce", vec![Value::from(sequence), Value::from(f)], vec![])
}

pub fn count(sequence: Term) -> Result<Term> {
    invoke("count", vec![Value::from(sequence)], vec![])
}

/// `object(k1, v1, k2, v2, ...)` from pairs.
pub fn object<K, V, I>(pairs: I) -> Result<Term>
where
    K: Into<Value>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    let args = pairs
        .into_iter()
        .flat_map(|(key, value)| [key.into(), value.into()])
        .collect();
    invoke("object", args, vec![])
}

pub fn now() -> Result<Term> {
    invoke("now", vec![], vec![])
}

/// `time(year, month, day, timezone)`
pub fn date(year: i32, month: u32, day: u32, timezone: &str) -> Result<Term> {
    invoke(
        "time",
        vec![
            Value::from(year),
            Value::from(month),
            Value::from(day),
            Value::from(timezone),
        ],
        vec![],
    )
}

/// `time(year, month, day, hour, minute, second, timezone)`
pub fn time(
    (year, month, day): (i32, u32, u32),
    (hour, minute, second): (u32, u32, f64),
    timezone: &str,
) -> Result<Term> {
    invoke(
        "time",
        vec![
            Value::from(year),
            Value::from(month),
            Value::from(day),
            Value::from(hour),
            Value::from(minute),
            Value::from(second),
            Value::from(timezone),
        ],
        vec![],
    )
}

/// `do`: call `f` with `args`.
pub fn do_(mut args: Vec<Value>, f: Term) -> Result<Term> {
    args.push(Value::from(f));
    invoke("do", args, vec![])
}
