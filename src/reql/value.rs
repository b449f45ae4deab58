//! Raw values accepted by command constructors.
//!
//! `Value` is the closed universe of things a caller may pass where a term
//! is expected: JSON-shaped scalars and containers, or an already-built
//! [`Term`]. The normalizer turns any `Value` into a `Term`.

use super::ast::Term;
use super::datum::Datum;
use std::collections::{BTreeMap, HashMap};

/// A host value awaiting normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Term(Term),
}

impl Value {
    /// Builds an object value from key/value pairs.
    pub fn object<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Term(_) => "term",
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Value::Term(term) => Some(term),
            _ => None,
        }
    }

    /// The string content of a raw string or a DATUM string leaf.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Term(term) => term.as_datum().and_then(Datum::as_string),
            _ => None,
        }
    }

    /// The numeric content of a raw number or a DATUM number leaf.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Term(term) => term.as_datum().and_then(Datum::as_number),
            _ => None,
        }
    }
}

impl From<Term> for Value {
    fn from(term: Term) -> Self {
        Value::Term(term)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! numeric_value {
    ($($t:ty),+) => {
        $(impl From<$t> for Value {
            fn from(n: $t) -> Self {
                Value::Number(n as f64)
            }
        })+
    };
}

// Numbers are f64 on the wire. 64-bit integers beyond 2^53 round to the
// nearest representable value; pass such keys as strings.
numeric_value!(i8, i16, i32, i64, u8, u16, u32, u64, usize, f32, f64);

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Value>> From<BTreeMap<String, V>> for Value {
    fn from(map: BTreeMap<String, V>) -> Self {
        Value::object(map)
    }
}

impl<V: Into<Value>> From<HashMap<String, V>> for Value {
    fn from(map: HashMap<String, V>) -> Self {
        Value::object(map)
    }
}

impl From<Datum> for Value {
    fn from(datum: Datum) -> Self {
        match datum {
            Datum::Null => Value::Null,
            Datum::Boolean(b) => Value::Bool(b),
            Datum::Number(n) => Value::Number(n),
            Datum::String(s) => Value::String(s),
            Datum::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            Datum::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from(Datum::from(json))
    }
}

/// Times are sent as `EPOCH_TIME(seconds)`, with sub-second precision kept
/// as the fractional part.
impl From<chrono::DateTime<chrono::Utc>> for Value {
    fn from(time: chrono::DateTime<chrono::Utc>) -> Self {
        let seconds = time.timestamp_millis() as f64 / 1000.0;
        Value::Term(Term::operation(
            super::TermType::EpochTime,
            vec![Term::datum(Datum::Number(seconds))],
        ))
    }
}
