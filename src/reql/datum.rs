//! Literal values carried by DATUM leaves.
//!
//! `Datum` follows JSON's value model exactly; numbers are `f64`, objects
//! keep their keys sorted so that equal literals compare and print equal.
//!
//! ```rust
//! use reql_builder::reql::Datum;
//!
//! let row = Datum::from(serde_json::json!({"name": "Alice", "age": 30}));
//! assert_eq!(row.type_name(), "OBJECT");
//! assert_eq!(row.to_string(), r#"{"age": 30, "name": "Alice"}"#);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<Datum>),
    Object(BTreeMap<String, Datum>),
}

impl Datum {
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        if let Datum::String(s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let Datum::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Datum::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[Datum]> {
        if let Datum::Array(items) = self {
            Some(items)
        } else {
            None
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Datum>> {
        if let Datum::Object(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Type name as reported by the server's `TYPE_OF`.
    pub fn type_name(&self) -> &'static str {
        match self {
            Datum::Null => "NULL",
            Datum::Boolean(_) => "BOOL",
            Datum::Number(_) => "NUMBER",
            Datum::String(_) => "STRING",
            Datum::Array(_) => "ARRAY",
            Datum::Object(_) => "OBJECT",
        }
    }
}

macro_rules! numeric_datum {
    ($($t:ty),+) => {
        $(impl From<$t> for Datum {
            fn from(n: $t) -> Self {
                Datum::Number(n as f64)
            }
        })+
    };
}

// Numbers are f64 on the wire. 64-bit integers beyond 2^53 round to the
// nearest representable value; pass such keys as strings.
numeric_datum!(i32, i64, u32, u64, f64);

impl From<bool> for Datum {
    fn from(b: bool) -> Self {
        Datum::Boolean(b)
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_owned())
    }
}

impl From<Json> for Datum {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => Datum::Null,
            Json::Bool(b) => Datum::Boolean(b),
            // integers beyond 2^53 lose precision, as in every JSON driver
            Json::Number(n) => n.as_f64().map_or(Datum::Null, Datum::Number),
            Json::String(s) => Datum::String(s),
            Json::Array(items) => items.into_iter().map(Datum::from).collect::<Vec<_>>().into(),
            Json::Object(map) => Datum::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Datum::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<Vec<Datum>> for Datum {
    fn from(items: Vec<Datum>) -> Self {
        Datum::Array(items)
    }
}

/// Non-finite numbers have no JSON form and become `null`.
impl From<Datum> for Json {
    fn from(datum: Datum) -> Self {
        match datum {
            Datum::Null => Json::Null,
            Datum::Boolean(b) => Json::Bool(b),
            Datum::Number(n) => serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number),
            Datum::String(s) => Json::String(s),
            Datum::Array(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            Datum::Object(map) => Json::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Json::from(value)))
                    .collect(),
            ),
        }
    }
}

fn write_joined<I, T>(f: &mut fmt::Formatter<'_>, items: I) -> fmt::Result
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// JSON-like rendering; integral numbers print without a fraction.
impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => f.write_str("null"),
            Datum::Boolean(b) => write!(f, "{}", b),
            Datum::Number(n) => write!(f, "{}", n),
            Datum::String(s) => write!(f, "{:?}", s),
            Datum::Array(items) => {
                f.write_str("[")?;
                write_joined(f, items)?;
                f.write_str("]")
            }
            Datum::Object(map) => {
                f.write_str("{")?;
                write_joined(f, map.iter().map(|(key, value)| format!("{:?}: {}", key, value)))?;
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_nested() {
        let datum = Datum::from(json!({"tags": ["a", null], "ok": true, "n": 2}));
        let fields = datum.as_object().unwrap();
        assert_eq!(fields["n"].as_number(), Some(2.0));
        assert_eq!(fields["ok"].as_bool(), Some(true));
        assert_eq!(
            fields["tags"].as_array(),
            Some(&[Datum::from("a"), Datum::Null][..])
        );
        assert_eq!(fields["tags"].type_name(), "ARRAY");
    }

    #[test]
    fn test_non_finite_has_no_json_form() {
        assert_eq!(Json::from(Datum::Number(f64::INFINITY)), Json::Null);
        assert_eq!(Json::from(Datum::from(7u32)), json!(7.0));
    }

    #[test]
    fn test_display() {
        let datum = Datum::Array(vec![Datum::Null, Datum::from(1), Datum::from("x")]);
        assert_eq!(datum.to_string(), "[null, 1, \"x\"]");
        assert_eq!(Datum::from(json!({})).to_string(), "{}");
    }
}
