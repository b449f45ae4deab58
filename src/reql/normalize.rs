//! Value normalization: any supported [`Value`] becomes a [`Term`].
//!
//! Classification order:
//!
//! 1. an already-built term is returned unchanged
//! 2. null becomes a DATUM null leaf
//! 3. a string-keyed object becomes MAKE_OBJ with one option per key
//! 4. an array becomes MAKE_ARRAY with the elements in order
//! 5. any remaining scalar becomes a DATUM leaf
//!
//! Raw nesting is bounded by a depth limit; built terms do not count
//! towards it.

use super::ast::{Term, TermBuilder};
use super::datum::Datum;
use super::terms::TermType;
use super::value::Value;
use crate::error::{Error, Result};

/// Default limit on raw value nesting, matching the official drivers.
pub const DEFAULT_NESTING_DEPTH: usize = 20;

/// Normalizer with a configurable nesting depth limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normalizer {
    nesting_depth: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            nesting_depth: DEFAULT_NESTING_DEPTH,
        }
    }
}

impl Normalizer {
    pub fn new(nesting_depth: usize) -> Self {
        Self { nesting_depth }
    }

    pub fn nesting_depth(&self) -> usize {
        self.nesting_depth
    }

    /// Convert a value into a term.
    pub fn normalize(&self, value: Value) -> Result<Term> {
        self.normalize_at(value, self.nesting_depth)
    }

    fn normalize_at(&self, value: Value, depth: usize) -> Result<Term> {
        match value {
            Value::Term(term) => Ok(term),
            Value::Null => Ok(Term::datum(Datum::Null)),
            Value::Object(map) => {
                let depth = Self::descend(depth)?;
                map.into_iter()
                    .try_fold(
                        TermBuilder::new(TermType::MakeObj),
                        |builder, (key, value)| -> Result<TermBuilder> {
                            Ok(builder.optarg(key, self.normalize_at(value, depth)?))
                        },
                    )?
                    .build()
            }
            Value::Array(items) => {
                let depth = Self::descend(depth)?;
                let args = items
                    .into_iter()
                    .map(|item| self.normalize_at(item, depth))
                    .collect::<Result<Vec<_>>>()?;
                TermBuilder::new(TermType::MakeArray).args(args).build()
            }
            Value::Bool(b) => Ok(Term::datum(Datum::Boolean(b))),
            Value::Number(n) if n.is_finite() => Ok(Term::datum(Datum::Number(n))),
            Value::Number(n) => Err(Error::argument(format!(
                "type mismatch: {} is not representable as a JSON number",
                n
            ))),
            Value::String(s) => Ok(Term::datum(Datum::String(s))),
        }
    }

    fn descend(depth: usize) -> Result<usize> {
        depth
            .checked_sub(1)
            .ok_or_else(|| Error::argument("Nesting depth limit exceeded"))
    }
}

/// Normalize with the default depth limit.
pub fn normalize(value: impl Into<Value>) -> Result<Term> {
    Normalizer::default().normalize(value.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_is_identity() {
        let table = TermBuilder::new(TermType::Table)
            .arg(Term::datum(Datum::from("users")))
            .build()
            .unwrap();
        assert_eq!(normalize(table.clone()).unwrap(), table);
    }

    #[test]
    fn test_null_is_datum_null() {
        let term = normalize(Value::Null).unwrap();
        assert_eq!(term, Term::datum(Datum::Null));
        assert_eq!(normalize(None::<Vec<i32>>).unwrap(), Term::datum(Datum::Null));
    }

    #[test]
    fn test_empty_containers_stay_containers() {
        let array = normalize(Value::Array(vec![])).unwrap();
        assert_eq!(array.term_type(), TermType::MakeArray);
        assert!(array.args().is_empty());

        let object = normalize(Value::object(Vec::<(String, Value)>::new())).unwrap();
        assert_eq!(object.term_type(), TermType::MakeObj);
        assert!(object.optargs().is_empty());
    }

    #[test]
    fn test_array_keeps_order() {
        let term = normalize(vec![Value::from(1), Value::from("b"), Value::Null]).unwrap();
        assert_eq!(term.term_type(), TermType::MakeArray);
        assert_eq!(
            term.args(),
            &[
                Term::datum(Datum::Number(1.0)),
                Term::datum(Datum::from("b")),
                Term::datum(Datum::Null),
            ]
        );
    }

    #[test]
    fn test_object_keys_preserved() {
        let value = Value::object([("x", Value::from(1)), ("y", Value::from("s"))]);
        let term = normalize(value).unwrap();
        assert_eq!(term.term_type(), TermType::MakeObj);
        let keys: Vec<&str> = term.optargs().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "y"]);
        assert_eq!(term.optarg("x"), Some(&Term::datum(Datum::Number(1.0))));
        assert_eq!(term.optarg("y"), Some(&Term::datum(Datum::from("s"))));
    }

    #[test]
    fn test_non_finite_number_rejected() {
        let err = normalize(f64::INFINITY).unwrap_err();
        assert!(matches!(err, Error::Argument(ref m) if m.contains("type mismatch")));
        assert!(normalize(vec![f64::NAN]).is_err());
    }

    #[test]
    fn test_nesting_depth_limit() {
        let mut value = Value::from(1);
        for _ in 0..3 {
            value = Value::Array(vec![value]);
        }
        assert!(Normalizer::new(3).normalize(value.clone()).is_ok());
        let err = Normalizer::new(2).normalize(value).unwrap_err();
        assert_eq!(err, Error::Argument("Nesting depth limit exceeded".into()));
    }
}
