//! Shape and type classifiers over raw values and built terms.
//!
//! Every predicate is total and side-effect free. Raw scalars and DATUM
//! leaves holding the same scalar classify the same way, so a value that
//! has already been normalized keeps its classification.

use super::ast::Term;
use super::datum::Datum;
use super::terms::TermType;
use super::value::Value;

/// Operation codes whose result is a selection the server can still filter,
/// slice, update or delete through.
pub const SELECTION_TYPES: &[TermType] = &[
    TermType::Table,
    TermType::Get,
    TermType::GetAll,
    TermType::Between,
    TermType::Filter,
    TermType::OrderBy,
    TermType::Slice,
    TermType::Skip,
    TermType::Limit,
    TermType::Nth,
    TermType::Sample,
    TermType::Distinct,
];

fn datum_of(value: &Value) -> Option<&Datum> {
    value.as_term().and_then(Term::as_datum)
}

pub fn is_string(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        _ => matches!(datum_of(value), Some(Datum::String(_))),
    }
}

pub fn is_number(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        _ => matches!(datum_of(value), Some(Datum::Number(_))),
    }
}

/// A number without a fractional part.
pub fn is_integer(value: &Value) -> bool {
    value
        .as_number()
        .map(|n| n.is_finite() && n.fract() == 0.0)
        .unwrap_or(false)
}

pub fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        _ => matches!(datum_of(value), Some(Datum::Boolean(_))),
    }
}

pub fn is_null(value: &Value) -> bool {
    match value {
        Value::Null => true,
        _ => matches!(datum_of(value), Some(Datum::Null)),
    }
}

/// Any JSON-literal-shaped value: scalars, and arrays/objects made only of
/// literals. Operation terms are not literals.
pub fn is_datum(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => true,
        Value::Number(n) => n.is_finite(),
        Value::Array(items) => items.iter().all(is_datum),
        Value::Object(map) => map.values().all(is_datum),
        Value::Term(term) => term.is_datum(),
    }
}

/// String-keyed mapping: a raw object, a MAKE_OBJ term or an object datum.
pub fn is_object(value: &Value) -> bool {
    match value {
        Value::Object(_) => true,
        Value::Term(term) => {
            term.is(TermType::MakeObj) || matches!(term.as_datum(), Some(Datum::Object(_)))
        }
        _ => false,
    }
}

/// Array-like value excluding strings: a raw array, a MAKE_ARRAY term or an
/// array datum.
pub fn is_array(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Term(term) => {
            term.is(TermType::MakeArray) || matches!(term.as_datum(), Some(Datum::Array(_)))
        }
        _ => false,
    }
}

/// Anything the server can iterate: arrays plus selections and other
/// sequence-producing operations.
pub fn is_sequence(value: &Value) -> bool {
    if is_array(value) || is_select(value) {
        return true;
    }
    matches!(
        value.as_term().map(Term::term_type),
        Some(
            TermType::Map
                | TermType::ConcatMap
                | TermType::Union
                | TermType::Zip
                | TermType::Range
                | TermType::InnerJoin
                | TermType::OuterJoin
                | TermType::EqJoin
                | TermType::Pluck
                | TermType::Without
                | TermType::WithFields
                | TermType::Merge
                | TermType::TableList
                | TermType::DbList
                | TermType::IndexList
                | TermType::Changes
        )
    )
}

/// Tests a built term's operation code.
pub fn is_term_of_kind(value: &Value, term_type: TermType) -> bool {
    value.as_term().map(|t| t.is(term_type)).unwrap_or(false)
}

/// A FUNC term.
pub fn is_function(value: &Value) -> bool {
    is_term_of_kind(value, TermType::Func)
}

/// A term denoting a queryable selection (see [`SELECTION_TYPES`]).
pub fn is_select(value: &Value) -> bool {
    value
        .as_term()
        .map(|t| SELECTION_TYPES.contains(&t.term_type()))
        .unwrap_or(false)
}

/// Legal primary-key literal: a string or an integer.
pub fn is_pkey(value: &Value) -> bool {
    is_string(value) || is_integer(value)
}

/// Field path: a string, or a sequence (arbitrarily nested) of strings.
pub fn is_path(value: &Value) -> bool {
    if is_string(value) {
        return true;
    }
    match value {
        Value::Array(items) => !items.is_empty() && items.iter().all(is_path),
        Value::Object(map) => {
            !map.is_empty() && map.values().all(|v| is_path(v) || is_boolean(v))
        }
        Value::Term(term) => match term.as_datum() {
            Some(datum) => is_path(&Value::from(datum.clone())),
            None if term.is(TermType::MakeArray) => {
                !term.args().is_empty()
                    && term.args().iter().all(|t| is_path(&Value::Term(t.clone())))
            }
            None if term.is(TermType::MakeObj) => {
                !term.optargs().is_empty()
                    && term.optargs().values().all(|t| {
                        let v = Value::Term(t.clone());
                        is_path(&v) || is_boolean(&v)
                    })
            }
            None => false,
        },
        _ => false,
    }
}

/// An operation term whose result type is only known when the server runs
/// it. Containers and functions are excluded since their shape is fixed.
pub fn is_deferred(value: &Value) -> bool {
    match value.as_term() {
        Some(term) => !matches!(
            term.term_type(),
            TermType::Datum | TermType::MakeArray | TermType::MakeObj | TermType::Func
        ),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reql::TermBuilder;

    fn table() -> Value {
        Value::Term(
            TermBuilder::new(TermType::Table)
                .arg(Term::datum(Datum::from("users")))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_scalars() {
        assert!(is_string(&Value::from("a")));
        assert!(is_string(&Value::Term(Term::datum(Datum::from("a")))));
        assert!(!is_string(&Value::from(1)));
        assert!(is_number(&Value::from(1.5)));
        assert!(is_boolean(&Value::from(false)));
        assert!(is_null(&Value::Null));
        assert!(is_integer(&Value::from(4)));
        assert!(!is_integer(&Value::from(4.5)));
    }

    #[test]
    fn test_is_datum() {
        assert!(is_datum(&Value::from(vec![1, 2])));
        assert!(!is_datum(&Value::Number(f64::NAN)));
        assert!(!is_datum(&table()));
        assert!(!is_datum(&Value::Array(vec![table()])));
    }

    #[test]
    fn test_array_excludes_strings() {
        assert!(is_array(&Value::from(vec!["a"])));
        assert!(!is_array(&Value::from("abc")));
        assert!(!is_object(&Value::from("abc")));
        assert!(is_object(&Value::object([("a", 1)])));
    }

    #[test]
    fn test_select_and_sequence() {
        assert!(is_select(&table()));
        assert!(is_sequence(&table()));
        assert!(is_sequence(&Value::from(vec![1])));
        assert!(!is_select(&Value::from(vec![1])));
        assert!(is_term_of_kind(&table(), TermType::Table));
        assert!(!is_function(&table()));
    }

    #[test]
    fn test_pkey() {
        assert!(is_pkey(&Value::from("abc")));
        assert!(is_pkey(&Value::from(12)));
        assert!(!is_pkey(&Value::from(1.25)));
        assert!(!is_pkey(&Value::from(true)));
        assert!(!is_pkey(&Value::Null));
    }

    #[test]
    fn test_path() {
        assert!(is_path(&Value::from("name")));
        assert!(is_path(&Value::from(vec!["a", "b"])));
        assert!(is_path(&Value::Array(vec![
            Value::from("a"),
            Value::from(vec!["b", "c"]),
        ])));
        assert!(is_path(&Value::object([("address", true)])));
        assert!(!is_path(&Value::from(vec![1])));
        assert!(!is_path(&Value::Array(vec![])));
        assert!(!is_path(&Value::from(3)));
    }

    #[test]
    fn test_deferred() {
        assert!(is_deferred(&table()));
        assert!(!is_deferred(&Value::Term(Term::datum(Datum::Null))));
        assert!(!is_deferred(&Value::from("x")));
    }
}
