//! Function terms.
//!
//! A function is `FUNC(MAKE_ARRAY(DATUM(id)...), body)`; the body refers to
//! its parameters through `VAR(DATUM(id))`. The declared arity is the number
//! of parameter ids.

use crate::error::{Error, Result};
use crate::reql::{normalize, Datum, Term, TermType, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

/// Reserve `count` variable ids that no other function in this process uses.
pub fn fresh_var_ids(count: usize) -> Vec<u64> {
    (0..count)
        .map(|_| NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed))
        .collect()
}

/// Reference to a function parameter.
pub fn var(id: u64) -> Term {
    Term::operation(TermType::Var, vec![Term::datum(Datum::Number(id as f64))])
}

/// Assemble a FUNC term from parameter ids and an already-built body.
pub fn func_from_parts(ids: &[u64], body: Term) -> Term {
    let params = ids
        .iter()
        .map(|id| Term::datum(Datum::Number(*id as f64)))
        .collect();
    Term::operation(
        TermType::Func,
        vec![Term::operation(TermType::MakeArray, params), body],
    )
}

/// Build a function of `arity` parameters. The closure receives the
/// parameter references and returns the body.
///
/// ```rust
/// use reql_builder::query::func::{func, func_arity};
/// use reql_builder::reql::Value;
///
/// let identity = func(1, |vars| Ok(Value::from(vars[0].clone()))).unwrap();
/// assert_eq!(func_arity(&identity), Some(1));
/// ```
pub fn func<F>(arity: usize, body: F) -> Result<Term>
where
    F: FnOnce(&[Term]) -> Result<Value>,
{
    let ids = fresh_var_ids(arity);
    let vars: Vec<Term> = ids.iter().map(|id| var(*id)).collect();
    let body = normalize(body(&vars)?)?;
    Ok(func_from_parts(&ids, body))
}

/// Declared parameter count of a FUNC term, `None` for anything else.
pub fn func_arity(term: &Term) -> Option<usize> {
    if !term.is(TermType::Func) {
        return None;
    }
    let params = term.first_arg()?;
    match params.as_datum() {
        Some(Datum::Array(ids)) => Some(ids.len()),
        Some(_) => None,
        None if params.is(TermType::MakeArray) => Some(params.args().len()),
        None => None,
    }
}

/// Fails unless `value` is a function declaring exactly `arity` parameters.
pub fn expect_arity(value: &Value, arity: usize) -> Result<()> {
    let term = value
        .as_term()
        .filter(|t| t.is(TermType::Func))
        .ok_or_else(|| {
            Error::argument(format!(
                "expected a function of arity {}, got {}",
                arity,
                value.kind_name()
            ))
        })?;
    match func_arity(term) {
        Some(declared) if declared == arity => Ok(()),
        Some(declared) => Err(Error::argument(format!(
            "expected a function of arity {}, got arity {}",
            arity, declared
        ))),
        None => Err(Error::argument("malformed function parameters")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_func_shape() {
        let f = func(2, |vars| {
            assert_eq!(vars.len(), 2);
            Ok(Value::from(vec![vars[0].clone(), vars[1].clone()]))
        })
        .unwrap();

        assert_eq!(f.term_type(), TermType::Func);
        assert_eq!(func_arity(&f), Some(2));

        let params = f.first_arg().unwrap();
        let body = f.arg(1).unwrap();
        assert_eq!(body.term_type(), TermType::MakeArray);
        // the body references exactly the declared parameters
        for (param, reference) in params.args().iter().zip(body.args()) {
            assert_eq!(reference.term_type(), TermType::Var);
            assert_eq!(reference.first_arg(), Some(param));
        }
    }

    #[test]
    fn test_ids_are_fresh() {
        let a = fresh_var_ids(2);
        let b = fresh_var_ids(1);
        assert!(!a.contains(&b[0]));
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_expect_arity() {
        let f = func(1, |_| Ok(Value::from(true))).unwrap();
        assert!(expect_arity(&Value::from(f.clone()), 1).is_ok());

        let err = expect_arity(&Value::from(f), 2).unwrap_err();
        assert_eq!(
            err,
            Error::Argument("expected a function of arity 2, got arity 1".into())
        );
        assert!(expect_arity(&Value::from("x"), 1).is_err());
    }

    #[test]
    fn test_func_arity_of_non_function() {
        assert_eq!(func_arity(&Term::datum(Datum::Null)), None);
    }
}
