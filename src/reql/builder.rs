//! Term construction from raw positional arguments and named options.

use super::ast::{Term, TermBuilder};
use super::datum::Datum;
use super::normalize::Normalizer;
use super::terms::TermType;
use super::value::Value;
use crate::error::Result;

/// Named options in call order. Kept as a list so a repeated name can be
/// detected instead of silently overwritten.
pub type Options = Vec<(String, Value)>;

impl Normalizer {
    /// Normalize every argument and option value, then assemble the node.
    pub fn create_term(
        &self,
        term_type: TermType,
        args: Vec<Value>,
        options: Options,
    ) -> Result<Term> {
        let args = args
            .into_iter()
            .map(|arg| self.normalize(arg))
            .collect::<Result<Vec<_>>>()?;

        options
            .into_iter()
            .try_fold(
                TermBuilder::new(term_type).args(args),
                |builder, (key, value)| -> Result<TermBuilder> {
                    let (key, term) = self.term_assoc(key, value)?;
                    Ok(builder.optarg(key, term))
                },
            )?
            .build()
    }

    /// One named-option entry with its value normalized.
    pub fn term_assoc(
        &self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(String, Term)> {
        Ok((key.into(), self.normalize(value.into())?))
    }
}

/// [`Normalizer::create_term`] with the default normalizer.
pub fn create_term(term_type: TermType, args: Vec<Value>, options: Options) -> Result<Term> {
    Normalizer::default().create_term(term_type, args, options)
}

/// [`Normalizer::term_assoc`] with the default normalizer.
pub fn term_assoc(key: impl Into<String>, value: impl Into<Value>) -> Result<(String, Term)> {
    Normalizer::default().term_assoc(key, value)
}

/// DATUM leaf wrapping a literal directly, without container expansion.
pub fn term_from_datum(literal: impl Into<Datum>) -> Term {
    Term::datum(literal.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_create_term_normalizes_children() {
        let term = create_term(
            TermType::Eq,
            vec![Value::from(1), Value::from(vec!["a"])],
            vec![],
        )
        .unwrap();
        assert_eq!(term.term_type(), TermType::Eq);
        assert_eq!(term.arg(0), Some(&Term::datum(Datum::Number(1.0))));
        assert_eq!(term.arg(1).map(Term::term_type), Some(TermType::MakeArray));
    }

    #[test]
    fn test_create_term_options() {
        let term = create_term(
            TermType::Between,
            vec![Value::from(1), Value::from(2)],
            vec![("index".into(), Value::from("code"))],
        )
        .unwrap();
        assert_eq!(term.optarg("index"), Some(&Term::datum(Datum::from("code"))));
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let err = create_term(
            TermType::Between,
            vec![],
            vec![
                ("index".into(), Value::from("a")),
                ("index".into(), Value::from("b")),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_term_assoc_and_datum() {
        let (key, term) = term_assoc("durability", "soft").unwrap();
        assert_eq!(key, "durability");
        assert_eq!(term, term_from_datum("soft"));

        let literal = term_from_datum(Datum::Array(vec![Datum::from(1)]));
        assert!(literal.is_datum());
        assert!(literal.args().is_empty());
    }
}
