//! Query trees.
//!
//! A [`Term`] is either a DATUM leaf holding a literal or an operation node
//! with positional children and named options. Nothing else is
//! representable: the fields are private, leaves come from [`Term::datum`]
//! and operation nodes from [`TermBuilder`], which only accepts children
//! that are already built.
//!
//! ```rust
//! use reql_builder::reql::{Datum, Term, TermBuilder, TermType};
//!
//! // r.table("users").filter({age: 25})
//! let users = TermBuilder::new(TermType::Table)
//!     .arg(Term::datum(Datum::from("users")))
//!     .build()
//!     .unwrap();
//! let age = TermBuilder::new(TermType::MakeObj)
//!     .optarg("age", Term::datum(Datum::from(25)))
//!     .build()
//!     .unwrap();
//! let query = TermBuilder::new(TermType::Filter)
//!     .args([users, age])
//!     .build()
//!     .unwrap();
//! assert_eq!(query.to_string(), r#"FILTER(TABLE("users"), MAKE_OBJ(age=25))"#);
//! ```

use super::datum::Datum;
use super::terms::TermType;
use crate::error::{Error, Result};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

/// Serializes with the numeric protocol code in `term_type`, so the JSON
/// form is what a wire codec expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Term {
    #[serde(serialize_with = "protocol_code")]
    term_type: TermType,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    args: Vec<Term>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    optargs: BTreeMap<String, Term>,

    #[serde(skip_serializing_if = "Option::is_none")]
    datum: Option<Datum>,
}

fn protocol_code<S: Serializer>(
    term_type: &TermType,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(term_type.to_u64())
}

impl Term {
    pub fn datum(datum: Datum) -> Self {
        Self {
            term_type: TermType::Datum,
            args: Vec::new(),
            optargs: BTreeMap::new(),
            datum: Some(datum),
        }
    }

    /// Option-less node for call sites with a fixed, non-DATUM code.
    pub(crate) fn operation(term_type: TermType, args: Vec<Term>) -> Self {
        debug_assert!(term_type != TermType::Datum);
        Self {
            term_type,
            args,
            optargs: BTreeMap::new(),
            datum: None,
        }
    }

    pub fn term_type(&self) -> TermType {
        self.term_type
    }

    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// Named options, ordered by name.
    pub fn optargs(&self) -> &BTreeMap<String, Term> {
        &self.optargs
    }

    pub fn first_arg(&self) -> Option<&Term> {
        self.args.first()
    }

    pub fn arg(&self, index: usize) -> Option<&Term> {
        self.args.get(index)
    }

    pub fn optarg(&self, name: &str) -> Option<&Term> {
        self.optargs.get(name)
    }

    pub fn is_datum(&self) -> bool {
        self.datum.is_some()
    }

    pub fn is(&self, term_type: TermType) -> bool {
        self.term_type == term_type
    }

    /// The literal of a DATUM leaf; `None` for operation nodes.
    pub fn as_datum(&self) -> Option<&Datum> {
        self.datum.as_ref()
    }

    fn children(&self) -> impl Iterator<Item = &Term> {
        self.args.iter().chain(self.optargs.values())
    }

    /// Nodes in this subtree, options included.
    pub fn node_count(&self) -> usize {
        1 + self.children().map(Term::node_count).sum::<usize>()
    }

    /// Multi-line rendering: one positional child per line, options in a
    /// trailing `{ name: value }` block.
    pub fn pretty_print(&self, indent: usize) -> String {
        let mut out = String::new();
        // writing into a String cannot fail
        let _ = self.write_tree(&mut out, indent);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) -> fmt::Result {
        let pad = "  ".repeat(depth);
        write!(out, "{}{}(", pad, self.term_type.name())?;
        if let Some(datum) = &self.datum {
            write!(out, "{}", datum)?;
        }

        let last = self.args.len().saturating_sub(1);
        if !self.args.is_empty() {
            out.push('\n');
            for (i, child) in self.args.iter().enumerate() {
                child.write_tree(out, depth + 1)?;
                out.push_str(if i == last { "\n" } else { ",\n" });
            }
            out.push_str(&pad);
        }

        if !self.optargs.is_empty() {
            out.push_str(" {");
            for (name, value) in &self.optargs {
                write!(out, "\n{}  {}: ", pad, name)?;
                out.push_str(value.pretty_print(depth + 2).trim_start());
            }
            write!(out, "\n{}}}", pad)?;
        }
        out.push(')');
        Ok(())
    }
}

/// Single-line rendering, e.g. `BETWEEN(TABLE("users"), 1, index="code")`.
/// DATUM leaves print as their literal.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(datum) = &self.datum {
            return write!(f, "{}", datum);
        }
        let named = self
            .optargs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value));
        let parts: Vec<String> = self.args.iter().map(Term::to_string).chain(named).collect();
        write!(f, "{}({})", self.term_type.name(), parts.join(", "))
    }
}

/// Accumulates the children of one operation node.
///
/// Problems are recorded as they happen and reported by [`build`], so a
/// chain of calls never panics halfway.
///
/// [`build`]: TermBuilder::build
#[derive(Debug)]
pub struct TermBuilder {
    term_type: TermType,
    args: Vec<Term>,
    optargs: BTreeMap<String, Term>,
    repeated: Option<String>,
}

impl TermBuilder {
    pub fn new(term_type: TermType) -> Self {
        Self {
            term_type,
            args: Vec::new(),
            optargs: BTreeMap::new(),
            repeated: None,
        }
    }

    pub fn arg(mut self, arg: Term) -> Self {
        self.args.push(arg);
        self
    }

    pub fn args<I: IntoIterator<Item = Term>>(mut self, args: I) -> Self {
        self.args.extend(args);
        self
    }

    /// Sets a named option. Naming the same option twice fails at `build`.
    pub fn optarg<S: Into<String>>(mut self, name: S, value: Term) -> Self {
        let name = name.into();
        if self.optargs.insert(name.clone(), value).is_some() {
            self.repeated.get_or_insert(name);
        }
        self
    }

    pub fn build(self) -> Result<Term> {
        if self.term_type == TermType::Datum {
            return Err(Error::argument(
                "DATUM terms carry a literal; use Term::datum",
            ));
        }
        if let Some(name) = self.repeated {
            return Err(Error::argument(format!(
                "duplicate option '{}' for {}",
                name, self.term_type
            )));
        }
        Ok(Term {
            term_type: self.term_type,
            args: self.args,
            optargs: self.optargs,
            datum: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit<D: Into<Datum>>(value: D) -> Term {
        Term::datum(value.into())
    }

    fn table(name: &str) -> Term {
        TermBuilder::new(TermType::Table).arg(lit(name)).build().unwrap()
    }

    #[test]
    fn test_leaf_has_no_children() {
        let leaf = lit("test");
        assert!(leaf.is_datum());
        assert!(leaf.is(TermType::Datum));
        assert_eq!(leaf.node_count(), 1);
        assert_eq!(leaf.as_datum().and_then(Datum::as_string), Some("test"));
    }

    #[test]
    fn test_operation_node() {
        let term = TermBuilder::new(TermType::Get)
            .arg(table("users"))
            .arg(lit("id123"))
            .optarg("read_mode", lit("single"))
            .build()
            .unwrap();

        assert!(!term.is_datum());
        assert_eq!(term.arg(1), Some(&lit("id123")));
        assert_eq!(term.first_arg().map(Term::term_type), Some(TermType::Table));
        assert_eq!(term.node_count(), 5);
    }

    #[test]
    fn test_build_refuses_datum_code() {
        let err = TermBuilder::new(TermType::Datum).build().unwrap_err();
        assert!(matches!(err, Error::Argument(_)));
    }

    #[test]
    fn test_build_refuses_repeated_option() {
        let err = TermBuilder::new(TermType::Between)
            .optarg("index", lit("a"))
            .optarg("index", lit("b"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate option 'index'"));
    }

    #[test]
    fn test_renderings() {
        let term = TermBuilder::new(TermType::Between)
            .arg(table("users"))
            .arg(lit(1))
            .optarg("index", lit("code"))
            .build()
            .unwrap();
        assert_eq!(term.to_string(), "BETWEEN(TABLE(\"users\"), 1, index=\"code\")");
        assert_eq!(
            TermBuilder::new(TermType::Now).build().unwrap().to_string(),
            "NOW()"
        );

        let tree = term.pretty_print(0);
        assert!(tree.starts_with("BETWEEN(\n  TABLE("));
        assert!(tree.contains("  index: DATUM(\"code\")"));
        assert!(tree.ends_with("})"));
    }

    #[test]
    fn test_json_carries_protocol_codes() {
        let term = TermBuilder::new(TermType::Between)
            .arg(table("users"))
            .optarg("index", lit("code"))
            .build()
            .unwrap();
        let json = serde_json::to_value(&term).unwrap();
        assert_eq!(json["term_type"], 182);
        assert_eq!(json["args"][0]["term_type"], 15);
        assert_eq!(json["optargs"]["index"]["term_type"], 1);
        assert_eq!(json["optargs"]["index"]["datum"], "code");
    }
}
