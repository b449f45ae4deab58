//! Command descriptors.
//!
//! A descriptor is the declarative shape of one command: its operation
//! code, the checks on its positional arguments, the options it accepts and
//! the constructor that turns validated arguments into a term. Most commands
//! use [`construct_generic`]; the few with irregular shapes supply their own
//! constructor.

use super::func::{expect_arity, func_arity};
use crate::error::{Error, Result};
use crate::reql::{predicates, Normalizer, Options, Term, TermType, Value};

/// Precondition on one argument or option value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Check {
    Any,
    String,
    Number,
    Integer,
    Bool,
    /// JSON literal with no operation terms inside.
    Datum,
    Object,
    Array,
    Sequence,
    Select,
    PKey,
    Path,
    Kind(TermType),
    /// Function declaring exactly this many parameters.
    Func(usize),
    /// A function of this arity, or any non-function value.
    Predicate(usize),
    /// A string, or a function of this arity.
    StringOrFunc(usize),
    /// One of a fixed set of strings.
    OneOf(&'static [&'static str]),
}

impl Check {
    /// Whether `value` satisfies this check. Operation terms of unknown
    /// result type pass the scalar and shape checks.
    pub fn admits(&self, value: &Value) -> bool {
        let deferred = predicates::is_deferred(value);
        match self {
            Check::Any => true,
            Check::String => predicates::is_string(value) || deferred,
            Check::Number => predicates::is_number(value) || deferred,
            Check::Integer => predicates::is_integer(value) || deferred,
            Check::Bool => predicates::is_boolean(value) || deferred,
            Check::Datum => predicates::is_datum(value),
            Check::Object => predicates::is_object(value) || deferred,
            Check::Array => predicates::is_array(value) || deferred,
            Check::Sequence => predicates::is_sequence(value) || deferred,
            Check::Select => predicates::is_select(value),
            Check::PKey => predicates::is_pkey(value) || deferred,
            Check::Path => predicates::is_path(value) || deferred,
            Check::Kind(term_type) => predicates::is_term_of_kind(value, *term_type),
            Check::Func(arity) => value.as_term().and_then(func_arity) == Some(*arity),
            Check::Predicate(arity) => match value.as_term().and_then(func_arity) {
                Some(declared) => declared == *arity,
                None => !predicates::is_function(value),
            },
            Check::StringOrFunc(arity) => {
                predicates::is_string(value)
                    || value.as_term().and_then(func_arity) == Some(*arity)
                    || (deferred && !predicates::is_function(value))
            }
            Check::OneOf(choices) => match value.as_str() {
                Some(s) => choices.contains(&s),
                None => deferred,
            },
        }
    }

    /// Short description used in signatures and error messages.
    pub fn describe(&self) -> String {
        match self {
            Check::Any => "any".into(),
            Check::String => "string".into(),
            Check::Number => "number".into(),
            Check::Integer => "integer".into(),
            Check::Bool => "bool".into(),
            Check::Datum => "datum".into(),
            Check::Object => "object".into(),
            Check::Array => "array".into(),
            Check::Sequence => "sequence".into(),
            Check::Select => "selection".into(),
            Check::PKey => "pkey".into(),
            Check::Path => "path".into(),
            Check::Kind(term_type) => term_type.name().to_lowercase(),
            Check::Func(arity) => format!("fn/{}", arity),
            Check::Predicate(arity) => format!("fn/{}|value", arity),
            Check::StringOrFunc(arity) => format!("string|fn/{}", arity),
            Check::OneOf(choices) => choices.join("|"),
        }
    }

    fn verify(&self, command: &str, what: &str, value: &Value) -> Result<()> {
        if self.admits(value) {
            return Ok(());
        }
        if let Check::Func(arity) = self {
            return expect_arity(value, *arity)
                .map_err(|e| Error::argument(format!("{}: {}: {}", command, what, detail(&e))));
        }
        Err(Error::argument(format!(
            "{}: {} must be {}, got {}",
            command,
            what,
            self.describe(),
            value.kind_name()
        )))
    }
}

/// Message text of an argument error without its category prefix.
pub(crate) fn detail(error: &Error) -> String {
    match error {
        Error::Argument(message) => message.clone(),
        other => other.to_string(),
    }
}

/// Accepted named option.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptSpec {
    /// Protocol option name.
    pub name: &'static str,
    pub check: Check,
}

pub const fn opt(name: &'static str, check: Check) -> OptSpec {
    OptSpec { name, check }
}

/// Builds the term for a descriptor from raw arguments.
pub type Constructor = fn(&CommandDescriptor, &Normalizer, Vec<Value>, Options) -> Result<Term>;

/// Declarative shape of one command.
#[derive(Debug, Clone, Copy)]
pub struct CommandDescriptor {
    pub name: &'static str,
    pub term_type: TermType,
    pub required: &'static [Check],
    pub optional: &'static [Check],
    pub rest: Option<Check>,
    pub options: &'static [OptSpec],
    constructor: Constructor,
}

impl CommandDescriptor {
    pub const fn new(name: &'static str, term_type: TermType) -> Self {
        Self {
            name,
            term_type,
            required: &[],
            optional: &[],
            rest: None,
            options: &[],
            constructor: construct_generic,
        }
    }

    pub const fn args(self, required: &'static [Check]) -> Self {
        Self { required, ..self }
    }

    pub const fn optional(self, optional: &'static [Check]) -> Self {
        Self { optional, ..self }
    }

    pub const fn rest(self, check: Check) -> Self {
        Self {
            rest: Some(check),
            ..self
        }
    }

    pub const fn options(self, options: &'static [OptSpec]) -> Self {
        Self { options, ..self }
    }

    pub const fn constructor(self, constructor: Constructor) -> Self {
        Self {
            constructor,
            ..self
        }
    }

    /// Minimum and maximum positional argument count (`None` = unbounded).
    pub fn arity(&self) -> (usize, Option<usize>) {
        let min = self.required.len();
        let max = match self.rest {
            Some(_) => None,
            None => Some(min + self.optional.len()),
        };
        (min, max)
    }

    /// Check applying to the positional argument at `index`.
    pub fn check_at(&self, index: usize) -> Option<Check> {
        let optional_end = self.required.len() + self.optional.len();
        if index < self.required.len() {
            Some(self.required[index])
        } else if index < optional_end {
            Some(self.optional[index - self.required.len()])
        } else {
            self.rest
        }
    }

    pub fn option(&self, name: &str) -> Option<&OptSpec> {
        self.options.iter().find(|spec| spec.name == name)
    }

    /// Validate positional arguments against arity and per-position checks.
    pub fn validate_args(&self, args: &[Value]) -> Result<()> {
        let (min, max) = self.arity();
        let count = args.len();
        if count < min || max.map(|max| count > max).unwrap_or(false) {
            let expected = match max {
                Some(max) if max == min => format!("{}", min),
                Some(max) => format!("{} to {}", min, max),
                None => format!("at least {}", min),
            };
            return Err(Error::argument(format!(
                "{} expects {} argument(s), got {}",
                self.name, expected, count
            )));
        }
        for (index, value) in args.iter().enumerate() {
            if let Some(check) = self.check_at(index) {
                check.verify(self.name, &format!("argument {}", index + 1), value)?;
            }
        }
        Ok(())
    }

    /// Validate named options: known names, no repeats, value checks.
    pub fn validate_options(&self, options: &Options) -> Result<()> {
        for (index, (name, value)) in options.iter().enumerate() {
            let spec = self.option(name).ok_or_else(|| {
                let known: Vec<&str> = self.options.iter().map(|spec| spec.name).collect();
                let accepted = if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                };
                Error::argument(format!(
                    "{} does not accept option '{}' (accepted: {})",
                    self.name, name, accepted
                ))
            })?;
            if options[..index].iter().any(|(seen, _)| seen == name) {
                return Err(Error::argument(format!(
                    "{}: option '{}' given more than once",
                    self.name, name
                )));
            }
            spec.check
                .verify(self.name, &format!("option '{}'", name), value)?;
        }
        Ok(())
    }

    /// Run this descriptor's constructor.
    pub fn construct(
        &self,
        normalizer: &Normalizer,
        args: Vec<Value>,
        options: Options,
    ) -> Result<Term> {
        (self.constructor)(self, normalizer, args, options)
    }

    /// [`CommandDescriptor::construct`] with the default normalizer.
    pub fn call(&self, args: Vec<Value>, options: Options) -> Result<Term> {
        self.construct(&Normalizer::default(), args, options)
    }

    /// Human-readable signature, e.g. `between(selection, any, any; index: string)`.
    pub fn signature(&self) -> String {
        let mut params: Vec<String> = self.required.iter().map(Check::describe).collect();
        params.extend(self.optional.iter().map(|check| format!("[{}]", check.describe())));
        if let Some(rest) = self.rest {
            params.push(format!("{}...", rest.describe()));
        }
        let mut signature = format!("{}({}", self.name, params.join(", "));
        if !self.options.is_empty() {
            let options: Vec<String> = self
                .options
                .iter()
                .map(|spec| format!("{}: {}", spec.name, spec.check.describe()))
                .collect();
            signature.push_str("; ");
            signature.push_str(&options.join(", "));
        }
        signature.push(')');
        signature
    }
}

/// Validate, then build `term_type(args...; options)`.
pub fn construct_generic(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    descriptor.validate_args(&args)?;
    descriptor.validate_options(&options)?;
    normalizer.create_term(descriptor.term_type, args, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::func::func;
    use crate::reql::{create_term, Datum};

    const BETWEEN: CommandDescriptor = CommandDescriptor::new("between", TermType::Between)
        .args(&[Check::Select, Check::Any, Check::Any])
        .options(&[opt("index", Check::String)]);

    const REDUCE: CommandDescriptor = CommandDescriptor::new("reduce", TermType::Reduce)
        .args(&[Check::Sequence, Check::Func(2)]);

    fn table() -> Value {
        Value::from(create_term(TermType::Table, vec![Value::from("users")], vec![]).unwrap())
    }

    #[test]
    fn test_arity() {
        assert_eq!(BETWEEN.arity(), (3, Some(3)));
        let variadic = CommandDescriptor::new("add", TermType::Add)
            .args(&[Check::Any])
            .rest(Check::Any);
        assert_eq!(variadic.arity(), (1, None));

        let err = BETWEEN.call(vec![table()], vec![]).unwrap_err();
        assert_eq!(
            err,
            Error::Argument("between expects 3 argument(s), got 1".into())
        );
    }

    #[test]
    fn test_between_shape() {
        let term = BETWEEN
            .call(
                vec![table(), Value::from(1), Value::from(10)],
                vec![("index".into(), Value::from("code"))],
            )
            .unwrap();
        assert_eq!(term.term_type(), TermType::Between);
        assert_eq!(term.args().len(), 3);
        assert_eq!(term.optarg("index"), Some(&Term::datum(Datum::from("code"))));
    }

    #[test]
    fn test_unknown_and_repeated_options() {
        let args = vec![table(), Value::from(1), Value::from(2)];
        let err = BETWEEN
            .call(args.clone(), vec![("idx".into(), Value::from("a"))])
            .unwrap_err();
        assert!(err.to_string().contains("does not accept option 'idx'"));

        let err = BETWEEN
            .call(
                args,
                vec![
                    ("index".into(), Value::from("a")),
                    ("index".into(), Value::from("b")),
                ],
            )
            .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_option_type_checked() {
        let err = BETWEEN
            .call(
                vec![table(), Value::from(1), Value::from(2)],
                vec![("index".into(), Value::from(5))],
            )
            .unwrap_err();
        assert_eq!(
            err,
            Error::Argument("between: option 'index' must be string, got number".into())
        );
    }

    #[test]
    fn test_selection_required() {
        let err = BETWEEN
            .call(vec![Value::from(vec![1, 2]), Value::from(1), Value::from(2)], vec![])
            .unwrap_err();
        assert!(err.to_string().contains("argument 1 must be selection"));
    }

    #[test]
    fn test_function_arity_checked() {
        let unary = func(1, |vars| Ok(Value::from(vars[0].clone()))).unwrap();
        let err = REDUCE
            .call(vec![table(), Value::from(unary)], vec![])
            .unwrap_err();
        assert_eq!(
            err,
            Error::Argument(
                "reduce: argument 2: expected a function of arity 2, got arity 1".into()
            )
        );

        let binary = func(2, |vars| {
            Ok(Value::from(
                create_term(
                    TermType::Add,
                    vec![Value::from(vars[0].clone()), Value::from(vars[1].clone())],
                    vec![],
                )
                .unwrap(),
            ))
        })
        .unwrap();
        let term = REDUCE.call(vec![table(), Value::from(binary)], vec![]).unwrap();
        assert_eq!(term.term_type(), TermType::Reduce);
        assert_eq!(term.args().len(), 2);
    }

    #[test]
    fn test_predicate_check() {
        let check = Check::Predicate(1);
        assert!(check.admits(&Value::object([("active", true)])));
        assert!(check.admits(&Value::from(func(1, |_| Ok(Value::from(true))).unwrap())));
        assert!(!check.admits(&Value::from(func(2, |_| Ok(Value::from(true))).unwrap())));
    }

    #[test]
    fn test_signature() {
        assert_eq!(
            BETWEEN.signature(),
            "between(selection, any, any; index: string)"
        );
        assert_eq!(REDUCE.signature(), "reduce(sequence, fn/2)");
    }
}
