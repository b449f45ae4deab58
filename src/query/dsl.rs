//! Textual expression form.
//!
//! ```text
//! (insert (table "users") {"name" "ada"} :return-changes true)
//! (reduce (table "scores") (fn [acc row] (+ acc row)))
//! ```
//!
//! `(head arg... :option value...)` invokes the command registered as
//! `head`. `[..]` is an array, `{key value ...}` an object, and
//! `(fn [x y] body)` a function whose parameters are bound inside `body`.
//! Every head is resolved against the registry before any term is built,
//! so an unknown command never leaves a half-constructed tree behind.

use super::descriptor::CommandDescriptor;
use super::func::{fresh_var_ids, func_from_parts, var};
use super::registry::CommandRegistry;
use crate::error::{Error, Result};
use crate::reql::{Normalizer, Options, Term, Value};
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::trace;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Open,
    Close,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Keyword(String),
    Symbol(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    /// Byte offset of the first character.
    offset: usize,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '"' | '(' | ')' | '[' | ']' | '{' | '}')
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        let kind = match c {
            c if c.is_whitespace() || c == ',' => {
                chars.next();
                continue;
            }
            ';' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                continue;
            }
            '(' | ')' | '[' | ']' | '{' | '}' => {
                chars.next();
                match c {
                    '(' => TokenKind::Open,
                    ')' => TokenKind::Close,
                    '[' => TokenKind::OpenBracket,
                    ']' => TokenKind::CloseBracket,
                    '{' => TokenKind::OpenBrace,
                    _ => TokenKind::CloseBrace,
                }
            }
            '"' => {
                chars.next();
                TokenKind::Str(read_string(&mut chars, offset)?)
            }
            _ => {
                let mut word = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                classify(&word, offset)?
            }
        };
        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}

fn read_string(chars: &mut Peekable<CharIndices<'_>>, start: usize) -> Result<String> {
    let mut out = String::new();
    while let Some((offset, c)) = chars.next() {
        match c {
            '"' => return Ok(out),
            '\\' => match chars.next() {
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, other)) => {
                    return Err(Error::syntax(offset, format!("unknown escape '\\{}'", other)))
                }
                None => break,
            },
            c => out.push(c),
        }
    }
    Err(Error::syntax(start, "unterminated string"))
}

fn classify(word: &str, offset: usize) -> Result<TokenKind> {
    let numeric = {
        let mut chars = word.chars();
        match chars.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some('-' | '+' | '.') => chars.next().map_or(false, |c| c.is_ascii_digit()),
            _ => false,
        }
    };

    Ok(match word {
        "true" => TokenKind::Bool(true),
        "false" => TokenKind::Bool(false),
        "nil" | "null" => TokenKind::Null,
        _ if numeric => TokenKind::Number(
            word.parse()
                .map_err(|_| Error::syntax(offset, format!("invalid number '{}'", word)))?,
        ),
        _ => match word.strip_prefix(':') {
            Some("") => return Err(Error::syntax(offset, "empty keyword")),
            Some(keyword) => TokenKind::Keyword(keyword.to_string()),
            None => TokenKind::Symbol(word.to_string()),
        },
    })
}

/// Parsed expression, before any name is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Symbol {
        name: String,
        offset: usize,
    },
    Vector(Vec<Expr>),
    Map(Vec<(String, Expr)>),
    Call {
        head: String,
        offset: usize,
        args: Vec<Expr>,
        /// Option names with `-` already folded to `_`.
        options: Vec<(String, Expr)>,
    },
    Fn {
        params: Vec<String>,
        body: Box<Expr>,
    },
}

/// Deepest bracket nesting the reader accepts. Parsing, expansion and
/// construction all recurse once per level.
pub const MAX_NESTING: usize = 128;

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn next_within(&mut self, open: usize) -> Result<Token> {
        self.next()
            .ok_or_else(|| Error::syntax(open, "unclosed delimiter"))
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().map_or(false, |token| &token.kind == kind)
    }

    fn expr(&mut self) -> Result<Expr> {
        let token = self
            .next()
            .ok_or_else(|| Error::syntax(self.end, "unexpected end of input"))?;
        let offset = token.offset;

        match token.kind {
            TokenKind::Null => Ok(Expr::Null),
            TokenKind::Bool(b) => Ok(Expr::Bool(b)),
            TokenKind::Number(n) => Ok(Expr::Number(n)),
            TokenKind::Str(s) => Ok(Expr::String(s)),
            TokenKind::Symbol(name) => Ok(Expr::Symbol { name, offset }),
            TokenKind::Keyword(keyword) => Err(Error::syntax(
                offset,
                format!("keyword ':{}' outside an invocation", keyword),
            )),
            kind @ (TokenKind::OpenBracket | TokenKind::OpenBrace | TokenKind::Open) => {
                if self.depth == MAX_NESTING {
                    return Err(Error::syntax(offset, "expression nested too deeply"));
                }
                self.depth += 1;
                let nested = match kind {
                    TokenKind::OpenBracket => self.vector(offset).map(Expr::Vector),
                    TokenKind::OpenBrace => self.map(offset),
                    _ => self.list(offset),
                };
                self.depth -= 1;
                nested
            }
            TokenKind::Close | TokenKind::CloseBracket | TokenKind::CloseBrace => {
                Err(Error::syntax(offset, "unexpected closing delimiter"))
            }
        }
    }

    fn vector(&mut self, open: usize) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => return Err(Error::syntax(open, "unclosed delimiter")),
                Some(token) if token.kind == TokenKind::CloseBracket => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.expr()?),
            }
        }
    }

    fn map(&mut self, open: usize) -> Result<Expr> {
        let mut entries: Vec<(String, Expr)> = Vec::new();
        loop {
            let token = self.next_within(open)?;
            let key = match token.kind {
                TokenKind::CloseBrace => return Ok(Expr::Map(entries)),
                TokenKind::Str(key) | TokenKind::Keyword(key) => key,
                _ => {
                    return Err(Error::syntax(
                        token.offset,
                        "object keys must be strings or keywords",
                    ))
                }
            };
            if entries.iter().any(|(seen, _)| *seen == key) {
                return Err(Error::syntax(token.offset, format!("duplicate key '{}'", key)));
            }
            if self.peek().is_none() || self.at(&TokenKind::CloseBrace) {
                return Err(Error::syntax(
                    token.offset,
                    format!("missing value for key '{}'", key),
                ));
            }
            let value = self.expr()?;
            entries.push((key, value));
        }
    }

    fn list(&mut self, open: usize) -> Result<Expr> {
        let head = self.next_within(open)?;
        let name = match head.kind {
            TokenKind::Symbol(name) => name,
            TokenKind::Close => return Err(Error::syntax(open, "empty invocation")),
            _ => {
                return Err(Error::syntax(
                    head.offset,
                    "invocation head must be a command name",
                ))
            }
        };
        if name == "fn" {
            return self.function(open);
        }

        let mut args = Vec::new();
        let mut options = Vec::new();
        loop {
            let token = self
                .peek()
                .cloned()
                .ok_or_else(|| Error::syntax(open, "unclosed delimiter"))?;
            match token.kind {
                TokenKind::Close => {
                    self.pos += 1;
                    return Ok(Expr::Call {
                        head: name,
                        offset: head.offset,
                        args,
                        options,
                    });
                }
                TokenKind::Keyword(keyword) => {
                    self.pos += 1;
                    if self.peek().is_none() || self.at(&TokenKind::Close) {
                        return Err(Error::syntax(
                            token.offset,
                            format!("missing value for option ':{}'", keyword),
                        ));
                    }
                    options.push((keyword.replace('-', "_"), self.expr()?));
                }
                _ => args.push(self.expr()?),
            }
        }
    }

    fn function(&mut self, open: usize) -> Result<Expr> {
        let bracket = self.next_within(open)?;
        if bracket.kind != TokenKind::OpenBracket {
            return Err(Error::syntax(bracket.offset, "fn expects a parameter vector"));
        }

        let mut params: Vec<String> = Vec::new();
        loop {
            let token = self.next_within(bracket.offset)?;
            match token.kind {
                TokenKind::CloseBracket => break,
                TokenKind::Symbol(name) if params.contains(&name) => {
                    return Err(Error::syntax(
                        token.offset,
                        format!("duplicate parameter '{}'", name),
                    ))
                }
                TokenKind::Symbol(name) => params.push(name),
                _ => return Err(Error::syntax(token.offset, "fn parameters must be symbols")),
            }
        }

        if self.at(&TokenKind::Close) {
            return Err(Error::syntax(open, "fn expects a body"));
        }
        let body = self.expr()?;
        let close = self.next_within(open)?;
        if close.kind != TokenKind::Close {
            return Err(Error::syntax(close.offset, "fn takes a single body expression"));
        }

        Ok(Expr::Fn {
            params,
            body: Box::new(body),
        })
    }
}

/// Parse exactly one expression.
pub fn parse(text: &str) -> Result<Expr> {
    let mut parser = Parser {
        tokens: tokenize(text)?,
        pos: 0,
        end: text.len(),
        depth: 0,
    };
    if parser.peek().is_none() {
        return Err(Error::syntax(0, "empty expression"));
    }
    let expr = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(Error::syntax(extra.offset, "unexpected trailing input"));
    }
    Ok(expr)
}

/// An expression with every head resolved and every symbol bound.
#[derive(Debug)]
enum Expansion {
    Literal(Value),
    Var(u64),
    Array(Vec<Expansion>),
    Object(Vec<(String, Expansion)>),
    Call {
        descriptor: CommandDescriptor,
        args: Vec<Expansion>,
        options: Vec<(String, Expansion)>,
    },
    Func {
        ids: Vec<u64>,
        body: Box<Expansion>,
    },
}

struct Expander<'r> {
    registry: &'r CommandRegistry,
    /// Innermost binding last.
    scope: Vec<(String, u64)>,
}

impl Expander<'_> {
    fn expand(&mut self, expr: Expr) -> Result<Expansion> {
        Ok(match expr {
            Expr::Null => Expansion::Literal(Value::Null),
            Expr::Bool(b) => Expansion::Literal(Value::Bool(b)),
            Expr::Number(n) => Expansion::Literal(Value::Number(n)),
            Expr::String(s) => Expansion::Literal(Value::String(s)),
            Expr::Symbol { name, offset } => {
                let id = self
                    .scope
                    .iter()
                    .rev()
                    .find(|(bound, _)| *bound == name)
                    .map(|(_, id)| *id)
                    .ok_or_else(|| Error::syntax(offset, format!("unbound symbol '{}'", name)))?;
                Expansion::Var(id)
            }
            Expr::Vector(items) => Expansion::Array(self.expand_all(items)?),
            Expr::Map(entries) => Expansion::Object(self.expand_entries(entries)?),
            Expr::Call {
                head,
                args,
                options,
                ..
            } => {
                let descriptor = self.registry.resolve(&head)?;
                Expansion::Call {
                    descriptor,
                    args: self.expand_all(args)?,
                    options: self.expand_entries(options)?,
                }
            }
            Expr::Fn { params, body } => {
                let ids = fresh_var_ids(params.len());
                let depth = self.scope.len();
                self.scope.extend(params.into_iter().zip(ids.iter().copied()));
                let body = self.expand(*body);
                self.scope.truncate(depth);
                Expansion::Func {
                    ids,
                    body: Box::new(body?),
                }
            }
        })
    }

    fn expand_all(&mut self, exprs: Vec<Expr>) -> Result<Vec<Expansion>> {
        exprs.into_iter().map(|expr| self.expand(expr)).collect()
    }

    fn expand_entries(&mut self, entries: Vec<(String, Expr)>) -> Result<Vec<(String, Expansion)>> {
        entries
            .into_iter()
            .map(|(key, expr)| -> Result<(String, Expansion)> { Ok((key, self.expand(expr)?)) })
            .collect()
    }
}

fn realize(expansion: Expansion, normalizer: &Normalizer) -> Result<Value> {
    match expansion {
        Expansion::Literal(value) => Ok(value),
        Expansion::Var(id) => Ok(Value::Term(var(id))),
        Expansion::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|item| realize(item, normalizer))
                .collect::<Result<Vec<_>>>()?,
        )),
        Expansion::Object(entries) => Ok(Value::Object(
            entries
                .into_iter()
                .map(|(key, value)| -> Result<(String, Value)> {
                    Ok((key, realize(value, normalizer)?))
                })
                .collect::<Result<BTreeMap<_, _>>>()?,
        )),
        Expansion::Call {
            descriptor,
            args,
            options,
        } => {
            let args = args
                .into_iter()
                .map(|arg| realize(arg, normalizer))
                .collect::<Result<Vec<_>>>()?;
            let options = options
                .into_iter()
                .map(|(name, value)| -> Result<(String, Value)> {
                    Ok((name, realize(value, normalizer)?))
                })
                .collect::<Result<Options>>()?;
            trace!(command = descriptor.name, "Constructing");
            descriptor
                .construct(normalizer, args, options)
                .map(Value::Term)
        }
        Expansion::Func { ids, body } => {
            let body = normalizer.normalize(realize(*body, normalizer)?)?;
            Ok(Value::Term(func_from_parts(&ids, body)))
        }
    }
}

/// Parse, resolve and construct `text` against `registry`.
pub fn build(registry: &CommandRegistry, text: &str) -> Result<Term> {
    let expr = parse(text)?;
    let expansion = Expander {
        registry,
        scope: Vec::new(),
    }
    .expand(expr)?;
    let normalizer = registry.normalizer();
    normalizer.normalize(realize(expansion, normalizer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::func::func_arity;
    use crate::reql::{Datum, TermType};

    fn registry() -> CommandRegistry {
        CommandRegistry::with_builtins()
    }

    fn syntax_offset(text: &str) -> usize {
        match parse(text) {
            Err(Error::Syntax { offset, .. }) => offset,
            other => panic!("expected syntax error for {:?}, got {:?}", text, other),
        }
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("nil").unwrap(), Expr::Null);
        assert_eq!(parse("-2.5").unwrap(), Expr::Number(-2.5));
        assert_eq!(
            parse(r#""a\"b\n""#).unwrap(),
            Expr::String("a\"b\n".into())
        );
        assert_eq!(
            parse("[1, true ; trailing comment\n null]").unwrap(),
            Expr::Vector(vec![Expr::Number(1.0), Expr::Bool(true), Expr::Null])
        );
        assert_eq!(
            parse("-").unwrap(),
            Expr::Symbol {
                name: "-".into(),
                offset: 0
            }
        );
    }

    #[test]
    fn test_parse_call_with_options() {
        let Expr::Call {
            head,
            args,
            options,
            ..
        } = parse(r#"(between (table "t") 1 10 :index "code" :left-bound "open")"#).unwrap()
        else {
            panic!("expected call");
        };
        assert_eq!(head, "between");
        assert_eq!(args.len(), 3);
        let names: Vec<&str> = options.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["index", "left_bound"]);
    }

    #[test]
    fn test_syntax_error_offsets() {
        assert_eq!(syntax_offset(r#"(table "users""#), 0);
        assert_eq!(syntax_offset(r#"(table "users"))"#), 15);
        assert_eq!(syntax_offset(")"), 0);
        assert_eq!(syntax_offset("()"), 0);
        assert_eq!(syntax_offset(r#"(x "abc"#), 3);
        assert_eq!(syntax_offset(r#"{"a" 1 "a" 2}"#), 7);
        assert_eq!(syntax_offset("(fn [a a] a)"), 7);
        assert_eq!(syntax_offset("   "), 0);
        assert_eq!(syntax_offset("(limit :n)"), 7);
    }

    #[test]
    fn test_unknown_command_is_registry_error() {
        let err = build(&registry(), r#"(frobnicate (table "t"))"#).unwrap_err();
        assert_eq!(err, Error::Registry("Unknown command 'frobnicate'".into()));
    }

    #[test]
    fn test_unbound_symbol() {
        let err = build(&registry(), r#"(map (table "t") x)"#).unwrap_err();
        assert_eq!(err, Error::syntax(17, "unbound symbol 'x'"));
    }

    #[test]
    fn test_reduce_with_function() {
        let term = build(
            &registry(),
            r#"(reduce (table "scores") (fn [acc row] (+ acc row)))"#,
        )
        .unwrap();
        assert_eq!(term.term_type(), TermType::Reduce);
        assert_eq!(term.args().len(), 2);

        let f = term.arg(1).unwrap();
        assert_eq!(func_arity(f), Some(2));
        let params = f.first_arg().unwrap();
        let body = f.arg(1).unwrap();
        assert_eq!(body.term_type(), TermType::Add);
        for (param, reference) in params.args().iter().zip(body.args()) {
            assert_eq!(reference.term_type(), TermType::Var);
            assert_eq!(reference.first_arg(), Some(param));
        }
    }

    #[test]
    fn test_function_arity_enforced() {
        let err = build(&registry(), r#"(reduce (table "t") (fn [x] x))"#).unwrap_err();
        assert!(matches!(err, Error::Argument(ref m) if m.contains("arity 2, got arity 1")));
    }

    #[test]
    fn test_inner_binding_shadows_outer() {
        let term = build(
            &registry(),
            r#"(map (table "t") (fn [x] (map [1 2] (fn [x] x))))"#,
        )
        .unwrap();
        let outer = term.arg(1).unwrap();
        let inner = outer.arg(1).unwrap().arg(1).unwrap();
        let inner_param = inner.first_arg().unwrap().first_arg().unwrap();
        assert_eq!(inner.arg(1).unwrap().first_arg(), Some(inner_param));
        assert_ne!(outer.first_arg().unwrap().first_arg(), Some(inner_param));
    }

    #[test]
    fn test_dashed_names_fold() {
        let term = build(
            &registry(),
            r#"(table-create "users" :primary-key "uid")"#,
        )
        .unwrap();
        assert_eq!(term.term_type(), TermType::TableCreate);
        assert_eq!(
            term.optarg("primary_key"),
            Some(&Term::datum(Datum::from("uid")))
        );
    }

    #[test]
    fn test_collision_prone_names() {
        let r = registry();
        assert_eq!(build(&r, "(count [1 2])").unwrap().term_type(), TermType::Count);
        assert_eq!(
            build(&r, r#"(error "boom")"#).unwrap().term_type(),
            TermType::Error
        );
        assert_eq!(build(&r, "(< 1 2)").unwrap().term_type(), TermType::Lt);
        assert_eq!(
            build(&r, "(do 1 (fn [x] (* x 2)))").unwrap().term_type(),
            TermType::Funcall
        );
    }

    #[test]
    fn test_plain_literal_root() {
        let term = build(&registry(), r#"{"a" [1 2]}"#).unwrap();
        assert_eq!(term.term_type(), TermType::MakeObj);
        assert_eq!(
            term.optarg("a").map(Term::term_type),
            Some(TermType::MakeArray)
        );
    }

    #[test]
    fn test_deep_vector_is_rejected() {
        let text = format!("{}1{}", "[".repeat(1000), "]".repeat(1000));
        assert_eq!(syntax_offset(&text), MAX_NESTING);
        let err = build(&registry(), &text).unwrap_err();
        assert_eq!(err, Error::syntax(MAX_NESTING, "expression nested too deeply"));
    }

    #[test]
    fn test_deep_invocation_is_rejected() {
        let r = registry();
        let nested = |depth: usize| format!("{}true{}", "(not ".repeat(depth), ")".repeat(depth));

        let err = build(&r, &nested(1000)).unwrap_err();
        assert!(matches!(err, Error::Syntax { offset, .. } if offset == MAX_NESTING * 5));
        assert_eq!(build(&r, &nested(100)).unwrap().term_type(), TermType::Not);
        assert!(build(&r, &nested(MAX_NESTING)).is_ok());
    }
}
