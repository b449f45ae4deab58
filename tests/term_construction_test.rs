//! End-to-end construction properties over the public API

use reql_builder::error::Error;
use reql_builder::query::{func, func_arity, global, CommandRegistry};
use reql_builder::r;
use reql_builder::reql::{create_term, normalize, Datum, Normalizer, Term, TermType, Value};

fn table(name: &str) -> Term {
    r::table(name).expect("table term")
}

#[test]
fn test_normalize_term_is_identity() {
    let query = r::filter(table("users"), Value::object([("active", true)])).unwrap();
    assert_eq!(normalize(query.clone()).unwrap(), query);
}

#[test]
fn test_normalize_null_is_null_datum() {
    assert_eq!(normalize(Value::Null).unwrap(), Term::datum(Datum::Null));
    // an empty array is still an array, not null
    assert_eq!(
        normalize(Vec::<i32>::new()).unwrap().term_type(),
        TermType::MakeArray
    );
}

#[test]
fn test_normalize_sequence_in_order() {
    let term = normalize(vec![
        Value::from(1),
        Value::from(vec!["x"]),
        Value::from(table("t")),
    ])
    .unwrap();
    assert_eq!(term.term_type(), TermType::MakeArray);
    assert_eq!(term.args().len(), 3);
    assert_eq!(term.arg(0), Some(&Term::datum(Datum::Number(1.0))));
    assert_eq!(term.arg(1).map(Term::term_type), Some(TermType::MakeArray));
    assert_eq!(term.arg(2), Some(&table("t")));
}

#[test]
fn test_normalize_mapping_keys() {
    let term = normalize(serde_json::json!({"x": 1, "y": "s"})).unwrap();
    assert_eq!(term.term_type(), TermType::MakeObj);
    let keys: Vec<&str> = term.optargs().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["x", "y"]);
    assert_eq!(term.optarg("x"), Some(&Term::datum(Datum::Number(1.0))));
    assert_eq!(term.optarg("y"), Some(&Term::datum(Datum::from("s"))));
}

#[test]
fn test_reduce_arity() {
    let unary = func(1, |vars| Ok(Value::from(vars[0].clone()))).unwrap();
    let err = r::reduce(table("scores"), unary).unwrap_err();
    assert!(matches!(err, Error::Argument(_)));

    let binary = func(2, |vars| {
        Ok(Value::from(r::call(
            "add",
            vec![Value::from(vars[0].clone()), Value::from(vars[1].clone())],
            vec![],
        )?))
    })
    .unwrap();
    let term = r::reduce(table("scores"), binary).unwrap();
    assert_eq!(term.term_type(), TermType::Reduce);
    assert_eq!(term.args().len(), 2);
    assert_eq!(term.arg(1).and_then(func_arity), Some(2));
}

#[test]
fn test_dsl_insert_matches_direct_call() {
    let row = Value::object([("name", Value::from("ada")), ("age", Value::from(36))]);
    let direct = r::insert(table("users"), row, vec![]).unwrap();
    let parsed = global()
        .build(r#"(insert (table "users") {"name" "ada" "age" 36})"#)
        .unwrap();
    assert_eq!(parsed, direct);
}

#[test]
fn test_object_command() {
    let term = r::object([("id", Value::from(5)), ("name", Value::from("x"))]).unwrap();
    assert_eq!(term.term_type(), TermType::MakeObj);
    assert_eq!(term.optargs().len(), 2);
    assert_eq!(term.optarg("id"), Some(&Term::datum(Datum::Number(5.0))));
    assert_eq!(term.optarg("name"), Some(&Term::datum(Datum::from("x"))));
}

#[test]
fn test_between_with_index() {
    let users = table("users");
    let term = r::between(users.clone(), 1, 10, Some("code")).unwrap();
    assert_eq!(term.term_type(), TermType::Between);
    assert_eq!(
        term.args(),
        &[
            users,
            Term::datum(Datum::Number(1.0)),
            Term::datum(Datum::Number(10.0))
        ]
    );
    assert_eq!(term.optarg("index"), Some(&Term::datum(Datum::from("code"))));
    assert_eq!(
        term.to_string(),
        r#"BETWEEN(TABLE("users"), 1, 10, index="code")"#
    );
}

#[test]
fn test_table_create_wire_option_names() {
    let term = r::table_create(
        "users",
        vec![
            ("primary_key".into(), Value::from("uid")),
            ("replicas".into(), Value::object([("us_east", 2)])),
            ("primary_replica_tag".into(), Value::from("us_east")),
        ],
    )
    .unwrap();
    let names: Vec<&str> = term.optargs().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["primary_key", "primary_replica_tag", "replicas"]);

    let err = r::table_create("users", vec![("primary_replica_tags".into(), Value::from("x"))])
        .unwrap_err();
    assert!(err.to_string().contains("does not accept option 'primary_replica_tags'"));
}

#[test]
fn test_no_partial_term_on_failure() {
    let result = create_term(
        TermType::Add,
        vec![Value::from(1), Value::from(f64::NAN)],
        vec![],
    );
    assert!(result.is_err());
}

#[test]
fn test_depth_limit() {
    let mut nested = Value::from(0);
    for _ in 0..25 {
        nested = Value::Array(vec![nested]);
    }
    let err = global()
        .dispatch("append", vec![Value::from(vec![1]), nested.clone()], vec![])
        .unwrap_err();
    assert_eq!(err, Error::Argument("Nesting depth limit exceeded".into()));

    assert!(Normalizer::new(30).normalize(nested).is_ok());
}

#[test]
fn test_redefinition_last_write_wins() {
    let registry = CommandRegistry::with_builtins();
    let original = registry.get("count").unwrap();
    let replacement = original.args(&[]);
    let previous = registry.register(replacement).unwrap();
    assert_eq!(previous.map(|d| d.required.len()), Some(1));
    assert!(registry.dispatch("count", vec![], vec![]).is_ok());
    // the process-wide registry is untouched
    assert!(global().dispatch("count", vec![], vec![]).is_err());
}
