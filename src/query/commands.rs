//! Builtin command table.
//!
//! Every command is one [`CommandDescriptor`] entry. Commands whose shape
//! fits "fixed checks per position, optional tail, named options" use the
//! generic constructor; the handful of irregular ones (database-scoped
//! table commands, `table_create`, `object`, `time`, `do`, `branch`) plug in
//! their own.

use super::descriptor::{detail, opt, Check, CommandDescriptor, OptSpec};
use super::func::expect_arity;
use super::registry::CommandRegistry;
use crate::error::{Error, Result};
use crate::reql::{predicates, Normalizer, Options, Term, TermBuilder, TermType, Value};
use tracing::debug;

use Check::*;

const BOUNDS: &[&str] = &["open", "closed"];
const DURABILITY: Check = OneOf(&["hard", "soft"]);

const BOUND_OPTS: &[OptSpec] = &[
    opt("left_bound", OneOf(BOUNDS)),
    opt("right_bound", OneOf(BOUNDS)),
];

const BETWEEN_OPTS: &[OptSpec] = &[
    opt("index", String),
    opt("left_bound", OneOf(BOUNDS)),
    opt("right_bound", OneOf(BOUNDS)),
];

const TABLE_OPTS: &[OptSpec] = &[
    opt("read_mode", OneOf(&["single", "majority", "outdated"])),
    opt("identifier_format", OneOf(&["name", "uuid"])),
];

const TABLE_CREATE_OPTS: &[OptSpec] = &[
    opt("primary_key", String),
    opt("shards", Integer),
    opt("replicas", Any),
    opt("primary_replica_tag", String),
    opt("nonvoting_replica_tags", Array),
    opt("durability", DURABILITY),
];

const RECONFIGURE_OPTS: &[OptSpec] = &[
    opt("shards", Integer),
    opt("replicas", Any),
    opt("primary_replica_tag", String),
    opt("nonvoting_replica_tags", Array),
    opt("dry_run", Bool),
    opt("emergency_repair", OneOf(&["unsafe_rollback", "unsafe_rollback_or_erase"])),
];

const WAIT_OPTS: &[OptSpec] = &[
    opt(
        "wait_for",
        OneOf(&[
            "ready_for_outdated_reads",
            "ready_for_reads",
            "ready_for_writes",
            "all_replicas_ready",
        ]),
    ),
    opt("timeout", Number),
];

const INSERT_OPTS: &[OptSpec] = &[
    opt("durability", DURABILITY),
    opt("return_changes", Any),
    opt("conflict", StringOrFunc(3)),
    opt("ignore_write_hook", Bool),
];

const UPDATE_OPTS: &[OptSpec] = &[
    opt("durability", DURABILITY),
    opt("return_changes", Any),
    opt("non_atomic", Bool),
    opt("ignore_write_hook", Bool),
];

const DELETE_OPTS: &[OptSpec] = &[
    opt("durability", DURABILITY),
    opt("return_changes", Any),
    opt("ignore_write_hook", Bool),
];

const CHANGES_OPTS: &[OptSpec] = &[
    opt("squash", Any),
    opt("changefeed_queue_size", Integer),
    opt("include_initial", Bool),
    opt("include_states", Bool),
    opt("include_offsets", Bool),
    opt("include_types", Bool),
];

const HTTP_OPTS: &[OptSpec] = &[
    opt("timeout", Number),
    opt("attempts", Integer),
    opt("redirects", Integer),
    opt("verify", Bool),
    opt("result_format", OneOf(&["text", "json", "jsonp", "binary", "auto"])),
    opt("method", OneOf(&["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"])),
    opt("auth", Object),
    opt("params", Object),
    opt("header", Any),
    opt("data", Any),
];

const INDEX_OPT: &[OptSpec] = &[opt("index", String)];

const fn cmd(name: &'static str, term_type: TermType) -> CommandDescriptor {
    CommandDescriptor::new(name, term_type)
}

/// Every builtin command, registered under its own name.
pub static BUILTINS: &[CommandDescriptor] = &[
    // Database & table administration
    cmd("db", TermType::Db).args(&[String]),
    cmd("db_create", TermType::DbCreate).args(&[String]),
    cmd("db_drop", TermType::DbDrop).args(&[String]),
    cmd("db_list", TermType::DbList),
    cmd("table", TermType::Table)
        .args(&[String])
        .options(TABLE_OPTS)
        .constructor(construct_db_scoped),
    cmd("table_create", TermType::TableCreate)
        .args(&[String])
        .options(TABLE_CREATE_OPTS)
        .constructor(construct_table_create),
    cmd("table_drop", TermType::TableDrop)
        .args(&[String])
        .constructor(construct_db_scoped),
    cmd("table_list", TermType::TableList).constructor(construct_db_scoped),
    cmd("index_create", TermType::IndexCreate)
        .args(&[Kind(TermType::Table), String])
        .optional(&[Func(1)])
        .options(&[opt("multi", Bool), opt("geo", Bool)]),
    cmd("index_drop", TermType::IndexDrop).args(&[Kind(TermType::Table), String]),
    cmd("index_list", TermType::IndexList).args(&[Kind(TermType::Table)]),
    cmd("index_status", TermType::IndexStatus)
        .args(&[Kind(TermType::Table)])
        .rest(String),
    cmd("index_wait", TermType::IndexWait)
        .args(&[Kind(TermType::Table)])
        .rest(String),
    cmd("index_rename", TermType::IndexRename)
        .args(&[Kind(TermType::Table), String, String])
        .options(&[opt("overwrite", Bool)]),
    cmd("sync", TermType::Sync).args(&[Kind(TermType::Table)]),
    cmd("config", TermType::Config).args(&[Any]),
    cmd("status", TermType::Status).args(&[Any]),
    cmd("wait", TermType::Wait).args(&[Any]).options(WAIT_OPTS),
    cmd("reconfigure", TermType::Reconfigure)
        .args(&[Any])
        .options(RECONFIGURE_OPTS),
    cmd("rebalance", TermType::Rebalance).args(&[Any]),
    cmd("grant", TermType::Grant)
        .args(&[String, Object])
        .constructor(construct_db_scoped),
    // Reads
    cmd("get", TermType::Get).args(&[Kind(TermType::Table), PKey]),
    cmd("get_all", TermType::GetAll)
        .args(&[Kind(TermType::Table), PKey])
        .rest(PKey)
        .options(INDEX_OPT),
    cmd("between", TermType::Between)
        .args(&[Select, Any, Any])
        .options(BETWEEN_OPTS),
    cmd("filter", TermType::Filter)
        .args(&[Sequence, Predicate(1)])
        .options(&[opt("default", Any)]),
    // Writes
    cmd("insert", TermType::Insert)
        .args(&[Kind(TermType::Table), Any])
        .options(INSERT_OPTS),
    cmd("update", TermType::Update)
        .args(&[Select, Predicate(1)])
        .options(UPDATE_OPTS),
    cmd("replace", TermType::Replace)
        .args(&[Select, Predicate(1)])
        .options(UPDATE_OPTS),
    cmd("delete", TermType::Delete).args(&[Select]).options(DELETE_OPTS),
    // Transformations
    cmd("map", TermType::Map).args(&[Sequence, Func(1)]),
    cmd("with_fields", TermType::WithFields)
        .args(&[Sequence, Path])
        .rest(Path),
    cmd("concat_map", TermType::ConcatMap).args(&[Sequence, Func(1)]),
    cmd("order_by", TermType::OrderBy)
        .args(&[Sequence])
        .rest(Any)
        .options(&[opt("index", Any)]),
    cmd("asc", TermType::Asc).args(&[StringOrFunc(1)]),
    cmd("desc", TermType::Desc).args(&[StringOrFunc(1)]),
    cmd("skip", TermType::Skip).args(&[Sequence, Integer]),
    cmd("limit", TermType::Limit).args(&[Sequence, Integer]),
    cmd("slice", TermType::Slice)
        .args(&[Sequence, Integer])
        .optional(&[Integer])
        .options(BOUND_OPTS),
    cmd("nth", TermType::Nth).args(&[Sequence, Integer]),
    cmd("offsets_of", TermType::OffsetsOf).args(&[Sequence, Predicate(1)]),
    cmd("is_empty", TermType::IsEmpty).args(&[Sequence]),
    cmd("union", TermType::Union)
        .args(&[Sequence])
        .rest(Sequence)
        .options(&[opt("interleave", Any)]),
    cmd("sample", TermType::Sample).args(&[Sequence, Integer]),
    cmd("distinct", TermType::Distinct)
        .args(&[Sequence])
        .options(INDEX_OPT),
    cmd("changes", TermType::Changes)
        .args(&[Sequence])
        .options(CHANGES_OPTS),
    // Joins
    cmd("inner_join", TermType::InnerJoin).args(&[Sequence, Sequence, Func(2)]),
    cmd("outer_join", TermType::OuterJoin).args(&[Sequence, Sequence, Func(2)]),
    cmd("eq_join", TermType::EqJoin)
        .args(&[Sequence, StringOrFunc(1), Select])
        .options(&[opt("index", String), opt("ordered", Bool)]),
    cmd("zip", TermType::Zip).args(&[Sequence]),
    cmd("range", TermType::Range).optional(&[Integer, Integer]),
    // Aggregation
    cmd("group", TermType::Group)
        .args(&[Sequence])
        .rest(StringOrFunc(1))
        .options(&[opt("index", String), opt("multi", Bool)]),
    cmd("ungroup", TermType::Ungroup).args(&[Any]),
    cmd("reduce", TermType::Reduce).args(&[Sequence, Func(2)]),
    cmd("fold", TermType::Fold)
        .args(&[Sequence, Any, Func(2)])
        .options(&[opt("emit", Func(3)), opt("final_emit", Func(1))]),
    cmd("count", TermType::Count)
        .args(&[Any])
        .optional(&[Predicate(1)]),
    cmd("sum", TermType::Sum)
        .args(&[Sequence])
        .optional(&[StringOrFunc(1)]),
    cmd("avg", TermType::Avg)
        .args(&[Sequence])
        .optional(&[StringOrFunc(1)]),
    cmd("min", TermType::Min)
        .args(&[Sequence])
        .optional(&[StringOrFunc(1)])
        .options(INDEX_OPT),
    cmd("max", TermType::Max)
        .args(&[Sequence])
        .optional(&[StringOrFunc(1)])
        .options(INDEX_OPT),
    cmd("contains", TermType::Contains)
        .args(&[Sequence, Predicate(1)])
        .rest(Predicate(1)),
    // Document manipulation
    cmd("pluck", TermType::Pluck).args(&[Any, Path]).rest(Path),
    cmd("without", TermType::Without).args(&[Any, Path]).rest(Path),
    cmd("merge", TermType::Merge)
        .args(&[Any, Predicate(1)])
        .rest(Predicate(1)),
    cmd("append", TermType::Append).args(&[Array, Any]),
    cmd("prepend", TermType::Prepend).args(&[Array, Any]),
    cmd("difference", TermType::Difference).args(&[Array, Array]),
    cmd("set_insert", TermType::SetInsert).args(&[Array, Any]),
    cmd("set_union", TermType::SetUnion).args(&[Array, Array]),
    cmd("set_intersection", TermType::SetIntersection).args(&[Array, Array]),
    cmd("set_difference", TermType::SetDifference).args(&[Array, Array]),
    cmd("get_field", TermType::GetField).args(&[Any, String]),
    cmd("bracket", TermType::Bracket).args(&[Any, Any]),
    cmd("has_fields", TermType::HasFields).args(&[Any, Path]).rest(Path),
    cmd("insert_at", TermType::InsertAt).args(&[Array, Integer, Any]),
    cmd("splice_at", TermType::SpliceAt).args(&[Array, Integer, Array]),
    cmd("delete_at", TermType::DeleteAt)
        .args(&[Array, Integer])
        .optional(&[Integer]),
    cmd("change_at", TermType::ChangeAt).args(&[Array, Integer, Any]),
    cmd("keys", TermType::Keys).args(&[Object]),
    cmd("values", TermType::Values).args(&[Object]),
    cmd("literal", TermType::Literal).optional(&[Any]),
    cmd("object", TermType::Object)
        .rest(Any)
        .constructor(construct_object),
    // Math & logic
    cmd("add", TermType::Add).args(&[Any]).rest(Any),
    cmd("sub", TermType::Sub).args(&[Any]).rest(Any),
    cmd("mul", TermType::Mul).args(&[Any]).rest(Any),
    cmd("div", TermType::Div).args(&[Any]).rest(Any),
    cmd("mod", TermType::Mod).args(&[Number, Number]),
    cmd("floor", TermType::Floor).args(&[Number]),
    cmd("ceil", TermType::Ceil).args(&[Number]),
    cmd("round", TermType::Round).args(&[Number]),
    cmd("and", TermType::And).rest(Any),
    cmd("or", TermType::Or).rest(Any),
    cmd("eq", TermType::Eq).args(&[Any, Any]).rest(Any),
    cmd("ne", TermType::Ne).args(&[Any, Any]).rest(Any),
    cmd("lt", TermType::Lt).args(&[Any, Any]).rest(Any),
    cmd("le", TermType::Le).args(&[Any, Any]).rest(Any),
    cmd("gt", TermType::Gt).args(&[Any, Any]).rest(Any),
    cmd("ge", TermType::Ge).args(&[Any, Any]).rest(Any),
    cmd("not", TermType::Not).args(&[Any]),
    cmd("random", TermType::Random)
        .optional(&[Number, Number])
        .options(&[opt("float", Bool)]),
    // Strings
    cmd("match", TermType::Match).args(&[String, String]),
    cmd("split", TermType::Split)
        .args(&[String])
        .optional(&[Any, Integer]),
    cmd("upcase", TermType::Upcase).args(&[String]),
    cmd("downcase", TermType::Downcase).args(&[String]),
    // Time
    cmd("now", TermType::Now),
    cmd("time", TermType::Time)
        .args(&[Number, Number, Number, Any])
        .optional(&[Any, Any, Any])
        .constructor(construct_time),
    cmd("epoch_time", TermType::EpochTime).args(&[Number]),
    cmd("iso8601", TermType::Iso8601)
        .args(&[String])
        .options(&[opt("default_timezone", String)]),
    cmd("in_timezone", TermType::InTimezone).args(&[Any, String]),
    cmd("timezone", TermType::Timezone).args(&[Any]),
    cmd("during", TermType::During)
        .args(&[Any, Any, Any])
        .options(BOUND_OPTS),
    cmd("date", TermType::Date).args(&[Any]),
    cmd("time_of_day", TermType::TimeOfDay).args(&[Any]),
    cmd("year", TermType::Year).args(&[Any]),
    cmd("month", TermType::Month).args(&[Any]),
    cmd("day", TermType::Day).args(&[Any]),
    cmd("day_of_week", TermType::DayOfWeek).args(&[Any]),
    cmd("day_of_year", TermType::DayOfYear).args(&[Any]),
    cmd("hours", TermType::Hours).args(&[Any]),
    cmd("minutes", TermType::Minutes).args(&[Any]),
    cmd("seconds", TermType::Seconds).args(&[Any]),
    cmd("to_iso8601", TermType::ToIso8601).args(&[Any]),
    cmd("to_epoch_time", TermType::ToEpochTime).args(&[Any]),
    // Control structures
    cmd("do", TermType::Funcall)
        .args(&[Any])
        .rest(Any)
        .constructor(construct_funcall),
    cmd("branch", TermType::Branch)
        .args(&[Any, Any, Any])
        .rest(Any)
        .constructor(construct_branch),
    cmd("for_each", TermType::ForEach).args(&[Sequence, Func(1)]),
    cmd("error", TermType::Error).optional(&[String]),
    cmd("default", TermType::Default).args(&[Any, Any]),
    cmd("js", TermType::Javascript)
        .args(&[String])
        .options(&[opt("timeout", Number)]),
    cmd("coerce_to", TermType::CoerceTo).args(&[Any, String]),
    cmd("type_of", TermType::TypeOf).args(&[Any]),
    cmd("info", TermType::Info).args(&[Any]),
    cmd("json", TermType::Json).args(&[String]),
    cmd("to_json_string", TermType::ToJsonString).args(&[Any]),
    cmd("http", TermType::Http).args(&[String]).options(HTTP_OPTS),
    cmd("uuid", TermType::Uuid).optional(&[String]),
    cmd("args", TermType::Args).args(&[Array]),
    cmd("binary", TermType::Binary).args(&[Any]),
    cmd("minval", TermType::Minval),
    cmd("maxval", TermType::Maxval),
];

/// Alternate names, mostly operator spellings used by the expression syntax.
pub static ALIASES: &[(&str, &str)] = &[
    ("+", "add"),
    ("-", "sub"),
    ("*", "mul"),
    ("/", "div"),
    ("%", "mod"),
    ("=", "eq"),
    ("==", "eq"),
    ("not=", "ne"),
    ("!=", "ne"),
    ("<", "lt"),
    ("<=", "le"),
    (">", "gt"),
    (">=", "ge"),
    ("funcall", "do"),
    ("javascript", "js"),
    ("indexes_of", "offsets_of"),
];

/// Builtin descriptor by canonical name, bypassing any registry.
pub fn builtin(name: &str) -> Option<&'static CommandDescriptor> {
    BUILTINS.iter().find(|descriptor| descriptor.name == name)
}

/// Register every builtin and alias into `registry`.
pub fn register_builtins(registry: &CommandRegistry) -> Result<()> {
    for descriptor in BUILTINS {
        registry.register(*descriptor)?;
    }
    for (alias, target) in ALIASES {
        registry.alias(alias, target)?;
    }
    debug!(
        commands = BUILTINS.len(),
        aliases = ALIASES.len(),
        "Registered builtin commands"
    );
    Ok(())
}

/// Table commands optionally scoped by a leading `db(..)` term; the
/// descriptor checks describe the arguments after it.
fn construct_db_scoped(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    mut args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    let db = match args.first() {
        Some(first) if predicates::is_term_of_kind(first, TermType::Db) => Some(args.remove(0)),
        _ => None,
    };
    descriptor.validate_args(&args)?;
    descriptor.validate_options(&options)?;
    if let Some(db) = db {
        args.insert(0, db);
    }
    normalizer.create_term(descriptor.term_type, args, options)
}

/// `replicas` may be a count or a per-tag map; a map needs
/// `primary_replica_tag`, and `primary_replica_tag` needs `replicas`.
fn construct_table_create(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    let replicas = options
        .iter()
        .find(|(name, _)| name == "replicas")
        .map(|(_, value)| value);
    let has_tag = options.iter().any(|(name, _)| name == "primary_replica_tag");

    match replicas {
        Some(value) if predicates::is_object(value) && !has_tag => {
            return Err(Error::argument(format!(
                "{}: replicas per server tag require primary_replica_tag",
                descriptor.name
            )));
        }
        Some(value)
            if !(predicates::is_integer(value)
                || predicates::is_object(value)
                || predicates::is_deferred(value)) =>
        {
            return Err(Error::argument(format!(
                "{}: option 'replicas' must be integer|object, got {}",
                descriptor.name,
                value.kind_name()
            )));
        }
        None if has_tag => {
            return Err(Error::argument(format!(
                "{}: primary_replica_tag requires replicas",
                descriptor.name
            )));
        }
        _ => {}
    }

    construct_db_scoped(descriptor, normalizer, args, options)
}

/// `object(k1, v1, k2, v2, ...)`. Literal keys give a MAKE_OBJ term with
/// one option per key; any computed key falls back to the server-side
/// OBJECT operation with positional pairs.
fn construct_object(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    descriptor.validate_options(&options)?;
    if args.len() % 2 != 0 {
        return Err(Error::argument(format!(
            "{} expects key/value pairs, got {} argument(s)",
            descriptor.name,
            args.len()
        )));
    }
    for (index, key) in args.iter().step_by(2).enumerate() {
        if !(predicates::is_string(key) || predicates::is_deferred(key)) {
            return Err(Error::argument(format!(
                "{}: key {} must be string, got {}",
                descriptor.name,
                index + 1,
                key.kind_name()
            )));
        }
    }

    if args.iter().step_by(2).any(predicates::is_deferred) {
        return normalizer.create_term(descriptor.term_type, args, Vec::new());
    }

    let mut pairs = args.into_iter();
    let mut builder = TermBuilder::new(TermType::MakeObj);
    while let (Some(key), Some(value)) = (pairs.next(), pairs.next()) {
        let key = key.as_str().map(str::to_string).unwrap_or_default();
        let (key, term) = normalizer.term_assoc(key, value)?;
        builder = builder.optarg(key, term);
    }
    builder.build()
}

/// `time(year, month, day, timezone)` or
/// `time(year, month, day, hour, minute, second, timezone)`.
fn construct_time(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    if args.len() != 4 && args.len() != 7 {
        return Err(Error::argument(format!(
            "{} expects 4 or 7 arguments, got {}",
            descriptor.name,
            args.len()
        )));
    }
    let (timezone, fields) = args.split_last().ok_or_else(|| Error::argument("time"))?;
    for (index, field) in fields.iter().enumerate() {
        if !Number.admits(field) {
            return Err(Error::argument(format!(
                "{}: argument {} must be number, got {}",
                descriptor.name,
                index + 1,
                field.kind_name()
            )));
        }
    }
    if !String.admits(timezone) {
        return Err(Error::argument(format!(
            "{}: timezone must be string, got {}",
            descriptor.name,
            timezone.kind_name()
        )));
    }
    descriptor.validate_options(&options)?;
    normalizer.create_term(descriptor.term_type, args, options)
}

/// `do(arg..., f)`: the function comes last here and first on the wire,
/// and must take exactly as many parameters as there are arguments.
fn construct_funcall(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    mut args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    descriptor.validate_args(&args)?;
    descriptor.validate_options(&options)?;
    let function = args
        .pop()
        .ok_or_else(|| Error::argument(format!("{} expects a function", descriptor.name)))?;
    expect_arity(&function, args.len())
        .map_err(|e| Error::argument(format!("{}: {}", descriptor.name, detail(&e))))?;
    args.insert(0, function);
    normalizer.create_term(descriptor.term_type, args, options)
}

/// `branch(test, then, [test, then]..., else)` needs an odd argument count.
fn construct_branch(
    descriptor: &CommandDescriptor,
    normalizer: &Normalizer,
    args: Vec<Value>,
    options: Options,
) -> Result<Term> {
    descriptor.validate_args(&args)?;
    if args.len() % 2 == 0 {
        return Err(Error::argument(format!(
            "{} expects an odd number of arguments, got {}",
            descriptor.name,
            args.len()
        )));
    }
    descriptor.validate_options(&options)?;
    normalizer.create_term(descriptor.term_type, args, options)
}
