//! ReQL term builder command-line tool
//!
//! Builds query terms from their textual form and inspects the command
//! catalogue.
//!
//! # Examples
//!
//! ```bash
//! # Build a term and print its tree
//! reql build '(between (table "users") 1 10 :index "code")'
//!
//! # Same, as JSON
//! reql build --json -f query.reql
//!
//! # List every command with its signature
//! reql commands
//!
//! # Show one command
//! reql describe table-create
//! ```

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use reql_builder::{BuilderConfig, CommandRegistry};
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// ReQL term builder
#[derive(Parser, Debug)]
#[command(name = "reql")]
#[command(version = reql_builder::VERSION)]
#[command(about = "Build and inspect ReQL query terms", long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, env = "REQL_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Also write logs to daily-rotated files in this directory
    #[arg(long, global = true, env = "REQL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a term from an expression
    Build(BuildArgs),

    /// List registered commands
    Commands {
        /// Show aliases next to each command
        #[arg(short, long)]
        aliases: bool,
    },

    /// Show the signature of one command
    Describe {
        /// Command name or alias
        name: String,
    },

    /// Print the effective configuration
    Config,
}

/// Build arguments
#[derive(Args, Debug)]
struct BuildArgs {
    /// Expression text (read from --file or stdin when omitted)
    expr: Option<String>,

    /// Read the expression from a file
    #[arg(short, long, conflicts_with = "expr")]
    file: Option<PathBuf>,

    /// Print the term as JSON instead of a tree
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config =
        BuilderConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    setup_logging(&cli, &config)?;
    debug!(?config, "Configuration loaded");

    let registry = CommandRegistry::from_config(&config).context("Failed to build registry")?;

    match cli.command {
        Commands::Build(args) => build_command(&registry, args),
        Commands::Commands { aliases } => commands_command(&registry, aliases),
        Commands::Describe { name } => describe_command(&registry, &name),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Logs go to stderr so that terms printed on stdout stay machine-readable
fn setup_logging(cli: &Cli, config: &BuilderConfig) -> anyhow::Result<()> {
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.log_level)
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let file_layer = match &cli.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, "reql.log");
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color)
                .with_target(false),
        )
        .with(file_layer)
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

/// Build command - parse, resolve and construct one expression
fn build_command(registry: &CommandRegistry, args: BuildArgs) -> anyhow::Result<()> {
    let text = match (args.expr, args.file) {
        (Some(expr), _) => expr,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        (None, None) => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read expression from stdin")?;
            text
        }
    };

    let term = registry.build(&text).context("Failed to build term")?;
    info!(root = %term.term_type(), nodes = term.node_count(), "Term built");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&term)?);
    } else {
        println!("{}", term.pretty_print(0));
    }
    Ok(())
}

/// Commands command - list the catalogue
fn commands_command(registry: &CommandRegistry, aliases: bool) -> anyhow::Result<()> {
    for name in registry.names() {
        let Some(descriptor) = registry.get(&name) else {
            continue;
        };
        let alias_list = registry.aliases_of(&name);
        if aliases && !alias_list.is_empty() {
            println!("{}  [{}]", descriptor.signature(), alias_list.join(" "));
        } else {
            println!("{}", descriptor.signature());
        }
    }
    Ok(())
}

/// Describe command - one command in detail
fn describe_command(registry: &CommandRegistry, name: &str) -> anyhow::Result<()> {
    let Some(descriptor) = registry.get(name) else {
        bail!("Unknown command '{}'", name);
    };

    println!("{}", descriptor.signature());
    println!(
        "  operation: {} ({})",
        descriptor.term_type,
        descriptor.term_type.to_u64()
    );
    let aliases = registry.aliases_of(descriptor.name);
    if !aliases.is_empty() {
        println!("  aliases:   {}", aliases.join(" "));
    }
    Ok(())
}
