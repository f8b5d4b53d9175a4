//! querylike — SQL LIKE emulation CLI
//!
//! Inspect how LIKE patterns and predicate trees are handled in memory.
//!
//! # Usage
//!
//! ```bash
//! # Evaluate a single LIKE
//! querylike match 'a_b' 'a\_%' --escape '\'
//!
//! # Show the regex a pattern turns into
//! querylike regex '100\%' --escape '\'
//!
//! # Rewrite a predicate tree
//! querylike rewrite "|p| like(functions, p.name, 'A%')"
//! ```

use anyhow::{Context, ensure};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use querylike::pattern::escape_char;
use querylike::prelude::*;
use querylike::rewriter::walk_call;
use serde_json::json;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "querylike")]
#[command(version)]
#[command(about = "SQL LIKE emulation for in-memory query trees", long_about = None)]
#[command(after_help = "EXAMPLES:
    querylike match 'hello world' 'HELLO%'
    querylike regex 'a\\_%' --escape '\\'
    querylike explain \"|p| like(functions, p.name, 'a%') && p.active == true\"")]
struct Cli {
    /// Match budget in milliseconds
    #[arg(long, global = true, env = "QUERYLIKE_TIMEOUT_MS")]
    timeout_ms: Option<u64>,

    /// Config file (defaults to ./querylike.toml, then the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate `SUBJECT LIKE PATTERN [ESCAPE C]`
    Match {
        subject: String,
        pattern: String,
        /// Escape character (only the first character is used)
        #[arg(short, long)]
        escape: Option<String>,
    },
    /// Show the regex a LIKE pattern translates to
    Regex {
        pattern: String,
        #[arg(short, long)]
        escape: Option<String>,
    },
    /// Rewrite provider LIKE calls in a predicate
    Rewrite {
        /// Predicate in expression notation
        expr: String,
    },
    /// Parse a predicate and show its SQL, rewrite and regexes
    Explain {
        /// Predicate in expression notation
        expr: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "querylike=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(ms) = cli.timeout_ms {
        ensure!(ms > 0, "--timeout-ms must be greater than zero");
        config.matcher.timeout_ms = ms;
    }

    match &cli.command {
        Commands::Match {
            subject,
            pattern,
            escape,
        } => run_match(cli, &config, subject, pattern, escape.as_deref()),
        Commands::Regex { pattern, escape } => {
            let regex = like_to_regex(pattern, escape_char(escape.as_deref()));
            match cli.format {
                OutputFormat::Json => print_json(&json!({
                    "pattern": pattern,
                    "escape": escape,
                    "regex": regex,
                }))?,
                OutputFormat::Table => println!("{}", regex.white()),
            }
            Ok(())
        }
        Commands::Rewrite { expr } => {
            let tree = parse_expr(expr)?;
            let rewritten = translate_call(&tree);
            match cli.format {
                OutputFormat::Json => print_json(&json!({
                    "input": tree.to_string(),
                    "rewritten": rewritten.to_string(),
                    "tree": rewritten,
                }))?,
                OutputFormat::Table => println!("{}", rewritten.to_string().white()),
            }
            Ok(())
        }
        Commands::Explain { expr } => explain(cli, expr),
    }
}

fn run_match(
    cli: &Cli,
    config: &Config,
    subject: &str,
    pattern: &str,
    escape: Option<&str>,
) -> anyhow::Result<()> {
    if cli.verbose {
        println!(
            "{} {} LIKE {}",
            "Input:".dimmed(),
            subject.yellow(),
            pattern.yellow()
        );
    }

    let matched = like_match_with(&config.match_options(), Some(subject), Some(pattern), escape)?;

    match cli.format {
        OutputFormat::Json => print_json(&json!({
            "subject": subject,
            "pattern": pattern,
            "escape": escape,
            "matched": matched,
        }))?,
        OutputFormat::Table if matched => println!("{}", "true".green().bold()),
        OutputFormat::Table => println!("{}", "false".red().bold()),
    }
    Ok(())
}

fn explain(cli: &Cli, expr: &str) -> anyhow::Result<()> {
    let tree = parse_expr(expr)?;
    let rewritten = translate_call(&tree);

    let mut collector = PatternCollector::default();
    collector.visit(&rewritten);

    if cli.format == OutputFormat::Json {
        let regexes: Vec<_> = collector
            .found
            .iter()
            .map(|(pattern, escape)| {
                json!({ "pattern": pattern, "regex": like_to_regex(pattern, *escape) })
            })
            .collect();
        return print_json(&json!({
            "input": tree.to_string(),
            "sql": tree.to_sql(),
            "rewritten": rewritten.to_string(),
            "regexes": regexes,
        }));
    }

    println!("{}", "querylike Explanation".cyan().bold());
    println!();
    println!("  {} {}", "Parsed:".dimmed(), tree.to_string().white());
    println!("  {} {}", "SQL:".dimmed(), tree.to_sql().white());
    println!("  {} {}", "Rewritten:".dimmed(), rewritten.to_string().white());

    if !collector.found.is_empty() {
        println!("  {}", "Patterns:".dimmed());
        for (pattern, escape) in &collector.found {
            println!(
                "    {} → {}",
                pattern.yellow(),
                like_to_regex(pattern, *escape).white()
            );
        }
    }
    Ok(())
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Collects constant `(pattern, escape)` pairs from in-memory LIKE calls.
#[derive(Default)]
struct PatternCollector {
    found: Vec<(String, Option<char>)>,
}

impl ExprVisitor for PatternCollector {
    fn visit_call(&mut self, call: &MethodCall) -> Expr {
        if call.kind() == CallKind::InMemoryLike {
            if let [_, Expr::Constant(Value::String(pattern)), escape] = call.args() {
                let escape = match escape {
                    Expr::Constant(Value::String(e)) => escape_char(Some(e)),
                    _ => None,
                };
                self.found.push((pattern.clone(), escape));
            }
        }
        walk_call(self, call)
    }
}
