//! Purpose: `repr` CLI entry point for resolving types and canonicalizing JSON documents.
//! Role: Binary crate root; parses args, runs one command, prints results on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Log output goes to stderr and is filtered by `RUST_LOG` (default `warn`).
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value as JsonValue, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use representations::api::{
    DEFAULT_MAX_DEPTH, Error, ErrorKind, Representations, TypeRef, to_exit_code,
};

#[derive(Parser, Debug)]
#[command(
    name = "repr",
    version,
    about = "Decode and re-encode JSON documents through type-driven representations",
    long_about = "Decode and re-encode JSON documents through type-driven representations.\n\n\
The CLI registers no classes, so it covers primitive and container types only: \
Boolean, Double, Long, String, Date, List<E>, Map<K, V>. Structure types need a \
registry built through the library."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a document against a type and print its canonical compact encoding.
    Canon {
        #[arg(
            long = "type",
            value_name = "EXPR",
            help = "Primitive or container type expression, e.g. 'Map<String, List<Long>>'"
        )]
        ty: String,
        #[arg(long, value_hint = ValueHint::FilePath, help = "Input file (default: stdin)")]
        input: Option<PathBuf>,
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH, help = "Maximum array/object nesting depth")]
        max_depth: usize,
    },
    /// Resolve the representation for a type and report the canonical type expression.
    Check {
        #[arg(
            long = "type",
            value_name = "EXPR",
            help = "Primitive or container type expression; class names are not registered"
        )]
        ty: String,
    },
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let code = if err.kind() == ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
                    2
                } else {
                    0
                };
                return Ok(code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `repr --help` for usage."));
            }
        },
    };

    match cli.command {
        Command::Canon {
            ty,
            input,
            max_depth,
        } => canon(&ty, input, max_depth),
        Command::Check { ty } => check(&ty),
    }
}

fn canon(expr: &str, input: Option<PathBuf>, max_depth: usize) -> Result<i32, Error> {
    let ty = parse_type(expr)?;
    let registry = Representations::builder().max_depth(max_depth).build()?;
    let document = read_input(input)?;
    debug!(ty = %ty, bytes = document.len(), "canonicalizing document");
    let value = registry.decode_str(&ty, &document)?;
    let encoded = registry.encode_to_string(&ty, &value)?;
    println!("{encoded}");
    Ok(0)
}

fn check(expr: &str) -> Result<i32, Error> {
    let ty = parse_type(expr)?;
    let registry = Representations::new();
    let representation = registry.for_type(&ty)?;
    println!(
        "{}",
        json!({ "type": representation.type_ref().to_string(), "status": "ok" })
    );
    Ok(0)
}

fn parse_type(expr: &str) -> Result<TypeRef, Error> {
    expr.parse::<TypeRef>()
        .map_err(|err| err.with_hint("Type expressions look like 'List<Long>' or 'Map<String, Date>'."))
}

fn read_input(input: Option<PathBuf>) -> Result<String, Error> {
    match input {
        Some(path) => fs::read_to_string(&path).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message(format!("failed to read {}", path.display()))
                .with_source(err)
        }),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(|err| {
                Error::new(ErrorKind::Io)
                    .with_message("failed to read stdin")
                    .with_source(err)
            })?;
            Ok(buf)
        }
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::Protocol => "malformed JSON".to_string(),
        ErrorKind::Configuration => "type has no representation".to_string(),
        ErrorKind::Instantiation => "class cannot be instantiated".to_string(),
        ErrorKind::Semantic => "value does not match type".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> JsonValue {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    if let Some(offset) = err.offset() {
        inner.insert("offset".to_string(), json!(offset));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), JsonValue::Object(inner));
    JsonValue::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(field) = err.field() {
        lines.push(format!("field: {field}"));
    }
    if let Some(offset) = err.offset() {
        lines.push(format!("offset: {offset}"));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
