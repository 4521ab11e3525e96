//! Purpose: `zipnear` CLI entry point.
//! Role: Binary crate root; parses args, loads the dataset, prints the match and nearest city.
//! Invariants: stdout holds either both result lines (or one JSON object) or nothing.
//! Invariants: Errors go to stderr: human text on a terminal, JSON otherwise.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod data_paths;

use data_paths::{DATA_ENV, DelimiterError, parse_delimiter, resolve_data_path};
use zipnear::api::{Error, ErrorKind, LocationCatalog, resolution_json, resolve, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => return Err((clap_usage_error(&err), ColorMode::Auto)),
        },
    };

    let color_mode = cli.color;
    init_tracing(cli.verbose);

    lookup(cli)
        .map_err(add_data_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "zipnear",
    version,
    about = "Find the city for a postal code and the nearest other city",
    long_about = None,
    after_help = r#"EXAMPLES
  $ zipnear --zip 10001
  $ zipnear --zip 10001 --data ./uscities.csv
  $ ZIPNEAR_DATA=./uscities.csv zipnear -z 98101 --json

NOTES
  - The dataset is a CSV with a header naming: city, state_name, lat, lng,
    population, density, timezone, zips, id (plus optional extra columns)
  - Output: `<city> (<state>): <lat>, <lng>, <timezone>` for the match, then the nearest city
  - Set RUST_LOG (e.g. RUST_LOG=debug) for diagnostics on stderr"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(short = 'z', long = "zip", value_name = "CODE", help = "Postal code to look up")]
    zip: String,
    #[arg(
        long,
        env = DATA_ENV,
        value_name = "PATH",
        help = "City dataset CSV (default: ./uscities.csv)",
        value_hint = ValueHint::FilePath
    )]
    data: Option<PathBuf>,
    #[arg(
        long,
        default_value = ",",
        value_name = "CHAR",
        help = "Field separator of the dataset (`tab` for tab-separated)"
    )]
    delimiter: String,
    #[arg(long, help = "Emit a single JSON object instead of two text lines")]
    json: bool,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
    #[arg(short, long, help = "Log load and search details to stderr")]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn lookup(cli: Cli) -> Result<RunOutcome, Error> {
    let separator = parse_delimiter(&cli.delimiter).map_err(|err| {
        let message = match err {
            DelimiterError::Empty => "delimiter must not be empty",
            DelimiterError::MultipleCharacters => "delimiter must be a single character",
        };
        Error::new(ErrorKind::Usage)
            .with_message(message)
            .with_hint("Use e.g. `--delimiter ,` or `--delimiter tab`.")
    })?;
    let zip = cli.zip.trim();
    if zip.is_empty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("postal code must not be empty")
            .with_hint("Pass a code, e.g. `zipnear --zip 10001`."));
    }

    let path = resolve_data_path(cli.data);
    let catalog = LocationCatalog::open_with_separator(&path, separator)?;
    let resolution = resolve(&catalog, zip)?;

    if cli.json {
        emit_json(resolution_json(&resolution));
    } else {
        println!("{}", resolution.matched.short_view());
        println!("{}", resolution.closest.short_view());
    }
    Ok(RunOutcome::ok())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn add_data_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::Io => err.with_hint(format!(
            "Point --data (or {DATA_ENV}) at a readable city dataset CSV."
        )),
        ErrorKind::MalformedInput | ErrorKind::InvalidNumericField => err.with_hint(
            "Dataset rows must match the header; lat/lng/population/density must be numbers.",
        ),
        ErrorKind::NotFound => {
            err.with_hint("No city in the dataset claims this postal code. Check the code or dataset.")
        }
        _ => err,
    }
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::MalformedInput => "malformed dataset".to_string(),
        ErrorKind::InvalidNumericField => "invalid numeric field".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&cause| cause.source())
        .map(ToString::to_string)
        .collect()
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(field) = err.field() {
        inner.insert("field".to_string(), json!(field));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(field) = err.field() {
        lines.push(format!(
            "{} {field}",
            colorize_label("field:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_usage_error(err: &clap::Error) -> Error {
    let rendered = err.to_string();
    let message = rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string());
    let hint = match err.kind() {
        ClapErrorKind::MissingRequiredArgument => {
            "Pass the postal code to look up, e.g. `zipnear --zip 10001`."
        }
        ClapErrorKind::InvalidValue | ClapErrorKind::ValueValidation => {
            "Check the option value against `zipnear --help`."
        }
        _ => "Try `zipnear --help`.",
    };
    Error::new(ErrorKind::Usage).with_message(message).with_hint(hint)
}
