//! Command-line front end for `structeq-core`.
//!
//! Compares two documents (the second defaults to STDIN), or inspects a
//! single one by selecting, formatting or fingerprinting it.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use structeq_core::{CompareOptions, Format};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "STRUCTEQ_LOG";

const EXIT_EQUAL: i32 = 0;
const EXIT_NOT_EQUAL: i32 = 1;
const EXIT_ERROR: i32 = 2;

const AFTER_HELP: &str = r#"Without --query the two documents must be structurally equal.
With a query, every subtree it selects from FILE1 must also be selected from FILE2.
JSON and YAML take JSONPath queries ("$..stations"); XML takes element paths
("country", ".//neighbor[@direction='E']").

Exit status: 0 when equal, 1 when not equal, 2 on error.

Examples:
  structeq a.json b.json
  structeq --query '$..stations' part.json full.json
  cat full.xml | structeq --query country part.xml
  structeq --select --query country --pretty data.xml
  structeq --fingerprint data.yaml"#;

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
enum FormatArg {
    Json,
    #[value(alias = "yml")]
    Yaml,
    Xml,
}

impl From<FormatArg> for Format {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Self::Json,
            FormatArg::Yaml => Self::Yaml,
            FormatArg::Xml => Self::Xml,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "structeq",
    version,
    about = "Compare JSON, YAML and XML documents regardless of ordering.",
    override_usage = "structeq [OPTIONS] FILE1 [FILE2]",
    after_help = AFTER_HELP
)]
struct Cli {
    /// Path expression selecting the subtrees to compare.
    #[arg(short = 'q', long = "query")]
    query: Option<String>,

    /// Print the fingerprints behind the verdict as JSON.
    #[arg(long = "report", action = ArgAction::SetTrue)]
    report: bool,

    /// Print each subtree of FILE1 that the query selects.
    #[arg(
        long = "select",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["render", "fingerprint", "report"]
    )]
    select: bool,

    /// Print FILE1 formatted in its own syntax.
    #[arg(
        long = "render",
        action = ArgAction::SetTrue,
        conflicts_with_all = ["fingerprint", "report", "query"]
    )]
    render: bool,

    /// Indent output of --select and --render.
    #[arg(long = "pretty", action = ArgAction::SetTrue)]
    pretty: bool,

    /// Print the fingerprint of FILE1, or of each subtree the query selects.
    #[arg(long = "fingerprint", action = ArgAction::SetTrue, conflicts_with = "report")]
    fingerprint: bool,

    /// Input syntax; inferred from the file extension or content when omitted.
    #[arg(short = 'f', long = "format", value_enum)]
    format: Option<FormatArg>,

    /// Maximum nesting depth accepted while canonicalizing.
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<usize>,

    /// YAML or JSON file with comparison options.
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Log line format written to STDERR.
    #[arg(long = "log-format", value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Positional inputs (FILE1 \[FILE2]); `-` reads STDIN.
    #[arg(required = true, num_args = 1..=2)]
    inputs: Vec<OsString>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Mode {
    Compare,
    Select,
    Render,
    Fingerprint,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.select {
            Mode::Select
        } else if self.render {
            Mode::Render
        } else if self.fingerprint {
            Mode::Fingerprint
        } else {
            Mode::Compare
        }
    }
}

fn main() {
    match try_main() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            let _ = writeln!(io::stderr(), "error: {err:#}");
            std::process::exit(EXIT_ERROR);
        }
    }
}

fn try_main() -> Result<i32> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format)?;

    let options = load_options(&cli)?;
    debug!(max_depth = options.max_depth(), "resolved comparison options");

    let mode = cli.mode();
    if mode != Mode::Compare && cli.inputs.len() > 1 {
        bail!("--select, --render and --fingerprint take a single input");
    }

    match mode {
        Mode::Compare => run_compare(&cli, &options),
        Mode::Select => run_select(&cli),
        Mode::Render => run_render(&cli),
        Mode::Fingerprint => run_fingerprint(&cli, &options),
    }
}

fn init_logging(verbose: u8, format: LogFormat) -> Result<()> {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install log subscriber: {err}"))
}

fn load_options(cli: &Cli) -> Result<CompareOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let options: CompareOptions = serde_yaml::from_str(&text)
                .with_context(|| format!("invalid config in {}", path.display()))?;
            options.validate().with_context(|| format!("invalid config in {}", path.display()))?;
            options
        }
        None => CompareOptions::default(),
    };
    if let Some(depth) = cli.max_depth {
        options = options.with_max_depth(depth).context("invalid --max-depth")?;
    }
    Ok(options)
}

fn run_compare(cli: &Cli, options: &CompareOptions) -> Result<i32> {
    let first = InputSource::from_arg(&cli.inputs[0])?;
    let second = match cli.inputs.get(1) {
        Some(arg) => InputSource::from_arg(arg)?,
        None => InputSource::Stdin,
    };
    if first == InputSource::Stdin && second == InputSource::Stdin {
        bail!("only one input can be read from STDIN");
    }

    let lhs = read_input(&first)?;
    let rhs = read_input(&second)?;
    let format = resolve_format(cli, &first, &lhs);

    let query = cli.query.as_deref();
    let report = structeq_core::compare_text(&lhs, &rhs, format, query, options)
        .with_context(|| format!("failed to compare {first} with {second}"))?;
    info!(%format, equal = report.is_match(), missing = report.missing().len(), "compared");

    let mut stdout = io::stdout().lock();
    if cli.report {
        let rendered = serde_json::to_string_pretty(&report).context("failed to encode report")?;
        writeln!(stdout, "{rendered}")?;
    } else {
        writeln!(stdout, "{}", if report.is_match() { "equal" } else { "not equal" })?;
    }
    Ok(if report.is_match() { EXIT_EQUAL } else { EXIT_NOT_EQUAL })
}

fn run_select(cli: &Cli) -> Result<i32> {
    let source = InputSource::from_arg(&cli.inputs[0])?;
    let text = read_input(&source)?;
    let format = resolve_format(cli, &source, &text);
    let parts = structeq_core::select(&text, format, cli.query.as_deref(), cli.pretty)
        .with_context(|| format!("failed to select from {source}"))?;
    debug!(selected = parts.len(), "selection finished");

    let mut stdout = io::stdout().lock();
    for part in parts {
        writeln!(stdout, "{part}")?;
    }
    Ok(EXIT_EQUAL)
}

fn run_render(cli: &Cli) -> Result<i32> {
    let source = InputSource::from_arg(&cli.inputs[0])?;
    let text = read_input(&source)?;
    let format = resolve_format(cli, &source, &text);
    let rendered = structeq_core::render_text(&text, format, cli.pretty)
        .with_context(|| format!("failed to render {source}"))?;

    let mut stdout = io::stdout().lock();
    if rendered.ends_with('\n') {
        write!(stdout, "{rendered}")?;
    } else {
        writeln!(stdout, "{rendered}")?;
    }
    Ok(EXIT_EQUAL)
}

fn run_fingerprint(cli: &Cli, options: &CompareOptions) -> Result<i32> {
    let source = InputSource::from_arg(&cli.inputs[0])?;
    let text = read_input(&source)?;
    let format = resolve_format(cli, &source, &text);
    let digests = structeq_core::fingerprints(&text, format, cli.query.as_deref(), options)
        .with_context(|| format!("failed to fingerprint {source}"))?;

    let mut stdout = io::stdout().lock();
    for digest in digests {
        writeln!(stdout, "{digest}")?;
    }
    Ok(EXIT_EQUAL)
}

fn resolve_format(cli: &Cli, source: &InputSource, text: &str) -> Format {
    let format = match cli.format {
        Some(format) => format.into(),
        None => Format::detect(source.path(), text),
    };
    debug!(%format, explicit = cli.format.is_some(), "input format");
    format
}

#[derive(Debug, Eq, PartialEq)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    fn from_arg(input: &OsString) -> Result<Self> {
        if input == "-" {
            return Ok(Self::Stdin);
        }
        let path = PathBuf::from(input);
        if path.as_os_str().is_empty() {
            bail!("expected file path; got empty string");
        }
        Ok(Self::File(path))
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::File(path) => Some(path),
            Self::Stdin => None,
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Stdin => f.write_str("STDIN"),
        }
    }
}

fn read_input(source: &InputSource) -> Result<String> {
    match source {
        InputSource::File(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
        }
        InputSource::Stdin => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer).context("failed to read STDIN")?;
            Ok(buffer)
        }
    }
}
