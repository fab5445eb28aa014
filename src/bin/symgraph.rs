//! symgraph CLI binary entry point.

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use symgraph::cli::{run_dump, write_output, DumpOptions};
use symgraph::collector::{CollectorOptions, ExtensionGraphAssociation};
use symgraph::error::{CliError, ExitCodeKind};
use symgraph::mixin::MixinRegistry;

/// Merge symbol graph files into one unified graph per module.
#[derive(Parser, Debug)]
#[command(name = "symgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Symbol graph files to merge.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Additional symbol graph file (repeatable).
    #[arg(long = "symbol-graph", value_name = "FILE")]
    symbol_graphs: Vec<PathBuf>,

    /// Directory to scan recursively for `*.symbols.json` files (repeatable).
    #[arg(long = "symbol-graph-dir", value_name = "DIR")]
    symbol_graph_dirs: Vec<PathBuf>,

    /// Module to emit. Required when the inputs contain several modules.
    #[arg(long)]
    module_name: Option<String>,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pretty: bool,

    /// Output file (default: stdout).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Module an `A@B.symbols.json` extension graph is filed under.
    #[arg(long, value_enum, default_value = "extended")]
    extension_association: Association,

    /// Do not compute overload groups.
    #[arg(long)]
    no_overload_groups: bool,

    /// Log level for tracing output.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Association {
    /// File under the extended module (`B`).
    Extended,
    /// File under the declaring module (`A`).
    Extending,
}

impl From<Association> for ExtensionGraphAssociation {
    fn from(value: Association) -> Self {
        match value {
            Association::Extended => ExtensionGraphAssociation::ExtendedGraph,
            Association::Extending => ExtensionGraphAssociation::ExtendingGraph,
        }
    }
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level, cli.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(ExitCodeKind::from(&err).code())
        }
    }
}

fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn execute(cli: Cli) -> Result<(), CliError> {
    let options = dump_options(&cli);
    let registry = MixinRegistry::new();
    let text = run_dump(&options, &registry)?;
    write_output(&text, cli.output.as_deref())
}

fn dump_options(cli: &Cli) -> DumpOptions {
    let mut files = cli.files.clone();
    files.extend(cli.symbol_graphs.iter().cloned());
    DumpOptions {
        files,
        directories: cli.symbol_graph_dirs.clone(),
        module_name: cli.module_name.clone(),
        pretty: cli.pretty,
        collector: CollectorOptions::default()
            .with_association(cli.extension_association.into())
            .with_overload_groups(!cli.no_overload_groups),
    }
}
