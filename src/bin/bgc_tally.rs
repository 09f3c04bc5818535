use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use bgc_tally::annotation::GeneclustersJsReader;
use bgc_tally::app::{AggregateOptions, AggregateResult, App, ProgressSink, StructuresResult};
use bgc_tally::config::{ConfigLoader, ResolvedConfig};
use bgc_tally::domain::UnknownEntityPolicy;
use bgc_tally::error::TallyError;
use bgc_tally::output::{JsonOutput, LogProgress, OutputMode};

#[derive(Parser)]
#[command(name = "bgc-tally")]
#[command(about = "Tabulate antiSMASH gene-cluster annotations across genome assemblies")]
#[command(version, author)]
struct Cli {
    /// Print the run summary as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to bgc-tally.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Aggregate per-cluster features of a batch directory into a TSV table")]
    Aggregate(AggregateArgs),
    #[command(about = "Extract predicted chemical structures from GenBank files into a CSV table")]
    Structures(StructuresArgs),
}

#[derive(Args)]
struct AggregateArgs {
    /// Batch directory whose top-level entries are genus-prefixed assemblies
    input_root: Option<Utf8PathBuf>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,

    /// Amino acid name registry read at start and rewritten at the end
    #[arg(long)]
    registry: Option<Utf8PathBuf>,

    #[arg(long)]
    separator: Option<String>,

    /// File that marks a directory as one assembly's antiSMASH output
    #[arg(long)]
    marker: Option<String>,

    #[arg(long)]
    buffer_capacity: Option<usize>,

    #[arg(long, value_enum)]
    unknown_entity_policy: Option<UnknownEntityPolicy>,
}

#[derive(Args)]
struct StructuresArgs {
    /// Directory holding antiSMASH .gbk files
    input_dir: Option<Utf8PathBuf>,

    #[arg(long)]
    output: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<TallyError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TallyError) -> u8 {
    match error {
        TallyError::MissingRoot(_) | TallyError::MissingInput => 2,
        TallyError::ConfigRead(_) | TallyError::ConfigParse(_) => 2,
        TallyError::ColumnMismatch { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Aggregate(args) => run_aggregate(args, config, output_mode),
        Commands::Structures(args) => run_structures(args, config, output_mode),
    }
}

fn progress_for(output_mode: OutputMode) -> Box<dyn ProgressSink> {
    match output_mode {
        OutputMode::Human => Box::new(LogProgress),
        OutputMode::Json => Box::new(JsonOutput),
    }
}

fn run_aggregate(
    args: AggregateArgs,
    mut config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    if let Some(input_root) = args.input_root {
        config.input_root = Some(input_root);
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if let Some(registry) = args.registry {
        config.registry = registry;
    }
    if let Some(separator) = args.separator {
        config.separator = separator;
    }
    if let Some(marker) = args.marker {
        config.marker = marker;
    }
    if let Some(capacity) = args.buffer_capacity {
        config.buffer_capacity = capacity.max(1);
    }
    if let Some(policy) = args.unknown_entity_policy {
        config.unknown_entity_policy = policy;
    }

    let options = AggregateOptions::from_config(&config)?;
    let app = App::new(GeneclustersJsReader::new(config.marker.clone()));
    let progress = progress_for(output_mode);
    let result = app.aggregate(&options, progress.as_ref())?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_aggregate(&result).into_diagnostic(),
        OutputMode::Human => {
            print_aggregate_summary(&result);
            Ok(())
        }
    }
}

fn run_structures(
    args: StructuresArgs,
    config: ResolvedConfig,
    output_mode: OutputMode,
) -> miette::Result<()> {
    let input_dir = args
        .input_dir
        .or(config.structures_input)
        .ok_or(TallyError::MissingInput)?;
    let output = args.output.unwrap_or(config.structures_output);

    let app = App::new(GeneclustersJsReader::new(config.marker));
    let progress = progress_for(output_mode);
    let result = app.extract_structures(&input_dir, &output, progress.as_ref())?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_structures(&result).into_diagnostic(),
        OutputMode::Human => {
            print_structures_summary(&result);
            Ok(())
        }
    }
}

fn print_aggregate_summary(result: &AggregateResult) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!("{cyan}bgc-tally summary{reset}");
    println!(
        "{green}rows written: {} ({} columns) -> {}{reset}",
        result.rows_written, result.columns, result.output
    );
    for genus in &result.genera {
        println!(
            "{green}  {}: {} clusters from {} directories{reset}",
            genus.name, genus.clusters, genus.directories
        );
    }
    let stats = &result.discovery;
    let skipped = stats.sources_skipped
        + stats.directories_skipped
        + stats.clusters_skipped
        + stats.dropped_calls
        + stats.dropped_smcogs;
    if skipped > 0 {
        println!(
            "{yellow}skipped sources: {}, skipped directories: {}, skipped clusters: {}, \
             dropped calls: {}, dropped smCOGs: {}{reset}",
            stats.sources_skipped,
            stats.directories_skipped,
            stats.clusters_skipped,
            stats.dropped_calls,
            stats.dropped_smcogs
        );
    }
    println!(
        "{cyan}registry {}: {} l / {} d names observed{reset}",
        result.registry, result.observed_l, result.observed_d
    );
}

fn print_structures_summary(result: &StructuresResult) {
    println!(
        "Data saved to {} ({} rows from {} files)",
        result.output, result.rows_written, result.files_read
    );
    for skipped in &result.files_skipped {
        println!("skipped {skipped}");
    }
}
