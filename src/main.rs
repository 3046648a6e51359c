use clap::{Parser, Subcommand};
use rsjoin::emit::{Emitter, WriterEmitter};
use rsjoin::join::JoinMode;
use rsjoin::pipeline::{run_pipeline, JoinConfig};
use rsjoin::tagger::{mapper_line, tag_line, TaggerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// Reduce-side equi-join over column-count-tagged CSV tables
#[derive(Parser)]
#[command(name = "rsjoin")]
#[command(about = "Reduce-side equi-join engine for mixed CSV tables", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag records by table shape and emit mapper lines without joining
    Map {
        /// Input file (reads stdin when omitted)
        input: Option<PathBuf>,

        /// Column count that marks a right-table record
        #[arg(long, default_value_t = 10)]
        right_table_width: usize,
    },
    /// Run the full partition, group, and join pipeline
    Run {
        /// Input file (reads stdin when omitted)
        input: Option<PathBuf>,

        /// Number of buckets records are hashed into
        #[arg(short, long, default_value_t = 8)]
        partitions: usize,

        /// Join mode for key groups with an empty side
        #[arg(short, long, value_enum, default_value_t = JoinMode::Inner)]
        mode: JoinMode,

        /// Column count that marks a right-table record
        #[arg(long, default_value_t = 10)]
        right_table_width: usize,

        /// Field count of left-table records, when known up front
        #[arg(long)]
        left_table_width: Option<usize>,

        /// Maximum buckets processed concurrently
        #[arg(long, default_value_t = 4)]
        max_parallel: usize,

        /// Deadline in seconds for a single emit call
        #[arg(long, default_value_t = 30)]
        emit_timeout_secs: u64,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Exit non-zero when any record was skipped
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr) // keep stdout clean for record output
        .with_target(cli.verbose >= 2)
        .init();

    debug!("rsjoin started with verbosity level: {}", cli.verbose);

    let result = match cli.command {
        Commands::Map {
            input,
            right_table_width,
        } => run_map(input, right_table_width).await,
        Commands::Run {
            input,
            partitions,
            mode,
            right_table_width,
            left_table_width,
            max_parallel,
            emit_timeout_secs,
            json,
            strict,
        } => {
            let config = JoinConfig {
                partitions,
                mode,
                tagger: TaggerConfig { right_table_width },
                left_table_width,
                max_parallel,
                emit_timeout: Duration::from_secs(emit_timeout_secs),
            };
            run_join(input, config, json, strict).await
        }
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("Fatal error: {}", e);
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn reader_for(input: Option<PathBuf>) -> anyhow::Result<Box<dyn AsyncBufRead + Unpin + Send>> {
    match input {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await?;
            Ok(Box::new(tokio::io::BufReader::new(file)))
        }
        None => Ok(Box::new(tokio::io::BufReader::new(tokio::io::stdin()))),
    }
}

/// Streaming-mapper mode: one tagged line out per classifiable line in.
/// Unclassifiable records are skipped and logged, and their presence turns
/// the exit code non-zero.
async fn run_map(input: Option<PathBuf>, right_table_width: usize) -> anyhow::Result<i32> {
    let config = TaggerConfig { right_table_width };
    config.validate()?;
    let reader = reader_for(input).await?;
    let mut stdout = tokio::io::stdout();

    let mut lines = reader.lines();
    let mut line_no = 0usize;
    let mut tagged = 0usize;
    let mut skipped = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match tag_line(&line, line_no, &config) {
            Ok(record) => {
                stdout.write_all(mapper_line(&record).as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                tagged += 1;
            }
            Err(e) => {
                warn!("skipping record: {}", e);
                skipped += 1;
            }
        }
    }
    stdout.flush().await?;

    eprintln!("{} records tagged, {} skipped", tagged, skipped);
    Ok(if skipped > 0 { 1 } else { 0 })
}

async fn run_join(
    input: Option<PathBuf>,
    config: JoinConfig,
    json: bool,
    strict: bool,
) -> anyhow::Result<i32> {
    let reader = reader_for(input).await?;
    let emitter: Arc<Mutex<dyn Emitter>> =
        Arc::new(Mutex::new(WriterEmitter::new(tokio::io::stdout())));

    let summary = run_pipeline(reader, &config, emitter).await?;

    if json {
        eprintln!("{}", serde_json::to_string(&summary)?);
    } else {
        eprintln!(
            "{} tuples emitted, {} records skipped ({} records in, {} key groups)",
            summary.emitted, summary.skipped, summary.records_in, summary.groups
        );
    }

    Ok(if strict && summary.skipped > 0 { 1 } else { 0 })
}
