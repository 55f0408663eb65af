//! usnjrnl - decode an extracted `$UsnJrnl:$J` stream into CSV / TSV rows.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use log::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use usnjrnl_rs::output::{OutputFormat, TabularWriter};
use usnjrnl_rs::preprocess::{find_data_start, write_working_copy};
use usnjrnl_rs::{JournalScanner, ScanOptions};

/// Parse the entries of an extracted NTFS $UsnJrnl:$J stream
#[derive(Parser, Debug)]
#[command(name = "usnjrnl")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("sink").required(true).multiple(true).args(["csv", "tsv", "stdout"])))]
struct Cli {
    /// Input file name
    #[arg(short = 'f', long)]
    infile: PathBuf,

    /// Output file name (no extension); defaults to the input file name
    #[arg(short = 'o', long)]
    outfile: Option<PathBuf>,

    /// Create a comma-separated values output file
    #[arg(short = 'c', long)]
    csv: bool,

    /// Create a tab-separated values output file
    #[arg(short = 't', long)]
    tsv: bool,

    /// Write to stdout
    #[arg(short = 's', long = "std")]
    stdout: bool,

    /// Offset of the first record; detected from the leading zero run if omitted
    #[arg(long)]
    start_offset: Option<u64>,

    /// Write the input, minus its leading zero run, to this path and parse the copy
    #[arg(long)]
    working_copy: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();

    run(&cli)
}

fn run(cli: &Cli) -> Result<()> {
    let source = match &cli.working_copy {
        Some(copy) => {
            write_working_copy(&cli.infile, copy)
                .with_context(|| format!("Failed to create working copy {}", copy.display()))?;
            copy.clone()
        }
        None => cli.infile.clone(),
    };

    let mut reader = BufReader::new(
        File::open(&source).with_context(|| format!("Failed to open {}", source.display()))?,
    );

    let start_offset = match cli.start_offset {
        Some(offset) => offset,
        None => match find_data_start(&mut reader)
            .with_context(|| format!("Failed to read {}", source.display()))?
        {
            Some(offset) => offset,
            None => bail!("{} contains no journal data", source.display()),
        },
    };
    info!("Scanning {} from offset {}", source.display(), start_offset);

    let mut sinks = open_sinks(cli)?;
    for sink in sinks.iter_mut() {
        sink.write_header()?;
    }

    let options = ScanOptions {
        start_offset,
        ..Default::default()
    };
    let mut records = JournalScanner::with_options(reader, options).decoded();
    while let Some(result) = records.next() {
        match result {
            Ok(record) => {
                for sink in sinks.iter_mut() {
                    sink.write_record(&record)?;
                }
            }
            Err(err) if err.is_recoverable() => {
                warn!("Skipping record: {}", err);
            }
            Err(err) => {
                return Err(err).context(format!(
                    "Failed while scanning {} at offset {}",
                    source.display(),
                    records.offset()
                ));
            }
        }
    }

    for sink in sinks.iter_mut() {
        sink.flush()?;
    }

    let summary = records.summary();
    info!(
        "Finished at offset {}: {} records, {} structural errors, {} gaps ({} bytes) skipped",
        records.offset(),
        summary.records,
        summary.structural_errors,
        summary.gaps_skipped,
        summary.bytes_skipped
    );

    Ok(())
}

fn open_sinks(cli: &Cli) -> Result<Vec<TabularWriter<Box<dyn Write>>>> {
    let base = cli.outfile.clone().unwrap_or_else(|| cli.infile.clone());
    let mut sinks: Vec<TabularWriter<Box<dyn Write>>> = Vec::new();

    for (enabled, format) in [(cli.csv, OutputFormat::Csv), (cli.tsv, OutputFormat::Tsv)] {
        if !enabled {
            continue;
        }
        let mut path = base.clone().into_os_string();
        if let Some(ext) = format.extension() {
            path.push(".");
            path.push(ext);
        }
        let path = PathBuf::from(path);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let writer: Box<dyn Write> = Box::new(BufWriter::new(file));
        sinks.push(TabularWriter::new(writer, format));
    }

    if cli.stdout {
        let writer: Box<dyn Write> = Box::new(io::stdout().lock());
        sinks.push(TabularWriter::new(writer, OutputFormat::Console));
    }

    Ok(sinks)
}
