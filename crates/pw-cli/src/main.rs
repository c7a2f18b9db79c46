//! pdfrw: PDF reweighting CLI

use anyhow::Result;
use clap::{Parser, Subcommand};
use pw_core::DensitySource;
use pw_reweight::{KNOWN_SETS, REFERENCE_SET};
use std::path::PathBuf;

mod config;
mod events;
mod run;

#[derive(Parser)]
#[command(name = "pdfrw")]
#[command(about = "pdfrw - PDF reweighting and uncertainty envelopes")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reweight an event file and write nominal, per-set bands and PDF envelope per observable
    Run {
        /// Run configuration (YAML or JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Event file (CSV with x1, x2, scale, id1, id2 and observable columns)
        #[arg(short, long)]
        events: PathBuf,

        /// Output file for results (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto). Overrides the config. Use 1 for deterministic parity.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// Derive per-member normalization factors from an event file
    NormFactors {
        /// Run configuration (YAML or JSON); `observables` and `normalization` are ignored
        #[arg(short, long)]
        config: PathBuf,

        /// Event file (CSV)
        #[arg(short, long)]
        events: PathBuf,

        /// Dataset id written into the tables
        #[arg(long)]
        dataset: u32,

        /// Directory receiving one `<set>.txt` table per PDF set
        #[arg(long)]
        out_dir: PathBuf,

        /// Output file for the summary (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Threads (0 = auto). Overrides the config.
        #[arg(long)]
        threads: Option<usize>,
    },

    /// List supported PDF sets and, if a data path is available, their members
    Sets {
        /// LHAPDF data directory (repeatable). Defaults to LHAPDF_DATA_PATH.
        #[arg(long)]
        pdf_path: Vec<PathBuf>,

        /// Output file (pretty JSON). Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print version
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout carries the JSON results
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { config, events, output, threads } => {
            cmd_run(&config, &events, output.as_ref(), threads)
        }
        Commands::NormFactors { config, events, dataset, out_dir, output, threads } => {
            cmd_norm_factors(&config, &events, dataset, &out_dir, output.as_ref(), threads)
        }
        Commands::Sets { pdf_path, output } => cmd_sets(&pdf_path, output.as_ref()),
        Commands::Version => {
            println!("pdfrw {}", pw_core::VERSION);
            Ok(())
        }
    }
}

fn setup_threads(threads: usize) {
    if threads > 1 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn cmd_run(
    config: &PathBuf,
    events: &PathBuf,
    output: Option<&PathBuf>,
    threads: Option<usize>,
) -> Result<()> {
    let cfg = config::read_run_config(config)?;
    let threads = threads.unwrap_or(cfg.threads);
    setup_threads(threads);
    tracing::info!(config = %config.display(), sets = cfg.sets.len(), threads, "run");
    let value = run::run(&cfg, events, threads)?;
    write_json(output, value)
}

fn cmd_norm_factors(
    config: &PathBuf,
    events: &PathBuf,
    dataset: u32,
    out_dir: &PathBuf,
    output: Option<&PathBuf>,
    threads: Option<usize>,
) -> Result<()> {
    let cfg = config::read_run_config(config)?;
    let threads = threads.unwrap_or(cfg.threads);
    setup_threads(threads);
    let value = run::norm_factors(&cfg, events, dataset, out_dir, threads)?;
    write_json(output, value)
}

fn cmd_sets(pdf_path: &[PathBuf], output: Option<&PathBuf>) -> Result<()> {
    let source = match run::open_source(pdf_path) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!("{e:#}; listing the model table only");
            None
        }
    };
    let sets: Vec<serde_json::Value> = KNOWN_SETS
        .iter()
        .map(|(name, family)| {
            let mut entry = serde_json::json!({
                "name": name,
                "family": family,
                "reference": *name == REFERENCE_SET,
            });
            if let Some(src) = &source {
                match (src.member_count(name), src.description(name)) {
                    (Ok(members), Ok(description)) => {
                        entry["members"] = members.into();
                        entry["description"] = description.into();
                    }
                    (Err(e), _) | (_, Err(e)) => entry["error"] = e.to_string().into(),
                }
            }
            entry
        })
        .collect();
    write_json(output, serde_json::json!({ "sets": sets }))
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
