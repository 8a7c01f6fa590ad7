//! `allotax-compare` — Compares two systems and writes the allotaxonograph
//! data as JSON.
//!
//! **Outputs:** the renderer export (divergence, top-N shift list, balance,
//! axis metadata), or with `--full` every pipeline output including the
//! combined systems and the diamond grid.
//!
//! **Usage:**
//! ```text
//! allotax-compare <SYS1> <SYS2> [--alpha <A> | --preset <P>] [--top-n <N>]
//!                 [--config <FILE>] [--title <T1> --title <T2>]
//!                 [--reference-only] [--output <FILE>] [--full] [--verbose]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use allotax::{Allotaxonograph, Alpha, BackendMode, Preset};
use allotax_clients::{init_tracing, load_config, load_system};
use anyhow::{Context, Result};
use clap::Parser;

/// Compare two weighted categorical distributions.
#[derive(Parser)]
#[command(
    name = "allotax-compare",
    about = "Compute rank-turbulence divergence, diamond, shift and balance data for two systems"
)]
struct Args {
    /// JSON array of records for system 1.
    sys1: PathBuf,

    /// JSON array of records for system 2.
    sys2: PathBuf,

    /// Divergence exponent: a non-negative number or `infinity`.
    #[arg(long, conflicts_with = "preset")]
    alpha: Option<Alpha>,

    /// Named exponent: standard, sensitive or robust.
    #[arg(long)]
    preset: Option<Preset>,

    /// Number of shift entries kept.
    #[arg(long)]
    top_n: Option<usize>,

    /// TOML configuration file; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Titles of system 1 and system 2 (give twice).
    #[arg(long = "title", num_args = 1, action = clap::ArgAction::Append)]
    titles: Vec<String>,

    /// Never use the accelerated backend.
    #[arg(long)]
    reference_only: bool,

    /// Output file (default: stdout).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Write every pipeline output instead of the renderer export.
    #[arg(long)]
    full: bool,

    /// Log pipeline progress to stderr.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(preset) = args.preset {
        config.alpha = preset.alpha();
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(top_n) = args.top_n {
        config.top_n = top_n;
    }
    match args.titles.as_slice() {
        [] => {}
        [t1, t2] => config.titles = [t1.clone(), t2.clone()],
        other => anyhow::bail!("--title must be given exactly twice, got {}", other.len()),
    }
    if args.reference_only {
        config.backend = BackendMode::Reference;
    }

    let sys1 = load_system(&args.sys1)?;
    let sys2 = load_system(&args.sys2)?;

    let comparison = Allotaxonograph::new(config)
        .compare(&sys1, &sys2)
        .context("Comparison failed")?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let written = if args.full {
        serde_json::to_writer_pretty(&mut out, &comparison)
    } else {
        serde_json::to_writer_pretty(&mut out, &comparison.export())
    };
    written.context("Failed to write JSON")?;
    writeln!(out)?;
    out.flush()?;

    if let Some(path) = &args.output {
        eprintln!(
            "Written: {} ({} categories, normalization {})",
            path.display(),
            comparison.combined[0].len(),
            comparison.normalization()
        );
    }
    Ok(())
}
