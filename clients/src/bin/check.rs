//! `allotax-check` — Runs a comparison and re-verifies the pipeline
//! invariants on its outputs.
//!
//! Checks union completeness, rank and probability consistency, the
//! normalization, grid completeness, the reorder permutation, the shift and
//! balance views, and reference/accelerated backend agreement.
//!
//! **Usage:**
//! ```text
//! allotax-check <SYS1> <SYS2> [--alpha <A>] [--verbose]
//! ```
//!
//! Exits non-zero if any check fails.

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use allotax::conformance::{check, check_backend_equivalence, Severity};
use allotax::{
    AcceleratedHandle, Allotaxonograph, Alpha, ComparisonConfig, DivergenceEngine, ParallelBackend,
};
use allotax_clients::{init_tracing, load_system};
use anyhow::Result;
use clap::Parser;

/// Check the comparison pipeline on two systems.
#[derive(Parser)]
#[command(
    name = "allotax-check",
    about = "Verify the rank-turbulence pipeline invariants on two systems"
)]
struct Args {
    /// JSON array of records for system 1.
    sys1: PathBuf,

    /// JSON array of records for system 2.
    sys2: PathBuf,

    /// Divergence exponent: a non-negative number or `infinity`.
    #[arg(long, default_value_t = Alpha::STANDARD)]
    alpha: Alpha,

    /// Log pipeline progress to stderr.
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let sys1 = load_system(&args.sys1)?;
    let sys2 = load_system(&args.sys2)?;

    // Build the pool up front so the equivalence check is not skipped.
    let backend = ParallelBackend::new(AcceleratedHandle::ready()?);
    let engine = DivergenceEngine::with_backend(Arc::new(backend));
    let config = ComparisonConfig::default().with_alpha(args.alpha);
    let comparison = Allotaxonograph::with_engine(engine.clone(), config).compare(&sys1, &sys2)?;

    let mut report = check(&sys1, &sys2, &comparison);
    report.push(check_backend_equivalence(
        &engine,
        &comparison.combined,
        args.alpha,
    ));

    println!("allotax Pipeline Check (alpha = {})", args.alpha);
    println!("==========================================");
    println!();

    for result in &report.results {
        println!(
            "[{}] {} — {}",
            result.severity.tag(),
            result.validator,
            result.message
        );
        for detail in &result.details {
            println!("       {}", detail);
        }
    }

    let passed = report.count(Severity::Pass);
    let warned = report.count(Severity::Warning);
    let failed = report.failure_count();

    println!();
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        passed, warned, failed
    );

    if failed > 0 {
        eprintln!("Check FAILED: {} check(s) did not pass.", failed);
        process::exit(1);
    }

    println!("Check PASSED.");
    Ok(())
}
