use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use tracing_subscriber::EnvFilter;

use mesh_hazard::cli::get_args;
use mesh_hazard::io::csv::write_summary;
use mesh_hazard::pipeline::ColumnReport;
use mesh_hazard::{DirectorySource, RunOutcome, TimestepSource, run_pipeline};

fn init_tracing(verbose: bool) {
    let env = std::env::var("MESH_HAZARD_LOG").unwrap_or_else(|_| {
        if verbose {
            "mesh_hazard=debug".to_string()
        } else {
            "mesh_hazard=info".to_string()
        }
    });
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

fn print_columns(report: &ColumnReport) {
    println!("\n=== AVAILABLE COLUMNS (step {}) ===", report.step);
    match &report.columns {
        Some(columns) => {
            for (i, name) in columns.names() {
                println!("  Index {}: {}", i, name);
            }
            println!("  depth -> {}", report.depth.as_deref().unwrap_or("(not found)"));
            println!("  speed -> {}", report.speed.as_deref().unwrap_or("(not found)"));
        }
        None => println!("  No export was produced for this timestep"),
    }
    println!("====================================");
}

fn main() -> Result<()> {
    let (source_dir, options, verbose) = get_args()?;
    init_tracing(verbose);

    let mut source = DirectorySource::open(&source_dir)
        .with_context(|| format!("Failed to open exports: {:?}", source_dir))?;
    info!(timesteps = source.timestep_count(), "found simulation");

    let config = options.into_config(source.timestep_count())?;
    std::fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create output folder: {:?}", config.output_dir))?;

    let pb = if config.diagnostic_mode {
        ProgressBar::hidden()
    } else {
        println!(
            "Processing timesteps {} to {} (multiplier {})",
            config.start_index, config.end_index, config.multiplier
        );
        let pb = ProgressBar::new(config.timestep_count() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} steps ({eta})")?
                .progress_chars("#>-"),
        );
        pb
    };

    match run_pipeline(&mut source, &config, &pb)? {
        RunOutcome::Columns(report) => print_columns(&report),
        RunOutcome::Completed { tracker, summary } => {
            let path = config.summary_path();
            write_summary(&path, &tracker)?;

            println!(
                "\nProcessed {} timesteps ({} skipped), {} elements",
                summary.steps_processed, summary.steps_skipped, summary.elements
            );
            if summary.steps_with_missing_columns > 0 {
                println!(
                    "WARNING: {} timesteps were missing a depth or speed column; those values were read as 0.0",
                    summary.steps_with_missing_columns
                );
            }
            println!("Summary saved to {}", path.display());
        }
    }

    Ok(())
}
