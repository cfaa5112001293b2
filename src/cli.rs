use crate::config::{FileConfig, RunOptions};
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Track per-element maxima of depth, speed and depth x speed across 2D mesh exports
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Directory holding one numbered subdirectory of export files per timestep
    pub source_dir: PathBuf,

    /// Folder for the summary table, step tables and scratch files
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// First timestep to process
    #[arg(long)]
    pub start: Option<usize>,

    /// Last timestep to process (inclusive)
    #[arg(long)]
    pub end: Option<usize>,

    /// Factor applied to depth x speed
    #[arg(short, long)]
    pub multiplier: Option<f64>,

    /// Only list the columns found at one timestep, then exit
    #[arg(long)]
    pub check_columns: bool,

    /// Timestep inspected by --check-columns
    #[arg(long)]
    pub check_step: Option<usize>,

    /// Keep a Step_<n>.csv table for every timestep
    #[arg(long)]
    pub keep_step_csvs: bool,

    /// TOML file with run options; command-line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (or set MESH_HAZARD_LOG)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn into_options(self) -> Result<(PathBuf, RunOptions)> {
        let options = RunOptions {
            output: self.output,
            start_index: self.start,
            end_index: self.end,
            multiplier: self.multiplier,
            check_columns: self.check_columns,
            check_step: self.check_step,
            keep_step_csvs: self.keep_step_csvs,
        };
        let options = match &self.config {
            Some(path) => options.merge(FileConfig::load(path)?),
            None => options,
        };
        Ok((self.source_dir, options))
    }
}

// source dir, run options, verbose
pub fn get_args() -> Result<(PathBuf, RunOptions, bool)> {
    let args = Args::parse();
    let verbose = args.verbose;
    let (source_dir, options) = args.into_options()?;
    Ok((source_dir, options, verbose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn flags_map_onto_options() {
        let args = Args::try_parse_from([
            "mesh-hazard",
            "exports",
            "--output",
            "out",
            "--start",
            "2",
            "--end",
            "9",
            "-m",
            "1.5",
            "--keep-step-csvs",
        ])
        .unwrap();
        let (source_dir, options) = args.into_options().unwrap();
        assert_eq!(source_dir, PathBuf::from("exports"));
        assert_eq!(options.start_index, Some(2));
        assert_eq!(options.end_index, Some(9));
        assert_eq!(options.multiplier, Some(1.5));
        assert!(options.keep_step_csvs);
        assert!(!options.check_columns);
    }

    #[test]
    fn config_file_fills_missing_flags() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(&path, "multiplier = 3.0\nend_index = 4\n").unwrap();

        let args = Args::try_parse_from([
            "mesh-hazard",
            "exports",
            "--end",
            "6",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        let (_, options) = args.into_options().unwrap();
        assert_eq!(options.multiplier, Some(3.0));
        assert_eq!(options.end_index, Some(6));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args =
            Args::try_parse_from(["mesh-hazard", "exports", "--config", "/no/such/run.toml"])
                .unwrap();
        assert!(args.into_options().is_err());
    }
}
