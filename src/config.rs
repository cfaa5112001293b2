use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const SUMMARY_FILE_NAME: &str = "Max_DxV_Final.csv";
pub const SCRATCH_DIR_NAME: &str = "temp_calc_loop";
pub const DEFAULT_CHECK_STEP: usize = 140;
pub const DEFAULT_MULTIPLIER: f64 = 1.0;

// How a semantic field is matched against export column names
#[derive(Debug, Clone)]
pub struct SemanticColumn {
    pub semantic: String,
    pub canonical: String,
    pub fragment: String,
}

impl SemanticColumn {
    pub fn new(semantic: &str, canonical: &str, fragment: &str) -> Self {
        SemanticColumn {
            semantic: semantic.to_string(),
            canonical: canonical.to_string(),
            fragment: fragment.to_string(),
        }
    }
}

// Configuration structure for column name mapping
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    pub depth: SemanticColumn,
    pub speed: SemanticColumn,
}

impl ColumnConfig {
    pub fn new() -> Self {
        ColumnConfig {
            depth: SemanticColumn::new("depth", "DEPTH2D", "DEPTH"),
            speed: SemanticColumn::new("speed", "SPEED2D", "SPEED"),
        }
    }
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys accepted in a TOML run file. All are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub output: Option<PathBuf>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub multiplier: Option<f64>,
    pub check_columns: Option<bool>,
    pub check_step: Option<usize>,
    pub keep_step_csvs: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&text).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

/// Run options before the timestep range is known.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub output: Option<PathBuf>,
    pub start_index: Option<usize>,
    pub end_index: Option<usize>,
    pub multiplier: Option<f64>,
    pub check_columns: bool,
    pub check_step: Option<usize>,
    pub keep_step_csvs: bool,
}

impl RunOptions {
    /// Fills every unset option from `file`.
    pub fn merge(mut self, file: FileConfig) -> Self {
        self.output = self.output.or(file.output);
        self.start_index = self.start_index.or(file.start_index);
        self.end_index = self.end_index.or(file.end_index);
        self.multiplier = self.multiplier.or(file.multiplier);
        self.check_step = self.check_step.or(file.check_step);
        self.check_columns |= file.check_columns.unwrap_or(false);
        self.keep_step_csvs |= file.keep_step_csvs.unwrap_or(false);
        self
    }

    /// Resolves defaults against the number of timesteps the source offers.
    pub fn into_config(self, timestep_count: usize) -> Result<RunConfig> {
        if timestep_count == 0 {
            bail!("Simulation reports no timesteps");
        }
        let last = timestep_count - 1;

        let multiplier = self.multiplier.unwrap_or(DEFAULT_MULTIPLIER);
        if !multiplier.is_finite() {
            bail!("Multiplier must be a finite number, got {}", multiplier);
        }

        let (start_index, end_index) = if self.check_columns {
            let step = self.check_step.unwrap_or(DEFAULT_CHECK_STEP).min(last);
            (step, step)
        } else {
            (self.start_index.unwrap_or(0), self.end_index.unwrap_or(last))
        };

        if start_index > end_index {
            bail!(
                "Start index {} is after end index {}",
                start_index,
                end_index
            );
        }
        if end_index > last {
            bail!(
                "End index {} is beyond the last timestep {}",
                end_index,
                last
            );
        }

        Ok(RunConfig {
            start_index,
            end_index,
            multiplier,
            diagnostic_mode: self.check_columns,
            emit_per_step_tables: self.keep_step_csvs,
            output_dir: self.output.unwrap_or_else(|| PathBuf::from(".")),
            columns: ColumnConfig::new(),
        })
    }
}

// Everything the pipeline needs for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub start_index: usize,
    pub end_index: usize,
    pub multiplier: f64,
    pub diagnostic_mode: bool,
    pub emit_per_step_tables: bool,
    pub output_dir: PathBuf,
    pub columns: ColumnConfig,
}

impl RunConfig {
    pub fn scratch_dir(&self) -> PathBuf {
        self.output_dir.join(SCRATCH_DIR_NAME)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.output_dir.join(SUMMARY_FILE_NAME)
    }

    pub fn step_table_path(&self, step: usize) -> PathBuf {
        self.output_dir.join(format!("Step_{}.csv", step))
    }

    pub fn timestep_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}
