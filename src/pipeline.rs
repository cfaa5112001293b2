use crate::columns::ColumnIndex;
use crate::config::{RunConfig, SemanticColumn};
use crate::io::csv::{create_step_writer, write_step_row};
use crate::io::mif;
use crate::record::RecordParser;
use crate::source::{SourceError, TimestepSource};
use crate::state::MaximaTracker;
use csv::StringRecord;
use indicatif::ProgressBar;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that end the whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("failed to prepare scratch directory {path:?}: {source}")]
    Prepare {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to clear scratch directory {path:?}: {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write step table {path:?}: {source}")]
    StepTable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why a timestep contributed nothing.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Export(SourceError),
    #[error("no export file was produced")]
    NoExport,
    #[error("no data file next to {0:?}")]
    NoCompanion(PathBuf),
    #[error("could not read {path:?}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

#[derive(Debug, Default)]
pub struct StepStats {
    pub rows: usize,
    pub skipped_rows: usize,
    pub unresolved: Vec<String>,
}

#[derive(Debug)]
pub enum StepOutcome {
    Processed(StepStats),
    Skipped(SkipReason),
}

/// Totals reported once the run finishes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub steps_processed: usize,
    pub steps_skipped: usize,
    pub steps_with_missing_columns: usize,
    pub rows_processed: usize,
    pub rows_skipped: usize,
    pub elements: usize,
}

/// Columns seen at the representative timestep of a check run.
#[derive(Debug)]
pub struct ColumnReport {
    pub step: usize,
    pub columns: Option<ColumnIndex>,
    pub depth: Option<String>,
    pub speed: Option<String>,
}

#[derive(Debug)]
pub enum RunOutcome {
    Columns(ColumnReport),
    Completed {
        tracker: MaximaTracker,
        summary: RunSummary,
    },
}

fn resolve_position(
    columns: &ColumnIndex,
    column: &SemanticColumn,
    step: usize,
    unresolved: &mut Vec<String>,
) -> Option<usize> {
    match columns.resolve(column) {
        Ok(resolved) => {
            debug!(
                step,
                field = %column.semantic,
                column = resolved.name,
                position = resolved.position,
                "column resolved"
            );
            Some(resolved.position)
        }
        Err(e) => {
            debug!(step, error = %e, "column unresolved, reading as 0.0");
            unresolved.push(column.semantic.clone());
            None
        }
    }
}

// Request, parse and aggregate one timestep. Cleanup is the caller's job.
pub fn process_timestep<S: TimestepSource>(
    source: &mut S,
    config: &RunConfig,
    step: usize,
    tracker: &mut MaximaTracker,
) -> Result<StepOutcome, PipelineError> {
    let scratch = config.scratch_dir();

    // REQUEST_EXPORT
    if let Err(e) = source.materialize(step, &scratch) {
        if e.is_fatal() {
            return Err(e.into());
        }
        return Ok(StepOutcome::Skipped(SkipReason::Export(e)));
    }
    let Some(header_path) = mif::find_header_file(&scratch) else {
        return Ok(StepOutcome::Skipped(SkipReason::NoExport));
    };

    // PARSE_HEADER
    let columns = match mif::read_header(&header_path) {
        Ok(columns) => columns,
        Err(e) => {
            return Ok(StepOutcome::Skipped(SkipReason::Unreadable {
                path: header_path,
                message: e.to_string(),
            }));
        }
    };

    let mut stats = StepStats::default();
    let depth = resolve_position(&columns, &config.columns.depth, step, &mut stats.unresolved);
    let speed = resolve_position(&columns, &config.columns.speed, step, &mut stats.unresolved);

    // PARSE_ROWS
    let Some(data_path) = mif::find_companion(&header_path) else {
        return Ok(StepOutcome::Skipped(SkipReason::NoCompanion(header_path)));
    };
    let mut rdr = match mif::open_data(&data_path) {
        Ok(rdr) => rdr,
        Err(e) => {
            return Ok(StepOutcome::Skipped(SkipReason::Unreadable {
                path: data_path,
                message: e.to_string(),
            }));
        }
    };

    let step_path = config.step_table_path(step);
    let table_error = |source| PipelineError::StepTable {
        path: step_path.clone(),
        source,
    };
    let mut step_writer = if config.emit_per_step_tables {
        Some(create_step_writer(&step_path).map_err(table_error)?)
    } else {
        None
    };

    let parser = RecordParser::new(depth, speed);
    for result in rdr.byte_records() {
        let record = match result {
            Ok(record) => StringRecord::from_byte_record_lossy(record),
            Err(e) => {
                debug!(step, error = %e, "unreadable row");
                stats.skipped_rows += 1;
                continue;
            }
        };
        let Some(element) = parser.parse(&record) else {
            stats.skipped_rows += 1;
            continue;
        };
        let metric = element.metric(config.multiplier);

        if let Some(wtr) = step_writer.as_mut() {
            write_step_row(wtr, &element, metric).map_err(table_error)?;
        }

        // UPDATE_MAXIMA
        tracker.update(&element.id, element.depth, element.speed, metric, step);
        stats.rows += 1;
    }

    if let Some(mut wtr) = step_writer {
        wtr.flush()
            .map_err(|e| table_error(csv::Error::from(e)))?;
    }

    Ok(StepOutcome::Processed(stats))
}

fn clear_scratch(config: &RunConfig) -> Result<(), PipelineError> {
    let path = config.scratch_dir();
    mif::clear_scratch(&path).map_err(|source| PipelineError::Cleanup { path, source })
}

fn check_columns<S: TimestepSource>(
    source: &mut S,
    config: &RunConfig,
) -> Result<ColumnReport, PipelineError> {
    let step = config.start_index;
    let scratch = config.scratch_dir();
    let mut report = ColumnReport {
        step,
        columns: None,
        depth: None,
        speed: None,
    };

    let materialized = source.materialize(step, &scratch);
    let header = match materialized {
        Err(e) if e.is_fatal() => {
            clear_scratch(config)?;
            return Err(e.into());
        }
        Err(e) => {
            warn!(step, error = %e, "export failed");
            None
        }
        Ok(()) => mif::find_header_file(&scratch),
    };

    match header.map(|path| (mif::read_header(&path), path)) {
        Some((Ok(columns), _)) => {
            report.depth = columns
                .resolve(&config.columns.depth)
                .ok()
                .map(|c| c.name.to_string());
            report.speed = columns
                .resolve(&config.columns.speed)
                .ok()
                .map(|c| c.name.to_string());
            report.columns = Some(columns);
        }
        Some((Err(e), path)) => warn!(step, path = ?path, error = %e, "header unreadable"),
        None => warn!(step, "no export file was produced"),
    }

    clear_scratch(config)?;
    Ok(report)
}

/// Runs every configured timestep through the pipeline, or only inspects
/// columns when the config asks for a check run.
pub fn run_pipeline<S: TimestepSource>(
    source: &mut S,
    config: &RunConfig,
    progress: &ProgressBar,
) -> Result<RunOutcome, PipelineError> {
    let scratch = config.scratch_dir();
    fs::create_dir_all(&scratch).map_err(|source| PipelineError::Prepare {
        path: scratch.clone(),
        source,
    })?;
    // leftovers from an earlier, interrupted run
    clear_scratch(config)?;

    if config.diagnostic_mode {
        let report = check_columns(source, config)?;
        remove_scratch(config);
        return Ok(RunOutcome::Columns(report));
    }

    let mut tracker = MaximaTracker::new();
    let mut summary = RunSummary::default();

    for step in config.start_index..=config.end_index {
        if step % 10 == 0 || step == config.start_index {
            progress.suspend(|| info!(step, end = config.end_index, "processing timestep"));
        }

        let outcome = process_timestep(source, config, step, &mut tracker);
        // CLEANUP runs before any error is surfaced
        clear_scratch(config)?;

        match outcome? {
            StepOutcome::Processed(stats) => {
                summary.steps_processed += 1;
                summary.rows_processed += stats.rows;
                summary.rows_skipped += stats.skipped_rows;
                if !stats.unresolved.is_empty() {
                    summary.steps_with_missing_columns += 1;
                    let fields = stats.unresolved.join(", ");
                    if summary.steps_with_missing_columns == 1 {
                        progress.suspend(|| {
                            warn!(step, fields = %fields, "columns not found, values read as 0.0")
                        });
                    } else {
                        debug!(step, fields = %fields, "columns not found, values read as 0.0");
                    }
                }
            }
            StepOutcome::Skipped(reason) => {
                summary.steps_skipped += 1;
                progress.suspend(|| warn!(step, reason = %reason, "skipping timestep"));
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();
    remove_scratch(config);

    summary.elements = tracker.len();
    Ok(RunOutcome::Completed { tracker, summary })
}

fn remove_scratch(config: &RunConfig) {
    let scratch = config.scratch_dir();
    if let Err(e) = fs::remove_dir(&scratch) {
        debug!(path = ?scratch, error = %e, "scratch directory left in place");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunOptions;
    use std::path::Path;
    use tempfile::tempdir;

    // Serves canned exports from memory
    struct FakeSource {
        exports: Vec<Option<(&'static str, &'static str)>>,
        requested: Vec<usize>,
    }

    impl TimestepSource for FakeSource {
        fn timestep_count(&self) -> usize {
            self.exports.len()
        }

        fn materialize(&mut self, step: usize, scratch: &Path) -> Result<(), SourceError> {
            self.requested.push(step);
            if let Some(Some((header, data))) = self.exports.get(step) {
                fs::write(scratch.join("mesh.mif"), header).unwrap();
                fs::write(scratch.join("mesh.mid"), data).unwrap();
            }
            Ok(())
        }
    }

    const HEADER: &str = "Columns 4\n\"ID\" Char(8)\n\"Element\" Char(8)\n\"depth2d\" Float\n\"speed2d\" Float\nData\n";

    fn config_for(output: &Path, count: usize) -> RunConfig {
        RunOptions {
            output: Some(output.to_path_buf()),
            ..Default::default()
        }
        .into_config(count)
        .unwrap()
    }

    #[test]
    fn steps_are_requested_in_order_once() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource {
            exports: vec![Some((HEADER, "1,A,1,1\n")); 5],
            requested: Vec::new(),
        };
        let config = config_for(dir.path(), 5);
        run_pipeline(&mut source, &config, &ProgressBar::hidden()).unwrap();
        assert_eq!(source.requested, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn short_rows_are_counted_not_fatal() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource {
            exports: vec![Some((HEADER, "1,A,2,3\n2,B\n3,C,1,1\n"))],
            requested: Vec::new(),
        };
        let config = config_for(dir.path(), 1);
        let RunOutcome::Completed { tracker, summary } =
            run_pipeline(&mut source, &config, &ProgressBar::hidden()).unwrap()
        else {
            panic!("expected a completed run");
        };
        assert_eq!(tracker.len(), 2);
        assert_eq!(summary.rows_processed, 2);
        assert_eq!(summary.rows_skipped, 1);
    }

    #[test]
    fn process_timestep_leaves_cleanup_to_caller() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource {
            exports: vec![Some((HEADER, "1,A,2,3\n"))],
            requested: Vec::new(),
        };
        let config = config_for(dir.path(), 1);
        fs::create_dir_all(config.scratch_dir()).unwrap();

        let mut tracker = MaximaTracker::new();
        let outcome = process_timestep(&mut source, &config, 0, &mut tracker).unwrap();
        assert!(matches!(outcome, StepOutcome::Processed(ref s) if s.rows == 1));
        assert!(config.scratch_dir().join("mesh.mid").exists());
    }

    #[test]
    fn stale_export_is_not_reused() {
        let dir = tempdir().unwrap();
        let mut source = FakeSource {
            exports: vec![Some((HEADER, "1,A,2,3\n")), None],
            requested: Vec::new(),
        };
        let config = config_for(dir.path(), 2);
        let RunOutcome::Completed { tracker, summary } =
            run_pipeline(&mut source, &config, &ProgressBar::hidden()).unwrap()
        else {
            panic!("expected a completed run");
        };
        assert_eq!(summary.steps_skipped, 1);
        assert_eq!(tracker.get("A").unwrap().step_depth, 0);
        assert!(!config.scratch_dir().exists());
    }
}
