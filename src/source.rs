//! Where timestep exports come from.
//!
//! The modelling platform that actually renders an export sits behind
//! [`TimestepSource`]. [`DirectorySource`] serves exports that have already
//! been written to disk, one numbered subdirectory per timestep:
//!
//! ```text
//! exports/
//!   0/mesh.mif
//!   0/mesh.mid
//!   1/mesh.mif
//!   ...
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("simulation not found at {0:?}")]
    TargetNotFound(PathBuf),
    #[error("export of timestep {step} failed: {source}")]
    Export {
        step: usize,
        #[source]
        source: std::io::Error,
    },
}

impl SourceError {
    /// Fatal errors end the run. Anything else only loses one timestep.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SourceError::TargetNotFound(_))
    }
}

pub trait TimestepSource {
    /// Number of timesteps the simulation holds. Valid steps are
    /// `0..timestep_count()`.
    fn timestep_count(&self) -> usize;

    /// Writes the export for `step` somewhere under `scratch`. Producing no
    /// files is not an error; the caller treats it as a skipped timestep.
    fn materialize(&mut self, step: usize, scratch: &Path) -> Result<(), SourceError>;
}

// Only canonical names count: "07" or "+7" would not map back to the directory
fn step_from_name(name: &str) -> Option<usize> {
    let step = name.parse::<usize>().ok()?;
    (step.to_string() == name).then_some(step)
}

#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    steps: BTreeSet<usize>,
}

impl DirectorySource {
    pub fn open(root: &Path) -> Result<Self, SourceError> {
        let entries =
            fs::read_dir(root).map_err(|_| SourceError::TargetNotFound(root.to_path_buf()))?;

        let steps: BTreeSet<usize> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| step_from_name(entry.file_name().to_str()?))
            .collect();

        if steps.is_empty() {
            return Err(SourceError::TargetNotFound(root.to_path_buf()));
        }

        debug!(root = ?root, steps = steps.len(), "opened export directory");
        Ok(DirectorySource {
            root: root.to_path_buf(),
            steps,
        })
    }

    fn copy_step(&self, step: usize, scratch: &Path) -> std::io::Result<()> {
        let step_dir = self.root.join(step.to_string());
        for entry in WalkDir::new(&step_dir).sort_by_file_name() {
            let entry = entry?;
            let Ok(relative) = entry.path().strip_prefix(&step_dir) else {
                continue;
            };
            let target = scratch.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}

impl TimestepSource for DirectorySource {
    fn timestep_count(&self) -> usize {
        self.steps.last().map_or(0, |last| last + 1)
    }

    fn materialize(&mut self, step: usize, scratch: &Path) -> Result<(), SourceError> {
        if !self.steps.contains(&step) {
            debug!(step, "no export directory for timestep");
            return Ok(());
        }
        self.copy_step(step, scratch)
            .map_err(|source| SourceError::Export { step, source })
    }
}
