pub mod cli;
pub mod columns;
pub mod config;
pub mod io;
pub mod pipeline;
pub mod record;
pub mod source;
pub mod state;

pub use pipeline::{RunOutcome, RunSummary, run_pipeline};
pub use source::{DirectorySource, SourceError, TimestepSource};
pub use state::{MaxState, MaximaTracker};
