use crate::record::ElementRecord;
use crate::state::MaximaTracker;
use anyhow::{Context, Result};
use csv::{Writer, WriterBuilder};
use std::fs::File;
use std::io::Write;
use std::path::Path;

pub const SUMMARY_HEADER: [&str; 7] = [
    "Element_ID",
    "Max_DxV",
    "Max_Depth",
    "Max_Speed",
    "Step_Index_Max_DxV",
    "Step_Index_Max_Depth",
    "Step_Index_Max_Speed",
];

pub const STEP_HEADER: [&str; 4] = ["Element_ID", "DxV", "Depth", "Speed"];

/// Writes one row per element, ordered by element id.
pub fn write_summary_to<W: Write>(out: W, tracker: &MaximaTracker) -> Result<(), csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
    wtr.write_record(SUMMARY_HEADER)?;

    for (id, state) in tracker.sorted() {
        wtr.write_record(&[
            id.to_string(),
            state.max_metric.to_string(),
            state.max_depth.to_string(),
            state.max_speed.to_string(),
            state.step_metric.to_string(),
            state.step_depth.to_string(),
            state.step_speed.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_summary(path: &Path, tracker: &MaximaTracker) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("Failed to create summary: {:?}", path))?;
    write_summary_to(file, tracker)
        .with_context(|| format!("Failed to write summary: {:?}", path))?;
    Ok(())
}

// Create per-timestep CSV writer with headers
pub fn create_step_writer(path: &Path) -> Result<Writer<File>, csv::Error> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    wtr.write_record(STEP_HEADER)?;
    Ok(wtr)
}

pub fn write_step_row<W: Write>(
    wtr: &mut Writer<W>,
    element: &ElementRecord,
    metric: f64,
) -> Result<(), csv::Error> {
    wtr.write_record(&[
        element.id.clone(),
        metric.to_string(),
        element.depth.to_string(),
        element.speed.to_string(),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_rows_are_sorted_with_fixed_columns() {
        let mut tracker = MaximaTracker::new();
        tracker.update("B", 1.0, 2.0, 2.0, 0);
        tracker.update("A", 2.0, 3.0, 6.0, 0);
        tracker.update("A", 1.0, 10.0, 10.0, 1);

        let mut out = Vec::new();
        write_summary_to(&mut out, &tracker).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(
            text,
            "Element_ID,Max_DxV,Max_Depth,Max_Speed,Step_Index_Max_DxV,Step_Index_Max_Depth,Step_Index_Max_Speed\n\
             A,10,2,10,1,0,1\n\
             B,2,1,2,0,0,0\n"
        );
    }

    #[test]
    fn empty_tracker_writes_header_only() {
        let mut out = Vec::new();
        write_summary_to(&mut out, &MaximaTracker::new()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn step_rows_follow_step_header() {
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        wtr.write_record(STEP_HEADER).unwrap();
        let element = ElementRecord {
            id: "E1".to_string(),
            depth: 0.5,
            speed: 1.5,
        };
        write_step_row(&mut wtr, &element, 0.75).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "Element_ID,DxV,Depth,Speed\nE1,0.75,0.5,1.5\n");
    }
}
