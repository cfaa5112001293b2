use csv::StringRecord;

/// Data rows carry the element identifier at this field, whatever order the
/// header declares. This is a property of the export format.
pub const ID_FIELD: usize = 1;

/// Rows with fewer fields than this are skipped.
pub const MIN_FIELDS: usize = 4;

/// Depth x velocity hazard product.
#[inline]
pub fn hazard_metric(depth: f64, speed: f64, multiplier: f64) -> f64 {
    depth * speed * multiplier
}

// One element's values at one timestep
#[derive(Debug, Clone, PartialEq)]
pub struct ElementRecord {
    pub id: String,
    pub depth: f64,
    pub speed: f64,
}

impl ElementRecord {
    pub fn metric(&self, multiplier: f64) -> f64 {
        hazard_metric(self.depth, self.speed, multiplier)
    }
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

// Missing, non-numeric or non-finite (NaN, inf) fields read as zero
fn lenient_f64(field: Option<&str>) -> f64 {
    field
        .map(clean_field)
        .and_then(|f| f.parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Reads element records using the depth/speed positions resolved from one
/// timestep's header. An unresolved position reads as 0.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordParser {
    depth: Option<usize>,
    speed: Option<usize>,
}

impl RecordParser {
    pub fn new(depth: Option<usize>, speed: Option<usize>) -> Self {
        RecordParser { depth, speed }
    }

    pub fn parse(&self, record: &StringRecord) -> Option<ElementRecord> {
        if record.len() < MIN_FIELDS {
            return None;
        }

        let id = clean_field(record.get(ID_FIELD)?).to_string();
        let read = |position: Option<usize>| lenient_f64(position.and_then(|p| record.get(p)));

        Some(ElementRecord {
            id,
            depth: read(self.depth),
            speed: read(self.speed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn metric_is_plain_product() {
        assert_eq!(hazard_metric(2.0, 3.0, 1.0), 6.0);
        assert_eq!(hazard_metric(0.0, 7.5, 1.2), 0.0);
        assert_eq!(hazard_metric(1.5, 2.0, 0.5), 1.5 * 2.0 * 0.5);
        assert_eq!(hazard_metric(-1.0, 4.0, 2.0), -8.0);
    }

    #[test]
    fn reads_identifier_and_resolved_fields() {
        let parser = RecordParser::new(Some(3), Some(2));
        let element = parser
            .parse(&record(&["17", " \"E-42\" ", "1.25", "0.5"]))
            .unwrap();
        assert_eq!(
            element,
            ElementRecord {
                id: "E-42".to_string(),
                depth: 0.5,
                speed: 1.25,
            }
        );
        assert_eq!(element.metric(2.0), 1.25);
    }

    #[test]
    fn short_rows_are_skipped() {
        let parser = RecordParser::new(Some(2), Some(3));
        assert!(parser.parse(&record(&["1", "A", "2.0"])).is_none());
    }

    #[test]
    fn bad_numbers_read_as_zero() {
        let parser = RecordParser::new(Some(2), Some(3));
        let element = parser.parse(&record(&["1", "A", "n/a", ""])).unwrap();
        assert_eq!((element.depth, element.speed), (0.0, 0.0));
    }

    #[test]
    fn nan_and_infinity_read_as_zero() {
        let parser = RecordParser::new(Some(2), Some(3));
        for (depth, speed) in [("NaN", "2.0"), ("inf", "-infinity"), ("1.0", "nan")] {
            let element = parser.parse(&record(&["1", "A", depth, speed])).unwrap();
            assert!(element.depth.is_finite() && element.speed.is_finite());
            assert!(element.metric(1.0).is_finite());
        }
        let element = parser.parse(&record(&["1", "A", "inf", "0.0"])).unwrap();
        assert_eq!((element.depth, element.metric(1.0)), (0.0, 0.0));
    }

    #[test]
    fn unresolved_and_out_of_range_positions_read_as_zero() {
        let parser = RecordParser::new(None, Some(9));
        let element = parser.parse(&record(&["1", "A", "2.0", "3.0"])).unwrap();
        assert_eq!((element.depth, element.speed), (0.0, 0.0));
    }
}
