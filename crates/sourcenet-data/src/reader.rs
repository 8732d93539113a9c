//! Event table ingestion.
//!
//! The tabular data source is a CSV with one row per detector event.
//! Required columns: `Source_X, Source_Y, Scatter_X, Scatter_Y, Energy,
//! Absorb_X, Absorb_Y, Energy_Abs`. Empty cells deserialize to NaN and
//! are scrubbed to zero downstream; a truly absent column is fatal.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use sourcenet_core::{Error, EventRecord, Result, SourceGroup, SourceKey, SourcePosition};

const REQUIRED_COLUMNS: [&str; 8] = [
    "Source_X", "Source_Y", "Scatter_X", "Scatter_Y", "Energy", "Absorb_X", "Absorb_Y",
    "Energy_Abs",
];

/// One raw table row. Optional fields capture empty cells.
#[derive(Debug, Deserialize)]
struct EventRow {
    #[serde(rename = "Source_X")]
    source_x: f64,
    #[serde(rename = "Source_Y")]
    source_y: f64,
    #[serde(rename = "Scatter_X")]
    scatter_x: Option<f64>,
    #[serde(rename = "Scatter_Y")]
    scatter_y: Option<f64>,
    #[serde(rename = "Energy")]
    energy: Option<f64>,
    #[serde(rename = "Absorb_X")]
    absorb_x: Option<f64>,
    #[serde(rename = "Absorb_Y")]
    absorb_y: Option<f64>,
    #[serde(rename = "Energy_Abs")]
    energy_abs: Option<f64>,
}

impl EventRow {
    fn record(&self) -> EventRecord {
        // Empty cells become NaN here; the scaler substitutes zero before
        // fitting so the tensor contract stays NaN-free.
        let v = |o: Option<f64>| o.unwrap_or(f64::NAN);
        EventRecord {
            scatter_x: v(self.scatter_x),
            scatter_y: v(self.scatter_y),
            energy: v(self.energy),
            absorb_x: v(self.absorb_x),
            absorb_y: v(self.absorb_y),
            energy_abs: v(self.energy_abs),
        }
    }
}

/// Validate the header and read all event rows, grouped by source
/// identity in first-appearance order.
pub fn read_groups<P: AsRef<Path>>(path: P) -> Result<Vec<SourceGroup>> {
    let mut reader = csv::Reader::from_path(path.as_ref())
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?;

    validate_schema(&mut reader)?;

    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut index: HashMap<SourceKey, usize> = HashMap::new();

    for (i, row) in reader.deserialize::<EventRow>().enumerate() {
        let row = row.map_err(|e| Error::MalformedRow {
            // header is line 1
            row: i + 2,
            reason: e.to_string(),
        })?;

        let source = SourcePosition::new(row.source_x, row.source_y);
        let key = SourceKey::from(source);
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(SourceGroup::new(source));
            groups.len() - 1
        });
        groups[slot].events.push(row.record());
    }

    if groups.is_empty() {
        return Err(Error::EmptyTable);
    }

    tracing::info!(
        groups = groups.len(),
        events = groups.iter().map(|g| g.len()).sum::<usize>(),
        "event table loaded"
    );

    Ok(groups)
}

fn validate_schema<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<()> {
    let headers = reader.headers().map_err(|e| Error::MalformedRow {
        row: 1,
        reason: e.to_string(),
    })?;

    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(Error::MissingColumn {
                name: required.to_string(),
            });
        }
    }
    Ok(())
}
