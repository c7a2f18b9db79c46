//! CSV event records.
//!
//! Required columns: `x1`, `x2`, `scale`, `id1`, `id2`. The event-weight column
//! and one column per observable are looked up by name.

use anyhow::{Context, Result};
use pw_core::PartonKinematics;
use std::path::Path;

const KINEMATIC_COLUMNS: [&str; 5] = ["x1", "x2", "scale", "id1", "id2"];

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kinematics: PartonKinematics,
    pub weight: f64,
    /// One value per requested observable column, in request order.
    pub values: Vec<f64>,
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .with_context(|| format!("event file has no column '{name}'"))
}

fn field(record: &csv::StringRecord, idx: usize, name: &str, row: usize) -> Result<f64> {
    let raw = record.get(idx).with_context(|| format!("row {row}: missing column '{name}'"))?;
    raw.trim()
        .parse::<f64>()
        .with_context(|| format!("row {row}: column '{name}' is not a number: '{raw}'"))
}

fn flavour(record: &csv::StringRecord, idx: usize, name: &str, row: usize) -> Result<i32> {
    let raw = record.get(idx).with_context(|| format!("row {row}: missing column '{name}'"))?;
    raw.trim()
        .parse::<i32>()
        .with_context(|| format!("row {row}: column '{name}' is not a PDG id: '{raw}'"))
}

/// Read every event of `path`, extracting `weight_column` and `value_columns`.
pub fn read_events(
    path: &Path,
    weight_column: Option<&str>,
    value_columns: &[&str],
) -> Result<Vec<Event>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .comment(Some(b'#'))
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let headers = rdr.headers().context("failed to read CSV headers")?.clone();
    let kin_idx = KINEMATIC_COLUMNS
        .iter()
        .map(|c| column_index(&headers, c))
        .collect::<Result<Vec<_>>>()?;
    let weight_idx = weight_column.map(|c| column_index(&headers, c)).transpose()?;
    let value_idx =
        value_columns.iter().map(|c| column_index(&headers, c)).collect::<Result<Vec<_>>>()?;

    let mut events = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let row = i + 1;
        let record = result.with_context(|| format!("failed to read CSV row {row}"))?;
        let k: Vec<f64> = kin_idx[..3]
            .iter()
            .zip(&KINEMATIC_COLUMNS[..3])
            .map(|(&idx, name)| field(&record, idx, name, row))
            .collect::<Result<_>>()?;
        let id1 = flavour(&record, kin_idx[3], KINEMATIC_COLUMNS[3], row)?;
        let id2 = flavour(&record, kin_idx[4], KINEMATIC_COLUMNS[4], row)?;
        let weight = match (weight_idx, weight_column) {
            (Some(idx), Some(name)) => field(&record, idx, name, row)?,
            _ => 1.0,
        };
        let values = value_idx
            .iter()
            .zip(value_columns)
            .map(|(&idx, name)| field(&record, idx, name, row))
            .collect::<Result<Vec<_>>>()?;
        events.push(Event {
            kinematics: PartonKinematics::new(k[0], k[1], k[2], id1, id2),
            weight,
            values,
        });
    }
    tracing::info!(path = %path.display(), events = events.len(), "events loaded");
    Ok(events)
}
