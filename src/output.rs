//! Rendering and persistence of feed results.
//!
//! Supports pretty JSON to any writer and CSV append of prediction rows.

use anyhow::Result;
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::model::RoutePredictions;

/// Writes `value` as pretty-printed JSON followed by a newline.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

/// One CSV row: a single prediction flattened with where and when it was
/// sampled.
#[derive(Debug, Serialize)]
pub struct PredictionRow<'a> {
    pub timestamp: DateTime<Utc>,
    pub agency: &'a str,
    pub stop: &'a str,
    pub route: &'a str,
    pub direction: &'a str,
    pub epoch_time: &'a str,
    pub seconds: &'a str,
    pub minutes: &'a str,
    pub is_departure: bool,
    pub dir_tag: &'a str,
    pub trip_tag: &'a str,
    pub affected_by_layover: bool,
    pub is_schedule_based: bool,
    pub is_delayed: bool,
    pub vehicle: Option<&'a str>,
}

/// Flattens per-route predictions into rows stamped with `timestamp`.
pub fn prediction_rows<'a>(
    timestamp: DateTime<Utc>,
    agency: &'a str,
    stop: &'a str,
    by_route: &'a BTreeMap<String, RoutePredictions>,
) -> Vec<PredictionRow<'a>> {
    by_route
        .iter()
        .flat_map(move |(route, preds)| {
            preds.directions.iter().flat_map(move |(direction, list)| {
                list.iter().map(move |p| PredictionRow {
                    timestamp,
                    agency,
                    stop,
                    route,
                    direction,
                    epoch_time: &p.epoch_time,
                    seconds: &p.seconds,
                    minutes: &p.minutes,
                    is_departure: p.is_departure,
                    dir_tag: &p.dir_tag,
                    trip_tag: &p.trip_tag,
                    affected_by_layover: p.affected_by_layover,
                    is_schedule_based: p.is_schedule_based,
                    is_delayed: p.is_delayed,
                    vehicle: p.vehicle.as_deref(),
                })
            })
        })
        .collect()
}

/// Appends prediction rows to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_rows(path: &str, rows: &[PredictionRow]) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, rows = rows.len(), "Appending CSV rows");

    let file = OpenOptions::new().append(true).create(true).open(path)?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}
