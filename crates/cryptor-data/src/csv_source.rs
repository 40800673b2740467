//! OHLCV history in CSV files.

use chrono::{NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, WriterBuilder};
use cryptor_core::error::DataError;
use cryptor_core::types::Bar;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "Timestamp", alias = "time")]
    timestamp: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", default)]
    volume: f64,
}

/// Load bars from a CSV file with a header row, oldest first.
///
/// Timestamps may be unix seconds, unix milliseconds or a calendar date.
pub fn load_bars(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::NoDataAvailable(path.display().to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(e.to_string()))?;

    let mut bars = Vec::new();
    for (line, result) in reader.deserialize().enumerate() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(format!("row {}: {}", line + 1, e)))?;
        let timestamp = parse_timestamp(&record.timestamp)?;
        bars.push(Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ));
    }

    if bars.is_empty() {
        return Err(DataError::NoDataAvailable(path.display().to_string()));
    }
    bars.sort_by_key(|b| b.timestamp);
    bars.dedup_by_key(|b| b.timestamp);

    debug!(path = %path.display(), bars = bars.len(), "Loaded bars");
    Ok(bars)
}

/// Write bars with millisecond timestamps.
pub fn save_bars(path: impl AsRef<Path>, bars: &[Bar]) -> Result<(), DataError> {
    let mut writer = WriterBuilder::new()
        .from_path(path.as_ref())
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    for bar in bars {
        writer
            .serialize(bar)
            .map_err(|e| DataError::ParseError(e.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<i64, DataError> {
    if let Ok(ts) = raw.parse::<i64>() {
        // 11+ digits are milliseconds
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Some(dt) = NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }

    Err(DataError::ParseError(format!("unrecognised timestamp: {}", raw)))
}
