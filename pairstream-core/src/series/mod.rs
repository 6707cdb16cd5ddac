//! Price series storage and CSV persistence

pub mod align;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::info;

use crate::error::{DataError, DataResult};
use crate::features::FeatureRecord;

/// Single OHLCV bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Ordered price history for one instrument.
///
/// Timestamps are strictly increasing; [`push`](Self::push) rejects bars
/// that do not advance the series, so duplicates cannot enter either.
#[derive(Debug, Clone)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
        }
    }

    /// Build a series from bars, validating timestamp ordering
    pub fn with_bars(symbol: impl Into<String>, bars: Vec<PriceBar>) -> DataResult<Self> {
        let mut series = Self::new(symbol);
        for bar in bars {
            series.push(bar)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, bar: PriceBar) -> DataResult<()> {
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(DataError::OutOfOrder {
                    symbol: self.symbol.clone(),
                    timestamp: bar.timestamp,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

/// Load an OHLCV series from a `timestamp,open,high,low,close,volume` CSV
pub fn load_bars_csv(path: impl AsRef<Path>, symbol: &str) -> DataResult<PriceSeries> {
    let path = path.as_ref();
    let content = read_data_file(path)?;
    let mut series = PriceSeries::new(symbol);

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').collect();
        if fields[0] == "timestamp" {
            continue; // header row
        }
        if fields.len() != 6 {
            return Err(parse_error(
                path,
                index + 1,
                format!("expected 6 columns, got {}", fields.len()),
            ));
        }
        let timestamp = parse_timestamp(fields[0]).ok_or_else(|| {
            parse_error(
                path,
                index + 1,
                format!("unrecognized timestamp '{}'", fields[0]),
            )
        })?;
        let mut values = [0.0f64; 5];
        for (slot, field) in values.iter_mut().zip(&fields[1..]) {
            *slot = field
                .parse()
                .map_err(|_| parse_error(path, index + 1, format!("invalid number '{}'", field)))?;
        }
        series.push(PriceBar {
            timestamp,
            open: values[0],
            high: values[1],
            low: values[2],
            close: values[3],
            volume: values[4],
        })?;
    }

    if series.is_empty() {
        return Err(DataError::DataUnavailable {
            subject: path.display().to_string(),
        });
    }
    info!(
        "Loaded {} bars for {} from {}",
        series.len(),
        symbol,
        path.display()
    );
    Ok(series)
}

/// One row of the processed feature series
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedRow {
    pub timestamp: DateTime<Utc>,
    pub closes: Vec<f64>,
    pub z_score: f64,
}

/// Feature series plus the instrument symbols its columns belong to.
///
/// The symbol list is discovered from the `close_<SYM>` header columns, so
/// a replay run emits one tick per column without hardcoded instruments.
#[derive(Debug, Clone, Default)]
pub struct ProcessedSeries {
    pub symbols: Vec<String>,
    pub rows: Vec<ProcessedRow>,
}

impl ProcessedSeries {
    /// Pair identifier carried on the feature message, e.g. `AAPL_MSFT`
    pub fn pair_symbol(&self) -> String {
        self.symbols.join("_")
    }

    pub fn from_feature_records(
        symbol_a: &str,
        symbol_b: &str,
        records: &[FeatureRecord],
    ) -> Self {
        Self {
            symbols: vec![symbol_a.to_string(), symbol_b.to_string()],
            rows: records
                .iter()
                .map(|record| ProcessedRow {
                    timestamp: record.timestamp,
                    closes: vec![record.close_a, record.close_b],
                    z_score: record.z_score,
                })
                .collect(),
        }
    }

    /// Load a `timestamp,close_<A>,...,z_score` CSV written by
    /// [`write_csv`](Self::write_csv)
    pub fn load_csv(path: impl AsRef<Path>) -> DataResult<Self> {
        let path = path.as_ref();
        let content = read_data_file(path)?;
        let mut lines = content.lines().enumerate();

        let header = match lines.next() {
            Some((_, header)) => header,
            None => {
                return Err(DataError::DataUnavailable {
                    subject: path.display().to_string(),
                })
            }
        };
        let symbols =
            parse_processed_header(header).map_err(|message| parse_error(path, 1, message))?;

        let mut rows = Vec::new();
        for (index, line) in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() != symbols.len() + 2 {
                return Err(parse_error(
                    path,
                    index + 1,
                    format!("expected {} columns, got {}", symbols.len() + 2, fields.len()),
                ));
            }
            let timestamp = parse_timestamp(fields[0]).ok_or_else(|| {
                parse_error(
                    path,
                    index + 1,
                    format!("unrecognized timestamp '{}'", fields[0]),
                )
            })?;
            let mut closes = Vec::with_capacity(symbols.len());
            for field in &fields[1..fields.len() - 1] {
                closes.push(field.parse().map_err(|_| {
                    parse_error(path, index + 1, format!("invalid number '{}'", field))
                })?);
            }
            let z_score = fields[fields.len() - 1].parse().map_err(|_| {
                parse_error(
                    path,
                    index + 1,
                    format!("invalid z-score '{}'", fields[fields.len() - 1]),
                )
            })?;
            rows.push(ProcessedRow {
                timestamp,
                closes,
                z_score,
            });
        }

        // Replay pacing walks rows in ascending timestamp order
        rows.sort_by_key(|row| row.timestamp);

        info!(
            "Loaded {} processed rows for {} from {}",
            rows.len(),
            symbols.join("_"),
            path.display()
        );
        Ok(Self { symbols, rows })
    }

    /// Write the feature CSV through a temp file so a failed run never
    /// leaves a partial file behind
    pub fn write_csv(&self, path: impl AsRef<Path>) -> DataResult<()> {
        let path = path.as_ref();

        let mut content = String::from("timestamp");
        for symbol in &self.symbols {
            content.push_str(&format!(",close_{}", symbol));
        }
        content.push_str(",z_score\n");
        for row in &self.rows {
            content.push_str(&row.timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true));
            for close in &row.closes {
                content.push_str(&format!(",{}", close));
            }
            content.push_str(&format!(",{}\n", row.z_score));
        }

        let tmp = path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

fn read_data_file(path: &Path) -> DataResult<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(err) if err.kind() == ErrorKind::NotFound => Err(DataError::DataUnavailable {
            subject: path.display().to_string(),
        }),
        Err(err) => Err(err.into()),
    }
}

fn parse_error(path: &Path, line: usize, message: String) -> DataError {
    DataError::Parse {
        path: path.display().to_string(),
        line,
        message,
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, bare dates and epoch milliseconds
fn parse_timestamp(field: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(field) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(field, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(field, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    if let Ok(millis) = field.parse::<i64>() {
        return Utc.timestamp_millis_opt(millis).single();
    }
    None
}

fn parse_processed_header(header: &str) -> Result<Vec<String>, String> {
    let fields: Vec<&str> = header.trim().split(',').collect();
    if fields.len() < 3 || fields[0] != "timestamp" || fields[fields.len() - 1] != "z_score" {
        return Err("header must be timestamp,close_<SYM>...,z_score".to_string());
    }
    let mut symbols = Vec::new();
    for field in &fields[1..fields.len() - 1] {
        match field.strip_prefix("close_") {
            Some(symbol) if !symbol.is_empty() => symbols.push(symbol.to_string()),
            _ => return Err(format!("unexpected column '{}'", field)),
        }
    }
    Ok(symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("pairstream-{}-{}.csv", name, nanos))
    }

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn bar(secs: i64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: ts(secs),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn loads_bars_with_mixed_timestamp_formats() {
        let path = temp_path("bars-mixed");
        fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             2023-01-03T14:30:00+00:00,130.28,130.9,124.17,125.07,112117500\n\
             2023-01-04 14:30:00,126.89,128.66,125.08,126.36,89113600\n\
             2023-01-05,127.13,127.77,124.76,125.02,80962700\n\
             1673015400000,126.01,130.29,124.89,129.62,87754700\n",
        )
        .unwrap();

        let series = load_bars_csv(&path, "AAPL").unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.symbol(), "AAPL");
        assert_eq!(series.bars()[0].close, 125.07);
        assert_eq!(
            series.bars()[1].timestamp,
            Utc.with_ymd_and_hms(2023, 1, 4, 14, 30, 0).unwrap()
        );
        assert_eq!(
            series.bars()[2].timestamp,
            Utc.with_ymd_and_hms(2023, 1, 5, 0, 0, 0).unwrap()
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_reports_data_unavailable() {
        let result = load_bars_csv(temp_path("does-not-exist"), "AAPL");
        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));
    }

    #[test]
    fn header_only_file_reports_data_unavailable() {
        let path = temp_path("bars-empty");
        fs::write(&path, "timestamp,open,high,low,close,volume\n").unwrap();

        let result = load_bars_csv(&path, "AAPL");
        assert!(matches!(result, Err(DataError::DataUnavailable { .. })));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn non_monotonic_rows_are_rejected() {
        let path = temp_path("bars-unsorted");
        fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             2023-01-04 14:30:00,1,1,1,1,1\n\
             2023-01-03 14:30:00,1,1,1,1,1\n",
        )
        .unwrap();

        let result = load_bars_csv(&path, "AAPL");
        assert!(matches!(result, Err(DataError::OutOfOrder { .. })));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn malformed_row_names_the_line() {
        let path = temp_path("bars-bad");
        fs::write(
            &path,
            "timestamp,open,high,low,close,volume\n\
             2023-01-03 14:30:00,1,1,1,not-a-number,1\n",
        )
        .unwrap();

        match load_bars_csv(&path, "AAPL") {
            Err(DataError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {:?}", other),
        }

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn push_rejects_duplicate_timestamps() {
        let mut series = PriceSeries::new("AAPL");
        series.push(bar(60, 100.0)).unwrap();
        assert!(matches!(
            series.push(bar(60, 101.0)),
            Err(DataError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn processed_series_survives_a_disk_round_trip() {
        let records = vec![
            FeatureRecord {
                timestamp: ts(120),
                close_a: 101.0,
                close_b: 50.0,
                z_score: 0.7071067811865475,
            },
            FeatureRecord {
                timestamp: ts(180),
                close_a: 99.0,
                close_b: 51.0,
                z_score: f64::NAN,
            },
        ];
        let processed = ProcessedSeries::from_feature_records("AAPL", "MSFT", &records);
        assert_eq!(processed.pair_symbol(), "AAPL_MSFT");

        let path = temp_path("processed");
        processed.write_csv(&path).unwrap();
        assert!(!path.with_extension("tmp").exists());

        let loaded = ProcessedSeries::load_csv(&path).unwrap();
        assert_eq!(loaded.symbols, vec!["AAPL", "MSFT"]);
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[0].timestamp, ts(120));
        assert_eq!(loaded.rows[0].closes, vec![101.0, 50.0]);
        assert_eq!(loaded.rows[0].z_score, 0.7071067811865475);
        assert!(loaded.rows[1].z_score.is_nan());

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_csv_sorts_rows_by_timestamp() {
        let path = temp_path("processed-unsorted");
        fs::write(
            &path,
            "timestamp,close_AAPL,close_MSFT,z_score\n\
             2023-01-01T00:02:00Z,99.0,51.0,-0.25\n\
             2023-01-01T00:00:00Z,100.0,50.0,0.0\n\
             2023-01-01T00:01:00Z,101.0,50.5,0.25\n",
        )
        .unwrap();

        let loaded = ProcessedSeries::load_csv(&path).unwrap();
        let timestamps: Vec<_> = loaded.rows.iter().map(|row| row.timestamp).collect();
        assert_eq!(
            timestamps,
            vec![ts(1_672_531_200), ts(1_672_531_260), ts(1_672_531_320)]
        );
        // Columns travel with their row through the sort
        assert_eq!(loaded.rows[0].closes, vec![100.0, 50.0]);
        assert_eq!(loaded.rows[2].closes, vec![99.0, 51.0]);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn disk_round_trip_preserves_millisecond_timestamps() {
        let processed = ProcessedSeries {
            symbols: vec!["AAPL".to_string(), "MSFT".to_string()],
            rows: vec![
                ProcessedRow {
                    timestamp: Utc.timestamp_millis_opt(1_672_531_201_000).unwrap(),
                    closes: vec![100.0, 50.0],
                    z_score: 0.25,
                },
                ProcessedRow {
                    timestamp: Utc.timestamp_millis_opt(1_672_531_201_250).unwrap(),
                    closes: vec![101.0, 50.5],
                    z_score: -0.25,
                },
            ],
        };

        let path = temp_path("processed-millis");
        processed.write_csv(&path).unwrap();

        let loaded = ProcessedSeries::load_csv(&path).unwrap();
        assert_eq!(loaded.rows[0].timestamp, processed.rows[0].timestamp);
        assert_eq!(loaded.rows[1].timestamp, processed.rows[1].timestamp);
        assert_eq!(
            loaded.rows[1].timestamp - loaded.rows[0].timestamp,
            chrono::Duration::milliseconds(250)
        );

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn processed_header_discovers_the_instrument_list() {
        let path = temp_path("processed-three");
        fs::write(
            &path,
            "timestamp,close_AAPL,close_MSFT,close_GOOG,z_score\n\
             2023-01-03 14:30:00,125.07,222.31,89.12,1.25\n",
        )
        .unwrap();

        let loaded = ProcessedSeries::load_csv(&path).unwrap();
        assert_eq!(loaded.symbols, vec!["AAPL", "MSFT", "GOOG"]);
        assert_eq!(loaded.rows[0].closes.len(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn processed_header_must_match_the_expected_shape() {
        let path = temp_path("processed-bad-header");
        fs::write(&path, "timestamp,open,z_score\n").unwrap();

        let result = ProcessedSeries::load_csv(&path);
        assert!(matches!(result, Err(DataError::Parse { line: 1, .. })));

        fs::remove_file(&path).unwrap();
    }
}
