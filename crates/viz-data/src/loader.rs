//! Series Loader: serialized JSON record blobs → [`Series`].
//!
//! Field names follow the flattened speedtest export (`"download.bandwidth"`);
//! the nested form produced by the speedtest CLI itself
//! (`{"download": {"bandwidth": ..}}`) is accepted as a fallback.

use serde_json::Value;
use tracing::{debug, warn};

use viz_core::dimensions::Dimension;
use viz_core::error::{Result, VizError};
use viz_core::models::{CanonicalRecord, Series};
use viz_core::time_utils::TimezoneHandler;
use viz_core::units::to_mbps;

use crate::summary::SeriesSummary;

/// How strictly numeric dimensions are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Every record must carry all five dimensions.
    Strict,
    /// Absent or `null` dimensions are left empty.
    #[default]
    Lenient,
}

/// Decodes record blobs into a [`Series`].
#[derive(Debug, Clone, Copy)]
pub struct SeriesLoader {
    mode: LoadMode,
    timezone: TimezoneHandler,
}

impl SeriesLoader {
    pub fn new(mode: LoadMode, timezone: TimezoneHandler) -> Self {
        Self { mode, timezone }
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    pub fn timezone(&self) -> &TimezoneHandler {
        &self.timezone
    }

    /// Decode `blobs` in order into a series identified by `id`.
    ///
    /// Whitespace-only blobs are skipped. The first malformed blob fails the
    /// whole series; its position in `blobs` is reported as the index.
    pub fn load<I, S>(&self, id: &str, blobs: I) -> Result<Series>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (index, blob) in blobs.into_iter().enumerate() {
            let blob = blob.as_ref().trim();
            if blob.is_empty() {
                skipped += 1;
                continue;
            }
            records.push(self.decode_record(id, index, blob)?);
        }

        if records.is_empty() {
            warn!("Series {} has no records", id);
        } else if records
            .windows(2)
            .any(|pair| pair[1].timestamp < pair[0].timestamp)
        {
            warn!("Series {} is not sorted by timestamp; keeping input order", id);
        }

        debug!(
            "Series {}: {} records loaded, {} blank lines skipped",
            id,
            records.len(),
            skipped
        );

        Ok(Series::new(id, records))
    }

    /// [`load`](Self::load) plus summary statistics of the result.
    pub fn load_with_summary<I, S>(&self, id: &str, blobs: I) -> Result<(Series, SeriesSummary)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let series = self.load(id, blobs)?;
        let summary = SeriesSummary::from_series(&series);
        Ok((series, summary))
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn decode_record(&self, id: &str, index: usize, blob: &str) -> Result<CanonicalRecord> {
        let data: Value = serde_json::from_str(blob)
            .map_err(|e| VizError::malformed(id, index, "<record>", e.to_string()))?;
        if !data.is_object() {
            return Err(VizError::malformed(
                id,
                index,
                "<record>",
                "expected a JSON object",
            ));
        }

        let ts_value = lookup(&data, "timestamp")
            .ok_or_else(|| VizError::malformed(id, index, "timestamp", "missing"))?;
        let timestamp = self
            .timezone
            .parse_value(ts_value)
            .map_err(|reason| VizError::malformed(id, index, "timestamp", reason))?;

        let mut record = CanonicalRecord::at(timestamp);
        for dimension in Dimension::ALL {
            let value = self.read_dimension(&data, dimension, id, index)?;
            record.set_value(dimension, value);
        }
        record.isp = read_text(&data, "isp", id, index)?;
        record.server_host = read_text(&data, "server.host", id, index)?;

        Ok(record)
    }

    /// Canonical-unit value of `dimension`, or `None` when absent in lenient
    /// mode.
    fn read_dimension(
        &self,
        data: &Value,
        dimension: Dimension,
        id: &str,
        index: usize,
    ) -> Result<Option<f64>> {
        let field = dimension.key();
        let raw = match lookup(data, field) {
            None | Some(Value::Null) => {
                return match self.mode {
                    LoadMode::Strict => Err(VizError::malformed(id, index, field, "missing")),
                    LoadMode::Lenient => Ok(None),
                };
            }
            Some(Value::Number(n)) => n
                .as_f64()
                .ok_or_else(|| VizError::malformed(id, index, field, "not representable"))?,
            Some(other) => {
                return Err(VizError::malformed(
                    id,
                    index,
                    field,
                    format!("expected a number, got {}", other),
                ))
            }
        };

        if !raw.is_finite() || raw < 0.0 {
            return Err(VizError::malformed(
                id,
                index,
                field,
                format!("{} is not a non-negative number", raw),
            ));
        }
        if dimension == Dimension::PacketLoss && raw > 100.0 {
            return Err(VizError::malformed(
                id,
                index,
                field,
                format!("{} is outside 0-100 %", raw),
            ));
        }

        Ok(Some(if dimension.is_bandwidth() {
            to_mbps(raw)
        } else {
            raw
        }))
    }
}

/// Look up `key` as a flat field first, then as a dotted path into nested
/// objects.
fn lookup<'a>(data: &'a Value, key: &str) -> Option<&'a Value> {
    if let Some(v) = data.get(key) {
        return Some(v);
    }
    if !key.contains('.') {
        return None;
    }
    key.split('.').try_fold(data, |node, part| node.get(part))
}

/// Optional display string. Absent and `null` are both `None`.
fn read_text(data: &Value, field: &str, id: &str, index: usize) -> Result<Option<String>> {
    match lookup(data, field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(VizError::malformed(
            id,
            index,
            field,
            format!("expected a string, got {}", other),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike, Weekday};
    use chrono_tz::Tz;

    fn loader(mode: LoadMode) -> SeriesLoader {
        SeriesLoader::new(mode, TimezoneHandler::new(Tz::Asia__Tokyo, Tz::Asia__Tokyo))
    }

    fn full_record(ts: &str) -> String {
        serde_json::json!({
            "timestamp": ts,
            "download.bandwidth": 104_857_600.0,
            "upload.bandwidth": 52_428_800.0,
            "ping.latency": 12.5,
            "ping.jitter": 0.8,
            "packetLoss": 0.0,
            "isp": "NTT-ME Corporation",
            "server.host": "jp.as.speedtest.i3d.net",
        })
        .to_string()
    }

    fn expect_malformed(err: VizError, want_index: usize, want_field: &str) {
        match err {
            VizError::MalformedRecord { index, field, .. } => {
                assert_eq!(index, want_index);
                assert_eq!(field, want_field);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn test_load_full_record_converts_bandwidth() {
        let series = loader(LoadMode::Strict)
            .load("isp.jsonl", [full_record("2024-01-09T16:00:00Z")])
            .unwrap();

        assert_eq!(series.len(), 1);
        let r = &series.records()[0];
        assert_eq!(r.download_bandwidth, Some(100.0));
        assert_eq!(r.upload_bandwidth, Some(50.0));
        assert_eq!(r.ping_latency, Some(12.5));
        assert_eq!(r.ping_jitter, Some(0.8));
        assert_eq!(r.packet_loss, Some(0.0));
        assert_eq!(r.isp.as_deref(), Some("NTT-ME Corporation"));
        assert_eq!(r.server_host.as_deref(), Some("jp.as.speedtest.i3d.net"));
        // 16:00 UTC Tuesday is 01:00 JST Wednesday.
        assert_eq!(r.timestamp.weekday(), Weekday::Wed);
        assert_eq!(r.timestamp.hour(), 1);
    }

    #[test]
    fn test_load_nested_speedtest_cli_shape() {
        let blob = serde_json::json!({
            "timestamp": "2024-01-10T01:00:00+09:00",
            "download": {"bandwidth": 1_048_576.0},
            "upload": {"bandwidth": 2_097_152.0},
            "ping": {"latency": 5.0, "jitter": 0.5},
            "packetLoss": 0.5,
            "server": {"host": "speedtest.example.net"},
        })
        .to_string();

        let series = loader(LoadMode::Strict).load("nested", [blob]).unwrap();
        let r = &series.records()[0];
        assert_eq!(r.download_bandwidth, Some(1.0));
        assert_eq!(r.upload_bandwidth, Some(2.0));
        assert_eq!(r.ping_jitter, Some(0.5));
        assert_eq!(r.server_host.as_deref(), Some("speedtest.example.net"));
        assert!(r.isp.is_none());
    }

    #[test]
    fn test_lenient_tolerates_missing_dimensions() {
        let blob = r#"{"timestamp":"2021-03-01 09:00:00+9:00","download.bandwidth":10485760.0,"upload.bandwidth":null}"#;
        let series = loader(LoadMode::Lenient).load("csv-derived", [blob]).unwrap();
        let r = &series.records()[0];
        assert_eq!(r.download_bandwidth, Some(10.0));
        assert!(r.upload_bandwidth.is_none());
        assert!(r.ping_latency.is_none());
        assert!(r.packet_loss.is_none());
    }

    #[test]
    fn test_strict_requires_every_dimension() {
        let blob = r#"{"timestamp":"2024-01-10T01:00:00+09:00","download.bandwidth":1.0,"upload.bandwidth":1.0,"ping.latency":1.0,"ping.jitter":1.0}"#;
        let err = loader(LoadMode::Strict).load("s", [blob]).unwrap_err();
        expect_malformed(err, 0, "packetLoss");
    }

    #[test]
    fn test_missing_timestamp_names_index_and_field() {
        let good = full_record("2024-01-10T01:00:00+09:00");
        let bad = r#"{"download.bandwidth": 1.0}"#.to_string();
        let err = loader(LoadMode::Lenient)
            .load("s", [good.clone(), good, bad])
            .unwrap_err();
        expect_malformed(err, 2, "timestamp");
    }

    #[test]
    fn test_invalid_json_aborts_series() {
        let good = full_record("2024-01-10T01:00:00+09:00");
        let err = loader(LoadMode::Lenient)
            .load("s", [good.as_str(), "{not json"])
            .unwrap_err();
        expect_malformed(err, 1, "<record>");
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = loader(LoadMode::Lenient).load("s", ["[1, 2, 3]"]).unwrap_err();
        expect_malformed(err, 0, "<record>");
    }

    #[test]
    fn test_wrong_type_is_malformed_even_when_lenient() {
        let blob = r#"{"timestamp":"2024-01-10T01:00:00+09:00","ping.latency":"fast"}"#;
        let err = loader(LoadMode::Lenient).load("s", [blob]).unwrap_err();
        expect_malformed(err, 0, "ping.latency");
    }

    #[test]
    fn test_negative_and_out_of_range_values_are_malformed() {
        let negative = r#"{"timestamp":"2024-01-10T01:00:00+09:00","ping.jitter":-1.0}"#;
        let err = loader(LoadMode::Lenient).load("s", [negative]).unwrap_err();
        expect_malformed(err, 0, "ping.jitter");

        let loss = r#"{"timestamp":"2024-01-10T01:00:00+09:00","packetLoss":120.0}"#;
        let err = loader(LoadMode::Lenient).load("s", [loss]).unwrap_err();
        expect_malformed(err, 0, "packetLoss");
    }

    #[test]
    fn test_unparseable_timestamp_is_malformed() {
        let blob = r#"{"timestamp":"yesterday","download.bandwidth":1.0}"#;
        let err = loader(LoadMode::Lenient).load("s", [blob]).unwrap_err();
        expect_malformed(err, 0, "timestamp");
    }

    #[test]
    fn test_blank_lines_are_skipped_but_counted_in_index() {
        let good = full_record("2024-01-10T01:00:00+09:00");
        let series = loader(LoadMode::Strict)
            .load("s", ["", good.as_str(), "   ", good.as_str()])
            .unwrap();
        assert_eq!(series.len(), 2);

        let err = loader(LoadMode::Strict)
            .load("s", ["", "", "{}"])
            .unwrap_err();
        expect_malformed(err, 2, "timestamp");
    }

    #[test]
    fn test_empty_input_yields_empty_series() {
        let series = loader(LoadMode::Strict)
            .load("empty", Vec::<String>::new())
            .unwrap();
        assert!(series.is_empty());
        assert_eq!(series.label(), "empty");
    }

    #[test]
    fn test_unsorted_input_keeps_order() {
        let later = full_record("2024-01-10T03:00:00+09:00");
        let earlier = full_record("2024-01-10T01:00:00+09:00");
        let series = loader(LoadMode::Strict).load("s", [later, earlier]).unwrap();
        assert_eq!(series.records()[0].timestamp.hour(), 3);
        assert_eq!(series.records()[1].timestamp.hour(), 1);
    }

    #[test]
    fn test_naive_timestamp_uses_input_zone() {
        let loader = SeriesLoader::new(
            LoadMode::Lenient,
            TimezoneHandler::new(Tz::UTC, Tz::Asia__Tokyo),
        );
        let blob = r#"{"timestamp":"2024-01-10 09:00:00"}"#;
        let series = loader.load("s", [blob]).unwrap();
        assert_eq!(series.records()[0].timestamp.hour(), 0);
    }

    #[test]
    fn test_load_with_summary() {
        let (series, summary) = loader(LoadMode::Strict)
            .load_with_summary("s", [full_record("2024-01-10T01:00:00+09:00")])
            .unwrap();
        assert_eq!(summary.records, series.len());
        assert_eq!(summary.id, "s");
    }

    #[test]
    fn test_lookup_prefers_flat_key() {
        let data = serde_json::json!({
            "download.bandwidth": 1.0,
            "download": {"bandwidth": 2.0},
        });
        assert_eq!(lookup(&data, "download.bandwidth"), Some(&serde_json::json!(1.0)));
        assert!(lookup(&data, "upload.bandwidth").is_none());
        assert!(lookup(&data, "packetLoss").is_none());
    }
}
