use chrono::{DateTime, Duration};
use chrono_tz::Tz;
use std::cell::OnceCell;

use crate::dimensions::{Dimension, DimensionSet};

/// A zone-aware point in time, expressed in the display timezone.
pub type Timestamp = DateTime<Tz>;

/// One normalised speed-test measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    /// When the test ran, converted to the display timezone.
    pub timestamp: Timestamp,
    /// Download bandwidth in Mbps.
    pub download_bandwidth: Option<f64>,
    /// Upload bandwidth in Mbps.
    pub upload_bandwidth: Option<f64>,
    /// Round-trip latency in milliseconds.
    pub ping_latency: Option<f64>,
    /// Latency jitter in milliseconds.
    pub ping_jitter: Option<f64>,
    /// Lost packets in percent, 0–100.
    pub packet_loss: Option<f64>,
    pub isp: Option<String>,
    pub server_host: Option<String>,
}

impl CanonicalRecord {
    /// A record with only a timestamp set.
    pub fn at(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            download_bandwidth: None,
            upload_bandwidth: None,
            ping_latency: None,
            ping_jitter: None,
            packet_loss: None,
            isp: None,
            server_host: None,
        }
    }

    /// The canonical-unit value for `dimension`, if the record carries it.
    pub fn value(&self, dimension: Dimension) -> Option<f64> {
        match dimension {
            Dimension::Download => self.download_bandwidth,
            Dimension::Upload => self.upload_bandwidth,
            Dimension::PingLatency => self.ping_latency,
            Dimension::PingJitter => self.ping_jitter,
            Dimension::PacketLoss => self.packet_loss,
        }
    }

    pub fn set_value(&mut self, dimension: Dimension, value: Option<f64>) {
        let slot = match dimension {
            Dimension::Download => &mut self.download_bandwidth,
            Dimension::Upload => &mut self.upload_bandwidth,
            Dimension::PingLatency => &mut self.ping_latency,
            Dimension::PingJitter => &mut self.ping_jitter,
            Dimension::PacketLoss => &mut self.packet_loss,
        };
        *slot = value;
    }
}

// ── Series ────────────────────────────────────────────────────────────────────

/// An ordered run of records from one source.
///
/// Records keep their load order. The anchor is a write-once cell: the first
/// resolution wins and later resolutions return the cached value.
#[derive(Debug, Clone)]
pub struct Series {
    id: String,
    label: String,
    records: Vec<CanonicalRecord>,
    anchor: OnceCell<Option<Timestamp>>,
}

impl Series {
    /// Create a series labelled with its source identifier.
    pub fn new(id: impl Into<String>, records: Vec<CanonicalRecord>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            records,
            anchor: OnceCell::new(),
        }
    }

    /// Source identifier (usually the file path).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// `true` when at least one record carries `dimension`.
    pub fn has_dimension(&self, dimension: Dimension) -> bool {
        self.records.iter().any(|r| r.value(dimension).is_some())
    }

    /// All dimensions present somewhere in the series.
    pub fn dimensions(&self) -> DimensionSet {
        Dimension::ALL
            .into_iter()
            .filter(|d| self.has_dimension(*d))
            .collect()
    }

    /// `(timestamp, value)` pairs for records carrying `dimension`.
    pub fn points(&self, dimension: Dimension) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        self.records
            .iter()
            .filter_map(move |r| r.value(dimension).map(|v| (r.timestamp, v)))
    }

    pub fn first_timestamp(&self) -> Option<Timestamp> {
        self.records.first().map(|r| r.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<Timestamp> {
        self.records.last().map(|r| r.timestamp)
    }

    // ── Anchor ────────────────────────────────────────────────────────────────

    /// The resolved anchor, or `None` when unresolved or when no record
    /// matched.
    pub fn anchor(&self) -> Option<Timestamp> {
        self.anchor.get().copied().flatten()
    }

    pub fn is_anchor_resolved(&self) -> bool {
        self.anchor.get().is_some()
    }

    /// Resolve the anchor with `scan` unless it is already resolved.
    pub fn resolve_anchor_with<F>(&self, scan: F) -> Option<Timestamp>
    where
        F: FnOnce(&[CanonicalRecord]) -> Option<Timestamp>,
    {
        *self.anchor.get_or_init(|| scan(&self.records))
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Move every record timestamp by `delta`. The anchor is left as is.
    pub fn shift_timestamps(&mut self, delta: Duration) {
        for record in &mut self.records {
            record.timestamp = record.timestamp + delta;
        }
    }
}
