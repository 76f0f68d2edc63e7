use crate::error::{Result, VizError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One measured quantity of a speed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Download,
    Upload,
    PingLatency,
    PingJitter,
    PacketLoss,
}

/// A horizontal threshold drawn on a panel, e.g. the bandwidth a video
/// conference needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceLine {
    pub label: &'static str,
    pub value: f64,
}

const DOWNLOAD_LINES: &[ReferenceLine] = &[
    ReferenceLine { label: "fps", value: 30.0 },
    ReferenceLine { label: "movie", value: 25.0 },
    ReferenceLine { label: "video conference", value: 15.0 },
    ReferenceLine { label: "mail", value: 10.0 },
];
const UPLOAD_LINES: &[ReferenceLine] = &[ReferenceLine { label: "video conference", value: 15.0 }];
const LATENCY_LINES: &[ReferenceLine] = &[ReferenceLine { label: "fps", value: 50.0 }];
const JITTER_LINES: &[ReferenceLine] = &[ReferenceLine { label: "fps", value: 10.0 }];
const LOSS_LINES: &[ReferenceLine] = &[ReferenceLine { label: "fps", value: 2.0 }];

impl Dimension {
    /// Canonical panel order. Every composition walks this array, never a
    /// map's iteration order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Download,
        Dimension::Upload,
        Dimension::PingLatency,
        Dimension::PingJitter,
        Dimension::PacketLoss,
    ];

    /// The record field name as it appears in the JSONL input.
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::Download => "download.bandwidth",
            Dimension::Upload => "upload.bandwidth",
            Dimension::PingLatency => "ping.latency",
            Dimension::PingJitter => "ping.jitter",
            Dimension::PacketLoss => "packetLoss",
        }
    }

    /// Panel title.
    pub fn title(&self) -> &'static str {
        match self {
            Dimension::Download => "Download Speed",
            Dimension::Upload => "Upload Speed",
            Dimension::PingLatency => "Ping",
            Dimension::PingJitter => "Jitter",
            Dimension::PacketLoss => "PacketLoss",
        }
    }

    /// Display unit after canonicalisation.
    pub fn unit(&self) -> &'static str {
        match self {
            Dimension::Download | Dimension::Upload => "Mbps",
            Dimension::PingLatency | Dimension::PingJitter => "ms",
            Dimension::PacketLoss => "%",
        }
    }

    pub fn reference_lines(&self) -> &'static [ReferenceLine] {
        match self {
            Dimension::Download => DOWNLOAD_LINES,
            Dimension::Upload => UPLOAD_LINES,
            Dimension::PingLatency => LATENCY_LINES,
            Dimension::PingJitter => JITTER_LINES,
            Dimension::PacketLoss => LOSS_LINES,
        }
    }

    /// Whether the raw value is a bandwidth in bits per second.
    pub fn is_bandwidth(&self) -> bool {
        matches!(self, Dimension::Download | Dimension::Upload)
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = VizError;

    /// Parse a record field key such as `"ping.jitter"`.
    fn from_str(value: &str) -> Result<Self> {
        Dimension::ALL
            .into_iter()
            .find(|d| d.key() == value)
            .ok_or_else(|| VizError::Config(format!("unknown dimension: {}", value)))
    }
}

// ── DimensionSet ──────────────────────────────────────────────────────────────

/// An unordered set of dimensions. Iteration always yields canonical order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DimensionSet {
    bits: u8,
}

impl DimensionSet {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn all() -> Self {
        Dimension::ALL.into_iter().collect()
    }

    pub fn insert(&mut self, dimension: Dimension) {
        self.bits |= dimension.bit();
    }

    pub fn contains(&self, dimension: Dimension) -> bool {
        self.bits & dimension.bit() != 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Members in canonical dimension order.
    pub fn iter(&self) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL.into_iter().filter(|d| self.contains(*d))
    }
}

impl FromIterator<Dimension> for DimensionSet {
    fn from_iter<I: IntoIterator<Item = Dimension>>(iter: I) -> Self {
        let mut set = DimensionSet::empty();
        for dimension in iter {
            set.insert(dimension);
        }
        set
    }
}

impl Serialize for DimensionSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|d| d.key()))
    }
}
