//! Weekly anchor resolution.
//!
//! The anchor of a series is the timestamp of its first record falling on
//! the reference weekday and hour, evaluated in the display zone.

use chrono::{Datelike, Timelike, Weekday};
use tracing::debug;

use viz_core::models::{CanonicalRecord, Series, Timestamp};

/// Weekday and hour a record must fall on to become the anchor. Minutes are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorRule {
    pub weekday: Weekday,
    pub hour: u32,
}

impl Default for AnchorRule {
    /// Wednesday, 01:00.
    fn default() -> Self {
        Self {
            weekday: Weekday::Wed,
            hour: 1,
        }
    }
}

impl AnchorRule {
    pub fn matches(&self, ts: &Timestamp) -> bool {
        ts.weekday() == self.weekday && ts.hour() == self.hour
    }
}

/// Finds and caches per-series anchors.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorResolver {
    rule: AnchorRule,
}

impl AnchorResolver {
    pub fn new(rule: AnchorRule) -> Self {
        Self { rule }
    }

    pub fn rule(&self) -> AnchorRule {
        self.rule
    }

    /// First matching timestamp in series order. No fallback.
    pub fn find(&self, records: &[CanonicalRecord]) -> Option<Timestamp> {
        records
            .iter()
            .map(|r| r.timestamp)
            .find(|ts| self.rule.matches(ts))
    }

    /// Resolve `series`' anchor into its write-once cell. An already resolved
    /// series keeps its cached value.
    pub fn resolve(&self, series: &Series) -> Option<Timestamp> {
        let anchor = series.resolve_anchor_with(|records| self.find(records));
        match anchor {
            Some(ts) => debug!("Anchor for {}: {}", series.id(), ts),
            None => debug!("No anchor found for {}", series.id()),
        }
        anchor
    }

    pub fn resolve_all(&self, series: &[Series]) -> Vec<Option<Timestamp>> {
        series.iter().map(|s| self.resolve(s)).collect()
    }
}
