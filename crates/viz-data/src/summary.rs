//! Descriptive statistics for a loaded series.

use std::collections::BTreeSet;
use std::fmt;

use viz_core::dimensions::Dimension;
use viz_core::formatting::{format_number, format_span, format_timestamp};
use viz_core::models::{Series, Timestamp};

/// Compute the `p`-th percentile of a **sorted** slice using linear
/// interpolation between closest ranks.
///
/// Returns `0.0` for an empty slice.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }
    let len = sorted_data.len();
    if len == 1 {
        return sorted_data[0];
    }
    let rank = (p / 100.0) * (len as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted_data[lo];
    }
    let frac = rank - lo as f64;
    sorted_data[lo] + frac * (sorted_data[hi] - sorted_data[lo])
}

/// Statistics over the values of one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `0.0` for a single value.
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
}

impl DimensionSummary {
    /// `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let std = if count > 1 {
            let var = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            var.sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            std,
            min: sorted[0],
            p25: percentile(&sorted, 25.0),
            median: percentile(&sorted, 50.0),
            p75: percentile(&sorted, 75.0),
            max: sorted[count - 1],
        })
    }
}

/// Per-series overview printed in verbose mode.
#[derive(Debug, Clone)]
pub struct SeriesSummary {
    pub id: String,
    pub records: usize,
    pub first: Option<Timestamp>,
    pub last: Option<Timestamp>,
    /// Present dimensions in canonical order.
    pub dimensions: Vec<(Dimension, DimensionSummary)>,
    pub isps: BTreeSet<String>,
    pub server_hosts: BTreeSet<String>,
}

impl SeriesSummary {
    pub fn from_series(series: &Series) -> Self {
        let dimensions = Dimension::ALL
            .into_iter()
            .filter_map(|d| {
                let values: Vec<f64> = series.points(d).map(|(_, v)| v).collect();
                DimensionSummary::from_values(&values).map(|s| (d, s))
            })
            .collect();

        let records = series.records();
        Self {
            id: series.id().to_string(),
            records: records.len(),
            first: series.first_timestamp(),
            last: series.last_timestamp(),
            dimensions,
            isps: records.iter().filter_map(|r| r.isp.clone()).collect(),
            server_hosts: records.iter().filter_map(|r| r.server_host.clone()).collect(),
        }
    }

    pub fn get(&self, dimension: Dimension) -> Option<&DimensionSummary> {
        self.dimensions
            .iter()
            .find(|(d, _)| *d == dimension)
            .map(|(_, s)| s)
    }
}

impl fmt::Display for SeriesSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "file name: {}", self.id)?;
        match (self.first, self.last) {
            (Some(first), Some(last)) => writeln!(
                f,
                "{} records, {} .. {} ({})",
                self.records,
                format_timestamp(&first),
                format_timestamp(&last),
                format_span(last.signed_duration_since(first))
            )?,
            _ => writeln!(f, "{} records", self.records)?,
        }

        if !self.dimensions.is_empty() {
            writeln!(
                f,
                "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
            )?;
        }
        for (dimension, s) in &self.dimensions {
            writeln!(
                f,
                "{:<20} {:>6} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
                format!("{} ({})", dimension.key(), dimension.unit()),
                s.count,
                format_number(s.mean, 2),
                format_number(s.std, 2),
                format_number(s.min, 2),
                format_number(s.p25, 2),
                format_number(s.median, 2),
                format_number(s.p75, 2),
                format_number(s.max, 2),
            )?;
        }

        if !self.isps.is_empty() {
            let isps: Vec<&str> = self.isps.iter().map(String::as_str).collect();
            writeln!(f, "isp: {}", isps.join(", "))?;
        }
        if !self.server_hosts.is_empty() {
            let hosts: Vec<&str> = self.server_hosts.iter().map(String::as_str).collect();
            writeln!(f, "server.host: {}", hosts.join(", "))?;
        }
        Ok(())
    }
}
