//! Shift series so their weekly anchors coincide.

use chrono::Duration;
use tracing::{debug, info};

use viz_core::models::{Series, Timestamp};

/// Per-series offsets derived from anchors alone.
///
/// `offsets[i]` is the amount subtracted from every timestamp of series `i`,
/// or `None` when that series has no anchor and stays where it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentPlan {
    /// The earliest anchor across the comparison set.
    pub reference: Option<Timestamp>,
    pub offsets: Vec<Option<Duration>>,
}

impl AlignmentPlan {
    pub fn from_anchors(anchors: &[Option<Timestamp>]) -> Self {
        let reference = anchors.iter().flatten().min().copied();
        let offsets = anchors
            .iter()
            .map(|anchor| match (anchor, reference) {
                (Some(a), Some(r)) => Some(a.signed_duration_since(r)),
                _ => None,
            })
            .collect();
        Self { reference, offsets }
    }

    /// `true` when no series will move.
    pub fn is_noop(&self) -> bool {
        self.offsets
            .iter()
            .all(|o| o.map_or(true, |d| d == Duration::zero()))
    }

    /// Shift each series by its offset. Extra series beyond the plan are left
    /// untouched.
    pub fn apply(&self, series: &mut [Series]) {
        for (s, offset) in series.iter_mut().zip(&self.offsets) {
            if let Some(offset) = offset {
                if *offset != Duration::zero() {
                    debug!("Shifting {} back by {}s", s.id(), offset.num_seconds());
                    s.shift_timestamps(-*offset);
                }
            }
        }
    }
}

/// Computes and applies [`AlignmentPlan`]s.
///
/// Anchors must be resolved beforehand. Aligning twice shifts twice.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimelineAligner;

impl TimelineAligner {
    pub fn plan(&self, series: &[Series]) -> AlignmentPlan {
        let anchors: Vec<_> = series.iter().map(Series::anchor).collect();
        AlignmentPlan::from_anchors(&anchors)
    }

    pub fn align(&self, series: &mut [Series]) -> AlignmentPlan {
        let plan = self.plan(series);
        match plan.reference {
            Some(reference) => {
                info!(
                    "Aligning {} series to {}",
                    plan.offsets.iter().flatten().count(),
                    reference
                );
                plan.apply(series);
            }
            None => info!("No anchored series; alignment skipped"),
        }
        plan
    }
}
