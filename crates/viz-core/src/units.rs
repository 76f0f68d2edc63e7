//! Unit conversion between the ingestion format and display units.
//!
//! Bandwidth arrives in bits per second and is displayed in Mbps, where one
//! Mbps is 2^20 bits per second.

/// Bits per second in one displayed megabit per second.
pub const BPS_PER_MBPS: f64 = 1_048_576.0;

/// Convert bits per second to Mbps. Pure division, no rounding.
pub fn to_mbps(bps: f64) -> f64 {
    bps / BPS_PER_MBPS
}

/// Convert Mbps back to bits per second.
pub fn to_bps(mbps: f64) -> f64 {
    mbps * BPS_PER_MBPS
}
