//! Core types for the speed-test visualizer.
//!
//! Canonical records and series, measurement dimensions, the profile catalog,
//! unit conversion, timezone handling, formatting helpers, CLI settings and
//! the shared error type.

pub mod dimensions;
pub mod error;
pub mod formatting;
pub mod models;
pub mod profiles;
pub mod settings;
pub mod time_utils;
pub mod units;

pub use error::{Result, VizError};
