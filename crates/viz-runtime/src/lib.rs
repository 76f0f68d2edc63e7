//! Async runtime layer for the speed-test visualizer.
//!
//! Loads every input file concurrently, waits for all of them, then resolves
//! anchors and aligns before anything is composed.

pub mod pipeline;

pub use pipeline::{prepare, PipelineConfig, PreparedRun};

pub use viz_core as core;
pub use viz_data as data;
