//! Data layer for the speed-test visualizer.
//!
//! Reads JSONL speed-test logs into series, resolves weekly anchors, aligns
//! timelines and composes the panels a renderer draws.

pub mod aligner;
pub mod anchor;
pub mod composer;
pub mod loader;
pub mod reader;
pub mod summary;

pub use viz_core as core;
