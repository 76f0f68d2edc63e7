//! Terminal UI layer for the speed-test visualizer.
//!
//! Renders composed panels as [`ratatui`] line charts, one screen per
//! figure, with theme selection and a small key-driven event loop.

pub mod app;
pub mod chart_view;
pub mod themes;

pub use viz_core as core;
