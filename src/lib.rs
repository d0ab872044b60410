//! micwave: microphone recording with live waveform and frequency visualization.
//!
//! The [`recording`] module holds the reusable pieces: the capture controller,
//! the analysis node, the three visualizations and the record-flag widget. The
//! remaining modules make up the terminal application around them.

pub mod app;
pub mod commands;
pub mod config;
pub mod logging;
pub mod recording;
pub mod ui;
