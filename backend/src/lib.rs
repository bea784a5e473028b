//! # OSmOSE Rust Backend
//!
//! Detection activity and inter-annotator agreement engine for passive
//! acoustic annotation campaigns.
//!
//! This crate takes an already-normalized table of timestamped detections,
//! produced by one or more human or automated annotators, and summarizes it:
//! activity over time at a chosen resolution, hour-of-day patterns per day
//! overlaid with sunrise and sunset, and agreement between two annotators.
//!
//! ## Features
//!
//! - **Time Grids**: fixed-minute, daily, weekly and monthly bin boundaries
//! - **Aggregation**: per-bin detection counts normalized into detection rates
//! - **Heatmaps**: 24 × N hour-of-day by day activity matrices
//! - **Agreement**: set concordance and Pearson correlation between selections
//! - **Diel Overlay**: sunrise/sunset curves from a pluggable provider
//! - **Reports**: configured batch runs driven by a TOML file
//!
//! ## Architecture
//!
//! - [`api`]: Result types and snapshot parsing
//! - [`models`]: Detection records, the detection table and time helpers
//! - [`services`]: Grid, aggregation, heatmap, agreement and report services
//! - [`config`]: TOML report configuration
//! - [`error`]: Typed analysis errors
//!
//! Library code logs through the `log` facade; the `osmose-report` binary
//! installs the subscriber.

#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use error::{AnalysisError, AnalysisResult};
