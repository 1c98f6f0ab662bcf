// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Streaming Anomaly Detection

//! # Driftwatch Core
//!
//! Streaming anomaly detection for a scalar time series: a bounded ingest
//! buffer decouples producers from a single statistics consumer, which
//! maintains a fixed-size trailing window of recent values and classifies
//! each new sample with a z-score test.
//!
//! ## Components
//!
//! - **[`IngestBuffer`]**: bounded non-blocking queue between producers and
//!   the single consumer; rejects on full instead of blocking (backpressure)
//! - **[`StreamingAnalyzer`]**: trailing window + running aggregates; O(1)
//!   insertion, lock-free-read snapshots are not required — reads take a
//!   shared lock and run concurrently with each other
//! - **[`IngestionLoop`]**: drains the buffer in FIFO order, feeds the
//!   analyzer, and dispatches side effects (persistence, anomaly counter)
//!
//! ## Example
//!
//! ```rust
//! use driftwatch_core::StreamingAnalyzer;
//!
//! let analyzer = StreamingAnalyzer::new(5);
//! for _ in 0..5 {
//!     analyzer.add_sample(100.0);
//! }
//! let stats = analyzer.snapshot();
//! assert_eq!(stats.count, 5);
//! assert_eq!(stats.mean, 100.0);
//! assert!(!stats.is_anomaly);
//! ```

// Unit tests assert on known float constants (means, thresholds).
#![cfg_attr(test, allow(clippy::float_cmp))]

/// Streaming analyzer: trailing window, running aggregates, classification.
pub mod analyzer;
/// Bounded, backpressure-aware ingest buffer.
pub mod buffer;
/// Environment-driven service configuration.
pub mod config;
/// Error types and conversions.
pub mod error;
/// Single-consumer ingestion loop.
pub mod ingest;
/// Prometheus metrics registry handle and name constants.
pub mod metrics;
/// Sample data model.
pub mod sample;
/// Persistence backend trait.
pub mod store;

pub use analyzer::{StatsSnapshot, StreamingAnalyzer, ANOMALY_Z_THRESHOLD, DEFAULT_WINDOW_SIZE};
pub use buffer::{IngestBuffer, SampleDrain, DEFAULT_INGEST_BUFFER_SIZE};
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::IngestionLoop;
pub use metrics::ServiceMetrics;
pub use sample::Sample;
pub use store::{NoopStore, SampleStore};
