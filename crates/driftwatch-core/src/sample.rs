// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Sample Model

//! Sample data model.
//!
//! One scalar observation with a timestamp. Samples are immutable once
//! created; validation (non-negative value, bounded auxiliary fields) happens
//! at the transport boundary before a sample is constructed, not here.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One scalar observation with a timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// When the observation was taken.
    pub timestamp: DateTime<Utc>,
    /// The observed metric (e.g. requests/sec).
    pub value: f64,
}

impl Sample {
    /// Create a sample stamped with the current time.
    #[must_use]
    pub fn new(value: f64) -> Self {
        Self {
            timestamp: Utc::now(),
            value,
        }
    }

    /// Create a sample with an explicit timestamp.
    #[must_use]
    pub fn with_timestamp(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Persistence key for this sample: RFC 3339 with nanosecond precision.
    ///
    /// Nanosecond precision keeps keys unique for samples arriving within the
    /// same second.
    #[must_use]
    pub fn storage_key(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }
}
