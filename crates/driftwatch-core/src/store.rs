// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Persistence Trait

//! # Persistence Backend Trait
//!
//! Abstract seam for the raw-sample sink, allowing interchangeable backends
//! (Redis in production, in-memory or no-op in tests and Redis-less runs).
//! The ingestion loop calls [`SampleStore::save`] best-effort under a short
//! timeout; failures are logged and dropped, never propagated to producers.

use crate::error::Result;
use crate::sample::Sample;
use async_trait::async_trait;
use std::time::Duration;

/// Durable sink for raw samples.
#[async_trait]
pub trait SampleStore: Send + Sync {
    /// Store `sample` under `key`, expiring after `ttl`.
    async fn save(&self, key: &str, sample: &Sample, ttl: Duration) -> Result<()>;
}

/// Store that discards everything. For tests and deployments without a
/// persistence backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopStore;

#[async_trait]
impl SampleStore for NoopStore {
    async fn save(&self, _key: &str, _sample: &Sample, _ttl: Duration) -> Result<()> {
        Ok(())
    }
}
