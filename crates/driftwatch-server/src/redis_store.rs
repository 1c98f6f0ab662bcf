// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! Redis-backed sample persistence.
//!
//! Samples are written as JSON under their RFC 3339 timestamp key with a
//! TTL, so Redis holds a self-expiring recent history. The connection
//! manager reconnects on its own; individual save failures surface as
//! [`Error::Storage`] and are counted by the caller.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use driftwatch_core::{Error, Result, Sample, SampleStore};

/// [`SampleStore`] backed by a Redis `SET key value EX ttl`.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis, failing if the initial connection cannot be
    /// established within `connect_timeout`.
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::Storage(format!("invalid redis url {url}: {e}")))?;
        let manager = tokio::time::timeout(connect_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| {
                Error::Storage(format!(
                    "timed out connecting to redis at {url} after {}ms",
                    connect_timeout.as_millis()
                ))
            })?
            .map_err(|e| Error::Storage(format!("failed to connect to redis at {url}: {e}")))?;
        tracing::info!(url, "connected to redis");
        Ok(Self { manager })
    }
}

#[async_trait]
impl SampleStore for RedisStore {
    async fn save(&self, key: &str, sample: &Sample, ttl: Duration) -> Result<()> {
        let payload = serde_json::to_string(sample)
            .map_err(|e| Error::Storage(format!("failed to serialize sample: {e}")))?;
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, payload, ttl.as_secs())
            .await
            .map_err(|e| Error::Storage(format!("redis SET failed for {key}: {e}")))?;
        Ok(())
    }
}
