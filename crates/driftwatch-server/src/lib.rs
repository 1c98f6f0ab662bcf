// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)

//! HTTP transport and process wiring for driftwatch.
//!
//! Exposes the ingest/analysis API over axum, wires the ingest buffer to
//! the ingestion loop, and handles graceful shutdown. Persistence backends
//! live behind [`SampleStore`]; the Redis implementation is in
//! [`redis_store`].

pub mod redis_store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::rejection::JsonRejection,
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use driftwatch_core::{
    Config, Error, IngestBuffer, IngestionLoop, Sample, SampleStore, ServiceMetrics,
    StreamingAnalyzer,
};

// ============================================================================
// Shared state
// ============================================================================

/// State shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Analyzer queried by `/analyze` and fed by the ingestion loop.
    pub analyzer: Arc<StreamingAnalyzer>,
    /// Producer side of the ingest buffer.
    pub buffer: IngestBuffer,
    /// Service metrics registry.
    pub metrics: Arc<ServiceMetrics>,
}

// ============================================================================
// Wire types
// ============================================================================

/// Request body for `POST /ingest`.
#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    /// Observation time; defaults to now when omitted.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Requests per second, the value fed to the analyzer.
    pub rps: f64,
    /// CPU utilization percentage, accepted for validation only.
    #[serde(default)]
    pub cpu: f64,
}

impl IngestRequest {
    /// Validate the request and produce the sample to enqueue.
    fn into_sample(self) -> Result<Sample, Error> {
        if !self.rps.is_finite() || self.rps < 0.0 {
            return Err(Error::InvalidSample(format!(
                "rps must be finite and >= 0, got {}",
                self.rps
            )));
        }
        if !self.cpu.is_finite() || !(0.0..=100.0).contains(&self.cpu) {
            return Err(Error::InvalidSample(format!(
                "cpu must be in [0, 100], got {}",
                self.cpu
            )));
        }
        Ok(match self.timestamp {
            Some(ts) => Sample::with_timestamp(ts, self.rps),
            None => Sample::new(self.rps),
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: msg.into() })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn ingest_handler(
    State(state): State<AppState>,
    body: Result<Json<IngestRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("invalid request body: {rejection}"),
            );
        }
    };

    let sample = match request.into_sample() {
        Ok(sample) => sample,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    match state.buffer.try_enqueue(sample) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(Error::BufferFull) => {
            state.metrics.buffer_rejections_total.inc();
            error_response(StatusCode::SERVICE_UNAVAILABLE, "ingest buffer full")
        }
        Err(Error::BufferClosed) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "service shutting down")
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn analyze_handler(State(state): State<AppState>) -> Response {
    Json(state.analyzer.snapshot()).into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics.export() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to export metrics: {e}"),
        ),
    }
}

async fn healthz_handler() -> Response {
    (StatusCode::OK, "ok").into_response()
}

/// Records request count and latency for the API routes.
async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let method = request.method().to_string();

    let start = Instant::now();
    let response = next.run(request).await;

    let status = response.status().as_u16().to_string();
    state
        .metrics
        .http_requests_total
        .with_label_values(&[&path, &method, &status])
        .inc();
    state
        .metrics
        .http_request_duration_seconds
        .with_label_values(&[&path, &method])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Build the service router.
///
/// `/ingest` and `/analyze` carry the request-metrics middleware; the
/// operational endpoints (`/metrics`, `/healthz`) do not instrument
/// themselves.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ingest", post(ingest_handler))
        .route("/analyze", get(analyze_handler))
        .layer(middleware::from_fn_with_state(state.clone(), track_metrics));

    let ops = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz_handler));

    api.merge(ops).with_state(state)
}

// ============================================================================
// Server lifecycle
// ============================================================================

/// A running driftwatch service: HTTP listener plus ingestion loop.
pub struct Server {
    addr: SocketAddr,
    buffer: IngestBuffer,
    shutdown_tx: Option<oneshot::Sender<()>>,
    http_handle: JoinHandle<()>,
    loop_handle: JoinHandle<()>,
}

impl Server {
    /// Bind the listener, spawn the ingestion loop and HTTP server, and
    /// return a handle for shutdown.
    ///
    /// Binding to port 0 picks a free port; the bound address is available
    /// through [`addr`](Self::addr).
    pub async fn start(config: Config, store: Arc<dyn SampleStore>) -> anyhow::Result<Self> {
        let analyzer = Arc::new(StreamingAnalyzer::new(config.analytics_window));
        let metrics = Arc::new(ServiceMetrics::new()?);
        let (buffer, drain) = IngestBuffer::new(config.ingest_buffer_size);

        let ingest = IngestionLoop::new(
            Arc::clone(&analyzer),
            store,
            Arc::clone(&metrics),
            config.save_timeout,
            config.sample_ttl,
        );
        let loop_handle = tokio::spawn(ingest.run(drain));

        let state = AppState {
            analyzer,
            buffer: buffer.clone(),
            metrics,
        };
        let app = router(state);

        let listener = TcpListener::bind(&config.http_addr).await?;
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "http server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let http_handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "http server exited with error");
            }
        });

        Ok(Self {
            addr,
            buffer,
            shutdown_tx: Some(shutdown_tx),
            http_handle,
            loop_handle,
        })
    }

    /// The address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Shut down gracefully: stop accepting samples, let the ingestion loop
    /// drain what is already queued, then stop the HTTP server.
    ///
    /// `deadline` bounds the whole sequence; tasks still running when it
    /// expires are aborted.
    pub async fn shutdown(mut self, deadline: Duration) {
        self.buffer.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let drained = tokio::time::timeout(deadline, async {
            let _ = (&mut self.loop_handle).await;
            let _ = (&mut self.http_handle).await;
        })
        .await;

        match drained {
            Ok(()) => tracing::info!("shutdown complete"),
            Err(_) => {
                tracing::warn!(deadline_ms = deadline.as_millis() as u64, "shutdown deadline exceeded, aborting tasks");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        // Belt and suspenders if shutdown() was never called.
        self.http_handle.abort();
        self.loop_handle.abort();
    }
}
