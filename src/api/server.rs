use axum::{error_handling::HandleErrorLayer, http::StatusCode, routing::get, Router};
use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tower::{limit::ConcurrencyLimitLayer, timeout::TimeoutLayer, BoxError, ServiceBuilder};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::handlers;
use crate::monitoring::SweepMetrics;
use crate::storage::CounterHandle;
use crate::sweeper::SchedulerState;

const MAX_CONCURRENCY: usize = 64;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state of the status routes.
#[derive(Clone)]
pub struct StatusState {
    pub counters: CounterHandle,
    pub metrics: Option<Arc<SweepMetrics>>,
    pub scheduler: watch::Receiver<SchedulerState>,
}

pub struct StatusServer {
    pub bind: SocketAddr,
    pub state: StatusState,
}

impl StatusServer {
    pub fn new(bind: SocketAddr, state: StatusState) -> Self {
        Self { bind, state }
    }

    pub fn create_router(state: StatusState) -> Router {
        Router::new()
            .route("/health", get(handlers::health_check))
            .route("/api/counts", get(handlers::get_counts))
            .route("/metrics", get(handlers::metrics))
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(|err: BoxError| async move {
                        if err.is::<tower::timeout::error::Elapsed>() {
                            (StatusCode::REQUEST_TIMEOUT, "request timed out")
                        } else {
                            (StatusCode::SERVICE_UNAVAILABLE, "service overloaded")
                        }
                    }))
                    .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENCY))
                    .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
                    .layer(TraceLayer::new_for_http()),
            )
            .with_state(state)
    }

    /// Claim the listening socket without serving yet, so an unusable
    /// address is reported before anything else starts.
    pub async fn bind(self) -> Result<BoundStatusServer, anyhow::Error> {
        let listener = TcpListener::bind(self.bind)
            .await
            .with_context(|| format!("Failed to bind status server on {}", self.bind))?;
        Ok(BoundStatusServer { listener, state: self.state })
    }
}

/// A status server holding its listener.
pub struct BoundStatusServer {
    listener: TcpListener,
    state: StatusState,
}

impl BoundStatusServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), anyhow::Error> {
        info!(addr = %self.local_addr()?, "Status server listening");
        axum::serve(self.listener, StatusServer::create_router(self.state))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        Ok(())
    }
}
