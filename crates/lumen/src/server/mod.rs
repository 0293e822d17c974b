//! HTTP front end.
//!
//! A synchronous `tiny_http` accept loop hands every request to its own
//! thread. Handlers bridge into the tokio runtime with `Handle::block_on`, so
//! the pipeline still runs on the blocking pool under its deadline and storage
//! calls stay async. At most `server.max_in_flight` requests are handled at
//! once; the rest are answered with 503 straight from the accept loop.

mod routes;

use lumen_core::config::ServerConfig;
use lumen_core::ThumbnailService;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub use routes::{dispatch, reject_busy};

/// State shared by all request threads.
pub struct AppState {
    pub service: ThumbnailService,
    pub server: ServerConfig,
    pub runtime: Handle,
    permits: Arc<Semaphore>,
}

impl AppState {
    pub fn new(service: ThumbnailService, server: ServerConfig, runtime: Handle) -> Self {
        let permits = Arc::new(Semaphore::new(server.max_in_flight));
        Self {
            service,
            server,
            runtime,
            permits,
        }
    }

    /// Claim a request slot, or `None` when `max_in_flight` are taken.
    pub fn try_admit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.permits).try_acquire_owned().ok()
    }

    /// Largest accepted request body, in bytes.
    pub fn max_body_bytes(&self) -> u64 {
        self.server.max_body_mb * 1024 * 1024
    }
}

/// Serve requests until the listener shuts down.
pub fn run(listener: tiny_http::Server, state: Arc<AppState>) {
    for request in listener.incoming_requests() {
        let Some(permit) = state.try_admit() else {
            reject_busy(request, &state);
            continue;
        };
        let state = Arc::clone(&state);
        std::thread::spawn(move || {
            dispatch(request, &state);
            drop(permit);
        });
    }
    tracing::info!("HTTP listener closed");
}
