use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use axum::Router;
use tracing::{info, warn};

pub mod api;
pub mod config;
pub mod error;
pub mod query;
pub mod storage;
pub mod validation;

use config::Config;
use error::ApiError;
use storage::RecordStore;

/// Shared handler state. One lock guards the whole store.
pub struct AppState {
    pub records: Mutex<RecordStore>,
}

impl AppState {
    pub fn new(store: RecordStore) -> Self {
        Self {
            records: Mutex::new(store),
        }
    }

    pub fn store(&self) -> Result<MutexGuard<'_, RecordStore>, ApiError> {
        self.records
            .lock()
            .map_err(|_| ApiError::Internal(anyhow::anyhow!("record store lock poisoned")))
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    api::router(state)
}

pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let store = if config.seed_data {
        RecordStore::with_seed_data()
    } else {
        RecordStore::new()
    };
    info!(
        environment = config.environment.as_str(),
        debug = config.environment.debug(),
        locations = store.len(),
        "starting weather api"
    );
    let state = Arc::new(AppState::new(store));

    // broadcast channel for shutdown signaling
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let http_shutdown = shutdown_tx.subscribe();
    let mut server = tokio::spawn(api::http::run(state, config.listen_addr, http_shutdown));

    tokio::select! {
        res = &mut server => return res.context("server task failed")?,
        _ = shutdown_signal() => {}
    }

    info!("shutdown signal received");
    if shutdown_tx.send(()).is_err() {
        warn!("server already stopped");
    }
    server.await.context("server task failed")?
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
