//! HTTP surface.
//!
//! ```text
//! GET /               {"message": "Dining Hall API", "total_items": n}
//! GET /api/foods      [ResolvedItem, ...]
//! GET /api/reload     {"message": "Data reloaded", "total_items": n}
//! GET /images/{file}  static file from the images directory
//! ```
//!
//! Every route answers 200; load failures only show up in the logs and in
//! `total_items`. The load pipeline is blocking (filesystem plus generator
//! HTTP calls), so handlers hand it to `spawn_blocking`.

use crate::catalog::{Catalog, RELOADED_MESSAGE, Status};
use crate::types::ResolvedItem;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Build the application router around a shared catalog.
pub fn router(catalog: Arc<Catalog>) -> Router {
    let images = &catalog.config().images;
    let static_files = ServeDir::new(&images.dir);
    let mount = images.mount.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(status_handler))
        .route("/api/foods", get(foods_handler))
        .route("/api/reload", get(reload_handler))
        .nest_service(&mount, static_files)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(catalog)
}

/// Load the catalog, bind, and serve until Ctrl+C or SIGTERM.
///
/// The first load finishes before the listener is bound. A dataset error on
/// that load is logged and the service starts with an empty catalog.
pub async fn serve(catalog: Arc<Catalog>) -> Result<(), ServerError> {
    let config = catalog.config();
    std::fs::create_dir_all(&config.images.dir)?;
    let address = config.server.address();

    info!("Loading catalog...");
    let loader = Arc::clone(&catalog);
    match tokio::task::spawn_blocking(move || loader.load(None)).await? {
        Ok(stats) => info!(rows = stats.rows, "initial load complete"),
        Err(e) => error!(error = %e, "initial load failed, starting with an empty catalog"),
    }

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind {
            address: address.clone(),
            source,
        })?;
    info!("Server running on {address}");

    axum::serve(listener, router(catalog))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn status_handler(State(catalog): State<Arc<Catalog>>) -> Json<Status> {
    Json(catalog.status())
}

async fn foods_handler(State(catalog): State<Arc<Catalog>>) -> Json<Vec<ResolvedItem>> {
    Json(catalog.all())
}

async fn reload_handler(State(catalog): State<Arc<Catalog>>) -> Json<Status> {
    let reloader = Arc::clone(&catalog);
    match tokio::task::spawn_blocking(move || reloader.reload()).await {
        Ok(status) => Json(status),
        Err(e) => {
            error!(error = %e, "reload task failed");
            Json(Status {
                message: RELOADED_MESSAGE,
                total_items: catalog.status().total_items,
            })
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to install signal handler");
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
