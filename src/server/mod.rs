//! HTTP server
//!
//! Serves the static client, accepts archive and photo uploads, and exposes
//! the transfer and listing endpoints used by the client's sync pages.

pub mod about;
pub mod routes;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Local};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

use crate::config::Config;
use crate::store::{RecordStore, StoreError};
use crate::transfer::{RemoteExporter, TransferError};

/// State shared across handlers
pub struct AppState {
    pub config: Config,
    pub store: Arc<RecordStore>,
    pub exporter: RemoteExporter,
    /// Held by any request that uses the temporary archive path
    pub transfer_lock: Mutex<()>,
    pub started_at: DateTime<Local>,
}

pub type SharedState = Arc<AppState>;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, StartupError> {
        let store = RecordStore::open(&config.store.upload_dir)?;
        let exporter = RemoteExporter::new(Duration::from_secs(config.export.timeout_secs))?;
        Ok(Self {
            config,
            store: Arc::new(store),
            exporter,
            transfer_lock: Mutex::new(()),
            started_at: Local::now(),
        })
    }
}

/// Create the application router
pub fn create_router(state: SharedState) -> Router {
    let app_files = ServeDir::new(&state.config.store.app_dir);
    let uploads = ServeDir::new(state.store.root());
    let body_limit = state.config.max_upload_bytes();

    Router::new()
        // Transfers
        .route(
            "/",
            post(routes::upload_archive).fallback_service(app_files.clone()),
        )
        .route("/photo/:subject", post(routes::upload_photo))
        .route("/getZip", get(routes::get_zip))
        .route("/export", get(routes::export))
        // Listings
        .route("/listPics", get(routes::list_pics))
        .route("/getPitResultNames", get(routes::pit_result_names))
        .route("/getMatchResultNames", get(routes::match_result_names))
        .route("/getNoteNames", get(routes::note_names))
        .route("/getImageNames", get(routes::image_names))
        // Diagnostics
        .route("/about", get(about::about))
        .route("/health", get(routes::health))
        .route("/scripts/keys.js", get(routes::keys_js))
        // Static files
        .nest_service("/uploads", uploads)
        .fallback_service(app_files)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits
pub async fn run(config: Config) -> anyhow::Result<()> {
    let ip: IpAddr = config.server.addr.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));

    let state = Arc::new(AppState::new(config)?);
    info!(
        uploads = %state.store.root().display(),
        app = %state.config.store.app_dir.display(),
        password = state.config.password().is_some(),
        "Record store ready"
    );

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
