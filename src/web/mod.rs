pub mod handlers;
pub mod templates;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::tracker::Tracker;

/// Shared state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tracker: Tracker,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            tracker: Tracker::new(config.tracker_path.clone()),
            config: Arc::new(config),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::dashboard))
        .route("/jobs", get(handlers::jobs_list))
        .route("/jobs/new", get(handlers::job_new_form).post(handlers::job_create))
        .route("/jobs/:index", get(handlers::job_detail))
        .route("/jobs/:index/edit", get(handlers::job_edit_form).post(handlers::job_update))
        .route("/jobs/:index/delete", post(handlers::job_delete))
        .route("/jobs/:index/hide", post(handlers::job_hide))
        .route("/jobs/:index/unhide", post(handlers::job_unhide))
        .route("/documents", get(handlers::documents_index))
        .route("/documents/view", get(handlers::document_view))
        .route("/documents/download/*filename", get(handlers::document_download))
        .route("/base-resume", get(handlers::base_resume))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: Config) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let app = build_router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on http://{addr}");
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
