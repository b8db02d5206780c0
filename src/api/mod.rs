use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::downloader::BatchDownloader;
use crate::search::SearchClient;

pub mod handlers;
pub mod models;

#[derive(Clone)]
pub struct AppState {
    pub search: Arc<SearchClient>,
    pub downloader: Arc<BatchDownloader>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(handlers::home_handler))
        .route("/search", get(handlers::search_handler))
        .route("/download", post(handlers::download_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
