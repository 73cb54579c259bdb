pub mod accounts;
pub mod catalog;
pub mod config;
pub mod error;
pub mod routes;
pub mod search;
pub mod session;
pub mod types;
pub mod visits;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use types::*;

#[derive(Debug)]
pub struct AppState {
    pub search: search::SearchGateway,
    pub catalog: catalog::Catalog,
    pub accounts: accounts::Accounts,
    pub session_idle: Duration,
}

impl AppState {
    pub fn new(config: &config::Config, http_client: reqwest::Client) -> Self {
        Self {
            search: search::SearchGateway::new(
                http_client,
                config.search_url.clone(),
                config.search_key_path.clone(),
            ),
            catalog: catalog::Catalog::new(),
            accounts: accounts::Accounts::new(),
            session_idle: config.session_idle,
        }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health_check))
        .route("/rango/", get(routes::index))
        .route("/rango/about/", get(routes::about))
        .route("/rango/add_category/", post(routes::add_category))
        .route("/rango/category/:slug/", get(routes::show_category))
        .route("/rango/category/:slug/add_page/", post(routes::add_page))
        .route("/rango/search/", get(routes::search))
        .route("/rango/register/", post(routes::register))
        .route("/rango/login/", post(routes::user_login))
        .route("/rango/restricted/", get(routes::restricted))
        .route("/rango/logout/", get(routes::user_logout))
        .layer(session::layer(state.session_idle))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
