use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tower_sessions::Session;
use tracing::info;
use uuid::Uuid;

use crate::accounts::{AccountError, RegisterForm, UserProfile, AUTH_USER_KEY};
use crate::error::AppError;
use crate::search::DEFAULT_RESULT_SIZE;
use crate::session::SessionState;
use crate::types::*;
use crate::visits::{update_visits, VisitState, LAST_VISIT_KEY, VISITS_KEY};
use crate::AppState;

const TOP_N: usize = 5;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "rango",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Runs the visit tracker against the caller's session and writes the result back.
async fn track_visit(session: &Session) -> Result<VisitState, AppError> {
    let mut state = SessionState::load(session, &[VISITS_KEY, LAST_VISIT_KEY]).await?;
    let visit = update_visits(&mut state)?;
    state.store(session).await?;
    Ok(visit)
}

/// The logged-in user, if the session names one that still exists.
async fn current_user(state: &AppState, session: &Session) -> Result<Option<UserProfile>, AppError> {
    let id = session
        .get::<String>(AUTH_USER_KEY)
        .await?
        .and_then(|raw| Uuid::parse_str(&raw).ok());
    Ok(match id {
        Some(id) => state.accounts.user(id).await,
        None => None,
    })
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<IndexResponse>, AppError> {
    let visit = track_visit(&session).await?;
    Ok(Json(IndexResponse {
        categories: state.catalog.top_categories(TOP_N).await,
        pages: state.catalog.top_pages(TOP_N).await,
        visits: visit.visits,
    }))
}

pub async fn about(session: Session) -> Result<Json<AboutResponse>, AppError> {
    let visit = track_visit(&session).await?;
    Ok(Json(AboutResponse { visits: visit.visits }))
}

pub async fn add_category(
    State(state): State<Arc<AppState>>,
    Json(form): Json<CategoryForm>,
) -> Result<impl IntoResponse, AppError> {
    let category = state.catalog.add_category(&form.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn show_category(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = state
        .catalog
        .category(&slug)
        .await
        .ok_or_else(|| crate::catalog::CatalogError::UnknownCategory(slug.clone()))?;
    let pages = state.catalog.pages_for(&slug).await;
    Ok(Json(CategoryResponse { category, pages }))
}

pub async fn add_page(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(form): Json<PageForm>,
) -> Result<impl IntoResponse, AppError> {
    let page = state.catalog.add_page(&slug, &form.title, &form.url).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.query.unwrap_or_default().trim().to_string();
    let results = if query.is_empty() {
        Vec::new()
    } else {
        state.search.run_query(&query, DEFAULT_RESULT_SIZE).await?
    };
    info!("Search for {:?} produced {} results", query, results.len());
    Ok(Json(SearchResponse { query, results }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let profile = state.accounts.register(form).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn user_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = match state.accounts.authenticate(&form.username, &form.password).await {
        Ok(user) => user,
        Err(e) => {
            info!("Invalid login details: {}", form.username);
            return Err(e.into());
        }
    };
    session.cycle_id().await?;
    session.insert(AUTH_USER_KEY, user.id.to_string()).await?;
    info!("User {} logged in", user.username);
    Ok(Json(LoginResponse {
        username: user.username,
    }))
}

pub async fn restricted(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<RestrictedResponse>, AppError> {
    let user = current_user(&state, &session)
        .await?
        .ok_or(AccountError::NotLoggedIn)?;
    Ok(Json(RestrictedResponse {
        username: user.username,
        message: "Since you're logged in, you can see this text!".to_string(),
    }))
}

pub async fn user_logout(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<StatusCode, AppError> {
    let user = current_user(&state, &session)
        .await?
        .ok_or(AccountError::NotLoggedIn)?;
    session.flush().await?;
    info!("User {} logged out", user.username);
    Ok(StatusCode::OK)
}
