use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use tracing::error;

use crate::accounts::AccountError;
use crate::catalog::CatalogError;
use crate::search::CredentialError;
use crate::types::ErrorResponse;
use crate::visits::VisitError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Visit(#[from] VisitError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("session store failed: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Catalog(CatalogError::UnknownCategory(_)) => StatusCode::NOT_FOUND,
            AppError::Catalog(_) => StatusCode::BAD_REQUEST,
            AppError::Account(AccountError::InvalidCredentials | AccountError::NotLoggedIn) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Account(AccountError::Salt) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Account(_) => StatusCode::BAD_REQUEST,
            AppError::Credential(_) | AppError::Visit(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
