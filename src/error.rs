use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

/// Why a cart could not be turned into an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionFailure {
    MissingCart,
    MissingShippingAddress,
    EmptyCart,
}

impl PreconditionFailure {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreconditionFailure::MissingCart => "Cart not found",
            PreconditionFailure::MissingShippingAddress => "Shipping address not found",
            PreconditionFailure::EmptyCart => "Cart is empty",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{}", .0.as_str())]
    PreconditionFailed(PreconditionFailure),

    #[error("Failed to create order")]
    OrderCreationFailed,

    #[error("Validation failed")]
    ValidationFailed(BTreeMap<String, String>),

    #[error("Failed to fetch addresses")]
    AddressLookupFailed,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::OrderCreationFailed
            | AppError::AddressLookupFailed
            | AppError::DbError(_)
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<BTreeMap<String, String>>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let message = self.to_string();
        let fields = match self {
            AppError::ValidationFailed(fields) => Some(fields),
            _ => None,
        };

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData {
                error: message,
                fields,
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_failures_are_distinguishable() {
        let missing_cart = AppError::PreconditionFailed(PreconditionFailure::MissingCart);
        let missing_address =
            AppError::PreconditionFailed(PreconditionFailure::MissingShippingAddress);

        assert_eq!(missing_cart.status(), StatusCode::PRECONDITION_FAILED);
        assert_eq!(missing_address.status(), StatusCode::PRECONDITION_FAILED);
        assert_ne!(missing_cart.to_string(), missing_address.to_string());
        assert_eq!(
            AppError::PreconditionFailed(PreconditionFailure::EmptyCart).to_string(),
            "Cart is empty"
        );
    }

    #[tokio::test]
    async fn validation_failure_renders_field_messages() {
        let mut fields = BTreeMap::new();
        fields.insert("cpf".to_string(), "invalid CPF".to_string());

        let response = AppError::ValidationFailed(fields).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["data"]["fields"]["cpf"], "invalid CPF");
    }

    #[test]
    fn unauthorized_maps_to_401() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::OrderCreationFailed.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
