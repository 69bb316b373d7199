use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::database::StoreError;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Validation(String),
    NotFound(i64),
    Conflict,
    RateLimited,
    Timeout,
    Internal,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        match self {
            AppError::BadRequest(msg) | AppError::Validation(msg) => msg.clone(),
            AppError::NotFound(id) => format!("User with ID {} not found", id),
            AppError::Conflict => "User already exists".to_string(),
            AppError::RateLimited => "Rate limit exceeded".to_string(),
            AppError::Timeout => "Request timed out".to_string(),
            AppError::Internal => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message(),
        });

        (self.status(), body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AppError::Conflict,
            StoreError::Database(e) => {
                // 数据库细节只进日志，不返回给客户端
                tracing::error!("Storage failure: {}", e);
                AppError::Internal
            }
        }
    }
}
