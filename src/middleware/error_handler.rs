use axum::{
    BoxError,
    body::{Body, to_bytes},
    http::Request,
    middleware::Next,
    response::Response,
};
use tower::timeout::error::Elapsed;
use tracing::error;

use crate::error::AppError;

// 错误响应体都很小，超过上限就不再记录内容
const MAX_LOGGED_BODY: usize = 64 * 1024;

pub async fn log_errors(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let response = next.run(req).await;

    if response.status().is_server_error() {
        let (mut parts, body) = response.into_parts();
        let bytes = match to_bytes(body, MAX_LOGGED_BODY).await {
            Ok(b) => b,
            Err(e) => {
                error!("Failed to read error response body: {}", e);
                return Response::from_parts(parts, Body::empty());
            }
        };
        let body_str = String::from_utf8_lossy(&bytes);

        error!(
            "Server error occurred - {} {} - Status: {}, Body: {}",
            method, uri, parts.status, body_str
        );

        // 重置body以便重新构建响应
        parts.headers.remove(axum::http::header::CONTENT_LENGTH);
        Response::from_parts(parts, Body::from(bytes))
    } else {
        response
    }
}

/// 把超时层的错误转换成统一的 JSON 错误响应
pub async fn handle_timeout(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::Timeout
    } else {
        error!("Unhandled middleware error: {}", err);
        AppError::Internal
    }
}
