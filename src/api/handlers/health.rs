use axum::Json;

use crate::api::schema::health::PingResponse;

/// 健康检查接口，不经过限流
pub async fn ping() -> Json<PingResponse> {
    let now = chrono::Utc::now();

    Json(PingResponse {
        status: "ok".to_string(),
        timestamp: now.timestamp(),
    })
}
