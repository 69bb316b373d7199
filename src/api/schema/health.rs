use serde::{Deserialize, Serialize};

/// Ping响应
#[derive(Debug, Serialize, Deserialize)]
pub struct PingResponse {
    /// 服务状态
    pub status: String,
    /// 服务器时间
    pub timestamp: i64,
}
