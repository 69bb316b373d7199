use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::user::User;

// 创建/更新用户请求体；缺失字段按空字符串处理，交给校验给出提示
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// 用户信息（响应），不包含任何密码数据
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserInfo {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}
