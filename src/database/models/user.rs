use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// 用户数据库实体
///
/// 只由存储层构造：每个实例都对应数据库已确认的一行。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// 写入数据库的用户数据，密码已经过哈希
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}
