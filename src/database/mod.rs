// 数据库模块
// 包含数据库实体定义和存储库操作

pub mod models; // 数据库实体定义
pub mod repositories; // 存储库实现

use sqlx::Executor;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

// 重新导出常用类型和函数，方便其他模块使用
pub use models::user::{NewUser, User};
pub use repositories::user::{PgUserStore, UserStore};

/// 存储层错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a user with this email already exists")]
    Conflict,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Database(e)
    }
}

/// 按配置建立连接池并执行内置迁移
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .max_lifetime(config.db_max_lifetime())
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'user_service';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}
