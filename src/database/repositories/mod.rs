/// 数据库存储库
pub mod user;

pub use user::{PgUserStore, UserStore};
