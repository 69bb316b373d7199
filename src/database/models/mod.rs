/// 数据库实体定义
pub mod user;

pub use user::{NewUser, User};
