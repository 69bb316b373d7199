// API 数据传输对象模块
// 包含所有与客户端交互的数据结构

pub mod health;
pub mod user;

// 重新导出常用类型
pub use health::PingResponse;
pub use user::{UserInfo, UserRequest};
