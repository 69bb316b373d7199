/// 缓存数据模型
// 限流计数模型
pub mod rate_limit;

pub use rate_limit::{ClientWindowCounter, Decision, LimiterSettings};
