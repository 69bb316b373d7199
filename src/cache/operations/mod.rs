/// 缓存操作
// 用户读缓存
pub mod user;

// 按客户端限流及其后台清理
pub mod rate_limit;
pub mod sweeper;

pub use rate_limit::AdmissionLimiter;
pub use sweeper::SweeperHandle;
pub use user::{EntityCache, FillTicket, WriteGuard};
