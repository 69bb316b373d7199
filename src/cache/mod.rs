// 缓存模块
// 进程内的用户读缓存与请求限流计数，均在启动时创建一次并注入到各处

pub mod models;
pub mod operations;

pub use models::rate_limit::{ClientWindowCounter, Decision, LimiterSettings};
pub use operations::{AdmissionLimiter, EntityCache, FillTicket, SweeperHandle, WriteGuard};
