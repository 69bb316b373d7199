use std::sync::Arc;

use cache::{AdmissionLimiter, EntityCache};
use config::Config;
use database::UserStore;

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod middleware;
pub mod router;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub cache: EntityCache,
    pub limiter: AdmissionLimiter,
    pub config: Config,
}

impl AppState {
    /// 按配置创建空缓存和限流器；后台清理任务由调用方启动
    pub fn new(store: Arc<dyn UserStore>, config: Config) -> Self {
        Self {
            store,
            cache: EntityCache::new(),
            limiter: AdmissionLimiter::new(config.limiter_settings()),
            config,
        }
    }
}
