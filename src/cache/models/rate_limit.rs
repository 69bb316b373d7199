use std::time::{Duration, Instant};

/// 限流参数，启动时确定，所有客户端共用
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterSettings {
    /// 计数窗口长度
    pub window: Duration,
    /// 窗口内允许的最大请求数
    pub max_requests: u32,
    /// 后台清理任务的执行间隔
    pub sweep_interval: Duration,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// 准入判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// 单个客户端在当前窗口内的请求计数
///
/// 窗口从该客户端第一次被放行的请求开始计时，过期后在下一次请求时重置。
#[derive(Debug, Clone, Copy)]
pub struct ClientWindowCounter {
    pub count: u32,
    pub window_start: Instant,
    /// 本窗口内被拒绝的次数，不计入 `count`
    pub denied: u32,
}

impl ClientWindowCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
            denied: 0,
        }
    }

    pub fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    pub fn reset(&mut self, now: Instant) {
        self.count = 0;
        self.window_start = now;
        self.denied = 0;
    }

    /// 记录一次拒绝，返回是否为本窗口内的第一次
    pub fn record_denial(&mut self) -> bool {
        self.denied = self.denied.saturating_add(1);
        self.denied == 1
    }
}
