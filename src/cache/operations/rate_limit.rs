use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use dashmap::DashMap;

use crate::cache::models::rate_limit::{ClientWindowCounter, Decision, LimiterSettings};

/// 进程内按客户端限流
///
/// 每个客户端一个固定窗口计数器，窗口从第一次放行的请求开始；
/// 过期的计数在下一次请求时原地重置，后台清理任务只负责回收内存。
/// 克隆共享同一份计数表。
#[derive(Clone)]
pub struct AdmissionLimiter {
    inner: Arc<LimiterInner>,
}

struct LimiterInner {
    settings: LimiterSettings,
    counters: DashMap<String, ClientWindowCounter>,
    fail_open: AtomicBool,
}

impl AdmissionLimiter {
    pub fn new(settings: LimiterSettings) -> Self {
        Self {
            inner: Arc::new(LimiterInner {
                settings,
                counters: DashMap::new(),
                fail_open: AtomicBool::new(false),
            }),
        }
    }

    pub fn settings(&self) -> &LimiterSettings {
        &self.inner.settings
    }

    /// 判定一次请求是否放行，放行时计数加一
    pub fn admit(&self, client: &str) -> Decision {
        if self.is_fail_open() {
            return Decision::Allow;
        }

        let now = Instant::now();

        // 已知客户端走 get_mut，避免每次请求都分配 key
        if let Some(mut counter) = self.inner.counters.get_mut(client) {
            return self.decide(client, counter.value_mut(), now);
        }

        // entry 持有分片写锁，并发的首次请求不会互相覆盖
        let mut counter = self
            .inner
            .counters
            .entry(client.to_owned())
            .or_insert_with(|| ClientWindowCounter::new(now));
        self.decide(client, counter.value_mut(), now)
    }

    fn decide(&self, client: &str, counter: &mut ClientWindowCounter, now: Instant) -> Decision {
        let settings = &self.inner.settings;

        if counter.is_expired(now, settings.window) {
            counter.reset(now);
        }

        if counter.count >= settings.max_requests {
            // 每个窗口只告警一次，后续拒绝降为 debug
            if counter.record_denial() {
                tracing::warn!(client, count = counter.count, "rate limit exceeded");
            } else {
                tracing::debug!(client, denied = counter.denied, "request denied");
            }
            return Decision::Deny;
        }

        counter.count += 1;
        tracing::debug!(client, count = counter.count, "request admitted");
        Decision::Allow
    }

    /// 当前窗口内剩余可用次数
    pub fn remaining(&self, client: &str) -> u32 {
        let settings = &self.inner.settings;
        match self.inner.counters.get(client) {
            Some(counter) if !counter.is_expired(Instant::now(), settings.window) => {
                settings.max_requests.saturating_sub(counter.count)
            }
            _ => settings.max_requests,
        }
    }

    /// 删除窗口已过期的计数，返回删除条数
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let window = self.inner.settings.window;
        let mut removed = 0;

        // retain 在分片锁内判断，与 admit 的读-改-写互斥
        self.inner.counters.retain(|_, counter| {
            let keep = !counter.is_expired(now, window);
            if !keep {
                removed += 1;
            }
            keep
        });

        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.inner.counters.len()
    }

    pub fn is_fail_open(&self) -> bool {
        self.inner.fail_open.load(Ordering::Acquire)
    }

    /// 后台任务崩溃后放开限流，宁可放行也不拒绝全部请求
    pub(crate) fn enter_fail_open(&self) {
        self.inner.fail_open.store(true, Ordering::Release);
    }
}
