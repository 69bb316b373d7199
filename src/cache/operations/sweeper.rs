use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use super::rate_limit::AdmissionLimiter;

/// 后台清理任务句柄，关闭服务时调用 `shutdown`
pub struct SweeperHandle {
    sweep: AbortHandle,
    supervisor: JoinHandle<()>,
}

impl SweeperHandle {
    pub fn is_running(&self) -> bool {
        !self.supervisor.is_finished()
    }

    pub async fn shutdown(self) {
        self.sweep.abort();
        if let Err(e) = self.supervisor.await {
            tracing::warn!("Rate limit sweeper supervisor ended abnormally: {}", e);
        }
    }
}

impl AdmissionLimiter {
    /// 启动唯一的后台清理任务，按 `sweep_interval` 回收过期计数
    pub fn spawn_sweeper(&self) -> SweeperHandle {
        self.spawn_supervised(self.settings().sweep_interval, AdmissionLimiter::sweep)
    }

    /// 周期执行 `job`；任务 panic 时由监督任务记录并让限流器放行所有请求
    pub(crate) fn spawn_supervised<F>(&self, interval: Duration, job: F) -> SweeperHandle
    where
        F: Fn(&AdmissionLimiter) -> usize + Send + 'static,
    {
        let limiter = self.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成，跳过
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = job(&limiter);
                tracing::info!(
                    removed,
                    tracked = limiter.tracked_clients(),
                    "Rate limit sweep finished"
                );
            }
        });

        let sweep = task.abort_handle();
        let limiter = self.clone();
        let supervisor = tokio::spawn(async move {
            match task.await {
                Err(e) if e.is_panic() => {
                    tracing::error!(
                        "Rate limit sweeper panicked, admitting all requests from now on: {}",
                        e
                    );
                    limiter.enter_fail_open();
                }
                Err(_) => tracing::debug!("Rate limit sweeper stopped"),
                Ok(()) => {}
            }
        });

        SweeperHandle { sweep, supervisor }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::models::rate_limit::{Decision, LimiterSettings};

    fn settings(window_ms: u64, sweep_ms: u64) -> LimiterSettings {
        LimiterSettings {
            window: Duration::from_millis(window_ms),
            max_requests: 1,
            sweep_interval: Duration::from_millis(sweep_ms),
        }
    }

    #[tokio::test]
    async fn sweeper_reclaims_expired_clients() {
        let limiter = AdmissionLimiter::new(settings(20, 10));
        let handle = limiter.spawn_sweeper();

        for i in 0..5 {
            limiter.admit(&format!("10.0.0.{i}"));
        }
        assert_eq!(limiter.tracked_clients(), 5);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(limiter.tracked_clients(), 0);
        assert!(handle.is_running());
        handle.shutdown().await;
        assert!(!limiter.is_fail_open());
    }

    #[tokio::test]
    async fn panicking_sweep_fails_open() {
        let limiter = AdmissionLimiter::new(settings(60_000, 10));
        limiter.admit("10.0.0.9");
        assert_eq!(limiter.admit("10.0.0.9"), Decision::Deny);

        let handle = limiter.spawn_supervised(Duration::from_millis(10), |_| {
            panic!("sweep blew up");
        });

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(limiter.is_fail_open());
        assert!(!handle.is_running());
        assert_eq!(limiter.admit("10.0.0.9"), Decision::Allow);
    }

    #[tokio::test]
    async fn shutdown_does_not_trigger_fail_open() {
        let limiter = AdmissionLimiter::new(settings(60_000, 10));
        let handle = limiter.spawn_sweeper();

        handle.shutdown().await;

        assert!(!limiter.is_fail_open());
        assert_eq!(limiter.admit("10.0.0.10"), Decision::Allow);
        assert_eq!(limiter.admit("10.0.0.10"), Decision::Deny);
    }
}
