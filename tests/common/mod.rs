#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    extract::ConnectInfo,
    http::{Request, Response, StatusCode, header},
};
use chrono::Utc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use user_service::{
    AppState,
    cache::{AdmissionLimiter, LimiterSettings},
    config::Config,
    database::{NewUser, StoreError, User, UserStore},
    router,
};

/// 挂起一次读取：`entered` 在读到行之后通知，`release` 放行
#[derive(Default)]
pub struct ReadGate {
    pub entered: Notify,
    pub release: Notify,
}

/// 内存中的用户存储，可切换到写入失败模式，也可以挂起下一次按 id 读取
#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<BTreeMap<i64, User>>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
    read_gate: Mutex<Option<Arc<ReadGate>>>,
}

impl MemoryStore {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// 下一次 `find_by_id` 读到行后停住，直到 `release` 被通知
    pub fn hold_next_read(&self) -> Arc<ReadGate> {
        let gate = Arc::new(ReadGate::default());
        *self.read_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn get(&self, id: i64) -> Option<User> {
        self.users.lock().get(&id).cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.check_writable()?;
        let mut users = self.users.lock();
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let created = User {
            id,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(id, created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let row = self.get(id);

        let gate = self.read_gate.lock().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }

        Ok(row)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.users.lock().values().cloned().collect())
    }

    async fn update(&self, id: i64, user: NewUser) -> Result<Option<User>, StoreError> {
        self.check_writable()?;
        let mut users = self.users.lock();
        if users.values().any(|u| u.id != id && u.email == user.email) {
            return Err(StoreError::Conflict);
        }

        Ok(users.get_mut(&id).map(|existing| {
            existing.name = user.name;
            existing.email = user.email;
            existing.password_hash = user.password_hash;
            existing.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.users.lock().remove(&id).is_some())
    }
}

pub fn test_config(max_requests: u32) -> Config {
    config_with(&[("RATE_LIMIT_REQUESTS", &max_requests.to_string())])
}

/// 在测试默认值之上覆盖部分配置项
pub fn config_with(overrides: &[(&str, &str)]) -> Config {
    Config::from_lookup(|key| {
        if let Some((_, value)) = overrides.iter().find(|(k, _)| *k == key) {
            return Some(value.to_string());
        }
        match key {
            "DATABASE_URL" => Some("postgres://localhost/unused".to_string()),
            "RATE_LIMIT_REQUESTS" => Some("1000".to_string()),
            "BCRYPT_COST" => Some("4".to_string()),
            _ => None,
        }
    })
    .expect("test config is valid")
}

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_limit(1_000)
    }

    pub fn with_limit(max_requests: u32) -> Self {
        Self::with_config(test_config(max_requests))
    }

    /// 使用自定义限流参数（例如毫秒级窗口）
    pub fn with_settings(settings: LimiterSettings) -> Self {
        let store = Arc::new(MemoryStore::default());
        let mut state = AppState::new(store.clone(), test_config(settings.max_requests));
        state.limiter = AdmissionLimiter::new(settings);
        let app = router::app(state.clone());
        Self { app, state, store }
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::default());
        let state = AppState::new(store.clone(), config);
        let app = router::app(state.clone());
        Self { app, state, store }
    }

    pub async fn send(&self, req: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(req).await.expect("router is infallible")
    }

    /// 在后台发送请求，用于构造并发场景
    pub fn spawn_send(&self, req: Request<Body>) -> JoinHandle<Response<Body>> {
        let app = self.app.clone();
        tokio::spawn(async move { app.oneshot(req).await.expect("router is infallible") })
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// 模拟来自指定地址的连接
pub fn from_peer(mut req: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

pub async fn read_json<T: DeserializeOwned>(res: Response<Body>) -> T {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn error_message(res: Response<Body>) -> String {
    let body: serde_json::Value = read_json(res).await;
    body["error"].as_str().unwrap_or_default().to_string()
}

pub fn assert_status(res: &Response<Body>, expected: StatusCode) {
    assert_eq!(res.status(), expected, "unexpected status");
}
