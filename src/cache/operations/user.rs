use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::database::models::user::User;

/// 用户读缓存
///
/// 读请求先查缓存，未命中时从数据库读取后回填；写请求在数据库确认成功后
/// 用返回的行更新或删除缓存。`set` 只接受数据库返回的 [`User`]，请求体
/// 类型无法写入。
///
/// 回填和写入都要和并发写入排序：
/// - 读路径在查库前取 [`FillTicket`]，之后只要有任何写入开始或结束，回填就作废；
/// - 写路径在写库前调用 [`EntityCache::begin_write`]，同一 id 上有重叠的写入时
///   数据库的最终顺序无法确定，所有重叠的写入结束时都只删除条目。
///
/// 写入多时回填会更常被丢弃，只影响命中率。
///
/// 没有容量上限和过期策略，条目数随访问过的用户数增长。
#[derive(Clone, Default)]
pub struct EntityCache {
    state: Arc<RwLock<CacheState>>,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<i64, User>,
    // 进行中的写入，计数归零时移除
    writes: HashMap<i64, PendingWrites>,
    // 每次写入开始、结束以及直接的 set/delete 都递增
    sequence: u64,
}

#[derive(Default)]
struct PendingWrites {
    count: usize,
    contended: bool,
}

/// 查库前取得的回填凭证
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTicket(u64);

/// 写库的结果，决定写入结束时如何处理缓存
enum WriteOutcome {
    Stored(User),
    Absent,
    Unchanged,
    Unknown,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: i64) -> Option<User> {
        let user = self.state.read().entries.get(&id).cloned();
        match &user {
            Some(_) => tracing::debug!(id, "user cache hit"),
            None => tracing::debug!(id, "user cache miss"),
        }
        user
    }

    /// 以 `user.id` 为键写入，后写覆盖先写
    pub fn set(&self, user: User) {
        let id = user.id;
        let mut state = self.state.write();
        state.sequence += 1;
        state.entries.insert(id, user);
        tracing::debug!(id, "user cached");
    }

    pub fn delete(&self, id: i64) {
        let mut state = self.state.write();
        state.sequence += 1;
        if state.entries.remove(&id).is_some() {
            tracing::debug!(id, "user evicted from cache");
        }
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    /// 读库前调用，取得之后回填用的凭证
    pub fn fill_ticket(&self) -> FillTicket {
        FillTicket(self.state.read().sequence)
    }

    /// 用查库得到的行回填
    ///
    /// 取凭证之后有写入开始或结束，或者该 id 上仍有写入未完成时放弃回填，
    /// 返回是否写入了缓存。
    pub fn fill(&self, user: User, ticket: FillTicket) -> bool {
        let id = user.id;
        let mut state = self.state.write();
        if state.sequence != ticket.0 || state.writes.contains_key(&id) {
            tracing::debug!(id, "stale user cache fill dropped");
            return false;
        }

        state.entries.insert(id, user);
        tracing::debug!(id, "user cached");
        true
    }

    /// 写库前调用，返回的守卫必须以写库结果结束
    ///
    /// 守卫未结束就被丢弃（例如请求超时被取消）时按结果未知处理，删除条目。
    pub fn begin_write(&self, id: i64) -> WriteGuard {
        let mut state = self.state.write();
        state.sequence += 1;
        let pending = state.writes.entry(id).or_default();
        if pending.count > 0 {
            pending.contended = true;
        }
        pending.count += 1;

        WriteGuard {
            cache: self.clone(),
            id,
            finished: false,
        }
    }

    fn end_write(&self, id: i64, outcome: WriteOutcome) {
        let mut state = self.state.write();
        state.sequence += 1;

        let (contended, done) = match state.writes.get_mut(&id) {
            Some(pending) => {
                pending.count = pending.count.saturating_sub(1);
                (pending.contended, pending.count == 0)
            }
            None => (false, true),
        };
        if done {
            state.writes.remove(&id);
        }

        match outcome {
            WriteOutcome::Stored(user) if !contended => {
                state.entries.insert(id, user);
                tracing::debug!(id, "user cached");
            }
            WriteOutcome::Unchanged => {}
            _ => {
                if state.entries.remove(&id).is_some() {
                    tracing::debug!(id, "user evicted from cache");
                }
            }
        }
    }
}

/// 一次进行中的写库操作
pub struct WriteGuard {
    cache: EntityCache,
    id: i64,
    finished: bool,
}

impl WriteGuard {
    /// 数据库确认写入，`user` 为返回的行
    pub fn stored(mut self, user: User) {
        self.finish(WriteOutcome::Stored(user));
    }

    /// 数据库确认该行不存在（已删除或本来就没有）
    pub fn absent(mut self) {
        self.finish(WriteOutcome::Absent);
    }

    /// 写库失败，数据没有变化
    pub fn unchanged(mut self) {
        self.finish(WriteOutcome::Unchanged);
    }

    fn finish(&mut self, outcome: WriteOutcome) {
        self.finished = true;
        self.cache.end_write(self.id, outcome);
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(WriteOutcome::Unknown);
        }
    }
}
