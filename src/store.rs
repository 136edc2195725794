// src/store.rs

//! 下载任务列表的唯一数据源。所有修改都走
//! 读取当前列表 → 修改 → 整体持久化 → 通知全部订阅者 这一条路径。

use crate::{
    constants,
    error::{AppError, AppResult},
    models::{CreateTaskPayload, DownloadTask, TaskPatch},
    persistence::TaskRepository,
};
use chrono::Utc;
use log::{debug, error, info};
use std::{
    collections::BTreeMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

pub type SubscriberFn = dyn Fn(&[DownloadTask]) + Send + Sync;

struct StoreState {
    /// 最新创建的任务在最前面
    tasks: Vec<DownloadTask>,
    revision: u64,
    last_created_at: i64,
    last_saved: Option<Instant>,
    /// 有进度变化还没写盘
    dirty: bool,
}

/// 持久化时机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Persist {
    Now,
    /// 距上次写盘不足 `progress_persist_interval` 时只标记为脏
    Throttled,
}

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    callbacks: BTreeMap<u64, Arc<SubscriberFn>>,
}

pub struct TaskStore {
    state: Mutex<StoreState>,
    subscribers: Arc<Mutex<Subscribers>>,
    delivered_revision: AtomicU64,
    repository: TaskRepository,
    progress_persist_interval: Duration,
}

/// 订阅句柄，调用 `unsubscribe` 或直接丢弃即取消订阅
#[must_use = "丢弃订阅句柄会立即取消订阅"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Mutex<Subscribers>>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // 实际的注销在 Drop 中完成
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .callbacks
                .remove(&self.id);
        }
    }
}

impl TaskStore {
    /// 从仓库加载已有任务，读取失败时以空列表启动
    pub fn open(repository: TaskRepository) -> Self {
        let tasks = repository.load().unwrap_or_else(|e| {
            error!("加载已保存的下载任务失败，将以空列表启动: {}", e);
            Vec::new()
        });
        info!("已加载 {} 个下载任务", tasks.len());
        let last_created_at = tasks.iter().map(|t| t.created_at).max().unwrap_or(0);
        Self {
            state: Mutex::new(StoreState {
                tasks,
                revision: 0,
                last_created_at,
                last_saved: None,
                dirty: false,
            }),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            delivered_revision: AtomicU64::new(0),
            repository,
            progress_persist_interval: Duration::from_millis(
                constants::PROGRESS_PERSIST_INTERVAL_MS,
            ),
        }
    }

    pub fn with_progress_persist_interval(mut self, interval: Duration) -> Self {
        self.progress_persist_interval = interval;
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 修改后整体保存。持久化失败只记录日志，内存中的状态仍然有效。
    fn commit(&self, state: &mut StoreState, persist: Persist) {
        state.revision += 1;
        let recent = state
            .last_saved
            .is_some_and(|at| at.elapsed() < self.progress_persist_interval);
        if persist == Persist::Throttled && recent {
            state.dirty = true;
            return;
        }
        self.save(state);
    }

    fn save(&self, state: &mut StoreState) {
        if let Err(e) = self.repository.save(&state.tasks) {
            error!("保存下载任务列表失败: {}", e);
        }
        state.last_saved = Some(Instant::now());
        state.dirty = false;
    }

    /// 把被节流的进度写盘
    pub fn flush(&self) {
        let mut state = self.lock();
        if state.dirty {
            debug!("写入被节流的任务进度");
            self.save(&mut state);
        }
    }

    pub fn snapshot(&self) -> Vec<DownloadTask> {
        self.lock().tasks.clone()
    }

    pub fn get(&self, id: &str) -> Option<DownloadTask> {
        self.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn create(&self, payload: CreateTaskPayload) -> AppResult<DownloadTask> {
        let task = self.create_quiet(payload)?;
        self.notify();
        Ok(task)
    }

    pub(crate) fn create_quiet(&self, payload: CreateTaskPayload) -> AppResult<DownloadTask> {
        let kind = payload
            .kind
            .ok_or_else(|| AppError::InvalidTask("缺少任务类型 type".into()))?;
        let title = payload.title.trim();
        if title.is_empty() {
            return Err(AppError::InvalidTask("缺少任务标题 title".into()));
        }

        let mut state = self.lock();
        // 保证 createdAt 严格递增，同一毫秒内创建的任务也有确定的先后顺序
        let created_at = Utc::now().timestamp_millis().max(state.last_created_at + 1);
        state.last_created_at = created_at;

        let base_id = payload
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| match payload.song_id.as_deref() {
                Some(song_id) if !song_id.trim().is_empty() => {
                    format!("{}-{}", kind, song_id.trim())
                }
                _ => format!("{}-{}", kind, created_at),
            });
        let id = unique_id(&state.tasks, &base_id);
        if id != base_id {
            debug!("任务 ID '{}' 已存在，改用 '{}'", base_id, id);
        }

        let task = DownloadTask {
            id,
            song_id: payload.song_id,
            title: title.to_string(),
            artist: payload.artist,
            cover_url: payload.cover_url,
            kind,
            status: payload.status.unwrap_or_default(),
            progress: payload.progress.unwrap_or(0).min(constants::progress::DONE),
            created_at,
            url: payload.url,
            path: None,
            error: None,
            ext: payload.ext,
            file_name: payload.file_name,
            mime: payload.mime,
            path_hint: payload.path_hint,
            file_size: payload.file_size,
        };
        state.tasks.insert(0, task.clone());
        self.commit(&mut state, Persist::Now);
        info!("创建下载任务 '{}' ({}): {}", task.id, task.kind, task.title);
        Ok(task)
    }

    /// 合并补丁；ID 不存在时什么也不做并返回 `None`
    pub fn update(&self, id: &str, patch: &TaskPatch) -> Option<DownloadTask> {
        let updated = self.update_quiet(id, patch);
        if updated.is_some() {
            self.notify();
        }
        updated
    }

    pub(crate) fn update_quiet(&self, id: &str, patch: &TaskPatch) -> Option<DownloadTask> {
        self.update_with(id, patch, Persist::Now)
    }

    pub(crate) fn update_with(
        &self,
        id: &str,
        patch: &TaskPatch,
        persist: Persist,
    ) -> Option<DownloadTask> {
        let mut state = self.lock();
        let task = state.tasks.iter_mut().find(|t| t.id == id)?;
        task.apply(patch);
        let updated = task.clone();
        self.commit(&mut state, persist);
        Some(updated)
    }

    /// 对每个任务调用 `f`，返回 `true` 表示该任务被修改。返回修改数量。
    pub(crate) fn modify_quiet<F>(&self, mut f: F) -> usize
    where
        F: FnMut(&mut DownloadTask) -> bool,
    {
        let mut state = self.lock();
        let mut changed = 0;
        for task in state.tasks.iter_mut() {
            if f(task) {
                changed += 1;
            }
        }
        if changed > 0 {
            self.commit(&mut state, Persist::Now);
        }
        changed
    }

    pub(crate) fn remove_quiet(&self, id: &str) -> Option<DownloadTask> {
        let mut state = self.lock();
        let index = state.tasks.iter().position(|t| t.id == id)?;
        let removed = state.tasks.remove(index);
        self.commit(&mut state, Persist::Now);
        info!("已移除下载任务 '{}'", id);
        Some(removed)
    }

    /// 只保留 pending / downloading 的任务，返回移除的数量
    pub fn clear_finished(&self) -> usize {
        let removed = {
            let mut state = self.lock();
            let before = state.tasks.len();
            state.tasks.retain(|t| t.status.is_unfinished());
            let removed = before - state.tasks.len();
            self.commit(&mut state, Persist::Now);
            removed
        };
        info!("已清除 {} 个已结束的任务", removed);
        self.notify();
        removed
    }

    /// 注册订阅者，并立即用当前列表回调一次
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[DownloadTask]) + Send + Sync + 'static,
    {
        let callback: Arc<SubscriberFn> = Arc::new(callback);
        let id = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.callbacks.insert(id, callback.clone());
            id
        };
        let current = self.snapshot();
        callback(&current);
        Subscription {
            id,
            subscribers: Arc::downgrade(&self.subscribers),
        }
    }

    /// 把最新列表推送给所有订阅者。必须在释放内部锁之后调用。
    pub(crate) fn notify(&self) {
        let (revision, tasks) = {
            let state = self.lock();
            (state.revision, state.tasks.clone())
        };
        // 已经有更新的版本推送过了，旧快照不再发送
        if self.delivered_revision.fetch_max(revision, Ordering::SeqCst) > revision {
            return;
        }
        let callbacks: Vec<Arc<SubscriberFn>> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .callbacks
            .values()
            .cloned()
            .collect();
        for callback in callbacks {
            callback(&tasks);
        }
    }
}

fn unique_id(tasks: &[DownloadTask], base: &str) -> String {
    let taken = |candidate: &str| tasks.iter().any(|t| t.id == candidate);
    if !taken(base) {
        return base.to_string();
    }
    (1u64..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
