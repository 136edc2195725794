// src/downloader/mod.rs

// 1. 声明私有子模块
mod progress;
mod worker;

// 2. DownloadManager 是调度核心：持有任务列表、并发配置和所有正在运行的工作单元
use crate::{
    client::HttpClient,
    config::{AppConfig, DownloadConfig, clamp_concurrency},
    constants,
    error::{AppError, AppResult},
    models::{CreateTaskPayload, DownloadEvent, DownloadTask, TaskPatch, TaskStatus, UpdateOptions},
    persistence::{ConfigRepository, KeyValueBackend, TaskRepository},
    storage::StorageAdapter,
    store::{Persist, Subscription, TaskStore},
};
use log::{debug, error, info, warn};
use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};
use tokio::{
    runtime::Handle,
    sync::{Notify, broadcast},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use worker::TransferWorker;

/// 一个正在运行的下载工作单元
struct ActiveWorker {
    run_id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    /// 工作单元已经结束，等待下一轮调度回收
    done: bool,
}

impl ActiveWorker {
    fn abort(&self) {
        self.cancel.cancel();
    }
}

thread_local! {
    /// 当前线程正在执行调度
    static IN_PASS: Cell<bool> = const { Cell::new(false) };
}

pub(crate) struct Inner {
    store: TaskStore,
    config_repository: ConfigRepository,
    download_config: Mutex<DownloadConfig>,
    active: Mutex<HashMap<String, ActiveWorker>>,
    /// 被用户暂停的任务。调度时跳过且不占用名额，恢复后才会重新开始。
    held: Mutex<HashSet<String>>,
    schedule_lock: Mutex<()>,
    rerun: AtomicBool,
    closed: AtomicBool,
    next_run_id: AtomicU64,
    http: HttpClient,
    storage: Arc<dyn StorageAdapter>,
    settings: Arc<AppConfig>,
    events: broadcast::Sender<DownloadEvent>,
    idle: Notify,
    runtime: Handle,
}

/// 下载调度器。每个进程构造一次，克隆后共享同一份状态。
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

impl DownloadManager {
    /// 加载持久化的任务与配置，并立即执行一轮调度（恢复上次中断的下载）。
    /// 必须在 Tokio 运行时中调用。
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        backend: Arc<dyn KeyValueBackend>,
        settings: AppConfig,
    ) -> AppResult<Self> {
        let runtime = Handle::try_current().map_err(|_| AppError::NoRuntime)?;
        let settings = Arc::new(settings);
        let http = HttpClient::new(settings.clone())?;

        let config_repository = ConfigRepository::new(backend.clone());
        let download_config = match config_repository.load() {
            Ok(Some(config)) => config,
            Ok(None) => DownloadConfig::new(settings.default_concurrency as i64),
            Err(e) => {
                warn!("读取下载配置失败，使用默认值: {}", e);
                DownloadConfig::new(settings.default_concurrency as i64)
            }
        };
        info!("下载并发数: {}", download_config.concurrency);

        let (events, _) = broadcast::channel(constants::EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            store: TaskStore::open(TaskRepository::new(backend)),
            config_repository,
            download_config: Mutex::new(download_config),
            active: Mutex::new(HashMap::new()),
            held: Mutex::new(HashSet::new()),
            schedule_lock: Mutex::new(()),
            rerun: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_run_id: AtomicU64::new(1),
            http,
            storage,
            settings,
            events,
            idle: Notify::new(),
            runtime,
        });
        inner.reschedule();
        Ok(Self { inner })
    }

    // --- 任务列表 ---

    pub fn create_download_task(&self, payload: CreateTaskPayload) -> AppResult<DownloadTask> {
        let task = self.inner.store.create(payload)?;
        self.inner.reschedule();
        Ok(task)
    }

    /// 合并补丁；任务不存在时返回 `None`
    pub fn update_download_task(
        &self,
        id: &str,
        patch: &TaskPatch,
        opts: UpdateOptions,
    ) -> Option<DownloadTask> {
        let updated = self.inner.store.update(id, patch);
        if updated.is_some() && !opts.skip_schedule {
            self.inner.reschedule();
        }
        updated
    }

    /// 中止正在进行的传输并删除任务
    pub fn remove_download_task(&self, id: &str) -> Option<DownloadTask> {
        let removed = {
            let mut active = self.inner.lock_active();
            if let Some(worker) = active.remove(id) {
                debug!("中止任务 '{}' 的传输 (run {})", id, worker.run_id);
                worker.abort();
            }
            self.inner.lock_held().remove(id);
            self.inner.store.remove_quiet(id)
        };
        if removed.is_some() {
            self.inner.store.notify();
        }
        self.inner.idle.notify_waiters();
        self.inner.reschedule();
        removed
    }

    /// 删除任务，已完成的任务同时删除下载好的文件
    pub async fn remove_download_task_with_file(&self, id: &str) -> Option<DownloadTask> {
        let removed = self.remove_download_task(id)?;
        if let Some(path) = removed.path.as_deref() {
            if removed.status == TaskStatus::Completed && !self.inner.storage.delete(path).await {
                warn!("删除任务 '{}' 的文件 '{}' 失败", id, path);
            }
        }
        Some(removed)
    }

    pub fn clear_finished_tasks(&self) -> usize {
        self.inner.store.clear_finished()
    }

    pub fn get_download_tasks(&self) -> Vec<DownloadTask> {
        self.inner.store.snapshot()
    }

    pub fn get_download_task(&self, id: &str) -> Option<DownloadTask> {
        self.inner.store.get(id)
    }

    pub fn subscribe_download_tasks<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[DownloadTask]) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(callback)
    }

    /// 曲库刷新与提示消息
    pub fn subscribe_events(&self) -> broadcast::Receiver<DownloadEvent> {
        self.inner.events.subscribe()
    }

    // --- 配置 ---

    pub fn download_config(&self) -> DownloadConfig {
        self.inner.download_config()
    }

    pub fn set_download_concurrency(&self, concurrency: i64) -> DownloadConfig {
        let config = DownloadConfig {
            concurrency: clamp_concurrency(concurrency),
        };
        *self
            .inner
            .download_config
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = config;
        if let Err(e) = self.inner.config_repository.save(&config) {
            error!("保存下载配置失败: {}", e);
        }
        info!("下载并发数设置为 {}", config.concurrency);
        self.inner.reschedule();
        config
    }

    // --- 暂停 / 恢复 ---

    /// 暂停单个任务：回到 pending 并保留进度。任务在恢复前不会被调度，
    /// 空出的名额立即交给队列中的下一个任务。
    pub fn pause_download_task(&self, id: &str) -> bool {
        let paused = {
            let mut active = self.inner.lock_active();
            if let Some(worker) = active.remove(id) {
                worker.abort();
            }
            let paused = self.inner.store.modify_quiet(|task| {
                if task.id == id && task.status == TaskStatus::Downloading {
                    task.status = TaskStatus::Pending;
                    true
                } else {
                    false
                }
            }) > 0;
            if paused {
                self.inner.lock_held().insert(id.to_string());
            }
            paused
        };
        if paused {
            info!("已暂停任务 '{}'", id);
            self.inner.store.notify();
        }
        self.inner.idle.notify_waiters();
        self.inner.reschedule();
        paused
    }

    /// 恢复单个任务：重置为 pending 并清除错误，然后调度
    pub fn resume_download_task(&self, id: &str) -> bool {
        self.inner.lock_held().remove(id);
        let resumed = self
            .inner
            .store
            .update(id, &TaskPatch::default().status(TaskStatus::Pending).clear_error())
            .is_some();
        if resumed {
            info!("已恢复任务 '{}'", id);
            self.inner.reschedule();
        }
        resumed
    }

    /// 正在下载则暂停，否则恢复。返回操作后的任务。
    pub fn toggle_download_task(&self, id: &str) -> AppResult<DownloadTask> {
        let task = self
            .inner
            .store
            .get(id)
            .ok_or_else(|| AppError::TaskNotFound(id.to_string()))?;
        if task.status == TaskStatus::Downloading {
            self.pause_download_task(id);
        } else {
            self.resume_download_task(id);
        }
        self.inner
            .store
            .get(id)
            .ok_or_else(|| AppError::TaskNotFound(id.to_string()))
    }

    /// 中止所有传输，任务回到 pending（不是 failed）并保持暂停，不立即重新调度
    pub fn pause_all_downloads(&self) -> usize {
        let paused = {
            let mut active = self.inner.lock_active();
            for (_, worker) in active.drain() {
                worker.abort();
            }
            let mut held = self.inner.lock_held();
            self.inner.store.modify_quiet(|task| {
                if task.status == TaskStatus::Downloading {
                    task.status = TaskStatus::Pending;
                    held.insert(task.id.clone());
                    true
                } else {
                    false
                }
            })
        };
        info!("已暂停 {} 个下载任务", paused);
        self.inner.store.notify();
        self.inner.idle.notify_waiters();
        paused
    }

    /// 把所有未完成的任务重置为 pending（`include_failed` 为 false 时跳过失败任务）
    pub fn start_all_downloads(&self, include_failed: bool) -> usize {
        self.inner.lock_held().clear();
        let reset = self.inner.store.modify_quiet(|task| match task.status {
            TaskStatus::Pending => task.error.take().is_some(),
            TaskStatus::Failed if include_failed => {
                task.status = TaskStatus::Pending;
                task.error = None;
                task.progress = 0;
                true
            }
            _ => false,
        });
        info!("全部开始: 重置了 {} 个任务", reset);
        self.inner.store.notify();
        self.inner.reschedule();
        reset
    }

    /// 失败的任务重新排队，进度从 0 开始
    pub fn requeue_failed_tasks(&self) -> usize {
        let requeued = self.inner.store.modify_quiet(|task| {
            if task.status == TaskStatus::Failed {
                task.status = TaskStatus::Pending;
                task.error = None;
                task.progress = 0;
                true
            } else {
                false
            }
        });
        info!("重新排队 {} 个失败任务", requeued);
        self.inner.store.notify();
        self.inner.reschedule();
        requeued
    }

    // --- 查询 ---

    pub fn active_task_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.inner.lock_active().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.inner.lock_active().contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.lock_active().len()
    }

    /// 等到没有任何工作单元在运行
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.inner.lock_active().is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// 取消所有工作单元但不修改任务状态，下次启动时会自动继续
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        let workers: Vec<ActiveWorker> = self.inner.lock_active().drain().map(|(_, w)| w).collect();
        info!("关闭下载管理器，中止 {} 个传输", workers.len());
        for worker in &workers {
            worker.abort();
        }
        for worker in workers {
            let _ = worker.handle.await;
        }
        self.inner.store.flush();
        self.inner.idle.notify_waiters();
    }
}

impl Inner {
    fn lock_active(&self) -> MutexGuard<'_, HashMap<String, ActiveWorker>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_held(&self) -> MutexGuard<'_, HashSet<String>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn download_config(&self) -> DownloadConfig {
        *self
            .download_config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DownloadEvent) {
        // 没有接收者时发送失败是正常的
        let _ = self.events.send(event);
    }

    /// 请求一轮调度，返回时已经有一轮在本次请求之后开始的调度执行完毕。
    /// 其他线程上的请求排队等待，已被别人的调度覆盖的请求直接返回；
    /// 同一线程在调度过程中的重入只标记重跑，不会死锁也不会交错执行。
    fn reschedule(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        self.rerun.store(true, Ordering::SeqCst);
        if IN_PASS.with(Cell::get) {
            return;
        }
        loop {
            let guard = self.schedule_lock.lock().unwrap_or_else(PoisonError::into_inner);
            if !self.rerun.swap(false, Ordering::SeqCst) {
                return;
            }
            IN_PASS.with(|flag| flag.set(true));
            let changed = self.run_pass();
            IN_PASS.with(|flag| flag.set(false));
            drop(guard);
            if changed {
                self.store.notify();
            }
            self.idle.notify_waiters();
            if !self.rerun.load(Ordering::SeqCst) {
                return;
            }
        }
    }

    /// 一轮调度。返回任务列表是否被修改。
    fn run_pass(self: &Arc<Self>) -> bool {
        let ceiling = self.download_config().concurrency;
        let mut active = self.lock_active();
        let mut held = self.lock_held();
        // 在工作单元锁内取快照，暂停和工作单元写入都不会与本轮交错
        let mut tasks = self.store.snapshot();
        tasks.sort_by_key(|t| t.created_at);
        let mut changed = false;

        // 只有仍是 pending 的任务保持暂停
        held.retain(|id| {
            tasks
                .iter()
                .any(|t| &t.id == id && t.status == TaskStatus::Pending)
        });

        // 回收已结束或状态已不是 downloading 的工作单元
        active.retain(|id, worker| {
            let still_downloading = tasks
                .iter()
                .any(|t| &t.id == id && t.status == TaskStatus::Downloading);
            let keep = still_downloading && !worker.done && !worker.handle.is_finished();
            if !keep {
                debug!("回收任务 '{}' 的工作单元 (run {})", id, worker.run_id);
                worker.abort();
            }
            keep
        });

        let mut running = 0usize;
        for task in &tasks {
            match task.status {
                TaskStatus::Completed | TaskStatus::Failed => continue,
                TaskStatus::Pending if held.contains(&task.id) => continue,
                _ if task.source_url().is_none() => {
                    if let Some(worker) = active.remove(&task.id) {
                        worker.abort();
                    }
                    if self.settings.fail_missing_url || task.status == TaskStatus::Downloading {
                        warn!("任务 '{}' 没有下载地址，标记为失败", task.id);
                        self.store.update_quiet(
                            &task.id,
                            &TaskPatch::default()
                                .status(TaskStatus::Failed)
                                .error(AppError::MissingUrl.to_string()),
                        );
                        changed = true;
                    }
                    continue;
                }
                _ => {}
            }

            if running >= ceiling {
                // 并发上限被调低时，多出来的传输退回 pending
                if task.status == TaskStatus::Downloading {
                    if let Some(worker) = active.remove(&task.id) {
                        worker.abort();
                    }
                    info!("并发已满，任务 '{}' 退回等待队列", task.id);
                    self.store
                        .update_quiet(&task.id, &TaskPatch::default().status(TaskStatus::Pending));
                    changed = true;
                }
                continue;
            }

            if task.status == TaskStatus::Downloading && active.contains_key(&task.id) {
                running += 1;
                continue;
            }

            let Some(started) = self.store.update_quiet(
                &task.id,
                &TaskPatch::default()
                    .status(TaskStatus::Downloading)
                    .clear_error(),
            ) else {
                continue;
            };
            changed = true;
            let worker = self.spawn_worker(started);
            active.insert(task.id.clone(), worker);
            running += 1;
        }
        changed
    }

    fn spawn_worker(self: &Arc<Self>, task: DownloadTask) -> ActiveWorker {
        let run_id = self.next_run_id.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        info!("开始下载任务 '{}' (run {}): {}", task.id, run_id, task.title);
        let worker = TransferWorker::new(self.clone(), task, run_id, cancel.clone());
        let handle = self.runtime.spawn(worker.run());
        ActiveWorker {
            run_id,
            cancel,
            handle,
            done: false,
        }
    }

    /// 工作单元写入任务状态。工作单元已被暂停/移除/回收时拒绝写入并返回 `false`。
    /// 传输中的进度用 `Persist::Throttled`，终态用 `Persist::Now`。
    fn worker_update(&self, id: &str, run_id: u64, patch: &TaskPatch, persist: Persist) -> bool {
        let updated = {
            let active = self.lock_active();
            match active.get(id) {
                Some(worker) if worker.run_id == run_id => {
                    self.store.update_with(id, patch, persist).is_some()
                }
                _ => false,
            }
        };
        if updated {
            self.store.notify();
        }
        updated
    }

    /// 工作单元退出。仍在登记中的运行交给下一轮调度回收并补位；
    /// 已被暂停或移除的运行不触发调度，避免刚暂停的任务立刻重新开始。
    fn worker_finished(self: &Arc<Self>, id: &str, run_id: u64) {
        let current = {
            let mut active = self.lock_active();
            match active.get_mut(id) {
                Some(worker) if worker.run_id == run_id => {
                    worker.done = true;
                    true
                }
                _ => false,
            }
        };
        if current {
            self.reschedule();
        } else {
            self.idle.notify_waiters();
        }
    }
}
