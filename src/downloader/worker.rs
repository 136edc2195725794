// src/downloader/worker.rs

use super::{Inner, progress::ProgressTracker};
use crate::{
    constants::{self, progress::SAVING},
    error::{AppError, AppResult},
    models::{DownloadEvent, DownloadTask, LibraryRefresh, TaskPatch, TaskStatus, ToastLevel},
    resolver::{self, Resolved, ResponseMeta},
    storage::{self, SaveData},
    store::Persist,
};
use futures::StreamExt;
use log::{debug, error, info, warn};
use percent_encoding::percent_decode_str;
use std::{future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// 单次下载运行：拉取数据、推断文件名、写入存储，最后把结果写回任务。
pub(crate) struct TransferWorker {
    inner: Arc<Inner>,
    task: DownloadTask,
    run_id: u64,
    cancel: CancellationToken,
}

struct SavedFile {
    path: String,
    mime: Option<String>,
    size: u64,
}

impl TransferWorker {
    pub(crate) fn new(
        inner: Arc<Inner>,
        task: DownloadTask,
        run_id: u64,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            inner,
            task,
            run_id,
            cancel,
        }
    }

    pub(crate) async fn run(self) {
        let result = if self.task.is_local_source() {
            self.copy_local().await
        } else {
            self.fetch_remote().await
        };

        match result {
            Ok(saved) => self.complete(saved),
            Err(e) if e.is_cancellation() => {
                debug!("任务 '{}' 的传输已中止 (run {})", self.task.id, self.run_id);
                // 只有仍然是当前运行时才会生效；暂停和移除都会先解除登记
                self.update(&TaskPatch::default().status(TaskStatus::Pending));
            }
            Err(e) => self.fail(e),
        }

        self.inner.worker_finished(&self.task.id, self.run_id);
    }

    fn complete(&self, saved: SavedFile) {
        let mut patch = TaskPatch::default()
            .status(TaskStatus::Completed)
            .progress(constants::progress::DONE)
            .path(saved.path.clone())
            .file_size(saved.size)
            .clear_error();
        if let Some(mime) = saved.mime {
            patch = patch.mime(mime);
        }
        if !self.update(&patch) {
            debug!("任务 '{}' 已被移除，丢弃下载结果", self.task.id);
            return;
        }
        info!("任务 '{}' 下载完成: {}", self.task.id, saved.path);
        self.inner.emit(DownloadEvent::LibraryRefresh(LibraryRefresh {
            path: saved.path,
            kind: self.task.kind,
        }));
        self.inner.emit(DownloadEvent::Toast {
            task_id: self.task.id.clone(),
            level: ToastLevel::Success,
            message: format!("下载完成: {}", self.task.title),
        });
    }

    fn fail(&self, e: AppError) {
        let message = e.short_message();
        // 失败时保留当前进度，方便用户判断中断位置
        let patch = TaskPatch::default()
            .status(TaskStatus::Failed)
            .error(message.clone());
        if !self.update(&patch) {
            return;
        }
        error!("任务 '{}' 下载失败: {}", self.task.id, e);
        self.inner.emit(DownloadEvent::Toast {
            task_id: self.task.id.clone(),
            level: ToastLevel::Error,
            message: format!("下载失败: {} ({})", self.task.title, message),
        });
    }

    fn update(&self, patch: &TaskPatch) -> bool {
        self.inner
            .worker_update(&self.task.id, self.run_id, patch, Persist::Now)
    }

    /// 写入进度；运行已被解除登记时返回 `Cancelled`，让传输尽快停下
    fn report_progress(&self, percent: u8) -> AppResult<()> {
        let patch = TaskPatch::default().progress(percent);
        if self
            .inner
            .worker_update(&self.task.id, self.run_id, &patch, Persist::Throttled)
        {
            Ok(())
        } else {
            Err(AppError::Cancelled)
        }
    }

    /// 可被取消、可选超时的等待
    async fn guard<F, T>(&self, timeout: Option<Duration>, stage: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let timed = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .map_err(|_| AppError::Timeout(stage))?,
                None => fut.await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            result = timed => result,
        }
    }

    async fn fetch_remote(&self) -> AppResult<SavedFile> {
        let url = self.task.source_url().ok_or(AppError::MissingUrl)?.to_string();
        let settings = self.inner.settings.clone();
        debug!("任务 '{}' 请求 {}", self.task.id, url);

        let response = self
            .guard(settings.response_timeout, "等待响应", self.inner.http.get(url.as_str()))
            .await?;
        let meta = ResponseMeta::from_headers(response.headers());
        let mut tracker = ProgressTracker::new(response.content_length(), self.task.progress);
        if let Some(total) = tracker.total() {
            self.update(&TaskPatch::default().file_size(total));
        }

        let capacity = tracker.total().unwrap_or(0).min(64 * 1024 * 1024) as usize;
        let mut payload = Vec::with_capacity(capacity);
        let mut stream = response.bytes_stream();
        loop {
            let next = self
                .guard(settings.idle_timeout, "等待数据", async {
                    Ok::<_, AppError>(stream.next().await)
                })
                .await?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk?;
            payload.extend_from_slice(&chunk);
            if let Some(percent) = tracker.advance(chunk.len() as u64) {
                self.report_progress(percent)?;
            }
        }
        debug!(
            "任务 '{}' 接收完毕，共 {} 字节",
            self.task.id,
            tracker.received()
        );
        if let Some(percent) = tracker.finish_body() {
            self.report_progress(percent)?;
        }

        let resolved = resolver::resolve(&url, &meta, &self.task);
        debug!(
            "任务 '{}' 保存为 '{}' (扩展名来源 {:?})",
            self.task.id, resolved.file_name, resolved.source
        );
        self.save(resolved, payload, &mut tracker).await
    }

    /// `file://` 地址直接通过存储接口读取
    async fn copy_local(&self) -> AppResult<SavedFile> {
        let url = self.task.source_url().ok_or(AppError::MissingUrl)?.to_string();
        let raw_path = url
            .strip_prefix(constants::LOCAL_FILE_SCHEME)
            .unwrap_or(url.as_str());
        let local_path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
        debug!("任务 '{}' 读取本地文件 {}", self.task.id, local_path);

        let bytes = self
            .guard(None, "读取本地文件", async {
                self.inner
                    .storage
                    .read(&local_path)
                    .await
                    .ok_or_else(|| AppError::SourceRead(local_path.clone()))
            })
            .await?;

        let mut tracker = ProgressTracker::new(Some(bytes.len() as u64), self.task.progress);
        if let Some(percent) = tracker.finish_body() {
            self.report_progress(percent)?;
        }
        let resolved = resolver::resolve(&local_path, &ResponseMeta::default(), &self.task);
        self.save(resolved, bytes, &mut tracker).await
    }

    async fn save(
        &self,
        resolved: Resolved,
        bytes: Vec<u8>,
        tracker: &mut ProgressTracker,
    ) -> AppResult<SavedFile> {
        let storage = self.inner.storage.clone();
        let dir = self.inner.settings.dir_for(self.task.kind).to_string();
        let path = storage::join_path(&dir, &resolved.file_name);
        let size = bytes.len() as u64;

        let data = self.guard(None, "编码", SaveData::encode_text(bytes)).await?;
        if let Some(percent) = tracker.raise(SAVING) {
            self.report_progress(percent)?;
        }
        if self.cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        if !storage.save(&dir, None).await {
            warn!("创建目录 '{}' 失败，继续尝试写入", dir);
        }
        // 部分宿主写入成功也会返回 false，以文件是否存在为准
        if !storage.save(&path, Some(data)).await && !storage.exists(&path).await {
            return Err(AppError::Save(path));
        }
        Ok(SavedFile {
            path,
            mime: resolved.mime,
            size,
        })
    }
}
