// src/models/mod.rs

pub mod event;

pub use event::{DownloadEvent, LibraryRefresh, ToastLevel};

use crate::constants;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 下载内容的类型，决定保存目录与兜底扩展名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Song,
    Mv,
    Picture,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::Song => "song",
            TaskType::Mv => "mv",
            TaskType::Picture => "picture",
        }
    }

    pub fn fallback_extension(&self) -> &'static str {
        match self {
            TaskType::Song => "mp3",
            TaskType::Mv => "mp4",
            TaskType::Picture => "jpg",
        }
    }

    pub fn default_dir(&self) -> &'static str {
        match self {
            TaskType::Song => constants::dirs::SONG,
            TaskType::Mv => constants::dirs::MV,
            TaskType::Picture => constants::dirs::PICTURE,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Downloading,
    Completed,
    Failed,
}

impl TaskStatus {
    /// `clear_finished_tasks` 之后仍然保留的状态
    pub fn is_unfinished(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Downloading)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(rename = "type")]
    pub kind: TaskType,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub progress: u8,
    /// 毫秒时间戳，决定调度顺序 (FIFO)
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl DownloadTask {
    /// 非空的下载地址
    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }

    pub fn is_local_source(&self) -> bool {
        self.source_url()
            .is_some_and(|u| u.starts_with(constants::LOCAL_FILE_SCHEME))
    }

    /// 合并补丁。只有补丁中出现的字段会被覆盖。
    pub fn apply(&mut self, patch: &TaskPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(artist) = &patch.artist {
            self.artist = artist.clone();
        }
        if let Some(cover_url) = &patch.cover_url {
            self.cover_url = cover_url.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(constants::progress::DONE);
        }
        if let Some(url) = &patch.url {
            self.url = url.clone();
        }
        if let Some(path) = &patch.path {
            self.path = path.clone();
        }
        if let Some(error) = &patch.error {
            self.error = error.clone();
        }
        if let Some(ext) = &patch.ext {
            self.ext = ext.clone();
        }
        if let Some(file_name) = &patch.file_name {
            self.file_name = file_name.clone();
        }
        if let Some(mime) = &patch.mime {
            self.mime = mime.clone();
        }
        if let Some(path_hint) = &patch.path_hint {
            self.path_hint = path_hint.clone();
        }
        if let Some(file_size) = patch.file_size {
            self.file_size = file_size;
        }
    }
}

/// UI 或其他协作方创建任务时提交的数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TaskType>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub song_id: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub path_hint: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

impl CreateTaskPayload {
    pub fn new(kind: TaskType, title: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_song_id(mut self, song_id: impl Into<String>) -> Self {
        self.song_id = Some(song_id.into());
        self
    }
}

/// 对已有任务的局部修改。外层 `None` 表示不修改，
/// 内层 `None` 表示清空该字段。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub artist: Option<Option<String>>,
    pub cover_url: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub progress: Option<u8>,
    pub url: Option<Option<String>>,
    pub path: Option<Option<String>>,
    pub error: Option<Option<String>>,
    pub ext: Option<Option<String>>,
    pub file_name: Option<Option<String>>,
    pub mime: Option<Option<String>>,
    pub path_hint: Option<Option<String>>,
    pub file_size: Option<Option<u64>>,
}

impl TaskPatch {
    pub fn status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(Some(path.into()));
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(Some(url.into()));
        self
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(Some(mime.into()));
        self
    }

    pub fn file_size(mut self, size: u64) -> Self {
        self.file_size = Some(Some(size));
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// 不触发重新调度（用于高频进度更新）
    pub skip_schedule: bool,
}

impl UpdateOptions {
    pub fn skip_schedule() -> Self {
        Self { skip_schedule: true }
    }
}
