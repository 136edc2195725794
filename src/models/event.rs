// src/models/event.rs

use super::TaskType;
use serde::Serialize;

/// 下载完成后发给本地曲库扫描器的通知
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryRefresh {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: TaskType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum DownloadEvent {
    LibraryRefresh(LibraryRefresh),
    Toast {
        task_id: String,
        level: ToastLevel,
        message: String,
    },
}
