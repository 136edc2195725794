// src/storage/mod.rs

//! 宿主设备上的文件读写。调度器只通过 [`StorageAdapter`] 访问文件系统。

mod fs;
mod memory;

pub use fs::FsStorage;
pub use memory::MemoryStorage;

use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};

/// 写入的数据。宿主环境可能只接受文本，所以支持 Base64 编码后的二进制。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveData {
    Bytes(Vec<u8>),
    Base64(String),
}

impl SaveData {
    pub fn into_bytes(self) -> AppResult<Vec<u8>> {
        match self {
            SaveData::Bytes(bytes) => Ok(bytes),
            SaveData::Base64(text) => BASE64.decode(text.as_bytes()).map_err(AppError::from),
        }
    }

    /// 在阻塞线程池中把字节编码为 Base64 文本
    pub async fn encode_text(bytes: Vec<u8>) -> AppResult<Self> {
        let text = tokio::task::spawn_blocking(move || BASE64.encode(&bytes))
            .await
            .map_err(|e| AppError::Other(anyhow::anyhow!("编码任务异常退出: {}", e)))?;
        Ok(SaveData::Base64(text))
    }
}

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn exists(&self, path: &str) -> bool;

    async fn read(&self, path: &str) -> Option<Vec<u8>>;

    /// `data` 为 `None` 时只确保目录存在
    async fn save(&self, path: &str, data: Option<SaveData>) -> bool;

    async fn delete(&self, path: &str) -> bool;

    /// 以换行分隔的目录内容，子目录以 `/` 结尾
    async fn list(&self, path: &str) -> String;
}

/// 拼接存储路径，统一使用 `/` 分隔
pub fn join_path(dir: &str, file_name: &str) -> String {
    let dir = dir.trim_end_matches(['/', '\\']);
    if dir.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", dir, file_name)
    }
}
