// src/storage/fs.rs

use super::{SaveData, StorageAdapter};
use async_trait::async_trait;
use log::{debug, error, warn};
use std::path::{Component, Path, PathBuf};

/// 基于本地文件系统的存储，相对路径以 `root` 为根
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 绝对路径原样使用；相对路径拼到根目录下，并拒绝 `..`
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let candidate = Path::new(path);
        if candidate.is_absolute() {
            return Some(candidate.to_path_buf());
        }
        let mut final_path = self.root.clone();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => final_path.push(part),
                Component::ParentDir => {
                    warn!("检测到路径遍历 '..': {}", path);
                    return None;
                }
                _ => continue,
            }
        }
        Some(final_path)
    }
}

#[async_trait]
impl StorageAdapter for FsStorage {
    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Some(p) => tokio::fs::try_exists(&p).await.unwrap_or(false),
            None => false,
        }
    }

    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("读取文件 {:?} 失败: {}", full, e);
                None
            }
        }
    }

    async fn save(&self, path: &str, data: Option<SaveData>) -> bool {
        let Some(full) = self.resolve(path) else {
            return false;
        };
        let Some(data) = data else {
            return match tokio::fs::create_dir_all(&full).await {
                Ok(()) => true,
                Err(e) => {
                    error!("创建目录 {:?} 失败: {}", full, e);
                    false
                }
            };
        };
        let bytes = match data.into_bytes() {
            Ok(b) => b,
            Err(e) => {
                error!("解码待写入数据失败 {:?}: {}", full, e);
                return false;
            }
        };
        if let Some(parent) = full.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                error!("创建目录 {:?} 失败: {}", parent, e);
                return false;
            }
        }
        // 先写临时文件再重命名，避免留下半个文件
        let mut tmp_name = full.clone().into_os_string();
        tmp_name.push(".part");
        let tmp = PathBuf::from(tmp_name);
        if let Err(e) = tokio::fs::write(&tmp, &bytes).await {
            error!("写入文件 {:?} 失败: {}", tmp, e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return false;
        }
        match tokio::fs::rename(&tmp, &full).await {
            Ok(()) => {
                debug!("已写入 {} 字节到 {:?}", bytes.len(), full);
                true
            }
            Err(e) => {
                error!("重命名 {:?} -> {:?} 失败: {}", tmp, full, e);
                let _ = tokio::fs::remove_file(&tmp).await;
                false
            }
        }
    }

    async fn delete(&self, path: &str) -> bool {
        let Some(full) = self.resolve(path) else {
            return false;
        };
        let result = match tokio::fs::metadata(&full).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&full).await,
            Ok(_) => tokio::fs::remove_file(&full).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("删除 {:?} 失败: {}", full, e);
                false
            }
        }
    }

    async fn list(&self, path: &str) -> String {
        let Some(full) = self.resolve(path) else {
            return String::new();
        };
        let mut entries = match tokio::fs::read_dir(&full).await {
            Ok(rd) => rd,
            Err(e) => {
                debug!("列出目录 {:?} 失败: {}", full, e);
                return String::new();
            }
        };
        let mut names = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false) {
                name.push('/');
            }
            names.push(name);
        }
        names.sort();
        names.join("\n")
    }
}
