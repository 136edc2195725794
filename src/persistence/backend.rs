// src/persistence/backend.rs

use crate::error::{AppError, AppResult};
use anyhow::Context;
use log::debug;
use std::{
    collections::HashMap,
    fs,
    path::PathBuf,
    sync::{Mutex, PoisonError},
};

/// 按键整体读写一条记录的持久化后端
pub trait KeyValueBackend: Send + Sync {
    fn load(&self, key: &str) -> AppResult<Option<String>>;

    fn store(&self, key: &str, value: &str) -> AppResult<()>;
}

/// 进程内存后端，测试使用
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(self, key: &str, value: impl Into<String>) -> Self {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn store(&self, key: &str, value: &str) -> AppResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// 每条记录保存为目录下的 `<key>.json`
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    dir: PathBuf,
}

impl JsonFileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueBackend for JsonFileBackend {
    fn load(&self, key: &str) -> AppResult<Option<String>> {
        let path = self.record_path(key);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取记录文件 '{}' 失败", path.display()))
            .map_err(AppError::from)?;
        Ok(Some(content))
    }

    fn store(&self, key: &str, value: &str) -> AppResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.record_path(key);
        let tmp = self.dir.join(format!("{}.json.tmp", key));
        fs::write(&tmp, value)
            .with_context(|| format!("写入记录文件 '{}' 失败", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("替换记录文件 '{}' 失败", path.display()))?;
        debug!("已保存记录 {} ({} 字节)", key, value.len());
        Ok(())
    }
}
