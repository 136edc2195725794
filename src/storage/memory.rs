// src/storage/memory.rs

use super::{SaveData, StorageAdapter};
use async_trait::async_trait;
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Mutex, PoisonError},
};

/// 内存中的存储实现，用于测试和没有文件系统的宿主
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').replace('\\', "/")
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接放入一个文件（测试本地复制时使用）
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalize(path), bytes.into());
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&normalize(path))
            .cloned()
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn exists(&self, path: &str) -> bool {
        let key = normalize(path);
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
            || self
                .dirs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains(&key)
    }

    async fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.get(path)
    }

    async fn save(&self, path: &str, data: Option<SaveData>) -> bool {
        let key = normalize(path);
        match data {
            None => {
                self.dirs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(key);
                true
            }
            Some(data) => match data.into_bytes() {
                Ok(bytes) => {
                    self.files
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(key, bytes);
                    true
                }
                Err(_) => false,
            },
        }
    }

    async fn delete(&self, path: &str) -> bool {
        let key = normalize(path);
        let removed_file = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some();
        let removed_dir = self
            .dirs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        removed_file || removed_dir
    }

    async fn list(&self, path: &str) -> String {
        let prefix = match normalize(path) {
            p if p.is_empty() => String::new(),
            p => format!("{}/", p),
        };
        let mut names = BTreeSet::new();
        let files = self.files.lock().unwrap_or_else(PoisonError::into_inner);
        for key in files.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => names.insert(format!("{}/", dir)),
                    None => names.insert(rest.to_string()),
                };
            }
        }
        names.into_iter().collect::<Vec<_>>().join("\n")
    }
}
