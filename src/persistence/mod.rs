// src/persistence/mod.rs

//! 任务列表与下载配置的持久化。每次修改都整体重写对应的记录。

mod backend;

pub use backend::{JsonFileBackend, KeyValueBackend, MemoryBackend};

use crate::{
    config::DownloadConfig,
    constants::storage_keys::{CONFIG, SCHEMA_VERSION, TASKS},
    error::AppResult,
    models::DownloadTask,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize)]
struct TaskRecordRef<'a> {
    version: u32,
    tasks: &'a [DownloadTask],
}

#[derive(Deserialize)]
struct TaskRecord {
    version: u32,
    tasks: Vec<DownloadTask>,
}

/// 早期版本直接保存任务数组，没有版本号
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTasks {
    Versioned(TaskRecord),
    Legacy(Vec<DownloadTask>),
}

#[derive(Serialize, Deserialize)]
struct ConfigRecord {
    #[serde(default)]
    version: u32,
    concurrency: i64,
}

#[derive(Clone)]
pub struct TaskRepository {
    backend: Arc<dyn KeyValueBackend>,
}

impl TaskRepository {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    pub fn load(&self) -> AppResult<Vec<DownloadTask>> {
        let Some(raw) = self.backend.load(TASKS)? else {
            return Ok(Vec::new());
        };
        let tasks = match serde_json::from_str::<StoredTasks>(&raw)? {
            StoredTasks::Versioned(record) => {
                if record.version > SCHEMA_VERSION {
                    warn!(
                        "任务记录版本 {} 高于当前支持的版本 {}，尝试按当前格式读取",
                        record.version, SCHEMA_VERSION
                    );
                }
                record.tasks
            }
            StoredTasks::Legacy(tasks) => {
                debug!("读取到无版本号的旧任务记录，共 {} 条", tasks.len());
                tasks
            }
        };
        Ok(tasks)
    }

    pub fn save(&self, tasks: &[DownloadTask]) -> AppResult<()> {
        let record = TaskRecordRef {
            version: SCHEMA_VERSION,
            tasks,
        };
        self.backend.store(TASKS, &serde_json::to_string(&record)?)
    }
}

#[derive(Clone)]
pub struct ConfigRepository {
    backend: Arc<dyn KeyValueBackend>,
}

impl ConfigRepository {
    pub fn new(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self { backend }
    }

    /// 没有记录时返回 `None`；记录中的并发数会被重新限制到合法范围
    pub fn load(&self) -> AppResult<Option<DownloadConfig>> {
        let Some(raw) = self.backend.load(CONFIG)? else {
            return Ok(None);
        };
        let record: ConfigRecord = serde_json::from_str(&raw)?;
        Ok(Some(DownloadConfig::new(record.concurrency)))
    }

    pub fn save(&self, config: &DownloadConfig) -> AppResult<()> {
        let record = ConfigRecord {
            version: SCHEMA_VERSION,
            concurrency: config.concurrency as i64,
        };
        self.backend.store(CONFIG, &serde_json::to_string(&record)?)
    }
}
