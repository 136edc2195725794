// src/config.rs

pub mod external;

use self::external::ExternalConfig;
use crate::{constants, error::AppResult, models::TaskType};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 持久化的下载配置，目前只有并发上限
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    pub concurrency: usize,
}

impl DownloadConfig {
    pub fn new(concurrency: i64) -> Self {
        Self {
            concurrency: clamp_concurrency(concurrency),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            concurrency: constants::concurrency::DEFAULT,
        }
    }
}

/// 并发数限制在 [1, 10]
pub fn clamp_concurrency(value: i64) -> usize {
    value.clamp(
        constants::concurrency::MIN as i64,
        constants::concurrency::MAX as i64,
    ) as usize
}

/// 每种任务类型对应的保存目录（相对于存储根目录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub song: String,
    pub mv: String,
    pub picture: String,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            song: TaskType::Song.default_dir().into(),
            mv: TaskType::Mv.default_dir().into(),
            picture: TaskType::Picture.default_dir().into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub user_agent: String,
    pub connect_timeout: Duration,
    /// 等待响应头的超时，`None` 表示不限制
    pub response_timeout: Option<Duration>,
    /// 两个数据块之间的最长等待时间，`None` 表示不限制
    pub idle_timeout: Option<Duration>,
    pub directories: DirectoryConfig,
    /// 没有下载地址的任务直接标记为失败，而不是一直等待
    pub fail_missing_url: bool,
    /// 持久化配置不存在时使用的并发数
    pub default_concurrency: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: constants::USER_AGENT.into(),
            connect_timeout: Duration::from_secs(constants::network::CONNECT_TIMEOUT_SECS),
            response_timeout: Some(Duration::from_secs(constants::network::RESPONSE_TIMEOUT_SECS)),
            idle_timeout: Some(Duration::from_secs(constants::network::IDLE_TIMEOUT_SECS)),
            directories: DirectoryConfig::default(),
            fail_missing_url: true,
            default_concurrency: constants::concurrency::DEFAULT,
        }
    }
}

impl AppConfig {
    /// 从 `~/.media-dl/config.json` 加载，文件不存在时写入默认配置
    pub fn load() -> AppResult<Self> {
        let external_config = external::load_or_create_external_config()?;
        Ok(Self::from_external(external_config))
    }

    pub fn from_external(external_config: ExternalConfig) -> Self {
        let defaults = Self::default();
        let network = external_config.network;
        // 0 秒表示关闭对应的超时
        let optional_secs = |secs: Option<u64>, default: Option<Duration>| match secs {
            Some(0) => None,
            Some(s) => Some(Duration::from_secs(s)),
            None => default,
        };
        Self {
            user_agent: network.user_agent.unwrap_or(defaults.user_agent),
            connect_timeout: network
                .connect_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            response_timeout: optional_secs(network.response_timeout_secs, defaults.response_timeout),
            idle_timeout: optional_secs(network.idle_timeout_secs, defaults.idle_timeout),
            directories: external_config.directories,
            fail_missing_url: external_config
                .fail_missing_url
                .unwrap_or(defaults.fail_missing_url),
            default_concurrency: external_config
                .default_concurrency
                .map(|n| clamp_concurrency(n as i64))
                .unwrap_or(defaults.default_concurrency),
        }
    }

    pub fn dir_for(&self, kind: TaskType) -> &str {
        match kind {
            TaskType::Song => &self.directories.song,
            TaskType::Mv => &self.directories.mv,
            TaskType::Picture => &self.directories.picture,
        }
    }
}
