// src/config/external.rs

use super::DirectoryConfig;
use crate::{
    constants,
    error::{AppError, AppResult},
};
use anyhow::{Context, anyhow};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NetworkConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub response_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
}

/// `config.json` 的文件格式，所有字段都可以省略
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExternalConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub directories: DirectoryConfig,
    #[serde(default)]
    pub fail_missing_url: Option<bool>,
    #[serde(default)]
    pub default_concurrency: Option<u64>,
}

impl ExternalConfig {
    pub(crate) fn default_app_config() -> Self {
        // 为 NetworkConfig 提供一组稳健的默认值
        let network_config = NetworkConfig {
            user_agent: None,
            connect_timeout_secs: Some(constants::network::CONNECT_TIMEOUT_SECS),
            response_timeout_secs: Some(constants::network::RESPONSE_TIMEOUT_SECS),
            idle_timeout_secs: Some(constants::network::IDLE_TIMEOUT_SECS),
        };

        Self {
            network: network_config,
            directories: DirectoryConfig::default(),
            fail_missing_url: Some(true),
            default_concurrency: Some(constants::concurrency::DEFAULT as u64),
        }
    }
}

/// 程序的配置目录 `~/.media-dl`
pub fn config_dir() -> AppResult<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| AppError::Other(anyhow!("无法获取用户主目录")))?
        .join(constants::CONFIG_DIR_NAME);
    Ok(dir)
}

pub(super) fn get_config_path() -> AppResult<PathBuf> {
    Ok(config_dir()?.join(constants::CONFIG_FILE_NAME))
}

pub(crate) fn load_or_create_external_config() -> AppResult<ExternalConfig> {
    let config_path = get_config_path()?;
    load_or_create_at(&config_path)
}

fn load_or_create_at(config_path: &Path) -> AppResult<ExternalConfig> {
    if config_path.is_file() {
        debug!("读取配置文件 {:?}", config_path);
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("读取配置文件 '{}' 失败", config_path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("解析配置文件 '{}' 失败", config_path.display()))
            .map_err(AppError::from)
    } else {
        info!("配置文件 {:?} 不存在，将创建默认配置。", config_path);
        let config = ExternalConfig::default_app_config();

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir)?;
        }

        let json_content = serde_json::to_string_pretty(&config)?;
        fs::write(config_path, json_content)?;

        Ok(config)
    }
}
