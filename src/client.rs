// src/client.rs

use crate::{config::AppConfig, error::*};
use anyhow::anyhow;
use reqwest::{IntoUrl, Response};
use std::sync::Arc;

/// 下载用的 HTTP 客户端。只设置连接超时；响应头与数据块的等待时间
/// 由下载工作单元按配置单独控制，大文件不受整体超时限制。
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AppError::Other(anyhow!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self { client })
    }

    /// 发起 GET 请求，非 2xx 响应转换为 [`AppError::HttpStatus`]
    pub async fn get<T: IntoUrl>(&self, url: T) -> AppResult<Response> {
        let url = url.into_url()?;
        let res = self.client.get(url.clone()).send().await?;
        if !res.status().is_success() {
            return Err(AppError::HttpStatus {
                status: res.status().as_u16(),
                url: url.to_string(),
            });
        }
        Ok(res)
    }
}
