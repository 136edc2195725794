// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("网络请求失败: {0}")]
    Network(#[from] reqwest::Error),
    #[error("服务器返回错误状态 {status}")]
    HttpStatus { status: u16, url: String },
    #[error("网络连接超时 ({0})")]
    Timeout(&'static str),
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 解析错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("URL 解析错误: {0}")]
    Url(#[from] url::ParseError),
    #[error("Base64 编码错误: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("读取本地文件失败: {0}")]
    SourceRead(String),
    #[error("保存文件失败: {0}")]
    Save(String),
    #[error("下载任务缺少下载地址")]
    MissingUrl,
    #[error("无效的下载任务: {0}")]
    InvalidTask(String),
    #[error("未找到下载任务 '{0}'")]
    TaskNotFound(String),
    #[error("下载已取消")]
    Cancelled,
    #[error("必须在 Tokio 运行时中创建下载管理器")]
    NoRuntime,
    #[error("用户中断")]
    UserInterrupt,
    #[error("{0}")] // 只打印内部信息，不加任何前缀
    UserInputError(String),
    #[error("未知错误: {0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// 用户主动暂停/移除导致的中断，不应被视为失败
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AppError::Cancelled)
    }

    /// 写入任务 `error` 字段的简短描述
    pub fn short_message(&self) -> String {
        match self {
            AppError::Network(err) if err.is_connect() => "无法建立连接".to_string(),
            AppError::Network(err) if err.is_timeout() => "网络连接超时".to_string(),
            AppError::Network(err) if err.is_body() || err.is_decode() => {
                "响应数据读取失败".to_string()
            }
            AppError::Network(_) => "网络请求失败".to_string(),
            AppError::HttpStatus { status, .. } => format!("服务器返回错误 (HTTP {})", status),
            other => other.to_string(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
