// src/resolver.rs

//! 根据响应头、来源地址和任务提示推断保存文件的扩展名、MIME 与文件名。
//!
//! 优先级（依次尝试，取第一个可用结果）:
//! 1. `Content-Disposition` 中的 `filename*` / `filename`
//! 2. 来源 URL（或本地路径）的后缀
//! 3. `Content-Type` 映射表
//! 4. 任务的 `pathHint` 后缀
//! 5. 任务的 `ext`
//! 6. 按任务类型兜底

use crate::{constants, models::{DownloadTask, TaskType}, utils};
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use std::sync::LazyLock;
use url::Url;

static FILENAME_EXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)filename\*\s*=\s*([^;]+)"#).unwrap());
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*(?:"([^"]*)"|([^;]*))"#).unwrap()
});

const MIME_TABLE: &[(&str, &str)] = &[
    ("audio/flac", "flac"),
    ("audio/x-flac", "flac"),
    ("audio/mpeg", "mp3"),
    ("audio/mp3", "mp3"),
    ("audio/mp4", "m4a"),
    ("audio/x-m4a", "m4a"),
    ("audio/aac", "aac"),
    ("audio/ogg", "ogg"),
    ("audio/wav", "wav"),
    ("audio/x-wav", "wav"),
    ("audio/webm", "webm"),
    ("audio/x-ms-wma", "wma"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
    ("video/x-matroska", "mkv"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/png", "png"),
];

/// 推断时用到的响应元数据
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseMeta {
    pub content_disposition: Option<String>,
    pub content_type: Option<String>,
}

impl ResponseMeta {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            content_disposition: read(CONTENT_DISPOSITION),
            content_type: read(CONTENT_TYPE),
        }
    }

    /// 去掉参数后的小写 MIME，如 `audio/flac`
    pub fn essence(&self) -> Option<String> {
        self.content_type.as_deref().and_then(mime_essence)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionSource {
    ContentDisposition,
    SourcePath,
    ContentType,
    PathHint,
    TaskHint,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub file_name: String,
    pub extension: String,
    pub mime: Option<String>,
    pub source: ExtensionSource,
}

/// 推断最终保存的文件名。返回的文件名一定带扩展名。
pub fn resolve(source: &str, meta: &ResponseMeta, task: &DownloadTask) -> Resolved {
    let (extension, ext_source) = resolve_extension(source, meta, task);
    let file_name = build_file_name(task, &extension);
    let header_mime = meta
        .essence()
        .filter(|m| m != "application/octet-stream");
    // 服务端指定的文件名与 Content-Type 不一致时，以文件名为准
    let named_mime = match (ext_source, header_mime.as_deref()) {
        (ExtensionSource::ContentDisposition, Some(m))
            if extension_for_mime(m) != Some(extension.as_str()) =>
        {
            mime_for_extension(&extension, task.kind).map(str::to_string)
        }
        _ => None,
    };
    let mime = named_mime
        .or(header_mime)
        .or_else(|| task.mime.clone())
        .or_else(|| mime_for_extension(&extension, task.kind).map(str::to_string));
    Resolved {
        file_name,
        extension,
        mime,
        source: ext_source,
    }
}

pub fn resolve_extension(
    source: &str,
    meta: &ResponseMeta,
    task: &DownloadTask,
) -> (String, ExtensionSource) {
    if let Some(ext) = meta
        .content_disposition
        .as_deref()
        .and_then(content_disposition_filename)
        .and_then(|name| utils::extension_of_path(&name))
    {
        return (ext, ExtensionSource::ContentDisposition);
    }
    if let Some(ext) = source_path_extension(source) {
        return (ext, ExtensionSource::SourcePath);
    }
    if let Some(ext) = meta.essence().as_deref().and_then(extension_for_mime) {
        return (ext.to_string(), ExtensionSource::ContentType);
    }
    if let Some(ext) = task.path_hint.as_deref().and_then(utils::extension_of_path) {
        return (ext, ExtensionSource::PathHint);
    }
    if let Some(ext) = task.ext.as_deref().and_then(utils::normalize_extension) {
        return (ext, ExtensionSource::TaskHint);
    }
    (
        task.kind.fallback_extension().to_string(),
        ExtensionSource::Fallback,
    )
}

/// `fileName` 或 `title` 清理后加上扩展名（已带相同扩展名时不重复添加）
pub fn build_file_name(task: &DownloadTask, extension: &str) -> String {
    let raw = task
        .file_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&task.title);
    let base = utils::sanitize_filename(raw);
    let suffix = format!(".{}", extension);
    if base.to_ascii_lowercase().ends_with(&suffix.to_ascii_lowercase()) && base.len() > suffix.len() {
        return base;
    }
    let candidate = format!("{}{}", base, suffix);
    if candidate.len() > constants::MAX_FILENAME_BYTES {
        utils::sanitize_filename(&candidate)
    } else {
        candidate
    }
}

pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    let essence = mime_essence(mime)?;
    MIME_TABLE
        .iter()
        .find(|(m, _)| *m == essence)
        .map(|(_, ext)| *ext)
}

/// 扩展名反查 MIME。`webm` 同时对应音频与视频，按任务类型区分。
pub fn mime_for_extension(ext: &str, kind: TaskType) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    match ext.as_str() {
        "webm" if kind == TaskType::Mv => Some("video/webm"),
        "webm" => Some("audio/webm"),
        "jpeg" => Some("image/jpeg"),
        _ => MIME_TABLE
            .iter()
            .find(|(_, e)| *e == ext)
            .map(|(m, _)| *m),
    }
}

fn mime_essence(raw: &str) -> Option<String> {
    let essence = raw.split(';').next()?.trim().to_ascii_lowercase();
    (!essence.is_empty()).then_some(essence)
}

/// 解析 `Content-Disposition`，`filename*` (RFC 5987) 优先
pub fn content_disposition_filename(header: &str) -> Option<String> {
    if let Some(caps) = FILENAME_EXT_RE.captures(header) {
        let value = caps[1].trim().trim_matches('"');
        // 形如 UTF-8''%E6%99%B4%E5%A4%A9.flac
        let encoded = value.split_once("''").map(|(_, v)| v).unwrap_or(value);
        let decoded = percent_decode_str(encoded).decode_utf8_lossy().trim().to_string();
        if !decoded.is_empty() {
            return Some(decoded);
        }
    }
    let caps = FILENAME_RE.captures(header)?;
    let value = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())?;
    (!value.is_empty()).then_some(value)
}

/// 来源地址（远程 URL 或本地路径）的扩展名，忽略查询参数与片段
fn source_path_extension(source: &str) -> Option<String> {
    let source = source.trim();
    if let Some(local) = source.strip_prefix(constants::LOCAL_FILE_SCHEME) {
        let decoded = percent_decode_str(local).decode_utf8_lossy();
        return utils::extension_of_path(&decoded);
    }
    match Url::parse(source) {
        Ok(url) => {
            let decoded = percent_decode_str(url.path()).decode_utf8_lossy();
            utils::extension_of_path(&decoded)
        }
        Err(_) => {
            let path = source.split(['?', '#']).next().unwrap_or(source);
            utils::extension_of_path(path)
        }
    }
}
