// src/utils.rs

use crate::constants;
use std::sync::LazyLock;
use regex::Regex;
use std::{ffi::OsStr, path::Path};

static ILLEGAL_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[\\/*?:"<>|\x00-\x1f]"#).unwrap());
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static EXTENSION_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{1,5}$").unwrap());

/// 清理文件名中对文件系统不安全的字符
pub fn sanitize_filename(name: &str) -> String {
    let original_name = name.trim();
    if original_name.is_empty() { return "unknown".to_string(); }

    let stem = Path::new(original_name)
        .file_stem()
        .unwrap_or_else(|| OsStr::new(original_name))
        .to_string_lossy()
        .to_uppercase();
    let windows_reserved = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7",
        "COM8", "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];

    let mut name = if windows_reserved.contains(&stem.as_ref()) {
        format!("_{}", original_name)
    } else {
        original_name.to_string()
    };

    name = ILLEGAL_CHARS_RE.replace_all(&name, " ").into_owned();
    name = WHITESPACE_RE.replace_all(&name, " ").trim().to_string();
    name = name.trim_matches(|c: char| c == '.' || c.is_whitespace()).to_string();
    if name.is_empty() { return "unnamed".to_string(); }

    if name.len() > constants::MAX_FILENAME_BYTES {
        match split_extension(&name) {
            Some((stem_part, ext)) => {
                let ext_str = format!(".{}", ext);
                let max_stem_bytes = constants::MAX_FILENAME_BYTES.saturating_sub(ext_str.len());
                name = format!("{}{}", safe_truncate_utf8(stem_part, max_stem_bytes), ext_str);
            }
            None => {
                name = safe_truncate_utf8(&name, constants::MAX_FILENAME_BYTES).to_string();
            }
        }
    }
    name
}

fn safe_truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes { return s; }
    let mut i = max_bytes;
    while i > 0 && !s.is_char_boundary(i) { i -= 1; }
    &s[..i]
}

/// 把 `name.ext` 拆成 `("name", "ext")`，扩展名必须是 1-5 位字母数字
pub fn split_extension(name: &str) -> Option<(&str, &str)> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || !is_usable_extension(ext) {
        return None;
    }
    Some((stem, ext))
}

/// 规范化扩展名：去掉前导点并转为小写，不可用时返回 `None`
pub fn normalize_extension(raw: &str) -> Option<String> {
    let ext = raw.trim().trim_start_matches('.');
    is_usable_extension(ext).then(|| ext.to_ascii_lowercase())
}

pub fn is_usable_extension(ext: &str) -> bool {
    EXTENSION_RE.is_match(ext)
}

/// 路径（或 URL 路径部分）最后一段的扩展名
pub fn extension_of_path(path: &str) -> Option<String> {
    let last = path.rsplit(['/', '\\']).next().unwrap_or(path);
    split_extension(last).and_then(|(_, ext)| normalize_extension(ext))
}

pub fn truncate_text(text: &str, max_width: usize) -> String {
    let mut width = 0;
    let mut end_pos = 0;
    for (i, c) in text.char_indices() {
        width += if c.is_ascii() { 1 } else { 2 };
        if width > max_width.saturating_sub(3) {
            end_pos = i;
            break;
        }
    }
    if end_pos == 0 { text.to_string() } else { format!("{}...", &text[..end_pos]) }
}

/// 链接最后一段去掉扩展名，作为默认的任务标题
pub fn title_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_encoding::percent_decode_str(last).decode_utf8_lossy();
    let title = match split_extension(&decoded) {
        Some((stem, _)) => stem.trim().to_string(),
        None => decoded.trim().to_string(),
    };
    (!title.is_empty()).then_some(title)
}
