// src/constants.rs

pub const UI_WIDTH: usize = 88;
pub const MAX_FILENAME_BYTES: usize = 200;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const LOG_FILE_NAME: &str = "media-dl.log";
pub const LOG_FALLBACK_FILE_NAME: &str = "media-dl-fallback.log";
pub const STATE_DIR_NAME: &str = "state";
pub const DEFAULT_SAVE_DIR: &str = "downloads";
pub const USER_AGENT: &str = concat!(clap::crate_name!(), "/", clap::crate_version!());

/// 本地文件来源的 URL 前缀
pub const LOCAL_FILE_SCHEME: &str = "file://";

pub mod concurrency {
    pub const MIN: usize = 1;
    pub const MAX: usize = 10;
    pub const DEFAULT: usize = 3;
}

pub mod progress {
    /// 已知总大小时，写入完成前进度的上限（最后几个百分点留给本地写入）
    pub const TRANSFER_CAP: u8 = 95;
    /// 总大小未知时，数据接收完毕后跳到的进度
    pub const BUFFERED: u8 = 90;
    /// 编码完成、开始写入时的进度
    pub const SAVING: u8 = 97;
    pub const DONE: u8 = 100;
}

pub mod network {
    pub const CONNECT_TIMEOUT_SECS: u64 = 10;
    pub const RESPONSE_TIMEOUT_SECS: u64 = 30;
    pub const IDLE_TIMEOUT_SECS: u64 = 60;
}

pub mod storage_keys {
    pub const TASKS: &str = "download_tasks";
    pub const CONFIG: &str = "download_config";
    pub const SCHEMA_VERSION: u32 = 1;
}

pub mod dirs {
    pub const SONG: &str = "music";
    pub const MV: &str = "mv";
    pub const PICTURE: &str = "pictures";
}

pub const EVENT_CHANNEL_CAPACITY: usize = 64;
/// 传输中的进度变化最多每隔这么久写盘一次
pub const PROGRESS_PERSIST_INTERVAL_MS: u64 = 1000;
