// src/cli.rs

use crate::{constants, models::TaskType};
use clap::{Parser, ValueEnum, crate_version};
use std::path::PathBuf;

/// 定义日志输出级别
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// 定义可下载的内容类型
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Song,
    Mv,
    Picture,
}

impl From<MediaKind> for TaskType {
    fn from(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Song => TaskType::Song,
            MediaKind::Mv => TaskType::Mv,
            MediaKind::Picture => TaskType::Picture,
        }
    }
}

// command 属性
#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
#[command(group(
    clap::ArgGroup::new("mode")
        .required(true)
        .args(&["url", "resume", "list", "retry_failed", "clear_finished"]),
))]
pub struct Cli {
    // --- 运行模式 (Mode) ---
    /// 添加一个或多个下载链接并开始下载 (支持 file:// 本地路径)
    #[arg(long, num_args = 1.., value_name = "URL", help_heading = "Mode")]
    pub url: Vec<String>,
    /// 继续上次未完成的下载队列
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub resume: bool,
    /// 列出所有下载任务并退出
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub list: bool,
    /// 把失败的任务重新加入队列并开始下载
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub retry_failed: bool,
    /// 清除已完成和已失败的任务并退出
    #[arg(long, action = clap::ArgAction::SetTrue, help_heading = "Mode")]
    pub clear_finished: bool,

    // --- 下载选项 (Options) ---
    /// [链接模式] 内容类型，决定保存目录和默认扩展名
    #[arg(long, value_enum, default_value_t = MediaKind::Song, help_heading = "Options")]
    pub r#type: MediaKind,
    /// [链接模式] 任务标题，默认取链接中的文件名
    #[arg(long, help_heading = "Options")]
    pub title: Option<String>,
    /// [链接模式] 保存的文件名 (不含扩展名也可以)
    #[arg(long, value_name = "NAME", help_heading = "Options")]
    pub file_name: Option<String>,
    /// 设置最大并发下载数 (1-10)，会被保存供下次使用
    #[arg(short, long, value_parser = clap::value_parser!(i64), help_heading = "Options")]
    pub concurrency: Option<i64>,
    /// 设置文件保存目录
    #[arg(short, long, value_name = "DIR", default_value_os_t = PathBuf::from(constants::DEFAULT_SAVE_DIR), help_heading = "Options")]
    pub output: PathBuf,
    /// 任务队列与下载配置的保存目录 (默认 ~/.media-dl/state)
    #[arg(long, value_name = "DIR", help_heading = "Options")]
    pub state_dir: Option<PathBuf>,

    // --- 通用选项 (General) ---
    /// 显示此帮助信息并退出
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// 显示版本信息并退出
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (隐藏参数) 设置日志文件的输出级别，用于调试
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}
