// src/logging.rs

use crate::{cli::LogLevel, config::external::config_dir, constants};
use log::LevelFilter;
use std::{env, fs, fs::File, path::PathBuf};

/// 日志只写文件，终端留给进度条
pub fn init_logger(level: LogLevel) {
    let filter = LevelFilter::from(level);
    if filter == LevelFilter::Off {
        return;
    }
    let Some(file) = open_log_file() else {
        return;
    };

    let result = fern::Dispatch::new()
        .level(filter)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper_util", LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {} - {}",
                chrono::Local::now().format("%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .chain(file)
        .apply();
    if let Err(e) = result {
        eprintln!("警告: 日志系统初始化失败: {}", e);
    }
}

/// 配置目录优先，临时目录兜底
fn log_file_candidates() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Ok(dir) = config_dir() {
        paths.push(dir.join(constants::LOG_FILE_NAME));
    }
    paths.push(env::temp_dir().join(constants::LOG_FALLBACK_FILE_NAME));
    paths
}

fn open_log_file() -> Option<File> {
    for path in log_file_candidates() {
        if let Some(dir) = path.parent() {
            let _ = fs::create_dir_all(dir);
        }
        match fern::log_file(&path) {
            Ok(file) => return Some(file),
            Err(e) => eprintln!("警告: 无法打开日志文件 {:?}: {}", path, e),
        }
    }
    eprintln!("警告: 没有可用的日志文件，本次运行不记录日志");
    None
}
