// src/lib.rs

pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod resolver;
pub mod storage;
pub mod store;
pub mod symbols;
pub mod ui;
pub mod utils;

pub use downloader::DownloadManager;
pub use models::{CreateTaskPayload, DownloadEvent, DownloadTask, TaskPatch, TaskStatus, TaskType};

use crate::{
    cli::Cli,
    config::{AppConfig, DownloadConfig},
    error::{AppError, AppResult},
    models::ToastLevel,
    persistence::{ConfigRepository, JsonFileBackend, KeyValueBackend, TaskRepository},
    storage::FsStorage,
    store::TaskStore,
    ui::TaskBoard,
};
use anyhow::anyhow;
use colored::*;
use log::{debug, info, warn};
use std::{
    collections::HashSet,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::broadcast::error::RecvError;
use url::Url;

/// 库的公共入口点，由 `main.rs` 调用
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<()> {
    debug!("CLI 参数: {:?}", args);
    let config = AppConfig::load()?;
    debug!("加载的应用配置: {:?}", config);

    let state_dir = match &args.state_dir {
        Some(dir) => dir.clone(),
        None => config::external::config_dir()?.join(constants::STATE_DIR_NAME),
    };
    info!("任务状态目录: {:?}", state_dir);
    let backend: Arc<dyn KeyValueBackend> = Arc::new(JsonFileBackend::new(state_dir));

    // 只读取/整理任务列表的模式不需要启动调度器
    if args.list {
        let store = TaskStore::open(TaskRepository::new(backend));
        ui::print_header("下载任务");
        ui::print_task_table(&store.snapshot());
        return Ok(());
    }
    if args.clear_finished {
        let store = TaskStore::open(TaskRepository::new(backend));
        let removed = store.clear_finished();
        println!("{} 已清除 {} 个已结束的任务。", *symbols::OK, removed);
        return Ok(());
    }

    let payloads = build_payloads(&args)?;
    if let Some(concurrency) = args.concurrency {
        // 在调度器启动前写入，恢复的任务直接按新的并发数调度
        ConfigRepository::new(backend.clone()).save(&DownloadConfig::new(concurrency))?;
    }

    let storage = Arc::new(FsStorage::new(args.output.clone()));
    let manager = DownloadManager::new(storage, backend, config)?;
    run_queue(&manager, payloads, args.retry_failed, &args.output).await
}

fn build_payloads(args: &Cli) -> AppResult<Vec<CreateTaskPayload>> {
    let kind: TaskType = args.r#type.into();
    let multiple = args.url.len() > 1;
    if multiple && args.file_name.is_some() {
        warn!("指定了多个链接，忽略 --file-name");
        println!("{} 指定了多个链接，将忽略 --file-name。", *symbols::WARN);
    }

    args.url
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let url = raw.trim();
            Url::parse(url).map_err(|e| {
                AppError::UserInputError(format!("无效的下载链接 '{}': {}", url, e))
            })?;
            let title = match (&args.title, multiple) {
                (Some(title), false) => title.clone(),
                (Some(title), true) => format!("{} ({})", title, i + 1),
                (None, _) => utils::title_from_url(url).unwrap_or_else(|| format!("download-{}", i + 1)),
            };
            let mut payload = CreateTaskPayload::new(kind, title).with_url(url);
            if !multiple {
                payload.file_name = args.file_name.clone();
            }
            Ok(payload)
        })
        .collect()
}

async fn run_queue(
    manager: &DownloadManager,
    payloads: Vec<CreateTaskPayload>,
    retry_failed: bool,
    output: &Path,
) -> AppResult<()> {
    let config = manager.download_config();
    ui::print_header(&format!(
        "开始下载 (并发数: {}，按 {} 暂停并退出)",
        config.concurrency,
        *symbols::CTRL_C
    ));
    println!("{} 文件保存到: {}", *symbols::INFO, output.display());

    let board = Arc::new(Mutex::new(TaskBoard::new()));
    let sink = board.clone();
    let subscription = manager.subscribe_download_tasks(move |tasks| {
        sink.lock().unwrap_or_else(PoisonError::into_inner).render(tasks);
    });

    // 提示消息打印在进度条上方
    let mut events = manager.subscribe_events();
    let printer = board.clone();
    let toasts = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(DownloadEvent::Toast { level, message, .. }) => {
                    let symbol = match level {
                        ToastLevel::Success => &*symbols::OK,
                        ToastLevel::Error => &*symbols::ERROR,
                    };
                    printer
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .println(&format!("{} {}", symbol, message));
                }
                Ok(DownloadEvent::LibraryRefresh(refresh)) => {
                    debug!("曲库刷新: {} ({})", refresh.path, refresh.kind);
                }
                Err(RecvError::Lagged(skipped)) => debug!("跳过了 {} 条提示消息", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    // 报告只统计本次运行涉及的任务
    let mut tracked: HashSet<String> = manager
        .get_download_tasks()
        .into_iter()
        .filter(|t| t.status.is_unfinished() || (retry_failed && t.status == TaskStatus::Failed))
        .map(|t| t.id)
        .collect();
    for payload in payloads {
        tracked.insert(manager.create_download_task(payload)?.id);
    }
    if retry_failed {
        let requeued = manager.requeue_failed_tasks();
        info!("重新排队 {} 个失败任务", requeued);
    }

    let interrupted = tokio::select! {
        _ = manager.wait_idle() => false,
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => true,
            Err(e) => {
                warn!("无法监听 Ctrl-C 信号: {}", e);
                manager.wait_idle().await;
                false
            }
        }
    };

    drop(subscription);
    toasts.abort();
    board.lock().unwrap_or_else(PoisonError::into_inner).clear();

    if interrupted {
        let paused = manager.pause_all_downloads();
        warn!("用户通过 Ctrl+C 中断，已暂停 {} 个任务", paused);
        println!(
            "\n{} 已暂停 {} 个下载任务，使用 --resume 继续。",
            *symbols::WARN,
            paused
        );
        return Err(AppError::UserInterrupt);
    }

    let tasks: Vec<DownloadTask> = manager
        .get_download_tasks()
        .into_iter()
        .filter(|t| tracked.contains(&t.id))
        .collect();
    report(&tasks)
}

fn report(tasks: &[DownloadTask]) -> AppResult<()> {
    let completed = tasks.iter().filter(|t| t.status == TaskStatus::Completed).count();
    let failed: Vec<&DownloadTask> = tasks.iter().filter(|t| t.status == TaskStatus::Failed).collect();

    ui::print_header("下载报告");
    if !failed.is_empty() {
        ui::print_sub_header("失败的任务");
    }
    for task in failed.iter().rev() {
        println!("  {}", ui::task_line(task));
    }
    println!(
        "{} | {} | 总计: {}",
        format!("已完成: {}", completed).green(),
        format!("失败: {}", failed.len()).red(),
        tasks.len()
    );
    if failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::Other(anyhow!(
            "{} 个下载任务失败，可使用 --retry-failed 重试。",
            failed.len()
        )))
    }
}
