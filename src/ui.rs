// src/ui.rs

use crate::{
    constants,
    models::{DownloadTask, TaskStatus},
    symbols, utils,
};
use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::{collections::HashMap, time::Duration};

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn status_symbol(status: TaskStatus) -> &'static ColoredString {
    match status {
        TaskStatus::Pending => &*symbols::WAIT,
        TaskStatus::Downloading => &*symbols::INFO,
        TaskStatus::Completed => &*symbols::OK,
        TaskStatus::Failed => &*symbols::ERROR,
    }
}

/// 一行任务摘要，用于 `--list` 与结束时的报告
pub fn task_line(task: &DownloadTask) -> String {
    let detail = match task.status {
        TaskStatus::Completed => task.path.clone().unwrap_or_default(),
        TaskStatus::Failed => task.error.clone().unwrap_or_default().red().to_string(),
        _ => format!("{}%", task.progress),
    };
    format!(
        "{} {:<12} {:<6} {} {}",
        status_symbol(task.status),
        task.status.as_str(),
        task.kind.as_str(),
        utils::truncate_text(&task.title, 40).bold(),
        detail
    )
}

pub fn print_task_table(tasks: &[DownloadTask]) {
    if tasks.is_empty() {
        println!("{} 下载队列为空。", *symbols::INFO);
        return;
    }
    // 列表按创建时间倒序保存，展示时最早的在前
    for task in tasks.iter().rev() {
        println!("  {}", task_line(task));
    }
}

/// 终端进度面板，由任务订阅回调驱动
pub struct TaskBoard {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: HashMap<String, ProgressBar>,
}

impl Default for TaskBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskBoard {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(
            "{prefix:30.bold} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        Self {
            multi: MultiProgress::new(),
            style,
            bars: HashMap::new(),
        }
    }

    /// 在进度条上方打印一行，不打乱进度条
    pub fn println(&self, line: &str) {
        if self.multi.println(line).is_err() {
            println!("{}", line);
        }
    }

    pub fn render(&mut self, tasks: &[DownloadTask]) {
        for task in tasks.iter().rev() {
            match task.status {
                TaskStatus::Pending | TaskStatus::Downloading => {
                    let bar = self.bar_for(task);
                    bar.set_position(task.progress as u64);
                    let label = if task.status == TaskStatus::Pending {
                        "等待中"
                    } else {
                        "下载中"
                    };
                    bar.set_message(label);
                }
                TaskStatus::Completed | TaskStatus::Failed => {
                    if let Some(bar) = self.bars.remove(&task.id) {
                        bar.finish_and_clear();
                        self.println(&task_line(task));
                    }
                }
            }
        }
        // 被移除的任务
        self.bars.retain(|id, bar| {
            let alive = tasks.iter().any(|t| &t.id == id);
            if !alive {
                bar.finish_and_clear();
            }
            alive
        });
    }

    fn bar_for(&mut self, task: &DownloadTask) -> &ProgressBar {
        self.bars.entry(task.id.clone()).or_insert_with(|| {
            let bar = self.multi.add(ProgressBar::new(constants::progress::DONE as u64));
            bar.set_style(self.style.clone());
            bar.set_prefix(utils::truncate_text(&task.title, 30));
            bar.enable_steady_tick(Duration::from_millis(200));
            bar
        })
    }

    pub fn clear(&mut self) {
        for (_, bar) in self.bars.drain() {
            bar.finish_and_clear();
        }
    }
}
