// src/main.rs

use clap::{CommandFactory, FromArgMatches};
use colored::*;
use log::{error, info, warn};
use media_dl::{cli::Cli, error::AppError, logging, run_from_cli, symbols};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // 为 Windows 终端启用 ANSI 颜色支持。
    #[cfg(windows)]
    {
        colored::control::set_virtual_terminal(true).ok();
    }

    let after_help = format!(
        "示例:\n  # 下载一首歌曲\n  {bin} --url \"https://...\" --title \"晴天\"\n\n  # 以 2 个并发下载多个 MV\n  {bin} --url \"https://.../1.mp4\" \"https://.../2.mp4\" --type mv -c 2\n\n  # 继续上次中断的下载\n  {bin} --resume\n\n  # 查看下载队列\n  {bin} --list",
        bin = clap::crate_name!()
    );
    let cmd = Cli::command()
        .override_usage(format!("{} <MODE> [OPTIONS]", clap::crate_name!()))
        .after_help(after_help);
    let args = match Cli::from_arg_matches(&cmd.get_matches()) {
        Ok(args) => Arc::new(args),
        Err(e) => e.exit(),
    };
    logging::init_logger(args.log_level);

    if let Err(e) = run_from_cli(args).await {
        match e {
            AppError::UserInterrupt => {
                warn!("程序被用户中断。");
                std::process::exit(130);
            }
            _ => {
                error!("程序执行出错: {}", e);
                eprintln!("\n{} {}", *symbols::ERROR, format!("程序执行出错: {}", e).red());
                std::process::exit(1);
            }
        }
    }
    info!("程序正常退出。");
}
