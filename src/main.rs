//! hoody：静态文档站脚手架
//! - `init` 询问部署参数并生成 www
//! - `run` 本地预览
//! - `deploy` 通过 SSH 发布 release
//! - `remove` 清理项目文件

mod cli;
mod commands;
mod config;
mod deploy;
mod error;
mod init;
mod preview;
mod prompt;
mod remove;
mod utils;

use std::process::ExitCode;

use clap::{error::ErrorKind, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{cli::Cli, config::Project, error::HoodyError};

const LOG_ENV: &str = "HOODY_LOG";

fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init();
}

fn main() -> ExitCode {
    setup_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            tracing::debug!(error = %e, "argument parsing failed");
            return report(HoodyError::BadSyntax);
        }
    };

    let project = match Project::from_current_dir() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::from(error::EXIT_FAILURE);
        }
    };

    match commands::run(cli, &project) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(err),
    }
}

/// 输出错误（调用方式错误时附带用法）并转换为退出码
fn report(err: HoodyError) -> ExitCode {
    let code = err.exit_code();
    if matches!(err, HoodyError::BadSyntax) {
        eprintln!("{}", err);
        eprintln!("{}", cli::usage());
    } else {
        eprintln!("❌ {:#}", anyhow::Error::from(err));
    }
    ExitCode::from(code)
}
