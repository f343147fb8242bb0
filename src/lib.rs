mod checkin;
mod client;
mod config;
mod error;
pub mod notify;
pub mod parse;

pub use checkin::*;
pub use client::{FnClient, Forum};
pub use config::Config;
pub use error::CheckinError;
pub use notify::{CommandNotifier, LogNotifier, Notifier};

use anyhow::Context;
use std::fs::File;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_FILE: &str = "checkin.log";

pub fn init_log_env() -> anyhow::Result<()> {
    dotenvy::dotenv().ok(); // 没有 .env 也照常运行
    let file = File::create(LOG_FILE).with_context(|| format!("Failed to create {LOG_FILE}"))?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true),
        )
        .with(
            // 文件层：同样格式，关闭颜色
            fmt::layer()
                .with_file(true)
                .with_line_number(true)
                .with_target(true)
                .with_ansi(false)
                .with_writer(file),
        )
        .init();
    Ok(())
}
