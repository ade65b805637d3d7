//! 日志初始化.
//!
//! 两个输出层:
//! - stderr: 带颜色, 只显示时刻, 级别由 `-v` 次数决定 (默认 warn)
//! - 文件 `{log_dir}/tao-probe.{date}.log`: 无颜色, 带日期与 target, 默认 info,
//!   设置 `TAO_LOG` 时以环境变量为准
//!
//! tao-codec 只依赖 `log` 门面, 记录经 tracing-log 桥接进入这里的 subscriber.

use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt};

const LOG_FILE_PREFIX: &str = "tao-probe";
const FILE_LOG_ENV: &str = "TAO_LOG";

/// 进程退出前保持文件写线程存活
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// `-v` 次数对应的 (stderr 级别, 文件级别)
fn levels(verbosity: u8) -> (&'static str, &'static str) {
    match verbosity {
        0 => ("warn", "info"),
        1 => ("info", "debug"),
        _ => ("debug", "trace"),
    }
}

/// 安装全局 subscriber
///
/// 重复调用返回错误.
pub fn init(log_dir: &Path, verbosity: u8) -> Result<()> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("无法创建日志目录 {}", log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("无法在 {} 下创建日志文件", log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);
    // 重复初始化时保留第一个 guard, 后面的 try_init 会报错
    let _ = FILE_GUARD.set(guard);

    let (stderr_level, file_level) = levels(verbosity);
    let file_filter =
        EnvFilter::try_from_env(FILE_LOG_ENV).unwrap_or_else(|_| EnvFilter::new(file_level));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(LineFormat::STDERR)
        .with_filter(EnvFilter::new(stderr_level));
    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .event_format(LineFormat::FILE)
        .with_filter(file_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("全局日志 subscriber 已存在")
}

/// 单行日志格式
#[derive(Debug, Clone, Copy)]
struct LineFormat {
    colored: bool,
    /// 带日期与 target
    detailed: bool,
}

impl LineFormat {
    const STDERR: Self = Self {
        colored: true,
        detailed: false,
    };
    const FILE: Self = Self {
        colored: false,
        detailed: true,
    };
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        _ => "\x1b[34m",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let time_format = if self.detailed {
            "%Y-%m-%d %H:%M:%S%.3f"
        } else {
            "%H:%M:%S%.3f"
        };
        write!(writer, "[{}] ", Local::now().format(time_format))?;

        if self.colored {
            write!(writer, "{}{:5}\x1b[0m", level_color(*meta.level()), meta.level())?;
        } else {
            write!(writer, "{:5}", meta.level())?;
        }
        if self.detailed {
            write!(writer, " {}", meta.target())?;
        }
        writer.write_str(" > ")?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
