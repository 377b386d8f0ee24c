//! 日志初始化.
//!
//! 解码库只依赖 `log` 门面, 这里把 `log` 记录桥接到 tracing, 并挂两个输出:
//! - 终端: 彩色, 写到 stderr (stdout 可能承载原始 PCM)
//! - 文件: 无色, 按天滚动, 写到 `$cwd/logs/{prefix}.{date}.log`
//!
//! 级别由 `-v` 次数决定, `YIN_LOG` 环境变量 (EnvFilter 语法) 优先.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Local, Timelike};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// 日志目录
const LOG_DIR: &str = "logs";
/// 覆盖级别的环境变量
const LOG_ENV: &str = "YIN_LOG";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn make_filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)))
}

/// 初始化日志
///
/// 日志目录不可写时只保留终端输出. 重复调用无效果.
pub fn init(file_prefix: &str, verbosity: u8) {
    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .event_format(EventFormatter { colored: true })
        .with_filter(make_filter(verbosity));

    let file_layer = open_appender(file_prefix).map(|appender| {
        let (writer, guard) = tracing_appender::non_blocking(appender);
        LOG_GUARD.set(guard).ok();
        fmt::Layer::default()
            .with_writer(writer)
            .with_ansi(false)
            .event_format(EventFormatter { colored: false })
            .with_filter(make_filter(verbosity.max(1)))
    });

    // 已有全局 subscriber 时 (例如测试中重复初始化) 忽略
    Registry::default()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .ok();
}

fn open_appender(file_prefix: &str) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(LOG_DIR) {
        eprintln!("无法创建日志目录 {LOG_DIR}: {e}");
        return None;
    }
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_prefix)
        .filename_suffix("log")
        .build(LOG_DIR)
        .map_err(|e| eprintln!("无法创建日志文件: {e}"))
        .ok()
}

/// 时间戳 + 级别 + 消息, 终端输出带颜色
struct EventFormatter {
    colored: bool,
}

fn write_timestamp(writer: &mut Writer<'_>, now: DateTime<Local>) -> std::fmt::Result {
    write!(
        writer,
        "[{:02}-{:02} {:02}:{:02}:{:02}.{:03}] ",
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second(),
        now.timestamp_subsec_millis(),
    )
}

impl<S, N> FormatEvent<S, N> for EventFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        write_timestamp(&mut writer, Local::now())?;
        let level = *event.metadata().level();
        if self.colored {
            let color = match level {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                _ => "\x1b[34m",
            };
            write!(writer, "{color}{level:5}\x1b[0m > ")?;
        } else {
            write!(writer, "{level:5} > ")?;
        }
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
