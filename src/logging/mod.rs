//! 日志初始化.
//!
//! 库 crate 通过 `log` 门面输出日志, 这里安装基于 `tracing-subscriber` 的
//! 控制台订阅者, 其自带的 `tracing-log` 桥接会把 `log` 记录一并转发.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FormatEvent, FormatFields, format::Writer},
    layer::{Layer, SubscriberExt},
    registry::LookupSpan,
    util::SubscriberInitExt,
};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// EnvFilter 指令, 如 `info` 或 `esprobe_codec=debug`
    #[serde(default = "default_level")]
    pub level: String,
    /// 控制台输出是否带颜色
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            ansi: default_true(),
        }
    }
}

pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = build_filter(&config.level)?;

    let console_layer = fmt::Layer::default()
        .with_writer(std::io::stderr)
        .with_ansi(config.ansi)
        .event_format(ConsoleFormatter { ansi: config.ansi })
        .with_filter(filter);

    Registry::default()
        .with(console_layer)
        .try_init()
        .context("安装日志订阅者失败")?;

    Ok(())
}

fn build_filter(level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(level).with_context(|| format!("日志级别配置非法, level={level}"))
}

struct ConsoleFormatter {
    ansi: bool,
}

impl<S, N> FormatEvent<S, N> for ConsoleFormatter
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
        let meta = event.metadata();
        if self.ansi {
            let color = match *meta.level() {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                _ => "\x1b[34m",
            };
            write!(writer, "{}{:5}\x1b[0m ", color, meta.level().to_string())?;
        } else {
            write!(writer, "{:5} ", meta.level().to_string())?;
        }
        write!(
            writer,
            "{}:{} > ",
            meta.file().unwrap_or("unknown"),
            meta.line().unwrap_or(0)
        )?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
