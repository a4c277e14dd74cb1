//! 流水线程序依赖的通用组件.

use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::env;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 日志级别环境变量.
pub const LOG_ENV: &str = "KNEE_LOG";

/// 在日志中输出简单分隔线.
#[inline]
pub fn sep() {
    log::info!("{SEP}");
}

/// 解析日志级别. 无法识别时返回 `None`.
pub fn parse_level(s: &str) -> Option<LevelFilter> {
    s.trim().parse().ok()
}

/// 初始化日志.
///
/// 1. 若环境变量 `$KNEE_LOG` 是合法的级别 (`error`, `warn`, `info`, `debug`, `trace`, `off`),
///    则使用该级别;
/// 2. 否则使用 `info`.
///
/// 重复初始化时什么也不做.
pub fn init_logger() {
    let level = env::var(LOG_ENV)
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(LevelFilter::Info);
    if SimpleLogger::new().with_level(level).init().is_err() {
        log::debug!("logger already initialised");
    }
}
