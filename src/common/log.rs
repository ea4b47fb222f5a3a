//! 日志初始化
//!
//! 基于 flexi_logger 把 `log` 门面的输出写到控制台，必要时同时写入日志目录。
//! 引擎内部只使用 `log` 门面宏，由调用方决定是否初始化。

use flexi_logger::{FileSpec, Logger, LoggerHandle};

use crate::core::error::DBError;

/// 初始化全局日志
///
/// `spec` 是 flexi_logger 的级别描述串（如 "info" 或 "columndb=debug"）。
/// 给定 `log_dir` 时日志同时落盘到该目录。
///
/// 返回的 `LoggerHandle` 需要由调用方持有，丢弃后异步写入会被刷停。
pub fn init_logging(spec: &str, log_dir: Option<&str>) -> Result<LoggerHandle, DBError> {
    let mut logger = Logger::try_with_str(spec)
        .map_err(|e| DBError::Config(format!("日志级别描述无效 \"{}\": {}", spec, e)))?;

    if let Some(dir) = log_dir {
        logger = logger
            .log_to_file(FileSpec::default().directory(dir))
            .duplicate_to_stderr(flexi_logger::Duplicate::Warn);
    }

    logger
        .start()
        .map_err(|e| DBError::Config(format!("日志初始化失败: {}", e)))
}
