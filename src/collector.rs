//! Data Collector
//!
//! The logging contract the engine reports through. Hosts plug in their own sink;
//! `TracingCollector` forwards everything to `tracing`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

pub trait DataCollector: Send + Sync {
    fn log_message(&self, level: LogLevel, text: &str, category: &str);

    fn log_exception(&self, text: &str, error: &anyhow::Error);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingCollector;

impl DataCollector for TracingCollector {
    fn log_message(&self, level: LogLevel, text: &str, category: &str) {
        match level {
            LogLevel::Trace => tracing::trace!(category, "{}", text),
            LogLevel::Debug => tracing::debug!(category, "{}", text),
            LogLevel::Info => tracing::info!(category, "{}", text),
            LogLevel::Warning => tracing::warn!(category, "{}", text),
            LogLevel::Error => tracing::error!(category, "{}", text),
        }
    }

    fn log_exception(&self, text: &str, error: &anyhow::Error) {
        tracing::error!("{}: {:#}", text, error);
    }
}
