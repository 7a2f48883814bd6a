//! Shared pieces of the order aggregate query round-trip benchmark.
//!
//! The benchmark reads one "order aggregate" (order header, line items,
//! shipping and payments) from four related tables using four different
//! access strategies. This crate holds everything that does not touch the
//! store itself:
//!
//! - [`types`]: the typed records and the assembled [`types::Aggregate`]
//! - [`value`]: raw, untyped result sets as they come back from a store
//! - [`decode`]: the row decoder turning raw rows into typed records
//! - [`assemble`]: the aggregate assembler and the single-or-none reduction
//! - [`error`]: the error kinds every strategy can surface

use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root, runtime::ConfigErrors},
    encode::{Encode, pattern::PatternEncoder},
    filter::threshold::ThresholdFilter,
};
use std::{backtrace, env, io};
use thiserror::Error as ThisError;

pub mod assemble;
pub mod decode;
pub mod error;
pub mod types;
pub mod value;

pub use error::{BenchError, BranchFailure, BranchFailures};

#[derive(Debug)]
struct BacktracePatternEncoder {
    pattern_encoder: PatternEncoder,
    is_backtrace_enabled: bool,
}

impl BacktracePatternEncoder {
    fn new(pattern: &str) -> Self {
        BacktracePatternEncoder {
            pattern_encoder: PatternEncoder::new(pattern),
            is_backtrace_enabled: env::var("RUST_BACKTRACE").is_ok()
                || env::var("RUST_LIB_BACKTRACE").is_ok(),
        }
    }
}

impl Encode for BacktracePatternEncoder {
    fn encode(
        &self,
        w: &mut dyn log4rs::encode::Write,
        record: &log::Record<'_>,
    ) -> anyhow::Result<()> {
        if record.level() == log::Level::Error && self.is_backtrace_enabled {
            let args = format_args!(
                "{}\nBacktrace:\n{}",
                record.args(),
                backtrace::Backtrace::capture()
            );
            let new_record = log::Record::builder()
                .args(args)
                .level(record.level())
                .target(record.target())
                .module_path(record.module_path())
                .file(record.file())
                .line(record.line())
                .build();
            self.pattern_encoder.encode(w, &new_record)?;
        } else {
            self.pattern_encoder.encode(w, record)?;
        }
        Ok(())
    }
}

/// Failure to bring up the log4rs backend.
#[derive(Debug, ThisError)]
pub enum LoggerError {
    #[error("failed to open log file '{path}': {source}")]
    LogFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid logger configuration: {0}")]
    Config(#[from] ConfigErrors),

    #[error("logger already initialized: {0}")]
    AlreadySet(#[from] SetLoggerError),
}

/// Install the process-wide logger.
///
/// Records at `log_level` and above go to stderr. When `file_path` is given
/// the same records are also appended to that file.
pub fn initialize_logger(
    log_level: LevelFilter,
    file_path: Option<&str>,
) -> Result<(), LoggerError> {
    const LOGGING_PATTERN: &str = "{d} {l} {f}:{L} - {m}\n";

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
        .build();

    let mut config_builder = Config::builder();
    let mut root_builder = Root::builder();

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
            .encoder(Box::new(BacktracePatternEncoder::new(LOGGING_PATTERN)))
            .build(path)
            .map_err(|source| LoggerError::LogFile {
                path: path.to_string(),
                source,
            })?;

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root_builder = root_builder.appender("logfile");
    }

    let config = config_builder
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(root_builder.appender("stderr").build(log_level))?;

    let _handle = log4rs::init_config(config)?;

    Ok(())
}
