//! Bridge from the `log` facade to a host-application logger.

use std::sync::{Arc, OnceLock};

/// Receives log records emitted by this library.
///
/// Exported via `UniFFI` so the host application can route records into its
/// own logging system.
///
/// # Examples
///
/// ```rust
/// use keychainkit_core::logger::{LogLevel, Logger};
///
/// struct StderrLogger;
///
/// impl Logger for StderrLogger {
///     fn log(&self, level: LogLevel, message: String) {
///         eprintln!("[{level:?}] {message}");
///     }
/// }
/// ```
///
/// ## Swift
///
/// ```swift
/// final class KeychainKitLogger: KeychainKit.Logger {
///     func log(level: KeychainKit.LogLevel, message: String) {
///         os_log("%{public}@", message)
///     }
/// }
///
/// KeychainKit.setLogger(logger: KeychainKitLogger()) // once, at launch
/// ```
#[uniffi::export(with_foreign)]
pub trait Logger: Sync + Send {
    /// Logs `message` at `level`.
    fn log(&self, level: LogLevel, message: String);
}

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum LogLevel {
    /// Very detailed tracing.
    Trace,
    /// Diagnostic detail, such as collapsed vault failures.
    Debug,
    /// Informational messages.
    Info,
    /// Potentially harmful situations.
    Warn,
    /// Errors.
    Error,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warn,
            log::Level::Info => Self::Info,
            log::Level::Debug => Self::Debug,
            log::Level::Trace => Self::Trace,
        }
    }
}

/// Forwards `log` records to the registered [`Logger`].
struct ForeignLogger;

impl ForeignLogger {
    /// Debug and trace records are only forwarded from this library's modules.
    fn forwards(metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info || metadata.target().starts_with("keychainkit")
    }
}

impl log::Log for ForeignLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::forwards(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !Self::forwards(record.metadata()) {
            return;
        }

        if let Some(logger) = LOGGER_INSTANCE.get() {
            logger.log(record.level().into(), format!("{}", record.args()));
        } else {
            eprintln!("Logger not set: {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER_INSTANCE: OnceLock<Arc<dyn Logger>> = OnceLock::new();

/// Registers the host application's logger.
///
/// Only the first call takes effect; later calls are reported on stderr and
/// otherwise ignored.
#[uniffi::export]
pub fn set_logger(logger: Arc<dyn Logger>) {
    if LOGGER_INSTANCE.set(logger).is_err() {
        eprintln!("Logger already set");
        return;
    }

    if let Err(e) = init_logger() {
        eprintln!("Failed to set logger: {e}");
    }
}

fn init_logger() -> Result<(), log::SetLoggerError> {
    static LOGGER: ForeignLogger = ForeignLogger;
    log::set_logger(&LOGGER)?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}

#[cfg(test)]
mod tests {
    use log::{Level, MetadataBuilder};
    use test_case::test_case;

    use super::*;

    #[test_case(Level::Debug, "keychainkit_core::store" => true)]
    #[test_case(Level::Trace, "keychainkit_core::backend::apple" => true)]
    #[test_case(Level::Debug, "hyper::client" => false)]
    #[test_case(Level::Info, "hyper::client" => true)]
    #[test_case(Level::Error, "other" => true)]
    fn test_forwarding_filter(level: Level, target: &str) -> bool {
        let metadata = MetadataBuilder::new().level(level).target(target).build();
        ForeignLogger::forwards(&metadata)
    }

    #[test]
    fn test_level_mapping() {
        assert_eq!(LogLevel::from(Level::Warn), LogLevel::Warn);
        assert_eq!(LogLevel::from(Level::Trace), LogLevel::Trace);
    }
}
