//! Logging facade.
//!
//! Most call sites just use the `log` crate's macros directly, matching the
//! `BOX_TRACE`/`BOX_NOTICE`/`BOX_WARNING`/`BOX_ERROR` call sites this crate's
//! lock and reverse-diff code is grounded on. `BackupLogSink` exists for
//! callers embedding this crate in a process that wants structured
//! callbacks (for example routing to a daemon's own log transport) instead
//! of installing a `log::Log` implementation globally.

/// Severity, ordered least to most severe, mirroring the four macro names
/// the original logs at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Notice,
    Warning,
    Error,
}

/// A structured log callback. Implementors filter by overriding `enabled`;
/// `log` is only called for levels that pass it.
pub trait BackupLogSink {
    fn enabled(&self, level: LogLevel) -> bool {
        level >= LogLevel::Notice
    }

    fn log(&self, level: LogLevel, message: &str);

    fn trace(&self, message: &str) {
        if self.enabled(LogLevel::Trace) {
            self.log(LogLevel::Trace, message);
        }
    }

    fn notice(&self, message: &str) {
        if self.enabled(LogLevel::Notice) {
            self.log(LogLevel::Notice, message);
        }
    }

    fn warning(&self, message: &str) {
        if self.enabled(LogLevel::Warning) {
            self.log(LogLevel::Warning, message);
        }
    }

    fn error(&self, message: &str) {
        if self.enabled(LogLevel::Error) {
            self.log(LogLevel::Error, message);
        }
    }
}

/// A `BackupLogSink` that forwards to the `log` crate's global facade, for
/// callers who already have a `log::Log` implementation installed and just
/// want this crate's calls to go through it uniformly.
pub struct LogCrateSink;

impl BackupLogSink for LogCrateSink {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Trace => log::trace!("{message}"),
            LogLevel::Notice => log::info!("{message}"),
            LogLevel::Warning => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }
    }
}
