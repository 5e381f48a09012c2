//! Pluggable logging capability.
//!
//! The connection layer never talks to a logging backend directly. It is handed
//! an `Arc<dyn Logging>` and reports every send, every receive and every protocol
//! anomaly through it. [`TracingLogger`] forwards to [`tracing`], which is what
//! the client uses unless the caller supplies something else.
//!
//! The `hz_*!` macros take the logger first and a format template after it:
//!
//! ```
//! use std::sync::Arc;
//! use hzlink_core::logging::{Logging, TracingLogger};
//! use hzlink_core::hz_trace;
//!
//! let logger: Arc<dyn Logging> = Arc::new(TracingLogger);
//! hz_trace!(logger, "sending cid={} type=0x{:04x}", 7, 0x0f);
//! ```

use std::fmt;

/// Severity-named logging operations used by the connection layer.
pub trait Logging: Send + Sync {
    /// Per-frame send/receive chatter.
    fn trace(&self, args: fmt::Arguments<'_>);

    /// Lifecycle milestones.
    fn info(&self, args: fmt::Arguments<'_>);

    /// Recoverable anomalies.
    fn warn(&self, args: fmt::Arguments<'_>);

    /// Protocol anomalies and transport failures.
    fn error(&self, args: fmt::Arguments<'_>);

    /// Unrecoverable conditions. Implementations decide whether to abort.
    fn fatal(&self, args: fmt::Arguments<'_>);
}

/// [`Logging`] implementation backed by the `tracing` crate.
///
/// `fatal` is reported as an error event tagged `fatal = true`; it never
/// terminates the process.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logging for TracingLogger {
    fn trace(&self, args: fmt::Arguments<'_>) {
        tracing::trace!("{}", args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        tracing::info!("{}", args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        tracing::warn!("{}", args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        tracing::error!("{}", args);
    }

    fn fatal(&self, args: fmt::Arguments<'_>) {
        tracing::error!(fatal = true, "{}", args);
    }
}

/// Logs at trace level through a [`Logging`] implementation.
#[macro_export]
macro_rules! hz_trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logging::Logging::trace(&*$logger, format_args!($($arg)+))
    };
}

/// Logs at info level through a [`Logging`] implementation.
#[macro_export]
macro_rules! hz_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logging::Logging::info(&*$logger, format_args!($($arg)+))
    };
}

/// Logs at warn level through a [`Logging`] implementation.
#[macro_export]
macro_rules! hz_warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logging::Logging::warn(&*$logger, format_args!($($arg)+))
    };
}

/// Logs at error level through a [`Logging`] implementation.
#[macro_export]
macro_rules! hz_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logging::Logging::error(&*$logger, format_args!($($arg)+))
    };
}

/// Logs at fatal level through a [`Logging`] implementation.
#[macro_export]
macro_rules! hz_fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::logging::Logging::fatal(&*$logger, format_args!($($arg)+))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        lines: Mutex<Vec<String>>,
    }

    impl Logging for Recorder {
        fn trace(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(format!("TRACE {args}"));
        }
        fn info(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(format!("INFO {args}"));
        }
        fn warn(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(format!("WARN {args}"));
        }
        fn error(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(format!("ERROR {args}"));
        }
        fn fatal(&self, args: fmt::Arguments<'_>) {
            self.lines.lock().unwrap().push(format!("FATAL {args}"));
        }
    }

    #[test]
    fn test_macros_route_to_matching_severity() {
        let recorder = Arc::new(Recorder::default());
        let logger: Arc<dyn Logging> = recorder.clone();

        hz_trace!(logger, "cid={}", 2);
        hz_info!(logger, "connected to {}", "127.0.0.1:5701");
        hz_warn!(logger, "slow");
        hz_error!(logger, "type 0x{:04x}", 0x6d);
        hz_fatal!(logger, "giving up");

        let lines = recorder.lines.lock().unwrap();
        assert_eq!(
            *lines,
            vec![
                "TRACE cid=2",
                "INFO connected to 127.0.0.1:5701",
                "WARN slow",
                "ERROR type 0x006d",
                "FATAL giving up",
            ]
        );
    }

    #[test]
    fn test_tracing_logger_does_not_panic_without_subscriber() {
        let logger = TracingLogger;
        hz_trace!(&logger, "trace {}", 1);
        hz_fatal!(&logger, "fatal {}", 2);
    }

    #[test]
    fn test_logger_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Logging>();
    }
}
