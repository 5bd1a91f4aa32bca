//! Diagnostic log hooks.
//!
//! Every diagnostic emitted by the crate goes to the [`log`] facade. In
//! addition, callers may register up to two process-wide callbacks: one that
//! receives `(severity, text)` and one that receives
//! `(severity, function, text)`. Without a registered callback the message is
//! only forwarded to the `log` facade.
//!
//! The callbacks live in process-wide mutexes. Swapping a callback while
//! another thread is logging is not reentrant-safe: the other thread may see
//! either the old or the new callback for the message in flight.
//!
//! ```
//! use mdf_rs::logging::{self, MdfLogSeverity};
//!
//! fn print_it(severity: MdfLogSeverity, text: &str) {
//!     eprintln!("[{severity}] {text}");
//! }
//!
//! logging::set_log_callback_1(Some(print_it)).unwrap();
//! logging::set_log_callback_1(None).unwrap();
//! ```

use std::sync::Mutex;

use crate::{Error, Result};

/// Severity attached to every diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MdfLogSeverity {
    Trace,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Alert,
    Emergency,
}

impl core::fmt::Display for MdfLogSeverity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            MdfLogSeverity::Trace => "trace",
            MdfLogSeverity::Debug => "debug",
            MdfLogSeverity::Info => "info",
            MdfLogSeverity::Notice => "notice",
            MdfLogSeverity::Warning => "warning",
            MdfLogSeverity::Error => "error",
            MdfLogSeverity::Critical => "critical",
            MdfLogSeverity::Alert => "alert",
            MdfLogSeverity::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

impl MdfLogSeverity {
    fn level(self) -> log::Level {
        match self {
            MdfLogSeverity::Trace => log::Level::Trace,
            MdfLogSeverity::Debug => log::Level::Debug,
            MdfLogSeverity::Info | MdfLogSeverity::Notice => log::Level::Info,
            MdfLogSeverity::Warning => log::Level::Warn,
            _ => log::Level::Error,
        }
    }
}

/// Callback receiving severity and message text.
pub type LogCallback1 = fn(MdfLogSeverity, &str);
/// Callback receiving severity, originating function and message text.
pub type LogCallback2 = fn(MdfLogSeverity, &str, &str);

static LOG_CALLBACK_1: Mutex<Option<LogCallback1>> = Mutex::new(None);
static LOG_CALLBACK_2: Mutex<Option<LogCallback2>> = Mutex::new(None);

fn install<T>(slot: &Mutex<Option<T>>, callback: Option<T>) -> Result<()> {
    let mut guard = slot
        .lock()
        .map_err(|_| Error::CallbackError("log callback lock poisoned".into()))?;
    match callback {
        Some(cb) => {
            if guard.is_some() {
                return Err(Error::CallbackError(
                    "Failed to set log callback, already set".into(),
                ));
            }
            *guard = Some(cb);
        }
        None => *guard = None,
    }
    Ok(())
}

/// Registers (`Some`) or clears (`None`) the severity-and-text callback.
///
/// Registering while a callback is already installed fails with
/// [`Error::CallbackError`]; clear it first.
pub fn set_log_callback_1(callback: Option<LogCallback1>) -> Result<()> {
    install(&LOG_CALLBACK_1, callback)
}

/// Registers (`Some`) or clears (`None`) the severity-function-text callback.
pub fn set_log_callback_2(callback: Option<LogCallback2>) -> Result<()> {
    install(&LOG_CALLBACK_2, callback)
}

/// Removes both callbacks.
pub fn clear_log_callbacks() {
    if let Ok(mut guard) = LOG_CALLBACK_1.lock() {
        *guard = None;
    }
    if let Ok(mut guard) = LOG_CALLBACK_2.lock() {
        *guard = None;
    }
}

/// Ready-made callback forwarding to the `log` crate.
pub fn log_to_log_crate_1(severity: MdfLogSeverity, text: &str) {
    log::log!(target: "mdf_rs::callback", severity.level(), "[{severity}]: {text}");
}

/// Ready-made callback forwarding to the `log` crate, including the function name.
pub fn log_to_log_crate_2(severity: MdfLogSeverity, function: &str, text: &str) {
    log::log!(target: "mdf_rs::callback", severity.level(), "[{function}][{severity}]: {text}");
}

/// Dispatches one diagnostic to the `log` facade and the registered callbacks.
pub(crate) fn emit(severity: MdfLogSeverity, function: &str, text: &str) {
    log::log!(severity.level(), "{function}: {text}");

    let cb1 = LOG_CALLBACK_1.lock().ok().and_then(|guard| *guard);
    if let Some(cb) = cb1 {
        cb(severity, text);
    }
    let cb2 = LOG_CALLBACK_2.lock().ok().and_then(|guard| *guard);
    if let Some(cb) = cb2 {
        cb(severity, function, text);
    }
}

macro_rules! mdf_log {
    ($severity:ident, $function:expr, $($arg:tt)+) => {
        $crate::logging::emit(
            $crate::logging::MdfLogSeverity::$severity,
            $function,
            &::std::format!($($arg)+),
        )
    };
}

pub(crate) use mdf_log;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static SEEN: AtomicUsize = AtomicUsize::new(0);

    fn counting(_: MdfLogSeverity, _: &str, text: &str) {
        if text.contains("probe") {
            SEEN.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn callback_receives_messages_and_rejects_double_install() {
        set_log_callback_2(Some(counting)).unwrap();
        assert!(matches!(
            set_log_callback_2(Some(counting)),
            Err(Error::CallbackError(_))
        ));

        mdf_log!(Info, "tests", "probe {}", 1);
        assert!(SEEN.load(Ordering::SeqCst) >= 1);

        set_log_callback_2(None).unwrap();
        let before = SEEN.load(Ordering::SeqCst);
        mdf_log!(Info, "tests", "probe {}", 2);
        assert_eq!(SEEN.load(Ordering::SeqCst), before);
    }

    #[test]
    fn severity_maps_to_log_level() {
        assert_eq!(MdfLogSeverity::Notice.level(), log::Level::Info);
        assert_eq!(MdfLogSeverity::Critical.level(), log::Level::Error);
        assert_eq!(MdfLogSeverity::Warning.to_string(), "warning");
    }
}
