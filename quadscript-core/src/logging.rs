//! Unified logging path.
//!
//! Every diagnostic goes through the `log` facade into a single sink that
//! prefers a host-provided logger and falls back to a `core.log` file plus
//! stderr until the host supplies one. The sink can be swapped mid-run:
//! hosts typically hand over their logger after the core already exists.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    sync::Mutex,
};

use log::{Level, LevelFilter, Metadata, Record};

/// Host-provided log sink: receives the level and the formatted message.
pub type HostLogFn = Box<dyn Fn(Level, &str) + Send + Sync>;

const FALLBACK_LOG_FILE: &str = "core.log";

struct CoreLogger {
    host: Mutex<Option<HostLogFn>>,
    file: Mutex<Option<File>>,
}

static LOGGER: CoreLogger = CoreLogger {
    host: Mutex::new(None),
    file: Mutex::new(None),
};

impl log::Log for CoreLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = format!("{}", record.args());

        if let Ok(host) = self.host.lock()
            && let Some(sink) = host.as_ref()
        {
            sink(record.level(), &message);
            return;
        }

        let line = format!("[{}] {message}", record.level());
        eprintln!("{line}");

        if let Ok(mut file) = self.file.lock() {
            if file.is_none() {
                *file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(FALLBACK_LOG_FILE)
                    .ok();
            }
            if let Some(sink) = file.as_mut() {
                let _ = writeln!(sink, "{line}");
            }
        }
    }

    fn flush(&self) {}
}

/// Installs the unified logger. Later calls are no-ops, as is installation
/// after some other logger claimed the facade (test harnesses do this).
pub fn install() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

/// Routes subsequent records to the host sink, or back to the fallback
/// file-plus-stderr sink when `None`.
pub fn set_host_sink(sink: Option<HostLogFn>) {
    if let Ok(mut host) = LOGGER.host.lock() {
        *host = sink;
    }
}
