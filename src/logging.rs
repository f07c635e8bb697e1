//! Minimal backend for the `log` facade: stderr natively, the browser console on wasm.

use log::{Level, LevelFilter, Log, Metadata, Record};

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        write_line(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_family = "wasm")]
fn write_line(level: Level, line: &str) {
    use web_sys::console;

    let line = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::Error => console::error_1(&line),
        Level::Warn => console::warn_1(&line),
        Level::Info => console::info_1(&line),
        Level::Debug | Level::Trace => console::debug_1(&line),
    }
}

#[cfg(not(target_family = "wasm"))]
fn write_line(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// Installs the logger and sets the maximum level.
///
/// Safe to call more than once: the logger is installed by the first call,
/// later calls only change the level.
pub fn init(level: LevelFilter) {
    if log::set_logger(&LOGGER).is_err() {
        log::debug!("logger already installed");
    }
    log::set_max_level(level);
}
