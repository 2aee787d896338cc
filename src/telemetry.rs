//! `tracing` output routed to the browser console.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use wasm_bindgen::JsValue;

/// Hands out one [`ConsoleWriter`] per event.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleMakeWriter;

/// Buffers a formatted event and emits it as a single console call on drop.
pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if line.is_empty() {
            return;
        }
        let value = JsValue::from_str(line);
        match self.level {
            Level::ERROR => web_sys::console::error_1(&value),
            Level::WARN => web_sys::console::warn_1(&value),
            Level::INFO => web_sys::console::info_1(&value),
            _ => web_sys::console::debug_1(&value),
        }
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

/// Installs the global subscriber. Timestamps and colours are left to the
/// console.
pub fn init(max_level: Level) {
    let result = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .without_time()
        .with_ansi(false)
        .with_target(false)
        .with_writer(ConsoleMakeWriter)
        .try_init();

    if let Err(err) = result {
        web_sys::console::warn_1(&JsValue::from_str(&format!(
            "tracing already initialised: {err}"
        )));
    }
}
