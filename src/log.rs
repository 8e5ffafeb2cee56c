//! Levelled diagnostics for the interpreter.
//!
//! Everything goes to stderr so that script output on stdout stays clean.
//! Colours are only emitted when stderr is a terminal.

use std::fmt::Arguments;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use termion::color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warn => "aviso",
            Level::Info => "info",
            Level::Debug => "debug",
            Level::Trace => "traza",
        }
    }

    fn paint(&self) -> String {
        match self {
            Level::Error => color::Fg(color::Red).to_string(),
            Level::Warn => color::Fg(color::Yellow).to_string(),
            Level::Info => color::Fg(color::Green).to_string(),
            Level::Debug => color::Fg(color::Cyan).to_string(),
            Level::Trace => color::Fg(color::Magenta).to_string(),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "aviso" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" | "traza" => Ok(Level::Trace),
            _ => Err(format!("nivel de log invalido: {}", s)),
        }
    }

    fn from_u8(n: u8) -> Level {
        match n {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            _ => Level::Trace,
        }
    }
}

static LEVEL: AtomicU8 = AtomicU8::new(Level::Info as u8);

pub fn set_level(level: Level) {
    LEVEL.store(level as u8, Ordering::SeqCst);
}

pub fn level() -> Level {
    Level::from_u8(LEVEL.load(Ordering::Relaxed))
}

pub fn enabled(level: Level) -> bool {
    level as u8 <= LEVEL.load(Ordering::Relaxed)
}

/// Writes one diagnostic line. Called by the macros and by the terminal console.
pub fn emit(level: Level, args: Arguments) {
    if !enabled(level) {
        return;
    }
    let stderr = io::stderr();
    let mut out = stderr.lock();
    let result = if termion::is_tty(&io::stderr()) {
        writeln!(
            out,
            "{}pan [{}]{} {}",
            level.paint(),
            level.as_str(),
            color::Fg(color::Reset),
            args
        )
    } else {
        writeln!(out, "pan [{}] {}", level.as_str(), args)
    };
    // nowhere left to report a broken stderr
    let _ = result;
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::log::emit($crate::log::Level::Error, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::log::emit($crate::log::Level::Warn, format_args!($($arg)*)) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::log::emit($crate::log::Level::Debug, format_args!($($arg)*)) };
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn level_ordering() {
        assert!(Level::Error < Level::Warn);
        assert!(Level::Info < Level::Debug);
    }

    #[test]
    fn level_from_str() {
        assert_eq!(Level::from_str("ERROR"), Ok(Level::Error));
        assert_eq!(Level::from_str("aviso"), Ok(Level::Warn));
        assert_eq!(Level::from_str("Debug"), Ok(Level::Debug));
        assert!(Level::from_str("ruido").is_err());
    }

    #[test]
    fn round_trips_through_atomic() {
        for l in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace] {
            assert_eq!(Level::from_u8(l as u8), l);
        }
    }
}
