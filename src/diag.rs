//! Per-run diagnostic level.
//!
//! The level travels with [`crate::config::SealConfig`] instead of living
//! in a global, so several passes with different levels can coexist in
//! one process. Messages that pass the level are handed to `tracing`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    All,
    Trace,
    Debug,
    Info,
    #[default]
    Warning,
    Error,
    Off,
}

impl DiagnosticLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiagnosticLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "off" => Ok(Self::Off),
            _ => Err(ConfigError::UnknownLevel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    level: DiagnosticLevel,
}

impl Diagnostics {
    pub fn new(level: DiagnosticLevel) -> Self {
        Self { level }
    }

    pub fn level(&self) -> DiagnosticLevel {
        self.level
    }

    pub fn enabled(&self, level: DiagnosticLevel) -> bool {
        level != DiagnosticLevel::Off && level >= self.level
    }

    pub fn emit(&self, level: DiagnosticLevel, message: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        match level {
            DiagnosticLevel::All | DiagnosticLevel::Trace => tracing::trace!("{message}"),
            DiagnosticLevel::Debug => tracing::debug!("{message}"),
            DiagnosticLevel::Info => tracing::info!("{message}"),
            DiagnosticLevel::Warning => tracing::warn!("{message}"),
            DiagnosticLevel::Error => tracing::error!("{message}"),
            DiagnosticLevel::Off => {}
        }
    }

    pub fn trace(&self, message: fmt::Arguments<'_>) {
        self.emit(DiagnosticLevel::Trace, message);
    }

    pub fn debug(&self, message: fmt::Arguments<'_>) {
        self.emit(DiagnosticLevel::Debug, message);
    }

    pub fn info(&self, message: fmt::Arguments<'_>) {
        self.emit(DiagnosticLevel::Info, message);
    }

    pub fn warn(&self, message: fmt::Arguments<'_>) {
        self.emit(DiagnosticLevel::Warning, message);
    }
}
