//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Stamp every line with `[YYYY/MM/DD HH:MM:SS +ZZZZ]` local time
//! - Route output to standard output or an append-mode log file
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level from `RUST_LOG`, falling back to the configured level
//! - A dash placeholder stands in when the clock cannot be read
//! - Colour codes only when the destination is a terminal
//! - A process about to detach logs to stderr, leaving stdout for the
//!   child PID

use std::fmt;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone, Utc};
use thiserror::Error;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Written instead of a timestamp when the clock is unusable.
pub const TIMESTAMP_PLACEHOLDER: &str = "[---------- -------- -----]";

const TIMESTAMP_FORMAT: &str = "[%Y/%m/%d %H:%M:%S %z]";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("logging already initialized: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stdout,
    Stderr,
}

impl LogTarget {
    /// The configured log file wins. Without one, a process that is going
    /// to detach keeps stdout free, since its parent prints only the PID.
    pub fn select(config: &ObservabilityConfig, detach: bool) -> Self {
        match &config.log_file {
            Some(path) => LogTarget::File(path.clone()),
            None if detach => LogTarget::Stderr,
            None => LogTarget::Stdout,
        }
    }
}

/// Render `now` in `tz`, or the placeholder if it has no calendar form.
pub fn format_timestamp<Tz>(now: SystemTime, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let utc = now
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| {
            let secs = i64::try_from(d.as_secs()).ok()?;
            DateTime::<Utc>::from_timestamp(secs, d.subsec_nanos())
        });

    match utc {
        Some(utc) => utc.with_timezone(tz).format(TIMESTAMP_FORMAT).to_string(),
        None => TIMESTAMP_PLACEHOLDER.to_string(),
    }
}

/// Local-time timer for the fmt layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketedLocalTime;

impl FormatTime for BracketedLocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", format_timestamp(SystemTime::now(), &Local))
    }
}

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig, detach: bool) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.log_level.as_str().into());

    let (writer, ansi) = match LogTarget::select(config, detach) {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LoggingError::Open { path, source })?;
            (BoxMakeWriter::new(Mutex::new(file)), false)
        }
        LogTarget::Stdout => (
            BoxMakeWriter::new(std::io::stdout),
            std::io::stdout().is_terminal(),
        ),
        LogTarget::Stderr => (
            BoxMakeWriter::new(std::io::stderr),
            std::io::stderr().is_terminal(),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_timer(BracketedLocalTime)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use std::time::Duration;

    #[test]
    fn formats_with_offset() {
        // 2021-03-04 05:06:07 UTC
        let now = UNIX_EPOCH + Duration::from_secs(1_614_834_367);
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_timestamp(now, &tz), "[2021/03/04 07:06:07 +0200]");
    }

    #[test]
    fn formats_negative_offset() {
        let now = UNIX_EPOCH + Duration::from_secs(1_614_834_367);
        let tz = FixedOffset::west_opt(5 * 3600 + 1800).unwrap();
        assert_eq!(format_timestamp(now, &tz), "[2021/03/03 23:36:07 -0530]");
    }

    #[test]
    fn clock_before_epoch_uses_placeholder() {
        let now = UNIX_EPOCH - Duration::from_secs(1);
        assert_eq!(format_timestamp(now, &Utc), TIMESTAMP_PLACEHOLDER);
    }

    #[test]
    fn placeholder_matches_timestamp_width() {
        let stamp = format_timestamp(UNIX_EPOCH, &Utc);
        assert_eq!(stamp, "[1970/01/01 00:00:00 +0000]");
        assert_eq!(stamp.len(), TIMESTAMP_PLACEHOLDER.len());
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = ObservabilityConfig {
            log_file: Some(dir.path().join("no-such-dir").join("policyd.log")),
            ..ObservabilityConfig::default()
        };
        assert!(matches!(init(&config, false), Err(LoggingError::Open { .. })));
    }

    #[test]
    fn log_file_wins_over_console() {
        let config = ObservabilityConfig {
            log_file: Some("/var/log/policyd.log".into()),
            ..ObservabilityConfig::default()
        };
        let expected = LogTarget::File("/var/log/policyd.log".into());
        assert_eq!(LogTarget::select(&config, false), expected);
        assert_eq!(LogTarget::select(&config, true), expected);
    }

    #[test]
    fn detaching_without_log_file_keeps_stdout_clear() {
        let config = ObservabilityConfig::default();
        assert_eq!(LogTarget::select(&config, false), LogTarget::Stdout);
        assert_eq!(LogTarget::select(&config, true), LogTarget::Stderr);
    }
}
