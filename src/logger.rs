//! Logging initialisation via tracing-subscriber.
//!
//! The configured level applies to this crate only. Dependencies (hyper,
//! reqwest, rustls) stay at `info` at most, so `-vvvv` shows full LLM
//! payloads without burying them under connection-pool chatter.

use std::path::Path;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::AppError;

/// Most verbose level other crates may log at.
const DEPENDENCY_CEILING: LevelFilter = LevelFilter::INFO;

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` unless `prefer_level` is set (a CLI `-v`
/// flag). With `log_file`, output is appended there without ANSI colours.
pub fn init(level: &str, prefer_level: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let crate_level = parse_level(level)?;
    let from_level = || {
        EnvFilter::try_new(directives(crate_level))
            .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
    };
    let filter = if prefer_level {
        from_level()?
    } else {
        EnvFilter::try_from_default_env().or_else(|_| from_level())?
    };

    let writer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    AppError::Logger(format!("failed to open log file '{}': {e}", path.display()))
                })?;
            BoxMakeWriter::new(file)
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(log_file.is_none())
        .with_writer(writer)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

/// Filter directives for `level`: this crate at `level`, everything else
/// capped at [`DEPENDENCY_CEILING`].
fn directives(level: LevelFilter) -> String {
    let others = level.min(DEPENDENCY_CEILING);
    let name = env!("CARGO_CRATE_NAME");
    if others == level {
        level.to_string().to_lowercase()
    } else {
        format!("{},{name}={}", others.to_string().to_lowercase(), level.to_string().to_lowercase())
    }
}

/// Parse a plain level string (`"error"` … `"trace"`, `"off"`).
pub fn parse_level(level: &str) -> Result<LevelFilter, AppError> {
    if level.is_empty() {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| AppError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_levels_apply_everywhere() {
        assert_eq!(directives(LevelFilter::WARN), "warn");
        assert_eq!(directives(LevelFilter::INFO), "info");
        assert_eq!(directives(LevelFilter::OFF), "off");
    }

    #[test]
    fn verbose_levels_scoped_to_this_crate() {
        assert_eq!(directives(LevelFilter::DEBUG), "info,lmchat=debug");
        assert_eq!(directives(LevelFilter::TRACE), "info,lmchat=trace");
    }

    #[test]
    fn directives_are_valid_filters() {
        for l in [LevelFilter::ERROR, LevelFilter::INFO, LevelFilter::TRACE] {
            assert!(EnvFilter::try_new(directives(l)).is_ok());
        }
    }

    #[test]
    fn invalid_level_errors() {
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("").is_err());
        assert!(init("INFO_LEVEL", true, None).is_err());
    }

    #[test]
    fn unwritable_log_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = init("info", true, Some(dir.path())).unwrap_err();
        assert!(err.to_string().contains("log file"));
    }
}
