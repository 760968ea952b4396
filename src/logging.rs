//! File logging. The terminal belongs to the UI, so log output goes to a file.

use std::fs::{self, File, OpenOptions};
use std::path::Path;

use log::LevelFilter;
use simplelog::{Config, ConfigBuilder, WriteLogger};

use crate::config::LoggingConfig;

/// Installs the global logger described by `cfg`.
///
/// Failure to open the log file is reported on stderr and leaves logging disabled;
/// it never stops the application.
pub fn initialize(cfg: &LoggingConfig) {
    let level = parse_level(&cfg.level);
    if level == LevelFilter::Off {
        return;
    }
    let Some(path) = cfg.file.as_deref() else {
        return;
    };
    match open_log_file(path) {
        Ok(file) => {
            let _ = WriteLogger::init(level, build_config(), file);
        }
        Err(err) => {
            eprintln!("Warning: Could not open log file at {}: {}", path.display(), err);
        }
    }
}

pub fn parse_level(level: &str) -> LevelFilter {
    level.trim().parse().unwrap_or(LevelFilter::Info)
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str("feedscroll")
        .build()
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initializes a terminal logger for tests; no-ops if a logger is already set.
#[cfg(test)]
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, TermLogger, TerminalMode};

    let _ = TermLogger::init(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_levels_and_falls_back_to_info() {
        initialize_for_tests();
        assert_eq!(parse_level("debug"), LevelFilter::Debug);
        assert_eq!(parse_level(" WARN "), LevelFilter::Warn);
        assert_eq!(parse_level("off"), LevelFilter::Off);
        assert_eq!(parse_level("chatty"), LevelFilter::Info);
    }

    #[test]
    fn open_log_file_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("feedscroll.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
