//! Logging setup for herald.
//!
//! Events go to stdout and are appended to the configured log file. The
//! configured level applies to herald itself; HTTP and TLS crates are capped
//! at `warn` so a `debug` run shows sync decisions rather than socket
//! traffic. `RUST_LOG`, when set, replaces all of this.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Dependencies whose output is capped at `warn`.
const NOISY_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

/// Level for a config value. Unknown values fall back to `info`.
fn level_filter(level: &str) -> LevelFilter {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" | "none" => LevelFilter::OFF,
        "error" => LevelFilter::ERROR,
        "warn" | "warning" => LevelFilter::WARN,
        "debug" => LevelFilter::DEBUG,
        "trace" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

/// Filter directives for a config level.
fn directives(level: &str) -> Vec<String> {
    let level = level_filter(level);
    let dependency_level = level.min(LevelFilter::WARN);

    let mut directives = vec![level.to_string().to_lowercase()];
    directives.extend(
        NOISY_TARGETS
            .iter()
            .map(|target| format!("{target}={}", dependency_level.to_string().to_lowercase())),
    );
    directives
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives(level).join(",")))
}

/// Open `path` for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Initialize logging to stdout and the configured log file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let log_file = Arc::new(open_log_file(Path::new(&config.file))?);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout.and(log_file))
                .with_ansi(false)
                .with_target(true),
        )
        .with(env_filter(&config.level))
        .init();

    Ok(())
}

/// Initialize console-only logging.
///
/// Used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_level_filter_values() {
        assert_eq!(level_filter("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(level_filter(" warning "), LevelFilter::WARN);
        assert_eq!(level_filter("off"), LevelFilter::OFF);
        assert_eq!(level_filter("verbose"), LevelFilter::INFO);
        assert_eq!(level_filter(""), LevelFilter::INFO);
    }

    #[test]
    fn test_directives_cap_dependencies() {
        let debug = directives("debug");
        assert_eq!(debug[0], "debug");
        assert!(debug.contains(&"reqwest=warn".to_string()));
        assert!(debug.contains(&"hyper=warn".to_string()));

        // a stricter herald level also applies to dependencies
        let error = directives("error");
        assert!(error.contains(&"rustls=error".to_string()));
        assert_eq!(error.len(), NOISY_TARGETS.len() + 1);
    }

    #[test]
    fn test_open_log_file_creates_dirs_and_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("nested").join("herald.log");

        open_log_file(&path).unwrap().write_all(b"first\n").unwrap();
        open_log_file(&path).unwrap().write_all(b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[test]
    fn test_open_log_file_bare_name() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("herald.log");
        assert!(open_log_file(&path).is_ok());
        assert!(path.exists());
    }
}
