use colored::*;
use log::LevelFilter;

/// Maps a configured level name to a filter, defaulting to `warn`.
pub fn parse_level(level: Option<&str>) -> LevelFilter {
    match level.map(|l| l.to_lowercase()) {
        Some(l) if l == "trace" => LevelFilter::Trace,
        Some(l) if l == "debug" => LevelFilter::Debug,
        Some(l) if l == "info" => LevelFilter::Info,
        Some(l) if l == "error" => LevelFilter::Error,
        Some(l) if l == "off" => LevelFilter::Off,
        _ => LevelFilter::Warn,
    }
}

/// Initializes env_logger. `RUST_LOG` wins over the configured level.
pub fn init(configured: Option<&str>, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        parse_level(configured)
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level.to_string()))
        .format_timestamp(None)
        .init();
}

// User-facing diagnostics, printed regardless of the log level

pub fn log_info(message: &str) {
    eprintln!("{} {}", "[INFO]".blue(), message);
}

pub fn log_warning(message: &str) {
    eprintln!("{} {}", "[WARN]".yellow(), message);
}

pub fn log_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
