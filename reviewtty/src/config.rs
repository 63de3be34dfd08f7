//! Runtime tunables for reviewtty.
//!
//! Every value has a compiled default and can be overridden through a
//! dedicated environment variable.

use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_CONFIG_DIR: &str = ".config/reviewtty/data";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_USER: &str = "local";
const DEFAULT_ANALYSIS_DEPTH: u32 = 14;
const DEFAULT_MOVE_TIME_MS: u64 = 500;
const DEFAULT_TIMEOUT_GRACE_MS: u64 = 1000;

/// Explicit Stockfish binary, from `REVIEWTTY_STOCKFISH_PATH`.
///
/// `None` means the engine crate searches common install paths, then `PATH`.
pub fn get_stockfish_path() -> Option<PathBuf> {
    std::env::var_os("REVIEWTTY_STOCKFISH_PATH").map(PathBuf::from)
}

/// Get the data directory for stored reviews.
///
/// Priority:
/// 1. `REVIEWTTY_DATA_DIR` env variable if set
/// 2. `$HOME/.config/reviewtty/data` if HOME is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("REVIEWTTY_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// User the reviews are stored under (`REVIEWTTY_USER`, default `local`).
pub fn get_user() -> String {
    std::env::var("REVIEWTTY_USER")
        .ok()
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

/// Depth for depth-bound review analysis (`REVIEWTTY_ANALYSIS_DEPTH`).
pub fn get_analysis_depth() -> u32 {
    parse_env("REVIEWTTY_ANALYSIS_DEPTH", DEFAULT_ANALYSIS_DEPTH)
}

/// Per-position think time for time-bound searches (`REVIEWTTY_MOVE_TIME_MS`).
pub fn get_move_time_ms() -> u64 {
    parse_env("REVIEWTTY_MOVE_TIME_MS", DEFAULT_MOVE_TIME_MS)
}

/// Slack on top of the move time before a search counts as timed out.
pub fn get_timeout_grace() -> Duration {
    Duration::from_millis(parse_env(
        "REVIEWTTY_TIMEOUT_GRACE_MS",
        DEFAULT_TIMEOUT_GRACE_MS,
    ))
}

/// Directory for daily rolling log files. Unset means log to stderr.
pub fn get_log_dir() -> Option<PathBuf> {
    std::env::var_os("REVIEWTTY_LOG_DIR").map(PathBuf::from)
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(value) => value.parse().unwrap_or(default),
        Err(_) => default,
    }
}
