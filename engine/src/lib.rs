//! UCI engine adapter.
//!
//! An [`EnginePool`] hands out reference-counted [`EngineHandle`]s keyed by an
//! owner token. Each handle owns one engine process through a driver task that
//! serializes `position`/`go` requests, parses the streamed output, and
//! resolves exactly one [`AnalysisResult`] (or error) per `analyze()` call.

pub mod error;
pub mod handle;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod pool;
pub mod process;
pub mod uci;

pub use error::EngineError;
pub use handle::{EngineHandle, HandleState};
pub use pool::EnginePool;
pub use process::{find_stockfish_path, Launcher, StockfishLauncher, UciChannel};
pub use uci::{parse_uci_message, EngineInfo, UciCommand, UciError, UciMessage};

use std::time::Duration;

use chess::AnalysisScore;

/// Parameters for the "go" command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub movetime: Option<u64>, // Move time in milliseconds
    pub depth: Option<u32>,    // Search depth
    pub infinite: bool,        // Search until "stop"
}

/// Engine configuration for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub threads: u32,
    pub hash_mb: u32,
    pub multi_pv: u32,
    pub max_depth: u32,
    /// When set, searches are time-bound (`go movetime`) instead of depth-bound.
    pub move_time_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            hash_mb: 64,
            multi_pv: 1,
            max_depth: 18,
            move_time_ms: None,
        }
    }
}

impl EngineConfig {
    pub fn with_move_time(mut self, ms: u64) -> Self {
        self.move_time_ms = Some(ms);
        self
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.max_depth = depth;
        self.move_time_ms = None;
        self
    }

    /// `setoption` commands for this configuration, values clamped to sane ranges.
    pub fn option_commands(&self) -> Vec<UciCommand> {
        [
            ("Threads", self.threads.clamp(1, 16)),
            ("Hash", self.hash_mb.clamp(1, 2048)),
            ("MultiPV", self.multi_pv.clamp(1, 8)),
        ]
        .into_iter()
        .map(|(name, value)| UciCommand::SetOption {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
    }

    /// True when switching from `other` requires re-sending options.
    pub(crate) fn options_differ(&self, other: &EngineConfig) -> bool {
        self.threads != other.threads
            || self.hash_mb != other.hash_mb
            || self.multi_pv != other.multi_pv
    }

    pub fn go_params(&self) -> GoParams {
        match self.move_time_ms {
            Some(ms) => GoParams {
                movetime: Some(ms),
                depth: None,
                infinite: false,
            },
            None => GoParams {
                movetime: None,
                depth: Some(self.max_depth.max(1)),
                infinite: false,
            },
        }
    }
}

/// Timeouts governing engine startup and analysis requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Budget for `uci`/`uciok` and `isready`/`readyok` exchanges.
    pub handshake_timeout: Duration,
    /// Added to a time-bound search's move time to form its timeout.
    pub timeout_grace: Duration,
    /// Timeout for depth-bound searches, which have no natural time budget.
    pub depth_only_timeout: Duration,
    /// How long to wait for a cancelled search's `bestmove` before moving on.
    pub drain_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            timeout_grace: Duration::from_millis(1000),
            depth_only_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(2),
        }
    }
}

impl EngineSettings {
    /// Time budget for one `analyze()` call with `config`.
    pub fn analysis_timeout(&self, config: &EngineConfig) -> Duration {
        match config.move_time_ms {
            Some(ms) => Duration::from_millis(ms) + self.timeout_grace,
            None => self.depth_only_timeout,
        }
    }
}

/// Terminal result of one `analyze()` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Generation stamp of the request this answers.
    pub request_id: u64,
    /// Position that was analyzed.
    pub fen: String,
    pub best_move_uci: String,
    /// Last reported score, relative to the side to move.
    pub score: Option<AnalysisScore>,
    /// `score` from White's point of view, folded onto the centipawn axis.
    pub eval_cp: Option<i32>,
    pub principal_variation: Vec<String>,
    pub depth: Option<u32>,
    /// The search hit its time budget and this is the best move seen so far.
    pub timed_out: bool,
}
