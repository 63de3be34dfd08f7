use chess::{LedgerError, RulesError};
use engine::EngineError;

use crate::puzzle::PuzzleState;

/// Errors from review navigation, exploration and analysis.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// Stored review data no longer replays. Not recoverable for this review.
    #[error("Review data is corrupted: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Illegal move {uci} in position {fen}")]
    IllegalMove { uci: String, fen: String },
    #[error("Exploration is not active")]
    NotExploring,
    #[error("Nothing to undo")]
    NothingToUndo,
    #[error(transparent)]
    Rules(#[from] RulesError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// A stored best move that is not legal in its own position.
///
/// Display-only degradation: callers hide the suggestion instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Best move {uci} is not legal in {fen}")]
pub struct InvalidBestMove {
    pub uci: String,
    pub fen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PuzzleError {
    /// Not a legal chess move at all; not counted as an attempt.
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    #[error("Puzzle is not waiting for a move (state: {0:?})")]
    NotAwaitingMove(PuzzleState),
    #[error("Solution move {index} ({uci}) does not replay")]
    InvalidSolution { index: usize, uci: String },
    #[error("Puzzle has an empty solution")]
    EmptySolution,
    #[error("Invalid puzzle position: {0}")]
    InvalidPosition(String),
}
