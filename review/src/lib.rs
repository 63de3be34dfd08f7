//! Post-game review: engine analysis of a recorded game, per-move
//! classification, review navigation with a free exploration branch, and
//! puzzles drilled from the player's mistakes.

pub mod analyzer;
pub mod board;
pub mod book;
pub mod classify;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod exploration;
pub mod persistence;
pub mod puzzle;
pub mod types;

pub use analyzer::{analyze_game, AnalysisProgress, AnalyzeOptions};
pub use board::ReviewBoard;
pub use book::{FirstPlies, NoBook, OpeningBook};
pub use classify::{classify, cp_loss, MoveClass};
pub use controller::{BoardSnapshot, ExplorationController, Navigation};
pub use dispatch::{ActiveBoard, InputError, MoveResponse};
pub use error::{InvalidBestMove, PuzzleError, ReviewError};
pub use exploration::{EvalRequest, ExplorationState};
pub use persistence::{JsonReviewStore, PersistenceError, ReviewRepository};
pub use puzzle::{
    puzzles_from_review, MoveVerdict, PuzzleSession, PuzzleSource, PuzzleState,
    OPPONENT_REPLY_DELAY, WRONG_MOVE_REVERT_DELAY,
};
pub use types::{
    compute_accuracy, generate_review_id, AnalyzedMove, ClassCounts, GameRecord, GameReview,
    PlayerSummary,
};
