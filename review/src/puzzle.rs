//! Practice puzzles built from a player's own mistakes.
//!
//! A [`PuzzleSession`] is a value-type state machine. The player moves on even
//! solution indices and the opponent on odd ones. Transitions that are shown
//! for a moment before settling (an opponent reply, reverting a wrong move)
//! leave the session in a pending state; [`PuzzleSession::resolve`] finishes
//! them and [`PuzzleSession::settle`] does so after the fixed delay.

use std::time::Duration;

use chess::{rules, PieceColor};
use serde::{Deserialize, Serialize};

use crate::classify::MoveClass;
use crate::error::PuzzleError;
use crate::types::GameReview;

/// Pause before the opponent's reply is played.
pub const OPPONENT_REPLY_DELAY: Duration = Duration::from_millis(400);
/// How long a wrong move stays on the board before it is taken back.
pub const WRONG_MOVE_REVERT_DELAY: Duration = Duration::from_millis(600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PuzzleState {
    /// Waiting for the player's move.
    Ready,
    /// A wrong move is on the board, about to be reverted.
    Wrong,
    /// The player's move matched; the opponent's reply is pending.
    OpponentReplying,
    Completed,
}

/// Verdict on a submitted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveVerdict {
    Correct,
    Wrong,
}

/// Where a puzzle came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleSource {
    pub review_id: String,
    pub ply_index: usize,
    /// The move actually played in the game.
    pub played_uci: String,
    pub classification: MoveClass,
}

#[derive(Debug, Clone)]
pub struct PuzzleSession {
    position: String,
    solution_uci: Vec<String>,
    /// `fens[i]` is the position before `solution_uci[i]`; the last entry is
    /// the solved position.
    fens: Vec<String>,
    solved_index: usize,
    wrong_attempts: u32,
    failed: bool,
    state: PuzzleState,
    /// Differs from `fens[solved_index]` only while a wrong move is shown.
    displayed_fen: String,
    hint_visible: bool,
    source: Option<PuzzleSource>,
}

impl PuzzleSession {
    /// Create a puzzle at `position` whose solution alternates player and
    /// opponent moves, starting with the player's.
    pub fn new(position: &str, solution_uci: Vec<String>) -> Result<Self, PuzzleError> {
        if solution_uci.is_empty() {
            return Err(PuzzleError::EmptySolution);
        }

        let start = chess::parse_fen(position)
            .map(|board| chess::format_fen(&board))
            .map_err(|e| PuzzleError::InvalidPosition(e.to_string()))?;
        let mut fens = vec![start];
        let mut solution = Vec::with_capacity(solution_uci.len());
        for (index, uci) in solution_uci.iter().enumerate() {
            let invalid = |_| PuzzleError::InvalidSolution {
                index,
                uci: uci.clone(),
            };
            let canonical = rules::canonical_move(&fens[index], uci).map_err(invalid)?;
            let next = rules::apply_move(&fens[index], &canonical).map_err(invalid)?;
            solution.push(canonical);
            fens.push(next);
        }
        let solution_uci = solution;

        Ok(Self {
            position: fens[0].clone(),
            displayed_fen: fens[0].clone(),
            solution_uci,
            fens,
            solved_index: 0,
            wrong_attempts: 0,
            failed: false,
            state: PuzzleState::Ready,
            hint_visible: false,
            source: None,
        })
    }

    pub fn with_source(mut self, source: PuzzleSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn source(&self) -> Option<&PuzzleSource> {
        self.source.as_ref()
    }

    pub fn position(&self) -> &str {
        &self.position
    }

    pub fn solution(&self) -> &[String] {
        &self.solution_uci
    }

    pub fn state(&self) -> PuzzleState {
        self.state
    }

    pub fn solved_index(&self) -> usize {
        self.solved_index
    }

    pub fn wrong_attempts(&self) -> u32 {
        self.wrong_attempts
    }

    /// Set by the first wrong attempt; a failed puzzle can still be completed.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Completed without a wrong attempt.
    pub fn is_clean_solve(&self) -> bool {
        self.state == PuzzleState::Completed && !self.failed
    }

    pub fn displayed_fen(&self) -> &str {
        &self.displayed_fen
    }

    /// Side the player solves for.
    pub fn player_color(&self) -> PieceColor {
        chess::fen::side_to_move(&self.position).unwrap_or(PieceColor::White)
    }

    /// Number of moves the player has to find.
    pub fn player_move_count(&self) -> usize {
        self.solution_uci.len().div_ceil(2)
    }

    /// The move the verifier expects next, for callers that reveal the
    /// solution after too many attempts.
    pub fn expected_move(&self) -> Option<&str> {
        self.solution_uci.get(self.solved_index).map(String::as_str)
    }

    fn is_player_index(index: usize) -> bool {
        index % 2 == 0
    }

    /// Check `uci` against the next solution move.
    ///
    /// A match is applied and, if the opponent answers, leaves the session in
    /// `OpponentReplying`. A mismatch marks the puzzle failed and shows the
    /// move until it is reverted. Moves that are not legal at all are
    /// rejected without counting as an attempt.
    pub fn submit_move(&mut self, uci: &str) -> Result<MoveVerdict, PuzzleError> {
        if self.state != PuzzleState::Ready {
            return Err(PuzzleError::NotAwaitingMove(self.state));
        }
        let current = &self.fens[self.solved_index];
        let illegal = |_| PuzzleError::IllegalMove(uci.to_string());
        let played = rules::canonical_move(current, uci).map_err(illegal)?;
        let shown = rules::apply_move(current, &played).map_err(illegal)?;
        let uci = played.as_str();

        if self.expected_move() == Some(uci) {
            self.solved_index += 1;
            self.displayed_fen = shown;
            self.state = if self.solved_index == self.solution_uci.len() {
                PuzzleState::Completed
            } else if !Self::is_player_index(self.solved_index) {
                PuzzleState::OpponentReplying
            } else {
                PuzzleState::Ready
            };
            tracing::debug!(uci, solved = self.solved_index, state = ?self.state, "Correct puzzle move");
            Ok(MoveVerdict::Correct)
        } else {
            self.failed = true;
            self.wrong_attempts += 1;
            self.displayed_fen = shown;
            self.state = PuzzleState::Wrong;
            tracing::debug!(uci, attempts = self.wrong_attempts, "Wrong puzzle move");
            Ok(MoveVerdict::Wrong)
        }
    }

    /// Delay before the pending transition should be resolved.
    pub fn pending_delay(&self) -> Option<Duration> {
        match self.state {
            PuzzleState::OpponentReplying => Some(OPPONENT_REPLY_DELAY),
            PuzzleState::Wrong => Some(WRONG_MOVE_REVERT_DELAY),
            PuzzleState::Ready | PuzzleState::Completed => None,
        }
    }

    /// Finish a pending transition now: play the opponent's reply, or take
    /// back a wrong move. No-op in `Ready` and `Completed`.
    pub fn resolve(&mut self) -> PuzzleState {
        match self.state {
            PuzzleState::OpponentReplying => {
                self.solved_index += 1;
                self.displayed_fen = self.fens[self.solved_index].clone();
                self.state = if self.solved_index == self.solution_uci.len() {
                    PuzzleState::Completed
                } else {
                    PuzzleState::Ready
                };
            }
            PuzzleState::Wrong => {
                self.displayed_fen = self.fens[self.solved_index].clone();
                self.state = PuzzleState::Ready;
            }
            PuzzleState::Ready | PuzzleState::Completed => {}
        }
        self.state
    }

    /// Wait out the pending delay, then resolve.
    pub async fn settle(&mut self) -> PuzzleState {
        if let Some(delay) = self.pending_delay() {
            tokio::time::sleep(delay).await;
            self.resolve();
        }
        self.state
    }

    pub fn hint_visible(&self) -> bool {
        self.hint_visible
    }

    pub fn toggle_hint(&mut self) -> bool {
        self.hint_visible = !self.hint_visible;
        self.hint_visible
    }

    /// Origin square of the expected move while the hint is shown.
    pub fn hint(&self) -> Option<&str> {
        if !self.hint_visible || self.state != PuzzleState::Ready {
            return None;
        }
        self.expected_move().and_then(|uci| uci.get(0..2))
    }
}

/// Build a puzzle from every mistake or blunder `color` made in `review`.
///
/// The solution is the engine's best move followed by its line, cut at the
/// first move that does not replay and trimmed to end on a player move.
/// Moves without a valid best move are skipped.
pub fn puzzles_from_review(review: &GameReview, color: PieceColor) -> Vec<PuzzleSession> {
    review
        .puzzle_worthy_moves(color)
        .filter_map(|mv| {
            let best = mv.suggestion()?;
            let line: Vec<&str> = if mv.pv.first().map(String::as_str) == Some(best) {
                mv.pv.iter().map(String::as_str).collect()
            } else {
                vec![best]
            };
            let solution = playable_prefix(&mv.fen_before, &line);

            let source = PuzzleSource {
                review_id: review.id.clone(),
                ply_index: mv.ply_index,
                played_uci: mv.uci.clone(),
                classification: mv.classification,
            };
            match PuzzleSession::new(&mv.fen_before, solution) {
                Ok(puzzle) => Some(puzzle.with_source(source)),
                Err(e) => {
                    tracing::warn!(ply = mv.ply_index, "Skipping puzzle: {}", e);
                    None
                }
            }
        })
        .collect()
}

fn playable_prefix(fen: &str, line: &[&str]) -> Vec<String> {
    let mut position = fen.to_string();
    let mut playable = Vec::new();
    for uci in line {
        match rules::apply_move(&position, uci) {
            Ok(next) => {
                playable.push(uci.to_string());
                position = next;
            }
            Err(_) => break,
        }
    }
    if playable.len() % 2 == 0 {
        playable.pop();
    }
    playable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::analyzed;
    use crate::types::GameReview;
    use chess::START_FEN;

    fn line(moves: &[&str]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    fn opening_puzzle() -> PuzzleSession {
        PuzzleSession::new(START_FEN, line(&["e2e4", "e7e5", "g1f3"])).unwrap()
    }

    #[test]
    fn solves_with_one_wrong_attempt() {
        let mut puzzle = opening_puzzle();

        assert_eq!(puzzle.submit_move("e2e4"), Ok(MoveVerdict::Correct));
        assert_eq!(puzzle.state(), PuzzleState::OpponentReplying);
        assert_eq!(puzzle.resolve(), PuzzleState::Ready);
        assert_eq!(puzzle.solved_index(), 2);
        let before_attempt = puzzle.displayed_fen().to_string();

        assert_eq!(puzzle.submit_move("d2d4"), Ok(MoveVerdict::Wrong));
        assert_eq!(puzzle.state(), PuzzleState::Wrong);
        assert_eq!(puzzle.wrong_attempts(), 1);
        assert_ne!(puzzle.displayed_fen(), before_attempt);
        assert_eq!(puzzle.resolve(), PuzzleState::Ready);
        assert_eq!(puzzle.displayed_fen(), before_attempt);
        assert_eq!(puzzle.solved_index(), 2);

        assert_eq!(puzzle.submit_move("g1f3"), Ok(MoveVerdict::Correct));
        assert_eq!(puzzle.state(), PuzzleState::Completed);
        assert_eq!(puzzle.solved_index(), 3);
        assert!(puzzle.failed());
        assert!(!puzzle.is_clean_solve());
    }

    #[tokio::test(start_paused = true)]
    async fn settle_waits_for_fixed_delays() {
        let mut puzzle = opening_puzzle();
        puzzle.submit_move("e2e4").unwrap();

        let started = tokio::time::Instant::now();
        assert_eq!(puzzle.settle().await, PuzzleState::Ready);
        assert!(started.elapsed() >= OPPONENT_REPLY_DELAY);

        puzzle.submit_move("b1c3").unwrap();
        let started = tokio::time::Instant::now();
        assert_eq!(puzzle.settle().await, PuzzleState::Ready);
        assert!(started.elapsed() >= WRONG_MOVE_REVERT_DELAY);

        puzzle.submit_move("g1f3").unwrap();
        assert!(puzzle.pending_delay().is_none());
        assert_eq!(puzzle.settle().await, PuzzleState::Completed);
    }

    #[test]
    fn clean_solve() {
        let mut puzzle = opening_puzzle();
        puzzle.submit_move("e2e4").unwrap();
        puzzle.resolve();
        puzzle.submit_move("g1f3").unwrap();
        assert!(puzzle.is_clean_solve());
        assert_eq!(puzzle.wrong_attempts(), 0);
    }

    #[test]
    fn moves_are_rejected_while_a_transition_is_pending() {
        let mut puzzle = opening_puzzle();
        puzzle.submit_move("e2e4").unwrap();
        assert_eq!(
            puzzle.submit_move("e7e5"),
            Err(PuzzleError::NotAwaitingMove(PuzzleState::OpponentReplying))
        );
        assert_eq!(puzzle.solved_index(), 1);
    }

    #[test]
    fn illegal_moves_are_not_attempts() {
        let mut puzzle = opening_puzzle();
        assert!(matches!(
            puzzle.submit_move("e2e5"),
            Err(PuzzleError::IllegalMove(_))
        ));
        assert_eq!(puzzle.wrong_attempts(), 0);
        assert!(!puzzle.failed());
        assert_eq!(puzzle.state(), PuzzleState::Ready);
    }

    #[test]
    fn castling_onto_the_rook_counts_as_the_solution_move() {
        let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
        let mut puzzle = PuzzleSession::new(fen, vec!["e1g1".to_string()]).unwrap();

        assert_eq!(puzzle.submit_move("e1h1"), Ok(MoveVerdict::Correct));
        assert_eq!(puzzle.state(), PuzzleState::Completed);
        assert_eq!(puzzle.wrong_attempts(), 0);
        assert!(!puzzle.failed());

        // Solutions given in the rook-target form are stored in standard form.
        let puzzle = PuzzleSession::new(fen, vec!["e1a1".to_string()]).unwrap();
        assert_eq!(puzzle.expected_move(), Some("e1c1"));
    }

    #[test]
    fn hint_is_read_only() {
        let mut puzzle = opening_puzzle();
        assert_eq!(puzzle.hint(), None);
        assert!(puzzle.toggle_hint());
        assert_eq!(puzzle.hint(), Some("e2"));
        puzzle.toggle_hint();
        puzzle.toggle_hint();
        assert_eq!(puzzle.solved_index(), 0);
        assert_eq!(puzzle.wrong_attempts(), 0);
        assert_eq!(puzzle.state(), PuzzleState::Ready);
    }

    #[test]
    fn construction_validates_solution() {
        assert_eq!(
            PuzzleSession::new(START_FEN, vec![]).unwrap_err(),
            PuzzleError::EmptySolution
        );
        assert_eq!(
            PuzzleSession::new(START_FEN, line(&["e2e4", "e2e4"])).unwrap_err(),
            PuzzleError::InvalidSolution {
                index: 1,
                uci: "e2e4".to_string()
            }
        );
    }

    #[test]
    fn puzzles_come_from_mistakes_with_valid_best_moves() {
        let after_e4 = rules::apply_move(START_FEN, "e2e4").unwrap();
        let after_e5 = rules::apply_move(&after_e4, "e7e5").unwrap();
        let after_f3 = rules::apply_move(&after_e5, "f2f3").unwrap();

        let mut blunder = analyzed(2, "f2f3", &after_e5, (30, -250), "g1f3", MoveClass::Blunder);
        blunder.pv = line(&["g1f3", "b8c6", "f1b5", "a7a6"]);
        // Stored best move that is not legal in its position.
        let stale = analyzed(4, "d2d4", &after_f3, (-250, -900), "a1a8", MoveClass::Blunder);
        let opponent = analyzed(1, "e7e5", &after_e4, (30, 30), "e7e5", MoveClass::Mistake);

        let review = GameReview::new(
            "g",
            START_FEN,
            PieceColor::White,
            vec![opponent, blunder, stale],
        );
        let puzzles = puzzles_from_review(&review, PieceColor::White);

        assert_eq!(puzzles.len(), 1);
        let puzzle = &puzzles[0];
        assert_eq!(puzzle.solution(), ["g1f3", "b8c6", "f1b5"]);
        assert_eq!(puzzle.position(), after_e5);
        assert_eq!(puzzle.player_color(), PieceColor::White);
        assert_eq!(puzzle.player_move_count(), 2);
        let source = puzzle.source().unwrap();
        assert_eq!(source.played_uci, "f2f3");
        assert_eq!(source.classification, MoveClass::Blunder);
    }
}
