use chess::{rules, Position, PositionLedger};

use crate::classify::MoveClass;
use crate::error::ReviewError;
use crate::exploration::{EvalRequest, ExplorationState};
use crate::types::{AnalyzedMove, GameReview};

/// Review navigation over a replayed game, plus the exploration branch.
///
/// Navigation is plain index arithmetic on the ledger. Any navigation that
/// changes the index first returns from exploration, so the ledger index and
/// the exploration anchor never disagree.
#[derive(Debug, Clone)]
pub struct ReviewBoard {
    review: GameReview,
    ledger: PositionLedger,
    exploration: ExplorationState,
}

impl ReviewBoard {
    /// Replay `review` and show its starting position.
    pub fn new(review: GameReview) -> Result<Self, ReviewError> {
        let mut ledger = review.ledger()?;
        ledger.seek(0);
        Ok(Self {
            review,
            ledger,
            exploration: ExplorationState::new(),
        })
    }

    pub fn review(&self) -> &GameReview {
        &self.review
    }

    pub fn exploration(&self) -> &ExplorationState {
        &self.exploration
    }

    pub fn is_exploring(&self) -> bool {
        self.exploration.is_active()
    }

    pub fn current_index(&self) -> usize {
        self.ledger.current_index()
    }

    /// Index of the final position.
    pub fn last_index(&self) -> usize {
        self.ledger.len()
    }

    /// Main-line position at the current index.
    pub fn current_position(&self) -> Position {
        self.ledger.current()
    }

    /// Position on screen: the branch tip while exploring, otherwise the
    /// main-line position.
    pub fn displayed_fen(&self) -> String {
        match self.exploration.current_fen() {
            Some(fen) => fen.to_string(),
            None => self.ledger.current().fen,
        }
    }

    /// The move that led to the current index.
    pub fn current_move(&self) -> Option<&AnalyzedMove> {
        let index = self.current_index().checked_sub(1)?;
        self.review.moves.get(index)
    }

    /// The main line's move from the current index.
    pub fn next_move(&self) -> Option<&AnalyzedMove> {
        self.review.moves.get(self.current_index())
    }

    pub fn current_classification(&self) -> MoveClass {
        self.current_move()
            .map_or(MoveClass::None, |m| m.classification)
    }

    /// White-relative evaluation of the displayed position.
    pub fn displayed_eval(&self) -> Option<i32> {
        if self.is_exploring() {
            return self.exploration.live_eval_cp();
        }
        self.main_line_eval()
    }

    fn main_line_eval(&self) -> Option<i32> {
        match self.current_move() {
            Some(mv) => mv.eval_after_cp,
            None => self.review.moves.first().and_then(|m| m.eval_before_cp),
        }
    }

    pub fn go_to_start(&mut self) -> usize {
        self.go_to_move(0)
    }

    pub fn go_to_end(&mut self) -> usize {
        self.go_to_move(self.last_index())
    }

    pub fn previous(&mut self) -> usize {
        self.go_to_move(self.current_index().saturating_sub(1))
    }

    pub fn next(&mut self) -> usize {
        self.go_to_move(self.current_index() + 1)
    }

    /// Show index `k`, clamped to the game.
    pub fn go_to_move(&mut self, k: usize) -> usize {
        let target = k.min(self.last_index());
        if target != self.current_index() {
            self.exploration.return_to_game();
            self.ledger.seek(target);
        }
        self.current_index()
    }

    /// Start exploring from the current index.
    pub fn enter_exploration(&mut self) {
        let anchor = self.ledger.current();
        let known_eval = self.main_line_eval();
        self.exploration.enter(anchor.index, anchor.fen, known_eval);
    }

    /// Play a board move. Outside exploration this branches off at the current
    /// index; an illegal move changes nothing.
    pub fn submit_move(&mut self, uci: &str) -> Result<EvalRequest, ReviewError> {
        let fen = self.displayed_fen();
        if !rules::is_legal(&fen, uci) {
            return Err(ReviewError::IllegalMove {
                uci: uci.to_string(),
                fen,
            });
        }
        if !self.is_exploring() {
            self.enter_exploration();
        }
        self.exploration.play_branch_move(uci)
    }

    pub fn undo_branch_move(&mut self) -> Result<EvalRequest, ReviewError> {
        self.exploration.undo_last()
    }

    /// Leave exploration. The ledger index was never moved, so the main-line
    /// position on screen is the anchor again.
    pub fn return_to_game(&mut self) -> usize {
        if let Some(anchor) = self.exploration.return_to_game() {
            debug_assert_eq!(anchor, self.current_index());
        }
        self.current_index()
    }

    pub fn apply_evaluation(
        &mut self,
        generation: u64,
        eval_cp: Option<i32>,
        best_move: Option<String>,
    ) -> bool {
        self.exploration
            .apply_evaluation(generation, eval_cp, best_move)
    }

    pub fn evaluation_failed(&mut self, generation: u64) -> bool {
        self.exploration.evaluation_failed(generation)
    }
}
