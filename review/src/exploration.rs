//! Free exploration branching off the main line.
//!
//! Exploration never touches the ledger. It shadows the displayed position
//! with `anchor_fen` plus the branch moves, so returning to the game only has
//! to drop the branch. Every change to the branch bumps a generation counter;
//! evaluations are requested as [`EvalRequest`]s and applied only when they
//! carry the current generation.

use chess::rules;

use crate::error::ReviewError;

/// Engine evaluation wanted for the branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalRequest {
    pub generation: u64,
    pub fen: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplorationState {
    active: bool,
    anchor_index: usize,
    anchor_fen: String,
    branch_moves: Vec<String>,
    /// Position after each branch move.
    branch_fens: Vec<String>,
    live_eval_cp: Option<i32>,
    live_best_move: Option<String>,
    is_evaluating: bool,
    generation: u64,
}

impl ExplorationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn anchor_index(&self) -> usize {
        self.anchor_index
    }

    pub fn anchor_fen(&self) -> &str {
        &self.anchor_fen
    }

    pub fn branch_moves(&self) -> &[String] {
        &self.branch_moves
    }

    /// White-relative evaluation of the branch tip, once it has arrived.
    pub fn live_eval_cp(&self) -> Option<i32> {
        self.live_eval_cp
    }

    pub fn live_best_move(&self) -> Option<&str> {
        self.live_best_move.as_deref()
    }

    pub fn is_evaluating(&self) -> bool {
        self.is_evaluating
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Position shown while exploring: the branch tip, or the anchor.
    pub fn current_fen(&self) -> Option<&str> {
        if !self.active {
            return None;
        }
        Some(
            self.branch_fens
                .last()
                .map(String::as_str)
                .unwrap_or(&self.anchor_fen),
        )
    }

    /// Start exploring from `anchor_fen`, shown at ledger index `anchor_index`.
    ///
    /// `known_eval_cp` seeds the live evaluation for the anchor itself.
    pub fn enter(&mut self, anchor_index: usize, anchor_fen: String, known_eval_cp: Option<i32>) {
        self.generation += 1;
        self.active = true;
        self.anchor_index = anchor_index;
        self.anchor_fen = anchor_fen;
        self.branch_moves.clear();
        self.branch_fens.clear();
        self.live_eval_cp = known_eval_cp;
        self.live_best_move = None;
        self.is_evaluating = false;
        tracing::debug!(anchor_index, "Entered exploration");
    }

    /// Play `uci` on the branch tip and request an evaluation of the result.
    ///
    /// Every branch move stays in exploration, even when it repeats the main
    /// line's next move.
    pub fn play_branch_move(&mut self, uci: &str) -> Result<EvalRequest, ReviewError> {
        let tip = self.current_fen().ok_or(ReviewError::NotExploring)?;
        let illegal = |_| ReviewError::IllegalMove {
            uci: uci.to_string(),
            fen: tip.to_string(),
        };
        let played = rules::canonical_move(tip, uci).map_err(illegal)?;
        let next = rules::apply_move(tip, &played).map_err(illegal)?;
        let uci = played.as_str();

        self.branch_moves.push(uci.to_string());
        self.branch_fens.push(next);
        tracing::debug!(uci, depth = self.branch_moves.len(), "Branch move played");
        Ok(self.request_evaluation())
    }

    /// Pop the last branch move. Any evaluation in flight for the popped
    /// position is abandoned and the new tip is evaluated afresh.
    pub fn undo_last(&mut self) -> Result<EvalRequest, ReviewError> {
        if !self.active {
            return Err(ReviewError::NotExploring);
        }
        let Some(uci) = self.branch_moves.pop() else {
            return Err(ReviewError::NothingToUndo);
        };
        self.branch_fens.pop();
        tracing::debug!(%uci, "Branch move undone");
        Ok(self.request_evaluation())
    }

    /// Leave exploration, dropping the branch. Returns the anchor index to
    /// display, or `None` if exploration was not active.
    pub fn return_to_game(&mut self) -> Option<usize> {
        if !self.active {
            return None;
        }
        self.generation += 1;
        self.active = false;
        self.branch_moves.clear();
        self.branch_fens.clear();
        self.live_eval_cp = None;
        self.live_best_move = None;
        self.is_evaluating = false;
        tracing::debug!(anchor_index = self.anchor_index, "Returned to game");
        Some(self.anchor_index)
    }

    /// Record an evaluation. Returns false, changing nothing, when `generation`
    /// is stale.
    pub fn apply_evaluation(
        &mut self,
        generation: u64,
        eval_cp: Option<i32>,
        best_move: Option<String>,
    ) -> bool {
        if !self.active || generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Discarding stale evaluation"
            );
            return false;
        }
        self.live_eval_cp = eval_cp;
        self.live_best_move = best_move;
        self.is_evaluating = false;
        true
    }

    /// The evaluation for `generation` failed. Stops the spinner if current.
    pub fn evaluation_failed(&mut self, generation: u64) -> bool {
        self.apply_evaluation(generation, None, None)
    }

    fn request_evaluation(&mut self) -> EvalRequest {
        self.generation += 1;
        self.is_evaluating = true;
        self.live_eval_cp = None;
        self.live_best_move = None;
        EvalRequest {
            generation: self.generation,
            fen: self
                .current_fen()
                .map(str::to_string)
                .unwrap_or_else(|| self.anchor_fen.clone()),
        }
    }
}
