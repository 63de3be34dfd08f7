use chess::{LedgerError, PieceColor, PositionLedger};
use serde::{Deserialize, Serialize};

use crate::classify::MoveClass;
use crate::error::InvalidBestMove;

/// A recorded game waiting to be analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub start_fen: String,
    /// Played moves in UCI notation.
    pub moves: Vec<String>,
}

impl GameRecord {
    pub fn new(id: impl Into<String>, start_fen: impl Into<String>, moves: Vec<String>) -> Self {
        Self {
            id: id.into(),
            start_fen: start_fen.into(),
            moves,
        }
    }

    /// A fresh record with a generated id.
    pub fn with_generated_id(start_fen: impl Into<String>, moves: Vec<String>) -> Self {
        Self::new(generate_review_id(), start_fen, moves)
    }
}

/// One analyzed ply of a reviewed game. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzedMove {
    /// 0-based: ply 0 is White's first move of the record.
    pub ply_index: usize,
    pub san: String,
    pub uci: String,
    pub color: PieceColor,
    pub fen_before: String,
    /// White-relative, on the folded mate axis. `None` = not evaluated.
    pub eval_before_cp: Option<i32>,
    pub eval_after_cp: Option<i32>,
    pub best_move_uci: Option<String>,
    #[serde(default)]
    pub best_move_san: Option<String>,
    /// Engine line from `fen_before`, starting with the best move.
    #[serde(default)]
    pub pv: Vec<String>,
    pub classification: MoveClass,
}

impl AnalyzedMove {
    /// Centipawns the mover lost, when both evaluations are known.
    pub fn cp_loss(&self) -> Option<i32> {
        Some(crate::classify::cp_loss(
            self.eval_before_cp?,
            self.eval_after_cp?,
            self.color,
        ))
    }

    /// The stored best move, checked for legality against `fen_before`.
    pub fn validated_best_move(&self) -> Result<Option<&str>, InvalidBestMove> {
        let Some(best) = self.best_move_uci.as_deref() else {
            return Ok(None);
        };
        if chess::rules::is_legal(&self.fen_before, best) {
            Ok(Some(best))
        } else {
            Err(InvalidBestMove {
                uci: best.to_string(),
                fen: self.fen_before.clone(),
            })
        }
    }

    /// Best move to suggest, or `None` when there is none or it is invalid.
    pub fn suggestion(&self) -> Option<&str> {
        match self.validated_best_move() {
            Ok(best) => best,
            Err(e) => {
                tracing::warn!(ply = self.ply_index, "Suppressing suggestion: {}", e);
                None
            }
        }
    }

    pub fn played_best(&self) -> bool {
        self.best_move_uci.as_deref() == Some(self.uci.as_str())
    }
}

/// Count of moves per classification for one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub book: u32,
    pub brilliant: u32,
    pub great: u32,
    pub best: u32,
    pub good: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
    pub unclassified: u32,
}

impl ClassCounts {
    pub fn record(&mut self, class: MoveClass) {
        let slot = match class {
            MoveClass::None => &mut self.unclassified,
            MoveClass::Book => &mut self.book,
            MoveClass::Brilliant => &mut self.brilliant,
            MoveClass::Great => &mut self.great,
            MoveClass::Best => &mut self.best,
            MoveClass::Good => &mut self.good,
            MoveClass::Inaccuracy => &mut self.inaccuracy,
            MoveClass::Mistake => &mut self.mistake,
            MoveClass::Blunder => &mut self.blunder,
        };
        *slot += 1;
    }

    pub fn get(&self, class: MoveClass) -> u32 {
        match class {
            MoveClass::None => self.unclassified,
            MoveClass::Book => self.book,
            MoveClass::Brilliant => self.brilliant,
            MoveClass::Great => self.great,
            MoveClass::Best => self.best,
            MoveClass::Good => self.good,
            MoveClass::Inaccuracy => self.inaccuracy,
            MoveClass::Mistake => self.mistake,
            MoveClass::Blunder => self.blunder,
        }
    }
}

/// Per-side totals for a reviewed game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub color: PieceColor,
    /// 0-100, derived from average centipawn loss.
    pub accuracy: f64,
    pub avg_cp_loss: f64,
    pub counts: ClassCounts,
}

impl PlayerSummary {
    /// Summarize `color`'s moves. Book and unevaluated moves are excluded from
    /// the loss average; a side with no scored moves has accuracy 100.
    pub fn compute(moves: &[AnalyzedMove], color: PieceColor) -> Self {
        let mut counts = ClassCounts::default();
        let mut losses = Vec::new();

        for mv in moves.iter().filter(|m| m.color == color) {
            counts.record(mv.classification);
            if mv.classification != MoveClass::Book {
                if let Some(loss) = mv.cp_loss() {
                    losses.push(loss);
                }
            }
        }

        let avg_cp_loss = average_loss(&losses);
        Self {
            color,
            accuracy: compute_accuracy(&losses),
            avg_cp_loss,
            counts,
        }
    }
}

/// Per-move losses are capped at 1000 so mate swings do not dominate.
const LOSS_CAP: f64 = 1000.0;

fn average_loss(losses: &[i32]) -> f64 {
    if losses.is_empty() {
        return 0.0;
    }
    let total: f64 = losses.iter().map(|&l| (l as f64).min(LOSS_CAP)).sum();
    total / losses.len() as f64
}

/// Accuracy percentage from per-move centipawn losses:
/// `103.1668 * exp(-0.006 * avg_loss) - 3.1668`, clamped to [0, 100].
///
/// Roughly: average loss 10 gives 94%, 35 gives 80%, 100 gives 54%.
pub fn compute_accuracy(losses: &[i32]) -> f64 {
    if losses.is_empty() {
        return 100.0;
    }
    let accuracy = 103.1668 * (-0.006 * average_loss(losses)).exp() - 3.1668;
    accuracy.clamp(0.0, 100.0)
}

/// Full review of one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameReview {
    pub id: String,
    pub start_fen: String,
    /// Side the reviewing player had; the other side is the opponent.
    pub player_color: PieceColor,
    pub moves: Vec<AnalyzedMove>,
    pub player_summary: PlayerSummary,
    pub opponent_summary: PlayerSummary,
    #[serde(default)]
    pub analysis_depth: Option<u32>,
    #[serde(default)]
    pub created_at: u64,
}

impl GameReview {
    /// Build a review from analyzed moves, computing both summaries.
    pub fn new(
        id: impl Into<String>,
        start_fen: impl Into<String>,
        player_color: PieceColor,
        moves: Vec<AnalyzedMove>,
    ) -> Self {
        let player_summary = PlayerSummary::compute(&moves, player_color);
        let opponent_summary = PlayerSummary::compute(&moves, player_color.opposite());
        Self {
            id: id.into(),
            start_fen: start_fen.into(),
            player_color,
            moves,
            player_summary,
            opponent_summary,
            analysis_depth: None,
            created_at: now_timestamp(),
        }
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Replay the stored moves into a ledger.
    ///
    /// Fails with [`LedgerError::IllegalMove`] when the stored data no longer
    /// replays; the review has to be re-analyzed or discarded.
    pub fn ledger(&self) -> Result<PositionLedger, LedgerError> {
        PositionLedger::from_moves(&self.start_fen, self.moves.iter().map(|m| m.uci.as_str()))
    }

    pub fn summary_for(&self, color: PieceColor) -> &PlayerSummary {
        if color == self.player_color {
            &self.player_summary
        } else {
            &self.opponent_summary
        }
    }

    /// Moves by `color` worth drilling.
    pub fn puzzle_worthy_moves(&self, color: PieceColor) -> impl Iterator<Item = &AnalyzedMove> {
        self.moves
            .iter()
            .filter(move |m| m.color == color && m.classification.is_puzzle_worthy())
    }
}

/// A new unique review id.
pub fn generate_review_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current unix timestamp in seconds.
pub fn now_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chess::START_FEN;

    pub fn analyzed(
        ply_index: usize,
        uci: &str,
        fen_before: &str,
        evals: (i32, i32),
        best: &str,
        classification: MoveClass,
    ) -> AnalyzedMove {
        AnalyzedMove {
            ply_index,
            san: chess::rules::san_for(fen_before, uci).unwrap_or_else(|_| uci.to_string()),
            uci: uci.to_string(),
            color: PieceColor::for_ply_index(ply_index),
            fen_before: fen_before.to_string(),
            eval_before_cp: Some(evals.0),
            eval_after_cp: Some(evals.1),
            best_move_uci: Some(best.to_string()),
            best_move_san: None,
            pv: vec![best.to_string()],
            classification,
        }
    }

    /// 1. e4 e5 2. Nf3 with simple evaluations.
    pub fn short_review() -> GameReview {
        let fen1 = chess::rules::apply_move(START_FEN, "e2e4").unwrap_or_default();
        let fen2 = chess::rules::apply_move(&fen1, "e7e5").unwrap_or_default();
        GameReview::new(
            "game-1",
            START_FEN,
            PieceColor::White,
            vec![
                analyzed(0, "e2e4", START_FEN, (20, 30), "e2e4", MoveClass::Best),
                analyzed(1, "e7e5", &fen1, (30, 25), "e7e5", MoveClass::Best),
                analyzed(2, "g1f3", &fen2, (25, 25), "g1f3", MoveClass::Best),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use chess::START_FEN;

    #[test]
    fn accuracy_matches_reference_points() {
        assert_eq!(compute_accuracy(&[]), 100.0);
        assert!((compute_accuracy(&[0, 0, 0]) - 100.0).abs() < 0.01);
        let ten = compute_accuracy(&[10, 10]);
        assert!((93.0..95.0).contains(&ten), "got {ten}");
        let hundred = compute_accuracy(&[100]);
        assert!((53.0..55.0).contains(&hundred), "got {hundred}");
    }

    #[test]
    fn mate_losses_are_capped() {
        assert_eq!(compute_accuracy(&[9_000]), compute_accuracy(&[1_000]));
    }

    #[test]
    fn summary_counts_by_side() {
        let mut moves = short_review().moves;
        moves[2].classification = MoveClass::Blunder;
        moves[2].eval_after_cp = Some(-400);

        let white = PlayerSummary::compute(&moves, PieceColor::White);
        let black = PlayerSummary::compute(&moves, PieceColor::Black);
        assert_eq!(white.counts.best, 1);
        assert_eq!(white.counts.blunder, 1);
        assert_eq!(black.counts.best, 1);
        assert!(white.accuracy < black.accuracy);
        assert_eq!(white.avg_cp_loss, 212.5);
    }

    #[test]
    fn invalid_best_move_is_suppressed() {
        let mut mv = analyzed(0, "e2e4", START_FEN, (20, 20), "e2e4", MoveClass::Best);
        assert_eq!(mv.suggestion(), Some("e2e4"));
        assert!(mv.played_best());

        mv.best_move_uci = Some("e7e5".to_string());
        assert!(mv.validated_best_move().is_err());
        assert_eq!(mv.suggestion(), None);

        mv.best_move_uci = None;
        assert_eq!(mv.validated_best_move(), Ok(None));
    }

    #[test]
    fn review_replays_into_ledger() {
        let review = short_review();
        let ledger = review.ledger().unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.position_at(1).unwrap().fen, review.moves[1].fen_before);
    }

    #[test]
    fn corrupted_review_fails_to_replay() {
        let mut review = short_review();
        review.moves[1].uci = "e2e4".to_string();
        assert!(matches!(
            review.ledger(),
            Err(LedgerError::IllegalMove { index: 1, .. })
        ));
    }

    #[test]
    fn review_json_round_trip_keeps_old_files_readable() {
        let review = short_review();
        let json = serde_json::to_value(&review).unwrap();
        let back: GameReview = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.moves, review.moves);
        assert_eq!(back.player_summary.counts, review.player_summary.counts);

        let mut legacy = json;
        legacy["moves"][0].as_object_mut().unwrap().remove("pv");
        legacy.as_object_mut().unwrap().remove("analysis_depth");
        let back: GameReview = serde_json::from_value(legacy).unwrap();
        assert!(back.moves[0].pv.is_empty());
    }
}
