use chess::PieceColor;
use serde::{Deserialize, Serialize};

/// Quality tag for a played move, ordered from unclassified to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveClass {
    /// Not evaluated (missing engine data).
    None,
    /// Opening theory, exempt from classification.
    Book,
    /// Matches the engine and is the only good move, usually a sacrifice.
    Brilliant,
    /// 1-10 cp lost.
    Great,
    /// No centipawn loss.
    Best,
    /// 11-30 cp lost.
    Good,
    /// 31-100 cp lost.
    Inaccuracy,
    /// 101-200 cp lost.
    Mistake,
    /// More than 200 cp lost.
    Blunder,
}

impl MoveClass {
    pub const ALL: [MoveClass; 9] = [
        Self::None,
        Self::Book,
        Self::Brilliant,
        Self::Great,
        Self::Best,
        Self::Good,
        Self::Inaccuracy,
        Self::Mistake,
        Self::Blunder,
    ];

    /// Map a non-negative centipawn loss onto its band.
    pub fn from_cp_loss(cp_loss: i32) -> Self {
        match cp_loss {
            i if i <= 0 => Self::Best,
            1..=10 => Self::Great,
            11..=30 => Self::Good,
            31..=100 => Self::Inaccuracy,
            101..=200 => Self::Mistake,
            _ => Self::Blunder,
        }
    }

    /// Inclusive centipawn-loss band, `None` upper bound meaning unbounded.
    /// Classes that are not loss-derived have no band.
    pub fn cp_loss_band(self) -> Option<(i32, Option<i32>)> {
        match self {
            Self::Best | Self::Brilliant => Some((0, Some(0))),
            Self::Great => Some((1, Some(10))),
            Self::Good => Some((11, Some(30))),
            Self::Inaccuracy => Some((31, Some(100))),
            Self::Mistake => Some((101, Some(200))),
            Self::Blunder => Some((201, None)),
            Self::None | Self::Book => None,
        }
    }

    pub fn is_puzzle_worthy(self) -> bool {
        matches!(self, Self::Mistake | Self::Blunder)
    }

    pub fn is_good(self) -> bool {
        matches!(self, Self::Good | Self::Best | Self::Great | Self::Brilliant)
    }

    /// Annotation glyph for move lists.
    pub fn glyph(self) -> Option<&'static str> {
        match self {
            Self::Brilliant => Some("!!"),
            Self::Great => Some("!"),
            Self::Inaccuracy => Some("?!"),
            Self::Mistake => Some("?"),
            Self::Blunder => Some("??"),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Book => "book",
            Self::Brilliant => "brilliant",
            Self::Great => "great",
            Self::Best => "best",
            Self::Good => "good",
            Self::Inaccuracy => "inaccuracy",
            Self::Mistake => "mistake",
            Self::Blunder => "blunder",
        }
    }
}

impl std::fmt::Display for MoveClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Centipawns the mover gave up, from White-relative evaluations.
pub fn cp_loss(eval_before_cp: i32, eval_after_cp: i32, side_to_move: PieceColor) -> i32 {
    let loss = match side_to_move {
        PieceColor::White => eval_before_cp.saturating_sub(eval_after_cp),
        PieceColor::Black => eval_after_cp.saturating_sub(eval_before_cp),
    };
    loss.max(0)
}

/// Classify a move from White-relative evaluations before and after it.
///
/// `is_forced` (the only legal move) is always `Best`. `is_only_good_move` is
/// the caller's brilliance hook and only upgrades a lossless move. Missing
/// evaluations give `None`. The opening-book override is applied by callers.
pub fn classify(
    eval_before_cp: Option<i32>,
    eval_after_cp: Option<i32>,
    side_to_move: PieceColor,
    is_forced: bool,
    is_only_good_move: bool,
) -> MoveClass {
    let (Some(before), Some(after)) = (eval_before_cp, eval_after_cp) else {
        return MoveClass::None;
    };
    if is_forced {
        return MoveClass::Best;
    }

    let loss = cp_loss(before, after, side_to_move);
    if loss == 0 && is_only_good_move {
        return MoveClass::Brilliant;
    }
    MoveClass::from_cp_loss(loss)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::AnalysisScore;

    fn white(before: i32, after: i32) -> MoveClass {
        classify(Some(before), Some(after), PieceColor::White, false, false)
    }

    #[test]
    fn bands_are_boundary_exact() {
        assert_eq!(white(50, 50), MoveClass::Best);
        assert_eq!(white(50, 40), MoveClass::Great);
        assert_eq!(white(50, 39), MoveClass::Good);
        assert_eq!(white(50, 20), MoveClass::Good);
        assert_eq!(white(50, 19), MoveClass::Inaccuracy);
        assert_eq!(white(50, -50), MoveClass::Inaccuracy);
        assert_eq!(white(50, -51), MoveClass::Mistake);
        assert_eq!(white(50, -150), MoveClass::Mistake);
        assert_eq!(white(50, -151), MoveClass::Blunder);
    }

    #[test]
    fn loss_is_measured_from_the_movers_side() {
        // Black to move: eval going up is bad for Black.
        assert_eq!(
            classify(Some(-30), Some(180), PieceColor::Black, false, false),
            MoveClass::Blunder
        );
        assert_eq!(
            classify(Some(-30), Some(-30), PieceColor::Black, false, false),
            MoveClass::Best
        );
        // Improving on the engine line is not negative loss.
        assert_eq!(cp_loss(10, 60, PieceColor::White), 0);
    }

    #[test]
    fn classify_is_deterministic() {
        for (before, after) in [(0, -300), (120, 115), (-40, -40)] {
            let first = white(before, after);
            for _ in 0..3 {
                assert_eq!(white(before, after), first);
            }
        }
    }

    #[test]
    fn forced_missing_and_brilliant() {
        assert_eq!(
            classify(Some(100), Some(-500), PieceColor::White, true, false),
            MoveClass::Best
        );
        assert_eq!(
            classify(None, Some(0), PieceColor::White, false, false),
            MoveClass::None
        );
        assert_eq!(
            classify(Some(80), Some(80), PieceColor::White, false, true),
            MoveClass::Brilliant
        );
        // A losing sacrifice is still judged by its loss.
        assert_eq!(
            classify(Some(80), Some(-200), PieceColor::White, false, true),
            MoveClass::Blunder
        );
    }

    #[test]
    fn allowing_mate_is_a_blunder() {
        let before = AnalysisScore::Centipawns(30).to_cp();
        let after = AnalysisScore::Mate(-2).to_cp();
        assert_eq!(white(before, after), MoveClass::Blunder);
    }

    #[test]
    fn predicates_and_ordering() {
        assert!(MoveClass::Mistake.is_puzzle_worthy());
        assert!(MoveClass::Blunder.is_puzzle_worthy());
        assert!(!MoveClass::Inaccuracy.is_puzzle_worthy());
        assert!(MoveClass::Brilliant.is_good());
        assert!(!MoveClass::Book.is_good());
        assert!(MoveClass::Blunder > MoveClass::Mistake);
        assert!(MoveClass::Inaccuracy > MoveClass::Good);
        assert_eq!(MoveClass::Blunder.glyph(), Some("??"));
        assert_eq!(MoveClass::Great.cp_loss_band(), Some((1, Some(10))));
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&MoveClass::Inaccuracy).unwrap();
        assert_eq!(json, "\"inaccuracy\"");
    }
}
