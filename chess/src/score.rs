//! Engine evaluation scores and the single numeric axis they fold onto.
//!
//! Mate scores share the centipawn axis: mate in N folds to
//! `sign(N) * (MATE_BASE - |N| * MATE_STEP)`, so ordinary comparisons and the
//! loss bands of the move classifier need no separate code path. Centipawn
//! values are clamped below [`MATE_THRESHOLD`] so they never alias a mate.

use serde::{Deserialize, Serialize};

use crate::types::PieceColor;

/// Folded value of "mate right now".
pub const MATE_BASE: i32 = 10_000;
/// Axis distance between mate-in-N and mate-in-(N+1).
pub const MATE_STEP: i32 = 100;
/// Longest mate distance kept exact on the axis.
pub const MAX_MATE_DISTANCE: i32 = 50;
/// Folded magnitudes at or above this are mate scores.
pub const MATE_THRESHOLD: i32 = MATE_BASE - MAX_MATE_DISTANCE * MATE_STEP;

/// Engine evaluation score.
///
/// Centipawns: positive = side-to-move is better.
/// Mate: positive N = side-to-move mates in N moves,
/// negative N = side-to-move gets mated in N moves,
/// zero = side-to-move is checkmated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisScore {
    Centipawns(i32),
    Mate(i32),
}

impl AnalysisScore {
    pub fn display(&self) -> String {
        match self {
            Self::Centipawns(cp) => format!("{:+.2}", *cp as f64 / 100.0),
            Self::Mate(m) => {
                if *m > 0 {
                    format!("+M{}", m)
                } else {
                    format!("-M{}", m.abs())
                }
            }
        }
    }

    /// Fold onto the shared centipawn axis.
    pub fn to_cp(&self) -> i32 {
        match *self {
            Self::Centipawns(cp) => cp.clamp(-(MATE_THRESHOLD - 1), MATE_THRESHOLD - 1),
            Self::Mate(0) => -MATE_BASE,
            Self::Mate(m) => {
                let distance = m.abs().min(MAX_MATE_DISTANCE);
                m.signum() * (MATE_BASE - distance * MATE_STEP)
            }
        }
    }

    /// Unfold a value from the shared axis.
    pub fn from_cp(cp: i32) -> Self {
        if cp.abs() < MATE_THRESHOLD {
            return Self::Centipawns(cp);
        }
        let magnitude = cp.abs().min(MATE_BASE);
        let distance = (MATE_BASE - magnitude + MATE_STEP / 2) / MATE_STEP;
        Self::Mate(cp.signum() * distance)
    }

    /// Negate the score (flip perspective).
    pub fn negate(&self) -> Self {
        match self {
            Self::Centipawns(cp) => Self::Centipawns(-cp),
            Self::Mate(m) => Self::Mate(-m),
        }
    }

    /// Re-express a side-to-move relative score from White's point of view.
    pub fn for_white(&self, side_to_move: PieceColor) -> Self {
        match side_to_move {
            PieceColor::White => *self,
            PieceColor::Black => self.negate(),
        }
    }

    /// Fold onto the axis from White's point of view.
    ///
    /// Unlike `for_white(..).to_cp()` this keeps `Mate(0)` with Black to move
    /// (Black is checkmated) at `+MATE_BASE`.
    pub fn white_cp(&self, side_to_move: PieceColor) -> i32 {
        let cp = self.to_cp();
        match side_to_move {
            PieceColor::White => cp,
            PieceColor::Black => -cp,
        }
    }

    pub fn is_mate(&self) -> bool {
        matches!(self, Self::Mate(_))
    }
}

/// True if `cp` on the shared axis encodes a forced mate.
pub fn is_mate_cp(cp: i32) -> bool {
    cp.abs() >= MATE_THRESHOLD
}

impl std::fmt::Display for AnalysisScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
