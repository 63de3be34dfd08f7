use crate::board::ReviewBoard;
use crate::error::{PuzzleError, ReviewError};
use crate::exploration::EvalRequest;
use crate::puzzle::{MoveVerdict, PuzzleSession};

/// Whichever state machine owns board input.
///
/// Board moves go through [`ActiveBoard::submit_move`]: on a review board they
/// branch into exploration, on a puzzle they are verified.
#[derive(Debug, Clone)]
pub enum ActiveBoard {
    Review(ReviewBoard),
    Puzzle(PuzzleSession),
}

/// What a submitted move led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResponse {
    /// The branch tip changed; evaluate it.
    Explored(EvalRequest),
    Puzzle(MoveVerdict),
}

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error(transparent)]
    Puzzle(#[from] PuzzleError),
}

impl ActiveBoard {
    pub fn submit_move(&mut self, uci: &str) -> Result<MoveResponse, InputError> {
        match self {
            Self::Review(board) => Ok(MoveResponse::Explored(board.submit_move(uci)?)),
            Self::Puzzle(puzzle) => Ok(MoveResponse::Puzzle(puzzle.submit_move(uci)?)),
        }
    }

    pub fn displayed_fen(&self) -> String {
        match self {
            Self::Review(board) => board.displayed_fen(),
            Self::Puzzle(puzzle) => puzzle.displayed_fen().to_string(),
        }
    }

    pub fn as_review(&self) -> Option<&ReviewBoard> {
        match self {
            Self::Review(board) => Some(board),
            Self::Puzzle(_) => None,
        }
    }

    pub fn as_puzzle(&self) -> Option<&PuzzleSession> {
        match self {
            Self::Puzzle(puzzle) => Some(puzzle),
            Self::Review(_) => None,
        }
    }
}

impl From<ReviewBoard> for ActiveBoard {
    fn from(board: ReviewBoard) -> Self {
        Self::Review(board)
    }
}

impl From<PuzzleSession> for ActiveBoard {
    fn from(puzzle: PuzzleSession) -> Self {
        Self::Puzzle(puzzle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::short_review;
    use chess::START_FEN;

    #[test]
    fn review_board_moves_explore() {
        let mut active = ActiveBoard::from(ReviewBoard::new(short_review()).unwrap());
        let response = active.submit_move("d2d4").unwrap();

        assert!(matches!(response, MoveResponse::Explored(_)));
        assert!(active.as_review().unwrap().is_exploring());
        assert_ne!(active.displayed_fen(), START_FEN);
    }

    #[test]
    fn puzzle_moves_are_verified() {
        let puzzle = PuzzleSession::new(START_FEN, vec!["e2e4".to_string()]).unwrap();
        let mut active = ActiveBoard::from(puzzle);

        assert_eq!(
            active.submit_move("d2d4").unwrap(),
            MoveResponse::Puzzle(MoveVerdict::Wrong)
        );
        assert!(matches!(
            active.submit_move("e2e4"),
            Err(InputError::Puzzle(PuzzleError::NotAwaitingMove(_)))
        ));
        assert!(active.as_review().is_none());
        assert_eq!(active.as_puzzle().unwrap().wrong_attempts(), 1);
    }

    #[test]
    fn illegal_moves_surface_from_the_owner() {
        let mut active = ActiveBoard::from(ReviewBoard::new(short_review()).unwrap());
        assert!(matches!(
            active.submit_move("a1a5"),
            Err(InputError::Review(ReviewError::IllegalMove { .. }))
        ));
    }
}
