use cozy_chess::Board;

use crate::types::PieceColor;

/// The standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a 6-field FEN string into a Board
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let fields = fen.split_whitespace().count();
    if fields != 6 {
        return Err(FenError::FieldCount(fields));
    }

    Board::from_fen(fen.trim(), false).map_err(|_| FenError::InvalidFormat(fen.to_string()))
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// Side to move as written in the FEN's second field.
pub fn side_to_move(fen: &str) -> Result<PieceColor, FenError> {
    match fen.split_whitespace().nth(1) {
        Some("w") => Ok(PieceColor::White),
        Some("b") => Ok(PieceColor::Black),
        _ => Err(FenError::InvalidFormat(fen.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN: {0}")]
    InvalidFormat(String),
    #[error("FEN must have 6 fields, found {0}")]
    FieldCount(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_position_round_trips() {
        let board = parse_fen(START_FEN).unwrap();
        assert_eq!(format_fen(&board), START_FEN);
    }

    #[test]
    fn rejects_truncated_fen() {
        let err = parse_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq").unwrap_err();
        assert_eq!(err, FenError::FieldCount(3));
    }

    #[test]
    fn rejects_garbage_board() {
        assert!(matches!(
            parse_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"),
            Err(FenError::InvalidFormat(_))
        ));
    }

    #[test]
    fn reads_side_to_move() {
        assert_eq!(side_to_move(START_FEN).unwrap(), PieceColor::White);
        assert_eq!(
            side_to_move("8/8/8/8/8/8/8/K6k b - - 0 1").unwrap(),
            PieceColor::Black
        );
        assert!(side_to_move("8/8/8/8/8/8/8/K6k").is_err());
    }
}
