//! UCI move codec.
//!
//! UCI strings are `<from><to>[promotion]`, e.g. `e2e4` or `e7e8q`. Castling is
//! written as the king's two-square move (`e1g1`), while cozy-chess encodes it
//! as king-takes-own-rook (`e1h1`). Conversion in both directions needs the
//! board, so board-aware helpers live here next to the pure syntax parser.

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::types::PieceKind;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciMoveError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
    #[error("Illegal move {0} in this position")]
    Illegal(String),
}

/// Parse UCI move syntax without reference to a position.
pub fn parse_uci(s: &str) -> Result<Move, UciMoveError> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return Err(UciMoveError::InvalidMove(s.to_string()));
    }

    let from = parse_square(&s[0..2])?;
    let to = parse_square(&s[2..4])?;

    let promotion = match s[4..].chars().next() {
        Some(c) => Some(
            PieceKind::from_promotion_char(c)
                .map(Piece::from)
                .ok_or_else(|| UciMoveError::InvalidPromotion(s.to_string()))?,
        ),
        None => None,
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// True if `s` is well-formed UCI move text.
pub fn is_valid_uci(s: &str) -> bool {
    parse_uci(s).is_ok()
}

/// Parse a UCI move and resolve it against `board`, rejecting illegal moves.
pub fn parse_board_move(board: &Board, s: &str) -> Result<Move, UciMoveError> {
    let mv = normalize_castling(board, parse_uci(s)?);
    if board.is_legal(mv) {
        Ok(mv)
    } else {
        Err(UciMoveError::Illegal(s.to_string()))
    }
}

/// Format a legal move of `board` in standard UCI notation.
pub fn format_uci_move(board: &Board, mv: Move) -> String {
    let to = if is_castling(board, mv) {
        let file = if file_char(mv.to) > file_char(mv.from) {
            File::G
        } else {
            File::C
        };
        Square::new(file, mv.from.rank())
    } else {
        mv.to
    };

    let mut s = format!("{}{}", format_square(mv.from), format_square(to));
    if let Some(c) = mv.promotion.and_then(|p| PieceKind::from(p).promotion_char()) {
        s.push(c);
    }
    s
}

/// True when `mv` is cozy-chess castling: the king lands on its own rook.
pub(crate) fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to) == Some(board.side_to_move())
}

/// Convert a standard two-square king move into cozy-chess's king-takes-rook
/// form when that is the legal castling move in `board`.
fn normalize_castling(board: &Board, mv: Move) -> Move {
    if board.piece_on(mv.from) != Some(Piece::King) || mv.promotion.is_some() {
        return mv;
    }
    let is_home_rank = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    if !is_home_rank || mv.from.file() != File::E || mv.to.rank() != mv.from.rank() {
        return mv;
    }

    let rook_file = match mv.to.file() {
        File::G => File::H,
        File::C => File::A,
        _ => return mv,
    };
    let converted = Move {
        from: mv.from,
        to: Square::new(rook_file, mv.from.rank()),
        promotion: None,
    };

    if board.is_legal(converted) {
        converted
    } else {
        mv
    }
}

pub(crate) fn parse_square(s: &str) -> Result<Square, UciMoveError> {
    let mut chars = s.chars();
    let (Some(f), Some(r), None) = (chars.next(), chars.next(), chars.next()) else {
        return Err(UciMoveError::InvalidSquare(s.to_string()));
    };

    let file = match f {
        'a' => File::A,
        'b' => File::B,
        'c' => File::C,
        'd' => File::D,
        'e' => File::E,
        'f' => File::F,
        'g' => File::G,
        'h' => File::H,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    let rank = match r {
        '1' => Rank::First,
        '2' => Rank::Second,
        '3' => Rank::Third,
        '4' => Rank::Fourth,
        '5' => Rank::Fifth,
        '6' => Rank::Sixth,
        '7' => Rank::Seventh,
        '8' => Rank::Eighth,
        _ => return Err(UciMoveError::InvalidSquare(s.to_string())),
    };

    Ok(Square::new(file, rank))
}

pub(crate) fn file_char(sq: Square) -> char {
    match sq.file() {
        File::A => 'a',
        File::B => 'b',
        File::C => 'c',
        File::D => 'd',
        File::E => 'e',
        File::F => 'f',
        File::G => 'g',
        File::H => 'h',
    }
}

pub(crate) fn rank_char(sq: Square) -> char {
    match sq.rank() {
        Rank::First => '1',
        Rank::Second => '2',
        Rank::Third => '3',
        Rank::Fourth => '4',
        Rank::Fifth => '5',
        Rank::Sixth => '6',
        Rank::Seventh => '7',
        Rank::Eighth => '8',
    }
}

pub(crate) fn format_square(sq: Square) -> String {
    format!("{}{}", file_char(sq), rank_char(sq))
}
