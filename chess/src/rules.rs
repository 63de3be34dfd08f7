//! Rules oracle over FEN strings.
//!
//! Review components hold positions as FEN text; these helpers are the only
//! place that parses them back into boards to answer legality questions.

use std::collections::{BTreeMap, BTreeSet};

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::fen::{format_fen, parse_fen, FenError};
use crate::uci::{format_square, format_uci_move, parse_board_move, UciMoveError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RulesError {
    #[error(transparent)]
    Fen(#[from] FenError),
    #[error(transparent)]
    Move(#[from] UciMoveError),
}

/// All legal moves of `board`.
pub(crate) fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

/// Legal moves grouped by origin square, destinations in UCI square notation.
///
/// Castling appears under the king with the two-square destination (`g1`/`c1`).
pub fn legal_moves_by_square(fen: &str) -> Result<BTreeMap<String, BTreeSet<String>>, RulesError> {
    let board = parse_fen(fen)?;
    let mut map: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for mv in legal_moves(&board) {
        let uci = format_uci_move(&board, mv);
        map.entry(format_square(mv.from))
            .or_default()
            .insert(uci[2..4].to_string());
    }
    Ok(map)
}

/// Every legal move of the position in UCI notation.
pub fn legal_uci_moves(fen: &str) -> Result<Vec<String>, RulesError> {
    let board = parse_fen(fen)?;
    Ok(legal_moves(&board)
        .into_iter()
        .map(|mv| format_uci_move(&board, mv))
        .collect())
}

/// Apply a UCI move to a FEN position and return the resulting FEN.
pub fn apply_move(fen: &str, uci: &str) -> Result<String, RulesError> {
    let mut board = parse_fen(fen)?;
    let mv = parse_board_move(&board, uci)?;
    board.play_unchecked(mv);
    Ok(format_fen(&board))
}

/// Standard spelling of a legal move: king-takes-rook castling (`e1h1`)
/// becomes the two-square king move (`e1g1`).
pub fn canonical_move(fen: &str, uci: &str) -> Result<String, RulesError> {
    let board = parse_fen(fen)?;
    let mv = parse_board_move(&board, uci)?;
    Ok(format_uci_move(&board, mv))
}

/// True if `uci` is a legal move in `fen`. Unparseable input is never legal.
pub fn is_legal(fen: &str, uci: &str) -> bool {
    parse_fen(fen)
        .map(|board| parse_board_move(&board, uci).is_ok())
        .unwrap_or(false)
}

/// Number of legal moves, stopping early once it exceeds `limit`.
pub fn count_legal_moves(fen: &str, limit: usize) -> Result<usize, RulesError> {
    let board = parse_fen(fen)?;
    let mut count = 0;
    board.generate_moves(|mvs| {
        count += mvs.len();
        count > limit
    });
    Ok(count)
}

/// True when the side to move has exactly one legal move.
pub fn is_forced(fen: &str) -> bool {
    matches!(count_legal_moves(fen, 1), Ok(1))
}

/// True for checkmate or stalemate.
pub fn is_terminal(fen: &str) -> bool {
    parse_fen(fen)
        .map(|board| board.status() != GameStatus::Ongoing)
        .unwrap_or(false)
}

/// True when the side to move is checkmated.
pub fn is_checkmate(fen: &str) -> bool {
    parse_fen(fen)
        .map(|board| board.status() == GameStatus::Won)
        .unwrap_or(false)
}

fn piece_value(piece: Piece) -> u32 {
    match piece {
        Piece::Pawn => 1,
        Piece::Knight | Piece::Bishop => 3,
        Piece::Rook => 5,
        Piece::Queen => 9,
        Piece::King => 0,
    }
}

/// True when `uci` puts a piece where the opponent can take it and the piece
/// is worth more than whatever it captured. Pawn and king moves never count.
pub fn is_sacrifice(fen: &str, uci: &str) -> bool {
    let Ok(mut board) = parse_fen(fen) else {
        return false;
    };
    let Ok(mv) = parse_board_move(&board, uci) else {
        return false;
    };
    let Some(moved) = board.piece_on(mv.from) else {
        return false;
    };
    if matches!(moved, Piece::Pawn | Piece::King) {
        return false;
    }

    let captured = board.piece_on(mv.to).map_or(0, piece_value);
    board.play_unchecked(mv);
    let en_prise = legal_moves(&board).iter().any(|reply| reply.to == mv.to);
    en_prise && piece_value(moved) > captured
}

/// SAN for a UCI move in `fen`.
pub fn san_for(fen: &str, uci: &str) -> Result<String, RulesError> {
    let board = parse_fen(fen)?;
    let mv = parse_board_move(&board, uci)?;
    Ok(crate::san::format_san(&board, mv))
}
