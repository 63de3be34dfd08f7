//! Standard Algebraic Notation for display in move lists.

use cozy_chess::{Board, GameStatus, Move, Piece};

use crate::rules::legal_moves;
use crate::types::PieceKind;
use crate::uci::{file_char, format_square, is_castling, rank_char};

/// Format a legal move of `board` as SAN (`Nf3`, `exd5`, `O-O`, `e8=Q#`).
pub fn format_san(board: &Board, mv: Move) -> String {
    let mut san = if is_castling(board, mv) {
        if file_char(mv.to) > file_char(mv.from) {
            "O-O".to_string()
        } else {
            "O-O-O".to_string()
        }
    } else {
        piece_move_text(board, mv)
    };

    let mut after = board.clone();
    after.play_unchecked(mv);
    if after.status() == GameStatus::Won {
        san.push('#');
    } else if !after.checkers().is_empty() {
        san.push('+');
    }

    san
}

fn piece_move_text(board: &Board, mv: Move) -> String {
    let mut san = String::new();
    let Some(piece) = board.piece_on(mv.from) else {
        return format_square(mv.to);
    };

    // Pawns capture diagonally, which also covers en passant onto an empty square.
    let is_capture = board.color_on(mv.to).is_some()
        || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

    if piece == Piece::Pawn {
        if is_capture {
            san.push(file_char(mv.from));
        }
    } else {
        san.push(PieceKind::from(piece).to_char_upper());
        san.push_str(&disambiguation(board, mv, piece));
    }

    if is_capture {
        san.push('x');
    }
    san.push_str(&format_square(mv.to));

    if let Some(promo) = mv.promotion {
        san.push('=');
        san.push(PieceKind::from(promo).to_char_upper());
    }

    san
}

/// File, rank, or full square needed to tell `mv` apart from sibling moves of
/// the same piece type landing on the same square.
fn disambiguation(board: &Board, mv: Move, piece: Piece) -> String {
    let rivals: Vec<Move> = legal_moves(board)
        .into_iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
        })
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    if rivals.iter().all(|r| r.from.file() != mv.from.file()) {
        return file_char(mv.from).to_string();
    }
    if rivals.iter().all(|r| r.from.rank() != mv.from.rank()) {
        return rank_char(mv.from).to_string();
    }
    format_square(mv.from)
}
