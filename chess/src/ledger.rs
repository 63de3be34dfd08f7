use cozy_chess::Board;

use crate::fen::{format_fen, parse_fen, FenError, START_FEN};
use crate::san::format_san;
use crate::types::PieceColor;
use crate::uci::{format_uci_move, parse_board_move, UciMoveError};

/// Immutable sequence of played moves plus the index currently displayed.
///
/// Index 0 is the starting position and `len()` is the final position. Boards
/// for every index are computed when a move is appended, so a lookup can never
/// observe a position that is out of date with the move list.
#[derive(Debug, Clone)]
pub struct PositionLedger {
    start_fen: String,
    moves: Vec<LedgerMove>,
    boards: Vec<Board>,
    current_index: usize,
}

/// A move recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerMove {
    pub uci: String,
    pub san: String,
    pub color: PieceColor,
    pub fen_before: String,
}

/// A position reachable in the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub index: usize,
    pub fen: String,
    pub side_to_move: PieceColor,
    /// The move that led here, absent at the starting position.
    pub last_move: Option<String>,
}

impl PositionLedger {
    /// Create an empty ledger from the standard starting position
    pub fn new() -> Self {
        Self {
            start_fen: START_FEN.to_string(),
            moves: Vec::new(),
            boards: vec![Board::default()],
            current_index: 0,
        }
    }

    /// Create an empty ledger from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, LedgerError> {
        let board = parse_fen(fen)?;
        Ok(Self {
            start_fen: format_fen(&board),
            moves: Vec::new(),
            boards: vec![board],
            current_index: 0,
        })
    }

    /// Build a ledger by replaying recorded UCI moves from `start_fen`.
    ///
    /// Fails on the first move that is illegal in its source position; stored
    /// data that does not replay is corrupt and must not be partially loaded.
    pub fn from_moves<I, S>(start_fen: &str, moves: I) -> Result<Self, LedgerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ledger = Self::from_fen(start_fen)?;
        for uci in moves {
            ledger.apply_move(uci.as_ref())?;
        }
        ledger.current_index = 0;
        Ok(ledger)
    }

    /// Append a move after the final position and display the result.
    pub fn apply_move(&mut self, uci: &str) -> Result<Position, LedgerError> {
        let index = self.moves.len();
        let board = self.final_board();
        let mv = parse_board_move(board, uci).map_err(|source| LedgerError::IllegalMove {
            index,
            uci: uci.to_string(),
            source,
        })?;

        let entry = LedgerMove {
            uci: format_uci_move(board, mv),
            san: format_san(board, mv),
            color: board.side_to_move().into(),
            fen_before: format_fen(board),
        };

        let mut next = board.clone();
        next.play_unchecked(mv);

        self.moves.push(entry);
        self.boards.push(next);
        self.current_index = self.moves.len();

        self.position_at(self.current_index)
    }

    /// Position after `moves[0..index)`.
    pub fn position_at(&self, index: usize) -> Result<Position, LedgerError> {
        let board = self.boards.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.moves.len(),
        })?;

        Ok(Position {
            index,
            fen: format_fen(board),
            side_to_move: board.side_to_move().into(),
            last_move: index
                .checked_sub(1)
                .and_then(|i| self.moves.get(i))
                .map(|m| m.uci.clone()),
        })
    }

    /// The currently displayed position.
    pub fn current(&self) -> Position {
        let board = &self.boards[self.current_index];
        Position {
            index: self.current_index,
            fen: format_fen(board),
            side_to_move: board.side_to_move().into(),
            last_move: self
                .current_index
                .checked_sub(1)
                .map(|i| self.moves[i].uci.clone()),
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Display `index`, clamped to `0..=len()`. Returns the index displayed.
    pub fn seek(&mut self, index: usize) -> usize {
        self.current_index = index.min(self.moves.len());
        self.current_index
    }

    /// Drop all moves and return to the starting position.
    pub fn reset(&mut self) {
        self.moves.clear();
        self.boards.truncate(1);
        self.current_index = 0;
    }

    pub fn moves(&self) -> &[LedgerMove] {
        &self.moves
    }

    /// The recorded move leaving `index`, if any.
    pub fn move_at(&self, index: usize) -> Option<&LedgerMove> {
        self.moves.get(index)
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    fn final_board(&self) -> &Board {
        // `boards` always holds the start board plus one per move.
        &self.boards[self.moves.len()]
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Replay `moves[0..upto)` from `start_fen` without caching and return the FEN.
pub fn replay<S: AsRef<str>>(start_fen: &str, moves: &[S], upto: usize) -> Result<String, LedgerError> {
    let mut board = parse_fen(start_fen)?;
    for (index, uci) in moves.iter().take(upto).enumerate() {
        let mv = parse_board_move(&board, uci.as_ref()).map_err(|source| {
            LedgerError::IllegalMove {
                index,
                uci: uci.as_ref().to_string(),
                source,
            }
        })?;
        board.play_unchecked(mv);
    }
    Ok(format_fen(&board))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("FEN parse error: {0}")]
    Fen(#[from] FenError),
    #[error("Illegal move {uci} at ply index {index}: {source}")]
    IllegalMove {
        index: usize,
        uci: String,
        source: UciMoveError,
    },
    #[error("Position index {index} out of range (ledger has {len} moves)")]
    IndexOutOfRange { index: usize, len: usize },
}
