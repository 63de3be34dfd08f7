//! Chess primitives for game review: FEN and UCI codecs, SAN formatting,
//! a rules oracle over `cozy-chess`, the evaluation axis, and the
//! position ledger used to replay a recorded game.

pub mod fen;
pub mod ledger;
pub mod rules;
pub mod san;
pub mod score;
pub mod types;
pub mod uci;

pub use fen::{format_fen, parse_fen, FenError, START_FEN};
pub use ledger::{replay, LedgerError, LedgerMove, Position, PositionLedger};
pub use rules::RulesError;
pub use san::format_san;
pub use score::{is_mate_cp, AnalysisScore, MATE_BASE, MATE_THRESHOLD};
pub use types::{PieceColor, PieceKind};
pub use uci::{format_uci_move, is_valid_uci, parse_board_move, parse_uci, UciMoveError};
