//! UCI text protocol: engine output parsing and command formatting.

pub mod parser;

pub use parser::{parse_uci_message, EngineInfo, UciCommand, UciMessage};

/// A line from the engine that could not be understood. The driver logs and
/// skips these; they never fail a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Malformed UCI message: {0}")]
    MalformedMessage(String),
    /// Lines such as `option name ...` or copyright banners.
    #[error("Unrecognized UCI line: {0}")]
    UnknownMessage(String),
    #[error("Invalid move in engine output: {0}")]
    InvalidMove(String),
}
