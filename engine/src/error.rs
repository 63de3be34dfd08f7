/// Errors surfaced by engine handles and the pool.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The process failed to start or to complete the readiness handshake.
    /// Retryable: nothing is cached, so a later acquire starts from scratch.
    #[error("Engine failed to start: {0}")]
    Init(String),
    /// The search ended (or timed out) without producing any move.
    #[error("Analysis finished without a best move")]
    NoMoveFound,
    /// A newer `analyze()` call on the same handle replaced this one.
    #[error("Analysis request {0} superseded by a newer request")]
    Superseded(u64),
    #[error("Engine handle disposed")]
    Disposed,
    #[error("Engine process terminated: {0}")]
    Terminated(String),
    #[error("Invalid position: {0}")]
    InvalidPosition(#[from] chess::FenError),
}

impl EngineError {
    /// True for errors where repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Init(_) | Self::NoMoveFound | Self::Superseded(_))
    }
}
