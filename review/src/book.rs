/// Opening-book lookup consulted before a move is classified.
pub trait OpeningBook: Send + Sync {
    /// True if the move played from `fen_before` at 0-based `ply` is theory.
    fn is_book_move(&self, fen_before: &str, ply: usize) -> bool;
}

/// No book: every move is classified from its evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBook;

impl OpeningBook for NoBook {
    fn is_book_move(&self, _fen_before: &str, _ply: usize) -> bool {
        false
    }
}

/// Treats the first `n` plies of every game as book.
#[derive(Debug, Clone, Copy)]
pub struct FirstPlies(pub usize);

impl OpeningBook for FirstPlies {
    fn is_book_move(&self, _fen_before: &str, ply: usize) -> bool {
        ply < self.0
    }
}
