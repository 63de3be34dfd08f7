//! Plain-text formatting of reviews and puzzles for the terminal.

use std::fmt::Write;

use chess::{AnalysisScore, PieceColor, MATE_BASE};
use review::{AnalyzedMove, GameReview, MoveClass, PlayerSummary, PuzzleSession};

/// White-relative evaluation as pawns (`+0.35`), mate distance (`+M3`), or the
/// result once mate is on the board.
pub fn format_eval(cp: Option<i32>) -> String {
    match cp {
        None => "?".to_string(),
        Some(cp) if cp >= MATE_BASE => "1-0".to_string(),
        Some(cp) if cp <= -MATE_BASE => "0-1".to_string(),
        Some(cp) => AnalysisScore::from_cp(cp).display(),
    }
}

/// Move number prefix in PGN style: `3.` for White, `3...` for Black.
pub fn move_number(ply_index: usize) -> String {
    let number = ply_index / 2 + 1;
    match PieceColor::for_ply_index(ply_index) {
        PieceColor::White => format!("{}.", number),
        PieceColor::Black => format!("{}...", number),
    }
}

pub fn format_move(mv: &AnalyzedMove) -> String {
    let mut line = format!(
        "{:>6} {:<8}{:<3} {:>7}  {}",
        move_number(mv.ply_index),
        mv.san,
        mv.classification.glyph().unwrap_or(""),
        format_eval(mv.eval_after_cp),
        mv.classification,
    );
    if !mv.classification.is_good() && !mv.played_best() {
        if let Some(best) = mv.suggestion() {
            let shown = mv.best_move_san.as_deref().unwrap_or(best);
            let _ = write!(line, " (best: {})", shown);
        }
    }
    line
}

pub fn format_summary(summary: &PlayerSummary) -> String {
    let mut out = format!(
        "{:<6} accuracy {:>5.1}%  avg loss {:>5.1}cp",
        summary.color.as_str(),
        summary.accuracy,
        summary.avg_cp_loss
    );
    for class in MoveClass::ALL {
        let count = summary.counts.get(class);
        if count > 0 && class != MoveClass::None {
            let _ = write!(out, "  {} {}", class.label(), count);
        }
    }
    out
}

pub fn format_review(review: &GameReview) -> String {
    let mut out = format!("Review {} ({} plies)\n", review.id, review.len());
    if let Some(depth) = review.analysis_depth {
        let _ = writeln!(out, "Analysis depth {}", depth);
    }
    for mv in &review.moves {
        out.push_str(&format_move(mv));
        out.push('\n');
    }
    out.push('\n');
    out.push_str(&format_summary(&review.player_summary));
    out.push('\n');
    out.push_str(&format_summary(&review.opponent_summary));
    out.push('\n');
    out
}

pub fn format_puzzle(number: usize, puzzle: &PuzzleSession) -> String {
    let mut out = format!(
        "#{} {} to move, {} move(s)",
        number,
        puzzle.player_color().as_str(),
        puzzle.player_move_count()
    );
    if let Some(source) = puzzle.source() {
        let _ = write!(
            out,
            " (from {} {}, {})",
            move_number(source.ply_index),
            source.played_uci,
            source.classification
        );
    }
    let _ = write!(out, "\n   {}", puzzle.position());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::START_FEN;
    use review::PuzzleSource;

    #[test]
    fn evals_render_as_pawns_or_mate() {
        assert_eq!(format_eval(None), "?");
        assert_eq!(format_eval(Some(35)), "+0.35");
        assert_eq!(format_eval(Some(-120)), "-1.20");
        assert_eq!(format_eval(Some(9700)), "+M3");
        assert_eq!(format_eval(Some(-9900)), "-M1");
        assert_eq!(format_eval(Some(10000)), "1-0");
        assert_eq!(format_eval(Some(-10000)), "0-1");
    }

    #[test]
    fn move_numbers_follow_pgn() {
        assert_eq!(move_number(0), "1.");
        assert_eq!(move_number(1), "1...");
        assert_eq!(move_number(4), "3.");
    }

    #[test]
    fn mistakes_show_the_better_move() {
        let mv = AnalyzedMove {
            ply_index: 0,
            san: "a3".to_string(),
            uci: "a2a3".to_string(),
            color: PieceColor::White,
            fen_before: START_FEN.to_string(),
            eval_before_cp: Some(30),
            eval_after_cp: Some(-90),
            best_move_uci: Some("e2e4".to_string()),
            best_move_san: Some("e4".to_string()),
            pv: vec!["e2e4".to_string()],
            classification: MoveClass::Mistake,
        };
        let line = format_move(&mv);
        assert!(line.contains("1."));
        assert!(line.contains("a3"));
        assert!(line.contains("-0.90"));
        assert!(line.ends_with("(best: e4)"), "{line}");
    }

    #[test]
    fn puzzle_lines_name_their_source() {
        let puzzle = PuzzleSession::new(START_FEN, vec!["e2e4".to_string()])
            .unwrap()
            .with_source(PuzzleSource {
                review_id: "game-1".to_string(),
                ply_index: 0,
                played_uci: "a2a3".to_string(),
                classification: MoveClass::Blunder,
            });
        let text = format_puzzle(1, &puzzle);
        assert!(text.starts_with("#1 white to move, 1 move(s) (from 1. a2a3"));
        assert!(text.contains(START_FEN));
    }
}
