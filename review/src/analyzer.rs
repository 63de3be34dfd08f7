//! Turns a recorded game into a [`GameReview`].
//!
//! Every position of the game, from the start to the final one, is evaluated
//! once on the engine. Move `i` is then judged by the evaluations of positions
//! `i` and `i + 1`, both normalized to White's point of view.

use chess::{rules, AnalysisScore, PieceColor, Position, PositionLedger};
use engine::{EngineConfig, EngineError, EngineHandle};
use tokio::sync::mpsc;

use crate::book::OpeningBook;
use crate::classify::{classify, MoveClass};
use crate::error::ReviewError;
use crate::types::{AnalyzedMove, GameRecord, GameReview};

/// How a game is analyzed.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub config: EngineConfig,
    /// Side of the reviewing player; the summaries are split by it.
    pub player_color: PieceColor,
    /// Tag lossless engine-matching sacrifices as brilliant.
    pub detect_brilliant: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            player_color: PieceColor::White,
            detect_brilliant: true,
        }
    }
}

/// Emitted after each position is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisProgress {
    pub evaluated: usize,
    pub total: usize,
}

#[derive(Debug, Default)]
struct PositionEval {
    eval_cp: Option<i32>,
    best_move: Option<String>,
    pv: Vec<String>,
}

/// Analyze every move of `game` on `engine`.
///
/// Fails with [`ReviewError::Ledger`] if the moves do not replay from the
/// start position. Engine failures other than a missing best move abort the
/// analysis; a position without a result leaves its moves unclassified.
#[tracing::instrument(level = "info", skip_all, fields(game_id = %game.id, plies = game.moves.len()))]
pub async fn analyze_game<B: OpeningBook + ?Sized>(
    engine: &EngineHandle,
    game: &GameRecord,
    options: &AnalyzeOptions,
    book: &B,
    progress: Option<&mpsc::Sender<AnalysisProgress>>,
) -> Result<GameReview, ReviewError> {
    let ledger = PositionLedger::from_moves(&game.start_fen, game.moves.iter())?;
    let total = ledger.len() + 1;
    tracing::info!("Starting review analysis");

    let mut evals = Vec::with_capacity(total);
    for index in 0..total {
        let position = ledger.position_at(index)?;
        evals.push(evaluate_position(engine, &position, &options.config).await?);

        if let Some(tx) = progress {
            let _ = tx
                .send(AnalysisProgress {
                    evaluated: index + 1,
                    total,
                })
                .await;
        }
    }

    let moves = ledger
        .moves()
        .iter()
        .enumerate()
        .map(|(ply, played)| {
            let before = &evals[ply];
            let after = &evals[ply + 1];
            let fen = &played.fen_before;

            let classification = if book.is_book_move(fen, ply) {
                MoveClass::Book
            } else {
                let engine_move = before.best_move.as_deref() == Some(played.uci.as_str());
                let only_good = options.detect_brilliant
                    && engine_move
                    && rules::is_sacrifice(fen, &played.uci);
                classify(
                    before.eval_cp,
                    after.eval_cp,
                    played.color,
                    rules::is_forced(fen),
                    only_good,
                )
            };

            tracing::debug!(
                ply,
                san = %played.san,
                best = ?before.best_move,
                eval_before = ?before.eval_cp,
                eval_after = ?after.eval_cp,
                classification = %classification,
                "Ply analyzed"
            );

            AnalyzedMove {
                ply_index: ply,
                san: played.san.clone(),
                uci: played.uci.clone(),
                color: played.color,
                fen_before: fen.clone(),
                eval_before_cp: before.eval_cp,
                eval_after_cp: after.eval_cp,
                best_move_uci: before.best_move.clone(),
                best_move_san: before
                    .best_move
                    .as_deref()
                    .and_then(|best| rules::san_for(fen, best).ok()),
                pv: before.pv.clone(),
                classification,
            }
        })
        .collect();

    let mut review = GameReview::new(&game.id, &game.start_fen, options.player_color, moves);
    if options.config.move_time_ms.is_none() {
        review.analysis_depth = Some(options.config.max_depth);
    }

    tracing::info!(
        player_accuracy = review.player_summary.accuracy,
        opponent_accuracy = review.opponent_summary.accuracy,
        "Review analysis complete"
    );
    Ok(review)
}

/// Evaluate one position. Terminal positions are scored without the engine:
/// checkmate is a mate-in-0 for the side to move, stalemate is level.
async fn evaluate_position(
    engine: &EngineHandle,
    position: &Position,
    config: &EngineConfig,
) -> Result<PositionEval, ReviewError> {
    if rules::is_terminal(&position.fen) {
        let score = if rules::is_checkmate(&position.fen) {
            AnalysisScore::Mate(0)
        } else {
            AnalysisScore::Centipawns(0)
        };
        return Ok(PositionEval {
            eval_cp: Some(score.white_cp(position.side_to_move)),
            ..Default::default()
        });
    }

    let outcome = match engine.analyze(&position.fen, config).await {
        // Another caller of a shared handle cut in; ask once more.
        Err(EngineError::Superseded(id)) => {
            tracing::warn!(index = position.index, request = id, "Analysis superseded, retrying once");
            engine.analyze(&position.fen, config).await
        }
        outcome => outcome,
    };

    match outcome {
        Ok(result) => {
            if result.timed_out {
                tracing::warn!(index = position.index, "Analysis timed out, using partial result");
            }
            Ok(PositionEval {
                eval_cp: result.eval_cp,
                best_move: Some(result.best_move_uci),
                pv: result.principal_variation,
            })
        }
        Err(EngineError::NoMoveFound) => {
            tracing::warn!(index = position.index, fen = %position.fen, "Engine found no move");
            Ok(PositionEval::default())
        }
        Err(e) => Err(e.into()),
    }
}
