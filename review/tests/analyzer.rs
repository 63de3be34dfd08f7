use std::time::Duration;

use chess::{AnalysisScore, PieceColor, PositionLedger, START_FEN};
use engine::mock::{MockBehavior, MockLauncher};
use engine::{EngineConfig, EngineError, EngineHandle, EngineSettings};
use review::{
    analyze_game, AnalysisProgress, AnalyzeOptions, FirstPlies, GameRecord, MoveClass, NoBook,
    ReviewError,
};
use tokio::sync::mpsc;

const SCHOLARS_MATE: [&str; 7] = ["e2e4", "e7e5", "f1c4", "b8c6", "d1h5", "g8f6", "h5f7"];
const BISHOP_ON_C4: &str = "rnbqkbnr/pppp1ppp/8/4p3/2B1P3/8/PPPP1PPP/RNBQK1NR w KQkq - 0 1";

fn fast_settings() -> EngineSettings {
    EngineSettings {
        handshake_timeout: Duration::from_millis(200),
        timeout_grace: Duration::from_millis(100),
        depth_only_timeout: Duration::from_millis(500),
        drain_timeout: Duration::from_millis(200),
    }
}

fn options() -> AnalyzeOptions {
    AnalyzeOptions {
        config: EngineConfig::default().with_move_time(50),
        ..Default::default()
    }
}

async fn start(behavior: MockBehavior) -> (EngineHandle, MockLauncher) {
    let launcher = MockLauncher::new(behavior);
    let handle = EngineHandle::start(&launcher, "review-test", &EngineConfig::default(), fast_settings())
        .await
        .expect("mock engine starts");
    (handle, launcher)
}

fn record(start_fen: &str, moves: &[&str]) -> GameRecord {
    GameRecord::new("game-1", start_fen, moves.iter().map(|m| m.to_string()).collect())
}

fn fen_at(start_fen: &str, moves: &[&str], index: usize) -> String {
    PositionLedger::from_moves(start_fen, moves.iter())
        .unwrap()
        .position_at(index)
        .unwrap()
        .fen
}

/// Level everywhere, except that 3...Nf6 walks into mate.
fn scholars_mate_engine() -> MockBehavior {
    MockBehavior {
        default_score: AnalysisScore::Centipawns(0),
        ..Default::default()
    }
    .with_reply(&fen_at(START_FEN, &SCHOLARS_MATE, 5), "g7g6", AnalysisScore::Centipawns(0))
    .with_reply(&fen_at(START_FEN, &SCHOLARS_MATE, 6), "h5f7", AnalysisScore::Mate(1))
}

#[tokio::test]
async fn scholars_mate_is_reviewed_end_to_end() {
    let (handle, launcher) = start(scholars_mate_engine()).await;
    let game = record(START_FEN, &SCHOLARS_MATE);

    let review = analyze_game(&handle, &game, &options(), &NoBook, None)
        .await
        .unwrap();

    assert_eq!(review.id, "game-1");
    assert_eq!(review.len(), 7);
    // The final position is checkmate and never reaches the engine.
    assert_eq!(launcher.stats().searches(), 7);

    for (ply, mv) in review.moves.iter().enumerate() {
        assert_eq!(mv.ply_index, ply);
        assert_eq!(mv.uci, SCHOLARS_MATE[ply]);
        assert_eq!(mv.color, PieceColor::for_ply_index(ply));
        assert_eq!(mv.fen_before, fen_at(START_FEN, &SCHOLARS_MATE, ply));
    }
    for mv in &review.moves[..5] {
        assert_eq!(mv.classification, MoveClass::Best, "ply {}", mv.ply_index);
    }

    let blunder = &review.moves[5];
    assert_eq!(blunder.san, "Nf6");
    assert_eq!(blunder.eval_before_cp, Some(0));
    assert_eq!(blunder.eval_after_cp, Some(9900));
    assert_eq!(blunder.best_move_uci.as_deref(), Some("g7g6"));
    assert_eq!(blunder.best_move_san.as_deref(), Some("g6"));
    assert_eq!(blunder.classification, MoveClass::Blunder);

    let mate = &review.moves[6];
    assert_eq!(mate.san, "Qxf7#");
    assert_eq!(mate.eval_after_cp, Some(10000));
    assert!(mate.played_best());
    assert_eq!(mate.classification, MoveClass::Best);

    assert_eq!(review.player_color, PieceColor::White);
    assert_eq!(review.player_summary.counts.get(MoveClass::Best), 4);
    assert_eq!(review.opponent_summary.counts.get(MoveClass::Blunder), 1);
    assert!(review.player_summary.accuracy > review.opponent_summary.accuracy);
    assert_eq!(review.puzzle_worthy_moves(PieceColor::Black).count(), 1);
    assert_eq!(review.analysis_depth, None);
}

#[tokio::test]
async fn book_plies_override_classification() {
    let (handle, _launcher) = start(scholars_mate_engine()).await;
    let game = record(START_FEN, &SCHOLARS_MATE);

    let review = analyze_game(&handle, &game, &options(), &FirstPlies(4), None)
        .await
        .unwrap();

    let classes: Vec<MoveClass> = review.moves.iter().map(|m| m.classification).collect();
    assert_eq!(&classes[..4], &[MoveClass::Book; 4]);
    assert_eq!(classes[5], MoveClass::Blunder);
    // Book moves keep their evaluations but stay out of the summaries.
    assert_eq!(review.moves[0].eval_before_cp, Some(0));
    assert_eq!(review.player_summary.counts.get(MoveClass::Book), 2);
    assert_eq!(review.player_summary.counts.get(MoveClass::Best), 2);
}

#[tokio::test]
async fn progress_is_reported_per_position() {
    let (handle, _launcher) = start(scholars_mate_engine()).await;
    let game = record(START_FEN, &SCHOLARS_MATE);
    let (tx, mut rx) = mpsc::channel(16);

    analyze_game(&handle, &game, &options(), &NoBook, Some(&tx))
        .await
        .unwrap();
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    let expected: Vec<AnalysisProgress> = (1..=8)
        .map(|evaluated| AnalysisProgress { evaluated, total: 8 })
        .collect();
    assert_eq!(events, expected);
}

#[tokio::test]
async fn engine_matching_sacrifice_is_brilliant() {
    let before_sacrifice = fen_at(BISHOP_ON_C4, &["c4f7"], 0);
    let after_sacrifice = fen_at(BISHOP_ON_C4, &["c4f7"], 1);
    let behavior = MockBehavior::default()
        .with_reply(&before_sacrifice, "c4f7", AnalysisScore::Centipawns(50))
        .with_reply(&after_sacrifice, "e8f7", AnalysisScore::Centipawns(-50));
    let (handle, _launcher) = start(behavior).await;
    let game = record(BISHOP_ON_C4, &["c4f7"]);

    let review = analyze_game(&handle, &game, &options(), &NoBook, None)
        .await
        .unwrap();
    assert_eq!(review.moves[0].classification, MoveClass::Brilliant);

    let plain = AnalyzeOptions {
        detect_brilliant: false,
        ..options()
    };
    let review = analyze_game(&handle, &game, &plain, &NoBook, None)
        .await
        .unwrap();
    assert_eq!(review.moves[0].classification, MoveClass::Best);
}

#[tokio::test]
async fn depth_bound_analysis_records_depth() {
    let (handle, _launcher) = start(MockBehavior::default()).await;
    let game = record(START_FEN, &["e2e4"]);
    let options = AnalyzeOptions {
        config: EngineConfig::default().with_depth(12),
        player_color: PieceColor::Black,
        ..Default::default()
    };

    let review = analyze_game(&handle, &game, &options, &NoBook, None)
        .await
        .unwrap();
    assert_eq!(review.analysis_depth, Some(12));
    assert_eq!(review.player_color, PieceColor::Black);
    // Default mock scores are +20 for whoever moves, so 1.e4 swings 40cp.
    assert_eq!(review.moves[0].eval_before_cp, Some(20));
    assert_eq!(review.moves[0].eval_after_cp, Some(-20));
    assert_eq!(review.moves[0].classification, MoveClass::Inaccuracy);
    assert_eq!(review.opponent_summary.counts.get(MoveClass::Inaccuracy), 1);
}

#[tokio::test]
async fn illegal_game_is_rejected_before_any_search() {
    let (handle, launcher) = start(MockBehavior::default()).await;
    let game = record(START_FEN, &["e2e4", "e7e4"]);

    let err = analyze_game(&handle, &game, &options(), &NoBook, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::Ledger(_)));
    assert_eq!(launcher.stats().searches(), 0);
}

#[tokio::test]
async fn silent_engine_leaves_moves_unclassified() {
    let behavior = MockBehavior {
        respond_to_go: false,
        emit_info: false,
        ..Default::default()
    };
    let (handle, _launcher) = start(behavior).await;
    let game = record(START_FEN, &["e2e4"]);

    let review = analyze_game(&handle, &game, &options(), &NoBook, None)
        .await
        .unwrap();
    let mv = &review.moves[0];
    assert_eq!(mv.eval_before_cp, None);
    assert_eq!(mv.best_move_uci, None);
    assert_eq!(mv.classification, MoveClass::None);
    assert_eq!(review.player_summary.accuracy, 100.0);
}

#[tokio::test]
async fn position_cut_in_by_another_caller_is_asked_again() {
    let behavior = MockBehavior {
        think_time: Duration::from_millis(200),
        ..Default::default()
    };
    let (handle, launcher) = start(behavior).await;
    let game = record(START_FEN, &["e2e4"]);
    let options = AnalyzeOptions {
        config: EngineConfig::default().with_move_time(400),
        ..Default::default()
    };

    let other_caller = {
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle
                .analyze(BISHOP_ON_C4, &EngineConfig::default().with_move_time(400))
                .await
        })
    };

    let review = analyze_game(&handle, &game, &options, &NoBook, None)
        .await
        .unwrap();
    let other = other_caller.await.unwrap();

    assert!(matches!(other, Err(EngineError::Superseded(_))));
    assert_eq!(review.moves[0].eval_before_cp, Some(20));
    assert_eq!(review.moves[0].eval_after_cp, Some(-20));
    // Start position twice, the other caller's position once, then after 1.e4.
    assert_eq!(launcher.stats().searches(), 4);
}

#[tokio::test]
async fn disposed_engine_aborts_analysis() {
    let (handle, _launcher) = start(MockBehavior::default()).await;
    handle.dispose().await;

    let err = analyze_game(&handle, &record(START_FEN, &["e2e4"]), &options(), &NoBook, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::Engine(EngineError::Disposed)));
}
