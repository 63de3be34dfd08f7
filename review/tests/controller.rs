use std::time::Duration;

use chess::{rules, AnalysisScore, START_FEN};
use engine::mock::{MockBehavior, MockLauncher};
use engine::{EngineConfig, EngineHandle, EngineSettings};
use review::{
    analyze_game, AnalyzeOptions, ExplorationController, GameRecord, Navigation, NoBook,
    ReviewBoard, ReviewError,
};

fn settings() -> EngineSettings {
    EngineSettings {
        handshake_timeout: Duration::from_millis(200),
        timeout_grace: Duration::from_millis(500),
        depth_only_timeout: Duration::from_secs(2),
        drain_timeout: Duration::from_millis(500),
    }
}

fn config() -> EngineConfig {
    EngineConfig::default().with_move_time(100)
}

/// A controller over a reviewed `1. e4 e5`, sharing one mock engine.
async fn controller(behavior: MockBehavior) -> ExplorationController {
    let launcher = MockLauncher::new(behavior);
    let engine = EngineHandle::start(&launcher, "explore", &config(), settings())
        .await
        .expect("mock engine starts");

    let game = GameRecord::new("game-1", START_FEN, vec!["e2e4".into(), "e7e5".into()]);
    let options = AnalyzeOptions {
        config: config(),
        ..Default::default()
    };
    let review = analyze_game(&engine, &game, &options, &NoBook, None)
        .await
        .unwrap();

    ExplorationController::new(ReviewBoard::new(review).unwrap(), engine, config())
}

fn after(moves: &[&str]) -> String {
    moves.iter().fold(START_FEN.to_string(), |fen, uci| {
        rules::apply_move(&fen, uci).unwrap()
    })
}

#[tokio::test]
async fn branch_evaluation_reaches_the_snapshot() {
    let behavior = MockBehavior::default().with_reply(
        &after(&["d2d4"]),
        "d7d5",
        AnalysisScore::Centipawns(-15),
    );
    let controller = controller(behavior).await;
    let mut updates = controller.subscribe();
    assert_eq!(controller.snapshot().await.eval_cp, Some(20));

    let pending = controller.submit_move("d2d4").await.unwrap();
    let snapshot = controller.snapshot().await;
    assert!(snapshot.exploring);
    assert!(snapshot.is_evaluating);
    assert_eq!(snapshot.eval_cp, None);
    assert_eq!(snapshot.index, 0);
    assert_eq!(snapshot.fen, after(&["d2d4"]));

    assert!(pending.await.unwrap());
    updates.changed().await.unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert!(!snapshot.is_evaluating);
    assert_eq!(snapshot.eval_cp, Some(15));
    assert_eq!(snapshot.best_move.as_deref(), Some("d7d5"));
    assert_eq!(snapshot.branch_moves, vec!["d2d4".to_string()]);
}

#[tokio::test]
async fn newer_branch_move_wins() {
    let behavior = MockBehavior {
        think_time: Duration::from_millis(200),
        ..Default::default()
    }
    .with_reply(&after(&["d2d4", "d7d5"]), "c2c4", AnalysisScore::Centipawns(30));
    let controller = controller(behavior).await;

    let first = controller.submit_move("d2d4").await.unwrap();
    let second = controller.submit_move("d7d5").await.unwrap();

    assert!(!first.await.unwrap());
    assert!(second.await.unwrap());

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.branch_moves, vec!["d2d4".to_string(), "d7d5".to_string()]);
    assert_eq!(snapshot.eval_cp, Some(30));
    assert_eq!(snapshot.best_move.as_deref(), Some("c2c4"));
}

#[tokio::test]
async fn returning_to_game_drops_the_pending_evaluation() {
    let behavior = MockBehavior {
        think_time: Duration::from_millis(100),
        ..Default::default()
    };
    let controller = controller(behavior).await;
    controller.navigate(Navigation::Next).await;
    let main_line = controller.snapshot().await;

    let pending = controller.submit_move("c7c5").await.unwrap();
    assert_eq!(controller.return_to_game().await, 1);

    assert!(!pending.await.unwrap());
    let snapshot = controller.snapshot().await;
    assert!(!snapshot.exploring);
    assert_eq!(snapshot, main_line);
}

#[tokio::test]
async fn undo_evaluates_the_new_tip() {
    let behavior = MockBehavior::default().with_reply(
        &after(&["g1f3"]),
        "g8f6",
        AnalysisScore::Centipawns(-5),
    );
    let controller = controller(behavior).await;

    controller.submit_move("g1f3").await.unwrap();
    controller.submit_move("d7d5").await.unwrap();
    let undone = controller.undo().await.unwrap();

    assert!(undone.await.unwrap());
    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.branch_moves, vec!["g1f3".to_string()]);
    assert_eq!(snapshot.fen, after(&["g1f3"]));
    assert_eq!(snapshot.eval_cp, Some(5));
}

#[tokio::test]
async fn rejected_input_changes_nothing() {
    let controller = controller(MockBehavior::default()).await;
    let before = controller.snapshot().await;

    assert!(matches!(
        controller.submit_move("e2e5").await,
        Err(ReviewError::IllegalMove { .. })
    ));
    assert!(matches!(
        controller.undo().await,
        Err(ReviewError::NotExploring)
    ));
    assert_eq!(controller.snapshot().await, before);
}

#[tokio::test]
async fn navigation_leaves_exploration() {
    let controller = controller(MockBehavior::default()).await;

    let pending = controller.submit_move("d2d4").await.unwrap();
    assert_eq!(controller.navigate(Navigation::End).await, 2);
    assert!(!pending.await.unwrap());

    let snapshot = controller.snapshot().await;
    assert!(!snapshot.exploring);
    assert_eq!(snapshot.index, 2);
    assert_eq!(snapshot.last_index, 2);
    assert_eq!(snapshot.fen, after(&["e2e4", "e7e5"]));

    assert_eq!(controller.navigate(Navigation::Move(1)).await, 1);
    assert_eq!(controller.navigate(Navigation::Previous).await, 0);
    assert_eq!(controller.navigate(Navigation::Start).await, 0);
}
