//! Drives a [`ReviewBoard`] with live engine evaluations.
//!
//! Board operations run synchronously under the lock. Evaluations are spawned
//! as tasks that re-take the lock when the engine answers and apply the result
//! only if its generation is still current, so a late answer for an abandoned
//! branch position is dropped.

use std::sync::Arc;

use engine::{EngineConfig, EngineError, EngineHandle};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::board::ReviewBoard;
use crate::classify::MoveClass;
use crate::error::ReviewError;
use crate::exploration::EvalRequest;

/// Read-only view of the board for presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub index: usize,
    pub last_index: usize,
    pub fen: String,
    pub classification: MoveClass,
    pub exploring: bool,
    pub branch_moves: Vec<String>,
    pub eval_cp: Option<i32>,
    pub best_move: Option<String>,
    pub is_evaluating: bool,
}

impl BoardSnapshot {
    pub fn of(board: &ReviewBoard) -> Self {
        let exploration = board.exploration();
        Self {
            index: board.current_index(),
            last_index: board.last_index(),
            fen: board.displayed_fen(),
            classification: board.current_classification(),
            exploring: exploration.is_active(),
            branch_moves: exploration.branch_moves().to_vec(),
            eval_cp: board.displayed_eval(),
            best_move: if exploration.is_active() {
                exploration.live_best_move().map(str::to_string)
            } else {
                board.next_move().and_then(|m| m.suggestion()).map(str::to_string)
            },
            is_evaluating: exploration.is_evaluating(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Start,
    End,
    Previous,
    Next,
    Move(usize),
}

pub struct ExplorationController {
    board: Arc<Mutex<ReviewBoard>>,
    engine: EngineHandle,
    config: EngineConfig,
    snapshots: Arc<watch::Sender<BoardSnapshot>>,
}

impl ExplorationController {
    pub fn new(board: ReviewBoard, engine: EngineHandle, config: EngineConfig) -> Self {
        let (snapshots, _) = watch::channel(BoardSnapshot::of(&board));
        Self {
            board: Arc::new(Mutex::new(board)),
            engine,
            config,
            snapshots: Arc::new(snapshots),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<BoardSnapshot> {
        self.snapshots.subscribe()
    }

    pub async fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot::of(&*self.board.lock().await)
    }

    /// Play a board move and start evaluating the new branch tip. The task
    /// resolves to whether its result was applied.
    pub async fn submit_move(&self, uci: &str) -> Result<JoinHandle<bool>, ReviewError> {
        let request = {
            let mut board = self.board.lock().await;
            let request = board.submit_move(uci)?;
            self.publish(&board);
            request
        };
        Ok(self.spawn_evaluation(request))
    }

    pub async fn undo(&self) -> Result<JoinHandle<bool>, ReviewError> {
        let request = {
            let mut board = self.board.lock().await;
            let request = board.undo_branch_move()?;
            self.publish(&board);
            request
        };
        Ok(self.spawn_evaluation(request))
    }

    pub async fn return_to_game(&self) -> usize {
        let mut board = self.board.lock().await;
        let index = board.return_to_game();
        self.publish(&board);
        index
    }

    pub async fn navigate(&self, to: Navigation) -> usize {
        let mut board = self.board.lock().await;
        let index = match to {
            Navigation::Start => board.go_to_start(),
            Navigation::End => board.go_to_end(),
            Navigation::Previous => board.previous(),
            Navigation::Next => board.next(),
            Navigation::Move(k) => board.go_to_move(k),
        };
        self.publish(&board);
        index
    }

    fn publish(&self, board: &ReviewBoard) {
        self.snapshots.send_replace(BoardSnapshot::of(board));
    }

    fn spawn_evaluation(&self, request: EvalRequest) -> JoinHandle<bool> {
        let board = Arc::clone(&self.board);
        let snapshots = Arc::clone(&self.snapshots);
        let engine = self.engine.clone();
        let config = self.config.clone();

        tokio::spawn(async move {
            let result = engine.analyze(&request.fen, &config).await;
            let mut board = board.lock().await;
            let applied = match result {
                Ok(analysis) => board.apply_evaluation(
                    request.generation,
                    analysis.eval_cp,
                    Some(analysis.best_move_uci),
                ),
                Err(EngineError::Superseded(id)) => {
                    tracing::trace!(request = id, "Evaluation superseded");
                    false
                }
                Err(e) => {
                    tracing::warn!(generation = request.generation, "Branch evaluation failed: {}", e);
                    board.evaluation_failed(request.generation)
                }
            };
            if applied {
                snapshots.send_replace(BoardSnapshot::of(&board));
            }
            applied
        })
    }
}
