//! Scripted in-process UCI engine for tests.
//!
//! Speaks enough of the protocol for the handle driver: `uci`, `isready`,
//! `setoption`, `position fen`, `go`, `stop`, `quit`. A search emits one `info`
//! line right away and `bestmove` after `think_time`, or immediately on `stop`
//! unless [`MockBehavior::honor_stop`] is off.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chess::AnalysisScore;
use tokio::sync::{mpsc, oneshot};

use crate::process::{Launcher, UciChannel};
use crate::EngineError;

/// Canned reply for one position.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub best_move: String,
    /// Relative to the side to move, as a real engine reports it.
    pub score: AnalysisScore,
    pub pv: Vec<String>,
}

/// How the mock engine behaves.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    /// Replies keyed by exact FEN; other positions get their first legal move.
    pub replies: HashMap<String, MockReply>,
    pub default_score: AnalysisScore,
    pub think_time: Duration,
    /// When false, `go` is acknowledged with nothing until `stop`.
    pub respond_to_go: bool,
    /// When false, searches emit no `info` lines.
    pub emit_info: bool,
    /// When false, `uci` never gets `uciok`.
    pub complete_handshake: bool,
    /// When false, `stop` is ignored and every search runs its full `think_time`.
    pub honor_stop: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            default_score: AnalysisScore::Centipawns(20),
            think_time: Duration::from_millis(50),
            respond_to_go: true,
            emit_info: true,
            complete_handshake: true,
            honor_stop: true,
        }
    }
}

impl MockBehavior {
    pub fn with_reply(mut self, fen: &str, best_move: &str, score: AnalysisScore) -> Self {
        self.replies.insert(
            fen.to_string(),
            MockReply {
                best_move: best_move.to_string(),
                score,
                pv: vec![best_move.to_string()],
            },
        );
        self
    }

    pub fn with_line(mut self, fen: &str, pv: &[&str], score: AnalysisScore) -> Self {
        let pv: Vec<String> = pv.iter().map(|m| m.to_string()).collect();
        self.replies.insert(
            fen.to_string(),
            MockReply {
                best_move: pv.first().cloned().unwrap_or_default(),
                score,
                pv,
            },
        );
        self
    }

    fn reply_for(&self, fen: &str) -> Option<MockReply> {
        if let Some(reply) = self.replies.get(fen) {
            return Some(reply.clone());
        }
        let mut legal = chess::rules::legal_uci_moves(fen).ok()?;
        legal.sort();
        let best = legal.into_iter().next()?;
        Some(MockReply {
            best_move: best.clone(),
            score: self.default_score,
            pv: vec![best],
        })
    }
}

/// Counters shared between a [`MockLauncher`] and the engines it starts.
#[derive(Debug, Default)]
pub struct MockStats {
    pub launches: AtomicUsize,
    pub quits: AtomicUsize,
    pub searches: AtomicUsize,
    commands: Mutex<Vec<String>>,
}

impl MockStats {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Every command line received, across all launched engines.
    pub fn commands(&self) -> Vec<String> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn record(&self, line: &str) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(line.to_string());
        }
    }
}

/// Launcher that starts [`MockBehavior`]-scripted engines.
#[derive(Debug, Clone, Default)]
pub struct MockLauncher {
    behavior: MockBehavior,
    stats: Arc<MockStats>,
}

impl MockLauncher {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }
}

impl Launcher for MockLauncher {
    async fn launch(&self) -> Result<UciChannel, EngineError> {
        self.stats.launches.fetch_add(1, Ordering::SeqCst);

        let (command_tx, command_rx) = mpsc::channel::<String>(32);
        let (line_tx, line_rx) = mpsc::channel::<String>(256);
        tokio::spawn(run_mock_engine(
            self.behavior.clone(),
            Arc::clone(&self.stats),
            command_rx,
            line_tx,
        ));

        Ok(UciChannel {
            commands: command_tx,
            lines: line_rx,
            process: None,
        })
    }
}

async fn run_mock_engine(
    behavior: MockBehavior,
    stats: Arc<MockStats>,
    mut commands: mpsc::Receiver<String>,
    lines: mpsc::Sender<String>,
) {
    let mut fen = chess::START_FEN.to_string();
    let mut search: Option<oneshot::Sender<()>> = None;

    while let Some(command) = commands.recv().await {
        stats.record(&command);
        let mut tokens = command.split_whitespace();

        match tokens.next() {
            Some("uci") if behavior.complete_handshake => {
                let _ = lines.send("id name MockFish".to_string()).await;
                let _ = lines.send("uciok".to_string()).await;
            }
            Some("isready") => {
                let _ = lines.send("readyok".to_string()).await;
            }
            Some("position") => {
                if let Some(rest) = command.strip_prefix("position fen ") {
                    fen = rest.trim().to_string();
                }
            }
            Some("go") => {
                stats.searches.fetch_add(1, Ordering::SeqCst);
                let (stop_tx, stop_rx) = oneshot::channel();
                search = Some(stop_tx);
                tokio::spawn(run_search(
                    behavior.clone(),
                    behavior.reply_for(&fen),
                    stop_rx,
                    lines.clone(),
                ));
            }
            Some("stop") => {
                if let Some(stop) = search.take() {
                    let _ = stop.send(());
                }
            }
            Some("quit") => {
                stats.quits.fetch_add(1, Ordering::SeqCst);
                break;
            }
            _ => {}
        }
    }
}

async fn run_search(
    behavior: MockBehavior,
    reply: Option<MockReply>,
    stop: oneshot::Receiver<()>,
    lines: mpsc::Sender<String>,
) {
    if behavior.emit_info {
        if let Some(reply) = &reply {
            let score = match reply.score {
                AnalysisScore::Centipawns(cp) => format!("cp {}", cp),
                AnalysisScore::Mate(m) => format!("mate {}", m),
            };
            let _ = lines
                .send(format!(
                    "info depth 10 score {} nodes 1000 pv {}",
                    score,
                    reply.pv.join(" ")
                ))
                .await;
        }
    }

    if behavior.respond_to_go && !behavior.honor_stop {
        tokio::time::sleep(behavior.think_time).await;
    } else if behavior.respond_to_go {
        tokio::select! {
            _ = tokio::time::sleep(behavior.think_time) => {}
            _ = stop => {}
        }
    } else {
        let _ = stop.await;
    }

    let best = reply.map_or_else(|| "(none)".to_string(), |r| r.best_move);
    let _ = lines.send(format!("bestmove {}", best)).await;
}
