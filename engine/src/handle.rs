use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chess::fen::side_to_move;
use chess::{parse_fen, AnalysisScore};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Instant};

use crate::process::{Launcher, UciChannel};
use crate::uci::{parse_uci_message, EngineInfo, UciCommand, UciMessage};
use crate::{AnalysisResult, EngineConfig, EngineError, EngineSettings};

/// Lifecycle of an engine handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Ready,
    Busy,
    Disposed,
}

/// Cheap, cloneable handle to one engine process.
///
/// All requests funnel through a single driver task, so concurrent `analyze()`
/// calls are queued and never interleaved on the engine's input. A request that
/// is still running when a newer one arrives resolves with
/// [`EngineError::Superseded`]; its late `bestmove` is drained and discarded.
#[derive(Clone)]
pub struct EngineHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    label: String,
    requests: mpsc::Sender<DriverMessage>,
    state: watch::Receiver<HandleState>,
    next_request_id: AtomicU64,
}

enum DriverMessage {
    Analyze(AnalyzeRequest),
    Shutdown(oneshot::Sender<()>),
}

struct AnalyzeRequest {
    id: u64,
    fen: String,
    config: EngineConfig,
    reply: oneshot::Sender<Result<AnalysisResult, EngineError>>,
}

impl EngineHandle {
    /// Launch an engine, complete the readiness handshake, and apply `config`.
    ///
    /// On failure the process (if any) is dropped and nothing is retained.
    #[tracing::instrument(level = "info", skip(launcher, config, settings))]
    pub async fn start<L: Launcher>(
        launcher: &L,
        label: &str,
        config: &EngineConfig,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        tracing::info!("Starting engine (config: {:?})", config);
        let mut channel = launcher.launch().await?;

        handshake(&mut channel, config, &settings).await?;
        tracing::info!("Engine ready");

        let (request_tx, request_rx) = mpsc::channel(32);
        let (state_tx, state_rx) = watch::channel(HandleState::Ready);

        let driver = Driver {
            label: label.to_string(),
            channel,
            requests: request_rx,
            state: state_tx,
            applied: config.clone(),
            settings,
            stale_searches: 0,
        };
        tokio::spawn(driver.run());

        Ok(Self {
            inner: Arc::new(HandleInner {
                label: label.to_string(),
                requests: request_tx,
                state: state_rx,
                next_request_id: AtomicU64::new(0),
            }),
        })
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn state(&self) -> HandleState {
        *self.inner.state.borrow()
    }

    /// Analyze `fen` and resolve with the engine's best move.
    ///
    /// Resolves exactly once: with the terminal `bestmove`, with the best move
    /// seen so far when the time budget runs out, or with an error.
    pub async fn analyze(
        &self,
        fen: &str,
        config: &EngineConfig,
    ) -> Result<AnalysisResult, EngineError> {
        parse_fen(fen)?;
        let id = self.inner.next_request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (reply, rx) = oneshot::channel();

        tracing::debug!(engine = %self.inner.label, request = id, "Queueing analysis");
        self.inner
            .requests
            .send(DriverMessage::Analyze(AnalyzeRequest {
                id,
                fen: fen.to_string(),
                config: config.clone(),
                reply,
            }))
            .await
            .map_err(|_| EngineError::Disposed)?;

        rx.await.map_err(|_| EngineError::Disposed)?
    }

    /// Quit the engine process. Safe to call more than once.
    pub async fn dispose(&self) {
        let (ack, done) = oneshot::channel();
        if self
            .inner
            .requests
            .send(DriverMessage::Shutdown(ack))
            .await
            .is_ok()
        {
            let _ = done.await;
        }
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("label", &self.inner.label)
            .field("state", &self.state())
            .finish()
    }
}

async fn send_line(channel: &UciChannel, cmd: UciCommand) -> Result<(), EngineError> {
    channel
        .commands
        .send(cmd.to_line())
        .await
        .map_err(|_| EngineError::Terminated("engine input closed".to_string()))
}

/// Read lines until `expected` arrives or the handshake budget runs out.
async fn wait_for(
    channel: &mut UciChannel,
    expected: UciMessage,
    settings: &EngineSettings,
) -> Result<(), EngineError> {
    let wait = time::timeout(settings.handshake_timeout, async {
        while let Some(line) = channel.lines.recv().await {
            if parse_uci_message(&line).ok().as_ref() == Some(&expected) {
                return Ok(());
            }
        }
        Err(EngineError::Init(
            "Engine closed before completing handshake".to_string(),
        ))
    })
    .await;

    match wait {
        Ok(result) => result,
        Err(_) => Err(EngineError::Init(format!(
            "Timeout waiting for {:?}",
            expected
        ))),
    }
}

async fn handshake(
    channel: &mut UciChannel,
    config: &EngineConfig,
    settings: &EngineSettings,
) -> Result<(), EngineError> {
    let init_err = |e: EngineError| EngineError::Init(e.to_string());

    send_line(channel, UciCommand::Uci).await.map_err(init_err)?;
    wait_for(channel, UciMessage::UciOk, settings).await?;

    for cmd in config.option_commands() {
        send_line(channel, cmd).await.map_err(init_err)?;
    }

    send_line(channel, UciCommand::IsReady).await.map_err(init_err)?;
    wait_for(channel, UciMessage::ReadyOk, settings).await
}

/// Owns the engine channel and processes requests one at a time.
struct Driver {
    label: String,
    channel: UciChannel,
    requests: mpsc::Receiver<DriverMessage>,
    state: watch::Sender<HandleState>,
    applied: EngineConfig,
    settings: EngineSettings,
    /// Searches that were stopped but whose `bestmove` has not been read yet.
    stale_searches: usize,
}

enum SearchOutcome {
    Done,
    Superseded(AnalyzeRequest),
    Shutdown(Option<oneshot::Sender<()>>),
    EngineGone,
}

/// Accumulates progress lines for the request in flight.
#[derive(Default)]
struct SearchProgress {
    score: Option<AnalysisScore>,
    pv: Vec<String>,
    depth: Option<u32>,
}

impl SearchProgress {
    fn update(&mut self, info: EngineInfo) {
        // Only the main line feeds the result when MultiPV > 1.
        if info.multipv.is_some_and(|n| n != 1) {
            return;
        }
        if info.score.is_some() {
            self.score = info.score;
        }
        if info.depth.is_some() {
            self.depth = info.depth;
        }
        if !info.pv.is_empty() {
            self.pv = info.pv;
        }
    }

    fn into_result(
        self,
        request: &AnalyzeRequest,
        best_move: Option<String>,
        timed_out: bool,
    ) -> Result<AnalysisResult, EngineError> {
        let best_move_uci = best_move
            .or_else(|| self.pv.first().cloned())
            .ok_or(EngineError::NoMoveFound)?;

        let eval_cp = match (self.score, side_to_move(&request.fen)) {
            (Some(score), Ok(side)) => Some(score.white_cp(side)),
            _ => None,
        };

        Ok(AnalysisResult {
            request_id: request.id,
            fen: request.fen.clone(),
            best_move_uci,
            score: self.score,
            eval_cp,
            principal_variation: self.pv,
            depth: self.depth,
            timed_out,
        })
    }
}

impl Driver {
    async fn run(mut self) {
        tracing::debug!(engine = %self.label, "Engine driver started");
        let mut queued: Option<AnalyzeRequest> = None;

        loop {
            let request = match queued.take() {
                Some(request) => request,
                None => match self.requests.recv().await {
                    Some(DriverMessage::Analyze(request)) => request,
                    Some(DriverMessage::Shutdown(ack)) => {
                        self.shutdown(Some(ack)).await;
                        return;
                    }
                    None => {
                        self.shutdown(None).await;
                        return;
                    }
                },
            };

            self.state.send_replace(HandleState::Busy);
            match self.search(request).await {
                SearchOutcome::Done => {}
                SearchOutcome::Superseded(next) => queued = Some(next),
                SearchOutcome::Shutdown(ack) => {
                    self.shutdown(ack).await;
                    return;
                }
                SearchOutcome::EngineGone => {
                    tracing::error!(engine = %self.label, "Engine output closed");
                    self.fail_pending(EngineError::Terminated("engine exited".to_string()));
                    self.state.send_replace(HandleState::Disposed);
                    return;
                }
            }

            if queued.is_none() {
                self.state.send_replace(HandleState::Ready);
            }
        }
    }

    async fn search(&mut self, request: AnalyzeRequest) -> SearchOutcome {
        if !self.drain_stale().await {
            let _ = request
                .reply
                .send(Err(EngineError::Terminated("engine exited".to_string())));
            return SearchOutcome::EngineGone;
        }

        if let Err(e) = self.apply_config(&request.config).await {
            let _ = request.reply.send(Err(e));
            return SearchOutcome::EngineGone;
        }

        tracing::debug!(engine = %self.label, request = request.id, fen = %request.fen, "Starting search");
        let commands = [
            UciCommand::Position {
                fen: request.fen.clone(),
            },
            UciCommand::Go(request.config.go_params()),
        ];
        for cmd in commands {
            if let Err(e) = send_line(&self.channel, cmd).await {
                let _ = request.reply.send(Err(e));
                return SearchOutcome::EngineGone;
            }
        }

        let deadline = Instant::now() + self.settings.analysis_timeout(&request.config);
        let mut progress = SearchProgress::default();

        loop {
            tokio::select! {
                biased;

                msg = self.requests.recv() => {
                    match msg {
                        Some(DriverMessage::Analyze(next)) => {
                            tracing::debug!(
                                engine = %self.label,
                                request = request.id,
                                superseded_by = next.id,
                                "Superseding in-flight search"
                            );
                            let _ = request.reply.send(Err(EngineError::Superseded(request.id)));
                            self.stop_search().await;
                            return SearchOutcome::Superseded(next);
                        }
                        Some(DriverMessage::Shutdown(ack)) => {
                            let _ = request.reply.send(Err(EngineError::Disposed));
                            return SearchOutcome::Shutdown(Some(ack));
                        }
                        None => {
                            let _ = request.reply.send(Err(EngineError::Disposed));
                            return SearchOutcome::Shutdown(None);
                        }
                    }
                }

                line = self.channel.lines.recv() => {
                    let Some(line) = line else {
                        let _ = request.reply.send(Err(EngineError::Terminated("engine exited".to_string())));
                        return SearchOutcome::EngineGone;
                    };
                    match parse_uci_message(&line) {
                        // Output still owed by a stopped search precedes ours.
                        Ok(UciMessage::BestMove { .. }) if self.stale_searches > 0 => {
                            self.stale_searches -= 1;
                            tracing::debug!(engine = %self.label, request = request.id, "Discarded late bestmove from a stopped search");
                        }
                        Ok(UciMessage::Info(_)) if self.stale_searches > 0 => {}
                        Ok(UciMessage::Info(info)) => progress.update(info),
                        Ok(UciMessage::BestMove { mv, .. }) => {
                            let result = match mv {
                                Some(mv) => progress.into_result(&request, Some(mv), false),
                                None => Err(EngineError::NoMoveFound),
                            };
                            tracing::debug!(engine = %self.label, request = request.id, ok = result.is_ok(), "Search complete");
                            let _ = request.reply.send(result);
                            return SearchOutcome::Done;
                        }
                        Ok(_) => {}
                        Err(e) => tracing::trace!("Ignoring engine line: {}", e),
                    }
                }

                _ = time::sleep_until(deadline) => {
                    tracing::warn!(engine = %self.label, request = request.id, "Analysis timed out");
                    self.stop_search().await;
                    let result = progress.into_result(&request, None, true);
                    let _ = request.reply.send(result);
                    return SearchOutcome::Done;
                }
            }
        }
    }

    async fn stop_search(&mut self) {
        if send_line(&self.channel, UciCommand::Stop).await.is_ok() {
            self.stale_searches += 1;
        }
    }

    /// Consume `bestmove` lines owed by stopped searches. Returns false if the
    /// engine exited. Searches still owing a `bestmove` when the wait runs out
    /// stay counted, so `search` drops their output when it finally arrives.
    async fn drain_stale(&mut self) -> bool {
        if self.stale_searches == 0 {
            return true;
        }

        let deadline = Instant::now() + self.settings.drain_timeout;
        while self.stale_searches > 0 {
            match time::timeout_at(deadline, self.channel.lines.recv()).await {
                Ok(Some(line)) => {
                    if matches!(parse_uci_message(&line), Ok(UciMessage::BestMove { .. })) {
                        self.stale_searches -= 1;
                        tracing::trace!(engine = %self.label, "Discarded stale bestmove");
                    }
                }
                Ok(None) => return false,
                Err(_) => {
                    tracing::warn!(
                        engine = %self.label,
                        pending = self.stale_searches,
                        "Stopped search has not reported bestmove yet"
                    );
                    return true;
                }
            }
        }
        true
    }

    async fn apply_config(&mut self, config: &EngineConfig) -> Result<(), EngineError> {
        if !config.options_differ(&self.applied) {
            return Ok(());
        }

        tracing::debug!(engine = %self.label, "Reconfiguring engine: {:?}", config);
        for cmd in config.option_commands() {
            send_line(&self.channel, cmd).await?;
        }
        send_line(&self.channel, UciCommand::IsReady).await?;
        match wait_for(&mut self.channel, UciMessage::ReadyOk, &self.settings).await {
            Ok(()) => {}
            Err(e) => tracing::warn!(engine = %self.label, "Reconfigure handshake failed: {}", e),
        }
        self.applied = config.clone();
        Ok(())
    }

    fn fail_pending(&mut self, error: EngineError) {
        while let Ok(msg) = self.requests.try_recv() {
            match msg {
                DriverMessage::Analyze(request) => {
                    let _ = request.reply.send(Err(error.clone()));
                }
                DriverMessage::Shutdown(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    async fn shutdown(&mut self, ack: Option<oneshot::Sender<()>>) {
        tracing::info!(engine = %self.label, "Shutting down engine");
        let _ = send_line(&self.channel, UciCommand::Quit).await;

        if let Some(mut process) = self.channel.process.take() {
            let waited =
                time::timeout(std::time::Duration::from_secs(1), process.wait()).await;
            if waited.is_err() {
                let _ = process.kill().await;
            }
        }

        self.state.send_replace(HandleState::Disposed);
        self.requests.close();
        self.fail_pending(EngineError::Disposed);
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }
}
