use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Child;
use tokio::sync::mpsc;

use crate::EngineError;

/// Line-oriented connection to a running engine.
///
/// Lines written to `commands` go to the engine's stdin (the newline is
/// appended by the writer); every stdout line arrives on `lines` already
/// trimmed. `lines` closes when the engine exits.
pub struct UciChannel {
    pub commands: mpsc::Sender<String>,
    pub lines: mpsc::Receiver<String>,
    pub process: Option<Child>,
}

/// Starts engine processes. Implemented by [`StockfishLauncher`] and, under the
/// `mock` feature, by an in-process scripted engine.
pub trait Launcher: Send + Sync + 'static {
    fn launch(&self) -> impl Future<Output = Result<UciChannel, EngineError>> + Send;
}

/// Launches a Stockfish binary as a child process.
#[derive(Debug, Clone, Default)]
pub struct StockfishLauncher {
    path: Option<PathBuf>,
}

impl StockfishLauncher {
    /// Locate Stockfish in common install paths on every launch.
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Use an explicit binary path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    fn resolve_path(&self) -> Option<PathBuf> {
        self.path.clone().or_else(find_stockfish_path)
    }
}

impl Launcher for StockfishLauncher {
    #[tracing::instrument(level = "info", skip(self))]
    async fn launch(&self) -> Result<UciChannel, EngineError> {
        let path = self
            .resolve_path()
            .ok_or_else(|| EngineError::Init("Stockfish not found".to_string()))?;
        tracing::info!("Found Stockfish at: {:?}", path);

        let mut process = tokio::process::Command::new(&path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                tracing::error!("Failed to spawn Stockfish: {}", e);
                EngineError::Init(format!("Failed to spawn {}: {}", path.display(), e))
            })?;

        let mut stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Init("Engine has no stdin".to_string()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Init("Engine has no stdout".to_string()))?;

        let (line_tx, line_rx) = mpsc::channel::<String>(256);
        let (command_tx, mut command_rx) = mpsc::channel::<String>(32);

        // Spawn output reader task
        tokio::spawn(async move {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();

            loop {
                line.clear();
                match reader.read_line(&mut line).await {
                    Ok(0) => {
                        tracing::warn!("Stockfish stdout EOF - engine closed");
                        break;
                    }
                    Ok(_) => {
                        let trimmed = line.trim();
                        tracing::trace!("UCI << {}", trimmed);
                        if line_tx.send(trimmed.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("Error reading from Stockfish stdout: {}", e);
                        break;
                    }
                }
            }
            tracing::debug!("Output reader task exiting");
        });

        // Spawn stdin writer task
        tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                tracing::trace!("UCI >> {}", cmd);
                if let Err(e) = stdin.write_all(format!("{}\n", cmd).as_bytes()).await {
                    tracing::error!("Failed to write to stdin: {}", e);
                    break;
                }
                if let Err(e) = stdin.flush().await {
                    tracing::error!("Failed to flush stdin: {}", e);
                    break;
                }
            }
            tracing::debug!("Stdin writer task exiting");
        });

        Ok(UciChannel {
            commands: command_tx,
            lines: line_rx,
            process: Some(process),
        })
    }
}

/// Find Stockfish executable in common locations
pub fn find_stockfish_path() -> Option<PathBuf> {
    let paths = [
        "/usr/local/bin/stockfish",
        "/usr/bin/stockfish",
        "/opt/homebrew/bin/stockfish",
        "/usr/games/stockfish",
    ];

    if let Some(found) = paths.iter().map(Path::new).find(|p| p.exists()) {
        return Some(found.to_path_buf());
    }

    // Fall back to PATH lookup
    std::env::var_os("PATH").and_then(|path| {
        std::env::split_paths(&path)
            .map(|dir| dir.join("stockfish"))
            .find(|candidate| candidate.is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_an_init_error() {
        let launcher = StockfishLauncher::with_path("/nonexistent/stockfish-binary");
        match launcher.launch().await {
            Err(EngineError::Init(msg)) => assert!(msg.contains("Failed to spawn")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("launch should fail"),
        }
    }
}
