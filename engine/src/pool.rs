use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::handle::{EngineHandle, HandleState};
use crate::process::Launcher;
use crate::{EngineConfig, EngineError, EngineSettings};

/// Reference-counted engine handles keyed by owner token.
///
/// Owners that share a token share one engine process. The process starts on
/// the first `acquire` and is disposed when the matching number of `release`
/// calls brings the count back to zero. The pool is an ordinary value; share it
/// with `Arc` and pass it to the components that need engines.
pub struct EnginePool<L: Launcher> {
    launcher: L,
    settings: EngineSettings,
    entries: Mutex<HashMap<String, PoolEntry>>,
}

struct PoolEntry {
    handle: EngineHandle,
    refs: usize,
}

impl<L: Launcher> EnginePool<L> {
    pub fn new(launcher: L, settings: EngineSettings) -> Self {
        Self {
            launcher,
            settings,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn shared(launcher: L, settings: EngineSettings) -> Arc<Self> {
        Arc::new(Self::new(launcher, settings))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Take a reference on `owner`'s engine, starting it if needed.
    ///
    /// The lock is held across startup so two concurrent acquires for the same
    /// token never start two processes. A failed start leaves no entry behind.
    pub async fn acquire(
        &self,
        owner: &str,
        config: &EngineConfig,
    ) -> Result<EngineHandle, EngineError> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get_mut(owner) {
            if entry.handle.state() != HandleState::Disposed {
                entry.refs += 1;
                tracing::debug!(owner, refs = entry.refs, "Reusing pooled engine");
                return Ok(entry.handle.clone());
            }
            tracing::warn!(owner, "Pooled engine exited, restarting");
        }

        let handle = EngineHandle::start(&self.launcher, owner, config, self.settings.clone())
            .await
            .inspect_err(|e| tracing::error!(owner, "Engine start failed: {}", e))?;

        // Carry references held on a crashed engine over to its replacement.
        let refs = entries.get(owner).map_or(0, |old| old.refs) + 1;
        entries.insert(
            owner.to_string(),
            PoolEntry {
                handle: handle.clone(),
                refs,
            },
        );
        tracing::info!(owner, refs, "Engine acquired");
        Ok(handle)
    }

    /// Drop a reference on `owner`'s engine. Returns true when this release
    /// disposed the process. Releasing an unknown token is a no-op.
    pub async fn release(&self, owner: &str) -> bool {
        let handle = {
            let mut entries = self.entries.lock().await;
            let Some(entry) = entries.get_mut(owner) else {
                tracing::warn!(owner, "Release for unknown engine owner");
                return false;
            };

            entry.refs -= 1;
            if entry.refs > 0 {
                tracing::debug!(owner, refs = entry.refs, "Engine released");
                return false;
            }

            match entries.remove(owner) {
                Some(entry) => entry.handle,
                None => return false,
            }
        };

        tracing::info!(owner, "Last reference released, disposing engine");
        handle.dispose().await;
        true
    }

    pub async fn ref_count(&self, owner: &str) -> usize {
        self.entries.lock().await.get(owner).map_or(0, |e| e.refs)
    }

    /// State of `owner`'s engine; `Uninitialized` when none is running.
    pub async fn state(&self, owner: &str) -> HandleState {
        self.entries
            .lock()
            .await
            .get(owner)
            .map_or(HandleState::Uninitialized, |e| e.handle.state())
    }

    /// Dispose every engine regardless of outstanding references.
    pub async fn shutdown_all(&self) {
        let drained: Vec<(String, PoolEntry)> = self.entries.lock().await.drain().collect();
        for (owner, entry) in drained {
            tracing::info!(owner = %owner, refs = entry.refs, "Disposing engine on shutdown");
            entry.handle.dispose().await;
        }
    }
}
