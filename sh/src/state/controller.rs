//! StateController - lifecycle and call surface over the state worker
//!
//! Owns the worker's channels, enforces that at most one worker runs at a
//! time, and turns the worker's message protocol into plain async calls.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, info};

use super::config::{StateConfig, WriteMode};
use super::messages::{Operation, StateCommand, StateError, StateResponse};
use super::worker::{self, WorkerHandle};

/// Running worker (if any) plus a counter used to tag each new worker
struct Lifecycle<V> {
    worker: Option<WorkerHandle<V>>,
    generation: u64,
}

/// Handle to start, stop and talk to a state worker
///
/// Cloning is cheap; clones share the same worker and lifecycle. Dropping
/// the last clone stops the worker.
pub struct StateController<V> {
    config: Arc<StateConfig>,
    lifecycle: Arc<Mutex<Lifecycle<V>>>,
}

impl<V> Clone for StateController<V> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }
}

impl<V> Default for StateController<V>
where
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new(StateConfig::default())
    }
}

impl<V> StateController<V>
where
    V: Clone + Send + 'static,
{
    /// Create a stopped controller
    pub fn new(config: StateConfig) -> Self {
        debug!(?config, "StateController::new: called");
        Self {
            config: Arc::new(config),
            lifecycle: Arc::new(Mutex::new(Lifecycle {
                worker: None,
                generation: 0,
            })),
        }
    }

    /// Configuration this controller was built with
    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    /// Whether a worker is currently running
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.worker.is_some()
    }

    /// Spawn a worker with an empty map
    pub async fn start(&self) -> StateResponse<()> {
        debug!("start: called");
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.worker.is_some() {
            debug!("start: already running");
            return Err(StateError::AlreadyRunning);
        }

        lifecycle.generation += 1;
        lifecycle.worker = Some(worker::spawn(lifecycle.generation, &self.config));
        info!(worker_id = lifecycle.generation, "State started");
        Ok(())
    }

    /// Signal the worker to quit
    ///
    /// Returns once the signal is sent; the worker task may still be winding
    /// down. Requests that have not been served yet resolve to
    /// [`StateError::Disconnected`].
    pub async fn stop(&self) -> StateResponse<()> {
        debug!("stop: called");
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(handle) = lifecycle.worker.take() else {
            debug!("stop: not running");
            return Err(StateError::NotRunning(Operation::Stop));
        };

        let id = handle.id;
        drop(handle.quit());
        info!(worker_id = id, "State stopped");
        Ok(())
    }

    /// Replace the running worker with a fresh one
    ///
    /// State is not carried over: the new worker starts empty.
    pub async fn restart(&self) -> StateResponse<()> {
        debug!("restart: called");
        let mut lifecycle = self.lifecycle.lock().await;
        let Some(handle) = lifecycle.worker.take() else {
            debug!("restart: not running");
            return Err(StateError::NotRunning(Operation::Restart));
        };

        let old_id = handle.id;
        drop(handle.quit());

        lifecycle.generation += 1;
        lifecycle.worker = Some(worker::spawn(lifecycle.generation, &self.config));
        info!(old_worker_id = old_id, worker_id = lifecycle.generation, "State restarted");
        Ok(())
    }

    /// Discard every stored key, keeping the current worker
    ///
    /// Queued behind any earlier request from the same caller, so a read
    /// issued after this returns never sees the cleared keys.
    pub async fn reset(&self) -> StateResponse<()> {
        debug!("reset: called");
        let tx = self.sender(Operation::Reset).await?;
        tx.send(StateCommand::Reset)
            .await
            .map_err(|_| StateError::Disconnected)
    }

    /// Store `value` under `key`
    ///
    /// With [`WriteMode::Ack`] this waits for the worker and returns the
    /// stored value. With [`WriteMode::FireAndForget`] it returns `None` as
    /// soon as the write is queued.
    pub async fn write(&self, key: impl Into<String>, value: V) -> StateResponse<Option<V>> {
        let key = key.into();
        debug!(%key, write_mode = ?self.config.write_mode, "write: called");
        let tx = self.sender(Operation::Write).await?;

        match self.config.write_mode {
            WriteMode::FireAndForget => {
                tx.send(StateCommand::Write { key, value, reply: None })
                    .await
                    .map_err(|_| StateError::Disconnected)?;
                Ok(None)
            }
            WriteMode::Ack => {
                let (reply_tx, reply_rx) = oneshot::channel();
                let cmd = StateCommand::Write {
                    key,
                    value,
                    reply: Some(reply_tx),
                };
                self.request(&tx, cmd, reply_rx).await.map(Some)
            }
        }
    }

    /// Look up `key`; `None` when it has never been written
    pub async fn read(&self, key: impl Into<String>) -> StateResponse<Option<V>> {
        let key = key.into();
        debug!(%key, "read: called");
        let tx = self.sender(Operation::Read).await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.request(&tx, StateCommand::Read { key, reply: reply_tx }, reply_rx)
            .await
    }

    /// Clone the running worker's command sender, or fail for `op`
    async fn sender(&self, op: Operation) -> StateResponse<mpsc::Sender<StateCommand<V>>> {
        let lifecycle = self.lifecycle.lock().await;
        match lifecycle.worker.as_ref() {
            Some(handle) => Ok(handle.tx.clone()),
            None => {
                debug!(%op, "sender: not running");
                Err(StateError::NotRunning(op))
            }
        }
    }

    /// Send a command and wait for its reply, bounded by the request timeout
    async fn request<T>(
        &self,
        tx: &mpsc::Sender<StateCommand<V>>,
        cmd: StateCommand<V>,
        reply_rx: oneshot::Receiver<T>,
    ) -> StateResponse<T> {
        let roundtrip = async {
            tx.send(cmd).await.map_err(|_| StateError::Disconnected)?;
            reply_rx.await.map_err(|_| StateError::Disconnected)
        };

        match self.config.request_timeout() {
            Some(limit) => tokio::time::timeout(limit, roundtrip)
                .await
                .map_err(|_| StateError::Timeout(limit.as_millis() as u64))?,
            None => roundtrip.await,
        }
    }
}
