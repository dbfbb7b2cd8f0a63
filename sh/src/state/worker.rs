//! StateWorker - actor that owns the state map
//!
//! The map lives on a single task; everything else talks to it through
//! channels, so no lock ever guards it.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::StateConfig;
use super::messages::StateCommand;
use super::trace::trace_event;

/// Channels and task handle for one running worker
pub(crate) struct WorkerHandle<V> {
    pub(crate) id: u64,
    pub(crate) tx: mpsc::Sender<StateCommand<V>>,
    pub(crate) quit_tx: oneshot::Sender<()>,
    pub(crate) join: JoinHandle<()>,
}

impl<V> WorkerHandle<V> {
    /// Signal the worker to quit without waiting for it to exit
    ///
    /// Commands still queued behind the signal are dropped unanswered.
    pub(crate) fn quit(self) -> JoinHandle<()> {
        debug!(worker_id = self.id, "WorkerHandle::quit: called");
        if self.quit_tx.send(()).is_err() {
            debug!(worker_id = self.id, "WorkerHandle::quit: worker already gone");
        }
        self.join
    }
}

/// Spawn a worker with an empty map on fresh channels
pub(crate) fn spawn<V>(id: u64, config: &StateConfig) -> WorkerHandle<V>
where
    V: Clone + Send + 'static,
{
    debug!(worker_id = id, ?config, "spawn: called");
    let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
    let (quit_tx, quit_rx) = oneshot::channel();

    let join = match config.poll_interval() {
        Some(cycle) => tokio::spawn(poll_loop(id, rx, quit_rx, cycle)),
        None => tokio::spawn(actor_loop(id, rx, quit_rx)),
    };

    info!(worker_id = id, "StateWorker spawned");
    WorkerHandle { id, tx, quit_tx, join }
}

/// Suspend on the quit signal and the command channel, quit first
async fn actor_loop<V: Clone>(id: u64, mut rx: mpsc::Receiver<StateCommand<V>>, mut quit_rx: oneshot::Receiver<()>) {
    debug!(worker_id = id, "actor_loop: called");
    let mut state: HashMap<String, V> = HashMap::new();

    loop {
        tokio::select! {
            biased;

            _ = &mut quit_rx => {
                trace_event(id, "STOP");
                break;
            }

            cmd = rx.recv() => match cmd {
                Some(cmd) => apply(id, &mut state, cmd),
                None => {
                    debug!(worker_id = id, "actor_loop: all senders dropped");
                    break;
                }
            },
        }
    }

    info!(worker_id = id, keys = state.len(), "StateWorker stopped");
}

/// Check the quit signal and the command channel without suspending,
/// sleeping for `cycle` when neither has anything ready
async fn poll_loop<V: Clone>(
    id: u64,
    mut rx: mpsc::Receiver<StateCommand<V>>,
    mut quit_rx: oneshot::Receiver<()>,
    cycle: Duration,
) {
    debug!(worker_id = id, ?cycle, "poll_loop: called");
    let mut state: HashMap<String, V> = HashMap::new();

    loop {
        match quit_rx.try_recv() {
            Ok(()) | Err(oneshot::error::TryRecvError::Closed) => {
                trace_event(id, "STOP");
                break;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        match rx.try_recv() {
            Ok(cmd) => apply(id, &mut state, cmd),
            Err(mpsc::error::TryRecvError::Empty) => tokio::time::sleep(cycle).await,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                debug!(worker_id = id, "poll_loop: all senders dropped");
                break;
            }
        }
    }

    info!(worker_id = id, keys = state.len(), "StateWorker stopped");
}

/// Apply one command to the map
fn apply<V: Clone>(id: u64, state: &mut HashMap<String, V>, cmd: StateCommand<V>) {
    let label = cmd.label();
    match cmd {
        StateCommand::Read { key, reply } => {
            debug!(worker_id = id, %key, "apply: Read command");
            if reply.send(state.get(&key).cloned()).is_err() {
                warn!(worker_id = id, %key, "Reader dropped before reply");
            }
        }

        StateCommand::Write { key, value, reply } => {
            debug!(worker_id = id, %key, ack = reply.is_some(), "apply: Write command");
            state.insert(key.clone(), value.clone());
            if let Some(reply) = reply
                && reply.send(value).is_err()
            {
                warn!(worker_id = id, %key, "Writer dropped before reply");
            }
        }

        StateCommand::Reset => {
            debug!(worker_id = id, keys = state.len(), "apply: Reset command");
            *state = HashMap::new();
        }
    }
    trace_event(id, label);
}
