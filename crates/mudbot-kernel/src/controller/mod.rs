//! Controller - the public handle and the async driver that owns the timing loop.

mod machine;

pub use machine::QueuedSummary;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use mudbot_core::{Action, Error, ItemId, Outcome};
use thiserror::Error as ThisError;
use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;

use crate::observability::ControllerEvent;
use machine::{ExecDone, Machine};

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Seed for the aggregator's draws.
    pub seed: u64,
    /// Buffered events per subscriber before lagging.
    pub event_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            event_capacity: 256,
        }
    }
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ControllerError {
    #[error("controller already started")]
    AlreadyStarted,

    #[error("controller disposed")]
    Disposed,
}

struct Shared<C>
where
    C: Clone + Send + Sync + 'static,
{
    machine: Mutex<Machine<C>>,
    wake: Notify,
    events: broadcast::Sender<ControllerEvent>,
    started: AtomicBool,
}

impl<C> Shared<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, Machine<C>> {
        // An action never runs under the lock, so a poisoned lock still holds a consistent machine.
        self.machine.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Picks, times and runs bot actions.
///
/// Cloning yields another handle to the same controller. Actions and collaborators hold a clone
/// to enqueue follow-up work.
pub struct Controller<C>
where
    C: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<C>>,
}

impl<C> Clone for Controller<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C> Controller<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(config: ControllerConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        let machine = Machine::new(config.seed, events.clone());

        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(machine),
                wake: Notify::new(),
                events,
                started: AtomicBool::new(false),
            }),
        }
    }

    /// Register an action. The queue is not refilled until the next context change or removal.
    pub fn add_action(&self, action: Arc<dyn Action<C>>) -> Result<(), Error> {
        self.shared.lock().register(action)
    }

    /// Unregister an action. Items already queued for it fail when their delay elapses.
    pub fn remove_action(&self, id: &str) {
        self.shared.lock().unregister(id);
    }

    /// Queue an outcome for the given action. Returns `None` once disposed.
    pub fn enqueue(&self, action_id: &str, outcome: Outcome) -> Option<ItemId> {
        let item = {
            let mut machine = self.shared.lock();
            if machine.is_disposed() {
                tracing::debug!(action = %action_id, "Ignoring enqueue on disposed controller");
                return None;
            }
            machine.enqueue(action_id, outcome, now())
        };
        self.shared.wake.notify_one();
        Some(item)
    }

    /// Spawn the driver task. Scheduling runs whenever `context` holds a value.
    pub fn start(
        &self,
        context: watch::Receiver<Option<C>>,
    ) -> Result<JoinHandle<()>, ControllerError> {
        if self.is_disposed() {
            return Err(ControllerError::Disposed);
        }
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(ControllerError::AlreadyStarted);
        }

        let (done_tx, done_rx) = mpsc::unbounded_channel();
        self.shared.lock().attach(done_tx);

        tracing::debug!("Starting controller");
        Ok(tokio::spawn(drive(
            Arc::clone(&self.shared),
            context,
            done_rx,
        )))
    }

    /// Stop everything: abort a running action, drop the queue and end the driver.
    pub fn dispose(&self) {
        self.shared.lock().dispose();
        self.shared.wake.notify_one();
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.lock().is_disposed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshot of the queue in execution order.
    pub fn queued(&self) -> Vec<QueuedSummary> {
        self.shared.lock().queued()
    }
}

enum Wake {
    Timer,
    Poke,
    Done(ExecDone),
    ContextChanged,
    ContextClosed,
}

fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn drive<C>(
    shared: Arc<Shared<C>>,
    mut context: watch::Receiver<Option<C>>,
    mut done_rx: mpsc::UnboundedReceiver<ExecDone>,
) where
    C: Clone + Send + Sync + 'static,
{
    let initial = context.borrow_and_update().clone();
    shared.lock().set_context(initial, now());

    let mut watching = true;
    loop {
        let deadline = {
            let mut machine = shared.lock();
            if machine.is_disposed() {
                break;
            }
            machine.run_due(now());
            machine.next_deadline()
        };

        let wake = tokio::select! {
            _ = sleep_until(deadline) => Wake::Timer,
            _ = shared.wake.notified() => Wake::Poke,
            Some(done) = done_rx.recv() => Wake::Done(done),
            changed = context.changed(), if watching => match changed {
                Ok(()) => Wake::ContextChanged,
                Err(_) => Wake::ContextClosed,
            },
        };

        match wake {
            // Due timers are fired at the top of the loop.
            Wake::Timer | Wake::Poke => {}
            Wake::Done(done) => shared.lock().finish(done, now()),
            Wake::ContextChanged => {
                let ctx = context.borrow_and_update().clone();
                shared.lock().set_context(ctx, now());
            }
            Wake::ContextClosed => {
                tracing::debug!("Context provider dropped, keeping last context");
                watching = false;
            }
        }
    }

    tracing::debug!("Controller driver stopped");
}
