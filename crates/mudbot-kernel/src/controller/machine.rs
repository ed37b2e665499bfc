//! Execution state machine - moves queued items through delay, execution and post-delay.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use mudbot_core::{
    Action, ActionRegistry, Aggregator, Armed, Error, Fired, ItemId, ItemState, Outcome,
    PausableQueue, SplitMix64,
};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::observability::{ControllerEvent, EventKind};

/// Result of an action's executor, sent back to the driver.
pub(crate) struct ExecDone {
    pub item: ItemId,
    pub result: anyhow::Result<Option<String>>,
}

struct InFlight {
    item: ItemId,
    action_id: String,
    task: JoinHandle<()>,
}

/// Read-only view of a queued item.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedSummary {
    pub item: ItemId,
    pub action_id: String,
    pub state: ItemState,
    pub priority: i32,
    pub remaining: Duration,
    pub executing: bool,
}

pub(crate) struct Machine<C>
where
    C: Clone + Send + Sync + 'static,
{
    registry: ActionRegistry<C>,
    queue: PausableQueue,
    aggregator: Aggregator<SplitMix64>,
    context: Option<C>,
    in_flight: Option<InFlight>,
    done_tx: Option<mpsc::UnboundedSender<ExecDone>>,
    events: broadcast::Sender<ControllerEvent>,
    disposed: bool,
}

impl<C> Machine<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new(seed: u64, events: broadcast::Sender<ControllerEvent>) -> Self {
        Self {
            registry: ActionRegistry::new(),
            queue: PausableQueue::new(),
            aggregator: Aggregator::new(SplitMix64::new(seed)),
            context: None,
            in_flight: None,
            done_tx: None,
            events,
            disposed: false,
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn attach(&mut self, done_tx: mpsc::UnboundedSender<ExecDone>) {
        self.done_tx = Some(done_tx);
    }

    pub fn register(&mut self, action: Arc<dyn Action<C>>) -> Result<(), Error> {
        let id = action.id().to_string();
        self.registry.register(action)?;
        tracing::debug!(action = %id, "Registered action");
        Ok(())
    }

    pub fn unregister(&mut self, id: &str) {
        if self.registry.unregister(id).is_some() {
            tracing::debug!(action = %id, "Unregistered action");
        }
    }

    pub fn queued(&self) -> Vec<QueuedSummary> {
        let executing = self.queue.executing();
        self.queue
            .iter()
            .map(|i| QueuedSummary {
                item: i.id,
                action_id: i.action_id.clone(),
                state: i.state,
                priority: i.priority,
                remaining: i.remaining(),
                executing: executing == Some(i.id),
            })
            .collect()
    }

    pub fn enqueue(&mut self, action_id: &str, outcome: Outcome, now: Instant) -> ItemId {
        let priority = outcome.priority;
        let item = self.queue.enqueue(action_id, outcome, now);
        let position = self.queue.iter().position(|i| i.id == item).unwrap_or(0);

        tracing::debug!(item = %item, action = %action_id, priority, position, "Queued action");
        self.emit(EventKind::Queued {
            item: item.get(),
            action: action_id.to_string(),
            priority,
            position,
        });

        item
    }

    /// Replace the context. Whenever a context is present and the queue is empty, the queue is
    /// refilled from the registered actions.
    pub fn set_context(&mut self, ctx: Option<C>, now: Instant) {
        match (self.context.is_some(), ctx.is_some()) {
            (false, true) => tracing::debug!("Context available"),
            (true, false) => tracing::debug!("Context lost"),
            _ => {}
        }

        self.context = ctx;
        if self.context.is_some() {
            self.refill(now);
        }
    }

    /// Deadline of the armed timer, if it should be waited on.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.disposed || self.context.is_none() {
            return None;
        }
        self.queue.armed().map(|a| a.deadline)
    }

    /// Fire every timer that is due at `now`, including zero-length phases armed along the way.
    pub fn run_due(&mut self, now: Instant) {
        while let Some(armed) = self.due(now) {
            if let Err(err) = self.on_timeout(armed.item, now) {
                tracing::error!(error = %err, "Unexpected action first in queue");
                // A timer left due would be fired again at once.
                self.queue.rearm(now);
                return;
            }
        }
    }

    fn due(&self, now: Instant) -> Option<Armed> {
        self.next_deadline()?;
        self.queue.armed().filter(|a| a.is_due(now))
    }

    fn on_timeout(&mut self, item: ItemId, now: Instant) -> Result<(), Error> {
        match self.queue.fire(item)? {
            Fired::Execute {
                item,
                action_id,
                outcome,
            } => self.execute(item, action_id, outcome, now),
            Fired::Elapsed(done) => {
                tracing::debug!(item = %done.id, action = %done.action_id, "Post-delay elapsed");
                self.emit(EventKind::Completed {
                    item: done.id.get(),
                    action: done.action_id,
                });
                self.advance(now);
            }
        }
        Ok(())
    }

    fn execute(&mut self, item: ItemId, action_id: String, outcome: Outcome, now: Instant) {
        let Some(action) = self.registry.get(&action_id) else {
            let err = Error::UnknownAction(action_id.clone());
            self.fail(item, &action_id, &err, now);
            return;
        };

        let (Some(ctx), Some(done_tx)) = (self.context.clone(), self.done_tx.clone()) else {
            let err = Error::Execution {
                action: action_id.clone(),
                source: anyhow::anyhow!("controller has no context"),
            };
            self.fail(item, &action_id, &err, now);
            return;
        };

        tracing::debug!(item = %item, action = %action_id, "Executing action");
        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(action.exec(ctx, outcome))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("action panicked")),
            };
            let _ = done_tx.send(ExecDone { item, result });
        });

        self.in_flight = Some(InFlight {
            item,
            action_id,
            task,
        });
    }

    /// Handle the executor result for the in-flight item.
    pub fn finish(&mut self, done: ExecDone, now: Instant) {
        let in_flight = match self.in_flight.take() {
            Some(f) if f.item == done.item => f,
            other => {
                self.in_flight = other;
                tracing::warn!(item = %done.item, "Ignoring result of an action no longer in flight");
                return;
            }
        };

        match done.result {
            Ok(message) => {
                match &message {
                    Some(msg) => tracing::info!(action = %in_flight.action_id, "{}", msg),
                    None => tracing::debug!(action = %in_flight.action_id, "Action executed"),
                }
                self.emit(EventKind::Executed {
                    item: done.item.get(),
                    action: in_flight.action_id,
                    message,
                });
                self.queue.complete(done.item);
                self.advance(now);
            }
            Err(source) => {
                let err = Error::Execution {
                    action: in_flight.action_id.clone(),
                    source,
                };
                self.fail(done.item, &in_flight.action_id, &err, now);
            }
        }
    }

    fn fail(&mut self, item: ItemId, action_id: &str, err: &Error, now: Instant) {
        tracing::warn!(item = %item, action = %action_id, error = %err, "Action failed");
        self.emit(EventKind::Failed {
            item: item.get(),
            action: action_id.to_string(),
            error: err.to_string(),
        });
        self.queue.remove(item);
        self.advance(now);
    }

    /// Re-arm for the head of the queue, refilling it first if it ran dry.
    fn advance(&mut self, now: Instant) {
        self.queue.resume(now);
        if self.queue.is_empty() {
            self.refill(now);
        }
    }

    fn refill(&mut self, now: Instant) {
        if self.disposed || !self.queue.is_empty() {
            return;
        }
        let Some(ctx) = self.context.as_ref() else {
            return;
        };

        match self.aggregator.select_next(&self.registry, ctx) {
            Some(selection) => {
                tracing::debug!(
                    action = %selection.action_id,
                    weight = selection.outcome.weight,
                    total_weight = self.aggregator.last_total_weight(),
                    "Selected next action"
                );
                self.enqueue(&selection.action_id, selection.outcome, now);
            }
            None => {
                tracing::info!("No actions to perform. Idling.");
                self.emit(EventKind::Idle);
            }
        }
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;

        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(item = %in_flight.item, action = %in_flight.action_id, "Aborting action");
            in_flight.task.abort();
        }
        self.queue.clear();
        self.context = None;
        self.done_tx = None;

        tracing::info!("Controller disposed");
        self.emit(EventKind::Disposed);
    }

    fn emit(&self, kind: EventKind) {
        // No subscribers is fine.
        let _ = self.events.send(ControllerEvent::now(kind));
    }
}
