//! Priority queue of outcomes with a single pausable timer.
//!
//! The queue never reads a clock. Every operation that starts or stops time takes `now`, and the
//! caller is expected to fire [`PausableQueue::armed`] once its deadline passes. A zero-length
//! phase is armed with `deadline == now` so the caller can fire it without yielding.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Outcome};

/// Longest single phase the timer is armed for. Longer delays are cut short.
const MAX_PHASE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Identity of a queued item, unique for the lifetime of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Not executed yet; the timer counts down `delay`.
    Pending,
    /// Executed successfully; the timer counts down `postdelay`.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Delay,
    PostDelay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedItem {
    pub id: ItemId,
    pub action_id: String,
    pub outcome: Outcome,
    pub state: ItemState,
    /// Remaining delay before execution.
    pub delay: Duration,
    /// Remaining wait after execution.
    pub postdelay: Duration,
    pub priority: i32,
}

impl QueuedItem {
    pub fn phase(&self) -> Phase {
        match self.state {
            ItemState::Pending => Phase::Delay,
            ItemState::Done => Phase::PostDelay,
        }
    }

    /// Time left in the phase currently counting down.
    pub fn remaining(&self) -> Duration {
        match self.state {
            ItemState::Pending => self.delay,
            ItemState::Done => self.postdelay,
        }
    }

    fn remaining_mut(&mut self) -> &mut Duration {
        match self.state {
            ItemState::Pending => &mut self.delay,
            ItemState::Done => &mut self.postdelay,
        }
    }
}

/// The single outstanding timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Armed {
    pub item: ItemId,
    pub phase: Phase,
    pub started: Instant,
    pub deadline: Instant,
}

impl Armed {
    pub fn duration(&self) -> Duration {
        self.deadline.saturating_duration_since(self.started)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline <= now
    }
}

/// What a fired timer asks of the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Fired {
    /// The delay elapsed: run the action. The item stays at the head, marked executing, until
    /// [`PausableQueue::complete`] or [`PausableQueue::remove`] is called for it.
    Execute {
        item: ItemId,
        action_id: String,
        outcome: Outcome,
    },
    /// The post-delay elapsed and the item has been removed.
    Elapsed(QueuedItem),
}

#[derive(Debug, Default)]
pub struct PausableQueue {
    items: Vec<QueuedItem>,
    timer: Option<Armed>,
    executing: Option<ItemId>,
    next_id: u64,
}

impl PausableQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn head(&self) -> Option<&QueuedItem> {
        self.items.first()
    }

    pub fn get(&self, id: ItemId) -> Option<&QueuedItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedItem> {
        self.items.iter()
    }

    pub fn armed(&self) -> Option<Armed> {
        self.timer
    }

    /// Item whose action is currently running, if any.
    pub fn executing(&self) -> Option<ItemId> {
        self.executing
    }

    /// Index a new item of `priority` would be inserted at: right before the first item with a
    /// strictly lower priority, so equal priorities keep insertion order.
    pub fn insertion_index(&self, priority: i32) -> usize {
        self.items
            .iter()
            .position(|i| i.priority < priority)
            .unwrap_or(self.items.len())
    }

    pub fn enqueue(
        &mut self,
        action_id: impl Into<String>,
        outcome: Outcome,
        now: Instant,
    ) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;

        let item = QueuedItem {
            id,
            action_id: action_id.into(),
            state: ItemState::Pending,
            delay: outcome.delay,
            postdelay: outcome.postdelay,
            priority: outcome.priority,
            outcome,
        };

        let index = self.insertion_index(item.priority);
        if index == 0 {
            self.pause(now);
        }
        self.items.insert(index, item);
        if index == 0 {
            self.resume(now);
        }

        id
    }

    /// Stop the timer, keeping whatever is left of the phase it was counting.
    pub fn pause(&mut self, now: Instant) {
        let Some(timer) = self.timer.take() else {
            return;
        };

        let Some(item) = self.items.iter_mut().find(|i| i.id == timer.item) else {
            return;
        };

        let elapsed = now.saturating_duration_since(timer.started);
        let remaining = item.remaining_mut();
        *remaining = remaining.saturating_sub(elapsed);

        tracing::debug!(
            item = %item.id,
            action = %item.action_id,
            phase = ?item.phase(),
            remaining_ms = item.remaining().as_millis() as u64,
            "Pausing timer"
        );
    }

    /// Arm the timer for the head of the queue.
    ///
    /// Does nothing while a timer is armed, while an action is executing, or when the queue is
    /// empty. Returns the newly armed timer.
    pub fn resume(&mut self, now: Instant) -> Option<Armed> {
        if self.timer.is_some() || self.executing.is_some() {
            return None;
        }

        let head = self.items.first()?;
        let duration = head.remaining().min(MAX_PHASE);
        let armed = Armed {
            item: head.id,
            phase: head.phase(),
            started: now,
            deadline: now + duration,
        };

        if !duration.is_zero() {
            tracing::debug!(
                item = %head.id,
                action = %head.action_id,
                phase = ?armed.phase,
                duration_ms = duration.as_millis() as u64,
                "Arming timer"
            );
        }

        self.timer = Some(armed);
        Some(armed)
    }

    /// Restart the timer for whatever is at the head now. The timer's item keeps its elapsed time.
    pub fn rearm(&mut self, now: Instant) -> Option<Armed> {
        self.pause(now);
        self.resume(now)
    }

    /// Handle expiry of the timer armed for `id`.
    ///
    /// Fails with [`Error::StaleHead`], leaving the queue untouched, if `id` is not the head or
    /// its timer was already consumed.
    pub fn fire(&mut self, id: ItemId) -> Result<Fired, Error> {
        let head = self.items.first().map(|i| i.id);
        let timer = self.timer.map(|t| t.item);
        if head != Some(id) || timer != Some(id) {
            return Err(Error::StaleHead { fired: id, head });
        }

        self.timer = None;

        if self.items[0].state == ItemState::Done {
            return Ok(Fired::Elapsed(self.items.remove(0)));
        }

        let item = &mut self.items[0];
        // A consumed delay must not come back if the timer is re-armed later.
        item.delay = Duration::ZERO;
        self.executing = Some(id);

        Ok(Fired::Execute {
            item: id,
            action_id: item.action_id.clone(),
            outcome: item.outcome.clone(),
        })
    }

    /// Mark an executed item as done so its post-delay can be timed.
    ///
    /// Returns `false` if the item is no longer queued.
    pub fn complete(&mut self, id: ItemId) -> bool {
        if self.executing == Some(id) {
            self.executing = None;
        }

        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.state = ItemState::Done;
                true
            }
            None => false,
        }
    }

    /// Remove an item wherever it is. Its timer or executing mark goes with it.
    pub fn remove(&mut self, id: ItemId) -> Option<QueuedItem> {
        if self.timer.map(|t| t.item) == Some(id) {
            self.timer = None;
        }
        if self.executing == Some(id) {
            self.executing = None;
        }

        let index = self.items.iter().position(|i| i.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.timer = None;
        self.executing = None;
    }
}
