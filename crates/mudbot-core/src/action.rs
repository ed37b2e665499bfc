use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::{Error, Outcome};

/// A behavior the bot may perform.
///
/// `C` is the context handed to the bot by its host (the controlled character, a world handle,
/// ...). The scheduler never looks inside it.
#[async_trait]
pub trait Action<C>: Send + Sync + 'static
where
    C: Send + Sync + 'static,
{
    fn id(&self) -> &str;

    /// Zero or more candidate outcomes for the current context.
    ///
    /// Must not mutate the scheduler; it is called while the queue is being refilled.
    fn outcomes(&self, ctx: &C) -> Vec<Outcome>;

    /// Perform a previously selected outcome.
    ///
    /// `Ok(Some(msg))` is logged as a description of what happened. Any error is
    /// logged and the queued item is dropped.
    async fn exec(&self, ctx: C, outcome: Outcome) -> anyhow::Result<Option<String>>;
}

pub type ExecFuture = BoxFuture<'static, anyhow::Result<Option<String>>>;

type OutcomesFn<C> = Box<dyn Fn(&C) -> Vec<Outcome> + Send + Sync>;
type ExecFn<C> = Box<dyn Fn(C, Outcome) -> ExecFuture + Send + Sync>;

/// An [`Action`] assembled from closures.
pub struct FnAction<C> {
    id: String,
    outcomes_fn: OutcomesFn<C>,
    exec_fn: ExecFn<C>,
}

impl<C> FnAction<C>
where
    C: Send + Sync + 'static,
{
    pub fn new(
        id: impl Into<String>,
        outcomes_fn: impl Fn(&C) -> Vec<Outcome> + Send + Sync + 'static,
        exec_fn: impl Fn(C, Outcome) -> ExecFuture + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            outcomes_fn: Box::new(outcomes_fn),
            exec_fn: Box::new(exec_fn),
        }
    }
}

#[async_trait]
impl<C> Action<C> for FnAction<C>
where
    C: Send + Sync + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn outcomes(&self, ctx: &C) -> Vec<Outcome> {
        (self.outcomes_fn)(ctx)
    }

    async fn exec(&self, ctx: C, outcome: Outcome) -> anyhow::Result<Option<String>> {
        (self.exec_fn)(ctx, outcome).await
    }
}

/// Registered actions, kept in registration order.
///
/// Order only matters for tie resolution when accumulating weights, but it is stable so that a
/// seeded draw is reproducible.
pub struct ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    actions: Vec<Arc<dyn Action<C>>>,
}

impl<C> ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    pub fn register(&mut self, action: Arc<dyn Action<C>>) -> Result<(), Error> {
        if self.contains(action.id()) {
            return Err(Error::DuplicateAction(action.id().to_string()));
        }
        self.actions.push(action);
        Ok(())
    }

    /// Remove an action. Unknown ids are ignored.
    pub fn unregister(&mut self, id: &str) -> Option<Arc<dyn Action<C>>> {
        let index = self.actions.iter().position(|a| a.id() == id)?;
        Some(self.actions.remove(index))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Action<C>>> {
        self.actions.iter().find(|a| a.id() == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.iter().any(|a| a.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action<C>>> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl<C> Default for ActionRegistry<C>
where
    C: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
