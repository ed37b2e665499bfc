//! Context provider - tells the controller when there is something to control.

use std::sync::Arc;

use tokio::sync::watch;

/// Publishes the bot's context to the controller.
///
/// `None` means no context is available (not logged in, no character). Setting a context wakes
/// the controller, which refills an empty queue from the registered actions. Clones publish to
/// the same subscribers.
#[derive(Debug)]
pub struct ContextProvider<C> {
    tx: Arc<watch::Sender<Option<C>>>,
}

impl<C> Clone for ContextProvider<C> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<C> ContextProvider<C>
where
    C: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new or changed context.
    pub fn set(&self, ctx: C) {
        self.tx.send_replace(Some(ctx));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<C> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<C>> {
        self.tx.subscribe()
    }
}

impl<C> Default for ContextProvider<C>
where
    C: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
