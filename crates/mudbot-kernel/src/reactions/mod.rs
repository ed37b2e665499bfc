//! Reactions - enqueue actions in response to world events instead of waiting to be drawn.

mod greet;
mod read;
mod whisper_reply;

pub use greet::{Greet, Greeting};
pub use read::{ReadAction, ReadReaction};
pub use whisper_reply::WhisperReply;

use std::sync::{Arc, Mutex, MutexGuard};

use mudbot_core::rng::{derive_seed, stream_id};
use mudbot_core::{ItemId, SplitMix64};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::controller::Controller;
use crate::world::{BotContext, WorldEvent};

pub trait Reaction: Send + Sync + 'static {
    fn id(&self) -> &str;

    /// React to one event. Returns the queued item, if any.
    fn handle(&self, event: &WorldEvent) -> Option<ItemId>;
}

/// Feed world events to `reaction` until the world goes away or the controller is disposed.
pub fn spawn(
    reaction: Arc<dyn Reaction>,
    world: &BotContext,
    controller: Controller<BotContext>,
) -> JoinHandle<()> {
    let mut events = world.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if controller.is_disposed() {
                        break;
                    }
                    reaction.handle(&event);
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(reaction = %reaction.id(), missed, "Reaction fell behind on world events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn reaction_rng(seed: u64, id: &str) -> Mutex<SplitMix64> {
    Mutex::new(SplitMix64::new(derive_seed(seed, stream_id(id))))
}

fn lock(rng: &Mutex<SplitMix64>) -> MutexGuard<'_, SplitMix64> {
    rng.lock().unwrap_or_else(|e| e.into_inner())
}
