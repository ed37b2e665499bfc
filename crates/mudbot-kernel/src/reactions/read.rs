use std::sync::Mutex;

use async_trait::async_trait;
use mudbot_core::{Action, DeterministicRng, ItemId, Outcome, SplitMix64};

use super::{lock, reaction_rng, Reaction};
use crate::config::ReadConfig;
use crate::controller::Controller;
use crate::personality::Personality;
use crate::world::{BotContext, WorldEvent};

/// Reading a message someone sent to the room. Only ever queued by [`ReadReaction`].
pub struct ReadAction;

impl ReadAction {
    pub const ID: &'static str = "read";
}

#[async_trait]
impl Action<BotContext> for ReadAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, _ctx: &BotContext) -> Vec<Outcome> {
        Vec::new()
    }

    async fn exec(&self, _ctx: BotContext, _outcome: Outcome) -> anyhow::Result<Option<String>> {
        Ok(Some("reading some text".to_string()))
    }
}

/// Spends the time it takes to read whenever someone else speaks in the room.
pub struct ReadReaction {
    config: ReadConfig,
    personality: Personality,
    controller: Controller<BotContext>,
    world: BotContext,
    rng: Mutex<SplitMix64>,
}

impl ReadReaction {
    pub const ID: &'static str = "read";

    pub fn new(
        config: ReadConfig,
        personality: Personality,
        controller: Controller<BotContext>,
        world: BotContext,
        seed: u64,
    ) -> Self {
        Self {
            config,
            personality,
            controller,
            world,
            rng: reaction_rng(seed, Self::ID),
        }
    }
}

impl Reaction for ReadReaction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn handle(&self, event: &WorldEvent) -> Option<ItemId> {
        if self.config.chance <= 0.0 {
            return None;
        }
        let WorldEvent::Spoke {
            from,
            room,
            kind,
            msg,
        } = event
        else {
            return None;
        };
        if !self.config.kinds.contains(kind) {
            return None;
        }

        let snapshot = self.world.snapshot();
        let ctrl = snapshot.controlled.as_ref()?;
        // Not reading own messages, nor those of other rooms.
        if from.id == ctrl.id || snapshot.room.as_ref().map(|r| &r.id) != Some(room) {
            return None;
        }
        if lock(&self.rng).next_f64_unit() >= self.config.chance {
            return None;
        }

        let outcome = Outcome::forced()
            .with_delay(self.personality.read_duration(msg))
            .with_priority(self.config.priority);
        self.controller.enqueue(ReadAction::ID, outcome)
    }
}
