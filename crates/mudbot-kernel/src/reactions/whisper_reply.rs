use std::sync::{Arc, Mutex};

use mudbot_core::{DeterministicRng, ItemId, SplitMix64};

use super::{lock, reaction_rng, Reaction};
use crate::actions::WhisperAction;
use crate::config::WhisperReplyConfig;
use crate::controller::Controller;
use crate::text;
use crate::world::{BotContext, WorldEvent};

/// Whispers back to whoever whispered to the controlled character.
pub struct WhisperReply {
    config: WhisperReplyConfig,
    controller: Controller<BotContext>,
    whisper: Arc<WhisperAction>,
    world: BotContext,
    rng: Mutex<SplitMix64>,
}

impl WhisperReply {
    pub const ID: &'static str = "whisper_reply";

    pub fn new(
        config: WhisperReplyConfig,
        controller: Controller<BotContext>,
        whisper: Arc<WhisperAction>,
        world: BotContext,
        seed: u64,
    ) -> Self {
        Self {
            config,
            controller,
            whisper,
            world,
            rng: reaction_rng(seed, Self::ID),
        }
    }
}

impl Reaction for WhisperReply {
    fn id(&self) -> &str {
        Self::ID
    }

    fn handle(&self, event: &WorldEvent) -> Option<ItemId> {
        if self.config.chance <= 0.0 {
            return None;
        }
        let WorldEvent::Whisper { from, to, .. } = event else {
            return None;
        };
        // Only whispers to the controlled character, and never its own.
        let controlled = self.world.snapshot().controlled?;
        if controlled.id != *to || from.id == controlled.id {
            return None;
        }

        let message = {
            let mut rng = lock(&self.rng);
            if rng.next_f64_unit() >= self.config.chance {
                return None;
            }
            text::compose(&mut *rng, &self.config.text)
        };

        tracing::debug!(target_char = %from.id, "Replying to whisper");
        let outcome = self
            .whisper
            .outcome_for(to, &from.id, message, self.config.priority);
        self.controller.enqueue(WhisperAction::ID, outcome)
    }
}
