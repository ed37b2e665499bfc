use std::sync::{Arc, Mutex};

use mudbot_core::{DeterministicRng, ItemId, SplitMix64};

use super::{lock, reaction_rng, Reaction};
use crate::actions::PoseAction;
use crate::config::GreetConfig;
use crate::controller::Controller;
use crate::text;
use crate::world::{BotContext, WorldEvent};

/// Which arrivals are greeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    /// Someone else entered the controlled character's room.
    Arrival,
    /// The controlled character entered a room.
    Travel,
}

impl Greeting {
    pub fn reaction_id(self) -> &'static str {
        match self {
            Greeting::Arrival => "arrive_welcome",
            Greeting::Travel => "travel_greet",
        }
    }
}

/// Poses a greeting on arrival, more likely in emptier rooms.
pub struct Greet {
    greeting: Greeting,
    config: GreetConfig,
    controller: Controller<BotContext>,
    pose: Arc<PoseAction>,
    world: BotContext,
    rng: Mutex<SplitMix64>,
}

impl Greet {
    pub fn new(
        greeting: Greeting,
        config: GreetConfig,
        controller: Controller<BotContext>,
        pose: Arc<PoseAction>,
        world: BotContext,
        seed: u64,
    ) -> Self {
        Self {
            greeting,
            config,
            controller,
            pose,
            world,
            rng: reaction_rng(seed, greeting.reaction_id()),
        }
    }
}

impl Reaction for Greet {
    fn id(&self) -> &str {
        self.greeting.reaction_id()
    }

    fn handle(&self, event: &WorldEvent) -> Option<ItemId> {
        if self.config.population_chance.is_empty() {
            return None;
        }
        let WorldEvent::Arrived { char, room } = event else {
            return None;
        };

        let snapshot = self.world.snapshot();
        let ctrl = snapshot.awake()?;
        let current = snapshot.room.as_ref().filter(|r| r.id == *room)?;
        let own = char.id == ctrl.id;
        match self.greeting {
            Greeting::Arrival if own => return None,
            Greeting::Travel if !own => return None,
            _ => {}
        }

        let chance = self
            .config
            .population_chance
            .weight_at(current.awake_population());
        let msg = {
            let mut rng = lock(&self.rng);
            if rng.next_f64_unit() >= chance {
                return None;
            }
            text::compose(&mut *rng, &self.config.text).text
        };
        let msg = match self.greeting {
            Greeting::Arrival => text::replace_tags(&msg, char),
            Greeting::Travel => msg,
        };

        tracing::debug!(reaction = %self.id(), char = %char.id, "Greeting");
        let outcome = self.pose.outcome_for(
            &ctrl.id,
            msg,
            self.config.priority,
            self.config.delay_ms,
            self.config.postdelay_ms,
        );
        self.controller.enqueue(PoseAction::ID, outcome)
    }
}
