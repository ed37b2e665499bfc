use std::sync::Mutex;

use async_trait::async_trait;
use mudbot_core::{Action, Outcome, SplitMix64, Spread};

use super::{action_rng, lock, millis};
use crate::config::LurkConfig;
use crate::world::BotContext;

/// Waiting around without controlling any character. With one it would be idling.
pub struct LurkAction {
    config: LurkConfig,
    rng: Mutex<SplitMix64>,
}

impl LurkAction {
    pub const ID: &'static str = "lurk";

    pub fn new(config: LurkConfig, seed: u64) -> Self {
        Self {
            config,
            rng: action_rng(seed, Self::ID),
        }
    }
}

#[async_trait]
impl Action<BotContext> for LurkAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        if self.config.weight <= 0.0 || ctx.snapshot().controlled.is_some() {
            return Vec::new();
        }

        let delay = Spread::Linear.sample(
            &mut *lock(&self.rng),
            self.config.delay_min_ms,
            self.config.delay_max_ms,
        );
        vec![Outcome::new(self.config.weight).with_delay(millis(delay))]
    }

    async fn exec(&self, _ctx: BotContext, _outcome: Outcome) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
