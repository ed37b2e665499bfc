use std::sync::Mutex;

use async_trait::async_trait;
use mudbot_core::{Action, Outcome, SplitMix64};

use super::{action_rng, lock, millis};
use crate::config::IdleConfig;
use crate::world::BotContext;

/// Doing nothing for a while. Only an awake character idles; asleep it would be lurking.
pub struct IdleAction {
    config: IdleConfig,
    rng: Mutex<SplitMix64>,
}

impl IdleAction {
    pub const ID: &'static str = "idle";

    pub fn new(config: IdleConfig, seed: u64) -> Self {
        Self {
            config,
            rng: action_rng(seed, Self::ID),
        }
    }
}

#[async_trait]
impl Action<BotContext> for IdleAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        if self.config.weight <= 0.0 || ctx.snapshot().awake().is_none() {
            return Vec::new();
        }

        let delay = self.config.spread.sample(
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
