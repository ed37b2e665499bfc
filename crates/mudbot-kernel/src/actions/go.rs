use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use mudbot_core::{Action, DeterministicRng, Outcome, SplitMix64};

use super::{action_rng, lock, millis};
use crate::config::GoConfig;
use crate::world::BotContext;

/// Leaving the room through a random exit.
pub struct GoAction {
    config: GoConfig,
    rng: Mutex<SplitMix64>,
}

impl GoAction {
    pub const ID: &'static str = "go";

    pub fn new(config: GoConfig, seed: u64) -> Self {
        Self {
            config,
            rng: action_rng(seed, Self::ID),
        }
    }
}

#[async_trait]
impl Action<BotContext> for GoAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        let snapshot = ctx.snapshot();
        let Some(room) = snapshot.room.as_ref().filter(|r| !r.exits.is_empty()) else {
            return Vec::new();
        };
        if snapshot.awake().is_none() {
            return Vec::new();
        }

        let weight = self.config.population_weight.weight_at(room.awake_population());
        if weight <= 0.0 {
            return Vec::new();
        }
        vec![Outcome::new(weight)
            .with_delay(millis(self.config.delay_ms))
            .with_postdelay(millis(self.config.postdelay_ms))]
    }

    async fn exec(&self, ctx: BotContext, _outcome: Outcome) -> anyhow::Result<Option<String>> {
        let snapshot = ctx.snapshot();
        let ctrl = snapshot
            .controlled
            .ok_or_else(|| anyhow!("char not controlled"))?;
        let Some(room) = snapshot.room else {
            bail!("{} is nowhere", ctrl.full_name());
        };
        if room.exits.is_empty() {
            bail!("room {} has no visible exits", room.name);
        }

        let index = lock(&self.rng).next_index(room.exits.len());
        let exit = &room.exits[index];
        ctx.use_exit(&ctrl.id, &exit.id).await?;
        Ok(Some(format!("{} used exit {}", ctrl.full_name(), exit.name())))
    }
}
