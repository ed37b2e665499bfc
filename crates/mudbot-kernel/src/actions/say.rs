use std::sync::Mutex;

use anyhow::{bail, Context};
use async_trait::async_trait;
use mudbot_core::{Action, Outcome, SplitMix64};
use serde::{Deserialize, Serialize};

use super::{action_rng, lock, millis, typed_delay};
use crate::config::TalkConfig;
use crate::personality::Personality;
use crate::text;
use crate::world::BotContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SayPayload {
    pub char_id: String,
    pub msg: String,
}

/// Speaking out loud in a room that isn't quiet.
pub struct SayAction {
    config: TalkConfig,
    personality: Personality,
    rng: Mutex<SplitMix64>,
}

impl SayAction {
    pub const ID: &'static str = "say";

    pub fn new(config: TalkConfig, personality: Personality, seed: u64) -> Self {
        Self {
            config,
            personality,
            rng: action_rng(seed, Self::ID),
        }
    }
}

#[async_trait]
impl Action<BotContext> for SayAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        let snapshot = ctx.snapshot();
        let (Some(ctrl), Some(room)) = (snapshot.awake(), snapshot.room.as_ref()) else {
            return Vec::new();
        };
        if room.is_quiet {
            return Vec::new();
        }

        let weight = self.config.population_weight.weight_at(room.awake_population());
        if weight <= 0.0 {
            return Vec::new();
        }

        let message = text::compose(&mut *lock(&self.rng), &self.config.text);
        let delay = typed_delay(self.config.delay_ms, &self.personality, &message.text);
        vec![Outcome::new(weight)
            .with_delay(delay)
            .with_postdelay(millis(self.config.postdelay_ms))
            .with_payload(&SayPayload {
                char_id: ctrl.id.clone(),
                msg: message.text,
            })]
    }

    async fn exec(&self, ctx: BotContext, outcome: Outcome) -> anyhow::Result<Option<String>> {
        let payload: SayPayload = outcome.payload().context("invalid say payload")?;
        let ctrl = match ctx.snapshot().controlled {
            Some(c) if c.id == payload.char_id => c,
            _ => bail!("{} not controlled", payload.char_id),
        };
        ctx.say(&ctrl.id, &payload.msg).await?;
        Ok(Some(format!("{} spoke", ctrl.full_name())))
    }
}
