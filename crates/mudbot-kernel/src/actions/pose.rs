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
pub struct PosePayload {
    pub char_id: String,
    pub msg: String,
}

/// Posing in a room with other characters.
pub struct PoseAction {
    config: TalkConfig,
    personality: Personality,
    rng: Mutex<SplitMix64>,
}

impl PoseAction {
    pub const ID: &'static str = "pose";

    pub fn new(config: TalkConfig, personality: Personality, seed: u64) -> Self {
        Self {
            config,
            personality,
            rng: action_rng(seed, Self::ID),
        }
    }

    /// An outcome posing `msg`, for enqueueing outside of aggregation.
    ///
    /// `delay_ms` and `postdelay_ms` replace the configured ones when given.
    pub fn outcome_for(
        &self,
        char_id: &str,
        msg: String,
        priority: i32,
        delay_ms: Option<u64>,
        postdelay_ms: Option<u64>,
    ) -> Outcome {
        let delay_ms = delay_ms.unwrap_or(self.config.delay_ms);
        let postdelay_ms = postdelay_ms.unwrap_or(self.config.postdelay_ms);
        self.build(char_id, msg, 0.0, delay_ms, postdelay_ms)
            .with_priority(priority)
    }

    fn build(
        &self,
        char_id: &str,
        msg: String,
        weight: f64,
        delay_ms: u64,
        postdelay_ms: u64,
    ) -> Outcome {
        Outcome::new(weight)
            .with_delay(typed_delay(delay_ms, &self.personality, &msg))
            .with_postdelay(millis(postdelay_ms))
            .with_payload(&PosePayload {
                char_id: char_id.to_string(),
                msg,
            })
    }
}

#[async_trait]
impl Action<BotContext> for PoseAction {
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

        // Everything is posed, so a leading ':' makes no difference.
        let message = text::compose(&mut *lock(&self.rng), &self.config.text);
        vec![self.build(
            &ctrl.id,
            message.text,
            weight,
            self.config.delay_ms,
            self.config.postdelay_ms,
        )]
    }

    async fn exec(&self, ctx: BotContext, outcome: Outcome) -> anyhow::Result<Option<String>> {
        let payload: PosePayload = outcome.payload().context("invalid pose payload")?;
        let ctrl = match ctx.snapshot().controlled {
            Some(c) if c.id == payload.char_id => c,
            _ => bail!("{} not controlled", payload.char_id),
        };
        ctx.pose(&ctrl.id, &payload.msg).await?;
        Ok(Some(format!("{} posed", ctrl.full_name())))
    }
}
