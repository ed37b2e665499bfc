use std::sync::Mutex;

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use mudbot_core::{Action, Outcome, SplitMix64};
use serde::{Deserialize, Serialize};

use super::{action_rng, lock, millis, typed_delay};
use crate::config::TalkConfig;
use crate::personality::Personality;
use crate::text::{self, Message};
use crate::world::BotContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhisperPayload {
    pub char_id: String,
    pub target_id: String,
    pub msg: String,
    #[serde(default)]
    pub pose: bool,
}

/// Whispering to another awake character in the room.
pub struct WhisperAction {
    config: TalkConfig,
    personality: Personality,
    rng: Mutex<SplitMix64>,
}

impl WhisperAction {
    pub const ID: &'static str = "whisper";

    pub fn new(config: TalkConfig, personality: Personality, seed: u64) -> Self {
        Self {
            config,
            personality,
            rng: action_rng(seed, Self::ID),
        }
    }

    /// An outcome whispering `message` to `target_id`, for enqueueing outside of aggregation.
    pub fn outcome_for(
        &self,
        char_id: &str,
        target_id: &str,
        message: Message,
        priority: i32,
    ) -> Outcome {
        self.build(char_id, target_id, message, 0.0).with_priority(priority)
    }

    fn build(&self, char_id: &str, target_id: &str, message: Message, weight: f64) -> Outcome {
        let delay = typed_delay(self.config.delay_ms, &self.personality, &message.text);
        Outcome::new(weight)
            .with_delay(delay)
            .with_postdelay(millis(self.config.postdelay_ms))
            .with_payload(&WhisperPayload {
                char_id: char_id.to_string(),
                target_id: target_id.to_string(),
                msg: message.text,
                pose: message.pose,
            })
    }
}

#[async_trait]
impl Action<BotContext> for WhisperAction {
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

        let targets: Vec<_> = room
            .chars
            .iter()
            .filter(|c| c.is_awake() && c.id != ctrl.id)
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        // The room's weight is shared between everyone who could be whispered to.
        let share = weight / targets.len() as f64;
        let mut rng = lock(&self.rng);
        targets
            .into_iter()
            .map(|target| {
                let message = text::compose(&mut *rng, &self.config.text);
                self.build(&ctrl.id, &target.id, message, share)
            })
            .collect()
    }

    async fn exec(&self, ctx: BotContext, outcome: Outcome) -> anyhow::Result<Option<String>> {
        let payload: WhisperPayload = outcome.payload().context("invalid whisper payload")?;
        let snapshot = ctx.snapshot();
        let ctrl = match snapshot.controlled {
            Some(c) if c.id == payload.char_id => c,
            _ => bail!("{} not controlled", payload.char_id),
        };
        let target = snapshot
            .room
            .as_ref()
            .and_then(|r| r.find_char(&payload.target_id))
            .cloned()
            .ok_or_else(|| anyhow!("target char no longer in room"))?;

        ctx.whisper(&ctrl.id, &target.id, &payload.msg, payload.pose).await?;
        Ok(Some(format!(
            "{} whispered to {}",
            ctrl.full_name(),
            target.full_name()
        )))
    }
}
