use std::sync::Mutex;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use mudbot_core::{Action, Outcome, SplitMix64};

use super::{action_rng, lock, millis, typed_delay, WhisperPayload};
use crate::config::TalkConfig;
use crate::personality::Personality;
use crate::text;
use crate::world::BotContext;

/// Speaking to one awake character in the room, in front of everyone else.
///
/// Outcomes carry a [`WhisperPayload`]; addressing and whispering only differ in who hears it.
pub struct AddressAction {
    config: TalkConfig,
    personality: Personality,
    rng: Mutex<SplitMix64>,
}

impl AddressAction {
    pub const ID: &'static str = "address";

    pub fn new(config: TalkConfig, personality: Personality, seed: u64) -> Self {
        Self {
            config,
            personality,
            rng: action_rng(seed, Self::ID),
        }
    }
}

#[async_trait]
impl Action<BotContext> for AddressAction {
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

        let share = weight / targets.len() as f64;
        let mut rng = lock(&self.rng);
        targets
            .into_iter()
            .map(|target| {
                let message = text::compose(&mut *rng, &self.config.text);
                Outcome::new(share)
                    .with_delay(typed_delay(self.config.delay_ms, &self.personality, &message.text))
                    .with_postdelay(millis(self.config.postdelay_ms))
                    .with_payload(&WhisperPayload {
                        char_id: ctrl.id.clone(),
                        target_id: target.id.clone(),
                        msg: message.text,
                        pose: message.pose,
                    })
            })
            .collect()
    }

    async fn exec(&self, ctx: BotContext, outcome: Outcome) -> anyhow::Result<Option<String>> {
        let payload: WhisperPayload = outcome.payload().context("invalid address payload")?;
        let snapshot = ctx.snapshot();
        let ctrl = snapshot
            .controlled
            .ok_or_else(|| anyhow!("char not controlled"))?;
        let room = snapshot
            .room
            .ok_or_else(|| anyhow!("{} is nowhere", ctrl.full_name()))?;
        let target = room
            .find_char(&payload.target_id)
            .cloned()
            .ok_or_else(|| anyhow!("target char no longer in room {}", room.name))?;

        ctx.address(&ctrl.id, &target.id, &payload.msg, payload.pose)
            .await?;
        Ok(Some(format!(
            "{} addressed {}",
            ctrl.full_name(),
            target.full_name()
        )))
    }
}
