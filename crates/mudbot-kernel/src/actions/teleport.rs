use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use mudbot_core::{Action, DeterministicRng, Outcome, SplitMix64};

use super::{action_rng, lock, millis};
use crate::config::TeleportConfig;
use crate::world::{BotContext, TeleportNode, WorldSnapshot};

/// Teleporting to a random known destination other than the current room.
pub struct TeleportAction {
    config: TeleportConfig,
    rng: Mutex<SplitMix64>,
}

impl TeleportAction {
    pub const ID: &'static str = "teleport";

    pub fn new(config: TeleportConfig, seed: u64) -> Self {
        Self {
            config,
            rng: action_rng(seed, Self::ID),
        }
    }

    fn destinations(&self, snapshot: &WorldSnapshot) -> Vec<TeleportNode> {
        let Some(room) = snapshot.room.as_ref() else {
            return Vec::new();
        };
        snapshot
            .teleports
            .iter()
            .filter(|n| n.room != room.id)
            .filter(|n| match &self.config.allowed_destinations {
                Some(allowed) => allowed.contains(&n.key),
                None => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Action<BotContext> for TeleportAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        let snapshot = ctx.snapshot();
        let Some(room) = snapshot.room.as_ref() else {
            return Vec::new();
        };
        if snapshot.awake().is_none() || self.destinations(&snapshot).is_empty() {
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
            .clone()
            .ok_or_else(|| anyhow!("char not controlled"))?;

        let nodes = self.destinations(&snapshot);
        if nodes.is_empty() {
            bail!("char {} has no valid teleport nodes", ctrl.full_name());
        }
        let index = lock(&self.rng).next_index(nodes.len());
        let node = &nodes[index];

        ctx.teleport(&ctrl.id, &node.id).await?;
        Ok(Some(format!("{} used teleport {}", ctrl.full_name(), node.key)))
    }
}
