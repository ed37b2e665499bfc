use anyhow::anyhow;
use async_trait::async_trait;
use mudbot_core::{Action, Outcome};

use super::millis;
use crate::config::FixedWeightConfig;
use crate::world::BotContext;

/// Releasing the controlled character, which puts it to sleep.
pub struct SleepAction {
    config: FixedWeightConfig,
}

impl SleepAction {
    pub const ID: &'static str = "sleep";

    pub fn new(config: FixedWeightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Action<BotContext> for SleepAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        if self.config.weight <= 0.0 || ctx.snapshot().awake().is_none() {
            return Vec::new();
        }
        vec![Outcome::new(self.config.weight)
            .with_delay(millis(self.config.delay_ms))
            .with_postdelay(millis(self.config.postdelay_ms))]
    }

    async fn exec(&self, ctx: BotContext, _outcome: Outcome) -> anyhow::Result<Option<String>> {
        let ctrl = ctx
            .snapshot()
            .controlled
            .ok_or_else(|| anyhow!("char not controlled"))?;
        ctx.release(&ctrl.id).await?;
        Ok(Some(format!("{} put to sleep", ctrl.full_name())))
    }
}
