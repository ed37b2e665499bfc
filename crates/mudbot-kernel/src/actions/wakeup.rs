use anyhow::bail;
use async_trait::async_trait;
use mudbot_core::{Action, Outcome};

use super::millis;
use crate::config::FixedWeightConfig;
use crate::world::BotContext;

/// Waking up the controlled character, taking control of one first if needed.
pub struct WakeupAction {
    config: FixedWeightConfig,
}

impl WakeupAction {
    pub const ID: &'static str = "wakeup";

    pub fn new(config: FixedWeightConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Action<BotContext> for WakeupAction {
    fn id(&self) -> &str {
        Self::ID
    }

    fn outcomes(&self, ctx: &BotContext) -> Vec<Outcome> {
        if self.config.weight <= 0.0 || ctx.snapshot().awake().is_some() {
            return Vec::new();
        }
        vec![Outcome::new(self.config.weight)
            .with_delay(millis(self.config.delay_ms))
            .with_postdelay(millis(self.config.postdelay_ms))]
    }

    async fn exec(&self, ctx: BotContext, _outcome: Outcome) -> anyhow::Result<Option<String>> {
        let ctrl = match ctx.snapshot().controlled {
            Some(c) if c.is_awake() => bail!("char already awake"),
            Some(c) => c,
            None => ctx.control_char().await?,
        };
        ctx.wakeup(&ctrl.id).await?;
        Ok(Some(format!("woke up {}", ctrl.full_name())))
    }
}
