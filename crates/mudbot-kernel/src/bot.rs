//! Bot assembly - a controller, its actions and reactions, wired to one world.

use std::sync::Arc;

use anyhow::{Context, Result};
use mudbot_core::{Action, Outcome};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::actions::{
    AddressAction, GoAction, IdleAction, LurkAction, PoseAction, SayAction, SleepAction,
    TeleportAction, WakeupAction, WhisperAction,
};
use crate::config::{BotConfig, GreetConfig};
use crate::context::ContextProvider;
use crate::controller::{Controller, ControllerConfig};
use crate::personality::Personality;
use crate::reactions::{self, Greet, Greeting, ReadAction, ReadReaction, Reaction, WhisperReply};
use crate::world::BotContext;

/// Priority of the wakeup queued for a character found asleep on connect.
pub const WAKEUP_ON_CONNECT_PRIORITY: i32 = 10_000;

pub struct Bot {
    world: BotContext,
    config: BotConfig,
    seed: u64,
    personality: Personality,
    controller: Controller<BotContext>,
    context: ContextProvider<BotContext>,
    whisper: Arc<WhisperAction>,
    pose: Arc<PoseAction>,
    tasks: Vec<JoinHandle<()>>,
}

impl Bot {
    /// Build the controller and register every action. Nothing runs until [`Bot::start`].
    pub fn new(world: BotContext, config: BotConfig) -> Result<Self> {
        let seed = config.seed_or_clock();
        let controller = Controller::new(ControllerConfig {
            seed,
            ..ControllerConfig::default()
        });

        let personality = Personality::from(config.personality.clone());
        let actions = &config.actions;
        let whisper = Arc::new(WhisperAction::new(actions.whisper.clone(), personality, seed));
        let pose = Arc::new(PoseAction::new(actions.pose.clone(), personality, seed));

        let all: Vec<Arc<dyn Action<BotContext>>> = vec![
            Arc::new(IdleAction::new(actions.idle.clone(), seed)),
            Arc::new(LurkAction::new(actions.lurk.clone(), seed)),
            Arc::new(SleepAction::new(actions.sleep.clone())),
            Arc::new(WakeupAction::new(actions.wakeup.clone())),
            Arc::new(SayAction::new(actions.say.clone(), personality, seed)),
            pose.clone(),
            whisper.clone(),
            Arc::new(AddressAction::new(actions.address.clone(), personality, seed)),
            Arc::new(GoAction::new(actions.go.clone(), seed)),
            Arc::new(TeleportAction::new(actions.teleport.clone(), seed)),
            Arc::new(ReadAction),
        ];
        for action in all {
            let id = action.id().to_string();
            controller
                .add_action(action)
                .with_context(|| format!("Failed to register action {}", id))?;
        }

        tracing::debug!(seed, "Bot assembled");

        Ok(Self {
            world,
            config,
            seed,
            personality,
            controller,
            context: ContextProvider::new(),
            whisper,
            pose,
            tasks: Vec::new(),
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn controller(&self) -> &Controller<BotContext> {
        &self.controller
    }

    pub fn context(&self) -> &ContextProvider<BotContext> {
        &self.context
    }

    /// Start the controller and reactions, then connect to the world.
    pub fn start(&mut self) -> Result<()> {
        let driver = self
            .controller
            .start(self.context.subscribe())
            .context("Failed to start controller")?;
        self.tasks.push(driver);

        for reaction in self.reactions() {
            let task = reactions::spawn(reaction, &self.world, self.controller.clone());
            self.tasks.push(task);
        }
        self.tasks.push(self.forward_world_events());

        self.connect();
        Ok(())
    }

    fn reactions(&self) -> Vec<Arc<dyn Reaction>> {
        let config = &self.config.reactions;
        let greet = |greeting: Greeting, greet_config: GreetConfig| -> Arc<dyn Reaction> {
            Arc::new(Greet::new(
                greeting,
                greet_config,
                self.controller.clone(),
                Arc::clone(&self.pose),
                Arc::clone(&self.world),
                self.seed,
            ))
        };

        vec![
            Arc::new(WhisperReply::new(
                config.whisper_reply.clone(),
                self.controller.clone(),
                Arc::clone(&self.whisper),
                Arc::clone(&self.world),
                self.seed,
            )),
            greet(Greeting::Arrival, config.arrive_welcome.clone()),
            greet(Greeting::Travel, config.travel_greet.clone()),
            Arc::new(ReadReaction::new(
                config.read.clone(),
                self.personality,
                self.controller.clone(),
                Arc::clone(&self.world),
                self.seed,
            )),
        ]
    }

    fn connect(&self) {
        let snapshot = self.world.snapshot();
        if let Some(ctrl) = snapshot.controlled.filter(|c| !c.is_awake()) {
            tracing::info!(char = %ctrl.full_name(), "Controlled character is asleep, waking up");
            self.controller.enqueue(
                WakeupAction::ID,
                Outcome::forced().with_priority(WAKEUP_ON_CONNECT_PRIORITY),
            );
        }

        for queued in &self.config.initial_queue {
            self.controller.enqueue(&queued.action, queued.outcome.clone());
        }

        self.context.set(Arc::clone(&self.world));
    }

    /// Republish the context on every world event, so an idle controller looks again.
    fn forward_world_events(&self) -> JoinHandle<()> {
        let mut events = self.world.subscribe();
        let world = Arc::clone(&self.world);
        let context = self.context.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => context.set(Arc::clone(&world)),
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Stop the controller and every task the bot started.
    pub fn dispose(&mut self) {
        self.controller.dispose();
        self.context.clear();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}
