//! Controller kernel for autonomous MUD bots.
//!
//! The [`Controller`] drives the scheduling primitives from `mudbot-core` on tokio: it draws
//! the next action whenever the queue runs dry, waits out delays, runs executors and reports
//! what happened as [`ControllerEvent`]s. [`Bot`] wires a controller to a [`World`] with the
//! standard actions and reactions.

pub mod actions;
pub mod bot;
pub mod config;
pub mod context;
pub mod controller;
pub mod observability;
pub mod personality;
pub mod reactions;
pub mod text;
pub mod world;

pub use bot::Bot;
pub use config::BotConfig;
pub use context::ContextProvider;
pub use controller::{Controller, ControllerConfig, ControllerError, QueuedSummary};
pub use observability::{ControllerEvent, EventJournal, EventKind};
pub use personality::Personality;
pub use world::{BotContext, SimWorld, World, WorldEvent, WorldSnapshot};
