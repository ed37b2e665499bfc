//! Deterministic, runtime-agnostic scheduling primitives for autonomous bots.
//!
//! A bot registers [`Action`]s that propose weighted [`Outcome`]s. The
//! [`Aggregator`] draws one outcome, and the [`PausableQueue`] orders queued
//! outcomes by priority while timing their delay and post-delay phases.
//! Driving the queue against a clock is left to the caller.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod aggregator;
pub mod error;
pub mod outcome;
pub mod probability;
pub mod queue;
pub mod rng;

pub use action::{Action, ActionRegistry, ExecFuture, FnAction};
pub use aggregator::{draw, Aggregator, Selection};
pub use error::Error;
pub use outcome::Outcome;
pub use probability::{interpolate, PopulationCurve};
pub use queue::{Armed, Fired, ItemId, ItemState, PausableQueue, Phase, QueuedItem};
pub use rng::{DeterministicRng, SplitMix64, Spread};
