//! The bot's actions. Each proposes outcomes from a world snapshot and carries one out.

mod address;
mod go;
mod idle;
mod lurk;
mod pose;
mod say;
mod sleep;
mod teleport;
mod wakeup;
mod whisper;

pub use address::AddressAction;
pub use go::GoAction;
pub use idle::IdleAction;
pub use lurk::LurkAction;
pub use pose::{PoseAction, PosePayload};
pub use say::{SayAction, SayPayload};
pub use sleep::SleepAction;
pub use teleport::TeleportAction;
pub use wakeup::WakeupAction;
pub use whisper::{WhisperAction, WhisperPayload};

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use mudbot_core::rng::{derive_seed, stream_id};
use mudbot_core::SplitMix64;

use crate::personality::Personality;

/// Random stream for one action, independent of every other action's draws.
fn action_rng(seed: u64, action_id: &str) -> Mutex<SplitMix64> {
    Mutex::new(SplitMix64::new(derive_seed(seed, stream_id(action_id))))
}

fn lock(rng: &Mutex<SplitMix64>) -> MutexGuard<'_, SplitMix64> {
    rng.lock().unwrap_or_else(|e| e.into_inner())
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

/// Configured delay plus the time it takes to type `msg`. Saturates instead of overflowing.
fn typed_delay(delay_ms: u64, personality: &Personality, msg: &str) -> Duration {
    millis(delay_ms).saturating_add(personality.type_duration(msg))
}
