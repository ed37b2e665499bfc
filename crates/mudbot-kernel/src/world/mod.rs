//! The world the bot lives in - characters, rooms and the calls the bot can make.

mod sim;

pub use sim::SimWorld;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharState {
    Awake,
    Asleep,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub surname: String,
    pub state: CharState,
}

impl Character {
    pub fn new(id: impl Into<String>, name: impl Into<String>, surname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            surname: surname.into(),
            state: CharState::Awake,
        }
    }

    pub fn asleep(mut self) -> Self {
        self.state = CharState::Asleep;
        self
    }

    pub fn is_awake(&self) -> bool {
        self.state == CharState::Awake
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    pub id: String,
    /// Keywords for the exit; the first one is its display name
    pub keys: Vec<String>,
    pub target_room: String,
}

impl Exit {
    pub fn name(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub name: String,
    pub chars: Vec<Character>,
    pub exits: Vec<Exit>,
    /// Talking is not allowed
    pub is_quiet: bool,
}

impl Room {
    pub fn awake_population(&self) -> u32 {
        self.chars.iter().filter(|c| c.is_awake()).count() as u32
    }

    pub fn find_char(&self, id: &str) -> Option<&Character> {
        self.chars.iter().find(|c| c.id == id)
    }
}

/// A destination the controlled character can teleport to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeleportNode {
    pub id: String,
    pub key: String,
    pub room: String,
}

/// What the bot can see right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldSnapshot {
    pub controlled: Option<Character>,
    /// Room of the controlled character
    pub room: Option<Room>,
    /// Teleport destinations known to the controlled character
    pub teleports: Vec<TeleportNode>,
}

impl WorldSnapshot {
    /// The controlled character, if it is awake.
    pub fn awake(&self) -> Option<&Character> {
        self.controlled.as_ref().filter(|c| c.is_awake())
    }
}

/// How a message was sent to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechKind {
    Say,
    Pose,
    Ooc,
    Describe,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
    Whisper {
        from: Character,
        /// Receiving character id
        to: String,
        msg: String,
        pose: bool,
    },
    /// A character entered a room, the controlled one included.
    Arrived {
        char: Character,
        room: String,
    },
    /// Something was said, posed or described to a whole room.
    Spoke {
        from: Character,
        room: String,
        kind: SpeechKind,
        msg: String,
    },
}

/// Calls the bot makes against the world.
#[async_trait]
pub trait World: Send + Sync + 'static {
    fn snapshot(&self) -> WorldSnapshot;

    /// Take control of one of the bot's characters.
    async fn control_char(&self) -> Result<Character>;

    async fn wakeup(&self, char_id: &str) -> Result<()>;

    /// Put the character to sleep and stop controlling it.
    async fn release(&self, char_id: &str) -> Result<()>;

    async fn say(&self, char_id: &str, msg: &str) -> Result<()>;

    async fn pose(&self, char_id: &str, msg: &str) -> Result<()>;

    async fn whisper(&self, char_id: &str, target_id: &str, msg: &str, pose: bool) -> Result<()>;

    /// Speak to one character, out loud for the whole room to hear.
    async fn address(&self, char_id: &str, target_id: &str, msg: &str, pose: bool) -> Result<()>;

    async fn use_exit(&self, char_id: &str, exit_id: &str) -> Result<()>;

    async fn teleport(&self, char_id: &str, node_id: &str) -> Result<()>;

    fn subscribe(&self) -> broadcast::Receiver<WorldEvent>;
}

/// Context handed to every action.
pub type BotContext = Arc<dyn World>;
