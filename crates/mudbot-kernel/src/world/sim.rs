//! In-memory world for running and testing bots without a server.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{
    CharState, Character, Exit, Room, SpeechKind, TeleportNode, World, WorldEvent, WorldSnapshot,
};

struct SimRoom {
    name: String,
    exits: Vec<Exit>,
    is_quiet: bool,
}

struct SimChar {
    character: Character,
    room: String,
    /// May be controlled by the bot
    owned: bool,
}

#[derive(Default)]
struct SimState {
    rooms: BTreeMap<String, SimRoom>,
    chars: BTreeMap<String, SimChar>,
    controlled: Option<String>,
    teleports: Vec<TeleportNode>,
    transcript: Vec<String>,
}

impl SimState {
    fn room_view(&self, room_id: &str) -> Option<Room> {
        let room = self.rooms.get(room_id)?;
        Some(Room {
            id: room_id.to_string(),
            name: room.name.clone(),
            chars: self
                .chars
                .values()
                .filter(|c| c.room == room_id)
                .map(|c| c.character.clone())
                .collect(),
            exits: room.exits.clone(),
            is_quiet: room.is_quiet,
        })
    }

    fn controlled(&self, char_id: &str) -> Result<&SimChar> {
        if self.controlled.as_deref() != Some(char_id) {
            bail!("{} not controlled", char_id);
        }
        self.chars
            .get(char_id)
            .ok_or_else(|| anyhow!("unknown char {}", char_id))
    }

    fn controlled_awake(&self, char_id: &str) -> Result<&SimChar> {
        let c = self.controlled(char_id)?;
        if !c.character.is_awake() {
            bail!("{} is asleep", c.character.full_name());
        }
        Ok(c)
    }

    /// Controlled, awake and in a room where talking is allowed.
    fn speaker(&self, char_id: &str) -> Result<(Character, String)> {
        let c = self.controlled_awake(char_id)?;
        if self.rooms.get(&c.room).is_some_and(|r| r.is_quiet) {
            bail!("room is quiet");
        }
        Ok((c.character.clone(), c.room.clone()))
    }

    fn set_state(&mut self, char_id: &str, state: CharState) {
        if let Some(c) = self.chars.get_mut(char_id) {
            c.character.state = state;
        }
    }
}

/// A world held in memory.
///
/// Other players are simulated by calling [`SimWorld::send_whisper`] and
/// [`SimWorld::move_char`]. Everything the bot does is recorded in [`SimWorld::transcript`].
pub struct SimWorld {
    state: Mutex<SimState>,
    events: broadcast::Sender<WorldEvent>,
}

impl SimWorld {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(SimState::default()),
            events,
        }
    }

    /// Three rooms, a few locals and one sleeping bot character.
    pub fn demo() -> Self {
        let world = Self::new();
        world.add_room("square", "Town Square");
        world.add_room("tavern", "The Rusty Tankard");
        world.add_room("library", "Old Library");
        world.set_quiet("library", true);

        world.add_exit("square", "sq-tavern", "tavern", "tavern");
        world.add_exit("square", "sq-library", "library", "library");
        world.add_exit("tavern", "tavern-sq", "out", "square");
        world.add_exit("library", "library-sq", "out", "square");

        world.add_teleport("node-square", "square", "square");
        world.add_teleport("node-library", "library", "library");

        world.add_bot_char("square", Character::new("bot", "Rusty", "Gears").asleep());
        world.add_char("square", Character::new("npc-1", "Mira", "Vale"));
        world.add_char("square", Character::new("npc-2", "Tobin", "Ash"));
        world.add_char("tavern", Character::new("npc-3", "Greta", "Hollow"));
        world.add_char("tavern", Character::new("npc-4", "Osric", "Fenn"));
        world.add_char("tavern", Character::new("npc-5", "Lune", "Marsh").asleep());
        world.add_char("library", Character::new("npc-6", "Ilse", "Quill"));
        world
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: WorldEvent) {
        let _ = self.events.send(event);
    }

    pub fn add_room(&self, id: &str, name: &str) {
        self.lock().rooms.insert(
            id.to_string(),
            SimRoom {
                name: name.to_string(),
                exits: Vec::new(),
                is_quiet: false,
            },
        );
    }

    pub fn set_quiet(&self, room: &str, quiet: bool) {
        if let Some(r) = self.lock().rooms.get_mut(room) {
            r.is_quiet = quiet;
        }
    }

    pub fn add_exit(&self, from: &str, exit_id: &str, key: &str, to: &str) {
        if let Some(r) = self.lock().rooms.get_mut(from) {
            r.exits.push(Exit {
                id: exit_id.to_string(),
                keys: vec![key.to_string()],
                target_room: to.to_string(),
            });
        }
    }

    /// A teleport destination every character knows.
    pub fn add_teleport(&self, node_id: &str, key: &str, room: &str) {
        self.lock().teleports.push(TeleportNode {
            id: node_id.to_string(),
            key: key.to_string(),
            room: room.to_string(),
        });
    }

    /// Add a character played by someone else.
    pub fn add_char(&self, room: &str, character: Character) {
        self.insert_char(room, character, false);
    }

    /// Add a character the bot may control.
    pub fn add_bot_char(&self, room: &str, character: Character) {
        self.insert_char(room, character, true);
    }

    fn insert_char(&self, room: &str, character: Character, owned: bool) {
        self.lock().chars.insert(
            character.id.clone(),
            SimChar {
                character,
                room: room.to_string(),
                owned,
            },
        );
    }

    /// Start out controlling a character, as if the bot had already connected with it.
    pub fn control(&self, char_id: &str) -> Result<()> {
        let mut state = self.lock();
        match state.chars.get(char_id) {
            Some(c) if c.owned => {
                state.controlled = Some(char_id.to_string());
                Ok(())
            }
            Some(_) => bail!("{} is not a bot character", char_id),
            None => bail!("unknown char {}", char_id),
        }
    }

    /// Move any character to a room.
    pub fn move_char(&self, char_id: &str, room: &str) -> Result<()> {
        let character = {
            let mut state = self.lock();
            if !state.rooms.contains_key(room) {
                bail!("unknown room {}", room);
            }
            let c = state
                .chars
                .get_mut(char_id)
                .ok_or_else(|| anyhow!("unknown char {}", char_id))?;
            c.room = room.to_string();
            c.character.clone()
        };
        self.emit(WorldEvent::Arrived {
            char: character,
            room: room.to_string(),
        });
        Ok(())
    }

    /// Someone whispers to another character.
    pub fn send_whisper(&self, from: &str, to: &str, msg: &str) -> Result<()> {
        let from = {
            let state = self.lock();
            if !state.chars.contains_key(to) {
                bail!("unknown char {}", to);
            }
            state
                .chars
                .get(from)
                .map(|c| c.character.clone())
                .ok_or_else(|| anyhow!("unknown char {}", from))?
        };
        self.emit(WorldEvent::Whisper {
            from,
            to: to.to_string(),
            msg: msg.to_string(),
            pose: false,
        });
        Ok(())
    }

    /// Someone says, poses or describes something to the room they are in.
    pub fn send_message(&self, from: &str, kind: SpeechKind, msg: &str) -> Result<()> {
        let (from, room) = {
            let state = self.lock();
            state
                .chars
                .get(from)
                .map(|c| (c.character.clone(), c.room.clone()))
                .ok_or_else(|| anyhow!("unknown char {}", from))?
        };
        self.emit(WorldEvent::Spoke {
            from,
            room,
            kind,
            msg: msg.to_string(),
        });
        Ok(())
    }

    /// Lines describing every call the bot made.
    pub fn transcript(&self) -> Vec<String> {
        self.lock().transcript.clone()
    }

    pub fn character(&self, char_id: &str) -> Option<Character> {
        self.lock().chars.get(char_id).map(|c| c.character.clone())
    }

    pub fn room_of(&self, char_id: &str) -> Option<String> {
        self.lock().chars.get(char_id).map(|c| c.room.clone())
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl World for SimWorld {
    fn snapshot(&self) -> WorldSnapshot {
        let state = self.lock();
        let Some(c) = state.controlled.as_ref().and_then(|id| state.chars.get(id)) else {
            return WorldSnapshot::default();
        };
        WorldSnapshot {
            controlled: Some(c.character.clone()),
            room: state.room_view(&c.room),
            teleports: state.teleports.clone(),
        }
    }

    async fn control_char(&self) -> Result<Character> {
        let mut state = self.lock();
        if let Some(c) = state.controlled.as_ref().and_then(|id| state.chars.get(id)) {
            return Ok(c.character.clone());
        }

        let character = state
            .chars
            .values()
            .find(|c| c.owned)
            .map(|c| c.character.clone())
            .ok_or_else(|| anyhow!("no character available to control"))?;
        state.controlled = Some(character.id.clone());
        state
            .transcript
            .push(format!("{} is now controlled", character.full_name()));
        Ok(character)
    }

    async fn wakeup(&self, char_id: &str) -> Result<()> {
        let mut state = self.lock();
        let name = state.controlled(char_id)?.character.full_name();
        state.set_state(char_id, CharState::Awake);
        state.transcript.push(format!("{} wakes up", name));
        Ok(())
    }

    async fn release(&self, char_id: &str) -> Result<()> {
        let mut state = self.lock();
        let name = state.controlled(char_id)?.character.full_name();
        state.set_state(char_id, CharState::Asleep);
        state.controlled = None;
        state.transcript.push(format!("{} falls asleep", name));
        Ok(())
    }

    async fn say(&self, char_id: &str, msg: &str) -> Result<()> {
        let (from, room) = {
            let mut state = self.lock();
            let (from, room) = state.speaker(char_id)?;
            let line = format!("{} says, \"{}\"", from.full_name(), msg);
            state.transcript.push(line);
            (from, room)
        };
        self.emit(WorldEvent::Spoke {
            from,
            room,
            kind: SpeechKind::Say,
            msg: msg.to_string(),
        });
        Ok(())
    }

    async fn pose(&self, char_id: &str, msg: &str) -> Result<()> {
        let (from, room) = {
            let mut state = self.lock();
            let (from, room) = state.speaker(char_id)?;
            let line = format!("{} {}", from.name, msg);
            state.transcript.push(line);
            (from, room)
        };
        self.emit(WorldEvent::Spoke {
            from,
            room,
            kind: SpeechKind::Pose,
            msg: msg.to_string(),
        });
        Ok(())
    }

    async fn whisper(&self, char_id: &str, target_id: &str, msg: &str, pose: bool) -> Result<()> {
        let from = {
            let mut state = self.lock();
            let c = state.controlled_awake(char_id)?;
            let room = c.room.clone();
            let from = c.character.clone();
            let target = state
                .chars
                .get(target_id)
                .filter(|t| t.room == room)
                .map(|t| t.character.full_name())
                .ok_or_else(|| anyhow!("target char no longer in room"))?;

            let line = if pose {
                format!("{} whispers to {}: {} {}", from.full_name(), target, from.name, msg)
            } else {
                format!("{} whispers to {}, \"{}\"", from.full_name(), target, msg)
            };
            state.transcript.push(line);
            from
        };

        self.emit(WorldEvent::Whisper {
            from,
            to: target_id.to_string(),
            msg: msg.to_string(),
            pose,
        });
        Ok(())
    }

    async fn address(&self, char_id: &str, target_id: &str, msg: &str, pose: bool) -> Result<()> {
        let (from, room) = {
            let mut state = self.lock();
            let (from, room) = state.speaker(char_id)?;
            let target = state
                .chars
                .get(target_id)
                .filter(|t| t.room == room)
                .map(|t| t.character.full_name())
                .ok_or_else(|| anyhow!("target char no longer in room"))?;

            let line = if pose {
                format!("{} addresses {}: {} {}", from.full_name(), target, from.name, msg)
            } else {
                format!("{} says to {}, \"{}\"", from.full_name(), target, msg)
            };
            state.transcript.push(line);
            (from, room)
        };

        let kind = if pose { SpeechKind::Pose } else { SpeechKind::Say };
        self.emit(WorldEvent::Spoke {
            from,
            room,
            kind,
            msg: msg.to_string(),
        });
        Ok(())
    }

    async fn use_exit(&self, char_id: &str, exit_id: &str) -> Result<()> {
        let (character, target) = {
            let mut state = self.lock();
            let c = state.controlled_awake(char_id)?;
            let exit = state
                .rooms
                .get(&c.room)
                .and_then(|r| r.exits.iter().find(|e| e.id == exit_id))
                .cloned()
                .ok_or_else(|| anyhow!("no exit {} here", exit_id))?;
            let character = c.character.clone();

            if let Some(c) = state.chars.get_mut(char_id) {
                c.room = exit.target_room.clone();
            }
            state
                .transcript
                .push(format!("{} leaves {}", character.full_name(), exit.name()));
            (character, exit.target_room)
        };

        self.emit(WorldEvent::Arrived {
            char: character,
            room: target,
        });
        Ok(())
    }

    async fn teleport(&self, char_id: &str, node_id: &str) -> Result<()> {
        let (character, target) = {
            let mut state = self.lock();
            let c = state.controlled_awake(char_id)?;
            let current = c.room.clone();
            let character = c.character.clone();
            let node = state
                .teleports
                .iter()
                .find(|n| n.id == node_id)
                .cloned()
                .ok_or_else(|| anyhow!("unknown teleport node {}", node_id))?;
            if node.room == current {
                bail!("already in {}", node.key);
            }

            if let Some(c) = state.chars.get_mut(char_id) {
                c.room = node.room.clone();
            }
            state
                .transcript
                .push(format!("{} teleports to {}", character.full_name(), node.key));
            (character, node.room)
        };

        self.emit(WorldEvent::Arrived {
            char: character,
            room: target,
        });
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<WorldEvent> {
        self.events.subscribe()
    }
}
