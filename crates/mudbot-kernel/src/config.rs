//! Bot configuration loading and management.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use mudbot_core::{Outcome, PopulationCurve, Spread};
use serde::{Deserialize, Serialize};

use crate::world::SpeechKind;

/// Main bot configuration, loaded from .mudbot/config.yaml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Seed for every random draw. Absent means a clock-derived seed.
    pub seed: Option<u64>,

    pub personality: PersonalityConfig,

    pub actions: ActionsConfig,

    pub reactions: ReactionsConfig,

    /// Actions queued as soon as the bot connects
    pub initial_queue: Vec<QueuedAction>,
}

/// Typing and reading speeds, in characters per minute
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    pub type_speed: f64,
    pub read_speed: f64,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            type_speed: 200.0,
            read_speed: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionsConfig {
    #[serde(default)]
    pub idle: IdleConfig,

    #[serde(default)]
    pub sleep: FixedWeightConfig,

    #[serde(default = "default_wakeup")]
    pub wakeup: FixedWeightConfig,

    #[serde(default = "default_say")]
    pub say: TalkConfig,

    #[serde(default = "default_whisper")]
    pub whisper: TalkConfig,

    #[serde(default)]
    pub go: GoConfig,

    #[serde(default = "default_pose")]
    pub pose: TalkConfig,

    #[serde(default)]
    pub lurk: LurkConfig,

    /// Disabled unless given a population weight
    #[serde(default)]
    pub address: TalkConfig,

    #[serde(default)]
    pub teleport: TeleportConfig,
}

impl Default for ActionsConfig {
    fn default() -> Self {
        Self {
            idle: IdleConfig::default(),
            sleep: FixedWeightConfig::default(),
            wakeup: default_wakeup(),
            say: default_say(),
            whisper: default_whisper(),
            go: GoConfig::default(),
            pose: default_pose(),
            lurk: LurkConfig::default(),
            address: TalkConfig::default(),
            teleport: TeleportConfig::default(),
        }
    }
}

fn default_wakeup() -> FixedWeightConfig {
    FixedWeightConfig {
        weight: 50.0,
        ..FixedWeightConfig::default()
    }
}

fn default_say() -> TalkConfig {
    TalkConfig {
        population_weight: PopulationCurve::new([(1, 0.0), (2, 20.0), (3, 40.0)]),
        ..TalkConfig::default()
    }
}

fn default_pose() -> TalkConfig {
    default_say()
}

fn default_whisper() -> TalkConfig {
    TalkConfig {
        population_weight: PopulationCurve::new([(2, 0.0), (3, 1.0), (80, 50.0)]),
        ..TalkConfig::default()
    }
}

/// Idling while awake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdleConfig {
    pub weight: f64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
    /// How idle durations spread between min and max
    pub spread: Spread,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self {
            weight: 20.0,
            delay_min_ms: 10_000,
            delay_max_ms: 300_000,
            spread: Spread::Cube,
        }
    }
}

/// Waiting without a controlled character
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LurkConfig {
    pub weight: f64,
    pub delay_min_ms: u64,
    pub delay_max_ms: u64,
}

impl Default for LurkConfig {
    fn default() -> Self {
        Self {
            weight: 0.0,
            delay_min_ms: 2_000,
            delay_max_ms: 5_000,
        }
    }
}

/// An action with a constant weight (sleep, wakeup)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedWeightConfig {
    pub weight: f64,
    pub delay_ms: u64,
    pub postdelay_ms: u64,
}

/// Speaking in the room or whispering to someone in it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TalkConfig {
    /// Weight by number of awake characters in the room
    pub population_weight: PopulationCurve,
    /// Added to the time it takes to type the message
    pub delay_ms: u64,
    pub postdelay_ms: u64,
    pub text: TextConfig,
}

impl Default for TalkConfig {
    fn default() -> Self {
        Self {
            population_weight: PopulationCurve::default(),
            delay_ms: 2_000,
            postdelay_ms: 5_000,
            text: TextConfig::default(),
        }
    }
}

/// Using a random exit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    pub population_weight: PopulationCurve,
    pub delay_ms: u64,
    pub postdelay_ms: u64,
}

impl Default for GoConfig {
    fn default() -> Self {
        Self {
            population_weight: PopulationCurve::new([
                (1, 100.0),
                (2, 20.0),
                (3, 5.0),
                (10, 1.0),
                (20, 5.0),
                (80, 100.0),
            ]),
            delay_ms: 1_000,
            postdelay_ms: 5_000,
        }
    }
}

/// Teleporting to a known destination
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportConfig {
    pub population_weight: PopulationCurve,
    pub delay_ms: u64,
    pub postdelay_ms: u64,
    /// Destination keys the bot may teleport to. Absent allows all.
    pub allowed_destinations: Option<Vec<String>>,
}

impl Default for TeleportConfig {
    fn default() -> Self {
        Self {
            population_weight: PopulationCurve::new([
                (1, 20.0),
                (2, 4.0),
                (3, 1.0),
                (10, 0.0),
                (20, 1.0),
                (80, 20.0),
            ]),
            delay_ms: 1_000,
            postdelay_ms: 5_000,
            allowed_destinations: None,
        }
    }
}

/// Generated message text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub word_min: u64,
    pub word_max: u64,
    pub spread: Spread,
    /// Fixed phrases to pick from instead of lorem ipsum. A leading ':' makes it a pose.
    pub phrases: Option<Vec<String>>,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            word_min: 2,
            word_max: 100,
            spread: Spread::Cube,
            phrases: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactionsConfig {
    pub whisper_reply: WhisperReplyConfig,
    pub arrive_welcome: GreetConfig,
    pub travel_greet: GreetConfig,
    pub read: ReadConfig,
}

impl Default for ReactionsConfig {
    fn default() -> Self {
        Self {
            whisper_reply: WhisperReplyConfig::default(),
            arrive_welcome: GreetConfig::arrive_welcome(),
            travel_greet: GreetConfig::travel_greet(),
            read: ReadConfig::default(),
        }
    }
}

/// Replying to whispers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperReplyConfig {
    /// Chance in `[0, 1]` of replying
    pub chance: f64,
    pub priority: i32,
    pub text: TextConfig,
}

impl Default for WhisperReplyConfig {
    fn default() -> Self {
        Self {
            chance: 0.8,
            priority: 100,
            text: TextConfig::default(),
        }
    }
}

/// Posing a greeting when someone arrives, or when arriving somewhere
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetConfig {
    /// Chance in `[0, 1]` by number of awake characters in the room. Empty disables.
    pub population_chance: PopulationCurve,
    pub priority: i32,
    /// Overrides the pose action's delay; typing time is still added
    pub delay_ms: Option<u64>,
    /// Overrides the pose action's post-delay
    pub postdelay_ms: Option<u64>,
    /// `{name}`, `{surname}` and `{fullname}` refer to the arriving character
    pub text: TextConfig,
}

impl Default for GreetConfig {
    fn default() -> Self {
        Self {
            population_chance: PopulationCurve::default(),
            priority: 150,
            delay_ms: None,
            postdelay_ms: None,
            text: TextConfig {
                word_min: 1,
                word_max: 12,
                ..TextConfig::default()
            },
        }
    }
}

impl GreetConfig {
    fn greeting(delay_ms: u64, phrases: &[&str]) -> Self {
        let defaults = Self::default();
        Self {
            population_chance: PopulationCurve::new([(1, 0.5), (80, 0.0125)]),
            delay_ms: Some(delay_ms),
            postdelay_ms: Some(2_000),
            text: TextConfig {
                phrases: Some(phrases.iter().map(|p| p.to_string()).collect()),
                ..defaults.text
            },
            ..defaults
        }
    }

    pub fn arrive_welcome() -> Self {
        Self::greeting(
            5_000,
            &[
                "waves to {name}.",
                "says, \"Hi, {name}!\"",
                "nods in greeting.",
                "welcomes {name}.",
            ],
        )
    }

    pub fn travel_greet() -> Self {
        Self::greeting(
            1_000,
            &[
                "waves to all.",
                "says, \"Hi everyone!\"",
                "says, \"Hejsan allihopa.\"",
                "waves.",
                "says 'Hi' to everyone.",
            ],
        )
    }
}

/// Taking time to read what others say in the room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Chance in `[0, 1]` of reading a message
    pub chance: f64,
    pub priority: i32,
    pub kinds: Vec<SpeechKind>,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            chance: 0.0,
            priority: 100,
            kinds: vec![
                SpeechKind::Say,
                SpeechKind::Pose,
                SpeechKind::Ooc,
                SpeechKind::Describe,
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedAction {
    pub action: String,
    #[serde(default)]
    pub outcome: Outcome,
}

impl BotConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load from project root (looks for .mudbot/config.yaml)
    pub fn load_from_project(project_root: &Path) -> Result<Self> {
        let config_path = Self::project_path(project_root);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn project_path(project_root: &Path) -> PathBuf {
        project_root.join(".mudbot/config.yaml")
    }

    /// The configured seed, or one taken from the clock.
    pub fn seed_or_clock(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            let now = chrono::Utc::now();
            now.timestamp_nanos_opt()
                .map(|n| n as u64)
                .unwrap_or_else(|| now.timestamp_millis() as u64)
        })
    }
}

/// Written by `mudbot init`.
pub const DEFAULT_CONFIG_YAML: &str = r#"# mudbot configuration
#
# Weights are relative. A population_weight maps the number of awake
# characters in the room to a weight, interpolated between the given counts.

# seed: 42

personality:
  type_speed: 200   # characters per minute
  read_speed: 1000

actions:
  idle:
    weight: 20
    delay_min_ms: 10000
    delay_max_ms: 300000
    spread: cube    # linear, square or cube (few long idles)
  sleep:
    weight: 0
  wakeup:
    weight: 50
  say:
    population_weight:
      1: 0          # nobody to talk to
      2: 20
      3: 40
    delay_ms: 2000
    postdelay_ms: 5000
    text:
      word_min: 2
      word_max: 100
  whisper:
    population_weight:
      2: 0
      3: 1
      80: 50
    delay_ms: 2000
    postdelay_ms: 5000
  go:
    population_weight:
      1: 100
      2: 20
      3: 5
      10: 1
      20: 5
      80: 100       # crowded rooms
    delay_ms: 1000
    postdelay_ms: 5000
  pose:
    population_weight:
      1: 0
      2: 20
      3: 40
    delay_ms: 2000
    postdelay_ms: 5000
  lurk:
    weight: 0       # waiting around with no character
    delay_min_ms: 2000
    delay_max_ms: 5000
  teleport:
    population_weight:
      1: 20
      2: 4
      3: 1
      10: 0
      20: 1
      80: 20
    delay_ms: 1000
    postdelay_ms: 5000
    # allowed_destinations: [square]

reactions:
  whisper_reply:
    chance: 0.8
    priority: 100
  arrive_welcome:
    population_chance:
      1: 0.5
      80: 0.0125
    priority: 150
    delay_ms: 5000
    postdelay_ms: 2000
    text:
      word_min: 1
      word_max: 12
      phrases:
        - "waves to {name}."
        - "says, \"Hi, {name}!\""
        - "nods in greeting."
        - "welcomes {name}."
  travel_greet:
    population_chance:
      1: 0.5
      80: 0.0125
    priority: 150
    delay_ms: 1000
    postdelay_ms: 2000
    text:
      word_min: 1
      word_max: 12
      phrases:
        - "waves to all."
        - "says, \"Hi everyone!\""
        - "says, \"Hejsan allihopa.\""
        - "waves."
        - "says 'Hi' to everyone."
  read:
    chance: 0       # chance of stopping to read what others say
    priority: 100

initial_queue: []
"#;
