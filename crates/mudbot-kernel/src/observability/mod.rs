//! Observability - controller events and the on-disk journal.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Something the controller did, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl ControllerEvent {
    pub fn now(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
        }
    }

    pub fn action(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Queued { action, .. }
            | EventKind::Executed { action, .. }
            | EventKind::Failed { action, .. }
            | EventKind::Completed { action, .. } => Some(action),
            EventKind::Idle | EventKind::Disposed => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    Queued {
        item: u64,
        action: String,
        priority: i32,
        position: usize,
    },
    /// No action offered any weight.
    Idle,
    Executed {
        item: u64,
        action: String,
        message: Option<String>,
    },
    Failed {
        item: u64,
        action: String,
        error: String,
    },
    /// Post-delay elapsed and the item left the queue.
    Completed { item: u64, action: String },
    Disposed,
}

/// Append-only JSON lines journal of controller events.
pub struct EventJournal {
    path: PathBuf,
}

impl EventJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Journal at the default location inside a project.
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".mudbot/events.jsonl"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &ControllerEvent) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open journal {}", self.path.display()))?;

        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Read the last `limit` events. Unreadable lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<ControllerEvent> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut events: Vec<ControllerEvent> = reader
            .lines()
            .map_while(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}
