use crate::queue::ItemId;

/// Errors raised by the scheduling primitives.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("action id already registered: {0}")]
    DuplicateAction(String),

    /// A timer fired for an item that is no longer first in the queue.
    #[error("timer fired for item {fired} but head of queue is {}", display_head(.head))]
    StaleHead { fired: ItemId, head: Option<ItemId> },

    #[error("action not registered: {0}")]
    UnknownAction(String),

    #[error("action {action} failed: {source}")]
    Execution {
        action: String,
        #[source]
        source: anyhow::Error,
    },
}

fn display_head(head: &Option<ItemId>) -> String {
    match head {
        Some(id) => id.to_string(),
        None => "empty".to_string(),
    }
}
