use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueueError;

/// A message held in a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    /// Backend-assigned message identifier.
    pub id: String,
    /// Message body.
    pub content: String,
    pub inserted_at: DateTime<Utc>,
    /// How many times the message has been dequeued.
    pub dequeue_count: u32,
}

/// Check a queue name: 3-63 characters of lowercase letters, digits and
/// single dashes, starting with a letter or digit and not ending with a dash.
pub fn validate_queue_name(name: &str) -> Result<(), QueueError> {
    let invalid = |reason: &str| QueueError::InvalidName(format!("'{name}': {reason}"));
    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be 3-63 characters long"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(invalid("only lowercase letters, digits and '-' are allowed"));
    }
    if name.starts_with('-') {
        return Err(invalid("must start with a letter or digit"));
    }
    if name.ends_with('-') {
        return Err(invalid("must not end with '-'"));
    }
    if name.contains("--") {
        return Err(invalid("consecutive '-' are not allowed"));
    }
    Ok(())
}
