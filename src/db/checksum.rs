//! Event content checksums for idempotent ingestion.

use sha2::{Digest, Sha256};

use crate::execution::events::ExecutionEvent;

/// SHA-256 over the canonical JSON form of an event. Two events with the
/// same visit, timestamp, and payload hash identically, which is what keys
/// idempotent replay.
pub fn event_checksum(event: &ExecutionEvent) -> String {
    let canonical =
        serde_json::to_string(event).unwrap_or_else(|_| format!("{:?}", event));
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::events::{ExecutionEventPayload, SequenceCommand};
    use crate::models::{Timestamp, VisitId};

    fn event(t: i64, command: SequenceCommand) -> ExecutionEvent {
        ExecutionEvent {
            visit_id: VisitId(uuid::Uuid::nil()),
            timestamp: Timestamp::from_microseconds(t).unwrap(),
            payload: ExecutionEventPayload::Sequence { command },
        }
    }

    #[test]
    fn test_checksum_consistency() {
        let a = event(1_000_000, SequenceCommand::Start);
        assert_eq!(event_checksum(&a), event_checksum(&a));
    }

    #[test]
    fn test_different_content_different_checksum() {
        let a = event(1_000_000, SequenceCommand::Start);
        let b = event(1_000_000, SequenceCommand::Stop);
        let c = event(2_000_000, SequenceCommand::Start);
        assert_ne!(event_checksum(&a), event_checksum(&b));
        assert_ne!(event_checksum(&a), event_checksum(&c));
    }
}
