//! Identifier newtypes.
//!
//! All identifiers are opaque, totally ordered, and round-trip through a
//! stable string form. Program, observation, and dataset ids use compact
//! gid-style tags (`p-1f`, `o-2a`, `d-3`); visit, atom, and step ids are
//! v4 UUIDs minted at insertion time.

use crate::{define_gid_type, define_uuid_type};

define_gid_type!(ProgramId, "p");
define_gid_type!(ObservationId, "o");
define_gid_type!(DatasetId, "d");

define_uuid_type!(VisitId);
define_uuid_type!(AtomId);
define_uuid_type!(StepId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gid_display() {
        assert_eq!(ObservationId::new(42).to_string(), "o-2a");
        assert_eq!(ProgramId::new(1).to_string(), "p-1");
        assert_eq!(DatasetId::new(255).to_string(), "d-ff");
    }

    #[test]
    fn test_gid_roundtrip() {
        let id = ObservationId::new(0xdead);
        let parsed: ObservationId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_gid_rejects_wrong_tag() {
        assert!("p-2a".parse::<ObservationId>().is_err());
        assert!("o2a".parse::<ObservationId>().is_err());
        assert!("o-xyz".parse::<ObservationId>().is_err());
    }

    #[test]
    fn test_gid_ordering_follows_value() {
        assert!(ObservationId::new(1) < ObservationId::new(2));
    }

    #[test]
    fn test_uuid_roundtrip() {
        let id = VisitId::random();
        let parsed: VisitId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_gid_serde_uses_string_form() {
        let id = ObservationId::new(42);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"o-2a\"");
        let back: ObservationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
