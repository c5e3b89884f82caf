//! Unit tests for the Identifiers module
//!
//! Tests cover identifier creation, parsing, conversion, ordering,
//! and display formatting.

use core_kernel::{ClaimId, OwnerId};
use uuid::Uuid;

mod claim_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ClaimId::new();
        let id2 = ClaimId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ClaimId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ClaimId::new_v7();
        assert!(id1 < id2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ClaimId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ClaimId::prefix(), "CLM");
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = ClaimId::new();
        let parsed: ClaimId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_from_str_rejects_garbage() {
        assert!("CLM-not-a-uuid".parse::<ClaimId>().is_err());
    }

    #[test]
    fn test_json_serialization_is_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = ClaimId::from_uuid(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
        let deserialized: ClaimId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}

mod owner_id_tests {
    use super::*;

    #[test]
    fn test_prefix_and_display() {
        let id = OwnerId::new();
        assert_eq!(OwnerId::prefix(), "USR");
        assert!(id.to_string().starts_with("USR-"));
    }

    #[test]
    fn test_parses_identity_provider_subject() {
        // Subjects arrive as bare UUID strings
        let subject = "3f1c2a9e-7b4d-4c1e-9a57-2f0d6b8e1c44";
        let id: OwnerId = subject.parse().unwrap();
        assert_eq!(id.as_uuid().to_string(), subject);
    }
}
