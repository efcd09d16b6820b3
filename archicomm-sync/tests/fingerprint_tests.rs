use archicomm_model::{Annotation, Component, ComponentType, Connection, ConnectionType, DiagramSnapshot};
use archicomm_store::{denormalize, normalize, StoreConfig};
use archicomm_sync::{Fingerprint, SyncError};
use std::collections::HashMap;

fn snapshot() -> DiagramSnapshot {
    DiagramSnapshot {
        components: vec![
            Component::new("a", ComponentType::Client, "Browser")
                .with_property("zone", "public")
                .with_property("os", "any"),
            Component::new("b", ComponentType::Api, "API"),
        ],
        connections: vec![Connection::new("a-b", "a", "b", ConnectionType::Sync)],
        annotations: vec![Annotation::new("n", "TLS terminates here", 5.0, 5.0)],
    }
}

// ── Determinism ──────────────────────────────────────────────────

#[test]
fn equal_content_equal_fingerprint() {
    let first = snapshot();
    let second = snapshot();
    assert_eq!(Fingerprint::of_snapshot(&first), Fingerprint::of_snapshot(&second));
}

#[test]
fn fingerprint_is_hex_sha256() {
    let fp = Fingerprint::of_snapshot(&snapshot());
    assert_eq!(fp.as_str().len(), 64);
    assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!fp.is_fallback());
    assert_eq!(fp.to_string().len(), 12);
}

#[test]
fn property_insertion_order_does_not_matter() {
    let mut reordered = snapshot();
    reordered.components[0] = Component::new("a", ComponentType::Client, "Browser")
        .with_property("os", "any")
        .with_property("zone", "public");
    assert_eq!(Fingerprint::of_snapshot(&reordered), Fingerprint::of_snapshot(&snapshot()));
}

#[test]
fn content_change_changes_fingerprint() {
    let mut moved = snapshot();
    moved.annotations[0].position.x = 6.0;
    assert_ne!(Fingerprint::of_snapshot(&moved), Fingerprint::of_snapshot(&snapshot()));
}

#[test]
fn display_order_is_part_of_the_content() {
    let mut swapped = snapshot();
    swapped.components.swap(0, 1);
    assert_ne!(Fingerprint::of_snapshot(&swapped), Fingerprint::of_snapshot(&snapshot()));
}

#[test]
fn normalized_round_trip_keeps_fingerprint() {
    let original = snapshot();
    let state = normalize(&original, &StoreConfig::default()).state;
    assert_eq!(
        Fingerprint::of_snapshot(&denormalize(&state)),
        Fingerprint::of_snapshot(&original)
    );
}

// ── Fallback ─────────────────────────────────────────────────────

#[test]
fn unserializable_value_gets_fallback() {
    // JSON object keys must be strings; tuple keys fail to serialize.
    let mut grid: HashMap<(i32, i32), i32> = HashMap::new();
    grid.insert((1, 2), 3);

    assert!(matches!(Fingerprint::try_of(&grid), Err(SyncError::Serialization(_))));

    let first = Fingerprint::of(&grid);
    let second = Fingerprint::of(&grid);
    assert!(first.is_fallback());
    assert_ne!(first, second);
}

#[test]
fn fallback_never_matches_real_fingerprint() {
    let real = Fingerprint::of_snapshot(&DiagramSnapshot::new());
    let fallback = Fingerprint::fallback();
    assert_ne!(real, fallback);
    assert!(fallback.as_str().starts_with("fallback:"));
}
