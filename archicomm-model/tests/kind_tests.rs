use archicomm_model::{ComponentType, ConnectionType};
use std::str::FromStr;

// ── ComponentType ────────────────────────────────────────────────

#[test]
fn component_type_wire_names_are_kebab_case() {
    assert_eq!(ComponentType::LoadBalancer.as_str(), "load-balancer");
    assert_eq!(ComponentType::Server.to_string(), "server");
}

#[test]
fn component_type_parse_every_variant() {
    for t in ComponentType::ALL {
        assert_eq!(ComponentType::from_str(t.as_str()).unwrap(), t);
    }
}

#[test]
fn component_type_parse_unknown() {
    assert!(ComponentType::from_str("mainframe").is_err());
}

#[test]
fn component_type_serde_matches_as_str() {
    for t in ComponentType::ALL {
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, format!("\"{}\"", t.as_str()));
    }
}

#[test]
fn component_types_are_distinct() {
    let mut names: Vec<&str> = ComponentType::ALL.iter().map(|t| t.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), ComponentType::ALL.len());
}

// ── ConnectionType ───────────────────────────────────────────────

#[test]
fn connection_type_wire_names() {
    assert_eq!(ConnectionType::Sync.as_str(), "sync");
    assert_eq!(ConnectionType::Async.as_str(), "async");
    assert_eq!(ConnectionType::Data.as_str(), "data");
}

#[test]
fn connection_type_serde() {
    let json = serde_json::to_string(&ConnectionType::Async).unwrap();
    assert_eq!(json, "\"async\"");
    let back: ConnectionType = serde_json::from_str("\"data\"").unwrap();
    assert_eq!(back, ConnectionType::Data);
}

#[test]
fn connection_type_parse_unknown() {
    let err = ConnectionType::from_str("carrier-pigeon").unwrap_err();
    assert!(err.to_string().contains("carrier-pigeon"));
}
