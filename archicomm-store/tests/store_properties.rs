use archicomm_model::{
    Annotation, AnnotationPatch, Component, ComponentPatch, ComponentType, Connection,
    ConnectionPatch, ConnectionType, DiagramSnapshot, Position,
};
use archicomm_store::{denormalize, normalize, validate_integrity, NormalizedState, StoreConfig};
use archicomm_types::EntityId;
use proptest::prelude::*;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
enum Op {
    AddComponent { id: u8, kind: usize, layer: Option<u8> },
    AddConnection { id: u8, from: u8, to: u8, kind: usize },
    AddAnnotation { id: u8, x: f64, y: f64 },
    RetypeComponent { id: u8, kind: usize, layer: Option<u8> },
    RewireConnection { id: u8, from: u8, to: u8 },
    MoveAnnotation { id: u8, x: f64, y: f64 },
    Remove { id: String },
}

fn component_id(n: u8) -> String {
    format!("c{n}")
}

fn connection_id(n: u8) -> String {
    format!("e{n}")
}

fn annotation_id(n: u8) -> String {
    format!("n{n}")
}

fn op() -> impl Strategy<Value = Op> {
    let coord = -500.0f64..500.0;
    prop_oneof![
        (0u8..6, 0usize..ComponentType::ALL.len(), proptest::option::of(0u8..3))
            .prop_map(|(id, kind, layer)| Op::AddComponent { id, kind, layer }),
        (0u8..6, 0u8..6, 0u8..6, 0usize..3)
            .prop_map(|(id, from, to, kind)| Op::AddConnection { id, from, to, kind }),
        (0u8..6, coord.clone(), coord.clone()).prop_map(|(id, x, y)| Op::AddAnnotation { id, x, y }),
        (0u8..6, 0usize..ComponentType::ALL.len(), proptest::option::of(0u8..3))
            .prop_map(|(id, kind, layer)| Op::RetypeComponent { id, kind, layer }),
        (0u8..6, 0u8..6, 0u8..6).prop_map(|(id, from, to)| Op::RewireConnection { id, from, to }),
        (0u8..6, coord.clone(), coord).prop_map(|(id, x, y)| Op::MoveAnnotation { id, x, y }),
        prop_oneof![
            (0u8..6).prop_map(component_id),
            (0u8..6).prop_map(connection_id),
            (0u8..6).prop_map(annotation_id),
        ]
        .prop_map(|id| Op::Remove { id }),
    ]
}

const CONNECTION_TYPES: [ConnectionType; 3] =
    [ConnectionType::Sync, ConnectionType::Async, ConnectionType::Data];

fn apply(state: &NormalizedState, op: Op) -> NormalizedState {
    let result = match op {
        Op::AddComponent { id, kind, layer } => {
            let mut c = Component::new(component_id(id), ComponentType::ALL[kind], "c");
            if let Some(layer) = layer {
                c = c.on_layer(format!("layer-{layer}"));
            }
            state.add_component(c)
        }
        Op::AddConnection { id, from, to, kind } => state.add_connection(Connection::new(
            connection_id(id),
            component_id(from),
            component_id(to),
            CONNECTION_TYPES[kind],
        )),
        Op::AddAnnotation { id, x, y } => {
            state.add_annotation(Annotation::new(annotation_id(id), "note", x, y))
        }
        Op::RetypeComponent { id, kind, layer } => state.update_entity(
            &component_id(id),
            ComponentPatch {
                component_type: Some(ComponentType::ALL[kind]),
                layer_id: Some(layer.map(|l| format!("layer-{l}"))),
                ..ComponentPatch::default()
            },
        ),
        Op::RewireConnection { id, from, to } => state.update_entity(
            &connection_id(id),
            ConnectionPatch {
                from: Some(EntityId::new(component_id(from))),
                to: Some(EntityId::new(component_id(to))),
                ..ConnectionPatch::default()
            },
        ),
        Op::MoveAnnotation { id, x, y } => state.update_entity(
            &annotation_id(id),
            AnnotationPatch {
                position: Some(Position::new(x, y)),
                ..AnnotationPatch::default()
            },
        ),
        Op::Remove { id } => state.remove_entity(&id),
    };
    result.state
}

proptest! {
    #[test]
    fn operation_sequences_keep_integrity(ops in proptest::collection::vec(op(), 0..60)) {
        let mut state = NormalizedState::default();
        for op in ops {
            let before = state.clone();
            state = apply(&state, op);
            let report = validate_integrity(&state);
            prop_assert!(report.valid, "{:?}", report.errors);
            // Older versions never change underneath their holders.
            prop_assert!(validate_integrity(&before).valid);
        }
    }

    #[test]
    fn index_members_match_their_discriminant(ops in proptest::collection::vec(op(), 0..40)) {
        let mut state = NormalizedState::default();
        for op in ops {
            state = apply(&state, op);
        }
        for (kind, ids) in state.components_by_type().buckets() {
            for id in ids {
                prop_assert_eq!(state.component(id.as_str()).map(|c| c.component_type), Some(*kind));
            }
        }
        for (source, ids) in state.connections_by_source().buckets() {
            for id in ids {
                prop_assert_eq!(state.connection(id.as_str()).map(|c| &c.from), Some(source));
            }
        }
    }

    #[test]
    fn denormalize_normalize_round_trips(ops in proptest::collection::vec(op(), 0..40)) {
        let mut state = NormalizedState::default();
        for op in ops {
            state = apply(&state, op);
        }
        let snapshot: DiagramSnapshot = denormalize(&state);
        let again = normalize(&snapshot, &StoreConfig::default());
        prop_assert!(again.issues.is_empty());
        prop_assert_eq!(denormalize(&again.state), snapshot);
    }

    #[test]
    fn cascade_removes_exactly_the_touching_connections(ops in proptest::collection::vec(op(), 0..40), victim in 0u8..6) {
        let mut state = NormalizedState::default();
        for op in ops {
            state = apply(&state, op);
        }
        let victim = component_id(victim);
        let touching: BTreeSet<EntityId> = state
            .connections()
            .iter()
            .filter(|c| c.from.as_str() == victim || c.to.as_str() == victim)
            .map(|c| c.id.clone())
            .collect();
        let before: BTreeSet<EntityId> = state.connections().ids().iter().cloned().collect();

        let after = state.remove_entity(&victim).state;
        let remaining: BTreeSet<EntityId> = after.connections().ids().iter().cloned().collect();
        let expected: BTreeSet<EntityId> = before.difference(&touching).cloned().collect();
        prop_assert_eq!(remaining, expected);
    }
}
