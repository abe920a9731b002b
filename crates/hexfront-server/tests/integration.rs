//! Integration tests for the session layer.
//!
//! Drives full matches through the public `MatchSession` surface: order
//! submission, the readiness gate, synchronous resolution, and broadcast.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use hexfront_core::{load_rules, MatchConfig, RulesSource};
use hexfront_protocol::{wire, GameResult, Hex, Order, PlayerId, Snapshot, UnitId};
use hexfront_server::{
    protocol::{
        deserialize_client_message, deserialize_server_message, serialize_client_message,
        serialize_server_message, ClientMessage, ServerMessage,
    },
    Broadcaster, MatchSession, ServerConfig, SessionError, SubmitOutcome,
};

#[derive(Clone, Default)]
struct RecordingBroadcaster {
    snapshots: Arc<Mutex<Vec<Snapshot>>>,
    result: Arc<Mutex<Option<GameResult>>>,
}

impl Broadcaster for RecordingBroadcaster {
    fn turn_resolved(&mut self, snapshot: &Snapshot) {
        self.snapshots.lock().unwrap().push(snapshot.clone());
    }

    fn game_over(&mut self, result: &GameResult) {
        *self.result.lock().unwrap() = Some(result.clone());
    }
}

fn start_session(config: ServerConfig) -> (MatchSession, RecordingBroadcaster) {
    let rules = load_rules(RulesSource::Embedded).expect("rules load");
    let recorder = RecordingBroadcaster::default();
    let session = MatchSession::start(
        rules,
        &config,
        &["terran", "zerg"],
        Box::new(recorder.clone()),
    )
    .expect("session starts");
    (session, recorder)
}

fn action_id(session: &MatchSession, key: &str) -> hexfront_protocol::ActionId {
    session
        .catalog()
        .actions
        .iter()
        .find(|a| a.key == key)
        .unwrap_or_else(|| panic!("action {key} in catalog"))
        .id
}

fn units_of(snapshot: &Snapshot, player: PlayerId) -> Vec<UnitId> {
    snapshot
        .units
        .iter()
        .filter(|u| u.owner == player)
        .map(|u| u.id)
        .collect()
}

/// Submit one order per living unit; the last submission must close the gate.
fn submit_for_all(session: &MatchSession, orders: Vec<(PlayerId, Order)>) {
    let total = orders.len();
    for (index, (player, order)) in orders.into_iter().enumerate() {
        match session.submit_order(player, order) {
            SubmitOutcome::Accepted { turn_resolved } => {
                assert_eq!(turn_resolved, index + 1 == total, "order {index}");
            }
            SubmitOutcome::Rejected { reason } => panic!("order {index} rejected: {reason}"),
        }
    }
}

#[test]
fn full_turn_resolves_and_broadcasts() {
    let (session, recorder) = start_session(ServerConfig::default());
    let reload = action_id(&session, "reload");

    let snapshot = session.snapshot();
    assert_eq!(snapshot.turn, 1);
    assert_eq!(snapshot.units.len(), 6); // scv + 2 ifv vs 2 zerglings + queen
    assert!(!session.is_turn_ready());

    let orders: Vec<(PlayerId, Order)> = snapshot
        .units
        .iter()
        .map(|unit| (unit.owner, Order::new(unit.id, reload)))
        .collect();
    submit_for_all(&session, orders);

    let after = session.snapshot();
    assert_eq!(after.turn, 2);
    assert!(!after.effects.is_empty());
    assert!(session.result().is_none());

    let broadcasts = recorder.snapshots.lock().unwrap();
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(broadcasts[0].turn, 2);
}

#[test]
fn rejected_orders_leave_the_gate_closed() {
    let (session, recorder) = start_session(ServerConfig::default());
    let reload = action_id(&session, "reload");
    let snapshot = session.snapshot();

    let enemy_unit = units_of(&snapshot, PlayerId(1))[0];
    let outcome = session.submit_order(PlayerId(0), Order::new(enemy_unit, reload));
    match outcome {
        SubmitOutcome::Rejected { reason } => {
            assert!(reason.contains("belong"), "reason: {reason}")
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    assert!(!session.is_turn_ready());
    assert!(!session.resolve_turn());
    assert!(recorder.snapshots.lock().unwrap().is_empty());
}

#[test]
fn undersized_roster_is_refused() {
    let rules = load_rules(RulesSource::Embedded).expect("rules load");
    let result = MatchSession::start(
        rules,
        &ServerConfig::default(),
        &["terran"],
        Box::new(hexfront_server::NullBroadcaster),
    );
    assert!(matches!(
        result.err(),
        Some(SessionError::PlayerCount { got: 1, .. })
    ));
}

#[test]
fn resource_goal_finishes_the_match() {
    let config = ServerConfig {
        game: MatchConfig {
            resource_goals: BTreeMap::from([("gold".to_string(), 1)]),
            ..MatchConfig::default()
        },
        ..ServerConfig::default()
    };
    let (session, recorder) = start_session(config);
    let reload = action_id(&session, "reload");
    let fast_move = action_id(&session, "fast_move");
    let extract = action_id(&session, "extract_resource");

    let catalog = session.catalog();
    let zergling_type = catalog
        .unit_types
        .iter()
        .find(|t| t.key == "zergling")
        .unwrap()
        .id;

    let snapshot = session.snapshot();
    let digger = snapshot
        .units
        .iter()
        .find(|u| u.owner == PlayerId(1) && u.unit_type == zergling_type)
        .unwrap()
        .id;

    // Turn 1: the digger steps from the rim spawn onto the gold deposit at
    // (0, 2); everyone else rests.
    let orders: Vec<(PlayerId, Order)> = snapshot
        .units
        .iter()
        .map(|unit| {
            if unit.id == digger {
                (
                    unit.owner,
                    Order::with_path(
                        unit.id,
                        fast_move,
                        vec![Hex { q: 0, r: 3 }, Hex { q: 0, r: 2 }],
                    ),
                )
            } else {
                (unit.owner, Order::new(unit.id, reload))
            }
        })
        .collect();
    submit_for_all(&session, orders);
    assert!(session.result().is_none());

    // Turn 2: extracting a single gold meets the goal.
    let snapshot = session.snapshot();
    let orders: Vec<(PlayerId, Order)> = snapshot
        .units
        .iter()
        .map(|unit| {
            if unit.id == digger {
                (unit.owner, Order::new(unit.id, extract))
            } else {
                (unit.owner, Order::new(unit.id, reload))
            }
        })
        .collect();
    submit_for_all(&session, orders);

    let result = session.result().expect("match over");
    assert_eq!(result.winner, Some(PlayerId(1)));
    assert_eq!(
        recorder.result.lock().unwrap().as_ref().map(|r| r.winner),
        Some(Some(PlayerId(1)))
    );

    // No further orders once the match has ended.
    let outcome = session.submit_order(PlayerId(0), Order::new(units_of(&snapshot, PlayerId(0))[0], reload));
    assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
}

#[test]
fn message_serialization_roundtrip() {
    let (session, _) = start_session(ServerConfig::default());
    let reload = action_id(&session, "reload");
    let snapshot = session.snapshot();
    let unit = snapshot.units[0].id;

    let client = ClientMessage::SubmitOrder {
        order: Order::new(unit, reload),
    };
    let bytes = serialize_client_message(&client).unwrap();
    match deserialize_client_message(&bytes).unwrap() {
        ClientMessage::SubmitOrder { order } => {
            assert_eq!(order.unit, unit);
            assert_eq!(order.action, reload);
        }
        other => panic!("wrong message type: {other:?}"),
    }

    let checksum = wire::snapshot_hash(&snapshot).unwrap();
    assert_eq!(checksum, wire::snapshot_hash(&snapshot).unwrap());

    let decoded = wire::deserialize_snapshot(&wire::serialize_snapshot(&snapshot).unwrap()).unwrap();
    assert_eq!(decoded.turn, snapshot.turn);
    assert!(wire::snapshot_to_json(&snapshot).unwrap().contains("\"turn\""));

    let catalog = session.catalog();
    let decoded = wire::deserialize_catalog(&wire::serialize_catalog(&catalog).unwrap()).unwrap();
    assert_eq!(decoded.actions.len(), catalog.actions.len());

    let server = ServerMessage::TurnUpdate {
        snapshot: snapshot.clone(),
        checksum,
    };
    let bytes = serialize_server_message(&server).unwrap();
    match deserialize_server_message(&bytes).unwrap() {
        ServerMessage::TurnUpdate {
            snapshot: decoded,
            checksum: decoded_checksum,
        } => {
            assert_eq!(decoded.turn, snapshot.turn);
            assert_eq!(decoded.units.len(), snapshot.units.len());
            assert_eq!(decoded_checksum, checksum);
        }
        other => panic!("wrong message type: {other:?}"),
    }
}
