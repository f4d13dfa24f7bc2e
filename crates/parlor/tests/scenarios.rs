//! End-to-end scenarios: a Host and its Players over the in-memory broker,
//! driven only through the prelude.

use parlor::logging;
use parlor::prelude::*;
use serde_json::json;

/// Counts notifications on either side.
#[derive(Debug, Default)]
struct Tally {
    opens: usize,
    closes: usize,
    data: Vec<Payload>,
    errors: usize,
}

impl<L> SessionHooks<L> for Tally {
    fn on_open(&mut self, _: &mut L, _: Peer<'_>) {
        self.opens += 1;
    }

    fn on_data(&mut self, _: &mut L, _: Peer<'_>, data: Payload) {
        self.data.push(data);
    }

    fn on_close(&mut self, _: &mut L, _: Peer<'_>) {
        self.closes += 1;
    }

    fn on_connection_error(&mut self, _: &mut L, _: Peer<'_>, _: &TransportError) {
        self.errors += 1;
    }
}

type Host = HostSession<MemoryClient, Tally>;
type Player = PlayerSession<MemoryClient, Tally>;

fn start_host(network: &MemoryNetwork) -> Host {
    logging::init_for_tests();
    HostSessionBuilder::new()
        .build(network, Tally::default())
        .unwrap()
}

fn join(network: &MemoryNetwork, host: &Host) -> Player {
    PlayerSessionBuilder::new(host.room_code().clone())
        .build(network, Tally::default())
        .unwrap()
}

/// Polls until every session is idle.
fn settle(host: &mut Host, players: &mut [&mut Player]) {
    while host.poll() + players.iter_mut().map(|p| p.poll()).sum::<usize>() > 0 {}
}

fn totals(host: &Host, players: &[&Player]) -> (usize, usize, usize) {
    let sides = std::iter::once(host.hooks()).chain(players.iter().map(|p| p.hooks()));
    sides.fold((0, 0, 0), |(o, c, d), t| (o + t.opens, c + t.closes, d + t.data.len()))
}

// =========================================================================
// Scenario 1: a new Host
// =========================================================================

#[test]
fn test_new_host_has_six_letter_room_code_and_empty_registry() {
    let network = MemoryNetwork::new();
    let host = start_host(&network);

    let code = host.room_code().as_str();
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| b.is_ascii_uppercase()));
    assert!(host.registry().is_empty());
    assert_eq!(host.address().as_str(), format!("Host{code}"));
}

// =========================================================================
// Scenario 2: a Player dials once on Ready
// =========================================================================

#[test]
fn test_player_dials_host_once_with_fresh_identity() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut player = join(&network, &host);
    assert_eq!(player.connect_attempts(), 0);

    settle(&mut host, &mut [&mut player]);

    assert_eq!(player.connect_attempts(), 1);
    assert_eq!(player.host_address(), host.address());

    let identity = player.identity().as_str();
    assert_eq!(identity.len(), 10);
    assert!(identity.bytes().all(|b| b.is_ascii_uppercase()));

    let conn = host.registry().get(identity).unwrap();
    assert_eq!(conn.metadata(), &json!({ "playerId": identity }));
    assert_eq!(conn.remote(), player.address());
}

// =========================================================================
// Scenario 3: both sides open
// =========================================================================

#[test]
fn test_open_registers_one_entry_and_fires_open_once_each_side() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut player = join(&network, &host);

    settle(&mut host, &mut [&mut player]);

    assert_eq!(host.registry().len(), 1);
    assert!(host.registry().contains(player.identity().as_str()));
    assert_eq!(host.hooks().opens, 1);
    assert_eq!(player.hooks().opens, 1);
    assert!(player.send_host(json!({ "type": "action" })));
}

// =========================================================================
// Scenario 4: the same identity connects again
// =========================================================================

#[test]
fn test_replacement_process_with_same_identity_supersedes_first() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut first = join(&network, &host);
    settle(&mut host, &mut [&mut first]);

    let identity = first.identity().clone();
    let first_conn = host.registry().get(identity.as_str()).unwrap().id();

    // The first process goes away without closing; a new one takes its
    // identity and address.
    drop(first);
    let mut second = PlayerSessionBuilder::new(host.room_code().clone())
        .identity(identity.clone())
        .build(&network, Tally::default())
        .unwrap();
    settle(&mut host, &mut [&mut second]);

    assert_eq!(host.registry().len(), 1);
    let current = host.registry().get(identity.as_str()).unwrap();
    assert_ne!(current.id(), first_conn);
    assert_eq!(host.hooks().opens, 2);
    assert_eq!(host.hooks().closes, 1, "close hook for the first connection");
    assert!(second.is_connected());
}

// =========================================================================
// Scenario 5: sending to nobody
// =========================================================================

#[test]
fn test_send_to_unknown_identity_is_false_and_silent() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut player = join(&network, &host);
    settle(&mut host, &mut [&mut player]);
    let before = totals(&host, &[&player]);

    assert!(!host.send("unknown-id", json!({ "type": "state" })));
    assert!(!host.send("", Payload::Null));
    settle(&mut host, &mut [&mut player]);

    assert_eq!(totals(&host, &[&player]), before);
}

// =========================================================================
// Scenario 6: close everyone
// =========================================================================

#[test]
fn test_close_all_then_send_fails_for_every_former_player() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut a = join(&network, &host);
    let mut b = join(&network, &host);
    let mut c = join(&network, &host);
    settle(&mut host, &mut [&mut a, &mut b, &mut c]);
    let ids: Vec<PlayerIdentity> = host.registry().identities().cloned().collect();
    assert_eq!(ids.len(), 3);

    host.close_all();

    for id in &ids {
        assert!(!host.send(id.as_str(), json!({ "type": "end" })));
    }
    settle(&mut host, &mut [&mut a, &mut b, &mut c]);
    assert!(host.registry().is_empty());
    assert_eq!(host.hooks().closes, 3);
    assert!([&a, &b, &c].iter().all(|p| !p.is_connected()));
}

#[test]
fn test_close_all_on_empty_host_is_noop() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);

    host.close_all();
    host.close_all();

    assert!(host.registry().is_empty());
    assert!(network.is_bound(host.address()));
}

// =========================================================================
// Envelopes and async driving
// =========================================================================

#[test]
fn test_envelopes_round_trip_between_player_and_host() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut player = join(&network, &host);
    settle(&mut host, &mut [&mut player]);

    let action = Envelope::new(Envelope::ACTION, json!({ "row": 1, "col": 2 }));
    assert!(player.send_host(action.to_payload().unwrap()));
    let state = Envelope::new(Envelope::STATE, json!({ "turn": 1 }));
    assert_eq!(host.broadcast(&state.to_payload().unwrap()), 1);
    settle(&mut host, &mut [&mut player]);

    let received = Envelope::from_payload(&host.hooks().data[0]).unwrap();
    assert_eq!(received, action);
    let received = Envelope::from_payload(&player.hooks().data[0]).unwrap();
    assert!(received.is(Envelope::STATE));
}

#[tokio::test]
async fn test_run_drains_remaining_events_after_shutdown() {
    let network = MemoryNetwork::new();
    let mut host = start_host(&network);
    let mut player = join(&network, &host);
    settle(&mut host, &mut [&mut player]);

    for n in 0..3 {
        assert!(player.send_host(json!(n)));
    }
    network.shutdown();

    host.run().await;

    assert_eq!(host.hooks().data, vec![json!(0), json!(1), json!(2)]);
}
