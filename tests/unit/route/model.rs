use chrono::{TimeZone, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;

fn ring(names: &[&str]) -> Route {
    let mut r = Route::new(Route::new_id(&mut StdRng::from_entropy(), DEFAULT_ID_LEN));
    for name in names {
        r.add_node(Node::new(Host::named(*name)));
    }
    r
}

fn at(sec: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 12, 17, 1, 0, sec).unwrap()
}

#[test]
fn add_node_links_each_new_node_to_the_previous_one() {
    let r = ring(&CANONICAL_ORDER);
    assert_eq!(r.hops.len(), CANONICAL_ORDER.len() - 1);
    for (i, hop) in r.hops.iter().enumerate() {
        assert_eq!(hop.origin.host.name, CANONICAL_ORDER[i]);
        assert_eq!(hop.destination.host.name, CANONICAL_ORDER[i + 1]);
    }
}

#[test]
fn first_node_adds_no_hop() {
    let r = ring(&["solo"]);
    assert_eq!(r.nodes.len(), 1);
    assert!(r.hops.is_empty());
}

#[test]
fn new_id_is_alphabetic_with_requested_length() {
    let id = Route::new_id(&mut StdRng::from_entropy(), DEFAULT_ID_LEN);
    assert_eq!(id.len(), DEFAULT_ID_LEN);
    assert!(id.chars().all(|c| c.is_ascii_alphabetic()));
}

#[test]
fn current_node_missing_name_is_one_past_the_end() {
    let r = ring(&["a", "b", "c"]);
    assert_eq!(r.current_node("a"), 0);
    assert_eq!(r.current_node("c"), 2);
    assert_eq!(r.current_node("nowhere"), r.nodes.len());
}

#[test]
fn stamp_in_advances_to_the_next_unstamped_node() {
    let mut r = ring(&["a", "b", "c"]);
    assert_eq!(r.stamp(Direction::In).unwrap(), 0);
    assert_eq!(r.stamp(Direction::In).unwrap(), 1);
    assert_eq!(r.stamp(Direction::In).unwrap(), 2);
    assert!(r.nodes.iter().all(|n| n.time_in.is_some()));
    assert!(matches!(
        r.stamp(Direction::In),
        Err(RelayError::NoMoreToStamp)
    ));
}

#[test]
fn stamp_out_fills_first_missing_out() {
    let mut r = ring(&["a", "b"]);
    r.stamp(Direction::In).unwrap();
    assert_eq!(r.stamp(Direction::Out).unwrap(), 0);
    assert!(r.nodes[0].is_done());
    assert!(r.nodes[1].time_out.is_none());
}

#[test]
fn stamp_in_touches_last_update_but_stamp_out_does_not() {
    let mut r = ring(&["a", "b"]);
    r.stamp_at(Direction::In, at(1)).unwrap();
    assert_eq!(r.last_update, Some(at(1)));
    r.stamp_at(Direction::Out, at(2)).unwrap();
    assert_eq!(r.last_update, Some(at(1)));
}

#[test]
fn direction_parse_rejects_empty_and_unknown() {
    assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
    assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
    assert!(matches!(
        "".parse::<Direction>(),
        Err(RelayError::NoOperationSelected)
    ));
    assert!(matches!(
        "sideways".parse::<Direction>(),
        Err(RelayError::NoOperationSelected)
    ));
    assert_eq!(Direction::Out.to_string(), "out");
}

#[test]
fn next_is_first_node_without_in() {
    let mut r = ring(&["a", "b"]);
    r.nodes[0].host.private = "10.0.0.1".to_string();
    r.nodes[1].host.private = "10.0.0.2".to_string();
    assert_eq!(r.next().unwrap().private, "10.0.0.1");
    r.stamp(Direction::In).unwrap();
    assert_eq!(r.next().unwrap().private, "10.0.0.2");
    r.stamp(Direction::In).unwrap();
    assert!(r.next().is_none());
}

#[test]
fn done_and_just_started_over_partial_states() {
    let mut r = ring(&["a", "b"]);
    assert!(!r.is_done());
    assert!(r.just_started());

    r.stamp_at(Direction::In, at(1)).unwrap();
    assert!(!r.is_done());
    assert!(r.just_started());

    r.stamp_at(Direction::Out, at(2)).unwrap();
    assert!(!r.is_done());
    assert!(!r.just_started());

    r.stamp_at(Direction::In, at(3)).unwrap();
    assert!(!r.is_done());

    r.stamp_at(Direction::Out, at(4)).unwrap();
    assert!(r.is_done());
    assert!(!r.just_started());
}

#[test]
fn done_ignores_in_stamps() {
    let mut r = ring(&["a", "b"]);
    r.nodes[0].time_out = Some(at(1));
    r.nodes[1].time_out = Some(at(2));
    assert!(r.is_done());
}

#[test]
fn calculate_hops_keeps_only_completed_pairs() {
    let mut r = ring(&["a", "b", "c"]);
    r.nodes[0].time_in = Some(at(1));
    r.nodes[0].time_out = Some(at(2));
    r.nodes[1].time_in = Some(at(4));
    r.nodes[1].time_out = Some(at(5));
    r.nodes[2].time_in = Some(at(7));

    r.calculate_hops();
    assert_eq!(r.hops.len(), 1);
    assert_eq!(r.hops[0].origin.host.name, "a");
    assert_eq!(r.hops[0].seconds, 2.0);

    r.update_hops();
    assert_eq!(r.hops.len(), 2);
    assert_eq!(r.hops[1].seconds, 2.0);
}

#[test]
fn snapshot_topology_fills_shadow_collections() {
    let mut r = ring(&["a", "b", "c", "d", "e", "f", "g", "h"]);
    r.snapshot_topology();
    assert_eq!(r.all_nodes.len(), 8);
    assert_eq!(r.all_hops.len(), 7);

    r.nodes.truncate(2);
    r.update_hops();
    assert_eq!(r.all_hops.len(), 7);
}

#[test]
fn json_uses_transport_field_names() {
    let mut r = ring(&["a", "b"]);
    r.stamp_at(Direction::In, at(1)).unwrap();
    r.snapshot_topology();
    let v = serde_json::to_value(&r).unwrap();

    assert!(v.get("ID").is_some());
    assert!(v.get("allnodes").is_some());
    assert!(v.get("allhops").is_some());
    assert!(v.get("lastupdate").is_some());
    assert!(v["nodes"][0].get("in").is_some());
    assert!(v["nodes"][0].get("out").is_none());
    assert_eq!(v["nodes"][1]["host"]["name"], "b");
}

#[test]
fn zero_time_from_older_peers_reads_as_unset() {
    let raw = r#"{
        "ID": "abc",
        "nodes": [
            {"host": {"name": "a"}, "in": "0001-01-01T00:00:00Z", "out": "0001-01-01T00:00:00Z"},
            {"host": {"name": "b"}, "in": "2017-12-17T01:00:01Z", "slot": 4}
        ]
    }"#;
    let r: Route = serde_json::from_str(raw).unwrap();
    assert!(r.nodes[0].time_in.is_none());
    assert!(r.nodes[0].time_out.is_none());
    assert_eq!(r.nodes[1].time_in, Some(at(1)));
    assert_eq!(r.nodes[1].slot, 4);
    assert_eq!(r.next().unwrap().name, "a");
}

#[test]
fn json_roundtrip_preserves_stamps() {
    let mut r = ring(&["a", "b"]);
    r.stamp_at(Direction::In, at(1)).unwrap();
    r.stamp_at(Direction::Out, at(2)).unwrap();
    r.update_hops();
    let s = serde_json::to_string(&r).unwrap();
    let de: Route = serde_json::from_str(&s).unwrap();
    assert_eq!(de, r);
}
