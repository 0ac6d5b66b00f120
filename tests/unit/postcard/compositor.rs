use rand::SeedableRng;
use rand::rngs::StdRng;

use super::*;
use crate::postcard::Bitmap;
use crate::route::{Host, Node};

fn filled(width: u32, height: u32, px: [u8; 4]) -> Bitmap {
    Bitmap {
        width,
        height,
        rgba8_premul: px.repeat((width * height) as usize),
    }
}

fn compositor() -> Compositor {
    let mut overlays = OverlaySet::new();
    overlays.insert("us-west1-a", filled(16, 16, [0, 0, 255, 255]));
    overlays.insert(MATTE, filled(40, 40, [255, 0, 0, 255]));
    Compositor::new(overlays, Arc::new(usvg::fontdb::Database::new()))
}

fn route_with_postcard() -> Route {
    let mut route = Route::new("compositor");
    let mut node = Node::new(Host::named("us-west1-a"));
    node.slot = 6;
    route.add_node(node);
    route.add_node(Node::new(Host::named("us-east4-a")));
    route
        .set_postcard(&filled(400, 720, [255, 255, 255, 255]))
        .unwrap();
    route
}

#[test]
fn stamp_lands_inside_the_slot_region() {
    let compositor = compositor();
    let mut route = route_with_postcard();
    let mut rng = StdRng::seed_from_u64(7);

    compositor
        .stamp_image(&mut route, "us-west1-a", &mut rng)
        .unwrap();

    let out = route.postcard_bitmap().unwrap();
    assert_eq!((out.width, out.height), (400, 720));

    let region = Boundary::for_slot(6).unwrap();
    let mut touched = 0;
    for y in 0..720i64 {
        for x in 0..400i64 {
            if out.pixel(x, y) != [255, 255, 255, 255] {
                touched += 1;
                assert!(x >= region.x_min && y >= region.y_min, "({x},{y})");
                assert!(x < region.x_max + 32 && y < region.y_max + 32, "({x},{y})");
            }
        }
    }
    assert!(touched > 0);
}

#[test]
fn stamp_for_unknown_overlay_is_asset_not_found() {
    let mut route = route_with_postcard();
    let before = route.postcard.clone();
    let err = compositor()
        .stamp_image(&mut route, "mars-north1-a", &mut StdRng::seed_from_u64(1))
        .unwrap_err();
    assert!(matches!(err, RelayError::AssetNotFound(_)));
    assert_eq!(route.postcard, before);
}

#[test]
fn stamp_for_host_outside_route_is_node_not_found() {
    let mut route = route_with_postcard();
    route.nodes.remove(0);
    let err = compositor()
        .stamp_image(&mut route, "us-west1-a", &mut StdRng::seed_from_u64(1))
        .unwrap_err();
    assert!(matches!(err, RelayError::NodeNotFound(_)));
}

#[test]
fn stamp_with_bad_payload_is_decode_failure() {
    let mut route = route_with_postcard();
    route.postcard = "bm90IGEgcG5n".to_string();
    let err = compositor()
        .stamp_image(&mut route, "us-west1-a", &mut StdRng::seed_from_u64(1))
        .unwrap_err();
    assert!(matches!(err, RelayError::DecodeFailure(_)));
}

#[test]
fn matte_is_drawn_at_origin_without_rotation() {
    let mut route = route_with_postcard();
    compositor().matte_image(&mut route).unwrap();

    let out = route.postcard_bitmap().unwrap();
    assert_eq!(out.pixel(0, 0), [255, 0, 0, 255]);
    assert_eq!(out.pixel(39, 39), [255, 0, 0, 255]);
    assert_eq!(out.pixel(40, 40), [255, 255, 255, 255]);
}

#[test]
fn last_stamp_without_fonts_keeps_postcard_intact() {
    let mut route = route_with_postcard();
    let before = route.postcard_bitmap().unwrap();
    compositor().last_stamp(&mut route).unwrap();
    assert_eq!(route.postcard_bitmap().unwrap(), before);
}

fn finished_route() -> Route {
    use chrono::{TimeDelta, TimeZone, Utc};

    use crate::route::Direction;

    let start = Utc.with_ymd_and_hms(2017, 12, 17, 1, 0, 0).unwrap();
    let mut route = Route::new("finished");
    for name in ["asia-east1-a", "us-west1-a", "southamerica-east1-a"] {
        route.add_node(Node::new(Host::named(name)));
    }
    for i in 0..3 {
        let at = start + TimeDelta::seconds(3 * i);
        route.stamp_at(Direction::In, at).unwrap();
        route.stamp_at(Direction::Out, at).unwrap();
    }
    route.calculate_hops();
    route.calculate_total();
    route
        .set_postcard(&filled(400, 720, [255, 255, 255, 255]))
        .unwrap();
    route
}

#[test]
fn summary_names_both_ends_and_the_transit_time() {
    let labels = summary_labels(&finished_route()).unwrap();
    let texts: Vec<_> = labels.iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        [
            "asia-east1-a",
            " - ",
            "southamerica-east1-a",
            "transferred in 6.000000 seconds ",
        ]
    );
    let xs: Vec<_> = labels.iter().map(|l| l.x).collect();
    assert_eq!(xs, [55.0, 100.0, 150.0, 300.0]);
    assert!(labels.iter().all(|l| l.y == LABEL_BASELINE));
}

#[test]
fn last_stamp_inks_the_bottom_of_the_postcard() {
    let fontdb = crate::postcard::load_fonts(None);
    if fontdb.len() == 0 {
        eprintln!("no system fonts, skipping label raster check");
        return;
    }
    let compositor = Compositor::new(OverlaySet::new(), fontdb);
    let mut route = finished_route();
    compositor.last_stamp(&mut route).unwrap();

    let out = route.postcard_bitmap().unwrap();
    let mut changed_rows = std::collections::BTreeSet::new();
    for y in 0..720i64 {
        for x in 0..400i64 {
            if out.pixel(x, y) != [255, 255, 255, 255] {
                changed_rows.insert(y);
            }
        }
    }
    assert!(!changed_rows.is_empty());
    assert!(
        changed_rows.iter().all(|y| (680..=705).contains(y)),
        "{changed_rows:?}"
    );
}

#[test]
fn last_stamp_needs_nodes() {
    let mut route = Route::new("empty");
    route
        .set_postcard(&filled(4, 4, [0, 0, 0, 255]))
        .unwrap();
    let err = compositor().last_stamp(&mut route).unwrap_err();
    assert!(matches!(err, RelayError::Validation(_)));
}
