//! Ordering engine: canonical ring order, display slots and shuffling.

use rand::Rng;
use rand::seq::SliceRandom;

use super::{Node, Route};
use crate::foundation::error::{RelayError, RelayResult};

/// The published ring, in traversal order.
pub const CANONICAL_ORDER: [&str; 9] = [
    "asia-east1-a",
    "asia-northeast1-a",
    "australia-southeast1-a",
    "us-west1-a",
    "us-central1-f",
    "us-east4-a",
    "europe-west2-b",
    "europe-west3-a",
    "southamerica-east1-a",
];

/// Number of stamp placement regions on the postcard.
pub const SLOT_COUNT: usize = 9;

/// Uniform integer in `[min, max)`; `min` when the range is empty.
pub fn random_int<R: Rng + ?Sized>(rng: &mut R, min: i64, max: i64) -> i64 {
    if (min..max).is_empty() {
        return min;
    }
    rng.gen_range(min..max)
}

/// Uniform float in `[min, max)`; `min` when the range is empty.
pub fn random_float<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    if (min..max).is_empty() {
        return min;
    }
    rng.gen_range(min..max)
}

impl Route {
    /// Arranges the nodes in [`CANONICAL_ORDER`] and hands each one a distinct random
    /// slot, then rebuilds every hop.
    ///
    /// Fails without touching the route when a canonical location is missing. Nodes
    /// outside the canonical ring are dropped.
    pub fn order<R: Rng + ?Sized>(&mut self, rng: &mut R) -> RelayResult<()> {
        let mut slots: Vec<usize> = (0..SLOT_COUNT).collect();
        slots.shuffle(rng);

        let mut nodes = Vec::with_capacity(CANONICAL_ORDER.len());
        for (name, slot) in CANONICAL_ORDER.iter().zip(slots) {
            let node = self
                .nodes
                .iter()
                .find(|n| n.host.name == *name)
                .ok_or_else(|| {
                    RelayError::node_not_found(format!("input node ({name}) was not found in route"))
                })?;
            nodes.push(Node {
                slot,
                ..node.clone()
            });
        }

        self.nodes = nodes;
        self.update_hops();
        Ok(())
    }

    /// Reorders the nodes into a uniformly random permutation and rebuilds every hop.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.nodes.shuffle(rng);
        self.update_hops();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/route/order.rs"]
mod tests;
