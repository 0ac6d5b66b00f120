//! The route document passed from host to host.
//!
//! A [`Route`] carries the ring of [`Node`]s in traversal order, the derived [`Hop`]s
//! between them and the postcard payload. Every host decodes its own copy, stamps the
//! first node that still needs stamping and hands the document on. No host needs to
//! know its own position in the ring: the "first unset node" scan is the position.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::foundation::error::{RelayError, RelayResult};

pub(crate) mod hop;
pub(crate) mod order;
pub(crate) mod wire;

pub use hop::Hop;
pub use order::{CANONICAL_ORDER, SLOT_COUNT, random_float, random_int};

/// Length of identifiers produced by [`Route::new_id`] when none is supplied.
pub const DEFAULT_ID_LEN: usize = 32;

const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Networking endpoints of a single machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Host {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub private: String,
}

impl Host {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A stop along the route.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Node {
    #[serde(default)]
    pub host: Host,
    #[serde(
        rename = "in",
        default,
        with = "wire::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_in: Option<DateTime<Utc>>,
    #[serde(
        rename = "out",
        default,
        with = "wire::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_out: Option<DateTime<Utc>>,
    /// Placement region for this node's stamp, in `[0, SLOT_COUNT)`.
    #[serde(default, skip_serializing_if = "wire::is_zero_usize")]
    pub slot: usize,
}

impl Node {
    pub fn new(host: Host) -> Self {
        Self {
            host,
            ..Self::default()
        }
    }

    pub fn stamp_of(&self, direction: Direction) -> Option<DateTime<Utc>> {
        match direction {
            Direction::In => self.time_in,
            Direction::Out => self.time_out,
        }
    }

    fn stamp_mut(&mut self, direction: Direction) -> &mut Option<DateTime<Utc>> {
        match direction {
            Direction::In => &mut self.time_in,
            Direction::Out => &mut self.time_out,
        }
    }

    /// True once the route has passed through this node (both stamps set).
    pub fn is_done(&self) -> bool {
        self.time_in.is_some() && self.time_out.is_some()
    }
}

/// Which timestamp [`Route::stamp`] records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl FromStr for Direction {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(RelayError::NoOperationSelected),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::In => "in",
            Self::Out => "out",
        })
    }
}

/// The path being passed through the network.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Route {
    #[serde(rename = "ID", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hops: Vec<Hop>,
    #[serde(default)]
    pub total: Hop,
    /// Base64 encoded PNG.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub postcard: String,
    #[serde(rename = "allnodes", default, skip_serializing_if = "Vec::is_empty")]
    pub all_nodes: Vec<Node>,
    #[serde(rename = "allhops", default, skip_serializing_if = "Vec::is_empty")]
    pub all_hops: Vec<Hop>,
    #[serde(
        rename = "lastupdate",
        default,
        with = "wire::timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_update: Option<DateTime<Utc>>,
}

impl Route {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Random alphabetic identifier of length `n`.
    pub fn new_id<R: Rng + ?Sized>(rng: &mut R, n: usize) -> String {
        (0..n)
            .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
            .collect()
    }

    /// Appends `node`, and the hop linking it to the previous node if there is one.
    pub fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
        if let [.., origin, destination] = self.nodes.as_slice() {
            let hop = Hop::between(origin, destination);
            self.hops.push(hop);
        }
    }

    /// Index of the node hosted by `name`, or `nodes.len()` when no node matches.
    pub fn current_node(&self, name: &str) -> usize {
        self.nodes
            .iter()
            .position(|n| n.host.name == name)
            .unwrap_or(self.nodes.len())
    }

    /// Host the route must be relayed to next: the first node not yet stamped in.
    pub fn next(&self) -> Option<&Host> {
        self.nodes
            .iter()
            .find(|n| n.time_in.is_none())
            .map(|n| &n.host)
    }

    pub fn stamp(&mut self, direction: Direction) -> RelayResult<usize> {
        self.stamp_at(direction, Utc::now())
    }

    /// Records `now` on the first node missing the `direction` timestamp and returns
    /// its index.
    pub fn stamp_at(&mut self, direction: Direction, now: DateTime<Utc>) -> RelayResult<usize> {
        let idx = self
            .nodes
            .iter()
            .position(|n| n.stamp_of(direction).is_none())
            .ok_or(RelayError::NoMoreToStamp)?;
        *self.nodes[idx].stamp_mut(direction) = Some(now);

        if direction == Direction::In {
            self.last_update = Some(now);
        }
        Ok(idx)
    }

    /// True when every node has been stamped out.
    pub fn is_done(&self) -> bool {
        self.nodes.iter().all(|n| n.time_out.is_some())
    }

    /// True until the first node has been passed through.
    pub fn just_started(&self) -> bool {
        self.nodes.first().is_none_or(|n| !n.is_done())
    }

    /// Rebuilds `hops` from adjacent pairs whose nodes are both done.
    ///
    /// Pairs still in flight are skipped, so the result reports completed hops only.
    pub fn calculate_hops(&mut self) {
        self.hops = self
            .nodes
            .windows(2)
            .filter(|pair| pair[0].is_done() && pair[1].is_done())
            .map(|pair| Hop::between(&pair[0], &pair[1]))
            .collect();
    }

    /// Rebuilds `hops` from every adjacent pair, done or not.
    pub fn update_hops(&mut self) {
        self.hops = hops_for(&self.nodes);
    }

    /// Rebuilds `all_hops` from the `all_nodes` shadow topology.
    pub fn convert_all_nodes_to_hops(&mut self) {
        self.all_hops = hops_for(&self.all_nodes);
    }

    /// Copies the live topology into the shadow collections kept for display.
    pub fn snapshot_topology(&mut self) {
        self.all_nodes = self.nodes.clone();
        self.convert_all_nodes_to_hops();
    }
}

fn hops_for(nodes: &[Node]) -> Vec<Hop> {
    nodes
        .windows(2)
        .map(|pair| Hop::between(&pair[0], &pair[1]))
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/route/model.rs"]
mod tests;
