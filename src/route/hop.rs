use chrono::TimeDelta;

use super::wire;
use super::{Node, Route};

/// Path on the route from an origin node to a destination node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Hop {
    #[serde(default)]
    pub origin: Node,
    #[serde(default)]
    pub destination: Node,
    #[serde(
        default = "TimeDelta::zero",
        with = "wire::duration_nanos",
        skip_serializing_if = "wire::is_zero_delta"
    )]
    pub duration: TimeDelta,
    #[serde(default, skip_serializing_if = "wire::is_zero_i64")]
    pub nanoseconds: i64,
    #[serde(default, skip_serializing_if = "wire::is_zero_f64")]
    pub seconds: f64,
}

impl Default for Hop {
    fn default() -> Self {
        Self {
            origin: Node::default(),
            destination: Node::default(),
            duration: TimeDelta::zero(),
            nanoseconds: 0,
            seconds: 0.0,
        }
    }
}

impl Hop {
    /// A hop between `origin` and `destination` with its duration already computed.
    pub fn between(origin: &Node, destination: &Node) -> Self {
        let mut hop = Self {
            origin: origin.clone(),
            destination: destination.clone(),
            ..Self::default()
        };
        hop.calculate_duration();
        hop
    }

    /// `destination.in - origin.out`. Negative values (clock skew) are kept as is; an
    /// unset stamp on either side yields zero.
    pub fn elapsed(origin: &Node, destination: &Node) -> TimeDelta {
        match (origin.time_out, destination.time_in) {
            (Some(out), Some(arrived)) => arrived - out,
            _ => TimeDelta::zero(),
        }
    }

    pub fn calculate_duration(&mut self) {
        self.duration = Self::elapsed(&self.origin, &self.destination);
        self.nanoseconds = wire::nanos_saturating(self.duration);
        self.seconds = self.nanoseconds as f64 / 1e9;
    }
}

impl Route {
    /// Sets `total` to the hop spanning the first node to the last one.
    pub fn calculate_total(&mut self) {
        if let (Some(first), Some(last)) = (self.nodes.first(), self.nodes.last()) {
            self.total = Hop::between(first, last);
        }
    }

    /// Sum of the seconds spent on every hop.
    ///
    /// Cached hop seconds are trusted unless they are exactly zero, in which case the
    /// hop is recomputed from its nodes. A hop that really took zero seconds is
    /// therefore always recomputed. The cache itself is left untouched.
    pub fn transit_time(&self) -> f64 {
        let mut total = 0.0;
        for (i, hop) in self.hops.iter().enumerate() {
            let seconds = if hop.seconds == 0.0 {
                let elapsed = Hop::elapsed(&hop.origin, &hop.destination);
                wire::nanos_saturating(elapsed) as f64 / 1e9
            } else {
                hop.seconds
            };
            tracing::debug!(
                hop = i,
                origin = %hop.origin.host.name,
                destination = %hop.destination.host.name,
                seconds,
                "hop transit"
            );
            total += seconds;
        }
        total
    }
}

#[cfg(test)]
#[path = "../../tests/unit/route/hop.rs"]
mod tests;
