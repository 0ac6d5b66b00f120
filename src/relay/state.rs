use std::fmt;

use rand::Rng;

use crate::foundation::error::RelayResult;
use crate::postcard::Compositor;
use crate::route::{Direction, Host, Route};

/// Where a hop stands within this host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HopState {
    Received,
    StampedIn,
    ImageStamped,
    StampedOut,
    /// Bookkeeping finished and the route still has hosts to visit.
    Forwarded,
    /// The last host stamped out; the circuit is closed.
    Completed,
}

impl fmt::Display for HopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Received => "received",
            Self::StampedIn => "stamped in",
            Self::ImageStamped => "image stamped",
            Self::StampedOut => "stamped out",
            Self::Forwarded => "forwarded",
            Self::Completed => "completed",
        })
    }
}

/// Outcome of [`advance`].
#[derive(Clone, Debug, PartialEq)]
pub struct HopReport {
    pub state: HopState,
    /// Index of the node this host stamped.
    pub node: usize,
    pub image_stamped: bool,
    /// Host the route goes to next; `None` once completed.
    pub next: Option<Host>,
}

/// Display form of a route id for log lines.
pub(crate) fn log_id(route: &Route) -> &str {
    if route.id.is_empty() { "NO ID" } else { &route.id }
}

fn enter(route: &Route, state: HopState) -> HopState {
    tracing::debug!(route_id = log_id(route), %state, "hop state");
    state
}

/// Runs the local part of a hop: stamp in, stamp the image, stamp out, rebuild hops and,
/// on the final host, total the circuit and write the summary label.
///
/// Only the timestamps are mandatory. Image failures are logged and the hop carries on.
pub fn advance<R: Rng + ?Sized>(
    route: &mut Route,
    host_name: &str,
    compositor: &Compositor,
    rng: &mut R,
) -> RelayResult<HopReport> {
    enter(route, HopState::Received);

    let node = route.stamp(Direction::In)?;
    enter(route, HopState::StampedIn);

    let image_stamped = match compositor.stamp_image(route, host_name, rng) {
        Ok(()) => {
            enter(route, HopState::ImageStamped);
            true
        }
        Err(e) => {
            tracing::warn!(route_id = log_id(route), host = host_name, error = %e, "could not stamp image");
            false
        }
    };

    route.stamp(Direction::Out)?;
    enter(route, HopState::StampedOut);
    route.calculate_hops();

    if route.is_done() {
        route.calculate_total();
        if let Err(e) = compositor.last_stamp(route) {
            tracing::warn!(route_id = log_id(route), error = %e, "could not write summary label");
        }
        tracing::info!(
            route_id = log_id(route),
            seconds = route.total.seconds,
            "circuit completed"
        );
        return Ok(HopReport {
            state: enter(route, HopState::Completed),
            node,
            image_stamped,
            next: None,
        });
    }

    let next = route.next().cloned();
    Ok(HopReport {
        state: enter(route, HopState::Forwarded),
        node,
        image_stamped,
        next,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/relay/state.rs"]
mod tests;
