use std::sync::Arc;

use rand::Rng;

use super::boundary::Boundary;
use super::composite::{blit_over, over_in_place};
use super::label::{Label, LabelStyle, rasterize_labels};
use super::overlays::{MATTE, OverlaySet};
use super::rotate::rotate;
use crate::foundation::error::{RelayError, RelayResult};
use crate::route::{Route, random_float};

/// Largest tilt, in degrees, applied to a stamp either way.
pub const MAX_STAMP_TILT: f64 = 45.0;

/// Baseline of the summary label written by [`Compositor::last_stamp`].
const LABEL_BASELINE: f32 = 700.0;

/// Draws stamps, the matte and the summary label onto route payloads.
///
/// Only the `postcard` field of a route is ever written.
#[derive(Clone, Debug)]
pub struct Compositor {
    overlays: OverlaySet,
    fontdb: Arc<usvg::fontdb::Database>,
}

impl Compositor {
    pub fn new(overlays: OverlaySet, fontdb: Arc<usvg::fontdb::Database>) -> Self {
        Self { overlays, fontdb }
    }

    pub fn overlays(&self) -> &OverlaySet {
        &self.overlays
    }

    /// Stamps the overlay named after `host_name` onto the postcard, tilted at random and
    /// dropped somewhere inside the region of that host's slot.
    pub fn stamp_image<R: Rng + ?Sized>(
        &self,
        route: &mut Route,
        host_name: &str,
        rng: &mut R,
    ) -> RelayResult<()> {
        let stamp = self.overlays.get(host_name)?;
        let tilted = rotate(stamp, random_float(rng, -MAX_STAMP_TILT, MAX_STAMP_TILT));

        let mut postcard = route.postcard_bitmap()?;

        let node = route
            .nodes
            .get(route.current_node(host_name))
            .ok_or_else(|| RelayError::node_not_found(host_name))?;
        let boundary = Boundary::for_slot(node.slot).ok_or_else(|| {
            RelayError::validation(format!("no placement region for slot {}", node.slot))
        })?;
        let (x, y) = boundary.place(rng);

        blit_over(&mut postcard, &tilted, x, y);
        route.set_postcard(&postcard)
    }

    /// Lays the matte over the whole postcard, anchored at the top-left corner.
    pub fn matte_image(&self, route: &mut Route) -> RelayResult<()> {
        let matte = self.overlays.get(MATTE)?;
        let mut postcard = route.postcard_bitmap()?;
        blit_over(&mut postcard, matte, 0, 0);
        route.set_postcard(&postcard)
    }

    /// Writes "<first> - <last> transferred in <n> seconds" along the bottom of the
    /// postcard. Meant for the hop that completes the circuit.
    pub fn last_stamp(&self, route: &mut Route) -> RelayResult<()> {
        let labels = summary_labels(route)?;

        let mut postcard = route.postcard_bitmap()?;
        let layer = rasterize_labels(
            postcard.width,
            postcard.height,
            &labels,
            &LabelStyle::default(),
            Arc::clone(&self.fontdb),
        )?;
        over_in_place(&mut postcard.rgba8_premul, &layer, 1.0)?;
        route.set_postcard(&postcard)
    }
}

/// The four fragments of the closing label, laid out along [`LABEL_BASELINE`].
pub(crate) fn summary_labels(route: &Route) -> RelayResult<Vec<Label>> {
    let (Some(first), Some(last)) = (route.nodes.first(), route.nodes.last()) else {
        return Err(RelayError::validation("route has no nodes to summarise"));
    };
    Ok(vec![
        Label::new(55.0, LABEL_BASELINE, first.host.name.as_str()),
        Label::new(100.0, LABEL_BASELINE, " - "),
        Label::new(150.0, LABEL_BASELINE, last.host.name.as_str()),
        Label::new(
            300.0,
            LABEL_BASELINE,
            format!("transferred in {:.6} seconds ", route.transit_time()),
        ),
    ])
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/compositor.rs"]
mod tests;
