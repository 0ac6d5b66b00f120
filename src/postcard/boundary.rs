use rand::Rng;

use crate::route::{SLOT_COUNT, random_int};

/// Rectangle a stamp's top-left corner may land in, keyed by slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub label: &'static str,
    pub x_min: i64,
    pub x_max: i64,
    pub y_min: i64,
    pub y_max: i64,
}

/// Placement regions by slot: three along the top edge, three down each side.
pub const BOUNDARIES: [Boundary; SLOT_COUNT] = [
    Boundary::new("topgutter1", 50, 150, -20, 20),
    Boundary::new("topgutter2", 150, 300, -20, 20),
    Boundary::new("topgutter3", 300, 380, -20, 20),
    Boundary::new("leftgutter1", 0, 20, 50, 150),
    Boundary::new("leftgutter2", 0, 20, 150, 180),
    Boundary::new("leftgutter3", 0, 20, 300, 340),
    Boundary::new("rightgutter1", 300, 360, 50, 150),
    Boundary::new("rightgutter2", 300, 360, 150, 180),
    Boundary::new("rightgutter3", 300, 360, 300, 340),
];

impl Boundary {
    const fn new(label: &'static str, x_min: i64, x_max: i64, y_min: i64, y_max: i64) -> Self {
        Self {
            label,
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    pub fn for_slot(slot: usize) -> Option<&'static Boundary> {
        BOUNDARIES.get(slot)
    }

    /// Random point in `[x_min, x_max) x [y_min, y_max)`.
    pub fn place<R: Rng + ?Sized>(&self, rng: &mut R) -> (i64, i64) {
        (
            random_int(rng, self.x_min, self.x_max),
            random_int(rng, self.y_min, self.y_max),
        )
    }
}

#[cfg(test)]
#[path = "../../tests/unit/postcard/boundary.rs"]
mod tests;
