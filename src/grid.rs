//! Protocol coordinate system (PCS) geometry and the valve layout.
//!
//! The jetting nozzles sit on one diagonal of a 15x15 square lattice:
//!
//! ```text
//!      -7 -6 -5 -4 -3 -2 -1  0  1  2  3  4  5  6  7
//!     +-----------------------------------------------+
//!   7 | -  o  -  o  -  o  -  o  -  o  -  o  -  o  -   |
//!   6 | o  -  o  -  o  -  o  -  o  -  o  -  o  -  o   |
//!   ...
//! ```
//!
//! `o` marks a valve. A cell carries a valve iff `(row + col)` is odd.

/// Minimum PCS axis coordinate.
pub const PCS_AXIS_MIN: i32 = -7;
/// Maximum PCS axis coordinate.
pub const PCS_AXIS_MAX: i32 = 7;
/// Number of cells along one axis of the square lattice.
pub const NUMEL_PCS_AXIS: usize = (PCS_AXIS_MAX - PCS_AXIS_MIN + 1) as usize;
/// Number of valves on the lattice (112 for a 15x15 grid).
pub const N_VALVES: usize = NUMEL_PCS_AXIS * NUMEL_PCS_AXIS / 2;
/// Pixel distance between neighboring integer PCS coordinates.
pub const PCS_PIXEL_DIST: usize = 32;
/// Image side length in pixels.
pub const N_PIXELS: usize = PCS_PIXEL_DIST * (NUMEL_PCS_AXIS + 1);

/// The fixed mapping from linear valve index to pixel and PCS coordinates.
///
/// Built once from the lattice parity rule: a row-major flattening of the
/// `15x15` grid is sliced `[1::2]`, i.e. every odd linear index (one-based)
/// carries a valve. See `original_source/src_python/simplex_noise/constants.py`.
#[derive(Debug, Clone)]
pub struct ValveLayout {
    /// Pixel x-coordinate of each valve's sample site.
    pub valve2px_x: Vec<usize>,
    /// Pixel y-coordinate of each valve's sample site.
    pub valve2px_y: Vec<usize>,
    /// PCS x-coordinate of each valve.
    pub valve2pcs_x: Vec<i32>,
    /// PCS y-coordinate of each valve.
    pub valve2pcs_y: Vec<i32>,
}

impl ValveLayout {
    /// Construct the canonical 15x15 -> 112 valve layout. There is exactly one
    /// valid layout for the grid geometry fixed by spec.md, so this takes no
    /// arguments.
    pub fn new() -> Self {
        let pxs: Vec<usize> = (0..NUMEL_PCS_AXIS)
            .map(|i| PCS_PIXEL_DIST - 1 + i * PCS_PIXEL_DIST)
            .collect();
        let coords: Vec<i32> = (PCS_AXIS_MIN..=PCS_AXIS_MAX).collect();

        let mut valve2px_x = Vec::with_capacity(N_VALVES);
        let mut valve2px_y = Vec::with_capacity(N_VALVES);
        let mut valve2pcs_x = Vec::with_capacity(N_VALVES);
        let mut valve2pcs_y = Vec::with_capacity(N_VALVES);

        // Row-major meshgrid flatten, then keep every odd one-based index,
        // i.e. Python's `[1::2]` (zero-based indices 1, 3, 5, ...).
        let mut linear_idx = 0usize;
        for row in 0..NUMEL_PCS_AXIS {
            for col in 0..NUMEL_PCS_AXIS {
                if linear_idx % 2 == 1 {
                    valve2px_x.push(pxs[col]);
                    valve2px_y.push(pxs[row]);
                    valve2pcs_x.push(coords[col]);
                    valve2pcs_y.push(coords[row]);
                }
                linear_idx += 1;
            }
        }

        debug_assert_eq!(valve2px_x.len(), N_VALVES);

        Self {
            valve2px_x,
            valve2px_y,
            valve2pcs_x,
            valve2pcs_y,
        }
    }
}

impl Default for ValveLayout {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valve_count_is_112() {
        assert_eq!(N_VALVES, 112);
        assert_eq!(N_PIXELS, 512);
    }

    #[test]
    fn layout_has_112_entries() {
        let layout = ValveLayout::new();
        assert_eq!(layout.valve2px_x.len(), 112);
        assert_eq!(layout.valve2px_y.len(), 112);
        assert_eq!(layout.valve2pcs_x.len(), 112);
        assert_eq!(layout.valve2pcs_y.len(), 112);
    }

    #[test]
    fn every_valve_has_odd_parity() {
        let layout = ValveLayout::new();
        for i in 0..N_VALVES {
            let row = layout.valve2pcs_y[i];
            let col = layout.valve2pcs_x[i];
            assert_eq!((row + col).rem_euclid(2), 1, "valve {i} has even parity");
        }
    }

    #[test]
    fn pcs_coordinates_are_in_range() {
        let layout = ValveLayout::new();
        for i in 0..N_VALVES {
            assert!(layout.valve2pcs_x[i] >= PCS_AXIS_MIN && layout.valve2pcs_x[i] <= PCS_AXIS_MAX);
            assert!(layout.valve2pcs_y[i] >= PCS_AXIS_MIN && layout.valve2pcs_y[i] <= PCS_AXIS_MAX);
        }
    }

    #[test]
    fn pixel_centers_match_formula() {
        // pixel center is (P*(col+1) - 1, P*(row+1) - 1) for a one-based col/row.
        let layout = ValveLayout::new();
        for i in 0..N_VALVES {
            let col = (layout.valve2pcs_x[i] - PCS_AXIS_MIN) as usize;
            let row = (layout.valve2pcs_y[i] - PCS_AXIS_MIN) as usize;
            assert_eq!(layout.valve2px_x[i], PCS_PIXEL_DIST * (col + 1) - 1);
            assert_eq!(layout.valve2px_y[i], PCS_PIXEL_DIST * (row + 1) - 1);
        }
    }
}
