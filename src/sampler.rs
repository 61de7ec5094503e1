//! Stage S: sample the boolean stack at the fixed valve pixel sites
//! (spec.md §4.4).

use rayon::prelude::*;

use crate::grid::{ValveLayout, N_VALVES};
use crate::stack::BoolStack;

/// Per-frame valve states, `state[t][v] == 1` iff valve `v` is open at frame
/// `t`. Stored as `i8` rather than `bool`, matching the source's choice
/// (`np.diff()` needs a signed integer dtype downstream in stage A).
pub struct ValveStack {
    /// Row-major `[T][V]` state matrix.
    pub state: Vec<Vec<i8>>,
    /// `alpha_v[t]`, the per-frame valve open-fraction.
    pub alpha: Vec<f64>,
}

/// Sample `bw` at every valve's pixel site, for every frame.
pub fn sample_valves(bw: &BoolStack, layout: &ValveLayout) -> ValveStack {
    let n_frames = bw.frames();
    let rows: Vec<(Vec<i8>, f64)> = (0..n_frames)
        .into_par_iter()
        .map(|t| {
            let frame = bw.frame(t);
            let width = bw.width();
            let mut row = vec![0i8; N_VALVES];
            let mut open = 0usize;
            for v in 0..N_VALVES {
                let px = layout.valve2px_x[v];
                let py = layout.valve2px_y[v];
                let on = frame[py * width + px] != 0;
                row[v] = on as i8;
                if on {
                    open += 1;
                }
            }
            (row, open as f64 / N_VALVES as f64)
        })
        .collect();

    let mut state = Vec::with_capacity(n_frames);
    let mut alpha = Vec::with_capacity(n_frames);
    for (row, a) in rows {
        state.push(row);
        alpha.push(a);
    }

    ValveStack { state, alpha }
}
