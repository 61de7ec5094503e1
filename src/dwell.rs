//! Stage A: the dwell-time adjuster (spec.md §4.5).
//!
//! Rewrites each valve's circular on/off time series so that every maximal
//! run (a contiguous stretch of identical state, wrapping across the loop
//! boundary) is at least `D_min` frames long. Short on-runs and short
//! off-runs are eliminated in an order that alternates by valve parity, so
//! that neighboring valves don't all shed duty cycle in the same direction.
//!
//! Grounded on `original_source/src_python/simplex_noise/utils_valves_stack.py`
//! (`_find_first_downflank`, `_detect_segments`,
//! `adjust_minimum_valve_durations`). The source locates runs by rotating the
//! array to a linear-scan-friendly frame and re-rotating after each edit;
//! here the same decomposition is expressed directly over the circular index
//! space, which also sidesteps a source edge case where a rotated array that
//! collapses to a single on/off pair has no *interior* downflank left for a
//! non-circular scan to find.

use rayon::prelude::*;

use crate::error::Error;
use crate::grid::N_VALVES;
use crate::sampler::ValveStack;

/// A maximal run of identical state in a circular `0/1` series.
#[derive(Debug, Clone, Copy)]
struct Run {
    /// Index of the run's first frame.
    start: usize,
    /// Run length in frames.
    len: usize,
    /// `true` if this is an "on" (valve open) run.
    is_on: bool,
}

/// Decompose a circular `0/1` series into its maximal runs, starting the
/// list at the first off-run boundary. Returns `None` if `s` is constant
/// (no flank exists to anchor on) -- spec.md §7's `NoFlanksDetected`
/// condition.
fn decompose_runs(s: &[i8]) -> Option<Vec<Run>> {
    let n = s.len();
    if n == 0 || s.iter().all(|&v| v == s[0]) {
        return None;
    }

    let start = (0..n).find(|&k| s[(k + n - 1) % n] == 1 && s[k] == 0)?;

    let mut runs = Vec::new();
    let mut i = 0usize;
    while i < n {
        let idx = (start + i) % n;
        let is_on = s[idx] == 1;
        let mut len = 1;
        while i + len < n && (s[(start + i + len) % n] == 1) == is_on {
            len += 1;
        }
        runs.push(Run { start: idx, len, is_on });
        i += len;
    }
    Some(runs)
}

/// Zero out too-short on-runs (`remove_on = true`) or fill too-short
/// off-runs (`remove_on = false`) in place.
fn apply_run_edit(s: &mut [i8], runs: &[Run], min_duration: usize, remove_on: bool) {
    let n = s.len();
    let new_val: i8 = if remove_on { 0 } else { 1 };
    for run in runs {
        if run.is_on == remove_on && run.len < min_duration {
            for k in 0..run.len {
                let idx = (run.start + k) % n;
                s[idx] = new_val;
            }
        }
    }
}

/// Rewrite a single valve's series so every run is at least `min_duration`
/// long. Even valve indices remove short on-runs first, then short
/// off-runs; odd valve indices do the reverse (spec.md §4.5).
fn adjust_valve(y0: &[i8], min_duration: usize, valve_idx: usize) -> Result<Vec<i8>, Error> {
    if min_duration <= 1 {
        return Ok(y0.to_vec());
    }
    let n = y0.len();

    let runs1 = match decompose_runs(y0) {
        Some(r) => r,
        None => return Ok(y0.to_vec()),
    };

    let mut y = y0.to_vec();
    let even = valve_idx % 2 == 0;

    let collapsed_to_constant = |y: &[i8]| -> Result<Vec<i8>, Error> {
        if n < min_duration {
            return Err(Error::AdjusterInvariantViolation {
                valve: valve_idx,
                reason: format!(
                    "rewrite collapsed the series to a constant run of length {n}, \
                     shorter than D_min = {min_duration}"
                ),
            });
        }
        Ok(y.to_vec())
    };

    apply_run_edit(&mut y, &runs1, min_duration, even);
    let runs2 = match decompose_runs(&y) {
        Some(r) => r,
        None => return collapsed_to_constant(&y),
    };

    apply_run_edit(&mut y, &runs2, min_duration, !even);
    let runs3 = match decompose_runs(&y) {
        Some(r) => r,
        None => return collapsed_to_constant(&y),
    };

    if let Some(bad) = runs3.iter().find(|r| r.len < min_duration) {
        return Err(Error::AdjusterInvariantViolation {
            valve: valve_idx,
            reason: format!(
                "run of length {} at frame {} remained below D_min = {min_duration} after rewrite",
                bad.len, bad.start
            ),
        });
    }

    let total: usize = runs3.iter().map(|r| r.len).sum();
    if total != n {
        return Err(Error::AdjusterInvariantViolation {
            valve: valve_idx,
            reason: format!("segment durations summed to {total}, expected {n}"),
        });
    }

    Ok(y)
}

/// Rewrite every valve's series so all runs are at least `min_duration`
/// frames long. `min_duration <= 1` is the identity transform (spec.md §4.5,
/// §8 scenario "T=1").
pub fn adjust_minimum_valve_durations(
    valves: &ValveStack,
    min_duration: usize,
) -> Result<ValveStack, Error> {
    if min_duration <= 1 {
        return Ok(ValveStack {
            state: valves.state.clone(),
            alpha: valves.alpha.clone(),
        });
    }

    let n_frames = valves.state.len();
    let columns: Vec<Vec<i8>> = (0..N_VALVES)
        .into_par_iter()
        .map(|v| {
            let series: Vec<i8> = valves.state.iter().map(|row| row[v]).collect();
            adjust_valve(&series, min_duration, v)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let mut state = vec![vec![0i8; N_VALVES]; n_frames];
    for (v, col) in columns.iter().enumerate() {
        for (t, row) in state.iter_mut().enumerate() {
            row[v] = col[t];
        }
    }
    let alpha: Vec<f64> = state
        .iter()
        .map(|row| row.iter().map(|&x| x as usize).sum::<usize>() as f64 / N_VALVES as f64)
        .collect();

    Ok(ValveStack { state, alpha })
}

/// Off- and on-run lengths of a single valve's circular series, for the
/// diagnostics PDFs (spec.md §4.7). `None` if the series is constant.
pub fn segment_durations(series: &[i8]) -> Option<(Vec<usize>, Vec<usize>)> {
    let runs = decompose_runs(series)?;
    let mut off = Vec::new();
    let mut on = Vec::new();
    for r in runs {
        if r.is_on {
            on.push(r.len);
        } else {
            off.push(r.len);
        }
    }
    Some((off, on))
}
