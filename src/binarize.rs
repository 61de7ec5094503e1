//! Stage B: per-frame binarization, either fixed threshold or a Newton
//! solve for a target open-fraction (spec.md §4.3).

use rayon::prelude::*;
use tracing::warn;

use crate::stack::{BoolStack, Stack};

/// Newton solver tolerance on the open-fraction, hard-coded in the source
/// and flagged there as a candidate knob (spec.md §9).
const NEWTON_TOL: f64 = 0.02;
/// Newton solver iteration cap (spec.md §4.3).
const NEWTON_MAXITER: usize = 20;

/// Result of binarizing a stack: the boolean stack itself, the per-frame
/// open-fraction, and (mode 2 only) per-frame convergence flags.
pub struct BinarizeResult {
    /// `bw[t, y, x]`.
    pub bw: BoolStack,
    /// `alpha[t]`, the per-frame open-fraction of `bw`.
    pub alpha: Vec<f64>,
    /// `converged[t]`. All `true` for fixed-threshold mode, where there is
    /// nothing to converge.
    pub converged: Vec<bool>,
}

fn open_fraction_above(frame: &[f32], threshold: f64) -> f64 {
    let count = frame.iter().filter(|&&v| v as f64 > threshold).count();
    count as f64 / frame.len() as f64
}

/// Mode 1: threshold every pixel against a constant `threshold`.
pub fn binarize_using_threshold(img: &Stack, threshold: f64) -> BinarizeResult {
    let n_frames = img.frames();
    let mut bw = BoolStack::zeros(n_frames, img.height(), img.width());
    let mut alpha = vec![0.0; n_frames];

    bw.par_frames_mut()
        .zip(img.par_frames_iter())
        .zip(alpha.par_iter_mut())
        .for_each(|((bw_frame, gray_frame), alpha_slot)| {
            let mut count = 0usize;
            for (dst, &src) in bw_frame.iter_mut().zip(gray_frame.iter()) {
                if src as f64 > threshold {
                    *dst = 1;
                    count += 1;
                }
            }
            *alpha_slot = count as f64 / gray_frame.len() as f64;
        });

    BinarizeResult {
        bw,
        alpha,
        converged: vec![true; n_frames],
    }
}

/// `f(tau) = target - open_fraction_above(tau)`, the objective Newton's
/// method drives to zero. Piecewise-constant and discontinuous at each
/// pixel value, per spec.md §4.3.
fn newton_objective(frame: &[f32], target: f64, tau: f64) -> f64 {
    target - open_fraction_above(frame, tau)
}

/// Solve for the per-frame threshold hitting `target` open-fraction, via a
/// finite-difference Newton iteration starting from `tau0 = 1 - target`.
/// Returns `(threshold, converged)`.
fn newton_solve(frame: &[f32], target: f64) -> (f64, bool) {
    let mut tau = 1.0 - target;
    const EPS: f64 = 1e-3;

    for _ in 0..NEWTON_MAXITER {
        let f0 = newton_objective(frame, target, tau);
        if f0.abs() <= NEWTON_TOL {
            return (tau, true);
        }
        let f1 = newton_objective(frame, target, tau + EPS);
        let slope = (f1 - f0) / EPS;
        if slope == 0.0 || !slope.is_finite() {
            break;
        }
        let step = f0 / slope;
        if !step.is_finite() {
            break;
        }
        tau -= step;
    }

    let f_final = newton_objective(frame, target, tau);
    (tau, f_final.abs() <= NEWTON_TOL)
}

/// Mode 2: per-frame Newton solve for `target` open-fraction. Non-converging
/// frames are recorded in the returned `converged` vector and logged, but do
/// not abort the run (spec.md §4.3, §7).
pub fn binarize_using_target(img: &Stack, target: f64) -> BinarizeResult {
    let n_frames = img.frames();
    let mut bw = BoolStack::zeros(n_frames, img.height(), img.width());
    let mut alpha = vec![0.0; n_frames];
    let mut converged = vec![false; n_frames];

    bw.par_frames_mut()
        .zip(img.par_frames_iter())
        .zip(alpha.par_iter_mut())
        .zip(converged.par_iter_mut())
        .enumerate()
        .for_each(|(t, (((bw_frame, gray_frame), alpha_slot), converged_slot))| {
            let (threshold, did_converge) = newton_solve(gray_frame, target);
            if !did_converge {
                warn!(frame = t, "Newton solver failed to converge");
            }
            *converged_slot = did_converge;

            let mut count = 0usize;
            for (dst, &src) in bw_frame.iter_mut().zip(gray_frame.iter()) {
                if src as f64 > threshold {
                    *dst = 1;
                    count += 1;
                }
            }
            *alpha_slot = count as f64 / gray_frame.len() as f64;
        });

    BinarizeResult {
        bw,
        alpha,
        converged,
    }
}
