//! Stage M: optional elementwise mixing of two noise stacks and rescaling
//! into `[0, 1]` (spec.md §4.2).

use rayon::prelude::*;

use crate::stack::Stack;

/// Add `b`'s pixels into `a` in place, frame by frame. `a` and `b` must have
/// identical shape. Afterwards `a` spans `[-2, 2]`; the caller is expected to
/// halve it back into `[-1, 1]` (see [`add_and_average`]).
pub fn add_into(a: &mut Stack, b: &Stack) {
    debug_assert_eq!(a.frames(), b.frames());
    debug_assert_eq!(a.frame_len(), b.frame_len());

    a.par_frames_mut()
        .zip(b.par_frames_iter())
        .for_each(|(frame_a, frame_b)| {
            for (x, y) in frame_a.iter_mut().zip(frame_b.iter()) {
                *x += *y;
            }
        });
}

/// Add `b` into `a` and divide by two, returning `a` to the `[-1, 1]` range
/// two independent `[-1, 1]` stacks started in.
pub fn add_and_average(a: &mut Stack, b: &Stack) {
    add_into(a, b);
    a.par_frames_mut().for_each(|frame| {
        for v in frame.iter_mut() {
            *v /= 2.0;
        }
    });
}

/// Rescale mode for stage M, a configuration choice rather than a per-stack
/// property (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescaleMode {
    /// `g = 2 * max(|min|, |max|)`, then `img = img / g + 0.5`. Preserves the
    /// center of a zero-centered distribution at `0.5`.
    Symmetric,
    /// `img = (img - min) / (max - min)`. Uses the full range but biases the
    /// midpoint.
    Span,
}

/// Rescale every value in `stack` into `[0, 1]`, in place, per `mode`.
pub fn rescale(stack: &mut Stack, mode: RescaleMode) {
    let (lo, hi) = stack.min_max();
    match mode {
        RescaleMode::Symmetric => {
            let gain = 2.0 * lo.abs().max(hi.abs());
            let gain = if gain == 0.0 { 1.0 } else { gain };
            stack.par_frames_mut().for_each(|frame| {
                for v in frame.iter_mut() {
                    *v = *v / gain + 0.5;
                }
            });
        }
        RescaleMode::Span => {
            let span = hi - lo;
            let span = if span == 0.0 { 1.0 } else { span };
            stack.par_frames_mut().for_each(|frame| {
                for v in frame.iter_mut() {
                    *v = (*v - lo) / span;
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(frames: usize, side: usize, value: f32) -> Stack {
        let mut s = Stack::zeros(frames, side, side);
        s.par_frames_mut().for_each(|f| f.fill(value));
        s
    }

    #[test]
    fn add_and_average_returns_to_unit_range() {
        let mut a = filled(2, 4, 0.6);
        let b = filled(2, 4, -0.2);
        add_and_average(&mut a, &b);
        let (lo, hi) = a.min_max();
        assert!((lo - 0.2).abs() < 1e-6);
        assert!((hi - 0.2).abs() < 1e-6);
    }

    #[test]
    fn symmetric_rescale_centers_zero_at_half() {
        let mut s = Stack::zeros(1, 2, 2);
        s.frame_mut(0).copy_from_slice(&[-0.5, 0.5, 0.0, 0.25]);
        rescale(&mut s, RescaleMode::Symmetric);
        let (lo, hi) = s.min_max();
        assert!(lo >= 0.0 && hi <= 1.0);
        // zero maps to 0.5 exactly under the symmetric scheme.
        assert!((s.get(0, 1, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn span_rescale_spans_full_unit_range() {
        let mut s = Stack::zeros(1, 2, 2);
        s.frame_mut(0).copy_from_slice(&[-1.0, 1.0, 0.0, 0.5]);
        rescale(&mut s, RescaleMode::Span);
        let (lo, hi) = s.min_max();
        assert!((lo - 0.0).abs() < 1e-6);
        assert!((hi - 1.0).abs() < 1e-6);
    }

    #[test]
    fn constant_stack_rescale_does_not_divide_by_zero() {
        let mut s = filled(1, 2, 0.3);
        rescale(&mut s, RescaleMode::Span);
        let (lo, hi) = s.min_max();
        assert!(lo.is_finite() && hi.is_finite());
    }
}
