//! Error kinds raised by the pipeline, per spec.md §7.

use thiserror::Error;

/// Errors the pipeline can raise. Configuration and invariant violations are
/// fatal to the whole run; Newton non-convergence is a per-frame soft failure
/// recorded in the alpha report instead (see [`crate::binarize`]).
#[derive(Debug, Error)]
pub enum Error {
    /// Both binarization modes were set, neither was set, a size was
    /// negative, or `dt_frame <= 0`.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A single frame's Newton search failed to converge within tolerance.
    /// Non-fatal; callers see this recorded in `converged[t]`, not as a
    /// propagated error. Kept as a variant so diagnostics and logging share
    /// one vocabulary with the other error kinds.
    #[error("Newton solver failed to converge at frame {frame}")]
    NewtonNonConvergence {
        /// Index of the frame that failed to converge.
        frame: usize,
    },

    /// A valve's series is constant over the full loop, so no flank exists
    /// to anchor the segment-detection primitive on. Treated as a no-op by
    /// the dwell-time adjuster, not fatal.
    #[error("no flanks detected in the timeseries of valve {valve}")]
    NoFlanksDetected {
        /// Index of the constant valve.
        valve: usize,
    },

    /// After the dwell-time rewrite a run shorter than `D_min` remained, or
    /// the up/downflank counts disagreed, or segment durations did not sum
    /// to `T`. Indicates a bug in the rewriter, not a data condition; fatal.
    #[error("dwell-time adjuster invariant violated for valve {valve}: {reason}")]
    AdjusterInvariantViolation {
        /// Index of the valve whose rewritten series failed validation.
        valve: usize,
        /// Human-readable description of which invariant failed.
        reason: String,
    },

    /// The exporter or diagnostics writer could not create or write an
    /// output file.
    #[error("I/O error writing {path}: {source}")]
    Io {
        /// Path the pipeline was writing to.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
