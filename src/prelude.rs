//! Convenience re-export of the crate's common surface.

pub use crate::alpha::{mean_stdev, write_alpha_report};
pub use crate::binarize::{binarize_using_target, binarize_using_threshold, BinarizeResult};
pub use crate::config::{BinarizeMode, Config, StepConvention};
pub use crate::diagnostics::{compute_duration_pdfs, write_pdfs_txt, PdfReport};
pub use crate::dwell::adjust_minimum_valve_durations;
pub use crate::error::Error;
pub use crate::export::{read_proto_data, write_proto, write_valves_stack_txt, ProtoFrame};
pub use crate::grid::{ValveLayout, N_PIXELS, N_VALVES};
pub use crate::mixer::{add_and_average, rescale, RescaleMode};
pub use crate::noise::looping_animated_stack;
pub use crate::pipeline::{export_all, run, PipelineOutput, Report};
pub use crate::sampler::{sample_valves, ValveStack};
pub use crate::stack::{BoolStack, Stack};
