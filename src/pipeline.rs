//! Orchestration: wires stages G -> M -> B -> S -> A -> E/D together
//! (spec.md §5, §4.8).
//!
//! Grounded on `original_source/protocols/make_proto_opensimplex.py`, which
//! calls the same stages in the same order and reports the same three
//! transparency statistics.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::alpha;
use crate::binarize;
use crate::config::{BinarizeMode, Config};
use crate::diagnostics;
use crate::dwell;
use crate::error::Error;
use crate::export;
use crate::grid::{ValveLayout, N_PIXELS};
use crate::mixer::{self, RescaleMode};
use crate::noise;
use crate::sampler::{self, ValveStack};

/// `mean ± stdev` of the three transparency series the original reports
/// after a run (spec.md §4.8).
pub struct Report {
    /// Binary-noise transparency before valve sampling.
    pub alpha_bw: (f64, f64),
    /// Valve transparency before the dwell-time adjuster.
    pub alpha_valves: (f64, f64),
    /// Valve transparency after the dwell-time adjuster.
    pub alpha_valves_adj: (f64, f64),
    /// Frames where the Newton solver failed to converge (`0` in threshold
    /// mode, since there is nothing to converge).
    pub failed_convergences: usize,
}

impl Report {
    /// Emit the report as a single structured log line, matching the
    /// original's `print(f"  alpha_... = {stats}")` summary.
    pub fn log(&self) {
        info!(
            alpha_bw = format!("{:.2} +/- {:.3}", self.alpha_bw.0, self.alpha_bw.1),
            alpha_valves = format!("{:.2} +/- {:.3}", self.alpha_valves.0, self.alpha_valves.1),
            alpha_valves_adj = format!(
                "{:.2} +/- {:.3}",
                self.alpha_valves_adj.0, self.alpha_valves_adj.1
            ),
            failed_convergences = self.failed_convergences,
            "pipeline run complete"
        );
    }
}

/// Everything a run produces, before it's written to disk.
pub struct PipelineOutput {
    /// Per-valve state before the dwell-time adjuster.
    pub valves_raw: ValveStack,
    /// Per-valve state after the dwell-time adjuster; this is what gets
    /// exported.
    pub valves_adjusted: ValveStack,
    /// Per-frame binary-noise transparency.
    pub alpha_bw: Vec<f64>,
    /// Per-frame Newton convergence flags (all `true` in threshold mode).
    pub converged: Vec<bool>,
    /// Summary statistics.
    pub report: Report,
}

/// Run stages G through A and assemble the report. Does not touch disk;
/// see [`export_all`] for that.
pub fn run(config: &Config) -> Result<PipelineOutput, Error> {
    config.validate()?;
    let layout = ValveLayout::new();

    let mut img = {
        let _span = tracing::info_span!("stage_g_noise_a").entered();
        noise::looping_animated_stack(
            config.n_frames,
            N_PIXELS,
            config.t_step_a(),
            config.x_step_a(),
            config.seed_a,
        )
    };

    if config.stack_b_enabled() {
        let _span = tracing::info_span!("stage_m_mix").entered();
        let img_b = noise::looping_animated_stack(
            config.n_frames,
            N_PIXELS,
            config.t_step_b(),
            config.x_step_b(),
            config.seed_b,
        );
        mixer::add_and_average(&mut img, &img_b);
    }
    {
        let _span = tracing::info_span!("stage_m_rescale").entered();
        let mode = if config.rescale_symmetric {
            RescaleMode::Symmetric
        } else {
            RescaleMode::Span
        };
        mixer::rescale(&mut img, mode);
    }

    let bin_result = {
        let _span = tracing::info_span!("stage_b_binarize").entered();
        match config.binarize_mode {
            BinarizeMode::Threshold(t) => binarize::binarize_using_threshold(&img, t),
            BinarizeMode::TargetTransparency(a) => binarize::binarize_using_target(&img, a),
        }
    };

    let valves_raw = {
        let _span = tracing::info_span!("stage_s_sample").entered();
        sampler::sample_valves(&bin_result.bw, &layout)
    };

    let valves_adjusted = {
        let _span = tracing::info_span!("stage_a_dwell").entered();
        dwell::adjust_minimum_valve_durations(&valves_raw, config.min_valve_duration)?
    };

    let failed_convergences = bin_result.converged.iter().filter(|&&c| !c).count();
    let report = Report {
        alpha_bw: alpha::mean_stdev(&bin_result.alpha),
        alpha_valves: alpha::mean_stdev(&valves_raw.alpha),
        alpha_valves_adj: alpha::mean_stdev(&valves_adjusted.alpha),
        failed_convergences,
    };
    report.log();

    Ok(PipelineOutput {
        valves_raw,
        valves_adjusted,
        alpha_bw: bin_result.alpha,
        converged: bin_result.converged,
        report,
    })
}

fn append_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

/// Write every output artifact for a completed run: `.proto`,
/// `_valves_stack.txt`, `_alpha.txt`, `_pdfs.txt` (spec.md §6).
pub fn export_all(
    config: &Config,
    layout: &ValveLayout,
    output: &PipelineOutput,
    timestamp: &str,
) -> Result<(), Error> {
    let base = Path::new(&config.export_path_no_ext);
    let _span = tracing::info_span!("stage_e_export").entered();

    export::write_proto(
        &append_suffix(base, ".proto"),
        config,
        layout,
        &output.valves_adjusted,
        timestamp,
    )?;
    export::write_valves_stack_txt(
        &append_suffix(base, "_valves_stack.txt"),
        &output.valves_adjusted,
    )?;

    let used_newton = matches!(config.binarize_mode, BinarizeMode::TargetTransparency(_));
    alpha::write_alpha_report(
        &append_suffix(base, "_alpha.txt"),
        &output.alpha_bw,
        &output.valves_adjusted.alpha,
        &output.converged,
        used_newton,
    )?;

    let pdfs = diagnostics::compute_duration_pdfs(&output.valves_raw, &output.valves_adjusted);
    diagnostics::write_pdfs_txt(&append_suffix(base, "_pdfs.txt"), &pdfs, config.dt_frame)?;

    Ok(())
}
