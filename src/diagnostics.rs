//! Stage D: pooled on/off duration PDFs and the `_pdfs.txt` writer
//! (spec.md §4.7, §6.4).
//!
//! Grounded on `original_source/src_python/simplex_noise/utils_valve_stack.py`
//! (`valve_on_off_PDFs`) and `original_source/protocols/make_proto_opensimplex.py`'s
//! `idx_last_nonzero_bin` truncation. Bins here are raw frame counts
//! (`1..=max_len`, one bin per integer duration); the `.txt` writer converts
//! the bin axis to seconds by multiplying by `DT_FRAME`, matching the
//! original's on-disk units even though the in-memory bins are frame counts.

use std::path::Path;

use crate::dwell::segment_durations;
use crate::error::Error;
use crate::grid::N_VALVES;
use crate::sampler::ValveStack;

/// Pooled (summed over all valves) on/off duration PDFs, before and after
/// the dwell-time adjuster, truncated at the last bin any of the four PDFs
/// has nonzero mass in.
pub struct PdfReport {
    /// Bin centers, in frames (`1, 2, 3, ...`).
    pub bin_frames: Vec<usize>,
    /// PDF of on-durations before adjustment.
    pub pdf_on: Vec<f64>,
    /// PDF of on-durations after adjustment.
    pub pdf_on_adj: Vec<f64>,
    /// PDF of off-durations before adjustment.
    pub pdf_off: Vec<f64>,
    /// PDF of off-durations after adjustment.
    pub pdf_off_adj: Vec<f64>,
}

fn histogram(durations: &[usize], max_len: usize) -> Vec<f64> {
    let mut counts = vec![0usize; max_len];
    for &d in durations {
        if d >= 1 && d <= max_len {
            counts[d - 1] += 1;
        }
    }
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![0.0; max_len];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

fn last_nonzero_index(pdf: &[f64]) -> Option<usize> {
    pdf.iter().rposition(|&v| v > 0.0)
}

/// Pool every valve's on/off run durations (both raw and dwell-adjusted)
/// into cumulative PDFs.
pub fn compute_duration_pdfs(raw: &ValveStack, adjusted: &ValveStack) -> PdfReport {
    let mut on = Vec::new();
    let mut off = Vec::new();
    let mut on_adj = Vec::new();
    let mut off_adj = Vec::new();

    for v in 0..N_VALVES {
        let series: Vec<i8> = raw.state.iter().map(|row| row[v]).collect();
        if let Some((off_d, on_d)) = segment_durations(&series) {
            off.extend(off_d);
            on.extend(on_d);
        }
        let series_adj: Vec<i8> = adjusted.state.iter().map(|row| row[v]).collect();
        if let Some((off_d, on_d)) = segment_durations(&series_adj) {
            off_adj.extend(off_d);
            on_adj.extend(on_d);
        }
    }

    let max_len = [&on, &off, &on_adj, &off_adj]
        .iter()
        .filter_map(|v| v.iter().copied().max())
        .max()
        .unwrap_or(0);

    let pdf_on = histogram(&on, max_len);
    let pdf_off = histogram(&off, max_len);
    let pdf_on_adj = histogram(&on_adj, max_len);
    let pdf_off_adj = histogram(&off_adj, max_len);

    let truncate_at = [&pdf_on, &pdf_off, &pdf_on_adj, &pdf_off_adj]
        .iter()
        .filter_map(|pdf| last_nonzero_index(pdf))
        .max()
        .map(|i| i + 1)
        .unwrap_or(0);

    PdfReport {
        bin_frames: (1..=truncate_at).collect(),
        pdf_on: pdf_on[..truncate_at].to_vec(),
        pdf_on_adj: pdf_on_adj[..truncate_at].to_vec(),
        pdf_off: pdf_off[..truncate_at].to_vec(),
        pdf_off_adj: pdf_off_adj[..truncate_at].to_vec(),
    }
}

/// Write `_pdfs.txt`: one row per retained bin, duration converted to
/// seconds via `dt_frame`.
pub fn write_pdfs_txt(path: &Path, report: &PdfReport, dt_frame: f64) -> Result<(), Error> {
    let mut out = String::new();
    out.push_str(
        "# duration[s]\topen_theoretical_valve\topen_jet_grid_valve\t\
         closed_theoretical_valve\tclosed_jet_grid_valve\n",
    );
    for i in 0..report.bin_frames.len() {
        out.push_str(&format!(
            "{:.3}\t{:.3e}\t{:.3e}\t{:.3e}\t{:.3e}\n",
            report.bin_frames[i] as f64 * dt_frame,
            report.pdf_on[i],
            report.pdf_on_adj[i],
            report.pdf_off[i],
            report.pdf_off_adj[i],
        ));
    }
    std::fs::write(path, out).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_from_rows(rows: Vec<Vec<i8>>) -> ValveStack {
        let alpha = vec![0.0; rows.len()];
        ValveStack { state: rows, alpha }
    }

    #[test]
    fn pdfs_sum_to_one_when_nonempty() {
        // Valve 0: off(2) on(3) off(2) on(3) ... a clean periodic series.
        let rows: Vec<Vec<i8>> = (0..10)
            .map(|t| vec![if (t / 2) % 2 == 1 { 1i8 } else { 0 }])
            .collect();
        let raw = stack_from_rows(rows.clone());
        let adjusted = stack_from_rows(rows);
        let report = compute_duration_pdfs(&raw, &adjusted);
        assert!((report.pdf_on.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((report.pdf_off.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn truncates_at_last_nonzero_bin() {
        let rows: Vec<Vec<i8>> = (0..10)
            .map(|t| vec![if (t / 2) % 2 == 1 { 1i8 } else { 0 }])
            .collect();
        let raw = stack_from_rows(rows.clone());
        let adjusted = stack_from_rows(rows);
        let report = compute_duration_pdfs(&raw, &adjusted);
        let last = report.bin_frames.last().copied().unwrap_or(0);
        assert!(last <= 10);
        assert!(*report.pdf_on.last().unwrap() > 0.0 || *report.pdf_off.last().unwrap() > 0.0);
    }

    #[test]
    fn all_constant_valves_yield_empty_report() {
        let rows: Vec<Vec<i8>> = (0..5).map(|_| vec![0i8; N_VALVES]).collect();
        let raw = stack_from_rows(rows.clone());
        let adjusted = stack_from_rows(rows);
        let report = compute_duration_pdfs(&raw, &adjusted);
        assert!(report.bin_frames.is_empty());
    }
}
