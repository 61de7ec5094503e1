//! The `_alpha.txt` writer (spec.md §6.3).
//!
//! Kept as its own module, separate from [`crate::export`], matching the
//! original source's structure: `make_proto_opensimplex.py` writes this
//! report in a loop distinct from `export_protocol_to_disk`.

use std::path::Path;

use crate::error::Error;

/// Write the per-frame transparency report: a short preamble noting which
/// binarization mode produced the data, then one tab-separated row per
/// frame (`frame`, `alpha_BW`, `alpha_valves_adj`, Newton convergence flag).
pub fn write_alpha_report(
    path: &Path,
    alpha_bw: &[f64],
    alpha_valves_adj: &[f64],
    converged: &[bool],
    used_newton_solver: bool,
) -> Result<(), Error> {
    let mut out = String::new();

    if used_newton_solver {
        out.push_str("Newton solver was used to solve for a wanted transparency.\n");
        let failed = converged.iter().filter(|&&c| !c).count();
        if failed > 0 {
            out.push_str(&format!("{failed} frames failed to converge!\n"));
        } else {
            out.push_str("All frames did converge.\n");
        }
    } else {
        out.push_str("A simple BW threshold was used.\n");
        out.push_str("Column `Newton_solver_converged?` can be ignored.\n");
    }

    out.push_str("\n# frame\ttransparency_binary_noise\ttransparency_jet_grid\tNewton_solver_converged?\n");
    for i in 0..alpha_bw.len() {
        out.push_str(&format!(
            "{i}\t{:.2}\t{:.2}\t{}\n",
            alpha_bw[i], alpha_valves_adj[i], converged[i]
        ));
    }

    std::fs::write(path, out).map_err(|source| Error::Io {
        path: path.display().to_string(),
        source,
    })
}

/// `mean ± stdev` of a sample, formatted as the report's summary lines
/// (spec.md §4.8, `build_stats_str` in the original source).
pub fn mean_stdev(x: &[f64]) -> (f64, f64) {
    if x.is_empty() {
        return (0.0, 0.0);
    }
    let mean = x.iter().sum::<f64>() / x.len() as f64;
    let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / x.len() as f64;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_stdev_of_constant_sample_has_zero_spread() {
        let (mean, stdev) = mean_stdev(&[0.4, 0.4, 0.4]);
        assert!((mean - 0.4).abs() < 1e-9);
        assert!(stdev.abs() < 1e-9);
    }

    #[test]
    fn mean_stdev_of_empty_sample_is_zero() {
        assert_eq!(mean_stdev(&[]), (0.0, 0.0));
    }

    #[test]
    fn write_alpha_report_notes_failed_convergences() {
        let dir = std::env::temp_dir().join("jetting_grid_test_alpha_report");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("demo_alpha.txt");

        write_alpha_report(&path, &[0.4, 0.3], &[0.41, 0.28], &[true, false], true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("1 frames failed to converge!"));
        assert!(text.contains("0\t0.40\t0.41\ttrue"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
