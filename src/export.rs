//! Stage E: the `.proto` writer and reader (spec.md §6.2).
//!
//! Also writes the `_valves_stack.txt` companion dump: a plain-text
//! stand-in for the original's `.npy` array, since no `.npy`-writing crate
//! is grounded anywhere in the pack (see DESIGN.md).
//!
//! Grounded on `original_source/protocols/utils_protocols.py::export_protocol_to_disk`.

use std::io::Write;
use std::path::Path;

use crate::config::Config;
use crate::error::Error;
use crate::grid::ValveLayout;
use crate::sampler::ValveStack;

fn io_err(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Write the `.proto` file: a `[HEADER]` section followed by one `[DATA]`
/// line per frame, each carrying the frame duration in milliseconds and a
/// tab-separated list of `"x,y"` PCS coordinates for every open valve.
pub fn write_proto(
    path: &Path,
    config: &Config,
    layout: &ValveLayout,
    valves: &ValveStack,
    timestamp: &str,
) -> Result<(), Error> {
    let mut out = String::new();
    out.push_str("[HEADER]\n");
    out.push_str(&config.header_string(timestamp));
    out.push('\n');
    out.push_str("[DATA]\n");

    let dur_ms = (config.dt_frame * 1000.0).round() as i64;
    for row in &valves.state {
        out.push_str(&dur_ms.to_string());
        for (v, &state) in row.iter().enumerate() {
            if state != 0 {
                out.push('\t');
                out.push_str(&format!("{},{}", layout.valve2pcs_x[v], layout.valve2pcs_y[v]));
            }
        }
        out.push('\n');
    }

    std::fs::write(path, out).map_err(|e| io_err(path, e))
}

/// One decoded `[DATA]` line: the frame duration in milliseconds and the
/// PCS coordinates of every open valve.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoFrame {
    /// Frame duration, in milliseconds.
    pub dur_ms: i64,
    /// `(pcs_x, pcs_y)` of every valve open this frame.
    pub open_valves: Vec<(i32, i32)>,
}

/// Parse a `.proto` file's `[DATA]` section back into frames. Round-trips
/// what [`write_proto`] writes; does not attempt to parse `[HEADER]`.
pub fn read_proto_data(text: &str) -> Vec<ProtoFrame> {
    let mut frames = Vec::new();
    let mut in_data = false;
    for line in text.lines() {
        if line.trim() == "[DATA]" {
            in_data = true;
            continue;
        }
        if !in_data || line.trim().is_empty() {
            continue;
        }
        let mut fields = line.split('\t');
        let dur_ms: i64 = match fields.next().and_then(|s| s.parse().ok()) {
            Some(v) => v,
            None => continue,
        };
        let mut open_valves = Vec::new();
        for tok in fields {
            if let Some((x, y)) = tok.split_once(',') {
                if let (Ok(x), Ok(y)) = (x.parse::<i32>(), y.parse::<i32>()) {
                    open_valves.push((x, y));
                }
            }
        }
        frames.push(ProtoFrame { dur_ms, open_valves });
    }
    frames
}

/// Write the `_valves_stack.txt` companion dump: one row per frame, one
/// `0`/`1` column per valve, tab-separated.
pub fn write_valves_stack_txt(path: &Path, valves: &ValveStack) -> Result<(), Error> {
    let file = std::fs::File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = std::io::BufWriter::new(file);
    for row in &valves.state {
        for (i, &state) in row.iter().enumerate() {
            if i > 0 {
                w.write_all(b"\t").map_err(|e| io_err(path, e))?;
            }
            write!(w, "{state}").map_err(|e| io_err(path, e))?;
        }
        w.write_all(b"\n").map_err(|e| io_err(path, e))?;
    }
    Ok(())
}
