//! Pipeline configuration (spec.md §6.1).

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::grid::{N_PIXELS, PCS_PIXEL_DIST};

/// Which formula derives the spatial noise step from a configured feature
/// size. The original source contains two generations of scripts that
/// disagree on this; spec.md §9 asks implementations to expose the choice
/// rather than silently pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StepConvention {
    /// `x_step = 1 / feature_size`. The convention used by the most recent
    /// `config_proto_opensimplex.py`.
    #[default]
    Direct,
    /// `x_step = 1 / (feature_size * PCS_PIXEL_DIST / 32)`. The convention
    /// used by an earlier generation of scripts.
    PixelScaled,
}

impl StepConvention {
    /// Derive a noise step from a feature size under this convention.
    pub fn step(self, feature_size: f64) -> f64 {
        match self {
            StepConvention::Direct => 1.0 / feature_size,
            StepConvention::PixelScaled => {
                1.0 / (feature_size * PCS_PIXEL_DIST as f64 / 32.0)
            }
        }
    }
}

/// Which binarization scheme (spec.md §4.3) to use. Mutually exclusive by
/// construction, unlike the original's `Option<f64>` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BinarizeMode {
    /// Fixed threshold in `[0, 1]`.
    Threshold(f64),
    /// Target open-fraction in `(0, 1)`, solved per frame with Newton's
    /// method.
    TargetTransparency(f64),
}

/// Full pipeline configuration, corresponding to spec.md §6.1's recognized
/// option set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `N_FRAMES`: length of the time loop, in frames.
    pub n_frames: usize,
    /// `DT_FRAME`: per-frame duration, in seconds.
    pub dt_frame: f64,
    /// Exactly one of fixed threshold or target transparency.
    pub binarize_mode: BinarizeMode,
    /// `SPATIAL_FEATURE_SIZE_A`.
    pub spatial_feature_size_a: f64,
    /// `SPATIAL_FEATURE_SIZE_B`; `0.0` disables stack B.
    pub spatial_feature_size_b: f64,
    /// `TEMPORAL_FEATURE_SIZE_A`.
    pub temporal_feature_size_a: f64,
    /// `TEMPORAL_FEATURE_SIZE_B`.
    pub temporal_feature_size_b: f64,
    /// `SEED_A`.
    pub seed_a: u64,
    /// `SEED_B`.
    pub seed_b: u64,
    /// `MIN_VALVE_DURATION`; `D_min` for stage A. `0` or `1` disables it.
    pub min_valve_duration: usize,
    /// Which `X_STEP`/`T_STEP` derivation to use (spec.md §9 Open Question).
    #[serde(default)]
    pub step_convention: StepConvention,
    /// Rescale mode for stage M (spec.md §4.2).
    #[serde(default)]
    pub rescale_symmetric: bool,
    /// `EXPORT_PATH_NO_EXT`: output base path.
    pub export_path_no_ext: String,
}

impl Config {
    /// Validate the configuration, per spec.md §7's `InvalidConfiguration`
    /// situations.
    pub fn validate(&self) -> Result<(), Error> {
        if self.dt_frame <= 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "DT_FRAME must be positive, got {}",
                self.dt_frame
            )));
        }
        if self.n_frames == 0 {
            return Err(Error::InvalidConfiguration(
                "N_FRAMES must be positive".into(),
            ));
        }
        if self.spatial_feature_size_a <= 0.0 {
            return Err(Error::InvalidConfiguration(
                "SPATIAL_FEATURE_SIZE_A must be positive".into(),
            ));
        }
        if self.spatial_feature_size_b < 0.0 {
            return Err(Error::InvalidConfiguration(
                "SPATIAL_FEATURE_SIZE_B must be non-negative".into(),
            ));
        }
        if self.temporal_feature_size_a <= 0.0 {
            return Err(Error::InvalidConfiguration(
                "TEMPORAL_FEATURE_SIZE_A must be positive".into(),
            ));
        }
        if self.temporal_feature_size_b < 0.0 {
            return Err(Error::InvalidConfiguration(
                "TEMPORAL_FEATURE_SIZE_B must be non-negative".into(),
            ));
        }
        match self.binarize_mode {
            BinarizeMode::Threshold(t) if !(0.0..=1.0).contains(&t) => {
                return Err(Error::InvalidConfiguration(format!(
                    "BW_THRESHOLD must lie in [0, 1], got {t}"
                )));
            }
            BinarizeMode::TargetTransparency(a) if !(a > 0.0 && a < 1.0) => {
                return Err(Error::InvalidConfiguration(format!(
                    "TARGET_TRANSPARENCY must lie in (0, 1), got {a}"
                )));
            }
            _ => {}
        }
        Ok(())
    }

    /// Load a configuration from a TOML file on disk.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|e| {
            Error::InvalidConfiguration(format!("could not parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Derived `X_STEP_A`.
    pub fn x_step_a(&self) -> f64 {
        self.step_convention.step(self.spatial_feature_size_a)
    }

    /// Derived `X_STEP_B`. Zero when stack B is disabled.
    pub fn x_step_b(&self) -> f64 {
        if self.spatial_feature_size_b == 0.0 {
            0.0
        } else {
            self.step_convention.step(self.spatial_feature_size_b)
        }
    }

    /// Derived `T_STEP_A`.
    pub fn t_step_a(&self) -> f64 {
        1.0 / self.temporal_feature_size_a
    }

    /// Derived `T_STEP_B`. Zero when stack B is disabled.
    pub fn t_step_b(&self) -> f64 {
        if self.temporal_feature_size_b == 0.0 {
            0.0
        } else {
            1.0 / self.temporal_feature_size_b
        }
    }

    /// Whether a second noise stack should be generated and mixed in.
    pub fn stack_b_enabled(&self) -> bool {
        self.spatial_feature_size_b > 0.0
    }

    /// Render the `[HEADER]` section written to the `.proto` file, per
    /// spec.md §6.2. `timestamp` is supplied by the caller (see
    /// [`crate::error::Error`] discussion in DESIGN.md: the pipeline itself
    /// never calls a clock).
    pub fn header_string(&self, timestamp: &str) -> String {
        const W: usize = 25;
        let bw_threshold = match self.binarize_mode {
            BinarizeMode::Threshold(t) => format!("{t}"),
            BinarizeMode::TargetTransparency(_) => "None".to_string(),
        };
        let target_transparency = match self.binarize_mode {
            BinarizeMode::Threshold(_) => "None".to_string(),
            BinarizeMode::TargetTransparency(a) => format!("{a}"),
        };
        format!(
            "{:<W$}OpenSimplex noise v2.0\n\
             {:<W$}{timestamp}\n\n\
             {:<W$}{}\n\
             {:<W$}{} s\n\n\
             {:<W$}{bw_threshold}\n\
             {:<W$}{target_transparency}\n\n\
             {:<W$}{}\n\
             {:<W$}{}\n\n\
             {:<W$}{}\n\
             {:<W$}{}\n\n\
             {:<W$}{}\n\
             {:<W$}{}\n\n\
             {:<W$}{} frames\n\n\
             {:<W$}{PCS_PIXEL_DIST}\n\
             {:<W$}{N_PIXELS}\n\
             {:<W$}{}\n\
             {:<W$}{}\n\
             {:<W$}{}\n\
             {:<W$}{}\n",
            "TYPE",
            "DATE",
            "N_FRAMES",
            self.n_frames,
            "DT_FRAME",
            self.dt_frame,
            "BW_THRESHOLD",
            "TARGET_TRANSPARENCY",
            "SPATIAL_FEATURE_SIZE_A",
            self.spatial_feature_size_a,
            "SPATIAL_FEATURE_SIZE_B",
            self.spatial_feature_size_b,
            "TEMPORAL_FEATURE_SIZE_A",
            self.temporal_feature_size_a,
            "TEMPORAL_FEATURE_SIZE_B",
            self.temporal_feature_size_b,
            "SEED_A",
            self.seed_a,
            "SEED_B",
            self.seed_b,
            "MIN_VALVE_DURATION",
            self.min_valve_duration,
            "PCS_PIXEL_DIST",
            "N_PIXELS",
            "X_STEP_A",
            self.x_step_a(),
            "X_STEP_B",
            self.x_step_b(),
            "T_STEP_A",
            self.t_step_a(),
            "T_STEP_B",
            self.t_step_b(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            n_frames: 100,
            dt_frame: 0.05,
            binarize_mode: BinarizeMode::TargetTransparency(0.4),
            spatial_feature_size_a: 50.0,
            spatial_feature_size_b: 0.0,
            temporal_feature_size_a: 10.0,
            temporal_feature_size_b: 0.0,
            seed_a: 1,
            seed_b: 13,
            min_valve_duration: 5,
            step_convention: StepConvention::Direct,
            rescale_symmetric: true,
            export_path_no_ext: "out/demo".to_string(),
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn negative_dt_frame_is_rejected() {
        let mut c = base_config();
        c.dt_frame = 0.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn out_of_range_target_transparency_is_rejected() {
        let mut c = base_config();
        c.binarize_mode = BinarizeMode::TargetTransparency(1.5);
        assert!(c.validate().is_err());
    }

    #[test]
    fn x_step_conventions_differ() {
        let mut c = base_config();
        c.step_convention = StepConvention::Direct;
        let direct = c.x_step_a();
        c.step_convention = StepConvention::PixelScaled;
        let scaled = c.x_step_a();
        assert_ne!(direct, scaled);
    }

    #[test]
    fn header_string_contains_keys() {
        let c = base_config();
        let header = c.header_string("2026-07-30 00:00:00");
        assert!(header.contains("N_FRAMES"));
        assert!(header.contains("TARGET_TRANSPARENCY"));
        assert!(header.contains("PCS_PIXEL_DIST"));
    }
}
