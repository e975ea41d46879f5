//! Amplitude / phase normalisation of Jones matrices, with a model of the
//! calibration error growing with baseline length.

use derive_builder::Builder;
use log::{trace, warn};
use std::{f64::consts::PI, fmt::Display, str::FromStr};

use crate::{
    algebra::{PolContext, PolMatrix},
    c64,
    constants::ARCSEC_PER_RADIAN,
    error::ModeParseError,
    UVW,
};

/// Which parts of the direction-dependent solutions are applied.
///
/// Parsed from any combination of `A` (amplitude) and `P` (phase), e.g. `"AP"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DDMode {
    /// Apply the solutions' amplitudes
    pub apply_amp: bool,
    /// Apply the solutions' phases
    pub apply_phase: bool,
}

impl Default for DDMode {
    fn default() -> Self {
        Self {
            apply_amp: true,
            apply_phase: true,
        }
    }
}

impl FromStr for DDMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut mode = DDMode {
            apply_amp: false,
            apply_phase: false,
        };
        for c in s.trim().chars() {
            match c.to_ascii_uppercase() {
                'A' => mode.apply_amp = true,
                'P' => mode.apply_phase = true,
                _ => return Err(ModeParseError::DDMode(s.to_string())),
            }
        }
        Ok(mode)
    }
}

/// The calibration error model: solutions lose credibility on longer
/// baselines, and are blended towards a pure phasor as they do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibErrorModel {
    /// The calibration error \[radians\]
    pub calib_error_rad: f64,
    /// The mean wavelength of the data \[metres\]
    pub mean_wavelength_m: f64,
}

impl CalibErrorModel {
    /// A model from an error in radians and a mean wavelength in metres.
    pub fn new(calib_error_rad: f64, mean_wavelength_m: f64) -> Self {
        if mean_wavelength_m <= 0. {
            warn!(
                "calibration error model has a non-positive mean wavelength {mean_wavelength_m}m"
            );
        }
        Self {
            calib_error_rad,
            mean_wavelength_m,
        }
    }

    /// A model from an error in arcseconds, the unit the imager is configured in.
    pub fn from_arcsec(calib_error_arcsec: f64, mean_wavelength_m: f64) -> Self {
        Self::new(calib_error_arcsec / ARCSEC_PER_RADIAN, mean_wavelength_m)
    }

    /// The blending factor for a baseline, `exp(-2π·err²·(u²+v²)/λ²)`.
    ///
    /// 1 keeps the solution as it is, 0 replaces it with its unit phasor.
    #[inline]
    pub fn alpha(&self, u: f64, v: f64) -> f64 {
        let r2 = (u * u + v * v) / (self.mean_wavelength_m * self.mean_wavelength_m);
        let err2 = self.calib_error_rad * self.calib_error_rad;
        (-2. * PI * err2 * r2).exp()
    }
}

/// How the combined Jones matrix is normalised before it is applied.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{CalibErrorModel, NormaliseConfigBuilder};
///
/// let norm_cfg = NormaliseConfigBuilder::default()
///     .apply_amp(false)
///     .calib_error(CalibErrorModel::from_arcsec(1.0, 2.0))
///     .build()
///     .unwrap();
/// assert!(norm_cfg.apply_phase);
/// assert_eq!(norm_cfg.as_comment(), "phase-only, calibration error scaling");
/// ```
#[derive(Builder, Debug, Clone, Copy, PartialEq)]
pub struct NormaliseConfig {
    /// Whether the solutions' amplitudes are kept
    #[builder(default = "true")]
    pub apply_amp: bool,
    /// Whether the solutions' phases are kept
    #[builder(default = "true")]
    pub apply_phase: bool,
    /// If set, blend solutions towards their unit phasor on long baselines
    #[builder(default, setter(strip_option))]
    pub calib_error: Option<CalibErrorModel>,
}

impl Default for NormaliseConfig {
    fn default() -> Self {
        Self {
            apply_amp: true,
            apply_phase: true,
            calib_error: None,
        }
    }
}

impl Display for NormaliseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} apply solution amplitudes.",
            if self.apply_amp { "Will" } else { "Will not" }
        )?;
        writeln!(
            f,
            "{} apply solution phases.",
            if self.apply_phase { "Will" } else { "Will not" }
        )?;
        match &self.calib_error {
            Some(model) => writeln!(
                f,
                "Will scale solutions by a calibration error of {:.3}\" at {:.3}m.",
                model.calib_error_rad * ARCSEC_PER_RADIAN,
                model.mean_wavelength_m
            )?,
            None => writeln!(f, "Will not scale solutions by a calibration error.")?,
        }
        Ok(())
    }
}

impl NormaliseConfig {
    /// A config from the imager's DD mode and an optional error model.
    pub fn from_dd_mode(mode: DDMode, calib_error: Option<CalibErrorModel>) -> Self {
        trace!("NormaliseConfig::from_dd_mode {mode:?} {calib_error:?}");
        Self {
            apply_amp: mode.apply_amp,
            apply_phase: mode.apply_phase,
            calib_error,
        }
    }

    /// Does normalising leave every matrix untouched?
    pub fn is_noop(&self) -> bool {
        self.apply_amp && self.apply_phase && self.calib_error.is_none()
    }

    /// A one line description of the normalisation.
    pub fn as_comment(&self) -> String {
        let mut parts = vec![];
        match (self.apply_amp, self.apply_phase) {
            (true, true) => {}
            (false, true) => parts.push("phase-only"),
            (true, false) => parts.push("amplitude-only"),
            (false, false) => parts.push("unity"),
        }
        if self.calib_error.is_some() {
            parts.push("calibration error scaling");
        }
        if parts.is_empty() {
            "full solutions".to_string()
        } else {
            parts.join(", ")
        }
    }

    /// Normalise `jones` in place for a baseline. See [`normalise_jones`].
    #[inline]
    pub fn normalise(&self, ctx: &PolContext, jones: &mut PolMatrix, uvw: &UVW) {
        normalise_jones(
            ctx,
            jones,
            self.apply_amp,
            self.apply_phase,
            self.calib_error.as_ref(),
            uvw,
        );
    }
}

/// Normalise a Jones matrix in place.
///
/// In this order, over the slots the matrix's kind defines:
/// - without `apply_amp`, every slot with non-zero amplitude is divided by its
///   amplitude, keeping only its phase;
/// - without `apply_phase`, every slot is replaced by its (real) amplitude;
/// - with a `calib_error` model, every slot with non-zero amplitude becomes
///   `(1 - α)·phasor + α·slot`, with α from [`CalibErrorModel::alpha`] for the
///   baseline's `u` and `v`.
#[allow(clippy::float_cmp)]
#[inline]
pub fn normalise_jones(
    ctx: &PolContext,
    jones: &mut PolMatrix,
    apply_amp: bool,
    apply_phase: bool,
    calib_error: Option<&CalibErrorModel>,
    uvw: &UVW,
) {
    let slots = ctx.active_kind(jones.kind()).slots();
    let m = jones.slots_mut();

    if !apply_amp {
        for &slot in slots {
            let amp = m[slot].norm();
            if amp != 0. {
                m[slot] /= amp;
            }
        }
    }

    if !apply_phase {
        for &slot in slots {
            m[slot] = c64::new(m[slot].norm(), 0.);
        }
    }

    if let Some(model) = calib_error {
        let alpha = model.alpha(uvw.u, uvw.v);
        for &slot in slots {
            let amp = m[slot].norm();
            if amp != 0. {
                let phasor = m[slot] / amp;
                m[slot] = phasor * (1. - alpha) + m[slot] * alpha;
            }
        }
    }

    jones.sync_mirror();
}
