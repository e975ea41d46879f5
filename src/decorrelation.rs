//! Bandwidth and time smearing decorrelation.

use derive_builder::Builder;
use std::{f64::consts::PI, fmt::Display, str::FromStr};

use crate::{constants::VEL_C, error::ModeParseError, UVW};

/// Which kinds of smearing are corrected for.
///
/// Parsed from any combination of `F` (frequency) and `T` (time); `""` and
/// `"None"` select neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmearMode {
    /// Correct for bandwidth smearing
    pub freq: bool,
    /// Correct for time smearing
    pub time: bool,
}

impl FromStr for SmearMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut mode = SmearMode::default();
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(mode);
        }
        for c in trimmed.chars() {
            match c.to_ascii_uppercase() {
                'F' => mode.freq = true,
                'T' => mode.time = true,
                _ => return Err(ModeParseError::SmearMode(s.to_string())),
            }
        }
        Ok(mode)
    }
}

impl Display for SmearMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.freq, self.time) {
            (false, false) => write!(f, "None"),
            (freq, time) => write!(
                f,
                "{}{}",
                if freq { "F" } else { "" },
                if time { "T" } else { "" }
            ),
        }
    }
}

/// Smearing configuration for the samples of a channel.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{SmearConfigBuilder, SmearMode};
///
/// let smear_cfg = SmearConfigBuilder::default()
///     .mode("FT".parse::<SmearMode>().unwrap())
///     .mean_freq_hz(150e6)
///     .channel_width_hz(40e3)
///     .integration_time_s(2.0)
///     .build()
///     .unwrap();
/// assert!(smear_cfg.freq_smear && smear_cfg.time_smear);
/// ```
#[derive(Builder, Debug, Clone, Copy, PartialEq, Default)]
pub struct SmearConfig {
    /// Correct for bandwidth smearing
    #[builder(default)]
    pub freq_smear: bool,
    /// Correct for time smearing
    #[builder(default)]
    pub time_smear: bool,
    /// The mean frequency of the data \[Hz\]
    #[builder(default)]
    pub mean_freq_hz: f64,
    /// The width of a channel \[Hz\]
    #[builder(default)]
    pub channel_width_hz: f64,
    /// The integration time of a sample \[s\]
    #[builder(default)]
    pub integration_time_s: f64,
}

impl SmearConfigBuilder {
    /// Set both smearing flags from a [`SmearMode`].
    pub fn mode(&mut self, mode: SmearMode) -> &mut Self {
        self.freq_smear(mode.freq).time_smear(mode.time)
    }
}

impl Display for SmearConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} correct bandwidth smearing over {:.3}kHz channels.",
            if self.freq_smear { "Will" } else { "Will not" },
            self.channel_width_hz / 1e3
        )?;
        writeln!(
            f,
            "{} correct time smearing over {:.3}s at {:.3}MHz.",
            if self.time_smear { "Will" } else { "Will not" },
            self.integration_time_s,
            self.mean_freq_hz / 1e6
        )?;
        Ok(())
    }
}

impl SmearConfig {
    /// The smearing mode this config corrects for.
    pub fn mode(&self) -> SmearMode {
        SmearMode {
            freq: self.freq_smear,
            time: self.time_smear,
        }
    }

    /// Is any smearing corrected for?
    pub fn is_enabled(&self) -> bool {
        self.freq_smear || self.time_smear
    }

    /// A one line description of the smearing correction.
    pub fn as_comment(&self) -> String {
        match (self.freq_smear, self.time_smear) {
            (false, false) => "no smearing correction".to_string(),
            (true, false) => "bandwidth smearing".to_string(),
            (false, true) => "time smearing".to_string(),
            (true, true) => "bandwidth and time smearing".to_string(),
        }
    }
}

/// `sin(phi) / phi`, taken as its limit when phi is exactly zero.
#[allow(clippy::float_cmp)]
#[inline]
fn sinc(phi: f64) -> f64 {
    if phi == 0. {
        1.
    } else {
        phi.sin() / phi
    }
}

/// The attenuation of a visibility by smearing over a channel and an
/// integration, in `(0, 1]`.
///
/// `uvw` is the baseline in metres, `uvw_rate` its time derivative in metres
/// per second, and `(l, m)` the direction cosines of the facet centre.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{decorrelation_factor, SmearConfig, UVW};
///
/// let uvw = UVW { u: 100., v: 0., w: 0. };
/// let uvw_rate = UVW { u: 0., v: 0., w: 0. };
/// assert_eq!(decorrelation_factor(uvw, uvw_rate, 0.01, 0., &SmearConfig::default()), 1.0);
/// ```
#[inline]
pub fn decorrelation_factor(uvw: UVW, uvw_rate: UVW, l: f64, m: f64, cfg: &SmearConfig) -> f64 {
    let n = (1. - l * l - m * m).sqrt() - 1.;
    let mut factor = 1.;

    if cfg.freq_smear {
        let phase = uvw.u * l + uvw.v * m + uvw.w * n;
        factor *= sinc(PI * (cfg.channel_width_hz / VEL_C) * phase);
    }

    if cfg.time_smear {
        let dphase = (uvw_rate.u * l + uvw_rate.v * m + uvw_rate.w * n) * cfg.integration_time_s;
        factor *= sinc(PI * (cfg.mean_freq_hz / VEL_C) * dphase);
    }

    factor
}
