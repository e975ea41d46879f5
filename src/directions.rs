//! Choosing which direction-dependent solutions apply to a facet.
//!
//! A facet either takes the solutions of the nearest cluster direction, or
//! blends up to [`MAX_BLENDED_DIRECTIONS`] directions with weights falling off
//! with distance and scaling with the cluster's apparent flux.

use itertools::{izip, Itertools};
use log::{debug, trace, warn};
use std::{fmt::Display, str::FromStr};
use thiserror::Error;

use crate::{
    constants::{DIRECTION_WEIGHT_CUTOFF, MAX_BLENDED_DIRECTIONS},
    error::ModeParseError,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors from building a list of cluster directions
pub enum DirectionError {
    #[error("direction lists have different lengths: {l} l, {m} m, {flux} flux")]
    /// The per-direction lists don't line up
    LengthMismatch {
        /// Number of l values
        l: usize,
        /// Number of m values
        m: usize,
        /// Number of flux values
        flux: usize,
    },

    #[error("no cluster directions were provided")]
    /// At least one direction is needed to select from
    NoDirections,
}

/// How a facet's solutions are taken from the cluster directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpMode {
    /// Use the solutions of the nearest direction
    #[default]
    Nearest,
    /// Blend the solutions of several directions
    Krigging,
}

impl FromStr for InterpMode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "krigging" | "kriging" => Ok(Self::Krigging),
            _ => Err(ModeParseError::InterpMode(s.to_string())),
        }
    }
}

impl Display for InterpMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nearest => write!(f, "Nearest"),
            Self::Krigging => write!(f, "Krigging"),
        }
    }
}

/// The centres and apparent fluxes of the directions solutions were derived for.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterDirections {
    l: Vec<f64>,
    m: Vec<f64>,
    flux: Vec<f64>,
}

impl ClusterDirections {
    /// Build from per-direction direction cosines and apparent fluxes.
    ///
    /// # Errors
    ///
    /// Returns [`DirectionError::LengthMismatch`] if the lists have different
    /// lengths, or [`DirectionError::NoDirections`] if they are empty.
    pub fn new(l: Vec<f64>, m: Vec<f64>, flux: Vec<f64>) -> Result<Self, DirectionError> {
        trace!("ClusterDirections::new");
        if l.len() != m.len() || l.len() != flux.len() {
            return Err(DirectionError::LengthMismatch {
                l: l.len(),
                m: m.len(),
                flux: flux.len(),
            });
        }
        if l.is_empty() {
            return Err(DirectionError::NoDirections);
        }
        Ok(Self { l, m, flux })
    }

    /// The number of directions.
    pub fn len(&self) -> usize {
        self.l.len()
    }

    /// Always false, construction requires a direction.
    pub fn is_empty(&self) -> bool {
        self.l.is_empty()
    }

    fn distances(&self, l0: f64, m0: f64) -> impl Iterator<Item = f64> + '_ {
        izip!(&self.l, &self.m).map(move |(&lc, &mc)| ((l0 - lc).powi(2) + (m0 - mc).powi(2)).sqrt())
    }

    /// The index of the direction closest to `(l0, m0)`. The first index wins
    /// ties.
    pub fn nearest(&self, l0: f64, m0: f64) -> usize {
        self.distances(l0, m0)
            .enumerate()
            .fold((0, f64::INFINITY), |(best, best_d), (idx, d)| {
                if d < best_d {
                    (idx, d)
                } else {
                    (best, best_d)
                }
            })
            .0
    }

    /// Blending weights for a facet centred on `(l0, m0)`, one per direction.
    ///
    /// Each direction is weighted by `flux / (1 + d / scale_rad)^gamma`, for a
    /// distance `d` from the facet centre. Weights below
    /// [`DIRECTION_WEIGHT_CUTOFF`] of the largest are dropped, at most
    /// [`MAX_BLENDED_DIRECTIONS`] are kept, and the result sums to 1.
    ///
    /// If no direction has any weight, the nearest direction gets all of it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddecorr::ClusterDirections;
    ///
    /// let dirs = ClusterDirections::new(
    ///     vec![0.0, 0.01, -0.01, 0.2],
    ///     vec![0.0, 0.0, 0.0, 0.2],
    ///     vec![1.0, 1.0, 1.0, 1.0],
    /// )
    /// .unwrap();
    /// let weights = dirs.interpolation_weights(0.0, 0.0, 0.01, 1.0);
    /// assert_eq!(weights[3], 0.0);
    /// assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    /// ```
    pub fn interpolation_weights(&self, l0: f64, m0: f64, scale_rad: f64, gamma: f64) -> Vec<f64> {
        let mut weights = izip!(self.distances(l0, m0), &self.flux)
            .map(|(d, &flux)| flux / (1. + d / scale_rad).powf(gamma))
            .collect_vec();

        let sum: f64 = weights.iter().sum();
        if sum.is_nan() || sum <= 0. {
            let nearest = self.nearest(l0, m0);
            warn!(
                "direction weights around ({l0}, {m0}) sum to {sum}, using the nearest direction {nearest}"
            );
            weights.iter_mut().for_each(|w| *w = 0.);
            weights[nearest] = 1.;
            return weights;
        }
        weights.iter_mut().for_each(|w| *w /= sum);

        let cutoff = DIRECTION_WEIGHT_CUTOFF * weights.iter().copied().fold(f64::MIN, f64::max);
        weights
            .iter_mut()
            .filter(|w| **w < cutoff)
            .for_each(|w| *w = 0.);

        // stable, so the lower index wins ties
        let dropped = (0..weights.len())
            .sorted_by(|&a, &b| weights[b].total_cmp(&weights[a]))
            .skip(MAX_BLENDED_DIRECTIONS)
            .collect_vec();
        for idx in dropped {
            weights[idx] = 0.;
        }

        let sum: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= sum);
        weights
    }
}

/// The solutions a facet uses.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectionSelection {
    /// A single direction's solutions
    Direct {
        /// The direction index
        dir: usize,
    },
    /// A blend of directions' solutions, one weight per direction
    Weighted {
        /// The per-direction weights
        weights: Vec<f64>,
    },
}

impl DirectionSelection {
    /// Select the solutions for a facet centred on `(l0, m0)`.
    ///
    /// `scale_rad` and `gamma` shape the blending weights of
    /// [`InterpMode::Krigging`], see [`ClusterDirections::interpolation_weights`].
    pub fn new(
        dirs: &ClusterDirections,
        mode: InterpMode,
        l0: f64,
        m0: f64,
        scale_rad: f64,
        gamma: f64,
    ) -> Self {
        let selection = match mode {
            InterpMode::Nearest => Self::Direct {
                dir: dirs.nearest(l0, m0),
            },
            InterpMode::Krigging => Self::Weighted {
                weights: dirs.interpolation_weights(l0, m0, scale_rad, gamma),
            },
        };
        debug!("{mode} direction selection for ({l0}, {m0}): {selection}");
        selection
    }
}

impl Display for DirectionSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct { dir } => write!(f, "direction {dir}"),
            Self::Weighted { weights } => write!(
                f,
                "{}",
                weights
                    .iter()
                    .enumerate()
                    .filter(|(_, &w)| w > 0.)
                    .map(|(dir, w)| format!("direction {dir} ({w:.3})"))
                    .join(", ")
            ),
        }
    }
}
