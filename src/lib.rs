#![warn(missing_docs)]
#![warn(clippy::missing_safety_doc)]
#![warn(clippy::missing_errors_doc)]

//! ddecorr is a library of the per-visibility kernels a direction-dependent
//! gridder applies when correcting visibilities: reduced 2x2 Jones matrix
//! algebra, blending of direction-dependent calibration solutions,
//! calibration-error normalisation and smearing decorrelation.
//!
//! # Examples
//!
//! Here's an example of correcting a visibility on one baseline for a facet
//!
//! ```rust
//! use ddecorr::{
//!     apply_inverse_jones, baseline_jones, c64, decorrelation_factor, ndarray::Array4,
//!     ClusterDirections, DirectionSelection, InterpMode, Jones, JonesTensor, MatrixKind,
//!     NormaliseConfig, PolContextBuilder, PolMatrix, SmearConfigBuilder, UVW,
//! };
//!
//! // diagonal solutions with dimensions [timestep][direction][antenna][channel]
//! let solutions = Array4::from_shape_fn((1, 3, 2, 1), |(_, d, a, _)| {
//!     let g = c64::from_polar(1.0 + 0.1 * a as f64, 0.2 * d as f64);
//!     Jones::from([g, c64::new(0., 0.), c64::new(0., 0.), g.conj()])
//! });
//!
//! // the processing mode is fixed before any matrix is touched
//! let ctx = PolContextBuilder::default()
//!     .jones_kind("Diag".parse::<MatrixKind>().unwrap())
//!     .build()
//!     .unwrap();
//! let tensor = JonesTensor::new(solutions.view(), ctx.jones_kind);
//!
//! // blend the directions surrounding the facet centre
//! let (l0, m0) = (0.01, -0.02);
//! let dirs = ClusterDirections::new(
//!     vec![0.0, 0.02, -0.05],
//!     vec![0.0, -0.01, 0.04],
//!     vec![5.0, 2.0, 1.0],
//! )
//! .unwrap();
//! let selection = DirectionSelection::new(
//!     &dirs,
//!     "Krigging".parse::<InterpMode>().unwrap(),
//!     l0,
//!     m0,
//!     0.01,
//!     1.0,
//! );
//!
//! let uvw = UVW { u: 250., v: -80., w: 4. };
//! let (j1, j2) = baseline_jones(&ctx, &tensor, 0, (0, 1), &selection, &NormaliseConfig::default(), &uvw);
//!
//! // correct a measured visibility, and weight it by its decorrelation
//! let vis = PolMatrix::from(Jones::identity());
//! let corrected = apply_inverse_jones(&ctx, &j1, &vis, &j2);
//! assert!(!corrected.any_nan());
//!
//! let smear_cfg = SmearConfigBuilder::default()
//!     .freq_smear(true)
//!     .channel_width_hz(40e3)
//!     .build()
//!     .unwrap();
//! let uvw_rate = UVW { u: 0.01, v: 0.02, w: 0. };
//! let factor = decorrelation_factor(uvw, uvw_rate, l0, m0, &smear_cfg);
//! assert!(factor > 0.0 && factor <= 1.0);
//! ```
//!
//! # Details
//!
//! A facet may also be corrected for a primary beam, see [`FacetSolutions`].
//!
//! Every operation takes an explicit [`PolContext`] rather than reading a
//! global, and none of the per-visibility operations allocate, log or return
//! errors, so they can be called concurrently from any number of threads on
//! disjoint samples.

pub mod algebra;
pub use algebra::{MatrixKind, PolContext, PolContextBuilder, PolMatrix, ProcessMode};

pub mod jones;
pub use jones::JonesTensor;

pub mod normalise;
pub use normalise::{
    normalise_jones, CalibErrorModel, DDMode, NormaliseConfig, NormaliseConfigBuilder,
};

pub mod decorrelation;
pub use decorrelation::{decorrelation_factor, SmearConfig, SmearConfigBuilder, SmearMode};

pub mod directions;
pub use directions::{ClusterDirections, DirectionSelection, InterpMode};

pub mod calibration;
pub use calibration::{
    apply_inverse_jones, apply_jones, baseline_jones, combine_and_correct, FacetSolutions,
};

pub mod constants;

pub mod error;
pub use error::DDECorrError;

pub use marlu::{self, c64, ndarray, Complex, Jones, UVW};

#[cfg(test)]
mod types;

#[cfg(test)]
mod test_common;
