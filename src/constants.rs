// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Useful constants.
//!
//! All constants *must* be double precision.

/// Speed of light in a vacuum \[m/s\]. Shared with marlu so that baseline
/// wavelengths agree with the rest of the pipeline.
pub use marlu::constants::VEL_C;

/// Number of arcseconds in a radian.
pub const ARCSEC_PER_RADIAN: f64 = 3600.0 * 180.0 / std::f64::consts::PI;

/// Interpolated direction weights smaller than this fraction of the largest
/// weight are discarded.
pub const DIRECTION_WEIGHT_CUTOFF: f64 = 0.2;

/// The maximum number of directions blended into a single Jones matrix when
/// interpolating between direction-dependent solutions.
pub const MAX_BLENDED_DIRECTIONS: usize = 3;
