//! Errors that can occur while configuring the correction kernels.
//!
//! None of these are produced by the per-visibility operations themselves;
//! they come from parsing options, validating contexts and wrapping caller
//! buffers.

use thiserror::Error;

use crate::{
    algebra::PolContextBuilderError, decorrelation::SmearConfigBuilderError,
    directions::DirectionError, normalise::NormaliseConfigBuilderError,
};

#[derive(Error, Debug)]
/// All the errors that can occur when setting up the correction kernels
pub enum DDECorrError {
    #[error(transparent)]
    /// Error for an option string that couldn't be parsed
    ModeParse(#[from] ModeParseError),

    #[error(transparent)]
    /// Error for bad array shape in provided argument
    BadArrayShape(#[from] BadArrayShape),

    #[error(transparent)]
    /// Error derived from [`crate::directions::DirectionError`]
    Direction(#[from] DirectionError),

    #[error("invalid polarisation context: {0}")]
    /// Error derived from [`crate::algebra::PolContextBuilderError`]
    PolContext(#[from] PolContextBuilderError),

    #[error("invalid normalisation config: {0}")]
    /// Error derived from [`crate::normalise::NormaliseConfigBuilderError`]
    NormaliseConfig(#[from] NormaliseConfigBuilderError),

    #[error("invalid smearing config: {0}")]
    /// Error derived from [`crate::decorrelation::SmearConfigBuilderError`]
    SmearConfig(#[from] SmearConfigBuilderError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
/// Errors from parsing the imager's mode strings
pub enum ModeParseError {
    #[error("unrecognised Jones mode \"{0}\", expected one of Scalar, Diag or Full")]
    /// A [`crate::MatrixKind`] string that isn't Scalar, Diag or Full
    JonesMode(String),

    #[error("unrecognised smearing mode \"{0}\", expected any combination of F and T")]
    /// A [`crate::SmearMode`] string with characters other than F and T
    SmearMode(String),

    #[error("unrecognised DD mode \"{0}\", expected any combination of A and P")]
    /// A [`crate::DDMode`] string with characters other than A and P
    DDMode(String),

    #[error("unrecognised interpolation mode \"{0}\", expected Nearest or Krigging")]
    /// An [`crate::InterpMode`] string that isn't Nearest or Krigging
    InterpMode(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bad array shape supplied to argument {argument} of function {function}. expected {expected}, received {received}")]
/// Error for bad array shape in provided argument
pub struct BadArrayShape {
    /// The argument name within the function
    pub argument: &'static str,
    /// The function name
    pub function: &'static str,
    /// The expected shape
    pub expected: String,
    /// The shape that was received instead
    pub received: String,
}
