//! 2x2 complex matrix algebra over reduced Jones representations.
//!
//! Most direction-dependent solutions are scalar or diagonal, so a
//! [`PolMatrix`] carries a [`MatrixKind`] and every operation only touches the
//! slots that kind defines. Storage is always the row-major `[J00, J01, J10,
//! J11]` layout used by [`marlu::Jones`]:
//!
//! | kind | slots read / written |
//! | --- | --- |
//! | [`MatrixKind::Scalar`] | `0`, mirrored into `3` |
//! | [`MatrixKind::Diagonal`] | `0`, `3` |
//! | [`MatrixKind::Full`] | `0`, `1`, `2`, `3` |
//!
//! Every operation lives on [`PolContext`], which is fixed before the first
//! visibility is processed, so the process-wide polarisation mode decides how
//! many slots are computed. In full-scalar mode every result is a scalar of
//! the operands' first slots.

use derive_builder::Builder;
use log::{debug, trace};
use std::{
    fmt::{Debug, Display},
    ops::Index,
    str::FromStr,
};

use crate::{c64, error::ModeParseError, Jones};

const ZERO: c64 = c64::new(0.0, 0.0);
const ONE: c64 = c64::new(1.0, 0.0);

/// Which entries of a 2x2 matrix are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum MatrixKind {
    /// A single value, implicitly on both diagonal entries.
    Scalar,
    /// The two diagonal entries.
    Diagonal,
    /// All four entries.
    #[default]
    Full,
}

impl MatrixKind {
    /// The storage slots this kind defines.
    pub const fn slots(self) -> &'static [usize] {
        match self {
            MatrixKind::Scalar => &[0],
            MatrixKind::Diagonal => &[0, 3],
            MatrixKind::Full => &[0, 1, 2, 3],
        }
    }
}

impl FromStr for MatrixKind {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scalar" => Ok(MatrixKind::Scalar),
            "diag" | "diagonal" => Ok(MatrixKind::Diagonal),
            "full" => Ok(MatrixKind::Full),
            _ => Err(ModeParseError::JonesMode(s.to_string())),
        }
    }
}

impl Display for MatrixKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                MatrixKind::Scalar => "Scalar",
                MatrixKind::Diagonal => "Diag",
                MatrixKind::Full => "Full",
            }
        )
    }
}

/// Whether polarisation algebra is carried out at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessMode {
    /// Matrices are 2x2 (possibly reduced), cross terms are computed.
    #[default]
    Polarised,
    /// Every matrix degenerates to its first entry.
    FullScalar,
}

impl ProcessMode {
    /// The number of polarisation slots every component works with.
    pub const fn n_pol(self) -> usize {
        match self {
            ProcessMode::Polarised => 4,
            ProcessMode::FullScalar => 1,
        }
    }
}

/// The polarisation context shared by every correction kernel.
///
/// This is built once, before any visibility is touched, and then passed by
/// reference (it is `Copy`) to every call. It is never mutated afterwards, so
/// it can be shared freely between worker threads.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{MatrixKind, PolContextBuilder, ProcessMode};
///
/// let ctx = PolContextBuilder::default()
///     .mode(ProcessMode::Polarised)
///     .jones_kind(MatrixKind::Diagonal)
///     .build()
///     .unwrap();
/// assert_eq!(ctx.n_pol(), 4);
///
/// // full-scalar mode only makes sense with scalar solutions
/// assert!(PolContextBuilder::default()
///     .mode(ProcessMode::FullScalar)
///     .jones_kind(MatrixKind::Full)
///     .build()
///     .is_err());
/// ```
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct PolContext {
    /// Whether polarisation algebra is carried out
    #[builder(default)]
    pub mode: ProcessMode,
    /// The representation of the direction-dependent solutions
    #[builder(default)]
    pub jones_kind: MatrixKind,
}

impl PolContextBuilder {
    fn validate(&self) -> Result<(), String> {
        trace!("start PolContextBuilder::validate");
        let mode = self.mode.unwrap_or_default();
        let kind = self.jones_kind.unwrap_or_default();
        if mode == ProcessMode::FullScalar && kind != MatrixKind::Scalar {
            return Err(format!(
                "full-scalar mode requires scalar Jones matrices, but Jones mode is {kind}"
            ));
        }
        Ok(())
    }
}

impl Display for PolContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} compute polarisation cross terms.",
            if self.is_full_scalar() {
                "Will not"
            } else {
                "Will"
            }
        )?;
        writeln!(f, "Jones mode: {}", self.jones_kind)?;
        Ok(())
    }
}

impl PolContext {
    /// A context for fully polarised processing of solutions of the given kind.
    pub fn polarised(jones_kind: MatrixKind) -> Self {
        let ctx = Self {
            mode: ProcessMode::Polarised,
            jones_kind,
        };
        debug!("polarisation context: {ctx:?}");
        ctx
    }

    /// A context in which every matrix is a single complex scalar.
    pub fn full_scalar() -> Self {
        let ctx = Self {
            mode: ProcessMode::FullScalar,
            jones_kind: MatrixKind::Scalar,
        };
        debug!("polarisation context: {ctx:?}");
        ctx
    }

    /// The number of polarisation slots in use, 1 or 4.
    #[inline]
    pub const fn n_pol(&self) -> usize {
        self.mode.n_pol()
    }

    /// Is every matrix collapsed to a single scalar?
    #[inline]
    pub fn is_full_scalar(&self) -> bool {
        self.mode == ProcessMode::FullScalar
    }

    /// The kind an operation actually works with, given the operand's kind.
    #[inline]
    pub fn active_kind(&self, kind: MatrixKind) -> MatrixKind {
        if self.is_full_scalar() {
            MatrixKind::Scalar
        } else {
            kind
        }
    }

    /// A one line description of the polarisation handling.
    pub fn as_comment(&self) -> String {
        if self.is_full_scalar() {
            "full-scalar Jones".to_string()
        } else {
            format!("{} Jones", self.jones_kind)
        }
    }

    /// Invert a matrix.
    ///
    /// In full-scalar mode this is `1/A[0]`, otherwise the exact inverse of
    /// the 2x2 matrix, computed from the determinant `A0·A3 − A2·A1` for full
    /// matrices. The caller must guarantee the matrix is not singular; a
    /// singular matrix gives non-finite entries rather than an error (see
    /// [`PolMatrix::det`]).
    #[inline]
    pub fn invert(&self, a: &PolMatrix) -> PolMatrix {
        let m = &a.m;
        match self.active_kind(a.kind) {
            MatrixKind::Scalar => PolMatrix::scalar(ONE / m[0]),
            MatrixKind::Diagonal => PolMatrix::diagonal(ONE / m[0], ONE / m[3]),
            MatrixKind::Full => {
                let inv_det = ONE / (m[0] * m[3] - m[2] * m[1]);
                PolMatrix::full([
                    inv_det * m[3],
                    -inv_det * m[1],
                    -inv_det * m[2],
                    inv_det * m[0],
                ])
            }
        }
    }

    /// The Hermitian transpose (conjugate transpose), `A^H`.
    #[inline]
    pub fn hermitian(&self, a: &PolMatrix) -> PolMatrix {
        let m = &a.m;
        match self.active_kind(a.kind) {
            MatrixKind::Scalar => PolMatrix::scalar(m[0].conj()),
            MatrixKind::Diagonal => PolMatrix::diagonal(m[0].conj(), m[3].conj()),
            MatrixKind::Full => {
                PolMatrix::full([m[0].conj(), m[2].conj(), m[1].conj(), m[3].conj()])
            }
        }
    }

    /// The transpose, `A^T`.
    #[inline]
    pub fn transpose(&self, a: &PolMatrix) -> PolMatrix {
        let m = &a.m;
        match self.active_kind(a.kind) {
            MatrixKind::Scalar => PolMatrix::scalar(m[0]),
            MatrixKind::Diagonal => PolMatrix::diagonal(m[0], m[3]),
            MatrixKind::Full => PolMatrix::full([m[0], m[2], m[1], m[3]]),
        }
    }

    /// The element-wise complex conjugate, `A^*`.
    #[inline]
    pub fn conjugate(&self, a: &PolMatrix) -> PolMatrix {
        let m = &a.m;
        match self.active_kind(a.kind) {
            MatrixKind::Scalar => PolMatrix::scalar(m[0].conj()),
            MatrixKind::Diagonal => PolMatrix::diagonal(m[0].conj(), m[3].conj()),
            MatrixKind::Full => {
                PolMatrix::full([m[0].conj(), m[1].conj(), m[2].conj(), m[3].conj()])
            }
        }
    }

    /// Multiply `a` in place by `lambda`.
    ///
    /// In full-scalar mode `a` collapses to a scalar of `a[0]·lambda`,
    /// otherwise the slots `a`'s kind defines are scaled.
    #[inline]
    pub fn scale(&self, a: &mut PolMatrix, lambda: c64) {
        if self.is_full_scalar() {
            *a = PolMatrix::scalar(a.m[0] * lambda);
        } else {
            a.scale(lambda);
        }
    }

    /// Accumulate `lambda·b` into `out`.
    ///
    /// In full-scalar mode `out` collapses to a scalar of `out[0] + lambda·b[0]`.
    /// Otherwise `out`'s kind decides which slots exist and `b`'s kind decides
    /// which values are read:
    ///
    /// | out \ b | Scalar | Diagonal | Full |
    /// | --- | --- | --- | --- |
    /// | Scalar | `o0 += λb0` | `o0 += λb0` | `o0 += λb0` |
    /// | Diagonal | `o0 += λb0, o3 += λb0` | `o0 += λb0, o3 += λb3` | `o0 += λb0, o3 += λb3` |
    /// | Full | `o0 += λb0, o3 += λb0` | `o0 += λb0, o3 += λb3` | all four |
    ///
    /// A scalar output keeps slot 3 mirrored, and the off-diagonal slots of a
    /// full output are untouched by a reduced `b`.
    #[inline]
    pub fn add_scaled(&self, out: &mut PolMatrix, b: &PolMatrix, lambda: c64) {
        if self.is_full_scalar() {
            *out = PolMatrix::scalar(out.m[0] + b.m[0] * lambda);
        } else {
            out.add_scaled(b, lambda);
        }
    }

    /// The matrix product `a · b`.
    ///
    /// In full-scalar mode this is the scalar `a[0]·b[0]` and no cross terms
    /// are computed. Otherwise the result has the larger of the two kinds;
    /// reduced operands are specialised to element-wise or diagonal-scaling
    /// forms, which are exactly the full product of the matrices they
    /// represent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddecorr::{c64, MatrixKind, PolContext, PolMatrix};
    ///
    /// let a = PolMatrix::diagonal(c64::new(2.0, 0.0), c64::new(3.0, 0.0));
    /// let b = PolMatrix::full([c64::new(1.0, 0.0); 4]);
    ///
    /// let ab = PolContext::polarised(MatrixKind::Full).dot(&a, &b);
    /// assert_eq!(ab.kind(), MatrixKind::Full);
    /// assert_eq!(ab[1], c64::new(2.0, 0.0));
    /// assert_eq!(ab[2], c64::new(3.0, 0.0));
    ///
    /// let ab = PolContext::full_scalar().dot(&a, &b);
    /// assert_eq!(ab, PolMatrix::scalar(c64::new(2.0, 0.0)));
    /// ```
    #[inline]
    pub fn dot(&self, a: &PolMatrix, b: &PolMatrix) -> PolMatrix {
        if self.is_full_scalar() {
            PolMatrix::scalar(a.m[0] * b.m[0])
        } else {
            a.dot(b)
        }
    }
}

/// A complex 2x2 matrix stored in one of the reduced representations.
///
/// Slots a kind doesn't define are held at zero and never read; a scalar
/// keeps its value mirrored into slot 3.
#[derive(Clone, Copy, PartialEq)]
pub struct PolMatrix {
    kind: MatrixKind,
    m: [c64; 4],
}

impl PolMatrix {
    /// A scalar matrix `z·I`.
    #[inline]
    pub const fn scalar(z: c64) -> Self {
        Self {
            kind: MatrixKind::Scalar,
            m: [z, ZERO, ZERO, z],
        }
    }

    /// A diagonal matrix `diag(xx, yy)`.
    #[inline]
    pub const fn diagonal(xx: c64, yy: c64) -> Self {
        Self {
            kind: MatrixKind::Diagonal,
            m: [xx, ZERO, ZERO, yy],
        }
    }

    /// A full matrix, row-major.
    #[inline]
    pub const fn full(m: [c64; 4]) -> Self {
        Self {
            kind: MatrixKind::Full,
            m,
        }
    }

    /// The identity, in the given representation.
    pub const fn identity(kind: MatrixKind) -> Self {
        match kind {
            MatrixKind::Scalar => Self::scalar(ONE),
            MatrixKind::Diagonal => Self::diagonal(ONE, ONE),
            MatrixKind::Full => Self::full([ONE, ZERO, ZERO, ONE]),
        }
    }

    /// All zeros, in the given representation.
    pub const fn zero(kind: MatrixKind) -> Self {
        Self {
            kind,
            m: [ZERO; 4],
        }
    }

    /// Build from raw slots, keeping only what `kind` defines.
    #[inline]
    pub(crate) fn from_slots(kind: MatrixKind, m: [c64; 4]) -> Self {
        match kind {
            MatrixKind::Scalar => Self::scalar(m[0]),
            MatrixKind::Diagonal => Self::diagonal(m[0], m[3]),
            MatrixKind::Full => Self::full(m),
        }
    }

    /// Read a stored Jones matrix as the given kind.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddecorr::{c64, Jones, MatrixKind, PolMatrix};
    ///
    /// let j = Jones::from([
    ///     c64::new(1.0, 1.0),
    ///     c64::new(0.1, 0.0),
    ///     c64::new(0.0, 0.1),
    ///     c64::new(2.0, 0.0),
    /// ]);
    /// let diag = PolMatrix::from_jones(MatrixKind::Diagonal, &j);
    /// assert_eq!(diag[1], c64::new(0.0, 0.0));
    /// assert_eq!(diag[3], c64::new(2.0, 0.0));
    /// ```
    #[inline]
    pub fn from_jones(kind: MatrixKind, j: &Jones<f64>) -> Self {
        Self::from_slots(kind, [j[0], j[1], j[2], j[3]])
    }

    /// Expand to a full 2x2 [`Jones`] matrix.
    pub fn to_jones(&self) -> Jones<f64> {
        Jones::from(self.m)
    }

    /// The representation of this matrix.
    #[inline]
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// The raw storage slots.
    #[inline]
    pub fn entries(&self) -> &[c64; 4] {
        &self.m
    }

    /// The amplitude of a storage slot.
    #[inline]
    pub fn amplitude(&self, slot: usize) -> f64 {
        self.m[slot].norm()
    }

    /// The determinant of the 2x2 matrix this represents.
    pub fn det(&self) -> c64 {
        self.m[0] * self.m[3] - self.m[2] * self.m[1]
    }

    /// Are any of the defined slots NaN?
    pub fn any_nan(&self) -> bool {
        self.kind
            .slots()
            .iter()
            .any(|&slot| self.m[slot].is_nan())
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut [c64; 4] {
        &mut self.m
    }

    /// Restore the scalar mirror after slot 0 was written.
    #[inline]
    pub(crate) fn sync_mirror(&mut self) {
        if self.kind == MatrixKind::Scalar {
            self.m[3] = self.m[0];
        }
    }

    /// Multiply in place by `lambda`, over the slots this kind defines.
    #[inline]
    pub(crate) fn scale(&mut self, lambda: c64) {
        let kind = self.kind;
        let o = &mut self.m;
        match kind {
            MatrixKind::Scalar => {
                o[0] *= lambda;
                o[3] = o[0];
            }
            MatrixKind::Diagonal => {
                o[0] *= lambda;
                o[3] *= lambda;
            }
            MatrixKind::Full => {
                o[0] *= lambda;
                o[1] *= lambda;
                o[2] *= lambda;
                o[3] *= lambda;
            }
        }
    }

    /// Accumulate `lambda·b` into this matrix, following the kinds alone.
    /// See [`PolContext::add_scaled`].
    #[inline]
    pub(crate) fn add_scaled(&mut self, b: &PolMatrix, lambda: c64) {
        let out_kind = self.kind;
        let (b_kind, b) = (b.kind, &b.m);
        let o = &mut self.m;
        match (out_kind, b_kind) {
            (MatrixKind::Scalar, _) => {
                o[0] += b[0] * lambda;
                o[3] = o[0];
            }
            (MatrixKind::Diagonal, MatrixKind::Scalar) | (MatrixKind::Full, MatrixKind::Scalar) => {
                o[0] += b[0] * lambda;
                o[3] += b[0] * lambda;
            }
            (MatrixKind::Diagonal, MatrixKind::Diagonal)
            | (MatrixKind::Diagonal, MatrixKind::Full)
            | (MatrixKind::Full, MatrixKind::Diagonal) => {
                o[0] += b[0] * lambda;
                o[3] += b[3] * lambda;
            }
            (MatrixKind::Full, MatrixKind::Full) => {
                o[0] += b[0] * lambda;
                o[1] += b[1] * lambda;
                o[2] += b[2] * lambda;
                o[3] += b[3] * lambda;
            }
        }
    }

    /// The matrix product `self · b`, following the kinds alone. See
    /// [`PolContext::dot`].
    #[inline]
    pub(crate) fn dot(&self, b: &PolMatrix) -> PolMatrix {
        let a = &self.m;
        let bm = &b.m;
        match (self.kind, b.kind) {
            (MatrixKind::Scalar, MatrixKind::Scalar) => PolMatrix::scalar(a[0] * bm[0]),
            (MatrixKind::Scalar, MatrixKind::Diagonal) => {
                PolMatrix::diagonal(a[0] * bm[0], a[0] * bm[3])
            }
            (MatrixKind::Scalar, MatrixKind::Full) => PolMatrix::full([
                a[0] * bm[0],
                a[0] * bm[1],
                a[0] * bm[2],
                a[0] * bm[3],
            ]),
            (MatrixKind::Diagonal, MatrixKind::Scalar) => {
                PolMatrix::diagonal(a[0] * bm[0], a[3] * bm[0])
            }
            (MatrixKind::Diagonal, MatrixKind::Diagonal) => {
                PolMatrix::diagonal(a[0] * bm[0], a[3] * bm[3])
            }
            (MatrixKind::Diagonal, MatrixKind::Full) => PolMatrix::full([
                a[0] * bm[0],
                a[0] * bm[1],
                a[3] * bm[2],
                a[3] * bm[3],
            ]),
            (MatrixKind::Full, MatrixKind::Scalar) => PolMatrix::full([
                a[0] * bm[0],
                a[1] * bm[0],
                a[2] * bm[0],
                a[3] * bm[0],
            ]),
            (MatrixKind::Full, MatrixKind::Diagonal) => PolMatrix::full([
                a[0] * bm[0],
                a[1] * bm[3],
                a[2] * bm[0],
                a[3] * bm[3],
            ]),
            (MatrixKind::Full, MatrixKind::Full) => PolMatrix::full([
                a[0] * bm[0] + a[1] * bm[2],
                a[0] * bm[1] + a[1] * bm[3],
                a[2] * bm[0] + a[3] * bm[2],
                a[2] * bm[1] + a[3] * bm[3],
            ]),
        }
    }
}

impl Index<usize> for PolMatrix {
    type Output = c64;

    #[inline]
    fn index(&self, slot: usize) -> &c64 {
        &self.m[slot]
    }
}

impl From<Jones<f64>> for PolMatrix {
    fn from(j: Jones<f64>) -> Self {
        Self::from_jones(MatrixKind::Full, &j)
    }
}

impl Debug for PolMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let m = &self.m;
        write!(
            f,
            "{:?}[[{:e}{:+e}j, {:e}{:+e}j] [{:e}{:+e}j, {:e}{:+e}j]]",
            self.kind, m[0].re, m[0].im, m[1].re, m[1].im, m[2].re, m[2].im, m[3].re, m[3].im,
        )
    }
}
