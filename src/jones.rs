//! Direction-dependent Jones solutions, and combining them into a single
//! effective Jones matrix for a visibility.

use log::trace;

use crate::{
    algebra::{MatrixKind, PolContext, PolMatrix},
    c64,
    error::BadArrayShape,
    ndarray::{ArrayView4, Axis},
    Jones,
};

/// A borrowed 4-D tensor of Jones solutions with dimensions
/// `[timestep][direction][antenna][channel]`.
///
/// The buffer belongs to whatever produced the solutions; this only reads it.
/// Every solution in the tensor has the same [`MatrixKind`].
#[derive(Debug, Clone, Copy)]
pub struct JonesTensor<'a> {
    jones: ArrayView4<'a, Jones<f64>>,
    kind: MatrixKind,
}

impl<'a> JonesTensor<'a> {
    /// Wrap an existing view.
    pub fn new(jones: ArrayView4<'a, Jones<f64>>, kind: MatrixKind) -> Self {
        trace!("JonesTensor::new {:?} {}", jones.dim(), kind);
        Self { jones, kind }
    }

    /// Wrap a flat, time-major buffer of solutions.
    ///
    /// # Errors
    ///
    /// Returns [`BadArrayShape`] if `jones` doesn't hold exactly
    /// `timesteps * directions * antennas * channels` solutions.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddecorr::{Jones, JonesTensor, MatrixKind};
    ///
    /// let solutions = vec![Jones::<f64>::identity(); 2 * 3 * 4 * 1];
    /// let tensor =
    ///     JonesTensor::from_shape_slice((2, 3, 4, 1), &solutions, MatrixKind::Full).unwrap();
    /// assert_eq!(tensor.num_directions(), 3);
    ///
    /// assert!(JonesTensor::from_shape_slice((2, 3, 5, 1), &solutions, MatrixKind::Full).is_err());
    /// ```
    pub fn from_shape_slice(
        shape: (usize, usize, usize, usize),
        jones: &'a [Jones<f64>],
        kind: MatrixKind,
    ) -> Result<Self, BadArrayShape> {
        let view = ArrayView4::from_shape(shape, jones).map_err(|_| BadArrayShape {
            argument: "jones",
            function: "JonesTensor::from_shape_slice",
            expected: format!(
                "{:?} = {} solutions",
                shape,
                shape.0 * shape.1 * shape.2 * shape.3
            ),
            received: format!("{}", jones.len()),
        })?;
        Ok(Self::new(view, kind))
    }

    /// The kind of every solution in this tensor.
    #[inline]
    pub fn kind(&self) -> MatrixKind {
        self.kind
    }

    /// `(timesteps, directions, antennas, channels)`
    #[inline]
    pub fn dim(&self) -> (usize, usize, usize, usize) {
        self.jones.dim()
    }

    /// The number of direction slots.
    #[inline]
    pub fn num_directions(&self) -> usize {
        self.jones.len_of(Axis(1))
    }

    /// The underlying view.
    pub fn view(&self) -> ArrayView4<'a, Jones<f64>> {
        self.jones
    }

    /// Whether these solutions can be read under `ctx`.
    ///
    /// The context's Jones kind must be the tensor's kind, except in
    /// full-scalar mode where only the first slot is ever read.
    ///
    /// ```rust
    /// use ddecorr::{Jones, JonesTensor, MatrixKind, PolContext};
    ///
    /// let solutions = vec![Jones::<f64>::identity(); 2];
    /// let tensor =
    ///     JonesTensor::from_shape_slice((1, 2, 1, 1), &solutions, MatrixKind::Full).unwrap();
    /// assert!(tensor.is_compatible(&PolContext::polarised(MatrixKind::Full)));
    /// assert!(tensor.is_compatible(&PolContext::full_scalar()));
    /// assert!(!tensor.is_compatible(&PolContext::polarised(MatrixKind::Diagonal)));
    /// ```
    #[inline]
    pub fn is_compatible(&self, ctx: &PolContext) -> bool {
        ctx.is_full_scalar() || ctx.jones_kind == self.kind
    }

    #[inline]
    fn raw(&self, timestep: usize, dir: usize, ant: usize, chan: usize) -> &Jones<f64> {
        debug_assert!(
            {
                let (nt, nd, na, nc) = self.dim();
                timestep < nt && dir < nd && ant < na && chan < nc
            },
            "Jones index ({timestep}, {dir}, {ant}, {chan}) out of range for {:?}",
            self.dim()
        );
        &self.jones[[timestep, dir, ant, chan]]
    }

    /// The solution at `(timestep, dir, ant, chan)`, unmodified.
    #[inline]
    pub fn get(
        &self,
        ctx: &PolContext,
        timestep: usize,
        dir: usize,
        ant: usize,
        chan: usize,
    ) -> PolMatrix {
        debug_assert!(
            self.is_compatible(ctx),
            "{} solutions read with a {} context",
            self.kind,
            ctx.jones_kind
        );
        PolMatrix::from_jones(
            ctx.active_kind(self.kind),
            self.raw(timestep, dir, ant, chan),
        )
    }

    /// The solution of a single direction, using the first channel.
    #[inline]
    pub fn get_direct(
        &self,
        ctx: &PolContext,
        timestep: usize,
        ant: usize,
        dir: usize,
    ) -> PolMatrix {
        self.get(ctx, timestep, dir, ant, 0)
    }

    /// Blend the solutions of several directions into one, using the first
    /// channel. See [`JonesTensor::combine_directions_chan`].
    #[inline]
    pub fn combine_directions(
        &self,
        ctx: &PolContext,
        timestep: usize,
        ant: usize,
        weights: &[f64],
    ) -> PolMatrix {
        self.combine_directions_chan(ctx, timestep, ant, 0, weights)
    }

    /// Blend the solutions of several directions into one.
    ///
    /// Each slot's phase is the weighted average of the directions' unit
    /// phasors, and its amplitude is rescaled by the weighted sum of the
    /// directions' amplitudes:
    ///
    /// ```text
    /// J[s] = (Σ_d w_d J_d[s] / |J_d[s]|) · (Σ_d w_d |J_d[s]|)
    /// ```
    ///
    /// Directions with a weight of exactly zero are skipped entirely, as are
    /// slots whose amplitude is exactly zero. `weights` has one entry per
    /// direction slot.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddecorr::{c64, Jones, JonesTensor, MatrixKind, PolContext};
    ///
    /// let ctx = PolContext::polarised(MatrixKind::Scalar);
    /// let zero = c64::new(0.0, 0.0);
    /// let (a, b) = (c64::new(2.0, 0.0), c64::new(0.0, 4.0));
    /// let solutions = [Jones::from([a, zero, zero, a]), Jones::from([b, zero, zero, b])];
    /// let tensor = JonesTensor::from_shape_slice((1, 2, 1, 1), &solutions, MatrixKind::Scalar).unwrap();
    /// let j = tensor.combine_directions(&ctx, 0, 0, &[0.5, 0.5]);
    /// // phases 0 and pi/2 average to pi/4, amplitude 0.5 * 2 + 0.5 * 4
    /// let expected = c64::from_polar(3.0 * 0.5_f64.sqrt(), std::f64::consts::FRAC_PI_4);
    /// assert!((j[0] - expected).norm() < 1e-12);
    /// ```
    #[allow(clippy::float_cmp)]
    pub fn combine_directions_chan(
        &self,
        ctx: &PolContext,
        timestep: usize,
        ant: usize,
        chan: usize,
        weights: &[f64],
    ) -> PolMatrix {
        debug_assert_eq!(
            weights.len(),
            self.num_directions(),
            "one weight is needed per direction"
        );
        debug_assert!(
            self.is_compatible(ctx),
            "{} solutions read with a {} context",
            self.kind,
            ctx.jones_kind
        );
        let kind = ctx.active_kind(self.kind);
        let slots = kind.slots();

        let mut j_out = [c64::default(); 4];
        let mut j_abs = [0_f64; 4];
        for (dir, &weight) in weights.iter().enumerate() {
            if weight == 0. {
                continue;
            }
            let jones = self.raw(timestep, dir, ant, chan);
            for &slot in slots {
                let amp = jones[slot].norm();
                if amp == 0. {
                    continue;
                }
                j_out[slot] += jones[slot] * (weight / amp);
                j_abs[slot] += weight * amp;
            }
        }
        for &slot in slots {
            j_out[slot] *= j_abs[slot];
        }

        PolMatrix::from_slots(kind, j_out)
    }
}
