//! Correcting visibilities with direction-dependent solutions.

use log::debug;

use crate::{
    algebra::{PolContext, PolMatrix},
    directions::{ClusterDirections, DirectionSelection},
    jones::JonesTensor,
    normalise::NormaliseConfig,
    UVW,
};

/// The effective Jones matrix of an antenna for a facet.
///
/// Takes the solutions `selection` picks out of `tensor` at `timestep`, either
/// directly or blended with [`JonesTensor::combine_directions`], then
/// normalises them with `norm_cfg` for the baseline `uvw`.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{
///     combine_and_correct, DirectionSelection, Jones, JonesTensor, MatrixKind,
///     NormaliseConfig, PolContext, UVW,
/// };
///
/// let ctx = PolContext::polarised(MatrixKind::Full);
/// let solutions = vec![Jones::<f64>::identity(); 2];
/// let tensor = JonesTensor::from_shape_slice((1, 2, 1, 1), &solutions, MatrixKind::Full).unwrap();
/// let selection = DirectionSelection::Weighted { weights: vec![0.5, 0.5] };
/// let uvw = UVW { u: 10., v: 20., w: 0. };
/// let j = combine_and_correct(&ctx, &tensor, 0, 0, &selection, &NormaliseConfig::default(), &uvw);
/// assert_eq!(j.to_jones(), Jones::identity());
/// ```
#[inline]
pub fn combine_and_correct(
    ctx: &PolContext,
    tensor: &JonesTensor,
    timestep: usize,
    ant: usize,
    selection: &DirectionSelection,
    norm_cfg: &NormaliseConfig,
    uvw: &UVW,
) -> PolMatrix {
    let mut jones = match selection {
        DirectionSelection::Direct { dir } => tensor.get_direct(ctx, timestep, ant, *dir),
        DirectionSelection::Weighted { weights } => {
            tensor.combine_directions(ctx, timestep, ant, weights)
        }
    };
    if !norm_cfg.is_noop() {
        norm_cfg.normalise(ctx, &mut jones, uvw);
    }
    jones
}

/// The effective Jones matrices of both antennas of a baseline for a facet.
///
/// See [`combine_and_correct`].
#[inline]
pub fn baseline_jones(
    ctx: &PolContext,
    tensor: &JonesTensor,
    timestep: usize,
    (ant1, ant2): (usize, usize),
    selection: &DirectionSelection,
    norm_cfg: &NormaliseConfig,
    uvw: &UVW,
) -> (PolMatrix, PolMatrix) {
    (
        combine_and_correct(ctx, tensor, timestep, ant1, selection, norm_cfg, uvw),
        combine_and_correct(ctx, tensor, timestep, ant2, selection, norm_cfg, uvw),
    )
}

/// The solution sets a facet is corrected with: direction-dependent
/// calibration solutions and a primary beam, either of which may be absent.
///
/// The beam always uses a single direction of its own tensor, usually the one
/// nearest the facet centre. The two sets have separate time axes.
///
/// Per antenna the effective Jones matrix is `J = J_dd · J_beam`, with the
/// beam on the sky side of the calibration solutions. Only `J_dd` is
/// normalised. With neither set the result is the identity.
///
/// # Examples
///
/// ```rust
/// use ddecorr::{
///     c64, DirectionSelection, FacetSolutions, Jones, JonesTensor, MatrixKind,
///     NormaliseConfig, PolContext, PolMatrix, UVW,
/// };
///
/// let ctx = PolContext::polarised(MatrixKind::Diagonal);
/// let zero = c64::new(0., 0.);
/// let gain = [Jones::from([c64::new(2., 0.), zero, zero, c64::new(3., 0.)])];
/// let beam = [Jones::from([c64::new(0.5, 0.), zero, zero, c64::new(0.25, 0.)])];
/// let solutions = FacetSolutions::default()
///     .with_dd(
///         JonesTensor::from_shape_slice((1, 1, 1, 1), &gain, MatrixKind::Diagonal).unwrap(),
///         DirectionSelection::Direct { dir: 0 },
///     )
///     .with_beam(
///         JonesTensor::from_shape_slice((1, 1, 1, 1), &beam, MatrixKind::Diagonal).unwrap(),
///         0,
///     );
/// let uvw = UVW { u: 10., v: 20., w: 0. };
/// let j = solutions.antenna_jones(&ctx, (0, 0), 0, &NormaliseConfig::default(), &uvw);
/// assert_eq!(j, PolMatrix::diagonal(c64::new(1., 0.), c64::new(0.75, 0.)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FacetSolutions<'a> {
    dd: Option<(JonesTensor<'a>, DirectionSelection)>,
    beam: Option<(JonesTensor<'a>, usize)>,
}

impl<'a> FacetSolutions<'a> {
    /// Use direction-dependent calibration solutions, selected with `selection`.
    pub fn with_dd(mut self, tensor: JonesTensor<'a>, selection: DirectionSelection) -> Self {
        self.dd = Some((tensor, selection));
        self
    }

    /// Use the beam of direction `dir` in `tensor`.
    pub fn with_beam(mut self, tensor: JonesTensor<'a>, dir: usize) -> Self {
        debug_assert!(
            dir < tensor.num_directions(),
            "beam direction {dir} out of range for {:?}",
            tensor.dim()
        );
        self.beam = Some((tensor, dir));
        self
    }

    /// Use the beam of the direction in `dirs` nearest the facet centre
    /// `(l0, m0)`. `dirs` lists the beam tensor's own directions.
    pub fn with_beam_nearest(
        self,
        tensor: JonesTensor<'a>,
        dirs: &ClusterDirections,
        l0: f64,
        m0: f64,
    ) -> Self {
        debug_assert_eq!(dirs.len(), tensor.num_directions());
        let dir = dirs.nearest(l0, m0);
        debug!("beam direction for ({l0}, {m0}): {dir}");
        self.with_beam(tensor, dir)
    }

    /// The direction-dependent calibration solutions, if any.
    pub fn dd(&self) -> Option<&(JonesTensor<'a>, DirectionSelection)> {
        self.dd.as_ref()
    }

    /// The beam solutions and their direction, if any.
    pub fn beam(&self) -> Option<&(JonesTensor<'a>, usize)> {
        self.beam.as_ref()
    }

    /// The effective Jones matrix of an antenna, `J_dd · J_beam`.
    ///
    /// `t_dd` and `t_beam` index the time axes of the two sets. The calibration
    /// solutions go through [`combine_and_correct`].
    #[inline]
    pub fn antenna_jones(
        &self,
        ctx: &PolContext,
        (t_dd, t_beam): (usize, usize),
        ant: usize,
        norm_cfg: &NormaliseConfig,
        uvw: &UVW,
    ) -> PolMatrix {
        let j_dd = self.dd.as_ref().map(|(tensor, selection)| {
            combine_and_correct(ctx, tensor, t_dd, ant, selection, norm_cfg, uvw)
        });
        let j_beam = self
            .beam
            .as_ref()
            .map(|(tensor, dir)| tensor.get_direct(ctx, t_beam, ant, *dir));
        match (j_dd, j_beam) {
            (Some(j_dd), Some(j_beam)) => ctx.dot(&j_dd, &j_beam),
            (Some(j), None) | (None, Some(j)) => j,
            (None, None) => PolMatrix::identity(ctx.active_kind(ctx.jones_kind)),
        }
    }

    /// The effective Jones matrices of both antennas of a baseline. See
    /// [`FacetSolutions::antenna_jones`].
    #[inline]
    pub fn baseline_jones(
        &self,
        ctx: &PolContext,
        timesteps: (usize, usize),
        (ant1, ant2): (usize, usize),
        norm_cfg: &NormaliseConfig,
        uvw: &UVW,
    ) -> (PolMatrix, PolMatrix) {
        (
            self.antenna_jones(ctx, timesteps, ant1, norm_cfg, uvw),
            self.antenna_jones(ctx, timesteps, ant2, norm_cfg, uvw),
        )
    }
}

/// Corrupt a visibility with the Jones matrices of its antennas,
/// `J1 · V · J2^H`, as when predicting model visibilities.
#[inline]
pub fn apply_jones(
    ctx: &PolContext,
    j_ant1: &PolMatrix,
    vis: &PolMatrix,
    j_ant2: &PolMatrix,
) -> PolMatrix {
    ctx.dot(&ctx.dot(j_ant1, vis), &ctx.hermitian(j_ant2))
}

/// Correct a visibility for the Jones matrices of its antennas,
/// `J1^-1 · V · (J2^H)^-1`, the inverse of [`apply_jones`].
///
/// Singular Jones matrices give non-finite results; check
/// [`PolMatrix::det`] or [`PolMatrix::any_nan`] where that matters.
#[inline]
pub fn apply_inverse_jones(
    ctx: &PolContext,
    j_ant1: &PolMatrix,
    vis: &PolMatrix,
    j_ant2: &PolMatrix,
) -> PolMatrix {
    let j_ant2_h_inv = ctx.invert(&ctx.hermitian(j_ant2));
    ctx.dot(&ctx.dot(&ctx.invert(j_ant1), vis), &j_ant2_h_inv)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::Array4;

    use super::*;
    use crate::{
        c64, compare_pol,
        test_common::{jones_from_seed, phasor},
        CalibErrorModel, Jones, MatrixKind, NormaliseConfigBuilder,
    };

    /// Solutions with dimensions `[timestep][direction][antenna][channel]` that
    /// differ along every axis.
    fn make_solutions(shape: (usize, usize, usize, usize)) -> Array4<Jones<f64>> {
        Array4::from_shape_fn(shape, |(t, d, a, c)| {
            jones_from_seed(0.1 * t as f64 + 0.2 * d as f64 - 0.15 * a as f64 + 0.05 * c as f64)
        })
    }

    fn uvw() -> UVW {
        UVW {
            u: 120.,
            v: -45.,
            w: 3.,
        }
    }

    /// Test the direct selection is the stored solution, untouched by a no-op normalisation.
    #[test]
    fn test_direct_selection() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let solutions = make_solutions((2, 3, 2, 1));
        let tensor = JonesTensor::new(solutions.view(), MatrixKind::Full);
        let j = combine_and_correct(
            &ctx,
            &tensor,
            1,
            0,
            &DirectionSelection::Direct { dir: 2 },
            &NormaliseConfig::default(),
            &uvw(),
        );
        assert_eq!(j, PolMatrix::from(solutions[(1, 2, 0, 0)]));
    }

    /// Test a weighted selection of a single direction matches the direct selection.
    #[test]
    fn test_single_weight_matches_direct() {
        let ctx = PolContext::polarised(MatrixKind::Diagonal);
        let solutions = make_solutions((1, 3, 2, 1));
        let tensor = JonesTensor::new(solutions.view(), MatrixKind::Diagonal);
        let norm_cfg = NormaliseConfig::default();
        let direct = combine_and_correct(
            &ctx,
            &tensor,
            0,
            1,
            &DirectionSelection::Direct { dir: 1 },
            &norm_cfg,
            &uvw(),
        );
        let weighted = combine_and_correct(
            &ctx,
            &tensor,
            0,
            1,
            &DirectionSelection::Weighted {
                weights: vec![0., 1., 0.],
            },
            &norm_cfg,
            &uvw(),
        );
        compare_pol!(weighted, direct, 1e-14);
    }

    /// Test the normalisation is applied after the directions are combined.
    #[test]
    fn test_normalisation_applied() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let solutions = make_solutions((1, 2, 1, 1));
        let tensor = JonesTensor::new(solutions.view(), MatrixKind::Full);
        let selection = DirectionSelection::Weighted {
            weights: vec![0.3, 0.7],
        };
        let phase_only = NormaliseConfigBuilder::default()
            .apply_amp(false)
            .build()
            .unwrap();

        let raw = combine_and_correct(
            &ctx,
            &tensor,
            0,
            0,
            &selection,
            &NormaliseConfig::default(),
            &uvw(),
        );
        let j = combine_and_correct(&ctx, &tensor, 0, 0, &selection, &phase_only, &uvw());
        for slot in 0..4 {
            assert_abs_diff_eq!(j.amplitude(slot), 1., epsilon = 1e-12);
            assert_abs_diff_eq!(j[slot].arg(), raw[slot].arg(), epsilon = 1e-12);
        }

        // a huge calibration error leaves only the phasor
        let scaled = NormaliseConfigBuilder::default()
            .calib_error(CalibErrorModel::new(10., 1.))
            .build()
            .unwrap();
        let j_scaled = combine_and_correct(&ctx, &tensor, 0, 0, &selection, &scaled, &uvw());
        compare_pol!(j_scaled, j, 1e-12);
    }

    /// Test the baseline's antennas are looked up independently.
    #[test]
    fn test_baseline_jones() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let solutions = make_solutions((1, 1, 3, 1));
        let tensor = JonesTensor::new(solutions.view(), MatrixKind::Full);
        let (j1, j2) = baseline_jones(
            &ctx,
            &tensor,
            0,
            (2, 0),
            &DirectionSelection::Direct { dir: 0 },
            &NormaliseConfig::default(),
            &uvw(),
        );
        assert_eq!(j1, PolMatrix::from(solutions[(0, 0, 2, 0)]));
        assert_eq!(j2, PolMatrix::from(solutions[(0, 0, 0, 0)]));
    }

    /// Test J1 * D * J2^H for full solutions.
    #[test]
    fn test_apply_jones_full() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let j1 = jones_from_seed(0.3);
        let j2 = jones_from_seed(-0.4);
        let vis = jones_from_seed(1.2);
        compare_pol!(
            apply_jones(
                &ctx,
                &PolMatrix::from(j1),
                &PolMatrix::from(vis),
                &PolMatrix::from(j2)
            ),
            PolMatrix::from(j1 * vis * j2.h())
        );
    }

    /// Test diagonal solutions applied to a full visibility.
    #[test]
    fn test_apply_jones_diagonal() {
        let ctx = PolContext::polarised(MatrixKind::Diagonal);
        let j1 = PolMatrix::diagonal(phasor(0.9, 0.4), phasor(1.1, -0.3));
        let j2 = PolMatrix::diagonal(phasor(1.2, 2.0), phasor(0.7, 0.1));
        let vis = jones_from_seed(0.5);
        let corrupted = apply_jones(&ctx, &j1, &PolMatrix::from(vis), &j2);
        assert_eq!(corrupted.kind(), MatrixKind::Full);
        compare_pol!(
            corrupted,
            PolMatrix::from(j1.to_jones() * vis * j2.to_jones().h())
        );
    }

    /// Test correcting undoes corrupting.
    #[test]
    fn test_apply_inverse_jones_round_trip() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let j1 = PolMatrix::from(jones_from_seed(0.2));
        let j2 = PolMatrix::from(jones_from_seed(0.7));
        let vis = PolMatrix::from(jones_from_seed(-0.9));
        let corrupted = apply_jones(&ctx, &j1, &vis, &j2);
        compare_pol!(apply_inverse_jones(&ctx, &j1, &corrupted, &j2), vis, 1e-12);
    }

    /// Test the inverse against marlu's inverse.
    #[test]
    fn test_apply_inverse_jones_full() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let j1 = jones_from_seed(-0.3);
        let j2 = jones_from_seed(0.6);
        let vis = jones_from_seed(0.1);
        compare_pol!(
            apply_inverse_jones(
                &ctx,
                &PolMatrix::from(j1),
                &PolMatrix::from(vis),
                &PolMatrix::from(j2)
            ),
            PolMatrix::from(j1.inv() * vis * j2.h().inv())
        );
    }

    /// Test full-scalar mode reduces full visibilities to their first element.
    #[test]
    fn test_full_scalar_full_visibility() {
        let ctx = PolContext::full_scalar();
        let g = PolMatrix::scalar(c64::new(2.0, 0.5));
        let one = c64::new(1., 0.);
        let vis = PolMatrix::full([one; 4]);

        let corrupted = apply_jones(&ctx, &g, &vis, &g);
        assert_eq!(corrupted, PolMatrix::scalar(c64::new(4.25, 0.)));

        let corrected = apply_inverse_jones(&ctx, &g, &vis, &g);
        assert_eq!(corrected.kind(), MatrixKind::Scalar);
        assert_abs_diff_eq!(corrected[0], c64::new(1. / 4.25, 0.), epsilon = 1e-14);
        assert_eq!(corrected[3], corrected[0]);
    }

    /// Test full-scalar mode works on single complex values.
    #[test]
    fn test_full_scalar() {
        let ctx = PolContext::full_scalar();
        let g1 = phasor(2.0, 0.5);
        let g2 = phasor(0.5, -1.5);
        let v = c64::new(3.0, -1.0);
        let corrupted = apply_jones(
            &ctx,
            &PolMatrix::scalar(g1),
            &PolMatrix::scalar(v),
            &PolMatrix::scalar(g2),
        );
        assert_eq!(corrupted.kind(), MatrixKind::Scalar);
        assert_abs_diff_eq!(corrupted[0], g1 * v * g2.conj(), epsilon = 1e-12);
        assert_eq!(corrupted[3], corrupted[0]);

        let corrected = apply_inverse_jones(
            &ctx,
            &PolMatrix::scalar(g1),
            &corrupted,
            &PolMatrix::scalar(g2),
        );
        assert_abs_diff_eq!(corrected[0], v, epsilon = 1e-12);
    }

    fn beam_directions() -> ClusterDirections {
        ClusterDirections::new(vec![-0.1, 0.0, 0.1], vec![0.0; 3], vec![1.0; 3]).unwrap()
    }

    /// Test a facet with only a beam reads the beam's nearest direction, at the
    /// beam's own timestep, without normalising it.
    #[test]
    fn test_facet_beam_only() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let beam = make_solutions((3, 3, 2, 1));
        let solutions = FacetSolutions::default().with_beam_nearest(
            JonesTensor::new(beam.view(), MatrixKind::Full),
            &beam_directions(),
            0.08,
            0.01,
        );
        assert!(solutions.dd().is_none());
        assert_eq!(solutions.beam().map(|(_, dir)| *dir), Some(2));

        let phase_only = NormaliseConfigBuilder::default()
            .apply_amp(false)
            .build()
            .unwrap();
        let j = solutions.antenna_jones(&ctx, (0, 2), 1, &phase_only, &uvw());
        assert_eq!(j, PolMatrix::from(beam[(2, 2, 1, 0)]));
    }

    /// Test a facet with only calibration solutions matches [`combine_and_correct`].
    #[test]
    fn test_facet_dd_only() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let dd = make_solutions((2, 3, 2, 1));
        let tensor = JonesTensor::new(dd.view(), MatrixKind::Full);
        let selection = DirectionSelection::Weighted {
            weights: vec![0.6, 0.4, 0.],
        };
        let norm_cfg = NormaliseConfigBuilder::default()
            .apply_phase(false)
            .build()
            .unwrap();
        let solutions = FacetSolutions::default().with_dd(tensor, selection.clone());
        assert!(solutions.beam().is_none());
        assert_eq!(
            solutions.antenna_jones(&ctx, (1, 7), 0, &norm_cfg, &uvw()),
            combine_and_correct(&ctx, &tensor, 1, 0, &selection, &norm_cfg, &uvw())
        );
    }

    /// Test the beam is applied on the sky side of the normalised calibration
    /// solutions.
    #[test]
    fn test_facet_dd_and_beam() {
        let ctx = PolContext::polarised(MatrixKind::Full);
        let dd = make_solutions((1, 2, 3, 1));
        let beam = Array4::from_shape_fn((2, 3, 3, 1), |(t, d, a, _)| {
            jones_from_seed(1.7 - 0.3 * t as f64 + 0.4 * d as f64 + 0.25 * a as f64)
        });
        let dd_tensor = JonesTensor::new(dd.view(), MatrixKind::Full);
        let selection = DirectionSelection::Direct { dir: 1 };
        let phase_only = NormaliseConfigBuilder::default()
            .apply_amp(false)
            .build()
            .unwrap();
        let solutions = FacetSolutions::default()
            .with_dd(dd_tensor, selection.clone())
            .with_beam_nearest(
                JonesTensor::new(beam.view(), MatrixKind::Full),
                &beam_directions(),
                -0.02,
                0.0,
            );

        let (j1, j2) = solutions.baseline_jones(&ctx, (0, 1), (2, 0), &phase_only, &uvw());
        for (j, ant) in [(j1, 2), (j2, 0)] {
            let j_dd =
                combine_and_correct(&ctx, &dd_tensor, 0, ant, &selection, &phase_only, &uvw());
            let j_beam = PolMatrix::from(beam[(1, 1, ant, 0)]);
            compare_pol!(j, PolMatrix::from(j_dd.to_jones() * j_beam.to_jones()), 1e-12);
            assert_ne!(j, ctx.dot(&j_beam, &j_dd));
        }
    }

    /// Test a facet without any solutions leaves visibilities alone.
    #[test]
    fn test_facet_no_solutions_is_identity() {
        let solutions = FacetSolutions::default();
        for (ctx, kind) in [
            (PolContext::polarised(MatrixKind::Diagonal), MatrixKind::Diagonal),
            (PolContext::full_scalar(), MatrixKind::Scalar),
        ] {
            let (j1, j2) =
                solutions.baseline_jones(&ctx, (0, 0), (0, 1), &NormaliseConfig::default(), &uvw());
            assert_eq!(j1, PolMatrix::identity(kind));
            assert_eq!(j2, PolMatrix::identity(kind));
        }
    }

    /// Test the beam and calibration solutions combine to a scalar in
    /// full-scalar mode.
    #[test]
    fn test_facet_full_scalar() {
        let ctx = PolContext::full_scalar();
        let dd = make_solutions((1, 1, 1, 1));
        let beam = make_solutions((1, 3, 1, 1));
        let solutions = FacetSolutions::default()
            .with_dd(
                JonesTensor::new(dd.view(), MatrixKind::Full),
                DirectionSelection::Direct { dir: 0 },
            )
            .with_beam(JonesTensor::new(beam.view(), MatrixKind::Full), 1);
        let j = solutions.antenna_jones(&ctx, (0, 0), 0, &NormaliseConfig::default(), &uvw());
        assert_eq!(j.kind(), MatrixKind::Scalar);
        assert_abs_diff_eq!(j[0], dd[(0, 0, 0, 0)][0] * beam[(0, 1, 0, 0)][0], epsilon = 1e-14);
    }
}
