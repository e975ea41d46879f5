use crate::{c64, Jones};

#[macro_export]
macro_rules! compare_pol {
    ($a:expr, $b:expr) => {
        approx::assert_abs_diff_eq!(
            $crate::types::TestPolMatrix::from($a),
            $crate::types::TestPolMatrix::from($b),
            epsilon = 1e-10
        );
    };
    ($a:expr, $b:expr, $eps:expr) => {
        approx::assert_abs_diff_eq!(
            $crate::types::TestPolMatrix::from($a),
            $crate::types::TestPolMatrix::from($b),
            epsilon = $eps
        );
    };
}

/// A full Jones matrix with distinct, non-trivial entries and a healthy
/// determinant, shifted by `seed`.
pub fn jones_from_seed(seed: f64) -> Jones<f64> {
    Jones::from([
        c64::new(1.0 + seed, 0.5 - seed),
        c64::new(0.1 * seed, -0.2),
        c64::new(-0.15, 0.05 * seed),
        c64::new(0.8 - 0.5 * seed, 0.3 + seed),
    ])
}

/// A polar complex number.
pub fn phasor(amp: f64, phase: f64) -> c64 {
    c64::from_polar(amp, phase)
}
