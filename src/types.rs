#![allow(dead_code)]
use crate::{c64, Jones, MatrixKind, PolMatrix};

/// A [`PolMatrix`] that can be compared with `approx` and printed in full.
///
/// Two matrices are close when they have the same kind and every element of
/// the 2x2 matrices they represent is within epsilon.
#[derive(Clone, Copy, PartialEq)]
pub(crate) struct TestPolMatrix(PolMatrix);

impl TestPolMatrix {
    pub fn identity(kind: MatrixKind) -> Self {
        Self(PolMatrix::identity(kind))
    }
}

impl From<PolMatrix> for TestPolMatrix {
    #[inline]
    fn from(p: PolMatrix) -> Self {
        Self(p)
    }
}

impl From<Jones<f64>> for TestPolMatrix {
    #[inline]
    fn from(j: Jones<f64>) -> Self {
        Self(PolMatrix::from(j))
    }
}

impl From<[c64; 4]> for TestPolMatrix {
    #[inline]
    fn from(m: [c64; 4]) -> Self {
        Self(PolMatrix::full(m))
    }
}

impl std::ops::Deref for TestPolMatrix {
    type Target = PolMatrix;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for TestPolMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} [[{:e}{:+e}j, {:e}{:+e}j] [{:e}{:+e}j, {:e}{:+e}j]]",
            self.kind(),
            self[0].re,
            self[0].im,
            self[1].re,
            self[1].im,
            self[2].re,
            self[2].im,
            self[3].re,
            self[3].im,
        )
    }
}

impl std::fmt::Debug for TestPolMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl approx::AbsDiffEq for TestPolMatrix {
    type Epsilon = f64;

    #[inline]
    fn default_epsilon() -> f64 {
        <f64 as approx::AbsDiffEq>::default_epsilon()
    }

    #[inline]
    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.kind() == other.kind()
            && (0..4).all(|idx| {
                <c64 as approx::AbsDiffEq>::abs_diff_eq(&self[idx], &other[idx], epsilon)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::TestPolMatrix;
    use crate::{c64, MatrixKind, PolMatrix};

    #[test]
    fn test_pol_matrix_debug_display() {
        let test_pol = TestPolMatrix::identity(MatrixKind::Diagonal);
        assert!(!format!("{:?}", test_pol).is_empty());
        assert!(format!("{}", test_pol).starts_with("Diag"));

        let scalar = TestPolMatrix::from(PolMatrix::scalar(c64::new(2.0, -1.0)));
        assert!(format!("{}", scalar).starts_with("Scalar"));
    }

    #[test]
    fn test_kind_mismatch_is_not_close() {
        use approx::AbsDiffEq;

        let diag = TestPolMatrix::identity(MatrixKind::Diagonal);
        let full = TestPolMatrix::identity(MatrixKind::Full);
        assert!(!diag.abs_diff_eq(&full, 1e-6));
        assert!(full.abs_diff_eq(&full, 0.0));
    }
}
