//! Plain damped signal propagation, `x(t+1) = αW x(t) + (1-α) b`.

use nalgebra::DMatrix;

use crate::engine::errors::SingularSystem;
use crate::engine::solver::{invert, IterativeOperator, PropagationModel};

/// Signal propagation (`SP`).
///
/// At the fixed point `(I - αW) x = (1-α) b`, hence the exact operator
/// `M = (1-α)(I - αW)^-1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalPropagation;

impl PropagationModel for SignalPropagation {
    fn abbr(&self) -> &'static str {
        "SP"
    }

    fn name(&self) -> &'static str {
        "Signal propagation algorithm"
    }

    fn prepare_exact(
        &self,
        w: &DMatrix<f64>,
        alpha: f64,
    ) -> Result<DMatrix<f64>, SingularSystem> {
        let n = w.nrows();
        let m0 = DMatrix::identity(n, n) - w * alpha;
        Ok(invert(m0)? * (1.0 - alpha))
    }

    fn prepare_iterative(&self, w: &DMatrix<f64>, alpha: f64) -> IterativeOperator {
        IterativeOperator::damped(w, alpha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    #[test]
    fn exact_operator_solves_fixed_point() {
        let w = DMatrix::from_row_slice(3, 3, &[0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, -1.0, 0.0]);
        let alpha = 0.7;
        let m = SignalPropagation.prepare_exact(&w, alpha).unwrap();
        let b = DVector::from_vec(vec![1.0, 0.5, -0.2]);
        let x = &m * &b;
        let residual = &x - (&w * &x * alpha + &b * (1.0 - alpha));
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn self_loop_with_unit_gain_is_singular() {
        // I - αW is singular when W has eigenvalue 1/α.
        let w = DMatrix::from_row_slice(1, 1, &[2.0]);
        assert_eq!(SignalPropagation.prepare_exact(&w, 0.5), Err(SingularSystem));
    }
}
