use num::Float;

use super::NeuraLoss;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Euclidean;

impl<F: Float> NeuraLoss<F> for Euclidean {
    #[inline]
    fn eval(&self, target: &[F], actual: &[F]) -> F {
        let mut sum_squared = F::zero();

        for (t, a) in target.iter().zip(actual) {
            sum_squared = sum_squared + (*t - *a) * (*t - *a);
        }

        sum_squared / (F::one() + F::one())
    }

    #[inline]
    fn nabla(&self, target: F, actual: F) -> F {
        // ∂E(y)/∂yᵢ = yᵢ - yᵢ'
        actual - target
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::assert_approx;

    #[test]
    fn test_euclidean() {
        assert_approx!(Euclidean.eval(&[1.0, 0.0], &[0.0, 2.0]), 2.5f64, 1e-12);
        assert_approx!(Euclidean.nabla(1.0f32, 0.25), -0.75f32, 1e-6);
    }
}
