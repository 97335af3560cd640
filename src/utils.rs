use num::Float;

/// Converts an `f64` parameter into the working float type of a computation
#[inline]
pub(crate) fn cast<F: Float>(value: f64) -> F {
    F::from(value).unwrap_or_else(F::nan)
}

pub(crate) fn euclidean_distance(left: &[f64], right: &[f64]) -> f64 {
    left.iter()
        .zip(right)
        .map(|(l, r)| (l - r) * (l - r))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
pub(crate) fn uniform_vector(length: usize) -> nalgebra::DVector<f64> {
    use nalgebra::DVector;
    use rand::Rng;

    let mut rng = rand::thread_rng();
    DVector::from_fn(length, |_, _| -> f64 { rng.gen() })
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_approx {
    ( $left:expr, $right:expr, $epsilon:expr ) => {
        let left = $left;
        let right = $right;
        if ((left - right) as f64).abs() >= $epsilon as f64 {
            panic!("Expected {} to be approximately equal to {}", left, right);
        }
    };
}
