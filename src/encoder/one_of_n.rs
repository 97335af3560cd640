use nalgebra::DVector;

use super::*;

/// Tolerance used by `decode` when comparing entries to 0 and 1
pub const ONE_OF_N_EPSILON: f64 = 1e-9;

/// Encodes class `i` as the unit vector with a 1 at index `i`
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraOneOfN {
    classes: usize,
}

impl NeuraOneOfN {
    pub fn new(classes: usize) -> Result<Self, NeuraEncoderErr> {
        if classes == 0 {
            return Err(NeuraEncoderErr::TooFewClasses { min: 1, got: 0 });
        }

        Ok(Self { classes })
    }
}

impl NeuraEncoder for NeuraOneOfN {
    fn encode(&self, class: usize) -> Result<DVector<f64>, NeuraEncoderErr> {
        check_class(class, self.classes)?;

        let mut res = DVector::zeros(self.classes);
        res[class] = 1.0;
        Ok(res)
    }

    /// Only accepts exact one-hot vectors (up to `ONE_OF_N_EPSILON`); use an argmax on raw network outputs
    fn decode(&self, vector: &[f64]) -> Result<usize, NeuraEncoderErr> {
        check_len(vector, self.classes)?;

        let mut found = None;
        for (index, &value) in vector.iter().enumerate() {
            if (value - 1.0).abs() <= ONE_OF_N_EPSILON && found.is_none() {
                found = Some(index);
            } else if value.abs() > ONE_OF_N_EPSILON {
                return Err(NeuraEncoderErr::NotOneOfN);
            }
        }

        found.ok_or(NeuraEncoderErr::NotOneOfN)
    }

    fn classes(&self) -> usize {
        self.classes
    }

    fn dimension(&self) -> usize {
        self.classes
    }
}
