//! Mappings between class indices and network target vectors.

use std::fmt::Debug;

use nalgebra::DVector;

use crate::err::NeuraEncoderErr;

pub mod equilateral;
pub mod one_of_n;

pub trait NeuraEncoder: Debug + Send + Sync {
    /// Returns the target vector of `class`
    fn encode(&self, class: usize) -> Result<DVector<f64>, NeuraEncoderErr>;

    /// Maps a vector (typically the output of a network) back to a class index
    fn decode(&self, vector: &[f64]) -> Result<usize, NeuraEncoderErr>;

    fn classes(&self) -> usize;

    /// Length of the vectors produced by `encode`
    fn dimension(&self) -> usize;
}

fn check_class(class: usize, classes: usize) -> Result<(), NeuraEncoderErr> {
    if class < classes {
        Ok(())
    } else {
        Err(NeuraEncoderErr::ClassOutOfRange { class, classes })
    }
}

fn check_len(vector: &[f64], expected: usize) -> Result<(), NeuraEncoderErr> {
    if vector.len() == expected {
        Ok(())
    } else {
        Err(NeuraEncoderErr::LengthMismatch {
            expected,
            got: vector.len(),
        })
    }
}
