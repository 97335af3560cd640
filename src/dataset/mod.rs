use nalgebra::DVector;

use crate::{encoder::NeuraEncoder, err::NeuraDataSetErr};

pub mod loader;

/// Paired input and target vectors, with an optional encoder describing how targets map to classes.
///
/// All inputs share the same length, and so do all targets.
#[derive(Debug, Default)]
pub struct NeuraDataSet {
    inputs: Vec<DVector<f64>>,
    targets: Vec<DVector<f64>>,
    encoder: Option<Box<dyn NeuraEncoder>>,
}

impl NeuraDataSet {
    pub fn new(
        inputs: Vec<DVector<f64>>,
        targets: Vec<DVector<f64>>,
    ) -> Result<Self, NeuraDataSetErr> {
        if inputs.len() != targets.len() {
            return Err(NeuraDataSetErr::LengthMismatch {
                inputs: inputs.len(),
                targets: targets.len(),
            });
        }
        check_rows("input", &inputs)?;
        check_rows("target", &targets)?;

        Ok(Self {
            inputs,
            targets,
            encoder: None,
        })
    }

    pub fn from_pairs<I, T>(pairs: impl IntoIterator<Item = (I, T)>) -> Result<Self, NeuraDataSetErr>
    where
        I: AsRef<[f64]>,
        T: AsRef<[f64]>,
    {
        let (inputs, targets) = pairs
            .into_iter()
            .map(|(input, target)| {
                (
                    DVector::from_column_slice(input.as_ref()),
                    DVector::from_column_slice(target.as_ref()),
                )
            })
            .unzip();

        Self::new(inputs, targets)
    }

    pub fn with_encoder(mut self, encoder: Box<dyn NeuraEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn inputs(&self) -> &[DVector<f64>] {
        &self.inputs
    }

    pub fn targets(&self) -> &[DVector<f64>] {
        &self.targets
    }

    pub fn encoder(&self) -> Option<&dyn NeuraEncoder> {
        self.encoder.as_deref()
    }

    /// Length of every input, `None` if the data set is empty
    pub fn input_len(&self) -> Option<usize> {
        self.inputs.first().map(|row| row.len())
    }

    /// Length of every target, `None` if the data set is empty
    pub fn target_len(&self) -> Option<usize> {
        self.targets.first().map(|row| row.len())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &[f64])> {
        self.inputs
            .iter()
            .zip(self.targets.iter())
            .map(|(input, target)| (input.as_slice(), target.as_slice()))
    }
}

fn check_rows(what: &'static str, rows: &[DVector<f64>]) -> Result<(), NeuraDataSetErr> {
    let Some(expected) = rows.first().map(|row| row.len()) else {
        return Ok(());
    };

    match rows.iter().position(|row| row.len() != expected) {
        Some(row) => Err(NeuraDataSetErr::RaggedRows {
            what,
            row,
            expected,
            got: rows[row].len(),
        }),
        None => Ok(()),
    }
}
