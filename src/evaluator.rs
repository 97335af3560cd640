use crate::{dataset::NeuraDataSet, err::NeuraEvaluateErr, network::NeuraNetwork};

pub trait NeuraEvaluator {
    fn evaluate(
        &self,
        network: &mut dyn NeuraNetwork,
        data_set: &NeuraDataSet,
    ) -> Result<f64, NeuraEvaluateErr>;
}

/// Mean absolute difference between the decoded target class and the decoded output class.
///
/// Uses the encoder of the data set; with an encoder whose `decode` only accepts exact codes
/// (like `NeuraOneOfN`), raw network outputs will be rejected.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NeuraClassificationEvaluator;

impl NeuraEvaluator for NeuraClassificationEvaluator {
    fn evaluate(
        &self,
        network: &mut dyn NeuraNetwork,
        data_set: &NeuraDataSet,
    ) -> Result<f64, NeuraEvaluateErr> {
        let encoder = data_set.encoder().ok_or(NeuraEvaluateErr::MissingEncoder)?;
        if data_set.is_empty() {
            return Ok(0.0);
        }

        let mut sum = 0.0;
        for (input, target) in data_set.iter() {
            let output = network.process(input)?;
            let expected = encoder.decode(target)?;
            let actual = encoder.decode(output.as_slice())?;

            sum += expected.abs_diff(actual) as f64;
        }

        Ok(sum / data_set.len() as f64)
    }
}
