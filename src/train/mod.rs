use rand::RngCore;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

use crate::{
    dataset::NeuraDataSet,
    derivable::{loss::Euclidean, NeuraLoss},
    err::{NeuraConfigErr, NeuraTrainErr},
    network::{NeuraFeedForward, NeuraNetwork},
    statistics::NeuraStatistics,
};

mod parallel;
pub use parallel::NeuraParallelTrainer;

mod propagation;
pub use propagation::NeuraPropagationTrainer;

pub trait NeuraTrainer {
    /// Trains `network` on `data_set` until `stop` says otherwise.
    ///
    /// Weights are first drawn from the trainer's weight range using `rng`. Progress is reported
    /// through `statistics`. Once training stops, the network holds the weights that reached the
    /// lowest error over the run, and that error is returned.
    fn train(
        &mut self,
        network: &mut dyn NeuraNetwork,
        data_set: &NeuraDataSet,
        stop: &mut dyn NeuraStopCondition,
        statistics: &mut NeuraStatistics,
        rng: &mut dyn RngCore,
    ) -> Result<f64, NeuraTrainErr>;
}

/// Decides, before every iteration, whether training should go on
pub trait NeuraStopCondition {
    /// `iteration` is the number of completed iterations, `error` the error after the last one
    fn should_continue(&mut self, iteration: usize, error: f64) -> bool;
}

impl<F: FnMut(usize, f64) -> bool> NeuraStopCondition for F {
    fn should_continue(&mut self, iteration: usize, error: f64) -> bool {
        (self)(iteration, error)
    }
}

/// Stops after a number of iterations, or once the error falls to or below `target_error`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuraStopAfter {
    pub iterations: usize,

    #[serde(default)]
    pub target_error: Option<f64>,
}

impl NeuraStopAfter {
    pub fn iterations(iterations: usize) -> Self {
        Self {
            iterations,
            target_error: None,
        }
    }

    pub fn with_target_error(self, target_error: f64) -> Self {
        Self {
            target_error: Some(target_error),
            ..self
        }
    }
}

impl NeuraStopCondition for NeuraStopAfter {
    fn should_continue(&mut self, iteration: usize, error: f64) -> bool {
        iteration < self.iterations && self.target_error.map_or(true, |target| error > target)
    }
}

/// Range in which the initial weights are uniformly drawn, `[low, high)`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuraWeightRange {
    pub low: f64,
    pub high: f64,
}

impl Default for NeuraWeightRange {
    fn default() -> Self {
        Self {
            low: -0.5,
            high: 0.5,
        }
    }
}

impl NeuraWeightRange {
    pub fn new(low: f64, high: f64) -> Result<Self, NeuraConfigErr> {
        let range = Self { low, high };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), NeuraConfigErr> {
        if self.low < self.high && self.low.is_finite() && self.high.is_finite() {
            Ok(())
        } else {
            Err(NeuraConfigErr::InvalidWeightRange {
                low: self.low,
                high: self.high,
            })
        }
    }

    pub fn distribution(&self) -> Result<Uniform<f64>, NeuraConfigErr> {
        self.validate()?;
        Ok(Uniform::new(self.low, self.high))
    }
}

/// Recovers the concrete network type behind a `dyn NeuraNetwork`
pub(crate) fn as_feed_forward(
    network: &mut dyn NeuraNetwork,
) -> Result<&mut NeuraFeedForward, NeuraTrainErr> {
    network
        .as_any_mut()
        .downcast_mut::<NeuraFeedForward>()
        .ok_or(NeuraTrainErr::UnexpectedNetwork("NeuraFeedForward"))
}

pub(crate) fn check_data_set(
    network: &dyn NeuraNetwork,
    data_set: &NeuraDataSet,
) -> Result<(), NeuraTrainErr> {
    let (Some(input_len), Some(target_len)) = (data_set.input_len(), data_set.target_len()) else {
        return Err(NeuraTrainErr::EmptyDataSet);
    };

    if input_len != network.input_len() {
        return Err(NeuraTrainErr::DataSetMismatch {
            what: "inputs",
            expected: network.input_len(),
            got: input_len,
        });
    }
    if target_len != network.output_len() {
        return Err(NeuraTrainErr::DataSetMismatch {
            what: "targets",
            expected: network.output_len(),
            got: target_len,
        });
    }

    Ok(())
}

/// Mean over the data set of the per-sample loss: `Σ (output - target)² / (2 * N)`
pub fn aggregate_error(
    network: &mut NeuraFeedForward,
    data_set: &NeuraDataSet,
) -> Result<f64, NeuraTrainErr> {
    let mut sum = 0.0;

    for (input, target) in data_set.iter() {
        network.forward(input)?;
        sum += Euclidean.eval(target, network.output());
    }

    Ok(sum / data_set.len() as f64)
}

/// Draws the initial weights of `network`, in the canonical order
pub(crate) fn initialize_weights(
    network: &mut NeuraFeedForward,
    range: &NeuraWeightRange,
    rng: &mut dyn RngCore,
) -> Result<(), NeuraConfigErr> {
    let distribution = range.distribution()?;
    network.randomize(&distribution, rng);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::derivable::activation::NeuraTransfer;

    #[test]
    fn test_stop_after() {
        let mut stop = NeuraStopAfter::iterations(3);
        assert!(stop.should_continue(0, 1.0));
        assert!(stop.should_continue(2, 1.0));
        assert!(!stop.should_continue(3, 1.0));

        let mut stop = NeuraStopAfter::iterations(10).with_target_error(0.01);
        assert!(stop.should_continue(1, 0.5));
        assert!(!stop.should_continue(1, 0.01));

        let mut closure = |iteration: usize, _: f64| iteration < 2;
        assert!(closure.should_continue(1, 0.0));
        assert!(!closure.should_continue(2, 0.0));
    }

    #[test]
    fn test_weight_range() {
        assert!(NeuraWeightRange::new(-1.0, 1.0).is_ok());
        assert_eq!(
            NeuraWeightRange::new(1.0, 1.0),
            Err(NeuraConfigErr::InvalidWeightRange {
                low: 1.0,
                high: 1.0
            })
        );
        assert!(NeuraWeightRange::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_aggregate_error() {
        let mut network =
            NeuraFeedForward::with_transfer(vec![1, 1], NeuraTransfer::Linear(1.0), false).unwrap();
        network.set_weights(&[2.0]).unwrap();

        let data_set =
            NeuraDataSet::from_pairs([(vec![1.0], vec![1.0]), (vec![2.0], vec![2.0])]).unwrap();

        // Errors are 1 and 2, so (1 + 4) / (2 * 2)
        let error = aggregate_error(&mut network, &data_set).unwrap();
        assert!((error - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_check_data_set() {
        let network =
            NeuraFeedForward::with_transfer(vec![2, 1], NeuraTransfer::Tanh, true).unwrap();

        assert!(matches!(
            check_data_set(&network, &NeuraDataSet::default()),
            Err(NeuraTrainErr::EmptyDataSet)
        ));
        assert!(matches!(
            check_data_set(
                &network,
                &NeuraDataSet::from_pairs([(vec![1.0], vec![1.0])]).unwrap()
            ),
            Err(NeuraTrainErr::DataSetMismatch { what: "inputs", .. })
        ));
        assert!(matches!(
            check_data_set(
                &network,
                &NeuraDataSet::from_pairs([(vec![1.0, 0.0], vec![1.0, 0.0])]).unwrap()
            ),
            Err(NeuraTrainErr::DataSetMismatch { what: "targets", .. })
        ));
        assert!(check_data_set(
            &network,
            &NeuraDataSet::from_pairs([(vec![1.0, 0.0], vec![1.0])]).unwrap()
        )
        .is_ok());
    }
}
