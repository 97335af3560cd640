use log::{debug, info};
use rand::RngCore;

use super::*;
use crate::{
    gradient_solver::NeuraBackprop,
    optimize::{NeuraResilient, NeuraUpdateRule},
};

/// Trains a `NeuraFeedForward` network by backpropagation, one neuron at a time.
///
/// Every iteration goes through the whole data set: each sample is fed forward, its errors are
/// propagated backwards and its gradients are accumulated. In online mode, weights are updated after
/// every sample; otherwise they are updated once, after the last sample.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuraPropagationTrainer {
    rule: NeuraUpdateRule,
    weight_range: NeuraWeightRange,
    online: bool,
}

impl NeuraPropagationTrainer {
    pub fn new(rule: NeuraUpdateRule, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        rule.validate()?;
        weight_range.validate()?;

        Ok(Self {
            rule,
            weight_range,
            online: false,
        })
    }

    /// Plain gradient descent with the given learning rate
    pub fn backprop(learning_rate: f64, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        Self::new(NeuraUpdateRule::plain(learning_rate)?, weight_range)
    }

    /// Resilient propagation
    pub fn rprop(parameters: NeuraResilient, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        Self::new(NeuraUpdateRule::resilient(parameters)?, weight_range)
    }

    /// Switches between online updates (after every sample) and batch updates (after every pass).
    /// Fails if the update rule can not work in online mode.
    pub fn set_online_mode(&mut self, online: bool) -> Result<(), NeuraConfigErr> {
        if online && !self.rule.supports_online_mode() {
            return Err(NeuraConfigErr::OnlineModeUnsupported);
        }

        self.online = online;
        Ok(())
    }

    pub fn is_online_mode(&self) -> bool {
        self.online
    }

    pub fn rule(&self) -> &NeuraUpdateRule {
        &self.rule
    }

    pub fn weight_range(&self) -> &NeuraWeightRange {
        &self.weight_range
    }
}

impl NeuraTrainer for NeuraPropagationTrainer {
    fn train(
        &mut self,
        network: &mut dyn NeuraNetwork,
        data_set: &NeuraDataSet,
        stop: &mut dyn NeuraStopCondition,
        statistics: &mut NeuraStatistics,
        rng: &mut dyn RngCore,
    ) -> Result<f64, NeuraTrainErr> {
        let network = as_feed_forward(network)?;
        check_data_set(&*network, data_set)?;

        initialize_weights(network, &self.weight_range, rng)?;
        let mut backprop = NeuraBackprop::new(network, &self.rule);

        let mut error = aggregate_error(network, data_set)?;
        let mut best_error = error;

        info!(
            "Training a {:?} network on {} samples ({} mode)",
            network.dimensions(),
            data_set.len(),
            if self.online { "online" } else { "batch" }
        );
        statistics.start();
        statistics.set_error(error);

        let mut iteration = 0;
        while stop.should_continue(iteration, error) {
            for (input, target) in data_set.iter() {
                network.forward(input)?;
                backprop.calculate_errors(network, target);
                backprop.calculate_gradients(network);

                if self.online {
                    backprop.update_weights(network, &self.rule);
                }
            }

            if !self.online {
                backprop.update_weights(network, &self.rule);
            }

            error = aggregate_error(network, data_set)?;
            if error < best_error {
                backprop.store_weights(network);
                best_error = error;
            }

            statistics.set_error(error);
            statistics.increment_iteration();
            iteration += 1;
        }

        backprop.restore_weights(network);
        debug!("Restored the weights of the best iteration (error {:e})", best_error);
        statistics.finish();

        Ok(best_error)
    }
}
