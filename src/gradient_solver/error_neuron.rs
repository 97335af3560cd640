use nalgebra::DVector;

use crate::{
    derivable::NeuraLoss,
    network::NeuraFeedForward,
    optimize::{NeuraUpdateRule, NeuraUpdateState},
};

/// Training-time companion of one regular neuron of a `NeuraFeedForward` network.
///
/// Holds the error term of the neuron for the last presented sample, the gradients accumulated
/// since the last weight update, a snapshot of the neuron's weights and the update rule's state.
#[derive(Clone, Debug)]
pub struct NeuraErrorNeuron {
    layer: usize,
    index: usize,
    error: f64,
    gradients: DVector<f64>,
    snapshot: DVector<f64>,
    state: NeuraUpdateState<f64>,
}

impl NeuraErrorNeuron {
    pub fn new(network: &NeuraFeedForward, layer: usize, index: usize, rule: &NeuraUpdateRule) -> Self {
        let weights = network.regular(layer, index).weights();

        Self {
            layer,
            index,
            error: 0.0,
            gradients: DVector::zeros(weights.len()),
            snapshot: weights.clone(),
            state: rule.create_state(weights.len()),
        }
    }

    /// Error term of an output neuron: `f'(raw) * (expected - output)`
    pub fn calculate_error(
        &mut self,
        network: &NeuraFeedForward,
        loss: &impl NeuraLoss<f64>,
        expected: f64,
    ) {
        let neuron = network.regular(self.layer, self.index);
        self.error = -loss.nabla(expected, neuron.output()) * neuron.derivative();
    }

    /// Error term of a hidden neuron: `f'(raw) * Σ error_k * w_k`, where `k` goes over the
    /// neurons of the next layer and `w_k` is the weight linking this neuron to `k`.
    pub fn propagate_error(&mut self, network: &NeuraFeedForward, front: &[NeuraErrorNeuron]) {
        let sum: f64 = front
            .iter()
            .map(|next| next.error * network.regular(next.layer, next.index).weight_from(self.index))
            .sum();

        self.error = sum * network.regular(self.layer, self.index).derivative();
    }

    /// Adds `input * error` to the gradient of every incoming connection
    pub fn calculate_gradients(&mut self, network: &NeuraFeedForward) {
        let connections = network.regular(self.layer, self.index).connections();
        let inputs = network
            .layer_outputs(connections.layer)
            .rows(connections.range.start, connections.len());

        self.gradients.axpy(self.error, &inputs, 1.0);
    }

    /// Applies the accumulated gradients to the neuron's weights, then clears them
    pub fn update_weights(&mut self, network: &mut NeuraFeedForward, rule: &NeuraUpdateRule) {
        let weights = network.regular_mut(self.layer, self.index).weights_mut();

        rule.apply(&mut self.state, weights.as_mut_slice(), self.gradients.as_slice());
        self.gradients.fill(0.0);
    }

    pub fn store_weights(&mut self, network: &NeuraFeedForward) {
        self.snapshot
            .copy_from(network.regular(self.layer, self.index).weights());
    }

    pub fn restore_weights(&self, network: &mut NeuraFeedForward) {
        network
            .regular_mut(self.layer, self.index)
            .weights_mut()
            .copy_from(&self.snapshot);
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn gradients(&self) -> &DVector<f64> {
        &self.gradients
    }

    /// Coordinates `(layer, index)` of the companion neuron
    pub fn position(&self) -> (usize, usize) {
        (self.layer, self.index)
    }
}
