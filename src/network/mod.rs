use std::any::Any;

use nalgebra::DVector;

use crate::{derivable::activation::NeuraTransfer, err::NeuraNetworkErr};

mod feed_forward;
pub use feed_forward::NeuraFeedForward;

mod neuron;
pub use neuron::{NeuraConnections, NeuraNeuron, NeuraRegularNeuron};

/// Capabilities that the collaborators of a network (trainers, weight storages, evaluators) rely on.
pub trait NeuraNetwork {
    /// Feeds `input` through the network and returns the outputs of the output layer
    fn process(&mut self, input: &[f64]) -> Result<DVector<f64>, NeuraNetworkErr>;

    /// Same as `process`, writing into a caller-provided buffer
    fn process_into(&mut self, input: &[f64], output: &mut [f64]) -> Result<(), NeuraNetworkErr>;

    /// Flattens all the weights, in the canonical weight order
    fn weights(&self) -> Vec<f64>;

    /// Inverse of `weights`
    fn set_weights(&mut self, weights: &[f64]) -> Result<(), NeuraNetworkErr>;

    fn weight_count(&self) -> usize;

    /// Number of neurons in each layer, bias neurons excluded
    fn dimensions(&self) -> &[usize];

    fn is_biased(&self) -> bool;

    /// One transfer function per hidden and output layer
    fn transfer_functions(&self) -> &[NeuraTransfer];

    fn input_len(&self) -> usize {
        self.dimensions().first().copied().unwrap_or(0)
    }

    fn output_len(&self) -> usize {
        self.dimensions().last().copied().unwrap_or(0)
    }

    /// Trampoline for allowing trainers to recover the concrete network type
    fn as_any_mut(&mut self) -> &mut dyn Any;
}
