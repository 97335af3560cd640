use std::ops::Range;

use nalgebra::DVector;

use crate::derivable::{activation::NeuraTransfer, NeuraDerivable};

/// The contiguous run of neurons of the previous layer that feed a regular neuron
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeuraConnections {
    pub layer: usize,
    pub range: Range<usize>,
}

impl NeuraConnections {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct NeuraRegularNeuron {
    weights: DVector<f64>,
    transfer: NeuraTransfer,
    connections: NeuraConnections,
    raw_output: f64,
    output: f64,
}

impl NeuraRegularNeuron {
    pub fn new(connections: NeuraConnections, transfer: NeuraTransfer) -> Self {
        Self {
            weights: DVector::zeros(connections.len()),
            transfer,
            connections,
            raw_output: 0.0,
            output: 0.0,
        }
    }

    /// Computes the weighted sum of `previous_outputs` (the outputs of the whole previous layer)
    /// over this neuron's connections, then the transfer function of that sum.
    #[inline]
    pub fn calculate(&mut self, previous_outputs: &[f64]) -> f64 {
        let inputs = &previous_outputs[self.connections.range.clone()];

        self.raw_output = self
            .weights
            .iter()
            .zip(inputs)
            .map(|(weight, input)| weight * input)
            .sum();
        self.output = self.transfer.eval(self.raw_output);

        self.output
    }

    /// Derivative of the transfer function at the last computed raw output
    #[inline]
    pub fn derivative(&self) -> f64 {
        self.transfer.derivate(self.raw_output)
    }

    /// Weight of the connection coming from neuron `index` of the previous layer
    #[inline]
    pub fn weight_from(&self, index: usize) -> f64 {
        self.weights[index - self.connections.range.start]
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn weights_mut(&mut self) -> &mut DVector<f64> {
        &mut self.weights
    }

    pub fn connections(&self) -> &NeuraConnections {
        &self.connections
    }

    pub fn transfer(&self) -> NeuraTransfer {
        self.transfer
    }

    pub fn raw_output(&self) -> f64 {
        self.raw_output
    }

    pub fn output(&self) -> f64 {
        self.output
    }
}

#[derive(Clone, Debug)]
pub enum NeuraNeuron {
    /// Holds the value of the last presented input
    Input(f64),
    /// Always outputs 1
    Bias,
    Regular(NeuraRegularNeuron),
}

impl NeuraNeuron {
    pub fn output(&self) -> f64 {
        match self {
            Self::Input(value) => *value,
            Self::Bias => 1.0,
            Self::Regular(neuron) => neuron.output(),
        }
    }

    pub fn as_regular(&self) -> Option<&NeuraRegularNeuron> {
        match self {
            Self::Regular(neuron) => Some(neuron),
            _ => None,
        }
    }

    pub fn as_regular_mut(&mut self) -> Option<&mut NeuraRegularNeuron> {
        match self {
            Self::Regular(neuron) => Some(neuron),
            _ => None,
        }
    }

    pub fn weight_count(&self) -> usize {
        self.as_regular().map(|neuron| neuron.weights.len()).unwrap_or(0)
    }
}
