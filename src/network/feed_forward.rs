use std::any::Any;

use nalgebra::DVector;
use rand::RngCore;
use rand_distr::{Distribution, Uniform};

use super::*;

/// A fully-connected feed-forward network.
///
/// Neurons are stored contiguously per layer. When the network is biased, every layer but the
/// output layer ends with a bias neuron, which feeds every regular neuron of the next layer.
/// Regular neurons of layer `i` are connected to all the neurons of layer `i - 1`, bias included.
///
/// Weights are exposed as a flat list in the canonical order: layer by layer (starting with the
/// first hidden layer), neuron by neuron (bias neurons have no weights), then connection by connection.
#[derive(Clone, Debug)]
pub struct NeuraFeedForward {
    dimensions: Vec<usize>,
    transfers: Vec<NeuraTransfer>,
    biased: bool,
    layers: Vec<Vec<NeuraNeuron>>,
    /// Outputs of every neuron of the last forward pass, bias neurons included
    outputs: Vec<DVector<f64>>,
    weight_count: usize,
}

impl NeuraFeedForward {
    /// Builds a network with one transfer function per hidden and output layer.
    /// All weights start at zero.
    pub fn new(
        dimensions: Vec<usize>,
        transfers: Vec<NeuraTransfer>,
        biased: bool,
    ) -> Result<Self, NeuraNetworkErr> {
        if dimensions.len() < 2 {
            return Err(NeuraNetworkErr::TooFewLayers(dimensions.len()));
        }
        if let Some(layer) = dimensions.iter().position(|&size| size == 0) {
            return Err(NeuraNetworkErr::EmptyLayer { layer });
        }
        if transfers.len() != dimensions.len() - 1 {
            return Err(NeuraNetworkErr::TransferCount {
                expected: dimensions.len() - 1,
                got: transfers.len(),
            });
        }

        let mut layers: Vec<Vec<NeuraNeuron>> = Vec::with_capacity(dimensions.len());
        let mut outputs = Vec::with_capacity(dimensions.len());

        for (index, &size) in dimensions.iter().enumerate() {
            let has_bias = biased && index + 1 < dimensions.len();
            let mut layer = Vec::with_capacity(size + has_bias as usize);

            if index == 0 {
                layer.extend((0..size).map(|_| NeuraNeuron::Input(0.0)));
            } else {
                let connections = NeuraConnections {
                    layer: index - 1,
                    range: 0..layers[index - 1].len(),
                };
                let transfer = transfers[index - 1];

                layer.extend((0..size).map(|_| {
                    NeuraNeuron::Regular(NeuraRegularNeuron::new(connections.clone(), transfer))
                }));
            }

            if has_bias {
                layer.push(NeuraNeuron::Bias);
            }

            outputs.push(DVector::from_iterator(
                layer.len(),
                layer.iter().map(NeuraNeuron::output),
            ));
            layers.push(layer);
        }

        let weight_count = layers
            .iter()
            .flatten()
            .map(NeuraNeuron::weight_count)
            .sum();

        Ok(Self {
            dimensions,
            transfers,
            biased,
            layers,
            outputs,
            weight_count,
        })
    }

    /// Builds a network using the same transfer function for every hidden and output layer
    pub fn with_transfer(
        dimensions: Vec<usize>,
        transfer: NeuraTransfer,
        biased: bool,
    ) -> Result<Self, NeuraNetworkErr> {
        let transfers = vec![transfer; dimensions.len().saturating_sub(1)];
        Self::new(dimensions, transfers, biased)
    }

    pub fn layers(&self) -> &[Vec<NeuraNeuron>] {
        &self.layers
    }

    /// Outputs of the neurons of `layer` computed by the last forward pass
    pub fn layer_outputs(&self, layer: usize) -> &DVector<f64> {
        &self.outputs[layer]
    }

    /// Outputs of the output layer computed by the last forward pass
    pub fn output(&self) -> &[f64] {
        self.outputs
            .last()
            .map(|outputs| outputs.as_slice())
            .unwrap_or(&[])
    }

    /// # Panics
    ///
    /// Panics if the neuron at `(layer, index)` is not a regular neuron.
    pub fn regular(&self, layer: usize, index: usize) -> &NeuraRegularNeuron {
        match &self.layers[layer][index] {
            NeuraNeuron::Regular(neuron) => neuron,
            _ => panic!("Neuron ({}, {}) is not a regular neuron", layer, index),
        }
    }

    /// # Panics
    ///
    /// Panics if the neuron at `(layer, index)` is not a regular neuron.
    pub fn regular_mut(&mut self, layer: usize, index: usize) -> &mut NeuraRegularNeuron {
        match &mut self.layers[layer][index] {
            NeuraNeuron::Regular(neuron) => neuron,
            _ => panic!("Neuron ({}, {}) is not a regular neuron", layer, index),
        }
    }

    fn regular_neurons(&self) -> impl Iterator<Item = &NeuraRegularNeuron> {
        self.layers
            .iter()
            .flatten()
            .filter_map(NeuraNeuron::as_regular)
    }

    fn regular_neurons_mut(&mut self) -> impl Iterator<Item = &mut NeuraRegularNeuron> {
        self.layers
            .iter_mut()
            .flatten()
            .filter_map(NeuraNeuron::as_regular_mut)
    }

    /// Draws every weight from `distribution`, in the canonical weight order
    pub fn randomize(&mut self, distribution: &Uniform<f64>, rng: &mut dyn RngCore) {
        for neuron in self.regular_neurons_mut() {
            for weight in neuron.weights_mut().iter_mut() {
                *weight = distribution.sample(&mut *rng);
            }
        }
    }

    /// Presents `input` to the input layer and updates the outputs of every regular neuron, layer by layer
    pub fn forward(&mut self, input: &[f64]) -> Result<(), NeuraNetworkErr> {
        let input_len = self.dimensions[0];
        if input.len() != input_len {
            return Err(NeuraNetworkErr::InputMismatch {
                expected: input_len,
                got: input.len(),
            });
        }

        for (index, value) in input.iter().enumerate() {
            self.layers[0][index] = NeuraNeuron::Input(*value);
            self.outputs[0][index] = *value;
        }

        for layer in 1..self.layers.len() {
            let (previous, current) = self.outputs.split_at_mut(layer);
            let previous = previous[layer - 1].as_slice();
            let current = &mut current[0];

            for (index, neuron) in self.layers[layer].iter_mut().enumerate() {
                if let NeuraNeuron::Regular(neuron) = neuron {
                    current[index] = neuron.calculate(previous);
                }
            }
        }

        Ok(())
    }
}

impl NeuraNetwork for NeuraFeedForward {
    fn process(&mut self, input: &[f64]) -> Result<DVector<f64>, NeuraNetworkErr> {
        self.forward(input)?;
        Ok(DVector::from_column_slice(self.output()))
    }

    fn process_into(&mut self, input: &[f64], output: &mut [f64]) -> Result<(), NeuraNetworkErr> {
        let output_len = self.output_len();
        if output.len() != output_len {
            return Err(NeuraNetworkErr::OutputMismatch {
                expected: output_len,
                got: output.len(),
            });
        }

        self.forward(input)?;
        output.copy_from_slice(self.output());
        Ok(())
    }

    fn weights(&self) -> Vec<f64> {
        let mut weights = Vec::with_capacity(self.weight_count);

        for neuron in self.regular_neurons() {
            weights.extend(neuron.weights().iter().copied());
        }

        weights
    }

    fn set_weights(&mut self, weights: &[f64]) -> Result<(), NeuraNetworkErr> {
        if weights.len() != self.weight_count {
            return Err(NeuraNetworkErr::WeightsMismatch {
                expected: self.weight_count,
                got: weights.len(),
            });
        }

        let mut offset = 0;
        for neuron in self.regular_neurons_mut() {
            let target = neuron.weights_mut();
            let len = target.len();
            target.copy_from_slice(&weights[offset..offset + len]);
            offset += len;
        }

        Ok(())
    }

    fn weight_count(&self) -> usize {
        self.weight_count
    }

    fn dimensions(&self) -> &[usize] {
        &self.dimensions
    }

    fn is_biased(&self) -> bool {
        self.biased
    }

    fn transfer_functions(&self) -> &[NeuraTransfer] {
        &self.transfers
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
