use super::NeuraErrorNeuron;
use crate::{
    derivable::loss::Euclidean,
    network::{NeuraFeedForward, NeuraNeuron},
    optimize::NeuraUpdateRule,
};

/// Backpropagation state of a whole `NeuraFeedForward` network.
///
/// `layers[i]` holds one `NeuraErrorNeuron` for every regular neuron of layer `i + 1`;
/// the error neurons of a layer read the errors of the layer right after them.
#[derive(Clone, Debug)]
pub struct NeuraBackprop {
    layers: Vec<Vec<NeuraErrorNeuron>>,
    loss: Euclidean,
}

impl NeuraBackprop {
    pub fn new(network: &NeuraFeedForward, rule: &NeuraUpdateRule) -> Self {
        let layers = network
            .layers()
            .iter()
            .enumerate()
            .skip(1)
            .map(|(layer, neurons)| {
                neurons
                    .iter()
                    .enumerate()
                    .filter(|(_, neuron)| matches!(neuron, NeuraNeuron::Regular(_)))
                    .map(|(index, _)| NeuraErrorNeuron::new(network, layer, index, rule))
                    .collect()
            })
            .collect();

        Self {
            layers,
            loss: Euclidean,
        }
    }

    /// Computes the error terms of every neuron for the sample last fed to `network`,
    /// starting with the output layer and going backwards.
    pub fn calculate_errors(&mut self, network: &NeuraFeedForward, expected: &[f64]) {
        let Some(output_layer) = self.layers.last_mut() else {
            return;
        };

        for (neuron, target) in output_layer.iter_mut().zip(expected) {
            neuron.calculate_error(network, &self.loss, *target);
        }

        for layer in (0..self.layers.len() - 1).rev() {
            let (current, front) = self.layers.split_at_mut(layer + 1);

            for neuron in current[layer].iter_mut() {
                neuron.propagate_error(network, &front[0]);
            }
        }
    }

    pub fn calculate_gradients(&mut self, network: &NeuraFeedForward) {
        for neuron in self.neurons_mut() {
            neuron.calculate_gradients(network);
        }
    }

    pub fn update_weights(&mut self, network: &mut NeuraFeedForward, rule: &NeuraUpdateRule) {
        for neuron in self.neurons_mut() {
            neuron.update_weights(network, rule);
        }
    }

    pub fn store_weights(&mut self, network: &NeuraFeedForward) {
        for neuron in self.neurons_mut() {
            neuron.store_weights(network);
        }
    }

    pub fn restore_weights(&self, network: &mut NeuraFeedForward) {
        for neuron in self.layers.iter().flatten() {
            neuron.restore_weights(network);
        }
    }

    /// Accumulated gradients, in the canonical weight order
    pub fn gradients(&self) -> Vec<f64> {
        self.layers
            .iter()
            .flatten()
            .flat_map(|neuron| neuron.gradients().iter().copied())
            .collect()
    }

    pub fn layers(&self) -> &[Vec<NeuraErrorNeuron>] {
        &self.layers
    }

    fn neurons_mut(&mut self) -> impl Iterator<Item = &mut NeuraErrorNeuron> {
        self.layers.iter_mut().flatten()
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::Uniform;

    use super::*;
    use crate::{
        derivable::{activation::NeuraTransfer, NeuraLoss},
        network::NeuraNetwork,
        utils::uniform_vector,
    };

    fn loss_at(network: &mut NeuraFeedForward, weights: &[f64], input: &[f64], target: &[f64]) -> f64 {
        network.set_weights(weights).unwrap();
        let output = network.process(input).unwrap();
        Euclidean.eval(target, output.as_slice())
    }

    #[test]
    fn test_structure() {
        let network =
            NeuraFeedForward::with_transfer(vec![2, 3, 1], NeuraTransfer::Tanh, true).unwrap();
        let rule = NeuraUpdateRule::plain(0.1).unwrap();
        let backprop = NeuraBackprop::new(&network, &rule);

        assert_eq!(backprop.layers().len(), 2);
        assert_eq!(backprop.layers()[0].len(), 3);
        assert_eq!(backprop.layers()[1].len(), 1);
        assert_eq!(backprop.layers()[1][0].position(), (2, 0));
        assert_eq!(backprop.gradients().len(), network.weight_count());
    }

    #[test]
    fn test_gradients_match_finite_differences() {
        for (transfer, biased) in [
            (NeuraTransfer::Tanh, true),
            (NeuraTransfer::Sigmoid, false),
            (NeuraTransfer::Linear(0.7), true),
        ] {
            let mut network =
                NeuraFeedForward::with_transfer(vec![3, 4, 2], transfer, biased).unwrap();
            let mut rng = StdRng::seed_from_u64(42);
            network.randomize(&Uniform::new(-1.0, 1.0), &mut rng);

            let input = uniform_vector(3);
            let target = uniform_vector(2);
            let rule = NeuraUpdateRule::plain(0.1).unwrap();
            let mut backprop = NeuraBackprop::new(&network, &rule);

            network.process(input.as_slice()).unwrap();
            backprop.calculate_errors(&network, target.as_slice());
            backprop.calculate_gradients(&network);
            let gradients = backprop.gradients();

            let weights = network.weights();
            let h = 1e-5;

            for index in 0..weights.len() {
                let mut plus = weights.clone();
                plus[index] += h;
                let mut minus = weights.clone();
                minus[index] -= h;

                let derivative = (loss_at(&mut network, &plus, input.as_slice(), target.as_slice())
                    - loss_at(&mut network, &minus, input.as_slice(), target.as_slice()))
                    / (2.0 * h);

                // Gradients point towards decreasing loss
                approx::assert_relative_eq!(gradients[index], -derivative, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_error_signals() {
        let mut network =
            NeuraFeedForward::with_transfer(vec![1, 1, 1], NeuraTransfer::Linear(1.0), false)
                .unwrap();
        network.set_weights(&[2.0, 3.0]).unwrap();

        let rule = NeuraUpdateRule::plain(0.1).unwrap();
        let mut backprop = NeuraBackprop::new(&network, &rule);

        // Hidden output is 2, network output is 6
        network.process(&[1.0]).unwrap();
        backprop.calculate_errors(&network, &[4.0]);

        assert_eq!(backprop.layers()[1][0].error(), -2.0);
        assert_eq!(backprop.layers()[0][0].error(), -6.0);
    }

    #[test]
    fn test_gradients_accumulate_and_reset() {
        let mut network =
            NeuraFeedForward::with_transfer(vec![2, 2, 1], NeuraTransfer::Tanh, true).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        network.randomize(&Uniform::new(-0.5, 0.5), &mut rng);

        let rule = NeuraUpdateRule::plain(0.1).unwrap();
        let mut backprop = NeuraBackprop::new(&network, &rule);

        network.process(&[0.5, -0.5]).unwrap();
        backprop.calculate_errors(&network, &[1.0]);
        backprop.calculate_gradients(&network);
        let once = backprop.gradients();

        backprop.calculate_gradients(&network);
        let twice = backprop.gradients();
        for (once, twice) in once.iter().zip(&twice) {
            approx::assert_relative_eq!(2.0 * once, *twice, epsilon = 1e-12);
        }

        let before = network.weights();
        backprop.update_weights(&mut network, &rule);
        let after = network.weights();
        for index in 0..before.len() {
            approx::assert_relative_eq!(after[index], before[index] + 0.1 * twice[index], epsilon = 1e-12);
        }
        assert!(backprop.gradients().iter().all(|gradient| *gradient == 0.0));
    }

    #[test]
    fn test_store_restore() {
        let mut network =
            NeuraFeedForward::with_transfer(vec![2, 2, 1], NeuraTransfer::Tanh, true).unwrap();
        let rule = NeuraUpdateRule::plain(0.1).unwrap();
        let mut backprop = NeuraBackprop::new(&network, &rule);

        let weights: Vec<f64> = (0..network.weight_count()).map(|i| i as f64).collect();
        network.set_weights(&weights).unwrap();
        backprop.store_weights(&network);

        network.set_weights(&vec![0.0; weights.len()]).unwrap();
        backprop.restore_weights(&mut network);
        assert_eq!(network.weights(), weights);
    }
}
