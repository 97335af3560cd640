use std::marker::PhantomData;

use log::{info, trace};
use num::Float;
use rand::RngCore;
use rayon::prelude::*;

use super::*;
use crate::{
    derivable::{activation::NeuraTransfer, NeuraDerivable},
    err::NeuraNetworkErr,
    optimize::{NeuraResilient, NeuraUpdateRule, NeuraUpdateState},
    utils::cast,
};

/// Batch trainer that spreads every pass over the data set across a rayon thread pool.
///
/// The network is flattened into plain buffers of `F` (`f32` by default): one slice of neuron
/// values per sample and one slice of gradients per sample. An iteration computes the errors and
/// gradients of every sample in parallel, sums the gradients weight by weight (also in parallel),
/// applies the update rule once and evaluates the new weights on every sample.
#[derive(Clone, Debug)]
pub struct NeuraParallelTrainer<F = f32> {
    rule: NeuraUpdateRule,
    weight_range: NeuraWeightRange,

    /// Number of worker threads; 0 lets rayon decide
    threads: usize,

    _precision: PhantomData<F>,
}

impl<F> NeuraParallelTrainer<F> {
    pub fn new(rule: NeuraUpdateRule, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        rule.validate()?;
        weight_range.validate()?;

        Ok(Self {
            rule,
            weight_range,
            threads: 0,
            _precision: PhantomData,
        })
    }

    pub fn backprop(learning_rate: f64, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        Self::new(NeuraUpdateRule::plain(learning_rate)?, weight_range)
    }

    pub fn rprop(parameters: NeuraResilient, weight_range: NeuraWeightRange) -> Result<Self, NeuraConfigErr> {
        Self::new(NeuraUpdateRule::resilient(parameters)?, weight_range)
    }

    pub fn with_threads(self, threads: usize) -> Self {
        Self { threads, ..self }
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn rule(&self) -> &NeuraUpdateRule {
        &self.rule
    }
}

impl<F> NeuraTrainer for NeuraParallelTrainer<F>
where
    F: Float + Send + Sync + 'static,
    NeuraTransfer: NeuraDerivable<F>,
{
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

        let layout = NeuraKernelLayout::compile(&*network)?;
        let mut session = NeuraParallelSession::<F>::new(
            layout,
            data_set,
            &network.weights(),
            &self.rule,
            self.threads,
        )?;

        info!(
            "Training a {:?} network on {} samples with {} threads ({})",
            network.dimensions(),
            data_set.len(),
            session.pool.current_num_threads(),
            std::any::type_name::<F>()
        );

        let mut error = session.evaluate();
        let mut best_error = error;
        statistics.start();
        statistics.set_error(error);

        let mut iteration = 0;
        while stop.should_continue(iteration, error) {
            error = session.step(&self.rule);
            if error < best_error {
                session.store_best();
                best_error = error;
            }

            statistics.set_error(error);
            statistics.increment_iteration();
            iteration += 1;
        }

        network.set_weights(&session.best_weights())?;
        statistics.finish();

        Ok(best_error)
    }
}

/// Flat description of a network: where each layer lives in the per-sample neuron buffers
/// and in the weight buffer.
#[derive(Clone, Debug, PartialEq)]
struct NeuraKernelLayout {
    dimensions: Vec<usize>,
    /// Neurons per layer, bias included
    widths: Vec<usize>,
    neuron_offsets: Vec<usize>,
    /// Start of the incoming weights of each layer; unused for the input layer
    weight_offsets: Vec<usize>,
    transfers: Vec<NeuraTransfer>,
    neuron_count: usize,
    weight_count: usize,
}

impl NeuraKernelLayout {
    fn compile(network: &dyn NeuraNetwork) -> Result<Self, NeuraNetworkErr> {
        let dimensions = network.dimensions().to_vec();
        let last = dimensions.len().saturating_sub(1);

        let widths: Vec<usize> = dimensions
            .iter()
            .enumerate()
            .map(|(layer, size)| size + (network.is_biased() && layer < last) as usize)
            .collect();

        let mut neuron_offsets = Vec::with_capacity(widths.len());
        let mut neuron_count = 0;
        for width in widths.iter() {
            neuron_offsets.push(neuron_count);
            neuron_count += width;
        }

        let mut weight_offsets = vec![0; dimensions.len()];
        let mut weight_count = 0;
        for layer in 1..dimensions.len() {
            weight_offsets[layer] = weight_count;
            weight_count += dimensions[layer] * widths[layer - 1];
        }
        if weight_count != network.weight_count() {
            return Err(NeuraNetworkErr::WeightsMismatch {
                expected: network.weight_count(),
                got: weight_count,
            });
        }

        // Transfer functions reach the kernels as `(id, params)` descriptors
        let transfers = network
            .transfer_functions()
            .iter()
            .map(|transfer| NeuraTransfer::from_parts(transfer.id(), &transfer.params()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            dimensions,
            widths,
            neuron_offsets,
            weight_offsets,
            transfers,
            neuron_count,
            weight_count,
        })
    }

    fn input_len(&self) -> usize {
        self.dimensions[0]
    }

    fn output_len(&self) -> usize {
        self.dimensions[self.dimensions.len() - 1]
    }

    fn output<'a, F>(&self, outputs: &'a [F]) -> &'a [F] {
        let offset = self.neuron_offsets[self.dimensions.len() - 1];
        &outputs[offset..offset + self.output_len()]
    }

    /// Neuron values of one sample before any evaluation: bias neurons output 1, everything else 0
    fn initial_outputs<F: Float>(&self) -> Vec<F> {
        let mut outputs = vec![F::zero(); self.neuron_count];

        for layer in 0..self.dimensions.len() {
            if self.widths[layer] > self.dimensions[layer] {
                outputs[self.neuron_offsets[layer] + self.dimensions[layer]] = F::one();
            }
        }

        outputs
    }

    fn evaluate<F: Float>(&self, weights: &[F], input: &[F], outputs: &mut [F], raw: &mut [F])
    where
        NeuraTransfer: NeuraDerivable<F>,
    {
        outputs[..input.len()].copy_from_slice(input);

        for layer in 1..self.dimensions.len() {
            let transfer = self.transfers[layer - 1];
            let previous = self.neuron_offsets[layer - 1];
            let width = self.widths[layer - 1];
            let offset = self.neuron_offsets[layer];

            let (before, after) = outputs.split_at_mut(offset);
            let inputs = &before[previous..previous + width];

            for neuron in 0..self.dimensions[layer] {
                let start = self.weight_offsets[layer] + neuron * width;
                let sum = weights[start..start + width]
                    .iter()
                    .zip(inputs)
                    .fold(F::zero(), |acc, (weight, input)| acc + *weight * *input);

                raw[offset + neuron] = sum;
                after[neuron] = transfer.eval(sum);
            }
        }
    }

    fn calculate_errors<F: Float>(
        &self,
        weights: &[F],
        target: &[F],
        outputs: &[F],
        raw: &[F],
        errors: &mut [F],
    ) where
        NeuraTransfer: NeuraDerivable<F>,
    {
        let last = self.dimensions.len() - 1;
        let offset = self.neuron_offsets[last];
        let transfer = self.transfers[last - 1];

        for neuron in 0..self.dimensions[last] {
            let index = offset + neuron;
            errors[index] = -Euclidean.nabla(target[neuron], outputs[index]) * transfer.derivate(raw[index]);
        }

        for layer in (1..last).rev() {
            let transfer = self.transfers[layer - 1];
            let offset = self.neuron_offsets[layer];
            let front = self.neuron_offsets[layer + 1];
            let front_weights = self.weight_offsets[layer + 1];
            let width = self.widths[layer];

            for neuron in 0..self.dimensions[layer] {
                let mut sum = F::zero();
                for next in 0..self.dimensions[layer + 1] {
                    sum = sum + errors[front + next] * weights[front_weights + next * width + neuron];
                }

                errors[offset + neuron] = sum * transfer.derivate(raw[offset + neuron]);
            }
        }
    }

    /// Overwrites `gradients` with `input * error` for every connection of one sample
    fn calculate_gradients<F: Float>(&self, outputs: &[F], errors: &[F], gradients: &mut [F]) {
        for layer in 1..self.dimensions.len() {
            let previous = self.neuron_offsets[layer - 1];
            let width = self.widths[layer - 1];
            let offset = self.neuron_offsets[layer];

            for neuron in 0..self.dimensions[layer] {
                let error = errors[offset + neuron];
                let start = self.weight_offsets[layer] + neuron * width;

                for (gradient, input) in gradients[start..start + width]
                    .iter_mut()
                    .zip(&outputs[previous..previous + width])
                {
                    *gradient = *input * error;
                }
            }
        }
    }
}

/// Thread pool and buffers of one `train` call, released when dropped
struct NeuraParallelSession<F> {
    pool: rayon::ThreadPool,
    layout: NeuraKernelLayout,
    samples: usize,

    inputs: Vec<F>,
    targets: Vec<F>,
    outputs: Vec<F>,
    raw_outputs: Vec<F>,
    errors: Vec<F>,
    gradients: Vec<F>,
    sample_errors: Vec<F>,

    /// Gradients summed over all samples
    reduced: Vec<F>,
    weights: Vec<F>,
    best_weights: Vec<F>,
    state: NeuraUpdateState<F>,
}

impl<F> NeuraParallelSession<F>
where
    F: Float + Send + Sync,
    NeuraTransfer: NeuraDerivable<F>,
{
    fn new(
        layout: NeuraKernelLayout,
        data_set: &NeuraDataSet,
        weights: &[f64],
        rule: &NeuraUpdateRule,
        threads: usize,
    ) -> Result<Self, NeuraTrainErr> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|err| NeuraTrainErr::Backend(err.to_string()))?;

        let samples = data_set.len();
        let flatten = |rows: &[nalgebra::DVector<f64>]| -> Vec<F> {
            rows.iter()
                .flat_map(|row| row.iter().map(|value| cast(*value)))
                .collect()
        };
        let weights: Vec<F> = weights.iter().map(|weight| cast(*weight)).collect();

        trace!(
            "Allocating parallel buffers: {} samples, {} neurons and {} weights per sample",
            samples,
            layout.neuron_count,
            layout.weight_count
        );

        Ok(Self {
            pool,
            samples,
            inputs: flatten(data_set.inputs()),
            targets: flatten(data_set.targets()),
            outputs: layout.initial_outputs::<F>().repeat(samples),
            raw_outputs: vec![F::zero(); samples * layout.neuron_count],
            errors: vec![F::zero(); samples * layout.neuron_count],
            gradients: vec![F::zero(); samples * layout.weight_count],
            sample_errors: vec![F::zero(); samples],
            reduced: vec![F::zero(); layout.weight_count],
            best_weights: weights.clone(),
            state: rule.create_state(weights.len()),
            weights,
            layout,
        })
    }

    /// Feeds every sample forward with the current weights, returns the aggregate error
    fn evaluate(&mut self) -> f64 {
        let Self {
            pool,
            layout,
            inputs,
            targets,
            outputs,
            raw_outputs,
            sample_errors,
            weights,
            ..
        } = self;
        let layout = &*layout;
        let weights = weights.as_slice();
        let neurons = layout.neuron_count;

        let sum = pool.install(|| {
            outputs
                .par_chunks_mut(neurons)
                .zip(raw_outputs.par_chunks_mut(neurons))
                .zip(inputs.par_chunks(layout.input_len()))
                .zip(targets.par_chunks(layout.output_len()))
                .zip(sample_errors.par_iter_mut())
                .for_each(|((((outputs, raw), input), target), error)| {
                    layout.evaluate(weights, input, outputs, raw);
                    *error = Euclidean.eval(target, layout.output(outputs));
                });

            sample_errors
                .par_iter()
                .copied()
                .reduce(F::zero, |left, right| left + right)
        });

        sum.to_f64().unwrap_or(f64::NAN) / self.samples as f64
    }

    /// Computes the errors, then the gradients, of every sample
    fn backpropagate(&mut self) {
        let Self {
            pool,
            layout,
            targets,
            outputs,
            raw_outputs,
            errors,
            gradients,
            weights,
            ..
        } = self;
        let layout = &*layout;
        let weights = weights.as_slice();
        let neurons = layout.neuron_count;

        pool.install(|| {
            errors
                .par_chunks_mut(neurons)
                .zip(outputs.par_chunks(neurons))
                .zip(raw_outputs.par_chunks(neurons))
                .zip(targets.par_chunks(layout.output_len()))
                .for_each(|(((errors, outputs), raw), target)| {
                    layout.calculate_errors(weights, target, outputs, raw, errors);
                });

            gradients
                .par_chunks_mut(layout.weight_count)
                .zip(outputs.par_chunks(neurons))
                .zip(errors.par_chunks(neurons))
                .for_each(|((gradients, outputs), errors)| {
                    layout.calculate_gradients(outputs, errors, gradients);
                });
        });
    }

    /// Sums the gradients of all samples, one work item per weight
    fn reduce(&mut self) {
        let Self {
            pool,
            layout,
            gradients,
            reduced,
            ..
        } = self;
        let stride = layout.weight_count;
        let gradients = gradients.as_slice();

        pool.install(|| {
            reduced.par_iter_mut().enumerate().for_each(|(index, sum)| {
                *sum = gradients
                    .chunks_exact(stride)
                    .fold(F::zero(), |acc, sample| acc + sample[index]);
            });
        });
    }

    /// Runs one full iteration and returns the new aggregate error
    fn step(&mut self, rule: &NeuraUpdateRule) -> f64 {
        self.backpropagate();
        self.reduce();
        rule.apply(&mut self.state, &mut self.weights, &self.reduced);
        self.evaluate()
    }

    fn store_best(&mut self) {
        self.best_weights.copy_from_slice(&self.weights);
    }

    fn best_weights(&self) -> Vec<f64> {
        self.best_weights
            .iter()
            .map(|weight| weight.to_f64().unwrap_or(f64::NAN))
            .collect()
    }
}

impl<F> Drop for NeuraParallelSession<F> {
    fn drop(&mut self) {
        trace!(
            "Releasing parallel buffers of {} samples and {} weights",
            self.samples,
            self.layout.weight_count
        );
    }
}

#[cfg(test)]
mod test {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::train::NeuraPropagationTrainer;

    fn sine_data_set() -> NeuraDataSet {
        NeuraDataSet::from_pairs((0..16).map(|index| {
            let x = index as f64 / 8.0 - 1.0;
            (vec![x, x * x], vec![(3.0 * x).sin() * 0.8, x * 0.5])
        }))
        .unwrap()
    }

    fn train_both<F>(
        mut parallel: NeuraParallelTrainer<F>,
        mut sequential: NeuraPropagationTrainer,
        transfer: NeuraTransfer,
        iterations: usize,
    ) -> ((f64, Vec<f64>), (f64, Vec<f64>))
    where
        F: Float + Send + Sync + 'static,
        NeuraTransfer: NeuraDerivable<F>,
    {
        let data_set = sine_data_set();
        let mut left =
            NeuraFeedForward::with_transfer(vec![2, 5, 4, 2], transfer, true).unwrap();
        let mut right = left.clone();

        let parallel_error = parallel
            .train(
                &mut left,
                &data_set,
                &mut NeuraStopAfter::iterations(iterations),
                &mut NeuraStatistics::new(),
                &mut StdRng::seed_from_u64(17),
            )
            .unwrap();
        let sequential_error = sequential
            .train(
                &mut right,
                &data_set,
                &mut NeuraStopAfter::iterations(iterations),
                &mut NeuraStatistics::new(),
                &mut StdRng::seed_from_u64(17),
            )
            .unwrap();

        (
            (parallel_error, left.weights()),
            (sequential_error, right.weights()),
        )
    }

    #[test]
    fn test_layout() {
        let network =
            NeuraFeedForward::with_transfer(vec![2, 3, 1], NeuraTransfer::Sigmoid, true).unwrap();
        let layout = NeuraKernelLayout::compile(&network).unwrap();

        assert_eq!(layout.widths, vec![3, 4, 1]);
        assert_eq!(layout.neuron_offsets, vec![0, 3, 7]);
        assert_eq!(layout.weight_offsets, vec![0, 0, 9]);
        assert_eq!(layout.neuron_count, 8);
        assert_eq!(layout.weight_count, network.weight_count());
        assert_eq!(
            layout.initial_outputs::<f64>(),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_matches_network_process() {
        let mut network =
            NeuraFeedForward::with_transfer(vec![3, 4, 2], NeuraTransfer::Tanh, true).unwrap();
        network.randomize(
            &rand_distr::Uniform::new(-1.0, 1.0),
            &mut StdRng::seed_from_u64(5),
        );
        let layout = NeuraKernelLayout::compile(&network).unwrap();

        let input = [0.3, -0.7, 0.1];
        let mut outputs = layout.initial_outputs::<f64>();
        let mut raw = vec![0.0; layout.neuron_count];
        layout.evaluate::<f64>(&network.weights(), &input, &mut outputs, &mut raw);

        let expected = network.process(&input).unwrap();
        approx::assert_relative_eq!(layout.output(&outputs), expected.as_slice(), epsilon = 1e-12);
    }

    #[test]
    fn test_equivalence_f64() {
        let range = NeuraWeightRange::new(-0.5, 0.5).unwrap();

        let ((parallel_error, parallel_weights), (sequential_error, sequential_weights)) =
            train_both(
                NeuraParallelTrainer::<f64>::backprop(0.1, range)
                    .unwrap()
                    .with_threads(3),
                NeuraPropagationTrainer::backprop(0.1, range).unwrap(),
                NeuraTransfer::Tanh,
                25,
            );

        approx::assert_relative_eq!(parallel_error, sequential_error, epsilon = 1e-9);
        approx::assert_relative_eq!(
            parallel_weights.as_slice(),
            sequential_weights.as_slice(),
            epsilon = 1e-9
        );

        let ((parallel_error, parallel_weights), (sequential_error, sequential_weights)) =
            train_both(
                NeuraParallelTrainer::<f64>::rprop(NeuraResilient::default(), range).unwrap(),
                NeuraPropagationTrainer::rprop(NeuraResilient::default(), range).unwrap(),
                NeuraTransfer::Sigmoid,
                25,
            );

        approx::assert_relative_eq!(parallel_error, sequential_error, epsilon = 1e-9);
        approx::assert_relative_eq!(
            parallel_weights.as_slice(),
            sequential_weights.as_slice(),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_equivalence_f32() {
        let range = NeuraWeightRange::new(-0.5, 0.5).unwrap();

        let ((parallel_error, _), (sequential_error, _)) = train_both(
            NeuraParallelTrainer::<f32>::backprop(0.1, range).unwrap(),
            NeuraPropagationTrainer::backprop(0.1, range).unwrap(),
            NeuraTransfer::Tanh,
            25,
        );

        approx::assert_relative_eq!(parallel_error, sequential_error, epsilon = 1e-3);
    }

    #[test]
    fn test_errors_decrease() {
        let range = NeuraWeightRange::new(-0.5, 0.5).unwrap();
        let mut trainer = NeuraParallelTrainer::<f32>::rprop(NeuraResilient::default(), range)
            .unwrap()
            .with_threads(2);
        let data_set = sine_data_set();
        let mut network =
            NeuraFeedForward::with_transfer(vec![2, 6, 2], NeuraTransfer::Tanh, true).unwrap();

        let mut statistics = NeuraStatistics::new();
        let best = trainer
            .train(
                &mut network,
                &data_set,
                &mut NeuraStopAfter::iterations(200),
                &mut statistics,
                &mut StdRng::seed_from_u64(11),
            )
            .unwrap();

        assert_eq!(statistics.iteration(), 200);
        assert_eq!(statistics.best_error(), best);
        assert!(best < 0.05, "best error {} is too high", best);

        let error = aggregate_error(&mut network, &data_set).unwrap();
        approx::assert_relative_eq!(error, best, epsilon = 1e-5);
    }
}
