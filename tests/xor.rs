use approx::assert_abs_diff_eq;
use rand::{rngs::StdRng, SeedableRng};

use neuraprop::prelude::*;

fn xor() -> NeuraDataSet {
    NeuraDataSet::from_pairs([
        ([0.0, 0.0], [0.0]),
        ([0.0, 1.0], [1.0]),
        ([1.0, 0.0], [1.0]),
        ([1.0, 1.0], [0.0]),
    ])
    .unwrap()
}

/// Trains a 2-4-1 biased tanh network from the given seed
fn train_xor(trainer: &mut dyn NeuraTrainer, seed: u64, iterations: usize) -> (NeuraFeedForward, f64) {
    let mut network =
        NeuraFeedForward::with_transfer(vec![2, 4, 1], NeuraTransfer::Tanh, true).unwrap();

    let error = trainer
        .train(
            &mut network,
            &xor(),
            &mut NeuraStopAfter::iterations(iterations).with_target_error(0.001),
            &mut NeuraStatistics::new(),
            &mut StdRng::seed_from_u64(seed),
        )
        .unwrap();

    (network, error)
}

fn assert_solves_xor(network: &mut NeuraFeedForward, error: f64) {
    assert!(error < 0.01, "error {error} is too high");

    let data_set = xor();
    assert_abs_diff_eq!(aggregate_error(network, &data_set).unwrap(), error, epsilon = 1e-12);

    for (input, target) in data_set.iter() {
        let output = network.process(input).unwrap();
        assert_abs_diff_eq!(output[0], target[0], epsilon = 0.3);
    }
}

#[test]
fn test_xor_online_backprop() {
    let mut trainer = NeuraPropagationTrainer::backprop(0.1, NeuraWeightRange::default()).unwrap();
    trainer.set_online_mode(true).unwrap();

    let (mut network, error) = train_xor(&mut trainer, 0, 10000);
    assert_solves_xor(&mut network, error);
}

#[test]
fn test_xor_batch_backprop() {
    let mut trainer = NeuraPropagationTrainer::backprop(0.1, NeuraWeightRange::default()).unwrap();

    for seed in 0..5 {
        let (mut network, error) = train_xor(&mut trainer, seed, 10000);
        assert_solves_xor(&mut network, error);
    }
}

#[test]
fn test_xor_rprop() {
    let mut trainer = NeuraPropagationTrainer::rprop(
        NeuraResilient::default(),
        NeuraWeightRange::new(-1.0, 1.0).unwrap(),
    )
    .unwrap();

    let (mut network, error) = train_xor(&mut trainer, 0, 2000);
    assert_solves_xor(&mut network, error);
}

#[test]
fn test_xor_parallel_rprop() {
    let mut trainer = NeuraParallelTrainer::<f64>::rprop(
        NeuraResilient::default(),
        NeuraWeightRange::new(-1.0, 1.0).unwrap(),
    )
    .unwrap()
    .with_threads(2);

    let (mut network, error) = train_xor(&mut trainer, 0, 2000);
    assert_solves_xor(&mut network, error);
}
