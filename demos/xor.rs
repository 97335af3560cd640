use neuraprop::prelude::*;

const CONFIG: &str = r#"{
    "network": { "dimensions": [2, 4, 1], "transfer": "tanh" },
    "algorithm": { "type": "backprop", "learning_rate": 0.1, "online": true },
    "weights": { "low": -0.5, "high": 0.5 },
    "iterations": 10000,
    "target_error": 0.001,
    "log_interval": 1000
}"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => NeuraTrainingConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => NeuraTrainingConfig::from_json(CONFIG)?,
    };

    let data_set = NeuraDataSet::from_pairs([
        ([0.0, 0.0], [0.0]),
        ([0.0, 1.0], [1.0]),
        ([1.0, 0.0], [1.0]),
        ([1.0, 1.0], [0.0]),
    ])?;

    let mut network = config.build_network()?;
    let mut trainer = config.build_trainer()?;
    let mut statistics = NeuraStatistics::new();
    statistics.add_listener(config.log_listener()?, NeuraEvent::ALL);

    let error = trainer.train(
        &mut network,
        &data_set,
        &mut config.stop_condition(),
        &mut statistics,
        &mut config.build_rng(),
    )?;
    println!("Trained in {} iterations, error: {:.6}", statistics.iteration(), error);

    for (input, target) in data_set.iter() {
        println!(
            "Input: {:?}, target: {}, actual: {:.3}",
            input,
            target[0],
            network.process(input)?[0]
        );
    }

    Ok(())
}
