//! Serde-deserializable description of a training run.
//!
//! ```json
//! {
//!     "network": { "dimensions": [2, 4, 1], "transfer": "tanh" },
//!     "algorithm": { "type": "backprop", "learning_rate": 0.1, "online": true },
//!     "weights": { "low": -0.5, "high": 0.5 },
//!     "seed": 42,
//!     "iterations": 10000,
//!     "target_error": 0.001
//! }
//! ```

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::{
    derivable::activation::NeuraTransfer,
    err::{NeuraConfigErr, NeuraNetworkErr},
    network::NeuraFeedForward,
    optimize::{NeuraResilient, NeuraUpdateRule},
    statistics::NeuraLogListener,
    train::{
        NeuraParallelTrainer, NeuraPropagationTrainer, NeuraStopAfter, NeuraTrainer,
        NeuraWeightRange,
    },
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuraTrainingConfig {
    pub network: NeuraNetworkConfig,
    pub algorithm: NeuraAlgorithmConfig,

    #[serde(default)]
    pub implementation: NeuraImplementation,

    #[serde(default)]
    pub weights: NeuraWeightRange,

    /// Seed of the random generator used for weight initialization; drawn from the OS if missing
    #[serde(default)]
    pub seed: Option<u64>,

    pub iterations: usize,

    #[serde(default)]
    pub target_error: Option<f64>,

    /// The progress is logged every `log_interval` iterations
    #[serde(default = "default_log_interval")]
    pub log_interval: usize,
}

fn default_log_interval() -> usize {
    100
}

fn default_biased() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuraNetworkConfig {
    pub dimensions: Vec<usize>,

    #[serde(default = "default_biased")]
    pub biased: bool,

    /// Transfer function of every hidden and output layer
    #[serde(default)]
    pub transfer: NeuraTransfer,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NeuraAlgorithmConfig {
    Backprop {
        learning_rate: f64,

        #[serde(default)]
        online: bool,
    },
    Rprop(NeuraResilient),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NeuraImplementation {
    #[default]
    Sequential,
    Parallel {
        #[serde(default)]
        threads: usize,
    },
}

impl NeuraTrainingConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn build_network(&self) -> Result<NeuraFeedForward, NeuraNetworkErr> {
        NeuraFeedForward::with_transfer(
            self.network.dimensions.clone(),
            self.network.transfer,
            self.network.biased,
        )
    }

    pub fn build_rule(&self) -> Result<NeuraUpdateRule, NeuraConfigErr> {
        match self.algorithm {
            NeuraAlgorithmConfig::Backprop { learning_rate, .. } => {
                NeuraUpdateRule::plain(learning_rate)
            }
            NeuraAlgorithmConfig::Rprop(parameters) => NeuraUpdateRule::resilient(parameters),
        }
    }

    pub fn build_trainer(&self) -> Result<Box<dyn NeuraTrainer>, NeuraConfigErr> {
        let rule = self.build_rule()?;
        let online = matches!(
            self.algorithm,
            NeuraAlgorithmConfig::Backprop { online: true, .. }
        );

        match self.implementation {
            NeuraImplementation::Sequential => {
                let mut trainer = NeuraPropagationTrainer::new(rule, self.weights)?;
                trainer.set_online_mode(online)?;
                Ok(Box::new(trainer))
            }
            NeuraImplementation::Parallel { threads } => {
                if online {
                    return Err(NeuraConfigErr::OnlineModeUnsupported);
                }

                let trainer = NeuraParallelTrainer::<f32>::new(rule, self.weights)?;
                Ok(Box::new(trainer.with_threads(threads)))
            }
        }
    }

    pub fn build_rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    pub fn stop_condition(&self) -> NeuraStopAfter {
        NeuraStopAfter {
            iterations: self.iterations,
            target_error: self.target_error,
        }
    }

    pub fn log_listener(&self) -> Result<NeuraLogListener, NeuraConfigErr> {
        NeuraLogListener::new(self.log_interval)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::NeuraNetwork;

    #[test]
    fn test_parse() {
        let config = NeuraTrainingConfig::from_json(
            r#"{
                "network": { "dimensions": [4, 6, 3], "transfer": { "linear": 0.5 } },
                "algorithm": { "type": "rprop", "k_plus": 1.5 },
                "implementation": { "type": "parallel", "threads": 2 },
                "iterations": 50
            }"#,
        )
        .unwrap();

        assert_eq!(config.network.transfer, NeuraTransfer::Linear(0.5));
        assert!(config.network.biased);
        assert_eq!(
            config.algorithm,
            NeuraAlgorithmConfig::Rprop(NeuraResilient {
                k_plus: 1.5,
                ..Default::default()
            })
        );
        assert_eq!(
            config.implementation,
            NeuraImplementation::Parallel { threads: 2 }
        );
        assert_eq!(config.weights, NeuraWeightRange::default());
        assert_eq!(config.seed, None);
        assert_eq!(config.log_interval, 100);
        assert_eq!(config.stop_condition(), NeuraStopAfter::iterations(50));
    }

    #[test]
    fn test_build() {
        let config = NeuraTrainingConfig::from_json(
            r#"{
                "network": { "dimensions": [2, 3, 1], "biased": false, "transfer": "sigmoid" },
                "algorithm": { "type": "backprop", "learning_rate": 0.2, "online": true },
                "weights": { "low": -1.0, "high": 1.0 },
                "seed": 3,
                "iterations": 10,
                "target_error": 0.01
            }"#,
        )
        .unwrap();

        let network = config.build_network().unwrap();
        assert_eq!(network.weight_count(), 3 * 2 + 3);
        assert_eq!(config.build_rule(), NeuraUpdateRule::plain(0.2));
        assert!(config.build_trainer().is_ok());
        assert_eq!(
            config.stop_condition(),
            NeuraStopAfter::iterations(10).with_target_error(0.01)
        );
    }

    #[test]
    fn test_invalid() {
        let mut config = NeuraTrainingConfig::from_json(
            r#"{
                "network": { "dimensions": [2, 1] },
                "algorithm": { "type": "rprop" },
                "iterations": 10
            }"#,
        )
        .unwrap();
        assert!(config.build_trainer().is_ok());

        config.algorithm = NeuraAlgorithmConfig::Backprop {
            learning_rate: 0.1,
            online: true,
        };
        config.implementation = NeuraImplementation::Parallel { threads: 0 };
        assert!(matches!(
            config.build_trainer(),
            Err(NeuraConfigErr::OnlineModeUnsupported)
        ));

        config.weights = NeuraWeightRange {
            low: 1.0,
            high: 0.0,
        };
        config.implementation = NeuraImplementation::Sequential;
        assert!(matches!(
            config.build_trainer(),
            Err(NeuraConfigErr::InvalidWeightRange { .. })
        ));

        config.log_interval = 0;
        assert!(config.log_listener().is_err());

        assert!(
            NeuraTrainingConfig::from_json(r#"{ "network": { "dimensions": [1, 1] } }"#).is_err()
        );
    }
}
