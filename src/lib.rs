pub mod config;
pub mod dataset;
pub mod derivable;
pub mod encoder;
pub mod err;
pub mod evaluator;
pub mod gradient_solver;
pub mod network;
pub mod optimize;
pub mod statistics;
pub mod storage;
pub mod train;

mod utils;

pub mod prelude {
    // Network
    pub use crate::derivable::activation::NeuraTransfer;
    pub use crate::network::{NeuraFeedForward, NeuraNetwork};

    // Training
    pub use crate::optimize::{NeuraResilient, NeuraUpdateRule};
    pub use crate::statistics::{NeuraEvent, NeuraLogListener, NeuraRunState, NeuraStatistics};
    pub use crate::train::{
        aggregate_error, NeuraParallelTrainer, NeuraPropagationTrainer, NeuraStopAfter,
        NeuraStopCondition, NeuraTrainer, NeuraWeightRange,
    };

    // Data
    pub use crate::dataset::{loader::NeuraLoader, loader::NeuraTableLoader, NeuraDataSet};
    pub use crate::encoder::{equilateral::NeuraEquilateral, one_of_n::NeuraOneOfN, NeuraEncoder};
    pub use crate::evaluator::{NeuraClassificationEvaluator, NeuraEvaluator};
    pub use crate::storage::{NeuraFileStorage, NeuraWeightsStorage};

    pub use crate::config::NeuraTrainingConfig;
}
