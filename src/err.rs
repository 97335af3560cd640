//! Various error types
//!

use thiserror::Error;

/// Error type returned when building or feeding a `NeuraFeedForward` network
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NeuraNetworkErr {
    #[error("layer count can not be less than two, got {0}")]
    TooFewLayers(usize),

    #[error("layer {layer} must contain at least one neuron")]
    EmptyLayer { layer: usize },

    #[error("expected {expected} transfer functions (one per hidden and output layer), got {got}")]
    TransferCount { expected: usize, got: usize },

    #[error("expected an input of length {expected}, got {got}")]
    InputMismatch { expected: usize, got: usize },

    #[error("expected an output buffer of length {expected}, got {got}")]
    OutputMismatch { expected: usize, got: usize },

    #[error("expected {expected} weights, got {got}")]
    WeightsMismatch { expected: usize, got: usize },

    #[error("unknown transfer function (id={id}, {params} parameters)")]
    UnknownTransfer { id: u32, params: usize },
}

/// Error type for invalid trainer and update rule parameters
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NeuraConfigErr {
    #[error("{name} must be strictly positive and finite, got {value}")]
    NonPositive { name: &'static str, value: f64 },

    #[error("{lower} ({low}) must be lower than {upper} ({high})")]
    InvertedBounds {
        lower: &'static str,
        upper: &'static str,
        low: f64,
        high: f64,
    },

    #[error("weights lower boundary ({low}) must be lower than the upper boundary ({high})")]
    InvalidWeightRange { low: f64, high: f64 },

    #[error("the update rule does not support online mode")]
    OnlineModeUnsupported,

    #[error("the logging interval must be greater than 0")]
    ZeroLogInterval,
}

/// Error type returned by `NeuraTrainer::train`
#[derive(Debug, Error)]
pub enum NeuraTrainErr {
    #[error("expected network must be an instance of {0}")]
    UnexpectedNetwork(&'static str),

    #[error("can not train on an empty data set")]
    EmptyDataSet,

    #[error("data set {what} have length {got}, but the network expects {expected}")]
    DataSetMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("parallel backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Network(#[from] NeuraNetworkErr),

    #[error(transparent)]
    Config(#[from] NeuraConfigErr),
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum NeuraDataSetErr {
    #[error("got {inputs} inputs but {targets} targets")]
    LengthMismatch { inputs: usize, targets: usize },

    #[error("{what} row {row} has length {got}, expected {expected}")]
    RaggedRows {
        what: &'static str,
        row: usize,
        expected: usize,
        got: usize,
    },
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum NeuraEncoderErr {
    #[error("an encoder needs at least {min} classes, got {got}")]
    TooFewClasses { min: usize, got: usize },

    #[error("class {class} is out of range for an encoder of {classes} classes")]
    ClassOutOfRange { class: usize, classes: usize },

    #[error("expected a vector of length {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("expected one index with value 1 and all other with value 0")]
    NotOneOfN,
}

#[derive(Debug, Error)]
pub enum NeuraLoaderErr {
    #[error("row {row} has {got} columns, expected at least {expected}")]
    ShortRow {
        row: usize,
        expected: usize,
        got: usize,
    },

    #[error("row {row}, column {column}: {value:?} is not a number")]
    InvalidNumber {
        row: usize,
        column: usize,
        value: String,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Encoder(#[from] NeuraEncoderErr),

    #[error(transparent)]
    DataSet(#[from] NeuraDataSetErr),
}

#[derive(Debug, Error)]
pub enum NeuraEvaluateErr {
    #[error("the data set has no encoder to decode its targets")]
    MissingEncoder,

    #[error(transparent)]
    Encoder(#[from] NeuraEncoderErr),

    #[error(transparent)]
    Network(#[from] NeuraNetworkErr),
}
