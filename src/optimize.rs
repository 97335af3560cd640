//! Weight update rules shared by the sequential and the parallel trainers.
//!
//! Gradients handed to a rule follow the "error times input" convention:
//! they point in the direction that *decreases* the loss.

use num::Float;
use serde::{Deserialize, Serialize};

use crate::{err::NeuraConfigErr, utils::cast};

/// Parameters of the resilient propagation (RPROP) rule
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuraResilient {
    /// Factor applied to a step when the gradient changes sign
    pub k_minus: f64,
    /// Factor applied to a step when the gradient keeps its sign
    pub k_plus: f64,
    /// Step size of every weight before the first update
    pub delta_initial: f64,
    pub delta_min: f64,
    pub delta_max: f64,
}

impl Default for NeuraResilient {
    fn default() -> Self {
        Self {
            k_minus: 0.5,
            k_plus: 1.2,
            delta_initial: 0.1,
            delta_min: 1e-6,
            delta_max: 50.0,
        }
    }
}

impl NeuraResilient {
    pub fn validate(&self) -> Result<(), NeuraConfigErr> {
        positive("k_minus", self.k_minus)?;
        positive("k_plus", self.k_plus)?;
        positive("delta_initial", self.delta_initial)?;
        positive("delta_min", self.delta_min)?;
        positive("delta_max", self.delta_max)?;

        if self.k_minus >= self.k_plus {
            return Err(NeuraConfigErr::InvertedBounds {
                lower: "k_minus",
                upper: "k_plus",
                low: self.k_minus,
                high: self.k_plus,
            });
        }
        if self.delta_min >= self.delta_max {
            return Err(NeuraConfigErr::InvertedBounds {
                lower: "delta_min",
                upper: "delta_max",
                low: self.delta_min,
                high: self.delta_max,
            });
        }

        Ok(())
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), NeuraConfigErr> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(NeuraConfigErr::NonPositive { name, value })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NeuraUpdateRule {
    /// `w += learning_rate * g`
    Plain { learning_rate: f64 },
    Resilient(NeuraResilient),
}

impl NeuraUpdateRule {
    pub fn plain(learning_rate: f64) -> Result<Self, NeuraConfigErr> {
        let rule = Self::Plain { learning_rate };
        rule.validate()?;
        Ok(rule)
    }

    pub fn resilient(parameters: NeuraResilient) -> Result<Self, NeuraConfigErr> {
        let rule = Self::Resilient(parameters);
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), NeuraConfigErr> {
        match self {
            Self::Plain { learning_rate } => positive("learning_rate", *learning_rate),
            Self::Resilient(parameters) => parameters.validate(),
        }
    }

    /// RPROP relies on the sign of the gradient of a whole pass, so it can not update after every sample
    pub fn supports_online_mode(&self) -> bool {
        matches!(self, Self::Plain { .. })
    }

    pub fn create_state<F: Float>(&self, weight_count: usize) -> NeuraUpdateState<F> {
        match self {
            Self::Plain { .. } => NeuraUpdateState::Plain,
            Self::Resilient(parameters) => NeuraUpdateState::Resilient {
                previous: vec![F::zero(); weight_count],
                steps: vec![cast(parameters.delta_initial); weight_count],
            },
        }
    }

    /// Applies the rule to `weights`, given the accumulated `gradients`.
    /// Does not reset `gradients`, this is left to the caller.
    pub fn apply<F: Float>(&self, state: &mut NeuraUpdateState<F>, weights: &mut [F], gradients: &[F]) {
        assert_eq!(weights.len(), gradients.len());

        match self {
            Self::Plain { learning_rate } => {
                let learning_rate: F = cast(*learning_rate);

                for (weight, gradient) in weights.iter_mut().zip(gradients) {
                    *weight = *weight + learning_rate * *gradient;
                }
            }
            Self::Resilient(parameters) => {
                if !matches!(*state, NeuraUpdateState::Resilient { ref previous, .. } if previous.len() == weights.len())
                {
                    *state = self.create_state(weights.len());
                }

                if let NeuraUpdateState::Resilient { previous, steps } = state {
                    resilient_step(parameters, weights, gradients, previous, steps);
                }
            }
        }
    }
}

fn resilient_step<F: Float>(
    parameters: &NeuraResilient,
    weights: &mut [F],
    gradients: &[F],
    previous: &mut [F],
    steps: &mut [F],
) {
    let k_minus: F = cast(parameters.k_minus);
    let k_plus: F = cast(parameters.k_plus);
    let delta_min: F = cast(parameters.delta_min);
    let delta_max: F = cast(parameters.delta_max);

    for index in 0..weights.len() {
        // Gradient of the loss itself
        let gradient = -gradients[index];
        let change = gradient * previous[index];

        if change > F::zero() {
            steps[index] = steps[index] * k_plus;
        } else if change < F::zero() {
            steps[index] = steps[index] * k_minus;
        }
        steps[index] = steps[index].max(delta_min).min(delta_max);

        if gradient > F::zero() {
            weights[index] = weights[index] - steps[index];
        } else if gradient < F::zero() {
            weights[index] = weights[index] + steps[index];
        }

        previous[index] = gradient;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NeuraUpdateState<F> {
    Plain,
    Resilient {
        /// Sign-carrying gradient of the loss seen by the previous update
        previous: Vec<F>,
        steps: Vec<F>,
    },
}

impl<F> NeuraUpdateState<F> {
    pub fn steps(&self) -> Option<&[F]> {
        match self {
            Self::Plain => None,
            Self::Resilient { steps, .. } => Some(steps),
        }
    }
}
