#![allow(unused_variables)]

use serde::{Deserialize, Serialize};

use super::NeuraDerivable;
use crate::err::NeuraNetworkErr;

macro_rules! impl_derivable {
    ( $type_f32:ty, $type_f64:ty, $self:ident, $variable:ident, $eval:expr, $derivate:expr ) => {
        impl NeuraDerivable<f32> for $type_f32 {
            #[inline(always)]
            fn eval($self: &Self, $variable: f32) -> f32 {
                $eval
            }

            #[inline(always)]
            fn derivate($self: &Self, $variable: f32) -> f32 {
                $derivate
            }
        }

        impl NeuraDerivable<f64> for $type_f64 {
            #[inline(always)]
            fn eval($self: &Self, $variable: f64) -> f64 {
                $eval
            }

            #[inline(always)]
            fn derivate($self: &Self, $variable: f64) -> f64 {
                $derivate
            }
        }
    };

    ( $type:ty, $variable:ident, $eval:expr, $derivate:expr ) => {
        impl_derivable!($type, $type, self, $variable, $eval, $derivate);
    };
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tanh;

impl_derivable!(Tanh, x, x.tanh(), {
    let y = x.tanh();
    1.0 - y * y
});

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sigmoid;

impl_derivable!(Sigmoid, x, 1.0 / (1.0 + (-x).exp()), {
    let y = 1.0 / (1.0 + (-x).exp());
    y * (1.0 - y)
});

/// `f(x) = mult * x`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Linear<F>(pub F);

impl_derivable!(Linear<f32>, Linear<f64>, self, x, self.0 * x, self.0);

/// Transfer function of a layer, chosen at runtime.
///
/// Each variant has a stable numeric identifier and a list of numeric parameters,
/// so that it can be described to a compute backend as `(id, params)` and rebuilt there
/// with [`NeuraTransfer::from_parts`].
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeuraTransfer {
    #[default]
    Tanh,
    Sigmoid,
    Linear(f64),
}

impl NeuraTransfer {
    pub const TANH_ID: u32 = 1;
    pub const SIGMOID_ID: u32 = 2;
    pub const LINEAR_ID: u32 = 3;

    pub fn id(&self) -> u32 {
        match self {
            Self::Tanh => Self::TANH_ID,
            Self::Sigmoid => Self::SIGMOID_ID,
            Self::Linear(_) => Self::LINEAR_ID,
        }
    }

    pub fn params(&self) -> Vec<f64> {
        match *self {
            Self::Tanh | Self::Sigmoid => Vec::new(),
            Self::Linear(mult) => vec![mult],
        }
    }

    pub fn from_parts(id: u32, params: &[f64]) -> Result<Self, NeuraNetworkErr> {
        match (id, params) {
            (Self::TANH_ID, []) => Ok(Self::Tanh),
            (Self::SIGMOID_ID, []) => Ok(Self::Sigmoid),
            (Self::LINEAR_ID, [mult]) => Ok(Self::Linear(*mult)),
            _ => Err(NeuraNetworkErr::UnknownTransfer {
                id,
                params: params.len(),
            }),
        }
    }
}

macro_rules! impl_transfer {
    ( $( $float:ty ),* ) => {
        $(
            impl NeuraDerivable<$float> for NeuraTransfer {
                #[inline]
                fn eval(&self, x: $float) -> $float {
                    match *self {
                        Self::Tanh => Tanh.eval(x),
                        Self::Sigmoid => Sigmoid.eval(x),
                        Self::Linear(mult) => Linear(mult as $float).eval(x),
                    }
                }

                #[inline]
                fn derivate(&self, x: $float) -> $float {
                    match *self {
                        Self::Tanh => Tanh.derivate(x),
                        Self::Sigmoid => Sigmoid.derivate(x),
                        Self::Linear(mult) => Linear(mult as $float).derivate(x),
                    }
                }
            }
        )*
    };
}

impl_transfer!(f32, f64);
