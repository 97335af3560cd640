mod backprop;
pub use backprop::NeuraBackprop;

mod error_neuron;
pub use error_neuron::NeuraErrorNeuron;
