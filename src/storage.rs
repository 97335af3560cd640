//! Persistence of network weights.
//!
//! The file format is the flat list of weights, in the canonical weight order,
//! each weight written as an 8-byte big-endian IEEE-754 double. There is no header.

use std::{
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::network::NeuraNetwork;

const WEIGHT_SIZE: usize = std::mem::size_of::<f64>();

pub trait NeuraWeightsStorage {
    /// Saves the weights of `network`, returns false if they could not be written
    fn store(&self, network: &dyn NeuraNetwork) -> bool;

    /// Overwrites the weights of `network` with the stored ones.
    /// Returns false, leaving `network` untouched, if the stored weights could not be read
    /// or do not match the network's weight count.
    fn load(&self, network: &mut dyn NeuraNetwork) -> bool;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeuraFileStorage {
    path: PathBuf,
}

impl NeuraFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, weights: &[f64]) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);
        writer.write_all(&encode_weights(weights))?;
        writer.flush()
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        let mut bytes = Vec::new();
        File::open(&self.path)?.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl NeuraWeightsStorage for NeuraFileStorage {
    fn store(&self, network: &dyn NeuraNetwork) -> bool {
        let weights = network.weights();

        match self.write(&weights) {
            Ok(()) => {
                debug!("Stored {} weights to {}", weights.len(), self.path.display());
                true
            }
            Err(err) => {
                warn!("Unable to store weights to {}: {}", self.path.display(), err);
                false
            }
        }
    }

    fn load(&self, network: &mut dyn NeuraNetwork) -> bool {
        let bytes = match self.read() {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Unable to read weights from {}: {}", self.path.display(), err);
                return false;
            }
        };

        let Some(weights) = decode_weights(&bytes, network.weight_count()) else {
            warn!(
                "{} holds {} bytes, expected {} weights ({} bytes)",
                self.path.display(),
                bytes.len(),
                network.weight_count(),
                network.weight_count() * WEIGHT_SIZE
            );
            return false;
        };

        match network.set_weights(&weights) {
            Ok(()) => {
                debug!("Loaded {} weights from {}", weights.len(), self.path.display());
                true
            }
            Err(err) => {
                warn!("Unable to load weights from {}: {}", self.path.display(), err);
                false
            }
        }
    }
}

pub fn encode_weights(weights: &[f64]) -> Vec<u8> {
    weights
        .iter()
        .flat_map(|weight| weight.to_be_bytes())
        .collect()
}

/// Returns `None` unless `bytes` holds exactly `count` weights
pub fn decode_weights(bytes: &[u8], count: usize) -> Option<Vec<f64>> {
    if bytes.len() != count * WEIGHT_SIZE {
        return None;
    }

    bytes
        .chunks_exact(WEIGHT_SIZE)
        .map(|chunk| chunk.try_into().ok().map(f64::from_be_bytes))
        .collect()
}
