//! Canonical in-memory particle state
//!
//! Both file formats are coerced into the same [Particle] struct, which acts
//! as the pivot between the PHITS dump record layout and MCPL particle
//! records. Units follow the MCPL conventions: centimetres, MeV, and
//! milliseconds.

// internal modules
use crate::utils::*;

// external crates
use serde::{Deserialize, Serialize};

/// A single particle state, common to both file formats
///
/// Instances are transient. Readers produce one per record and the writers
/// consume it immediately, so nothing here is ever cached between records.
///
/// | Field          | Unit           | Notes                                |
/// | -------------- | -------------- | ------------------------------------ |
/// | `pdgcode`      | -              | PDG particle number, 0 = no species  |
/// | `position`     | cm             |                                      |
/// | `direction`    | -              | unit vector, normalised upstream     |
/// | `polarisation` | -              | zero-filled when absent              |
/// | `ekin`         | MeV            | kinetic energy                       |
/// | `time`         | ms             | dump files store nanoseconds         |
/// | `weight`       | -              | statistical weight                   |
///
/// A `pdgcode` of 0 means the species could not be represented. These are
/// never written out by the converters, only counted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Particle {
    /// PDG particle number (0 = no valid species)
    pub pdgcode: i32,
    /// Position vector \[cm\]
    pub position: [f64; 3],
    /// Direction unit vector
    pub direction: [f64; 3],
    /// Polarisation vector, zeroed when the source has none
    pub polarisation: [f64; 3],
    /// Kinetic energy \[MeV\]
    pub ekin: f64,
    /// Time \[ms\]
    pub time: f64,
    /// Statistical weight
    pub weight: f64,
}

impl Default for Particle {
    fn default() -> Self {
        Self {
            pdgcode: 0,
            position: [0.0; 3],
            direction: [0.0; 3],
            polarisation: [0.0; 3],
            ekin: 0.0,
            time: 0.0,
            weight: 1.0,
        }
    }
}

impl std::fmt::Display for Particle {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{:>11} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            self.pdgcode,
            self.ekin.sci(5, 2),
            self.position[0].sci(5, 2),
            self.position[1].sci(5, 2),
            self.position[2].sci(5, 2),
            self.direction[0].sci(5, 2),
            self.direction[1].sci(5, 2),
            self.direction[2].sci(5, 2),
            self.time.sci(5, 2),
        )
    }
}
