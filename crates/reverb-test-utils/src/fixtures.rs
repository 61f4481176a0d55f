//! Deterministic random scenarios.
//!
//! Every generator takes an explicit seed and uses a ChaCha8 RNG, so a
//! failing test can be reproduced from its seed alone.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use reverb_core::{Eigenverb, EigenverbCollection, FrequencyVec, Interface, Position};

/// Bounds for randomly generated eigenverbs.
#[derive(Clone, Debug)]
pub struct Scenario {
    /// Footprint centres fall within `±extent` metres east and north.
    pub extent: f64,
    /// Footprint lengths and widths fall within this range (m).
    pub footprint: (f64, f64),
    /// One-way travel times fall within this range (s).
    pub time: (f64, f64),
    /// Number of receiver azimuth bins for `az_index`.
    pub num_azimuths: usize,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            extent: 2000.0,
            footprint: (50.0, 500.0),
            time: (1.0, 8.0),
            num_azimuths: 1,
        }
    }
}

/// One random eigenverb with `num_freqs` power values.
pub fn random_eigenverb(rng: &mut ChaCha8Rng, scenario: &Scenario, num_freqs: usize) -> Eigenverb {
    let (lo, hi) = scenario.footprint;
    let length = rng.random_range(lo..hi);
    let width = rng.random_range(lo..=length);
    let power: FrequencyVec = (0..num_freqs)
        .map(|_| rng.random_range(1e-6..1e-2))
        .collect();
    Eigenverb {
        time: rng.random_range(scenario.time.0..scenario.time.1),
        power,
        length,
        width,
        position: Position::new(
            rng.random_range(-scenario.extent..scenario.extent),
            rng.random_range(-scenario.extent..scenario.extent),
            -rng.random_range(10.0..3000.0),
        ),
        direction: rng.random_range(0.0..std::f64::consts::TAU),
        grazing: rng.random_range(0.05..1.5),
        sound_speed: rng.random_range(1480.0..1540.0),
        de_index: rng.random_range(0..10),
        az_index: rng.random_range(0..scenario.num_azimuths),
        source_de: -rng.random::<f64>(),
        source_az: rng.random_range(0.0..std::f64::consts::TAU),
        surface: 0,
        bottom: 1,
        caustic: 0,
        upper: 0,
        lower: 0,
    }
}

/// `count` random eigenverbs from a fixed seed.
pub fn random_eigenverbs(seed: u64, count: usize, num_freqs: usize) -> Vec<Eigenverb> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let scenario = Scenario::default();
    (0..count)
        .map(|_| random_eigenverb(&mut rng, &scenario, num_freqs))
        .collect()
}

/// A collection with `per_interface` random eigenverbs on every
/// interface.
pub fn random_collection(
    seed: u64,
    frequencies: &[f64],
    num_volumes: usize,
    per_interface: usize,
    scenario: &Scenario,
) -> EigenverbCollection {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut collection = EigenverbCollection::new(frequencies.to_vec(), num_volumes);
    for index in 0..collection.num_interfaces() {
        for _ in 0..per_interface {
            let verb = random_eigenverb(&mut rng, scenario, frequencies.len());
            // Power length and interface both come from the collection.
            let _ = collection.add_eigenverb(verb, Interface::from_index(index));
        }
    }
    collection
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_eigenverbs() {
        assert_eq!(random_eigenverbs(7, 5, 2), random_eigenverbs(7, 5, 2));
        assert_ne!(random_eigenverbs(7, 5, 2), random_eigenverbs(8, 5, 2));
    }

    #[test]
    fn random_collection_fills_every_interface() {
        let c = random_collection(1, &[1000.0, 2000.0], 1, 3, &Scenario::default());
        assert_eq!(c.num_interfaces(), 4);
        assert_eq!(c.len(), 12);
        for verb in c.eigenverbs(2) {
            assert_eq!(verb.power.len(), 2);
            assert!(verb.width <= verb.length);
        }
    }
}
