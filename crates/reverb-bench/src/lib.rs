//! Benchmark profiles for the reverb envelope pipeline.
//!
//! Provides pre-built workloads for benchmarks:
//!
//! - [`reference_profile`]: one bottom plus one volume layer, 4 frequencies,
//!   3 azimuths, 2×2 beams, 100 source × 100 receiver eigenverbs per
//!   interface
//! - [`stress_profile`]: the same shape at 10x the receiver eigenverbs
//! - [`omni_generator`]: a generator matching a profile's configuration

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::Arc;

use reverb_core::{ConstantScattering, EigenverbCollection, OmniBeam};
use reverb_envelope::{EnvelopeConfig, EnvelopeGenerator};
use reverb_test_utils::fixtures::{random_collection, Scenario};

/// Transmit frequencies used by every profile (Hz).
pub const FREQUENCIES: [f64; 4] = [900.0, 1000.0, 1100.0, 1200.0];

/// Configuration and eigenverbs for one benchmark workload.
pub struct Profile {
    /// Envelope configuration the collections were generated for.
    pub config: EnvelopeConfig,
    /// Eigenverbs published by the source.
    pub source: EigenverbCollection,
    /// Eigenverbs published by the receiver.
    pub receiver: EigenverbCollection,
}

fn profile(seed: u64, per_source: usize, per_receiver: usize) -> Profile {
    let config = EnvelopeConfig {
        num_azimuths: 3,
        num_src_beams: 2,
        num_rcv_beams: 2,
        ..EnvelopeConfig::new(FREQUENCIES.to_vec())
    };
    let scenario = Scenario {
        num_azimuths: config.num_azimuths,
        ..Scenario::default()
    };
    Profile {
        source: random_collection(seed, &FREQUENCIES, 1, per_source, &scenario),
        receiver: random_collection(seed.wrapping_add(1), &FREQUENCIES, 1, per_receiver, &scenario),
        config,
    }
}

/// 100 × 100 eigenverbs on each of four interfaces (40K pairings).
pub fn reference_profile(seed: u64) -> Profile {
    profile(seed, 100, 100)
}

/// 100 × 1000 eigenverbs on each of four interfaces (400K pairings).
pub fn stress_profile(seed: u64) -> Profile {
    profile(seed, 100, 1000)
}

/// Generator with constant −30 dB scattering and omnidirectional beams
/// sized to `config`.
pub fn omni_generator(config: &EnvelopeConfig) -> EnvelopeGenerator {
    EnvelopeGenerator::new(
        config.clone(),
        Arc::new(ConstantScattering::from_db(-30.0)),
        Arc::new(OmniBeam {
            beams: config.num_src_beams,
        }),
        Arc::new(OmniBeam {
            beams: config.num_rcv_beams,
        }),
    )
    .expect("benchmark profile configuration is valid")
}
