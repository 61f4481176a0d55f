//! Test utilities and mock collaborators for reverb development.
//!
//! Provides an [`EigenverbBuilder`] with sensible defaults, an eigenray
//! constructor, and a [`CountingScattering`] mock that records how often
//! the generator consults the ocean model. Seeded random scenarios live in
//! [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::sync::atomic::{AtomicUsize, Ordering};

use reverb_core::{
    Eigenray, Eigenverb, FrequencyVec, Interface, Position, ScatteringModel,
};
use smallvec::smallvec;

/// Builder for eigenverbs with a 100 m × 50 m bottom footprint at the
/// origin, unit power at one frequency, and a 2 s one-way travel time.
#[derive(Clone, Debug)]
pub struct EigenverbBuilder {
    verb: Eigenverb,
}

impl EigenverbBuilder {
    pub fn new() -> Self {
        Self {
            verb: Eigenverb {
                time: 2.0,
                power: smallvec![1.0],
                length: 100.0,
                width: 50.0,
                position: Position::new(0.0, 0.0, -100.0),
                direction: 0.0,
                grazing: 0.3,
                sound_speed: 1500.0,
                de_index: 0,
                az_index: 0,
                source_de: -0.3,
                source_az: 0.0,
                surface: 0,
                bottom: 1,
                caustic: 0,
                upper: 0,
                lower: 0,
            },
        }
    }

    pub fn time(mut self, time: f64) -> Self {
        self.verb.time = time;
        self
    }

    /// Per-frequency power; the length sets the number of frequencies.
    pub fn power(mut self, power: &[f64]) -> Self {
        self.verb.power = FrequencyVec::from_slice(power);
        self
    }

    pub fn footprint(mut self, length: f64, width: f64) -> Self {
        self.verb.length = length;
        self.verb.width = width;
        self
    }

    pub fn position(mut self, east: f64, north: f64) -> Self {
        self.verb.position.east = east;
        self.verb.position.north = north;
        self
    }

    pub fn direction(mut self, direction: f64) -> Self {
        self.verb.direction = direction;
        self
    }

    pub fn grazing(mut self, grazing: f64) -> Self {
        self.verb.grazing = grazing;
        self
    }

    pub fn sound_speed(mut self, sound_speed: f64) -> Self {
        self.verb.sound_speed = sound_speed;
        self
    }

    pub fn beam(mut self, de_index: usize, az_index: usize) -> Self {
        self.verb.de_index = de_index;
        self.verb.az_index = az_index;
        self
    }

    pub fn build(self) -> Eigenverb {
        self.verb
    }
}

impl Default for EigenverbBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An eigenray with distinct source and target angles so that swaps are
/// observable.
pub fn eigenray(time: f64, num_freqs: usize) -> Eigenray {
    Eigenray {
        time,
        intensity: FrequencyVec::from_elem(60.0, num_freqs),
        phase: FrequencyVec::from_elem(0.0, num_freqs),
        source_de: 12.0,
        source_az: 30.0,
        target_de: -8.0,
        target_az: 210.0,
        surface: 1,
        bottom: 0,
        caustic: 0,
        upper: 0,
        lower: 1,
    }
}

/// Constant scattering strength that counts how many times it was called.
#[derive(Debug)]
pub struct CountingScattering {
    pub strength: f64,
    calls: AtomicUsize,
}

impl CountingScattering {
    pub fn new(strength: f64) -> Self {
        Self {
            strength,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `scattering()` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl ScatteringModel for CountingScattering {
    fn scattering(
        &self,
        _interface: Interface,
        _incident: &Eigenverb,
        _scattered: &Eigenverb,
        _frequencies: &[f64],
        amplitude: &mut [f64],
    ) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        amplitude.fill(self.strength);
    }
}
