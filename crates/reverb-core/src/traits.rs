//! Capability traits connecting sensors, pairs, and external collaborators.
//!
//! [`SensorListener`] is the contract a sensor pair offers to the sensors
//! that feed it. [`ScatteringModel`] and [`BeamPattern`] are implemented
//! outside this workspace by the ocean environment and the sensor beam
//! catalog; [`ConstantScattering`] and [`OmniBeam`] are minimal reference
//! implementations.

use std::sync::Arc;

use crate::eigenray::EigenrayList;
use crate::eigenverb::{Eigenverb, EigenverbCollection, Interface};
use crate::error::PairError;
use crate::id::SensorId;

/// Receives propagation results from the sensors of a pair.
///
/// # Contract
///
/// - Calls may arrive concurrently from different threads; implementors
///   must make each update visible atomically.
/// - A `sensor` that is not a member returns [`PairError::NotAMember`]
///   without side effects.
/// - The caller's data is never mutated.
///
/// # Object safety
///
/// This trait is object-safe; the registry can route through
/// `Arc<dyn SensorListener>`.
pub trait SensorListener: Send + Sync {
    /// Install the latest eigenrays computed by `sensor`.
    ///
    /// When `sensor` is the receiver of a bistatic pair, the stored copy
    /// has its source and target angles exchanged so that `source_*`
    /// always describes the transmitting end.
    fn update_fathometers(
        &self,
        sensor: SensorId,
        eigenrays: Arc<EigenrayList>,
    ) -> Result<(), PairError>;

    /// Install the latest eigenverbs computed by `sensor`.
    fn update_eigenverbs(
        &self,
        sensor: SensorId,
        collection: Arc<EigenverbCollection>,
    ) -> Result<(), PairError>;

    /// The other member of the pair.
    ///
    /// Returns `sensor` itself for a monostatic pair.
    fn sensor_complement(&self, sensor: SensorId) -> Result<SensorId, PairError>;
}

/// Interface scattering strength supplied by the ocean environment.
pub trait ScatteringModel: Send + Sync {
    /// Write the linear scattering strength at each of `frequencies` into
    /// `amplitude`, for energy arriving along `incident` and leaving along
    /// `scattered` at the receiver footprint's location.
    ///
    /// `amplitude` has the same length as `frequencies`.
    fn scattering(
        &self,
        interface: Interface,
        incident: &Eigenverb,
        scattered: &Eigenverb,
        frequencies: &[f64],
        amplitude: &mut [f64],
    );
}

/// Directional gain of one sensor's beams.
pub trait BeamPattern: Send + Sync {
    /// Number of beams this pattern forms.
    fn num_beams(&self) -> usize;

    /// Write the linear gain of `beam` toward (`de`, `az`) at each of
    /// `frequencies` into `level`. Angles are in radians.
    fn beam_level(&self, beam: usize, de: f64, az: f64, frequencies: &[f64], level: &mut [f64]);
}

/// Frequency- and angle-independent scattering strength.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantScattering {
    /// Linear scattering strength applied on every interface.
    pub strength: f64,
}

impl ConstantScattering {
    /// Scattering strength from a level in dB.
    pub fn from_db(level: f64) -> Self {
        Self {
            strength: 10f64.powf(level / 10.0),
        }
    }
}

impl ScatteringModel for ConstantScattering {
    fn scattering(
        &self,
        _interface: Interface,
        _incident: &Eigenverb,
        _scattered: &Eigenverb,
        _frequencies: &[f64],
        amplitude: &mut [f64],
    ) {
        amplitude.fill(self.strength);
    }
}

/// Unit gain in every direction for a fixed number of beams.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OmniBeam {
    /// Number of beams reported by [`BeamPattern::num_beams`].
    pub beams: usize,
}

impl Default for OmniBeam {
    fn default() -> Self {
        Self { beams: 1 }
    }
}

impl BeamPattern for OmniBeam {
    fn num_beams(&self) -> usize {
        self.beams
    }

    fn beam_level(&self, _beam: usize, _de: f64, _az: f64, _frequencies: &[f64], level: &mut [f64]) {
        level.fill(1.0);
    }
}
