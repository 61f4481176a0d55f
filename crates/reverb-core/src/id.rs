//! Strongly-typed identifiers and the [`FrequencyVec`] type alias.

use smallvec::SmallVec;
use std::fmt;

/// Identifies a sensor registered with the pair registry.
///
/// Sensor ids are assigned by the caller and must be stable for the
/// lifetime of the sensor. Pairs refer back to their sensors only through
/// these ids, never through pointers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorId(pub u32);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for SensorId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Ordered (source, receiver) key identifying one sensor pair.
///
/// The key is ordered: `(1, 2)` and `(2, 1)` are different pairs, because
/// the source side of a pair is the sensor that transmitted. A key whose
/// source equals its receiver names a monostatic pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    /// Sensor that transmits.
    pub source: SensorId,
    /// Sensor that receives.
    pub receiver: SensorId,
}

impl PairKey {
    /// Create a key from source and receiver ids.
    pub fn new(source: SensorId, receiver: SensorId) -> Self {
        Self { source, receiver }
    }

    /// Key for the monostatic pair of a single sensor.
    pub fn monostatic(sensor: SensorId) -> Self {
        Self::new(sensor, sensor)
    }

    /// True when source and receiver are different sensors.
    pub fn is_multistatic(&self) -> bool {
        self.source != self.receiver
    }

    /// True when `sensor` is either member of this key.
    pub fn contains(&self, sensor: SensorId) -> bool {
        self.source == sensor || self.receiver == sensor
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source, self.receiver)
    }
}

/// Monotonic counter bumped each time a snapshot slot is replaced.
///
/// `Generation(0)` means the slot has never been written. Consumers that
/// poll a pair can compare generations to detect a fresh install without
/// comparing payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Generation {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// A per-frequency vector of linear values.
///
/// Uses `SmallVec<[f64; 4]>` so that eigenrays and eigenverbs computed
/// for up to four frequencies carry their spectra inline. Wider spectra
/// spill to the heap transparently.
pub type FrequencyVec = SmallVec<[f64; 4]>;
