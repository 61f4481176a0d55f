//! Error types for the reverb sensor-pair framework.
//!
//! Organized by subsystem: pair protocol violations and envelope
//! accumulation. Registry and configuration errors live with the registry
//! in `reverb-sensors`, which wraps these.

use std::error::Error;
use std::fmt;

use crate::id::{PairKey, SensorId};

/// Errors from the sensor-pair listener protocol.
#[derive(Clone, Debug, PartialEq)]
pub enum PairError {
    /// A notification or query named a sensor that is neither the source
    /// nor the receiver of the pair.
    NotAMember {
        /// The unrecognised sensor.
        sensor: SensorId,
        /// The pair that received the call.
        pair: PairKey,
    },
    /// An envelope cycle was requested before both sides published
    /// eigenverbs.
    MissingEigenverbs {
        /// The pair that was asked to compute.
        pair: PairKey,
    },
    /// Envelope accumulation failed.
    Envelope(EnvelopeError),
}

impl fmt::Display for PairError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAMember { sensor, pair } => {
                write!(f, "sensor {sensor} is not a member of pair {pair}")
            }
            Self::MissingEigenverbs { pair } => {
                write!(f, "pair {pair} has not received eigenverbs from both sensors")
            }
            Self::Envelope(e) => write!(f, "envelope error: {e}"),
        }
    }
}

impl Error for PairError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Envelope(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EnvelopeError> for PairError {
    fn from(e: EnvelopeError) -> Self {
        Self::Envelope(e)
    }
}

/// Errors from envelope configuration, accumulation, and generation.
///
/// The numeric variants (`InvalidFootprint`, `InvalidDuration`,
/// `InvalidDelay`, `InvalidEnergy`) reject a single contribution; the
/// envelope matrix is never written when one is returned.
#[derive(Clone, Debug, PartialEq)]
pub enum EnvelopeError {
    /// An envelope configuration value is out of range.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
    /// An azimuth, beam, or interface index is outside its dimension.
    IndexOutOfRange {
        /// Name of the dimension.
        what: &'static str,
        /// The offending index.
        index: usize,
        /// Size of the dimension.
        len: usize,
    },
    /// A per-frequency or per-beam input has the wrong length.
    ShapeMismatch {
        /// Name of the input.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// A footprint length or width is not a positive finite number.
    InvalidFootprint {
        /// The offending extent (m).
        value: f64,
    },
    /// The computed duration is not a positive finite number.
    InvalidDuration {
        /// The computed duration (s).
        value: f64,
    },
    /// The two-way travel time is not finite.
    InvalidDelay {
        /// The computed delay (s).
        value: f64,
    },
    /// The computed energy or overlap determinant is negative or not
    /// finite.
    InvalidEnergy {
        /// The offending value.
        value: f64,
    },
    /// A generator worker thread terminated without returning a result.
    WorkerFailed {
        /// Index of the worker.
        worker: usize,
    },
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid envelope config: {reason}"),
            Self::IndexOutOfRange { what, index, len } => {
                write!(f, "{what} index {index} out of range (len {len})")
            }
            Self::ShapeMismatch {
                what,
                expected,
                actual,
            } => write!(f, "{what} has length {actual}, expected {expected}"),
            Self::InvalidFootprint { value } => {
                write!(f, "footprint extent {value} is not positive and finite")
            }
            Self::InvalidDuration { value } => {
                write!(f, "envelope duration {value} is not positive and finite")
            }
            Self::InvalidDelay { value } => write!(f, "envelope delay {value} is not finite"),
            Self::InvalidEnergy { value } => {
                write!(f, "envelope energy {value} is negative or not finite")
            }
            Self::WorkerFailed { worker } => write!(f, "envelope worker {worker} failed"),
        }
    }
}

impl EnvelopeError {
    /// True for errors that reject a single contribution on numeric
    /// grounds, as opposed to configuration or shape errors that affect
    /// every contribution.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::InvalidFootprint { .. }
                | Self::InvalidDuration { .. }
                | Self::InvalidDelay { .. }
                | Self::InvalidEnergy { .. }
        )
    }
}

impl Error for EnvelopeError {}
