//! Registry-wide reverberation configuration.
//!
//! [`ReverbConfig`] carries the envelope parameters shared by every pair
//! the registry builds. Per-pair shape (frequencies, beam counts) comes
//! from the sensors themselves; see
//! [`envelope_config()`](ReverbConfig::envelope_config).

use std::error::Error;
use std::fmt;

use reverb_envelope::config::{
    db_to_linear, DEFAULT_N_SIGMA, DEFAULT_PULSE_LENGTH, DEFAULT_THRESHOLD_DB,
    DEFAULT_TIME_MAXIMUM, DEFAULT_TIME_STEP,
};
use reverb_envelope::EnvelopeConfig;

use crate::registry::SensorSpec;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`ReverbConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `pulse_length` is NaN, infinite, zero, or negative.
    InvalidPulseLength {
        /// The invalid value.
        value: f64,
    },
    /// `time_step` is NaN, infinite, zero, or negative.
    InvalidTimeStep {
        /// The invalid value.
        value: f64,
    },
    /// `time_step` exceeds half the pulse length, so a pulse spans fewer
    /// than two samples.
    CoarseTimeStep {
        /// The configured sampling period (s).
        time_step: f64,
        /// The configured pulse length (s).
        pulse_length: f64,
    },
    /// `time_maximum` is not finite or shorter than one time step.
    InvalidTimeMaximum {
        /// The invalid value.
        value: f64,
    },
    /// `threshold_db` is NaN or +∞.
    InvalidThreshold {
        /// The invalid value.
        value: f64,
    },
    /// `n_sigma` is NaN, infinite, zero, or negative.
    InvalidTruncation {
        /// The invalid value.
        value: f64,
    },
    /// `num_azimuths` is zero.
    NoAzimuths,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPulseLength { value } => {
                write!(f, "pulse_length must be finite and positive, got {value}")
            }
            Self::InvalidTimeStep { value } => {
                write!(f, "time_step must be finite and positive, got {value}")
            }
            Self::CoarseTimeStep {
                time_step,
                pulse_length,
            } => write!(
                f,
                "time_step {time_step} must not exceed half the pulse_length {pulse_length}"
            ),
            Self::InvalidTimeMaximum { value } => {
                write!(f, "time_maximum must be finite and at least one time step, got {value}")
            }
            Self::InvalidThreshold { value } => {
                write!(f, "threshold_db must be a number below +inf, got {value}")
            }
            Self::InvalidTruncation { value } => {
                write!(f, "n_sigma must be finite and positive, got {value}")
            }
            Self::NoAzimuths => write!(f, "num_azimuths must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

// ── ReverbConfig ───────────────────────────────────────────────────

/// Envelope parameters shared by every pair in a registry.
#[derive(Clone, Debug, PartialEq)]
pub struct ReverbConfig {
    /// Pulse length of the transmitted signal (s). Default: 1.0.
    pub pulse_length: f64,
    /// Duration of each reverberation envelope (s). Default: 40.
    pub time_maximum: f64,
    /// Sampling period of each envelope (s). Default: 0.1.
    pub time_step: f64,
    /// Minimum intensity for a contribution to be rendered (dB).
    /// Default: −300. `-inf` renders every positive contribution.
    pub threshold_db: f64,
    /// Number of receiver azimuth bins. Default: 1.
    pub num_azimuths: usize,
    /// Gaussian truncation width in standard deviations. Default: 6.
    pub n_sigma: f64,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        Self {
            pulse_length: DEFAULT_PULSE_LENGTH,
            time_maximum: DEFAULT_TIME_MAXIMUM,
            time_step: DEFAULT_TIME_STEP,
            threshold_db: DEFAULT_THRESHOLD_DB,
            num_azimuths: 1,
            n_sigma: DEFAULT_N_SIGMA,
        }
    }
}

impl ReverbConfig {
    /// Validate all numeric invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 1. Pulse length.
        if !self.pulse_length.is_finite() || self.pulse_length <= 0.0 {
            return Err(ConfigError::InvalidPulseLength {
                value: self.pulse_length,
            });
        }
        // 2. Time step.
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ConfigError::InvalidTimeStep {
                value: self.time_step,
            });
        }
        // 3. At least two samples per pulse length.
        if self.time_step > 0.5 * self.pulse_length {
            return Err(ConfigError::CoarseTimeStep {
                time_step: self.time_step,
                pulse_length: self.pulse_length,
            });
        }
        // 4. Envelope duration covers at least one bin.
        if !self.time_maximum.is_finite() || self.time_maximum < self.time_step {
            return Err(ConfigError::InvalidTimeMaximum {
                value: self.time_maximum,
            });
        }
        // 5. Threshold: -inf is allowed (linear zero).
        if self.threshold_db.is_nan() || self.threshold_db == f64::INFINITY {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold_db,
            });
        }
        // 6. Truncation width.
        if !self.n_sigma.is_finite() || self.n_sigma <= 0.0 {
            return Err(ConfigError::InvalidTruncation {
                value: self.n_sigma,
            });
        }
        // 7. Azimuth bins.
        if self.num_azimuths == 0 {
            return Err(ConfigError::NoAzimuths);
        }
        Ok(())
    }

    /// Number of samples in each envelope.
    pub fn num_times(&self) -> usize {
        (self.time_maximum / self.time_step).ceil() as usize
    }

    /// Envelope configuration for a pair: transmit frequencies and source
    /// beams from `source`, receiver beams from `receiver`.
    pub fn envelope_config(&self, source: &SensorSpec, receiver: &SensorSpec) -> EnvelopeConfig {
        EnvelopeConfig {
            transmit_freq: source.transmit_freq.clone(),
            num_times: self.num_times(),
            time_step: self.time_step,
            pulse_length: self.pulse_length,
            threshold: db_to_linear(self.threshold_db),
            num_azimuths: self.num_azimuths,
            num_src_beams: source.source_beams,
            num_rcv_beams: receiver.receiver_beams,
            n_sigma: self.n_sigma,
        }
    }
}
