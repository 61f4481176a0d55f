//! Envelope collection configuration and validation.

use reverb_core::EnvelopeError;

/// Default pulse length of the transmitted signal (s).
pub const DEFAULT_PULSE_LENGTH: f64 = 1.0;
/// Default duration of the reverberation envelope (s).
pub const DEFAULT_TIME_MAXIMUM: f64 = 40.0;
/// Default sampling period of the reverberation envelope (s).
pub const DEFAULT_TIME_STEP: f64 = 0.1;
/// Default minimum intensity for a contribution to be rendered (dB).
pub const DEFAULT_THRESHOLD_DB: f64 = -300.0;
/// Default Gaussian truncation width, in standard deviations.
pub const DEFAULT_N_SIGMA: f64 = 6.0;

/// Convert a level in dB to a linear ratio.
pub fn db_to_linear(level: f64) -> f64 {
    10f64.powf(level / 10.0)
}

/// Shape and rendering parameters for one pair's envelope collection.
///
/// Dimensions are fixed for the lifetime of the collection. Call
/// [`validate()`](Self::validate) before constructing a collection;
/// [`EnvelopeCollection::new`](crate::EnvelopeCollection::new) does so.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeConfig {
    /// Transmit frequencies (Hz), strictly increasing.
    pub transmit_freq: Vec<f64>,
    /// Number of samples in each envelope time series.
    pub num_times: usize,
    /// Sampling period of the travel-time axis (s). Default: 0.1.
    pub time_step: f64,
    /// Pulse length of the transmitted signal (s). Default: 1.0.
    pub pulse_length: f64,
    /// Minimum linear intensity for a contribution to be rendered.
    /// Default: −300 dB.
    pub threshold: f64,
    /// Number of receiver azimuth bins.
    pub num_azimuths: usize,
    /// Number of source beams.
    pub num_src_beams: usize,
    /// Number of receiver beams.
    pub num_rcv_beams: usize,
    /// Half-width of each rendered Gaussian, in standard deviations.
    /// Default: 6.
    pub n_sigma: f64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            transmit_freq: vec![1000.0],
            num_times: (DEFAULT_TIME_MAXIMUM / DEFAULT_TIME_STEP).ceil() as usize,
            time_step: DEFAULT_TIME_STEP,
            pulse_length: DEFAULT_PULSE_LENGTH,
            threshold: db_to_linear(DEFAULT_THRESHOLD_DB),
            num_azimuths: 1,
            num_src_beams: 1,
            num_rcv_beams: 1,
            n_sigma: DEFAULT_N_SIGMA,
        }
    }
}

impl EnvelopeConfig {
    /// Default configuration for the given transmit frequencies.
    pub fn new(transmit_freq: Vec<f64>) -> Self {
        Self {
            transmit_freq,
            ..Self::default()
        }
    }

    /// Set `num_times` to cover `time_maximum` seconds at the current
    /// time step.
    pub fn with_time_maximum(mut self, time_maximum: f64) -> Self {
        self.num_times = (time_maximum / self.time_step).ceil() as usize;
        self
    }

    /// Number of transmit frequencies.
    pub fn num_frequencies(&self) -> usize {
        self.transmit_freq.len()
    }

    /// Minimum energy for a contribution to be rendered: the intensity
    /// threshold integrated over one pulse.
    pub fn energy_threshold(&self) -> f64 {
        self.threshold * self.pulse_length
    }

    /// Number of values in one (frequency × time) envelope matrix.
    pub fn matrix_len(&self) -> usize {
        self.transmit_freq.len() * self.num_times
    }

    /// Validate all shape and numeric invariants.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        let invalid = |reason: String| Err(EnvelopeError::InvalidConfig { reason });

        // 1. At least one frequency.
        if self.transmit_freq.is_empty() {
            return invalid("transmit_freq must not be empty".to_string());
        }
        // 2. Frequencies finite, positive, strictly increasing.
        for (i, &f) in self.transmit_freq.iter().enumerate() {
            if !f.is_finite() || f <= 0.0 {
                return invalid(format!("transmit_freq[{i}] must be finite and positive, got {f}"));
            }
            if i > 0 && f <= self.transmit_freq[i - 1] {
                return invalid(format!("transmit_freq must be strictly increasing at index {i}"));
            }
        }
        // 3. At least one time bin.
        if self.num_times == 0 {
            return invalid("num_times must be at least 1".to_string());
        }
        // 4. Time step and pulse length finite and positive.
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return invalid(format!(
                "time_step must be finite and positive, got {}",
                self.time_step
            ));
        }
        if !self.pulse_length.is_finite() || self.pulse_length <= 0.0 {
            return invalid(format!(
                "pulse_length must be finite and positive, got {}",
                self.pulse_length
            ));
        }
        // 5. At least two samples per pulse length.
        if self.time_step > 0.5 * self.pulse_length {
            return invalid(format!(
                "time_step {} must not exceed half the pulse_length {}",
                self.time_step, self.pulse_length
            ));
        }
        // 6. Threshold finite and non-negative.
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return invalid(format!(
                "threshold must be finite and non-negative, got {}",
                self.threshold
            ));
        }
        // 7. Every index dimension non-empty.
        for (name, n) in [
            ("num_azimuths", self.num_azimuths),
            ("num_src_beams", self.num_src_beams),
            ("num_rcv_beams", self.num_rcv_beams),
        ] {
            if n == 0 {
                return invalid(format!("{name} must be at least 1"));
            }
        }
        // 8. Truncation width finite and positive.
        if !self.n_sigma.is_finite() || self.n_sigma <= 0.0 {
            return invalid(format!(
                "n_sigma must be finite and positive, got {}",
                self.n_sigma
            ));
        }
        // 9. Total storage must be addressable.
        let total = [
            self.num_azimuths,
            self.num_src_beams,
            self.num_rcv_beams,
            self.transmit_freq.len(),
            self.num_times,
        ]
        .iter()
        .try_fold(1usize, |acc, &n| acc.checked_mul(n));
        if total.is_none() {
            return invalid("envelope storage size overflows usize".to_string());
        }
        Ok(())
    }
}
