//! Reverberation envelopes for one sensor pair.
//!
//! [`EnvelopeCollection`] owns one (frequency × time) intensity matrix per
//! (azimuth, source beam, receiver beam) cell, stored in a single
//! contiguous buffer. Contributions only ever add to it, so partial
//! collections computed independently can be merged in any order.

use std::sync::Arc;

use reverb_core::{Eigenverb, EnvelopeError};
use tracing::{trace, warn};

use crate::config::EnvelopeConfig;
use crate::metrics::EnvelopeMetrics;
use crate::model::{render, Contribution};

/// Smallest intensity reported by [`to_db`], to keep the log finite.
pub const MIN_INTENSITY: f64 = 1e-30;

/// Convert a linear intensity to dB for presentation.
pub fn to_db(intensity: f64) -> f64 {
    10.0 * intensity.max(MIN_INTENSITY).log10()
}

/// Read-only view of one (frequency × time) envelope matrix.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeView<'a> {
    data: &'a [f64],
    num_times: usize,
}

impl<'a> EnvelopeView<'a> {
    /// Number of frequency rows.
    pub fn num_frequencies(&self) -> usize {
        self.data.len() / self.num_times
    }

    /// Number of time columns.
    pub fn num_times(&self) -> usize {
        self.num_times
    }

    /// Time series for one frequency, or `None` if out of range.
    pub fn row(&self, freq: usize) -> Option<&'a [f64]> {
        let start = freq.checked_mul(self.num_times)?;
        self.data.get(start..start + self.num_times)
    }

    /// One intensity sample, or `None` if out of range.
    pub fn get(&self, freq: usize, time: usize) -> Option<f64> {
        if time >= self.num_times {
            return None;
        }
        self.row(freq).map(|r| r[time])
    }

    /// Iterate over the frequency rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &'a [f64]> {
        self.data.chunks_exact(self.num_times)
    }

    /// The whole matrix, frequency-major.
    pub fn as_slice(&self) -> &'a [f64] {
        self.data
    }
}

/// Envelope matrices for every (azimuth, source beam, receiver beam) cell
/// of one sensor pair.
///
/// Storage is one `Vec<f64>` of
/// `azimuths × src_beams × rcv_beams × frequencies × times` values; each
/// cell's matrix starts at a computed offset.
#[derive(Clone, Debug)]
pub struct EnvelopeCollection {
    config: Arc<EnvelopeConfig>,
    travel_time: Vec<f64>,
    data: Vec<f64>,
    metrics: EnvelopeMetrics,
}

impl EnvelopeCollection {
    /// Allocate a zeroed collection.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidConfig`] if `config` fails
    /// validation.
    pub fn new(config: impl Into<Arc<EnvelopeConfig>>) -> Result<Self, EnvelopeError> {
        let config = config.into();
        config.validate()?;
        let travel_time = (0..config.num_times)
            .map(|k| k as f64 * config.time_step)
            .collect();
        let len = config.num_azimuths
            * config.num_src_beams
            * config.num_rcv_beams
            * config.matrix_len();
        Ok(Self {
            config,
            travel_time,
            data: vec![0.0; len],
            metrics: EnvelopeMetrics::default(),
        })
    }

    /// Configuration this collection was built from.
    pub fn config(&self) -> &Arc<EnvelopeConfig> {
        &self.config
    }

    /// Transmit frequencies (Hz).
    pub fn transmit_freq(&self) -> &[f64] {
        &self.config.transmit_freq
    }

    /// Travel-time axis (s): `k * time_step` for each bin.
    pub fn travel_time(&self) -> &[f64] {
        &self.travel_time
    }

    /// Number of receiver azimuth bins.
    pub fn num_azimuths(&self) -> usize {
        self.config.num_azimuths
    }

    /// Number of source beams.
    pub fn num_src_beams(&self) -> usize {
        self.config.num_src_beams
    }

    /// Number of receiver beams.
    pub fn num_rcv_beams(&self) -> usize {
        self.config.num_rcv_beams
    }

    /// Number of transmit frequencies.
    pub fn num_frequencies(&self) -> usize {
        self.config.num_frequencies()
    }

    /// Number of time bins.
    pub fn num_times(&self) -> usize {
        self.config.num_times
    }

    /// Accumulation counters since construction or the last reset.
    pub fn metrics(&self) -> &EnvelopeMetrics {
        &self.metrics
    }

    fn offset(&self, azimuth: usize, src_beam: usize, rcv_beam: usize) -> Option<usize> {
        let c = &self.config;
        if azimuth >= c.num_azimuths || src_beam >= c.num_src_beams || rcv_beam >= c.num_rcv_beams
        {
            return None;
        }
        let cell = (azimuth * c.num_src_beams + src_beam) * c.num_rcv_beams + rcv_beam;
        Some(cell * c.matrix_len())
    }

    /// Envelope matrix for one cell, or `None` if any index is out of
    /// range.
    pub fn envelope(
        &self,
        azimuth: usize,
        src_beam: usize,
        rcv_beam: usize,
    ) -> Option<EnvelopeView<'_>> {
        let start = self.offset(azimuth, src_beam, rcv_beam)?;
        Some(EnvelopeView {
            data: &self.data[start..start + self.config.matrix_len()],
            num_times: self.config.num_times,
        })
    }

    /// Integrated energy of each frequency row of one cell: `Σ row · Δt`.
    pub fn total_energy(
        &self,
        azimuth: usize,
        src_beam: usize,
        rcv_beam: usize,
    ) -> Option<Vec<f64>> {
        let view = self.envelope(azimuth, src_beam, rcv_beam)?;
        Some(
            view.rows()
                .map(|row| row.iter().sum::<f64>() * self.config.time_step)
                .collect(),
        )
    }

    /// Compute and accumulate the contribution of one eigenverb pair into
    /// every (source beam, receiver beam) cell of `azimuth`.
    ///
    /// See [`Contribution::compute`] for the layout of `scatter`,
    /// `src_beam`, and `rcv_beam`. Frequencies whose energy does not
    /// exceed the threshold are skipped.
    ///
    /// # Errors
    ///
    /// Index, shape, and numeric errors leave the matrix untouched.
    /// Numeric rejections are also counted in [`metrics`](Self::metrics).
    pub fn add_contribution(
        &mut self,
        azimuth: usize,
        scatter: &[f64],
        src_beam: &[f64],
        rcv_beam: &[f64],
        src_verb: &Eigenverb,
        rcv_verb: &Eigenverb,
    ) -> Result<(), EnvelopeError> {
        match Contribution::compute(
            &self.config,
            azimuth,
            scatter,
            src_beam,
            rcv_beam,
            src_verb,
            rcv_verb,
        ) {
            Ok(contribution) => self.accumulate(&contribution),
            Err(err) => {
                self.record_rejection(&err);
                Err(err)
            }
        }
    }

    /// Render a precomputed contribution.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::IndexOutOfRange`] or
    /// [`EnvelopeError::ShapeMismatch`] if the contribution was computed
    /// for a differently shaped collection.
    pub fn accumulate(&mut self, contribution: &Contribution) -> Result<(), EnvelopeError> {
        let c = Arc::clone(&self.config);
        if contribution.num_src_beams != c.num_src_beams
            || contribution.num_rcv_beams != c.num_rcv_beams
            || contribution.num_freqs != c.num_frequencies()
        {
            return Err(EnvelopeError::ShapeMismatch {
                what: "contribution",
                expected: c.num_src_beams * c.num_rcv_beams * c.num_frequencies(),
                actual: contribution.num_src_beams
                    * contribution.num_rcv_beams
                    * contribution.num_freqs,
            });
        }
        if contribution.azimuth >= c.num_azimuths {
            return Err(EnvelopeError::IndexOutOfRange {
                what: "azimuth",
                index: contribution.azimuth,
                len: c.num_azimuths,
            });
        }

        let threshold = c.energy_threshold();
        let overlap = contribution.overlap;
        for s in 0..c.num_src_beams {
            for r in 0..c.num_rcv_beams {
                let Some(start) = self.offset(contribution.azimuth, s, r) else {
                    continue;
                };
                for (f, &energy) in contribution.cell(s, r).iter().enumerate() {
                    if energy <= threshold {
                        self.metrics.below_threshold += 1;
                        continue;
                    }
                    let row_start = start + f * c.num_times;
                    let row = &mut self.data[row_start..row_start + c.num_times];
                    let bins = render(
                        row,
                        energy,
                        overlap.delay,
                        overlap.duration,
                        c.time_step,
                        c.n_sigma,
                    );
                    trace!(
                        azimuth = contribution.azimuth,
                        src_beam = s,
                        rcv_beam = r,
                        freq = f,
                        energy,
                        delay = overlap.delay,
                        duration = overlap.duration,
                        bins,
                        "rendered contribution"
                    );
                    self.metrics.rendered += 1;
                    self.metrics.bins_written += bins as u64;
                }
            }
        }
        Ok(())
    }

    /// Count and log a contribution that could not be computed.
    ///
    /// Only numeric rejections are counted; shape and index errors are
    /// caller bugs and are returned without being recorded.
    pub fn record_rejection(&mut self, err: &EnvelopeError) {
        if err.is_numeric() {
            self.metrics.rejected += 1;
            warn!(error = %err, "rejected reverberation contribution");
        }
    }

    /// Add every cell of `other` into this collection.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ShapeMismatch`] if the two collections
    /// were not built from equivalent configurations.
    pub fn merge(&mut self, other: &EnvelopeCollection) -> Result<(), EnvelopeError> {
        if *self.config != *other.config {
            return Err(EnvelopeError::ShapeMismatch {
                what: "merged envelope collection",
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
        self.metrics.merge(&other.metrics);
        Ok(())
    }

    /// Zero every envelope and counter for a new reverberation cycle.
    pub fn reset(&mut self) {
        self.data.fill(0.0);
        self.metrics = EnvelopeMetrics::default();
    }
}
