//! Analytic overlap of two Gaussian eigenverb footprints.
//!
//! A source eigenverb and a receiver eigenverb on the same interface are
//! both elliptical Gaussians. Their product integrates in closed form to an
//! overlap gain, and the spread of the product along the receiver's length
//! axis lengthens the returned pulse. This module computes that geometry
//! once per eigenverb pair ([`overlap`]), scales it per frequency and beam
//! ([`Contribution::compute`]), and renders the resulting Gaussian pulse
//! into a time series ([`render`]).
//!
//! Geometry is evaluated in the receiver footprint frame: `x` along the
//! receiver length axis, `y` along its width axis. With `α` the source
//! direction relative to the receiver direction,
//!
//! ```text
//! Σr = diag(Lr², Wr²)
//! Σs = R(α) diag(Ls², Ws²) R(α)ᵀ
//! G  = 2π Ls Ws Lr Wr / sqrt(det(Σs + Σr)) · exp(−½ dᵀ (Σs + Σr)⁻¹ d)
//! Σp = (Σs⁻¹ + Σr⁻¹)⁻¹
//! σ  = ½ sqrt(T² + (cos θr / cr)² Σp_xx)
//! ```

use std::f64::consts::PI;

use reverb_core::{Eigenverb, EnvelopeError};

use crate::config::EnvelopeConfig;

/// Frequency-independent result of overlapping two footprints.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Overlap {
    /// Integral of the product of the two unit-peak footprints (m²).
    pub gain: f64,
    /// Standard deviation of the returned pulse (s).
    pub duration: f64,
    /// Two-way travel time at the pulse peak (s).
    pub delay: f64,
}

fn check_extent(value: f64) -> Result<f64, EnvelopeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(EnvelopeError::InvalidFootprint { value })
    }
}

/// Overlap gain, duration, and delay for one eigenverb pair.
///
/// # Errors
///
/// - [`EnvelopeError::InvalidFootprint`] if any length or width is not a
///   positive finite number.
/// - [`EnvelopeError::InvalidEnergy`] if the combined covariance
///   determinant or the gain is not positive and finite.
/// - [`EnvelopeError::InvalidDuration`] if the pulse duration is not
///   positive and finite.
/// - [`EnvelopeError::InvalidDelay`] if the summed travel time is not
///   finite.
pub fn overlap(
    src: &Eigenverb,
    rcv: &Eigenverb,
    pulse_length: f64,
) -> Result<Overlap, EnvelopeError> {
    let ls = check_extent(src.length)?;
    let ws = check_extent(src.width)?;
    let lr = check_extent(rcv.length)?;
    let wr = check_extent(rcv.width)?;
    let (ls2, ws2, lr2, wr2) = (src.length2(), src.width2(), rcv.length2(), rcv.width2());

    // Separation in the receiver frame.
    let (de, dn) = src.position.offset_from(&rcv.position);
    let (sin_r, cos_r) = rcv.direction.sin_cos();
    let xs = de * sin_r + dn * cos_r;
    let ys = de * cos_r - dn * sin_r;

    let alpha = src.direction - rcv.direction;
    let (sin2a, cos2a) = (2.0 * alpha).sin_cos();

    // Σs + Σr
    let sum_s = ls2 + ws2;
    let diff_s = ls2 - ws2;
    let m11 = 0.5 * (sum_s + diff_s * cos2a) + lr2;
    let m22 = 0.5 * (sum_s - diff_s * cos2a) + wr2;
    let m12 = 0.5 * diff_s * sin2a;
    let det_sr = m11 * m22 - m12 * m12;
    if !det_sr.is_finite() || det_sr <= 0.0 {
        return Err(EnvelopeError::InvalidEnergy { value: det_sr });
    }

    let q = (m22 * xs * xs + m11 * ys * ys - 2.0 * m12 * xs * ys) / det_sr;
    let area = ls * ws * lr * wr;
    let gain = 2.0 * PI * area / det_sr.sqrt() * (-0.5 * q).exp();
    if !gain.is_finite() || gain < 0.0 {
        return Err(EnvelopeError::InvalidEnergy { value: gain });
    }

    // (Σs⁻¹ + Σr⁻¹)⁻¹ along x
    let inv_sum = 1.0 / ls2 + 1.0 / ws2;
    let inv_diff = 1.0 / ls2 - 1.0 / ws2;
    let n22 = 0.5 * (inv_sum - inv_diff * cos2a) + 1.0 / wr2;
    let spread_xx = n22 * (area * area) / det_sr;

    let k = rcv.grazing.cos() / rcv.sound_speed;
    let duration = 0.5 * (pulse_length * pulse_length + k * k * spread_xx).sqrt();
    if !duration.is_finite() || duration <= 0.0 {
        return Err(EnvelopeError::InvalidDuration { value: duration });
    }

    let delay = src.time + rcv.time;
    if !delay.is_finite() {
        return Err(EnvelopeError::InvalidDelay { value: delay });
    }

    Ok(Overlap {
        gain,
        duration,
        delay,
    })
}

/// Add a Gaussian pulse of total `energy` centred at `delay` to `row`.
///
/// `row[k]` samples travel time `k * time_step`. Only bins within
/// `n_sigma` standard deviations of the peak are written. Returns the
/// number of bins written.
pub fn render(
    row: &mut [f64],
    energy: f64,
    delay: f64,
    duration: f64,
    time_step: f64,
    n_sigma: f64,
) -> usize {
    debug_assert!(delay.is_finite(), "render delay must be finite");
    if row.is_empty() {
        return 0;
    }
    let first = ((delay - n_sigma * duration) / time_step).ceil();
    let last = ((delay + n_sigma * duration) / time_step).floor();
    if last < 0.0 || first > (row.len() - 1) as f64 {
        return 0;
    }
    let first = first.max(0.0) as usize;
    let last = (last as usize).min(row.len() - 1);

    let peak = energy / (duration * (2.0 * PI).sqrt());
    for (k, value) in row.iter_mut().enumerate().take(last + 1).skip(first) {
        let z = (k as f64 * time_step - delay) / duration;
        *value += peak * (-0.5 * z * z).exp();
    }
    last + 1 - first
}

/// Energies for every (source beam, receiver beam, frequency) of one
/// eigenverb pair, ready to be rendered into an envelope collection.
///
/// Computing a contribution needs only the configuration, so callers that
/// share a collection behind a lock can build it before taking the lock.
#[derive(Clone, Debug, PartialEq)]
pub struct Contribution {
    pub(crate) azimuth: usize,
    pub(crate) overlap: Overlap,
    pub(crate) num_src_beams: usize,
    pub(crate) num_rcv_beams: usize,
    pub(crate) num_freqs: usize,
    energy: Vec<f64>,
}

fn check_len(what: &'static str, expected: usize, actual: usize) -> Result<(), EnvelopeError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EnvelopeError::ShapeMismatch {
            what,
            expected,
            actual,
        })
    }
}

impl Contribution {
    /// Compute the contribution of one eigenverb pair.
    ///
    /// `scatter` holds one linear scattering strength per frequency.
    /// `src_beam` and `rcv_beam` are frequency-major gain matrices:
    /// `src_beam[f * num_src_beams + s]` is the gain of source beam `s` at
    /// frequency `f`. The effective scattering for cell `(s, r)` is
    /// `scatter[f] * src_beam[f][s] * rcv_beam[f][r]`.
    ///
    /// # Errors
    ///
    /// Index and length mismatches against `config`, plus the numeric
    /// errors of [`overlap`]. A negative or non-finite energy for any cell
    /// returns [`EnvelopeError::InvalidEnergy`].
    pub fn compute(
        config: &EnvelopeConfig,
        azimuth: usize,
        scatter: &[f64],
        src_beam: &[f64],
        rcv_beam: &[f64],
        src_verb: &Eigenverb,
        rcv_verb: &Eigenverb,
    ) -> Result<Self, EnvelopeError> {
        let nf = config.num_frequencies();
        let ns = config.num_src_beams;
        let nr = config.num_rcv_beams;
        if azimuth >= config.num_azimuths {
            return Err(EnvelopeError::IndexOutOfRange {
                what: "azimuth",
                index: azimuth,
                len: config.num_azimuths,
            });
        }
        check_len("scattering strength", nf, scatter.len())?;
        check_len("source beam gain", nf * ns, src_beam.len())?;
        check_len("receiver beam gain", nf * nr, rcv_beam.len())?;
        check_len("source eigenverb power", nf, src_verb.power.len())?;
        check_len("receiver eigenverb power", nf, rcv_verb.power.len())?;

        let overlap = overlap(src_verb, rcv_verb, config.pulse_length)?;

        let mut energy = Vec::with_capacity(ns * nr * nf);
        for s in 0..ns {
            for r in 0..nr {
                for f in 0..nf {
                    let e = src_verb.power[f]
                        * rcv_verb.power[f]
                        * scatter[f]
                        * src_beam[f * ns + s]
                        * rcv_beam[f * nr + r]
                        * overlap.gain;
                    if !(e.is_finite() && e >= 0.0) {
                        return Err(EnvelopeError::InvalidEnergy { value: e });
                    }
                    energy.push(e);
                }
            }
        }

        Ok(Self {
            azimuth,
            overlap,
            num_src_beams: ns,
            num_rcv_beams: nr,
            num_freqs: nf,
            energy,
        })
    }

    /// Receiver azimuth bin this contribution accumulates into.
    pub fn azimuth(&self) -> usize {
        self.azimuth
    }

    /// Frequency-independent overlap geometry.
    pub fn overlap(&self) -> &Overlap {
        &self.overlap
    }

    /// Energy for one cell and frequency.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn energy(&self, src_beam: usize, rcv_beam: usize, freq: usize) -> f64 {
        assert!(src_beam < self.num_src_beams && rcv_beam < self.num_rcv_beams);
        self.energy[(src_beam * self.num_rcv_beams + rcv_beam) * self.num_freqs + freq]
    }

    /// Per-frequency energies for one (source beam, receiver beam) cell.
    pub(crate) fn cell(&self, src_beam: usize, rcv_beam: usize) -> &[f64] {
        let start = (src_beam * self.num_rcv_beams + rcv_beam) * self.num_freqs;
        &self.energy[start..start + self.num_freqs]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverb_core::Position;
    use smallvec::smallvec;
    use std::f64::consts::FRAC_PI_2;

    fn verb(length: f64, width: f64, direction: f64, east: f64, north: f64) -> Eigenverb {
        Eigenverb {
            time: 5.0,
            power: smallvec![1.0],
            length,
            width,
            position: Position::new(east, north, -100.0),
            direction,
            grazing: 0.2,
            sound_speed: 1500.0,
            de_index: 0,
            az_index: 0,
            source_de: -0.2,
            source_az: 0.0,
            surface: 0,
            bottom: 1,
            caustic: 0,
            upper: 0,
            lower: 0,
        }
    }

    #[test]
    fn coincident_identical_footprints_have_closed_form_gain() {
        let v = verb(200.0, 50.0, 0.3, 0.0, 0.0);
        let o = overlap(&v, &v, 1.0).unwrap();
        assert!((o.gain - PI * 200.0 * 50.0).abs() / o.gain < 1e-12);
        assert_eq!(o.delay, 10.0);
    }

    #[test]
    fn coincident_identical_footprints_have_closed_form_duration() {
        // Σp_xx = L²/2 for two identical aligned footprints.
        let v = verb(200.0, 50.0, 0.0, 0.0, 0.0);
        let o = overlap(&v, &v, 1.0).unwrap();
        let k = 0.2f64.cos() / 1500.0;
        let expected = 0.5 * (1.0 + k * k * 200.0 * 200.0 / 2.0).sqrt();
        assert!((o.duration - expected).abs() < 1e-12);
    }

    #[test]
    fn vertical_incidence_gives_pulse_floor() {
        let mut v = verb(300.0, 300.0, 0.0, 0.0, 0.0);
        v.grazing = FRAC_PI_2;
        let o = overlap(&v, &v, 0.8).unwrap();
        assert!((o.duration - 0.4).abs() < 1e-12);
    }

    #[test]
    fn circular_footprints_ignore_direction() {
        let a = verb(100.0, 100.0, 0.0, 0.0, 0.0);
        let b = verb(100.0, 100.0, 1.1, 30.0, -40.0);
        let c = verb(100.0, 100.0, -2.0, 30.0, -40.0);
        let ob = overlap(&b, &a, 1.0).unwrap();
        let oc = overlap(&c, &a, 1.0).unwrap();
        assert!((ob.gain - oc.gain).abs() / ob.gain < 1e-12);
        // Two circular Gaussians of variance s² separated by d: exp(−d²/4s²).
        let expected = PI * 100.0 * 100.0 * (-(50.0f64 * 50.0) / (4.0 * 100.0 * 100.0)).exp();
        assert!((ob.gain - expected).abs() / expected < 1e-12);
    }

    #[test]
    fn separation_along_length_axis_decays_slower() {
        // Receiver length axis points north.
        let rcv = verb(400.0, 50.0, 0.0, 0.0, 0.0);
        let along = verb(400.0, 50.0, 0.0, 0.0, 200.0);
        let across = verb(400.0, 50.0, 0.0, 200.0, 0.0);
        let g_along = overlap(&along, &rcv, 1.0).unwrap().gain;
        let g_across = overlap(&across, &rcv, 1.0).unwrap().gain;
        assert!(g_along > g_across);
    }

    #[test]
    fn overlap_rejects_degenerate_footprint() {
        let good = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        let bad = verb(100.0, 0.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            overlap(&bad, &good, 1.0),
            Err(EnvelopeError::InvalidFootprint { .. })
        ));
        let nan = verb(f64::NAN, 50.0, 0.0, 0.0, 0.0);
        assert!(matches!(
            overlap(&good, &nan, 1.0),
            Err(EnvelopeError::InvalidFootprint { .. })
        ));
    }

    #[test]
    fn overlap_rejects_bad_sound_speed() {
        let good = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        let mut rcv = good.clone();
        rcv.sound_speed = 0.0;
        assert!(matches!(
            overlap(&good, &rcv, 1.0),
            Err(EnvelopeError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn overlap_rejects_non_finite_travel_time() {
        let good = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        for time in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut late = good.clone();
            late.time = time;
            assert!(matches!(
                overlap(&late, &good, 1.0),
                Err(EnvelopeError::InvalidDelay { .. })
            ));
            assert!(matches!(
                overlap(&good, &late, 1.0),
                Err(EnvelopeError::InvalidDelay { .. })
            ));
        }
        // Opposite infinities sum to NaN.
        let mut early = good.clone();
        early.time = f64::NEG_INFINITY;
        let mut late = good.clone();
        late.time = f64::INFINITY;
        let err = overlap(&early, &late, 1.0).unwrap_err();
        assert!(err.is_numeric());
    }

    #[test]
    fn render_integrates_to_energy() {
        let mut row = vec![0.0; 200];
        let n = render(&mut row, 3.0, 10.0, 0.5, 0.125, 6.0);
        let total: f64 = row.iter().sum::<f64>() * 0.125;
        assert!((total - 3.0).abs() < 1e-6);
        assert_eq!(n, 49);
    }

    #[test]
    fn render_clips_to_time_axis() {
        let mut row = vec![0.0; 10];
        assert_eq!(render(&mut row, 1.0, 100.0, 0.5, 0.1, 6.0), 0);
        assert_eq!(render(&mut row, 1.0, -100.0, 0.5, 0.1, 6.0), 0);
        assert!(row.iter().all(|&v| v == 0.0));
        let n = render(&mut row, 1.0, 0.0, 0.5, 0.1, 6.0);
        assert_eq!(n, 10);
    }

    #[test]
    fn contribution_checks_shapes() {
        let config = EnvelopeConfig::new(vec![1000.0]);
        let v = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        let err = Contribution::compute(&config, 0, &[1.0, 1.0], &[1.0], &[1.0], &v, &v);
        assert!(matches!(err, Err(EnvelopeError::ShapeMismatch { .. })));
        let err = Contribution::compute(&config, 1, &[1.0], &[1.0], &[1.0], &v, &v);
        assert!(matches!(err, Err(EnvelopeError::IndexOutOfRange { .. })));
    }

    #[test]
    fn contribution_rejects_negative_scatter() {
        let config = EnvelopeConfig::new(vec![1000.0]);
        let v = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        let err = Contribution::compute(&config, 0, &[-1.0], &[1.0], &[1.0], &v, &v);
        assert!(matches!(err, Err(EnvelopeError::InvalidEnergy { .. })));
    }

    #[test]
    fn contribution_applies_beam_gains_per_cell() {
        let config = EnvelopeConfig {
            num_src_beams: 2,
            num_rcv_beams: 3,
            ..EnvelopeConfig::new(vec![1000.0, 2000.0])
        };
        let mut v = verb(100.0, 50.0, 0.0, 0.0, 0.0);
        v.power = smallvec![1.0, 1.0];
        // Frequency-major gains.
        let src_beam = [1.0, 2.0, 1.0, 4.0];
        let rcv_beam = [1.0, 10.0, 100.0, 1.0, 1.0, 1.0];
        let c = Contribution::compute(&config, 0, &[1.0, 1.0], &src_beam, &rcv_beam, &v, &v)
            .unwrap();
        let g = c.overlap().gain;
        assert!((c.energy(1, 2, 0) - 200.0 * g).abs() < 1e-9 * g);
        assert!((c.energy(1, 2, 1) - 4.0 * g).abs() < 1e-9 * g);
        assert_eq!(c.cell(1, 2), &[c.energy(1, 2, 0), c.energy(1, 2, 1)]);
    }
}
