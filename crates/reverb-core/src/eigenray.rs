//! A single acoustic path between a source and a target.

use crate::id::FrequencyVec;

/// One acoustic path connecting a source and target location.
///
/// Produced by upstream propagation and never mutated afterwards. Angles
/// are in degrees, matching the fathometer reporting convention; the
/// eigenverb fields that feed the envelope engine use radians instead.
#[derive(Clone, Debug, PartialEq)]
pub struct Eigenray {
    /// Time of arrival for this path (s).
    pub time: f64,
    /// Propagation loss at each frequency (dB, positive).
    pub intensity: FrequencyVec,
    /// Phase change at each frequency (rad).
    pub phase: FrequencyVec,
    /// Launch depression/elevation angle at the source (deg, positive up).
    pub source_de: f64,
    /// Launch azimuth at the source (deg, clockwise from true north).
    pub source_az: f64,
    /// Arrival depression/elevation angle at the target (deg, positive up).
    pub target_de: f64,
    /// Arrival azimuth at the target (deg, clockwise from true north).
    pub target_az: f64,
    /// Surface reflections along this path.
    pub surface: u16,
    /// Bottom reflections along this path.
    pub bottom: u16,
    /// Caustics encountered along this path.
    pub caustic: u16,
    /// Upper vertices encountered along this path.
    pub upper: u16,
    /// Lower vertices encountered along this path.
    pub lower: u16,
}

impl Eigenray {
    /// Exchange the source and target angles.
    ///
    /// Used when the sensor that reported the path is the receiver of the
    /// pair: after the swap, the `source_*` fields describe the end of the
    /// path at the transmitting sensor.
    pub fn swap_ends(&mut self) {
        std::mem::swap(&mut self.source_de, &mut self.target_de);
        std::mem::swap(&mut self.source_az, &mut self.target_az);
    }

    /// Number of frequencies carried by this path.
    pub fn num_frequencies(&self) -> usize {
        self.intensity.len()
    }
}

/// The latest set of eigenrays reported for a pair.
pub type EigenrayList = Vec<Eigenray>;

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn ray() -> Eigenray {
        Eigenray {
            time: 1.25,
            intensity: smallvec![60.0, 61.0],
            phase: smallvec![0.0, 0.0],
            source_de: 10.0,
            source_az: 45.0,
            target_de: -12.0,
            target_az: 225.0,
            surface: 1,
            bottom: 0,
            caustic: 0,
            upper: 0,
            lower: 1,
        }
    }

    #[test]
    fn swap_ends_exchanges_angles_only() {
        let mut r = ray();
        r.swap_ends();
        assert_eq!(r.source_de, -12.0);
        assert_eq!(r.target_de, 10.0);
        assert_eq!(r.source_az, 225.0);
        assert_eq!(r.target_az, 45.0);
        assert_eq!(r.time, 1.25);
        assert_eq!(r.surface, 1);
    }

    #[test]
    fn swap_ends_twice_is_identity() {
        let mut r = ray();
        r.swap_ends();
        r.swap_ends();
        assert_eq!(r, ray());
    }
}
