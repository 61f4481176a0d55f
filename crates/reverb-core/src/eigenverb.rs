//! Gaussian beam projections onto reverberation interfaces.
//!
//! An [`Eigenverb`] is the footprint a ray tube leaves on an interface
//! (bottom, surface, or a volume layer boundary). Eigenverbs play the same
//! role for diffuse reverberation that eigenrays play for transmission
//! loss: each one is a discrete component of the total.
//!
//! Eigenverbs are grouped by interface in an [`EigenverbCollection`], which
//! is built once by the producing sensor and then shared read-only.

use std::fmt;

use crate::error::EnvelopeError;
use crate::id::FrequencyVec;

/// Horizontal and vertical location in a local tangent plane (m).
///
/// The reverberation core only needs relative geometry between two
/// footprints, so positions are carried as east/north offsets from an
/// arbitrary scenario origin rather than geodetic coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Distance east of the scenario origin (m).
    pub east: f64,
    /// Distance north of the scenario origin (m).
    pub north: f64,
    /// Height above the reference surface (m, positive up).
    pub altitude: f64,
}

impl Position {
    /// Create a position from east, north, and altitude components.
    pub fn new(east: f64, north: f64, altitude: f64) -> Self {
        Self {
            east,
            north,
            altitude,
        }
    }

    /// Horizontal offset `(east, north)` from `origin` to `self`.
    pub fn offset_from(&self, origin: &Position) -> (f64, f64) {
        (self.east - origin.east, self.north - origin.north)
    }

    /// Horizontal distance between two positions (m).
    pub fn horizontal_distance(&self, other: &Position) -> f64 {
        let (de, dn) = self.offset_from(other);
        de.hypot(dn)
    }
}

/// Gaussian projection of one ray tube onto an interface.
///
/// All angles are in radians. The footprint is an elliptical Gaussian
/// whose `length` axis points along `direction` and whose `width` axis is
/// perpendicular to it; both extents are one standard deviation.
#[derive(Clone, Debug, PartialEq)]
pub struct Eigenverb {
    /// One-way travel time to the interface (s).
    pub time: f64,
    /// Fraction of the source level reaching the footprint at each
    /// frequency (linear, peak of the Gaussian).
    pub power: FrequencyVec,
    /// Footprint extent along `direction` (m).
    pub length: f64,
    /// Footprint extent across `direction` (m).
    pub width: f64,
    /// Centre of the footprint.
    pub position: Position,
    /// Heading of the length axis (rad, clockwise from true north).
    pub direction: f64,
    /// Grazing angle at impact (rad, positive up).
    pub grazing: f64,
    /// Sound speed at the point of impact (m/s).
    pub sound_speed: f64,
    /// Launch D/E beam index, for grouping by source beam.
    pub de_index: usize,
    /// Launch AZ beam index; also the receiver azimuth bin of the envelope.
    pub az_index: usize,
    /// Launch depression/elevation angle (rad, positive up).
    pub source_de: f64,
    /// Launch azimuth (rad, clockwise from true north).
    pub source_az: f64,
    /// Surface interactions along the path.
    pub surface: u16,
    /// Bottom interactions along the path.
    pub bottom: u16,
    /// Caustics along the path.
    pub caustic: u16,
    /// Upper vertices along the path.
    pub upper: u16,
    /// Lower vertices along the path.
    pub lower: u16,
}

impl Eigenverb {
    /// Squared footprint length (m²).
    #[inline]
    pub fn length2(&self) -> f64 {
        self.length * self.length
    }

    /// Squared footprint width (m²).
    #[inline]
    pub fn width2(&self) -> f64 {
        self.width * self.width
    }

    /// Number of frequencies carried by `power`.
    pub fn num_frequencies(&self) -> usize {
        self.power.len()
    }
}

/// Reverberation interface an eigenverb was collected on.
///
/// Interface numbering: 0 is the bottom, 1 the surface, then two indices
/// (upper, lower) for each volume scattering layer in depth order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Interface {
    /// Ocean bottom.
    Bottom,
    /// Ocean surface.
    Surface,
    /// Upper side of volume layer `n` (zero-based).
    VolumeUpper(usize),
    /// Lower side of volume layer `n` (zero-based).
    VolumeLower(usize),
}

impl Interface {
    /// Flat interface index used by [`EigenverbCollection`].
    pub fn index(&self) -> usize {
        match *self {
            Self::Bottom => 0,
            Self::Surface => 1,
            Self::VolumeUpper(layer) => 2 + 2 * layer,
            Self::VolumeLower(layer) => 3 + 2 * layer,
        }
    }

    /// Inverse of [`index`](Self::index).
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Bottom,
            1 => Self::Surface,
            n if n % 2 == 0 => Self::VolumeUpper((n - 2) / 2),
            n => Self::VolumeLower((n - 3) / 2),
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bottom => write!(f, "bottom"),
            Self::Surface => write!(f, "surface"),
            Self::VolumeUpper(layer) => write!(f, "upper volume {}", layer + 1),
            Self::VolumeLower(layer) => write!(f, "lower volume {}", layer + 1),
        }
    }
}

/// Eigenverbs produced by one sensor, grouped by interface.
///
/// Every eigenverb in the collection carries one power value per entry of
/// [`frequencies`](Self::frequencies); [`add_eigenverb`](Self::add_eigenverb)
/// enforces this, so consumers can index power by frequency without
/// re-checking lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct EigenverbCollection {
    frequencies: Vec<f64>,
    interfaces: Vec<Vec<Eigenverb>>,
}

impl EigenverbCollection {
    /// Create an empty collection for a scenario with `num_volumes`
    /// volume scattering layers.
    ///
    /// Always allocates the bottom and surface interfaces, plus an upper
    /// and lower interface per volume layer.
    pub fn new(frequencies: Vec<f64>, num_volumes: usize) -> Self {
        Self {
            frequencies,
            interfaces: vec![Vec::new(); 2 * (1 + num_volumes)],
        }
    }

    /// Frequencies at which eigenverb power is reported (Hz).
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Number of interfaces in this collection.
    pub fn num_interfaces(&self) -> usize {
        self.interfaces.len()
    }

    /// Eigenverbs collected on one interface.
    ///
    /// Returns an empty slice for an interface index outside the
    /// collection.
    pub fn eigenverbs(&self, interface: usize) -> &[Eigenverb] {
        self.interfaces
            .get(interface)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Append an eigenverb to an interface.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::IndexOutOfRange`] if the interface does not
    /// exist, or [`EnvelopeError::ShapeMismatch`] if the eigenverb's power
    /// vector does not match the collection's frequency axis.
    pub fn add_eigenverb(
        &mut self,
        verb: Eigenverb,
        interface: Interface,
    ) -> Result<(), EnvelopeError> {
        let index = interface.index();
        if index >= self.interfaces.len() {
            return Err(EnvelopeError::IndexOutOfRange {
                what: "interface",
                index,
                len: self.interfaces.len(),
            });
        }
        if verb.power.len() != self.frequencies.len() {
            return Err(EnvelopeError::ShapeMismatch {
                what: "eigenverb power",
                expected: self.frequencies.len(),
                actual: verb.power.len(),
            });
        }
        self.interfaces[index].push(verb);
        Ok(())
    }

    /// Total number of eigenverbs across all interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.iter().map(Vec::len).sum()
    }

    /// True when no interface holds an eigenverb.
    pub fn is_empty(&self) -> bool {
        self.interfaces.iter().all(Vec::is_empty)
    }
}
