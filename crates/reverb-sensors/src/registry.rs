//! Discovery of interacting sensors and routing of their notifications.
//!
//! [`SensorPairRegistry`] tracks the active sensors, builds a
//! [`SensorPair`] for every combination that can interact, tears pairs
//! down when a member leaves, and forwards each sensor's propagation
//! results to every pair it belongs to. The registry is an ordinary value
//! owned by the caller; there is no process-wide instance.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indexmap::IndexMap;
use reverb_core::{
    EigenrayList, EigenverbCollection, Generation, PairError, PairKey, SensorId, SensorListener,
};
use tracing::{debug, info};

use crate::config::{ConfigError, ReverbConfig};
use crate::pair::SensorPair;

// ── TransmitMode ───────────────────────────────────────────────────

/// Whether a sensor transmits, receives, or both.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransmitMode {
    /// Neither transmits nor receives; takes part in no pair.
    #[default]
    None = 0,
    /// Receive only.
    Receiver = 1,
    /// Transmit only.
    Source = 2,
    /// Transmit and receive; forms a monostatic pair with itself.
    Both = 3,
}

impl TransmitMode {
    /// True for `Source` and `Both`.
    pub fn is_source(self) -> bool {
        (self as u8) & 2 != 0
    }

    /// True for `Receiver` and `Both`.
    pub fn is_receiver(self) -> bool {
        (self as u8) & 1 != 0
    }
}

// ── SensorSpec ─────────────────────────────────────────────────────

/// Registration record for one sensor.
#[derive(Clone, Debug, PartialEq)]
pub struct SensorSpec {
    /// Caller-assigned id, unique within the registry.
    pub id: SensorId,
    /// Transmit/receive capability.
    pub mode: TransmitMode,
    /// Whether the sensor takes part in pairs with other sensors.
    /// Default: true.
    pub multistatic: bool,
    /// Frequencies at which the sensor transmits (Hz), strictly
    /// increasing. Becomes the envelope frequency axis of pairs it
    /// sources.
    pub transmit_freq: Vec<f64>,
    /// Operating band `(min, max)` in Hz. Multistatic pairs form only
    /// between sensors whose bands overlap.
    pub band: (f64, f64),
    /// Number of beams formed when transmitting.
    pub source_beams: usize,
    /// Number of beams formed when receiving.
    pub receiver_beams: usize,
}

impl SensorSpec {
    /// A multistatic single-beam sensor whose band spans its transmit
    /// frequencies.
    pub fn new(id: SensorId, mode: TransmitMode, transmit_freq: Vec<f64>) -> Self {
        let lo = transmit_freq.first().copied().unwrap_or(0.0);
        let hi = transmit_freq.last().copied().unwrap_or(0.0);
        Self {
            id,
            mode,
            multistatic: true,
            transmit_freq,
            band: (lo, hi),
            source_beams: 1,
            receiver_beams: 1,
        }
    }

    /// True when the two operating bands share at least one frequency.
    pub fn band_overlaps(&self, other: &SensorSpec) -> bool {
        self.band.0 <= other.band.1 && other.band.0 <= self.band.1
    }

    fn validate(&self) -> Result<(), String> {
        let (lo, hi) = self.band;
        if !lo.is_finite() || !hi.is_finite() || lo < 0.0 || lo > hi {
            return Err(format!("band ({lo}, {hi}) must be finite with 0 <= min <= max"));
        }
        Ok(())
    }
}

// ── RegistryError ──────────────────────────────────────────────────

/// Errors from [`SensorPairRegistry`] operations.
#[derive(Clone, Debug, PartialEq)]
pub enum RegistryError {
    /// A sensor with this id is already registered.
    DuplicateSensor {
        /// The duplicate id.
        sensor: SensorId,
    },
    /// No sensor with this id is registered.
    UnknownSensor {
        /// The unknown id.
        sensor: SensorId,
    },
    /// A sensor registration record is invalid.
    InvalidSensor {
        /// The offending sensor.
        sensor: SensorId,
        /// Description of the problem.
        reason: String,
    },
    /// A pair rejected a call.
    Pair(PairError),
    /// The registry configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSensor { sensor } => write!(f, "sensor {sensor} is already registered"),
            Self::UnknownSensor { sensor } => write!(f, "sensor {sensor} is not registered"),
            Self::InvalidSensor { sensor, reason } => {
                write!(f, "invalid sensor {sensor}: {reason}")
            }
            Self::Pair(e) => write!(f, "pair: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pair(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PairError> for RegistryError {
    fn from(e: PairError) -> Self {
        Self::Pair(e)
    }
}

impl From<ConfigError> for RegistryError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ── Fathometer ─────────────────────────────────────────────────────

/// Eigenray snapshot of one pair, as returned by
/// [`SensorPairRegistry::fathometers`].
#[derive(Clone, Debug)]
pub struct Fathometer {
    /// Transmitting sensor.
    pub source: SensorId,
    /// Receiving sensor.
    pub receiver: SensorId,
    /// Eigenrays with source angles at the transmitter.
    pub eigenrays: Arc<EigenrayList>,
    /// Generation of the eigenray slot the snapshot came from.
    pub generation: Generation,
}

// ── SensorPairRegistry ─────────────────────────────────────────────

#[derive(Debug, Default)]
struct RegistryState {
    sensors: IndexMap<SensorId, SensorSpec>,
    pairs: IndexMap<PairKey, Arc<SensorPair>>,
}

impl RegistryState {
    fn pairs_for(&self, sensor: SensorId) -> Vec<Arc<SensorPair>> {
        self.pairs
            .iter()
            .filter(|(key, _)| key.contains(sensor))
            .map(|(_, pair)| Arc::clone(pair))
            .collect()
    }
}

/// Active sensors and the pairs formed between them.
///
/// Pair rules:
/// - A `Both` sensor forms a monostatic pair with itself.
/// - A source and a different receiver form a multistatic pair when both
///   are flagged `multistatic` and their bands overlap. The rule is
///   applied in both directions, so registration order does not matter.
#[derive(Debug)]
pub struct SensorPairRegistry {
    config: ReverbConfig,
    state: RwLock<RegistryState>,
}

// Compile-time assertion: the registry is shared across sensor threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SensorPairRegistry>();
};

impl SensorPairRegistry {
    /// Create an empty registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in `config`.
    pub fn new(config: ReverbConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RwLock::new(RegistryState::default()),
        })
    }

    /// Registry-wide envelope parameters.
    pub fn config(&self) -> &ReverbConfig {
        &self.config
    }

    // Pair and sensor maps are only changed by whole-entry inserts and
    // removals, so a poisoned guard still protects a consistent state.
    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn build_pair(&self, source: &SensorSpec, receiver: &SensorSpec) -> Result<SensorPair, PairError> {
        SensorPair::new(
            source.id,
            receiver.id,
            self.config.envelope_config(source, receiver),
        )
    }

    fn interacts(source: &SensorSpec, receiver: &SensorSpec) -> bool {
        source.id != receiver.id
            && source.mode.is_source()
            && receiver.mode.is_receiver()
            && source.multistatic
            && receiver.multistatic
            && source.band_overlaps(receiver)
    }

    /// Register a sensor and build every pair it takes part in.
    ///
    /// Returns the keys of the new pairs. Nothing is registered if any
    /// pair cannot be built.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateSensor`] if the id is taken,
    /// [`RegistryError::InvalidSensor`] for a bad band, or
    /// [`RegistryError::Pair`] if a pair's envelope configuration is
    /// invalid (for example, a source with no transmit frequencies).
    pub fn add_sensor(&self, spec: SensorSpec) -> Result<Vec<PairKey>, RegistryError> {
        spec.validate().map_err(|reason| RegistryError::InvalidSensor {
            sensor: spec.id,
            reason,
        })?;
        let mut state = self.write();
        if state.sensors.contains_key(&spec.id) {
            return Err(RegistryError::DuplicateSensor { sensor: spec.id });
        }

        let mut built = Vec::new();
        if spec.mode == TransmitMode::Both {
            built.push(self.build_pair(&spec, &spec)?);
        }
        for other in state.sensors.values() {
            if Self::interacts(&spec, other) {
                built.push(self.build_pair(&spec, other)?);
            }
            if Self::interacts(other, &spec) {
                built.push(self.build_pair(other, &spec)?);
            }
        }

        let keys: Vec<PairKey> = built.iter().map(SensorPair::key).collect();
        for pair in built {
            debug!(pair = %pair.key(), multistatic = pair.multistatic(), "added sensor pair");
            state.pairs.insert(pair.key(), Arc::new(pair));
        }
        info!(sensor = %spec.id, mode = ?spec.mode, pairs = keys.len(), "added sensor");
        state.sensors.insert(spec.id, spec);
        Ok(keys)
    }

    /// Unregister a sensor and drop every pair that references it.
    ///
    /// Returns the keys of the removed pairs. Callers still holding an
    /// `Arc<SensorPair>` keep a usable, detached pair.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSensor`] if the id is not registered.
    pub fn remove_sensor(&self, sensor: SensorId) -> Result<Vec<PairKey>, RegistryError> {
        let mut state = self.write();
        if state.sensors.shift_remove(&sensor).is_none() {
            return Err(RegistryError::UnknownSensor { sensor });
        }
        let mut removed = Vec::new();
        state.pairs.retain(|key, _| {
            if key.contains(sensor) {
                removed.push(*key);
                false
            } else {
                true
            }
        });
        for key in &removed {
            debug!(pair = %key, "removed sensor pair");
        }
        info!(%sensor, pairs = removed.len(), "removed sensor");
        Ok(removed)
    }

    /// Registration record of a sensor.
    pub fn sensor(&self, sensor: SensorId) -> Option<SensorSpec> {
        self.read().sensors.get(&sensor).cloned()
    }

    /// Number of registered sensors.
    pub fn num_sensors(&self) -> usize {
        self.read().sensors.len()
    }

    /// The pair with this source and receiver, if it exists.
    pub fn pair(&self, source: SensorId, receiver: SensorId) -> Option<Arc<SensorPair>> {
        self.read()
            .pairs
            .get(&PairKey::new(source, receiver))
            .map(Arc::clone)
    }

    /// Every pair containing `sensor`, in creation order.
    pub fn pairs_for(&self, sensor: SensorId) -> Vec<Arc<SensorPair>> {
        self.read().pairs_for(sensor)
    }

    /// Every pair, in creation order.
    pub fn pairs(&self) -> Vec<Arc<SensorPair>> {
        self.read().pairs.values().map(Arc::clone).collect()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.read().pairs.len()
    }

    /// True when no pairs exist.
    pub fn is_empty(&self) -> bool {
        self.read().pairs.is_empty()
    }

    /// Pairs containing a registered sensor, collected under the read
    /// guard and returned after it is released.
    fn route(&self, sensor: SensorId) -> Result<Vec<Arc<SensorPair>>, RegistryError> {
        let state = self.read();
        if !state.sensors.contains_key(&sensor) {
            return Err(RegistryError::UnknownSensor { sensor });
        }
        Ok(state.pairs_for(sensor))
    }

    /// Forward new eigenrays from `sensor` to every pair containing it.
    ///
    /// Returns the number of pairs notified.
    pub fn notify_fathometers(
        &self,
        sensor: SensorId,
        eigenrays: Arc<EigenrayList>,
    ) -> Result<usize, RegistryError> {
        let pairs = self.route(sensor)?;
        for pair in &pairs {
            pair.update_fathometers(sensor, Arc::clone(&eigenrays))?;
        }
        Ok(pairs.len())
    }

    /// Forward new eigenverbs from `sensor` to every pair containing it.
    ///
    /// Returns the number of pairs notified.
    pub fn notify_eigenverbs(
        &self,
        sensor: SensorId,
        collection: Arc<EigenverbCollection>,
    ) -> Result<usize, RegistryError> {
        let pairs = self.route(sensor)?;
        for pair in &pairs {
            pair.update_eigenverbs(sensor, Arc::clone(&collection))?;
        }
        Ok(pairs.len())
    }

    /// The other member of every pair containing `sensor`.
    ///
    /// A `Both` sensor lists itself once for its monostatic pair.
    pub fn sensor_targets(&self, sensor: SensorId) -> Result<Vec<SensorId>, RegistryError> {
        let pairs = self.route(sensor)?;
        let mut targets = Vec::with_capacity(pairs.len());
        for pair in &pairs {
            let other = pair.sensor_complement(sensor)?;
            if !targets.contains(&other) {
                targets.push(other);
            }
        }
        Ok(targets)
    }

    /// Eigenray snapshots for the pairs selected by `query`.
    ///
    /// Each entry maps a sensor to the role it must play: `Source` selects
    /// pairs it transmits in, `Receiver` pairs it receives in, `Both`
    /// either. Pairs without eigenrays yet are skipped, and each pair
    /// appears at most once.
    pub fn fathometers(&self, query: &IndexMap<SensorId, TransmitMode>) -> Vec<Fathometer> {
        let state = self.read();
        let mut selected: IndexMap<PairKey, Arc<SensorPair>> = IndexMap::new();
        for (&sensor, &mode) in query {
            for (key, pair) in &state.pairs {
                let matches = (mode.is_source() && key.source == sensor)
                    || (mode.is_receiver() && key.receiver == sensor);
                if matches {
                    selected.entry(*key).or_insert_with(|| Arc::clone(pair));
                }
            }
        }
        drop(state);

        selected
            .into_values()
            .filter_map(|pair| {
                let (eigenrays, generation) = pair.eigenrays_with_generation()?;
                Some(Fathometer {
                    source: pair.source(),
                    receiver: pair.receiver(),
                    eigenrays,
                    generation,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SensorPairRegistry {
        SensorPairRegistry::new(ReverbConfig::default()).unwrap()
    }

    fn spec(id: u32, mode: TransmitMode) -> SensorSpec {
        SensorSpec::new(SensorId(id), mode, vec![3000.0])
    }

    #[test]
    fn mode_bits() {
        assert!(TransmitMode::Both.is_source() && TransmitMode::Both.is_receiver());
        assert!(TransmitMode::Source.is_source() && !TransmitMode::Source.is_receiver());
        assert!(!TransmitMode::Receiver.is_source() && TransmitMode::Receiver.is_receiver());
        assert!(!TransmitMode::None.is_source() && !TransmitMode::None.is_receiver());
        assert_eq!(TransmitMode::Both as u8, 3);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = ReverbConfig {
            num_azimuths: 0,
            ..ReverbConfig::default()
        };
        assert_eq!(
            SensorPairRegistry::new(config).unwrap_err(),
            ConfigError::NoAzimuths
        );
    }

    #[test]
    fn both_mode_builds_monostatic_pair() {
        let r = registry();
        let keys = r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        assert_eq!(keys, vec![PairKey::monostatic(SensorId(1))]);
        assert!(!r.pair(SensorId(1), SensorId(1)).unwrap().multistatic());
    }

    #[test]
    fn none_mode_builds_nothing() {
        let r = registry();
        r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        assert!(r.add_sensor(spec(2, TransmitMode::None)).unwrap().is_empty());
        assert_eq!(r.num_sensors(), 2);
    }

    #[test]
    fn multistatic_pairs_are_order_independent() {
        let a = registry();
        a.add_sensor(spec(1, TransmitMode::Source)).unwrap();
        a.add_sensor(spec(2, TransmitMode::Receiver)).unwrap();
        let b = registry();
        b.add_sensor(spec(2, TransmitMode::Receiver)).unwrap();
        b.add_sensor(spec(1, TransmitMode::Source)).unwrap();
        for r in [&a, &b] {
            assert_eq!(r.len(), 1);
            assert!(r.pair(SensorId(1), SensorId(2)).is_some());
            assert!(r.pair(SensorId(2), SensorId(1)).is_none());
        }
    }

    #[test]
    fn two_both_sensors_form_four_pairs() {
        let r = registry();
        r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        let keys = r.add_sensor(spec(2, TransmitMode::Both)).unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(r.len(), 4);
        assert_eq!(r.pairs_for(SensorId(1)).len(), 3);
    }

    #[test]
    fn non_multistatic_sensor_only_pairs_with_itself() {
        let r = registry();
        let mut lone = spec(1, TransmitMode::Both);
        lone.multistatic = false;
        r.add_sensor(lone).unwrap();
        r.add_sensor(spec(2, TransmitMode::Both)).unwrap();
        assert_eq!(r.len(), 2);
        assert!(r.pair(SensorId(1), SensorId(2)).is_none());
    }

    #[test]
    fn disjoint_bands_do_not_pair() {
        let r = registry();
        r.add_sensor(SensorSpec::new(SensorId(1), TransmitMode::Source, vec![1000.0]))
            .unwrap();
        r.add_sensor(SensorSpec::new(SensorId(2), TransmitMode::Receiver, vec![5000.0]))
            .unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn duplicate_and_invalid_sensors_are_rejected() {
        let r = registry();
        r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        assert_eq!(
            r.add_sensor(spec(1, TransmitMode::Source)).unwrap_err(),
            RegistryError::DuplicateSensor { sensor: SensorId(1) }
        );
        let mut bad = spec(2, TransmitMode::Receiver);
        bad.band = (5000.0, 1000.0);
        assert!(matches!(
            r.add_sensor(bad),
            Err(RegistryError::InvalidSensor { .. })
        ));
        assert_eq!(r.num_sensors(), 1);
    }

    #[test]
    fn failed_pair_build_registers_nothing() {
        let r = registry();
        let bad = SensorSpec {
            band: (0.0, 10_000.0),
            ..SensorSpec::new(SensorId(1), TransmitMode::Both, vec![])
        };
        assert!(matches!(r.add_sensor(bad), Err(RegistryError::Pair(_))));
        assert_eq!(r.num_sensors(), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn remove_sensor_drops_its_pairs() {
        let r = registry();
        r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        r.add_sensor(spec(2, TransmitMode::Both)).unwrap();
        r.add_sensor(spec(3, TransmitMode::Receiver)).unwrap();
        assert_eq!(r.len(), 6);
        let removed = r.remove_sensor(SensorId(1)).unwrap();
        assert_eq!(removed.len(), 4);
        assert_eq!(r.len(), 2);
        assert!(r.pairs().iter().all(|p| !p.key().contains(SensorId(1))));
        assert_eq!(
            r.remove_sensor(SensorId(1)).unwrap_err(),
            RegistryError::UnknownSensor { sensor: SensorId(1) }
        );
    }

    #[test]
    fn sensor_targets_lists_complements() {
        let r = registry();
        r.add_sensor(spec(1, TransmitMode::Both)).unwrap();
        r.add_sensor(spec(2, TransmitMode::Receiver)).unwrap();
        let targets = r.sensor_targets(SensorId(1)).unwrap();
        assert_eq!(targets, vec![SensorId(1), SensorId(2)]);
        assert_eq!(r.sensor_targets(SensorId(2)).unwrap(), vec![SensorId(1)]);
        assert!(r.sensor_targets(SensorId(9)).is_err());
    }

    #[test]
    fn error_display_and_source() {
        let err = RegistryError::from(PairError::MissingEigenverbs {
            pair: PairKey::new(SensorId(1), SensorId(2)),
        });
        assert!(err.to_string().starts_with("pair: "));
        assert!(err.source().is_some());
        assert!(RegistryError::UnknownSensor { sensor: SensorId(4) }
            .source()
            .is_none());
    }
}
