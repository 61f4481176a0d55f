//! One (source, receiver) combination and its cached propagation results.
//!
//! A [`SensorPair`] owns four independently guarded [`SnapshotSlot`]s:
//! the latest eigenrays, the latest source and receiver eigenverb
//! collections, and the accumulated envelope collection. A monostatic
//! pair keeps its one sensor's eigenverbs in the source slot alone and
//! serves both sides from it. Sensors publish
//! into the pair through the [`SensorListener`] contract from their own
//! threads; readers take `Arc` snapshots at any time.

use std::sync::Arc;

use reverb_core::{
    Eigenverb, EigenrayList, EigenverbCollection, Generation, PairError, PairKey, SensorId,
    SensorListener,
};
use reverb_envelope::{
    Contribution, EnvelopeCollection, EnvelopeConfig, EnvelopeGenerator, EnvelopeMetrics,
};
use tracing::debug;

use crate::slot::SnapshotSlot;

/// Which side(s) of a pair a sensor id occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Source,
    Receiver,
    Monostatic,
}

/// Cached eigenrays, eigenverbs, and envelopes for one sensor pair.
///
/// Pairs refer to their sensors only by id. Every slot is replaced
/// wholesale, so a reader never observes a partially updated value, and
/// the last completed write to a slot wins.
#[derive(Debug)]
pub struct SensorPair {
    key: PairKey,
    envelope_config: Arc<EnvelopeConfig>,
    eigenrays: SnapshotSlot<EigenrayList>,
    src_eigenverbs: SnapshotSlot<EigenverbCollection>,
    // Unused by monostatic pairs.
    rcv_eigenverbs: SnapshotSlot<EigenverbCollection>,
    envelopes: SnapshotSlot<EnvelopeCollection>,
}

// Compile-time assertion: pairs are shared across sensor threads.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SensorPair>();
};

impl SensorPair {
    /// Create an empty pair.
    ///
    /// # Errors
    ///
    /// Returns [`PairError::Envelope`] if `envelope_config` is invalid.
    pub fn new(
        source: SensorId,
        receiver: SensorId,
        envelope_config: impl Into<Arc<EnvelopeConfig>>,
    ) -> Result<Self, PairError> {
        let envelope_config = envelope_config.into();
        envelope_config.validate()?;
        Ok(Self {
            key: PairKey::new(source, receiver),
            envelope_config,
            eigenrays: SnapshotSlot::new(),
            src_eigenverbs: SnapshotSlot::new(),
            rcv_eigenverbs: SnapshotSlot::new(),
            envelopes: SnapshotSlot::new(),
        })
    }

    /// Ordered (source, receiver) key of this pair.
    pub fn key(&self) -> PairKey {
        self.key
    }

    /// Sensor that transmits.
    pub fn source(&self) -> SensorId {
        self.key.source
    }

    /// Sensor that receives.
    pub fn receiver(&self) -> SensorId {
        self.key.receiver
    }

    /// True when source and receiver are different sensors.
    pub fn multistatic(&self) -> bool {
        self.key.is_multistatic()
    }

    /// Shape and rendering parameters of this pair's envelopes.
    pub fn envelope_config(&self) -> &Arc<EnvelopeConfig> {
        &self.envelope_config
    }

    fn role(&self, sensor: SensorId) -> Result<Role, PairError> {
        if sensor == self.key.source {
            // A monostatic pair always treats the caller as the source.
            if self.multistatic() {
                Ok(Role::Source)
            } else {
                Ok(Role::Monostatic)
            }
        } else if sensor == self.key.receiver {
            Ok(Role::Receiver)
        } else {
            Err(PairError::NotAMember {
                sensor,
                pair: self.key,
            })
        }
    }

    /// Latest eigenrays, with source angles describing the transmitter.
    pub fn eigenrays(&self) -> Option<Arc<EigenrayList>> {
        self.eigenrays.load()
    }

    /// Latest eigenrays and the generation that installed them.
    pub fn eigenrays_with_generation(&self) -> Option<(Arc<EigenrayList>, Generation)> {
        self.eigenrays.load_with_generation()
    }

    /// Latest eigenverbs published by the source.
    pub fn source_eigenverbs(&self) -> Option<Arc<EigenverbCollection>> {
        self.src_eigenverbs.load()
    }

    /// Latest eigenverbs published by the receiver.
    ///
    /// For a monostatic pair this is the same snapshot as
    /// [`source_eigenverbs()`](Self::source_eigenverbs).
    pub fn receiver_eigenverbs(&self) -> Option<Arc<EigenverbCollection>> {
        self.rcv_slot().load()
    }

    fn rcv_slot(&self) -> &SnapshotSlot<EigenverbCollection> {
        if self.multistatic() {
            &self.rcv_eigenverbs
        } else {
            &self.src_eigenverbs
        }
    }

    /// Source and receiver eigenverbs from one read per distinct slot.
    fn eigenverb_snapshots(
        &self,
    ) -> (
        Option<Arc<EigenverbCollection>>,
        Option<Arc<EigenverbCollection>>,
    ) {
        let src = self.src_eigenverbs.load();
        if self.multistatic() {
            (src, self.rcv_eigenverbs.load())
        } else {
            (src.clone(), src)
        }
    }

    /// Snapshot of the accumulated envelopes.
    pub fn envelopes(&self) -> Option<Arc<EnvelopeCollection>> {
        self.envelopes.load()
    }

    /// Generation of the eigenray slot.
    pub fn eigenrays_generation(&self) -> Generation {
        self.eigenrays.generation()
    }

    /// Generation of the source eigenverb slot.
    pub fn source_eigenverbs_generation(&self) -> Generation {
        self.src_eigenverbs.generation()
    }

    /// Generation of the receiver eigenverb slot; the source slot's for a
    /// monostatic pair.
    pub fn receiver_eigenverbs_generation(&self) -> Generation {
        self.rcv_slot().generation()
    }

    /// Generation of the envelope slot.
    pub fn envelopes_generation(&self) -> Generation {
        self.envelopes.generation()
    }

    fn empty_envelopes(&self) -> EnvelopeCollection {
        EnvelopeCollection::new(Arc::clone(&self.envelope_config))
            .expect("envelope config validated in SensorPair::new")
    }

    /// Accumulate one eigenverb pair into the envelopes.
    ///
    /// The overlap is computed before the envelope guard is taken; only
    /// the rendering runs under it. See
    /// [`EnvelopeCollection::add_contribution`] for the argument layout.
    ///
    /// # Errors
    ///
    /// Index, shape, and numeric errors leave the envelopes unchanged;
    /// numeric rejections are still counted in the envelope metrics.
    pub fn add_contribution(
        &self,
        azimuth: usize,
        scatter: &[f64],
        src_beam: &[f64],
        rcv_beam: &[f64],
        src_verb: &Eigenverb,
        rcv_verb: &Eigenverb,
    ) -> Result<(), PairError> {
        let computed = Contribution::compute(
            &self.envelope_config,
            azimuth,
            scatter,
            src_beam,
            rcv_beam,
            src_verb,
            rcv_verb,
        );
        match computed {
            Ok(contribution) => self
                .envelopes
                .modify_or_insert_with(|| self.empty_envelopes(), |env| env.accumulate(&contribution))
                .map_err(PairError::from),
            Err(err) => {
                if err.is_numeric() {
                    self.envelopes
                        .modify_or_insert_with(|| self.empty_envelopes(), |env| env.record_rejection(&err));
                }
                Err(err.into())
            }
        }
    }

    /// Run one reverberation cycle from the cached eigenverbs and merge the
    /// result into the envelopes.
    ///
    /// The cycle runs without holding any guard, on `workers` threads when
    /// `workers > 1`. Returns the counters of this cycle alone.
    ///
    /// # Errors
    ///
    /// [`PairError::MissingEigenverbs`] if either side has not published;
    /// [`PairError::Envelope`] if the generator fails or was configured
    /// differently from this pair.
    pub fn compute_envelopes(
        &self,
        generator: &EnvelopeGenerator,
        workers: usize,
    ) -> Result<EnvelopeMetrics, PairError> {
        let (Some(src), Some(rcv)) = self.eigenverb_snapshots() else {
            return Err(PairError::MissingEigenverbs { pair: self.key });
        };
        let cycle = if workers > 1 {
            generator.run_parallel(&src, &rcv, workers)?
        } else {
            generator.run(&src, &rcv)?
        };
        self.envelopes
            .modify_or_insert_with(|| self.empty_envelopes(), |env| env.merge(&cycle))?;
        debug!(
            pair = %self.key,
            rendered = cycle.metrics().rendered,
            rejected = cycle.metrics().rejected,
            "merged reverberation cycle"
        );
        Ok(*cycle.metrics())
    }

    /// Zero the envelopes for a new reverberation cycle.
    pub fn reset_envelopes(&self) {
        if self.envelopes.modify(EnvelopeCollection::reset).is_some() {
            debug!(pair = %self.key, "reset envelopes");
        }
    }
}

impl SensorListener for SensorPair {
    fn update_fathometers(
        &self,
        sensor: SensorId,
        eigenrays: Arc<EigenrayList>,
    ) -> Result<(), PairError> {
        let role = self.role(sensor)?;
        let stored = if role == Role::Receiver {
            let mut swapped = EigenrayList::clone(&eigenrays);
            swapped.iter_mut().for_each(|ray| ray.swap_ends());
            Arc::new(swapped)
        } else {
            eigenrays
        };
        let count = stored.len();
        let generation = self.eigenrays.install(stored);
        debug!(pair = %self.key, %sensor, count, %generation, "installed eigenrays");
        Ok(())
    }

    fn update_eigenverbs(
        &self,
        sensor: SensorId,
        collection: Arc<EigenverbCollection>,
    ) -> Result<(), PairError> {
        let count = collection.len();
        let generation = match self.role(sensor)? {
            Role::Source | Role::Monostatic => self.src_eigenverbs.install(collection),
            Role::Receiver => self.rcv_eigenverbs.install(collection),
        };
        debug!(pair = %self.key, %sensor, count, %generation, "installed eigenverbs");
        Ok(())
    }

    fn sensor_complement(&self, sensor: SensorId) -> Result<SensorId, PairError> {
        match self.role(sensor)? {
            Role::Source => Ok(self.key.receiver),
            Role::Receiver => Ok(self.key.source),
            Role::Monostatic => Ok(sensor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reverb_core::{ConstantScattering, EnvelopeError, Interface, OmniBeam};
    use reverb_test_utils::{eigenray, EigenverbBuilder};

    fn config() -> EnvelopeConfig {
        EnvelopeConfig {
            num_times: 200,
            threshold: 0.0,
            ..EnvelopeConfig::new(vec![1000.0])
        }
    }

    fn pair(source: u32, receiver: u32) -> SensorPair {
        SensorPair::new(SensorId(source), SensorId(receiver), config()).unwrap()
    }

    fn collection() -> Arc<EigenverbCollection> {
        let mut c = EigenverbCollection::new(vec![1000.0], 0);
        c.add_eigenverb(EigenverbBuilder::new().build(), Interface::Bottom)
            .unwrap();
        Arc::new(c)
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = SensorPair::new(SensorId(1), SensorId(2), EnvelopeConfig::new(vec![])).unwrap_err();
        assert!(matches!(err, PairError::Envelope(EnvelopeError::InvalidConfig { .. })));
    }

    #[test]
    fn accessors_start_empty() {
        let p = pair(1, 2);
        assert!(p.multistatic());
        assert!(p.eigenrays().is_none());
        assert!(p.source_eigenverbs().is_none());
        assert!(p.receiver_eigenverbs().is_none());
        assert!(p.envelopes().is_none());
        assert_eq!(p.eigenrays_generation(), Generation(0));
    }

    #[test]
    fn source_fathometers_are_stored_as_is() {
        let p = pair(1, 2);
        let rays = Arc::new(vec![eigenray(1.0, 1)]);
        p.update_fathometers(SensorId(1), Arc::clone(&rays)).unwrap();
        assert!(Arc::ptr_eq(&rays, &p.eigenrays().unwrap()));
    }

    #[test]
    fn receiver_fathometers_are_swapped_in_a_copy() {
        let p = pair(1, 2);
        let rays = Arc::new(vec![eigenray(1.0, 1)]);
        p.update_fathometers(SensorId(2), Arc::clone(&rays)).unwrap();
        let stored = p.eigenrays().unwrap();
        assert_eq!(stored[0].source_de, rays[0].target_de);
        assert_eq!(stored[0].source_az, rays[0].target_az);
        assert_eq!(rays[0].source_de, 12.0);
    }

    #[test]
    fn monostatic_fathometers_never_swap() {
        let p = pair(4, 4);
        let rays = Arc::new(vec![eigenray(1.0, 1)]);
        p.update_fathometers(SensorId(4), Arc::clone(&rays)).unwrap();
        assert_eq!(p.eigenrays().unwrap()[0].source_de, 12.0);
    }

    #[test]
    fn non_member_is_rejected_without_side_effects() {
        let p = pair(1, 2);
        let err = p
            .update_fathometers(SensorId(3), Arc::new(vec![eigenray(1.0, 1)]))
            .unwrap_err();
        assert!(matches!(err, PairError::NotAMember { .. }));
        assert!(p.eigenrays().is_none());
        assert!(p.update_eigenverbs(SensorId(3), collection()).is_err());
        assert!(p.source_eigenverbs().is_none());
        assert!(p.sensor_complement(SensorId(3)).is_err());
    }

    #[test]
    fn eigenverbs_route_by_role() {
        let p = pair(1, 2);
        p.update_eigenverbs(SensorId(2), collection()).unwrap();
        assert!(p.source_eigenverbs().is_none());
        assert!(p.receiver_eigenverbs().is_some());
        assert_eq!(p.receiver_eigenverbs_generation(), Generation(1));

        let m = pair(5, 5);
        m.update_eigenverbs(SensorId(5), collection()).unwrap();
        m.update_eigenverbs(SensorId(5), collection()).unwrap();
        assert!(Arc::ptr_eq(
            &m.source_eigenverbs().unwrap(),
            &m.receiver_eigenverbs().unwrap()
        ));
        // One install per publication, shared by both sides.
        assert_eq!(m.source_eigenverbs_generation(), Generation(2));
        assert_eq!(m.receiver_eigenverbs_generation(), Generation(2));
        assert!(m.rcv_eigenverbs.load().is_none());
    }

    #[test]
    fn complement() {
        let p = pair(1, 2);
        assert_eq!(p.sensor_complement(SensorId(1)).unwrap(), SensorId(2));
        assert_eq!(p.sensor_complement(SensorId(2)).unwrap(), SensorId(1));
        assert_eq!(pair(7, 7).sensor_complement(SensorId(7)).unwrap(), SensorId(7));
    }

    #[test]
    fn add_contribution_creates_and_accumulates() {
        let p = pair(1, 2);
        let v = EigenverbBuilder::new().build();
        p.add_contribution(0, &[1.0], &[1.0], &[1.0], &v, &v).unwrap();
        let first = p.envelopes().unwrap();
        p.add_contribution(0, &[1.0], &[1.0], &[1.0], &v, &v).unwrap();
        let second = p.envelopes().unwrap();
        let e1 = first.total_energy(0, 0, 0).unwrap()[0];
        let e2 = second.total_energy(0, 0, 0).unwrap()[0];
        assert!((e2 - 2.0 * e1).abs() < 1e-9 * e2);
        assert_eq!(p.envelopes_generation(), Generation(2));
    }

    #[test]
    fn rejected_contribution_is_counted() {
        let p = pair(1, 2);
        let bad = EigenverbBuilder::new().footprint(0.0, 10.0).build();
        let good = EigenverbBuilder::new().build();
        assert!(p.add_contribution(0, &[1.0], &[1.0], &[1.0], &bad, &good).is_err());
        let env = p.envelopes().unwrap();
        assert_eq!(env.metrics().rejected, 1);
        assert_eq!(env.total_energy(0, 0, 0).unwrap(), vec![0.0]);
    }

    #[test]
    fn compute_envelopes_requires_both_sides() {
        let p = pair(1, 2);
        let g = EnvelopeGenerator::new(
            config(),
            Arc::new(ConstantScattering { strength: 1e-3 }),
            Arc::new(OmniBeam::default()),
            Arc::new(OmniBeam::default()),
        )
        .unwrap();
        p.update_eigenverbs(SensorId(1), collection()).unwrap();
        assert!(matches!(
            p.compute_envelopes(&g, 1),
            Err(PairError::MissingEigenverbs { .. })
        ));
        p.update_eigenverbs(SensorId(2), collection()).unwrap();
        let cycle = p.compute_envelopes(&g, 1).unwrap();
        assert_eq!(cycle.rendered, 1);
        let parallel = p.compute_envelopes(&g, 3).unwrap();
        assert_eq!(parallel, cycle);
        assert_eq!(p.envelopes().unwrap().metrics().rendered, 2);

        p.reset_envelopes();
        assert_eq!(p.envelopes().unwrap().metrics().rendered, 0);
    }
}
