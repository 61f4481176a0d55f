//! One reverberation cycle: every receiver eigenverb against every source
//! eigenverb on the same interface.
//!
//! [`EnvelopeGenerator::run`] accumulates sequentially into a fresh
//! collection. [`EnvelopeGenerator::run_parallel`] splits the receiver
//! eigenverbs into chunks, feeds them to a pool of scoped worker threads
//! over a crossbeam channel, and merges the per-worker collections.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::Receiver;
use reverb_core::{
    BeamPattern, Eigenverb, EigenverbCollection, EnvelopeError, Interface, ScatteringModel,
};
use tracing::debug;

use crate::collection::EnvelopeCollection;
use crate::config::EnvelopeConfig;

/// Receiver eigenverbs handed to a worker per task.
const CHUNK_SIZE: usize = 64;

/// A contiguous run of receiver eigenverbs on one interface.
struct Task {
    interface: usize,
    start: usize,
    end: usize,
}

/// Per-thread gain buffers, reused across eigenverb pairs.
struct Scratch {
    scatter: Vec<f64>,
    src_beam: Vec<f64>,
    rcv_beam: Vec<f64>,
    level: Vec<f64>,
}

impl Scratch {
    fn new(config: &EnvelopeConfig) -> Self {
        let nf = config.num_frequencies();
        Self {
            scatter: vec![0.0; nf],
            src_beam: vec![0.0; nf * config.num_src_beams],
            rcv_beam: vec![0.0; nf * config.num_rcv_beams],
            level: vec![0.0; nf],
        }
    }
}

/// Fill a frequency-major (frequency × beam) gain matrix.
fn fill_beam_gains(
    pattern: &dyn BeamPattern,
    de: f64,
    az: f64,
    frequencies: &[f64],
    level: &mut [f64],
    out: &mut [f64],
) {
    let beams = pattern.num_beams();
    for beam in 0..beams {
        pattern.beam_level(beam, de, az, frequencies, level);
        for (f, &gain) in level.iter().enumerate() {
            out[f * beams + beam] = gain;
        }
    }
}

/// Computes reverberation envelopes from the eigenverbs of a sensor pair.
///
/// The ocean scattering model and both beam patterns are external
/// collaborators supplied at construction.
pub struct EnvelopeGenerator {
    config: Arc<EnvelopeConfig>,
    scattering: Arc<dyn ScatteringModel>,
    source_beams: Arc<dyn BeamPattern>,
    receiver_beams: Arc<dyn BeamPattern>,
}

impl EnvelopeGenerator {
    /// Create a generator.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidConfig`] if the configuration is
    /// invalid, or [`EnvelopeError::ShapeMismatch`] if a beam pattern's
    /// beam count differs from the configured count.
    pub fn new(
        config: impl Into<Arc<EnvelopeConfig>>,
        scattering: Arc<dyn ScatteringModel>,
        source_beams: Arc<dyn BeamPattern>,
        receiver_beams: Arc<dyn BeamPattern>,
    ) -> Result<Self, EnvelopeError> {
        let config = config.into();
        config.validate()?;
        if source_beams.num_beams() != config.num_src_beams {
            return Err(EnvelopeError::ShapeMismatch {
                what: "source beam pattern",
                expected: config.num_src_beams,
                actual: source_beams.num_beams(),
            });
        }
        if receiver_beams.num_beams() != config.num_rcv_beams {
            return Err(EnvelopeError::ShapeMismatch {
                what: "receiver beam pattern",
                expected: config.num_rcv_beams,
                actual: receiver_beams.num_beams(),
            });
        }
        Ok(Self {
            config,
            scattering,
            source_beams,
            receiver_beams,
        })
    }

    /// Configuration shared by every collection this generator produces.
    pub fn config(&self) -> &Arc<EnvelopeConfig> {
        &self.config
    }

    fn check_inputs(
        &self,
        src: &EigenverbCollection,
        rcv: &EigenverbCollection,
    ) -> Result<(), EnvelopeError> {
        if src.num_interfaces() != rcv.num_interfaces() {
            return Err(EnvelopeError::ShapeMismatch {
                what: "receiver interfaces",
                expected: src.num_interfaces(),
                actual: rcv.num_interfaces(),
            });
        }
        for (what, collection) in [("source", src), ("receiver", rcv)] {
            if collection.frequencies() != self.config.transmit_freq.as_slice() {
                return Err(EnvelopeError::InvalidConfig {
                    reason: format!(
                        "{what} eigenverb frequencies do not match the transmit frequencies"
                    ),
                });
            }
        }
        Ok(())
    }

    /// Accumulate one receiver eigenverb against every source eigenverb
    /// on the same interface.
    fn accumulate_receiver(
        &self,
        envelopes: &mut EnvelopeCollection,
        scratch: &mut Scratch,
        interface: Interface,
        src_verbs: &[Eigenverb],
        rcv_verb: &Eigenverb,
    ) -> Result<(), EnvelopeError> {
        let freqs = self.config.transmit_freq.as_slice();
        fill_beam_gains(
            &*self.receiver_beams,
            rcv_verb.source_de,
            rcv_verb.source_az,
            freqs,
            &mut scratch.level,
            &mut scratch.rcv_beam,
        );
        for src_verb in src_verbs {
            self.scattering
                .scattering(interface, src_verb, rcv_verb, freqs, &mut scratch.scatter);
            fill_beam_gains(
                &*self.source_beams,
                src_verb.source_de,
                src_verb.source_az,
                freqs,
                &mut scratch.level,
                &mut scratch.src_beam,
            );
            match envelopes.add_contribution(
                rcv_verb.az_index,
                &scratch.scatter,
                &scratch.src_beam,
                &scratch.rcv_beam,
                src_verb,
                rcv_verb,
            ) {
                Ok(()) => {}
                // Already counted and logged by the collection.
                Err(e) if e.is_numeric() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Run one reverberation cycle on the calling thread.
    ///
    /// # Errors
    ///
    /// Interface-count, frequency-axis, and azimuth-index mismatches abort
    /// the cycle. Numeric rejections of single contributions do not; they
    /// are counted in the returned collection's metrics.
    pub fn run(
        &self,
        src: &EigenverbCollection,
        rcv: &EigenverbCollection,
    ) -> Result<EnvelopeCollection, EnvelopeError> {
        self.check_inputs(src, rcv)?;
        let mut envelopes = EnvelopeCollection::new(Arc::clone(&self.config))?;
        let mut scratch = Scratch::new(&self.config);
        for index in 0..rcv.num_interfaces() {
            let interface = Interface::from_index(index);
            let src_verbs = src.eigenverbs(index);
            if src_verbs.is_empty() {
                continue;
            }
            for rcv_verb in rcv.eigenverbs(index) {
                self.accumulate_receiver(&mut envelopes, &mut scratch, interface, src_verbs, rcv_verb)?;
            }
        }
        debug!(
            rendered = envelopes.metrics().rendered,
            rejected = envelopes.metrics().rejected,
            "reverberation cycle complete"
        );
        Ok(envelopes)
    }

    fn worker_loop(
        &self,
        tasks: Receiver<Task>,
        src: &EigenverbCollection,
        rcv: &EigenverbCollection,
    ) -> Result<EnvelopeCollection, EnvelopeError> {
        let mut envelopes = EnvelopeCollection::new(Arc::clone(&self.config))?;
        let mut scratch = Scratch::new(&self.config);
        while let Ok(task) = tasks.recv() {
            let interface = Interface::from_index(task.interface);
            let src_verbs = src.eigenverbs(task.interface);
            for rcv_verb in &rcv.eigenverbs(task.interface)[task.start..task.end] {
                self.accumulate_receiver(&mut envelopes, &mut scratch, interface, src_verbs, rcv_verb)?;
            }
        }
        Ok(envelopes)
    }

    /// Run one reverberation cycle across `workers` threads.
    ///
    /// Produces the same envelopes as [`run`](Self::run) up to
    /// floating-point summation order. `workers` is clamped to at least 1.
    ///
    /// # Errors
    ///
    /// As [`run`](Self::run), plus [`EnvelopeError::WorkerFailed`] if a
    /// worker thread panics.
    pub fn run_parallel(
        &self,
        src: &EigenverbCollection,
        rcv: &EigenverbCollection,
        workers: usize,
    ) -> Result<EnvelopeCollection, EnvelopeError> {
        self.check_inputs(src, rcv)?;
        let workers = workers.max(1);
        let (task_tx, task_rx) = crossbeam_channel::unbounded();
        for index in 0..rcv.num_interfaces() {
            if src.eigenverbs(index).is_empty() {
                continue;
            }
            let n = rcv.eigenverbs(index).len();
            for start in (0..n).step_by(CHUNK_SIZE) {
                let task = Task {
                    interface: index,
                    start,
                    end: (start + CHUNK_SIZE).min(n),
                };
                // Receiver is held below, so the channel cannot be closed.
                let _ = task_tx.send(task);
            }
        }
        drop(task_tx);

        let results: Vec<Result<EnvelopeCollection, EnvelopeError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    let rx = task_rx.clone();
                    scope.spawn(move || self.worker_loop(rx, src, rcv))
                })
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(worker, handle)| {
                    handle
                        .join()
                        .unwrap_or(Err(EnvelopeError::WorkerFailed { worker }))
                })
                .collect()
        });

        let mut merged = EnvelopeCollection::new(Arc::clone(&self.config))?;
        for result in results {
            merged.merge(&result?)?;
        }
        debug!(
            workers,
            rendered = merged.metrics().rendered,
            rejected = merged.metrics().rejected,
            "parallel reverberation cycle complete"
        );
        Ok(merged)
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<EnvelopeGenerator>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use reverb_core::{ConstantScattering, OmniBeam, Position};
    use smallvec::smallvec;

    fn generator(num_src_beams: usize) -> EnvelopeGenerator {
        let config = EnvelopeConfig {
            num_times: 200,
            threshold: 0.0,
            num_src_beams,
            ..EnvelopeConfig::new(vec![1000.0])
        };
        EnvelopeGenerator::new(
            config,
            Arc::new(ConstantScattering { strength: 1e-3 }),
            Arc::new(OmniBeam {
                beams: num_src_beams,
            }),
            Arc::new(OmniBeam::default()),
        )
        .unwrap()
    }

    fn verb(east: f64) -> Eigenverb {
        Eigenverb {
            time: 4.0,
            power: smallvec![1e-2],
            length: 500.0,
            width: 200.0,
            position: Position::new(east, 0.0, -200.0),
            direction: 0.0,
            grazing: 0.3,
            sound_speed: 1500.0,
            de_index: 0,
            az_index: 0,
            source_de: -0.3,
            source_az: 0.0,
            surface: 0,
            bottom: 1,
            caustic: 0,
            upper: 0,
            lower: 0,
        }
    }

    #[test]
    fn new_rejects_mismatched_beam_count() {
        let err = EnvelopeGenerator::new(
            EnvelopeConfig::new(vec![1000.0]),
            Arc::new(ConstantScattering { strength: 1.0 }),
            Arc::new(OmniBeam { beams: 2 }),
            Arc::new(OmniBeam::default()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, EnvelopeError::ShapeMismatch { .. }));
    }

    #[test]
    fn run_rejects_frequency_mismatch() {
        let g = generator(1);
        let src = EigenverbCollection::new(vec![2000.0], 0);
        let rcv = EigenverbCollection::new(vec![1000.0], 0);
        assert!(matches!(
            g.run(&src, &rcv),
            Err(EnvelopeError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn run_rejects_interface_mismatch() {
        let g = generator(1);
        let src = EigenverbCollection::new(vec![1000.0], 1);
        let rcv = EigenverbCollection::new(vec![1000.0], 0);
        assert!(matches!(
            g.run(&src, &rcv),
            Err(EnvelopeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn interfaces_do_not_mix() {
        let g = generator(1);
        let mut src = EigenverbCollection::new(vec![1000.0], 0);
        let mut rcv = EigenverbCollection::new(vec![1000.0], 0);
        src.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        rcv.add_eigenverb(verb(0.0), Interface::Surface).unwrap();
        let env = g.run(&src, &rcv).unwrap();
        assert_eq!(env.metrics().rendered, 0);
        assert_eq!(env.total_energy(0, 0, 0).unwrap(), vec![0.0]);
    }

    #[test]
    fn run_renders_every_pairing() {
        let g = generator(2);
        let mut src = EigenverbCollection::new(vec![1000.0], 0);
        let mut rcv = EigenverbCollection::new(vec![1000.0], 0);
        for east in [0.0, 100.0, 200.0] {
            src.add_eigenverb(verb(east), Interface::Bottom).unwrap();
        }
        rcv.add_eigenverb(verb(50.0), Interface::Bottom).unwrap();
        rcv.add_eigenverb(verb(150.0), Interface::Bottom).unwrap();
        let env = g.run(&src, &rcv).unwrap();
        // 3 × 2 pairings × 2 source beams.
        assert_eq!(env.metrics().rendered, 12);
        assert_eq!(
            env.total_energy(0, 0, 0).unwrap(),
            env.total_energy(0, 1, 0).unwrap()
        );
    }

    #[test]
    fn numeric_rejection_does_not_abort_cycle() {
        let g = generator(1);
        let mut src = EigenverbCollection::new(vec![1000.0], 0);
        let mut rcv = EigenverbCollection::new(vec![1000.0], 0);
        let mut bad = verb(0.0);
        bad.length = 0.0;
        src.add_eigenverb(bad, Interface::Bottom).unwrap();
        src.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        rcv.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        let env = g.run(&src, &rcv).unwrap();
        assert_eq!(env.metrics().rejected, 1);
        assert_eq!(env.metrics().rendered, 1);
    }

    #[test]
    fn azimuth_out_of_range_aborts_cycle() {
        let g = generator(1);
        let mut src = EigenverbCollection::new(vec![1000.0], 0);
        let mut rcv = EigenverbCollection::new(vec![1000.0], 0);
        src.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        let mut r = verb(0.0);
        r.az_index = 3;
        rcv.add_eigenverb(r, Interface::Bottom).unwrap();
        assert!(matches!(
            g.run(&src, &rcv),
            Err(EnvelopeError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            g.run_parallel(&src, &rcv, 2),
            Err(EnvelopeError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn parallel_with_zero_workers_runs_on_one() {
        let g = generator(1);
        let mut src = EigenverbCollection::new(vec![1000.0], 0);
        let mut rcv = EigenverbCollection::new(vec![1000.0], 0);
        src.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        rcv.add_eigenverb(verb(0.0), Interface::Bottom).unwrap();
        let env = g.run_parallel(&src, &rcv, 0).unwrap();
        assert_eq!(env.metrics().rendered, 1);
    }
}
