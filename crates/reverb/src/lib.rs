//! Reverb: bistatic sonar reverberation from Gaussian eigenverbs.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all reverb sub-crates. For most users, adding `reverb` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use reverb::prelude::*;
//!
//! let registry = SensorPairRegistry::new(ReverbConfig::default()).unwrap();
//! registry
//!     .add_sensor(SensorSpec::new(SensorId(1), TransmitMode::Both, vec![3000.0]))
//!     .unwrap();
//!
//! // One bottom eigenverb, published by the sensor for its monostatic pair.
//! let mut verbs = EigenverbCollection::new(vec![3000.0], 0);
//! verbs
//!     .add_eigenverb(
//!         Eigenverb {
//!             time: 2.0,
//!             power: FrequencyVec::from_elem(1e-3, 1),
//!             length: 200.0,
//!             width: 100.0,
//!             position: Position::new(0.0, 0.0, -150.0),
//!             direction: 0.0,
//!             grazing: 0.4,
//!             sound_speed: 1500.0,
//!             de_index: 0,
//!             az_index: 0,
//!             source_de: -0.4,
//!             source_az: 0.0,
//!             surface: 0,
//!             bottom: 1,
//!             caustic: 0,
//!             upper: 0,
//!             lower: 0,
//!         },
//!         Interface::Bottom,
//!     )
//!     .unwrap();
//! registry.notify_eigenverbs(SensorId(1), Arc::new(verbs)).unwrap();
//!
//! let pair = registry.pair(SensorId(1), SensorId(1)).unwrap();
//! let generator = EnvelopeGenerator::new(
//!     Arc::clone(pair.envelope_config()),
//!     Arc::new(ConstantScattering::from_db(-27.0)),
//!     Arc::new(OmniBeam::default()),
//!     Arc::new(OmniBeam::default()),
//! )
//! .unwrap();
//! let metrics = pair.compute_envelopes(&generator, 1).unwrap();
//! assert_eq!(metrics.rendered, 1);
//! assert!(pair.envelopes().unwrap().total_energy(0, 0, 0).unwrap()[0] > 0.0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `reverb-core` | Ids, eigenrays, eigenverbs, errors, collaborator traits |
//! | [`envelope`] | `reverb-envelope` | Overlap model, envelope collections, generator |
//! | [`sensors`] | `reverb-sensors` | Sensor pairs, snapshot slots, pair registry |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and ids (`reverb-core`).
///
/// Contains eigenray and eigenverb value types, [`types::SensorId`] and
/// [`types::PairKey`], error types, and the collaborator traits
/// ([`types::SensorListener`], [`types::ScatteringModel`],
/// [`types::BeamPattern`]).
pub use reverb_core as types;

/// Reverberation envelopes (`reverb-envelope`).
///
/// [`envelope::overlap`] integrates one eigenverb pair analytically,
/// [`envelope::EnvelopeCollection`] accumulates rendered pulses, and
/// [`envelope::EnvelopeGenerator`] runs a full cycle.
pub use reverb_envelope as envelope;

/// Sensor pairs and the pair registry (`reverb-sensors`).
pub use reverb_sensors as sensors;

/// Common imports for typical reverb usage.
///
/// ```rust
/// use reverb::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use reverb_core::{
        Eigenray, EigenrayList, Eigenverb, EigenverbCollection, FrequencyVec, Generation,
        Interface, PairKey, Position, SensorId, SensorListener,
    };

    // Collaborators
    pub use reverb_core::{BeamPattern, ConstantScattering, OmniBeam, ScatteringModel};

    // Errors
    pub use reverb_core::{EnvelopeError, PairError};
    pub use reverb_sensors::{ConfigError, RegistryError};

    // Envelopes
    pub use reverb_envelope::{EnvelopeCollection, EnvelopeConfig, EnvelopeGenerator, EnvelopeMetrics};

    // Sensors
    pub use reverb_sensors::{
        ReverbConfig, SensorPair, SensorPairRegistry, SensorSpec, TransmitMode,
    };
}
