//! Core types and traits for the reverb sensor-pair framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the value types produced by upstream propagation (eigenrays and
//! eigenverbs), sensor identifiers, error types, and the capability
//! traits that connect sensors, pairs, and the ocean/beam collaborators.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod eigenray;
pub mod eigenverb;
pub mod error;
pub mod id;
pub mod traits;

pub use eigenray::{Eigenray, EigenrayList};
pub use eigenverb::{Eigenverb, EigenverbCollection, Interface, Position};
pub use error::{EnvelopeError, PairError};
pub use id::{FrequencyVec, Generation, PairKey, SensorId};
pub use traits::{BeamPattern, ConstantScattering, OmniBeam, ScatteringModel, SensorListener};
