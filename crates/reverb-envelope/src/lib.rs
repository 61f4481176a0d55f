//! Reverberation envelopes from overlapping Gaussian eigenverbs.
//!
//! The [`model`] module integrates the overlap of one source and one
//! receiver eigenverb analytically and renders it as a Gaussian pulse.
//! [`EnvelopeCollection`] accumulates those pulses per (azimuth, source
//! beam, receiver beam) cell, and [`EnvelopeGenerator`] drives a full
//! reverberation cycle for a sensor pair, optionally across a worker pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collection;
pub mod config;
pub mod generator;
pub mod metrics;
pub mod model;

pub use collection::{to_db, EnvelopeCollection, EnvelopeView};
pub use config::{db_to_linear, EnvelopeConfig};
pub use generator::EnvelopeGenerator;
pub use metrics::EnvelopeMetrics;
pub use model::{overlap, render, Contribution, Overlap};
