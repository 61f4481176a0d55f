//! Sensor pairs and the registry that builds and routes them.
//!
//! A [`SensorPair`] caches the latest propagation results for one
//! (source, receiver) combination in independently guarded
//! [`SnapshotSlot`]s. The [`SensorPairRegistry`] decides which sensors
//! interact, owns the resulting pairs, and forwards each sensor's eigenray
//! and eigenverb updates to every pair the sensor belongs to.
//!
//! All types here are `Send + Sync`. Sensors publish from their own
//! threads; readers take `Arc` snapshots without blocking writers for
//! longer than a handle swap.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod pair;
pub mod registry;
pub mod slot;

pub use config::{ConfigError, ReverbConfig};
pub use pair::SensorPair;
pub use registry::{Fathometer, RegistryError, SensorPairRegistry, SensorSpec, TransmitMode};
pub use slot::SnapshotSlot;
