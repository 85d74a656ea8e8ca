//! # Core Models Module
//!
//! Data structures describing a walker: the periodic simulation cell, the rigid
//! bead chains inside it, and the serializable snapshot types used by the
//! checkpoint and trajectory bridges.
//!
//! ## Key Components
//!
//! - [`cell`] - Periodic cell matrix with volume, aspect-ratio, and angle queries
//! - [`chain`] - Rigid-bond bead chains and their scoped snapshots
//! - [`walker`] - A complete walker (cell + chains) and its serialized form
//! - [`ids`] - Unique walker identifiers for the geometry engine's arena

pub mod cell;
pub mod chain;
pub mod ids;
pub mod walker;
