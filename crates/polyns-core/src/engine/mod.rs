//! # Engine Module
//!
//! The Monte Carlo logic core: everything between the geometry primitives and
//! the nested-sampling protocol.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Run parameters, intervals, and validation
//! - **Step Sizes** ([`step_sizes`]) - The six adjustable maximum step sizes with
//!   their floor and ceiling clamps
//! - **Move Engine** ([`moves`]) - One constrained Monte Carlo sweep: move-type
//!   selection, dispatch, acceptance, and per-type statistics
//! - **Shape Moves** ([`shape`]) - Shear and stretch cell deformations gated by
//!   aspect-ratio and cell-angle limits
//! - **Calibration** ([`calibration`]) - Acceptance-rate feedback control of the
//!   step sizes via short single-move-type sweeps
//! - **Walker Pool** ([`pool`]) - Cached walker volumes, the scratch slot, and
//!   maximum-volume bookkeeping
//! - **Checkpointing** ([`checkpoint`]) - Serialization bridge for restartable runs
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - Engine-specific error types

pub mod calibration;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod moves;
pub mod pool;
pub mod progress;
pub mod shape;
pub mod step_sizes;
