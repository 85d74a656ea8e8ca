//! # polyns Core Library
//!
//! A nested-sampling engine for ensembles of periodic simulation cells filled with
//! hard-sphere polymer chains, estimating a configurational density-of-states by
//! repeatedly replacing the largest-volume cell with a perturbed clone of another.
//!
//! ## Architectural Philosophy
//!
//! The library is designed with a strict three-layer architecture to ensure a clear
//! separation of concerns, making it modular, testable, and extensible.
//!
//! - **[`core`]: The Foundation.** Contains the data models (`SimulationCell`,
//!   `BeadChain`, `Walker`) and the hard-sphere geometry engine that owns per-walker
//!   coordinates, detects chain overlap, and implements the primitive moves.
//!
//! - **[`engine`]: The Logic Core.** This stateful layer implements the Monte Carlo
//!   machinery: the multi-move sweep engine, the shape-constrained cell deformation
//!   moves, the adaptive step-size controller, and walker-pool bookkeeping with its
//!   checkpoint bridge.
//!
//! - **[`workflows`]: The Public API.** The highest-level, user-facing layer. It ties
//!   the `engine` and `core` together to execute the full nested-sampling protocol
//!   and is the entry point for end-users of the library.

pub mod core;
pub mod engine;
pub mod workflows;
