//! # Workflows Module
//!
//! Top-level entry points for users of the library. A workflow owns the whole
//! pipeline for one run: population setup, the nested sampling iteration loop,
//! progress reporting, trajectory and eviction output, and checkpointing.
//!
//! ## Overview
//!
//! - **Sampling Workflow** ([`sample`]) - Complete nested sampling runs over a
//!   hard-sphere polymer population, either from scratch or resumed from a
//!   restart checkpoint.

pub mod sample;
