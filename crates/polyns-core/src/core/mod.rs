//! # Core Module
//!
//! This module provides the fundamental building blocks for nested sampling of
//! hard-sphere polymer systems: the data models for periodic cells and bead chains,
//! and the geometry engine that owns per-walker state.
//!
//! ## Overview
//!
//! The core module implements the representation of a walker (one independently
//! evolving periodic simulation cell filled with rigid-bond bead chains) together
//! with the geometric primitives the Monte Carlo machinery is built on: overlap
//! detection, chain growth, and the elementary configurational moves.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Cells, bead chains, walkers, and their ids
//! - **Geometry Engine** ([`geometry`]) - Walker arena, hard-sphere overlap tests,
//!   chain growth, and primitive moves (translate, rotate, dihedral, resize, cell deltas)
//!
//! ## Scientific Foundation
//!
//! Chains are modeled as tangent hard spheres: unit bead diameter, unit bond length,
//! fixed tetrahedral bond angles, and free dihedral rotations. The only interaction
//! is hard-sphere exclusion, so every move's acceptance weight is either zero
//! (overlapping) or a purely entropic factor.

pub mod geometry;
pub mod models;
