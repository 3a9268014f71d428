/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API for the Spherical Harmonic Fast Multipole Method (SHFMM) crate.
//
// Created on: 09 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Spherical Harmonic Fast Multipole Method (SHFMM)
//!
//! This crate implements the hierarchical core of a 3D fast multipole method
//! built on spherical harmonic expansions, specialized for the Laplace (1/r)
//! kernel and reused, by vector-valued composition, for the Stokes kernel.
//!
//! Where its sibling crate `ferreus_bbfmm` approximates arbitrary smooth
//! kernels with Chebyshev interpolation, `ferreus_shfmm` carries the analytic
//! expansions: truncation order is the only approximation and the error
//! decays geometrically in the expansion order for well-separated boxes.
//!
//! # Features:
//! - Morton-coded linear octree with breadth-first box layout and
//!   level-sliced iteration
//! - The seven translation operators (P2M, M2M, M2L, M2P, L2L, L2P, P2P)
//!   over complex spherical harmonic expansions
//! - Stokeslet and stresslet modes of the Stokes kernel, expressed as four
//!   coupled Laplace expansions
//! - Optional periodic image shift applied inside the far-field operators
//!
//! The dual-tree traversal that decides which box pairs interact through
//! which operator is deliberately not part of this crate: the operators are
//! exposed through the [`Kernel`] trait so a driver is free to implement
//! dual-tree, single-tree, or list-based interaction schemes on top.
//!
//! # Example: translating a point charge
//!
//! ```
//! use ferreus_shfmm::{Kernel, KernelConfig, LaplaceSpherical};
//!
//! let kernel = LaplaceSpherical::new(KernelConfig::new(5)).unwrap();
//!
//! // One unit charge at the origin, observed at (0.9, 0, 0).
//! let source = [0.0, 0.0, 0.0];
//! let target = [0.9, 0.0, 0.0];
//!
//! // Expand the source about a nearby center...
//! let m_center = [0.125, 0.0, 0.0];
//! let mut multipole = kernel.init_multipole([0.25, 0.25, 0.25], 1);
//! kernel.particle_to_multipole(source, &1.0, m_center, &mut multipole);
//!
//! // ...translate it to a local expansion near the target...
//! let l_center = [0.875, 0.0, 0.0];
//! let mut local = kernel.init_local([0.25, 0.25, 0.25], 1);
//! kernel.multipole_to_local(&multipole, &mut local, [0.75, 0.0, 0.0]);
//!
//! // ...and evaluate. The potential approaches 1 / 0.9 as the order grows.
//! let mut result = [0.0; 4];
//! kernel.local_to_particle(&local, l_center, target, &mut result);
//! assert!((result[0] - 1.0 / 0.9).abs() < 1e-3);
//! ```
//!
//! # Example: building an octree
//!
//! ```
//! use ferreus_shfmm::{BoundingBox, Octree};
//! use faer::Mat;
//! use rand::rngs::StdRng;
//! use rand::{Rng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let points = Mat::from_fn(500, 3, |_, _| rng.random_range(-1.0..1.0));
//!
//! let bounds = BoundingBox::new([0.0, 0.0, 0.0], 1.5);
//! let tree = Octree::new(points.as_ref(), bounds, 16).unwrap();
//!
//! assert_eq!(tree.bodies(), 500);
//! for b in 0..tree.num_boxes() {
//!     if tree.is_leaf(b) {
//!         // No leaf holds more bodies than the critical occupancy.
//!         assert!(tree.body_range(b).len() <= 16);
//!     }
//! }
//! ```
//!
//! # References
//!
//! 1. Greengard, L., & Rokhlin, V. (1987).
//!    *A fast algorithm for particle simulations.*
//!    *Journal of Computational Physics*, **73**(2), 325-348.
//!
//! 2. Yokota, R., & Barba, L. A. (2011).
//!    *Treecode and fast multipole method for N-body simulation with CUDA.*
//!    *GPU Computing Gems Emerald Edition*, 113-132.
//!
//! 3. Tornberg, A.-K., & Greengard, L. (2008).
//!    *A fast multipole method for the three-dimensional Stokes equations.*
//!    *Journal of Computational Physics*, **227**(3), 1613-1619.

mod config;
mod harmonics;
mod laplace;
mod morton;
mod octree;
mod stokes;
mod tables;
mod traits;
mod utils;

/// A position or displacement in 3D space.
pub type Point = [f64; 3];

#[doc(inline)]
pub use {
    config::KernelConfig,
    laplace::{LaplaceSpherical, Local, Multipole},
    morton::{BoundingBox, MortonCoder, LEVELS},
    octree::Octree,
    stokes::{StokesMode, StokesSpherical},
    tables::CoefficientTables,
    traits::{FmmError, Kernel},
    utils::{l1_rel_error, l2_error, l2_rel_error},
};
