/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the expansion kernel operator set consumed by tree traversals, and the error type.
//
// Created on: 09 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::MatRef;
use std::fmt;

use crate::Point;

/// Errors that can occur while building trees or constructing kernels.
#[derive(Debug)]
pub enum FmmError {
    /// A point handed to the Morton coder lies outside its bounding box.
    OutOfDomain { point: Point },

    /// The expansion order passed at kernel construction is not positive.
    InvalidOrder { order: usize },
}

impl fmt::Display for FmmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FmmError::OutOfDomain { point } => write!(
                f,
                "point ({}, {}, {}) lies outside the coder's bounding box",
                point[0], point[1], point[2]
            ),
            FmmError::InvalidOrder { order } => write!(
                f,
                "expansion order {} is invalid: the order must be at least 1",
                order
            ),
        }
    }
}

impl std::error::Error for FmmError {}

/// The operator set of a fast multipole kernel.
///
/// A tree traversal drives the seven operators below without knowing anything
/// about the expansion representation: the upward pass calls
/// [`particle_to_multipole`](Kernel::particle_to_multipole) on leaf boxes and
/// [`multipole_to_multipole`](Kernel::multipole_to_multipole) towards the root,
/// the downward pass calls [`multipole_to_local`](Kernel::multipole_to_local)
/// for well-separated pairs and [`local_to_local`](Kernel::local_to_local)
/// towards the leaves, and the leaf pass evaluates with
/// [`local_to_particle`](Kernel::local_to_particle),
/// [`multipole_to_particle`](Kernel::multipole_to_particle) and the direct
/// [`particle_to_particle`](Kernel::particle_to_particle).
///
/// Translation conventions:
/// * `multipole_to_multipole` takes `center_parent - center_child`,
/// * `multipole_to_local` takes `center_target - center_source`,
/// * `local_to_local` takes `center_child - center_parent`.
///
/// All operators accumulate into their target; they never overwrite. Operators
/// taking `&self` plus a `&mut` target may be called from multiple threads as
/// long as no two calls share a target, which the borrow rules enforce.
pub trait Kernel {
    /// Per-source strength data.
    type Charge;

    /// Per-target accumulator.
    type Result;

    /// Outgoing expansion attached to a box.
    type Multipole;

    /// Incoming expansion attached to a box.
    type Local;

    /// Number of coefficients in one scalar multipole expansion.
    fn multipole_size(&self) -> usize;

    /// Number of coefficients in one scalar local expansion.
    fn local_size(&self) -> usize;

    /// Creates a zeroed multipole expansion for a box with the given extents.
    fn init_multipole(&self, extents: Point, level: u32) -> Self::Multipole;

    /// Creates a zeroed local expansion for a box with the given extents.
    fn init_local(&self, extents: Point, level: u32) -> Self::Local;

    /// Accumulates a source particle into the multipole expansion at `center`.
    fn particle_to_multipole(
        &self,
        source: Point,
        charge: &Self::Charge,
        center: Point,
        multipole: &mut Self::Multipole,
    );

    /// Translates a child multipole expansion into its parent's.
    fn multipole_to_multipole(
        &self,
        source: &Self::Multipole,
        target: &mut Self::Multipole,
        translation: Point,
    );

    /// Converts a well-separated multipole expansion into a local expansion.
    fn multipole_to_local(
        &self,
        source: &Self::Multipole,
        target: &mut Self::Local,
        translation: Point,
    );

    /// Evaluates a multipole expansion directly at a far target point.
    fn multipole_to_particle(
        &self,
        multipole: &Self::Multipole,
        center: Point,
        target: Point,
        result: &mut Self::Result,
    );

    /// Translates a parent local expansion into a child's.
    fn local_to_local(
        &self,
        source: &Self::Local,
        target: &mut Self::Local,
        translation: Point,
    );

    /// Evaluates a local expansion at a target point inside its box.
    fn local_to_particle(
        &self,
        local: &Self::Local,
        center: Point,
        target: Point,
        result: &mut Self::Result,
    );

    /// Direct summation between a source box and a target box.
    ///
    /// `sources` and `targets` are (N, 3) and (M, 3) matrices of positions;
    /// `charges` and `results` run parallel to their rows.
    fn particle_to_particle(
        &self,
        sources: MatRef<'_, f64>,
        charges: &[Self::Charge],
        targets: MatRef<'_, f64>,
        results: &mut [Self::Result],
    );
}
