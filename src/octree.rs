/////////////////////////////////////////////////////////////////////////////////////////////
//
// Constructs the flat-array Morton octree that groups bodies into a hierarchy of boxes.
//
// Created on: 10 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::{Mat, MatRef};
use rayon::prelude::*;
use std::ops::Range;

use crate::morton::{BoundingBox, MortonCoder, LEVELS};
use crate::traits::FmmError;
use crate::utils::row_to_point;
use crate::Point;

/// One box of the tree.
///
/// `key` is the octal path from the root with a sentinel top bit: the root is
/// 1 and each child appends three bits, `key * 8 + octant`. For leaf boxes
/// `child_begin..child_end` indexes body positions; for internal boxes it
/// indexes child records in the same flat array.
#[derive(Debug, Copy, Clone)]
struct BoxRecord {
    key: u32,
    parent: u32,
    child_begin: u32,
    child_end: u32,
    leaf: bool,
}

/// Depth of a box key, 0 for the root.
#[inline(always)]
fn key_level(key: u32) -> u32 {
    (31 - key.leading_zeros()) / 3
}

/// Smallest full-resolution Morton code contained in the box.
#[inline(always)]
fn code_lower_bound(key: u32) -> u32 {
    let shift = 3 * (LEVELS - key_level(key));
    (key << shift) ^ (1 << (3 * LEVELS))
}

/// Largest full-resolution Morton code contained in the box.
#[inline(always)]
fn code_upper_bound(key: u32) -> u32 {
    let shift = 3 * (LEVELS - key_level(key));
    code_lower_bound(key) | ((1 << shift) - 1)
}

/// A linear octree over a fixed set of 3D bodies.
///
/// Construction sorts the bodies by Morton code and splits every box whose
/// population exceeds the critical occupancy into its non-empty octants. The
/// box array is laid out breadth first, so a linear scan visits the tree
/// level by level and `level_range` slices it without indirection. Boxes are
/// addressed by plain indices; all navigation goes through accessor methods
/// on the tree handle.
#[derive(Debug)]
pub struct Octree {
    coder: MortonCoder,
    points: Mat<f64>,
    codes: Vec<u32>,
    permutation: Vec<usize>,
    boxes: Vec<BoxRecord>,
    level_offset: Vec<usize>,
}

impl Octree {
    /// Builds the tree over `points` (an (N, 3) matrix) contained in
    /// `bounds`, splitting boxes holding more than `ncrit` bodies.
    ///
    /// Returns [`FmmError::OutOfDomain`] if any point lies outside `bounds`.
    pub fn new(points: MatRef<'_, f64>, bounds: BoundingBox, ncrit: usize) -> Result<Self, FmmError> {
        debug_assert!(ncrit >= 1, "critical occupancy must be positive");
        let ncrit = ncrit.max(1);
        let n = points.nrows();
        let coder = MortonCoder::new(bounds);

        let coded: Vec<Result<u32, FmmError>> = points
            .par_row_iter()
            .map(|row| coder.code(row_to_point(row)))
            .collect();

        let mut pairs = Vec::with_capacity(n);
        for (index, code) in coded.into_iter().enumerate() {
            pairs.push((code?, index));
        }
        pairs.par_sort_unstable();

        let permutation: Vec<usize> = pairs.iter().map(|&(_, index)| index).collect();
        let codes: Vec<u32> = pairs.iter().map(|&(code, _)| code).collect();
        let points = Mat::from_fn(n, 3, |i, j| points[(permutation[i], j)]);

        let mut boxes = vec![BoxRecord {
            key: 1,
            parent: 0,
            child_begin: 0,
            child_end: n as u32,
            leaf: false,
        }];
        let mut level_offset = vec![0usize];

        let mut k = 0;
        while k < boxes.len() {
            let population = (boxes[k].child_end - boxes[k].child_begin) as usize;
            // Boxes at full code resolution can hold coincident codes; they
            // must stop splitting regardless of population.
            if population <= ncrit || key_level(boxes[k].key) == LEVELS {
                boxes[k].leaf = true;
                k += 1;
                continue;
            }

            let parent_key = boxes[k].key;
            let body_begin = boxes[k].child_begin as usize;
            let body_end = boxes[k].child_end as usize;

            // Splitting turns the body offsets into child box offsets.
            boxes[k].child_begin = boxes.len() as u32;
            boxes[k].child_end = boxes.len() as u32;

            for octant in 0..8u32 {
                let child_key = (parent_key << 3) | octant;
                let slice = &codes[body_begin..body_end];
                let begin = body_begin + slice.partition_point(|&c| c < code_lower_bound(child_key));
                let end = body_begin + slice.partition_point(|&c| c <= code_upper_bound(child_key));
                if end > begin {
                    boxes[k].child_end += 1;
                    if key_level(child_key) as usize >= level_offset.len() {
                        level_offset.push(boxes.len());
                    }
                    boxes.push(BoxRecord {
                        key: child_key,
                        parent: k as u32,
                        child_begin: begin as u32,
                        child_end: end as u32,
                        leaf: false,
                    });
                }
            }
            k += 1;
        }
        level_offset.push(boxes.len());

        Ok(Self {
            coder,
            points,
            codes,
            permutation,
            boxes,
            level_offset,
        })
    }

    /// The bounding box the tree was built in.
    pub fn bounding_box(&self) -> BoundingBox {
        self.coder.bounding_box()
    }

    /// Number of bodies in the tree.
    pub fn bodies(&self) -> usize {
        self.points.nrows()
    }

    /// Number of boxes in the tree.
    pub fn num_boxes(&self) -> usize {
        self.boxes.len()
    }

    /// Number of populated levels; the root alone counts as one.
    pub fn levels(&self) -> usize {
        self.level_offset.len() - 1
    }

    /// Index of the root box.
    pub fn root(&self) -> usize {
        0
    }

    /// Position of a body in Morton-sorted order.
    pub fn point(&self, body: usize) -> Point {
        row_to_point(self.points.row(body))
    }

    /// All body positions in Morton-sorted order, as an (N, 3) matrix.
    pub fn points(&self) -> MatRef<'_, f64> {
        self.points.as_ref()
    }

    /// Morton code of a body in sorted order.
    pub fn morton_code(&self, body: usize) -> u32 {
        self.codes[body]
    }

    /// For each sorted slot, the index the body had in the caller's input.
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// The octal path key of a box.
    pub fn key(&self, b: usize) -> u32 {
        self.boxes[b].key
    }

    /// Depth of a box, 0 for the root.
    pub fn level(&self, b: usize) -> u32 {
        key_level(self.boxes[b].key)
    }

    pub fn is_leaf(&self, b: usize) -> bool {
        self.boxes[b].leaf
    }

    /// Index of the parent box; the root is its own parent.
    pub fn parent(&self, b: usize) -> usize {
        self.boxes[b].parent as usize
    }

    /// Center of a box.
    pub fn center(&self, b: usize) -> Point {
        let cell = self.coder.cell(code_lower_bound(self.boxes[b].key));
        let half = self.extent(b) / 2.0;
        let min = cell.min();
        [min[0] + half, min[1] + half, min[2] + half]
    }

    /// Side length of a box.
    pub fn extent(&self, b: usize) -> f64 {
        self.bounding_box().extent() / (1u32 << self.level(b)) as f64
    }

    /// Indices of the child boxes of an internal box.
    pub fn child_range(&self, b: usize) -> Range<usize> {
        debug_assert!(!self.boxes[b].leaf, "leaf boxes have no child boxes");
        self.boxes[b].child_begin as usize..self.boxes[b].child_end as usize
    }

    /// Indices of the bodies inside a box, leaf or internal.
    ///
    /// For internal boxes the range spans the whole subtree, found by chasing
    /// the leftmost and rightmost leaf descendants.
    pub fn body_range(&self, b: usize) -> Range<usize> {
        if self.boxes[b].leaf {
            return self.boxes[b].child_begin as usize..self.boxes[b].child_end as usize;
        }

        let mut first = self.boxes[b].child_begin as usize;
        while !self.boxes[first].leaf {
            first = self.boxes[first].child_begin as usize;
        }
        let mut last = self.boxes[b].child_end as usize - 1;
        while !self.boxes[last].leaf {
            last = self.boxes[last].child_end as usize - 1;
        }
        self.boxes[first].child_begin as usize..self.boxes[last].child_end as usize
    }

    /// Indices of all boxes at the given depth.
    pub fn level_range(&self, level: usize) -> Range<usize> {
        self.level_offset[level]..self.level_offset[level + 1]
    }
}
