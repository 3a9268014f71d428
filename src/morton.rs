/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the cubic bounding box and the 30-bit Morton coder used by the octree.
//
// Created on: 10 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::MatRef;

use crate::traits::FmmError;
use crate::utils::row_to_point;
use crate::Point;

/// Number of refinement levels resolved by a Morton code: 10 bits per axis.
pub const LEVELS: u32 = 10;

/// Number of cells along one axis at full code resolution.
const AXIS_CELLS: u32 = 1 << LEVELS;

/// An axis-aligned cube.
///
/// The box is cubic by construction (center plus half side length), which the
/// Morton coder relies on: one quantization scale serves all three axes.
#[derive(Debug, Copy, Clone)]
pub struct BoundingBox {
    min: Point,
    max: Point,
}

impl BoundingBox {
    /// Creates the cube centered at `center` with half side length `radius`.
    pub fn new(center: Point, radius: f64) -> Self {
        Self {
            min: [center[0] - radius, center[1] - radius, center[2] - radius],
            max: [center[0] + radius, center[1] + radius, center[2] + radius],
        }
    }

    /// Fits a cube around a point cloud.
    ///
    /// The center is snapped to the nearest integer coordinate and the radius
    /// is the largest distance from that center to any coordinate extreme,
    /// inflated by a small leeway so boundary points stay strictly inside.
    pub fn from_points(points: MatRef<'_, f64>) -> Self {
        let first = row_to_point(points.row(0));
        let mut xmin = first;
        let mut xmax = first;
        for i in 1..points.nrows() {
            let p = row_to_point(points.row(i));
            for d in 0..3 {
                if p[d] < xmin[d] {
                    xmin[d] = p[d];
                } else if p[d] > xmax[d] {
                    xmax[d] = p[d];
                }
            }
        }

        let mut center = [0.0; 3];
        let mut radius: f64 = 0.0;
        for d in 0..3 {
            center[d] = ((xmax[d] + xmin[d]) / 2.0 + 0.5).trunc();
            radius = radius.max(xmax[d] - center[d]);
            radius = radius.max(center[d] - xmin[d]);
        }
        radius *= 1.000001;

        Self::new(center, radius)
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    pub fn center(&self) -> Point {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }

    /// Side length of the cube.
    pub fn extent(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    /// Whether the point lies inside the cube, boundary included.
    pub fn contains(&self, point: Point) -> bool {
        (0..3).all(|d| self.min[d] <= point[d] && point[d] <= self.max[d])
    }
}

/// Maps points inside a bounding box to 30-bit Morton codes and back.
///
/// Each axis is quantized to 10 bits and the bits are interleaved
/// `x y z x y z ...` with x contributing the most significant bit of every
/// triad, so sorting codes sorts points along the Z-order curve.
#[derive(Debug, Copy, Clone)]
pub struct MortonCoder {
    bounds: BoundingBox,
}

impl MortonCoder {
    pub fn new(bounds: BoundingBox) -> Self {
        Self { bounds }
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    /// Morton code of a point inside the bounding box.
    ///
    /// Returns [`FmmError::OutOfDomain`] for points outside the box.
    pub fn code(&self, point: Point) -> Result<u32, FmmError> {
        if !self.bounds.contains(point) {
            return Err(FmmError::OutOfDomain { point });
        }

        let cell_side = self.bounds.extent() / AXIS_CELLS as f64;
        let min = self.bounds.min();
        let mut index = [0u32; 3];
        for d in 0..3 {
            let quantized = ((point[d] - min[d]) / cell_side).floor() as u32;
            index[d] = quantized.min(AXIS_CELLS - 1);
        }

        Ok((spread_bits(index[0]) << 2) | (spread_bits(index[1]) << 1) | spread_bits(index[2]))
    }

    /// The unit sub-cube named by a full-resolution Morton code.
    pub fn cell(&self, code: u32) -> BoundingBox {
        let index = [
            compact_bits(code >> 2),
            compact_bits(code >> 1),
            compact_bits(code),
        ];

        let cell_side = self.bounds.extent() / AXIS_CELLS as f64;
        let min = self.bounds.min();
        let center = [
            min[0] + (index[0] as f64 + 0.5) * cell_side,
            min[1] + (index[1] as f64 + 0.5) * cell_side,
            min[2] + (index[2] as f64 + 0.5) * cell_side,
        ];

        BoundingBox::new(center, cell_side / 2.0)
    }
}

/// Spreads the low 10 bits of `v` so that bit i lands at position 3i.
#[inline(always)]
fn spread_bits(v: u32) -> u32 {
    let mut v = v & 0x0000_03ff;
    v = (v | (v << 16)) & 0x0300_00ff;
    v = (v | (v << 8)) & 0x0300_f00f;
    v = (v | (v << 4)) & 0x030c_30c3;
    v = (v | (v << 2)) & 0x0924_9249;
    v
}

/// Inverse of [`spread_bits`]: gathers every third bit back into 10 bits.
#[inline(always)]
fn compact_bits(v: u32) -> u32 {
    let mut v = v & 0x0924_9249;
    v = (v | (v >> 2)) & 0x030c_30c3;
    v = (v | (v >> 4)) & 0x0300_f00f;
    v = (v | (v >> 8)) & 0x0300_00ff;
    v = (v | (v >> 16)) & 0x0000_03ff;
    v
}
