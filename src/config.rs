/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the configuration value shared by the expansion kernels.
//
// Created on: 09 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use serde::{Deserialize, Serialize};

use crate::Point;

/// Parameters fixed at kernel construction.
///
/// The expansion order trades accuracy against cost: truncation error decays
/// geometrically in `order` for well-separated boxes, while the translation
/// operators cost O(order^4). The remaining fields are numerical conventions
/// that rarely need changing.
///
/// ### Default Values
/// - `order`: `5`
/// - `eps`: `1e-12`
/// - `eps2`: `0.0`
/// - `xperiodic`: `[0.0, 0.0, 0.0]`
#[derive(Debug, Copy, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Truncation degree of the multipole and local expansions.
    pub order: usize,

    /// Regularization floor used in the coefficient tables and in the
    /// spherical coordinate conversion. Divisions that could touch zero are
    /// seeded with this value; the factors cancel algebraically, so it only
    /// keeps intermediates finite.
    pub eps: f64,

    /// Softening added to squared distances in the direct Laplace sum. With
    /// the default of zero, coincident source/target pairs are excluded
    /// exactly instead of softened.
    pub eps2: f64,

    /// Additive periodic image shift applied inside the far-field operators
    /// and the direct sum. Zero in the non-periodic case.
    pub xperiodic: Point,
}

impl KernelConfig {
    /// Returns the configuration for the given expansion order with default
    /// numerical conventions.
    pub fn new(order: usize) -> Self {
        Self {
            order,
            eps: 1e-12,
            eps2: 0.0,
            xperiodic: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_non_periodic() {
        let config = KernelConfig::default();
        assert_eq!(config.order, 5);
        assert_eq!(config.eps2, 0.0);
        assert_eq!(config.xperiodic, [0.0, 0.0, 0.0]);
    }
}
