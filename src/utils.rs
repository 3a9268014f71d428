/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides small vector helpers, sign/phase factors, and error norms for result comparison.
//
// Created on: 09 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::RowRef;
use num_complex::Complex64;

use crate::Point;

/// Reads a 3D point out of a matrix row.
#[inline(always)]
pub fn row_to_point(row: RowRef<'_, f64>) -> Point {
    [row[0], row[1], row[2]]
}

#[inline(always)]
pub fn sub(a: Point, b: Point) -> Point {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline(always)]
pub fn dot(a: Point, b: Point) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Squared Euclidean norm.
#[inline(always)]
pub fn norm_sq(p: Point) -> f64 {
    dot(p, p)
}

/// (-1)^n as a real factor.
#[inline(always)]
pub fn odd_even(n: i64) -> f64 {
    if n & 1 == 1 {
        -1.0
    } else {
        1.0
    }
}

/// i^k for any integer exponent, including negative ones.
#[inline(always)]
pub fn ipow(k: i64) -> Complex64 {
    match k.rem_euclid(4) {
        0 => Complex64::new(1.0, 0.0),
        1 => Complex64::new(0.0, 1.0),
        2 => Complex64::new(-1.0, 0.0),
        _ => Complex64::new(0.0, -1.0),
    }
}

/// Absolute L2 error between a computed and a reference result.
pub fn l2_error(approx: &[f64], exact: &[f64]) -> f64 {
    approx
        .iter()
        .zip(exact.iter())
        .map(|(a, e)| (a - e) * (a - e))
        .sum::<f64>()
        .sqrt()
}

/// L2 error relative to the norm of the reference result.
pub fn l2_rel_error(approx: &[f64], exact: &[f64]) -> f64 {
    let scale = exact.iter().map(|e| e * e).sum::<f64>().sqrt();
    l2_error(approx, exact) / scale
}

/// L1 error relative to the L1 norm of the reference result.
pub fn l1_rel_error(approx: &[f64], exact: &[f64]) -> f64 {
    let num: f64 = approx
        .iter()
        .zip(exact.iter())
        .map(|(a, e)| (a - e).abs())
        .sum();
    let den: f64 = exact.iter().map(|e| e.abs()).sum();
    num / den
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipow_cycles_with_period_four() {
        let i = Complex64::new(0.0, 1.0);
        for k in -8i64..=8 {
            let mut expected = Complex64::new(1.0, 0.0);
            if k >= 0 {
                for _ in 0..k {
                    expected *= i;
                }
            } else {
                for _ in 0..(-k) {
                    expected /= i;
                }
            }
            let got = ipow(k);
            assert!((got - expected).norm() < 1e-15, "i^{} gave {}", k, got);
        }
    }

    #[test]
    fn odd_even_alternates() {
        assert_eq!(odd_even(0), 1.0);
        assert_eq!(odd_even(1), -1.0);
        assert_eq!(odd_even(2), 1.0);
        assert_eq!(odd_even(7), -1.0);
    }

    #[test]
    fn error_norms_on_known_values() {
        let exact = [3.0, 4.0];
        let approx = [3.0, 4.5];
        assert!((l2_error(&approx, &exact) - 0.5).abs() < 1e-15);
        assert!((l2_rel_error(&approx, &exact) - 0.1).abs() < 1e-15);
        assert!((l1_rel_error(&approx, &exact) - 0.5 / 7.0).abs() < 1e-15);
    }
}
