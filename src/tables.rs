/////////////////////////////////////////////////////////////////////////////////////////////
//
// Precomputes the factorial, normalization, and M2L coupling tables for a fixed order.
//
// Created on: 12 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use num_complex::Complex64;

use crate::utils::{ipow, odd_even};

/// Coefficient tables shared by every translation operator of a kernel.
///
/// For expansion order P:
/// * `factorial[n] = n!` for `n < P`,
/// * `prefactor[n*n + n + m] = sqrt((n - |m|)! / (n + |m|)!)` for
///   `n < 2P`, `-n <= m <= n`,
/// * `anm[n*n + n + m] = (-1)^n / sqrt((n - m)! (n + m)!)` over the same
///   range, with the factorial accumulators seeded at `eps` instead of 1,
/// * `cnm[(j*j + j + k) * P*P + n*n + n + m]` is the dense M2L coupling
///   tensor `i^(|k-m|-|k|-|m|) (-1)^j A_nm A_jk / A_(j+n)(m-k)`, scaled by
///   `eps`.
///
/// The `eps` seeding makes every `anm` entry carry a factor `1/eps` which the
/// trailing `eps` multiplications in `cnm`, M2M and L2L cancel exactly, so no
/// intermediate quotient can divide by zero while the final operators remain
/// algebraically unchanged.
#[derive(Debug, Clone)]
pub struct CoefficientTables {
    pub factorial: Vec<f64>,
    pub prefactor: Vec<f64>,
    pub anm: Vec<f64>,
    pub cnm: Vec<Complex64>,
}

impl CoefficientTables {
    pub fn new(order: usize, eps: f64) -> Self {
        let p = order as i64;

        let mut factorial = vec![1.0; order];
        for n in 1..order {
            factorial[n] = factorial[n - 1] * n as f64;
        }

        let mut prefactor = vec![0.0; 4 * order * order];
        let mut anm = vec![0.0; 4 * order * order];
        for n in 0..2 * p {
            for m in -n..=n {
                let nm = (n * n + n + m) as usize;
                let mut fnmm = eps;
                for i in 1..=(n - m) {
                    fnmm *= i as f64;
                }
                let mut fnpm = eps;
                for i in 1..=(n + m) {
                    fnpm *= i as f64;
                }
                let mut fnma = 1.0;
                for i in 1..=(n - m.abs()) {
                    fnma *= i as f64;
                }
                let mut fnpa = 1.0;
                for i in 1..=(n + m.abs()) {
                    fnpa *= i as f64;
                }
                prefactor[nm] = (fnma / fnpa).sqrt();
                anm[nm] = odd_even(n) / (fnmm * fnpm).sqrt();
            }
        }

        let mut cnm = vec![Complex64::new(0.0, 0.0); order.pow(4)];
        let mut jknm = 0usize;
        for j in 0..p {
            for k in -j..=j {
                let jk = (j * j + j + k) as usize;
                for n in 0..p {
                    for m in -n..=n {
                        let nm = (n * n + n + m) as usize;
                        let jnkm = ((j + n) * (j + n) + j + n + m - k) as usize;
                        cnm[jknm] = ipow(((k - m).abs() - k.abs() - m.abs()) as i64)
                            * (odd_even(j) * anm[nm] * anm[jk] / anm[jnkm] * eps);
                        jknm += 1;
                    }
                }
            }
        }

        Self {
            factorial,
            prefactor,
            anm,
            cnm,
        }
    }
}
