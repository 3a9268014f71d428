/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates the inner and outer solid harmonics and the spherical coordinate transforms.
//
// Created on: 12 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use num_complex::Complex64;
use std::f64::consts::PI;

use crate::Point;

// Both evaluators run the same associated Legendre recurrence
//   P_m^m     = (-1)^m (2m-1)!! sin^m(alpha)
//   P_(m+1)^m = (2m+1) cos(alpha) P_m^m
//   P_n^m     = ((2n-1) cos(alpha) P_(n-1)^m - (n+m-1) P_(n-2)^m) / (n-m)
// and differ only in the radial factor: rho^n for the inner (multipole) form,
// rho^(-n-1) for the outer (local) form. Entries for negative m follow from
// conjugation. `ynm` and `ynm_theta` must hold at least nmax^2 + nmax entries;
// callers size them 4P^2 so one buffer serves both evaluators.

/// Fills `ynm` with `rho^n Y_n^m(alpha, beta)` and `ynm_theta` with the
/// alpha-derivatives, for all `0 <= |m| <= n < nmax`.
pub fn eval_multipole(
    nmax: usize,
    rho: f64,
    alpha: f64,
    beta: f64,
    prefactor: &[f64],
    ynm: &mut [Complex64],
    ynm_theta: &mut [Complex64],
) {
    let x = alpha.cos();
    let y = alpha.sin();
    let mut fact = 1.0;
    let mut pn = 1.0;
    let mut rhom = 1.0;
    for m in 0..nmax {
        let eim = Complex64::new(0.0, m as f64 * beta).exp();
        let mut p = pn;
        let npn = m * m + 2 * m;
        let nmn = m * m;
        ynm[npn] = rhom * p * prefactor[npn] * eim;
        ynm[nmn] = ynm[npn].conj();
        let mut p1 = p;
        p = x * (2 * m + 1) as f64 * p1;
        ynm_theta[npn] = rhom * (p - (m + 1) as f64 * x * p1) / y * prefactor[npn] * eim;
        rhom *= rho;
        let mut rhon = rhom;
        for n in (m + 1)..nmax {
            let npm = n * n + n + m;
            let nmm = n * n + n - m;
            ynm[npm] = rhon * p * prefactor[npm] * eim;
            ynm[nmm] = ynm[npm].conj();
            let p2 = p1;
            p1 = p;
            p = (x * (2 * n + 1) as f64 * p1 - (n + m) as f64 * p2) / (n - m + 1) as f64;
            ynm_theta[npm] =
                rhon * ((n - m + 1) as f64 * p - (n + 1) as f64 * x * p1) / y * prefactor[npm] * eim;
            rhon *= rho;
        }
        pn = -pn * fact * y;
        fact += 2.0;
    }
}

/// Fills `ynm` with `rho^(-n-1) Y_n^m(alpha, beta)` and `ynm_theta` with the
/// alpha-derivatives, for all `0 <= |m| <= n < nmax`.
pub fn eval_local(
    nmax: usize,
    rho: f64,
    alpha: f64,
    beta: f64,
    prefactor: &[f64],
    ynm: &mut [Complex64],
    ynm_theta: &mut [Complex64],
) {
    let x = alpha.cos();
    let y = alpha.sin();
    let mut fact = 1.0;
    let mut pn = 1.0;
    let mut rhom = 1.0 / rho;
    for m in 0..nmax {
        let eim = Complex64::new(0.0, m as f64 * beta).exp();
        let mut p = pn;
        let npn = m * m + 2 * m;
        let nmn = m * m;
        ynm[npn] = rhom * p * prefactor[npn] * eim;
        ynm[nmn] = ynm[npn].conj();
        let mut p1 = p;
        p = x * (2 * m + 1) as f64 * p1;
        ynm_theta[npn] = rhom * (p - (m + 1) as f64 * x * p1) / y * prefactor[npn] * eim;
        rhom /= rho;
        let mut rhon = rhom;
        for n in (m + 1)..nmax {
            let npm = n * n + n + m;
            let nmm = n * n + n - m;
            ynm[npm] = rhon * p * prefactor[npm] * eim;
            ynm[nmm] = ynm[npm].conj();
            let p2 = p1;
            p1 = p;
            p = (x * (2 * n + 1) as f64 * p1 - (n + m) as f64 * p2) / (n - m + 1) as f64;
            ynm_theta[npm] =
                rhon * ((n - m + 1) as f64 * p - (n + 1) as f64 * x * p1) / y * prefactor[npm] * eim;
            rhon /= rho;
        }
        pn = -pn * fact * y;
        fact += 2.0;
    }
}

/// Converts a distance vector to spherical coordinates `(r, theta, phi)`.
///
/// The radius carries a `+ eps` floor so the polar angle and the radial
/// divisions in the evaluators stay finite for the zero vector and for
/// z-axis points; the azimuth is pinned to 0 when x and y both vanish.
pub fn cart2sph(dist: Point, eps: f64) -> (f64, f64, f64) {
    let r = (dist[0] * dist[0] + dist[1] * dist[1] + dist[2] * dist[2]).sqrt() + eps;
    let theta = (dist[2] / r).acos();
    let phi = if dist[0].abs() + dist[1].abs() < eps {
        0.0
    } else if dist[0].abs() < eps {
        dist[1].signum() * PI * 0.5
    } else if dist[0] > 0.0 {
        (dist[1] / dist[0]).atan()
    } else {
        (dist[1] / dist[0]).atan() + PI
    };
    (r, theta, phi)
}

/// Applies the spherical-basis-to-Cartesian Jacobian to a gradient given in
/// `(d/dr, d/dtheta, d/dphi)` components at `(r, theta, phi)`.
pub fn sph2cart(r: f64, theta: f64, phi: f64, spherical: Point) -> Point {
    [
        theta.sin() * phi.cos() * spherical[0] + theta.cos() * phi.cos() / r * spherical[1]
            - phi.sin() / r / theta.sin() * spherical[2],
        theta.sin() * phi.sin() * spherical[0]
            + theta.cos() * phi.sin() / r * spherical[1]
            + phi.cos() / r / theta.sin() * spherical[2],
        theta.cos() * spherical[0] - theta.sin() / r * spherical[1],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::CoefficientTables;

    const EPS: f64 = 1e-12;

    fn eval_buffers(order: usize) -> (Vec<Complex64>, Vec<Complex64>) {
        let zero = Complex64::new(0.0, 0.0);
        (vec![zero; 4 * order * order], vec![zero; 4 * order * order])
    }

    #[test]
    fn z_axis_points_produce_finite_harmonics() {
        let order = 6;
        let tables = CoefficientTables::new(order, EPS);
        let (mut ynm, mut ynm_theta) = eval_buffers(order);

        for dist in [[0.0, 0.0, 1.0], [0.0, 0.0, -0.5], [0.0, 0.0, 0.0]] {
            let (r, theta, phi) = cart2sph(dist, EPS);
            assert_eq!(phi, 0.0);
            eval_multipole(
                order,
                r,
                theta,
                phi,
                &tables.prefactor,
                &mut ynm,
                &mut ynm_theta,
            );
            for value in ynm.iter().chain(ynm_theta.iter()) {
                assert!(value.re.is_finite() && value.im.is_finite());
            }
        }
    }

    #[test]
    fn negative_m_entries_are_conjugates() {
        let order = 5;
        let tables = CoefficientTables::new(order, EPS);
        let (mut ynm, mut ynm_theta) = eval_buffers(order);

        let (r, theta, phi) = cart2sph([0.3, -0.2, 0.7], EPS);
        eval_multipole(
            order,
            r,
            theta,
            phi,
            &tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        for n in 0..order {
            for m in 0..=n {
                let plus = ynm[n * n + n + m];
                let minus = ynm[n * n + n - m];
                assert!((plus.conj() - minus).norm() < 1e-14);
            }
        }
    }

    #[test]
    fn azimuth_covers_all_four_quadrant_cases() {
        let (_, _, phi) = cart2sph([0.0, 0.0, 0.4], EPS);
        assert_eq!(phi, 0.0);

        let (_, _, phi) = cart2sph([0.0, 0.8, 0.0], EPS);
        assert!((phi - PI / 2.0).abs() < 1e-15);

        let (_, _, phi) = cart2sph([0.0, -0.8, 0.0], EPS);
        assert!((phi + PI / 2.0).abs() < 1e-15);

        let (_, _, phi) = cart2sph([0.5, 0.5, 0.0], EPS);
        assert!((phi - PI / 4.0).abs() < 1e-12);

        let (_, _, phi) = cart2sph([-0.5, 0.5, 0.0], EPS);
        assert!((phi - 3.0 * PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn radial_gradient_maps_to_unit_direction() {
        let dist = [0.6, -0.3, 0.2];
        let (r, theta, phi) = cart2sph(dist, EPS);
        // A purely radial spherical gradient of magnitude 1 is the unit
        // direction vector in Cartesian coordinates.
        let cartesian = sph2cart(r, theta, phi, [1.0, 0.0, 0.0]);
        let norm = (dist[0] * dist[0] + dist[1] * dist[1] + dist[2] * dist[2]).sqrt();
        for d in 0..3 {
            assert!((cartesian[d] - dist[d] / norm).abs() < 1e-9);
        }
    }

    #[test]
    fn local_and_multipole_radial_factors_are_reciprocal() {
        let order = 4;
        let tables = CoefficientTables::new(order, EPS);
        let (mut inner, mut inner_theta) = eval_buffers(order);
        let (mut outer, mut outer_theta) = eval_buffers(order);

        let (r, theta, phi) = cart2sph([0.4, 0.1, -0.3], EPS);
        eval_multipole(
            order,
            r,
            theta,
            phi,
            &tables.prefactor,
            &mut inner,
            &mut inner_theta,
        );
        eval_local(
            order,
            r,
            theta,
            phi,
            &tables.prefactor,
            &mut outer,
            &mut outer_theta,
        );

        // r^n Y / (r^(-n-1) Y) = r^(2n+1) wherever Y does not vanish.
        for n in 0..order {
            let nm = n * n + n;
            let ratio = inner[nm] / outer[nm];
            assert!((ratio.re - r.powi(2 * n as i32 + 1)).abs() < 1e-9 * ratio.re.abs());
            assert!(ratio.im.abs() < 1e-12);
        }
    }
}
