/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the spherical harmonic translation operators for the Laplace kernel.
//
// Created on: 18 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::MatRef;
use itertools::izip;
use num_complex::Complex64;

use crate::config::KernelConfig;
use crate::harmonics::{cart2sph, eval_local, eval_multipole, sph2cart};
use crate::tables::CoefficientTables;
use crate::traits::{FmmError, Kernel};
use crate::utils::{ipow, norm_sq, odd_even, row_to_point, sub};
use crate::Point;

// References:
// [1] L. Greengard, V. Rokhlin, A fast algorithm for particle simulations,
//     Journal of Computational Physics 73 (2) (1987) 325-348.
// [2] R. Yokota, L. Barba, Treecode and fast multipole method for N-body
//     simulation with CUDA, GPU Computing Gems Emerald Edition (2011).

/// An outgoing (multipole) expansion attached to a box.
///
/// Coefficients cover `0 <= m <= n < P`, stored contiguously in `(n, m)`
/// blocks at index `n (n + 1) / 2 + m`; negative-m coefficients follow from
/// conjugate symmetry of real-sourced fields and are never stored.
#[derive(Debug, Clone)]
pub struct Multipole {
    pub coeffs: Vec<Complex64>,
    /// Largest distance from the box center to any accumulated source, or to
    /// any translated child expansion's critical sphere.
    pub rmax: f64,
    /// Critical radius `min(box radius, rmax)` consumed by the traversal's
    /// well-separation test.
    pub rcrit: f64,
    radius: f64,
}

impl Multipole {
    /// Half diagonal of the box this expansion was initialized for.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

/// An incoming (local) expansion attached to a box, same coefficient layout
/// as [`Multipole`].
#[derive(Debug, Clone)]
pub struct Local {
    pub coeffs: Vec<Complex64>,
}

/// Laplace (1/r) kernel over spherical harmonic expansions.
///
/// The coefficient tables are built once at construction and shared by every
/// operator; the operators themselves are pure accumulations into their
/// target argument. Results are `[potential, gx, gy, gz]` where the gradient
/// components accumulate the potential gradient, matching the direct sum.
#[derive(Debug, Clone)]
pub struct LaplaceSpherical {
    config: KernelConfig,
    tables: CoefficientTables,
}

impl LaplaceSpherical {
    /// Builds the kernel and its coefficient tables for `config.order`.
    pub fn new(config: KernelConfig) -> Result<Self, FmmError> {
        if config.order < 1 {
            return Err(FmmError::InvalidOrder {
                order: config.order,
            });
        }
        let tables = CoefficientTables::new(config.order, config.eps);
        Ok(Self { config, tables })
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn order(&self) -> usize {
        self.config.order
    }

    pub(crate) fn tables(&self) -> &CoefficientTables {
        &self.tables
    }

    /// Scratch buffers sized for both harmonic evaluators.
    pub(crate) fn harmonic_buffers(&self) -> (Vec<Complex64>, Vec<Complex64>) {
        let size = 4 * self.config.order * self.config.order;
        let zero = Complex64::new(0.0, 0.0);
        (vec![zero; size], vec![zero; size])
    }
}

impl Kernel for LaplaceSpherical {
    type Charge = f64;
    type Result = [f64; 4];
    type Multipole = Multipole;
    type Local = Local;

    fn multipole_size(&self) -> usize {
        self.config.order * (self.config.order + 1) / 2
    }

    fn local_size(&self) -> usize {
        self.config.order * (self.config.order + 1) / 2
    }

    fn init_multipole(&self, extents: Point, _level: u32) -> Multipole {
        let radius = norm_sq(extents).sqrt() / 2.0;
        Multipole {
            coeffs: vec![Complex64::new(0.0, 0.0); self.multipole_size()],
            rmax: 0.0,
            rcrit: radius,
            radius,
        }
    }

    fn init_local(&self, _extents: Point, _level: u32) -> Local {
        Local {
            coeffs: vec![Complex64::new(0.0, 0.0); self.local_size()],
        }
    }

    fn particle_to_multipole(
        &self,
        source: Point,
        charge: &f64,
        center: Point,
        multipole: &mut Multipole,
    ) {
        let p = self.config.order;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let dist = sub(source, center);
        let r = norm_sq(dist).sqrt();
        if r > multipole.rmax {
            multipole.rmax = r;
        }

        // The negated azimuth conjugates the harmonics, which keeps the
        // stored expansion in the standard basis.
        let (rho, alpha, beta) = cart2sph(dist, self.config.eps);
        eval_multipole(
            p,
            rho,
            alpha,
            -beta,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        for n in 0..p {
            for m in 0..=n {
                let nm = n * n + n + m;
                let nms = n * (n + 1) / 2 + m;
                multipole.coeffs[nms] += *charge * ynm[nm];
            }
        }
        multipole.rcrit = multipole.radius.min(multipole.rmax);
    }

    fn multipole_to_multipole(
        &self,
        source: &Multipole,
        target: &mut Multipole,
        translation: Point,
    ) {
        let p = self.config.order as i64;
        let anm = &self.tables.anm;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let r = norm_sq(translation).sqrt() + source.rcrit;
        if r > target.rmax {
            target.rmax = r;
        }

        let (rho, alpha, beta) = cart2sph(translation, self.config.eps);
        eval_multipole(
            p as usize,
            rho,
            alpha,
            -beta,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        for j in 0..p {
            for k in 0..=j {
                let jk = (j * j + j + k) as usize;
                let jks = (j * (j + 1) / 2 + k) as usize;
                let mut acc = Complex64::new(0.0, 0.0);
                for n in 0..=j {
                    for m in -n..=(k - 1).min(n) {
                        if j - n >= k - m {
                            let jnkm = ((j - n) * (j - n) + j - n + k - m) as usize;
                            let jnkms = ((j - n) * (j - n + 1) / 2 + k - m) as usize;
                            let nm = (n * n + n + m) as usize;
                            acc += source.coeffs[jnkms]
                                * ipow(m - m.abs())
                                * ynm[nm]
                                * (odd_even(n) * anm[nm] * anm[jnkm] / anm[jk]);
                        }
                    }
                    for m in k..=n {
                        if j - n >= m - k {
                            let jnkm = ((j - n) * (j - n) + j - n + k - m) as usize;
                            let jnkms = ((j - n) * (j - n + 1) / 2 - k + m) as usize;
                            let nm = (n * n + n + m) as usize;
                            acc += source.coeffs[jnkms].conj()
                                * ynm[nm]
                                * (odd_even(k + n + m) * anm[nm] * anm[jnkm] / anm[jk]);
                        }
                    }
                }
                target.coeffs[jks] += acc * self.config.eps;
            }
        }
        target.rcrit = target.radius.min(target.rmax);
    }

    fn multipole_to_local(&self, source: &Multipole, target: &mut Local, translation: Point) {
        let p = self.config.order as i64;
        let cnm = &self.tables.cnm;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let dist = sub(translation, self.config.xperiodic);
        let (rho, alpha, beta) = cart2sph(dist, self.config.eps);
        // Outer harmonics up to degree 2P: the translation convolves two
        // order-P expansions.
        eval_local(
            2 * p as usize,
            rho,
            alpha,
            beta,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        for j in 0..p {
            for k in 0..=j {
                let jk = j * j + j + k;
                let jks = (j * (j + 1) / 2 + k) as usize;
                let mut acc = Complex64::new(0.0, 0.0);
                for n in 0..p {
                    for m in -n..0 {
                        let nm = n * n + n + m;
                        let nms = (n * (n + 1) / 2 - m) as usize;
                        let jknm = (jk * p * p + nm) as usize;
                        let jnkm = ((j + n) * (j + n) + j + n + m - k) as usize;
                        acc += source.coeffs[nms].conj() * cnm[jknm] * ynm[jnkm];
                    }
                    for m in 0..=n {
                        let nm = n * n + n + m;
                        let nms = (n * (n + 1) / 2 + m) as usize;
                        let jknm = (jk * p * p + nm) as usize;
                        let jnkm = ((j + n) * (j + n) + j + n + m - k) as usize;
                        acc += source.coeffs[nms] * cnm[jknm] * ynm[jnkm];
                    }
                }
                target.coeffs[jks] += acc;
            }
        }
    }

    fn multipole_to_particle(
        &self,
        multipole: &Multipole,
        center: Point,
        target: Point,
        result: &mut [f64; 4],
    ) {
        let p = self.config.order;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let dist = sub(sub(target, center), self.config.xperiodic);
        let (r, theta, phi) = cart2sph(dist, self.config.eps);
        eval_local(
            2 * p,
            r,
            theta,
            phi,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        let mut spherical = [0.0; 3];
        for n in 0..p {
            let nm = n * n + n;
            let nms = n * (n + 1) / 2;
            result[0] += (multipole.coeffs[nms] * ynm[nm]).re;
            spherical[0] -= (multipole.coeffs[nms] * ynm[nm]).re / r * (n + 1) as f64;
            spherical[1] += (multipole.coeffs[nms] * ynm_theta[nm]).re;
            for m in 1..=n {
                let nm = n * n + n + m;
                let nms = n * (n + 1) / 2 + m;
                result[0] += 2.0 * (multipole.coeffs[nms] * ynm[nm]).re;
                spherical[0] -= 2.0 * (multipole.coeffs[nms] * ynm[nm]).re / r * (n + 1) as f64;
                spherical[1] += 2.0 * (multipole.coeffs[nms] * ynm_theta[nm]).re;
                spherical[2] +=
                    2.0 * (multipole.coeffs[nms] * ynm[nm] * Complex64::i()).re * m as f64;
            }
        }
        let cartesian = sph2cart(r, theta, phi, spherical);
        result[1] += cartesian[0];
        result[2] += cartesian[1];
        result[3] += cartesian[2];
    }

    fn local_to_local(&self, source: &Local, target: &mut Local, translation: Point) {
        let p = self.config.order as i64;
        let anm = &self.tables.anm;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let (rho, alpha, beta) = cart2sph(translation, self.config.eps);
        eval_multipole(
            p as usize,
            rho,
            alpha,
            beta,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        for j in 0..p {
            for k in 0..=j {
                let jk = (j * j + j + k) as usize;
                let jks = (j * (j + 1) / 2 + k) as usize;
                let mut acc = Complex64::new(0.0, 0.0);
                for n in j..p {
                    for m in (j + k - n)..0 {
                        let jnkm = ((n - j) * (n - j) + n - j + m - k) as usize;
                        let nm = (n * n + n - m) as usize;
                        let nms = (n * (n + 1) / 2 - m) as usize;
                        acc += source.coeffs[nms].conj()
                            * ynm[jnkm]
                            * (odd_even(k) * anm[jnkm] * anm[jk] / anm[nm]);
                    }
                    for m in 0..=n {
                        if n - j >= (m - k).abs() {
                            let jnkm = ((n - j) * (n - j) + n - j + m - k) as usize;
                            let nm = (n * n + n + m) as usize;
                            let nms = (n * (n + 1) / 2 + m) as usize;
                            acc += source.coeffs[nms]
                                * ipow(m - k - (m - k).abs())
                                * ynm[jnkm]
                                * (anm[jnkm] * anm[jk] / anm[nm]);
                        }
                    }
                }
                target.coeffs[jks] += acc * self.config.eps;
            }
        }
    }

    fn local_to_particle(
        &self,
        local: &Local,
        center: Point,
        target: Point,
        result: &mut [f64; 4],
    ) {
        let p = self.config.order;
        let (mut ynm, mut ynm_theta) = self.harmonic_buffers();

        let dist = sub(target, center);
        let (r, theta, phi) = cart2sph(dist, self.config.eps);
        eval_multipole(
            p,
            r,
            theta,
            phi,
            &self.tables.prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        let mut spherical = [0.0; 3];
        for n in 0..p {
            let nm = n * n + n;
            let nms = n * (n + 1) / 2;
            result[0] += (local.coeffs[nms] * ynm[nm]).re;
            spherical[0] += (local.coeffs[nms] * ynm[nm]).re / r * n as f64;
            spherical[1] += (local.coeffs[nms] * ynm_theta[nm]).re;
            for m in 1..=n {
                let nm = n * n + n + m;
                let nms = n * (n + 1) / 2 + m;
                result[0] += 2.0 * (local.coeffs[nms] * ynm[nm]).re;
                spherical[0] += 2.0 * (local.coeffs[nms] * ynm[nm]).re / r * n as f64;
                spherical[1] += 2.0 * (local.coeffs[nms] * ynm_theta[nm]).re;
                spherical[2] += 2.0 * (local.coeffs[nms] * ynm[nm] * Complex64::i()).re * m as f64;
            }
        }
        let cartesian = sph2cart(r, theta, phi, spherical);
        result[1] += cartesian[0];
        result[2] += cartesian[1];
        result[3] += cartesian[2];
    }

    fn particle_to_particle(
        &self,
        sources: MatRef<'_, f64>,
        charges: &[f64],
        targets: MatRef<'_, f64>,
        results: &mut [[f64; 4]],
    ) {
        let xperiodic = self.config.xperiodic;
        for (target_row, result) in izip!(targets.row_iter(), results.iter_mut()) {
            let target = row_to_point(target_row);
            let mut potential = 0.0;
            let mut force = [0.0; 3];
            for (source_row, charge) in izip!(sources.row_iter(), charges.iter()) {
                let source = row_to_point(source_row);
                let dist = sub(sub(target, source), xperiodic);
                let r2 = norm_sq(dist) + self.config.eps2;
                let mut inv_r2 = 1.0 / r2;
                if r2 == 0.0 {
                    // Exclude the self interaction.
                    inv_r2 = 0.0;
                }
                let inv_r = charge * inv_r2.sqrt();
                let scale = inv_r2 * inv_r;
                potential += inv_r;
                force[0] += dist[0] * scale;
                force[1] += dist[1] * scale;
                force[2] += dist[2] * scale;
            }
            result[0] += potential;
            result[1] -= force[0];
            result[2] -= force[1];
            result[3] -= force[2];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::l2_rel_error;
    use faer::{mat, Mat};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn kernel(order: usize) -> LaplaceSpherical {
        LaplaceSpherical::new(KernelConfig::new(order)).unwrap()
    }

    fn direct(
        kernel: &LaplaceSpherical,
        sources: &Mat<f64>,
        charges: &[f64],
        targets: &Mat<f64>,
    ) -> Vec<[f64; 4]> {
        let mut results = vec![[0.0; 4]; targets.nrows()];
        kernel.particle_to_particle(sources.as_ref(), charges, targets.as_ref(), &mut results);
        results
    }

    #[test]
    fn order_must_be_positive() {
        assert!(matches!(
            LaplaceSpherical::new(KernelConfig::new(0)),
            Err(FmmError::InvalidOrder { order: 0 })
        ));
    }

    #[test]
    fn single_source_single_target_matches_direct() {
        let kernel = kernel(5);
        let sources = mat![[0.0, 0.0, 0.0]];
        let targets = mat![[0.9, 0.0, 0.0]];
        let charges = [1.0];
        let target = [0.9, 0.0, 0.0];

        let exact = direct(&kernel, &sources, &charges, &targets)[0];
        assert!((exact[0] - 1.0 / 0.9).abs() < 1e-14);

        let m_center = [0.125, 0.0, 0.0];
        let l_center = [0.875, 0.0, 0.0];

        let mut multipole = kernel.init_multipole([0.25, 0.25, 0.25], 1);
        kernel.particle_to_multipole([0.0, 0.0, 0.0], &1.0, m_center, &mut multipole);

        let mut m2p = [0.0; 4];
        kernel.multipole_to_particle(&multipole, m_center, target, &mut m2p);

        let mut local = kernel.init_local([0.25, 0.25, 0.25], 1);
        kernel.multipole_to_local(&multipole, &mut local, sub(l_center, m_center));
        let mut fmm = [0.0; 4];
        kernel.local_to_particle(&local, l_center, target, &mut fmm);

        assert!((m2p[0] - exact[0]).abs() / exact[0].abs() < 1e-3);
        assert!((fmm[0] - exact[0]).abs() / exact[0].abs() < 1e-3);
        assert!(l2_rel_error(&m2p, &exact) < 1e-2);
        assert!(l2_rel_error(&fmm, &exact) < 1e-2);
        // The shortcut and the full translation agree to truncation error.
        assert!(l2_rel_error(&m2p, &fmm) < 1e-2);
    }

    #[test]
    fn corner_charges_through_the_full_chain() {
        let kernel = kernel(10);
        let target = [2.0, 2.0, 2.0];

        let sources = Mat::from_fn(8, 3, |i, d| {
            if (i >> d) & 1 == 1 {
                0.125
            } else {
                -0.125
            }
        });
        let charges = vec![1.0; 8];
        let targets = mat![[2.0, 2.0, 2.0]];

        let exact = direct(&kernel, &sources, &charges, &targets)[0];

        // Leaf multipoles at the corners themselves, aggregated into a parent
        // expansion at the origin.
        let mut parent_m = kernel.init_multipole([0.5, 0.5, 0.5], 0);
        for i in 0..8 {
            let corner = [sources[(i, 0)], sources[(i, 1)], sources[(i, 2)]];
            let mut child_m = kernel.init_multipole([0.25, 0.25, 0.25], 1);
            kernel.particle_to_multipole(corner, &1.0, corner, &mut child_m);
            kernel.multipole_to_multipole(&child_m, &mut parent_m, sub([0.0, 0.0, 0.0], corner));
        }

        // Local expansions walk down to a box centered on the target.
        let parent_l_center = [2.125, 2.125, 2.125];
        let child_l_center = target;
        let mut parent_l = kernel.init_local([0.5, 0.5, 0.5], 0);
        kernel.multipole_to_local(&parent_m, &mut parent_l, parent_l_center);
        let mut child_l = kernel.init_local([0.25, 0.25, 0.25], 1);
        kernel.local_to_local(&parent_l, &mut child_l, sub(child_l_center, parent_l_center));

        let mut fmm = [0.0; 4];
        kernel.local_to_particle(&child_l, child_l_center, target, &mut fmm);

        assert!((fmm[0] - exact[0]).abs() / exact[0].abs() < 1e-6);
    }

    #[test]
    fn zero_translation_is_the_multipole_identity() {
        let kernel = kernel(6);
        let center = [0.0, 0.0, 0.0];
        let mut rng = StdRng::seed_from_u64(17);

        let mut multipole = kernel.init_multipole([0.5, 0.5, 0.5], 2);
        for _ in 0..5 {
            let source = [
                rng.random_range(-0.2..0.2),
                rng.random_range(-0.2..0.2),
                rng.random_range(-0.2..0.2),
            ];
            let charge = rng.random_range(0.1..1.0);
            kernel.particle_to_multipole(source, &charge, center, &mut multipole);
        }

        let mut translated = kernel.init_multipole([0.5, 0.5, 0.5], 2);
        kernel.multipole_to_multipole(&multipole, &mut translated, [0.0, 0.0, 0.0]);

        let scale = multipole
            .coeffs
            .iter()
            .map(|c| c.norm())
            .fold(0.0, f64::max);
        for (a, b) in multipole.coeffs.iter().zip(translated.coeffs.iter()) {
            assert!((a - b).norm() < 1e-9 * scale, "{} != {}", a, b);
        }
    }

    #[test]
    fn real_sources_give_real_axial_coefficients() {
        let kernel = kernel(7);
        let mut rng = StdRng::seed_from_u64(5);

        let mut multipole = kernel.init_multipole([1.0, 1.0, 1.0], 0);
        for _ in 0..10 {
            let source = [
                rng.random_range(-0.4..0.4),
                rng.random_range(-0.4..0.4),
                rng.random_range(-0.4..0.4),
            ];
            kernel.particle_to_multipole(source, &1.0, [0.0, 0.0, 0.0], &mut multipole);
        }

        // m = 0 coefficients of a real-sourced expansion carry no imaginary
        // part; they are their own conjugates.
        for n in 0..kernel.order() {
            assert_eq!(multipole.coeffs[n * (n + 1) / 2].im, 0.0);
        }
    }

    #[test]
    fn self_interaction_contributes_nothing() {
        let kernel = kernel(4);
        let sources = mat![[0.3, -0.2, 0.5], [0.1, 0.1, 0.1]];
        let charges = [2.0, 3.0];
        let targets = mat![[0.3, -0.2, 0.5]];

        let result = direct(&kernel, &sources, &charges, &targets)[0];
        for value in result {
            assert!(value.is_finite());
        }

        // Only the second source contributes.
        let expected = 3.0 / norm_sq([0.2, -0.3, 0.4]).sqrt();
        assert!((result[0] - expected).abs() < 1e-12);
    }

    #[test]
    fn multipole_radii_track_sources_and_children() {
        let kernel = kernel(4);
        let mut multipole = kernel.init_multipole([1.0, 1.0, 1.0], 1);
        let radius = multipole.radius();

        kernel.particle_to_multipole([0.3, 0.0, 0.0], &1.0, [0.0, 0.0, 0.0], &mut multipole);
        assert!((multipole.rmax - 0.3).abs() < 1e-12);
        assert!((multipole.rcrit - radius.min(0.3)).abs() < 1e-12);

        let mut parent = kernel.init_multipole([2.0, 2.0, 2.0], 0);
        kernel.multipole_to_multipole(&multipole, &mut parent, [1.0, 0.0, 0.0]);
        assert!((parent.rmax - (1.0 + multipole.rcrit)).abs() < 1e-9);
    }

    #[test]
    fn random_cloud_fmm_matches_direct_summation() {
        let kernel = kernel(10);
        let mut rng = StdRng::seed_from_u64(99);

        let m_center = [0.0, 0.0, 0.0];
        let l_center = [3.0, 0.0, 0.0];
        let sources = Mat::from_fn(30, 3, |_, _| rng.random_range(-0.25..0.25));
        let charges: Vec<f64> = (0..30).map(|_| rng.random_range(0.1..1.0)).collect();
        let targets = Mat::from_fn(20, 3, |_, d| {
            l_center[d] + rng.random_range(-0.25..0.25)
        });

        let exact = direct(&kernel, &sources, &charges, &targets);

        let mut multipole = kernel.init_multipole([0.5, 0.5, 0.5], 3);
        for (i, charge) in charges.iter().enumerate() {
            let source = [sources[(i, 0)], sources[(i, 1)], sources[(i, 2)]];
            kernel.particle_to_multipole(source, charge, m_center, &mut multipole);
        }

        let mut local = kernel.init_local([0.5, 0.5, 0.5], 3);
        kernel.multipole_to_local(&multipole, &mut local, sub(l_center, m_center));

        for (i, exact_i) in exact.iter().enumerate() {
            let target = [targets[(i, 0)], targets[(i, 1)], targets[(i, 2)]];

            let mut via_local = [0.0; 4];
            kernel.local_to_particle(&local, l_center, target, &mut via_local);
            assert!(l2_rel_error(&via_local, exact_i) < 1e-3);

            let mut via_multipole = [0.0; 4];
            kernel.multipole_to_particle(&multipole, m_center, target, &mut via_multipole);
            assert!(l2_rel_error(&via_multipole, exact_i) < 1e-3);
        }
    }
}
