/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the Stokes kernel as four coupled Laplace expansions.
//
// Created on: 21 Feb 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::MatRef;
use itertools::izip;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::config::KernelConfig;
use crate::harmonics::{cart2sph, eval_local, eval_multipole, sph2cart};
use crate::laplace::{LaplaceSpherical, Local, Multipole};
use crate::traits::{FmmError, Kernel};
use crate::utils::{norm_sq, row_to_point, sub};
use crate::Point;

// Reference:
// [1] A.-K. Tornberg, L. Greengard, A fast multipole method for the
//     three-dimensional Stokes equations, Journal of Computational Physics
//     227 (3) (2008) 1613-1619.

/// Singularity carried by each Stokes source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StokesMode {
    /// Point forces: the charge holds the force vector in components 0..3.
    Stokeslet,

    /// Symmetric force doublets: the charge holds the strength vector in
    /// components 0..3 and the orientation normal in components 3..6.
    Stresslet,
}

/// Stokes kernel built from four scalar Laplace expansions.
///
/// The velocity field decomposes into harmonic potentials carrying the three
/// force components and the moment `f . x`, so the translation operators
/// delegate componentwise to the Laplace kernel while the endpoint operators
/// add the kernel-specific gradient combinations. Charges are `[f64; 6]`
/// read per [`StokesMode`]; results are velocity vectors.
#[derive(Debug, Clone)]
pub struct StokesSpherical {
    laplace: LaplaceSpherical,
    mode: StokesMode,
}

impl StokesSpherical {
    pub fn new(config: KernelConfig, mode: StokesMode) -> Result<Self, FmmError> {
        Ok(Self {
            laplace: LaplaceSpherical::new(config)?,
            mode,
        })
    }

    pub fn mode(&self) -> StokesMode {
        self.mode
    }

    pub fn config(&self) -> &KernelConfig {
        self.laplace.config()
    }

    fn order(&self) -> usize {
        self.config().order
    }

    fn stokeslet_to_multipole(
        &self,
        source: Point,
        charge: &[f64; 6],
        ynm: &[Complex64],
        multipole: &mut [Multipole; 4],
    ) {
        let p = self.order();
        let f = [charge[0], charge[1], charge[2]];
        let fdotx = f[0] * source[0] + f[1] * source[1] + f[2] * source[2];

        for n in 0..p {
            for m in 0..=n {
                let nm = n * (n + 1) + m;
                let nms = n * (n + 1) / 2 + m;
                for i in 0..3 {
                    multipole[i].coeffs[nms] += f[i] * ynm[nm];
                }
                multipole[3].coeffs[nms] += fdotx * ynm[nm];
            }
        }
    }

    fn stresslet_to_multipole(
        &self,
        source: Point,
        charge: &[f64; 6],
        rho: f64,
        alpha: f64,
        beta: f64,
        ynm: &[Complex64],
        ynm_theta: &[Complex64],
        multipole: &mut [Multipole; 4],
    ) {
        let p = self.order();
        let g = [charge[0], charge[1], charge[2]];
        let normal = [charge[3], charge[4], charge[5]];
        let xdotg = source[0] * g[0] + source[1] * g[1] + source[2] * g[2];
        let ndotx = normal[0] * source[0] + normal[1] * source[1] + normal[2] * source[2];

        for n in 0..p {
            for m in 0..=n {
                let nm = n * (n + 1) + m;
                let nms = n * (n + 1) / 2 + m;

                // Gradient of the (conjugated) harmonic in spherical form,
                // pushed through the Jacobian to Cartesian components.
                let brh = n as f64 / rho * ynm[nm];
                let bal = ynm_theta[nm];
                let bbe = -Complex64::i() * m as f64 * ynm[nm];

                let bxd = alpha.sin() * beta.cos() * brh
                    + alpha.cos() * beta.cos() / rho * bal
                    - beta.sin() / rho / alpha.sin() * bbe;
                let byd = alpha.sin() * beta.sin() * brh
                    + alpha.cos() * beta.sin() / rho * bal
                    + beta.cos() / rho / alpha.sin() * bbe;
                let bzd = alpha.cos() * brh - alpha.sin() / rho * bal;

                let rdotn = bxd * normal[0] + byd * normal[1] + bzd * normal[2];
                let rdotg = bxd * g[0] + byd * g[1] + bzd * g[2];

                for i in 0..3 {
                    multipole[i].coeffs[nms] += rdotn * g[i] + rdotg * normal[i];
                }
                multipole[3].coeffs[nms] += rdotn * xdotg + rdotg * ndotx;
            }
        }
    }
}

impl Kernel for StokesSpherical {
    type Charge = [f64; 6];
    type Result = [f64; 3];
    type Multipole = [Multipole; 4];
    type Local = [Local; 4];

    fn multipole_size(&self) -> usize {
        self.laplace.multipole_size()
    }

    fn local_size(&self) -> usize {
        self.laplace.local_size()
    }

    fn init_multipole(&self, extents: Point, level: u32) -> [Multipole; 4] {
        std::array::from_fn(|_| self.laplace.init_multipole(extents, level))
    }

    fn init_local(&self, extents: Point, level: u32) -> [Local; 4] {
        std::array::from_fn(|_| self.laplace.init_local(extents, level))
    }

    fn particle_to_multipole(
        &self,
        source: Point,
        charge: &[f64; 6],
        center: Point,
        multipole: &mut [Multipole; 4],
    ) {
        let (mut ynm, mut ynm_theta) = self.laplace.harmonic_buffers();

        let dist = sub(source, center);
        let r = norm_sq(dist).sqrt();
        let (rho, alpha, beta) = cart2sph(dist, self.config().eps);
        eval_multipole(
            self.order(),
            rho,
            alpha,
            -beta,
            &self.laplace.tables().prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        match self.mode {
            StokesMode::Stokeslet => self.stokeslet_to_multipole(source, charge, &ynm, multipole),
            StokesMode::Stresslet => self.stresslet_to_multipole(
                source, charge, rho, alpha, beta, &ynm, &ynm_theta, multipole,
            ),
        }

        for component in multipole.iter_mut() {
            if r > component.rmax {
                component.rmax = r;
            }
            component.rcrit = component.radius().min(component.rmax);
        }
    }

    fn multipole_to_multipole(
        &self,
        source: &[Multipole; 4],
        target: &mut [Multipole; 4],
        translation: Point,
    ) {
        for (s, t) in izip!(source.iter(), target.iter_mut()) {
            self.laplace.multipole_to_multipole(s, t, translation);
        }
    }

    fn multipole_to_local(
        &self,
        source: &[Multipole; 4],
        target: &mut [Local; 4],
        translation: Point,
    ) {
        for (s, t) in izip!(source.iter(), target.iter_mut()) {
            self.laplace.multipole_to_local(s, t, translation);
        }
    }

    fn multipole_to_particle(
        &self,
        multipole: &[Multipole; 4],
        center: Point,
        target: Point,
        result: &mut [f64; 3],
    ) {
        let p = self.order();
        let (mut ynm, mut ynm_theta) = self.laplace.harmonic_buffers();

        let dist = sub(target, center);
        let (r, theta, phi) = cart2sph(dist, self.config().eps);
        eval_local(
            2 * p,
            r,
            theta,
            phi,
            &self.laplace.tables().prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        let mut gradient = [[0.0f64; 3]; 4];
        for n in 0..p {
            let nm = n * n + n;
            let nms = n * (n + 1) / 2;
            for i in 0..3 {
                result[i] += (multipole[i].coeffs[nms] * ynm[nm]).re / 6.0;
            }
            let factor = 1.0 / r * (n + 1) as f64;
            for i in 0..4 {
                gradient[i][0] -= (multipole[i].coeffs[nms] * ynm[nm]).re * factor;
                gradient[i][1] += (multipole[i].coeffs[nms] * ynm_theta[nm]).re;
            }
            for m in 1..=n {
                let nm = n * n + n + m;
                let nms = n * (n + 1) / 2 + m;
                for i in 0..3 {
                    result[i] += 2.0 / 6.0 * (multipole[i].coeffs[nms] * ynm[nm]).re;
                }
                for i in 0..4 {
                    gradient[i][0] -= 2.0 * (multipole[i].coeffs[nms] * ynm[nm]).re * factor;
                    gradient[i][1] += 2.0 * (multipole[i].coeffs[nms] * ynm_theta[nm]).re;
                    gradient[i][2] +=
                        2.0 * (multipole[i].coeffs[nms] * ynm[nm] * Complex64::i()).re * m as f64;
                }
            }
        }

        let mut cartesian = [[0.0f64; 3]; 4];
        for i in 0..3 {
            let c = sph2cart(r, theta, phi, gradient[i]);
            cartesian[i] = [-target[i] * c[0], -target[i] * c[1], -target[i] * c[2]];
        }
        cartesian[3] = sph2cart(r, theta, phi, gradient[3]);

        for i in 0..3 {
            result[i] +=
                (cartesian[0][i] + cartesian[1][i] + cartesian[2][i] + cartesian[3][i]) / 6.0;
        }
    }

    fn local_to_local(&self, source: &[Local; 4], target: &mut [Local; 4], translation: Point) {
        for (s, t) in izip!(source.iter(), target.iter_mut()) {
            self.laplace.local_to_local(s, t, translation);
        }
    }

    fn local_to_particle(
        &self,
        local: &[Local; 4],
        center: Point,
        target: Point,
        result: &mut [f64; 3],
    ) {
        let p = self.order();
        let (mut ynm, mut ynm_theta) = self.laplace.harmonic_buffers();

        let dist = sub(target, center);
        let (r, theta, phi) = cart2sph(dist, self.config().eps);
        eval_multipole(
            p,
            r,
            theta,
            phi,
            &self.laplace.tables().prefactor,
            &mut ynm,
            &mut ynm_theta,
        );

        let mut gradient = [[0.0f64; 3]; 4];
        for n in 0..p {
            let nm = n * n + n;
            let nms = n * (n + 1) / 2;
            for i in 0..3 {
                result[i] += (local[i].coeffs[nms] * ynm[nm]).re / 6.0;
            }
            let factor = 1.0 / r * n as f64;
            for i in 0..4 {
                gradient[i][0] += (local[i].coeffs[nms] * ynm[nm]).re * factor;
                gradient[i][1] += (local[i].coeffs[nms] * ynm_theta[nm]).re;
            }
            for m in 1..=n {
                let nm = n * n + n + m;
                let nms = n * (n + 1) / 2 + m;
                for i in 0..3 {
                    result[i] += 2.0 / 6.0 * (local[i].coeffs[nms] * ynm[nm]).re;
                }
                for i in 0..4 {
                    gradient[i][0] += 2.0 * (local[i].coeffs[nms] * ynm[nm]).re * factor;
                    gradient[i][1] += 2.0 * (local[i].coeffs[nms] * ynm_theta[nm]).re;
                    gradient[i][2] +=
                        2.0 * (local[i].coeffs[nms] * ynm[nm] * Complex64::i()).re * m as f64;
                }
            }
        }

        let mut cartesian = [[0.0f64; 3]; 4];
        for i in 0..3 {
            let c = sph2cart(r, theta, phi, gradient[i]);
            cartesian[i] = [-target[i] * c[0], -target[i] * c[1], -target[i] * c[2]];
        }
        cartesian[3] = sph2cart(r, theta, phi, gradient[3]);

        for i in 0..3 {
            result[i] +=
                (cartesian[0][i] + cartesian[1][i] + cartesian[2][i] + cartesian[3][i]) / 6.0;
        }
    }

    fn particle_to_particle(
        &self,
        sources: MatRef<'_, f64>,
        charges: &[[f64; 6]],
        targets: MatRef<'_, f64>,
        results: &mut [[f64; 3]],
    ) {
        for (target_row, result) in izip!(targets.row_iter(), results.iter_mut()) {
            let target = row_to_point(target_row);
            for (source_row, charge) in izip!(sources.row_iter(), charges.iter()) {
                let source = row_to_point(source_row);
                let dist = sub(target, source);
                let r2 = norm_sq(dist);
                let mut inv_r = 1.0 / r2;
                if r2 < 1e-8 {
                    // Exclude the (near-)self interaction.
                    inv_r = 0.0;
                }

                match self.mode {
                    StokesMode::Stokeslet => {
                        let f = [charge[0], charge[1], charge[2]];
                        let fdx = dist[0] * f[0] + dist[1] * f[1] + dist[2] * f[2];
                        let h = inv_r.sqrt() * inv_r;
                        for i in 0..3 {
                            result[i] += h * (f[i] * r2 + fdx * dist[i]);
                        }
                    }
                    StokesMode::Stresslet => {
                        let g = [charge[0], charge[1], charge[2]];
                        let dxdotn =
                            dist[0] * charge[3] + dist[1] * charge[4] + dist[2] * charge[5];
                        let h = inv_r.sqrt() * inv_r * dxdotn * inv_r;
                        let dxdotg = dist[0] * g[0] + dist[1] * g[1] + dist[2] * g[2];
                        for i in 0..3 {
                            result[i] += h * dist[i] * dxdotg;
                        }
                    }
                }
            }
        }
    }
}
