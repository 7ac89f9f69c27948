//! Velocity-space moments of the distribution function.

use std::str::FromStr;

use itertools::izip;
use ndarray::{Array1, Array2, Array3, ArrayView4, Axis, Zip};

use crate::grid::{Species, VelocityGrid};
use crate::{Error, Float};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Moment {
    Density,
    MomP1Bulk,
    MomP2Bulk,
    MomP3Bulk,
    /// Σ (p1² + p2² + p3²) f dv.
    Energy,
}

impl FromStr for Moment {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "density" => Ok(Moment::Density),
            "mom_p1_bulk" => Ok(Moment::MomP1Bulk),
            "mom_p2_bulk" => Ok(Moment::MomP2Bulk),
            "mom_p3_bulk" => Ok(Moment::MomP3Bulk),
            "energy" => Ok(Moment::Energy),
            other => Err(Error::unknown("moment", other)),
        }
    }
}

/// Hook the solver calls whenever it needs macroscopic quantities.
pub trait MomentsHook: Send + Sync {
    /// Returns the moment per `(species, q1, q2)` cell.
    fn compute(&self, moment: Moment, f: ArrayView4<Float>) -> Array3<Float>;
}

/// Midpoint quadrature over the velocity mesh.
#[derive(Debug, Clone)]
pub struct VelocityMoments {
    p: [Array1<Float>; 3],
    volume_element: Float,
}

impl VelocityMoments {
    pub fn new(velocity: &VelocityGrid) -> Self {
        Self {
            p: velocity.centers(),
            volume_element: velocity.volume_element(),
        }
    }

    fn weights(&self, moment: Moment) -> Array1<Float> {
        let [p1, p2, p3] = &self.p;
        match moment {
            Moment::Density => Array1::ones(p1.len()),
            Moment::MomP1Bulk => p1.clone(),
            Moment::MomP2Bulk => p2.clone(),
            Moment::MomP3Bulk => p3.clone(),
            Moment::Energy => p1 * p1 + p2 * p2 + p3 * p3,
        }
    }
}

impl MomentsHook for VelocityMoments {
    fn compute(&self, moment: Moment, f: ArrayView4<Float>) -> Array3<Float> {
        let weights = self.weights(moment) * self.volume_element;
        let (n_s, n1, n2, _) = f.dim();
        let mut out = Array3::zeros((n_s, n1, n2));
        Zip::from(&mut out)
            .and(f.lanes(Axis(3)))
            .par_for_each(|out, lane| *out = lane.dot(&weights));
        out
    }
}

/// Current density `J_k = Σ_s (q_s / m_s) ∫ p_k f_s dv` per cell.
pub fn current_density(
    moments: &dyn MomentsHook,
    species: &[Species],
    f: ArrayView4<Float>,
) -> [Array2<Float>; 3] {
    [Moment::MomP1Bulk, Moment::MomP2Bulk, Moment::MomP3Bulk].map(|moment| {
        let per_species = moments.compute(moment, f);
        let (_, n1, n2) = per_species.dim();
        let mut j = Array2::zeros((n1, n2));
        for (s, m) in izip!(species, per_species.outer_iter()) {
            j.scaled_add(s.charge / s.mass, &m);
        }
        j
    })
}

/// Charge density `ρ = Σ_s q_s ∫ f_s dv` per cell.
pub fn charge_density(
    moments: &dyn MomentsHook,
    species: &[Species],
    f: ArrayView4<Float>,
) -> Array2<Float> {
    let density = moments.compute(Moment::Density, f);
    let (_, n1, n2) = density.dim();
    let mut rho = Array2::zeros((n1, n2));
    for (s, n) in izip!(species, density.outer_iter()) {
        rho.scaled_add(s.charge, &n);
    }
    rho
}
