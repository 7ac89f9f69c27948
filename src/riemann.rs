//! Numerical fluxes at cell faces from two one-sided candidates.

use std::str::FromStr;

use ndarray::{Array4, ArrayView4, Zip};

use crate::{Error, Float, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiemannSolver {
    /// Picks the flux from the side the characteristic comes from.
    Upwind,
    /// Central flux minus `0.5 * c * (right_f - left_f)` numerical diffusion.
    LaxFriedrichs,
}

impl FromStr for RiemannSolver {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "upwind-flux" => Ok(RiemannSolver::Upwind),
            "lax-friedrichs" => Ok(RiemannSolver::LaxFriedrichs),
            other => Err(Error::unknown("Riemann solver", other)),
        }
    }
}

/// Inputs for one face along one axis. Every array refers to the same face; `left`
/// is the state just left of (or below) it and `right` the state just right of (or
/// above) it.
pub struct FaceStates<'a> {
    pub left_flux: ArrayView4<'a, Float>,
    pub right_flux: ArrayView4<'a, Float>,
    pub left_f: ArrayView4<'a, Float>,
    pub right_f: ArrayView4<'a, Float>,
    /// Advection velocity along the axis, broadcastable to the flux arrays.
    pub velocity: ArrayView4<'a, Float>,
    /// Lax-Friedrichs coefficient, `dt / dq` of the axis.
    pub c_lax: Float,
}

impl RiemannSolver {
    pub fn flux(self, face: &FaceStates<'_>) -> Result<Array4<Float>> {
        let shape = face.left_flux.shape();
        for array in [&face.right_flux, &face.left_f, &face.right_f] {
            if array.shape() != shape {
                return Err(Error::shape(shape, array.shape()));
            }
        }

        let mut flux = Array4::zeros(face.left_flux.raw_dim());
        match self {
            RiemannSolver::Upwind => {
                let velocity = face
                    .velocity
                    .broadcast(face.left_flux.raw_dim())
                    .ok_or_else(|| Error::shape(shape, face.velocity.shape()))?;
                Zip::from(&mut flux)
                    .and(&face.left_flux)
                    .and(&face.right_flux)
                    .and(&velocity)
                    .par_for_each(|flux, &left, &right, &velocity| {
                        *flux = upwind_flux(left, right, velocity)
                    });
            }
            RiemannSolver::LaxFriedrichs => {
                let c_lax = face.c_lax;
                Zip::from(&mut flux)
                    .and(&face.left_flux)
                    .and(&face.right_flux)
                    .and(&face.left_f)
                    .and(&face.right_f)
                    .par_for_each(|flux, &left, &right, &left_f, &right_f| {
                        *flux = lax_friedrichs_flux(left, right, left_f, right_f, c_lax)
                    });
            }
        }
        Ok(flux)
    }
}

#[inline]
pub fn upwind_flux(left_flux: Float, right_flux: Float, velocity: Float) -> Float {
    if velocity > 0.0 {
        left_flux
    } else {
        right_flux
    }
}

#[inline]
pub fn lax_friedrichs_flux(
    left_flux: Float,
    right_flux: Float,
    left_f: Float,
    right_f: Float,
    c_lax: Float,
) -> Float {
    0.5 * (left_flux + right_flux) - 0.5 * c_lax * (right_f - left_f)
}

#[cfg(test)]
mod test {
    use ndarray::Array4;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random(shape: (usize, usize, usize, usize), rng: &mut StdRng) -> Array4<Float> {
        Array4::from_shape_simple_fn(shape, || rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_upwind_reduces_to_one_sided_flux() {
        let mut rng = StdRng::seed_from_u64(7);
        let shape = (2, 6, 5, 4);
        let left = random(shape, &mut rng);
        let right = random(shape, &mut rng);
        let f = random(shape, &mut rng);

        for (sign, expected) in [(1.0, &left), (-1.0, &right)] {
            let velocity = Array4::from_shape_fn((2, 1, 1, 4), |(_, _, _, v)| {
                sign * (0.5 + v as Float)
            });
            let face = FaceStates {
                left_flux: left.view(),
                right_flux: right.view(),
                left_f: f.view(),
                right_f: f.view(),
                velocity: velocity.view(),
                c_lax: 0.1,
            };
            let flux = RiemannSolver::Upwind.flux(&face).unwrap();
            assert_eq!(expected, &flux);
        }
    }

    #[test]
    fn test_lax_friedrichs_formula() {
        assert_eq!(1.5 - 0.25, lax_friedrichs_flux(1.0, 2.0, 0.0, 1.0, 0.5));
        // Equal states: central average only.
        assert_eq!(0.0, lax_friedrichs_flux(-1.0, 1.0, 3.0, 3.0, 0.5));
    }

    #[test]
    fn test_upwind_rejects_incompatible_velocity() {
        let f = Array4::<Float>::zeros((1, 4, 4, 3));
        let velocity = Array4::<Float>::zeros((1, 1, 1, 2));
        let face = FaceStates {
            left_flux: f.view(),
            right_flux: f.view(),
            left_f: f.view(),
            right_f: f.view(),
            velocity: velocity.view(),
            c_lax: 0.0,
        };
        assert!(matches!(
            RiemannSolver::Upwind.flux(&face),
            Err(Error::IncompatibleShape { .. })
        ));
    }

    #[test]
    fn test_unknown_solver_is_rejected() {
        assert!("hll".parse::<RiemannSolver>().is_err());
        assert_eq!(RiemannSolver::Upwind, "upwind-flux".parse().unwrap());
    }
}
