//! Local source terms added to the flux divergence.

use ndarray::{Array4, ArrayView4, Zip};

use crate::fields::{Component, EmFields};
use crate::grid::PhaseSpace;
use crate::moments::MomentsHook;
use crate::{Float, Result};

/// Everything a source term may read besides the distribution function itself.
pub struct SourceContext<'a> {
    pub phase_space: &'a PhaseSpace,
    /// Cell-centred fields frozen for the current kinetic step, if fields are evolved.
    pub fields: Option<&'a EmFields>,
    pub moments: &'a dyn MomentsHook,
}

/// A source term `S(f)` in `df/dt = -∇·(C f) + S(f)`.
pub trait Source: Send + Sync {
    fn evaluate(&self, f: ArrayView4<Float>, ctx: &SourceContext<'_>) -> Result<Array4<Float>>;
}

impl<F> Source for F
where
    F: Fn(ArrayView4<Float>, &SourceContext<'_>) -> Result<Array4<Float>> + Send + Sync,
{
    fn evaluate(&self, f: ArrayView4<Float>, ctx: &SourceContext<'_>) -> Result<Array4<Float>> {
        self(f, ctx)
    }
}

/// Collisionless, field-free transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl Source for NoSource {
    fn evaluate(&self, f: ArrayView4<Float>, _ctx: &SourceContext<'_>) -> Result<Array4<Float>> {
        Ok(Array4::zeros(f.raw_dim()))
    }
}

/// Acceleration by the Lorentz force, `-q (E + v × B) · ∂f/∂p` with `v = p / m`.
///
/// Momentum derivatives are central differences; the outermost velocity bins and
/// single-bin components contribute nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LorentzForce;

impl Source for LorentzForce {
    fn evaluate(&self, f: ArrayView4<Float>, ctx: &SourceContext<'_>) -> Result<Array4<Float>> {
        let mut out = Array4::zeros(f.raw_dim());
        let Some(fields) = ctx.fields else {
            return Ok(out);
        };
        let velocity = &ctx.phase_space.velocity;
        let species = &ctx.phase_space.species;
        let p = velocity.centers();
        let bins: Vec<[usize; 3]> = (0..velocity.len()).map(|v| velocity.unflatten(v)).collect();
        let strides = [velocity.stride(0), velocity.stride(1), velocity.stride(2)];
        let inv_two_dp = [0, 1, 2].map(|k| 0.5 / velocity.dp(k));
        let field = |c: Component| fields.get(c);

        Zip::indexed(&mut out).par_for_each(|(s, i, j, v), out| {
            let (q, m) = (species[s].charge, species[s].mass);
            let e = [
                field(Component::E1)[[i, j]],
                field(Component::E2)[[i, j]],
                field(Component::E3)[[i, j]],
            ];
            let b = [
                field(Component::B1)[[i, j]],
                field(Component::B2)[[i, j]],
                field(Component::B3)[[i, j]],
            ];
            let u = [p[0][v] / m, p[1][v] / m, p[2][v] / m];
            let force = [
                q * (e[0] + u[1] * b[2] - u[2] * b[1]),
                q * (e[1] + u[2] * b[0] - u[0] * b[2]),
                q * (e[2] + u[0] * b[1] - u[1] * b[0]),
            ];

            let mut rate = 0.0;
            for k in 0..3 {
                let index = bins[v][k];
                if index == 0 || index + 1 >= velocity.n_p[k] {
                    continue;
                }
                let dfdp = (f[[s, i, j, v + strides[k]]] - f[[s, i, j, v - strides[k]]])
                    * inv_two_dp[k];
                rate -= force[k] * dfdp;
            }
            *out = rate;
        });
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;
    use crate::grid::{Grid, Species, VelocityGrid};
    use crate::moments::VelocityMoments;

    fn phase_space() -> PhaseSpace {
        let grid = Grid::new(2, 2, 2, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let velocity = VelocityGrid::new([16, 16, 1], [-4.0, -4.0, -0.5], [4.0, 4.0, 0.5]).unwrap();
        let species = vec![Species {
            name: "electron".into(),
            mass: 2.0,
            charge: -1.0,
        }];
        PhaseSpace::new(grid, velocity, species).unwrap()
    }

    #[test]
    fn test_no_fields_gives_zero_force() {
        let phase_space = phase_space();
        let moments = VelocityMoments::new(&phase_space.velocity);
        let f = phase_space.distribution_from_fn(|_, _, _, p| (-p[0] * p[0]).exp());
        let ctx = SourceContext {
            phase_space: &phase_space,
            fields: None,
            moments: &moments,
        };
        let rate = LorentzForce.evaluate(f.view(), &ctx).unwrap();
        assert!(rate.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_electric_field_on_linear_profile() {
        // f = p1 gives ∂f/∂p1 = 1 exactly, so df/dt = -q E1 in the inner bins.
        let phase_space = phase_space();
        let moments = VelocityMoments::new(&phase_space.velocity);
        let f = phase_space.distribution_from_fn(|_, _, _, p| p[0]);
        let mut fields = EmFields::zeros(&phase_space.grid);
        fields.get_mut(Component::E1).fill(3.0);
        let ctx = SourceContext {
            phase_space: &phase_space,
            fields: Some(&fields),
            moments: &moments,
        };
        let rate = LorentzForce.evaluate(f.view(), &ctx).unwrap();
        let inner = (5 * 16) + 7;
        assert_relative_eq!(3.0, rate[[0, 1, 1, inner]], epsilon = 1e-12);
        // Edge bins along p1 are left untouched.
        assert_eq!(0.0, rate[[0, 1, 1, 7]]);
    }

    #[test]
    fn test_magnetic_force_does_no_work_on_isotropic_f() {
        // Isotropic f: ∂f/∂p ∥ p, and (v × B)·p = 0.
        let phase_space = phase_space();
        let moments = VelocityMoments::new(&phase_space.velocity);
        let f = phase_space.distribution_from_fn(|_, _, _, p| -(p[0] * p[0] + p[1] * p[1]));
        let mut fields = EmFields::zeros(&phase_space.grid);
        fields.get_mut(Component::B3).fill(1.5);
        let ctx = SourceContext {
            phase_space: &phase_space,
            fields: Some(&fields),
            moments: &moments,
        };
        let rate = LorentzForce.evaluate(f.view(), &ctx).unwrap();
        for v in 0..phase_space.velocity.len() {
            let [a, b, _] = phase_space.velocity.unflatten(v);
            if (1..15).contains(&a) && (1..15).contains(&b) {
                assert_relative_eq!(0.0, rate[[0, 0, 1, v]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_closure_source() {
        let phase_space = phase_space();
        let moments = VelocityMoments::new(&phase_space.velocity);
        let f = phase_space.zeros();
        let ctx = SourceContext {
            phase_space: &phase_space,
            fields: None,
            moments: &moments,
        };
        let constant =
            |f: ArrayView4<Float>, _: &SourceContext<'_>| -> Result<Array4<Float>> {
                Ok(Array4::from_elem(f.raw_dim(), 0.5))
            };
        let rate = constant.evaluate(f.view(), &ctx).unwrap();
        assert_eq!(0.5, rate[[0, 3, 2, 11]]);
    }
}
