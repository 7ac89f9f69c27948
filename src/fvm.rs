//! Finite-volume flux divergence of the distribution function in physical space.
//!
//! ```text
//!   df/dt = -(F1[i + 1] - F1[i]) / dq1 - (F2[j + 1] - F2[j]) / dq2 + S(f)
//! ```
//!
//! where `F1[i]` is the numerical flux through the left face of cell `i`. Each face is
//! evaluated once: the right/top flux of a cell is the left/bottom flux of its
//! neighbour, obtained by a one-cell shift.

use ndarray::{Array4, ArrayView4, Slice, Zip};

use crate::fields::EmFields;
use crate::grid::{Axis, Grid, PhaseSpace};
use crate::reconstruct::Reconstruction;
use crate::riemann::{FaceStates, RiemannSolver};
use crate::source::{Source, SourceContext};
use crate::{Error, Float, Result};

/// Advection velocities along q1 and q2, broadcastable to the distribution function.
#[derive(Debug, Clone)]
pub struct AdvectionCoefficients {
    pub c_q1: Array4<Float>,
    pub c_q2: Array4<Float>,
}

impl AdvectionCoefficients {
    pub fn along(&self, axis: Axis) -> &Array4<Float> {
        match axis {
            Axis::Q1 => &self.c_q1,
            Axis::Q2 => &self.c_q2,
        }
    }
}

/// Supplies the advection coefficients for the current state.
pub trait AdvectionTerms: Send + Sync {
    fn coefficients(
        &self,
        phase_space: &PhaseSpace,
        fields: Option<&EmFields>,
    ) -> AdvectionCoefficients;
}

/// `C_q1 = p1 / m`, `C_q2 = p2 / m`, independent of position and fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonRelativistic;

impl AdvectionTerms for NonRelativistic {
    fn coefficients(
        &self,
        phase_space: &PhaseSpace,
        _fields: Option<&EmFields>,
    ) -> AdvectionCoefficients {
        let [p1, p2, _] = phase_space.velocity.centers();
        let species = &phase_space.species;
        let shape = (species.len(), 1, 1, p1.len());
        AdvectionCoefficients {
            c_q1: Array4::from_shape_fn(shape, |(s, _, _, v)| p1[v] / species[s].mass),
            c_q2: Array4::from_shape_fn(shape, |(s, _, _, v)| p2[v] / species[s].mass),
        }
    }
}

/// Numerical fluxes through the four faces of every cell.
#[derive(Debug, Clone)]
pub struct FaceFluxes {
    pub left: Array4<Float>,
    pub right: Array4<Float>,
    pub bottom: Array4<Float>,
    pub top: Array4<Float>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluxDivergence {
    pub reconstruction: Reconstruction,
    pub riemann: RiemannSolver,
}

impl FluxDivergence {
    pub fn new(reconstruction: Reconstruction, riemann: RiemannSolver) -> Self {
        Self {
            reconstruction,
            riemann,
        }
    }

    /// Left/bottom face flux of every cell along `axis`.
    fn face_flux(
        &self,
        f: ArrayView4<Float>,
        velocity: &Array4<Float>,
        axis: Axis,
        c_lax: Float,
    ) -> Result<Array4<Float>> {
        let broadcast = velocity
            .broadcast(f.raw_dim())
            .ok_or_else(|| Error::shape(f.shape(), velocity.shape()))?;
        let mut flux = Array4::zeros(f.raw_dim());
        Zip::from(&mut flux)
            .and(&f)
            .and(&broadcast)
            .par_for_each(|flux, &f, &c| *flux = c * f);

        let (flux_plus, flux_minus) = self.reconstruction.reconstruct(flux.view(), axis);
        let (f_plus, f_minus) = self.reconstruction.reconstruct(f, axis);

        // The state left of a cell's left face is the right face state of its neighbour.
        let left_flux = shift(flux_minus.view(), axis, 1);
        let left_f = shift(f_minus.view(), axis, 1);

        self.riemann.flux(&FaceStates {
            left_flux: left_flux.view(),
            right_flux: flux_plus.view(),
            left_f: left_f.view(),
            right_f: f_plus.view(),
            velocity: velocity.view(),
            c_lax,
        })
    }

    /// Face fluxes along both axes. `dt` sets the Lax-Friedrichs coefficient `dt / dq`.
    pub fn face_fluxes(
        &self,
        f: ArrayView4<Float>,
        coefficients: &AdvectionCoefficients,
        grid: &Grid,
        dt: Float,
    ) -> Result<FaceFluxes> {
        let left = self.face_flux(f, &coefficients.c_q1, Axis::Q1, dt / grid.dq1)?;
        let bottom = self.face_flux(f, &coefficients.c_q2, Axis::Q2, dt / grid.dq2)?;
        Ok(FaceFluxes {
            right: shift(left.view(), Axis::Q1, -1),
            top: shift(bottom.view(), Axis::Q2, -1),
            left,
            bottom,
        })
    }

    /// Time derivative of `f`; only interior cells are meaningful.
    pub fn df_dt(
        &self,
        f: ArrayView4<Float>,
        coefficients: &AdvectionCoefficients,
        grid: &Grid,
        dt: Float,
        source: &dyn Source,
        ctx: &SourceContext<'_>,
    ) -> Result<Array4<Float>> {
        let fluxes = self.face_fluxes(f, coefficients, grid, dt)?;
        let mut rate = source.evaluate(f, ctx)?;
        if rate.shape() != f.shape() {
            return Err(Error::shape(f.shape(), rate.shape()));
        }

        let (dq1, dq2) = (grid.dq1, grid.dq2);
        Zip::from(&mut rate)
            .and(&fluxes.left)
            .and(&fluxes.right)
            .and(&fluxes.bottom)
            .and(&fluxes.top)
            .par_for_each(|rate, &left, &right, &bottom, &top| {
                *rate -= (right - left) / dq1 + (top - bottom) / dq2
            });
        Ok(rate)
    }
}

/// Periodic shift along `axis`: `out[i] = a[i - offset]`.
pub fn shift(a: ArrayView4<Float>, axis: Axis, offset: isize) -> Array4<Float> {
    let ax = axis.phase_axis();
    let n = a.len_of(ax);
    if n == 0 {
        return a.to_owned();
    }
    let k = offset.rem_euclid(n as isize) as usize;
    let mut out = Array4::zeros(a.raw_dim());
    out.slice_axis_mut(ax, Slice::from(k..))
        .assign(&a.slice_axis(ax, Slice::from(..n - k)));
    out.slice_axis_mut(ax, Slice::from(..k))
        .assign(&a.slice_axis(ax, Slice::from(n - k..)));
    out
}
