//! Explicit FDTD update of Maxwell's equations on the Yee grid.
//!
//! In the units used here (c = ε₀ = μ₀ = 1), with ∂/∂q3 = 0:
//!
//! ```text
//!   ∂B1/∂t = -∂E3/∂q2                  ∂E1/∂t =  ∂B3/∂q2 - J1
//!   ∂B2/∂t =  ∂E3/∂q1                  ∂E2/∂t = -∂B3/∂q1 - J2
//!   ∂B3/∂t =  ∂E1/∂q2 - ∂E2/∂q1        ∂E3/∂t =  ∂B2/∂q1 - ∂B1/∂q2 - J3
//! ```

use ndarray::{s, Array2, Zip};
use tracing::trace;

use crate::boundary::{apply_field_boundaries, Boundaries};
use crate::fields::EmFields;
use crate::grid::Grid;
use crate::{Float, Result};

/// Owns the field state and advances it with the leapfrog scheme.
#[derive(Debug, Clone)]
pub struct FdtdSolver {
    grid: Grid,
    boundaries: Boundaries,
    fields: EmFields,
    time: Float,
}

impl FdtdSolver {
    pub fn new(grid: Grid, boundaries: Boundaries, mut fields: EmFields) -> Result<Self> {
        fields.check_shape(&grid)?;
        apply_field_boundaries(&mut fields, &grid, &boundaries);
        Ok(Self {
            grid,
            boundaries,
            fields,
            time: 0.0,
        })
    }

    pub fn fields(&self) -> &EmFields {
        &self.fields
    }

    /// Replaces the field state; ghost zones are refreshed.
    pub fn set_fields(&mut self, mut fields: EmFields) -> Result<()> {
        fields.check_shape(&self.grid)?;
        apply_field_boundaries(&mut fields, &self.grid, &self.boundaries);
        self.fields = fields;
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn time(&self) -> Float {
        self.time
    }

    /// Advances the fields by `dt` with current densities `j1, j2, j3` located at the
    /// E1, E2, E3 positions.
    ///
    /// Leapfrog in kick-drift-kick form: B by `dt/2` from E, E by `dt` from B and J,
    /// then B by the remaining `dt/2`. E and B are both at the new time level on return.
    pub fn evolve(
        &mut self,
        j1: &Array2<Float>,
        j2: &Array2<Float>,
        j3: &Array2<Float>,
        dt: Float,
    ) -> Result<()> {
        for j in [j1, j2, j3] {
            let expected = self.fields.shape();
            if j.shape() != expected {
                return Err(crate::Error::shape(expected, j.shape()));
            }
        }

        self.update_b(0.5 * dt);
        apply_field_boundaries(&mut self.fields, &self.grid, &self.boundaries);
        self.update_e(j1, j2, j3, dt);
        apply_field_boundaries(&mut self.fields, &self.grid, &self.boundaries);
        self.update_b(0.5 * dt);
        apply_field_boundaries(&mut self.fields, &self.grid, &self.boundaries);

        self.time += dt;
        trace!(time = self.time, "fields advanced");
        Ok(())
    }

    /// B ← B - dt ∇ × E, using forward differences of E.
    fn update_b(&mut self, dt: Float) {
        let (c1, c2) = (dt / self.grid.dq1, dt / self.grid.dq2);
        let [e1, e2, e3, b1, b2, b3] = &mut self.fields.components;

        Zip::from(b1.slice_mut(s![.., ..-1]))
            .and(e3.slice(s![.., 1..]))
            .and(e3.slice(s![.., ..-1]))
            .par_for_each(|b1, &e3_top, &e3| *b1 -= c2 * (e3_top - e3));

        Zip::from(b2.slice_mut(s![..-1, ..]))
            .and(e3.slice(s![1.., ..]))
            .and(e3.slice(s![..-1, ..]))
            .par_for_each(|b2, &e3_right, &e3| *b2 += c1 * (e3_right - e3));

        Zip::from(b3.slice_mut(s![..-1, ..-1]))
            .and(e2.slice(s![1.., ..-1]))
            .and(e2.slice(s![..-1, ..-1]))
            .and(e1.slice(s![..-1, 1..]))
            .and(e1.slice(s![..-1, ..-1]))
            .par_for_each(|b3, &e2_right, &e2, &e1_top, &e1| {
                *b3 -= c1 * (e2_right - e2) - c2 * (e1_top - e1)
            });
    }

    /// E ← E + dt (∇ × B - J), using backward differences of B.
    fn update_e(&mut self, j1: &Array2<Float>, j2: &Array2<Float>, j3: &Array2<Float>, dt: Float) {
        let (c1, c2) = (dt / self.grid.dq1, dt / self.grid.dq2);
        let [e1, e2, e3, b1, b2, b3] = &mut self.fields.components;

        Zip::from(e1.slice_mut(s![.., 1..]))
            .and(b3.slice(s![.., 1..]))
            .and(b3.slice(s![.., ..-1]))
            .and(j1.slice(s![.., 1..]))
            .par_for_each(|e1, &b3, &b3_bottom, &j1| *e1 += c2 * (b3 - b3_bottom) - dt * j1);

        Zip::from(e2.slice_mut(s![1.., ..]))
            .and(b3.slice(s![1.., ..]))
            .and(b3.slice(s![..-1, ..]))
            .and(j2.slice(s![1.., ..]))
            .par_for_each(|e2, &b3, &b3_left, &j2| *e2 += -c1 * (b3 - b3_left) - dt * j2);

        Zip::from(e3.slice_mut(s![1.., 1..]))
            .and(b2.slice(s![1.., 1..]))
            .and(b2.slice(s![..-1, 1..]))
            .and(b1.slice(s![1.., 1..]))
            .and(b1.slice(s![1.., ..-1]))
            .and(j3.slice(s![1.., 1..]))
            .par_for_each(|e3, &b2, &b2_left, &b1, &b1_bottom, &j3| {
                *e3 += c1 * (b2 - b2_left) - c2 * (b1 - b1_bottom) - dt * j3
            });
    }
}
