//! The kinetic solver: flux divergence, source terms and boundaries of one phase space.

use ndarray::{Array2, Array4, ArrayView4};
use tracing::info;

use crate::boundary::{Boundaries, KineticBoundaries};
use crate::driver::KineticOperator;
use crate::fields::EmFields;
use crate::fvm::{AdvectionTerms, FluxDivergence, NonRelativistic};
use crate::grid::PhaseSpace;
use crate::moments::{charge_density, current_density, MomentsHook, VelocityMoments};
use crate::source::{NoSource, Source, SourceContext};
use crate::{Float, Result};

pub struct KineticSolver {
    phase_space: PhaseSpace,
    fvm: FluxDivergence,
    advection: Box<dyn AdvectionTerms>,
    source: Box<dyn Source>,
    moments: Box<dyn MomentsHook>,
    boundaries: KineticBoundaries,
}

impl KineticSolver {
    /// Collisionless non-relativistic transport with velocity-quadrature moments.
    ///
    /// Fails if the ghost width is too small for the reconstruction or a mirror wall
    /// meets an asymmetric velocity mesh.
    pub fn new(phase_space: PhaseSpace, fvm: FluxDivergence, boundaries: Boundaries) -> Result<Self> {
        fvm.reconstruction.validate_ghosts(phase_space.grid.n_ghost)?;
        let boundaries = KineticBoundaries::new(boundaries, &phase_space.velocity)?;
        info!(
            reconstruction = fvm.reconstruction.name(),
            riemann = ?fvm.riemann,
            shape = ?phase_space.shape(),
            "kinetic solver ready"
        );
        Ok(Self {
            moments: Box::new(VelocityMoments::new(&phase_space.velocity)),
            phase_space,
            fvm,
            advection: Box::new(NonRelativistic),
            source: Box::new(NoSource),
            boundaries,
        })
    }

    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_advection(mut self, advection: impl AdvectionTerms + 'static) -> Self {
        self.advection = Box::new(advection);
        self
    }

    pub fn with_moments(mut self, moments: impl MomentsHook + 'static) -> Self {
        self.moments = Box::new(moments);
        self
    }

    pub fn phase_space(&self) -> &PhaseSpace {
        &self.phase_space
    }

    pub fn moments(&self) -> &dyn MomentsHook {
        self.moments.as_ref()
    }

    pub fn boundaries(&self) -> &Boundaries {
        self.boundaries.boundaries()
    }
}

impl KineticOperator for KineticSolver {
    fn df_dt(
        &self,
        f: ArrayView4<Float>,
        fields: Option<&EmFields>,
        dt: Float,
    ) -> Result<Array4<Float>> {
        let coefficients = self.advection.coefficients(&self.phase_space, fields);
        let ctx = SourceContext {
            phase_space: &self.phase_space,
            fields,
            moments: self.moments.as_ref(),
        };
        self.fvm.df_dt(
            f,
            &coefficients,
            &self.phase_space.grid,
            dt,
            self.source.as_ref(),
            &ctx,
        )
    }

    fn apply_boundaries(&self, f: &mut Array4<Float>) {
        self.boundaries.apply(f, &self.phase_space.grid);
    }

    fn current_density(&self, f: ArrayView4<Float>) -> [Array2<Float>; 3] {
        current_density(self.moments.as_ref(), &self.phase_space.species, f)
    }

    fn charge_density(&self, f: ArrayView4<Float>) -> Array2<Float> {
        charge_density(self.moments.as_ref(), &self.phase_space.species, f)
    }
}
