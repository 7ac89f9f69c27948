//! Split-step time integration of the coupled kinetic and field systems.
//!
//! A full step of size `dt` advances the fields with the current and charge densities
//! of the present distribution function, then the distribution function with the fields
//! frozen. Strang splitting halves the field step and repeats it after the kinetic
//! step.

use std::str::FromStr;

use ndarray::{Array2, Array4, ArrayView4};
use tracing::debug;

use crate::electrostatic::ElectrostaticSolver;
use crate::fdtd::FdtdSolver;
use crate::fields::{current_to_yee, EmFields};
use crate::timestep::TimeStepper;
use crate::{Error, Float, Result};

/// The distribution-function side of the split system.
pub trait KineticOperator {
    /// `df/dt` of `f` with `fields` (cell-centred) frozen; `dt` only tunes the flux.
    fn df_dt(
        &self,
        f: ArrayView4<Float>,
        fields: Option<&EmFields>,
        dt: Float,
    ) -> Result<Array4<Float>>;

    /// Refills the ghost zones of `f`.
    fn apply_boundaries(&self, f: &mut Array4<Float>);

    /// Cell-centred current density `[J1, J2, J3]` carried by `f`.
    fn current_density(&self, f: ArrayView4<Float>) -> [Array2<Float>; 3];

    /// Cell-centred charge density carried by `f`.
    fn charge_density(&self, f: ArrayView4<Float>) -> Array2<Float>;
}

/// Cell-centred sources of the fields, taken from the distribution function at the
/// start of a field sub-step.
#[derive(Debug, Clone)]
pub struct FieldSources {
    pub current: [Array2<Float>; 3],
    pub charge: Array2<Float>,
}

/// The electromagnetic side of the split system.
pub trait FieldOperator {
    /// Advances the fields by `dt` driven by `sources`.
    fn advance(&mut self, sources: &FieldSources, dt: Float) -> Result<()>;

    fn fields(&self) -> &EmFields;

    /// Fields interpolated to cell centres, as the kinetic side sees them.
    fn cell_centered(&self) -> EmFields {
        self.fields().cell_centered()
    }
}

impl FieldOperator for FdtdSolver {
    fn advance(&mut self, sources: &FieldSources, dt: Float) -> Result<()> {
        let [j1, j2, j3] = current_to_yee(&sources.current);
        self.evolve(&j1, &j2, &j3, dt)
    }

    fn fields(&self) -> &EmFields {
        FdtdSolver::fields(self)
    }
}

impl FieldOperator for ElectrostaticSolver {
    /// The field follows the charge instantaneously, so `dt` only moves the clock.
    fn advance(&mut self, sources: &FieldSources, dt: Float) -> Result<()> {
        self.evolve(&sources.charge, dt)
    }

    fn fields(&self) -> &EmFields {
        ElectrostaticSolver::fields(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Splitting {
    /// Fields, then kinetic. First order in the splitting error.
    Lie,
    /// Half field step, kinetic step, half field step. Second order.
    Strang,
}

impl FromStr for Splitting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lie" => Ok(Splitting::Lie),
            "strang" => Ok(Splitting::Strang),
            other => Err(Error::unknown("splitting", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Idle,
    FieldHalfStep,
    KineticStep,
    Done,
}

pub struct Driver<K, F> {
    kinetic: K,
    field: Option<F>,
    f: Array4<Float>,
    stepper: TimeStepper,
    splitting: Splitting,
    state: StepState,
    time: Float,
    steps: usize,
}

impl<K: KineticOperator, F: FieldOperator> Driver<K, F> {
    /// `field` is `None` for pure transport without field evolution.
    pub fn new(
        kinetic: K,
        field: Option<F>,
        mut f: Array4<Float>,
        stepper: TimeStepper,
        splitting: Splitting,
    ) -> Self {
        kinetic.apply_boundaries(&mut f);
        Self {
            kinetic,
            field,
            f,
            stepper,
            splitting,
            state: StepState::Idle,
            time: 0.0,
            steps: 0,
        }
    }

    pub fn distribution_function(&self) -> &Array4<Float> {
        &self.f
    }

    /// Replaces the distribution function; the shape must not change.
    pub fn set_distribution_function(&mut self, mut f: Array4<Float>) -> Result<()> {
        if f.shape() != self.f.shape() {
            return Err(Error::shape(self.f.shape(), f.shape()));
        }
        self.kinetic.apply_boundaries(&mut f);
        self.f = f;
        Ok(())
    }

    pub fn kinetic(&self) -> &K {
        &self.kinetic
    }

    pub fn field(&self) -> Option<&F> {
        self.field.as_ref()
    }

    pub fn field_mut(&mut self) -> Option<&mut F> {
        self.field.as_mut()
    }

    pub fn time(&self) -> Float {
        self.time
    }

    /// Moves the clock to `time` and makes the driver ready to step again, as when
    /// resuming a finished run from a snapshot.
    pub fn set_time(&mut self, time: Float) {
        self.time = time;
        self.enter(StepState::Idle);
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    /// Advances the distribution function by `dt` with the fields frozen. `f` is only
    /// replaced once every stage has succeeded.
    pub fn evolve_kinetic(&mut self, dt: Float) -> Result<()> {
        let fields = self.field.as_ref().map(|field| field.cell_centered());
        let kinetic = &self.kinetic;
        let next = self.stepper.step(
            &self.f,
            dt,
            |f| kinetic.df_dt(f, fields.as_ref(), dt),
            |f| kinetic.apply_boundaries(f),
        )?;
        self.f = next;
        Ok(())
    }

    /// Advances the fields by `dt` with the sources of the present `f`.
    pub fn evolve_fields(&mut self, dt: Float) -> Result<()> {
        if let Some(field) = self.field.as_mut() {
            let sources = FieldSources {
                current: self.kinetic.current_density(self.f.view()),
                charge: self.kinetic.charge_density(self.f.view()),
            };
            field.advance(&sources, dt)?;
        }
        Ok(())
    }

    fn enter(&mut self, state: StepState) {
        debug!(from = ?self.state, to = ?state, time = self.time, "driver state");
        self.state = state;
    }

    /// One full split step of size `dt`. The driver trusts `dt`; no CFL check is made.
    pub fn step(&mut self, dt: Float) -> Result<()> {
        if self.state == StepState::Done {
            return Err(Error::InvalidParameter(
                "driver has finished; no further steps".into(),
            ));
        }
        let field_dt = match self.splitting {
            Splitting::Lie => dt,
            Splitting::Strang => 0.5 * dt,
        };

        self.enter(StepState::FieldHalfStep);
        self.evolve_fields(field_dt)?;
        self.enter(StepState::KineticStep);
        self.evolve_kinetic(dt)?;
        if self.splitting == Splitting::Strang {
            self.enter(StepState::FieldHalfStep);
            self.evolve_fields(field_dt)?;
        }

        self.time += dt;
        self.steps += 1;
        self.enter(StepState::Idle);
        Ok(())
    }

    /// Steps until `t_final`, shortening the last step to land on it exactly.
    pub fn run_until(&mut self, t_final: Float, dt: Float) -> Result<()> {
        if dt <= 0.0 {
            return Err(Error::InvalidParameter(format!("dt must be positive, got {dt}")));
        }
        while self.time < t_final - 1e-12 * dt {
            self.step(dt.min(t_final - self.time))?;
        }
        self.finish();
        Ok(())
    }

    pub fn finish(&mut self) {
        self.enter(StepState::Done);
    }
}
