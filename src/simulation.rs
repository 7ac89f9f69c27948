//! Assembles a complete run from a [`Config`].

use std::str::FromStr;

use ndarray::{s, Array4, Axis as ArrayAxis};
use tracing::info;

use crate::boundary::Boundaries;
use crate::checkpoint::Snapshot;
use crate::config::Config;
use crate::context::ExecutionContext;
use crate::driver::{Driver, FieldOperator, FieldSources, KineticOperator, Splitting};
use crate::electrostatic::{electrostatic_fields, ElectrostaticSolver, EvolutionMode};
use crate::fdtd::FdtdSolver;
use crate::fields::EmFields;
use crate::fvm::FluxDivergence;
use crate::grid::{Axis, Grid, PhaseSpace, SpaceCoordinate, Species};
use crate::kinetic::KineticSolver;
use crate::moments::Moment;
use crate::reconstruct::Reconstruction;
use crate::riemann::RiemannSolver;
use crate::source::LorentzForce;
use crate::timestep::TimeStepper;
use crate::{Error, Float, Result};

/// Fields speed used for the time-step limit; lengths and times are in units with c = 1.
const SPEED_OF_LIGHT: Float = 1.0;

/// Initial state of the electromagnetic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInitialization {
    /// Spectral Poisson solve from the initial charge density.
    Electrostatic,
    /// All components zero; set them through [`Simulation::set_fields`].
    Zero,
}

impl FromStr for FieldInitialization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "electrostatic" => Ok(FieldInitialization::Electrostatic),
            "none" => Ok(FieldInitialization::Zero),
            other => Err(Error::unknown("field initialisation", other)),
        }
    }
}

/// Name of the field solver in the `fields.solver` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSolverKind {
    Fdtd,
    Electrostatic,
}

impl FromStr for FieldSolverKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fdtd" => Ok(FieldSolverKind::Fdtd),
            "electrostatic" => Ok(FieldSolverKind::Electrostatic),
            other => Err(Error::unknown("field solver", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldSolver {
    /// Full Maxwell equations on the Yee grid.
    Fdtd(FdtdSolver),
    /// Poisson solve from the charge density on every field sub-step.
    Electrostatic(ElectrostaticSolver),
}

impl FieldSolver {
    pub fn new(
        kind: FieldSolverKind,
        grid: Grid,
        boundaries: Boundaries,
        mode: EvolutionMode,
        fields: EmFields,
    ) -> Result<Self> {
        Ok(match kind {
            FieldSolverKind::Fdtd => FieldSolver::Fdtd(FdtdSolver::new(grid, boundaries, fields)?),
            FieldSolverKind::Electrostatic => FieldSolver::Electrostatic(
                ElectrostaticSolver::new(grid, boundaries, mode, fields)?,
            ),
        })
    }

    pub fn set_fields(&mut self, fields: EmFields) -> Result<()> {
        match self {
            FieldSolver::Fdtd(solver) => solver.set_fields(fields),
            FieldSolver::Electrostatic(solver) => solver.set_fields(fields),
        }
    }

    /// Whether light waves limit the time step.
    pub fn is_electromagnetic(&self) -> bool {
        matches!(self, FieldSolver::Fdtd(_))
    }
}

impl FieldOperator for FieldSolver {
    fn advance(&mut self, sources: &FieldSources, dt: Float) -> Result<()> {
        match self {
            FieldSolver::Fdtd(solver) => solver.advance(sources, dt),
            FieldSolver::Electrostatic(solver) => solver.advance(sources, dt),
        }
    }

    fn fields(&self) -> &EmFields {
        match self {
            FieldSolver::Fdtd(solver) => FieldOperator::fields(solver),
            FieldSolver::Electrostatic(solver) => FieldOperator::fields(solver),
        }
    }
}

/// Scalar summary of the state.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub time: Float,
    pub steps: usize,
    pub field_energy: Option<Float>,
    /// Particle number of each species over the interior.
    pub mass: Vec<Float>,
}

pub struct Simulation {
    context: ExecutionContext,
    driver: Driver<KineticSolver, FieldSolver>,
    dt: Float,
    t_final: Float,
    log_every: usize,
}

impl Simulation {
    /// Builds every component described by `config` and samples the initial
    /// distribution function `init(species, q1, q2, [p1, p2, p3])` at cell centres.
    pub fn new<I>(config: &Config, init: I) -> Result<Self>
    where
        I: Fn(&Species, SpaceCoordinate, SpaceCoordinate, [Float; 3]) -> Float,
    {
        config.validate()?;
        let numerics = &config.numerics;
        let reconstruction = Reconstruction::from_str(&numerics.reconstruction)?;
        let riemann = RiemannSolver::from_str(&numerics.riemann_solver)?;
        let stepper = TimeStepper::from_str(&numerics.timestepper)?;
        let splitting = Splitting::from_str(&numerics.splitting)?;
        let mode = EvolutionMode::from_str(&numerics.evolution_mode)?;
        let field_init = FieldInitialization::from_str(&config.fields.initialize)?;
        let field_kind = FieldSolverKind::from_str(&config.fields.solver)?;
        let boundaries = Boundaries::from_tags(&config.boundaries)?;

        let domain = &config.domain;
        let grid = Grid::new(
            domain.n_q1,
            domain.n_q2,
            domain.n_ghost,
            (domain.q1_start, domain.q1_end),
            (domain.q2_start, domain.q2_end),
        )?;
        let phase_space = PhaseSpace::new(
            grid.clone(),
            config.velocity.clone(),
            config.species.clone(),
        )?;
        let context = ExecutionContext::new(config.run.n_threads)?;

        let mut kinetic = KineticSolver::new(
            phase_space,
            FluxDivergence::new(reconstruction, riemann),
            boundaries,
        )?;
        if config.fields.enabled {
            kinetic = kinetic.with_source(LorentzForce);
        }
        let phase_space = kinetic.phase_space();
        let mut f = phase_space.distribution_from_fn(init);
        kinetic.apply_boundaries(&mut f);

        let field = if config.fields.enabled {
            let fields = match field_init {
                FieldInitialization::Electrostatic => context.install(|| {
                    electrostatic_fields(phase_space, kinetic.moments(), f.view(), &boundaries, mode)
                })?,
                FieldInitialization::Zero => EmFields::zeros(&grid),
            };
            Some(FieldSolver::new(field_kind, grid, boundaries, mode, fields)?)
        } else {
            None
        };

        let light_limited = field.as_ref().is_some_and(FieldSolver::is_electromagnetic);
        let dt = match numerics.dt {
            Some(dt) => dt,
            None => suggested_dt(kinetic.phase_space(), numerics.cfl, light_limited),
        };

        info!(
            dt,
            t_final = numerics.t_final,
            ?stepper,
            ?splitting,
            field_solver = ?config.fields.enabled.then_some(field_kind),
            "simulation assembled"
        );
        Ok(Self {
            context,
            driver: Driver::new(kinetic, field, f, stepper, splitting),
            dt,
            t_final: numerics.t_final,
            log_every: config.run.log_every,
        })
    }

    pub fn dt(&self) -> Float {
        self.dt
    }

    pub fn time(&self) -> Float {
        self.driver.time()
    }

    pub fn driver(&self) -> &Driver<KineticSolver, FieldSolver> {
        &self.driver
    }

    pub fn distribution_function(&self) -> &Array4<Float> {
        self.driver.distribution_function()
    }

    pub fn fields(&self) -> Option<&EmFields> {
        self.driver.field().map(FieldOperator::fields)
    }

    /// Replaces the field state with user-defined fields.
    pub fn set_fields(&mut self, fields: EmFields) -> Result<()> {
        match self.driver.field_mut() {
            Some(solver) => solver.set_fields(fields),
            None => Err(Error::InvalidParameter("field evolution is disabled".into())),
        }
    }

    /// One split step of the configured size.
    pub fn step(&mut self) -> Result<()> {
        let dt = self.dt;
        self.context.install(|| self.driver.step(dt))
    }

    /// Steps to the configured final time, logging every `log_every` steps.
    pub fn run(&mut self) -> Result<Diagnostics> {
        while self.time() < self.t_final - 1e-12 * self.dt {
            let dt = self.dt.min(self.t_final - self.time());
            self.context.install(|| self.driver.step(dt))?;
            if self.driver.steps() % self.log_every == 0 {
                let diagnostics = self.diagnostics();
                info!(
                    time = diagnostics.time,
                    step = diagnostics.steps,
                    field_energy = ?diagnostics.field_energy,
                    mass = ?diagnostics.mass,
                    "progress"
                );
            }
        }
        self.driver.finish();
        Ok(self.diagnostics())
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let kinetic = self.driver.kinetic();
        let grid = &kinetic.phase_space().grid;
        let density = kinetic
            .moments()
            .compute(Moment::Density, self.distribution_function().view());
        let interior = s![.., grid.interior(Axis::Q1), grid.interior(Axis::Q2)];
        let mass = density
            .slice(interior)
            .sum_axis(ArrayAxis(2))
            .sum_axis(ArrayAxis(1))
            .mapv(|n| n * grid.dq1 * grid.dq2)
            .to_vec();
        Diagnostics {
            time: self.time(),
            steps: self.driver.steps(),
            field_energy: self.fields().map(|fields| fields.energy(grid)),
            mass,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.time(), self.distribution_function(), self.fields())
    }

    /// Resumes from `snapshot`; shapes must match the configured grids.
    pub fn restore(&mut self, snapshot: Snapshot) -> Result<()> {
        let time = snapshot.time;
        let (f, fields) = snapshot.restore(self.driver.kinetic().phase_space())?;
        self.driver.set_distribution_function(f)?;
        if let Some(fields) = fields {
            self.set_fields(fields)?;
        }
        self.driver.set_time(time);
        Ok(())
    }
}

/// `cfl * min(dq1, dq2) / max(v_max, c)`, with `c` left out unless light waves are
/// evolved.
pub fn suggested_dt(phase_space: &PhaseSpace, cfl: Float, light_limited: bool) -> Float {
    let lightest = phase_space
        .species
        .iter()
        .map(|s| s.mass)
        .fold(Float::INFINITY, Float::min);
    let mut speed = phase_space.velocity.max_speed() / lightest;
    if light_limited {
        speed = speed.max(SPEED_OF_LIGHT);
    }
    let grid = &phase_space.grid;
    cfl * grid.dq1.min(grid.dq2) / speed
}
