use std::path::Path;

use serde::Deserialize;

use crate::boundary::BoundaryTags;
use crate::grid::{Species, VelocityGrid};
use crate::{Error, Float, Result};

/// Environment variables prefixed with this override file values, e.g.
/// `PLASMA_NUMERICS__CFL=0.2`.
pub const ENV_PREFIX: &str = "PLASMA";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub domain: DomainConfig,
    pub velocity: VelocityGrid,
    pub species: Vec<Species>,
    pub boundaries: BoundaryTags,
    pub numerics: NumericsConfig,
    #[serde(default)]
    pub fields: FieldsConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    pub n_q1: usize,
    pub n_q2: usize,
    pub q1_start: Float,
    pub q1_end: Float,
    pub q2_start: Float,
    pub q2_end: Float,
    /// Ghost cells on every side; at least 2 for minmod, 3 for weno5.
    pub n_ghost: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumericsConfig {
    /// `minmod` or `weno5`.
    pub reconstruction: String,
    /// `upwind-flux` or `lax-friedrichs`.
    pub riemann_solver: String,
    /// `RK2`, `RK4` or `RK5`.
    pub timestepper: String,
    /// `lie` or `strang`.
    #[serde(default = "default_splitting")]
    pub splitting: String,
    /// `full-grid` or `single-mode`.
    #[serde(default = "default_evolution_mode")]
    pub evolution_mode: String,
    pub cfl: Float,
    pub t_final: Float,
    /// Fixed time step; derived from `cfl` when absent.
    #[serde(default)]
    pub dt: Option<Float>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldsConfig {
    pub enabled: bool,
    /// `electrostatic` or `none`.
    pub initialize: String,
    /// `fdtd` or `electrostatic`.
    #[serde(default = "default_field_solver")]
    pub solver: String,
}

impl Default for FieldsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initialize: "electrostatic".into(),
            solver: default_field_solver(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Number of threads, 0 for one per core.
    pub n_threads: usize,
    pub seed: u64,
    /// Log diagnostics every this many steps.
    pub log_every: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            n_threads: 0,
            seed: 42,
            log_every: 10,
        }
    }
}

fn default_splitting() -> String {
    "strang".into()
}

fn default_evolution_mode() -> String {
    "full-grid".into()
}

fn default_field_solver() -> String {
    "fdtd".into()
}

impl Config {
    /// Parses a TOML document without environment overrides.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;
        let settings: Config = config.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks the values serde cannot. Scheme names are checked when the simulation is
    /// assembled.
    pub fn validate(&self) -> Result<()> {
        let numerics = &self.numerics;
        if !(numerics.cfl > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "cfl must be positive, got {}",
                numerics.cfl
            )));
        }
        if !(numerics.t_final >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "t_final cannot be negative, got {}",
                numerics.t_final
            )));
        }
        if let Some(dt) = numerics.dt {
            if !(dt > 0.0) {
                return Err(Error::InvalidParameter(format!("dt must be positive, got {dt}")));
            }
        }
        if self.run.log_every == 0 {
            return Err(Error::InvalidParameter("log_every cannot be 0".into()));
        }
        self.velocity.validate()
    }
}

/// Reads `path` and applies `PLASMA_*` environment overrides.
pub fn read_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    let config = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Config = config.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

/// Reads `config/config.toml` relative to the working directory.
pub fn read_default_config() -> Result<Config> {
    read_config(Path::new("config/config.toml"))
}
