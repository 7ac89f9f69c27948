//! Electric field from the charge density by a spectral Poisson solve, used for the
//! initial fields and as a field solver of its own.
//!
//! Solves `∇·E = ρ` with `E = -∇φ` on the periodic interior:
//! `Ê(k) = -i k ρ̂(k) / |k|²`, evaluated at the staggered E1/E2 positions through a
//! phase shift. The mean charge is dropped (neutralising background) and Nyquist modes
//! are discarded.

use std::f64::consts::PI;
use std::str::FromStr;

use ndarray::{s, Array2, ArrayView4, Axis as ArrayAxis, Zip};
use num_complex::Complex64;
use tracing::{debug, info};

use crate::boundary::{apply_field_boundaries, Boundaries};
use crate::fields::{Component, EmFields};
use crate::grid::{Axis, Grid, PhaseSpace};
use crate::moments::{charge_density, MomentsHook};
use crate::{Error, Float, Result};

/// How the initial perturbation is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvolutionMode {
    /// The full charge density on the grid.
    FullGrid,
    /// Only the strongest non-uniform Fourier mode of the charge density.
    SingleMode,
}

impl FromStr for EvolutionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full-grid" => Ok(EvolutionMode::FullGrid),
            "single-mode" => Ok(EvolutionMode::SingleMode),
            other => Err(Error::unknown("evolution mode", other)),
        }
    }
}

/// Electrostatic fields of the charge carried by `f`.
pub fn electrostatic_fields(
    phase_space: &PhaseSpace,
    moments: &dyn MomentsHook,
    f: ArrayView4<Float>,
    boundaries: &Boundaries,
    mode: EvolutionMode,
) -> Result<EmFields> {
    let rho = charge_density(moments, &phase_space.species, f);
    let fields = solve_poisson(&rho, &phase_space.grid, boundaries, mode)?;
    info!(?mode, energy = fields.energy(&phase_space.grid), "electrostatic fields initialised");
    Ok(fields)
}

/// Field solver that recomputes the electric field from the charge density on every
/// call, for electrostatic problems. Magnetic components stay zero.
#[derive(Debug, Clone)]
pub struct ElectrostaticSolver {
    grid: Grid,
    boundaries: Boundaries,
    mode: EvolutionMode,
    fields: EmFields,
    time: Float,
}

impl ElectrostaticSolver {
    /// Starts from `fields`; fails unless every axis is periodic.
    pub fn new(
        grid: Grid,
        boundaries: Boundaries,
        mode: EvolutionMode,
        mut fields: EmFields,
    ) -> Result<Self> {
        if !boundaries.is_periodic() {
            return Err(Error::InvalidParameter(
                "electrostatic field solver needs periodic boundaries".into(),
            ));
        }
        fields.check_shape(&grid)?;
        apply_field_boundaries(&mut fields, &grid, &boundaries);
        Ok(Self {
            grid,
            boundaries,
            mode,
            fields,
            time: 0.0,
        })
    }

    pub fn fields(&self) -> &EmFields {
        &self.fields
    }

    pub fn set_fields(&mut self, mut fields: EmFields) -> Result<()> {
        fields.check_shape(&self.grid)?;
        apply_field_boundaries(&mut fields, &self.grid, &self.boundaries);
        self.fields = fields;
        Ok(())
    }

    pub fn time(&self) -> Float {
        self.time
    }

    /// Replaces the fields with those of `rho` and moves the clock by `dt`.
    pub fn evolve(&mut self, rho: &Array2<Float>, dt: Float) -> Result<()> {
        self.fields = solve_poisson(rho, &self.grid, &self.boundaries, self.mode)?;
        self.time += dt;
        Ok(())
    }
}

/// Electric field of the cell-centred charge density `rho`. Only E1 and E2 are set;
/// ghost zones are refreshed before returning.
pub fn solve_poisson(
    rho: &Array2<Float>,
    grid: &Grid,
    boundaries: &Boundaries,
    mode: EvolutionMode,
) -> Result<EmFields> {
    if !boundaries.is_periodic() {
        return Err(Error::InvalidParameter(
            "spectral poisson solve needs periodic boundaries".into(),
        ));
    }
    let (n1, n2) = grid.shape();
    if rho.shape() != [n1, n2] {
        return Err(Error::shape(&[n1, n2], rho.shape()));
    }

    let interior = s![grid.interior(Axis::Q1), grid.interior(Axis::Q2)];
    let mut rho_hat = rho.slice(interior).mapv(|x| Complex64::new(x, 0.0));
    dft(&mut rho_hat, false);
    rho_hat[[0, 0]] = Complex64::new(0.0, 0.0);
    if mode == EvolutionMode::SingleMode {
        keep_strongest_mode(&mut rho_hat);
    }

    let k1 = wave_numbers(grid.n_q1, grid.dq1);
    let k2 = wave_numbers(grid.n_q2, grid.dq2);
    let mut e1_hat = Array2::zeros(rho_hat.raw_dim());
    let mut e2_hat = Array2::zeros(rho_hat.raw_dim());
    // Offsets of E1 and E2 from the cell centre.
    let (shift1, shift2) = (-0.5 * grid.dq2, -0.5 * grid.dq1);
    Zip::indexed(&mut e1_hat)
        .and(&mut e2_hat)
        .and(&rho_hat)
        .for_each(|(a, b), e1, e2, &rho| {
            let (Some(ka), Some(kb)) = (k1[a], k2[b]) else {
                return;
            };
            let k_squared = ka * ka + kb * kb;
            if k_squared == 0.0 {
                return;
            }
            let minus_i = Complex64::new(0.0, -1.0);
            *e1 = minus_i * ka * rho / k_squared * Complex64::from_polar(1.0, kb * shift1);
            *e2 = minus_i * kb * rho / k_squared * Complex64::from_polar(1.0, ka * shift2);
        });
    dft(&mut e1_hat, true);
    dft(&mut e2_hat, true);

    let mut fields = EmFields::zeros(grid);
    fields
        .get_mut(Component::E1)
        .slice_mut(interior)
        .assign(&e1_hat.mapv(|z| z.re));
    fields
        .get_mut(Component::E2)
        .slice_mut(interior)
        .assign(&e2_hat.mapv(|z| z.re));
    apply_field_boundaries(&mut fields, grid, boundaries);
    debug!(?mode, energy = fields.energy(grid), "poisson solved");
    Ok(fields)
}

/// Angular wave numbers in DFT order; `None` marks the Nyquist mode.
fn wave_numbers(n: usize, dq: Float) -> Vec<Option<Float>> {
    let length = n as Float * dq;
    (0..n)
        .map(|m| {
            if n % 2 == 0 && m == n / 2 && n > 1 {
                None
            } else if m <= n / 2 {
                Some(2.0 * PI * m as Float / length)
            } else {
                Some(2.0 * PI * (m as Float - n as Float) / length)
            }
        })
        .collect()
}

/// Zeroes every mode but the largest one and its conjugate partner.
fn keep_strongest_mode(spectrum: &mut Array2<Complex64>) {
    let (n1, n2) = spectrum.dim();
    let strongest = spectrum
        .indexed_iter()
        .max_by(|(_, a), (_, b)| a.norm().total_cmp(&b.norm()))
        .map(|(index, _)| index);
    let Some((a, b)) = strongest else {
        return;
    };
    let partner = ((n1 - a) % n1, (n2 - b) % n2);
    for ((i, j), value) in spectrum.indexed_iter_mut() {
        if (i, j) != (a, b) && (i, j) != partner {
            *value = Complex64::new(0.0, 0.0);
        }
    }
}

/// In-place two-dimensional discrete Fourier transform, one axis at a time.
/// The inverse is normalised.
fn dft(data: &mut Array2<Complex64>, inverse: bool) {
    for axis in [ArrayAxis(0), ArrayAxis(1)] {
        let n = data.len_of(axis);
        let sign = if inverse { 1.0 } else { -1.0 };
        let twiddles: Vec<Complex64> = (0..n)
            .map(|m| Complex64::from_polar(1.0, sign * 2.0 * PI * m as Float / n as Float))
            .collect();
        let scale = if inverse { 1.0 / n as Float } else { 1.0 };
        Zip::from(data.lanes_mut(axis)).par_for_each(|mut lane| {
            let input = lane.to_vec();
            for (k, out) in lane.iter_mut().enumerate() {
                let sum: Complex64 = input
                    .iter()
                    .enumerate()
                    .map(|(j, x)| x * twiddles[(j * k) % n])
                    .sum();
                *out = sum * scale;
            }
        });
    }
}
