//! Explicit Runge-Kutta integrators for the kinetic step.

use std::str::FromStr;

use ndarray::{Array4, ArrayView4};
use tracing::trace;

use crate::{Error, Float, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStepper {
    /// Explicit midpoint rule.
    Rk2,
    /// Classic four-stage scheme.
    Rk4,
    /// Butcher's six-stage fifth-order scheme.
    Rk5,
}

impl FromStr for TimeStepper {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "RK2" => Ok(TimeStepper::Rk2),
            "RK4" => Ok(TimeStepper::Rk4),
            "RK5" => Ok(TimeStepper::Rk5),
            other => Err(Error::unknown("time stepper", other)),
        }
    }
}

/// Lower-triangular Butcher tableau; row `i` of `a` holds the weights of stage `i`.
struct Tableau {
    a: &'static [&'static [Float]],
    b: &'static [Float],
}

const RK2: Tableau = Tableau {
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
};

const RK4: Tableau = Tableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
};

const RK5: Tableau = Tableau {
    a: &[
        &[],
        &[0.25],
        &[0.125, 0.125],
        &[0.0, -0.5, 1.0],
        &[3.0 / 16.0, 0.0, 0.0, 9.0 / 16.0],
        &[-3.0 / 7.0, 2.0 / 7.0, 12.0 / 7.0, -12.0 / 7.0, 8.0 / 7.0],
    ],
    b: &[
        7.0 / 90.0,
        0.0,
        32.0 / 90.0,
        12.0 / 90.0,
        32.0 / 90.0,
        7.0 / 90.0,
    ],
};

impl TimeStepper {
    fn tableau(self) -> &'static Tableau {
        match self {
            TimeStepper::Rk2 => &RK2,
            TimeStepper::Rk4 => &RK4,
            TimeStepper::Rk5 => &RK5,
        }
    }

    pub fn stages(self) -> usize {
        self.tableau().b.len()
    }

    /// Returns `f` advanced by `dt` without touching `f`.
    ///
    /// `derivative` evaluates the right-hand side of one stage. `refresh` is applied to
    /// every intermediate stage state and to the result, and is where ghost zones get
    /// refilled.
    pub fn step<D, R>(
        self,
        f: &Array4<Float>,
        dt: Float,
        mut derivative: D,
        mut refresh: R,
    ) -> Result<Array4<Float>>
    where
        D: FnMut(ArrayView4<Float>) -> Result<Array4<Float>>,
        R: FnMut(&mut Array4<Float>),
    {
        let tableau = self.tableau();
        let mut k: Vec<Array4<Float>> = Vec::with_capacity(tableau.b.len());

        for (stage, weights) in tableau.a.iter().enumerate() {
            let slope = if weights.is_empty() {
                derivative(f.view())?
            } else {
                let mut state = f.clone();
                for (w, k_j) in weights.iter().zip(&k) {
                    if *w != 0.0 {
                        state.scaled_add(dt * w, k_j);
                    }
                }
                refresh(&mut state);
                derivative(state.view())?
            };
            trace!(stage, "runge-kutta stage evaluated");
            k.push(slope);
        }

        let mut next = f.clone();
        for (w, k_j) in tableau.b.iter().zip(&k) {
            if *w != 0.0 {
                next.scaled_add(dt * w, k_j);
            }
        }
        refresh(&mut next);
        Ok(next)
    }
}
