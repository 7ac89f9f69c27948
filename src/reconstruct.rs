//! Face reconstruction of cell-averaged quantities.
//!
//! For every cell two face values are produced along the chosen axis: the value just
//! inside its left/bottom face ("plus epsilon") and the value just inside its
//! right/top face ("minus epsilon"). Cells too close to the array edge for the stencil
//! keep their cell-centred value; they lie in the ghost zones whenever the ghost width
//! passes [`Reconstruction::validate_ghosts`].

use std::str::FromStr;

use ndarray::{Array4, ArrayView4, Slice, Zip};

use crate::grid::Axis;
use crate::{Error, Float, Result};

/// Regularisation of the WENO weights.
const WENO_EPSILON: Float = 1e-6;
/// Linear weights of the three candidate stencils.
const WENO_LINEAR_WEIGHTS: [Float; 3] = [0.1, 0.6, 0.3];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconstruction {
    /// Slope-limited linear reconstruction, second order.
    Minmod,
    /// Weighted essentially non-oscillatory, fifth order in smooth regions.
    Weno5,
}

impl FromStr for Reconstruction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "minmod" => Ok(Reconstruction::Minmod),
            "weno5" => Ok(Reconstruction::Weno5),
            other => Err(Error::unknown("reconstruction method", other)),
        }
    }
}

impl Reconstruction {
    pub const fn name(self) -> &'static str {
        match self {
            Reconstruction::Minmod => "minmod",
            Reconstruction::Weno5 => "weno5",
        }
    }

    /// Ghost width needed so that every interior face sees a full stencil.
    pub const fn required_ghosts(self) -> usize {
        match self {
            Reconstruction::Minmod => 2,
            Reconstruction::Weno5 => 3,
        }
    }

    pub fn validate_ghosts(self, n_ghost: usize) -> Result<()> {
        if n_ghost < self.required_ghosts() {
            return Err(Error::InsufficientGhostZones {
                method: self.name(),
                required: self.required_ghosts(),
                available: n_ghost,
            });
        }
        Ok(())
    }

    /// Returns `(plus_eps, minus_eps)` face values of `f` along `axis`.
    pub fn reconstruct(self, f: ArrayView4<Float>, axis: Axis) -> (Array4<Float>, Array4<Float>) {
        let ax = axis.phase_axis();
        let n = f.len_of(ax);
        let width = self.required_ghosts() - 1;
        let mut plus_eps = f.to_owned();
        let mut minus_eps = f.to_owned();
        if n < 2 * width + 1 {
            return (plus_eps, minus_eps);
        }

        // View of `f` shifted by `offset` cells relative to the reconstructed cells.
        let shifted = |offset: isize| {
            let start = (width as isize + offset) as usize;
            f.slice_axis(ax, Slice::from(start..start + n - 2 * width))
        };
        let mut plus = plus_eps.slice_axis_mut(ax, Slice::from(width..n - width));
        let mut minus = minus_eps.slice_axis_mut(ax, Slice::from(width..n - width));

        match self {
            Reconstruction::Minmod => {
                Zip::from(&mut plus)
                    .and(&mut minus)
                    .and(shifted(-1))
                    .and(shifted(0))
                    .and(shifted(1))
                    .par_for_each(|plus, minus, &left, &center, &right| {
                        let slope = minmod(right - center, center - left);
                        *plus = center - 0.5 * slope;
                        *minus = center + 0.5 * slope;
                    });
            }
            Reconstruction::Weno5 => {
                Zip::from(&mut minus)
                    .and(shifted(-2))
                    .and(shifted(-1))
                    .and(shifted(0))
                    .and(shifted(1))
                    .and(shifted(2))
                    .par_for_each(|minus, &a, &b, &c, &d, &e| *minus = weno5(a, b, c, d, e));
                Zip::from(&mut plus)
                    .and(shifted(-2))
                    .and(shifted(-1))
                    .and(shifted(0))
                    .and(shifted(1))
                    .and(shifted(2))
                    .par_for_each(|plus, &a, &b, &c, &d, &e| *plus = weno5(e, d, c, b, a));
            }
        }
        (plus_eps, minus_eps)
    }
}

/// Smaller-magnitude argument when both share a sign, zero otherwise.
#[inline]
pub fn minmod(a: Float, b: Float) -> Float {
    if a * b > 0.0 {
        if a.abs() < b.abs() {
            a
        } else {
            b
        }
    } else {
        0.0
    }
}

/// Value at the face between `c` and `d` reconstructed from the stencil `a..=e`
/// centred on `c`.
#[inline]
pub fn weno5(a: Float, b: Float, c: Float, d: Float, e: Float) -> Float {
    let candidates = [
        (2.0 * a - 7.0 * b + 11.0 * c) / 6.0,
        (-b + 5.0 * c + 2.0 * d) / 6.0,
        (2.0 * c + 5.0 * d - e) / 6.0,
    ];
    let smoothness = [
        13.0 / 12.0 * (a - 2.0 * b + c).powi(2) + 0.25 * (a - 4.0 * b + 3.0 * c).powi(2),
        13.0 / 12.0 * (b - 2.0 * c + d).powi(2) + 0.25 * (b - d).powi(2),
        13.0 / 12.0 * (c - 2.0 * d + e).powi(2) + 0.25 * (3.0 * c - 4.0 * d + e).powi(2),
    ];

    let mut alpha = [0.0; 3];
    for k in 0..3 {
        alpha[k] = WENO_LINEAR_WEIGHTS[k] / (WENO_EPSILON + smoothness[k]).powi(2);
    }
    let total: Float = alpha.iter().sum();
    alpha
        .iter()
        .zip(candidates.iter())
        .map(|(w, q)| w * q)
        .sum::<Float>()
        / total
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use ndarray::Array4;

    use super::*;

    fn profile(values: &[Float]) -> Array4<Float> {
        Array4::from_shape_fn((1, values.len(), 1, 1), |(_, i, _, _)| values[i])
    }

    #[test]
    fn test_minmod_limiter() {
        assert_eq!(1.0, minmod(1.0, 2.0));
        assert_eq!(-0.5, minmod(-3.0, -0.5));
        assert_eq!(0.0, minmod(1.0, -1.0));
        assert_eq!(0.0, minmod(0.0, 4.0));
    }

    #[test]
    fn test_constant_input_is_preserved() {
        let f = Array4::from_elem((2, 9, 7, 3), 1.7);
        for method in [Reconstruction::Minmod, Reconstruction::Weno5] {
            for axis in [Axis::Q1, Axis::Q2] {
                let (plus, minus) = method.reconstruct(f.view(), axis);
                for (&p, &m) in plus.iter().zip(minus.iter()) {
                    assert_relative_eq!(1.7, p, max_relative = 1e-12);
                    assert_relative_eq!(1.7, m, max_relative = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_linear_input_is_exact() {
        let values: Vec<Float> = (0..10).map(|i| 0.5 * i as Float - 1.0).collect();
        let f = profile(&values);
        for method in [Reconstruction::Minmod, Reconstruction::Weno5] {
            let (plus, minus) = method.reconstruct(f.view(), Axis::Q1);
            for i in 3..7 {
                assert_relative_eq!(values[i] - 0.25, plus[[0, i, 0, 0]], epsilon = 1e-10);
                assert_relative_eq!(values[i] + 0.25, minus[[0, i, 0, 0]], epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_minmod_flattens_extrema() {
        let f = profile(&[0.0, 1.0, 3.0, 1.0, 0.0]);
        let (plus, minus) = Reconstruction::Minmod.reconstruct(f.view(), Axis::Q1);
        assert_eq!(3.0, plus[[0, 2, 0, 0]]);
        assert_eq!(3.0, minus[[0, 2, 0, 0]]);
    }

    #[test]
    fn test_weno5_no_new_extrema_at_step() {
        let values = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let f = profile(&values);
        let (plus, minus) = Reconstruction::Weno5.reconstruct(f.view(), Axis::Q1);
        for i in 2..6 {
            for v in [plus[[0, i, 0, 0]], minus[[0, i, 0, 0]]] {
                assert!((-0.01..=1.01).contains(&v), "overshoot {v} in cell {i}");
            }
        }
    }

    #[test]
    fn test_reconstruct_along_q2_matches_q1() {
        let values: Vec<Float> = (0..8).map(|i| (0.7 * i as Float).sin()).collect();
        let along_q1 = profile(&values);
        let along_q2 = Array4::from_shape_fn((1, 1, values.len(), 1), |(_, _, j, _)| values[j]);
        let (p1, m1) = Reconstruction::Weno5.reconstruct(along_q1.view(), Axis::Q1);
        let (p2, m2) = Reconstruction::Weno5.reconstruct(along_q2.view(), Axis::Q2);
        for i in 0..values.len() {
            assert_relative_eq!(p1[[0, i, 0, 0]], p2[[0, 0, i, 0]]);
            assert_relative_eq!(m1[[0, i, 0, 0]], m2[[0, 0, i, 0]]);
        }
    }

    #[test]
    fn test_ghost_validation() {
        assert!(Reconstruction::Minmod.validate_ghosts(2).is_ok());
        assert!(matches!(
            Reconstruction::Weno5.validate_ghosts(2),
            Err(Error::InsufficientGhostZones { required: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        assert!(matches!(
            "ppm".parse::<Reconstruction>(),
            Err(Error::UnknownScheme { .. })
        ));
    }
}
