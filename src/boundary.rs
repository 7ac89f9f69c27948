//! Ghost-zone refresh for the distribution function and the field components.

use std::str::FromStr;

use ndarray::{Array, Array4, ArrayViewMut, Axis as ArrayAxis, RemoveAxis};
use serde::Deserialize;

use crate::fields::{Component, EmFields};
use crate::grid::{Axis, Grid, VelocityGrid};
use crate::{Error, Float, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Ghost cells copy the opposite edge of the domain.
    Periodic,
    /// Ghost cells mirror the interior, as a perfectly conducting wall.
    Mirror,
}

impl FromStr for BoundaryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "periodic" => Ok(BoundaryKind::Periodic),
            "mirror" => Ok(BoundaryKind::Mirror),
            other => Err(Error::unknown("boundary condition", other)),
        }
    }
}

/// Boundary tags of the four domain edges as they appear in a configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryTags {
    pub q1_left: String,
    pub q1_right: String,
    pub q2_bottom: String,
    pub q2_top: String,
}

/// Boundary condition of each axis.
///
/// Periodicity must hold on both edges of an axis, so a mirror on one edge and a
/// wrap on the other is rejected when parsing the edge tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundaries {
    pub q1: BoundaryKind,
    pub q2: BoundaryKind,
}

impl Boundaries {
    pub const PERIODIC: Boundaries = Boundaries {
        q1: BoundaryKind::Periodic,
        q2: BoundaryKind::Periodic,
    };

    pub const MIRROR: Boundaries = Boundaries {
        q1: BoundaryKind::Mirror,
        q2: BoundaryKind::Mirror,
    };

    pub fn from_tags(tags: &BoundaryTags) -> Result<Self> {
        let pair = |low: &str, high: &str, axis: &str| -> Result<BoundaryKind> {
            let (low, high) = (low.parse()?, high.parse()?);
            if low != high {
                return Err(Error::InvalidParameter(format!(
                    "edges of {axis} disagree: {low:?} and {high:?}"
                )));
            }
            Ok(low)
        };
        Ok(Self {
            q1: pair(&tags.q1_left, &tags.q1_right, "q1")?,
            q2: pair(&tags.q2_bottom, &tags.q2_top, "q2")?,
        })
    }

    pub const fn along(&self, axis: Axis) -> BoundaryKind {
        match axis {
            Axis::Q1 => self.q1,
            Axis::Q2 => self.q2,
        }
    }

    pub fn is_periodic(&self) -> bool {
        self.q1 == BoundaryKind::Periodic && self.q2 == BoundaryKind::Periodic
    }
}

/// Sign a component picks up when mirrored through a conducting wall normal to `axis`.
///
/// At a perfect electric conductor the tangential electric field and the normal
/// magnetic field vanish, so those reflect with odd parity.
pub const fn mirror_sign(component: Component, axis: Axis) -> Float {
    let normal = component.is_normal_to(axis);
    if component.is_electric() != normal {
        -1.0
    } else {
        1.0
    }
}

/// Refreshes the ghost zones of all six field components.
pub fn apply_field_boundaries(fields: &mut EmFields, grid: &Grid, boundaries: &Boundaries) {
    for (component, array) in Component::ALL.iter().zip(fields.components.iter_mut()) {
        for axis in [Axis::Q1, Axis::Q2] {
            let ax = axis.field_axis();
            let (n, g) = (grid.cells(axis), grid.n_ghost);
            match boundaries.along(axis) {
                BoundaryKind::Periodic => wrap(array.view_mut(), ax, n, g),
                BoundaryKind::Mirror => {
                    let sign = mirror_sign(*component, axis);
                    reflect(array.view_mut(), ax, n, g, |mut ghost, interior| {
                        ghost.assign(&interior);
                        ghost.mapv_inplace(|x| sign * x);
                    });
                }
            }
        }
    }
}

/// Ghost-zone refresh for a distribution function `(species, q1, q2, v)`.
#[derive(Debug, Clone)]
pub struct KineticBoundaries {
    boundaries: Boundaries,
    /// Velocity-bin permutations reversing p1 and p2, needed by mirror walls.
    reflections: [Option<Vec<usize>>; 2],
}

impl KineticBoundaries {
    pub fn new(boundaries: Boundaries, velocity: &VelocityGrid) -> Result<Self> {
        let reflection = |axis: Axis, component: usize| -> Result<Option<Vec<usize>>> {
            match boundaries.along(axis) {
                BoundaryKind::Mirror => velocity.reflection(component).map(Some),
                BoundaryKind::Periodic => Ok(None),
            }
        };
        Ok(Self {
            boundaries,
            reflections: [reflection(Axis::Q1, 0)?, reflection(Axis::Q2, 1)?],
        })
    }

    pub fn boundaries(&self) -> &Boundaries {
        &self.boundaries
    }

    pub fn apply(&self, f: &mut Array4<Float>, grid: &Grid) {
        for (axis, reflection) in [Axis::Q1, Axis::Q2].into_iter().zip(&self.reflections) {
            let ax = axis.phase_axis();
            let (n, g) = (grid.cells(axis), grid.n_ghost);
            match reflection {
                None => wrap(f.view_mut(), ax, n, g),
                Some(reflection) => {
                    // With one spatial axis removed the velocity axis is the third.
                    reflect(f.view_mut(), ax, n, g, |mut ghost, interior| {
                        ghost.assign(&interior.select(ArrayAxis(2), reflection));
                    });
                }
            }
        }
    }
}

/// Fills the ghost cells along `ax` from the periodic image of the interior. Axes with
/// fewer cells than ghosts wrap more than once.
fn wrap<D: RemoveAxis>(mut a: ArrayViewMut<Float, D>, ax: ArrayAxis, n: usize, g: usize) {
    for ghost in (0..g).chain(g + n..2 * g + n) {
        let source = g + (ghost as isize - g as isize).rem_euclid(n as isize) as usize;
        let image = a.index_axis(ax, source).to_owned();
        a.index_axis_mut(ax, ghost).assign(&image);
    }
}

/// Fills each ghost slab with `fill(ghost, mirrored interior slab)` along `ax`.
///
/// A ghost `d` cells past a wall mirrors the interior cell `d` cells inside it. When
/// `d >= n` that point lies beyond the opposite wall too, so the image is reflected
/// once more per crossing.
fn reflect<D, F>(mut a: ArrayViewMut<Float, D>, ax: ArrayAxis, n: usize, g: usize, fill: F)
where
    D: RemoveAxis,
    F: Fn(ArrayViewMut<Float, D::Smaller>, Array<Float, D::Smaller>),
{
    for d in 0..g {
        let (crossings, depth) = (d / n, d % n);
        let depth = if crossings % 2 == 0 { depth } else { n - 1 - depth };
        for (ghost, source) in [(g - 1 - d, g + depth), (g + n + d, g + n - 1 - depth)] {
            let mut image = a.index_axis(ax, source).to_owned();
            for _ in 0..crossings {
                let once = image.clone();
                fill(image.view_mut(), once);
            }
            fill(a.index_axis_mut(ax, ghost), image);
        }
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;
    use ndarray::{s, Array2, Ix1};

    use super::*;

    fn grid() -> Grid {
        Grid::new(5, 4, 2, (0.0, 1.0), (0.0, 1.0)).unwrap()
    }

    fn numbered(grid: &Grid) -> EmFields {
        EmFields::from_fn(grid, |component, q1, q2| {
            (component.index() + 1) as Float * (1.0 + 3.0 * q1 + 7.0 * q2)
        })
    }

    #[test]
    fn test_periodic_ghosts_wrap_around() {
        let grid = grid();
        let mut fields = numbered(&grid);
        apply_field_boundaries(&mut fields, &grid, &Boundaries::PERIODIC);
        let e1 = fields.get(Component::E1);
        // q1: ghosts 0, 1 <- interior 5, 6; ghosts 7, 8 <- interior 2, 3.
        assert_eq!(e1[[0, 3]], e1[[5, 3]]);
        assert_eq!(e1[[1, 3]], e1[[6, 3]]);
        assert_eq!(e1[[7, 3]], e1[[2, 3]]);
        assert_eq!(e1[[8, 3]], e1[[3, 3]]);
        // Corners are consistent with both axes.
        assert_eq!(e1[[0, 0]], e1[[5, 4]]);
    }

    #[test]
    fn test_mirror_signs_follow_conductor() {
        // q1 walls: tangential E2, E3 and normal B1 flip.
        let q1_flips: Vec<_> = Component::ALL
            .iter()
            .map(|&c| mirror_sign(c, Axis::Q1) < 0.0)
            .collect();
        assert_eq!(vec![false, true, true, true, false, false], q1_flips);
        // q2 walls: tangential E1, E3 and normal B2 flip.
        let q2_flips: Vec<_> = Component::ALL
            .iter()
            .map(|&c| mirror_sign(c, Axis::Q2) < 0.0)
            .collect();
        assert_eq!(vec![true, false, true, false, true, false], q2_flips);
    }

    #[test]
    fn test_mirror_ghosts_reflect_interior() {
        let grid = grid();
        let mut fields = numbered(&grid);
        apply_field_boundaries(&mut fields, &grid, &Boundaries::MIRROR);
        let j = 3;
        let e2 = fields.get(Component::E2);
        assert_relative_eq!(-e2[[2, j]], e2[[1, j]]);
        assert_relative_eq!(-e2[[3, j]], e2[[0, j]]);
        assert_relative_eq!(-e2[[6, j]], e2[[7, j]]);
        let e1 = fields.get(Component::E1);
        assert_relative_eq!(e1[[2, j]], e1[[1, j]]);
        assert_relative_eq!(-e1[[j, 2]], e1[[j, 1]]);
    }

    #[test]
    fn test_mismatched_edges_are_rejected() {
        let tags = BoundaryTags {
            q1_left: "periodic".into(),
            q1_right: "mirror".into(),
            q2_bottom: "periodic".into(),
            q2_top: "periodic".into(),
        };
        assert!(matches!(
            Boundaries::from_tags(&tags),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_unknown_boundary_is_rejected() {
        let tags = BoundaryTags {
            q1_left: "absorbing".into(),
            q1_right: "absorbing".into(),
            q2_bottom: "periodic".into(),
            q2_top: "periodic".into(),
        };
        assert!(matches!(
            Boundaries::from_tags(&tags),
            Err(Error::UnknownScheme { .. })
        ));
    }

    #[test]
    fn test_kinetic_mirror_reverses_normal_velocity() {
        let grid = Grid::new(4, 4, 2, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let velocity = VelocityGrid::new([4, 2, 1], [-2.0, -1.0, -0.5], [2.0, 1.0, 0.5]).unwrap();
        let boundaries = Boundaries {
            q1: BoundaryKind::Mirror,
            q2: BoundaryKind::Periodic,
        };
        let kinetic = KineticBoundaries::new(boundaries, &velocity).unwrap();
        let (n1, n2) = grid.shape();
        let mut f = Array4::from_shape_fn((1, n1, n2, velocity.len()), |(_, i, j, v)| {
            (i * 100 + j * 10 + v) as Float
        });
        kinetic.apply(&mut f, &grid);

        let reflection = velocity.reflection(0).unwrap();
        for v in 0..velocity.len() {
            assert_eq!(f[[0, 2, 3, reflection[v]]], f[[0, 1, 3, v]]);
            assert_eq!(f[[0, 5, 3, reflection[v]]], f[[0, 6, 3, v]]);
        }
        // q2 stays periodic.
        assert_eq!(f[[0, 3, 4, 0]], f[[0, 3, 0, 0]]);
    }

    #[test]
    fn test_kinetic_mirror_needs_symmetric_velocity() {
        let velocity = VelocityGrid::new([4, 1, 1], [0.0, -0.5, -0.5], [4.0, 0.5, 0.5]).unwrap();
        assert!(KineticBoundaries::new(Boundaries::MIRROR, &velocity).is_err());
        assert!(KineticBoundaries::new(Boundaries::PERIODIC, &velocity).is_ok());
    }

    #[test]
    fn test_wrap_on_plain_array() {
        let mut a = Array2::from_shape_fn((7, 1), |(i, _)| i as Float);
        wrap(a.view_mut(), ArrayAxis(0), 3, 2);
        assert_eq!(vec![3.0, 4.0, 2.0, 3.0, 4.0, 2.0, 3.0], a.column(0).to_vec());
    }

    #[test]
    fn test_wrap_with_fewer_cells_than_ghosts() {
        let mut a = Array2::from_shape_fn((7, 2), |(i, j)| (i + 10 * j) as Float);
        wrap(a.view_mut(), ArrayAxis(0), 1, 3);
        assert_eq!(vec![3.0; 7], a.column(0).to_vec());
        assert_eq!(vec![13.0; 7], a.column(1).to_vec());

        let mut a = Array2::from_shape_fn((8, 1), |(i, _)| i as Float);
        wrap(a.view_mut(), ArrayAxis(0), 2, 3);
        assert_eq!(vec![4.0, 3.0, 4.0, 3.0, 4.0, 3.0, 4.0, 3.0], a.column(0).to_vec());
    }

    #[test]
    fn test_reflect_with_fewer_cells_than_ghosts() {
        let odd = |mut ghost: ArrayViewMut<Float, Ix1>, interior: Array<Float, Ix1>| {
            ghost.assign(&interior);
            ghost.mapv_inplace(|x: Float| -x);
        };

        let mut a = Array2::from_shape_fn((7, 1), |(i, _)| i as Float);
        reflect(a.view_mut(), ArrayAxis(0), 1, 3, odd);
        assert_eq!(
            vec![-3.0, 3.0, -3.0, 3.0, -3.0, 3.0, -3.0],
            a.column(0).to_vec()
        );

        // Two interior cells 3, 4: the mirror images repeat with period four.
        let mut a = Array2::from_shape_fn((8, 1), |(i, _)| i as Float);
        reflect(a.view_mut(), ArrayAxis(0), 2, 3, odd);
        assert_eq!(
            vec![4.0, -4.0, -3.0, 3.0, 4.0, -4.0, -3.0, 3.0],
            a.column(0).to_vec()
        );
    }

    #[test]
    fn test_single_row_axis_is_uniform_after_refresh() {
        // One interior row along q2 with three ghosts on each side.
        let grid = Grid::new(4, 1, 3, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let velocity = VelocityGrid::new([2, 2, 1], [-1.0, -1.0, -0.5], [1.0, 1.0, 0.5]).unwrap();
        let (n1, n2) = grid.shape();
        let mut f = Array4::from_shape_fn((1, n1, n2, velocity.len()), |(_, i, j, v)| {
            (i * 100 + j * 10 + v) as Float
        });
        let periodic = KineticBoundaries::new(Boundaries::PERIODIC, &velocity).unwrap();
        periodic.apply(&mut f, &grid);
        for j in 0..n2 {
            assert_eq!(f.slice(s![.., .., 3, ..]), f.slice(s![.., .., j, ..]));
        }

        let mirror = Boundaries {
            q1: BoundaryKind::Periodic,
            q2: BoundaryKind::Mirror,
        };
        let mut f = Array4::from_shape_fn((1, n1, n2, velocity.len()), |(_, i, j, v)| {
            (i * 100 + j * 10 + v) as Float
        });
        let kinetic = KineticBoundaries::new(mirror, &velocity).unwrap();
        kinetic.apply(&mut f, &grid);
        let reflection = velocity.reflection(1).unwrap();
        let interior = f.slice(s![.., .., 3, ..]).to_owned();
        let reversed = interior.select(ArrayAxis(2), &reflection);
        for (j, expected) in [(0, &reversed), (1, &interior), (2, &reversed)] {
            assert_eq!(expected, &f.slice(s![.., .., j, ..]));
            assert_eq!(expected, &f.slice(s![.., .., 6 - j, ..]));
        }
    }
}
