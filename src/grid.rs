//! Structured phase-space grids: the spatial (q1, q2) mesh with ghost zones and the
//! flattened velocity mesh.

use std::ops::Range;
use std::str::FromStr;

use ndarray::{Array1, Array4};
use serde::Deserialize;

use crate::{Error, Float, Result};

/// 1D continuous coordinate.
pub type SpaceCoordinate = Float;
/// 1D discrete index on a grid, ghost zones included.
pub type GridIndex = usize;

/// Spatial axis of the (q1, q2) mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Q1,
    Q2,
}

impl Axis {
    /// Array axis of this direction in a distribution function `(species, q1, q2, v)`.
    pub const fn phase_axis(self) -> ndarray::Axis {
        match self {
            Axis::Q1 => ndarray::Axis(1),
            Axis::Q2 => ndarray::Axis(2),
        }
    }

    /// Array axis of this direction in a field component `(q1, q2)`.
    pub const fn field_axis(self) -> ndarray::Axis {
        match self {
            Axis::Q1 => ndarray::Axis(0),
            Axis::Q2 => ndarray::Axis(1),
        }
    }
}

impl FromStr for Axis {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "q1" => Ok(Axis::Q1),
            "q2" => Ok(Axis::Q2),
            other => Err(Error::unknown("axis", other)),
        }
    }
}

/// Uniform 2D spatial mesh with `n_ghost` ghost cells on every side.
///
/// Cell `i` along q1 (ghosts included) has its centre at
/// `q1_start + (i - n_ghost + 0.5) * dq1`.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub n_q1: usize,
    pub n_q2: usize,
    pub n_ghost: usize,
    pub q1_start: SpaceCoordinate,
    pub q2_start: SpaceCoordinate,
    pub dq1: Float,
    pub dq2: Float,
}

impl Grid {
    pub fn new(
        n_q1: usize,
        n_q2: usize,
        n_ghost: usize,
        q1_range: (SpaceCoordinate, SpaceCoordinate),
        q2_range: (SpaceCoordinate, SpaceCoordinate),
    ) -> Result<Self> {
        if n_q1 == 0 || n_q2 == 0 {
            return Err(Error::InvalidParameter(format!(
                "grid needs at least one cell per axis, got {n_q1}x{n_q2}"
            )));
        }
        if n_ghost == 0 {
            return Err(Error::InvalidParameter("n_ghost cannot be 0".into()));
        }
        if !(q1_range.1 > q1_range.0 && q2_range.1 > q2_range.0) {
            return Err(Error::InvalidParameter(format!(
                "empty domain q1 {q1_range:?}, q2 {q2_range:?}"
            )));
        }
        Ok(Self {
            n_q1,
            n_q2,
            n_ghost,
            q1_start: q1_range.0,
            q2_start: q2_range.0,
            dq1: (q1_range.1 - q1_range.0) / n_q1 as Float,
            dq2: (q2_range.1 - q2_range.0) / n_q2 as Float,
        })
    }

    /// Shape of a cell-centred array including ghost zones.
    pub const fn shape(&self) -> (usize, usize) {
        (self.n_q1 + 2 * self.n_ghost, self.n_q2 + 2 * self.n_ghost)
    }

    /// Number of interior cells along `axis`.
    pub const fn cells(&self, axis: Axis) -> usize {
        match axis {
            Axis::Q1 => self.n_q1,
            Axis::Q2 => self.n_q2,
        }
    }

    pub const fn spacing(&self, axis: Axis) -> Float {
        match axis {
            Axis::Q1 => self.dq1,
            Axis::Q2 => self.dq2,
        }
    }

    const fn start(&self, axis: Axis) -> SpaceCoordinate {
        match axis {
            Axis::Q1 => self.q1_start,
            Axis::Q2 => self.q2_start,
        }
    }

    /// Index range of the interior cells along `axis`.
    pub const fn interior(&self, axis: Axis) -> Range<GridIndex> {
        self.n_ghost..self.n_ghost + self.cells(axis)
    }

    /// Coordinate of `index` shifted by `offset` cells, e.g. `0.5` for a cell centre and
    /// `0.0` for its left/bottom face.
    pub fn coordinate(&self, axis: Axis, index: GridIndex, offset: Float) -> SpaceCoordinate {
        self.start(axis) + (index as Float - self.n_ghost as Float + offset) * self.spacing(axis)
    }

    /// Cell centres along `axis`, ghost zones included.
    pub fn centers(&self, axis: Axis) -> Array1<SpaceCoordinate> {
        let n = self.cells(axis) + 2 * self.n_ghost;
        Array1::from_shape_fn(n, |i| self.coordinate(axis, i, 0.5))
    }
}

/// Flattened three-component velocity mesh.
///
/// Bin `(i1, i2, i3)` is stored at flat index `(i1 * n_p2 + i2) * n_p3 + i3`.
/// A component with a single bin is integrated out and carries unit weight.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VelocityGrid {
    pub n_p: [usize; 3],
    pub p_start: [Float; 3],
    pub p_end: [Float; 3],
}

impl VelocityGrid {
    pub fn new(n_p: [usize; 3], p_start: [Float; 3], p_end: [Float; 3]) -> Result<Self> {
        let velocity = Self {
            n_p,
            p_start,
            p_end,
        };
        velocity.validate()?;
        Ok(velocity)
    }

    pub fn validate(&self) -> Result<()> {
        for k in 0..3 {
            if self.n_p[k] == 0 {
                return Err(Error::InvalidParameter(format!("n_p[{k}] cannot be 0")));
            }
            if self.n_p[k] > 1 && self.p_end[k] <= self.p_start[k] {
                return Err(Error::InvalidParameter(format!(
                    "empty velocity range along p{}",
                    k + 1
                )));
            }
        }
        Ok(())
    }

    /// Total number of flattened velocity bins.
    pub fn len(&self) -> usize {
        self.n_p.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dp(&self, component: usize) -> Float {
        (self.p_end[component] - self.p_start[component]) / self.n_p[component] as Float
    }

    /// Phase-space volume of one velocity bin.
    pub fn volume_element(&self) -> Float {
        (0..3)
            .filter(|&k| self.n_p[k] > 1)
            .map(|k| self.dp(k))
            .product()
    }

    /// Flat-index stride of `component`.
    pub fn stride(&self, component: usize) -> usize {
        self.n_p[component + 1..].iter().product()
    }

    /// Per-component bin index of flat bin `v`.
    pub fn unflatten(&self, v: usize) -> [usize; 3] {
        [
            v / self.stride(0),
            (v / self.stride(1)) % self.n_p[1],
            v % self.n_p[2],
        ]
    }

    /// Flattened bin centres of each velocity component.
    pub fn centers(&self) -> [Array1<Float>; 3] {
        let center = |k: usize, i: usize| self.p_start[k] + (i as Float + 0.5) * self.dp(k);
        let n = self.len();
        [
            Array1::from_shape_fn(n, |v| center(0, self.unflatten(v)[0])),
            Array1::from_shape_fn(n, |v| center(1, self.unflatten(v)[1])),
            Array1::from_shape_fn(n, |v| center(2, self.unflatten(v)[2])),
        ]
    }

    /// Largest velocity magnitude along any component.
    pub fn max_speed(&self) -> Float {
        self.p_start
            .iter()
            .chain(self.p_end.iter())
            .fold(0.0, |acc: Float, p| acc.max(p.abs()))
    }

    /// Permutation of flat bins that reverses the sign of `component`.
    ///
    /// Fails unless the mesh is symmetric about zero along that component.
    pub fn reflection(&self, component: usize) -> Result<Vec<usize>> {
        let scale = self.p_start[component].abs().max(self.p_end[component].abs());
        if (self.p_start[component] + self.p_end[component]).abs() > 1e-12 * scale.max(1.0) {
            return Err(Error::InvalidParameter(format!(
                "mirror boundary needs p{} symmetric about zero",
                component + 1
            )));
        }
        let n = self.n_p[component];
        let stride = self.stride(component);
        Ok((0..self.len())
            .map(|v| {
                let i = self.unflatten(v)[component];
                v - i * stride + (n - 1 - i) * stride
            })
            .collect())
    }
}

/// A particle species.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Species {
    pub name: String,
    pub mass: Float,
    pub charge: Float,
}

/// Spatial and velocity meshes plus the species they carry.
#[derive(Debug, Clone)]
pub struct PhaseSpace {
    pub grid: Grid,
    pub velocity: VelocityGrid,
    pub species: Vec<Species>,
}

impl PhaseSpace {
    pub fn new(grid: Grid, velocity: VelocityGrid, species: Vec<Species>) -> Result<Self> {
        velocity.validate()?;
        if species.is_empty() {
            return Err(Error::InvalidParameter("at least one species needed".into()));
        }
        if let Some(s) = species.iter().find(|s| s.mass <= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "species '{}' has non-positive mass",
                s.name
            )));
        }
        Ok(Self {
            grid,
            velocity,
            species,
        })
    }

    /// Shape of a distribution function `(species, q1, q2, v)`.
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        let (n1, n2) = self.grid.shape();
        (self.species.len(), n1, n2, self.velocity.len())
    }

    pub fn zeros(&self) -> Array4<Float> {
        Array4::zeros(self.shape())
    }

    /// Builds a distribution function by evaluating `init(species, q1, q2, [p1, p2, p3])`
    /// at every cell centre and velocity bin, ghost zones included.
    pub fn distribution_from_fn<F>(&self, init: F) -> Array4<Float>
    where
        F: Fn(&Species, SpaceCoordinate, SpaceCoordinate, [Float; 3]) -> Float,
    {
        let q1 = self.grid.centers(Axis::Q1);
        let q2 = self.grid.centers(Axis::Q2);
        let [p1, p2, p3] = self.velocity.centers();
        Array4::from_shape_fn(self.shape(), |(s, i, j, v)| {
            init(&self.species[s], q1[i], q2[j], [p1[v], p2[v], p3[v]])
        })
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    fn unit_grid(n: usize) -> Grid {
        Grid::new(n, n, 3, (0.0, 1.0), (0.0, 1.0)).unwrap()
    }

    #[test]
    fn test_grid_shape_includes_ghosts() {
        let grid = Grid::new(8, 4, 2, (0.0, 1.0), (-1.0, 1.0)).unwrap();
        assert_eq!((12, 8), grid.shape());
        assert_relative_eq!(0.125, grid.dq1);
        assert_relative_eq!(0.5, grid.dq2);
        assert_eq!(2..10, grid.interior(Axis::Q1));
    }

    #[test]
    fn test_cell_centers() {
        let grid = unit_grid(4);
        let centers = grid.centers(Axis::Q1);
        assert_eq!(10, centers.len());
        assert_relative_eq!(0.125, centers[3]);
        assert_relative_eq!(0.875, centers[6]);
        assert_relative_eq!(-0.125, centers[2]);
    }

    #[test]
    fn test_grid_rejects_zero_ghosts() {
        assert!(Grid::new(4, 4, 0, (0.0, 1.0), (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_velocity_flattening() {
        let velocity = VelocityGrid::new([4, 3, 2], [-1.0; 3], [1.0; 3]).unwrap();
        assert_eq!(24, velocity.len());
        assert_eq!([1, 2, 1], velocity.unflatten((1 * 3 + 2) * 2 + 1));
        let [p1, _, p3] = velocity.centers();
        assert_relative_eq!(-0.75, p1[0]);
        assert_relative_eq!(0.75, p1[23]);
        assert_relative_eq!(0.5, p3[1]);
    }

    #[test]
    fn test_volume_element_skips_collapsed_components() {
        let velocity = VelocityGrid::new([10, 1, 1], [-5.0, -0.5, -0.5], [5.0, 0.5, 0.5]).unwrap();
        assert_relative_eq!(1.0, velocity.volume_element());
    }

    #[test]
    fn test_reflection_reverses_component() {
        let velocity = VelocityGrid::new([4, 2, 1], [-2.0, -1.0, -0.5], [2.0, 1.0, 0.5]).unwrap();
        let reflection = velocity.reflection(0).unwrap();
        let [p1, p2, _] = velocity.centers();
        for (v, &r) in reflection.iter().enumerate() {
            assert_relative_eq!(p1[v], -p1[r]);
            assert_relative_eq!(p2[v], p2[r]);
        }
    }

    #[test]
    fn test_reflection_requires_symmetry() {
        let velocity = VelocityGrid::new([4, 1, 1], [0.0, -0.5, -0.5], [2.0, 0.5, 0.5]).unwrap();
        assert!(velocity.reflection(0).is_err());
    }

    #[test]
    fn test_axis_from_str() {
        assert_eq!(Axis::Q2, "q2".parse().unwrap());
        assert!("q3".parse::<Axis>().is_err());
    }
}
