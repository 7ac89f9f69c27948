//! Electromagnetic field state on the staggered (Yee) grid.
//!
//! With cell `(i, j)` spanning `[i, i + 1] x [j, j + 1]` in index units, the components
//! live at
//!
//! ```text
//!   E1 (i + 1/2, j)        B1 (i, j + 1/2)
//!   E2 (i, j + 1/2)        B2 (i + 1/2, j)
//!   E3 (i, j)              B3 (i + 1/2, j + 1/2)
//! ```
//!
//! and cell centres at `(i + 1/2, j + 1/2)`.

use ndarray::{s, Array2, Zip};
use serde::{Deserialize, Serialize};

use crate::grid::{Axis, Grid, SpaceCoordinate};
use crate::{Error, Float, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    E1,
    E2,
    E3,
    B1,
    B2,
    B3,
}

impl Component {
    pub const ALL: [Component; 6] = [
        Component::E1,
        Component::E2,
        Component::E3,
        Component::B1,
        Component::B2,
        Component::B3,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Position of the component inside cell `(i, j)`, in cell units.
    pub const fn offset(self) -> (Float, Float) {
        match self {
            Component::E1 | Component::B2 => (0.5, 0.0),
            Component::E2 | Component::B1 => (0.0, 0.5),
            Component::E3 => (0.0, 0.0),
            Component::B3 => (0.5, 0.5),
        }
    }

    /// Whether the component points along `axis`.
    pub const fn is_normal_to(self, axis: Axis) -> bool {
        matches!(
            (self, axis),
            (Component::E1 | Component::B1, Axis::Q1) | (Component::E2 | Component::B2, Axis::Q2)
        )
    }

    pub const fn is_electric(self) -> bool {
        matches!(self, Component::E1 | Component::E2 | Component::E3)
    }
}

/// The six field components, each shaped like a cell-centred array of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmFields {
    pub components: [Array2<Float>; 6],
}

impl EmFields {
    pub fn zeros(grid: &Grid) -> Self {
        let shape = grid.shape();
        Self {
            components: std::array::from_fn(|_| Array2::zeros(shape)),
        }
    }

    /// Samples `field(component, q1, q2)` at each component's staggered position.
    pub fn from_fn<F>(grid: &Grid, field: F) -> Self
    where
        F: Fn(Component, SpaceCoordinate, SpaceCoordinate) -> Float,
    {
        let shape = grid.shape();
        Self {
            components: Component::ALL.map(|component| {
                let (o1, o2) = component.offset();
                Array2::from_shape_fn(shape, |(i, j)| {
                    field(
                        component,
                        grid.coordinate(Axis::Q1, i, o1),
                        grid.coordinate(Axis::Q2, j, o2),
                    )
                })
            }),
        }
    }

    pub fn get(&self, component: Component) -> &Array2<Float> {
        &self.components[component.index()]
    }

    pub fn get_mut(&mut self, component: Component) -> &mut Array2<Float> {
        &mut self.components[component.index()]
    }

    pub fn shape(&self) -> &[usize] {
        self.components[0].shape()
    }

    pub(crate) fn check_shape(&self, grid: &Grid) -> Result<()> {
        let (n1, n2) = grid.shape();
        for component in &self.components {
            if component.shape() != [n1, n2] {
                return Err(Error::shape(&[n1, n2], component.shape()));
            }
        }
        Ok(())
    }

    /// Σ ½(E² + B²) over the interior cells.
    pub fn energy(&self, grid: &Grid) -> Float {
        let interior = s![grid.interior(Axis::Q1), grid.interior(Axis::Q2)];
        0.5 * self
            .components
            .iter()
            .map(|c| c.slice(interior).iter().map(|x| x * x).sum::<Float>())
            .sum::<Float>()
    }

    /// All components averaged onto cell centres. The last row and column, which
    /// have no upper neighbour, keep their staggered values.
    pub fn cell_centered(&self) -> EmFields {
        let [e1, e2, e3, b1, b2, b3] = &self.components;
        EmFields {
            components: [
                average_forward(e1, Axis::Q2),
                average_forward(e2, Axis::Q1),
                average_forward(&average_forward(e3, Axis::Q1), Axis::Q2),
                average_forward(b1, Axis::Q1),
                average_forward(b2, Axis::Q2),
                b3.clone(),
            ],
        }
    }
}

/// Moves a cell-centred current density onto the E-component positions.
/// The first row and column, which have no lower neighbour, keep their values.
pub fn current_to_yee(current: &[Array2<Float>; 3]) -> [Array2<Float>; 3] {
    let [j1, j2, j3] = current;
    [
        average_backward(j1, Axis::Q2),
        average_backward(j2, Axis::Q1),
        average_backward(&average_backward(j3, Axis::Q1), Axis::Q2),
    ]
}

/// `out[i] = ½(a[i] + a[i + 1])` along `axis`.
fn average_forward(a: &Array2<Float>, axis: Axis) -> Array2<Float> {
    let ax = axis.field_axis();
    let n = a.len_of(ax);
    let mut out = a.clone();
    if n > 1 {
        Zip::from(out.slice_axis_mut(ax, (0..n - 1).into()))
            .and(a.slice_axis(ax, (1..n).into()))
            .par_for_each(|out, &upper| *out = 0.5 * (*out + upper));
    }
    out
}

/// `out[i] = ½(a[i] + a[i - 1])` along `axis`.
fn average_backward(a: &Array2<Float>, axis: Axis) -> Array2<Float> {
    let ax = axis.field_axis();
    let n = a.len_of(ax);
    let mut out = a.clone();
    if n > 1 {
        Zip::from(out.slice_axis_mut(ax, (1..n).into()))
            .and(a.slice_axis(ax, (0..n - 1).into()))
            .par_for_each(|out, &lower| *out = 0.5 * (*out + lower));
    }
    out
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    fn grid() -> Grid {
        Grid::new(8, 6, 2, (0.0, 1.0), (0.0, 1.0)).unwrap()
    }

    #[test]
    fn test_from_fn_uses_staggered_positions() {
        let grid = grid();
        let fields = EmFields::from_fn(&grid, |component, q1, q2| match component {
            Component::E1 => q1,
            Component::B3 => q2,
            _ => 0.0,
        });
        // E1 of cell 2 (first interior) sits half a cell right of q1 = 0.
        assert_relative_eq!(0.0625, fields.get(Component::E1)[[2, 2]]);
        assert_relative_eq!(1.0 / 12.0, fields.get(Component::B3)[[2, 2]]);
    }

    #[test]
    fn test_cell_centered_linear_fields_are_exact() {
        let grid = grid();
        let fields = EmFields::from_fn(&grid, |_, q1, q2| 2.0 * q1 - q2);
        let centered = fields.cell_centered();
        for component in Component::ALL {
            for i in grid.interior(Axis::Q1) {
                for j in grid.interior(Axis::Q2) {
                    let q1 = grid.coordinate(Axis::Q1, i, 0.5);
                    let q2 = grid.coordinate(Axis::Q2, j, 0.5);
                    assert_relative_eq!(
                        2.0 * q1 - q2,
                        centered.get(component)[[i, j]],
                        epsilon = 1e-12
                    );
                }
            }
        }
    }

    #[test]
    fn test_energy_counts_interior_only() {
        let grid = grid();
        let mut fields = EmFields::zeros(&grid);
        fields.get_mut(Component::E3).fill(2.0);
        fields.get_mut(Component::B1)[[0, 0]] = 100.0;
        assert_relative_eq!(0.5 * 4.0 * 48.0, fields.energy(&grid));
    }

    #[test]
    fn test_normal_components() {
        assert!(Component::E1.is_normal_to(Axis::Q1));
        assert!(Component::B2.is_normal_to(Axis::Q2));
        assert!(!Component::E3.is_normal_to(Axis::Q1));
        assert!(!Component::B3.is_normal_to(Axis::Q2));
    }
}
