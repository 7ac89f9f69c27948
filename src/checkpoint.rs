//! Serialisable snapshots of the solver state keyed by a time label.

use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::fields::EmFields;
use crate::grid::PhaseSpace;
use crate::{Error, Float, Result};

/// Dense copy of the owned arrays at one instant. The distribution function keeps its
/// `(species, q1, q2, v)` layout so that a restart sees exactly the solver's shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub label: String,
    pub time: Float,
    pub distribution_function: Array4<Float>,
    pub fields: Option<EmFields>,
}

impl Snapshot {
    pub fn capture(time: Float, f: &Array4<Float>, fields: Option<&EmFields>) -> Self {
        Self {
            label: format!("t={time:.6}"),
            time,
            distribution_function: f.clone(),
            fields: fields.cloned(),
        }
    }

    /// Checks the snapshot against `phase_space` and hands back its arrays.
    pub fn restore(self, phase_space: &PhaseSpace) -> Result<(Array4<Float>, Option<EmFields>)> {
        let (s, n1, n2, v) = phase_space.shape();
        let expected = [s, n1, n2, v];
        if self.distribution_function.shape() != expected {
            return Err(Error::shape(&expected, self.distribution_function.shape()));
        }
        if let Some(fields) = &self.fields {
            fields.check_shape(&phase_space.grid)?;
        }
        Ok((self.distribution_function, self.fields))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fields::Component;
    use crate::grid::{Grid, Species, VelocityGrid};

    fn phase_space(n_q1: usize) -> PhaseSpace {
        let grid = Grid::new(n_q1, 2, 2, (0.0, 1.0), (0.0, 1.0)).unwrap();
        let velocity = VelocityGrid::new([3, 1, 1], [-1.0, -0.5, -0.5], [1.0, 0.5, 0.5]).unwrap();
        let species = vec![Species {
            name: "ion".into(),
            mass: 1.0,
            charge: 1.0,
        }];
        PhaseSpace::new(grid, velocity, species).unwrap()
    }

    #[test]
    fn test_snapshot_survives_json() {
        let phase_space = phase_space(4);
        let f = phase_space.distribution_from_fn(|_, q1, q2, p| q1 - q2 * p[0]);
        let mut fields = EmFields::zeros(&phase_space.grid);
        fields.get_mut(Component::B3).fill(0.25);
        let snapshot = Snapshot::capture(1.5, &f, Some(&fields));

        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!("t=1.500000", restored.label);
        let (f_back, fields_back) = restored.restore(&phase_space).unwrap();
        assert_eq!(f, f_back);
        assert_eq!(Some(fields), fields_back);
    }

    #[test]
    fn test_restore_rejects_other_grid() {
        let f = phase_space(4).zeros();
        let snapshot = Snapshot::capture(0.0, &f, None);
        assert!(matches!(
            snapshot.restore(&phase_space(6)),
            Err(Error::IncompatibleShape { .. })
        ));
    }
}
