use std::f64::consts::{FRAC_PI_2, PI, TAU};

use ndarray::Array1;

use crate::{TableError, TableLayout};

/// An input axis of the exposed-area surrogate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    FinAngle,
    Azimuth,
    Elevation,
}

impl Axis {
    /// All axes, in query-column order.
    pub const ALL: [Axis; 3] = [Axis::FinAngle, Axis::Azimuth, Axis::Elevation];

    /// Returns the query column for this axis.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Axis::FinAngle => 0,
            Axis::Azimuth => 1,
            Axis::Elevation => 2,
        }
    }

    /// Returns the domain `(lower, upper)` in radians.
    #[must_use]
    pub fn limits(self) -> (f64, f64) {
        match self {
            Axis::FinAngle => (0.0, FRAC_PI_2),
            Axis::Azimuth => (0.0, TAU),
            Axis::Elevation => (0.0, PI),
        }
    }
}

/// Breakpoints of the three training axes.
///
/// Every axis is strictly increasing and spans its full [`Axis::limits`]
/// exactly, whatever rounding the raw table carried at its ends.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisGrids {
    pub fin_angle: Array1<f64>,
    pub azimuth: Array1<f64>,
    pub elevation: Array1<f64>,
}

impl AxisGrids {
    /// Reads the axis breakpoints from a raw grid table.
    ///
    /// The raw table lists the angle, azimuth, and elevation breakpoints back
    /// to back, with the last azimuth value and the first elevation value
    /// sharing one entry. That shared entry is read as elevation; the
    /// azimuth's last breakpoint is pinned to `2π` regardless.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is invalid, the table holds fewer than
    /// [`TableLayout::grid_len`] values, a value is non-finite, or an axis is
    /// not strictly increasing after its endpoints are pinned.
    pub fn from_raw(raw: &[f64], layout: &TableLayout) -> Result<Self, TableError> {
        layout.validate()?;
        let expected = layout.grid_len();
        if raw.len() < expected {
            return Err(TableError::TooFewGridValues {
                expected,
                actual: raw.len(),
            });
        }
        if let Some(index) = raw[..expected].iter().position(|v| !v.is_finite()) {
            return Err(TableError::NonFiniteGrid { index });
        }

        let (na, nz, ne) = (layout.num_angle, layout.num_azimuth, layout.num_elevation);
        let angle_start = 0;
        let azimuth_start = angle_start + na;
        // Back up one entry: the azimuth/elevation boundary value is shared.
        let elevation_start = azimuth_start + nz - 1;

        let grids = Self {
            fin_angle: pinned(&raw[angle_start..azimuth_start], Axis::FinAngle),
            azimuth: pinned(&raw[azimuth_start..azimuth_start + nz], Axis::Azimuth),
            elevation: pinned(&raw[elevation_start..elevation_start + ne], Axis::Elevation),
        };

        for axis in Axis::ALL {
            let values = grids.axis(axis);
            if values.windows(2).into_iter().any(|w| w[0] >= w[1]) {
                return Err(TableError::UnorderedGrid { axis });
            }
        }

        Ok(grids)
    }

    /// Returns the breakpoints of `axis`.
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &Array1<f64> {
        match axis {
            Axis::FinAngle => &self.fin_angle,
            Axis::Azimuth => &self.azimuth,
            Axis::Elevation => &self.elevation,
        }
    }
}

fn pinned(values: &[f64], axis: Axis) -> Array1<f64> {
    let (lower, upper) = axis.limits();
    let mut grid = Array1::from(values.to_vec());
    let last = grid.len() - 1;
    grid[0] = lower;
    grid[last] = upper;
    grid
}
