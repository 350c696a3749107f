//! Small synthetic training tables shared by unit tests.

use cadre_surrogate::{AxisOptions, FitOptions};
use ndarray::{Array1, Array2};

use crate::{Axis, AxisGrids, TableLayout, TrainingSet};

pub(crate) fn small_layout() -> TableLayout {
    TableLayout {
        num_angle: 4,
        num_azimuth: 7,
        num_elevation: 5,
        num_panels: 2,
        num_cells: 3,
        column_offset: 15,
    }
}

/// Evenly spaced breakpoints in the raw grid-table format, including the
/// shared azimuth/elevation entry.
pub(crate) fn small_grid_raw(layout: &TableLayout) -> Vec<f64> {
    let spaced = |axis: Axis, n: usize| {
        let (lower, upper) = axis.limits();
        Array1::linspace(lower, upper, n).to_vec()
    };

    let mut raw = spaced(Axis::FinAngle, layout.num_angle);
    let azimuth = spaced(Axis::Azimuth, layout.num_azimuth);
    raw.extend_from_slice(&azimuth[..azimuth.len() - 1]);
    raw.extend(spaced(Axis::Elevation, layout.num_elevation));
    raw
}

/// Synthetic exposed area: distinct for every (panel, cell) and bilinear in
/// the angles, so a cubic spline reproduces it exactly.
pub(crate) fn sample_value(panel: usize, cell: usize, a: f64, z: f64, e: f64) -> f64 {
    let (p, c) = (panel as f64, cell as f64);
    0.05 + 0.01 * p + 0.003 * c + 0.01 * (p + 1.0) * a - 0.002 * (c + 1.0) * z
        + 0.004 * (c + 1.0) * a * e
}

/// A sample table whose training block holds [`sample_value`].
pub(crate) fn small_samples(layout: &TableLayout) -> Array2<f64> {
    let grids = AxisGrids::from_raw(&small_grid_raw(layout), layout).unwrap();
    let mut samples = Array2::zeros((
        layout.num_outputs(),
        layout.column_offset + layout.num_sites(),
    ));

    for panel in 0..layout.num_panels {
        for cell in 0..layout.num_cells {
            let row = layout.column_index(panel, cell);
            for (i, &a) in grids.fin_angle.iter().enumerate() {
                for (j, &z) in grids.azimuth.iter().enumerate() {
                    for (k, &e) in grids.elevation.iter().enumerate() {
                        let column = layout.column_offset + layout.site_index(i, j, k);
                        samples[[row, column]] = sample_value(panel, cell, a, z, e);
                    }
                }
            }
        }
    }
    samples
}

pub(crate) fn small_training() -> TrainingSet {
    let layout = small_layout();
    TrainingSet::from_tables(&small_grid_raw(&layout), small_samples(&layout).view(), &layout)
        .unwrap()
}

pub(crate) fn small_fit_options() -> FitOptions {
    let axes = Axis::ALL
        .iter()
        .zip([2, 3, 2])
        .map(|(axis, elements)| {
            let (lower, upper) = axis.limits();
            AxisOptions::new(lower, upper, elements)
        })
        .collect();
    FitOptions::new(axes, 1e5).unwrap()
}
