//! Table builders shared by the integration tests.

#![allow(dead_code)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use cadre_solar::{Axis, AxisGrids, TableLayout};
use cadre_surrogate::{AxisOptions, FitOptions};
use ndarray::{Array1, Array2};

/// A three-panel, four-cell layout with a short prefix in the sample table.
pub fn small_layout() -> TableLayout {
    TableLayout {
        num_angle: 5,
        num_azimuth: 9,
        num_elevation: 6,
        num_panels: 3,
        num_cells: 4,
        column_offset: 19,
    }
}

pub fn small_fit_options() -> FitOptions {
    let axes = Axis::ALL
        .iter()
        .zip([2, 4, 3])
        .map(|(axis, elements)| {
            let (lower, upper) = axis.limits();
            AxisOptions::new(lower, upper, elements)
        })
        .collect();
    FitOptions::new(axes, 1e5).unwrap()
}

/// Evenly spaced breakpoints in the raw grid-table format.
pub fn grid_raw(layout: &TableLayout) -> Vec<f64> {
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

/// Builds a sample table from `area(panel, cell, fin_angle, azimuth, elevation)`.
pub fn sample_table(
    layout: &TableLayout,
    area: impl Fn(usize, usize, f64, f64, f64) -> f64,
) -> Array2<f64> {
    let grids = AxisGrids::from_raw(&grid_raw(layout), layout).unwrap();
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
                        samples[[row, column]] = area(panel, cell, a, z, e);
                    }
                }
            }
        }
    }
    samples
}

/// A smooth area pattern that differs across panels and cells.
pub fn smooth_area(panel: usize, cell: usize, a: f64, z: f64, e: f64) -> f64 {
    let (p, c) = (panel as f64, cell as f64);
    0.06 + 0.01 * p * a.sin() + 0.02 * e.sin() * (z - 0.5 * c).cos() * (1.0 + 0.1 * c)
}

/// A scratch directory removed on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("cadre-solar-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Writes a matrix as whitespace-separated text.
pub fn write_table(path: &Path, header: &str, table: &Array2<f64>) {
    let mut text = format!("# {header}\n");
    for row in table.rows() {
        let line: Vec<String> = row.iter().map(|v| format!("{v:e}")).collect();
        text.push_str(&line.join(" "));
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}
