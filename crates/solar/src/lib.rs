//! Solar exposed-area discipline for spacecraft design optimization.
//!
//! The [`ExposedArea`] component predicts, for every solar cell on every panel
//! and every time step, the area exposed to the sun. It fits a differentiable
//! surrogate once from tabulated data (fin angle × azimuth × elevation), then
//! implements the [`Discipline`](cadre_core::Discipline) contract so a coupled
//! solver can propagate exact forward and reverse derivatives through it.
//!
//! # Tensor layout
//!
//! - Training outputs: column `panel · num_cells + cell`
//!   ([`TableLayout::column_index`])
//! - Training sites: row-major over (angle, azimuth, elevation)
//!   ([`TableLayout::site_index`])
//! - Exposed area and its seeds: `[cell, panel, time]`
//! - Jacobians: `[time, cell, panel]`

mod angles;
mod config;
mod error;
mod exposed_area;
mod grid;
mod table;

#[cfg(test)]
mod test_support;

pub use angles::{AngleError, AngleSeries, FixAngles};
pub use config::{CellSkip, ConfigLoadError, SolarConfig, default_fit_options};
pub use error::Error;
pub use exposed_area::{AREA_BOUNDS, Channels, ExposedArea, InputSeed, Jacobians, SolarInput};
pub use grid::{Axis, AxisGrids};
pub use table::{
    TableError, TableLayout, TrainingSet, parse_table, read_grid_table, read_sample_table,
};
