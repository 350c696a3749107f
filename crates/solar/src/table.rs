//! Loading of the positional training tables.
//!
//! Both tables are un-keyed numeric text, so any reordering of rows or columns
//! silently corrupts the surrogate. Loading therefore checks every count and
//! shape it can, but never tries to judge whether values look plausible.

use std::{fs, path::Path};

use log::debug;
use ndarray::{Array2, ArrayView2, s};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Axis, AxisGrids};

/// Errors that can occur while loading training tables.
///
/// All of these are fatal configuration errors: no valid surrogate can be fit
/// from the affected tables.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: `{token}` is not a number")]
    ParseValue { line: usize, token: String },

    #[error("line {line}: expected {expected} values, found {actual}")]
    RaggedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("table contains no values")]
    Empty,

    #[error("invalid layout: {0}")]
    Layout(&'static str),

    #[error("grid table has {actual} values, expected at least {expected}")]
    TooFewGridValues { expected: usize, actual: usize },

    #[error("grid table value {index} is not finite")]
    NonFiniteGrid { index: usize },

    #[error("{axis:?} breakpoints are not strictly increasing")]
    UnorderedGrid { axis: Axis },

    #[error("sample table has {actual} rows, expected at least {expected}")]
    TooFewSampleRows { expected: usize, actual: usize },

    #[error("sample table has {actual} columns, expected at least {expected}")]
    TooFewSampleColumns { expected: usize, actual: usize },

    #[error("sample at row {row}, column {column} is not finite")]
    NonFiniteSample { row: usize, column: usize },
}

/// Shape of the raw training tables.
///
/// The default is the CADRE data set: a 10 × 73 × 37 site grid, 12 panels of
/// 7 cells, and samples starting at column 119 of each sample-table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableLayout {
    pub num_angle: usize,
    pub num_azimuth: usize,
    pub num_elevation: usize,
    pub num_panels: usize,
    pub num_cells: usize,
    /// Column of the sample table holding the first site's sample.
    pub column_offset: usize,
}

impl Default for TableLayout {
    fn default() -> Self {
        Self {
            num_angle: 10,
            num_azimuth: 73,
            num_elevation: 37,
            num_panels: 12,
            num_cells: 7,
            column_offset: 119,
        }
    }
}

impl TableLayout {
    /// Checks that every axis has at least two breakpoints and there is at
    /// least one panel and cell.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Layout`] describing the first problem found.
    pub fn validate(&self) -> Result<(), TableError> {
        if self.num_angle < 2 || self.num_azimuth < 2 || self.num_elevation < 2 {
            return Err(TableError::Layout("each axis needs at least two breakpoints"));
        }
        if self.num_panels == 0 || self.num_cells == 0 {
            return Err(TableError::Layout("at least one panel and one cell are required"));
        }
        Ok(())
    }

    /// Number of values in the grid table, counting the shared
    /// azimuth/elevation entry once.
    #[must_use]
    pub fn grid_len(&self) -> usize {
        self.num_angle + self.num_azimuth + self.num_elevation - 1
    }

    #[must_use]
    pub fn num_sites(&self) -> usize {
        self.num_angle * self.num_azimuth * self.num_elevation
    }

    /// Number of surrogate outputs, one per (panel, cell) pair.
    #[must_use]
    pub fn num_outputs(&self) -> usize {
        self.num_panels * self.num_cells
    }

    /// Row-major site index of breakpoint `(angle, azimuth, elevation)`.
    #[must_use]
    pub fn site_index(&self, angle: usize, azimuth: usize, elevation: usize) -> usize {
        (angle * self.num_azimuth + azimuth) * self.num_elevation + elevation
    }

    /// Output column (and sample-table row) of a (panel, cell) pair.
    #[must_use]
    pub fn column_index(&self, panel: usize, cell: usize) -> usize {
        panel * self.num_cells + cell
    }
}

/// Training data for the exposed-area surrogate.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub layout: TableLayout,
    pub grids: AxisGrids,
    /// One row per site: `(fin angle, azimuth, elevation)`, row-major over
    /// the grids.
    pub sites: Array2<f64>,
    /// One row per site and one column per (panel, cell) pair.
    pub outputs: Array2<f64>,
}

impl TrainingSet {
    /// Builds training data from a raw grid table and a sample table.
    ///
    /// Row `panel · num_cells + cell` of `samples` holds that pair's samples
    /// for every site, in site order, starting at `layout.column_offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid is malformed, the sample table is too small
    /// for the layout, or a sample used for training is non-finite.
    pub fn from_tables(
        grid_raw: &[f64],
        samples: ArrayView2<f64>,
        layout: &TableLayout,
    ) -> Result<Self, TableError> {
        let grids = AxisGrids::from_raw(grid_raw, layout)?;

        let num_rows = layout.num_outputs();
        if samples.nrows() < num_rows {
            return Err(TableError::TooFewSampleRows {
                expected: num_rows,
                actual: samples.nrows(),
            });
        }
        let num_sites = layout.num_sites();
        let first = layout.column_offset;
        if samples.ncols() < first + num_sites {
            return Err(TableError::TooFewSampleColumns {
                expected: first + num_sites,
                actual: samples.ncols(),
            });
        }

        let block = samples.slice(s![..num_rows, first..first + num_sites]);
        if let Some(((row, column), _)) = block.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TableError::NonFiniteSample {
                row,
                column: first + column,
            });
        }
        let outputs = block.t().to_owned();

        let mut sites = Array2::zeros((num_sites, 3));
        for (a, &angle) in grids.fin_angle.iter().enumerate() {
            for (z, &azimuth) in grids.azimuth.iter().enumerate() {
                for (e, &elevation) in grids.elevation.iter().enumerate() {
                    let mut site = sites.row_mut(layout.site_index(a, z, e));
                    site[Axis::FinAngle.index()] = angle;
                    site[Axis::Azimuth.index()] = azimuth;
                    site[Axis::Elevation.index()] = elevation;
                }
            }
        }

        debug!(
            "loaded {num_sites} training sites with {} outputs",
            outputs.ncols()
        );

        Ok(Self {
            layout: *layout,
            grids,
            sites,
            outputs,
        })
    }

    /// Reads both tables from disk and builds training data.
    ///
    /// # Errors
    ///
    /// Returns an error if either file cannot be read or parsed, or under the
    /// conditions of [`TrainingSet::from_tables`].
    pub fn read(
        grid_path: impl AsRef<Path>,
        sample_path: impl AsRef<Path>,
        layout: &TableLayout,
    ) -> Result<Self, TableError> {
        let grid = read_grid_table(grid_path)?;
        let samples = read_sample_table(sample_path)?;
        Self::from_tables(&grid, samples.view(), layout)
    }
}

/// Parses whitespace-separated numeric text into a matrix.
///
/// Blank lines and `#` comments are skipped. Every remaining line must hold
/// the same number of values.
///
/// # Errors
///
/// Returns an error if a token is not a number, rows have different lengths,
/// or the text holds no values.
pub fn parse_table(text: &str) -> Result<Array2<f64>, TableError> {
    let mut values = Vec::new();
    let mut width = None;
    let mut rows = 0;

    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        let start = values.len();
        for token in content.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| TableError::ParseValue {
                line: index + 1,
                token: token.to_string(),
            })?;
            values.push(value);
        }

        let count = values.len() - start;
        if count == 0 {
            continue;
        }
        match width {
            None => width = Some(count),
            Some(expected) if expected != count => {
                return Err(TableError::RaggedRow {
                    line: index + 1,
                    expected,
                    actual: count,
                });
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let width = width.ok_or(TableError::Empty)?;
    Array2::from_shape_vec((rows, width), values).map_err(|_| TableError::Empty)
}

/// Reads a grid table as a flat list of values in reading order.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_grid_table(path: impl AsRef<Path>) -> Result<Vec<f64>, TableError> {
    let table = read_table(path.as_ref())?;
    Ok(table.iter().copied().collect())
}

/// Reads a sample table as a matrix.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_sample_table(path: impl AsRef<Path>) -> Result<Array2<f64>, TableError> {
    read_table(path.as_ref())
}

fn read_table(path: &Path) -> Result<Array2<f64>, TableError> {
    let text = fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let table = parse_table(&text)?;
    debug!(
        "read {} × {} table from `{}`",
        table.nrows(),
        table.ncols(),
        path.display()
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use ndarray::array;

    use super::*;
    use crate::test_support::{small_grid_raw, small_layout, small_samples, sample_value};

    #[test]
    fn parses_whitespace_table() {
        let text = "# header\n1.0 2.0  3.5\n\n-4e-1\t5 6 # trailing\n";

        let table = parse_table(text).unwrap();

        assert_eq!(table, array![[1.0, 2.0, 3.5], [-0.4, 5.0, 6.0]]);
    }

    #[test]
    fn rejects_ragged_and_garbage_rows() {
        assert!(matches!(
            parse_table("1 2 3\n4 5\n"),
            Err(TableError::RaggedRow {
                line: 2,
                expected: 3,
                actual: 2
            })
        ));
        assert!(matches!(
            parse_table("1 2\n3 x\n"),
            Err(TableError::ParseValue { line: 2, .. })
        ));
        assert!(matches!(parse_table("# nothing\n\n"), Err(TableError::Empty)));
    }

    #[test]
    fn default_layout_matches_cadre_tables() {
        let layout = TableLayout::default();

        assert_eq!(layout.grid_len(), 119);
        assert_eq!(layout.column_offset, layout.grid_len());
        assert_eq!(layout.num_sites(), 10 * 73 * 37);
        assert_eq!(layout.num_outputs(), 84);
        assert_eq!(layout.column_index(11, 6), 83);
    }

    #[test]
    fn sites_are_row_major_over_axes() {
        let layout = small_layout();
        let training =
            TrainingSet::from_tables(&small_grid_raw(&layout), small_samples(&layout).view(), &layout)
                .unwrap();

        assert_eq!(training.sites.nrows(), layout.num_sites());
        let mut i = 0;
        for a in 0..layout.num_angle {
            for z in 0..layout.num_azimuth {
                for e in 0..layout.num_elevation {
                    assert_eq!(layout.site_index(a, z, e), i);
                    let site = training.sites.row(i);
                    assert_eq!(site[0], training.grids.fin_angle[a]);
                    assert_eq!(site[1], training.grids.azimuth[z]);
                    assert_eq!(site[2], training.grids.elevation[e]);
                    i += 1;
                }
            }
        }
        assert_eq!(training.sites[[layout.site_index(0, layout.num_azimuth - 1, 0), 1]], TAU);
    }

    #[test]
    fn outputs_align_with_sites_and_columns() {
        let layout = small_layout();
        let samples = small_samples(&layout);
        let training =
            TrainingSet::from_tables(&small_grid_raw(&layout), samples.view(), &layout).unwrap();

        assert_eq!(
            training.outputs.dim(),
            (layout.num_sites(), layout.num_outputs())
        );
        for (i, site) in training.sites.rows().into_iter().enumerate() {
            for panel in 0..layout.num_panels {
                for cell in 0..layout.num_cells {
                    let column = layout.column_index(panel, cell);
                    assert_eq!(
                        training.outputs[[i, column]],
                        samples[[column, layout.column_offset + i]]
                    );
                    assert_eq!(
                        training.outputs[[i, column]],
                        sample_value(panel, cell, site[0], site[1], site[2])
                    );
                }
            }
        }
    }

    #[test]
    fn undersized_sample_table_is_rejected() {
        let layout = small_layout();
        let grid = small_grid_raw(&layout);
        let samples = small_samples(&layout);

        let missing_row = samples.slice(s![..-1, ..]);
        assert!(matches!(
            TrainingSet::from_tables(&grid, missing_row, &layout),
            Err(TableError::TooFewSampleRows { .. })
        ));

        let missing_column = samples.slice(s![.., ..-1]);
        assert!(matches!(
            TrainingSet::from_tables(&grid, missing_column, &layout),
            Err(TableError::TooFewSampleColumns { .. })
        ));
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let layout = small_layout();
        let mut samples = small_samples(&layout);
        samples[[2, layout.column_offset + 5]] = f64::INFINITY;

        let result = TrainingSet::from_tables(&small_grid_raw(&layout), samples.view(), &layout);

        assert!(matches!(
            result,
            Err(TableError::NonFiniteSample { row: 2, column }) if column == layout.column_offset + 5
        ));
    }

    #[test]
    fn reads_tables_from_disk() {
        let layout = small_layout();
        let dir = std::env::temp_dir().join(format!("cadre-solar-table-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();

        let grid_path = dir.join("grid.txt");
        let grid_text: Vec<String> = small_grid_raw(&layout).iter().map(|v| format!("{v:e}")).collect();
        fs::write(&grid_path, grid_text.join("\n")).unwrap();

        let sample_path = dir.join("samples.txt");
        let samples = small_samples(&layout);
        let sample_text: Vec<String> = samples
            .rows()
            .into_iter()
            .map(|row| row.iter().map(|v| format!("{v:e}")).collect::<Vec<_>>().join(" "))
            .collect();
        fs::write(&sample_path, sample_text.join("\n")).unwrap();

        let training = TrainingSet::read(&grid_path, &sample_path, &layout).unwrap();
        assert_eq!(training.outputs, samples.slice(s![.., layout.column_offset..]).t());

        assert!(matches!(
            TrainingSet::read(dir.join("missing.txt"), &sample_path, &layout),
            Err(TableError::Io { .. })
        ));

        fs::remove_dir_all(&dir).unwrap();
    }
}
