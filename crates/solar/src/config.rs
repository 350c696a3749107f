use std::{
    fs,
    path::{Path, PathBuf},
};

use cadre_surrogate::{AxisOptions, FitOptions};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Axis, TableLayout};

/// Controls which cells the reverse operator skips.
///
/// Seeds arriving from a coupled solve are usually sparse across cells, so
/// skipping all-zero cell slices saves most of the reverse-mode work without
/// changing the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum CellSkip {
    /// Visit every cell.
    Never,

    /// Skip a cell when every seed entry has magnitude at most `threshold`.
    ///
    /// A threshold of zero skips only exactly-zero slices and leaves results
    /// unchanged. A positive threshold trades exactness for speed.
    Below { threshold: f64 },
}

impl Default for CellSkip {
    fn default() -> Self {
        CellSkip::Below { threshold: 0.0 }
    }
}

impl CellSkip {
    /// Returns `true` if the `[panel, time]` seed slice of one cell can be skipped.
    #[must_use]
    pub fn skips(&self, seed: ArrayView2<f64>) -> bool {
        match *self {
            CellSkip::Never => false,
            CellSkip::Below { threshold } => seed.iter().all(|v| v.abs() <= threshold),
        }
    }
}

/// Configuration for building an [`ExposedArea`](crate::ExposedArea) component.
///
/// ```toml
/// num_times = 1500
/// grid_table = "data/Solar/Area10.txt"
/// sample_table = "data/Solar/Area_all.txt"
///
/// [cell_skip]
/// mode = "below"
/// threshold = 0.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolarConfig {
    /// Number of time steps in each input series.
    pub num_times: usize,

    pub grid_table: PathBuf,
    pub sample_table: PathBuf,

    #[serde(default)]
    pub layout: TableLayout,

    /// Surrogate fit options; [`default_fit_options`] if absent.
    #[serde(default)]
    pub fit: Option<FitOptions>,

    #[serde(default)]
    pub cell_skip: CellSkip,
}

/// Errors that can occur while loading a [`SolarConfig`].
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config `{path}`")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

impl SolarConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Table paths are kept as written.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML for this configuration.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigLoadError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads a configuration file.
    ///
    /// Relative table paths are resolved against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&text)?;
        if let Some(dir) = path.parent() {
            config.grid_table = dir.join(&config.grid_table);
            config.sample_table = dir.join(&config.sample_table);
        }
        Ok(config)
    }

    /// Returns the configured fit options, or the defaults.
    #[must_use]
    pub fn fit_options(&self) -> FitOptions {
        self.fit.clone().unwrap_or_else(default_fit_options)
    }
}

/// Fit options used for the CADRE exposed-area data: five elements per axis
/// over the full angular domain and a fit weight of `1e5`.
#[must_use]
pub fn default_fit_options() -> FitOptions {
    let axes = Axis::ALL
        .iter()
        .map(|axis| {
            let (lower, upper) = axis.limits();
            AxisOptions::new(lower, upper, 5)
        })
        .collect();

    // Known-good values, unwrap is safe
    FitOptions::new(axes, 1e5).unwrap()
}

#[cfg(test)]
mod tests {
    use std::f64::consts::TAU;

    use ndarray::array;

    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = SolarConfig::from_toml_str(
            r#"
            num_times = 1500
            grid_table = "Area10.txt"
            sample_table = "Area_all.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.num_times, 1500);
        assert_eq!(config.layout, TableLayout::default());
        assert_eq!(config.cell_skip, CellSkip::Below { threshold: 0.0 });
        assert_eq!(config.fit_options(), default_fit_options());
    }

    #[test]
    fn full_config_overrides_defaults() {
        let config = SolarConfig::from_toml_str(
            r#"
            num_times = 4
            grid_table = "grid.txt"
            sample_table = "samples.txt"

            [layout]
            num_angle = 4
            num_azimuth = 7
            num_elevation = 5
            num_panels = 2
            num_cells = 3
            column_offset = 15

            [fit]
            fit_weight = 1000.0
            axes = [
                { lower = 0.0, upper = 1.0, num_elements = 2 },
                { lower = 0.0, upper = 6.283185307179586, num_elements = 3 },
                { lower = 0.0, upper = 3.141592653589793, num_elements = 2 },
            ]

            [cell_skip]
            mode = "never"
            "#,
        )
        .unwrap();

        assert_eq!(config.layout.num_panels, 2);
        assert_eq!(config.layout.column_offset, 15);
        assert_eq!(config.cell_skip, CellSkip::Never);

        let fit = config.fit_options();
        assert_eq!(fit.fit_weight(), 1000.0);
        assert_eq!(fit.axes()[1].upper, TAU);
        assert_eq!(fit.ridge(), FitOptions::DEFAULT_RIDGE);
    }

    #[test]
    fn invalid_fit_options_fail_to_parse() {
        let result = SolarConfig::from_toml_str(
            r#"
            num_times = 4
            grid_table = "grid.txt"
            sample_table = "samples.txt"

            [fit]
            fit_weight = -1.0
            axes = [{ lower = 0.0, upper = 1.0, num_elements = 2 }]
            "#,
        );

        assert!(matches!(result, Err(ConfigLoadError::Parse(_))));
    }

    #[test]
    fn load_resolves_paths_against_config_directory() {
        let dir = std::env::temp_dir().join(format!("cadre-solar-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("solar.toml");
        fs::write(
            &path,
            "num_times = 3\ngrid_table = \"grid.txt\"\nsample_table = \"/abs/samples.txt\"\n",
        )
        .unwrap();

        let config = SolarConfig::load(&path).unwrap();

        assert_eq!(config.grid_table, dir.join("grid.txt"));
        assert_eq!(config.sample_table, PathBuf::from("/abs/samples.txt"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skip_threshold_controls_sparsity() {
        let zeros = array![[0.0, -0.0], [0.0, 0.0]];
        let tiny = array![[0.0, 1e-12], [0.0, 0.0]];

        assert!(CellSkip::default().skips(zeros.view()));
        assert!(!CellSkip::default().skips(tiny.view()));
        assert!(CellSkip::Below { threshold: 1e-9 }.skips(tiny.view()));
        assert!(!CellSkip::Never.skips(zeros.view()));
    }
}
