use cadre_core::{Discipline, InnerProduct, Model, Phase, SequenceError};
use cadre_surrogate::{FitOptions, Surrogate};
use log::{debug, warn};
use ndarray::{Array1, Array2, Array3, ArrayView2, Axis as ArrayAxis, Zip};

use crate::{AngleSeries, Axis, CellSkip, Error, FixAngles, SolarConfig, TableLayout, TrainingSet};

/// Plausible range of a single cell's exposed area, in m².
///
/// Used to flag suspicious outputs in the log; values are never clamped.
pub const AREA_BOUNDS: (f64, f64) = (-5e-3, 1.834e-1);

/// Inputs to the exposed-area discipline.
#[derive(Debug, Clone, PartialEq)]
pub struct SolarInput {
    /// Solar panel fin angle, in radians, shared by every time step.
    pub fin_angle: f64,
    /// Sun azimuth in the body frame over time, in radians, unnormalized.
    pub azimuth: Array1<f64>,
    /// Sun elevation in the body frame over time, in radians, unnormalized.
    pub elevation: Array1<f64>,
}

/// Perturbations or sensitivities of the discipline inputs.
///
/// `None` marks a channel that takes no part in a linear-operator call: it is
/// neither read in forward mode nor written in reverse mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSeed {
    pub fin_angle: Option<f64>,
    pub azimuth: Option<Array1<f64>>,
    pub elevation: Option<Array1<f64>>,
}

/// Selects which input channels an [`InputSeed`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channels {
    pub fin_angle: bool,
    pub azimuth: bool,
    pub elevation: bool,
}

impl Channels {
    pub const ALL: Channels = Channels {
        fin_angle: true,
        azimuth: true,
        elevation: true,
    };
}

impl InputSeed {
    /// Returns a zeroed seed carrying the selected channels.
    #[must_use]
    pub fn zeros(num_times: usize, channels: Channels) -> Self {
        Self {
            fin_angle: channels.fin_angle.then_some(0.0),
            azimuth: channels.azimuth.then(|| Array1::zeros(num_times)),
            elevation: channels.elevation.then(|| Array1::zeros(num_times)),
        }
    }

    #[must_use]
    pub fn channels(&self) -> Channels {
        Channels {
            fin_angle: self.fin_angle.is_some(),
            azimuth: self.azimuth.is_some(),
            elevation: self.elevation.is_some(),
        }
    }
}

impl InnerProduct for InputSeed {
    fn inner(&self, other: &Self) -> f64 {
        self.fin_angle.inner(&other.fin_angle)
            + self.azimuth.inner(&other.azimuth)
            + self.elevation.inner(&other.elevation)
    }
}

/// Partial derivatives of the exposed area at one query array.
///
/// Each tensor is indexed `[time, cell, panel]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Jacobians {
    pub fin_angle: Array3<f64>,
    pub azimuth: Array3<f64>,
    pub elevation: Array3<f64>,
}

impl Jacobians {
    #[must_use]
    pub fn axis(&self, axis: Axis) -> &Array3<f64> {
        match axis {
            Axis::FinAngle => &self.fin_angle,
            Axis::Azimuth => &self.azimuth,
            Axis::Elevation => &self.elevation,
        }
    }
}

/// Exposed area of every solar cell over time.
///
/// The surrogate is fit once at construction and never refit. Each
/// evaluation cycle is one [`solve_nonlinear`](Discipline::solve_nonlinear),
/// then at most one [`linearize`](Discipline::linearize) at the same input,
/// then any number of linear-operator calls. A new nonlinear solve drops the
/// cached Jacobians.
///
/// Normalized angles are treated as having unit derivative with respect to
/// the raw angles; the normalizer's reflections are not differentiated.
#[derive(Debug, Clone)]
pub struct ExposedArea<N = FixAngles> {
    num_times: usize,
    layout: TableLayout,
    surrogate: Surrogate,
    normalizer: N,
    cell_skip: CellSkip,
    phase: Phase,
    /// `[time, axis]` query of the last nonlinear solve.
    query: Array2<f64>,
    /// `[cell, panel, time]`
    area: Array3<f64>,
    jacobians: Option<Jacobians>,
    extrapolated: usize,
}

impl ExposedArea<FixAngles> {
    /// Fits the surrogate to `training` and builds a component for
    /// `num_times` time steps.
    ///
    /// # Errors
    ///
    /// Returns an error if the surrogate cannot be fit.
    pub fn new(
        num_times: usize,
        training: &TrainingSet,
        options: &FitOptions,
    ) -> Result<Self, Error> {
        Self::with_normalizer(num_times, training, options, FixAngles)
    }

    /// Reads the training tables named by `config` and builds a component.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be loaded or the surrogate cannot
    /// be fit.
    pub fn from_config(config: &SolarConfig) -> Result<Self, Error> {
        let training = TrainingSet::read(&config.grid_table, &config.sample_table, &config.layout)?;
        let component = Self::new(config.num_times, &training, &config.fit_options())?;
        Ok(component.with_cell_skip(config.cell_skip))
    }
}

impl<N> ExposedArea<N>
where
    N: Model<Input = AngleSeries, Output = AngleSeries>,
{
    /// Like [`ExposedArea::new`], with a custom angle normalizer.
    ///
    /// # Errors
    ///
    /// Returns an error if the surrogate cannot be fit.
    pub fn with_normalizer(
        num_times: usize,
        training: &TrainingSet,
        options: &FitOptions,
        normalizer: N,
    ) -> Result<Self, Error> {
        let surrogate = Surrogate::fit(training.sites.view(), training.outputs.view(), options)?;
        Self::from_surrogate(num_times, training.layout, surrogate, normalizer)
    }

    /// Builds a component around an already fitted surrogate.
    ///
    /// Lets one fit serve the components of several mission points.
    ///
    /// # Errors
    ///
    /// Returns an error if the surrogate does not map three angles to one
    /// output per (panel, cell) pair of `layout`.
    pub fn from_surrogate(
        num_times: usize,
        layout: TableLayout,
        surrogate: Surrogate,
        normalizer: N,
    ) -> Result<Self, Error> {
        let expected = [Axis::ALL.len(), layout.num_outputs()];
        let actual = [surrogate.dim(), surrogate.num_outputs()];
        if expected != actual {
            return Err(Error::shape("surrogate", &expected, &actual));
        }

        Ok(Self {
            num_times,
            layout,
            surrogate,
            normalizer,
            cell_skip: CellSkip::default(),
            phase: Phase::Fitted,
            query: Array2::zeros((num_times, Axis::ALL.len())),
            area: Array3::zeros((layout.num_cells, layout.num_panels, num_times)),
            jacobians: None,
            extrapolated: 0,
        })
    }

    /// Sets how the reverse operator skips sparse cell seeds.
    #[must_use]
    pub fn with_cell_skip(mut self, cell_skip: CellSkip) -> Self {
        self.cell_skip = cell_skip;
        self
    }

    #[must_use]
    pub fn num_times(&self) -> usize {
        self.num_times
    }

    #[must_use]
    pub fn layout(&self) -> &TableLayout {
        &self.layout
    }

    #[must_use]
    pub fn surrogate(&self) -> &Surrogate {
        &self.surrogate
    }

    #[must_use]
    pub fn cell_skip(&self) -> CellSkip {
        self.cell_skip
    }

    /// Returns the `[time, axis]` query of the last nonlinear solve.
    #[must_use]
    pub fn query(&self) -> ArrayView2<'_, f64> {
        self.query.view()
    }

    /// Returns the `[cell, panel, time]` exposed area of the last nonlinear solve.
    #[must_use]
    pub fn area(&self) -> &Array3<f64> {
        &self.area
    }

    /// Returns the cached Jacobians, if the component is linearized.
    #[must_use]
    pub fn jacobians(&self) -> Option<&Jacobians> {
        self.jacobians.as_ref()
    }

    /// Number of time steps in the last nonlinear solve whose query fell
    /// outside the surrogate's domain and was extrapolated.
    #[must_use]
    pub fn extrapolated_points(&self) -> usize {
        self.extrapolated
    }

    /// Returns `J · seed` as a fresh `[cell, panel, time]` tensor.
    ///
    /// # Errors
    ///
    /// Returns an error under the conditions of
    /// [`apply_linear_forward`](Discipline::apply_linear_forward).
    pub fn forward(&self, seed: &InputSeed) -> Result<Array3<f64>, Error> {
        let mut d_area = Array3::zeros(self.area.dim());
        self.apply_linear_forward(seed, &mut d_area)?;
        Ok(d_area)
    }

    /// Returns `Jᵀ · d_area` for the selected input channels.
    ///
    /// # Errors
    ///
    /// Returns an error under the conditions of
    /// [`apply_linear_reverse`](Discipline::apply_linear_reverse).
    pub fn reverse(&self, d_area: &Array3<f64>, channels: Channels) -> Result<InputSeed, Error> {
        let mut seed = InputSeed::zeros(self.num_times, channels);
        self.apply_linear_reverse(d_area, &mut seed)?;
        Ok(seed)
    }

    /// Builds the `[time, axis]` query for `input`.
    fn build_query(&self, input: &SolarInput) -> Result<Array2<f64>, Error> {
        let n = self.num_times;
        self.check_series("azimuth", Some(&input.azimuth))?;
        self.check_series("elevation", Some(&input.elevation))?;

        let normalized = self
            .normalizer
            .call(&AngleSeries {
                azimuth: input.azimuth.clone(),
                elevation: input.elevation.clone(),
            })
            .map_err(|e| Error::Normalizer(Box::new(e)))?;
        self.check_series("normalized azimuth", Some(&normalized.azimuth))?;
        self.check_series("normalized elevation", Some(&normalized.elevation))?;

        let mut query = Array2::zeros((n, Axis::ALL.len()));
        query.column_mut(Axis::FinAngle.index()).fill(input.fin_angle);
        query
            .column_mut(Axis::Azimuth.index())
            .assign(&normalized.azimuth);
        query
            .column_mut(Axis::Elevation.index())
            .assign(&normalized.elevation);
        Ok(query)
    }

    fn check_series(&self, name: &'static str, series: Option<&Array1<f64>>) -> Result<(), Error> {
        match series {
            Some(values) if values.len() != self.num_times => {
                Err(Error::shape(name, &[self.num_times], values.shape()))
            }
            _ => Ok(()),
        }
    }

    fn check_area_seed(&self, name: &'static str, seed: &Array3<f64>) -> Result<(), Error> {
        if seed.dim() == self.area.dim() {
            Ok(())
        } else {
            Err(Error::shape(name, self.area.shape(), seed.shape()))
        }
    }

    fn linearized(&self, operation: &'static str) -> Result<&Jacobians, Error> {
        self.phase.ensure(operation, Phase::Linearized)?;
        self.jacobians.as_ref().ok_or_else(|| {
            Error::Sequence(SequenceError {
                operation,
                required: Phase::Linearized,
                actual: self.phase,
            })
        })
    }

    /// Reorders a `[time, output]` surrogate result into `[time, cell, panel]`.
    fn to_time_cell_panel(&self, values: &Array2<f64>) -> Array3<f64> {
        let layout = self.layout;
        Array3::from_shape_fn(
            (self.num_times, layout.num_cells, layout.num_panels),
            |(t, c, p)| values[[t, layout.column_index(p, c)]],
        )
    }

    fn warn_out_of_bounds(&self) {
        let (low, high) = AREA_BOUNDS;
        let count = self.area.iter().filter(|&&a| a < low || a > high).count();
        if count > 0 {
            warn!(
                "{count} exposed-area values fall outside the plausible range [{low}, {high}] m²"
            );
        }
    }
}

impl<N> Discipline for ExposedArea<N>
where
    N: Model<Input = AngleSeries, Output = AngleSeries>,
{
    type Input = SolarInput;
    type Output = Array3<f64>;
    type InputSeed = InputSeed;
    type OutputSeed = Array3<f64>;
    type Error = Error;

    fn phase(&self) -> Phase {
        self.phase
    }

    fn solve_nonlinear(&mut self, input: &SolarInput) -> Result<&Array3<f64>, Error> {
        let query = self.build_query(input)?;
        let (values, extrapolated) = self.surrogate.evaluate_counted(query.view())?;

        let layout = self.layout;
        self.area = Array3::from_shape_fn(
            (layout.num_cells, layout.num_panels, self.num_times),
            |(c, p, t)| values[[t, layout.column_index(p, c)]],
        );
        self.extrapolated = extrapolated;
        self.query = query;
        self.jacobians = None;
        self.phase = Phase::Evaluated;

        self.warn_out_of_bounds();
        debug!("exposed area evaluated over {} time steps", self.num_times);
        Ok(&self.area)
    }

    fn linearize(&mut self, input: &SolarInput) -> Result<(), Error> {
        self.phase.ensure("linearize", Phase::Evaluated)?;

        let query = self.build_query(input)?;
        let unchanged = query
            .iter()
            .zip(self.query.iter())
            .all(|(a, b)| a.to_bits() == b.to_bits());
        if !unchanged {
            return Err(Error::InputChanged);
        }

        let gradient = |axis: Axis| -> Result<Array3<f64>, Error> {
            let values = self.surrogate.evaluate_gradient(self.query.view(), axis.index())?;
            Ok(self.to_time_cell_panel(&values))
        };
        let jacobians = Jacobians {
            fin_angle: gradient(Axis::FinAngle)?,
            azimuth: gradient(Axis::Azimuth)?,
            elevation: gradient(Axis::Elevation)?,
        };

        self.jacobians = Some(jacobians);
        self.phase = Phase::Linearized;
        debug!("exposed area linearized over {} time steps", self.num_times);
        Ok(())
    }

    fn apply_linear_forward(
        &self,
        d_input: &InputSeed,
        d_output: &mut Array3<f64>,
    ) -> Result<(), Error> {
        let jacobians = self.linearized("apply_linear_forward")?;
        self.check_area_seed("d_exposed_area", d_output)?;
        self.check_series("d_azimuth", d_input.azimuth.as_ref())?;
        self.check_series("d_elevation", d_input.elevation.as_ref())?;

        for c in 0..self.layout.num_cells {
            // [panel, time]
            let mut d_cell = d_output.index_axis_mut(ArrayAxis(0), c);

            if let Some(d_fin) = d_input.fin_angle {
                let j = jacobians.fin_angle.index_axis(ArrayAxis(1), c);
                d_cell.scaled_add(d_fin, &j.t());
            }
            if let Some(d_az) = &d_input.azimuth {
                let j = jacobians.azimuth.index_axis(ArrayAxis(1), c);
                Zip::from(&mut d_cell)
                    .and(j.t())
                    .and_broadcast(d_az)
                    .for_each(|d, &j, &s| *d += j * s);
            }
            if let Some(d_el) = &d_input.elevation {
                let j = jacobians.elevation.index_axis(ArrayAxis(1), c);
                Zip::from(&mut d_cell)
                    .and(j.t())
                    .and_broadcast(d_el)
                    .for_each(|d, &j, &s| *d += j * s);
            }
        }
        Ok(())
    }

    fn apply_linear_reverse(
        &self,
        d_output: &Array3<f64>,
        d_input: &mut InputSeed,
    ) -> Result<(), Error> {
        let jacobians = self.linearized("apply_linear_reverse")?;
        self.check_area_seed("d_exposed_area", d_output)?;
        self.check_series("d_azimuth", d_input.azimuth.as_ref())?;
        self.check_series("d_elevation", d_input.elevation.as_ref())?;

        for c in 0..self.layout.num_cells {
            // [panel, time]
            let seed = d_output.index_axis(ArrayAxis(0), c);
            if self.cell_skip.skips(seed) {
                continue;
            }

            if let Some(d_fin) = d_input.fin_angle.as_mut() {
                let j = jacobians.fin_angle.index_axis(ArrayAxis(1), c);
                *d_fin += Zip::from(j.t())
                    .and(seed)
                    .fold(0.0, |acc, &j, &s| acc + j * s);
            }
            if let Some(d_az) = d_input.azimuth.as_mut() {
                let j = jacobians.azimuth.index_axis(ArrayAxis(1), c);
                Zip::from(d_az)
                    .and(j.rows())
                    .and(seed.columns())
                    .for_each(|d, j_t, s_t| *d += j_t.dot(&s_t));
            }
            if let Some(d_el) = d_input.elevation.as_mut() {
                let j = jacobians.elevation.index_axis(ArrayAxis(1), c);
                Zip::from(d_el)
                    .and(j.rows())
                    .and(seed.columns())
                    .for_each(|d, j_t, s_t| *d += j_t.dot(&s_t));
            }
        }
        Ok(())
    }
}
