use std::f64::consts::{PI, TAU};

use cadre_core::Model;
use ndarray::Array1;
use thiserror::Error;

/// Sun azimuth and elevation over time, in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct AngleSeries {
    pub azimuth: Array1<f64>,
    pub elevation: Array1<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AngleError {
    #[error("azimuth has {azimuth} samples but elevation has {elevation}")]
    LengthMismatch { azimuth: usize, elevation: usize },
}

/// Maps raw body-frame sun angles into the surrogate's domain.
///
/// Azimuth is wrapped into `[0, 2π)`. Elevation is wrapped into `[0, 2π)` and
/// then reflected into `[0, π]`; a reflected direction is the same direction
/// seen from the opposite azimuth, so azimuth shifts by `π` when that happens.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixAngles;

impl Model for FixAngles {
    type Input = AngleSeries;
    type Output = AngleSeries;
    type Error = AngleError;

    fn call(&self, input: &AngleSeries) -> Result<AngleSeries, Self::Error> {
        if input.azimuth.len() != input.elevation.len() {
            return Err(AngleError::LengthMismatch {
                azimuth: input.azimuth.len(),
                elevation: input.elevation.len(),
            });
        }

        let mut azimuth = input.azimuth.mapv(|a| a.rem_euclid(TAU));
        let mut elevation = input.elevation.mapv(|e| e.rem_euclid(TAU));
        for (a, e) in azimuth.iter_mut().zip(elevation.iter_mut()) {
            if *e > PI {
                *e = TAU - *e;
                *a = (*a + PI).rem_euclid(TAU);
            }
        }

        Ok(AngleSeries { azimuth, elevation })
    }
}
