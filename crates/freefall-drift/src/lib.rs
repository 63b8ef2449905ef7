//! freefall-drift
//!
//! How far the wind carries a skydiver between exit and deployment.
//!
//! - Freefall time uses a two-phase model: a fixed time for the first
//!   `acceleration_phase_ft` feet, then constant terminal velocity.
//! - The drift wind is the circular mean of the interpolated winds between
//!   deployment and exit altitude (see `freefall-winds`).
//! - Horizontal displacement = drift wind speed [ft/s] * freefall time [s].
//!
//! Units: altitudes in feet, wind speeds in mph, headings in compass degrees.
//! All physical constants live in [`JumpConfig`].

use std::path::{Path, PathBuf};

use freefall_core::{mph_to_fps, Wind};
use freefall_winds::{Notice, WindError, WindField, WindSample};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DriftError>;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("exit altitude {exit} ft must be at least {min} ft")]
    ExitTooLow { exit: f64, min: f64 },

    #[error("deployment altitude {deployment} ft must be at least {min} ft")]
    DeploymentTooLow { deployment: f64, min: f64 },

    #[error("deployment altitude {deployment} ft must be below exit altitude {exit} ft")]
    DeploymentNotBelowExit { exit: f64, deployment: f64 },

    #[error("invalid jump config: {field} must be positive, got {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    #[error(transparent)]
    Wind(#[from] WindError),

    #[error("could not parse jump description: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// -------------------------
/// Configuration
/// -------------------------

/// Physical assumptions of the freefall model. Missing JSON fields fall back
/// to the defaults below.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub min_exit_altitude_ft: f64,
    pub min_deployment_altitude_ft: f64,
    pub terminal_velocity_mph: f64,
    /// Feet covered before reaching terminal velocity
    pub acceleration_phase_ft: f64,
    /// Seconds taken to cover `acceleration_phase_ft`
    pub acceleration_phase_s: f64,
}

impl Default for JumpConfig {
    fn default() -> Self {
        Self {
            min_exit_altitude_ft: 2000.0,
            min_deployment_altitude_ft: 1000.0,
            terminal_velocity_mph: 120.0,
            acceleration_phase_ft: 1000.0,
            acceleration_phase_s: 12.0,
        }
    }
}

impl JumpConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("terminal_velocity_mph", self.terminal_velocity_mph),
            ("acceleration_phase_ft", self.acceleration_phase_ft),
            ("acceleration_phase_s", self.acceleration_phase_s),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(DriftError::InvalidConfig { field, value });
            }
        }
        Ok(())
    }

    pub fn terminal_velocity_fps(&self) -> f64 {
        mph_to_fps(self.terminal_velocity_mph)
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| DriftError::Io { path: path.to_path_buf(), source })
}

/// One row of a wind form. Blank fields leave the row out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WindRow {
    pub altitude: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
}

impl WindRow {
    pub fn sample(&self) -> Option<WindSample> {
        Some(WindSample::new(self.altitude?, self.speed?, self.heading?))
    }
}

/// A complete jump description: what the CLI reads and the WASM binding
/// receives.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JumpPlan {
    #[serde(default)]
    pub config: JumpConfig,
    pub exit_altitude_ft: f64,
    pub deployment_altitude_ft: f64,
    #[serde(default)]
    pub winds: Vec<WindRow>,
}

impl JumpPlan {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&read_file(path.as_ref())?)
    }

    pub fn calculator(&self) -> Result<FreefallCalculator> {
        let mut calc =
            FreefallCalculator::new(self.config, self.exit_altitude_ft, self.deployment_altitude_ft)?;
        for s in self.winds.iter().filter_map(WindRow::sample) {
            calc.add_wind(s.altitude, s.speed, s.heading);
        }
        let skipped = self.incomplete_rows();
        if skipped > 0 {
            debug!("skipped {skipped} incomplete wind rows");
        }
        Ok(calc)
    }

    /// Wind rows with at least one blank field.
    pub fn incomplete_rows(&self) -> usize {
        self.winds.iter().filter(|r| r.sample().is_none()).count()
    }
}

/// -------------------------
/// Calculator
/// -------------------------

/// Everything a results screen shows for one jump.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DriftReport {
    pub exit_altitude_ft: f64,
    pub deployment_altitude_ft: f64,
    /// Mean heading of all measured winds, unweighted by altitude
    pub average_heading_deg: f64,
    /// Mean wind between deployment and exit altitude
    pub drift_wind: Wind,
    pub freefall_time_s: f64,
    pub horizontal_displacement_ft: f64,
    pub displacement_north_ft: f64,
    pub displacement_east_ft: f64,
    pub notices: Vec<Notice>,
}

#[derive(Clone, Debug)]
pub struct FreefallCalculator {
    config: JumpConfig,
    exit_altitude_ft: f64,
    deployment_altitude_ft: f64,
    winds: WindField,
}

impl FreefallCalculator {
    pub fn new(config: JumpConfig, exit_altitude_ft: f64, deployment_altitude_ft: f64) -> Result<Self> {
        config.validate()?;
        if !(exit_altitude_ft >= config.min_exit_altitude_ft) {
            return Err(DriftError::ExitTooLow { exit: exit_altitude_ft, min: config.min_exit_altitude_ft });
        }
        if !(deployment_altitude_ft >= config.min_deployment_altitude_ft) {
            return Err(DriftError::DeploymentTooLow {
                deployment: deployment_altitude_ft,
                min: config.min_deployment_altitude_ft,
            });
        }
        if deployment_altitude_ft >= exit_altitude_ft {
            return Err(DriftError::DeploymentNotBelowExit {
                exit: exit_altitude_ft,
                deployment: deployment_altitude_ft,
            });
        }
        Ok(Self { config, exit_altitude_ft, deployment_altitude_ft, winds: WindField::new() })
    }

    pub fn config(&self) -> &JumpConfig {
        &self.config
    }

    pub fn exit_altitude_ft(&self) -> f64 {
        self.exit_altitude_ft
    }

    pub fn deployment_altitude_ft(&self) -> f64 {
        self.deployment_altitude_ft
    }

    pub fn add_wind(&mut self, altitude_ft: f64, speed_mph: f64, heading_deg: f64) -> Option<Notice> {
        self.winds.add_measured_wind(altitude_ft, speed_mph, heading_deg)
    }

    pub fn winds(&self) -> &WindField {
        &self.winds
    }

    /// Seconds between exit and deployment.
    ///
    /// Past the acceleration phase the remaining feet are covered at terminal
    /// velocity; a shorter drop gets the acceleration time pro rata.
    pub fn freefall_time_s(&self) -> f64 {
        let c = &self.config;
        let drop = self.exit_altitude_ft - self.deployment_altitude_ft;
        if drop > c.acceleration_phase_ft {
            c.acceleration_phase_s + (drop - c.acceleration_phase_ft) / c.terminal_velocity_fps()
        } else {
            c.acceleration_phase_s * drop / c.acceleration_phase_ft
        }
    }

    /// Circular mean wind [mph] between deployment and exit altitude.
    pub fn average_wind(&mut self) -> Result<Wind> {
        Ok(self.winds.average_wind_in_range(self.deployment_altitude_ft, self.exit_altitude_ft)?)
    }

    /// Horizontal distance [ft] drifted during freefall.
    pub fn horizontal_displacement_ft(&mut self) -> Result<f64> {
        let wind = self.average_wind()?;
        Ok(mph_to_fps(wind.speed) * self.freefall_time_s())
    }

    pub fn drift_report(&mut self) -> Result<DriftReport> {
        let average_heading_deg = self.winds.average_heading()?;
        let drift_wind = self.average_wind()?;
        let freefall_time_s = self.freefall_time_s();

        let horizontal_displacement_ft = mph_to_fps(drift_wind.speed) * freefall_time_s;
        let displacement_north_ft = mph_to_fps(drift_wind.north()) * freefall_time_s;
        let displacement_east_ft = mph_to_fps(drift_wind.east()) * freefall_time_s;

        info!(
            "jump {} -> {} ft: {:.1} s freefall, drift {:.0} ft toward {:.0}°",
            self.exit_altitude_ft,
            self.deployment_altitude_ft,
            freefall_time_s,
            horizontal_displacement_ft,
            drift_wind.heading
        );

        Ok(DriftReport {
            exit_altitude_ft: self.exit_altitude_ft,
            deployment_altitude_ft: self.deployment_altitude_ft,
            average_heading_deg,
            drift_wind,
            freefall_time_s,
            horizontal_displacement_ft,
            displacement_north_ft,
            displacement_east_ft,
            notices: self.winds.take_notices(),
        })
    }
}

/* -------------------------------- tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn two_phase_freefall_time() {
        let calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 3_500.0).unwrap();
        // 12 s for the first 1000 ft, then 7500 ft at 176 ft/s
        assert_abs_diff_eq!(calc.freefall_time_s(), 12.0 + 7_500.0 / 176.0, epsilon = 1e-9);
    }

    #[test]
    fn short_drop_prorates_acceleration_phase() {
        let config = JumpConfig { min_exit_altitude_ft: 0.0, min_deployment_altitude_ft: 0.0, ..JumpConfig::default() };
        let calc = FreefallCalculator::new(config, 2_500.0, 2_000.0).unwrap();
        assert_abs_diff_eq!(calc.freefall_time_s(), 6.0, epsilon = 1e-12);
    }

    #[test]
    fn altitude_limits_are_enforced() {
        let c = JumpConfig::default();
        assert!(matches!(FreefallCalculator::new(c, 1_500.0, 1_000.0), Err(DriftError::ExitTooLow { .. })));
        assert!(matches!(FreefallCalculator::new(c, 10_000.0, 800.0), Err(DriftError::DeploymentTooLow { .. })));
        assert!(matches!(
            FreefallCalculator::new(c, 5_000.0, 5_000.0),
            Err(DriftError::DeploymentNotBelowExit { .. })
        ));
        assert!(matches!(FreefallCalculator::new(c, f64::NAN, 3_000.0), Err(DriftError::ExitTooLow { .. })));
    }

    #[test]
    fn config_rejects_non_positive_terminal_velocity() {
        let err = JumpConfig::from_json_str(r#"{ "terminal_velocity_mph": 0 }"#).unwrap_err();
        assert!(matches!(err, DriftError::InvalidConfig { field: "terminal_velocity_mph", .. }));
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let c = JumpConfig::from_json_str(r#"{ "terminal_velocity_mph": 150.0 }"#).unwrap();
        assert_abs_diff_eq!(c.terminal_velocity_mph, 150.0);
        assert_abs_diff_eq!(c.min_exit_altitude_ft, 2000.0);
        assert_abs_diff_eq!(c.acceleration_phase_s, 12.0);
    }

    #[test]
    fn displacement_is_speed_times_time() {
        let mut calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 4_000.0).unwrap();
        for alt in [3_000.0, 6_000.0, 9_000.0, 12_000.0] {
            calc.add_wind(alt, 30.0, 90.0);
        }
        let t = calc.freefall_time_s();
        let d = calc.horizontal_displacement_ft().unwrap();
        assert_abs_diff_eq!(d, 44.0 * t, epsilon = 1e-6); // 30 mph = 44 ft/s

        let report = calc.drift_report().unwrap();
        assert_abs_diff_eq!(report.horizontal_displacement_ft, d, epsilon = 1e-9);
        assert_abs_diff_eq!(report.displacement_east_ft, d, epsilon = 1e-6);
        assert_abs_diff_eq!(report.displacement_north_ft, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn missing_winds_surface_as_wind_errors() {
        let mut calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 4_000.0).unwrap();
        assert!(matches!(calc.average_wind(), Err(DriftError::Wind(WindError::EmptyInput))));

        calc.add_wind(10_000.0, 20.0, 0.0);
        calc.add_wind(3_000.0, 20.0, 0.0);
        let err = calc.horizontal_displacement_ft().unwrap_err();
        assert!(matches!(err, DriftError::Wind(WindError::AboveMeasured { .. })));
    }

    #[test]
    fn plan_skips_blank_rows() {
        let plan = JumpPlan::from_json_str(
            r#"{
                "exit_altitude_ft": 12000,
                "deployment_altitude_ft": 3500,
                "winds": [
                    { "altitude": 12000, "speed": 25, "heading": 0 },
                    { "altitude": 9000,  "speed": 25, "heading": 90 },
                    { "altitude": 6000 },
                    {}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.config, JumpConfig::default());
        assert_eq!(plan.incomplete_rows(), 2);

        let calc = plan.calculator().unwrap();
        assert_eq!(calc.winds().len(), 2);
        assert_abs_diff_eq!(calc.exit_altitude_ft(), 12_000.0);
        assert_abs_diff_eq!(calc.deployment_altitude_ft(), 3_500.0);
        assert_eq!(calc.config(), &plan.config);
    }

    #[test]
    fn repeated_altitudes_are_not_incomplete_rows() {
        let plan = JumpPlan::from_json_str(
            r#"{
                "exit_altitude_ft": 12000,
                "deployment_altitude_ft": 3500,
                "winds": [
                    { "altitude": 12000, "speed": 25, "heading": 0 },
                    { "altitude": 12000, "speed": 30, "heading": 10 },
                    { "altitude": 3000,  "speed": 25, "heading": 90 },
                    { "speed": 10 }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(plan.incomplete_rows(), 1);

        let calc = plan.calculator().unwrap();
        assert_eq!(calc.winds().len(), 2);
        assert_eq!(calc.winds().notices().len(), 1);
    }

    #[test]
    fn deployment_below_lowest_wind_is_noted() {
        let mut calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 2_000.0).unwrap();
        calc.add_wind(12_000.0, 20.0, 180.0);
        calc.add_wind(3_000.0, 20.0, 180.0);

        let report = calc.drift_report().unwrap();
        assert_abs_diff_eq!(report.drift_wind.speed, 20.0, epsilon = 1e-9);
        assert_eq!(report.notices, vec![Notice::BelowMeasured { requested: 2_000.0, min: 3_000.0 }]);
    }
}
