//! freefall-winds
//!
//! Altitude-tagged wind samples and the queries a drift estimate needs:
//! circular averages, a linearly interpolated wind table, and the average
//! wind between two altitudes.
//!
//! - Measured samples are unique per altitude. Re-adding an altitude replaces
//!   the earlier sample and records a [`Notice`] (non-fatal).
//! - Averages are vector means of the north/east components, so opposing
//!   winds cancel and headings around north do not wrap to 180°.
//! - Range queries run over an interpolated table that is (re)built lazily at
//!   one-foot resolution and reused until the measured set changes.
//!
//! Interpolation, for each consecutive measured pair `(low, high)` with
//! `n = (high.alt - low.alt) / feet_per_step` steps between them:
//!
//!   v_j   = ((n-1-j)/n) * v_low + ((j+1)/n) * v_high
//!   alt_j = low.alt + j * feet_per_step,   j = 0, 1, .. while j < n
//!
//! where `v` is the `(north, east)` component vector. Altitudes already in the
//! table are skipped; the measured endpoints are always stored verbatim.

use std::fmt;

use freefall_core::Wind;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WindError>;

/// Failures of a single wind query. None of these poison the field.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindError {
    #[error("no measured winds recorded")]
    EmptyInput,

    #[error("interpolation needs at least two distinct measured altitudes, have {count}")]
    InsufficientSamples { count: usize },

    #[error("interpolation resolution must be a positive, finite number of steps, got {steps}")]
    InvalidResolution { steps: f64 },

    #[error("low altitude {lo} ft must be below high altitude {hi} ft")]
    InvalidRange { lo: f64, hi: f64 },

    #[error("no wind data available above {max} ft, wind was requested at {requested} ft")]
    AboveMeasured { requested: f64, max: f64 },

    #[error("no wind data available below the ground, {requested} ft was requested")]
    BelowGround { requested: f64 },

    #[error("wind table has not been interpolated")]
    NotInterpolated,

    #[error("no interpolated winds between {lo} ft and {hi} ft")]
    NoSamplesInRange { lo: f64, hi: f64 },
}

impl WindError {
    /// The requested altitudes fall outside what the measurements cover.
    pub fn is_out_of_range(&self) -> bool {
        matches!(self, WindError::AboveMeasured { .. } | WindError::BelowGround { .. })
    }
}

/// Non-fatal conditions. Each one is logged and kept on the [`WindField`]
/// until drained with [`WindField::take_notices`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// A measured sample replaced an earlier one at the same altitude.
    DuplicateAltitude { altitude: f64, previous: Wind, replacement: Wind },
    /// Bulk input columns had different lengths; only `used` rows were read.
    LengthMismatch { altitudes: usize, speeds: usize, headings: usize, used: usize },
    /// An interpolated entry was overwritten by a measured endpoint.
    InterpolatedOverwrite { altitude: f64 },
    /// The interpolated columns ended up with different lengths.
    TableConsistency { altitudes: usize, speeds: usize, headings: usize },
    /// A range query started below the lowest measurement; the mean only
    /// covers `min` and up.
    BelowMeasured { requested: f64, min: f64 },
    /// A sample with a non-finite field was dropped.
    RejectedSample { altitude: f64, speed: f64, heading: f64 },
}

impl Notice {
    fn log(&self) {
        match self {
            Notice::InterpolatedOverwrite { .. } => debug!("{self}"),
            _ => warn!("{self}"),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::DuplicateAltitude { altitude, previous, replacement } => write!(
                f,
                "wind already recorded at {altitude} ft ({} @ {}°), {} @ {}° will be used",
                previous.speed, previous.heading, replacement.speed, replacement.heading
            ),
            Notice::LengthMismatch { altitudes, speeds, headings, used } => write!(
                f,
                "wind columns differ in length (altitudes {altitudes}, speeds {speeds}, \
                 headings {headings}), using the first {used}"
            ),
            Notice::InterpolatedOverwrite { altitude } => {
                write!(f, "interpolated wind at {altitude} ft replaced by measured wind")
            }
            Notice::TableConsistency { altitudes, speeds, headings } => write!(
                f,
                "unequal number of interpolated altitudes ({altitudes}), speeds ({speeds}) \
                 and headings ({headings})"
            ),
            Notice::BelowMeasured { requested, min } => write!(
                f,
                "no wind measured below {min} ft, winds from {requested} ft to {min} ft \
                 are taken to match the lowest measurement"
            ),
            Notice::RejectedSample { altitude, speed, heading } => write!(
                f,
                "ignoring wind sample with non-finite values \
                 (altitude {altitude}, speed {speed}, heading {heading})"
            ),
        }
    }
}

/// One wind observation at one altitude.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindSample {
    pub altitude: f64, // ft above ground
    pub speed: f64,
    pub heading: f64, // compass degrees, not normalized
}

impl WindSample {
    pub fn new(altitude: f64, speed: f64, heading: f64) -> Self {
        Self { altitude, speed, heading }
    }

    pub fn wind(&self) -> Wind {
        Wind::new(self.speed, self.heading)
    }
}

/* --------------------------- interpolated table --------------------------- */

/// What a table was built from. A table whose key matches the current
/// measured set is reused as-is.
#[derive(Clone, Copy, Debug, PartialEq)]
struct TableKey {
    samples: usize,
    steps: f64,
    min_altitude: f64,
    max_altitude: f64,
}

/// Interpolated winds, ascending by altitude, at most one per altitude.
///
/// Stored as three parallel columns so callers can hand the altitude, speed
/// or heading series straight to a plot or an FFI boundary.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolatedTable {
    altitudes: Vec<f64>,
    speeds: Vec<f64>,
    headings: Vec<f64>,
    key: TableKey,
}

impl InterpolatedTable {
    fn empty(key: TableKey) -> Self {
        Self { altitudes: Vec::new(), speeds: Vec::new(), headings: Vec::new(), key }
    }

    pub fn len(&self) -> usize {
        self.altitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.altitudes.is_empty()
    }

    pub fn altitudes(&self) -> &[f64] {
        &self.altitudes
    }

    pub fn speeds(&self) -> &[f64] {
        &self.speeds
    }

    pub fn headings(&self) -> &[f64] {
        &self.headings
    }

    /// The `steps` value the table was built with.
    pub fn resolution(&self) -> f64 {
        self.key.steps
    }

    pub fn feet_per_step(&self) -> f64 {
        (self.key.max_altitude - self.key.min_altitude) / self.key.steps
    }

    pub fn get(&self, index: usize) -> Option<WindSample> {
        Some(WindSample::new(
            *self.altitudes.get(index)?,
            *self.speeds.get(index)?,
            *self.headings.get(index)?,
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = WindSample> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Index of the first entry at or above `altitude`.
    fn lower_bound(&self, altitude: f64) -> usize {
        self.altitudes.partition_point(|a| *a < altitude)
    }

    /// Exact-match lookup.
    pub fn index_of(&self, altitude: f64) -> Option<usize> {
        let i = self.lower_bound(altitude);
        (self.altitudes.get(i) == Some(&altitude)).then_some(i)
    }

    pub fn contains(&self, altitude: f64) -> bool {
        self.index_of(altitude).is_some()
    }

    /// Insert keeping altitude order; an existing entry at `altitude` is
    /// overwritten.
    fn add_interpolated_wind(&mut self, altitude: f64, wind: Wind) -> Option<Notice> {
        let i = self.lower_bound(altitude);
        if self.altitudes.get(i) == Some(&altitude) {
            self.speeds[i] = wind.speed;
            self.headings[i] = wind.heading;
            return Some(Notice::InterpolatedOverwrite { altitude });
        }
        self.altitudes.insert(i, altitude);
        self.speeds.insert(i, wind.speed);
        self.headings.insert(i, wind.heading);
        None
    }

    fn check_consistency(&self) -> Option<Notice> {
        let (altitudes, speeds, headings) =
            (self.altitudes.len(), self.speeds.len(), self.headings.len());
        (altitudes != speeds || altitudes != headings)
            .then_some(Notice::TableConsistency { altitudes, speeds, headings })
    }

    /// Circular mean over entries from `lo` (inclusive) to `hi` (exclusive).
    ///
    /// Both bounds resolve to the first entry at or above them, which is the
    /// exact entry whenever the altitude is tabulated (always the case for
    /// whole feet in a one-foot table).
    pub fn mean_between(&self, lo: f64, hi: f64) -> Option<Wind> {
        let (start, end) = (self.lower_bound(lo), self.lower_bound(hi));
        Wind::mean((start..end).map(|i| Wind::new(self.speeds[i], self.headings[i])))
    }
}

/// Build a fresh table from samples sorted ascending by altitude.
fn build_table(samples: &[WindSample], key: TableKey) -> (InterpolatedTable, Vec<Notice>) {
    let mut table = InterpolatedTable::empty(key);
    let mut notices = Vec::new();
    let feet_per_step = (key.max_altitude - key.min_altitude) / key.steps;

    for pair in samples.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        let n = (high.altitude - low.altitude) / feet_per_step;
        let low_v = low.wind().components();
        let high_v = high.wind().components();

        notices.extend(table.add_interpolated_wind(low.altitude, low.wind()));

        let mut j = 0.0;
        while j < n {
            let altitude = low.altitude + j * feet_per_step;
            if !table.contains(altitude) {
                let v = low_v * ((n - 1.0 - j) / n) + high_v * ((j + 1.0) / n);
                notices.extend(table.add_interpolated_wind(altitude, Wind::from_components(v)));
            }
            j += 1.0;
        }
    }

    if let Some(last) = samples.last() {
        notices.extend(table.add_interpolated_wind(last.altitude, last.wind()));
    }
    notices.extend(table.check_consistency());

    debug!(
        "interpolated {} measured winds into {} entries ({} ft per step)",
        samples.len(),
        table.len(),
        feet_per_step
    );
    (table, notices)
}

/* -------------------------------- wind field ------------------------------- */

/// Measured winds plus the interpolated table derived from them.
///
/// Owned and mutated by one caller at a time; queries that need sorted
/// samples or a fresh table take `&mut self`.
#[derive(Clone, Debug, Default)]
pub struct WindField {
    measured: Vec<WindSample>,
    sorted: bool,
    /// `None` whenever the measured set changed since the last build.
    table: Option<InterpolatedTable>,
    notices: Vec<Notice>,
}

impl WindField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from parallel columns. Columns of unequal length are read up to
    /// the shortest one and a [`Notice::LengthMismatch`] is recorded.
    pub fn from_columns(altitudes: &[f64], speeds: &[f64], headings: &[f64]) -> Self {
        let mut field = Self::new();
        let used = altitudes.len().min(speeds.len()).min(headings.len());
        if used != altitudes.len() || used != speeds.len() || used != headings.len() {
            field.record(Notice::LengthMismatch {
                altitudes: altitudes.len(),
                speeds: speeds.len(),
                headings: headings.len(),
                used,
            });
        }
        for ((&altitude, &speed), &heading) in altitudes.iter().zip(speeds).zip(headings) {
            field.add_measured_wind(altitude, speed, heading);
        }
        field
    }

    pub fn from_samples<I>(samples: I) -> Self
    where
        I: IntoIterator<Item = WindSample>,
    {
        let mut field = Self::new();
        for s in samples {
            field.add_measured_wind(s.altitude, s.speed, s.heading);
        }
        field
    }

    fn record(&mut self, notice: Notice) {
        notice.log();
        self.notices.push(notice);
    }

    /// Add a measured wind. A sample already recorded at `altitude` is
    /// replaced (last write wins) and the returned notice says so. Samples
    /// with a NaN or infinite field are dropped with a
    /// [`Notice::RejectedSample`].
    pub fn add_measured_wind(&mut self, altitude: f64, speed: f64, heading: f64) -> Option<Notice> {
        if !(altitude.is_finite() && speed.is_finite() && heading.is_finite()) {
            let notice = Notice::RejectedSample { altitude, speed, heading };
            self.record(notice.clone());
            return Some(notice);
        }

        let replacement = WindSample::new(altitude, speed, heading);
        let existing = self.measured.iter().position(|s| s.altitude == altitude);
        let notice = existing.map(|i| {
            let previous = self.measured.remove(i);
            Notice::DuplicateAltitude {
                altitude,
                previous: previous.wind(),
                replacement: replacement.wind(),
            }
        });

        self.measured.push(replacement);
        self.sorted = false;
        self.table = None;

        if let Some(n) = &notice {
            self.record(n.clone());
        }
        notice
    }

    pub fn len(&self) -> usize {
        self.measured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }

    pub fn sort_by_altitude_ascending(&mut self) {
        if !self.sorted {
            // altitudes are unique, so stability does not matter
            self.measured.sort_unstable_by(|a, b| a.altitude.total_cmp(&b.altitude));
            self.sorted = true;
        }
    }

    /// Measured samples, ascending by altitude.
    pub fn samples(&mut self) -> &[WindSample] {
        self.sort_by_altitude_ascending();
        &self.measured
    }

    pub fn min_altitude(&mut self) -> Result<f64> {
        self.samples().first().map(|s| s.altitude).ok_or(WindError::EmptyInput)
    }

    pub fn max_altitude(&mut self) -> Result<f64> {
        self.samples().last().map(|s| s.altitude).ok_or(WindError::EmptyInput)
    }

    /// Circular mean over all measured samples, unweighted by altitude spacing.
    pub fn average_wind(&self) -> Result<Wind> {
        Wind::mean(self.measured.iter().map(WindSample::wind)).ok_or(WindError::EmptyInput)
    }

    /// Average heading in compass degrees, `[0, 360)`.
    pub fn average_heading(&self) -> Result<f64> {
        self.average_wind().map(|w| w.heading)
    }

    pub fn average_wind_speed(&self) -> Result<f64> {
        self.average_wind().map(|w| w.speed)
    }

    /// Interpolate the measured winds across `[min_altitude, max_altitude]`
    /// at `(max - min) / steps` feet per entry. Passing the full span yields
    /// one entry per foot.
    ///
    /// The current table is returned untouched when it was built from the
    /// same samples and the same `steps`.
    pub fn interpolate(&mut self, steps: f64) -> Result<&InterpolatedTable> {
        if !(steps.is_finite() && steps > 0.0) {
            return Err(WindError::InvalidResolution { steps });
        }

        let count = self.len();
        let samples = self.samples();
        let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
            return Err(WindError::EmptyInput);
        };
        let key = TableKey {
            samples: count,
            steps,
            min_altitude: first.altitude,
            max_altitude: last.altitude,
        };
        if count < 2 || !(key.max_altitude > key.min_altitude) {
            return Err(WindError::InsufficientSamples { count });
        }

        if self.table.as_ref().is_some_and(|t| t.key == key) {
            debug!("reusing interpolated wind table ({steps} steps)");
        } else {
            let (table, notices) = build_table(&self.measured, key);
            for n in notices {
                self.record(n);
            }
            self.table = Some(table);
        }

        self.table.as_ref().ok_or(WindError::NotInterpolated)
    }

    /// The table from the last successful [`interpolate`](Self::interpolate),
    /// if the measured set has not changed since.
    pub fn interpolated(&self) -> Option<&InterpolatedTable> {
        self.table.as_ref()
    }

    pub fn is_interpolated(&self) -> bool {
        self.table.is_some()
    }

    /// Circular mean wind between `lo` and `hi` feet, computed over the
    /// one-foot interpolated table (rebuilt first if stale).
    pub fn average_wind_in_range(&mut self, lo: f64, hi: f64) -> Result<Wind> {
        if !(lo < hi) {
            return Err(WindError::InvalidRange { lo, hi });
        }
        let max = self.max_altitude()?;
        if hi > max {
            return Err(WindError::AboveMeasured { requested: hi, max });
        }
        if lo < 0.0 {
            return Err(WindError::BelowGround { requested: lo });
        }

        let min = self.min_altitude()?;
        if lo < min {
            self.record(Notice::BelowMeasured { requested: lo, min });
        }
        let table = self.interpolate(max - min)?;
        table.mean_between(lo, hi).ok_or(WindError::NoSamplesInRange { lo, hi })
    }

    pub fn average_windspeed_in_range(&mut self, lo: f64, hi: f64) -> Result<f64> {
        self.average_wind_in_range(lo, hi).map(|w| w.speed)
    }

    pub fn average_heading_in_range(&mut self, lo: f64, hi: f64) -> Result<f64> {
        self.average_wind_in_range(lo, hi).map(|w| w.heading)
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

/* -------------------------------- tests -------------------------------- */
