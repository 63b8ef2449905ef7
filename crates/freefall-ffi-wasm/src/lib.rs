// crates/freefall-ffi-wasm/src/lib.rs
//
// WASM bindings: drift report, interpolated wind table, range average.

use wasm_bindgen::prelude::*;
use serde::{Deserialize, Serialize};
use serde_wasm_bindgen as swb;

// --- our crates ---
use freefall_core::Wind;
use freefall_drift::{DriftReport, JumpPlan, WindRow};
use freefall_winds::{Notice, WindField};

// Better panic messages in browser console
#[wasm_bindgen(start)]
pub fn wasm_start() {
    console_error_panic_hook::set_once();
}

/* --------------------------- Shared DTOs (JS) --------------------------- */

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsTableInput {
    pub winds: Vec<WindRow>,
    /// Resolution divisor; defaults to the measured span (one entry per foot)
    pub steps: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsTable {
    pub altitudes_ft: Vec<f64>,
    pub speeds: Vec<f64>,
    pub headings_deg: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsRangeInput {
    pub winds: Vec<WindRow>,
    pub lo_ft: f64,
    pub hi_ft: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsRangeResult {
    pub wind: Wind,
    pub notices: Vec<Notice>,
}

/* ------------------------------- helpers -------------------------------- */

fn field_from_rows(rows: &[WindRow]) -> WindField {
    WindField::from_samples(rows.iter().filter_map(WindRow::sample))
}

fn report_for(plan: &JumpPlan) -> Result<DriftReport, String> {
    let mut calc = plan.calculator().map_err(|e| e.to_string())?;
    calc.drift_report().map_err(|e| e.to_string())
}

fn table_for(input: &JsTableInput) -> Result<JsTable, String> {
    let mut field = field_from_rows(&input.winds);
    let steps = match input.steps {
        Some(s) => s,
        None => field.max_altitude().map_err(|e| e.to_string())?
            - field.min_altitude().map_err(|e| e.to_string())?,
    };
    let table = field.interpolate(steps).map_err(|e| e.to_string())?;
    Ok(JsTable {
        altitudes_ft: table.altitudes().to_vec(),
        speeds: table.speeds().to_vec(),
        headings_deg: table.headings().to_vec(),
    })
}

fn range_for(input: &JsRangeInput) -> Result<JsRangeResult, String> {
    let mut field = field_from_rows(&input.winds);
    let wind = field
        .average_wind_in_range(input.lo_ft, input.hi_ft)
        .map_err(|e| e.to_string())?;
    Ok(JsRangeResult { wind, notices: field.take_notices() })
}

/* ------------------------------- exports -------------------------------- */

/// Full drift report for a `JumpPlan` object.
#[wasm_bindgen]
pub fn drift_report_js(plan: JsValue) -> Result<JsValue, JsValue> {
    let plan: JumpPlan = swb::from_value(plan)?;
    let report = report_for(&plan).map_err(|e| JsValue::from_str(&e))?;
    swb::to_value(&report).map_err(|e| e.into())
}

/// Interpolated wind columns, ready for plotting.
#[wasm_bindgen]
pub fn interpolate_winds_js(input: JsValue) -> Result<JsValue, JsValue> {
    let inp: JsTableInput = swb::from_value(input)?;
    let table = table_for(&inp).map_err(|e| JsValue::from_str(&e))?;
    swb::to_value(&table).map_err(|e| e.into())
}

/// Mean wind between two altitudes.
#[wasm_bindgen]
pub fn average_wind_in_range_js(input: JsValue) -> Result<JsValue, JsValue> {
    let inp: JsRangeInput = swb::from_value(input)?;
    let out = range_for(&inp).map_err(|e| JsValue::from_str(&e))?;
    swb::to_value(&out).map_err(|e| e.into())
}

/* -------------------------------- tests -------------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    fn row(altitude: f64, speed: f64, heading: f64) -> WindRow {
        WindRow { altitude: Some(altitude), speed: Some(speed), heading: Some(heading) }
    }

    #[test]
    fn table_defaults_to_one_entry_per_foot() {
        let input = JsTableInput { winds: vec![row(1_000.0, 10.0, 90.0), row(1_100.0, 20.0, 90.0)], steps: None };
        let t = table_for(&input).unwrap();
        assert_eq!(t.altitudes_ft.len(), 101);
        assert_eq!(t.speeds.len(), 101);
        assert_eq!(t.headings_deg.len(), 101);
    }

    #[test]
    fn errors_become_messages() {
        let input = JsRangeInput { winds: vec![row(5_000.0, 10.0, 0.0)], lo_ft: 4_000.0, hi_ft: 3_000.0 };
        let msg = range_for(&input).unwrap_err();
        assert!(msg.contains("must be below"), "{msg}");

        let empty = JsTableInput { winds: vec![WindRow::default()], steps: None };
        assert_eq!(table_for(&empty).unwrap_err(), "no measured winds recorded");
    }

    #[test]
    fn report_passes_through() {
        let plan = JumpPlan {
            config: Default::default(),
            exit_altitude_ft: 12_000.0,
            deployment_altitude_ft: 4_000.0,
            winds: vec![row(12_000.0, 25.0, 0.0), row(3_000.0, 25.0, 0.0)],
        };
        let report = report_for(&plan).unwrap();
        assert!((report.drift_wind.speed - 25.0).abs() < 1e-9);
    }
}
