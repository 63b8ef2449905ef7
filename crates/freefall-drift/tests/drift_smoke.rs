// End-to-end: jump plans through the calculator into a drift report.

use approx::assert_abs_diff_eq;
use freefall_drift::{DriftError, FreefallCalculator, JumpConfig, JumpPlan};
use freefall_winds::Notice;

fn boxed_winds(calc: &mut FreefallCalculator) {
    calc.add_wind(12_000.0, 25.0, 0.0);
    calc.add_wind(9_000.0, 25.0, 90.0);
    calc.add_wind(6_000.0, 25.0, 180.0);
    calc.add_wind(3_000.0, 25.0, 270.0);
}

#[test]
fn boxed_winds_report() {
    let mut calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 3_500.0).unwrap();
    boxed_winds(&mut calc);

    let report = calc.drift_report().unwrap();
    eprintln!("REPORT: {report:?}");

    assert_abs_diff_eq!(report.freefall_time_s, 12.0 + 7_500.0 / 176.0, epsilon = 1e-9);
    assert!(report.drift_wind.speed.is_finite() && report.drift_wind.speed >= 0.0);
    assert!((0.0..360.0).contains(&report.drift_wind.heading));
    assert!(report.horizontal_displacement_ft.is_finite());
    assert!(report.notices.is_empty());

    // the two displacement components add back up to the total
    let norm = report.displacement_north_ft.hypot(report.displacement_east_ft);
    assert_abs_diff_eq!(norm, report.horizontal_displacement_ft, epsilon = 1e-6);
}

#[test]
fn consistent_winds_drift_downwind() {
    // dominant north-westerly flow, headings within 20 degrees of each other
    let plan = JumpPlan::from_json_str(
        r#"{
            "exit_altitude_ft": 12000,
            "deployment_altitude_ft": 5000,
            "winds": [
                { "altitude": 12000, "speed": 63, "heading": 310 },
                { "altitude": 9000,  "speed": 53, "heading": 305 },
                { "altitude": 6000,  "speed": 43, "heading": 290 },
                { "altitude": 3000,  "speed": 32, "heading": 300 }
            ]
        }"#,
    )
    .unwrap();

    let mut calc = plan.calculator().unwrap();
    let report = calc.drift_report().unwrap();

    assert!((290.0..=310.0).contains(&report.average_heading_deg), "{report:?}");
    assert!((290.0..=310.0).contains(&report.drift_wind.heading), "{report:?}");
    assert!(report.drift_wind.speed > 43.0 && report.drift_wind.speed < 63.0, "{report:?}");
    // NW heading: north component positive, east component negative
    assert!(report.displacement_north_ft > 0.0);
    assert!(report.displacement_east_ft < 0.0);
}

#[test]
fn duplicate_winds_show_up_in_report() {
    let mut calc = FreefallCalculator::new(JumpConfig::default(), 12_000.0, 4_000.0).unwrap();
    boxed_winds(&mut calc);
    let notice = calc.add_wind(9_000.0, 40.0, 45.0);
    assert!(notice.is_some());

    let report = calc.drift_report().unwrap();
    assert_eq!(report.notices.len(), 1);
    assert!(matches!(report.notices[0], Notice::DuplicateAltitude { altitude, .. } if altitude == 9_000.0));

    // drained by the first report
    assert!(calc.drift_report().unwrap().notices.is_empty());
}

#[test]
fn plan_loads_from_disk() {
    let path = std::env::temp_dir().join("freefall_drift_plan_loads_from_disk.json");
    std::fs::write(
        &path,
        r#"{
            "config": { "terminal_velocity_mph": 110 },
            "exit_altitude_ft": 10000,
            "deployment_altitude_ft": 3000,
            "winds": [
                { "altitude": 10000, "speed": 20, "heading": 180 },
                { "altitude": 2000,  "speed": 10, "heading": 180 }
            ]
        }"#,
    )
    .unwrap();

    let plan = JumpPlan::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_abs_diff_eq!(plan.config.terminal_velocity_mph, 110.0);
    assert_abs_diff_eq!(plan.config.acceleration_phase_s, 12.0);

    let mut calc = plan.calculator().unwrap();
    let d = calc.horizontal_displacement_ft().unwrap();
    assert!(d > 0.0);
}

#[test]
fn missing_plan_file_is_an_io_error() {
    let err = JumpPlan::load("/definitely/not/here/plan.json").unwrap_err();
    assert!(matches!(err, DriftError::Io { .. }));
    assert!(err.to_string().contains("plan.json"));
}

#[test]
fn config_loads_from_disk() {
    let path = std::env::temp_dir().join("freefall_drift_config_loads_from_disk.json");
    std::fs::write(&path, r#"{ "terminal_velocity_mph": 110, "min_deployment_altitude_ft": 2500 }"#).unwrap();

    let config = JumpConfig::load(&path).unwrap();
    let _ = std::fs::remove_file(&path);

    assert_abs_diff_eq!(config.terminal_velocity_mph, 110.0);
    assert_abs_diff_eq!(config.min_deployment_altitude_ft, 2_500.0);
    assert_abs_diff_eq!(config.acceleration_phase_ft, 1_000.0);

    // the loaded limits apply to the calculator
    let err = FreefallCalculator::new(config, 12_000.0, 2_000.0).unwrap_err();
    assert!(matches!(err, DriftError::DeploymentTooLow { .. }));
}

#[test]
fn invalid_config_file_is_rejected() {
    let path = std::env::temp_dir().join("freefall_drift_invalid_config_file_is_rejected.json");
    std::fs::write(&path, r#"{ "acceleration_phase_s": -1 }"#).unwrap();

    let err = JumpConfig::load(&path).unwrap_err();
    let _ = std::fs::remove_file(&path);
    assert!(matches!(err, DriftError::InvalidConfig { field: "acceleration_phase_s", .. }));

    assert!(matches!(JumpConfig::load("/definitely/not/here/config.json"), Err(DriftError::Io { .. })));
}
