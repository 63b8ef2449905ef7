//! `freefall [--json] [--config CONFIG.json] [PLAN.json]`
//!
//! Without a plan file the built-in example jump is used. `--config`
//! replaces the plan's physical constants with those from a `JumpConfig` file.

use anyhow::{bail, Context, Result};
use freefall_drift::{DriftReport, JumpConfig, JumpPlan, WindRow};

fn example_plan() -> JumpPlan {
    let row = |altitude: f64, speed: f64, heading: f64| WindRow {
        altitude: Some(altitude),
        speed: Some(speed),
        heading: Some(heading),
    };
    JumpPlan {
        config: JumpConfig::default(),
        exit_altitude_ft: 12_000.0,
        deployment_altitude_ft: 3_500.0,
        winds: vec![
            row(12_000.0, 25.0, 0.0),
            row(9_000.0, 25.0, 90.0),
            row(6_000.0, 25.0, 180.0),
            row(3_000.0, 25.0, 270.0),
        ],
    }
}

fn print_report(r: &DriftReport) {
    println!("--- Freefall Drift ---");
    println!("Jump:                         {} ft -> {} ft", r.exit_altitude_ft, r.deployment_altitude_ft);
    println!("Average wind heading (deg):   {:.2}", r.average_heading_deg);
    println!("Drift wind speed (mph):       {:.2}", r.drift_wind.speed);
    println!("Drift wind heading (deg):     {:.2}", r.drift_wind.heading);
    println!("Freefall time (s):            {:.2}", r.freefall_time_s);
    println!("Horizontal travel (ft):       {:.2}", r.horizontal_displacement_ft);
    println!("  north / east (ft):          {:.2} / {:.2}", r.displacement_north_ft, r.displacement_east_ft);
    for n in &r.notices {
        println!("note: {n}");
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut json = false;
    let mut path = None;
    let mut config_path = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--json" => json = true,
            "--config" => match args.next() {
                Some(p) => config_path = Some(p),
                None => bail!("--config needs a file"),
            },
            "-h" | "--help" => {
                println!("usage: freefall [--json] [--config CONFIG.json] [PLAN.json]");
                return Ok(());
            }
            flag if flag.starts_with('-') => bail!("unknown flag {flag}"),
            _ if path.is_some() => bail!("only one plan file may be given"),
            _ => path = Some(arg),
        }
    }

    let mut plan = match &path {
        Some(p) => JumpPlan::load(p).with_context(|| format!("loading jump plan {p}"))?,
        None => {
            log::info!("no plan file given, using the example jump");
            example_plan()
        }
    };
    if let Some(p) = &config_path {
        plan.config = JumpConfig::load(p).with_context(|| format!("loading jump config {p}"))?;
    }

    let mut calc = plan.calculator().context("setting up the jump")?;
    let report = calc.drift_report().context("computing drift")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Terminal velocity (mph):      {:.1}", calc.config().terminal_velocity_mph);
        print_report(&report);
    }
    Ok(())
}
