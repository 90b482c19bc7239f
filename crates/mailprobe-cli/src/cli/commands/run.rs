use std::time::Duration;

use mailprobe_core::report::{render_json, render_text};
use mailprobe_core::{ProbeConfig, Prober, Scenario, ScenarioRunner, ServiceConfig};

use crate::cli::args::{OutputFormat, RunArgs};
use crate::exit_codes::{CHECK_FAILED, CONFIG_ERROR, SUCCESS};

pub async fn run(args: RunArgs) -> anyhow::Result<i32> {
    let scenario = match &args.scenario {
        Some(path) => match Scenario::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: {e}");
                return Ok(CONFIG_ERROR);
            }
        },
        None => {
            let config =
                ServiceConfig::default().with_mount_prefix(args.mount.mount_prefix.as_str());
            match config.validate() {
                Ok(prefix) => Scenario::email_smoke(&prefix),
                Err(e) => {
                    eprintln!("error: {e}");
                    return Ok(CONFIG_ERROR);
                }
            }
        }
    };

    let prober = Prober::new(
        ProbeConfig::default().with_timeout(Duration::from_secs(args.timeout_secs.max(1))),
    )?;
    let runner = match ScenarioRunner::new(prober, args.base_url.as_str()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(CONFIG_ERROR);
        }
    };

    let report = runner.run(&scenario).await;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(&report))?),
    }

    if args.strict && report.has_failures() {
        return Ok(CHECK_FAILED);
    }
    Ok(SUCCESS)
}
