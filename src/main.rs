use std::process::ExitCode;

use tracing::{error, info, warn};

use vprofile_engine::config::{AppConfig, DEFAULT_CONFIG_PATH};
use vprofile_engine::historical::errors::DataError;
use vprofile_engine::historical::utils::load_bars_from_csv;
use vprofile_engine::logging::{init_dual_logging, init_simple_logging};
use vprofile_engine::report::generate_report;

fn main() -> ExitCode {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

    // Logging is not up yet, report config problems on stderr
    let config = match AppConfig::from_toml(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    let _logging_guard = match init_dual_logging(&config.logging) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Failed to initialize file logging: {}", e);
            if let Err(e) = init_simple_logging() {
                eprintln!("Failed to initialize console logging: {}", e);
            }
            warn!("Using console-only logging");
            None
        }
    };

    info!(
        config = %config_path,
        symbol = %config.input.symbol,
        mode = ?config.input.mode,
        csv = %config.input.csv_path.display(),
        "Starting volume profile engine"
    );

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Volume profile run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: &AppConfig) -> Result<(), DataError> {
    let bars = load_bars_from_csv(&config.input.csv_path)?;
    if bars.is_empty() {
        warn!("{} contains no bars", config.input.csv_path.display());
    }

    let report = generate_report(config, &bars)?;
    if !report.all_valid {
        warn!("One or more profiles failed validation, see log for details");
    }

    let json = serde_json::to_string_pretty(&report)?;
    match &config.input.output_path {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Wrote {} profiles to {}", report.profiles.len(), path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
