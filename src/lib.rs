//! Robin - field audio triage, bird detection and hotspot lookup.
//!
//! This crate gates field recordings against an adaptive noise floor, runs
//! `BirdNET` inference on the clips worth classifying, supervises a background
//! detector process and ranks species hotspots.

#![warn(missing_docs)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod gate;
pub mod hotspot;
pub mod inference;
pub mod service;
pub mod supervisor;

use audio::{AudioClip, AudioFormat, cleanup_all_artifacts};
use clap::Parser;
use cli::{Cli, Command, ConfigAction, LocationArgs};
use config::{Config, config_file_path, load_config, save_config, validate_config};
use detection::JsonlObservationStore;
use gate::NoiseFloorGate;
use hotspot::{GeoPoint, JsonHotspotStore};
use inference::BirdNetClassifier;
use service::{Collaborators, RobinService, best_hotspot};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use supervisor::DetectionSupervisor;
use tracing::{error, info, warn};

pub use error::{Error, ErrorKind, Result};

/// Main entry point for robin CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.global.verbose, cli.global.quiet);

    // Install Ctrl+C handler to clean up staged clips on interrupt. `detect`
    // installs its own handling through tokio instead.
    if !matches!(cli.command, Command::Detect)
        && let Err(e) = ctrlc::set_handler(|| {
            cleanup_all_artifacts();
            std::process::exit(130); // 128 + SIGINT(2)
        })
    {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    let config_path = cli.global.config.as_deref();

    if let Command::Config { action } = cli.command {
        return handle_config_command(action, config_path);
    }

    let config = load_config(config_path)?;
    validate_config(&config)?;

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("failed to create async runtime: {e}"),
    })?;

    match cli.command {
        Command::Ingest { file, location, at } => runtime.block_on(ingest(
            &config,
            &file,
            location,
            at.unwrap_or_else(chrono::Utc::now),
        )),
        Command::Gate { files } => gate_files(&config, &files),
        Command::Hotspot {
            species,
            month,
            location,
        } => hotspot(&config, &species, month, location),
        Command::Detect => runtime.block_on(detect(&config)),
        Command::Config { .. } => Ok(()),
    }
}

/// Gate, classify and record one clip, printing the response as JSON.
async fn ingest(
    config: &Config,
    file: &Path,
    location: LocationArgs,
    captured_at: chrono::DateTime<chrono::Utc>,
) -> Result<()> {
    let clip = read_clip(file)?;

    // Initialize ONNX Runtime (auto-detects bundled libraries)
    birdnet_onnx::init_runtime().map_err(|e| Error::RuntimeInitialization {
        reason: e.to_string(),
    })?;

    let classifier = BirdNetClassifier::from_config(&config.model)?;
    let observations = JsonlObservationStore::open(&config.storage.observations)?;
    info!("Recording observations to {}", observations.path().display());

    let service = RobinService::new(
        config,
        Collaborators {
            classifier: Arc::new(classifier),
            observations: Arc::new(observations),
            hotspots: Arc::new(JsonHotspotStore::default()),
        },
    )?;

    let outcome = service
        .ingest(clip, location.lat, location.lon, captured_at)
        .await?;

    print_json(&outcome.response)?;

    let report = outcome.persistence.wait().await;
    for failure in report.failures() {
        error!(
            "Observation for '{}' was not stored: {}",
            failure.species,
            failure
                .result
                .as_ref()
                .err()
                .map_or_else(String::new, ToString::to_string)
        );
    }
    if !report.all_succeeded() {
        warn!("Some observations were not stored");
    }

    Ok(())
}

/// Run a fresh gate over `files` in order and print each decision.
fn gate_files(config: &Config, files: &[PathBuf]) -> Result<()> {
    let gate = NoiseFloorGate::from_config(&config.gate)?
        .with_temp_dir(config.storage.temp_dir.clone());

    println!("{:<40} {:>6} {:>14} {:>14}", "FILE", "PASS", "POWER", "THRESHOLD");
    for file in files {
        match read_clip(file).and_then(|clip| gate.evaluate(&clip)) {
            Ok(result) => println!(
                "{:<40} {:>6} {:>14.4e} {:>14.4e}",
                file.display(),
                if result.passed { "yes" } else { "no" },
                result.observed_power,
                result.threshold
            ),
            Err(e) => error!("Failed to gate {}: {}", file.display(), e),
        }
    }

    let state = gate.state();
    info!(
        "Final threshold {:.4e} (alpha {})",
        state.threshold(),
        state.alpha()
    );
    Ok(())
}

/// Print the best hotspot for a species/month as JSON.
fn hotspot(config: &Config, species: &str, month: u32, location: LocationArgs) -> Result<()> {
    let user = GeoPoint::from_optional(location.lat, location.lon)?;
    let store = JsonHotspotStore::load(&config.storage.hotspots)?;
    let best = best_hotspot(&store, species, month, user)?;
    print_json(&best)
}

/// Start the detector, wait for Ctrl+C, stop it.
async fn detect(config: &Config) -> Result<()> {
    let supervisor = DetectionSupervisor::new(config.supervisor.clone());
    let status = supervisor.start().await?;
    info!(
        "Detector running (pid {}), press Ctrl+C to stop",
        status.pid.unwrap_or_default()
    );

    tokio::signal::ctrl_c().await?;
    info!("Stopping detector");

    let status = supervisor.status().await;
    match supervisor.stop().await {
        Err(Error::NotRunning) => {
            warn!(
                "Detector had already exited after {} restart(s)",
                status.restarts
            );
            Ok(())
        }
        other => other,
    }
}

fn read_clip(path: &Path) -> Result<AudioClip> {
    let format = AudioFormat::from_path(path)?;
    let bytes = std::fs::read(path)?;
    AudioClip::new(bytes, format)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| Error::Internal {
        message: format!("failed to serialize output: {e}"),
    })?;
    println!("{json}");
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Build filter string based on verbosity level.
    // ORT logging is suppressed by default because CUDA fallback is expected in auto mode.
    // Use -v to see ORT warnings, -vv for info, -vvv for full trace.
    let filter_str = if quiet {
        "warn,ort=off".to_string()
    } else {
        match verbose {
            0 => "info,ort=off".to_string(),
            1 => "debug,ort=warn".to_string(),
            2 => "trace,ort=info".to_string(),
            _ => "trace".to_string(), // -vvv: no ORT filter, full trace
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_config_command(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };

    match action {
        ConfigAction::Init => {
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                save_config(&Config::default(), &path)?;
                println!("Created configuration file: {}", path.display());
                println!("\nNext steps:");
                println!("  set [model] path and labels to your BirdNET model files");
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_config(Some(&path))?;
            println!("{config:#?}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", path.display());
            Ok(())
        }
    }
}
