//! CLI argument definitions.

use crate::cli::validators::{parse_latitude, parse_longitude, parse_timestamp};
use crate::constants::CONFIG_ENV;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Field recording triage, bird detection and hotspot lookup.
#[derive(Debug, Parser)]
#[command(name = "robin")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Options shared by every subcommand.
    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every subcommand.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (default: platform config directory).
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace+ORT info, -vvv: trace+ORT debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Gate and classify one clip, recording observations.
    Ingest {
        /// Audio clip (wav, flac, mp3, aac/m4a).
        file: PathBuf,

        /// Recording location.
        #[command(flatten)]
        location: LocationArgs,

        /// Capture time (RFC 3339, default: now).
        #[arg(long, value_parser = parse_timestamp)]
        at: Option<DateTime<Utc>>,
    },
    /// Calibrate a fresh noise gate over clips and report each decision.
    Gate {
        /// Audio clips, evaluated in order.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Find the best hotspot for a species in a month.
    Hotspot {
        /// Species key as stored in the hotspot file.
        species: String,

        /// Month (1-12).
        #[arg(value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,

        /// Your location, to rank by distance.
        #[command(flatten)]
        location: LocationArgs,
    },
    /// Run the background detector until Ctrl+C.
    Detect,
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Optional latitude/longitude pair.
#[derive(Debug, Clone, Copy, Args)]
pub struct LocationArgs {
    /// Latitude (-90.0 to 90.0).
    #[arg(long, value_parser = parse_latitude, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude (-180.0 to 180.0).
    #[arg(long, value_parser = parse_longitude, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_ingest() {
        let cli = Cli::try_parse_from(["robin", "ingest", "clip.wav"]).unwrap();
        match cli.command {
            Command::Ingest { file, location, at } => {
                assert_eq!(file, PathBuf::from("clip.wav"));
                assert!(location.lat.is_none());
                assert!(at.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_ingest_with_location_and_time() {
        let cli = Cli::try_parse_from([
            "robin",
            "ingest",
            "clip.wav",
            "--lat=40.7",
            "--lon=-74.0",
            "--at",
            "2024-05-01T06:30:00Z",
        ])
        .unwrap();
        let Command::Ingest { location, at, .. } = cli.command else {
            panic!("expected ingest");
        };
        assert_eq!(location.lat, Some(40.7));
        assert_eq!(location.lon, Some(-74.0));
        assert_eq!(at.unwrap().to_rfc3339(), "2024-05-01T06:30:00+00:00");
    }

    #[test]
    fn test_cli_lat_requires_lon() {
        let cli = Cli::try_parse_from(["robin", "ingest", "clip.wav", "--lat=40.7"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_rejects_out_of_range_latitude() {
        let cli = Cli::try_parse_from(["robin", "hotspot", "Blue Jay", "4", "--lat=91", "--lon=0"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_parse_hotspot() {
        let cli = Cli::try_parse_from(["robin", "hotspot", "American Robin", "4"]).unwrap();
        let Command::Hotspot { species, month, .. } = cli.command else {
            panic!("expected hotspot");
        };
        assert_eq!(species, "American Robin");
        assert_eq!(month, 4);
    }

    #[test]
    fn test_cli_gate_requires_files() {
        assert!(Cli::try_parse_from(["robin", "gate"]).is_err());
        assert!(Cli::try_parse_from(["robin", "gate", "a.wav", "b.wav"]).is_ok());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["robin", "detect", "-vv", "--config", "robin.toml"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
        assert_eq!(cli.global.config, Some(PathBuf::from("robin.toml")));
    }

    #[test]
    fn test_cli_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["robin", "config", "show"]);
        assert!(cli.is_ok());
    }
}
