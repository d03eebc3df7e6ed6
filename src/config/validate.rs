//! Configuration validation.

use crate::config::Config;
use crate::constants::detection;
use crate::error::{Error, Result};

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_gate(config)?;
    validate_detection(config)?;
    validate_supervisor(config)?;
    Ok(())
}

fn validate_gate(config: &Config) -> Result<()> {
    let gate = &config.gate;

    // Both endpoints excluded: alpha = 1 freezes calibration, alpha = 0 forgets history
    if !(gate.alpha > 0.0 && gate.alpha < 1.0) {
        return Err(Error::ConfigValidation {
            message: format!("gate.alpha must be strictly between 0 and 1, got {}", gate.alpha),
        });
    }

    if !gate.initial_threshold.is_finite() || gate.initial_threshold <= 0.0 {
        return Err(Error::ConfigValidation {
            message: format!(
                "gate.initial_threshold must be a positive number, got {}",
                gate.initial_threshold
            ),
        });
    }

    Ok(())
}

fn validate_detection(config: &Config) -> Result<()> {
    let detection_config = &config.detection;

    if detection_config.inference_timeout_secs == 0 {
        return Err(Error::ConfigValidation {
            message: "detection.inference_timeout_secs must be at least 1".to_string(),
        });
    }

    if detection_config.utc_offset_minutes.abs() >= detection::MAX_UTC_OFFSET_MINUTES {
        return Err(Error::ConfigValidation {
            message: format!(
                "detection.utc_offset_minutes must be within +/-{}, got {}",
                detection::MAX_UTC_OFFSET_MINUTES - 1,
                detection_config.utc_offset_minutes
            ),
        });
    }

    Ok(())
}

fn validate_supervisor(config: &Config) -> Result<()> {
    let supervisor = &config.supervisor;

    if supervisor.program.trim().is_empty() {
        return Err(Error::ConfigValidation {
            message: "supervisor.program must not be empty".to_string(),
        });
    }

    if supervisor.restart_backoff_max_ms < supervisor.restart_backoff_ms {
        return Err(Error::ConfigValidation {
            message: format!(
                "supervisor.restart_backoff_max_ms ({}) is below restart_backoff_ms ({})",
                supervisor.restart_backoff_max_ms, supervisor.restart_backoff_ms
            ),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_alpha_bounds_are_exclusive() {
        for alpha in [0.0, 1.0, -0.5, 1.5, f64::NAN] {
            let mut config = Config::default();
            config.gate.alpha = alpha;
            assert!(validate_config(&config).is_err(), "alpha {alpha} accepted");
        }

        let mut config = Config::default();
        config.gate.alpha = 0.5;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let mut config = Config::default();
        config.gate.initial_threshold = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = Config::default();
        config.detection.inference_timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_offset_beyond_a_day_rejected() {
        let mut config = Config::default();
        config.detection.utc_offset_minutes = 24 * 60;
        assert!(validate_config(&config).is_err());

        config.detection.utc_offset_minutes = -(5 * 60);
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut config = Config::default();
        config.supervisor.program = "  ".to_string();
        assert!(validate_config(&config).is_err());
    }
}
