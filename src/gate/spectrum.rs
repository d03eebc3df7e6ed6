//! Peak spectral power of a PCM clip.

use crate::error::{Error, Result};
use realfft::RealFftPlanner;
use std::cell::RefCell;

thread_local! {
    static FFT_PLANNER: RefCell<RealFftPlanner<f64>> = RefCell::new(RealFftPlanner::new());
}

/// Largest bin of the clip's power spectrum.
///
/// One real DFT over the whole clip with no windowing; power is the squared
/// magnitude per bin on the raw 16-bit sample scale.
pub fn peak_power(samples: &[i16]) -> Result<f64> {
    if samples.is_empty() {
        return Err(Error::EmptyClip);
    }

    let fft = FFT_PLANNER.with(|p| p.borrow_mut().plan_fft_forward(samples.len()));

    let mut input: Vec<f64> = samples.iter().map(|&s| f64::from(s)).collect();
    let mut spectrum = fft.make_output_vec();
    fft.process(&mut input, &mut spectrum)
        .map_err(|e| Error::Spectrum {
            reason: e.to_string(),
        })?;

    Ok(spectrum.iter().map(|c| c.norm_sqr()).fold(0.0, f64::max))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn sine(freq: f64, amplitude: f64, len: usize, rate: f64) -> Vec<i16> {
        (0..len)
            .map(|i| (amplitude * (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin()) as i16)
            .collect()
    }

    #[test]
    fn test_silence_has_zero_power() {
        assert_eq!(peak_power(&[0; 4800]).unwrap(), 0.0);
    }

    #[test]
    fn test_dc_power_is_sum_squared() {
        // A constant signal puts everything into bin 0: |sum(x)|^2
        let power = peak_power(&[10; 100]).unwrap();
        assert!((power - 1_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_louder_tone_has_more_power() {
        let quiet = peak_power(&sine(3_000.0, 500.0, 4_800, 48_000.0)).unwrap();
        let loud = peak_power(&sine(3_000.0, 5_000.0, 4_800, 48_000.0)).unwrap();
        assert!(loud > quiet * 50.0);
    }

    #[test]
    fn test_odd_length_supported() {
        assert!(peak_power(&[1, -1, 1, -1, 1]).is_ok());
    }

    #[test]
    fn test_empty_is_error() {
        assert!(matches!(peak_power(&[]), Err(Error::EmptyClip)));
    }
}
