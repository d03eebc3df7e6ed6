//! Audio resampling using rubato.

use crate::error::{Error, Result};
use audioadapter_buffers::direct::SequentialSlice;
use rubato::{Fft, FixedSync, Resampler};

const CHUNK_FRAMES: usize = 1024;

/// Resample mono audio to `to_rate`.
///
/// Returns the input unchanged if already at the target rate. The output is
/// trimmed to exactly `ceil(len * to_rate / from_rate)` samples so clip
/// duration is preserved.
pub fn resample(samples: Vec<f32>, from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples);
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(Error::Resample {
            reason: format!("invalid sample rate conversion {from_rate} -> {to_rate}"),
        });
    }

    let resample_err = |e: &dyn std::fmt::Display| Error::Resample {
        reason: e.to_string(),
    };

    let mut resampler = Fft::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_FRAMES,
        1,
        1,
        FixedSync::Both,
    )
    .map_err(|e| resample_err(&e))?;

    let frames_in = resampler.input_frames_next();
    let expected = expected_len(samples.len(), from_rate, to_rate);
    let mut output = Vec::with_capacity(expected + CHUNK_FRAMES);

    // The last partial chunk is zero padded; trimming below drops the tail
    for chunk in samples.chunks(frames_in) {
        let padded;
        let frame = if chunk.len() == frames_in {
            chunk
        } else {
            padded = {
                let mut p = chunk.to_vec();
                p.resize(frames_in, 0.0);
                p
            };
            padded.as_slice()
        };

        let input = SequentialSlice::new(frame, 1, frames_in).map_err(|e| Error::Resample {
            reason: format!("failed to create input adapter: {e}"),
        })?;
        let resampled = resampler
            .process(&input, 0, None)
            .map_err(|e| resample_err(&e))?;
        output.extend_from_slice(&resampled.take_data());
    }

    output.truncate(expected);
    Ok(output)
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn expected_len(input_len: usize, from_rate: u32, to_rate: u32) -> usize {
    ((input_len as f64) * f64::from(to_rate) / f64::from(from_rate)).ceil() as usize
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resample_same_rate_returns_input() {
        let samples = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        assert_eq!(resample(samples.clone(), 48_000, 48_000).unwrap(), samples);
    }

    #[test]
    fn test_resample_empty_input() {
        assert!(resample(Vec::new(), 22_050, 48_000).unwrap().is_empty());
    }

    #[test]
    fn test_resample_upsample_preserves_duration() {
        #[allow(clippy::cast_precision_loss)]
        let samples: Vec<f32> = (0..32_000).map(|i| (i as f32 * 0.001).sin()).collect();
        let output = resample(samples, 32_000, 48_000).unwrap();
        assert!(output.len() <= 48_000);
        assert!(output.len() > 45_000);
    }

    #[test]
    fn test_expected_len_rounds_up() {
        assert_eq!(expected_len(441, 44_100, 48_000), 480);
        assert_eq!(expected_len(1, 44_100, 48_000), 2);
    }
}
