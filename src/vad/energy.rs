//! Energy-based voice activity detection.
//!
//! Uses mean absolute amplitude as a simple energy metric.

/// Lowest threshold a calibration may produce (quiet rooms still need one).
pub const MIN_THRESHOLD: f32 = 0.01;

/// Ambient energy is multiplied by this to get the speech threshold.
pub const DYNAMIC_ENERGY_RATIO: f32 = 1.5;

/// Compute the energy level of an audio chunk.
///
/// Returns the mean absolute value of the samples.
pub fn detect(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    let sum: f32 = chunk.iter().map(|s| s.abs()).sum();
    sum / chunk.len() as f32
}

/// Derive a speech threshold from chunks of ambient (non-speech) audio.
pub fn calibrate<'a>(ambient: impl IntoIterator<Item = &'a [f32]>) -> f32 {
    let mut total = 0.0f32;
    let mut count = 0usize;
    for chunk in ambient {
        total += detect(chunk);
        count += 1;
    }
    if count == 0 {
        return MIN_THRESHOLD;
    }
    (total / count as f32 * DYNAMIC_ENERGY_RATIO).max(MIN_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_has_zero_energy() {
        assert_eq!(detect(&[0.0; 64]), 0.0);
        assert_eq!(detect(&[]), 0.0);
    }

    #[test]
    fn energy_is_mean_absolute_amplitude() {
        assert!((detect(&[0.5, -0.5, 0.25, -0.25]) - 0.375).abs() < 1e-6);
    }

    #[test]
    fn calibration_scales_ambient_energy() {
        let noise = vec![0.1f32; 32];
        let threshold = calibrate([noise.as_slice(), noise.as_slice()]);
        assert!((threshold - 0.15).abs() < 1e-6);
    }

    #[test]
    fn calibration_never_drops_below_floor() {
        let quiet = vec![0.0001f32; 32];
        assert_eq!(calibrate([quiet.as_slice()]), MIN_THRESHOLD);
        assert_eq!(calibrate(std::iter::empty::<&[f32]>()), MIN_THRESHOLD);
    }
}
