//! Verification helpers for converted files: per-channel statistics, the
//! safe playback gain, a 16-bit stereo WAV export for listening, and the
//! waveform points the inspector's chart draws.

use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::Array3;
use std::path::Path;

const BITS_PER_SAMPLE: u16 = 16;
const PEAK_EPSILON: f64 = 1e-12;

/// Summary statistics of one binaural impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct IrStats {
    /// Absolute peak per channel, (left, right).
    pub peak: [f64; 2],
    /// Root-mean-square level per channel, (left, right).
    pub rms: [f64; 2],
    /// Whether any sample in either channel is nonzero.
    pub any_nonzero: bool,
    /// Samples per channel.
    pub samples: usize,
    /// Length in seconds at the file's sampling rate.
    pub duration_secs: f64,
}

/// Computes per-channel statistics over the first measurement.
pub fn analyze(ir: &Array3<f64>, sampling_rate_hz: f64) -> IrStats {
    let samples = ir.dim().2;
    let mut peak = [0.0; 2];
    let mut rms = [0.0; 2];
    for ch in 0..2 {
        let mut sum_sq = 0.0;
        for s in 0..samples {
            let x = ir[[0, ch, s]];
            peak[ch] = f64::max(peak[ch], x.abs());
            sum_sq += x * x;
        }
        rms[ch] = (sum_sq / samples as f64).sqrt();
    }
    IrStats {
        peak,
        rms,
        any_nonzero: peak.iter().any(|&p| p > 0.0),
        samples,
        duration_secs: samples as f64 / sampling_rate_hz,
    }
}

/// The largest gain that cannot clip: unity, unless the response already
/// exceeds full scale and has to be scaled down.
pub fn normalization_gain(ir: &Array3<f64>) -> f64 {
    let peak = ir.iter().fold(0.0, |acc: f64, &x| acc.max(x.abs()));
    (1.0 / (peak + PEAK_EPSILON)).min(1.0)
}

/// Writes the first measurement as an interleaved 16-bit stereo WAV at the
/// given rate, scaled by [normalization_gain] and clamped to full scale.
pub fn export_wav(
    path: impl AsRef<Path>,
    ir: &Array3<f64>,
    sampling_rate_hz: f64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 2,
        sample_rate: sampling_rate_hz as u32,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    };
    let gain = normalization_gain(ir);

    let mut writer = WavWriter::create(path, spec)?;
    for s in 0..ir.dim().2 {
        for ch in 0..2 {
            let x = (ir[[0, ch, s]] * gain).clamp(-1.0, 1.0);
            writer.write_sample((x * f64::from(i16::MAX)) as i16)?;
        }
    }
    writer.finalize()
}

/// Chart points for the first `window_ms` milliseconds of both channels:
/// `(time in ms, amplitude)` per sample, (left, right).
pub fn channel_points(
    ir: &Array3<f64>,
    sampling_rate_hz: f64,
    window_ms: f64,
) -> [Vec<(f64, f64)>; 2] {
    let samples = ir.dim().2;
    let shown = samples.min((sampling_rate_hz * window_ms / 1000.0) as usize);
    let mut channels = [Vec::with_capacity(shown), Vec::with_capacity(shown)];
    for (ch, points) in channels.iter_mut().enumerate() {
        for s in 0..shown {
            let t_ms = s as f64 / sampling_rate_hz * 1000.0;
            points.push((t_ms, ir[[0, ch, s]]));
        }
    }
    channels
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use hound::WavReader;
    use ndarray::Array3;

    fn spike_ir(n: usize) -> Array3<f64> {
        let mut ir = Array3::zeros((1, 2, n));
        ir[[0, 0, 0]] = 1.0;
        ir[[0, 1, 0]] = -0.5;
        ir
    }

    #[test]
    fn analyze_reports_per_channel_levels() {
        let stats = analyze(&spike_ir(100), 1000.0);
        assert_eq!(stats.peak, [1.0, 0.5]);
        assert_approx_eq!(stats.rms[0], (1.0f64 / 100.0).sqrt());
        assert_approx_eq!(stats.rms[1], (0.25f64 / 100.0).sqrt());
        assert!(stats.any_nonzero);
        assert_eq!(stats.samples, 100);
        assert_approx_eq!(stats.duration_secs, 0.1);
    }

    #[test]
    fn silence_is_reported_as_such() {
        let stats = analyze(&Array3::zeros((1, 2, 10)), 1000.0);
        assert!(!stats.any_nonzero);
        assert_eq!(stats.peak, [0.0, 0.0]);
    }

    #[test]
    fn gain_only_ever_attenuates() {
        // Quiet responses stay untouched; loud ones scale down to full
        // scale; silence must not divide by zero.
        assert_eq!(normalization_gain(&spike_ir(10)), 1.0 / (1.0 + PEAK_EPSILON));
        let mut loud = spike_ir(10);
        loud[[0, 0, 0]] = 4.0;
        assert_approx_eq!(normalization_gain(&loud), 0.25, 1e-9);
        let quiet = Array3::from_elem((1, 2, 10), 0.125);
        assert_eq!(normalization_gain(&quiet), 1.0);
        assert_eq!(normalization_gain(&Array3::zeros((1, 2, 10))), 1.0);
    }

    #[test]
    fn wav_export_round_trips_through_hound() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ir.wav");
        export_wav(&path, &spike_ir(16), 48000.0).unwrap();

        let mut reader = WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 48000);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 32);
        // Interleaved (left, right); the spike sits in the first frame.
        assert!((i32::from(samples[0]) - 32767).abs() <= 1);
        assert!((i32::from(samples[1]) + 16384).abs() <= 2);
        assert!(samples[2..].iter().all(|&s| s == 0));
    }

    #[test]
    fn chart_points_cover_the_requested_window() {
        let [left, right] = channel_points(&spike_ir(1000), 1000.0, 50.0);
        assert_eq!(left.len(), 50);
        assert_eq!(right.len(), 50);
        assert_eq!(left[0], (0.0, 1.0));
        assert_eq!(right[0], (0.0, -0.5));
        assert_approx_eq!(left[49].0, 49.0);

        // Shorter responses are not padded.
        let [left, _] = channel_points(&spike_ir(10), 1000.0, 50.0);
        assert_eq!(left.len(), 10);
    }
}
