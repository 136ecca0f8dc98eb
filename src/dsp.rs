//! Signal processing utilities: energy envelopes, peak picking, and the
//! YIN difference/CMNDF machinery behind pitch estimation

use rustfft::{num_complex::Complex32, FftPlanner};

/// Windowed RMS energy envelope. One value per hop; the last partial
/// window is dropped.
pub fn rms_envelope(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    if samples.len() < window || window == 0 || hop == 0 {
        return Vec::new();
    }

    let n_frames = (samples.len() - window) / hop + 1;
    let mut env = Vec::with_capacity(n_frames);

    for frame_idx in 0..n_frames {
        let start = frame_idx * hop;
        let frame = &samples[start..start + window];
        let energy = frame.iter().map(|&x| x * x).sum::<f32>() / window as f32;
        env.push(energy.sqrt());
    }

    env
}

/// Indices of local maxima above `threshold`, at least `min_spacing`
/// frames apart. Earlier peaks win spacing conflicts.
pub fn pick_peaks(envelope: &[f32], threshold: f32, min_spacing: usize) -> Vec<usize> {
    let mut peaks = Vec::new();
    if envelope.len() < 3 {
        return peaks;
    }

    let mut last_kept: Option<usize> = None;
    for i in 1..envelope.len() - 1 {
        if envelope[i] < threshold {
            continue;
        }
        if envelope[i] < envelope[i - 1] || envelope[i] < envelope[i + 1] {
            continue;
        }
        if let Some(prev) = last_kept {
            if i - prev < min_spacing {
                continue;
            }
        }
        peaks.push(i);
        last_kept = Some(i);
    }

    peaks
}

/// YIN difference function d(tau) = sum_{j<H} (x[j] - x[j+tau])^2 with
/// H = window/2, for tau in [0, max_lag]. The cross-correlation term is
/// computed with an FFT; the energy terms come from prefix sums, so the
/// whole thing is O(n log n) instead of O(n^2).
pub fn difference_function(window: &[f32], max_lag: usize) -> Vec<f32> {
    let w = window.len();
    let h = w / 2;
    if h == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(h);

    // Prefix sums of squared samples, in f64 to dodge cancellation
    let mut prefix_sq = vec![0.0f64; w + 1];
    for i in 0..w {
        prefix_sq[i + 1] = prefix_sq[i] + (window[i] as f64) * (window[i] as f64);
    }
    let e_head = prefix_sq[h];

    // cc[tau] = sum_{j<H} x[j] * x[j+tau] via FFT cross-correlation.
    // Padding to n >= w + h keeps the circular wrap out of [0, max_lag].
    let n = (w + h).next_power_of_two();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let mut head: Vec<Complex32> = vec![Complex32::new(0.0, 0.0); n];
    for (i, &x) in window[..h].iter().enumerate() {
        head[i] = Complex32::new(x, 0.0);
    }
    let mut full: Vec<Complex32> = vec![Complex32::new(0.0, 0.0); n];
    for (i, &x) in window.iter().enumerate() {
        full[i] = Complex32::new(x, 0.0);
    }

    fft.process(&mut head);
    fft.process(&mut full);

    let mut prod: Vec<Complex32> = head
        .iter()
        .zip(&full)
        .map(|(a, b)| a.conj() * b)
        .collect();
    ifft.process(&mut prod);

    // rustfft leaves the inverse transform unnormalized
    let scale = 1.0 / n as f64;

    let mut d = Vec::with_capacity(max_lag + 1);
    for tau in 0..=max_lag {
        let e_lag = prefix_sq[tau + h] - prefix_sq[tau];
        let cc = prod[tau].re as f64 * scale;
        d.push((e_head + e_lag - 2.0 * cc).max(0.0) as f32);
    }

    d
}

/// Cumulative mean normalized difference: d'(tau) = d(tau) * tau /
/// sum_{j<=tau} d(j), with d'(0) = 1.
pub fn cmndf(d: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(d.len());
    let mut running_sum = 0.0f64;

    for (tau, &val) in d.iter().enumerate() {
        if tau == 0 {
            out.push(1.0);
            continue;
        }
        running_sum += val as f64;
        if running_sum <= 0.0 {
            // Flat (silent) window
            out.push(1.0);
        } else {
            out.push((val as f64 * tau as f64 / running_sum) as f32);
        }
    }

    out
}

/// First lag in [min_lag, max_lag] whose CMNDF value dips under
/// `threshold` at a local minimum. Falls back to the global minimum when
/// no dip qualifies, provided it sits under `fallback_max`.
pub fn find_dip(
    values: &[f32],
    min_lag: usize,
    max_lag: usize,
    threshold: f32,
    fallback_max: f32,
) -> Option<usize> {
    if values.len() < 3 || min_lag >= max_lag {
        return None;
    }
    let hi = max_lag.min(values.len() - 2);

    for tau in min_lag..=hi {
        if values[tau] < threshold && values[tau] <= values[tau + 1] {
            return Some(tau);
        }
    }

    let mut best = min_lag;
    for tau in min_lag..=hi {
        if values[tau] < values[best] {
            best = tau;
        }
    }
    if values[best] < fallback_max {
        Some(best)
    } else {
        None
    }
}

/// Parabolic refinement of a discrete minimum. Returns a fractional index.
pub fn parabolic_interpolation(values: &[f32], idx: usize) -> f32 {
    if idx == 0 || idx + 1 >= values.len() {
        return idx as f32;
    }

    let left = values[idx - 1];
    let center = values[idx];
    let right = values[idx + 1];

    let denom = left - 2.0 * center + right;
    if denom.abs() < 1e-12 {
        return idx as f32;
    }

    let shift = 0.5 * (left - right) / denom;
    // A well-formed minimum keeps the vertex inside (-1, 1)
    if shift.abs() >= 1.0 {
        return idx as f32;
    }

    idx as f32 + shift
}

/// Single-window YIN pitch estimate. Returns (frequency_hz, confidence)
/// or None for unvoiced windows.
pub fn yin_pitch(
    window: &[f32],
    rate: u32,
    fmin_hz: f32,
    fmax_hz: f32,
    threshold: f32,
    fallback_max: f32,
) -> Option<(f32, f32)> {
    let h = window.len() / 2;
    let min_lag = ((rate as f32 / fmax_hz).floor() as usize).max(2);
    let max_lag = ((rate as f32 / fmin_hz).ceil() as usize).min(h.saturating_sub(1));
    if min_lag >= max_lag {
        return None;
    }

    // One extra lag so the local-minimum check at max_lag has a neighbor
    let d = difference_function(window, max_lag + 1);
    let norm = cmndf(&d);

    let tau = find_dip(&norm, min_lag, max_lag, threshold, fallback_max)?;
    let refined = parabolic_interpolation(&norm, tau);
    if refined <= 0.0 {
        return None;
    }

    let freq = rate as f32 / refined;
    if freq < fmin_hz || freq > fmax_hz {
        return None;
    }

    let confidence = (1.0 - norm[tau]).clamp(0.0, 1.0);
    Some((freq, confidence))
}
