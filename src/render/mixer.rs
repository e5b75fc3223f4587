// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Stereo buffers and mixing.
//!
//! The mixer sums rendered stems with per-stem gain and constant-power
//! panning, accumulating in f64 and normalizing uniformly if the summed
//! peak exceeds full scale. Normalization is a safety limiter, not a
//! compressor: it only engages on overflow and never clips individual
//! samples.

use std::f64::consts::FRAC_PI_2;

use tracing::warn;

/// Planar stereo audio.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StereoBuffer {
    /// Left channel samples
    pub left: Vec<f32>,
    /// Right channel samples
    pub right: Vec<f32>,
}

impl StereoBuffer {
    /// A silent buffer of the given length.
    pub fn silence(num_samples: usize) -> Self {
        Self {
            left: vec![0.0; num_samples],
            right: vec![0.0; num_samples],
        }
    }

    /// Duplicate a mono signal into both channels.
    pub fn from_mono(mono: Vec<f32>) -> Self {
        Self {
            left: mono.clone(),
            right: mono,
        }
    }

    /// Build from interleaved stereo samples (L R L R ...).
    pub fn from_interleaved(samples: &[f32]) -> Self {
        let frames = samples.len() / 2;
        let mut left = Vec::with_capacity(frames);
        let mut right = Vec::with_capacity(frames);
        for frame in samples.chunks_exact(2) {
            left.push(frame[0]);
            right.push(frame[1]);
        }
        Self { left, right }
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// True if there are no samples.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Pad with silence or truncate so the buffer is exactly `num_samples`
    /// long.
    pub fn match_length(&mut self, num_samples: usize) {
        self.left.resize(num_samples, 0.0);
        self.right.resize(num_samples, 0.0);
    }

    /// Append another buffer along the time axis.
    pub fn append(&mut self, other: &StereoBuffer) {
        self.left.extend_from_slice(&other.left);
        self.right.extend_from_slice(&other.right);
    }

    /// Interleave into L R L R ... order.
    pub fn interleave(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * 2);
        for (l, r) in self.left.iter().zip(self.right.iter()) {
            out.push(*l);
            out.push(*r);
        }
        out
    }

    /// Largest absolute sample across both channels.
    pub fn peak(&self) -> f32 {
        self.left
            .iter()
            .chain(self.right.iter())
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }
}

/// A rendered track buffer paired with its mix settings.
#[derive(Debug, Clone)]
pub struct Stem {
    /// Rendered audio
    pub buffer: StereoBuffer,
    /// Gain, nominally 0-1
    pub volume: f64,
    /// Stereo position, -1 = left, +1 = right
    pub pan: f64,
}

impl Stem {
    pub fn new(buffer: StereoBuffer, volume: f64, pan: f64) -> Self {
        Self { buffer, volume, pan }
    }
}

/// Left/right gains for a volume and pan setting under the constant-power
/// pan law: pan in [-1, 1] maps to an angle in [0, pi/2].
pub fn pan_gains(volume: f64, pan: f64) -> (f64, f64) {
    let angle = (pan + 1.0) / 2.0 * FRAC_PI_2;
    (volume * angle.cos(), volume * angle.sin())
}

/// Mix stems into a single stereo buffer.
///
/// Stems shorter than the longest input read as silence past their end.
/// If the summed peak exceeds 1.0 the whole mix is divided by the peak.
pub fn mix(stems: &[Stem]) -> StereoBuffer {
    let max_len = stems.iter().map(|s| s.buffer.len()).max().unwrap_or(0);
    if max_len == 0 {
        return StereoBuffer::default();
    }

    let mut acc_left = vec![0.0f64; max_len];
    let mut acc_right = vec![0.0f64; max_len];

    for stem in stems {
        let (gain_l, gain_r) = pan_gains(stem.volume, stem.pan);
        for (i, s) in stem.buffer.left.iter().enumerate() {
            acc_left[i] += *s as f64 * gain_l;
        }
        for (i, s) in stem.buffer.right.iter().enumerate() {
            acc_right[i] += *s as f64 * gain_r;
        }
    }

    let peak = acc_left
        .iter()
        .chain(acc_right.iter())
        .fold(0.0f64, |acc, s| acc.max(s.abs()));

    if peak > 1.0 {
        warn!("mix normalized (peak was {:.2})", peak);
        for s in acc_left.iter_mut().chain(acc_right.iter_mut()) {
            *s /= peak;
        }
    }

    StereoBuffer {
        left: acc_left.into_iter().map(|s| s as f32).collect(),
        right: acc_right.into_iter().map(|s| s as f32).collect(),
    }
}
