// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Per-track rendering.
//!
//! A track renders its scheduled events through the synthesizer pool into
//! a stem of exactly the requested length. Placeholder instruments and
//! synthesis failures produce silence; a length mismatch from the
//! synthesizer is reconciled here and never reaches the caller.

use tracing::{debug, warn};

use super::mixer::StereoBuffer;
use super::schedule::NoteEvent;
use super::synth::SynthesizerPool;
use crate::song::Track;

/// Render one track's events into a stem of exactly `num_samples` frames.
pub fn render_track(
    track: &Track,
    events: &[NoteEvent],
    synths: &SynthesizerPool,
    sample_rate: u32,
    num_samples: usize,
) -> StereoBuffer {
    // Placeholder tracks are free: no synthesizer is ever touched
    if track.is_placeholder() {
        debug!("track '{}' has no synthesizable instrument", track.name);
        return StereoBuffer::silence(num_samples);
    }

    let shared = match synths.acquire(&track.instrument, track.preset.as_deref()) {
        Ok(shared) => shared,
        Err(err) => {
            warn!("track '{}': {}, rendering silence", track.name, err);
            return StereoBuffer::silence(num_samples);
        }
    };

    let rendered = match shared.lock() {
        Ok(mut synth) => synth.render(events, sample_rate, num_samples),
        Err(_) => {
            warn!("track '{}': synthesizer lock poisoned, rendering silence", track.name);
            return StereoBuffer::silence(num_samples);
        }
    };

    match rendered {
        Ok(mut buffer) => {
            if buffer.len() != num_samples {
                debug!(
                    "track '{}': reconciling {} rendered samples to {}",
                    track.name,
                    buffer.len(),
                    num_samples
                );
                buffer.match_length(num_samples);
            }
            buffer
        }
        Err(err) => {
            warn!("track '{}': {}, rendering silence", track.name, err);
            StereoBuffer::silence(num_samples)
        }
    }
}
