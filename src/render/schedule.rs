// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note scheduling.
//!
//! Converts a clip's beat-relative notes into an absolute-time event
//! stream for the synthesizer: one on and one off event per note, sorted
//! ascending by time.

use crate::song::Clip;

/// Kind of note event.
///
/// The variant order is load-bearing: at an identical timestamp, `NoteOff`
/// sorts before `NoteOn`, so a retriggered pitch is released before it is
/// struck again. The sort is stable, so events that tie on both time and
/// kind keep note order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    /// Release a sounding pitch
    NoteOff,
    /// Strike a pitch
    NoteOn,
}

/// A timed note event, in seconds from clip start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Event time in seconds
    pub time: f64,
    /// On or off
    pub kind: EventKind,
    /// MIDI pitch, unclamped; the synthesizer skips out-of-range values
    pub pitch: i32,
    /// MIDI velocity, unclamped likewise
    pub velocity: i32,
}

impl NoteEvent {
    /// Sample index of this event at the given rate.
    pub fn sample_position(&self, sample_rate: u32) -> usize {
        (self.time * sample_rate as f64).round().max(0.0) as usize
    }
}

/// Schedule a clip's notes at the given tempo.
pub fn schedule(clip: &Clip, bpm: f64) -> Vec<NoteEvent> {
    let spb = 60.0 / bpm;
    let mut events = Vec::with_capacity(clip.notes.len() * 2);

    for note in &clip.notes {
        events.push(NoteEvent {
            time: note.start * spb,
            kind: EventKind::NoteOn,
            pitch: note.pitch,
            velocity: note.velocity,
        });
        events.push(NoteEvent {
            time: (note.start + note.duration) * spb,
            kind: EventKind::NoteOff,
            pitch: note.pitch,
            velocity: 0,
        });
    }

    events.sort_by(|a, b| {
        a.time
            .partial_cmp(&b.time)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.kind.cmp(&b.kind))
    });
    events
}
