// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Note token notation.
//!
//! Notes are written as colon-delimited `pitch:start:duration[:velocity]`
//! tokens, with start and duration in beats and velocity defaulting to 100.

use super::{Note, SongError};

/// Parse a `pitch:start:duration[:velocity]` token.
pub fn parse_note(token: &str) -> Result<Note, SongError> {
    let parts: Vec<&str> = token.split(':').collect();
    if parts.len() < 3 || parts.len() > 4 {
        return Err(SongError::NoteFormat(token.to_string()));
    }

    let pitch: i32 = parts[0]
        .trim()
        .parse()
        .map_err(|_| SongError::NoteFormat(token.to_string()))?;
    let start: f64 = parts[1]
        .trim()
        .parse()
        .map_err(|_| SongError::NoteFormat(token.to_string()))?;
    let duration: f64 = parts[2]
        .trim()
        .parse()
        .map_err(|_| SongError::NoteFormat(token.to_string()))?;
    let velocity: i32 = match parts.get(3) {
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| SongError::NoteFormat(token.to_string()))?,
        None => 100,
    };

    Ok(Note::new(pitch, start, duration, velocity))
}

/// Format a note back to a `pitch:start:duration:velocity` token.
///
/// Whole-number beats print without a fractional part, so `60:0:1:100`
/// survives a round trip unchanged.
pub fn format_note(note: &Note) -> String {
    format!(
        "{}:{}:{}:{}",
        note.pitch,
        format_beats(note.start),
        format_beats(note.duration),
        note.velocity
    )
}

fn format_beats(beats: f64) -> String {
    if beats.fract() == 0.0 {
        format!("{}", beats as i64)
    } else {
        format!("{}", beats)
    }
}
