// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Structural validation.
//!
//! [`validate`] walks a song and collects every invariant violation as a
//! human-readable finding. It is purely advisory: rendering does not require
//! a clean result, and a song under construction will routinely carry
//! dangling references.

use std::collections::BTreeSet;

use super::{Clip, Song};

/// Validate a song, returning one finding per violation. Empty means sound.
///
/// Never mutates, never consults anything outside the song, never stops at
/// the first problem.
pub fn validate(song: &Song) -> Vec<String> {
    let mut findings = Vec::new();

    if song.name.is_empty() {
        findings.push("meta: missing name".to_string());
    }
    if song.bpm <= 0.0 {
        findings.push(format!("meta: invalid bpm {}", song.bpm));
    }
    if song.time_sig.numerator == 0 || song.time_sig.denominator == 0 {
        findings.push(format!(
            "meta: invalid time signature {}/{}",
            song.time_sig.numerator, song.time_sig.denominator
        ));
    }

    let mut track_names = BTreeSet::new();
    for track in &song.tracks {
        if !track_names.insert(track.name.as_str()) {
            findings.push(format!("duplicate track name '{}'", track.name));
        }
    }

    // Note ranges, in track clips and in the shared pattern library
    for track in &song.tracks {
        for (clip_name, slot) in &track.clips {
            check_notes(
                &slot.clip,
                &format!("track '{}' clip '{}'", track.name, clip_name),
                &mut findings,
            );
        }
    }
    for (name, clip) in &song.patterns {
        check_notes(clip, &format!("pattern '{}'", name), &mut findings);
    }

    // Scene references
    let mut scene_names = BTreeSet::new();
    for scene in &song.scenes {
        if !scene_names.insert(scene.name.as_str()) {
            findings.push(format!("duplicate scene name '{}'", scene.name));
        }

        for (track_name, clip_name) in &scene.clips {
            let Some(track) = song.track(track_name) else {
                findings.push(format!(
                    "scene '{}': references unknown track '{}'",
                    scene.name, track_name
                ));
                continue;
            };
            if song.resolve_clip(track, clip_name).is_none() {
                findings.push(format!(
                    "scene '{}': track '{}' has no clip '{}'",
                    scene.name, track_name, clip_name
                ));
            }
        }
    }

    // Arrangement references
    for name in &song.arrangement {
        if song.scene(name).is_none() {
            findings.push(format!("arrangement: references unknown scene '{}'", name));
        }
    }

    findings
}

fn check_notes(clip: &Clip, context: &str, findings: &mut Vec<String>) {
    for (i, note) in clip.notes.iter().enumerate() {
        if note.pitch < 0 || note.pitch > 127 {
            findings.push(format!(
                "{} note {}: pitch {} out of range 0-127",
                context, i, note.pitch
            ));
        }
        if note.velocity < 0 || note.velocity > 127 {
            findings.push(format!(
                "{} note {}: velocity {} out of range 0-127",
                context, i, note.velocity
            ));
        }
        if note.start < 0.0 {
            findings.push(format!("{} note {}: negative start {}", context, i, note.start));
        }
        if note.duration <= 0.0 {
            findings.push(format!(
                "{} note {}: non-positive duration {}",
                context, i, note.duration
            ));
        }
    }
}
