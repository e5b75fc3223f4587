// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! YAML song persistence.
//!
//! The YAML file is the canonical representation of a song. Parsing is
//! strict: a malformed document or note token aborts the load and nothing
//! partial is returned. Structural problems that parse cleanly (dangling
//! scene or arrangement references, out-of-range notes) are left to
//! [`validate`](super::validate::validate).

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::notation::{format_note, parse_note};
use super::{Clip, ClipSlot, Scene, Song, SongError, TimeSignature, Track};

/// Load a song from a YAML file.
///
/// A song without a `meta.name` takes its name from the file stem.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Song> {
    let path = path.as_ref();
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read song file: {:?}", path))?;
    let mut song = from_yaml(&contents)
        .with_context(|| format!("Failed to parse song file: {:?}", path))?;

    if song.name.is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            song.name = stem.to_string();
        }
    }

    Ok(song)
}

/// Save a song to a YAML file.
pub fn save<P: AsRef<Path>>(song: &Song, path: P) -> Result<()> {
    let yaml = to_yaml(song)?;
    fs::write(path.as_ref(), yaml)
        .with_context(|| format!("Failed to write song file: {:?}", path.as_ref()))
}

/// Parse a song from a YAML string.
pub fn from_yaml(yaml: &str) -> Result<Song, SongError> {
    let doc: SongDoc = serde_yaml::from_str(yaml)?;
    doc_to_song(doc)
}

/// Serialize a song to a YAML string.
///
/// Note tokens are emitted as strings through serde_yaml, which quotes any
/// scalar the format would otherwise misread, so numeric-looking tokens
/// survive a round trip.
pub fn to_yaml(song: &Song) -> Result<String, SongError> {
    Ok(serde_yaml::to_string(&song_to_doc(song))?)
}

// ── Document structs ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct SongDoc {
    #[serde(default)]
    meta: MetaDoc,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    patterns: BTreeMap<String, ClipDoc>,
    #[serde(default)]
    tracks: Vec<TrackDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    scenes: Vec<SceneDoc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    arrangement: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetaDoc {
    #[serde(default)]
    name: String,
    #[serde(default = "default_key")]
    key: String,
    #[serde(default = "default_bpm")]
    bpm: f64,
    #[serde(default = "default_time_sig")]
    time_sig: Vec<u32>,
}

impl Default for MetaDoc {
    fn default() -> Self {
        Self {
            name: String::new(),
            key: default_key(),
            bpm: default_bpm(),
            time_sig: default_time_sig(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClipDoc {
    #[serde(default = "default_clip_length")]
    length: f64,
    #[serde(default)]
    notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TrackDoc {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    instrument: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preset: Option<String>,
    #[serde(default = "default_volume")]
    volume: f64,
    #[serde(default)]
    pan: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    clips: BTreeMap<String, TrackClipDoc>,
}

/// A clip entry in a track: inline when `length` or `notes` is present,
/// otherwise a reference into the pattern library.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct TrackClipDoc {
    #[serde(default)]
    slot: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SceneDoc {
    name: String,
    #[serde(default = "default_bars")]
    bars: u32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    clips: BTreeMap<String, String>,
}

fn default_key() -> String {
    "C".to_string()
}
fn default_bpm() -> f64 {
    120.0
}
fn default_time_sig() -> Vec<u32> {
    vec![4, 4]
}
fn default_clip_length() -> f64 {
    4.0
}
fn default_volume() -> f64 {
    0.85
}
fn default_bars() -> u32 {
    8
}

// ── Conversions ───────────────────────────────────────────

fn parse_clip(name: &str, doc: &ClipDoc) -> Result<Clip, SongError> {
    let mut clip = Clip::new(name, doc.length);
    for token in &doc.notes {
        clip.notes.push(parse_note(token)?);
    }
    Ok(clip)
}

fn doc_to_song(doc: SongDoc) -> Result<Song, SongError> {
    let time_sig = if doc.meta.time_sig.len() == 2 {
        TimeSignature::new(doc.meta.time_sig[0], doc.meta.time_sig[1])
    } else {
        TimeSignature::default()
    };

    let mut song = Song {
        name: doc.meta.name,
        key: doc.meta.key,
        bpm: doc.meta.bpm,
        time_sig,
        tracks: Vec::new(),
        scenes: Vec::new(),
        arrangement: doc.arrangement,
        patterns: BTreeMap::new(),
    };

    for (name, clip_doc) in &doc.patterns {
        song.patterns.insert(name.clone(), parse_clip(name, clip_doc)?);
    }

    for track_doc in doc.tracks {
        let mut track = Track::new(track_doc.name);
        track.instrument = track_doc.instrument;
        track.preset = track_doc.preset;
        track.volume = track_doc.volume;
        track.pan = track_doc.pan;

        for (clip_name, entry) in &track_doc.clips {
            let clip = if entry.notes.is_some() || entry.length.is_some() {
                let doc = ClipDoc {
                    length: entry.length.unwrap_or_else(default_clip_length),
                    notes: entry.notes.clone().unwrap_or_default(),
                };
                parse_clip(clip_name, &doc)?
            } else {
                song.patterns
                    .get(clip_name)
                    .cloned()
                    .ok_or_else(|| SongError::UnknownPattern(clip_name.clone()))?
            };
            track
                .clips
                .insert(clip_name.clone(), ClipSlot::new(clip, entry.slot));
        }

        song.tracks.push(track);
    }

    for scene_doc in doc.scenes {
        song.scenes.push(Scene {
            name: scene_doc.name,
            bars: scene_doc.bars,
            clips: scene_doc.clips,
        });
    }

    Ok(song)
}

fn song_to_doc(song: &Song) -> SongDoc {
    let mut doc = SongDoc {
        meta: MetaDoc {
            name: song.name.clone(),
            key: song.key.clone(),
            bpm: song.bpm,
            time_sig: vec![song.time_sig.numerator, song.time_sig.denominator],
        },
        ..SongDoc::default()
    };

    for (name, clip) in &song.patterns {
        doc.patterns.insert(
            name.clone(),
            ClipDoc {
                length: clip.length,
                notes: clip.notes.iter().map(format_note).collect(),
            },
        );
    }

    for track in &song.tracks {
        let mut track_doc = TrackDoc {
            name: track.name.clone(),
            instrument: track.instrument.clone(),
            preset: track.preset.clone(),
            volume: track.volume,
            pan: track.pan,
            clips: BTreeMap::new(),
        };

        for (clip_name, slot) in &track.clips {
            // A clip whose content matches the library pattern of the same
            // name is written as a bare reference.
            let is_reference = song
                .patterns
                .get(clip_name)
                .map(|p| *p == slot.clip)
                .unwrap_or(false);

            let entry = if is_reference {
                TrackClipDoc {
                    slot: slot.slot,
                    length: None,
                    notes: None,
                }
            } else {
                TrackClipDoc {
                    slot: slot.slot,
                    length: Some(slot.clip.length),
                    notes: Some(slot.clip.notes.iter().map(format_note).collect()),
                }
            };
            track_doc.clips.insert(clip_name.clone(), entry);
        }

        doc.tracks.push(track_doc);
    }

    for scene in &song.scenes {
        doc.scenes.push(SceneDoc {
            name: scene.name.clone(),
            bars: scene.bars,
            clips: scene.clips.clone(),
        });
    }

    doc.arrangement = song.arrangement.clone();
    doc
}
