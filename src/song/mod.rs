// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song data model.
//!
//! A song is a declarative description of tracks, clips, scenes, and a
//! linear arrangement, plus a shared pattern library. The model carries no
//! behavior beyond structural lookups; consistency rules live in
//! [`validate`](crate::song::validate::validate) and rendering lives in
//! [`crate::render`].

pub mod file;
pub mod notation;
pub mod validate;
pub mod watcher;

pub use file::{load, save};
pub use notation::{format_note, parse_note};
pub use validate::validate;
pub use watcher::{SongEvent, SongWatcher};

use std::collections::BTreeMap;

use thiserror::Error;

/// Errors raised while parsing or writing a song description.
///
/// These are the only fatal errors in the crate: a malformed description
/// aborts loading outright, while everything downstream of a parsed song
/// degrades gracefully.
#[derive(Debug, Error)]
pub enum SongError {
    /// A note token did not match `pitch:start:duration[:velocity]`.
    #[error("note format is pitch:start:duration[:velocity], got '{0}'")]
    NoteFormat(String),
    /// A track clip entry referenced a pattern that does not exist.
    #[error("clip '{0}': not found in patterns")]
    UnknownPattern(String),
    /// The YAML document could not be parsed or emitted.
    #[error("invalid song YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A single note within a clip. Times are in beats.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// MIDI pitch. Kept wider than 0-127 so out-of-range values survive
    /// parsing and can be reported by the validator.
    pub pitch: i32,
    /// Start position in beats from clip start.
    pub start: f64,
    /// Duration in beats.
    pub duration: f64,
    /// MIDI velocity, same width rationale as `pitch`.
    pub velocity: i32,
}

impl Note {
    /// Create a note with an explicit velocity.
    pub fn new(pitch: i32, start: f64, duration: f64, velocity: i32) -> Self {
        Self {
            pitch,
            start,
            duration,
            velocity,
        }
    }

    /// Create a note with the default velocity of 100.
    pub fn plain(pitch: i32, start: f64, duration: f64) -> Self {
        Self::new(pitch, start, duration, 100)
    }

    /// End position in beats.
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// A named, timed sequence of notes of a given length in beats.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Clip {
    /// Clip name
    pub name: String,
    /// Length in beats
    pub length: f64,
    /// Notes, in no particular playback order
    pub notes: Vec<Note>,
}

impl Clip {
    /// Create an empty clip.
    pub fn new(name: impl Into<String>, length: f64) -> Self {
        Self {
            name: name.into(),
            length,
            notes: Vec::new(),
        }
    }

    /// Builder: add a note.
    pub fn with_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    /// Builder: add several notes.
    pub fn with_notes(mut self, notes: impl IntoIterator<Item = Note>) -> Self {
        self.notes.extend(notes);
        self
    }
}

/// A clip placed in a track, together with its slot index.
///
/// The slot is an attribute of the track-to-clip association, not of the
/// clip content: the same clip material may sit in different slots on
/// different tracks.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSlot {
    /// The clip content
    pub clip: Clip,
    /// Slot index within the track
    pub slot: usize,
}

impl ClipSlot {
    /// Place a clip in a slot.
    pub fn new(clip: Clip, slot: usize) -> Self {
        Self { clip, slot }
    }
}

/// A track: an instrument plus its clip set and mix settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Track name, unique within the song
    pub name: String,
    /// Instrument handle resolved by the synthesizer; empty or parenthesized
    /// means there is nothing to synthesize
    pub instrument: String,
    /// Optional instrument preset
    pub preset: Option<String>,
    /// Gain, nominally 0-1 but not hard-clamped
    pub volume: f64,
    /// Stereo position, -1 = left, +1 = right
    pub pan: f64,
    /// Clips by name
    pub clips: BTreeMap<String, ClipSlot>,
}

impl Track {
    /// Create a track with default mix settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instrument: String::new(),
            preset: None,
            volume: 0.85,
            pan: 0.0,
            clips: BTreeMap::new(),
        }
    }

    /// Builder: set the instrument handle.
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = instrument.into();
        self
    }

    /// Builder: set the preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.preset = Some(preset.into());
        self
    }

    /// Builder: set volume.
    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    /// Builder: set pan.
    pub fn with_pan(mut self, pan: f64) -> Self {
        self.pan = pan;
        self
    }

    /// Builder: add a clip in the next free slot.
    pub fn with_clip(mut self, clip: Clip) -> Self {
        let slot = self.clips.len();
        self.clips.insert(clip.name.clone(), ClipSlot::new(clip, slot));
        self
    }

    /// Whether the instrument is a non-synthesizable placeholder.
    ///
    /// An empty handle means no instrument assigned; a parenthesized handle
    /// (for example `(Ableton) Drum Rack`) names a DAW-native device that
    /// only exists inside the host session.
    pub fn is_placeholder(&self) -> bool {
        self.instrument.is_empty() || self.instrument.starts_with('(')
    }
}

/// A scene: one clip assignment per participating track.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    /// Scene name, unique within the song
    pub name: String,
    /// Scene length in bars
    pub bars: u32,
    /// track name -> clip name; omitted tracks are silent
    pub clips: BTreeMap<String, String>,
}

impl Scene {
    /// Create an empty scene.
    pub fn new(name: impl Into<String>, bars: u32) -> Self {
        Self {
            name: name.into(),
            bars,
            clips: BTreeMap::new(),
        }
    }

    /// Builder: assign a clip to a track.
    pub fn with_clip(mut self, track: impl Into<String>, clip: impl Into<String>) -> Self {
        self.clips.insert(track.into(), clip.into());
        self
    }
}

/// Musical time signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub numerator: u32,
    pub denominator: u32,
}

impl TimeSignature {
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Beats per bar.
    pub fn beats_per_bar(&self) -> u32 {
        self.numerator
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

/// A complete song description.
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    /// Song name
    pub name: String,
    /// Display key, e.g. "C" or "F#m"
    pub key: String,
    /// Tempo in beats per minute
    pub bpm: f64,
    /// Time signature
    pub time_sig: TimeSignature,
    /// Tracks in order
    pub tracks: Vec<Track>,
    /// Scenes in order
    pub scenes: Vec<Scene>,
    /// Linear playback order of scene names
    pub arrangement: Vec<String>,
    /// Shared pattern library: clips referenceable from any track
    pub patterns: BTreeMap<String, Clip>,
}

impl Song {
    /// Create an empty song at 120 BPM in 4/4.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: "C".to_string(),
            bpm: 120.0,
            time_sig: TimeSignature::default(),
            tracks: Vec::new(),
            scenes: Vec::new(),
            arrangement: Vec::new(),
            patterns: BTreeMap::new(),
        }
    }

    /// Builder: set the key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Builder: set the tempo.
    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Builder: set the time signature.
    pub fn with_time_sig(mut self, numerator: u32, denominator: u32) -> Self {
        self.time_sig = TimeSignature::new(numerator, denominator);
        self
    }

    /// Builder: add a track.
    pub fn with_track(mut self, track: Track) -> Self {
        self.tracks.push(track);
        self
    }

    /// Builder: add a scene.
    pub fn with_scene(mut self, scene: Scene) -> Self {
        self.scenes.push(scene);
        self
    }

    /// Builder: set the arrangement.
    pub fn with_arrangement(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arrangement = names.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: add a clip to the pattern library.
    pub fn with_pattern(mut self, clip: Clip) -> Self {
        self.patterns.insert(clip.name.clone(), clip);
        self
    }

    /// First track with the given name.
    pub fn track(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.name == name)
    }

    /// First scene with the given name.
    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    /// Resolve a clip name for a track: the track's own clip set first,
    /// then the shared pattern library.
    pub fn resolve_clip<'a>(&'a self, track: &'a Track, clip_name: &str) -> Option<&'a Clip> {
        track
            .clips
            .get(clip_name)
            .map(|slot| &slot.clip)
            .or_else(|| self.patterns.get(clip_name))
    }

    /// Seconds per beat at the song tempo.
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_end() {
        let note = Note::plain(60, 2.5, 0.5);
        assert_eq!(note.end(), 3.0);
        assert_eq!(note.velocity, 100);
    }

    #[test]
    fn test_clip_builder() {
        let clip = Clip::new("riff", 4.0)
            .with_note(Note::plain(60, 0.0, 1.0))
            .with_note(Note::new(64, 1.0, 1.0, 90));

        assert_eq!(clip.name, "riff");
        assert_eq!(clip.length, 4.0);
        assert_eq!(clip.notes.len(), 2);
        assert_eq!(clip.notes[1].velocity, 90);
    }

    #[test]
    fn test_track_defaults() {
        let track = Track::new("Bass");
        assert_eq!(track.volume, 0.85);
        assert_eq!(track.pan, 0.0);
        assert!(track.preset.is_none());
        assert!(track.clips.is_empty());
    }

    #[test]
    fn test_track_clip_slots() {
        let track = Track::new("Keys")
            .with_clip(Clip::new("a", 4.0))
            .with_clip(Clip::new("b", 8.0));

        assert_eq!(track.clips["a"].slot, 0);
        assert_eq!(track.clips["b"].slot, 1);
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(Track::new("Empty").is_placeholder());
        assert!(Track::new("Host")
            .with_instrument("(Ableton) Drum Rack")
            .is_placeholder());
        assert!(!Track::new("Piano")
            .with_instrument("/sf2/piano.sf2")
            .is_placeholder());
    }

    #[test]
    fn test_song_lookups() {
        let song = Song::new("Demo")
            .with_track(Track::new("Drums"))
            .with_track(Track::new("Bass"))
            .with_scene(Scene::new("intro", 4));

        assert!(song.track("Bass").is_some());
        assert!(song.track("Lead").is_none());
        assert!(song.scene("intro").is_some());
        assert!(song.scene("outro").is_none());
    }

    #[test]
    fn test_resolve_clip_prefers_track_local() {
        let local = Clip::new("groove", 4.0).with_note(Note::plain(36, 0.0, 0.5));
        let shared = Clip::new("groove", 8.0);

        let song = Song::new("Demo")
            .with_pattern(shared)
            .with_track(Track::new("Drums").with_clip(local));

        let track = song.track("Drums").unwrap();
        let clip = song.resolve_clip(track, "groove").unwrap();
        assert_eq!(clip.length, 4.0);
        assert_eq!(clip.notes.len(), 1);
    }

    #[test]
    fn test_resolve_clip_falls_back_to_patterns() {
        let song = Song::new("Demo")
            .with_pattern(Clip::new("shared", 2.0))
            .with_track(Track::new("Keys"));

        let track = song.track("Keys").unwrap();
        assert!(song.resolve_clip(track, "shared").is_some());
        assert!(song.resolve_clip(track, "missing").is_none());
    }

    #[test]
    fn test_seconds_per_beat() {
        let song = Song::new("Demo").with_bpm(120.0);
        assert_eq!(song.seconds_per_beat(), 0.5);
    }
}
