// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIXDOWN - declarative songs rendered to audio.
//!
//! A song is a YAML description of tracks, clips, scenes, and a linear
//! arrangement. This crate parses and validates that description, then
//! renders it offline: notes are scheduled from beats to seconds, each
//! track is synthesized through an SF2 instrument, and the stems are mixed
//! with constant-power panning into a stereo buffer that can be written to
//! a WAV file.
//!
//! The typical pipeline:
//!
//! ```no_run
//! use mixdown::render::{render_arrangement, write_wav, SynthesizerPool};
//! use mixdown::song;
//!
//! # fn main() -> anyhow::Result<()> {
//! let tune = song::load("tune.yaml")?;
//! for finding in song::validate(&tune) {
//!     eprintln!("warning: {}", finding);
//! }
//!
//! let sample_rate = 44100;
//! let synths = SynthesizerPool::fluid(sample_rate);
//! let audio = render_arrangement(&tune, &synths, sample_rate);
//! write_wav(&audio, "tune.wav", sample_rate)?;
//! # Ok(())
//! # }
//! ```
//!
//! Only parsing is allowed to fail: validation findings are advisory, and
//! rendering converts every unresolved reference or synthesis failure into
//! silence plus a logged warning.

pub mod render;
pub mod song;

pub use render::{
    mix, render_arrangement, render_arrangement_with, render_scene, render_track, schedule,
    write_wav, CancelToken, InstrumentSynthesizer, NoteEvent, Stem, StereoBuffer, SynthError,
    SynthesizerFactory, SynthesizerPool,
};
pub use song::{load, save, validate, Clip, ClipSlot, Note, Scene, Song, SongError, SongWatcher, TimeSignature, Track};
