// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Offline mixdown engine.
//!
//! This module turns a parsed song into rendered audio:
//! - note scheduling from beats to seconds
//! - per-track synthesis through an instrument capability
//! - constant-power mixing with overflow protection
//! - scene and arrangement composition
//! - WAV export
//!
//! Rendering degrades gracefully: unresolved references and synthesis
//! failures become silence plus a warning, never an abort.

pub mod compose;
pub mod mixer;
pub mod schedule;
pub mod synth;
pub mod track;
pub mod wav;

pub use compose::{render_arrangement, render_arrangement_with, render_scene, CancelToken};
pub use mixer::{mix, Stem, StereoBuffer};
pub use schedule::{schedule, EventKind, NoteEvent};
pub use synth::{
    FluidFactory, FluidSynthesizer, InstrumentSynthesizer, SynthesizerFactory, SynthesizerPool,
};
pub use track::render_track;
pub use wav::write_wav;

use thiserror::Error;

/// Synthesis error types.
///
/// These never abort a render: the track renderer converts them into a
/// silent stem and a warning.
#[derive(Debug, Clone, Error)]
pub enum SynthError {
    /// Failed to initialize the synthesizer engine
    #[error("synthesizer initialization failed: {0}")]
    Init(String),
    /// Failed to load the instrument behind a handle
    #[error("failed to load instrument '{0}'")]
    InstrumentLoad(String),
    /// Preset string did not parse
    #[error("invalid preset '{0}': expected bank:program")]
    Preset(String),
    /// The handle failed earlier in this render and stays unavailable
    #[error("instrument unavailable: {0}")]
    Unavailable(String),
}
