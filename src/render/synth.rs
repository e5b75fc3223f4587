// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Instrument synthesis.
//!
//! Synthesis is a capability behind the [`InstrumentSynthesizer`] trait so
//! rendering never depends on a concrete engine. The shipped implementation
//! wraps FluidLite: a track's instrument handle is a path to an SF2
//! soundfont, rendered offline by walking the event stream and synthesizing
//! the gaps between events.
//!
//! [`SynthesizerPool`] hands out one mutex-guarded instance per distinct
//! handle, so a handle shared by several tracks is never entered
//! concurrently. Synthesizer engines are typically not reentrant.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use fluidlite::{IsSettings, Settings, Synth};

use super::mixer::StereoBuffer;
use super::schedule::{EventKind, NoteEvent};
use super::SynthError;

/// Renders an event stream into a stereo buffer.
pub trait InstrumentSynthesizer: Send {
    /// Render `events` at `sample_rate` into a buffer of roughly
    /// `num_samples` frames. Callers reconcile the exact length.
    fn render(
        &mut self,
        events: &[NoteEvent],
        sample_rate: u32,
        num_samples: usize,
    ) -> Result<StereoBuffer, SynthError>;
}

/// Resolves an instrument handle to a synthesizer instance.
pub trait SynthesizerFactory: Send + Sync {
    fn create(
        &self,
        instrument: &str,
        preset: Option<&str>,
        sample_rate: u32,
    ) -> Result<Box<dyn InstrumentSynthesizer>, SynthError>;
}

// ── FluidLite ─────────────────────────────────────────────

/// FluidLite-backed synthesizer for SF2 soundfonts.
pub struct FluidSynthesizer {
    synth: Synth,
}

impl FluidSynthesizer {
    /// Load a soundfont and select an optional `bank:program` preset.
    pub fn load(
        soundfont: &str,
        preset: Option<&str>,
        sample_rate: u32,
    ) -> Result<Self, SynthError> {
        let settings = Settings::new().map_err(|e| SynthError::Init(e.to_string()))?;

        if let Some(setting) = settings.num("synth.sample-rate") {
            setting.set(sample_rate as f64);
        }
        if let Some(setting) = settings.int("synth.polyphony") {
            setting.set(256);
        }

        let synth = Synth::new(settings).map_err(|e| SynthError::Init(e.to_string()))?;

        // Offline rendering wants the dry signal
        synth.set_reverb_on(false);
        synth.set_chorus_on(false);

        if !Path::new(soundfont).exists() {
            return Err(SynthError::InstrumentLoad(soundfont.to_string()));
        }
        synth
            .sfload(soundfont, true)
            .map_err(|_| SynthError::InstrumentLoad(soundfont.to_string()))?;

        if let Some(preset) = preset {
            let (bank, program) = parse_preset(preset)?;
            // Bank select MSB (CC 0) and LSB (CC 32), then the program
            let _ = synth.cc(0, 0, (bank >> 7) as u32);
            let _ = synth.cc(0, 32, (bank & 0x7F) as u32);
            let _ = synth.program_change(0, program as u32);
        }

        Ok(Self { synth })
    }
}

impl InstrumentSynthesizer for FluidSynthesizer {
    fn render(
        &mut self,
        events: &[NoteEvent],
        sample_rate: u32,
        num_samples: usize,
    ) -> Result<StereoBuffer, SynthError> {
        let mut interleaved = vec![0.0f32; num_samples * 2];
        let mut cursor = 0usize;

        for event in events {
            let position = event.sample_position(sample_rate).min(num_samples);
            if position > cursor {
                let _ = self.synth.write(&mut interleaved[cursor * 2..position * 2]);
                cursor = position;
            }

            // Out-of-range notes are skipped rather than clamped; the
            // validator reports them, rendering stays defensive.
            if !(0..=127).contains(&event.pitch) {
                continue;
            }
            match event.kind {
                EventKind::NoteOn => {
                    if (0..=127).contains(&event.velocity) {
                        let _ = self
                            .synth
                            .note_on(0, event.pitch as u32, event.velocity as u32);
                    }
                }
                EventKind::NoteOff => {
                    let _ = self.synth.note_off(0, event.pitch as u32);
                }
            }
        }

        if cursor < num_samples {
            let _ = self.synth.write(&mut interleaved[cursor * 2..]);
        }

        Ok(StereoBuffer::from_interleaved(&interleaved))
    }
}

/// Factory that treats instrument handles as SF2 paths.
#[derive(Debug, Default)]
pub struct FluidFactory;

impl SynthesizerFactory for FluidFactory {
    fn create(
        &self,
        instrument: &str,
        preset: Option<&str>,
        sample_rate: u32,
    ) -> Result<Box<dyn InstrumentSynthesizer>, SynthError> {
        Ok(Box::new(FluidSynthesizer::load(
            instrument,
            preset,
            sample_rate,
        )?))
    }
}

fn parse_preset(preset: &str) -> Result<(u16, u8), SynthError> {
    let parse_err = || SynthError::Preset(preset.to_string());
    match preset.split_once(':') {
        Some((bank, program)) => {
            let bank = bank.trim().parse().map_err(|_| parse_err())?;
            let program = program.trim().parse().map_err(|_| parse_err())?;
            Ok((bank, program))
        }
        None => {
            let program = preset.trim().parse().map_err(|_| parse_err())?;
            Ok((0, program))
        }
    }
}

// ── Pool ──────────────────────────────────────────────────

/// A synthesizer shared between tracks, serialized behind a mutex.
pub type SharedSynthesizer = Arc<Mutex<Box<dyn InstrumentSynthesizer>>>;

#[derive(Clone)]
enum PoolEntry {
    Ready(SharedSynthesizer),
    Failed(String),
}

/// Lazily creates one synthesizer per distinct (instrument, preset) handle.
///
/// A handle that fails to load stays failed for the lifetime of the pool,
/// so a broken soundfont is reported once per handle rather than re-probed
/// for every track and scene that uses it.
pub struct SynthesizerPool {
    factory: Box<dyn SynthesizerFactory>,
    sample_rate: u32,
    instances: Mutex<HashMap<(String, Option<String>), PoolEntry>>,
}

impl SynthesizerPool {
    /// Create a pool over an arbitrary factory.
    pub fn new(factory: Box<dyn SynthesizerFactory>, sample_rate: u32) -> Self {
        Self {
            factory,
            sample_rate,
            instances: Mutex::new(HashMap::new()),
        }
    }

    /// Create a FluidLite-backed pool.
    pub fn fluid(sample_rate: u32) -> Self {
        Self::new(Box::new(FluidFactory), sample_rate)
    }

    /// Sample rate the pool's instances were created for.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get or create the synthesizer for an instrument handle.
    pub fn acquire(
        &self,
        instrument: &str,
        preset: Option<&str>,
    ) -> Result<SharedSynthesizer, SynthError> {
        let key = (instrument.to_string(), preset.map(str::to_string));
        let mut instances = self
            .instances
            .lock()
            .map_err(|_| SynthError::Unavailable("synthesizer pool lock poisoned".to_string()))?;

        if let Some(entry) = instances.get(&key) {
            return match entry {
                PoolEntry::Ready(shared) => Ok(Arc::clone(shared)),
                PoolEntry::Failed(reason) => Err(SynthError::Unavailable(reason.clone())),
            };
        }

        match self.factory.create(instrument, preset, self.sample_rate) {
            Ok(synth) => {
                let shared: SharedSynthesizer = Arc::new(Mutex::new(synth));
                instances.insert(key, PoolEntry::Ready(Arc::clone(&shared)));
                Ok(shared)
            }
            Err(err) => {
                instances.insert(key, PoolEntry::Failed(err.to_string()));
                Err(err)
            }
        }
    }
}
