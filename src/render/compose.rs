// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Scene and arrangement composition.
//!
//! A scene resolves its (track, clip) pairs, renders each pair into a stem,
//! and mixes the stems; an arrangement concatenates rendered scenes in
//! order. Unresolved references are skipped with a warning so a song under
//! construction still renders everything that does resolve.
//!
//! Per-track synthesis is the dominant cost, so stems render on a bounded
//! worker pool. Jobs are grouped by instrument handle: distinct handles
//! render concurrently, a handle shared by several tracks renders its
//! tracks serially. The mix is the barrier that waits for every stem.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use tracing::{debug, warn};

use super::mixer::{mix, Stem, StereoBuffer};
use super::schedule::{schedule, NoteEvent};
use super::synth::SynthesizerPool;
use super::track::render_track;
use crate::song::{Scene, Song, Track};

/// Cooperative cancellation for long renders.
///
/// Checked between scenes only: cancelling returns the cleanly
/// concatenated prefix of the arrangement rendered so far.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Number of sample frames a scene occupies at the song tempo.
pub fn scene_samples(song: &Song, scene: &Scene, sample_rate: u32) -> usize {
    let beats = scene.bars as f64 * song.time_sig.beats_per_bar() as f64;
    let seconds = beats * song.seconds_per_beat();
    (seconds * sample_rate as f64).round() as usize
}

struct RenderJob<'a> {
    index: usize,
    track: &'a Track,
    events: Vec<NoteEvent>,
}

/// Render one scene into a stereo buffer of its full duration.
///
/// A scene with no resolvable pairs returns silence of the correct
/// length, never an error.
pub fn render_scene(
    song: &Song,
    scene: &Scene,
    synths: &SynthesizerPool,
    sample_rate: u32,
) -> StereoBuffer {
    let num_samples = scene_samples(song, scene, sample_rate);

    let mut jobs = Vec::new();
    for (track_name, clip_name) in &scene.clips {
        let Some(track) = song.track(track_name) else {
            warn!(
                "scene '{}': track '{}' not found, skipping",
                scene.name, track_name
            );
            continue;
        };
        let Some(clip) = song.resolve_clip(track, clip_name) else {
            warn!(
                "scene '{}': clip '{}' not found on track '{}', skipping",
                scene.name, clip_name, track_name
            );
            continue;
        };

        debug!("rendering {}: {}", track_name, clip_name);
        jobs.push(RenderJob {
            index: jobs.len(),
            track,
            events: schedule(clip, song.bpm),
        });
    }

    if jobs.is_empty() {
        return StereoBuffer::silence(num_samples);
    }

    let stems = render_jobs(jobs, synths, sample_rate, num_samples);
    mix(&stems)
}

/// Fan the jobs out over a bounded worker pool and collect stems back in
/// job order.
fn render_jobs(
    jobs: Vec<RenderJob<'_>>,
    synths: &SynthesizerPool,
    sample_rate: u32,
    num_samples: usize,
) -> Vec<Stem> {
    // Group by instrument handle: one group is one unit of serial work
    let mut groups: BTreeMap<(String, Option<String>), Vec<RenderJob<'_>>> = BTreeMap::new();
    for job in jobs {
        groups
            .entry((job.track.instrument.clone(), job.track.preset.clone()))
            .or_default()
            .push(job);
    }

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(groups.len());

    let queue: Mutex<VecDeque<Vec<RenderJob<'_>>>> =
        Mutex::new(groups.into_values().collect());
    let collected: Mutex<Vec<(usize, Stem)>> = Mutex::new(Vec::new());

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let group = match queue.lock() {
                    Ok(mut queue) => queue.pop_front(),
                    Err(_) => None,
                };
                let Some(group) = group else { break };

                for job in group {
                    let buffer =
                        render_track(job.track, &job.events, synths, sample_rate, num_samples);
                    let stem = Stem::new(buffer, job.track.volume, job.track.pan);
                    if let Ok(mut collected) = collected.lock() {
                        collected.push((job.index, stem));
                    }
                }
            });
        }
    });

    let mut stems = collected
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    stems.sort_by_key(|(index, _)| *index);
    stems.into_iter().map(|(_, stem)| stem).collect()
}

/// Render the full arrangement: scenes in order, concatenated
/// sample-exactly with no crossfade.
pub fn render_arrangement(song: &Song, synths: &SynthesizerPool, sample_rate: u32) -> StereoBuffer {
    render_arrangement_with(song, synths, sample_rate, &CancelToken::new())
}

/// Render the arrangement with a cancellation checkpoint between scenes.
pub fn render_arrangement_with(
    song: &Song,
    synths: &SynthesizerPool,
    sample_rate: u32,
    cancel: &CancelToken,
) -> StereoBuffer {
    let mut out = StereoBuffer::default();

    for (i, name) in song.arrangement.iter().enumerate() {
        if cancel.is_cancelled() {
            warn!(
                "arrangement render cancelled before scene '{}' ({} samples kept)",
                name,
                out.len()
            );
            break;
        }

        let Some(scene) = song.scene(name) else {
            warn!("arrangement: scene '{}' not found, skipping", name);
            continue;
        };

        debug!("scene {}: {}", i, name);
        out.append(&render_scene(song, scene, synths, sample_rate));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::synth::{InstrumentSynthesizer, SynthesizerFactory};
    use crate::render::SynthError;
    use crate::song::{Clip, Note};

    /// Synthesizer producing a constant amplitude regardless of events.
    struct ConstSynthesizer {
        amplitude: f32,
    }

    impl InstrumentSynthesizer for ConstSynthesizer {
        fn render(
            &mut self,
            _events: &[NoteEvent],
            _sample_rate: u32,
            num_samples: usize,
        ) -> Result<StereoBuffer, SynthError> {
            Ok(StereoBuffer {
                left: vec![self.amplitude; num_samples],
                right: vec![self.amplitude; num_samples],
            })
        }
    }

    struct ConstFactory;

    impl SynthesizerFactory for ConstFactory {
        fn create(
            &self,
            _instrument: &str,
            _preset: Option<&str>,
            _sample_rate: u32,
        ) -> Result<Box<dyn InstrumentSynthesizer>, SynthError> {
            Ok(Box::new(ConstSynthesizer { amplitude: 0.5 }))
        }
    }

    const SR: u32 = 44100;

    fn demo_song() -> Song {
        Song::new("Demo")
            .with_bpm(120.0)
            .with_track(
                Track::new("Bass")
                    .with_instrument("bass.sf2")
                    .with_volume(1.0)
                    .with_pan(-1.0)
                    .with_clip(Clip::new("pulse", 4.0).with_note(Note::plain(45, 0.0, 1.0))),
            )
            .with_track(
                Track::new("Keys")
                    .with_instrument("keys.sf2")
                    .with_volume(1.0)
                    .with_pan(1.0)
                    .with_clip(Clip::new("chords", 4.0).with_note(Note::plain(60, 0.0, 2.0))),
            )
            .with_scene(
                Scene::new("a", 4)
                    .with_clip("Bass", "pulse")
                    .with_clip("Keys", "chords"),
            )
            .with_scene(Scene::new("b", 8).with_clip("Bass", "pulse"))
            .with_arrangement(["a", "b"])
    }

    #[test]
    fn test_scene_samples() {
        let song = demo_song();
        // 4 bars of 4/4 at 120 BPM is 8 seconds
        let scene = song.scene("a").unwrap();
        assert_eq!(scene_samples(&song, scene, SR), 8 * SR as usize);
    }

    #[test]
    fn test_scene_samples_odd_meter() {
        let song = demo_song().with_bpm(90.0).with_time_sig(7, 8);
        let scene = Scene::new("odd", 3);
        // 21 beats at 90 BPM is 14 seconds
        assert_eq!(scene_samples(&song, &scene, SR), 14 * SR as usize);
    }

    #[test]
    fn test_render_scene_mixes_tracks() {
        let song = demo_song();
        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);

        let out = render_scene(&song, song.scene("a").unwrap(), &pool, SR);
        assert_eq!(out.len(), 8 * SR as usize);
        // Bass is hard left, Keys hard right, both at amplitude 0.5
        assert!((out.left[0] - 0.5).abs() < 1e-6);
        assert!((out.right[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_scene_with_unknown_references_still_renders() {
        let mut song = demo_song();
        song.scenes[0]
            .clips
            .insert("Ghost".to_string(), "pulse".to_string());
        song.scenes[0]
            .clips
            .insert("Keys".to_string(), "missing".to_string());

        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);
        let out = render_scene(&song, &song.scenes[0], &pool, SR);

        // Correct duration; the Bass contribution still sounds
        assert_eq!(out.len(), 8 * SR as usize);
        assert!((out.left[0] - 0.5).abs() < 1e-6);
        assert!(out.right[0].abs() < 1e-6);
    }

    #[test]
    fn test_scene_with_nothing_resolvable_is_silence() {
        let mut song = demo_song();
        song.scenes[0].clips.clear();
        song.scenes[0]
            .clips
            .insert("Nobody".to_string(), "nothing".to_string());

        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);
        let out = render_scene(&song, &song.scenes[0], &pool, SR);
        assert_eq!(out.len(), 8 * SR as usize);
        assert_eq!(out.peak(), 0.0);
    }

    #[test]
    fn test_arrangement_concatenates() {
        let song = demo_song();
        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);

        let a = render_scene(&song, song.scene("a").unwrap(), &pool, SR);
        let b = render_scene(&song, song.scene("b").unwrap(), &pool, SR);
        let full = render_arrangement(&song, &pool, SR);

        assert_eq!(full.len(), a.len() + b.len());
        // The second scene starts exactly where the first ends
        assert!((full.left[a.len()] - b.left[0]).abs() < 1e-6);
    }

    #[test]
    fn test_arrangement_skips_unknown_scene() {
        let mut song = demo_song();
        song.arrangement = vec!["a".to_string(), "void".to_string(), "b".to_string()];

        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);
        let full = render_arrangement(&song, &pool, SR);
        assert_eq!(full.len(), (8 + 16) * SR as usize);
    }

    #[test]
    fn test_empty_arrangement() {
        let mut song = demo_song();
        song.arrangement.clear();

        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);
        assert!(render_arrangement(&song, &pool, SR).is_empty());
    }

    #[test]
    fn test_cancelled_before_start_renders_nothing() {
        let song = demo_song();
        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);

        let cancel = CancelToken::new();
        cancel.cancel();
        let out = render_arrangement_with(&song, &pool, SR, &cancel);
        assert!(out.is_empty());
    }

    #[test]
    fn test_render_is_deterministic() {
        let song = demo_song();
        let pool = SynthesizerPool::new(Box::new(ConstFactory), SR);

        let first = render_arrangement(&song, &pool, SR);
        let second = render_arrangement(&song, &pool, SR);
        assert_eq!(first, second);
    }
}
