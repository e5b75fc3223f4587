// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! WAV export.
//!
//! Writes a rendered buffer as 16-bit PCM stereo. This is the final,
//! blocking step of a mixdown, performed only after the complete buffer is
//! assembled.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use super::mixer::StereoBuffer;

/// Write a stereo buffer to a 16-bit PCM WAV file.
pub fn write_wav<P: AsRef<Path>>(buffer: &StereoBuffer, path: P, sample_rate: u32) -> Result<()> {
    let path = path.as_ref();
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    for (l, r) in buffer.left.iter().zip(buffer.right.iter()) {
        writer
            .write_sample(quantize(*l))
            .context("Failed to write left channel sample")?;
        writer
            .write_sample(quantize(*r))
            .context("Failed to write right channel sample")?;
    }

    writer
        .finalize()
        .with_context(|| format!("Failed to finalize WAV file: {:?}", path))?;

    debug!(
        "wrote {:?} ({:.1}s, {}Hz stereo)",
        path,
        buffer.len() as f64 / sample_rate as f64,
        sample_rate
    );
    Ok(())
}

fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)).round() as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_clamps() {
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(1.0), i16::MAX);
        assert_eq!(quantize(2.0), i16::MAX);
        assert_eq!(quantize(-2.0), -i16::MAX);
    }

    #[test]
    fn test_write_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");

        let buffer = StereoBuffer {
            left: vec![0.0, 0.5, -0.5, 1.0],
            right: vec![1.0, -1.0, 0.25, 0.0],
        };
        write_wav(&buffer, &path, 44100).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 8);
        assert_eq!(samples[0], 0); // first left sample
        assert_eq!(samples[1], i16::MAX); // first right sample
        assert_eq!(samples[3], -i16::MAX);
    }

    #[test]
    fn test_write_empty_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");

        write_wav(&StereoBuffer::default(), &path, 48000).unwrap();

        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.len(), 0);
    }
}
