// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::fs::File;
use std::path::{Path, PathBuf};

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::Waveform;

/// Error for audio file decoding. Callers rely on the distinction between a
/// missing file and an unrecognized container.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("audio file {} not found", .0.display())]
    NotFound(PathBuf),

    #[error("audio file {} is not a supported format", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("audio file {} could not be decoded: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Decodes the audio file at the given path into a mono 16-bit waveform.
/// Multi-channel sources are downmixed by averaging the channels of each
/// frame. The container format is probed from the file contents, with the
/// extension as a hint.
pub fn decode_file(path: &Path) -> Result<Waveform, DecodeError> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DecodeError::NotFound(path.to_path_buf())
        } else {
            DecodeError::Io(e)
        }
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Create a hint to help the format registry guess the format.
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| match e {
            SymphoniaError::Unsupported(_) => DecodeError::UnsupportedFormat {
                path: path.to_path_buf(),
            },
            e => malformed(path, e),
        })?;
    let mut format_reader = probed.format;

    // Find the first audio track.
    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::Malformed {
            path: path.to_path_buf(),
            message: "no audio track found".to_string(),
        })?;
    let track_id = track.id;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::Malformed {
            path: path.to_path_buf(),
            message: "sample rate not specified".to_string(),
        })?;

    let mut decoder = get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| malformed(path, e))?;

    // Read and decode packets until the end of the stream, downmixing each
    // decoded buffer into the mono accumulator as we go.
    let mut mono: Vec<f32> = Vec::new();
    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            // Some decoders return DecodeError at EOF instead of IoError.
            Err(SymphoniaError::DecodeError(_)) => break,
            Err(e) => return Err(malformed(path, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                match decoder.decode(&packet) {
                    Ok(decoded) => decoded,
                    Err(e) => return Err(malformed(path, e)),
                }
            }
            Err(e) => return Err(malformed(path, e)),
        };

        downmix_into(&mut mono, decoded);
    }

    Ok(Waveform {
        sample_rate,
        samples: mono.iter().map(|&sample| f32_to_i16(sample)).collect(),
    })
}

fn malformed(path: &Path, e: SymphoniaError) -> DecodeError {
    DecodeError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    }
}

/// Downmixes a decoded buffer into the mono accumulator, converting samples
/// to f32 in the process.
fn downmix_into(mono: &mut Vec<f32>, decoded: AudioBufferRef) {
    match decoded {
        AudioBufferRef::F32(buf) => downmix_planar(mono, &buf, |sample| sample),
        AudioBufferRef::F64(buf) => downmix_planar(mono, &buf, |sample| sample as f32),
        AudioBufferRef::S8(buf) => downmix_planar(mono, &buf, scale_s8),
        AudioBufferRef::S16(buf) => downmix_planar(mono, &buf, scale_s16),
        AudioBufferRef::S24(buf) => downmix_planar(mono, &buf, |sample| scale_s24(sample.inner())),
        AudioBufferRef::S32(buf) => downmix_planar(mono, &buf, scale_s32),
        AudioBufferRef::U8(buf) => downmix_planar(mono, &buf, scale_u8),
        AudioBufferRef::U16(buf) => downmix_planar(mono, &buf, scale_u16),
        AudioBufferRef::U24(buf) => downmix_planar(mono, &buf, |sample| scale_u24(sample.inner())),
        AudioBufferRef::U32(buf) => downmix_planar(mono, &buf, scale_u32),
    }
}

/// Helper to downmix planar samples from a generic AudioBuffer. The closure
/// receives a single sample value and returns the f32 sample value.
fn downmix_planar<T, F>(mono: &mut Vec<f32>, buf: &AudioBuffer<T>, convert: F)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    if channels == 0 {
        return;
    }

    let planes = buf.planes();
    let plane_slices = planes.planes();
    mono.reserve(frames);
    for frame_idx in 0..frames {
        let mut sum = 0.0f32;
        for plane in plane_slices.iter().take(channels) {
            sum += convert(plane[frame_idx]);
        }
        mono.push(sum / channels as f32);
    }
}

#[inline]
fn f32_to_i16(sample: f32) -> i16 {
    (sample * 32768.0)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

// Scaling helpers for all integer formats.

#[inline]
fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::testutil;

    #[test]
    fn test_decode_mono_wav_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("clip.wav");
        let samples: Vec<i16> = vec![0, 1000, -1000, i16::MAX, i16::MIN, 42];
        testutil::write_wav(&path, &samples, 44100);

        let decoded = decode_file(&path).expect("decode");
        assert_eq!(decoded.sample_rate, 44100);
        assert_eq!(decoded.samples, samples);
    }

    #[test]
    fn test_decode_stereo_downmix() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stereo.wav");
        let left: Vec<i16> = vec![1000, 2000, -4000];
        let right: Vec<i16> = vec![3000, 2000, 0];
        testutil::write_wav_channels(&path, &[&left, &right], 48000);

        let decoded = decode_file(&path).expect("decode");
        assert_eq!(decoded.sample_rate, 48000);
        assert_eq!(decoded.samples, vec![2000, 2000, -2000]);
    }

    #[test]
    fn test_decode_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = decode_file(&dir.path().join("nope.wav"));
        assert!(matches!(result, Err(DecodeError::NotFound(_))));
    }

    #[test]
    fn test_decode_unrecognized_container() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("notes.txt");
        fs::write(&path, "this is not audio at all").expect("write");

        let result = decode_file(&path);
        assert!(matches!(
            result,
            Err(DecodeError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_f32_to_i16_saturates() {
        assert_eq!(f32_to_i16(0.0), 0);
        assert_eq!(f32_to_i16(1.5), i16::MAX);
        assert_eq!(f32_to_i16(-1.5), i16::MIN);
        assert_eq!(f32_to_i16(-1.0), i16::MIN);
    }
}
