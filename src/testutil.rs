// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
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

//! Test fixtures: WAV files and asset directories built on the fly.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use tempfile::TempDir;

use crate::audio::adjust::SampleAdjuster;
use crate::audio::assets::{AssetLibrary, SoundKind};

/// The constant amplitude fixture clips are written at. Loud enough that
/// loudness math has headroom in both directions.
pub const FIXTURE_AMPLITUDE: i16 = 8000;

/// Writes a mono 16-bit WAV file with the given samples.
pub fn write_wav(path: &Path, samples: &[i16], sample_rate: u32) {
    write_wav_channels(path, &[samples], sample_rate)
}

/// Writes an interleaved 16-bit WAV file, one slice per channel.
pub fn write_wav_channels(path: &Path, channels: &[&[i16]], sample_rate: u32) {
    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels: channels.len() as u16,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        },
    )
    .expect("create wav");

    for frame in 0..channels[0].len() {
        for channel in channels {
            writer.write_sample(channel[frame]).expect("write sample");
        }
    }
    writer.finalize().expect("finalize wav");
}

/// Writes all six drum clips into a fresh temp directory as constant-value
/// clips of the given length, and returns the directory.
pub fn sound_assets_dir(sample_rate: u32, len: usize) -> TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for kind in SoundKind::ALL {
        write_wav(
            &dir.path().join(kind.file_name()),
            &vec![FIXTURE_AMPLITUDE; len],
            sample_rate,
        );
    }
    dir
}

/// An adjuster over a fresh temp asset directory holding one-second clips.
/// The directory must outlive the adjuster.
pub fn test_adjuster(sample_rate: u32) -> (TempDir, SampleAdjuster) {
    let dir = sound_assets_dir(sample_rate, sample_rate as usize);
    let adjuster = SampleAdjuster::new(AssetLibrary::new(dir.path().to_path_buf(), sample_rate));
    (dir, adjuster)
}
