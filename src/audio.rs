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
use std::io::Cursor;
use std::time::Duration;

pub mod adjust;
pub mod assets;
pub mod decoder;
pub mod mix;
pub mod overlay;

/// A mono 16-bit PCM buffer paired with its sample rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    /// Samples per second.
    pub sample_rate: u32,
    /// The samples, one per frame.
    pub samples: Vec<i16>,
}

impl Waveform {
    /// Creates a zero-length waveform at the given sample rate.
    pub fn empty(sample_rate: u32) -> Waveform {
        Waveform {
            sample_rate,
            samples: Vec::new(),
        }
    }

    /// The number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the waveform contains no samples at all.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The play time of the waveform.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }
}

/// Encodes a waveform as a 16-bit mono PCM WAV container.
pub fn encode_wav(waveform: &Waveform) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: waveform.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in &waveform.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;

    Ok(cursor.into_inner())
}
