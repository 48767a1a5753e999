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

//! Overlays the mixed drum track on the background song.

use std::path::Path;

use tracing::{info, warn};

use super::adjust::db_to_factor;
use super::decoder::{self, DecodeError};
use super::mix::clip_to_i16;
use super::Waveform;
use crate::config::DEFAULT_VOLUME;

/// Background song container formats the generator accepts.
const SUPPORTED_EXTENSIONS: [&str; 2] = ["ogg", "mp3"];

/// Gain applied to the song when its volume slider is zero. A large fixed
/// attenuation rather than empty samples, so the track keeps its length.
const MUTE_ATTENUATION_DB: f64 = -120.0;

/// Combines the drum track with the background song, if one was supplied.
///
/// The song must be an ogg or mp3 file; anything else fails before any
/// decode work. The combined track spans the longer of the two inputs, with
/// the shorter one implicitly zero-padded.
pub fn overlay(
    drum: Waveform,
    song_file: Option<&Path>,
    song_volume: u8,
) -> Result<Waveform, DecodeError> {
    let Some(path) = song_file else {
        return Ok(drum);
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(DecodeError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let song = decoder::decode_file(path)?;
    info!(
        path = %path.display(),
        sample_rate = song.sample_rate,
        samples = song.len(),
        "background song decoded"
    );
    if !drum.is_empty() && song.sample_rate != drum.sample_rate {
        warn!(
            song_rate = song.sample_rate,
            drum_rate = drum.sample_rate,
            "song and drum track sample rates differ; keeping the drum track rate"
        );
    }

    let gain_db = if song_volume > 0 {
        20.0 * (f64::from(song_volume) / f64::from(DEFAULT_VOLUME)).log10()
    } else {
        MUTE_ATTENUATION_DB
    };

    Ok(combine(drum, &song, gain_db))
}

/// Sums the gain-adjusted song under the unmodified drum track over the
/// length of the longer of the two, then clips back to 16-bit range.
fn combine(drum: Waveform, song: &Waveform, song_gain_db: f64) -> Waveform {
    let scale = db_to_factor(song_gain_db);
    let mut accumulator = vec![0i32; drum.len().max(song.len())];

    for (slot, &sample) in accumulator.iter_mut().zip(&song.samples) {
        *slot += (f64::from(sample) * scale).round() as i32;
    }
    for (slot, &sample) in accumulator.iter_mut().zip(&drum.samples) {
        *slot += i32::from(sample);
    }

    let sample_rate = if drum.is_empty() {
        song.sample_rate
    } else {
        drum.sample_rate
    };
    Waveform {
        sample_rate,
        samples: clip_to_i16(&accumulator),
    }
}
