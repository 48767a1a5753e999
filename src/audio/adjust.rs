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

//! Trims, normalizes, and volume-scales drum clips for mixing.
//!
//! Adjustment is a pure function of its parameters, so results are memoized:
//! a generation request adjusts each (kind, volume) pair once no matter how
//! many thousands of trigger events reference it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;

use super::assets::{AssetError, AssetLibrary, SoundKind};
use super::Waveform;
use crate::config::DEFAULT_VOLUME;

/// Amplitude of a full-scale 16-bit sample, the 0 dBFS reference.
const FULL_SCALE: f64 = 32768.0;

/// RMS loudness of the samples in dBFS, or None for silence.
pub fn rms_dbfs(samples: &[i16]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| f64::from(sample) * f64::from(sample))
        .sum();
    let rms = (sum_squares / samples.len() as f64).sqrt();
    if rms <= 0.0 {
        return None;
    }

    Some(20.0 * (rms / FULL_SCALE).log10())
}

/// Converts a decibel gain to a linear scale factor.
pub(crate) fn db_to_factor(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Per-kind gain correction compensating for loudness differences between
/// the source clips: the percussive one-shots sit well below the sustained
/// ka tail at equal RMS.
fn kind_correction_db(kind: SoundKind) -> f64 {
    match kind {
        SoundKind::Ka => -3.0,
        SoundKind::Don
        | SoundKind::BigDon
        | SoundKind::BalloonBang
        | SoundKind::PartyPopperSuccess
        | SoundKind::PartyPopperFailure => 8.0,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct AdjustKey {
    kind: SoundKind,
    duration_ms: u128,
    target_dbfs: i32,
    volume: u8,
}

/// Produces adjusted drum clips: trimmed to a duration, normalized to a
/// target RMS loudness, and gain-scaled for a 0-10 volume slider.
pub struct SampleAdjuster {
    library: AssetLibrary,
    cache: RwLock<HashMap<AdjustKey, Arc<Waveform>>>,
}

impl SampleAdjuster {
    /// Creates a new adjuster over the given clip library.
    pub fn new(library: AssetLibrary) -> SampleAdjuster {
        SampleAdjuster {
            library,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The clip library backing this adjuster.
    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    /// The sample rate of every adjusted clip.
    pub fn sample_rate(&self) -> u32 {
        self.library.sample_rate()
    }

    /// Returns the adjusted clip for the given parameters:
    ///
    /// - truncated to `duration` from the clip start, no fade;
    /// - if the clip isn't silence, gained so its RMS loudness lands on
    ///   `target_dbfs`;
    /// - gained by `20·log10(volume / 5)` dB for the volume slider, where a
    ///   slider at zero mutes the clip entirely;
    /// - corrected per sound kind.
    pub fn adjust(
        &self,
        kind: SoundKind,
        duration: Duration,
        target_dbfs: i32,
        volume: u8,
    ) -> Result<Arc<Waveform>, AssetError> {
        let key = AdjustKey {
            kind,
            duration_ms: duration.as_millis(),
            target_dbfs,
            volume,
        };

        if let Some(clip) = self.cache.read().get(&key) {
            return Ok(clip.clone());
        }

        let clip = self.library.get(kind)?;
        debug!(kind = %kind, volume, target_dbfs, "adjusting clip");
        let adjusted = Arc::new(apply(kind, &clip, duration, target_dbfs, volume));

        let mut cache = self.cache.write();
        Ok(cache.entry(key).or_insert(adjusted).clone())
    }
}

fn apply(
    kind: SoundKind,
    clip: &Waveform,
    duration: Duration,
    target_dbfs: i32,
    volume: u8,
) -> Waveform {
    let keep = (duration.as_secs_f64() * f64::from(clip.sample_rate)).round() as usize;
    let mut samples: Vec<i16> = clip.samples.iter().take(keep).copied().collect();

    let volume_factor = f64::from(volume) / f64::from(DEFAULT_VOLUME);
    if volume_factor <= 0.0 {
        // A slider at zero is a full mute, not merely a very low gain.
        samples.fill(0);
        return Waveform {
            sample_rate: clip.sample_rate,
            samples,
        };
    }

    // Compose normalization, slider gain, and kind correction in decibels,
    // then scale in a single pass. Silence skips normalization.
    let mut gain_db = 0.0;
    if let Some(loudness) = rms_dbfs(&samples) {
        gain_db += f64::from(target_dbfs) - loudness;
    }
    gain_db += 20.0 * volume_factor.log10();
    gain_db += kind_correction_db(kind);

    let scale = db_to_factor(gain_db);
    for sample in samples.iter_mut() {
        *sample = (f64::from(*sample) * scale)
            .round()
            .clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16;
    }

    Waveform {
        sample_rate: clip.sample_rate,
        samples,
    }
}
