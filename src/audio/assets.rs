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

//! The fixed drum sound clips, decoded once and cached in memory.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::decoder::{self, DecodeError};
use super::Waveform;

/// The sample rate clips are resampled to when nothing else is requested.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// The sound a trigger event plays. Each kind maps to one fixed clip file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SoundKind {
    Don,
    Ka,
    BigDon,
    BalloonBang,
    PartyPopperSuccess,
    PartyPopperFailure,
}

impl SoundKind {
    /// All sound kinds.
    pub const ALL: [SoundKind; 6] = [
        SoundKind::Don,
        SoundKind::Ka,
        SoundKind::BigDon,
        SoundKind::BalloonBang,
        SoundKind::PartyPopperSuccess,
        SoundKind::PartyPopperFailure,
    ];

    /// The clip file name for this kind within the asset directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            SoundKind::Don => "Don.wav",
            SoundKind::Ka => "Ka.wav",
            SoundKind::BigDon => "BigDon.wav",
            SoundKind::BalloonBang => "Balloon.wav",
            SoundKind::PartyPopperSuccess => "PartyPopperSuccess.wav",
            SoundKind::PartyPopperFailure => "PartyPopperFailure.wav",
        }
    }
}

impl fmt::Display for SoundKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundKind::Don => write!(f, "Don"),
            SoundKind::Ka => write!(f, "Ka"),
            SoundKind::BigDon => write!(f, "BigDon"),
            SoundKind::BalloonBang => write!(f, "BalloonBang"),
            SoundKind::PartyPopperSuccess => write!(f, "PartyPopperSuccess"),
            SoundKind::PartyPopperFailure => write!(f, "PartyPopperFailure"),
        }
    }
}

/// Error for clip loading. These indicate a broken asset bundle rather than
/// bad user input, and abort the whole generation.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("sound clip {kind} not found at {}", .path.display())]
    Missing { kind: SoundKind, path: PathBuf },

    #[error("sound clip {kind} at {} could not be decoded: {source}", .path.display())]
    Undecodable {
        kind: SoundKind,
        path: PathBuf,
        source: DecodeError,
    },
}

/// Loads and caches the fixed drum sound clips.
///
/// Each clip is decoded from disk at most once and resampled to the target
/// sample rate, so every clip handed out shares one rate. The cache is safe
/// to read from concurrent course pipelines.
pub struct AssetLibrary {
    /// The directory containing the clip files.
    dir: PathBuf,
    /// The sample rate every clip is resampled to.
    target_sample_rate: u32,
    /// Decoded clips by kind.
    cache: RwLock<HashMap<SoundKind, Arc<Waveform>>>,
}

impl AssetLibrary {
    /// Creates a new library over the given clip directory. No files are
    /// touched until a clip is requested.
    pub fn new(dir: PathBuf, target_sample_rate: u32) -> AssetLibrary {
        AssetLibrary {
            dir,
            target_sample_rate,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The sample rate all clips share.
    pub fn sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Returns the decoded clip for the given kind, loading it on first use.
    pub fn get(&self, kind: SoundKind) -> Result<Arc<Waveform>, AssetError> {
        if let Some(clip) = self.cache.read().get(&kind) {
            return Ok(clip.clone());
        }

        let clip = Arc::new(self.load(kind)?);
        let mut cache = self.cache.write();
        Ok(cache.entry(kind).or_insert(clip).clone())
    }

    /// Loads every clip, so later cache reads can't fail. Called before
    /// course pipelines fan out.
    pub fn preload(&self) -> Result<(), AssetError> {
        for kind in SoundKind::ALL {
            self.get(kind)?;
        }
        Ok(())
    }

    fn load(&self, kind: SoundKind) -> Result<Waveform, AssetError> {
        let path = self.dir.join(kind.file_name());

        let decoded = match decoder::decode_file(&path) {
            Ok(decoded) => decoded,
            Err(source) => {
                error!(
                    kind = %kind,
                    path = %path.display(),
                    "failed to load sound clip; the asset bundle is broken, not the chart"
                );
                return Err(match source {
                    DecodeError::NotFound(_) => AssetError::Missing { kind, path },
                    source => AssetError::Undecodable { kind, path, source },
                });
            }
        };

        let clip = if decoded.sample_rate == self.target_sample_rate {
            decoded
        } else {
            debug!(
                kind = %kind,
                source_rate = decoded.sample_rate,
                target_rate = self.target_sample_rate,
                "resampling clip"
            );
            Waveform {
                sample_rate: self.target_sample_rate,
                samples: resample_linear(
                    &decoded.samples,
                    decoded.sample_rate,
                    self.target_sample_rate,
                ),
            }
        };

        info!(
            kind = %kind,
            sample_rate = clip.sample_rate,
            samples = clip.len(),
            "sound clip loaded"
        );
        Ok(clip)
    }
}

impl fmt::Debug for AssetLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetLibrary")
            .field("dir", &self.dir)
            .field("target_sample_rate", &self.target_sample_rate)
            .field("cached_clips", &self.cache.read().len())
            .finish()
    }
}

/// Resamples mono samples from one rate to another using linear
/// interpolation. Plenty for one-shot drum hits.
fn resample_linear(samples: &[i16], source_rate: u32, target_rate: u32) -> Vec<i16> {
    let ratio = target_rate as f64 / source_rate as f64;
    let target_frames = (samples.len() as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract();

        let s0 = samples.get(source_frame).copied().unwrap_or(0);
        let s1 = samples.get(source_frame + 1).copied().unwrap_or(s0);

        let interpolated = f64::from(s0) + (f64::from(s1) - f64::from(s0)) * frac;
        output.push(interpolated.round() as i16);
    }

    output
}
