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

//! Generation settings: volume sliders and the per-request configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::Branch;

/// Default drum hit rate for rolls and balloon notes, in hits per second.
pub const DEFAULT_HITS_PER_SECOND: u32 = 30;

/// Default volume slider value. Volume gain is computed relative to this.
pub const DEFAULT_VOLUME: u8 = 5;

/// Maximum volume slider value.
pub const MAX_VOLUME: u8 = 10;

fn default_volume() -> u8 {
    DEFAULT_VOLUME
}

/// A YAML representation of the volume settings: one 0-10 slider for the
/// song and for each note sound. Everything defaults to [DEFAULT_VOLUME].
#[derive(Deserialize, Clone, Copy, Serialize, Debug)]
pub struct VolumeConfig {
    /// The background song.
    #[serde(default = "default_volume")]
    pub song: u8,

    /// Regular don hits.
    #[serde(default = "default_volume")]
    pub don: u8,

    /// Regular ka hits.
    #[serde(default = "default_volume")]
    pub ka: u8,

    /// Big don hits.
    #[serde(default = "default_volume")]
    pub big_don: u8,

    /// Big ka hits.
    #[serde(default = "default_volume")]
    pub big_ka: u8,

    /// Drum roll hits.
    #[serde(default = "default_volume")]
    pub roll: u8,

    /// Big drum roll hits.
    #[serde(default = "default_volume")]
    pub big_roll: u8,

    /// Balloon note hits.
    #[serde(default = "default_volume")]
    pub balloon: u8,

    /// The balloon pop sound.
    #[serde(default = "default_volume")]
    pub balloon_bang: u8,

    /// Party popper note hits.
    #[serde(default = "default_volume")]
    pub party_popper: u8,

    /// The party popper success sound.
    #[serde(default = "default_volume")]
    pub party_popper_success: u8,

    /// The party popper failure sound.
    #[serde(default = "default_volume")]
    pub party_popper_failure: u8,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        VolumeConfig {
            song: DEFAULT_VOLUME,
            don: DEFAULT_VOLUME,
            ka: DEFAULT_VOLUME,
            big_don: DEFAULT_VOLUME,
            big_ka: DEFAULT_VOLUME,
            roll: DEFAULT_VOLUME,
            big_roll: DEFAULT_VOLUME,
            balloon: DEFAULT_VOLUME,
            balloon_bang: DEFAULT_VOLUME,
            party_popper: DEFAULT_VOLUME,
            party_popper_success: DEFAULT_VOLUME,
            party_popper_failure: DEFAULT_VOLUME,
        }
    }
}

impl VolumeConfig {
    /// Loads volume settings from a YAML file. Missing fields keep their
    /// defaults.
    pub fn from_file(path: &Path) -> Result<VolumeConfig, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_yml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// All sliders with their names, for validation and display.
    pub fn sliders(&self) -> [(&'static str, u8); 12] {
        [
            ("song", self.song),
            ("don", self.don),
            ("ka", self.ka),
            ("big_don", self.big_don),
            ("big_ka", self.big_ka),
            ("roll", self.roll),
            ("big_roll", self.big_roll),
            ("balloon", self.balloon),
            ("balloon_bang", self.balloon_bang),
            ("party_popper", self.party_popper),
            ("party_popper_success", self.party_popper_success),
            ("party_popper_failure", self.party_popper_failure),
        ]
    }

    /// Verifies that every slider is within the 0-10 range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.sliders() {
            if value > MAX_VOLUME {
                return Err(ConfigError::VolumeOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// The configuration for one generation request. Constructed once, validated
/// before the pipeline starts, and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct GenerationConfig {
    /// The chart document to render.
    pub chart_file: PathBuf,
    /// The background song to overlay the drum tracks on, if any.
    pub song_file: Option<PathBuf>,
    /// The branch to render where segments diverge.
    pub branch: Branch,
    /// Drum hit rate for rolls and balloon notes. Must be greater than zero.
    pub hits_per_second: u32,
    /// The volume settings.
    pub volumes: VolumeConfig,
}

impl GenerationConfig {
    /// Verifies the configuration before any pipeline work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hits_per_second == 0 {
            return Err(ConfigError::InvalidHitsPerSecond);
        }
        self.volumes.validate()
    }
}

/// Typed error for configuration problems, all user-correctable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("hits per second must be greater than zero")]
    InvalidHitsPerSecond,

    #[error("volume '{name}' is {value}, but sliders range from 0 to 10")]
    VolumeOutOfRange { name: &'static str, value: u8 },

    #[error("volume settings {} could not be read: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("volume settings {} could not be parsed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yml::Error,
    },
}
