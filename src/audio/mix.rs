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

//! Sample-accurate additive mixing of trigger events into one mono buffer.

use std::time::Duration;

use tracing::debug;

use super::adjust::SampleAdjuster;
use super::assets::AssetError;
use super::Waveform;
use crate::annotate::TriggerEvent;

/// How much of a drum clip each trigger event plays.
pub const HIT_DURATION: Duration = Duration::from_millis(500);

/// The RMS loudness every drum clip is normalized to before mixing.
pub const TARGET_AMPLITUDE_DBFS: i32 = -20;

/// Mixes the trigger events into a single mono waveform.
///
/// Each event's adjusted clip is added element-wise into a wide accumulator
/// at the event's sample offset, so overlapping events sum rather than
/// overwrite and event order doesn't matter. The accumulator grows to fit
/// the latest event and is clipped to the 16-bit range at the end. An empty
/// event list produces an empty track, not an error.
pub fn mix(events: &[TriggerEvent], adjuster: &SampleAdjuster) -> Result<Waveform, AssetError> {
    if events.is_empty() {
        return Ok(Waveform::empty(adjuster.sample_rate()));
    }

    let mut accumulator: Vec<i32> = Vec::new();
    let mut sample_rate = 0;

    for event in events {
        let clip = adjuster.adjust(event.kind, HIT_DURATION, TARGET_AMPLITUDE_DBFS, event.volume)?;
        if sample_rate == 0 {
            sample_rate = clip.sample_rate;
        }

        let start = (event.timestamp * f64::from(clip.sample_rate)).round() as usize;
        add_at(&mut accumulator, start, &clip.samples);
    }

    debug!(
        events = events.len(),
        samples = accumulator.len(),
        "mixed events"
    );

    Ok(Waveform {
        sample_rate,
        samples: clip_to_i16(&accumulator),
    })
}

/// Adds a clip into the accumulator at the given sample offset. The
/// accumulator grows zero-padded when the clip runs past its current end;
/// growth never truncates samples already written.
fn add_at(accumulator: &mut Vec<i32>, offset: usize, samples: &[i16]) {
    let end = offset + samples.len();
    if accumulator.len() < end {
        accumulator.resize(end, 0);
    }

    for (slot, &sample) in accumulator[offset..end].iter_mut().zip(samples) {
        *slot += i32::from(sample);
    }
}

/// Clips accumulated samples to the valid 16-bit range.
pub(crate) fn clip_to_i16(accumulator: &[i32]) -> Vec<i16> {
    accumulator
        .iter()
        .map(|&sample| sample.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16)
        .collect()
}
