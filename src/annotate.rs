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

//! Expands a chart into the ordered list of drum sound triggers to mix.
//!
//! Plain hits map one-to-one to trigger events. Rolls and balloon notes
//! span multiple chart notes up to their EndOf marker and expand into a
//! series of rapid hits, which is why the scan runs on an index cursor
//! rather than a plain iterator: everything inside the span is consumed by
//! the expansion and must not be emitted again on its own.

use std::collections::VecDeque;

use crate::audio::assets::SoundKind;
use crate::chart::{Branch, Chart, Note, NoteType};
use crate::config::VolumeConfig;

/// Hit threshold used for a balloon note once the chart's threshold queue
/// has run dry.
pub const DEFAULT_BALLOON_HITS: u32 = 5;

/// One drum sound to mix: what to play, when, and how loud (0-10).
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerEvent {
    /// The sound to play.
    pub kind: SoundKind,
    /// When to play it, in seconds from the start of the course.
    pub timestamp: f64,
    /// The volume slider value for this trigger.
    pub volume: u8,
}

/// Expands the chart into trigger events for the given branch.
///
/// Events are returned in emission order, which follows chart order but is
/// not globally sorted by timestamp; mixing is offset-addressed, so order
/// doesn't matter downstream. The chart's balloon threshold queue is copied,
/// never consumed in place, so a chart can be annotated repeatedly.
pub fn annotate(
    chart: &Chart,
    branch: Branch,
    hits_per_second: u32,
    volumes: &VolumeConfig,
) -> Vec<TriggerEvent> {
    let notes: Vec<&Note> = chart
        .segments
        .iter()
        .filter(|segment| segment.branch.map_or(true, |tag| tag == branch))
        .flat_map(|segment| segment.notes.iter())
        .collect();
    let mut balloons: VecDeque<u32> = chart.balloons.iter().copied().collect();

    let mut events = Vec::new();
    let mut cursor = 0;
    while cursor < notes.len() {
        let note = notes[cursor];
        match note.note_type {
            NoteType::Don => {
                events.push(TriggerEvent {
                    kind: SoundKind::Don,
                    timestamp: note.timestamp,
                    volume: volumes.don,
                });
                cursor += 1;
            }
            NoteType::DonBig => {
                events.push(TriggerEvent {
                    kind: SoundKind::BigDon,
                    timestamp: note.timestamp,
                    volume: volumes.big_don,
                });
                cursor += 1;
            }
            NoteType::Ka | NoteType::KaBig => {
                events.push(TriggerEvent {
                    kind: SoundKind::Ka,
                    timestamp: note.timestamp,
                    volume: if note.note_type == NoteType::Ka {
                        volumes.ka
                    } else {
                        volumes.big_ka
                    },
                });
                cursor += 1;
            }
            NoteType::Roll | NoteType::RollBig => {
                let volume = if note.note_type == NoteType::Roll {
                    volumes.roll
                } else {
                    volumes.big_roll
                };
                let end = find_end_of(&notes, cursor);
                let end_time = end.map_or(note.timestamp, |(_, time)| time);

                // Hit times are computed from the hit index, not by
                // accumulating the interval, so a roll spanning exactly N
                // intervals yields exactly N hits.
                let mut hit = 0;
                loop {
                    let time = note.timestamp + f64::from(hit) / f64::from(hits_per_second);
                    if time >= end_time {
                        break;
                    }
                    events.push(TriggerEvent {
                        kind: SoundKind::Don,
                        timestamp: time,
                        volume,
                    });
                    hit += 1;
                }

                cursor = end.map_or(cursor + 1, |(index, _)| index + 1);
            }
            NoteType::Balloon | NoteType::BalloonAlt => {
                let alt = note.note_type == NoteType::BalloonAlt;
                let hit_volume = if alt {
                    volumes.party_popper
                } else {
                    volumes.balloon
                };
                let end = find_end_of(&notes, cursor);
                let end_time = end.map_or(note.timestamp, |(_, time)| time);
                let threshold = balloons.pop_front().unwrap_or(DEFAULT_BALLOON_HITS);

                let mut count = 0;
                let mut last_hit = note.timestamp;
                while count < threshold {
                    let time = note.timestamp + f64::from(count) / f64::from(hits_per_second);
                    if time >= end_time {
                        break;
                    }
                    events.push(TriggerEvent {
                        kind: SoundKind::Don,
                        timestamp: time,
                        volume: hit_volume,
                    });
                    last_hit = time;
                    count += 1;
                }

                if count >= threshold {
                    // Popped: the payoff sound lands on the final counted hit.
                    events.push(if alt {
                        TriggerEvent {
                            kind: SoundKind::PartyPopperSuccess,
                            timestamp: last_hit,
                            volume: volumes.party_popper_success,
                        }
                    } else {
                        TriggerEvent {
                            kind: SoundKind::BalloonBang,
                            timestamp: last_hit,
                            volume: volumes.balloon_bang,
                        }
                    });
                } else if alt {
                    // Only the party popper has a distinct failure sound; a
                    // plain balloon that ran out of time stays silent.
                    events.push(TriggerEvent {
                        kind: SoundKind::PartyPopperFailure,
                        timestamp: end_time,
                        volume: volumes.party_popper_failure,
                    });
                }

                cursor = end.map_or(cursor + 1, |(index, _)| index + 1);
            }
            NoteType::EndOf | NoteType::Other => {
                cursor += 1;
            }
        }
    }

    events
}

/// Finds the nearest EndOf marker after the given position in the flattened
/// note sequence. Returns its index and timestamp, or None for a roll or
/// balloon left dangling at the end of the chart.
fn find_end_of(notes: &[&Note], from: usize) -> Option<(usize, f64)> {
    notes
        .iter()
        .enumerate()
        .skip(from + 1)
        .find(|(_, note)| note.note_type == NoteType::EndOf)
        .map(|(index, note)| (index, note.timestamp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{Course, Segment};

    fn note(note_type: NoteType, timestamp: f64) -> Note {
        Note {
            note_type,
            timestamp,
        }
    }

    fn chart_with(notes: Vec<Note>, balloons: Vec<u32>) -> Chart {
        Chart {
            course: Course::Oni,
            segments: vec![Segment {
                branch: None,
                notes,
            }],
            balloons,
        }
    }

    /// Volume settings where every slider has a distinct value, so tests can
    /// verify which slider each event picked up.
    fn distinct_volumes() -> VolumeConfig {
        VolumeConfig {
            song: 0,
            don: 1,
            ka: 2,
            big_don: 3,
            big_ka: 4,
            roll: 5,
            big_roll: 6,
            balloon: 7,
            balloon_bang: 8,
            party_popper: 9,
            party_popper_success: 10,
            party_popper_failure: 0,
        }
    }

    #[test]
    fn test_plain_hits() {
        let chart = chart_with(
            vec![
                note(NoteType::Don, 0.0),
                note(NoteType::DonBig, 1.0),
                note(NoteType::Ka, 2.0),
                note(NoteType::KaBig, 3.0),
            ],
            vec![],
        );
        let volumes = distinct_volumes();

        let events = annotate(&chart, Branch::Master, 30, &volumes);
        assert_eq!(
            events,
            vec![
                TriggerEvent {
                    kind: SoundKind::Don,
                    timestamp: 0.0,
                    volume: 1
                },
                TriggerEvent {
                    kind: SoundKind::BigDon,
                    timestamp: 1.0,
                    volume: 3
                },
                TriggerEvent {
                    kind: SoundKind::Ka,
                    timestamp: 2.0,
                    volume: 2
                },
                TriggerEvent {
                    kind: SoundKind::Ka,
                    timestamp: 3.0,
                    volume: 4
                },
            ]
        );
    }

    #[test]
    fn test_branch_filtering() {
        let chart = Chart {
            course: Course::Oni,
            segments: vec![
                Segment {
                    branch: None,
                    notes: vec![note(NoteType::Don, 0.0)],
                },
                Segment {
                    branch: Some(Branch::Expert),
                    notes: vec![note(NoteType::Don, 1.0), note(NoteType::Don, 1.5)],
                },
                Segment {
                    branch: Some(Branch::Master),
                    notes: vec![note(NoteType::Ka, 2.0)],
                },
            ],
            balloons: vec![],
        };
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 30, &volumes);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, SoundKind::Don);
        assert_eq!(events[1].kind, SoundKind::Ka);

        let events = annotate(&chart, Branch::Expert, 30, &volumes);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_roll_expands_to_exact_hit_count() {
        let chart = chart_with(
            vec![note(NoteType::Roll, 0.0), note(NoteType::EndOf, 1.0)],
            vec![],
        );
        let volumes = distinct_volumes();

        let events = annotate(&chart, Branch::Master, 10, &volumes);
        assert_eq!(events.len(), 10);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.kind, SoundKind::Don);
            assert_eq!(event.volume, 5);
            assert!((event.timestamp - i as f64 * 0.1).abs() < 1e-9);
        }
        // No hit on the end marker itself.
        assert!(events.iter().all(|event| event.timestamp < 1.0));
    }

    #[test]
    fn test_big_roll_uses_big_roll_volume() {
        let chart = chart_with(
            vec![note(NoteType::RollBig, 0.0), note(NoteType::EndOf, 0.5)],
            vec![],
        );
        let volumes = distinct_volumes();

        let events = annotate(&chart, Branch::Master, 2, &volumes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].volume, 6);
    }

    #[test]
    fn test_roll_without_end_marker_yields_no_hits() {
        let chart = chart_with(
            vec![note(NoteType::Roll, 0.0), note(NoteType::Don, 1.0)],
            vec![],
        );
        let volumes = VolumeConfig::default();

        // The roll expands to nothing and the scan moves on to the don.
        let events = annotate(&chart, Branch::Master, 30, &volumes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, SoundKind::Don);
        assert_eq!(events[0].timestamp, 1.0);
    }

    #[test]
    fn test_roll_consumes_notes_inside_its_span() {
        let chart = chart_with(
            vec![
                note(NoteType::Roll, 0.0),
                note(NoteType::Don, 0.25),
                note(NoteType::EndOf, 1.0),
                note(NoteType::Ka, 2.0),
            ],
            vec![],
        );
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 2, &volumes);
        // Two roll hits (0.0, 0.5) and the trailing ka; the don inside the
        // span is not emitted on its own.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp, 0.0);
        assert_eq!(events[1].timestamp, 0.5);
        assert_eq!(events[2].kind, SoundKind::Ka);
    }

    #[test]
    fn test_balloon_pops_at_threshold() {
        let chart = chart_with(
            vec![note(NoteType::Balloon, 0.0), note(NoteType::EndOf, 1.0)],
            vec![3],
        );
        let volumes = distinct_volumes();

        let events = annotate(&chart, Branch::Master, 10, &volumes);
        assert_eq!(events.len(), 4);
        for event in &events[..3] {
            assert_eq!(event.kind, SoundKind::Don);
            assert_eq!(event.volume, 7);
        }

        let bang = &events[3];
        assert_eq!(bang.kind, SoundKind::BalloonBang);
        assert_eq!(bang.volume, 8);
        // The bang lands on the final counted hit.
        assert!((bang.timestamp - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_party_popper_success_and_failure() {
        let volumes = distinct_volumes();

        let chart = chart_with(
            vec![note(NoteType::BalloonAlt, 0.0), note(NoteType::EndOf, 1.0)],
            vec![2],
        );
        let events = annotate(&chart, Branch::Master, 10, &volumes);
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].kind, SoundKind::PartyPopperSuccess);
        assert_eq!(events[2].volume, 10);

        // Not enough time to reach the threshold: hits at 0.0 through 0.2,
        // then the failure sound when the window closes.
        let chart = chart_with(
            vec![note(NoteType::BalloonAlt, 0.0), note(NoteType::EndOf, 0.3)],
            vec![100],
        );
        let events = annotate(&chart, Branch::Master, 10, &volumes);
        assert_eq!(events.len(), 4);
        assert_eq!(events[3].kind, SoundKind::PartyPopperFailure);
        assert_eq!(events[3].timestamp, 0.3);
    }

    #[test]
    fn test_plain_balloon_fails_silently() {
        let chart = chart_with(
            vec![note(NoteType::Balloon, 0.0), note(NoteType::EndOf, 0.3)],
            vec![100],
        );
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 10, &volumes);
        // Three hits, no bang, no failure sound.
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|event| event.kind == SoundKind::Don));
    }

    #[test]
    fn test_balloon_thresholds_consumed_in_order() {
        let chart = chart_with(
            vec![
                note(NoteType::Balloon, 0.0),
                note(NoteType::EndOf, 10.0),
                note(NoteType::Balloon, 20.0),
                note(NoteType::EndOf, 30.0),
                note(NoteType::Balloon, 40.0),
                note(NoteType::EndOf, 50.0),
            ],
            vec![3, 5],
        );
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 10, &volumes);
        let bangs: Vec<&TriggerEvent> = events
            .iter()
            .filter(|event| event.kind == SoundKind::BalloonBang)
            .collect();
        let hits = events.len() - bangs.len();

        // 3 for the first note, 5 for the second, and the default for the
        // third once the queue has run dry.
        assert_eq!(bangs.len(), 3);
        assert_eq!(hits as u32, 3 + 5 + DEFAULT_BALLOON_HITS);
        // The chart itself is untouched.
        assert_eq!(chart.balloons, vec![3, 5]);
    }

    #[test]
    fn test_balloon_span_crosses_segments() {
        let chart = Chart {
            course: Course::Oni,
            segments: vec![
                Segment {
                    branch: None,
                    notes: vec![note(NoteType::Balloon, 0.0)],
                },
                Segment {
                    branch: None,
                    notes: vec![note(NoteType::EndOf, 1.0)],
                },
            ],
            balloons: vec![2],
        };
        let volumes = VolumeConfig::default();

        // The EndOf lookup runs over the flattened sequence, so the marker
        // in the next segment closes the span.
        let events = annotate(&chart, Branch::Master, 10, &volumes);
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn test_markers_and_unknown_notes_are_silent() {
        let chart = chart_with(
            vec![
                note(NoteType::EndOf, 0.0),
                note(NoteType::Other, 1.0),
                note(NoteType::Don, 2.0),
            ],
            vec![],
        );
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 30, &volumes);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 2.0);
    }

    #[test]
    fn test_hit_note_count_matches_event_count() {
        // Without rolls or balloons, events map one-to-one to hit notes.
        let chart = Chart {
            course: Course::Ura,
            segments: vec![
                Segment {
                    branch: None,
                    notes: vec![
                        note(NoteType::Don, 0.0),
                        note(NoteType::Ka, 0.5),
                        note(NoteType::Other, 0.75),
                    ],
                },
                Segment {
                    branch: Some(Branch::Normal),
                    notes: vec![note(NoteType::DonBig, 1.0)],
                },
                Segment {
                    branch: Some(Branch::Master),
                    notes: vec![note(NoteType::KaBig, 1.0), note(NoteType::Don, 1.5)],
                },
            ],
            balloons: vec![],
        };
        let volumes = VolumeConfig::default();

        let events = annotate(&chart, Branch::Master, 30, &volumes);
        assert_eq!(events.len(), 4);
    }
}
