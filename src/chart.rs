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

//! The pre-parsed chart model.
//!
//! Chart parsing itself happens upstream; this module consumes the parser's
//! serialized output: one document containing a chart per difficulty course,
//! each chart holding branch-conditional segments of timestamped notes plus
//! a queue of balloon hit thresholds.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A difficulty course. One chart exists per course in a chart document.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Course {
    Easy,
    Normal,
    Hard,
    Oni,
    Ura,
}

impl Course {
    /// All courses in presentation order (hardest first).
    pub const ALL: [Course; 5] = [
        Course::Ura,
        Course::Oni,
        Course::Hard,
        Course::Normal,
        Course::Easy,
    ];
}

impl fmt::Display for Course {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Course::Easy => write!(f, "Easy"),
            Course::Normal => write!(f, "Normal"),
            Course::Hard => write!(f, "Hard"),
            Course::Oni => write!(f, "Oni"),
            Course::Ura => write!(f, "Ura"),
        }
    }
}

/// A branch within a chart. Segments tagged with a branch are only played
/// when that branch is selected; untagged segments are always played.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Branch {
    Normal,
    Expert,
    Master,
}

impl FromStr for Branch {
    type Err = UnknownBranch;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Ok(Branch::Normal),
            "expert" => Ok(Branch::Expert),
            "master" => Ok(Branch::Master),
            _ => Err(UnknownBranch(s.to_string())),
        }
    }
}

/// Error for branch names that aren't normal, expert, or master.
#[derive(Debug, thiserror::Error)]
#[error("unknown branch '{0}', expected normal, expert, or master")]
pub struct UnknownBranch(String);

/// The type of a note event as reported by the chart parser. Parser output
/// this library has no use for maps to [NoteType::Other].
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(from = "String")]
pub enum NoteType {
    Don,
    DonBig,
    Ka,
    KaBig,
    Roll,
    RollBig,
    Balloon,
    BalloonAlt,
    EndOf,
    Other,
}

impl From<String> for NoteType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Don" => NoteType::Don,
            "DonBig" => NoteType::DonBig,
            "Ka" => NoteType::Ka,
            "KaBig" => NoteType::KaBig,
            "Roll" => NoteType::Roll,
            "RollBig" => NoteType::RollBig,
            "Balloon" => NoteType::Balloon,
            "BalloonAlt" => NoteType::BalloonAlt,
            "EndOf" => NoteType::EndOf,
            _ => NoteType::Other,
        }
    }
}

/// A single timestamped note event.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Note {
    /// The type of the note.
    #[serde(rename = "type")]
    pub note_type: NoteType,
    /// When the note occurs, in seconds from the start of the course.
    #[serde(rename = "time")]
    pub timestamp: f64,
}

/// An ordered run of notes, optionally restricted to one branch.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Segment {
    /// The branch this segment belongs to. Segments without a branch play
    /// regardless of the selected branch.
    #[serde(default)]
    pub branch: Option<Branch>,
    /// The notes in this segment, in chart order.
    #[serde(default)]
    pub notes: Vec<Note>,
}

/// The chart for one course.
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Chart {
    /// The course this chart is for.
    pub course: Course,
    /// The segments of the chart, in chart order.
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Balloon hit thresholds, consumed front-to-back as balloon notes are
    /// encountered. Never mutated here; annotation works on a copy.
    #[serde(default)]
    pub balloons: Vec<u32>,
}

impl Chart {
    /// The total number of notes across all segments, branch-filtered or not.
    pub fn note_count(&self) -> usize {
        self.segments.iter().map(|segment| segment.notes.len()).sum()
    }
}

/// A chart document: the full parser output for one song.
#[derive(Deserialize, Serialize, Debug)]
struct ChartDocument {
    charts: Vec<Chart>,
}

/// Typed error for chart document load failures so callers can distinguish
/// an unreadable file from an undeserializable one.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("chart file {} could not be read: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("chart file {} could not be parsed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_yml::Error,
    },
}

/// Loads all charts from the chart document at the given path.
pub fn load_charts(path: &Path) -> Result<Vec<Chart>, ChartError> {
    let content = fs::read_to_string(path).map_err(|source| ChartError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let document: ChartDocument =
        serde_yml::from_str(&content).map_err(|source| ChartError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(document.charts)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const CHART_YAML: &str = r#"
charts:
  - course: Oni
    balloons: [3, 5]
    segments:
      - notes:
          - { type: Don, time: 0.5 }
          - { type: Ka, time: 1.0 }
      - branch: Master
        notes:
          - { type: Balloon, time: 1.5 }
          - { type: EndOf, time: 2.0 }
  - course: Easy
    segments:
      - notes:
          - { type: DonBig, time: 0.25 }
"#;

    #[test]
    fn test_load_charts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chart.yaml");
        fs::write(&path, CHART_YAML).expect("write chart");

        let charts = load_charts(&path).expect("load charts");
        assert_eq!(charts.len(), 2);

        let oni = &charts[0];
        assert_eq!(oni.course, Course::Oni);
        assert_eq!(oni.balloons, vec![3, 5]);
        assert_eq!(oni.segments.len(), 2);
        assert_eq!(oni.segments[0].branch, None);
        assert_eq!(oni.segments[1].branch, Some(Branch::Master));
        assert_eq!(oni.note_count(), 4);

        let easy = &charts[1];
        assert_eq!(easy.course, Course::Easy);
        assert!(easy.balloons.is_empty());
        assert_eq!(easy.segments[0].notes[0].note_type, NoteType::DonBig);
        assert_eq!(easy.segments[0].notes[0].timestamp, 0.25);
    }

    #[test]
    fn test_unknown_note_type_maps_to_other() {
        let yaml = r#"
charts:
  - course: Normal
    segments:
      - notes:
          - { type: Bomb, time: 0.0 }
"#;
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chart.yaml");
        fs::write(&path, yaml).expect("write chart");

        let charts = load_charts(&path).expect("load charts");
        assert_eq!(charts[0].segments[0].notes[0].note_type, NoteType::Other);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_charts(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ChartError::Read { .. })));
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chart.yaml");
        let mut file = fs::File::create(&path).expect("create file");
        file.write_all(b"charts: [not a chart").expect("write");

        let result = load_charts(&path);
        assert!(matches!(result, Err(ChartError::Parse { .. })));
    }

    #[test]
    fn test_branch_from_str() {
        assert_eq!("master".parse::<Branch>().unwrap(), Branch::Master);
        assert_eq!("Expert".parse::<Branch>().unwrap(), Branch::Expert);
        assert_eq!("NORMAL".parse::<Branch>().unwrap(), Branch::Normal);
        assert!("katsu".parse::<Branch>().is_err());
    }
}
