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

//! Runs the full pipeline once per difficulty course.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::annotate;
use crate::audio::adjust::SampleAdjuster;
use crate::audio::assets::AssetError;
use crate::audio::decoder::DecodeError;
use crate::audio::{mix, overlay, Waveform};
use crate::chart::{self, Chart, ChartError, Course};
use crate::config::{ConfigError, GenerationConfig};

/// One rendered track per difficulty course, in presentation order. Courses
/// absent from the chart document hold an empty track.
#[derive(Debug, Clone)]
pub struct CourseAudioSet {
    pub ura: Waveform,
    pub oni: Waveform,
    pub hard: Waveform,
    pub normal: Waveform,
    pub easy: Waveform,
}

impl CourseAudioSet {
    /// A set of empty tracks at the given sample rate.
    pub fn silent(sample_rate: u32) -> CourseAudioSet {
        CourseAudioSet {
            ura: Waveform::empty(sample_rate),
            oni: Waveform::empty(sample_rate),
            hard: Waveform::empty(sample_rate),
            normal: Waveform::empty(sample_rate),
            easy: Waveform::empty(sample_rate),
        }
    }

    /// The track for the given course.
    pub fn course(&self, course: Course) -> &Waveform {
        match course {
            Course::Ura => &self.ura,
            Course::Oni => &self.oni,
            Course::Hard => &self.hard,
            Course::Normal => &self.normal,
            Course::Easy => &self.easy,
        }
    }

    fn course_mut(&mut self, course: Course) -> &mut Waveform {
        match course {
            Course::Ura => &mut self.ura,
            Course::Oni => &mut self.oni,
            Course::Hard => &mut self.hard,
            Course::Normal => &mut self.normal,
            Course::Easy => &mut self.easy,
        }
    }

    /// Tracks in presentation order (hardest first).
    pub fn iter(&self) -> impl Iterator<Item = (Course, &Waveform)> {
        Course::ALL
            .into_iter()
            .map(move |course| (course, self.course(course)))
    }
}

/// Error for a generation request. Any single failure aborts the whole
/// request; four good courses and one silently broken one would be worse
/// than no output.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Renders every course of the configured chart document.
///
/// The five courses are data-independent and render in parallel; the only
/// state they share is the read-only clip cache, which is warmed up front so
/// asset problems surface once, before any fan-out.
pub fn generate(
    config: &GenerationConfig,
    adjuster: &SampleAdjuster,
) -> Result<CourseAudioSet, GenerateError> {
    config.validate()?;

    let charts = chart::load_charts(&config.chart_file)?;
    info!(
        chart_file = %config.chart_file.display(),
        charts = charts.len(),
        "chart document loaded"
    );

    adjuster.library().preload()?;

    let rendered = Course::ALL
        .into_par_iter()
        .map(|course| {
            render_course(course, &charts, config, adjuster).map(|waveform| (course, waveform))
        })
        .collect::<Result<Vec<(Course, Waveform)>, GenerateError>>()?;

    let mut music = CourseAudioSet::silent(adjuster.sample_rate());
    for (course, waveform) in rendered {
        *music.course_mut(course) = waveform;
    }
    Ok(music)
}

fn render_course(
    course: Course,
    charts: &[Chart],
    config: &GenerationConfig,
    adjuster: &SampleAdjuster,
) -> Result<Waveform, GenerateError> {
    let Some(chart) = charts.iter().find(|chart| chart.course == course) else {
        debug!(course = %course, "course not present in chart document");
        return Ok(Waveform::empty(adjuster.sample_rate()));
    };

    let events = annotate::annotate(chart, config.branch, config.hits_per_second, &config.volumes);
    info!(
        course = %course,
        notes = chart.note_count(),
        events = events.len(),
        "course annotated"
    );

    let drums = mix::mix(&events, adjuster)?;
    let track = overlay::overlay(drums, config.song_file.as_deref(), config.volumes.song)?;
    info!(course = %course, duration = ?track.duration(), "course rendered");

    Ok(track)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::audio::assets::SoundKind;
    use crate::chart::Branch;
    use crate::config::{DEFAULT_VOLUME, VolumeConfig};
    use crate::testutil;

    const CHART_YAML: &str = r#"
charts:
  - course: Oni
    segments:
      - notes:
          - { type: Don, time: 0.5 }
  - course: Easy
    segments:
      - notes:
          - { type: Ka, time: 0.0 }
"#;

    fn write_chart(yaml: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chart.yaml");
        fs::write(&path, yaml).expect("write chart");
        (dir, path)
    }

    fn test_generation_config(chart_file: PathBuf) -> GenerationConfig {
        GenerationConfig {
            chart_file,
            song_file: None,
            branch: Branch::Master,
            hits_per_second: 30,
            volumes: VolumeConfig::default(),
        }
    }

    #[test]
    fn test_generates_present_courses_only() {
        let (_assets, adjuster) = testutil::test_adjuster(8000);
        let (_chart_dir, chart_file) = write_chart(CHART_YAML);
        let config = test_generation_config(chart_file);

        let music = generate(&config, &adjuster).expect("generate");
        assert!(!music.oni.is_empty());
        assert!(!music.easy.is_empty());
        assert!(music.ura.is_empty());
        assert!(music.hard.is_empty());
        assert!(music.normal.is_empty());

        // Absent courses still carry the shared sample rate.
        assert_eq!(music.ura.sample_rate, 8000);
    }

    #[test]
    fn test_single_don_lands_at_exact_offset() {
        let (_assets, adjuster) = testutil::test_adjuster(8000);
        let (_chart_dir, chart_file) = write_chart(CHART_YAML);
        let config = test_generation_config(chart_file);

        let music = generate(&config, &adjuster).expect("generate");
        let don = adjuster
            .adjust(
                SoundKind::Don,
                mix::HIT_DURATION,
                mix::TARGET_AMPLITUDE_DBFS,
                DEFAULT_VOLUME,
            )
            .expect("adjust");

        // Half a second of leading silence, then the adjusted clip verbatim.
        let oni = &music.oni;
        assert_eq!(oni.len(), 4000 + don.len());
        assert!(oni.samples[..4000].iter().all(|&sample| sample == 0));
        assert_eq!(&oni.samples[4000..], don.samples.as_slice());
    }

    #[test]
    fn test_iter_is_in_presentation_order() {
        let music = CourseAudioSet::silent(44100);
        let order: Vec<Course> = music.iter().map(|(course, _)| course).collect();
        assert_eq!(
            order,
            vec![
                Course::Ura,
                Course::Oni,
                Course::Hard,
                Course::Normal,
                Course::Easy
            ]
        );
    }

    #[test]
    fn test_invalid_config_aborts_before_io() {
        let (_assets, adjuster) = testutil::test_adjuster(8000);
        let mut config = test_generation_config(PathBuf::from("does-not-exist.yaml"));
        config.hits_per_second = 0;

        // Config validation fires before the chart file is ever touched.
        assert!(matches!(
            generate(&config, &adjuster),
            Err(GenerateError::Config(_))
        ));
    }

    #[test]
    fn test_missing_chart_aborts() {
        let (_assets, adjuster) = testutil::test_adjuster(8000);
        let config = test_generation_config(PathBuf::from("does-not-exist.yaml"));

        assert!(matches!(
            generate(&config, &adjuster),
            Err(GenerateError::Chart(_))
        ));
    }

    #[test]
    fn test_broken_assets_abort_whole_request() {
        let dir = tempfile::tempdir().expect("tempdir");
        let adjuster = SampleAdjuster::new(crate::audio::assets::AssetLibrary::new(
            dir.path().to_path_buf(),
            8000,
        ));
        let (_chart_dir, chart_file) = write_chart(CHART_YAML);
        let config = test_generation_config(chart_file);

        assert!(matches!(
            generate(&config, &adjuster),
            Err(GenerateError::Asset(_))
        ));
    }

    #[test]
    fn test_missing_song_aborts_whole_request() {
        let (_assets, adjuster) = testutil::test_adjuster(8000);
        let (_chart_dir, chart_file) = write_chart(CHART_YAML);
        let mut config = test_generation_config(chart_file);
        config.song_file = Some(PathBuf::from("does-not-exist.mp3"));

        assert!(matches!(
            generate(&config, &adjuster),
            Err(GenerateError::Decode(_))
        ));
    }
}
