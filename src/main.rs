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
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use tjamix::audio::adjust::SampleAdjuster;
use tjamix::audio::assets::{AssetLibrary, DEFAULT_SAMPLE_RATE};
use tjamix::chart::{self, Branch, Course};
use tjamix::config::{self, GenerationConfig, VolumeConfig};
use tjamix::{audio, generate};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Renders taiko charts into mixed audio tracks."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the courses found in a chart document.
    Courses {
        /// The path to the chart document.
        chart_path: String,
    },
    /// Renders one mixed audio track per course in a chart document.
    Generate {
        /// The path to the chart document.
        chart_path: String,
        /// The background song to overlay the drum tracks on (ogg or mp3).
        #[arg(short, long)]
        song: Option<String>,
        /// The branch to render: normal, expert, or master.
        #[arg(short, long, default_value = "master")]
        branch: String,
        /// Drum hits per second for rolls and balloon notes.
        #[arg(long, default_value_t = config::DEFAULT_HITS_PER_SECOND)]
        hits_per_second: u32,
        /// A YAML file of 0-10 volume settings.
        #[arg(long)]
        volumes: Option<String>,
        /// The directory containing the drum sound clips.
        #[arg(long, default_value = "assets/sound")]
        assets: String,
        /// The directory to write the rendered WAV files to.
        #[arg(short, long, default_value = ".")]
        output: String,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Courses { chart_path } => {
            let charts = chart::load_charts(Path::new(&chart_path))?;

            if charts.is_empty() {
                println!("No courses found in {}.", chart_path.as_str());
                return Ok(());
            }

            println!("Courses (count: {}):", charts.len());
            for course in Course::ALL {
                if let Some(chart) = charts.iter().find(|chart| chart.course == course) {
                    println!(
                        "- {} ({} notes, {} segments, {} balloons)",
                        course,
                        chart.note_count(),
                        chart.segments.len(),
                        chart.balloons.len()
                    );
                }
            }
        }
        Commands::Generate {
            chart_path,
            song,
            branch,
            hits_per_second,
            volumes,
            assets,
            output,
        } => {
            let branch: Branch = branch.parse()?;
            let volumes = match volumes {
                Some(path) => VolumeConfig::from_file(Path::new(&path))?,
                None => VolumeConfig::default(),
            };

            let config = GenerationConfig {
                chart_file: PathBuf::from(chart_path),
                song_file: song.map(PathBuf::from),
                branch,
                hits_per_second,
                volumes,
            };

            let library = AssetLibrary::new(PathBuf::from(assets), DEFAULT_SAMPLE_RATE);
            let adjuster = SampleAdjuster::new(library);
            let music = generate::generate(&config, &adjuster)?;

            fs::create_dir_all(&output)?;
            for (course, waveform) in music.iter() {
                if waveform.is_empty() {
                    continue;
                }

                let path =
                    Path::new(&output).join(format!("{}.wav", course.to_string().to_lowercase()));
                fs::write(&path, audio::encode_wav(waveform)?)?;

                let secs = waveform.duration().as_secs();
                println!("- {} ({}:{:02})", path.display(), secs / 60, secs % 60);
            }
        }
    }

    Ok(())
}
