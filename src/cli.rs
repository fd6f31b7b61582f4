use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Shared subtitles directory (overrides storage.subtitles_dir)
    #[arg(long, global = true)]
    pub subtitles_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate subtitles and language metadata for a single video
    Generate {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory (defaults to the subtitles directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Generate subtitles for every video in a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Output directory (defaults to the subtitles directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Extract recognizer-ready audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe an audio file to WebVTT
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Translate a generated subtitle to English and store it
    Translate {
        /// Base filename of the video
        #[arg(short, long)]
        base: String,

        /// Source language code (defaults to the one recorded in <base>.json)
        #[arg(short, long)]
        source_lang: Option<String>,
    },

    /// Print the subtitle record the viewing page would render
    Info {
        /// Video URL or path as stored on the course
        #[arg(long)]
        video_url: Option<String>,
    },

    /// Manage cached English translations
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Show the whisper.cpp model status
    Models {
        /// Download the model when missing
        #[arg(long)]
        download: bool,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// List cached translations
    List,

    /// Delete all cached translations
    Clear,

    /// Invalidate the cached translation of one video
    Remove {
        /// Base filename of the video
        #[arg(short, long)]
        base: String,
    },
}
