//! Lectern - subtitle generation and on-demand English translation
//!
//! Command-line entry point: generates `<base>.vtt` / `<base>.json` pairs
//! offline and manages the cached English translations served to viewers.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use lectern::cli::{Args, CacheAction, Commands};
use lectern::config::Config;
use lectern::setup::{ModelInfo, SetupManager};
use lectern::translate::EnglishSubtitle;
use lectern::workflow::Workflow;

const DEFAULT_CONFIG_FILE: &str = "lectern.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new(DEFAULT_CONFIG_FILE).exists() {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Config::from_file(DEFAULT_CONFIG_FILE)?
            } else {
                Config::default()
            }
        }
    };

    if let Some(dir) = &args.subtitles_dir {
        config.storage.subtitles_dir = dir.clone();
    }

    match args.command {
        Commands::Models { download } => {
            let setup_manager = SetupManager::new(&config.transcriber.models_dir)?;
            let model = ModelInfo::fixed();
            let status = if setup_manager.model_exists(&model) {
                "Downloaded"
            } else {
                "Missing"
            };

            println!("\nWhisper model:");
            println!("{:<10} {:<20} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
            println!("{}", "-".repeat(55));
            println!("{:<10} {:<20} {:<10.1} {:<10}", model.name, model.filename, model.size_mb, status);

            if download {
                let path = setup_manager.ensure_model().await?;
                println!("Model available at {}", path.display());
            }
        }
        Commands::Generate { input, output_dir } => {
            let workflow = Workflow::new(config)?;
            let artifacts = workflow.generate_single(&input, output_dir.as_deref()).await?;
            println!(
                "Generated {} ({} cues, {}) and {}",
                artifacts.subtitle_path.display(),
                artifacts.cue_count,
                artifacts.metadata.language_name,
                artifacts.metadata_path.display()
            );
        }
        Commands::Batch { input_dir, output_dir } => {
            let workflow = Workflow::new(config)?;
            let summary = workflow.process_directory(&input_dir, output_dir.as_deref()).await?;

            println!(
                "Processed {} videos: {} succeeded, {} failed",
                summary.total(),
                summary.generated.len(),
                summary.failed.len()
            );
            for (path, error) in &summary.failed {
                println!("  {}: {}", path.display(), error);
            }
        }
        Commands::Extract { input, output } => {
            let workflow = Workflow::new(config)?;
            workflow.extract_audio(&input, &output).await?;
            println!("Audio written to {}", output.display());
        }
        Commands::Transcribe { input, output } => {
            let workflow = Workflow::new(config)?;
            let transcription = workflow.transcribe_audio(&input, &output).await?;
            println!(
                "Wrote {} cues ({}) to {}",
                transcription.segments.len(),
                transcription.language,
                output.display()
            );
        }
        Commands::Translate { base, source_lang } => {
            let workflow = Workflow::new(config)?;
            let report = workflow.translate(&base, source_lang.as_deref()).await?;

            match &report.outcome {
                EnglishSubtitle::Cached(name) => println!("Already cached: {}", name),
                EnglishSubtitle::Translated(name) => println!(
                    "Translated {} cues into {}",
                    report.cue_count.unwrap_or_default(),
                    name
                ),
                EnglishSubtitle::NotNeeded => println!("{} is already English", base),
                EnglishSubtitle::Unavailable(reason) => {
                    anyhow::bail!("English subtitle unavailable for {}: {}", base, reason)
                }
            }
        }
        Commands::Info { video_url } => {
            let workflow = Workflow::new(config)?;
            let info = workflow.subtitle_info(video_url.as_deref()).await;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Cache { action } => {
            let workflow = Workflow::new(config)?;
            let cache = workflow.cache();

            match action {
                CacheAction::List => {
                    let items = cache.list().await?;
                    if items.is_empty() {
                        println!("No cached translations found.");
                    } else {
                        println!("\nCached Translations:");
                        println!("{:<40} {:<12} {:<20}", "Video", "Size", "Cached");
                        println!("{}", "-".repeat(72));
                        for item in items {
                            let cached = item
                                .modified
                                .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
                                .unwrap_or_else(|| "unknown".to_string());
                            println!("{:<40} {:<12} {:<20}", item.base, format_size(item.size), cached);
                        }
                    }
                }
                CacheAction::Clear => {
                    let removed = cache.clear().await?;
                    println!("Removed {} cached translations", removed);
                }
                CacheAction::Remove { base } => {
                    if cache.remove(&base).await? {
                        println!("Removed cached translation for {}", base);
                    } else {
                        println!("No cached translation for {}", base);
                    }
                }
            }
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".lectern").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "lectern.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("lectern.log").display());

    Ok(())
}

/// Format a byte count as a human readable size
fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
