mod logger;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use logger::StderrLogger;
use std::path::{Path, PathBuf};
use watermark_engine::constants::is_supported_input;
use watermark_engine::{
    BatchJob, BatchOptions, CancelToken, ImageSpec, ItemStatus, MetadataToken, OutputFormat,
    PreparedProfile, Profile, TextSpec, WatermarkSpec,
};

#[derive(Parser)]
#[command(name = "wmark", about = "Batch image watermarking", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watermark images with a profile
    Apply {
        /// Profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        /// Destination directory
        #[arg(short, long)]
        output: PathBuf,

        /// Input images or directories
        #[arg(required = true, num_args = 1..)]
        inputs: Vec<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,

        /// Number of worker tasks (defaults to available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Override the profile's output format
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Override the profile's output quality (1-100)
        #[arg(long)]
        quality: Option<u8>,

        /// Strip EXIF from outputs
        #[arg(long)]
        strip_exif: bool,
    },

    /// Render a single watermarked preview without touching the source
    Preview {
        /// Profile JSON file
        #[arg(short, long)]
        profile: PathBuf,

        /// Source image
        #[arg(short, long)]
        input: PathBuf,

        /// Preview image to write
        #[arg(short, long)]
        output: PathBuf,

        /// Longest side of the preview in pixels
        #[arg(long, default_value = "1024")]
        max_side: u32,
    },

    /// Write a starter profile
    Init {
        /// Profile file to create
        output: PathBuf,

        /// Text watermark content
        #[arg(long, default_value = "© {artist} {date}")]
        text: String,

        /// Add a logo watermark from this file
        #[arg(long)]
        logo: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Validate a profile and load its fonts and logos
    Check {
        /// Profile JSON file
        profile: PathBuf,
    },

    /// List the metadata tokens usable in text watermarks
    Tokens,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Jpeg,
    Png,
    Webp,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Jpeg => Self::Jpeg,
            FormatArg::Png => Self::Png,
            FormatArg::Webp => Self::Webp,
        }
    }
}

/// Expand files and directories into a sorted list of supported images
fn collect_sources(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();
    for input in inputs {
        if input.is_dir() {
            collect_dir(input, recursive, &mut sources)?;
        } else {
            sources.push(input.clone());
        }
    }
    Ok(sources)
}

fn collect_dir(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("reading {}", dir.display()))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            if recursive {
                collect_dir(&path, recursive, out)?;
            }
        } else if is_supported_input(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn starter_profile(text: String, logo: Option<PathBuf>) -> Profile {
    let mut watermarks = vec![WatermarkSpec::Text(TextSpec::new(text))];
    if let Some(logo) = logo {
        let mut spec = ImageSpec::new(logo);
        spec.placement.anchor = watermark_engine::Anchor::TopLeft;
        watermarks.push(WatermarkSpec::Image(spec));
    }
    Profile {
        name: "starter".to_string(),
        description: Some("Generated by wmark init".to_string()),
        watermarks,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    StderrLogger::new(StderrLogger::level_for_verbosity(cli.verbose)).init()?;

    match cli.command {
        Commands::Apply {
            profile,
            output,
            inputs,
            recursive,
            workers,
            format,
            quality,
            strip_exif,
        } => {
            let mut profile = Profile::load(&profile)
                .await
                .with_context(|| format!("loading profile {}", profile.display()))?;
            if let Some(format) = format {
                profile.output.format = format.into();
            }
            if let Some(quality) = quality {
                profile.output.quality_percent = quality;
            }
            if strip_exif {
                profile.output.preserve_exif = false;
            }

            let sources = collect_sources(&inputs, recursive)?;
            if sources.is_empty() {
                bail!("no supported images found in the given inputs");
            }

            let cancel = CancelToken::new();
            let mut options = BatchOptions::default()
                .with_cancel_token(cancel.clone())
                .on_item(|result, progress| {
                    let status = match result.status {
                        ItemStatus::Success => "ok",
                        ItemStatus::Failed => "FAILED",
                        ItemStatus::Aborted => "aborted",
                    };
                    println!(
                        "[{}/{} {:>3.0}%] {:<7} {} ({:.0?})",
                        progress.completed,
                        progress.total,
                        progress.fraction() * 100.0,
                        status,
                        result.source.display(),
                        result.processing_time
                    );
                });
            if let Some(workers) = workers {
                options = options.with_workers(workers);
            }

            let handle =
                watermark_engine::run_batch(BatchJob::new(sources, profile, &output), options)
                    .await?;

            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, finishing items already being written");
                    ctrl_c.cancel();
                }
            });

            let summary = handle.wait().await?;

            println!("Batch Summary:");
            println!("  State: {:?}", summary.state);
            println!("  Total: {}", summary.total);
            println!("  Succeeded: {}", summary.succeeded);
            println!("  Failed: {}", summary.failed);
            println!("  Aborted: {}", summary.aborted);
            println!("  Elapsed: {:.2?}", summary.elapsed);
            for (kind, count) in summary.failures_by_kind() {
                println!("  {kind}: {count}");
            }
            for failed in summary
                .results
                .iter()
                .filter(|r| r.status == ItemStatus::Failed)
            {
                if let Some(error) = &failed.error {
                    eprintln!("{}: {}", failed.source.display(), error.detail);
                }
            }

            if summary.failed > 0 {
                bail!("{} of {} item(s) failed", summary.failed, summary.total);
            }
        }

        Commands::Preview {
            profile,
            input,
            output,
            max_side,
        } => {
            let profile = Profile::load(&profile).await?;
            let prepared = PreparedProfile::prepare_async(profile).await?;
            let preview = watermark_engine::render_preview(&input, prepared, max_side).await?;
            preview
                .save(&output)
                .with_context(|| format!("writing {}", output.display()))?;
            println!(
                "Preview {}x{} → {}",
                preview.width(),
                preview.height(),
                output.display()
            );
        }

        Commands::Init {
            output,
            text,
            logo,
            force,
        } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", output.display());
            }
            starter_profile(text, logo).save(&output).await?;
            println!("Wrote starter profile → {}", output.display());
        }

        Commands::Check { profile } => {
            let loaded = Profile::load(&profile).await?;
            let prepared = PreparedProfile::prepare_async(loaded).await?;
            let profile = prepared.profile();
            println!("Profile '{}' is valid", profile.name);
            for (i, spec) in profile.watermarks.iter().enumerate() {
                match spec {
                    WatermarkSpec::Text(text) => {
                        println!("  [{i}] text \"{}\" ({})", text.content, text.font)
                    }
                    WatermarkSpec::Image(image) => {
                        println!("  [{i}] image {}", image.logo_path.display())
                    }
                }
            }
            let quality = if profile.output.format.is_lossy() {
                format!("quality {}", profile.output.quality())
            } else {
                "lossless".to_string()
            };
            println!(
                "  Output: {:?}, {}, name {{stem}} → {}{{stem}}{}{}",
                profile.output.format,
                quality,
                profile.output.prefix,
                profile.output.suffix,
                profile.output.format.extension()
            );
        }

        Commands::Tokens => {
            for token in MetadataToken::ALL {
                println!("  {:<16} {}", token.to_string(), token.description());
            }
        }
    }

    Ok(())
}
