use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use mirror_presence_core::config::presence_config::PresenceConfig;
use mirror_presence_core::detection::infrastructure::detector_factory::create_detector;
use mirror_presence_core::pipeline::pipeline_logger::LogPipelineLogger;
use mirror_presence_core::pipeline::presence_pipeline::PresencePipeline;
use mirror_presence_core::pipeline::run_presence_use_case::{
    RunOptions, RunPresenceUseCase, SessionReport,
};
use mirror_presence_core::recognition::infrastructure::recognizer_factory::create_recognizer;
use mirror_presence_core::recognition::infrastructure::reference_gallery::ReferenceGallery;
use mirror_presence_core::session::domain::event_notifier::EventNotifier;
use mirror_presence_core::session::infrastructure::push_socket_notifier::PushSocketNotifier;
use mirror_presence_core::session::infrastructure::stdout_notifier::StdoutNotifier;
use mirror_presence_core::video::domain::frame_source::FrameSource;
use mirror_presence_core::video::infrastructure::ffmpeg_source::FfmpegSource;
use mirror_presence_core::video::infrastructure::image_sequence_source::ImageSequenceSource;

/// Camera-based login/logout presence detection.
#[derive(Parser)]
#[command(name = "mirror-presence", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Watch a camera or stream and emit login/logout events.
    Run {
        /// Camera device, stream URL, video file or image directory.
        source: String,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Replay a recording and report every login/logout with its frame.
    Score {
        /// Video file or directory of images.
        input: PathBuf,

        /// Frame rate assumed for image directories.
        #[arg(long, default_value = "10.0")]
        fps: f64,

        /// Write the JSON report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// JSON config file.
    #[arg(long, short, default_value = "conf.json")]
    config: PathBuf,

    /// Log in consistently seen strangers as the unknown user.
    #[arg(long)]
    allow_strangers: bool,

    /// Run the detector on whole frames instead of motion regions.
    #[arg(long)]
    direct: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("{e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    match Cli::parse().command {
        Command::Run { source, common } => run_live(&source, &common),
        Command::Score {
            input,
            fps,
            output,
            common,
        } => run_score(&input, fps, output.as_deref(), &common),
    }
}

fn run_live(source: &str, common: &CommonArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(common)?;
    let notifiers = build_notifiers(&config)?;
    let pipeline = build_pipeline(&config, notifiers)?;

    let cancelled = Arc::new(AtomicBool::new(false));
    let flag = cancelled.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })?;

    let mut use_case = RunPresenceUseCase::new(open_source(source, 0.0), pipeline, run_options(&config))
        .with_logger(Box::new(LogPipelineLogger::default()))
        .with_cancel_flag(cancelled);
    let report = use_case.execute()?;
    log_report(&config, use_case.pipeline(), &report);
    Ok(())
}

fn run_score(
    input: &Path,
    fps: f64,
    output: Option<&Path>,
    common: &CommonArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input not found: {}", input.display()).into());
    }
    if !(fps > 0.0) {
        return Err(format!("Frame rate must be positive, got {fps}").into());
    }
    let config = load_config(common)?;
    let pipeline = build_pipeline(&config, Vec::new())?;

    let source = open_source(&input.to_string_lossy(), fps);
    let mut use_case = RunPresenceUseCase::new(source, pipeline, run_options(&config))
        .with_logger(Box::new(LogPipelineLogger::default()));
    let report = use_case.execute()?;
    log_report(&config, use_case.pipeline(), &report);

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => {
            fs::write(path, json)?;
            log::info!("Report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn load_config(common: &CommonArgs) -> Result<PresenceConfig, Box<dyn std::error::Error>> {
    let mut config = PresenceConfig::load(&common.config)?;
    if common.allow_strangers {
        config.session.allow_strangers = true;
    }
    if common.direct {
        config.detector.motion_gated = false;
    }
    Ok(config)
}

fn build_pipeline(
    config: &PresenceConfig,
    notifiers: Vec<Box<dyn EventNotifier>>,
) -> Result<PresencePipeline, Box<dyn std::error::Error>> {
    let detector = create_detector(
        config.detector.kind,
        config.detector.model_path.as_deref(),
        config.detector.confidence,
    )?;

    let gallery = ReferenceGallery::load(
        &config.recognizer.gallery_dir,
        config.recognizer.faces_per_identity,
    )?;
    log::info!(
        "Loaded {} reference identities from {}",
        gallery.len(),
        config.recognizer.gallery_dir.display()
    );
    let recognizer = create_recognizer(
        config.recognizer.kind,
        &gallery,
        config.recognizer.model_path.as_deref(),
        config.recognizer.threshold,
    )?;

    PresencePipeline::from_config(config, detector, recognizer, notifiers)
}

fn build_notifiers(
    config: &PresenceConfig,
) -> Result<Vec<Box<dyn EventNotifier>>, Box<dyn std::error::Error>> {
    let mut notifiers: Vec<Box<dyn EventNotifier>> = Vec::new();
    if config.notifiers.stdout {
        notifiers.push(Box::new(StdoutNotifier::new()));
    }
    if let Some(address) = &config.notifiers.push_address {
        notifiers.push(Box::new(PushSocketNotifier::new(address)?));
        log::info!("Pushing events to {address}");
    }
    if notifiers.is_empty() {
        log::warn!("No notifiers configured; events will only be logged");
    }
    Ok(notifiers)
}

fn run_options(config: &PresenceConfig) -> RunOptions {
    RunOptions::from_settings(config.motion.processing_width, &config.processing_loop)
}

fn open_source(location: &str, fps: f64) -> Box<dyn FrameSource> {
    let path = Path::new(location);
    if ImageSequenceSource::accepts(path) {
        Box::new(ImageSequenceSource::new(path, fps))
    } else {
        Box::new(FfmpegSource::new(location))
    }
}

fn log_report(config: &PresenceConfig, pipeline: &PresencePipeline, report: &SessionReport) {
    for record in &report.events {
        let name = config.display_name(record.event.user(), pipeline.identity_names());
        log::info!("Frame {:>6}: {} {name}", record.frame, record.event.kind());
    }
    if let Some(user) = report.logged_in_at_end {
        let name = config.display_name(user, pipeline.identity_names());
        log::info!("{name} was still logged in at the end");
    }
}
