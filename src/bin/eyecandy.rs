use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "eyecandy", version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the stimulus sequence without encoding and print a summary.
    Compile(RunArgs),
    /// Record a program to MP4 (requires `ffmpeg` on PATH).
    Record(RunArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Stimulus program JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Run configuration JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    #[arg(long)]
    fps: Option<u32>,

    /// Stop generating after this many seconds of stimuli.
    #[arg(long)]
    limit: Option<f64>,

    /// Directory that receives `<name>/`.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Run name; defaults to the program file stem.
    #[arg(long)]
    name: Option<String>,

    /// Do not write `.stim`, `.info.json` and `.program.json`.
    #[arg(long)]
    no_artifacts: bool,

    /// Pace frame production at the configured fps.
    #[arg(long)]
    realtime: bool,

    #[arg(long)]
    ffmpeg: Option<PathBuf>,

    /// Rayon worker threads used for drawing.
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Compile(args) => cmd_compile(args),
        Command::Record(args) => cmd_record(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &RunArgs) -> anyhow::Result<eyecandy::RunConfig> {
    let stem = args
        .in_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "program".to_owned());

    let defaults = eyecandy::RunConfig::default();
    let mut cfg = match &args.config {
        Some(path) => eyecandy::RunConfig::from_json_file(path)?,
        None => defaults.clone(),
    };
    // Names the config leaves at their defaults follow the program file.
    if cfg.program_name == defaults.program_name {
        cfg.program_name = stem.clone();
    }
    if cfg.output_name == defaults.output_name {
        cfg.output_name = stem;
    }
    if let Some(v) = args.seed {
        cfg.seed = v;
    }
    if let Some(v) = args.width {
        cfg.width = v;
    }
    if let Some(v) = args.height {
        cfg.height = v;
    }
    if let Some(v) = args.fps {
        cfg.fps = v;
    }
    if let Some(v) = args.limit {
        cfg.limit_seconds = v;
    }
    if let Some(v) = &args.out_dir {
        cfg.output_root = v.clone();
    }
    if let Some(v) = &args.name {
        cfg.output_name = v.clone();
    }
    if let Some(v) = &args.ffmpeg {
        cfg.ffmpeg_path = v.clone();
    }
    if args.threads.is_some() {
        cfg.render_threads = args.threads;
    }
    if args.no_artifacts {
        cfg.save_stimuli = false;
    }
    if args.realtime {
        cfg.realtime = true;
    }
    Ok(cfg)
}

fn read_program(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read program '{}'", path.display()))
}

fn run(
    args: &RunArgs,
    cfg: &eyecandy::RunConfig,
    encoder: Box<dyn eyecandy::VideoEncoder>,
) -> anyhow::Result<eyecandy::RunOutcome> {
    let source = read_program(&args.in_path)?;
    let controller = eyecandy::RunController::new(
        Arc::new(eyecandy::DeclarativeHost),
        encoder,
        Arc::new(eyecandy::TracingNotifier),
    );
    let runner = eyecandy::Runner::new(controller);
    let image_root = args.in_path.parent().unwrap_or_else(|| Path::new("."));
    Ok(runner.run(cfg, &source, image_root)?)
}

fn cmd_compile(args: RunArgs) -> anyhow::Result<()> {
    let mut cfg = load_config(&args)?;
    cfg.compile_only = true;
    match run(&args, &cfg, Box::new(eyecandy::InMemoryEncoder::default()))? {
        eyecandy::RunOutcome::DryRunCompleted {
            stimuli,
            duration_secs,
        } => {
            let fps = eyecandy::Fps::new(cfg.fps)?;
            println!("{}", eyecandy::format_duration(stimuli, duration_secs));
            println!(
                "expected frames: {} at {} fps",
                eyecandy::expected_frame_count(duration_secs, fps),
                cfg.fps
            );
            Ok(())
        }
        other => anyhow::bail!("compile did not finish: {other:?}"),
    }
}

fn cmd_record(args: RunArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let encoder = eyecandy::FfmpegEncoder::new(eyecandy::FfmpegEncoderOpts {
        ffmpeg_path: cfg.ffmpeg_path.clone(),
        video_codec: cfg.video_codec.clone(),
    });
    match run(&args, &cfg, Box::new(encoder))? {
        eyecandy::RunOutcome::Completed { frames, output } => {
            eprintln!("wrote {} ({frames} frames)", output.display());
            Ok(())
        }
        eyecandy::RunOutcome::DryRunCompleted { .. } => {
            eprintln!("nothing to record");
            Ok(())
        }
        eyecandy::RunOutcome::Cancelled => anyhow::bail!("run cancelled"),
        eyecandy::RunOutcome::Failed { kind, message } => anyhow::bail!("{kind}: {message}"),
    }
}
