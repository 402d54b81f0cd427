//! sonify CLI: hear mathematical functions.
//!
//! Usage:
//!   sonify eval "sin(3t)+1" --t 2
//!   sonify info session.json
//!   sonify render session.json --wav out.wav
//!   sonify play session.json
//!   sonify new session.json "t" 0 5 "t^2" 5 10

use std::io::Write;
use std::path::{Path, PathBuf};
use std::{fs, process};

use clap::{Parser, Subcommand};
use sn_engine::{PitchMap, SynthConfig};
use sn_formats::{FunctionRecord, SessionFile};
use sn_master::{Controller, RenderConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sonify", version, about = "Hear mathematical functions of time")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Fade length at segment boundaries, in seconds.
    #[arg(long, global = true, default_value_t = sn_engine::DEFAULT_FADE_SECONDS)]
    fade: f64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an expression and show the pitch it maps to.
    Eval {
        expr: String,
        /// Value bound to `t`.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        t: f64,
    },
    /// List the segments of a session with their preview tables.
    Info { session: PathBuf },
    /// Render a session offline to a WAV file.
    Render {
        session: PathBuf,
        #[arg(long)]
        wav: PathBuf,
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
        /// Stop rendering after this many seconds.
        #[arg(long, default_value_t = 600)]
        max_seconds: u32,
    },
    /// Play a session on the default audio device.
    Play { session: PathBuf },
    /// Write a session file from `<expr> <start> <end>` triples.
    New {
        out: PathBuf,
        #[arg(required = true, num_args = 3.., allow_hyphen_values = true, value_name = "EXPR START END")]
        segments: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = SynthConfig {
        fade_seconds: cli.fade.max(0.0),
        ..SynthConfig::default()
    };

    match cli.command {
        Command::Eval { expr, t } => eval(&expr, t),
        Command::Info { session } => info(&load(&session, config)),
        Command::Render {
            session,
            wav,
            sample_rate,
            max_seconds,
        } => {
            let render = RenderConfig {
                sample_rate,
                max_seconds,
                ..RenderConfig::default()
            };
            render_to_wav(&load(&session, config), &wav, &render)
        }
        Command::Play { session } => play_audio(&mut load(&session, config)),
        Command::New { out, segments } => new_session(&out, &segments),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn load(path: &Path, config: SynthConfig) -> Controller {
    let json = fs::read_to_string(path).unwrap_or_else(|e| fail(format!("Failed to read {}: {}", path.display(), e)));
    let mut ctrl = Controller::with_config(config);
    ctrl.load_session(&json)
        .unwrap_or_else(|e| fail(format!("Failed to load {}: {}", path.display(), e)));
    tracing::debug!(path = %path.display(), segments = ctrl.timeline().len(), "session loaded");
    ctrl
}

fn eval(text: &str, t: f64) {
    let expr = sn_formats::parse(text).unwrap_or_else(|e| fail(format!("Parse error: {}", e)));
    let value = sn_ir::evaluate_at_t(&expr, t).unwrap_or_else(|e| fail(format!("Evaluation error: {}", e)));
    let pitch = PitchMap::default();

    println!("LaTeX:     {}", expr.to_latex());
    println!("f({}) =    {}", t, value);
    match (pitch.key_index(value), pitch.frequency_of(value)) {
        (Some(key), Some(freq)) => {
            println!("Key:       {:.3}", key);
            println!("Frequency: {:.2} Hz", freq);
        }
        _ => println!("Frequency: (silent)"),
    }
}

fn info(ctrl: &Controller) {
    let timeline = ctrl.timeline();
    println!("Segments: {}", timeline.len());
    println!("Run time: {} s", timeline.run_time());

    for (index, (_, segment)) in timeline.iter().enumerate() {
        println!();
        println!("#{} {} (at {} s)", index, segment, timeline.offset_of(index));
        println!("  LaTeX: {}", segment.expr().to_latex());
        for point in segment.preview() {
            match point.frequency {
                Some(freq) => println!("  t={:>4}  f={:>12.4}  {:>9.2} Hz", point.time, point.value, freq),
                None => println!("  t={:>4}  f={:>12.4}  silent", point.time, point.value),
            }
        }
    }
}

fn play_audio(ctrl: &mut Controller) {
    ctrl.play().unwrap_or_else(|e| fail(format!("Failed to start playback: {}", e)));
    println!("Playing...");
    println!();

    while !ctrl.is_finished() {
        if let Some(pos) = ctrl.position() {
            let segment = ctrl
                .current_segment()
                .map_or_else(|| "--".to_string(), |i| format!("{:02}", i));
            print!("\rSeg: {} | Time: {:7.2} s", segment, pos);
            let _ = std::io::stdout().flush();
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    ctrl.stop();

    println!("\rDone.                          ");
}

fn render_to_wav(ctrl: &Controller, path: &Path, config: &RenderConfig) {
    println!("Rendering to {} at {} Hz...", path.display(), config.sample_rate);

    let wav = ctrl
        .render_to_wav(config)
        .unwrap_or_else(|e| fail(format!("Render failed: {}", e)));
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).unwrap_or_else(|e| fail(format!("Failed to write {}: {}", path.display(), e)));

    println!("Done.");
}

fn new_session(out: &Path, args: &[String]) {
    if args.len() % 3 != 0 {
        fail("Segments are given as <expr> <start> <end> triples");
    }

    let mut records = Vec::with_capacity(args.len() / 3);
    for (index, triple) in args.chunks_exact(3).enumerate() {
        let text = &triple[0];
        let bound = |s: &str| {
            s.parse::<i32>()
                .unwrap_or_else(|e| fail(format!("Segment {}: bad time '{}': {}", index, s, e)))
        };
        let (start, end) = (bound(&triple[1]), bound(&triple[2]));
        sn_formats::parse_function(text).unwrap_or_else(|e| fail(format!("Segment {}: {}", index, e)));
        if start >= end {
            fail(format!("Segment {}: start {} must be before end {}", index, start, end));
        }
        records.push(FunctionRecord::new(text, start, end));
    }

    let json = sn_formats::save_session(&SessionFile::from_records(records))
        .unwrap_or_else(|e| fail(format!("Failed to encode session: {}", e)));
    fs::write(out, json).unwrap_or_else(|e| fail(format!("Failed to write {}: {}", out.display(), e)));
    println!("Wrote {} segments to {}", args.len() / 3, out.display());
}
