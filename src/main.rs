use clap::Parser;
use judgeline::config;
use judgeline::core::audio::LogSoundPlayer;
use judgeline::core::draw_queue::DrawQueue;
use judgeline::game::chart::Chart;
use judgeline::game::frame::{self, DrawCommand, FrameSnapshot};
use serde::Serialize;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Samples a chart at chosen chart times and prints each frame as JSON.
#[derive(Parser, Debug)]
#[command(name = "judgeline", version, about)]
struct Args {
    /// RPE-style chart JSON file.
    chart: PathBuf,

    /// Chart time in seconds to sample; may be repeated.
    #[arg(long = "at")]
    at: Vec<f64>,

    /// Start of a sampled range (seconds).
    #[arg(long, requires_all = ["to", "step"])]
    from: Option<f64>,

    #[arg(long)]
    to: Option<f64>,

    #[arg(long)]
    step: Option<f64>,

    /// Options file, `judgeline.ini` in the working directory by default.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Leave notes unhit instead of auto-playing them.
    #[arg(long)]
    no_autoplay: bool,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame: &'a FrameSnapshot,
    draws: Vec<DrawCommand>,
    failed_draws: usize,
}

impl Args {
    fn sample_times(&self) -> Vec<f64> {
        let mut times = self.at.clone();
        if let (Some(from), Some(to), Some(step)) = (self.from, self.to, self.step) {
            if step > 0.0 {
                let mut k = 0u64;
                loop {
                    let t = from + k as f64 * step;
                    if t > to {
                        break;
                    }
                    times.push(t);
                    k += 1;
                }
            } else {
                log::warn!("Ignoring range with non-positive step {step}.");
            }
        }
        if times.is_empty() {
            times.push(0.0);
        }
        times
    }
}

fn load_chart(path: &Path) -> judgeline::Result<Chart> {
    let text = std::fs::read_to_string(path)?;
    let mut chart: Chart = serde_json::from_str(&text)?;
    chart.prepare();
    Ok(chart)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    let args = Args::parse();
    match &args.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    }
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let mut engine = cfg.engine();
    if args.no_autoplay {
        engine.autoplay = false;
    }

    let mut chart = load_chart(&args.chart).map_err(|e| {
        log::error!("Failed to load chart '{}': {e}", args.chart.display());
        e
    })?;
    for cycle_line in chart.detect_father_cycles() {
        log::warn!("Judge line {cycle_line} is part of a father cycle.");
    }

    let mut sounds = LogSoundPlayer::new();
    for t in args.sample_times() {
        let snapshot = frame::build(&mut chart, t, &engine, &mut sounds)?;
        let out = RefCell::new(Vec::new());
        let failed_draws = {
            let mut queue = DrawQueue::new();
            frame::enqueue_draws(&mut queue, &snapshot, &out)?;
            queue.run()
        };
        let output = FrameOutput { frame: &snapshot, draws: out.into_inner(), failed_draws };
        println!("{}", serde_json::to_string(&output)?);
    }
    log::info!("Played {} hit sounds.", sounds.total());
    Ok(())
}
