//! Walker Runtime — headless rollouts of the walker control loop.
//!
//! Drives the agent against the built-in kinematic ragdoll at the fixed
//! physics timestep, answering decision requests with a trained ONNX policy
//! or, without one, a zero or random policy. Useful for checking a policy's
//! observation/action shapes and the episode/gate/reward plumbing end to end.
//!
//! Usage:
//!   walker-runtime [--onnx-model-path policy.onnx] [OPTIONS]

use anyhow::{Context, Result};
use clap::Parser;
use nalgebra::Point3;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use walker_runtime::inference::{Policy, PolicyInference, RandomPolicy, ZeroPolicy};
use walker_runtime::runner::Rollout;
use walker_runtime::sim::MockRagdoll;
use walker_runtime::{WalkerAgent, WalkerConfig, ACTION_LEN, OBS_LEN};

/// Walker Runtime: bipedal ragdoll control loop.
#[derive(Parser, Debug)]
#[command(name = "walker-runtime")]
#[command(about = "Headless rollouts of the bipedal walker control loop")]
struct Args {
    /// Path to a trained ONNX policy. Without one a zero policy is used.
    #[arg(long)]
    onnx_model_path: Option<PathBuf>,

    /// Path to the walker configuration JSON file.
    #[arg(long, default_value = "~/walker_config.json")]
    config: PathBuf,

    /// Number of episodes to run.
    #[arg(short = 'n', long, default_value_t = 1)]
    episodes: u64,

    /// Physics ticks per episode before it is ended.
    #[arg(long, default_value_t = 5000)]
    max_steps: u64,

    /// Overrides the seed from the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Pace ticks to wall-clock time.
    #[arg(long, default_value_t = false)]
    realtime: bool,

    /// Use uniformly random actions instead of the zero policy.
    #[arg(long, default_value_t = false)]
    random_policy: bool,

    /// Distance along +Z of the walk target from the origin.
    #[arg(long, default_value_t = 20.0)]
    target_distance: f64,

    /// Write one JSON line per episode summary.
    #[arg(long)]
    summary_path: Option<PathBuf>,

    /// Time this many ONNX forward passes before the rollout.
    #[arg(long)]
    benchmark: Option<usize>,
}

fn main() -> Result<()> {
    // Initialize structured JSON logging
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config_path = expand_home(&args.config);

    tracing::info!("Walker Runtime starting");
    tracing::info!("Config: {}", config_path.display());
    tracing::info!("Observation size: {}, action size: {}", OBS_LEN, ACTION_LEN);

    let mut config = WalkerConfig::load(&config_path).context("Failed to load walker config")?;
    // One seed for the agent, the ragdoll and the random policy.
    let seed = resolve_seed(args.seed, config.seed);
    config.seed = Some(seed);
    tracing::info!("Seed: {}", seed);

    let mut policy: Box<dyn Policy> = match &args.onnx_model_path {
        Some(path) => {
            let mut onnx = PolicyInference::load(path).context("Failed to load ONNX policy")?;
            if let Some(iterations) = args.benchmark {
                onnx.benchmark(iterations)?;
            }
            Box::new(onnx)
        }
        None if args.random_policy => Box::new(RandomPolicy::new(ACTION_LEN, seed)),
        None => Box::new(ZeroPolicy::new(ACTION_LEN)),
    };

    let target = Point3::new(0.0, 0.0, args.target_distance);
    let mut agent = WalkerAgent::with_orientation_cube(config, MockRagdoll::new(seed), target)
        .context("Failed to initialize walker agent")?;

    let mut summary_out = match &args.summary_path {
        Some(path) => Some(BufWriter::new(
            File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => None,
    };

    let rollout = Rollout {
        max_ticks: args.max_steps,
        realtime: args.realtime,
    };

    tracing::info!(
        "Running {} episode(s) of {} ticks at {:.0} Hz",
        args.episodes,
        args.max_steps,
        1.0 / agent.config().fixed_timestep
    );

    for _ in 0..args.episodes {
        let summary = rollout.run_episode(&mut agent, policy.as_mut())?;

        if let Some(out) = summary_out.as_mut() {
            serde_json::to_writer(&mut *out, &summary).context("Failed to write summary")?;
            writeln!(out).context("Failed to write summary")?;
        }
    }

    if let Some(mut out) = summary_out {
        out.flush().context("Failed to flush summary file")?;
    }

    Ok(())
}

/// CLI seed over config seed, else a fresh random one.
fn resolve_seed(cli: Option<u64>, config: Option<u64>) -> u64 {
    cli.or(config).unwrap_or_else(rand::random::<u64>)
}

/// Expand `~` at the start of a path to the user's home directory.
fn expand_home(path: &PathBuf) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with("~/") {
            if let Ok(home) = std::env::var("HOME") {
                return PathBuf::from(format!("{}{}", home, &s[1..]));
            }
        }
    }
    path.clone()
}
