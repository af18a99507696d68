//! Command-line entry point: decode the target, build or resume a model,
//! run the optimizer and write the requested outputs.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use log::info;

use polytrace::engine::{CommitOrder, FitnessMode, Model, Optimizer, RunConfig};
use polytrace::export;

#[derive(Parser, Debug)]
#[command(name = "polytrace")]
#[command(about = "Approximate an image with semi-transparent polygons", long_about = None)]
struct Args {
    /// Input image path
    #[arg(short, long)]
    input: PathBuf,

    /// Output path; repeat for several. Format follows the extension (.png, .svg, .json)
    #[arg(short, long = "output", required = true)]
    outputs: Vec<PathBuf>,

    /// Number of polygons
    #[arg(short, long)]
    polygons: Option<usize>,

    /// Number of iterations
    #[arg(short = 'n', long)]
    iterations: Option<u64>,

    /// Number of workers
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Downscale inputs larger than this (0 keeps the original size)
    #[arg(short = 'r', long)]
    max_size: Option<u32>,

    /// Random seed; defaults to the clock unless a config file sets one
    #[arg(long)]
    seed: Option<u64>,

    /// JSON run configuration; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Continue from a JSON snapshot written by an earlier run
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Log progress every N iterations
    #[arg(long)]
    log_every: Option<u64>,

    /// Apply concurrent trials in iteration order (reproducible)
    #[arg(long, default_value_t = false)]
    ordered: bool,

    /// Score with the legacy every-third-byte stride
    #[arg(long, default_value_t = false)]
    legacy_fitness: bool,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig, Box<dyn std::error::Error>> {
        let mut cfg = match &self.config {
            Some(path) => export::load_run_config(path)?,
            None => RunConfig::default(),
        };
        if let Some(p) = self.polygons {
            cfg.model.polygons = p;
        }
        if let Some(n) = self.iterations {
            cfg.optimizer.iterations = n;
        }
        if let Some(c) = self.concurrency {
            cfg.optimizer.concurrency = c;
        }
        if let Some(r) = self.max_size {
            cfg.max_image_size = r;
        }
        if let Some(k) = self.log_every {
            cfg.optimizer.log_every = k;
        }
        match self.seed {
            Some(s) => cfg.model.seed = s,
            None if self.config.is_none() => cfg.model.seed = clock_seed(),
            None => {}
        }
        if self.ordered {
            cfg.optimizer.commit_order = CommitOrder::TokenOrder;
        }
        if self.legacy_fitness {
            cfg.fitness = FitnessMode::LegacyStride;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn clock_seed() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    if args.outputs.iter().any(|o| *o == args.input) {
        return Err("input and output are the same file".into());
    }
    let cfg = args.run_config()?;

    let target = export::load_target(&args.input, cfg.max_image_size)?;
    info!("target {}x{}", target.width(), target.height());

    let mut model = match &args.resume {
        Some(path) => {
            let snapshot = export::load_snapshot(path)?;
            info!("resuming {} at iteration {}", path.display(), snapshot.iterations_run);
            Model::from_snapshot(target, snapshot, cfg.fitness)?
        }
        None => Model::new(target, &cfg.model, cfg.fitness)?,
    };
    info!("seed {}, {} polygons, initial score {:.3}", model.seed(), model.polygons().len(), model.score());

    let optimizer = Optimizer::new(cfg.optimizer.clone())?;
    let stats = optimizer.run(&mut model)?;

    println!("Mutations: {}", stats.iterations_run);
    println!("Accepted: {} ({:.2}%)", stats.total_accepts, stats.success_ratio() * 100.0);
    println!("took {:.2?}", stats.elapsed);
    println!("{} polygons/s", stats.polygons_per_second(model.polygons().len()) as u64);
    for op in &stats.operators {
        println!("  {:<8} {:>8} proposed {:>8} accepted", op.label, op.proposals, op.accepts);
    }
    println!("score: {}", stats.final_score);

    for path in &args.outputs {
        export::save(path, &model)?;
    }
    Ok(())
}
