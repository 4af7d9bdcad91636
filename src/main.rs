use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use sigma_fusion::models::{ConstantVelocityModel, RangeObservationModel, SensorModel};
use sigma_fusion::{FilterConfig, Gaussian, GaussianFilter, Matrix, Vector};

#[derive(Parser, Debug)]
#[command(name = "sigma_fusion")]
#[command(about = "Track a 2-D target from range beacons with multi-sensor sigma-point fusion", long_about = None)]
struct Args {
    /// Number of range beacons
    #[arg(long, default_value = "4")]
    sensors: usize,

    /// Number of filter steps
    #[arg(long, default_value = "50")]
    steps: usize,

    /// Time step in seconds
    #[arg(long, default_value = "0.1")]
    dt: f64,

    /// Filter configuration (JSON)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// Fuse sensors on worker threads
    #[arg(long)]
    parallel: bool,

    /// Print a JSON summary at the end
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary {
    started: String,
    finished: String,
    sensors: usize,
    steps: usize,
    config: FilterConfig,
    final_belief: Gaussian,
    truth: Vec<f64>,
    position_error: f64,
    rejected_updates: usize,
}

const RANGE_NOISE_STD: f64 = 0.1;
const ACCEL_NOISE_STD: f64 = 0.2;
const BEACON_RADIUS: f64 = 50.0;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading filter config {path}"))?;
            FilterConfig::from_json_str(&json).context("parsing filter config")?
        }
        None => FilterConfig::default(),
    };
    if args.parallel {
        config.parallel_fusion = true;
    }

    let started = Utc::now().to_rfc3339();
    println!("[{}] Sigma fusion starting", ts_now());
    println!("  Beacons: {}", args.sensors);
    println!("  Steps: {} (dt = {} s)", args.steps, args.dt);
    println!("  Parallel fusion: {}", config.parallel_fusion);

    // Beacons evenly spread on a circle around the origin
    let beacons: Vec<Vector> = (0..args.sensors)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / args.sensors.max(1) as f64;
            Vector::from_vec(vec![BEACON_RADIUS * angle.cos(), BEACON_RADIUS * angle.sin()])
        })
        .collect();

    let sensors = beacons
        .iter()
        .map(|b| -> Result<SensorModel> {
            Ok(Box::new(RangeObservationModel::new(b.clone(), 4, RANGE_NOISE_STD)?))
        })
        .collect::<Result<Vec<_>>>()?;

    let process = ConstantVelocityModel::new(2, ACCEL_NOISE_STD)?;
    let filter = GaussianFilter::multi_sensor(process, sensors, config.clone())
        .context("building filter")?;

    // Target starts at (-10, 5) moving at (1.5, -0.5) m/s
    let mut truth = Vector::from_vec(vec![-10.0, 5.0, 1.5, -0.5]);
    let mut belief = Gaussian::new(Vector::zeros(4), Matrix::identity(4, 4) * 25.0)?;
    let none = Vector::zeros(0);
    let mut rejected = 0;

    for step in 0..args.steps {
        let velocity = truth.rows(2, 2).into_owned();
        truth.rows_mut(0, 2).axpy(args.dt, &velocity, 1.0);

        let y = measure(&beacons, &truth, step);
        if let Err(e) = filter.step(&mut belief, &none, args.dt, &y) {
            // Belief is left untouched; coast on the prediction next step
            log::warn!("[filter] step {step} rejected: {e}");
            rejected += 1;
            continue;
        }

        let mean = belief.mean();
        println!(
            "[{}] step {:>4}  pos=({:>8.3}, {:>8.3})  vel=({:>6.3}, {:>6.3})  tr(P)={:.4}",
            ts_now(),
            step,
            mean[0],
            mean[1],
            mean[2],
            mean[3],
            belief.covariance_trace()
        );
    }

    let position_error = (belief.mean().rows(0, 2) - truth.rows(0, 2)).norm();
    println!("\n=== Final Stats ===");
    println!("Position error: {position_error:.4} m");
    println!("Rejected updates: {rejected}");

    if args.json {
        let summary = Summary {
            started,
            finished: Utc::now().to_rfc3339(),
            sensors: args.sensors,
            steps: args.steps,
            config,
            truth: truth.iter().copied().collect(),
            final_belief: belief,
            position_error,
            rejected_updates: rejected,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(())
}

/// Ranges to every beacon with a small deterministic perturbation
fn measure(beacons: &[Vector], truth: &Vector, step: usize) -> Vector {
    let position = truth.rows(0, 2).into_owned();
    Vector::from_iterator(
        beacons.len(),
        beacons.iter().enumerate().map(|(i, b)| {
            let phase = (step * 7 + i * 13) as f64;
            (&position - b).norm() + RANGE_NOISE_STD * 0.5 * phase.sin()
        }),
    )
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S%.3f").to_string()
}
