//! Draws batches of samples from a univariate distribution and compares the
//! empirical moments and log-likelihood against the analytic values.

mod plot;

use clap::{Parser, ValueEnum};
use indicatif::ProgressIterator;
use tch::{Device, Kind, Tensor};

use deep_prob::distributions::{Distribution, Laplace, Normal};

use plot::DensityPlot;

const HISTOGRAM_BINS: i64 = 80;
const DENSITY_POINTS: i64 = 200;

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Family {
    Normal,
    Laplace,
}

#[derive(Parser, Debug)]
struct Args {
    /// Distribution to sample from.
    #[arg(long, value_enum, default_value_t = Family::Normal)]
    distribution: Family,
    /// Location parameter.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values(true))]
    loc: f64,
    /// Scale parameter. Must be positive.
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    /// Number of samples drawn per batch.
    #[arg(long, default_value_t = 10000)]
    samples: i64,
    /// Number of batches to draw.
    #[arg(long, default_value_t = 100)]
    batches: u32,
    /// Seed for the backend generator. Unseeded runs are not reproducible.
    #[arg(long)]
    seed: Option<i64>,
    /// Whether CUDA should be used. If false, sampling occurs on the CPU.
    #[arg(long, default_value_t = false)]
    cuda: bool,
    /// If given, a histogram of the samples against the density is saved here.
    #[arg(long)]
    plot: Option<String>,
    /// Log verbosity level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,
}

fn build(args: &Args, device: Device) -> deep_prob::Result<Box<dyn Distribution>> {
    let loc = Tensor::scalar_tensor(args.loc, (Kind::Double, device));
    let scale = Tensor::scalar_tensor(args.scale, (Kind::Double, device));
    Ok(match args.distribution {
        Family::Normal => Box::new(Normal::with_validation(loc, scale, Some(true))?),
        Family::Laplace => Box::new(Laplace::with_validation(loc, scale, Some(true))?),
    })
}

fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    if let Some(seed) = args.seed {
        deep_prob::seed(seed);
    }
    let device = if args.cuda {
        Device::Cuda(0)
    } else {
        Device::Cpu
    };
    let dist = build(&args, device)?;
    let mean = dist.mean()?.double_value(&[]);
    let variance = dist.variance()?.double_value(&[]);
    let stddev = variance.sqrt();

    // Histogram range covers the bulk of either family.
    let low = mean - 6.0 * stddev;
    let high = mean + 6.0 * stddev;
    let mut counts = Tensor::zeros(&[HISTOGRAM_BINS], (Kind::Double, device));

    let mut total = 0.0;
    let mut total_sq = 0.0;
    let mut total_log_prob = 0.0;
    for _ in (0..args.batches).progress() {
        let x = dist.sample_n(Some(&[args.samples]))?;
        total += x.sum(Kind::Double).double_value(&[]);
        total_sq += x.pow_tensor_scalar(2).sum(Kind::Double).double_value(&[]);
        total_log_prob += dist.log_prob(&x)?.sum(Kind::Double).double_value(&[]);
        if args.plot.is_some() {
            counts += x.histc(HISTOGRAM_BINS, low, high);
        }
    }

    let n = (args.samples * args.batches as i64) as f64;
    if n == 0.0 {
        tracing::warn!("no samples drawn");
        return Ok(());
    }
    let empirical_mean = total / n;
    let empirical_var = total_sq / n - empirical_mean * empirical_mean;
    tracing::info!(samples = n, "sampling finished");
    println!("{:?}(loc={}, scale={})", args.distribution, args.loc, args.scale);
    println!("mean: empirical {empirical_mean:.6}, analytic {mean:.6}");
    println!("variance: empirical {empirical_var:.6}, analytic {variance:.6}");
    println!("average log-likelihood: {:.6}", total_log_prob / n);
    if let Ok(entropy) = dist.entropy() {
        println!("entropy: {:.6}", entropy.double_value(&[]));
    }

    if let Some(path) = &args.plot {
        let bin_width = (high - low) / HISTOGRAM_BINS as f64;
        let heights = (0..HISTOGRAM_BINS)
            .map(|i| counts.double_value(&[i]) / (n * bin_width))
            .collect();
        let xs = Tensor::linspace(low, high, DENSITY_POINTS, (Kind::Double, device));
        let pdf = dist.prob(&xs)?;
        let density = (0..DENSITY_POINTS)
            .map(|i| (xs.double_value(&[i]), pdf.double_value(&[i])))
            .collect();
        let plot = DensityPlot {
            caption: format!("{:?} samples", args.distribution),
            low,
            bin_width,
            heights,
            density,
        };
        plot.render(path)?;
        tracing::info!(path = path.as_str(), "saved histogram");
    }
    Ok(())
}
