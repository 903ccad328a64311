use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ConvConfig;
use crate::conv::{conv2d, ConvAlgorithm, TiledConv};
use crate::error::Result;
use crate::pipeline::Operands;
use crate::tensor::{Bias, FeatureMap, KernelWeights};

/// Timing and accuracy of one algorithm over the benchmark run.
pub struct AlgorithmMetrics {
    pub label: String,
    /// Set for the direct convolution every other row is compared against.
    pub is_reference: bool,
    pub total_time: Duration,
    pub iterations: usize,
    /// Largest absolute difference from the direct convolution.
    pub max_abs_err: f32,
}

impl AlgorithmMetrics {
    pub fn per_call(&self) -> Duration {
        if self.iterations == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_time.as_nanos() / self.iterations as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Aggregate benchmark results for one configuration.
pub struct BenchmarkResult {
    pub config: ConvConfig,
    pub metrics: Vec<AlgorithmMetrics>,
}

/// Random padded operands shaped by `config`, values uniform in [-1, 1).
pub fn random_operands(config: &ConvConfig, seed: u64) -> Operands {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut input = FeatureMap::new(config.in_channels, config.padded_height(), config.padded_width());
    for ch in 0..config.in_channels {
        for h in 1..=config.height {
            for w in 1..=config.width {
                input.set(ch, h, w, rng.gen_range(-1.0f32..1.0));
            }
        }
    }
    let mut weights = KernelWeights::new(config.out_channels, config.in_channels);
    for v in weights.as_mut_slice() {
        *v = rng.gen_range(-1.0f32..1.0);
    }
    let bias = Bias::from_vec((0..config.out_channels).map(|_| rng.gen_range(-1.0f32..1.0)).collect());
    Operands { input, weights, bias }
}

fn time_runs<F>(
    label: &str,
    is_reference: bool,
    iterations: usize,
    reference: &FeatureMap,
    mut run: F,
) -> Result<AlgorithmMetrics>
where
    F: FnMut() -> Result<FeatureMap>,
{
    let mut total_time = Duration::ZERO;
    let mut max_abs_err = 0.0f32;
    for _ in 0..iterations {
        let start = Instant::now();
        let out = run()?;
        total_time += start.elapsed();
        max_abs_err = max_abs_err.max(out.max_abs_diff(reference));
    }
    Ok(AlgorithmMetrics {
        label: label.to_string(),
        is_reference,
        total_time,
        iterations,
        max_abs_err,
    })
}

/// Time every algorithm on random operands and compare each against the direct result.
pub fn run_benchmark(config: &ConvConfig, iterations: usize, seed: u64) -> Result<BenchmarkResult> {
    config.validate()?;
    let ops = random_operands(config, seed);
    let reference = conv2d(ConvAlgorithm::Direct, &ops.input, &ops.weights, &ops.bias, config.numeric_check)?;

    let mut metrics = Vec::new();
    for algorithm in [ConvAlgorithm::Direct, ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        let is_reference = algorithm == ConvAlgorithm::Direct;
        metrics.push(time_runs(&algorithm.to_string(), is_reference, iterations, &reference, || {
            conv2d(algorithm, &ops.input, &ops.weights, &ops.bias, config.numeric_check)
        })?);
    }

    let prepacked = TiledConv::new(&ops.weights, &ops.bias, config.numeric_check)?;
    metrics.push(time_runs("tiled (prepacked)", false, iterations, &reference, || {
        prepacked.forward(&ops.input)
    })?);

    Ok(BenchmarkResult {
        config: config.clone(),
        metrics,
    })
}

/// Print a formatted benchmark report to stdout.
pub fn print_report(result: &BenchmarkResult) {
    let c = &result.config;
    println!(
        "\n=== {}x{}x{} input, {} output channels ===",
        c.in_channels, c.height, c.width, c.out_channels
    );
    println!("{:<20} {:>12} {:>12} {:>12}", "Algorithm", "Total", "Per call", "Max |err|");

    let direct_us = result
        .metrics
        .iter()
        .find(|m| m.is_reference)
        .map(|m| m.per_call().as_nanos() as f64 / 1000.0)
        .unwrap_or(0.0);
    for m in &result.metrics {
        let total_ms = m.total_time.as_micros() as f64 / 1000.0;
        let per_call_us = m.per_call().as_nanos() as f64 / 1000.0;
        println!(
            "{:<20} {:>10.2}ms {:>10.2}us {:>12.2e}",
            m.label, total_ms, per_call_us, m.max_abs_err
        );
        if per_call_us > 0.001 && !m.is_reference {
            println!("{:<20} speedup vs direct: {:.2}x", "", direct_us / per_call_us);
        }
    }
}
