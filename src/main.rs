use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use winoconv::config::ConvConfig;
use winoconv::conv::ConvAlgorithm;
use winoconv::loader::TextTensorFiles;
use winoconv::metrics::benchmark::{print_report, run_benchmark};
use winoconv::pipeline::{load_operands, run_pipeline, verify_against_direct, VERIFY_TOLERANCE};
use winoconv::Result;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a JSON configuration file (defaults: 16 -> 16 channels, 4x4 input)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convolve tensors read from text files
    Run {
        /// Input tensor (header format: count name rank dims... data_type values...)
        #[arg(short, long)]
        input: PathBuf,
        /// Weight tensor, OIHW plain floats
        #[arg(short, long)]
        weight: PathBuf,
        /// Bias vector, plain floats
        #[arg(short, long)]
        bias: PathBuf,
        /// Where to write the CHW output, one value per line
        #[arg(short, long)]
        output: PathBuf,
        /// Algorithm override: tiled, naive or direct
        #[arg(short, long)]
        algorithm: Option<ConvAlgorithm>,
        /// The input file already carries the 1-pixel zero border
        #[arg(long)]
        padded: bool,
        /// The input file holds plain floats without a header
        #[arg(long)]
        plain_input: bool,
        /// Cross-check the result against the direct convolution
        #[arg(long)]
        verify: bool,
    },
    /// Time all algorithms on random tensors
    Bench {
        #[arg(short = 'n', long, default_value_t = 100)]
        iterations: usize,
        #[arg(short, long, default_value_t = 42)]
        seed: u64,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ConvConfig> {
    match path {
        Some(p) => ConvConfig::from_file(p),
        None => Ok(ConvConfig::default()),
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(args.config.as_ref())?;

    match args.command {
        Commands::Run {
            input,
            weight,
            bias,
            output,
            algorithm,
            padded,
            plain_input,
            verify,
        } => {
            if let Some(algorithm) = algorithm {
                config.algorithm = algorithm;
            }
            let mut files = TextTensorFiles::new()
                .with_input(input)
                .with_weight(weight)
                .with_bias(bias)
                .with_output(output)
                .with_plain_input(plain_input);
            let mut sink = files.clone();
            let result = run_pipeline(&config, &mut files, &mut sink, padded)?;

            if verify {
                let ops = load_operands(&mut files, &config, padded)?;
                verify_against_direct(&result, &ops, &config, VERIFY_TOLERANCE)?;
            }
        }
        Commands::Bench { iterations, seed } => {
            info!("benchmarking {} iterations (seed {})", iterations, seed);
            let result = run_benchmark(&config, iterations, seed)?;
            print_report(&result);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
