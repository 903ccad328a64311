use proptest::prelude::*;

use winoconv::config::{ConvConfig, NumericCheck};
use winoconv::conv::{conv2d, convolve, ConvAlgorithm, TiledConv};
use winoconv::error::{Stage, WinogradError};
use winoconv::metrics::benchmark::random_operands;
use winoconv::pipeline::{verify_against_direct, VERIFY_TOLERANCE};
use winoconv::tensor::layout::pad_zero;
use winoconv::tensor::{Bias, FeatureMap, KernelWeights};

/// Fill a flat slice with deterministic values based on index.
fn fill_deterministic(data: &mut [f32], phase: f32) {
    for (i, v) in data.iter_mut().enumerate() {
        *v = ((i as f32) * 0.1 + phase).sin();
    }
}

/// Compare two outputs with a tolerance relative to the reference magnitude (at least 1).
fn assert_approx_eq(a: &FeatureMap, b: &FeatureMap, tol: f32, label: &str) {
    assert_eq!((a.c, a.h, a.w), (b.c, b.h, b.w), "{}: shape mismatch {} vs {}", label, a, b);
    for (i, (va, vb)) in a.as_slice().iter().zip(b.as_slice()).enumerate() {
        let scale = vb.abs().max(1.0);
        assert!(
            (va - vb).abs() <= tol * scale,
            "{}: mismatch at index {}: {} vs {} (diff={})",
            label,
            i,
            va,
            vb,
            (va - vb).abs()
        );
    }
}

/// Padded input plus weights and bias for `config`, filled deterministically.
fn deterministic_operands(config: &ConvConfig) -> (FeatureMap, KernelWeights, Bias) {
    let mut raw = FeatureMap::new(config.in_channels, config.height, config.width);
    fill_deterministic(raw.as_mut_slice(), 0.05);
    let mut weights = KernelWeights::new(config.out_channels, config.in_channels);
    fill_deterministic(weights.as_mut_slice(), 0.3);
    let bias = Bias::from_vec((0..config.out_channels).map(|oc| 0.1 * oc as f32 - 0.4).collect());
    (pad_zero(&raw, 1), weights, bias)
}

fn run_all(config: &ConvConfig, label: &str) {
    let (input, weights, bias) = deterministic_operands(config);
    let direct = conv2d(ConvAlgorithm::Direct, &input, &weights, &bias, NumericCheck::Error).unwrap();
    assert_eq!((direct.c, direct.h, direct.w), (config.out_channels, config.out_height(), config.out_width()));

    for algo in [ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        let result = conv2d(algo, &input, &weights, &bias, NumericCheck::Error).unwrap();
        assert_approx_eq(&result, &direct, 1e-4, &format!("{} {}", algo, label));
    }
}

// Test 1: the fixed 16 -> 16 channel, 4x4 configuration
#[test]
fn test_default_configuration() {
    run_all(&ConvConfig::default(), "default");
}

// Test 2: channel counts that are not multiples of the block sizes
#[test]
fn test_ragged_channels() {
    run_all(&ConvConfig::new(3, 5, 4, 4), "ic3_oc5");
    run_all(&ConvConfig::new(17, 7, 4, 4), "ic17_oc7");
    run_all(&ConvConfig::new(1, 1, 4, 4), "ic1_oc1");
}

// Test 3: odd output extents exercise partial tiles and partial tile groups
#[test]
fn test_odd_dims() {
    run_all(&ConvConfig::new(4, 4, 5, 5), "5x5");
    run_all(&ConvConfig::new(2, 3, 3, 7), "3x7");
    run_all(&ConvConfig::new(2, 2, 1, 1), "1x1");
    run_all(&ConvConfig::new(16, 16, 6, 9), "6x9");
}

// Test 4: multi-group input with multiple channel blocks on both sides
#[test]
fn test_large() {
    run_all(&ConvConfig::new(33, 9, 10, 12), "large");
}

// Test 5: identity kernel reproduces the unpadded input plus bias, bit for bit
#[test]
fn test_identity_kernel() {
    let config = ConvConfig::default();
    // Quarter-integer values keep every transform exact in f32.
    let mut raw = FeatureMap::new(config.in_channels, config.height, config.width);
    for (i, v) in raw.as_mut_slice().iter_mut().enumerate() {
        *v = ((i % 17) as f32 - 8.0) * 0.25;
    }
    let mut weights = KernelWeights::new(config.out_channels, config.in_channels);
    for ch in 0..config.out_channels {
        weights.set(ch, ch, 1, 1, 1.0);
    }
    let bias = Bias::from_vec((0..config.out_channels).map(|oc| oc as f32 * 0.5 - 2.0).collect());
    let input = pad_zero(&raw, 1);

    for algo in [ConvAlgorithm::Direct, ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        let out = conv2d(algo, &input, &weights, &bias, NumericCheck::Error).unwrap();
        for ch in 0..config.out_channels {
            for h in 0..config.height {
                for w in 0..config.width {
                    assert_eq!(
                        out.get(ch, h, w),
                        raw.get(ch, h, w) + bias.get(ch),
                        "{} identity at ({},{},{})",
                        algo,
                        ch,
                        h,
                        w
                    );
                }
            }
        }
    }
}

// Test 6: zero weights and zero bias give zero output whatever the input
#[test]
fn test_zero_weights() {
    let config = ConvConfig::new(16, 16, 5, 6);
    let ops = random_operands(&config, 11);
    let weights = KernelWeights::new(config.out_channels, config.in_channels);
    let bias = Bias::zeros(config.out_channels);

    for algo in [ConvAlgorithm::Direct, ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        let out = conv2d(algo, &ops.input, &weights, &bias, NumericCheck::Error).unwrap();
        assert!(out.as_slice().iter().all(|&v| v == 0.0), "{} produced non-zero output", algo);
    }
}

// Test 7: repeated runs are bit-identical
#[test]
fn test_determinism() {
    let config = ConvConfig::new(20, 6, 7, 5);
    let ops = random_operands(&config, 3);
    let conv = TiledConv::new(&ops.weights, &ops.bias, NumericCheck::Error).unwrap();

    let first = conv.forward(&ops.input).unwrap();
    for _ in 0..3 {
        let again = conv.forward(&ops.input).unwrap();
        let same = first
            .as_slice()
            .iter()
            .zip(again.as_slice())
            .all(|(a, b)| a.to_bits() == b.to_bits());
        assert!(same, "tiled output changed between runs");
    }

    let fresh = conv2d(ConvAlgorithm::Tiled, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
    assert_eq!(first, fresh);
}

// Test 8: a prepacked convolution serves several inputs
#[test]
fn test_prepacked_reuse() {
    let config = ConvConfig::default();
    let ops = random_operands(&config, 5);
    let conv = TiledConv::new(&ops.weights, &ops.bias, NumericCheck::Error).unwrap();

    for seed in 100..104 {
        let input = random_operands(&config, seed).input;
        let direct = conv2d(ConvAlgorithm::Direct, &input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
        assert_approx_eq(&conv.forward(&input).unwrap(), &direct, 1e-4, "prepacked");
    }
}

// Test 9: convolve rejects shapes that disagree with the configuration
#[test]
fn test_convolve_rejects_shape_mismatch() {
    let config = ConvConfig::default();
    let ops = random_operands(&config, 1);

    // Unpadded input
    let unpadded = FeatureMap::new(16, 4, 4);
    let err = convolve(&config, &unpadded, &ops.weights, &ops.bias).unwrap_err();
    assert!(matches!(err, WinogradError::Shape { .. }), "got {}", err);

    let weights = KernelWeights::new(16, 8);
    let err = convolve(&config, &ops.input, &weights, &ops.bias).unwrap_err();
    assert!(matches!(err, WinogradError::Shape { .. }), "got {}", err);

    let bias = Bias::zeros(15);
    let err = convolve(&config, &ops.input, &ops.weights, &bias).unwrap_err();
    assert!(matches!(err, WinogradError::Shape { .. }), "got {}", err);

    let out = convolve(&config, &ops.input, &ops.weights, &ops.bias).unwrap();
    assert_eq!((out.c, out.h, out.w), (16, 4, 4));
}

// Test 10: every algorithm selected through the config agrees
#[test]
fn test_convolve_dispatch() {
    let mut config = ConvConfig::new(5, 6, 5, 3);
    let ops = random_operands(&config, 9);
    config.algorithm = ConvAlgorithm::Direct;
    let direct = convolve(&config, &ops.input, &ops.weights, &ops.bias).unwrap();
    for algo in [ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        config.algorithm = algo;
        let out = convolve(&config, &ops.input, &ops.weights, &ops.bias).unwrap();
        assert_approx_eq(&out, &direct, 1e-4, &algo.to_string());
    }
}

// Test 11: non-finite values are reported according to the policy
#[test]
fn test_numeric_check_policy() {
    let config = ConvConfig::new(4, 4, 4, 4);
    let mut ops = random_operands(&config, 2);
    ops.input.set(2, 2, 3, f32::NAN);

    let err = conv2d(ConvAlgorithm::Tiled, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap_err();
    match err {
        WinogradError::NumericAnomaly { stage, .. } => assert_eq!(stage, Stage::InputTransform),
        other => panic!("expected numeric anomaly, got {}", other),
    }

    let out = conv2d(ConvAlgorithm::Tiled, &ops.input, &ops.weights, &ops.bias, NumericCheck::Warn).unwrap();
    assert!(out.as_slice().iter().any(|v| v.is_nan()));
    let out = conv2d(ConvAlgorithm::Naive, &ops.input, &ops.weights, &ops.bias, NumericCheck::Off).unwrap();
    assert!(out.as_slice().iter().any(|v| v.is_nan()));

    let mut weights = ops.weights.clone();
    weights.set(1, 1, 0, 0, f32::INFINITY);
    let err = TiledConv::new(&weights, &ops.bias, NumericCheck::Error).unwrap_err();
    assert!(matches!(err, WinogradError::NumericAnomaly { stage: Stage::WeightTransform, .. }));
}

// Test 12: verification scales its tolerance with the output magnitude
#[test]
fn test_verify_large_magnitude() {
    let config = ConvConfig::default();
    let mut ops = random_operands(&config, 6);
    for v in ops.input.as_mut_slice() {
        *v *= 100.0;
    }
    for v in ops.weights.as_mut_slice() {
        *v *= 10.0;
    }

    let direct = conv2d(ConvAlgorithm::Direct, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
    assert!(direct.as_slice().iter().any(|v| v.abs() > 1000.0), "outputs are not large enough");

    for algo in [ConvAlgorithm::Naive, ConvAlgorithm::Tiled] {
        let mut run = config.clone();
        run.algorithm = algo;
        let result = conv2d(algo, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
        let rel = verify_against_direct(&result, &ops, &run, VERIFY_TOLERANCE).unwrap();
        assert!(rel <= VERIFY_TOLERANCE, "{} relative diff {}", algo, rel);
    }

    let mut wrong = conv2d(ConvAlgorithm::Tiled, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
    for v in wrong.as_mut_slice() {
        *v = *v * 1.01 + 1.0;
    }
    let err = verify_against_direct(&wrong, &ops, &config, VERIFY_TOLERANCE).unwrap_err();
    assert!(matches!(err, WinogradError::Verification { .. }), "got {}", err);

    let err = verify_against_direct(&FeatureMap::new(16, 3, 4), &ops, &config, VERIFY_TOLERANCE).unwrap_err();
    assert!(matches!(err, WinogradError::Shape { .. }), "got {}", err);
}

#[test]
fn test_algorithm_from_str() {
    assert_eq!("tiled".parse::<ConvAlgorithm>().unwrap(), ConvAlgorithm::Tiled);
    assert_eq!("Naive".parse::<ConvAlgorithm>().unwrap(), ConvAlgorithm::Naive);
    assert_eq!("direct".parse::<ConvAlgorithm>().unwrap(), ConvAlgorithm::Direct);
    assert!("fft".parse::<ConvAlgorithm>().is_err());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn tiled_matches_naive_and_direct(
        ic in 1usize..20,
        oc in 1usize..10,
        h in 1usize..9,
        w in 1usize..9,
        seed in any::<u64>(),
    ) {
        let config = ConvConfig::new(ic, oc, h, w);
        let ops = random_operands(&config, seed);
        let direct = conv2d(ConvAlgorithm::Direct, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
        let naive = conv2d(ConvAlgorithm::Naive, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
        let tiled = conv2d(ConvAlgorithm::Tiled, &ops.input, &ops.weights, &ops.bias, NumericCheck::Error).unwrap();
        for ((d, n), t) in direct.as_slice().iter().zip(naive.as_slice()).zip(tiled.as_slice()) {
            let scale = d.abs().max(1.0);
            prop_assert!((n - d).abs() <= 1e-4 * scale, "naive {} vs direct {}", n, d);
            prop_assert!((t - d).abs() <= 1e-4 * scale, "tiled {} vs direct {}", t, d);
        }
    }
}
