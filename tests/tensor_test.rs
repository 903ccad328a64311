use winoconv::tensor::layout::{crop, from_channel_last, pad_zero, to_channel_last};
use winoconv::tensor::{Bias, FeatureMap, KernelWeights};
use winoconv::WinogradError;

#[test]
fn feature_map_get_set() {
    let mut t = FeatureMap::new(2, 3, 4);
    t.set(1, 2, 3, 42.0);
    assert_eq!(t.get(1, 2, 3), 42.0);
    assert_eq!(t.as_slice()[23], 42.0);
    t.add(1, 2, 3, 1.0);
    assert_eq!(t.get(1, 2, 3), 43.0);
}

#[test]
fn feature_map_fill() {
    let mut t = FeatureMap::new(1, 2, 2);
    t.fill(7.0);
    assert!(t.as_slice().iter().all(|&v| v == 7.0));
    assert_eq!(t.len(), 4);
    assert!(!t.is_empty());
}

#[test]
fn feature_map_from_vec_checks_length() {
    let t = FeatureMap::from_vec(1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    assert_eq!(t.get(0, 1, 0), 3.0);
    assert_eq!(t.to_string(), "1x2x2");

    let err = FeatureMap::from_vec(1, 2, 2, vec![1.0; 5]).unwrap_err();
    assert!(matches!(err, WinogradError::Shape { .. }), "got {}", err);
}

#[test]
fn feature_map_max_abs_diff() {
    let a = FeatureMap::from_vec(1, 1, 3, vec![1.0, 2.0, 3.0]).unwrap();
    let b = FeatureMap::from_vec(1, 1, 3, vec![1.0, 2.5, 2.0]).unwrap();
    assert_eq!(a.max_abs_diff(&b), 1.0);
    assert_eq!(a.max_abs_diff(&a), 0.0);
}

#[test]
fn feature_map_max_rel_diff() {
    let reference = FeatureMap::from_vec(1, 1, 3, vec![1000.0, 0.5, -200.0]).unwrap();
    let result = FeatureMap::from_vec(1, 1, 3, vec![1000.5, 0.25, -200.0]).unwrap();
    // Entries below magnitude 1 are compared absolutely.
    assert_eq!(result.max_rel_diff(&reference), 0.25);
    let result = FeatureMap::from_vec(1, 1, 3, vec![1001.0, 0.5, -200.0]).unwrap();
    assert_eq!(result.max_rel_diff(&reference), 1.0 / 1000.0);
}

#[test]
fn kernel_weights_oihw_layout() {
    let data: Vec<f32> = (0..2 * 3 * 9).map(|i| i as f32).collect();
    let w = KernelWeights::from_vec(2, 3, data).unwrap();
    assert_eq!(w.get(1, 2, 0, 1), ((1 * 3 + 2) * 9 + 1) as f32);
    let k = w.kernel(1, 0);
    assert_eq!(k[0], 27.0);
    assert_eq!(k[8], 35.0);
    assert_eq!(format!("{:?}", w), "KernelWeights(2x3x3x3)");

    assert!(KernelWeights::from_vec(2, 3, vec![0.0; 10]).is_err());
}

#[test]
fn kernel_weights_set() {
    let mut w = KernelWeights::new(1, 1);
    w.set(0, 0, 1, 1, 5.0);
    assert_eq!(w.kernel(0, 0), [0.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0]);
}

#[test]
fn bias_accessors() {
    let b = Bias::from_vec(vec![0.5, -1.0]);
    assert_eq!(b.len(), 2);
    assert_eq!(b.get(1), -1.0);
    assert!(Bias::zeros(0).is_empty());
    assert_eq!(Bias::zeros(3).as_slice(), &[0.0, 0.0, 0.0]);
}

#[test]
fn pad_zero_adds_border() {
    let t = FeatureMap::from_vec(1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let p = pad_zero(&t, 1);
    assert_eq!((p.c, p.h, p.w), (1, 4, 4));
    #[rustfmt::skip]
    let expected = [
        0.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 2.0, 0.0,
        0.0, 3.0, 4.0, 0.0,
        0.0, 0.0, 0.0, 0.0,
    ];
    assert_eq!(p.as_slice(), &expected);
    assert_eq!(pad_zero(&t, 0), t);
}

#[test]
fn crop_undoes_pad() {
    let mut t = FeatureMap::new(3, 2, 5);
    for (i, v) in t.as_mut_slice().iter_mut().enumerate() {
        *v = i as f32;
    }
    assert_eq!(crop(&pad_zero(&t, 1), 1).unwrap(), t);
    assert!(crop(&FeatureMap::new(1, 1, 4), 1).is_err());
}

#[test]
fn channel_last_conversion() {
    let mut t = FeatureMap::new(2, 2, 3);
    for (i, v) in t.as_mut_slice().iter_mut().enumerate() {
        *v = i as f32;
    }
    let hwc = to_channel_last(&t).unwrap();
    // (y, x, c) -> CHW index c*6 + y*3 + x
    assert_eq!(&hwc[..4], &[0.0, 6.0, 1.0, 7.0]);
    assert_eq!(hwc[(1 * 3 + 2) * 2 + 1], t.get(1, 1, 2));

    let back = from_channel_last(2, 2, 3, &hwc).unwrap();
    assert_eq!(back, t);
    assert!(from_channel_last(2, 2, 2, &hwc).is_err());
}
