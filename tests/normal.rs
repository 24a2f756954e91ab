use std::f64::consts::PI;

use approx::assert_relative_eq;
use tch::{Device, Kind, Tensor};

use deep_prob::distributions::{Distribution, ExponentialFamily, Normal};
use deep_prob::Error;

fn f64s(values: &[f64]) -> Tensor {
    Tensor::of_slice(values)
}

fn normal_pdf(x: f64, loc: f64, scale: f64) -> f64 {
    (-(x - loc).powi(2) / (2.0 * scale * scale)).exp() / (scale * (2.0 * PI).sqrt())
}

#[test]
fn log_prob_matches_closed_form() {
    let (locs, scales, xs) = ([0.0, 1.5, -2.0], [1.0, 0.5, 3.0], [0.3, 1.0, 4.0]);
    let dist = Normal::new(f64s(&locs), f64s(&scales)).unwrap();
    let log_prob = dist.log_prob(&f64s(&xs)).unwrap();
    for i in 0..3 {
        let expected = normal_pdf(xs[i], locs[i], scales[i]).ln();
        assert_relative_eq!(log_prob.double_value(&[i as i64]), expected, epsilon = 1e-12);
    }
    let prob = dist.prob(&f64s(&xs)).unwrap();
    assert_relative_eq!(
        prob.double_value(&[1]),
        normal_pdf(xs[1], locs[1], scales[1]),
        epsilon = 1e-12
    );
}

#[test]
fn density_integrates_to_one() {
    let dist = Normal::new(f64s(&[1.0]), f64s(&[0.7])).unwrap();
    let steps = 20001;
    let (low, high) = (-8.0, 10.0);
    let xs = Tensor::linspace(low, high, steps, (Kind::Double, Device::Cpu)).unsqueeze(-1);
    let p = dist.prob(&xs).unwrap().squeeze_dim(-1);
    let dx = (high - low) / (steps - 1) as f64;
    let ends = p.double_value(&[0]) + p.double_value(&[steps - 1]);
    let integral = (p.sum(Kind::Double).double_value(&[]) - 0.5 * ends) * dx;
    assert_relative_eq!(integral, 1.0, epsilon = 1e-6);
}

#[test]
fn cdf_inverts_icdf() {
    let dist = Normal::new(f64s(&[-1.0, 0.0, 2.5]), f64s(&[0.5, 1.0, 4.0])).unwrap();
    let p = f64s(&[0.05, 0.5, 0.9]);
    let x = dist.icdf(&p).unwrap();
    assert!(dist.cdf(&x).unwrap().allclose(&p, 1e-9, 1e-9, false));
    // The median is the location.
    assert_relative_eq!(x.double_value(&[1]), 0.0, epsilon = 1e-12);
}

#[test]
fn exp_family_entropy_matches_closed_form() {
    let dist = Normal::new(f64s(&[0.0, 3.0, -1.0]), f64s(&[0.2, 1.0, 5.0])).unwrap();
    let closed = dist.entropy().unwrap();
    let via_autograd = dist.exp_family_entropy().unwrap();
    assert!(via_autograd.allclose(&closed, 1e-9, 1e-9, false));
    assert_relative_eq!(
        closed.double_value(&[1]),
        0.5 + 0.5 * (2.0 * PI).ln(),
        epsilon = 1e-12
    );
    let perplexity = dist.perplexity().unwrap();
    assert!(perplexity.allclose(&closed.exp(), 1e-12, 1e-12, false));
}

#[test]
fn log_normalizer_needs_both_natural_params() {
    let dist = Normal::new(0.0, 1.0).unwrap();
    let params = dist.natural_params();
    assert_eq!(params.len(), 2);
    let log_norm = dist.log_normalizer(&params).unwrap();
    assert_relative_eq!(log_norm.double_value(&[]), 0.5 * (2.0 * PI).ln(), epsilon = 1e-6);
    assert!(matches!(
        dist.log_normalizer(&params[..1]),
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(dist.log_normalizer(&[]), Err(Error::InvalidArgument(_))));
}

#[test]
fn parameters_broadcast_at_construction() {
    let dist = Normal::new(Tensor::zeros(&[3, 1], (Kind::Float, Device::Cpu)), 2.0).unwrap();
    assert_eq!(dist.batch_shape(), vec![3, 1]);
    assert_eq!(dist.scale.size(), vec![3, 1]);
    assert_eq!(dist.scale.kind(), Kind::Float);

    let scalar = Normal::new(0.0, 1.0).unwrap();
    assert_eq!(scalar.batch_shape(), Vec::<i64>::new());
    assert_eq!(scalar.loc.kind(), Kind::Float);

    let mismatched = Normal::new(f64s(&[0.0, 1.0]), f64s(&[1.0, 2.0, 3.0]));
    assert!(matches!(mismatched, Err(Error::Shape(_))));
}

#[test]
fn broadcast_to_returns_expanded_copy() {
    let dist = Normal::new(f64s(&[0.0, 1.0, 2.0]).reshape(&[3, 1]), 1.0).unwrap();
    let wide = dist.broadcast_to(&[2, 3, 4]).unwrap();
    assert_eq!(wide.batch_shape(), vec![2, 3, 4]);
    assert_eq!(dist.batch_shape(), vec![3, 1]);
    assert_relative_eq!(wide.loc.double_value(&[1, 2, 3]), 2.0);
    assert!(dist.broadcast_to(&[2, 2]).is_err());
}

#[test]
fn sample_shapes() {
    let dist = Normal::new(f64s(&[0.0, 1.0, 2.0]), f64s(&[1.0, 1.0, 1.0])).unwrap();
    assert_eq!(dist.sample(None).unwrap().size(), vec![3]);
    assert_eq!(dist.sample(Some(&[])).unwrap().size(), vec![3]);
    assert_eq!(dist.sample(Some(&[5, 3])).unwrap().size(), vec![5, 3]);
    assert_eq!(dist.sample_n(Some(&[5])).unwrap().size(), vec![5, 3]);
    assert_eq!(dist.sample_n(None).unwrap().size(), vec![3]);
    assert!(dist.sample(Some(&[5, 2])).is_err());
}

#[test]
fn samples_have_expected_moments() {
    deep_prob::seed(17);
    let dist = Normal::new(f64s(&[2.0]), f64s(&[3.0])).unwrap();
    let x = dist.sample_n(Some(&[200_000])).unwrap();
    let mean = x.mean(Kind::Double).double_value(&[]);
    let var = (x - mean).pow_tensor_scalar(2).mean(Kind::Double).double_value(&[]);
    assert_relative_eq!(mean, 2.0, epsilon = 0.05);
    assert_relative_eq!(var, 9.0, epsilon = 0.15);
}

#[test]
fn sample_is_differentiable_in_parameters() {
    let loc = Tensor::scalar_tensor(0.5, (Kind::Double, Device::Cpu)).set_requires_grad(true);
    let scale = Tensor::scalar_tensor(2.0, (Kind::Double, Device::Cpu)).set_requires_grad(true);
    let dist = Normal::new(&loc, &scale).unwrap();
    assert!(dist.has_grad());
    let x = dist.sample(Some(&[1000])).unwrap();
    x.mean(Kind::Double).backward();
    assert_relative_eq!(loc.grad().double_value(&[]), 1.0, epsilon = 1e-12);

    // d(mean)/d(scale) is the mean of the standard noise.
    let noise = (x.detach() - 0.5) / 2.0;
    assert_relative_eq!(
        scale.grad().double_value(&[]),
        noise.mean(Kind::Double).double_value(&[]),
        epsilon = 1e-9
    );
}

#[test]
fn validation_rejects_bad_parameters_and_samples() {
    let err = Normal::with_validation(0.0, -1.0, Some(true));
    assert!(matches!(err, Err(Error::Constraint { constraint: "positive", .. })));
    assert!(Normal::with_validation(0.0, -1.0, Some(false)).is_ok());

    let dist = Normal::with_validation(0.0, 1.0, Some(true)).unwrap();
    assert!(dist.validate_args());
    assert!(dist.log_prob(&f64s(&[f64::NAN])).is_err());
    assert!(dist.log_prob(&f64s(&[0.25])).is_ok());
}
