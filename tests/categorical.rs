use approx::assert_relative_eq;
use tch::{Kind, Tensor};

use deep_prob::distributions::{Categorical, CategoricalParam, Distribution};
use deep_prob::Error;

fn probs_2x3() -> Tensor {
    Tensor::of_slice(&[0.2f64, 0.3, 0.5, 0.6, 0.4, 0.0]).reshape(&[2, 3])
}

#[test]
fn log_prob_picks_normalized_entries() {
    let dist = Categorical::from_probs(&(probs_2x3() * 4.0)).unwrap();
    assert_eq!(dist.batch_shape(), vec![2]);
    let lp = dist.log_prob(&Tensor::of_slice(&[2i64, 1])).unwrap();
    assert_relative_eq!(lp.double_value(&[0]), 0.5f64.ln(), epsilon = 1e-12);
    assert_relative_eq!(lp.double_value(&[1]), 0.4f64.ln(), epsilon = 1e-12);

    let from_logits = Categorical::from_logits(&(probs_2x3().narrow(0, 0, 1).log() + 7.0)).unwrap();
    assert!(from_logits
        .probs
        .allclose(&probs_2x3().narrow(0, 0, 1), 1e-12, 1e-12, false));

    // Values broadcast against the batch.
    let values = Tensor::of_slice(&[0i64, 1, 2, 0, 1, 2]).reshape(&[3, 2]);
    assert_eq!(dist.log_prob(&values).unwrap().size(), vec![3, 2]);
}

#[test]
fn samples_follow_probabilities() {
    deep_prob::seed(29);
    let dist = Categorical::from_probs(&probs_2x3()).unwrap();
    assert_eq!(dist.sample(None).unwrap().size(), vec![2]);
    assert_eq!(dist.sample(Some(&[7, 2])).unwrap().size(), vec![7, 2]);
    let x = dist.sample_n(Some(&[50_000])).unwrap();
    assert_eq!(x.size(), vec![50_000, 2]);
    assert_eq!(x.kind(), Kind::Int64);

    let second = x.select(1, 1);
    assert_eq!(second.eq(2i64).sum(Kind::Int64).int64_value(&[]), 0);
    let freq = second.eq(0i64).to_kind(Kind::Double).mean(Kind::Double).double_value(&[]);
    assert_relative_eq!(freq, 0.6, epsilon = 0.02);
}

#[test]
fn enumerate_support_and_entropy() {
    let dist = Categorical::from_probs(&probs_2x3()).unwrap();
    assert!(dist.has_enumerate_support());
    let support = dist.enumerate_support().unwrap();
    assert_eq!(support.size(), vec![3, 2]);
    assert_eq!(support.int64_value(&[2, 1]), 2);

    let entropy = dist.entropy().unwrap();
    let expected = -(0.6f64 * 0.6f64.ln() + 0.4 * 0.4f64.ln());
    assert_relative_eq!(entropy.double_value(&[1]), expected, epsilon = 1e-12);
    assert!(matches!(dist.support(), Err(Error::NotImplemented(_))));
}

#[test]
fn broadcast_to_adds_batch_dimensions() {
    let dist = Categorical::from_probs(&probs_2x3()).unwrap();
    let wide = dist.broadcast_to(&[4, 2]).unwrap();
    assert_eq!(wide.batch_shape(), vec![4, 2]);
    assert_eq!(wide.sample(None).unwrap().size(), vec![4, 2]);
    assert!(dist.broadcast_to(&[3]).is_err());
}

#[test]
fn negative_probs_fail_validation_only_when_enabled() {
    let weights = Tensor::of_slice(&[0.5f64, -0.25, 1.0]);
    let checked = Categorical::with_validation(CategoricalParam::Probs(weights.shallow_clone()), Some(true));
    assert!(matches!(
        checked,
        Err(Error::Constraint { constraint: "nonnegative", .. })
    ));

    let unchecked =
        Categorical::with_validation(CategoricalParam::Probs(weights), Some(false)).unwrap();
    assert!(!unchecked.validate_args());

    let zeros = Tensor::of_slice(&[0.0f64, 1.0, 3.0]);
    let dist = Categorical::with_validation(CategoricalParam::Probs(zeros), Some(true)).unwrap();
    assert!(dist.validate_args());
    assert_relative_eq!(dist.probs.double_value(&[2]), 0.75, epsilon = 1e-12);

    let logits = Tensor::of_slice(&[0.0f64, f64::NAN]);
    assert!(matches!(
        Categorical::with_validation(CategoricalParam::Logits(logits), Some(true)),
        Err(Error::Constraint { constraint: "real", .. })
    ));
}
