use rand::prelude::*;
use tch::{Device, Kind, Tensor};

use deep_prob::ops;

fn random_shape(rng: &mut impl Rng) -> Vec<i64> {
    let ndim = rng.gen_range(2..=4);
    (0..ndim).map(|_| rng.gen_range(1..=3)).collect()
}

/// Sums one axis by adding its slices together.
fn sum_axis_by_slices(x: &Tensor, axis: i64, keepdims: bool) -> Tensor {
    let d = x.size()[axis as usize];
    let mut acc = x.narrow(axis, 0, 1).zeros_like();
    for i in 0..d {
        acc = acc + x.narrow(axis, i, 1);
    }
    if keepdims {
        acc
    } else {
        acc.squeeze_dim(axis)
    }
}

#[test]
fn sum_matches_reference_and_has_unit_gradient() {
    let mut rng = rand::thread_rng();
    let shape = random_shape(&mut rng);
    let ndim = shape.len() as i64;
    for kind in [Kind::Float, Kind::Double] {
        for keepdims in [true, false] {
            let mut axes: Vec<Option<Vec<i64>>> = (0..ndim).map(|i| Some(vec![i])).collect();
            axes.push(Some(vec![]));
            axes.push(None);
            for axis in axes {
                let x = (Tensor::rand(&shape, (kind, Device::Cpu)) * 2.0 - 1.0)
                    .detach()
                    .set_requires_grad(true);
                let y = ops::sum(&x, axis.as_deref(), None, keepdims).unwrap();
                assert_eq!(y.kind(), kind);

                let x64 = x.detach().to_kind(Kind::Double);
                let expected = match axis.as_deref() {
                    None if keepdims => x64.sum(Kind::Double).reshape(&vec![1; shape.len()]),
                    None => x64.sum(Kind::Double),
                    Some([]) => x64,
                    Some(&[a]) => sum_axis_by_slices(&x64, a, keepdims),
                    Some(_) => unreachable!(),
                };
                assert_eq!(y.size(), expected.size(), "axis {axis:?} keepdims {keepdims}");
                assert!(y
                    .to_kind(Kind::Double)
                    .allclose(&expected, 1e-3, 1e-5, false));

                y.sum(kind).backward();
                assert!(x.grad().equal(&x.ones_like()));
            }
        }
    }
}

#[test]
fn sum_of_integers_accumulates_in_int64() {
    let x = Tensor::randint_low(-128, 128, &[3, 2, 3], (Kind::Int, Device::Cpu));
    let y = ops::sum(&x, Some(&[1]), None, false).unwrap();
    assert_eq!(y.kind(), Kind::Int64);
    let expected = sum_axis_by_slices(&x.to_kind(Kind::Int64), 1, false);
    assert!(y.equal(&expected));

    let y = ops::sum(&x, None, Some(Kind::Int), true).unwrap();
    assert_eq!(y.kind(), Kind::Int);
    assert_eq!(y.size(), vec![1, 1, 1]);
}

#[test]
fn sum_rejects_bad_axes() {
    let x = Tensor::ones(&[2, 3], (Kind::Float, Device::Cpu));
    assert!(ops::sum(&x, Some(&[2]), None, false).is_err());
    assert!(ops::sum(&x, Some(&[0, -2]), None, false).is_err());
    assert!(ops::sum(&x, None, Some(Kind::Int64), false).is_err());
}

/// Indices picked by a basic slice, found by walking the axis one step at a time.
fn slice_indices(dim: i64, begin: Option<i64>, end: Option<i64>, step: Option<i64>) -> Vec<i64> {
    let step = step.unwrap_or(1);
    let norm = |v: i64, lo: i64, hi: i64| (if v < 0 { v + dim } else { v }).clamp(lo, hi);
    let (start, stop) = if step > 0 {
        (begin.map_or(0, |b| norm(b, 0, dim)), end.map_or(dim, |e| norm(e, 0, dim)))
    } else {
        (
            begin.map_or(dim - 1, |b| norm(b, -1, dim - 1)),
            end.map_or(-1, |e| norm(e, -1, dim - 1)),
        )
    };
    let mut out = Vec::new();
    let mut i = start;
    while (step > 0 && i < stop) || (step < 0 && i > stop) {
        out.push(i);
        i += step;
    }
    out
}

fn select_all(x: &Tensor, picks: &[Vec<i64>]) -> Tensor {
    picks.iter().enumerate().fold(x.shallow_clone(), |acc, (axis, idx)| {
        acc.index_select(axis as i64, &Tensor::of_slice(idx))
    })
}

#[test]
fn slice_matches_basic_indexing() {
    let shape = [8i64, 16, 9, 9];
    let numel: i64 = shape.iter().product();
    type Config = (Vec<Option<i64>>, Vec<Option<i64>>, Option<Vec<Option<i64>>>);
    let configs: Vec<Config> = vec![
        (vec![], vec![], None),
        (vec![], vec![], Some(vec![])),
        (vec![Some(1)], vec![Some(4)], None),
        (vec![Some(1)], vec![Some(10)], Some(vec![Some(3)])),
        (vec![Some(10)], vec![Some(0)], Some(vec![Some(-2)])),
        (vec![None], vec![None], Some(vec![None])),
        (vec![None], vec![None], Some(vec![Some(-1)])),
        (vec![Some(10)], vec![None], Some(vec![Some(-1)])),
        (
            vec![Some(1), Some(0), Some(3)],
            vec![Some(-2), Some(10), Some(-4)],
            Some(vec![None, Some(2), Some(3)]),
        ),
        (
            vec![Some(-2), Some(-3), Some(-5), Some(-6)],
            vec![Some(1), Some(3), Some(4), Some(5)],
            None,
        ),
        (
            vec![Some(-2), Some(-3), Some(-5), Some(-6)],
            vec![Some(1), Some(3), Some(4), Some(5)],
            Some(vec![Some(-1), Some(-2), Some(-3), Some(-4)]),
        ),
        (
            vec![Some(2), Some(-3), Some(-5), Some(-6)],
            vec![Some(2), Some(3), Some(4), Some(5)],
            None,
        ),
        (
            vec![Some(2), Some(-3), Some(-5), Some(5)],
            vec![Some(3), Some(3), Some(4), Some(5)],
            None,
        ),
    ];

    let ids = Tensor::arange(numel, (Kind::Int64, Device::Cpu)).reshape(&shape);
    for (begin, end, step) in configs {
        let step = step.unwrap_or_default();
        let x = ids
            .to_kind(Kind::Double)
            .detach()
            .set_requires_grad(true);
        let y = ops::slice(&x, &begin, &end, &step).unwrap();

        let picks: Vec<Vec<i64>> = (0..begin.len())
            .map(|i| slice_indices(shape[i], begin[i], end[i], step.get(i).copied().flatten()))
            .collect();
        let expected = select_all(&ids, &picks);
        assert!(
            y.to_kind(Kind::Int64).equal(&expected),
            "begin {begin:?} end {end:?} step {step:?}"
        );

        y.sum(Kind::Double).backward();
        let selected = expected.flatten(0, -1);
        let expected_grad = Tensor::zeros(&[numel], (Kind::Double, Device::Cpu))
            .index_fill(0, &selected, 1.0)
            .reshape(&shape);
        assert!(x.grad().equal(&expected_grad));
    }
}

#[test]
fn slice_rejects_zero_step_and_mismatched_lengths() {
    let x = Tensor::zeros(&[4, 4], (Kind::Float, Device::Cpu));
    assert!(ops::slice(&x, &[None], &[None], &[Some(0)]).is_err());
    assert!(ops::slice(&x, &[Some(0)], &[], &[]).is_err());
    assert!(ops::slice(&x, &[None; 3], &[None; 3], &[]).is_err());
}

#[test]
fn logaddexp_values_and_broadcast_gradients() {
    let shapes: Vec<(Vec<i64>, Vec<i64>)> = vec![
        (vec![3, 1], vec![3, 1]),
        (vec![3, 1, 2], vec![3, 1, 2]),
        (vec![1], vec![1]),
        (vec![3, 0], vec![3, 0]),
        (vec![0, 1], vec![0, 1]),
        (vec![2, 0, 2], vec![2, 0, 2]),
        (vec![1], vec![3]),
        (vec![2, 3], vec![2, 1]),
        (vec![1, 3], vec![2, 3]),
        (vec![1, 3], vec![2, 0, 3]),
        (vec![1, 0, 1], vec![3, 0, 1]),
        (vec![], vec![]),
    ];
    for (shape_a, shape_b) in shapes {
        let lhs = Tensor::rand(&shape_a, (Kind::Double, Device::Cpu)).set_requires_grad(true);
        let rhs = Tensor::rand(&shape_b, (Kind::Double, Device::Cpu)).set_requires_grad(true);
        let out = ops::logaddexp(&lhs, &rhs).unwrap();

        let (l, r) = (lhs.detach(), rhs.detach());
        let denom = l.exp() + r.exp();
        let expected = denom.log();
        assert_eq!(out.size(), expected.size(), "{shape_a:?} {shape_b:?}");
        assert!(out.allclose(&expected, 1e-3, 1e-5, false));

        out.sum(Kind::Double).backward();
        let grad_l = (l.exp() / &denom).sum_to_size(&shape_a);
        let grad_r = (r.exp() / &denom).sum_to_size(&shape_b);
        assert!(lhs.grad().allclose(&grad_l, 1e-3, 1e-5, false));
        assert!(rhs.grad().allclose(&grad_r, 1e-3, 1e-5, false));
    }
}

#[test]
fn logaddexp_is_stable_for_large_magnitudes() {
    let x = Tensor::of_slice(&[1000000.0f64, -1000000.0, 1000200.0, -1000200.0]);
    let y = Tensor::of_slice(&[1000200.0f64, -1000200.0, 1000000.0, -1000000.0]);
    let z = Tensor::of_slice(&[1000200.0f64, -1000000.0, 1000200.0, -1000000.0]);
    assert!(ops::logaddexp(&x, &y).unwrap().allclose(&z, 1e-7, 1e-7, false));
}

#[test]
fn logaddexp_rejects_incompatible_shapes() {
    for (shape_a, shape_b) in [(vec![4i64, 5], vec![2i64, 3]), (vec![3, 4, 5], vec![6])] {
        let a = Tensor::rand(&shape_a, (Kind::Float, Device::Cpu));
        let b = Tensor::rand(&shape_b, (Kind::Float, Device::Cpu));
        assert!(ops::logaddexp(&a, &b).is_err());
    }
}
