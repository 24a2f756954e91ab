//! Numpy-flavoured reduction, slicing and broadcasting operators built from
//! differentiable libtorch primitives.

use tch::{Kind, Tensor};

use crate::error::{Error, Result};
use crate::shape::{broadcast_shape, normalize_axis};

/// Accumulation type used when summing `kind`.
pub fn acc_kind(kind: Kind) -> Kind {
    match kind {
        Kind::Half | Kind::BFloat16 | Kind::Float => Kind::Double,
        Kind::Double => Kind::Double,
        Kind::Bool | Kind::Int8 | Kind::Uint8 | Kind::Int16 | Kind::Int | Kind::Int64 => {
            Kind::Int64
        }
        other => other,
    }
}

pub(crate) fn is_floating(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Half | Kind::BFloat16 | Kind::Float | Kind::Double
    )
}

/// Sums `x` over `axis`.
///
/// `None` reduces every axis, `Some(&[])` reduces none. The sum is accumulated
/// in a wider type and cast to `dtype` (the input kind for floats, `Int64`
/// for integers, when `dtype` is `None`).
pub fn sum(x: &Tensor, axis: Option<&[i64]>, dtype: Option<Kind>, keepdims: bool) -> Result<Tensor> {
    let shape = x.size();
    let ndim = shape.len();
    let mut reduce = vec![false; ndim];
    match axis {
        None => reduce.iter_mut().for_each(|r| *r = true),
        Some(axes) => {
            for &a in axes {
                let a = normalize_axis(a, ndim)?;
                if reduce[a] {
                    return Err(Error::InvalidArgument(format!("duplicate value in axis: {a}")));
                }
                reduce[a] = true;
            }
        }
    }
    let dtype = dtype.unwrap_or_else(|| {
        if is_floating(x.kind()) {
            x.kind()
        } else {
            Kind::Int64
        }
    });
    if !is_floating(dtype) && is_floating(x.kind()) {
        return Err(Error::InvalidArgument(format!(
            "cannot sum {:?} into integer type {dtype:?}",
            x.kind()
        )));
    }
    let kept: Vec<i64> = shape
        .iter()
        .zip(&reduce)
        .map(|(&d, &r)| if r { 1 } else { d })
        .collect();
    let summed = x.to_kind(acc_kind(x.kind())).sum_to_size(&kept);
    let summed = if keepdims {
        summed
    } else {
        let squeezed: Vec<i64> = shape
            .iter()
            .zip(&reduce)
            .filter(|(_, r)| !**r)
            .map(|(&d, _)| d)
            .collect();
        summed.reshape(&squeezed)
    };
    Ok(summed.to_kind(dtype))
}

/// Resolves one axis of a basic slice into `(start, length, step)` over the
/// axis, with `step` possibly negative.
fn resolve_slice(
    dim: i64,
    begin: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
) -> Result<(i64, i64, i64)> {
    let step = step.unwrap_or(1);
    if step == 0 {
        return Err(Error::InvalidArgument("slice step cannot be zero".to_string()));
    }
    let wrap = |v: i64| if v < 0 { v + dim } else { v };
    if step > 0 {
        let start = begin.map_or(0, |b| wrap(b).clamp(0, dim));
        let stop = end.map_or(dim, |e| wrap(e).clamp(0, dim));
        let len = if stop > start { (stop - start + step - 1) / step } else { 0 };
        Ok((start, len, step))
    } else {
        let start = begin.map_or(dim - 1, |b| wrap(b).clamp(-1, dim - 1));
        let stop = end.map_or(-1, |e| wrap(e).clamp(-1, dim - 1));
        let len = if start > stop { (start - stop - step - 1) / -step } else { 0 };
        Ok((start, len, step))
    }
}

/// Basic slicing over the leading axes of `x`, with numpy semantics.
///
/// `begin`, `end` and `step` hold one entry per sliced axis; `None` entries
/// take numpy's defaults. An empty `step` means unit steps.
pub fn slice(
    x: &Tensor,
    begin: &[Option<i64>],
    end: &[Option<i64>],
    step: &[Option<i64>],
) -> Result<Tensor> {
    if begin.len() != end.len() || (!step.is_empty() && step.len() != begin.len()) {
        return Err(Error::InvalidArgument(format!(
            "begin, end and step must have the same length, got {}, {} and {}",
            begin.len(),
            end.len(),
            step.len()
        )));
    }
    let shape = x.size();
    if begin.len() > shape.len() {
        return Err(Error::Shape(format!(
            "too many slice axes ({}) for shape {shape:?}",
            begin.len()
        )));
    }
    let mut out = x.shallow_clone();
    for (axis, (&b, &e)) in begin.iter().zip(end).enumerate() {
        let s = step.get(axis).copied().flatten();
        let dim = shape[axis];
        let (start, len, s) = resolve_slice(dim, b, e, s)?;
        let axis = axis as i64;
        out = if len == 0 {
            out.narrow(axis, 0, 0)
        } else if s > 0 {
            out.slice(axis, start, start + (len - 1) * s + 1, s)
        } else {
            let flipped_start = dim - 1 - start;
            out.flip(&[axis])
                .slice(axis, flipped_start, flipped_start + (len - 1) * -s + 1, -s)
        };
    }
    Ok(out)
}

/// `log(exp(a) + exp(b))` with broadcasting.
pub fn logaddexp(a: &Tensor, b: &Tensor) -> Result<Tensor> {
    broadcast_shape(&a.size(), &b.size())?;
    Ok(a.f_logaddexp(b)?)
}
