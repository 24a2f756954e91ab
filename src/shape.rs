//! Shape bookkeeping shared by the samplers and distributions.
//! Only validates shapes; broadcasting itself is left to libtorch.

use crate::error::{Error, Result};

/// Concatenates sample, batch and event shapes.
pub fn extended_shape(sample_shape: &[i64], batch_shape: &[i64], event_shape: &[i64]) -> Vec<i64> {
    let mut shape = Vec::new();
    shape.extend_from_slice(sample_shape);
    shape.extend_from_slice(batch_shape);
    shape.extend_from_slice(event_shape);
    shape
}

/// Returns the numpy-style broadcast of two shapes.
pub fn broadcast_shape(a: &[i64], b: &[i64]) -> Result<Vec<i64>> {
    let ndim = a.len().max(b.len());
    let mut out = vec![0; ndim];
    for i in 0..ndim {
        let da = if i < ndim - a.len() { 1 } else { a[i - (ndim - a.len())] };
        let db = if i < ndim - b.len() { 1 } else { b[i - (ndim - b.len())] };
        out[i] = match (da, db) {
            (x, y) if x == y => x,
            (1, y) => y,
            (x, 1) => x,
            _ => {
                return Err(Error::Shape(format!(
                    "operands could not be broadcast together with shapes {a:?} {b:?}"
                )))
            }
        };
    }
    Ok(out)
}

/// Broadcasts any number of shapes. An empty list gives a scalar shape.
pub fn broadcast_shapes(shapes: &[&[i64]]) -> Result<Vec<i64>> {
    shapes
        .iter()
        .try_fold(Vec::new(), |acc, shape| broadcast_shape(&acc, shape))
}

/// Checks that `from` can be broadcast to exactly `to`.
pub fn check_broadcast_to(from: &[i64], to: &[i64]) -> Result<()> {
    if broadcast_shape(from, to)? != to {
        return Err(Error::Shape(format!(
            "shape {from:?} cannot be broadcast to {to:?}"
        )));
    }
    Ok(())
}

/// Treats an empty `size` the same as no size.
pub fn normalize_size(size: Option<&[i64]>) -> Option<&[i64]> {
    size.filter(|s| !s.is_empty())
}

/// Resolves the output shape of a sampler from its `size` argument and the
/// shapes of its tensor parameters.
pub fn output_shape(size: Option<&[i64]>, param_shapes: &[&[i64]]) -> Result<Vec<i64>> {
    let params = broadcast_shapes(param_shapes)?;
    match normalize_size(size) {
        None => Ok(params),
        Some(size) => {
            check_broadcast_to(&params, size)?;
            Ok(size.to_vec())
        }
    }
}

/// Number of elements in a shape.
pub fn numel(shape: &[i64]) -> i64 {
    shape.iter().product()
}

/// Maps a possibly negative axis into `0..ndim`.
pub fn normalize_axis(axis: i64, ndim: usize) -> Result<usize> {
    let ndim = ndim as i64;
    let axis_norm = if axis < 0 { axis + ndim } else { axis };
    if !(0..ndim).contains(&axis_norm) {
        return Err(Error::InvalidArgument(format!(
            "axis {axis} is out of bounds for array of dimension {ndim}"
        )));
    }
    Ok(axis_norm as usize)
}
