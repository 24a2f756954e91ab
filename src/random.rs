//! Random sampling routines with `numpy.random` semantics, dispatched to libtorch.
//!
//! Parameters are taken as [`Param`]s. When every parameter is a host scalar
//! the backend's in-place samplers fill the output directly; otherwise standard
//! draws of the broadcast shape are combined with the parameter tensors, which
//! keeps the result differentiable with respect to them.

use tch::{Kind, Tensor};

use crate::error::{Error, Result};
use crate::ops;
use crate::options::Options;
use crate::param::{tensor_pair, Param};
use crate::shape::{self, broadcast_shape, extended_shape, normalize_size, numel};

/// True if any element of a boolean tensor is set.
pub(crate) fn any(mask: &Tensor) -> bool {
    mask.any().to_kind(Kind::Int64).int64_value(&[]) != 0
}

fn check_non_negative(name: &str, param: &Param) -> Result<()> {
    let negative = match param {
        Param::Scalar(v) => *v < 0.0,
        Param::Tensor(t) => any(&t.lt(0.0)),
    };
    if negative {
        return Err(Error::InvalidArgument(format!("{name} < 0")));
    }
    Ok(())
}

fn check_positive(name: &str, param: &Param) -> Result<()> {
    let non_positive = match param {
        Param::Scalar(v) => *v <= 0.0,
        Param::Tensor(t) => any(&t.le(0.0)),
    };
    if non_positive {
        return Err(Error::InvalidArgument(format!("{name} <= 0")));
    }
    Ok(())
}

/// Returns random integers from `[low, high)`, or from `[0, low)` when `high` is `None`.
///
/// Floating-point kinds in `options` are replaced by `Int64`.
pub fn randint(
    low: i64,
    high: Option<i64>,
    size: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (low, high) = match high {
        Some(high) => (low, high),
        None => (0, low),
    };
    if low >= high {
        return Err(Error::InvalidArgument(format!("low >= high ({low} >= {high})")));
    }
    let shape = normalize_size(size).unwrap_or(&[]);
    let kind = if ops::is_floating(options.kind) {
        Kind::Int64
    } else {
        options.kind
    };
    tracing::debug!(low, high, ?shape, ?kind, "randint");
    Ok(Tensor::randint_low(low, high, shape, (kind, options.device)))
}

/// Draws samples from a uniform distribution over `[low, high)`.
pub fn uniform(
    low: impl Into<Param>,
    high: impl Into<Param>,
    size: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (low, high) = (low.into(), high.into());
    let shape = shape::output_shape(size, &[low.shape().as_slice(), high.shape().as_slice()])?;
    tracing::debug!(
        low_tensor = low.is_tensor(),
        high_tensor = high.is_tensor(),
        ?shape,
        "uniform"
    );
    let samples = match (low, high) {
        (Param::Tensor(low), Param::Tensor(high)) => {
            let u = Tensor::rand(&shape, Options::like(&low).pair());
            &low + (&high - &low) * u
        }
        (Param::Scalar(low), Param::Tensor(high)) => {
            let u = Tensor::rand(&shape, Options::like(&high).pair());
            low + (&high - low) * u
        }
        (Param::Tensor(low), Param::Scalar(high)) => {
            let u = Tensor::rand(&shape, Options::like(&low).pair());
            &low + (high - &low) * u
        }
        (Param::Scalar(low), Param::Scalar(high)) => {
            Tensor::empty(&shape, options.pair()).uniform_(low, high)
        }
    };
    Ok(samples)
}

/// Random values in `[0, 1)` of the given shape.
pub fn rand(shape: &[i64]) -> Result<Tensor> {
    uniform(0.0, 1.0, Some(shape), Options::default())
}

/// Draws samples from a normal distribution with mean `loc` and standard deviation `scale`.
pub fn normal(
    loc: impl Into<Param>,
    scale: impl Into<Param>,
    size: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (loc, scale) = (loc.into(), scale.into());
    check_non_negative("scale", &scale)?;
    let shape = shape::output_shape(size, &[loc.shape().as_slice(), scale.shape().as_slice()])?;
    tracing::debug!(
        loc_tensor = loc.is_tensor(),
        scale_tensor = scale.is_tensor(),
        ?shape,
        "normal"
    );
    let samples = match (loc, scale) {
        (Param::Tensor(loc), Param::Tensor(scale)) => {
            let noise = Tensor::randn(&shape, Options::like(&loc).pair());
            &loc + &scale * noise
        }
        (Param::Scalar(loc), Param::Tensor(scale)) => {
            let noise = Tensor::randn(&shape, Options::like(&scale).pair());
            loc + &scale * noise
        }
        (Param::Tensor(loc), Param::Scalar(scale)) => {
            let noise = Tensor::randn(&shape, Options::like(&loc).pair());
            &loc + noise * scale
        }
        (Param::Scalar(loc), Param::Scalar(scale)) => {
            Tensor::empty(&shape, options.pair()).normal_(loc, scale)
        }
    };
    Ok(samples)
}

/// Draws samples of shape `batch + broadcast(loc, scale).shape`.
pub fn normal_n(
    loc: impl Into<Param>,
    scale: impl Into<Param>,
    batch: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (loc, scale) = (loc.into(), scale.into());
    let param_shape = broadcast_shape(&loc.shape(), &scale.shape())?;
    let shape = extended_shape(normalize_size(batch).unwrap_or(&[]), &param_shape, &[]);
    normal(loc, scale, Some(&shape), options)
}

/// Draws samples from a Laplace distribution as the scaled difference of two
/// standard exponential draws.
pub fn laplace(
    loc: impl Into<Param>,
    scale: impl Into<Param>,
    size: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (loc, scale) = (loc.into(), scale.into());
    check_non_negative("scale", &scale)?;
    let shape = shape::output_shape(size, &[loc.shape().as_slice(), scale.shape().as_slice()])?;
    tracing::debug!(?shape, "laplace");
    let (loc, scale) = tensor_pair(loc, scale, options);
    let opts = Options::like(&loc).pair();
    let e1 = Tensor::empty(&shape, opts).exponential_(1.0);
    let e2 = Tensor::empty(&shape, opts).exponential_(1.0);
    Ok(&loc + &scale * (e1 - e2))
}

/// Draws samples from an exponential distribution with scale `1 / lambda`.
pub fn exponential(scale: impl Into<Param>, size: Option<&[i64]>) -> Result<Tensor> {
    let scale = scale.into();
    check_non_negative("scale", &scale)?;
    let shape = shape::output_shape(size, &[scale.shape().as_slice()])?;
    tracing::debug!(scale_tensor = scale.is_tensor(), ?shape, "exponential");
    let samples = match scale {
        Param::Tensor(scale) => {
            let draws = Tensor::empty(&shape, Options::like(&scale).pair()).exponential_(1.0);
            draws * &scale
        }
        Param::Scalar(scale) if scale == 0.0 => Tensor::zeros(&shape, Options::default().pair()),
        Param::Scalar(scale) => {
            Tensor::empty(&shape, Options::default().pair()).exponential_(1.0 / scale)
        }
    };
    Ok(samples)
}

/// Draws samples from a Gamma distribution with the given `shape` (k) and `scale` (theta).
pub fn gamma(
    shape: impl Into<Param>,
    scale: impl Into<Param>,
    size: Option<&[i64]>,
    options: Options,
) -> Result<Tensor> {
    let (shape, scale) = (shape.into(), scale.into());
    check_positive("shape", &shape)?;
    check_positive("scale", &scale)?;
    let out = shape::output_shape(size, &[shape.shape().as_slice(), scale.shape().as_slice()])?;
    tracing::debug!(
        shape_tensor = shape.is_tensor(),
        scale_tensor = scale.is_tensor(),
        ?out,
        "gamma"
    );
    let samples = match (shape, scale) {
        (Param::Tensor(shape), Param::Tensor(scale)) => {
            let standard = shape.expand(&out, false).contiguous().internal_standard_gamma();
            standard * &scale
        }
        (Param::Scalar(shape), Param::Tensor(scale)) => {
            let standard =
                Tensor::full(&out, shape, Options::like(&scale).pair()).internal_standard_gamma();
            standard * &scale
        }
        (Param::Tensor(shape), Param::Scalar(scale)) => {
            let standard = shape.expand(&out, false).contiguous().internal_standard_gamma();
            standard * scale
        }
        (Param::Scalar(shape), Param::Scalar(scale)) => {
            Tensor::full(&out, shape, options.pair()).internal_standard_gamma() * scale
        }
    };
    Ok(samples)
}

/// Probabilities accepted by [`multinomial`].
pub enum PVals {
    Tensor(Tensor),
    List(Vec<f64>),
    /// A list of lists; always rejected.
    Nested(Vec<Vec<f64>>),
}

impl From<Tensor> for PVals {
    fn from(t: Tensor) -> Self {
        PVals::Tensor(t)
    }
}

impl From<&Tensor> for PVals {
    fn from(t: &Tensor) -> Self {
        PVals::Tensor(t.shallow_clone())
    }
}

impl From<Vec<f64>> for PVals {
    fn from(v: Vec<f64>) -> Self {
        PVals::List(v)
    }
}

impl From<&[f64]> for PVals {
    fn from(v: &[f64]) -> Self {
        PVals::List(v.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for PVals {
    fn from(v: [f64; N]) -> Self {
        PVals::List(v.to_vec())
    }
}

impl From<Vec<Vec<f64>>> for PVals {
    fn from(v: Vec<Vec<f64>>) -> Self {
        PVals::Nested(v)
    }
}

/// Draws outcome counts from a multinomial distribution.
///
/// Each sample counts how often each of the `k` outcomes occurred in `n`
/// experiments. The output has shape `size + [k]`. As in numpy, the last
/// probability is replaced by whatever mass the others leave over.
pub fn multinomial(n: i64, pvals: impl Into<PVals>, size: Option<&[i64]>) -> Result<Tensor> {
    let probs = match pvals.into() {
        PVals::Nested(_) => {
            return Err(Error::InvalidArgument(
                "object too deep for desired array".to_string(),
            ))
        }
        PVals::List(v) => Tensor::of_slice(&v),
        PVals::Tensor(t) => {
            if t.dim() != 1 {
                return Err(Error::Shape(format!(
                    "pvals must be 1-dimensional, got shape {:?}",
                    t.size()
                )));
            }
            t.detach().to_kind(Kind::Double)
        }
    };
    if n < 0 {
        return Err(Error::InvalidArgument(format!("n < 0 ({n})")));
    }
    let k = probs.size()[0];
    if k == 0 {
        return Err(Error::InvalidArgument("pvals must not be empty".to_string()));
    }
    if any(&probs.lt(0.0)) {
        return Err(Error::InvalidArgument("pvals < 0".to_string()));
    }
    let head = probs.narrow(0, 0, k - 1);
    let head_sum = head.sum(Kind::Double).double_value(&[]);
    if head_sum > 1.0 + 1e-12 {
        return Err(Error::InvalidArgument("sum(pvals[:-1]) > 1.0".to_string()));
    }
    let last = Tensor::full(&[1], (1.0 - head_sum).max(0.0), Options::like(&head).pair());
    let probs = Tensor::cat(&[head, last], 0);

    let sample_shape = normalize_size(size).unwrap_or(&[]);
    let rows = numel(sample_shape);
    let out_shape = extended_shape(sample_shape, &[k], &[]);
    tracing::debug!(n, k, ?out_shape, "multinomial");
    if n == 0 || rows == 0 {
        return Ok(Tensor::zeros(&out_shape, (Kind::Int64, probs.device())));
    }
    let draws = probs
        .unsqueeze(0)
        .expand(&[rows, k], false)
        .contiguous()
        .multinomial(n, true);
    let counts =
        Tensor::zeros(&[rows, k], (Kind::Int64, probs.device())).scatter_add(1, &draws, &draws.ones_like());
    Ok(counts.reshape(&out_shape))
}

/// Behaviour when a covariance matrix is not positive semi-definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckValid {
    Warn,
    Raise,
    Ignore,
}

/// Draws samples from a multivariate normal distribution.
///
/// `mean` has shape `(..., N)` and `cov` shape `(..., N, N)`; their batch
/// shapes are broadcast. The output has shape
/// `size + broadcast(mean.shape, cov.shape[..-1])`. `check_valid` and `tol`
/// are not supported.
pub fn multivariate_normal(
    mean: &Tensor,
    cov: &Tensor,
    size: Option<&[i64]>,
    check_valid: Option<CheckValid>,
    tol: Option<f64>,
) -> Result<Tensor> {
    if check_valid.is_some() {
        return Err(Error::NotImplemented(
            "parameter `check_valid` is not supported".to_string(),
        ));
    }
    if tol.is_some() {
        return Err(Error::NotImplemented("parameter `tol` is not supported".to_string()));
    }
    let cov_shape = cov.size();
    let mean_shape = mean.size();
    if cov_shape.len() < 2 || cov_shape[cov_shape.len() - 1] != cov_shape[cov_shape.len() - 2] {
        return Err(Error::Shape(format!(
            "cov must be a batch of square matrices, got shape {cov_shape:?}"
        )));
    }
    if mean_shape.last() != cov_shape.last() {
        return Err(Error::Shape(format!(
            "mean shape {mean_shape:?} does not match cov shape {cov_shape:?}"
        )));
    }
    let base = broadcast_shape(&mean_shape, &cov_shape[..cov_shape.len() - 1])?;
    let out = extended_shape(normalize_size(size).unwrap_or(&[]), &base, &[]);
    tracing::debug!(?out, "multivariate_normal");
    let scale_tril = cov.f_cholesky(false)?.to_kind(mean.kind());
    let noise = Tensor::randn(&out, Options::like(mean).pair());
    Ok(mean + scale_tril.matmul(&noise.unsqueeze(-1)).squeeze_dim(-1))
}

/// Population accepted by [`choice`]: either `0..n` or the elements of a 1-D tensor.
pub enum Population {
    Range(i64),
    Tensor(Tensor),
}

impl From<i64> for Population {
    fn from(n: i64) -> Self {
        Population::Range(n)
    }
}

impl From<Tensor> for Population {
    fn from(t: Tensor) -> Self {
        Population::Tensor(t)
    }
}

impl From<&Tensor> for Population {
    fn from(t: &Tensor) -> Self {
        Population::Tensor(t.shallow_clone())
    }
}

/// Generates a random sample from a population.
///
/// With a [`Population::Range`] the result holds `Int64` indices; with a
/// tensor it holds the chosen elements. `p` weights the entries and must
/// have the population's length.
pub fn choice(
    a: impl Into<Population>,
    size: Option<&[i64]>,
    replace: bool,
    p: Option<&Tensor>,
    device: tch::Device,
) -> Result<Tensor> {
    let (n, pool) = match a.into() {
        Population::Range(n) => (n, None),
        Population::Tensor(t) => {
            if t.dim() != 1 {
                return Err(Error::Shape("a must be 1-dimensional".to_string()));
            }
            (t.size()[0], Some(t))
        }
    };
    let size = normalize_size(size);
    let total = size.map_or(1, numel);
    if n <= 0 && total > 0 {
        return Err(Error::InvalidArgument(
            "a must be greater than 0 unless no samples are taken".to_string(),
        ));
    }
    if !replace && total > n {
        return Err(Error::InvalidArgument(
            "cannot take a larger sample than population when replace is false".to_string(),
        ));
    }
    let device = pool.as_ref().map_or(device, |t| t.device());
    tracing::debug!(n, total, replace, weighted = p.is_some(), "choice");
    let indices = match p {
        _ if total == 0 => Tensor::zeros(&[0], (Kind::Int64, device)),
        Some(p) => {
            if p.dim() != 1 || p.size()[0] != n {
                return Err(Error::Shape("a and p must have same size".to_string()));
            }
            if any(&p.lt(0.0)) {
                return Err(Error::InvalidArgument(
                    "probabilities are not non-negative".to_string(),
                ));
            }
            let nonzero = p.ne(0.0).sum(Kind::Int64).int64_value(&[]);
            if !replace && total > nonzero {
                return Err(Error::InvalidArgument(
                    "fewer non-zero entries in p than size".to_string(),
                ));
            }
            p.detach().to_device(device).multinomial(total, replace)
        }
        None if replace => Tensor::randint(n, &[total], (Kind::Int64, device)),
        None => Tensor::randperm(n, (Kind::Int64, device)).narrow(0, 0, total),
    };
    let indices = indices.reshape(size.unwrap_or(&[]));
    Ok(match pool {
        Some(pool) => pool.take(&indices),
        None => indices,
    })
}

/// Shuffles `x` in place along its first axis.
pub fn shuffle(x: &mut Tensor) -> Result<()> {
    if x.dim() == 0 {
        return Err(Error::InvalidArgument("cannot shuffle a 0-d tensor".to_string()));
    }
    let n = x.size()[0];
    tracing::debug!(n, "shuffle");
    tch::no_grad(|| -> Result<()> {
        let perm = Tensor::randperm(n, (Kind::Int64, x.device()));
        let shuffled = x.index_select(0, &perm);
        x.f_copy_(&shuffled)?;
        Ok(())
    })
}
