//! Probability distributions over libtorch tensors.
//! Parameters are stored as tensors so gradients flow back to whoever built them.

use std::sync::atomic::{AtomicBool, Ordering};

use tch::Tensor;

use crate::error::{Error, Result};
use crate::shape::{broadcast_shape, normalize_size};

mod categorical;
mod constraint;
mod exp_family;
mod laplace;
mod multivariate_normal;
mod normal;
mod transformed;

pub use categorical::{Categorical, CategoricalParam};
pub use constraint::Constraint;
pub use exp_family::ExponentialFamily;
pub use laplace::Laplace;
pub use multivariate_normal::{MultivariateNormal, MvnParam};
pub use normal::Normal;
pub use transformed::TransformedDistribution;

static DEFAULT_VALIDATE_ARGS: AtomicBool = AtomicBool::new(false);

/// Sets whether newly built distributions validate their arguments by default.
pub fn set_default_validate_args(value: bool) {
    DEFAULT_VALIDATE_ARGS.store(value, Ordering::Relaxed);
}

/// Whether newly built distributions validate their arguments by default.
pub fn default_validate_args() -> bool {
    DEFAULT_VALIDATE_ARGS.load(Ordering::Relaxed)
}

pub(crate) fn not_implemented(op: &str) -> Error {
    Error::NotImplemented(op.to_string())
}

/// Broadcasts two parameters against each other.
pub(crate) fn broadcast_params(a: Tensor, b: Tensor) -> Result<(Tensor, Tensor)> {
    broadcast_shape(&a.size(), &b.size())?;
    let mut out = Tensor::broadcast_tensors(&[a, b]);
    let b = out.pop();
    let a = out.pop();
    match (a, b) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(Error::Shape("broadcast returned fewer tensors than given".to_string())),
    }
}

/// Shape of `sample_n` output: `size + batch_shape`.
pub(crate) fn sample_n_shape(size: Option<&[i64]>, batch_shape: &[i64]) -> Vec<i64> {
    let mut shape = normalize_size(size).unwrap_or(&[]).to_vec();
    shape.extend_from_slice(batch_shape);
    shape
}

/// Common interface of all distributions.
///
/// Methods a distribution cannot support return [`Error::NotImplemented`].
pub trait Distribution {
    /// Number of rightmost dimensions that make up one event.
    fn event_dim(&self) -> usize;

    /// Shape over which parameters vary independently.
    fn batch_shape(&self) -> Vec<i64>;

    /// Whether `sample` has a pathwise gradient.
    fn has_grad(&self) -> bool {
        false
    }

    fn has_enumerate_support(&self) -> bool {
        false
    }

    /// Whether arguments and samples are checked against their constraints.
    fn validate_args(&self) -> bool;

    /// Constraint describing the distribution's support.
    fn support(&self) -> Result<Constraint> {
        Err(not_implemented("support"))
    }

    /// Log of the probability density/mass function at `value`.
    fn log_prob(&self, value: &Tensor) -> Result<Tensor>;

    /// Probability density/mass function at `value`.
    fn prob(&self, value: &Tensor) -> Result<Tensor> {
        Ok(self.log_prob(value)?.exp())
    }

    /// Cumulative distribution function at `value`.
    fn cdf(&self, _value: &Tensor) -> Result<Tensor> {
        Err(not_implemented("cdf"))
    }

    /// Inverse cumulative distribution function at `value`.
    fn icdf(&self, _value: &Tensor) -> Result<Tensor> {
        Err(not_implemented("icdf"))
    }

    /// Draws a sample. With `None` the shape is the batch shape (plus event shape).
    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor>;

    /// Draws samples of shape `size + batch_shape (+ event shape)`.
    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor>;

    /// All values supported by a discrete distribution.
    fn enumerate_support(&self) -> Result<Tensor> {
        Err(not_implemented("enumerate_support"))
    }

    fn mean(&self) -> Result<Tensor> {
        Err(not_implemented("mean"))
    }

    fn variance(&self) -> Result<Tensor> {
        Err(not_implemented("variance"))
    }

    fn stddev(&self) -> Result<Tensor> {
        Ok(self.variance()?.sqrt())
    }

    fn entropy(&self) -> Result<Tensor> {
        Err(not_implemented("entropy"))
    }

    /// `exp(entropy)`.
    fn perplexity(&self) -> Result<Tensor> {
        Ok(self.entropy()?.exp())
    }

    /// Returns a new distribution with parameters expanded to `batch_shape`.
    fn broadcast_to(&self, _batch_shape: &[i64]) -> Result<Self>
    where
        Self: Sized,
    {
        Err(not_implemented("broadcast_to"))
    }

    /// Checks `value` against the support when validation is on.
    fn validate_sample(&self, value: &Tensor) -> Result<()> {
        if self.validate_args() {
            self.support()?.check("value", value)?;
        }
        Ok(())
    }
}
