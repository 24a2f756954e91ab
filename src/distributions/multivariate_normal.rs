use std::cell::OnceCell;
use std::f64::consts::{E, PI};

use tch::Tensor;

use super::{default_validate_args, sample_n_shape, Constraint, Distribution};
use crate::error::{Error, Result};
use crate::ops;
use crate::options::Options;
use crate::shape::{self, broadcast_shape, check_broadcast_to, extended_shape};

/// The matrix a [`MultivariateNormal`] is built from.
pub enum MvnParam {
    Cov(Tensor),
    Precision(Tensor),
    ScaleTril(Tensor),
}

/// Multivariate normal distribution over the last dimension of `loc`.
///
/// Exactly one of covariance, precision or lower Cholesky factor is given;
/// the other two are derived on first use and cached.
pub struct MultivariateNormal {
    pub loc: Tensor,
    cov: OnceCell<Tensor>,
    precision: OnceCell<Tensor>,
    scale_tril: OnceCell<Tensor>,
    batch_shape: Vec<i64>,
    validate_args: bool,
}

fn sum_last(t: &Tensor) -> Result<Tensor> {
    ops::sum(t, Some(&[-1]), None, false)
}

/// `P = inv(L L^T)`, so `L = inv(flip(cholesky(flip(P)))^T)`.
fn precision_to_scale_tril(precision: &Tensor) -> Result<Tensor> {
    let l_flip_inv_t = precision.flip(&[-1, -2]).f_cholesky(false)?;
    Ok(l_flip_inv_t.flip(&[-1, -2]).transpose(-1, -2).f_inverse()?)
}

impl MultivariateNormal {
    pub fn new(loc: Tensor, param: MvnParam) -> Result<Self> {
        Self::with_validation(loc, param, None)
    }

    /// Builds the distribution from optional parts, exactly one of which must be set.
    pub fn from_parts(
        loc: Tensor,
        cov: Option<Tensor>,
        precision: Option<Tensor>,
        scale_tril: Option<Tensor>,
    ) -> Result<Self> {
        let param = match (cov, precision, scale_tril) {
            (Some(cov), None, None) => MvnParam::Cov(cov),
            (None, Some(precision), None) => MvnParam::Precision(precision),
            (None, None, Some(scale_tril)) => MvnParam::ScaleTril(scale_tril),
            _ => {
                return Err(Error::InvalidArgument(
                    "exactly one of `cov`, `precision` or `scale_tril` may be specified"
                        .to_string(),
                ))
            }
        };
        Self::new(loc, param)
    }

    pub fn with_validation(
        loc: Tensor,
        param: MvnParam,
        validate_args: Option<bool>,
    ) -> Result<Self> {
        let (name, matrix, constraint) = match &param {
            MvnParam::Cov(m) => ("cov", m, Constraint::PositiveDefinite),
            MvnParam::Precision(m) => ("precision", m, Constraint::PositiveDefinite),
            MvnParam::ScaleTril(m) => ("scale_tril", m, Constraint::LowerCholesky),
        };
        let loc_shape = loc.size();
        let matrix_shape = matrix.size();
        if loc_shape.is_empty() {
            return Err(Error::Shape("loc must be at least 1-dimensional".to_string()));
        }
        if matrix_shape.len() < 2
            || matrix_shape[matrix_shape.len() - 1] != matrix_shape[matrix_shape.len() - 2]
            || loc_shape.last() != matrix_shape.last()
        {
            return Err(Error::Shape(format!(
                "{name} of shape {matrix_shape:?} does not match loc of shape {loc_shape:?}"
            )));
        }
        let batch_shape = broadcast_shape(
            &loc_shape[..loc_shape.len() - 1],
            &matrix_shape[..matrix_shape.len() - 2],
        )?;

        let validate_args = validate_args.unwrap_or_else(default_validate_args);
        if validate_args {
            Constraint::Real.check("loc", &loc)?;
            constraint.check(name, matrix)?;
        }

        let mvn = Self {
            loc,
            cov: OnceCell::new(),
            precision: OnceCell::new(),
            scale_tril: OnceCell::new(),
            batch_shape,
            validate_args,
        };
        let cell = match param {
            MvnParam::Cov(m) => mvn.cov.set(m),
            MvnParam::Precision(m) => mvn.precision.set(m),
            MvnParam::ScaleTril(m) => mvn.scale_tril.set(m),
        };
        if cell.is_err() {
            return Err(Error::InvalidArgument("matrix set twice".to_string()));
        }
        Ok(mvn)
    }

    /// Number of dimensions of one event.
    pub fn event_size(&self) -> i64 {
        self.loc.size().last().copied().unwrap_or(1)
    }

    /// Lower Cholesky factor of the covariance. Fails if the matrix it is
    /// derived from is not positive-definite.
    pub fn scale_tril(&self) -> Result<&Tensor> {
        if let Some(l) = self.scale_tril.get() {
            return Ok(l);
        }
        let l = match self.cov.get() {
            Some(cov) => cov.f_cholesky(false)?,
            None => precision_to_scale_tril(self.precision()?)?,
        };
        Ok(self.scale_tril.get_or_init(|| l))
    }

    pub fn cov(&self) -> Result<&Tensor> {
        if let Some(cov) = self.cov.get() {
            return Ok(cov);
        }
        let cov = match self.scale_tril.get() {
            Some(l) => l.matmul(&l.transpose(-1, -2)),
            None => self.precision()?.f_inverse()?,
        };
        Ok(self.cov.get_or_init(|| cov))
    }

    pub fn precision(&self) -> Result<&Tensor> {
        if let Some(precision) = self.precision.get() {
            return Ok(precision);
        }
        let precision = match self.cov.get() {
            Some(cov) => cov.f_inverse()?,
            None => {
                let l_inv = self.scale_tril()?.f_inverse()?;
                l_inv.transpose(-1, -2).matmul(&l_inv)
            }
        };
        Ok(self.precision.get_or_init(|| precision))
    }

    /// Draws `loc + L z` with standard normal `z` of shape `batch + [k]`.
    fn draw(&self, batch: &[i64]) -> Result<Tensor> {
        let scale_tril = self.scale_tril()?;
        let shape = extended_shape(batch, &[self.event_size()], &[]);
        let noise = Tensor::randn(&shape, Options::like(&self.loc).pair());
        let correlated = scale_tril.matmul(&noise.unsqueeze(-1)).squeeze_dim(-1);
        Ok(&self.loc + correlated)
    }
}

impl Distribution for MultivariateNormal {
    fn event_dim(&self) -> usize {
        1
    }

    fn batch_shape(&self) -> Vec<i64> {
        self.batch_shape.clone()
    }

    fn has_grad(&self) -> bool {
        true
    }

    fn validate_args(&self) -> bool {
        self.validate_args
    }

    fn support(&self) -> Result<Constraint> {
        Ok(Constraint::Real)
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        self.validate_sample(value)?;
        if value.size().last() != Some(&self.event_size()) {
            return Err(Error::Shape(format!(
                "value of shape {:?} does not end in event size {}",
                value.size(),
                self.event_size()
            )));
        }
        let diff = value - &self.loc;
        let precision_diff = self.precision()?.matmul(&diff.unsqueeze(-1)).squeeze_dim(-1);
        let mahalanobis = sum_last(&(&diff * precision_diff))? * -0.5;
        let half_log_det = sum_last(
            &((2.0 * PI).sqrt() * self.scale_tril()?.diagonal(0, -2, -1)).log(),
        )?;
        Ok(mahalanobis - half_log_det)
    }

    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor> {
        let batch = shape::output_shape(size, &[self.batch_shape().as_slice()])?;
        self.draw(&batch)
    }

    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor> {
        self.draw(&sample_n_shape(size, &self.batch_shape()))
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.loc.shallow_clone())
    }

    /// Diagonal of the covariance, as row sums of `L^2`.
    fn variance(&self) -> Result<Tensor> {
        sum_last(&self.scale_tril()?.pow_tensor_scalar(2))
    }

    fn entropy(&self) -> Result<Tensor> {
        sum_last(&((2.0 * PI * E).sqrt() * self.scale_tril()?.diagonal(0, -2, -1)).log())
    }

    fn broadcast_to(&self, batch_shape: &[i64]) -> Result<Self> {
        check_broadcast_to(&self.batch_shape, batch_shape)?;
        let k = self.event_size();
        let loc = self
            .loc
            .f_expand(&extended_shape(batch_shape, &[k], &[]), false)?;
        let scale_tril = self
            .scale_tril()?
            .f_expand(&extended_shape(batch_shape, &[k, k], &[]), false)?;
        Self::with_validation(loc, MvnParam::ScaleTril(scale_tril), Some(false)).map(|mut mvn| {
            mvn.validate_args = self.validate_args;
            mvn
        })
    }
}
