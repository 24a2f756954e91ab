use std::f64::consts::{PI, SQRT_2};

use tch::Tensor;

use super::{broadcast_params, default_validate_args, Constraint, Distribution, ExponentialFamily};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::param::{tensor_pair, Param};
use crate::random;
use crate::shape::{broadcast_shape, check_broadcast_to};

/// Normal distribution with mean `loc` and standard deviation `scale`.
pub struct Normal {
    pub loc: Tensor,
    pub scale: Tensor,
    validate_args: bool,
}

impl Normal {
    /// Builds a normal distribution, validating arguments if the process-wide
    /// default says so.
    pub fn new(loc: impl Into<Param>, scale: impl Into<Param>) -> Result<Self> {
        Self::with_validation(loc, scale, None)
    }

    /// Like [`Normal::new`], with an explicit validation setting.
    pub fn with_validation(
        loc: impl Into<Param>,
        scale: impl Into<Param>,
        validate_args: Option<bool>,
    ) -> Result<Self> {
        let (loc, scale) = tensor_pair(loc.into(), scale.into(), Options::default());
        let (loc, scale) = broadcast_params(loc, scale)?;
        let validate_args = validate_args.unwrap_or_else(default_validate_args);
        if validate_args {
            Constraint::Real.check("loc", &loc)?;
            Constraint::Positive.check("scale", &scale)?;
        }
        Ok(Self {
            loc,
            scale,
            validate_args,
        })
    }
}

impl Distribution for Normal {
    fn event_dim(&self) -> usize {
        0
    }

    fn batch_shape(&self) -> Vec<i64> {
        self.loc.size()
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
        broadcast_shape(&value.size(), &self.batch_shape())?;
        let var = self.variance()?;
        let log_scale = self.scale.log();
        Ok(-(value - &self.loc).pow_tensor_scalar(2) / (2.0 * var)
            - log_scale
            - (2.0 * PI).sqrt().ln())
    }

    fn cdf(&self, value: &Tensor) -> Result<Tensor> {
        self.validate_sample(value)?;
        broadcast_shape(&value.size(), &self.batch_shape())?;
        let standardized = (value - &self.loc) / (SQRT_2 * &self.scale);
        Ok(0.5 * (1.0 + standardized.erf()))
    }

    fn icdf(&self, value: &Tensor) -> Result<Tensor> {
        broadcast_shape(&value.size(), &self.batch_shape())?;
        Ok(&self.loc + &self.scale * (2.0_f64 * value - 1.0).erfinv() * SQRT_2)
    }

    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor> {
        random::normal(&self.loc, &self.scale, size, Options::like(&self.loc))
    }

    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor> {
        random::normal_n(&self.loc, &self.scale, size, Options::like(&self.loc))
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.loc.shallow_clone())
    }

    fn variance(&self) -> Result<Tensor> {
        Ok(self.scale.pow_tensor_scalar(2))
    }

    fn stddev(&self) -> Result<Tensor> {
        Ok(self.scale.shallow_clone())
    }

    fn entropy(&self) -> Result<Tensor> {
        Ok(0.5 + 0.5 * (2.0 * PI).ln() + self.scale.log())
    }

    fn broadcast_to(&self, batch_shape: &[i64]) -> Result<Self> {
        check_broadcast_to(&self.batch_shape(), batch_shape)?;
        Ok(Self {
            loc: self.loc.f_expand(batch_shape, false)?,
            scale: self.scale.f_expand(batch_shape, false)?,
            validate_args: self.validate_args,
        })
    }
}

impl ExponentialFamily for Normal {
    /// `(loc / scale^2, -0.5 / scale^2)`
    fn natural_params(&self) -> Vec<Tensor> {
        let var = self.scale.pow_tensor_scalar(2);
        vec![&self.loc / &var, var.reciprocal() * -0.5]
    }

    fn log_normalizer(&self, natural_params: &[Tensor]) -> Result<Tensor> {
        let [x, y] = natural_params else {
            return Err(Error::InvalidArgument(format!(
                "normal has 2 natural parameters, got {}",
                natural_params.len()
            )));
        };
        Ok(-0.25 * x.pow_tensor_scalar(2) / y + 0.5 * (y.reciprocal() * -PI).log())
    }
}
