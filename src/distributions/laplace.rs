use std::f64::consts::SQRT_2;

use tch::Tensor;

use super::{broadcast_params, default_validate_args, sample_n_shape, Constraint, Distribution};
use crate::error::Result;
use crate::options::Options;
use crate::param::{tensor_pair, Param};
use crate::random;
use crate::shape::{broadcast_shape, check_broadcast_to};

/// Laplace distribution with location `loc` and scale `scale`.
pub struct Laplace {
    pub loc: Tensor,
    pub scale: Tensor,
    validate_args: bool,
}

impl Laplace {
    pub fn new(loc: impl Into<Param>, scale: impl Into<Param>) -> Result<Self> {
        Self::with_validation(loc, scale, None)
    }

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

impl Distribution for Laplace {
    fn event_dim(&self) -> usize {
        0
    }

    fn batch_shape(&self) -> Vec<i64> {
        self.loc.size()
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
        Ok(-(2.0_f64 * &self.scale).log() - (value - &self.loc).abs() / &self.scale)
    }

    fn cdf(&self, value: &Tensor) -> Result<Tensor> {
        self.validate_sample(value)?;
        broadcast_shape(&value.size(), &self.batch_shape())?;
        let centered = value - &self.loc;
        Ok(0.5 - 0.5 * centered.sign() * (-centered.abs() / &self.scale).expm1())
    }

    fn icdf(&self, value: &Tensor) -> Result<Tensor> {
        broadcast_shape(&value.size(), &self.batch_shape())?;
        let centered = value - 0.5;
        Ok(&self.loc - &self.scale * centered.sign() * (-2.0_f64 * centered.abs()).log1p())
    }

    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor> {
        random::laplace(&self.loc, &self.scale, size, Options::like(&self.loc))
    }

    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor> {
        let shape = sample_n_shape(size, &self.batch_shape());
        random::laplace(&self.loc, &self.scale, Some(&shape), Options::like(&self.loc))
    }

    fn mean(&self) -> Result<Tensor> {
        Ok(self.loc.shallow_clone())
    }

    fn variance(&self) -> Result<Tensor> {
        Ok(2.0 * self.scale.pow_tensor_scalar(2))
    }

    fn stddev(&self) -> Result<Tensor> {
        Ok(SQRT_2 * &self.scale)
    }

    fn entropy(&self) -> Result<Tensor> {
        Ok(1.0_f64 + (2.0_f64 * &self.scale).log())
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
