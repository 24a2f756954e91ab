use tch::{Kind, Tensor};

use super::{default_validate_args, sample_n_shape, Constraint, Distribution};
use crate::error::{Error, Result};
use crate::ops;
use crate::shape::{self, check_broadcast_to, extended_shape};

/// Categorical distribution over `0..k`, with `k` the size of the last dimension.
pub struct Categorical {
    /// Normalized log probabilities.
    pub logits: Tensor,
    pub probs: Tensor,
    num_events: i64,
    batch_shape: Vec<i64>,
    validate_args: bool,
}

/// The tensor a [`Categorical`] is built from.
pub enum CategoricalParam {
    /// Unnormalized log probabilities.
    Logits(Tensor),
    /// Non-negative weights, normalized along the last dimension.
    Probs(Tensor),
}

impl Categorical {
    /// Builds from unnormalized log probabilities.
    pub fn from_logits(logits: &Tensor) -> Result<Self> {
        Self::with_validation(CategoricalParam::Logits(logits.shallow_clone()), None)
    }

    /// Builds from non-negative weights; they are normalized along the last dimension.
    pub fn from_probs(probs: &Tensor) -> Result<Self> {
        Self::with_validation(CategoricalParam::Probs(probs.shallow_clone()), None)
    }

    pub fn with_validation(param: CategoricalParam, validate_args: Option<bool>) -> Result<Self> {
        let validate_args = validate_args.unwrap_or_else(default_validate_args);
        let (logits, probs) = match param {
            CategoricalParam::Logits(logits) => {
                if validate_args {
                    Constraint::Real.check("logits", &logits)?;
                }
                let kind = logits.kind();
                (logits.log_softmax(-1, kind), logits.softmax(-1, kind))
            }
            CategoricalParam::Probs(probs) => {
                if validate_args {
                    Constraint::NonNegative.check("probs", &probs)?;
                }
                let probs = &probs / ops::sum(&probs, Some(&[-1]), None, true)?;
                (probs.log(), probs)
            }
        };
        let shape = logits.size();
        let Some((&num_events, batch)) = shape.split_last() else {
            return Err(Error::Shape(
                "categorical parameters must be at least 1-dimensional".to_string(),
            ));
        };
        Ok(Self {
            batch_shape: batch.to_vec(),
            logits,
            probs,
            num_events,
            validate_args,
        })
    }

    /// Draws one category per element of `shape`, which must end in the batch shape.
    fn draw(&self, shape: &[i64]) -> Result<Tensor> {
        let probs_2d = self
            .probs
            .f_expand(&extended_shape(shape, &[self.num_events], &[]), false)?
            .reshape(&[-1, self.num_events]);
        if probs_2d.size()[0] == 0 {
            return Ok(Tensor::zeros(shape, (Kind::Int64, self.probs.device())));
        }
        let samples_2d = tch::no_grad(|| probs_2d.multinomial(1, true));
        Ok(samples_2d.reshape(shape))
    }
}

impl Distribution for Categorical {
    fn event_dim(&self) -> usize {
        0
    }

    fn batch_shape(&self) -> Vec<i64> {
        self.batch_shape.clone()
    }

    fn has_enumerate_support(&self) -> bool {
        true
    }

    fn validate_args(&self) -> bool {
        self.validate_args
    }

    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let value = value.to_kind(Kind::Int64).unsqueeze(-1);
        let broadcast = Tensor::f_broadcast_tensors(&[value, self.logits.shallow_clone()])?;
        let value = broadcast[0].narrow(-1, 0, 1);
        Ok(broadcast[1].gather(-1, &value, false).squeeze_dim(-1))
    }

    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor> {
        let shape = shape::output_shape(size, &[self.batch_shape.as_slice()])?;
        self.draw(&shape)
    }

    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor> {
        self.draw(&sample_n_shape(size, &self.batch_shape))
    }

    /// Values `0..k`, shaped `[k] + batch_shape`.
    fn enumerate_support(&self) -> Result<Tensor> {
        let k = self.num_events;
        let values = Tensor::arange(k, (Kind::Int64, self.probs.device()));
        let mut view = vec![k];
        view.extend(self.batch_shape.iter().map(|_| 1));
        let full = extended_shape(&[k], &self.batch_shape, &[]);
        Ok(values.reshape(&view).f_expand(&full, false)?)
    }

    fn entropy(&self) -> Result<Tensor> {
        let p_log_p = &self.probs * &self.logits;
        let p_log_p = p_log_p.where_self(&self.probs.gt(0.0), &p_log_p.zeros_like());
        Ok(-ops::sum(&p_log_p, Some(&[-1]), None, false)?)
    }

    fn broadcast_to(&self, batch_shape: &[i64]) -> Result<Self> {
        check_broadcast_to(&self.batch_shape, batch_shape)?;
        let full = extended_shape(batch_shape, &[self.num_events], &[]);
        Ok(Self {
            logits: self.logits.f_expand(&full, false)?,
            probs: self.probs.f_expand(&full, false)?,
            num_events: self.num_events,
            batch_shape: batch_shape.to_vec(),
            validate_args: self.validate_args,
        })
    }
}
