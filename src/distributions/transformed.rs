use tch::Tensor;

use super::Distribution;
use crate::error::Result;
use crate::ops;
use crate::transformation::Transformation;

/// A base distribution pushed through a chain of transformations, applied in order.
pub struct TransformedDistribution<D> {
    pub base: D,
    pub transforms: Vec<Transformation>,
}

impl<D: Distribution> TransformedDistribution<D> {
    pub fn new(base: D, transforms: Vec<Transformation>) -> Self {
        Self { base, transforms }
    }

    /// Reduces an elementwise term over the base distribution's event dimensions.
    fn sum_event_dims(&self, term: &Tensor) -> Result<Tensor> {
        let event_dim = self.base.event_dim() as i64;
        if event_dim == 0 {
            return Ok(term.shallow_clone());
        }
        let axes: Vec<i64> = (1..=event_dim).map(|d| -d).collect();
        ops::sum(term, Some(&axes), None, false)
    }

    fn forward(&self, mut x: Tensor) -> Tensor {
        for t in &self.transforms {
            x = t.call(&x);
        }
        x
    }
}

impl<D: Distribution> Distribution for TransformedDistribution<D> {
    fn event_dim(&self) -> usize {
        self.base.event_dim()
    }

    fn batch_shape(&self) -> Vec<i64> {
        self.base.batch_shape()
    }

    fn has_grad(&self) -> bool {
        self.base.has_grad()
    }

    fn validate_args(&self) -> bool {
        self.base.validate_args()
    }

    /// Change of variables: walks the chain backwards, subtracting each
    /// log-determinant Jacobian summed over the event dimensions, then scores
    /// the recovered base value.
    fn log_prob(&self, value: &Tensor) -> Result<Tensor> {
        let mut y = value.shallow_clone();
        let mut jacobians = Vec::with_capacity(self.transforms.len());
        for t in self.transforms.iter().rev() {
            let x = t.inv().call(&y);
            jacobians.push(self.sum_event_dims(&t.log_det_jacobian(&x, &y))?);
            y = x;
        }
        let mut log_prob = self.base.log_prob(&y)?;
        for ldj in jacobians {
            log_prob = log_prob - ldj;
        }
        Ok(log_prob)
    }

    fn sample(&self, size: Option<&[i64]>) -> Result<Tensor> {
        Ok(self.forward(self.base.sample(size)?))
    }

    fn sample_n(&self, size: Option<&[i64]>) -> Result<Tensor> {
        Ok(self.forward(self.base.sample_n(size)?))
    }
}
