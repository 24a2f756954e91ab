use tch::Tensor;

use super::Distribution;
use crate::error::Result;

/// Distributions of the form `h(x) exp(<eta, T(x)> - A(eta))`.
pub trait ExponentialFamily: Distribution {
    /// Natural parameters `eta`, broadcast to the batch shape.
    fn natural_params(&self) -> Vec<Tensor>;

    /// Log-normalizer `A(eta)` evaluated at `natural_params`, which must hold
    /// as many tensors as [`ExponentialFamily::natural_params`] returns.
    fn log_normalizer(&self, natural_params: &[Tensor]) -> Result<Tensor>;

    /// `E[log h(x)]`.
    fn mean_carrier_measure(&self) -> f64 {
        0.0
    }

    /// Entropy `A(eta) - <eta, grad A(eta)> - E[log h(x)]`, with the gradient
    /// taken by autograd.
    fn exp_family_entropy(&self) -> Result<Tensor> {
        tch::with_grad(|| -> Result<Tensor> {
            let params: Vec<Tensor> = self
                .natural_params()
                .iter()
                .map(|p| p.detach().set_requires_grad(true))
                .collect();
            let log_norm = self.log_normalizer(&params)?;
            let total = log_norm.sum(log_norm.kind());
            let grads = Tensor::f_run_backward(&[total], &params, true, false)?;
            let mut entropy = log_norm - self.mean_carrier_measure();
            for (param, grad) in params.iter().zip(&grads) {
                entropy = entropy - param * grad;
            }
            Ok(entropy.detach())
        })
    }
}
