use tch::Tensor;

use crate::error::{Error, Result};
use crate::random::any;

/// Domain a parameter or sample must lie in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Any non-NaN value.
    Real,
    /// Strictly positive values.
    Positive,
    /// Values greater than or equal to zero.
    NonNegative,
    /// Symmetric positive-definite matrices in the last two dimensions.
    PositiveDefinite,
    /// Lower-triangular matrices with a positive diagonal.
    LowerCholesky,
}

impl Constraint {
    pub fn name(&self) -> &'static str {
        match self {
            Constraint::Real => "real",
            Constraint::Positive => "positive",
            Constraint::NonNegative => "nonnegative",
            Constraint::PositiveDefinite => "positive_definite",
            Constraint::LowerCholesky => "lower_cholesky",
        }
    }

    /// Returns true if every element (or matrix) of `value` satisfies the constraint.
    pub fn is_satisfied(&self, value: &Tensor) -> bool {
        tch::no_grad(|| match self {
            Constraint::Real => !any(&value.isnan()),
            Constraint::Positive => !any(&value.isnan()) && !any(&value.le(0.0)),
            Constraint::NonNegative => !any(&value.isnan()) && !any(&value.lt(0.0)),
            Constraint::PositiveDefinite => {
                if value.dim() < 2 {
                    return false;
                }
                let symmetric = value.allclose(&value.transpose(-1, -2), 1e-5, 1e-8, false);
                symmetric && value.f_cholesky(false).is_ok_and(|l| !any(&l.isnan()))
            }
            Constraint::LowerCholesky => {
                if value.dim() < 2 {
                    return false;
                }
                let lower = value.tril(0).equal(value);
                lower && !any(&value.diagonal(0, -2, -1).le(0.0))
            }
        })
    }

    /// Fails with [`Error::Constraint`] naming `param` if `value` is outside the domain.
    pub fn check(&self, param: &str, value: &Tensor) -> Result<()> {
        if self.is_satisfied(value) {
            Ok(())
        } else {
            Err(Error::Constraint {
                param: param.to_string(),
                constraint: self.name(),
            })
        }
    }
}
