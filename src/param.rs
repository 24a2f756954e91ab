use crate::options::Options;

/// A distribution parameter: either a host scalar or a backend tensor.
/// Samplers pick their backend call by which parameters are tensors.
pub enum Param {
    Scalar(f64),
    Tensor(tch::Tensor),
}

impl Param {
    /// Shape of the parameter. Scalars have an empty shape.
    pub fn shape(&self) -> Vec<i64> {
        match self {
            Param::Scalar(_) => Vec::new(),
            Param::Tensor(t) => t.size(),
        }
    }

    pub fn is_tensor(&self) -> bool {
        matches!(self, Param::Tensor(_))
    }

    /// Converts into a tensor. Scalars become 0-dim tensors with `options`.
    pub fn into_tensor(self, options: Options) -> tch::Tensor {
        match self {
            Param::Scalar(v) => tch::Tensor::scalar_tensor(v, options.pair()),
            Param::Tensor(t) => t,
        }
    }

    /// Returns the scalar value, if this is one.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Param::Scalar(v) => Some(*v),
            Param::Tensor(_) => None,
        }
    }

    /// Options of the tensor, if this is one.
    pub fn options(&self) -> Option<Options> {
        match self {
            Param::Scalar(_) => None,
            Param::Tensor(t) => Some(Options::like(t)),
        }
    }
}

impl From<f64> for Param {
    fn from(v: f64) -> Self {
        Param::Scalar(v)
    }
}

impl From<f32> for Param {
    fn from(v: f32) -> Self {
        Param::Scalar(v as f64)
    }
}

impl From<tch::Tensor> for Param {
    fn from(t: tch::Tensor) -> Self {
        Param::Tensor(t)
    }
}

/// Borrowed tensors share storage and autograd history with the original.
impl From<&tch::Tensor> for Param {
    fn from(t: &tch::Tensor) -> Self {
        Param::Tensor(t.shallow_clone())
    }
}

/// Converts a pair of parameters into tensors that share a kind and device.
/// The first tensor parameter decides the options; `fallback` is used when
/// both are scalars.
pub(crate) fn tensor_pair(a: Param, b: Param, fallback: Options) -> (tch::Tensor, tch::Tensor) {
    let options = a.options().or_else(|| b.options()).unwrap_or(fallback);
    (a.into_tensor(options), b.into_tensor(options))
}
