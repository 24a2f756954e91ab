//! Invertible maps between tensors, with log-determinant Jacobians.
//!
//! A [`Transformation`] is a cheap, clonable handle. Its inverse is created on
//! demand and cached weakly: while any handle to the inverse is alive,
//! [`Transformation::inv`] returns that same inverse, and the inverse of an
//! inverse is always the original transformation.
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tch::Tensor;
use tracing::trace;

use crate::options::Options;
use crate::param::{tensor_pair, Param};

/// The forward direction of an invertible map.
pub trait Bijection {
    fn forward(&self, x: &Tensor) -> Tensor;

    fn inverse(&self, y: &Tensor) -> Tensor;

    /// `log |dy/dx|` evaluated elementwise at `x`, where `y = forward(x)`.
    fn log_det_jacobian(&self, x: &Tensor, y: &Tensor) -> Tensor;

    fn bijective(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// `y = exp(x)`
pub struct ExpTransform;

impl Bijection for ExpTransform {
    fn forward(&self, x: &Tensor) -> Tensor {
        x.exp()
    }

    fn inverse(&self, y: &Tensor) -> Tensor {
        y.log()
    }

    fn log_det_jacobian(&self, x: &Tensor, _y: &Tensor) -> Tensor {
        x.shallow_clone()
    }

    fn name(&self) -> &'static str {
        "exp"
    }
}

/// `y = loc + scale * x`
pub struct AffineTransform {
    pub loc: Tensor,
    pub scale: Tensor,
}

impl AffineTransform {
    pub fn new(loc: impl Into<Param>, scale: impl Into<Param>) -> Self {
        let (loc, scale) = tensor_pair(loc.into(), scale.into(), Options::default());
        Self { loc, scale }
    }
}

impl Bijection for AffineTransform {
    fn forward(&self, x: &Tensor) -> Tensor {
        &self.loc + &self.scale * x
    }

    fn inverse(&self, y: &Tensor) -> Tensor {
        (y - &self.loc) / &self.scale
    }

    fn log_det_jacobian(&self, x: &Tensor, _y: &Tensor) -> Tensor {
        x.ones_like() * self.scale.abs().log()
    }

    fn name(&self) -> &'static str {
        "affine"
    }
}

struct Forward {
    bijection: Box<dyn Bijection>,
    inverse: RefCell<Weak<Inverse>>,
}

struct Inverse {
    forward: Rc<Forward>,
}

#[derive(Clone)]
enum Node {
    Forward(Rc<Forward>),
    Inverse(Rc<Inverse>),
}

/// Handle to a bijection or to the inverse of one.
#[derive(Clone)]
pub struct Transformation {
    node: Node,
}

impl Transformation {
    pub fn new(bijection: impl Bijection + 'static) -> Self {
        Self {
            node: Node::Forward(Rc::new(Forward {
                bijection: Box::new(bijection),
                inverse: RefCell::new(Weak::new()),
            })),
        }
    }

    pub fn exp() -> Self {
        Self::new(ExpTransform)
    }

    pub fn affine(loc: impl Into<Param>, scale: impl Into<Param>) -> Self {
        Self::new(AffineTransform::new(loc, scale))
    }

    /// Applies the transformation.
    pub fn call(&self, x: &Tensor) -> Tensor {
        match &self.node {
            Node::Forward(f) => f.bijection.forward(x),
            Node::Inverse(i) => i.forward.bijection.inverse(x),
        }
    }

    /// The inverse transformation, reusing a live one if it exists.
    pub fn inv(&self) -> Transformation {
        let forward = match &self.node {
            Node::Inverse(i) => {
                return Self {
                    node: Node::Forward(Rc::clone(&i.forward)),
                }
            }
            Node::Forward(f) => f,
        };
        if let Some(inverse) = forward.inverse.borrow().upgrade() {
            return Self {
                node: Node::Inverse(inverse),
            };
        }
        trace!(bijection = forward.bijection.name(), "creating inverse transformation");
        let inverse = Rc::new(Inverse {
            forward: Rc::clone(forward),
        });
        *forward.inverse.borrow_mut() = Rc::downgrade(&inverse);
        Self {
            node: Node::Inverse(inverse),
        }
    }

    /// `log |dy/dx|` where `y = self.call(x)`.
    pub fn log_det_jacobian(&self, x: &Tensor, y: &Tensor) -> Tensor {
        match &self.node {
            Node::Forward(f) => f.bijection.log_det_jacobian(x, y),
            Node::Inverse(i) => -i.forward.bijection.log_det_jacobian(y, x),
        }
    }

    pub fn bijective(&self) -> bool {
        match &self.node {
            Node::Forward(f) => f.bijection.bijective(),
            Node::Inverse(i) => i.forward.bijection.bijective(),
        }
    }

    pub fn is_inverse(&self) -> bool {
        matches!(self.node, Node::Inverse(_))
    }

    /// True if both handles point at the same transformation object.
    pub fn ptr_eq(&self, other: &Transformation) -> bool {
        match (&self.node, &other.node) {
            (Node::Forward(a), Node::Forward(b)) => Rc::ptr_eq(a, b),
            (Node::Inverse(a), Node::Inverse(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Node::Forward(n) => write!(f, "Transformation({})", n.bijection.name()),
            Node::Inverse(n) => write!(f, "Transformation(inv {})", n.forward.bijection.name()),
        }
    }
}
