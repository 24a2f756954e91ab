pub mod distributions;
pub mod error;
pub mod ops;
pub mod options;
pub mod param;
pub mod random;
pub mod shape;
pub mod transformation;

pub use error::{Error, Result};
pub use options::{seed, Options};
pub use param::Param;
pub use transformation::Transformation;
