//! Error type shared by every fit and query in the crate.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed shapes, unordered abscissae, mismatched lengths,
    /// unsupported degrees or singular interpolation systems.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The fitted spline does not reproduce the data to the requested accuracy.
    #[error("Spline not accurate to eps={eps:e}, max(error)={max_err:e}, raise eps")]
    Accuracy { eps: f64, max_err: f64 },

    /// Inverse lookup of a value outside the observed data range.
    #[error("y0 ({y0:e}) outside y data range [{ymin:e}, {ymax:e}]")]
    Domain { y0: f64, ymin: f64, ymax: f64 },

    /// The search interval does not straddle a sign change.
    #[error("f(a) and f(b) must have different signs: f({a})={fa:e}, f({b})={fb:e}")]
    Bracket { a: f64, b: f64, fa: f64, fb: f64 },

    #[error("{method} failed to converge after {iterations} iterations")]
    NotConverged {
        method: &'static str,
        iterations: usize,
    },

    #[error("Unknown interpolation method: {0:?}")]
    UnknownMethod(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidInput(message.into())
    }
}
