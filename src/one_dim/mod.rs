//! One-dimensional splines over sampled data, and helpers for derivatives,
//! extrema and integrals of 1D curves.

pub mod calculus;
pub mod spline;

pub use calculus::{deriv_fd, deriv_spl, findmin, findroot, norm_int, simpson};
pub use spline::{Spline, SplineOptions};
