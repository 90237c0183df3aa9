//! Interpolation, root finding and spline utilities for post-processing
//! sampled numerical data.
//!
//! * [`one_dim`]: 1D splines that check their own accuracy at the data,
//!   with inverse lookup (`y -> x`), extremum and root finding, plus
//!   finite-difference and spline derivatives and integral normalization.
//! * [`two_dim`]: one interface over four methods for `z = f(x, y)`:
//!   radial basis function networks with multiquadric or gaussian kernels,
//!   Clough-Tocher interpolation on a Delaunay triangulation, and
//!   tensor-product splines on grids.
//! * [`roots`]: Brent's method and the secant method behind one call.
//! * [`bspline`]: the B-spline evaluation and fitting kernels underneath.
//!
//! # Performance Scalings
//! Fitting is the expensive step; evaluation does not allocate per point.
//! Smoothing fits (`s > 0`) repeat the spline solve once per step of the
//! penalty weight search.
//!
//! | Method                   | Fit                 | Eval. Cost per point            |
//! |--------------------------|---------------------|---------------------------------|
//! | one_dim::Spline          | O(m)                | O(k^2) + log2(m)                |
//! | two_dim rbf_multi/gauss  | O(n^3)              | O(n)                            |
//! | two_dim ct               | O(n^2)              | O(1) walk, O(ntri) worst case   |
//! | two_dim bispl            | O(nx ny)            | O(kx ky) + log2(nx) + log2(ny)  |
//!
//! # Example: 1D Spline
//! ```rust
//! use splinterp::{Search, Spline, SplineOptions};
//! use splinterp::utils::linspace;
//!
//! // Sampled data
//! let x = linspace(0.0_f64, 10.0, 100);
//! let y: Vec<f64> = x.iter().map(|v| v * v - 5.0).collect();
//!
//! // Fit a cubic spline, checked to reproduce the data to 1e-10
//! let sp = Spline::new(&x, &y, SplineOptions::default()).unwrap();
//!
//! // Values and derivatives
//! let dy = sp.eval(&[1.0, 2.0], 1);
//! assert!((dy[1] - 4.0).abs() < 1e-8);
//!
//! // y -> x, with Brent's method over the data range
//! let root = sp.invsplev(0.0, Search::Auto).unwrap();
//! assert!((root - 5.0_f64.sqrt()).abs() < 1e-8);
//!
//! // Minimum, with the secant method from a start guess
//! let xmin = sp.get_min(Search::Guess(1.0)).unwrap();
//! assert!(xmin.abs() < 1e-8);
//! ```
//!
//! # Example: 2D Scattered Data
//! ```rust
//! use splinterp::{Interpol2D, Samples2D};
//!
//! // Values of a plane at scattered points
//! let xy = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.3, 0.4], [0.8, 0.6]];
//! let z: Vec<f64> = xy.iter().map(|p| 1.0 + 2.0 * p[0] - p[1]).collect();
//! let samples = Samples2D::scattered(xy, z).unwrap();
//!
//! for name in ["rbf_multi", "rbf_gauss", "ct"] {
//!     let inter = Interpol2D::from_name(&samples, name).unwrap();
//!     // One point or many
//!     let v = inter.eval(&[0.3, 0.4]).unwrap();
//!     assert!((v[0] - 0.8).abs() < 1e-6);
//!     assert_eq!(inter.eval(&[[0.5, 0.5], [0.2, 0.9]]).unwrap().len(), 2);
//! }
//! ```
// These "needless" range loops read closer to the index notation of the math
#![allow(clippy::needless_range_loop)]

pub mod bspline;
pub mod error;
pub mod roots;
pub mod utils;

pub mod one_dim;
pub use one_dim::{Spline, SplineOptions};

pub mod two_dim;
pub use two_dim::{GridData, Interpol2D, Method, QueryPoints, Samples2D};

pub use error::{Error, Result};
pub use roots::{RootOptions, Search};

#[cfg(test)]
pub(crate) mod testing;
