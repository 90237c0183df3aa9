//! Interpolation of 2D data `z = f(x, y)` through one interface over
//! several methods.
//!
//! | Method | Data | Notes |
//! |--------|------|-------|
//! | `rbf_multi` | scattered | RBF network, multiquadric kernel |
//! | `rbf_gauss` | scattered | RBF network, gaussian kernel |
//! | `ct` | scattered | Clough-Tocher, C1 piecewise cubic; fill value outside the convex hull |
//! | `bispl` | grid | Tensor-product spline |
//!
//! ```rust
//! use splinterp::two_dim::{GridData, Interpol2D, Method};
//! use splinterp::utils::linspace;
//!
//! let x = linspace(-5.0_f64, 5.0, 20);
//! let y = x.clone();
//! let z: Vec<f64> = x
//!     .iter()
//!     .flat_map(|&xi| y.iter().map(move |&yj| (xi + 3.0).powi(2) + (yj + 4.0).powi(2) + 5.0))
//!     .collect();
//! let samples = GridData::new(&x, &y, &z).unwrap().samples();
//!
//! let inter = Interpol2D::new(&samples, Method::from_name("bispl").unwrap()).unwrap();
//! let vals = inter.eval(&[[-3.0, -4.0], [0.0, 0.0]]).unwrap();
//! assert!((vals[0] - 5.0).abs() < 1e-8);
//! assert!((vals[1] - 30.0).abs() < 1e-8);
//! ```
use std::borrow::Cow;

use log::debug;

use crate::{Error, Result};

pub mod bispline;
pub mod clough_tocher;
pub mod delaunay;
pub mod rbf;

pub use bispline::{BisplOptions, Bispline};
pub use clough_tocher::{CloughTocher, CtOptions};
pub use delaunay::Triangulation;
pub use rbf::{Kernel, Rbf, RbfOptions, RbfParam, Train};

/// Values on a rectilinear grid, in C order: `z[i * ny + j]` is the value at
/// `(x[i], y[j])`.
#[derive(Clone, Debug)]
pub struct GridData {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl GridData {
    /// # Errors
    /// * If either axis is empty
    /// * If `z.len() != x.len() * y.len()`
    pub fn new(x: &[f64], y: &[f64], z: &[f64]) -> Result<Self> {
        if x.is_empty() || y.is_empty() {
            return Err(Error::invalid("grid axes must not be empty"));
        }
        if z.len() != x.len() * y.len() {
            return Err(Error::invalid(format!(
                "grid of {}x{} points needs {} values, got {}",
                x.len(),
                y.len(),
                x.len() * y.len(),
                z.len()
            )));
        }
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            z: z.to_vec(),
        })
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    /// Value at `(x[i], y[j])`
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.z[i * self.y.len() + j]
    }

    /// Scattered form of the grid, points in C order, keeping the axes.
    pub fn samples(&self) -> Samples2D {
        let xy = self
            .x
            .iter()
            .flat_map(|&xi| self.y.iter().map(move |&yj| [xi, yj]))
            .collect();
        Samples2D {
            xy,
            z: self.z.clone(),
            axes: Some((self.x.clone(), self.y.clone())),
        }
    }
}

/// Scattered samples `z` at points `xy`, optionally with the grid axes
/// they were generated from.
#[derive(Clone, Debug)]
pub struct Samples2D {
    xy: Vec<[f64; 2]>,
    z: Vec<f64>,
    axes: Option<(Vec<f64>, Vec<f64>)>,
}

impl Samples2D {
    /// # Errors
    /// * If `xy` and `z` differ in length
    pub fn scattered(xy: Vec<[f64; 2]>, z: Vec<f64>) -> Result<Self> {
        if xy.len() != z.len() {
            return Err(Error::invalid(format!(
                "got {} points but {} values",
                xy.len(),
                z.len()
            )));
        }
        Ok(Self { xy, z, axes: None })
    }

    pub fn xy(&self) -> &[[f64; 2]] {
        &self.xy
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Grid axes `(x, y)`, if the samples came from a grid
    pub fn axes(&self) -> Option<(&[f64], &[f64])> {
        self.axes.as_ref().map(|(x, y)| (x.as_slice(), y.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

/// Interpolation method and its options.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Method {
    RbfMulti(RbfOptions),
    RbfGauss(RbfOptions),
    CloughTocher(CtOptions),
    Bispl(BisplOptions),
}

impl Method {
    /// Method with default options from its short name:
    /// `rbf_multi`, `rbf_gauss`, `ct` or `bispl`.
    ///
    /// # Errors
    /// * [`Error::UnknownMethod`] for any other name
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "rbf_multi" => Ok(Method::RbfMulti(RbfOptions::default())),
            "rbf_gauss" => Ok(Method::RbfGauss(RbfOptions::default())),
            "ct" => Ok(Method::CloughTocher(CtOptions::default())),
            "bispl" => Ok(Method::Bispl(BisplOptions::default())),
            _ => Err(Error::UnknownMethod(name.to_owned())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Method::RbfMulti(_) => "rbf_multi",
            Method::RbfGauss(_) => "rbf_gauss",
            Method::CloughTocher(_) => "ct",
            Method::Bispl(_) => "bispl",
        }
    }
}

/// Anything that can be read as a batch of 2D query points.
///
/// A single point is a batch of one.
pub trait QueryPoints {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>>;
}

impl QueryPoints for [f64; 2] {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>> {
        Ok(Cow::Owned(vec![*self]))
    }
}

impl QueryPoints for [[f64; 2]] {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>> {
        Ok(Cow::Borrowed(self))
    }
}

impl<const N: usize> QueryPoints for [[f64; 2]; N] {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>> {
        Ok(Cow::Borrowed(self.as_slice()))
    }
}

impl QueryPoints for Vec<[f64; 2]> {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>> {
        Ok(Cow::Borrowed(self.as_slice()))
    }
}

#[cfg(feature = "ndarray")]
fn rows_of<S: ndarray::Data<Elem = f64>>(
    a: &ndarray::ArrayBase<S, ndarray::Ix2>,
) -> Result<Cow<'static, [[f64; 2]]>> {
    if a.ncols() != 2 {
        return Err(Error::invalid(format!(
            "query points must have shape (M, 2), got {:?}",
            a.shape()
        )));
    }
    Ok(Cow::Owned(a.rows().into_iter().map(|r| [r[0], r[1]]).collect()))
}

#[cfg(feature = "ndarray")]
impl<S: ndarray::Data<Elem = f64>> QueryPoints for ndarray::ArrayBase<S, ndarray::Ix2> {
    fn query_points(&self) -> Result<Cow<'_, [[f64; 2]]>> {
        rows_of(self)
    }
}

/// A fitted 2D interpolator.
///
/// ```rust
/// use splinterp::two_dim::{Interpol2D, Method, Samples2D};
///
/// let xy = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [0.4, 0.6]];
/// let z: Vec<f64> = xy.iter().map(|p| p[0] + p[1]).collect();
/// let samples = Samples2D::scattered(xy, z).unwrap();
///
/// let inter = Interpol2D::new(&samples, Method::from_name("ct").unwrap()).unwrap();
/// assert_eq!(inter.method_name(), "ct");
/// // A single point gives one value
/// assert_eq!(inter.eval(&[0.5, 0.5]).unwrap().len(), 1);
/// // Outside the convex hull of the data
/// assert!(inter.eval_one([2.0, 2.0]).is_nan());
/// ```
#[derive(Clone, Debug)]
pub enum Interpol2D {
    Rbf(Rbf),
    CloughTocher(CloughTocher),
    Bispl(Bispline),
}

impl Interpol2D {
    /// Fit an interpolator to `samples` with the given method.
    ///
    /// # Errors
    /// * If the samples are empty
    /// * [`Method::Bispl`] on samples without grid axes
    /// * Fit errors of the chosen backend
    pub fn new(samples: &Samples2D, method: Method) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::invalid("no data points"));
        }
        debug!(
            "fitting {} interpolator to {} points",
            method.name(),
            samples.len()
        );
        let (xy, z) = (samples.xy(), samples.z());
        let inter = match method {
            Method::RbfMulti(opts) => Self::Rbf(Rbf::new(xy, z, Kernel::Multiquadric, opts)?),
            Method::RbfGauss(opts) => Self::Rbf(Rbf::new(xy, z, Kernel::Gauss, opts)?),
            Method::CloughTocher(opts) => Self::CloughTocher(CloughTocher::new(xy, z, opts)?),
            Method::Bispl(opts) => {
                let (x, y) = samples.axes().ok_or_else(|| {
                    Error::invalid("bispl needs gridded samples, see GridData::samples")
                })?;
                Self::Bispl(Bispline::new(x, y, z, opts)?)
            }
        };
        Ok(inter)
    }

    /// Fit with default options for the named method, see [`Method::from_name`].
    pub fn from_name(samples: &Samples2D, name: &str) -> Result<Self> {
        Self::new(samples, Method::from_name(name)?)
    }

    /// Evaluate at one or more points, returning one value per point.
    ///
    /// # Errors
    /// * If the query points cannot be read as `(M, 2)`
    pub fn eval<Q: QueryPoints + ?Sized>(&self, points: &Q) -> Result<Vec<f64>> {
        let pts = points.query_points()?;
        Ok(match self {
            Self::Rbf(inner) => inner.eval(&pts),
            Self::CloughTocher(inner) => inner.eval(&pts),
            Self::Bispl(inner) => inner.eval(&pts),
        })
    }

    /// Evaluate at a single point.
    pub fn eval_one(&self, p: [f64; 2]) -> f64 {
        match self {
            Self::Rbf(inner) => inner.eval_one(p),
            Self::CloughTocher(inner) => inner.eval_one(p),
            Self::Bispl(inner) => inner.eval_one(p),
        }
    }

    /// Short name of the method in use
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Rbf(inner) => match inner.kernel() {
                Kernel::Multiquadric => "rbf_multi",
                Kernel::Gauss => "rbf_gauss",
            },
            Self::CloughTocher(_) => "ct",
            Self::Bispl(_) => "bispl",
        }
    }
}
