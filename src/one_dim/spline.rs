//! Accuracy-checked 1D spline with inverse lookup and root finding.

use log::debug;

use crate::bspline::{fit_curve, Tck};
use crate::roots::{find_root, Search};
use crate::{Error, Result};

/// Fit parameters for [`Spline`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplineOptions {
    /// Polynomial degree, 1 to 5
    pub k: usize,
    /// Smoothing factor: upper bound on the residual sum of squares.
    /// Zero gives an interpolating spline.
    pub s: f64,
    /// Required interpolation accuracy at the data points
    pub eps: f64,
    /// Whether to enforce `eps` at construction
    pub check_eps: bool,
}

impl Default for SplineOptions {
    fn default() -> Self {
        Self {
            k: 3,
            s: 0.0,
            eps: 1e-10,
            check_eps: true,
        }
    }
}

impl SplineOptions {
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn s(mut self, s: f64) -> Self {
        self.s = s;
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn check_eps(mut self, check_eps: bool) -> Self {
        self.check_eps = check_eps;
        self
    }
}

/// A spline through sampled `(x, y)` data that keeps the data and the
/// knot/coefficient representation together, and supports y -> x lookup
/// and extremum/root finding on top of plain evaluation.
///
/// Lookups that reduce to root finding return *one* root. For curves that
/// are not monotonic there may be several, and which one is found depends
/// on the start guess or bracket passed in [`Search`]. Use
/// [`Spline::is_mono`] to check whether a lookup is unique, and plot the
/// data when in doubt.
///
/// ```rust
/// use splinterp::{Search, Spline, SplineOptions};
/// use splinterp::utils::linspace;
///
/// let x = linspace(0.0_f64, 10.0, 100);
/// let y: Vec<f64> = x.iter().map(|v| v.sin()).collect();
/// let sp = Spline::new(&x, &y, SplineOptions::default()).unwrap();
///
/// // sin(x) = 0.5 at 30 degrees
/// let xx = sp.invsplev(0.5, Search::Bracket(0.0, std::f64::consts::FRAC_PI_2)).unwrap();
/// assert!((xx - std::f64::consts::FRAC_PI_6).abs() < 1e-5);
/// ```
#[derive(Clone, Debug)]
pub struct Spline {
    x: Vec<f64>,
    y: Vec<f64>,
    tck: Tck,
    opts: SplineOptions,
    /// Residual sum of squares at the data points
    fp: f64,
}

impl Spline {
    /// Fit a spline through `(x, y)`.
    ///
    /// # Errors
    /// * [`Error::InvalidInput`] if `x` and `y` differ in length, `x` is not
    ///   non-decreasing, there are too few points for the degree, the degree
    ///   or smoothing factor is out of range, or repeated `x` values make the
    ///   interpolation singular
    /// * [`Error::Accuracy`] if `check_eps` is set and the spline misses any
    ///   data point by `eps` or more
    pub fn new(x: &[f64], y: &[f64], opts: SplineOptions) -> Result<Self> {
        if x.len() != y.len() {
            return Err(Error::invalid(format!(
                "x and y must have equal length, got {} and {}",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(Error::invalid("no data points"));
        }
        // Also rejects NaN
        if !x.windows(2).all(|w| w[1] >= w[0]) {
            return Err(Error::invalid("x wrongly ordered, must be non-decreasing"));
        }

        let (tck, fp) = fit_curve(x, y, opts.k, opts.s)?;
        let spline = Self {
            x: x.to_vec(),
            y: y.to_vec(),
            tck,
            opts,
            fp,
        };

        if opts.check_eps {
            let max_err = spline
                .eval(x, 0)
                .iter()
                .zip(y)
                .map(|(v, yi)| (v - yi).abs())
                .fold(0.0, f64::max);
            // NaN errors never pass
            if !(max_err < opts.eps) {
                return Err(Error::Accuracy {
                    eps: opts.eps,
                    max_err,
                });
            }
            debug!("spline accurate to {max_err:e} (eps={:e})", opts.eps);
        }

        Ok(spline)
    }

    /// Evaluate the spline (`der = 0`) or one of its derivatives.
    ///
    /// Points outside the data range are extrapolated.
    pub fn eval(&self, xs: &[f64], der: usize) -> Vec<f64> {
        self.tck.eval(xs, der)
    }

    /// Evaluate the spline or one of its derivatives at a single point.
    #[inline]
    pub fn eval_one(&self, x: f64, der: usize) -> f64 {
        self.tck.eval_one(x, der)
    }

    /// Find `x` where `y(x) == y0`, i.e. "inverse spline evaluation",
    /// by locating a root of `y(x) - y0`.
    ///
    /// Works for one lookup at a time. For many lookups on monotonic data,
    /// an inverse spline `Spline::new(y, x, ..)` is cheaper.
    ///
    /// # Errors
    /// * [`Error::Domain`] if `y0` is outside the range of the `y` data
    /// * Root-finding errors, see [`crate::roots::find_root`]
    pub fn invsplev(&self, y0: f64, search: Search) -> Result<f64> {
        let (ymin, ymax) = self.y_range();
        if !(ymin <= y0 && y0 <= ymax) {
            return Err(Error::Domain { y0, ymin, ymax });
        }
        self.findroot_of(|x| self.eval_one(x, 0) - y0, search)
    }

    /// Find `x` where the first derivative vanishes. With a suitable guess or
    /// bracket, this is the location of the minimum (or maximum).
    pub fn get_min(&self, search: Search) -> Result<f64> {
        self.findroot_of(|x| self.eval_one(x, 1), search)
    }

    /// Find `x` where `y(x) == 0`.
    ///
    /// Same as `invsplev(0.0, ..)`, without the data range check.
    pub fn get_root(&self, search: Search) -> Result<f64> {
        self.findroot_of(|x| self.eval_one(x, 0), search)
    }

    /// True if the spline, sampled at the data points, never changes
    /// direction.
    pub fn is_mono(&self) -> bool {
        let vals = self.eval(&self.x, 0);
        let signs: Vec<i8> = vals
            .windows(2)
            .map(|w| match w[1] - w[0] {
                d if d > 0.0 => 1,
                d if d < 0.0 => -1,
                _ => 0,
            })
            .collect();
        signs.windows(2).all(|s| s[0] == s[1])
    }

    fn findroot_of<F: Fn(f64) -> f64>(&self, f: F, search: Search) -> Result<f64> {
        find_root(f, search, (self.x[0], self.x[self.x.len() - 1]))
    }

    fn y_range(&self) -> (f64, f64) {
        self.y
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Knots, coefficients and degree
    pub fn tck(&self) -> &Tck {
        &self.tck
    }

    pub fn degree(&self) -> usize {
        self.tck.k
    }

    pub fn options(&self) -> &SplineOptions {
        &self.opts
    }

    /// Residual sum of squares of the fit at the data points
    pub fn residual(&self) -> f64 {
        self.fp
    }
}
