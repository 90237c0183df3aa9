//! Derivatives, extrema and integrals of sampled 1D data.
//!
//! These are one-shot helpers for interactive work; for repeated lookups on
//! the same data, build a [`Spline`](super::Spline) once and query it.
use log::debug;

use crate::bspline::fit_curve;
use crate::roots::{brentq, RootOptions};
use crate::{Error, Result};

use super::SplineOptions;

fn check_lengths(y: &[f64], x: &[f64]) -> Result<()> {
    if x.len() != y.len() {
        return Err(Error::invalid(format!(
            "x and y must have equal length, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    Ok(())
}

fn default_axis(n: usize) -> Vec<f64> {
    (0..n).map(|i| i as f64).collect()
}

/// `n`-th derivative of possibly non-uniformly sampled data by simple
/// forward differences, `(y[i+1] - y[i]) / (x[i+1] - x[i])`, applied `n` times.
///
/// Returns `(xd, yd)`, where `xd` holds the interval midpoints the
/// derivative values belong to. Each application drops one point, so both
/// have length `y.len() - n`. Without `x`, the sample index is used.
///
/// Errors grow quickly with `n` on non-uniform data; resample on a regular
/// grid first when in doubt.
///
/// # Errors
/// * If `n == 0`
/// * If `x` and `y` differ in length, or there are not more than `n` points
pub fn deriv_fd(y: &[f64], x: Option<&[f64]>, n: usize) -> Result<(Vec<f64>, Vec<f64>)> {
    if n == 0 {
        return Err(Error::invalid("derivative order must be at least 1"));
    }
    let mut xd = match x {
        Some(x) => x.to_vec(),
        None => default_axis(y.len()),
    };
    check_lengths(y, &xd)?;
    if y.len() <= n {
        return Err(Error::invalid(format!(
            "need more than {n} points for derivative of order {n}, got {}",
            y.len()
        )));
    }

    let mut yd = y.to_vec();
    for _ in 0..n {
        let (xs, ys): (Vec<f64>, Vec<f64>) = xd
            .windows(2)
            .zip(yd.windows(2))
            .map(|(xw, yw)| {
                let dx = xw[1] - xw[0];
                (xw[0] + 0.5 * dx, (yw[1] - yw[0]) / dx)
            })
            .unzip();
        xd = xs;
        yd = ys;
    }
    Ok((xd, yd))
}

/// `n`-th derivative of possibly non-uniformly sampled data through a spline
/// fit with `opts.k` and `opts.s` (the accuracy settings are not used).
///
/// The derivative is evaluated at `xnew`, or at `x` if not given. Returns
/// `(xd, yd)` with `xd` the evaluation points, to match [`deriv_fd`].
///
/// # Errors
/// * If `n == 0` or `n > opts.k`
/// * Fit errors, see [`crate::bspline::fit_curve`]
pub fn deriv_spl(
    y: &[f64],
    x: Option<&[f64]>,
    xnew: Option<&[f64]>,
    n: usize,
    opts: SplineOptions,
) -> Result<(Vec<f64>, Vec<f64>)> {
    if n == 0 || n > opts.k {
        return Err(Error::invalid(format!(
            "derivative order must be in 1..={}, got {n}",
            opts.k
        )));
    }
    let x = match x {
        Some(x) => x.to_vec(),
        None => default_axis(y.len()),
    };
    let (tck, _) = fit_curve(&x, y, opts.k, opts.s)?;
    let xd = match xnew {
        Some(xnew) => xnew.to_vec(),
        None => x,
    };
    let yd = tck.eval(&xd, n);
    Ok((xd, yd))
}

/// Fit an interpolating cubic spline and find the root of its `der`-th
/// derivative in `[x[0], x[last]]`; returns `[x0, y(x0)]`.
fn spline_root(x: &[f64], y: &[f64], der: usize) -> Result<[f64; 2]> {
    let (tck, _) = fit_curve(x, y, 3, 0.0)?;
    let x0 = brentq(
        |v| tck.eval_one(v, der),
        x[0],
        x[x.len() - 1],
        &RootOptions::brent(),
    )?;
    let y0 = tck.eval_one(x0, 0);
    debug!("spline root of derivative {der}: x0={x0}, y0={y0}");
    Ok([x0, y0])
}

/// Minimum (or maximum) of a sampled curve as `[x0, y(x0)]`, from the root
/// of the first derivative of a cubic spline through the data.
///
/// `x` must be sorted and `[x[0], x[last]]` must contain exactly one extremum.
///
/// # Errors
/// * [`Error::Bracket`] if the slope does not change sign over the data
/// * Fit errors, see [`crate::bspline::fit_curve`]
pub fn findmin(x: &[f64], y: &[f64]) -> Result<[f64; 2]> {
    spline_root(x, y, 1)
}

/// Root of a sampled curve as `[x0, y(x0)]`, from a cubic spline through the
/// data. `x` must be sorted and `[x[0], x[last]]` must contain the root.
///
/// # Errors
/// * [`Error::Bracket`] if the curve does not change sign over the data
/// * Fit errors, see [`crate::bspline::fit_curve`]
pub fn findroot(x: &[f64], y: &[f64]) -> Result<[f64; 2]> {
    spline_root(x, y, 0)
}

/// Composite Simpson's rule over an even number of intervals of
/// `x[start..=stop]`, for arbitrary spacing.
fn simpson_pairs(y: &[f64], x: &[f64], start: usize, stop: usize) -> f64 {
    (start..stop)
        .step_by(2)
        .map(|i| {
            let h0 = x[i + 1] - x[i];
            let h1 = x[i + 2] - x[i + 1];
            let hsum = h0 + h1;
            let ratio = h0 / h1;
            hsum / 6.0
                * (y[i] * (2.0 - 1.0 / ratio)
                    + y[i + 1] * hsum * hsum / (h0 * h1)
                    + y[i + 2] * (2.0 - ratio))
        })
        .sum()
}

/// Integral of samples `y(x)` by Simpson's rule.
///
/// For an odd number of intervals, the result is the average of two
/// integrals, each using the trapezoidal rule on one end interval and
/// Simpson's rule on the rest.
///
/// # Panics
/// Panics if `x` and `y` differ in length.
pub fn simpson(y: &[f64], x: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "x and y must have equal length");
    let n = y.len();
    match n {
        0 | 1 => 0.0,
        2 => 0.5 * (x[1] - x[0]) * (y[1] + y[0]),
        _ if n % 2 == 1 => simpson_pairs(y, x, 0, n - 2),
        _ => {
            let first = simpson_pairs(y, x, 0, n - 3)
                + 0.5 * (x[n - 1] - x[n - 2]) * (y[n - 1] + y[n - 2]);
            let last = 0.5 * (x[1] - x[0]) * (y[1] + y[0]) + simpson_pairs(y, x, 1, n - 2);
            0.5 * (first + last)
        }
    }
}

/// Scale `y` so that its integral over `x` (Simpson's rule) equals `area`.
///
/// `x` and `y` are normalized to unit magnitude before integrating, which
/// keeps the quadrature well conditioned for data on very different scales.
///
/// # Errors
/// * If `x` and `y` differ in length
/// * If `x` or `y` is identically zero, or the integral vanishes
pub fn norm_int(y: &[f64], x: &[f64], area: f64) -> Result<Vec<f64>> {
    check_lengths(y, x)?;
    let xmax = x.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()));
    let ymax = y.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()));
    if !(xmax > 0.0 && ymax > 0.0) {
        return Err(Error::invalid("cannot normalize all-zero data"));
    }
    let (fx, fy) = (1.0 / xmax, 1.0 / ymax);
    let sx: Vec<f64> = x.iter().map(|v| v * fx).collect();
    let sy: Vec<f64> = y.iter().map(|v| v * fy).collect();

    let current = simpson(&sy, &sx) / (fx * fy);
    if current == 0.0 || !current.is_finite() {
        return Err(Error::invalid(format!(
            "cannot normalize data with integral {current}"
        )));
    }
    Ok(y.iter().map(|v| v * area / current).collect())
}
