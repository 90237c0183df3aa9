//! Scalar root finding behind a single call signature.
//!
//! A start guess drives the secant method (Newton's method with a finite
//! difference slope); a bracket drives Brent's method. Neither retries or
//! widens its search: a failure is returned to the caller as-is.
use log::{trace, warn};

use crate::{Error, Result};

/// How to search for a root.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum Search {
    /// Secant iteration starting from this guess.
    Guess(f64),
    /// Brent's method on `[a, b]`; `f(a)` and `f(b)` must differ in sign.
    Bracket(f64, f64),
    /// Brent's method on the caller's default interval,
    /// usually the full range of the sampled data.
    #[default]
    Auto,
}

/// Tolerances and iteration limits for the root finders.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootOptions {
    /// Absolute tolerance on the root location
    pub xtol: f64,
    /// Relative tolerance on the root location
    pub rtol: f64,
    pub maxiter: usize,
}

impl RootOptions {
    /// Defaults for Brent's method.
    pub fn brent() -> Self {
        Self {
            xtol: 2e-12,
            rtol: 4.0 * f64::EPSILON,
            maxiter: 100,
        }
    }

    /// Defaults for the secant method.
    pub fn secant() -> Self {
        Self {
            xtol: 1.48e-8,
            rtol: 0.0,
            maxiter: 50,
        }
    }

    pub fn xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn rtol(mut self, rtol: f64) -> Self {
        self.rtol = rtol;
        self
    }

    pub fn maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = maxiter;
        self
    }
}

/// Find a root of `f` with the strategy selected by `search`.
///
/// `default_bracket` is used for [`Search::Auto`].
///
/// # Errors
/// * [`Error::Bracket`] if a bracket does not straddle a sign change
/// * [`Error::NotConverged`] if the iteration limit is exhausted
pub fn find_root<F>(f: F, search: Search, default_bracket: (f64, f64)) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    match search {
        Search::Guess(x0) => secant(f, x0, &RootOptions::secant()),
        Search::Bracket(a, b) => brentq(f, a, b, &RootOptions::brent()),
        Search::Auto => brentq(f, default_bracket.0, default_bracket.1, &RootOptions::brent()),
    }
}

/// Brent's method with inverse quadratic extrapolation,
/// falling back on bisection whenever the interpolated step is not short enough.
///
/// # Errors
/// * [`Error::Bracket`] if `f(a)` and `f(b)` have the same sign
/// * [`Error::NotConverged`] after `opts.maxiter` iterations
pub fn brentq<F>(f: F, a: f64, b: f64, opts: &RootOptions) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let (mut xpre, mut xcur) = (a, b);
    let (mut fpre, mut fcur) = (f(xpre), f(xcur));
    let (mut xblk, mut fblk) = (0.0, 0.0);
    let (mut spre, mut scur) = (0.0, 0.0);

    if fpre * fcur > 0.0 || fpre.is_nan() || fcur.is_nan() {
        return Err(Error::Bracket {
            a,
            b,
            fa: fpre,
            fb: fcur,
        });
    }
    if fpre == 0.0 {
        return Ok(xpre);
    }
    if fcur == 0.0 {
        return Ok(xcur);
    }

    for i in 0..opts.maxiter {
        if fpre != 0.0 && fcur != 0.0 && fpre.is_sign_negative() != fcur.is_sign_negative() {
            xblk = xpre;
            fblk = fpre;
            spre = xcur - xpre;
            scur = spre;
        }
        if fblk.abs() < fcur.abs() {
            xpre = xcur;
            xcur = xblk;
            xblk = xpre;
            fpre = fcur;
            fcur = fblk;
            fblk = fpre;
        }

        let delta = (opts.xtol + opts.rtol * xcur.abs()) / 2.0;
        let sbis = (xblk - xcur) / 2.0;
        if fcur == 0.0 || sbis.abs() < delta {
            trace!("brentq converged to {xcur} after {i} iterations");
            return Ok(xcur);
        }

        if spre.abs() > delta && fcur.abs() < fpre.abs() {
            let stry = if xpre == xblk {
                // Secant step
                -fcur * (xcur - xpre) / (fcur - fpre)
            } else {
                // Inverse quadratic extrapolation
                let dpre = (fpre - fcur) / (xpre - xcur);
                let dblk = (fblk - fcur) / (xblk - xcur);
                -fcur * (fblk * dblk - fpre * dpre) / (dblk * dpre * (fblk - fpre))
            };

            if 2.0 * stry.abs() < spre.abs().min(3.0 * sbis.abs() - delta) {
                spre = scur;
                scur = stry;
            } else {
                spre = sbis;
                scur = sbis;
            }
        } else {
            spre = sbis;
            scur = sbis;
        }

        xpre = xcur;
        fpre = fcur;
        if scur.abs() > delta {
            xcur += scur;
        } else {
            xcur += if sbis > 0.0 { delta } else { -delta };
        }
        fcur = f(xcur);
    }

    Err(Error::NotConverged {
        method: "brentq",
        iterations: opts.maxiter,
    })
}

/// Secant method starting from `x0` and a second point nudged away from it.
///
/// # Errors
/// * [`Error::NotConverged`] after `opts.maxiter` iterations
pub fn secant<F>(f: F, x0: f64, opts: &RootOptions) -> Result<f64>
where
    F: Fn(f64) -> f64,
{
    let mut p0 = x0;
    let mut p1 = if x0 >= 0.0 {
        x0 * (1.0 + 1e-4) + 1e-4
    } else {
        x0 * (1.0 + 1e-4) - 1e-4
    };
    let mut q0 = f(p0);
    let mut q1 = f(p1);
    if q1.abs() < q0.abs() {
        std::mem::swap(&mut p0, &mut p1);
        std::mem::swap(&mut q0, &mut q1);
    }

    for i in 0..opts.maxiter {
        if q1 == q0 {
            if p1 != p0 {
                warn!("secant: flat function values, tolerance reached at {p1}");
            }
            return Ok((p1 + p0) / 2.0);
        }

        let p = if q1.abs() > q0.abs() {
            (-q0 / q1 * p1 + p0) / (1.0 - q0 / q1)
        } else {
            (-q1 / q0 * p0 + p1) / (1.0 - q1 / q0)
        };

        if !p.is_finite() {
            break;
        }
        if (p - p1).abs() < opts.xtol + opts.rtol * p.abs() {
            trace!("secant converged to {p} after {i} iterations");
            return Ok(p);
        }

        p0 = p1;
        q0 = q1;
        p1 = p;
        q1 = f(p1);
    }

    Err(Error::NotConverged {
        method: "secant",
        iterations: opts.maxiter,
    })
}
