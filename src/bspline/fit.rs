//! Least-squares fitting of B-spline coefficients to sampled data.
//!
//! With zero smoothing, the knots are placed at (or between) the data sites
//! so that the collocation matrix is square, and the coefficients interpolate
//! the data exactly. With a positive smoothing factor `s`, the same knot set
//! is used with a second-order difference penalty on the coefficients, and
//! the penalty weight is tuned until the residual sum of squares equals `s`.
//!
//! Every row of the collocation and penalty matrices has at most
//! `MAXDEG + 1` consecutive nonzeros, so both problems are solved as banded
//! least squares, reduced to upper triangular form one row at a time with
//! Givens rotations. Cost is linear in the number of data sites.
use log::{debug, trace};
use nalgebra::DMatrix;

use super::{basis_funs, find_interval, Tck, MAXDEG};
use crate::{Error, Result};

/// Bounds of the penalty weight search, relative to the ratio of
/// data-term to penalty-term magnitude
const LAMBDA_MIN: f64 = 1e-10;
const LAMBDA_MAX: f64 = 1e10;
/// Relative tolerance on the residual sum of squares
const SMOOTH_TOL: f64 = 1e-3;
const SMOOTH_MAXITER: usize = 100;
/// Storage width of one banded row
const BAND: usize = MAXDEG + 1;
/// Diagonal entries of the triangular factor below this fraction of the
/// largest one mark a rank-deficient system
const RANK_TOL: f64 = 1e-13;

/// Interpolation knots for data sites `x` and degree `k`:
/// `k + 1` boundary knots at each end and `m - k - 1` interior knots
/// at data sites (odd `k`) or midway between them (even `k`).
///
/// # Errors
/// * If `k` is outside `1..=MAXDEG`
/// * If there are fewer than `k + 1` data sites
pub fn interp_knots(x: &[f64], k: usize) -> Result<Vec<f64>> {
    if k == 0 || k > MAXDEG {
        return Err(Error::invalid(format!(
            "spline degree must be in 1..={MAXDEG}, got {k}"
        )));
    }
    let m = x.len();
    if m < k + 1 {
        return Err(Error::invalid(format!(
            "need at least {} points for a degree {k} spline, got {m}",
            k + 1
        )));
    }

    let mut t = Vec::with_capacity(m + k + 1);
    t.extend(std::iter::repeat(x[0]).take(k + 1));
    for j in 0..m - k - 1 {
        let knot = if k % 2 == 1 {
            x[j + (k + 1) / 2]
        } else {
            (x[j + k / 2] + x[j + k / 2 + 1]) / 2.0
        };
        t.push(knot);
    }
    t.extend(std::iter::repeat(x[m - 1]).take(k + 1));
    Ok(t)
}

/// Upper triangular factor `r` of a banded least-squares problem, with the
/// rotated right-hand sides `qty`. Row `i` of `r` holds columns `i..i + BAND`.
#[derive(Clone)]
struct BandedQr {
    r: Vec<[f64; BAND]>,
    qty: DMatrix<f64>,
}

impl BandedQr {
    fn new(ncoef: usize, nrhs: usize) -> Self {
        Self {
            r: vec![[0.0; BAND]; ncoef],
            qty: DMatrix::zeros(ncoef, nrhs),
        }
    }

    /// Rotate one observation row into the factor. `h` holds the row's
    /// values from column `start` on, `z` its right-hand sides.
    fn add_row(&mut self, start: usize, mut h: [f64; BAND], mut z: Vec<f64>) {
        for i in start..self.r.len() {
            if h.iter().all(|&v| v == 0.0) {
                return;
            }
            let piv = h[0];
            if piv != 0.0 {
                let rii = self.r[i][0];
                if rii == 0.0 {
                    // Empty row of the factor; the observation becomes it
                    self.r[i] = h;
                    for (c, zc) in z.iter().enumerate() {
                        self.qty[(i, c)] = *zc;
                    }
                    return;
                }
                let w = rii.hypot(piv);
                let (cos, sin) = (rii / w, piv / w);
                self.r[i][0] = w;
                for j in 1..BAND {
                    let (a, b) = (self.r[i][j], h[j]);
                    self.r[i][j] = cos * a + sin * b;
                    h[j] = cos * b - sin * a;
                }
                for (c, zc) in z.iter_mut().enumerate() {
                    let a = self.qty[(i, c)];
                    self.qty[(i, c)] = cos * a + sin * *zc;
                    *zc = cos * *zc - sin * a;
                }
            }
            h.rotate_left(1);
            h[BAND - 1] = 0.0;
        }
    }

    /// Back substitution, or `None` if the system is rank deficient
    fn solve(&self) -> Option<DMatrix<f64>> {
        let n = self.r.len();
        let dmax = self.r.iter().map(|row| row[0].abs()).fold(0.0, f64::max);
        let mut c = self.qty.clone();
        for i in (0..n).rev() {
            let rii = self.r[i][0];
            if !(rii.abs() > RANK_TOL * dmax) {
                return None;
            }
            for col in 0..c.ncols() {
                let mut acc = c[(i, col)];
                for j in 1..BAND.min(n - i) {
                    acc -= self.r[i][j] * c[(i + j, col)];
                }
                c[(i, col)] = acc / rii;
            }
        }
        Some(c).filter(|c| c.iter().all(|v| v.is_finite()))
    }
}

/// Collocation matrix of a knot vector at the data sites, with the
/// machinery to solve for coefficients with or without smoothing.
pub(crate) struct Collocation {
    pub t: Vec<f64>,
    pub k: usize,
    ncoef: usize,
    /// First nonzero column and basis function values at each data site
    rows: Vec<(usize, [f64; BAND])>,
    /// Rows of the difference penalty `d`, same layout
    penalty: Vec<(usize, [f64; BAND])>,
}

impl Collocation {
    /// Build interpolation knots and the collocation matrix for data sites `x`.
    ///
    /// # Errors
    /// * If `k` is outside `1..=MAXDEG`
    /// * If there are fewer than `k + 1` data sites
    pub fn new(x: &[f64], k: usize) -> Result<Self> {
        let t = interp_knots(x, k)?;
        let ncoef = t.len() - k - 1;

        let rows = x
            .iter()
            .map(|&xi| {
                let l = find_interval(&t, k, xi);
                let mut vals = [0.0; BAND];
                basis_funs(&t, k, l, xi, &mut vals);
                (l - k, vals)
            })
            .collect();
        let penalty = difference_penalty(&t, k);

        Ok(Self {
            t,
            k,
            ncoef,
            rows,
            penalty,
        })
    }

    /// Number of coefficients
    pub fn ncoef(&self) -> usize {
        self.ncoef
    }

    /// Penalty weight at which data and penalty terms have similar magnitude
    pub fn lambda_scale(&self) -> f64 {
        let sumsq = |rows: &[(usize, [f64; BAND])]| -> f64 {
            rows.iter().flat_map(|(_, v)| v.iter()).map(|v| v * v).sum()
        };
        let p = sumsq(&self.penalty);
        if p > 0.0 {
            sumsq(&self.rows) / p
        } else {
            1.0
        }
    }

    /// Triangular factor of the data rows, with `rhs` rotated alongside
    fn factor(&self, rhs: &DMatrix<f64>) -> BandedQr {
        let mut qr = BandedQr::new(self.ncoef, rhs.ncols());
        for (row, &(start, vals)) in self.rows.iter().enumerate() {
            qr.add_row(start, vals, rhs.row(row).iter().copied().collect());
        }
        qr
    }

    /// Solve `b c = rhs` for each column of `rhs`.
    ///
    /// # Errors
    /// * If the collocation matrix is singular (repeated data sites)
    pub fn interpolate(&self, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.factor(rhs).solve().ok_or_else(|| {
            Error::invalid("singular interpolation system, data sites must be distinct")
        })
    }

    /// Minimize `|b c - rhs|^2 + lambda |d c|^2` for each column of `rhs`.
    pub fn smooth(&self, lambda: f64, rhs: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let mut qr = self.factor(rhs);
        let w = lambda.sqrt();
        for &(start, vals) in &self.penalty {
            qr.add_row(start, vals.map(|v| w * v), vec![0.0; rhs.ncols()]);
        }
        qr.solve()
            .ok_or_else(|| Error::invalid("singular smoothing system"))
    }

    /// Values of the spline with coefficient columns `c` at the data sites
    pub fn apply(&self, c: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(self.rows.len(), c.ncols(), |row, col| {
            let (start, vals) = &self.rows[row];
            vals.iter()
                .enumerate()
                .filter(|&(r, _)| start + r < self.ncoef)
                .map(|(r, v)| v * c[(start + r, col)])
                .sum()
        })
    }
}

/// Rows of the second-order divided difference operator `d` on the
/// coefficients of a spline with knots `t` and degree `k`.
///
/// Differences are taken over the Greville abscissae, so coefficients that
/// represent a straight line carry no penalty.
fn difference_penalty(t: &[f64], k: usize) -> Vec<(usize, [f64; BAND])> {
    let n = t.len() - k - 1;
    if n < 3 {
        return Vec::new();
    }

    let greville: Vec<f64> = (0..n)
        .map(|i| t[i + 1..=i + k].iter().sum::<f64>() / k as f64)
        .collect();

    (0..n - 2)
        .filter_map(|row| {
            let h0 = greville[row + 1] - greville[row];
            let h1 = greville[row + 2] - greville[row + 1];
            if h0 <= 0.0 || h1 <= 0.0 {
                return None;
            }
            let mut d = [0.0; BAND];
            d[0] = 1.0 / h0;
            d[1] = -1.0 / h0 - 1.0 / h1;
            d[2] = 1.0 / h1;
            Some((row, d))
        })
        .collect()
}

/// Find the penalty weight whose fit has residual sum of squares `s`,
/// by bisection on a log scale.
///
/// `ssr` maps a penalty weight to the residual sum of squares of its fit,
/// which grows monotonically with the weight. If even the stiffest fit stays
/// below `s`, the stiffest weight is returned.
pub(crate) fn search_lambda<F>(scale: f64, s: f64, mut ssr: F) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    let mut lo = scale * LAMBDA_MIN;
    let mut hi = scale * LAMBDA_MAX;

    if ssr(hi)? <= s {
        debug!("smoothing factor s={s:e} reached by stiffest fit");
        return Ok(hi);
    }
    if ssr(lo)? >= s {
        return Ok(lo);
    }

    let mut mid = (lo * hi).sqrt();
    for i in 0..SMOOTH_MAXITER {
        mid = (lo * hi).sqrt();
        let fp = ssr(mid)?;
        trace!("lambda search iteration {i}: lambda={mid:e}, fp={fp:e}");
        if (fp - s).abs() <= SMOOTH_TOL * s {
            break;
        }
        if fp > s {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    Ok(mid)
}

/// Fit a spline of degree `k` with smoothing factor `s` through `(x, y)`.
///
/// Returns the spline and its residual sum of squares at the data sites.
/// Assumes `x` is sorted; callers validate their own input ordering.
///
/// For `s > 0` the knots stay at the interpolation knots and the
/// coefficients are shrunk towards a straight line by a second-difference
/// penalty. Only linear trends are free of the penalty, so curvature of a
/// quadratic or cubic trend is flattened as `s` grows. This differs from
/// FITPACK's `curfit`, which instead places fewer knots and leaves
/// polynomials of degree `k` unpenalized; the residual still meets `s`,
/// but the fitted curve is not the same.
///
/// # Errors
/// * If `x` and `y` lengths differ
/// * If `s` is negative or not finite
/// * If there are too few points for the degree
/// * If the interpolating system is singular
pub fn fit_curve(x: &[f64], y: &[f64], k: usize, s: f64) -> Result<(Tck, f64)> {
    if x.len() != y.len() {
        return Err(Error::invalid(format!(
            "x and y must have equal length, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    if !(s >= 0.0 && s.is_finite()) {
        return Err(Error::invalid(format!(
            "smoothing factor must be finite and >= 0, got {s}"
        )));
    }

    let colloc = Collocation::new(x, k)?;
    let rhs = DMatrix::from_column_slice(y.len(), 1, y);
    let ssr_of = |c: &DMatrix<f64>| -> f64 { (colloc.apply(c) - &rhs).norm_squared() };

    let c = if s == 0.0 {
        colloc.interpolate(&rhs)?
    } else {
        let lambda = search_lambda(colloc.lambda_scale(), s, |lambda| {
            colloc.smooth(lambda, &rhs).map(|c| ssr_of(&c))
        })?;
        colloc.smooth(lambda, &rhs)?
    };
    let fp = ssr_of(&c);

    debug!(
        "fit spline: m={}, k={k}, s={s:e}, ncoef={}, fp={fp:e}",
        x.len(),
        colloc.ncoef()
    );

    let c = c.as_slice().to_vec();
    Ok((Tck::new(colloc.t, c, k)?, fp))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::utils::linspace;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_interp_knots_cubic() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let t = interp_knots(&x, 3).unwrap();
        assert_eq!(
            t,
            vec![0.0, 0.0, 0.0, 0.0, 2.0, 3.0, 5.0, 5.0, 5.0, 5.0]
        );
    }

    #[test]
    fn test_interp_knots_quadratic() {
        let x = [0.0, 1.0, 2.0, 4.0];
        let t = interp_knots(&x, 2).unwrap();
        assert_eq!(t, vec![0.0, 0.0, 0.0, 1.5, 4.0, 4.0, 4.0]);
    }

    #[test]
    fn test_interp_knots_errors() {
        assert!(interp_knots(&[0.0, 1.0, 2.0], 3).is_err());
        assert!(interp_knots(&[], 1).is_err());
        assert!(interp_knots(&[0.0, 1.0], 0).is_err());
    }

    #[test]
    fn test_long_series() {
        // Banded solve keeps long series cheap and accurate
        let x = linspace(0.0_f64, 100.0, 20_000);
        let y: Vec<f64> = x.iter().map(|xi| (0.3 * xi).sin() + 0.01 * xi).collect();
        let (tck, fp) = fit_curve(&x, &y, 3, 0.0).unwrap();
        assert!(fp < 1e-18, "fp={fp}");
        for xi in [0.123, 47.5, 99.99] {
            assert_abs_diff_eq!(tck.eval_one(xi, 0), (0.3 * xi).sin() + 0.01 * xi, epsilon = 1e-9);
        }

        let (_, fp) = fit_curve(&x, &y, 3, 1e-3).unwrap();
        assert!((fp - 1e-3).abs() <= 2.0 * SMOOTH_TOL * 1e-3, "fp={fp}");
    }

    #[test]
    fn test_linear_smoothing() {
        // The penalty is wider than a linear basis row
        let x = linspace(0.0_f64, 1.0, 30);
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| 2.0 * xi + if i % 2 == 0 { 0.05 } else { -0.05 })
            .collect();
        let s = 0.02;
        let (tck, fp) = fit_curve(&x, &y, 1, s).unwrap();
        assert!((fp - s).abs() <= 2.0 * SMOOTH_TOL * s, "fp={fp}");
        assert_abs_diff_eq!(tck.eval_one(0.5, 1), 2.0, epsilon = 0.5);
    }

    #[test]
    fn test_interpolation_reproduces_cubic() {
        // A cubic polynomial lies in the spline space, so it is recovered everywhere
        let f = |x: f64| 0.5 * x * x * x - x * x + 2.0 * x - 1.0;
        let x = linspace(-2.0_f64, 3.0, 11);
        let y: Vec<f64> = x.iter().map(|&xi| f(xi)).collect();
        for k in 3..=5 {
            let (tck, fp) = fit_curve(&x, &y, k, 0.0).unwrap();
            assert!(fp < 1e-20);
            for xi in linspace(-2.0_f64, 3.0, 37) {
                assert_abs_diff_eq!(tck.eval_one(xi, 0), f(xi), epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_linear_spline_is_polyline() {
        let x = [0.0, 1.0, 3.0];
        let y = [0.0, 2.0, -2.0];
        let (tck, _) = fit_curve(&x, &y, 1, 0.0).unwrap();
        assert_abs_diff_eq!(tck.eval_one(0.5, 0), 1.0, epsilon = 1e-14);
        assert_abs_diff_eq!(tck.eval_one(2.0, 0), 0.0, epsilon = 1e-14);
        assert_abs_diff_eq!(tck.eval_one(2.0, 1), -2.0, epsilon = 1e-14);
    }

    #[test]
    fn test_smoothing_hits_target_residual() {
        let x = linspace(0.0_f64, 10.0, 50);
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, &xi)| xi.sin() + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();
        let s = 0.2;
        let (_, fp) = fit_curve(&x, &y, 3, s).unwrap();
        assert!((fp - s).abs() <= 2.0 * SMOOTH_TOL * s, "fp={fp}");
    }

    #[test]
    fn test_huge_smoothing_gives_straight_line() {
        let x = linspace(0.0_f64, 1.0, 20);
        let y: Vec<f64> = x.iter().map(|&xi| 3.0 * xi + 1.0 + (10.0 * xi).sin()).collect();
        let (tck, _) = fit_curve(&x, &y, 3, 1e6).unwrap();
        assert_abs_diff_eq!(tck.eval_one(0.3, 2), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_fit_errors() {
        assert!(fit_curve(&[0.0, 1.0], &[0.0], 1, 0.0).is_err());
        assert!(fit_curve(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], 3, 0.0).is_err());
        assert!(fit_curve(&[0.0, 1.0, 2.0], &[0.0, 1.0, 2.0], 1, -1.0).is_err());
        // Repeated data sites cannot be interpolated
        let err = fit_curve(&[0.0, 1.0, 1.0, 2.0], &[0.0, 1.0, 2.0, 3.0], 1, 0.0).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
