//! B-spline curves in knot/coefficient/degree ("tck") form.
//!
//! Evaluation uses de Boor's algorithm on the `k + 1` coefficients that are
//! nonzero in the knot interval containing the observation point, with
//! fixed-size intermediate storage and no allocation. Derivatives are taken
//! by differencing those local coefficients before the de Boor sweep.
//!
//! Observation points outside the knot span are evaluated with the
//! polynomial piece of the nearest end interval, so splines extrapolate
//! smoothly rather than failing.
use num_traits::{Float, NumCast};

pub mod fit;

pub use fit::{fit_curve, interp_knots};

/// Maximum supported spline degree
pub const MAXDEG: usize = 5;

/// Knots, coefficients and degree of a spline curve.
#[derive(Clone, Debug, PartialEq)]
pub struct Tck {
    /// Knot vector, length `ncoef + k + 1`
    pub t: Vec<f64>,
    /// B-spline coefficients
    pub c: Vec<f64>,
    /// Polynomial degree
    pub k: usize,
}

impl Tck {
    /// Assemble a spline from its parts.
    ///
    /// # Errors
    /// * If the degree is zero or exceeds [`MAXDEG`]
    /// * If there are fewer than `k + 1` coefficients
    /// * If the number of knots does not match `c.len() + k + 1`
    /// * If the knots are not finite and non-decreasing
    pub fn new(t: Vec<f64>, c: Vec<f64>, k: usize) -> Result<Self, crate::Error> {
        if k == 0 || k > MAXDEG {
            return Err(crate::Error::invalid(format!(
                "spline degree must be in 1..={MAXDEG}, got {k}"
            )));
        }
        if c.len() < k + 1 {
            return Err(crate::Error::invalid(format!(
                "a degree {k} spline needs at least {} coefficients, got {}",
                k + 1,
                c.len()
            )));
        }
        if t.len() != c.len() + k + 1 {
            return Err(crate::Error::invalid(format!(
                "{} knots do not match {} coefficients of degree {k}",
                t.len(),
                c.len()
            )));
        }
        if t.iter().any(|v| !v.is_finite()) || t.windows(2).any(|w| w[1] < w[0]) {
            return Err(crate::Error::invalid("knots must be finite and non-decreasing"));
        }
        Ok(Self { t, c, k })
    }

    /// Number of B-spline coefficients
    #[inline]
    pub fn ncoef(&self) -> usize {
        self.c.len()
    }

    /// Evaluate the spline or its `der`-th derivative at one point.
    #[inline]
    pub fn eval_one(&self, x: f64, der: usize) -> f64 {
        let l = find_interval(&self.t, self.k, x);
        de_boor(&self.t, &self.c, self.k, l, x, der)
    }

    /// Evaluate the spline or its `der`-th derivative at a set of points.
    pub fn eval(&self, xs: &[f64], der: usize) -> Vec<f64> {
        xs.iter().map(|&x| self.eval_one(x, der)).collect()
    }
}

/// Index `l` of the knot interval `t[l] <= x < t[l + 1]` used to evaluate at `x`,
/// clipped to the span `k..=ncoef - 1` so that points outside the knot span
/// select the end intervals.
#[inline]
pub fn find_interval<T: Float>(t: &[T], k: usize, x: T) -> usize {
    let ncoef = t.len() - k - 1;
    t.partition_point(|v| *v <= x)
        .saturating_sub(1)
        .max(k)
        .min(ncoef - 1)
}

/// Values of the `k + 1` B-splines of degree `k` that are nonzero on knot
/// interval `l`, evaluated at `x` (Cox-de Boor recursion).
///
/// `out[r]` holds the value of the B-spline with index `l - k + r`.
#[inline]
pub fn basis_funs<T: Float>(t: &[T], k: usize, l: usize, x: T, out: &mut [T]) {
    let mut left = [T::zero(); MAXDEG + 1];
    let mut right = [T::zero(); MAXDEG + 1];

    out[0] = T::one();
    for j in 1..=k {
        left[j] = x - t[l + 1 - j];
        right[j] = t[l + j] - x;
        let mut saved = T::zero();
        for r in 0..j {
            let temp = out[r] / (right[r + 1] + left[j - r]);
            out[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        out[j] = saved;
    }
}

/// De Boor evaluation of the `der`-th derivative of a spline on knot interval `l`.
///
/// Derivatives of order higher than the degree are identically zero.
#[inline]
pub fn de_boor<T: Float>(t: &[T], c: &[T], k: usize, l: usize, x: T, der: usize) -> T {
    if der > k {
        return T::zero();
    }

    // Local coefficients; d[j] belongs to the B-spline with index l - k + j
    let mut d = [T::zero(); MAXDEG + 1];
    d[..=k].copy_from_slice(&c[l - k..=l]);

    // Differentiate: each pass lowers the degree by one and
    // invalidates the lowest remaining local coefficient
    for r in 1..=der {
        let p = k - r + 1;
        let pf = <T as NumCast>::from(p).unwrap_or_else(T::one);
        for j in (r..=k).rev() {
            let i = l - k + j;
            let span = t[i + p] - t[i];
            d[j] = if span > T::zero() {
                pf * (d[j] - d[j - 1]) / span
            } else {
                T::zero()
            };
        }
    }

    // De Boor sweep at the reduced degree
    let q = k - der;
    for r in 1..=q {
        for j in (der + r..=k).rev() {
            let i = l - k + j;
            let span = t[i + q + 1 - r] - t[i];
            let alpha = if span > T::zero() {
                (x - t[i]) / span
            } else {
                T::zero()
            };
            d[j] = (T::one() - alpha) * d[j - 1] + alpha * d[j];
        }
    }

    d[k]
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Clamped cubic on [0, 1] with no interior knots is a Bezier curve.
    fn bezier() -> Tck {
        Tck::new(
            vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0],
            vec![0.0, 1.0, 3.0, 2.0],
            3,
        )
        .unwrap()
    }

    fn bezier_ref(x: f64) -> (f64, f64) {
        let c = [0.0, 1.0, 3.0, 2.0];
        let u = 1.0 - x;
        let v = c[0] * u * u * u + 3.0 * c[1] * u * u * x + 3.0 * c[2] * u * x * x + c[3] * x * x * x;
        let dv = 3.0 * ((c[1] - c[0]) * u * u + 2.0 * (c[2] - c[1]) * u * x + (c[3] - c[2]) * x * x);
        (v, dv)
    }

    #[test]
    fn test_bezier_value_and_slope() {
        let tck = bezier();
        for x in [0.0, 0.1, 0.5, 0.77, 1.0] {
            let (v, dv) = bezier_ref(x);
            assert_abs_diff_eq!(tck.eval_one(x, 0), v, epsilon = 1e-14);
            assert_abs_diff_eq!(tck.eval_one(x, 1), dv, epsilon = 1e-13);
        }
        // Third derivative of a cubic is constant, fourth is zero
        let d3 = tck.eval_one(0.2, 3);
        assert_abs_diff_eq!(tck.eval_one(0.9, 3), d3, epsilon = 1e-12);
        assert_eq!(tck.eval_one(0.5, 4), 0.0);
    }

    #[test]
    fn test_extrapolation_continues_end_piece() {
        let tck = bezier();
        // Outside the span the same cubic polynomial is used
        let (v, _) = bezier_ref(1.5);
        assert_abs_diff_eq!(tck.eval_one(1.5, 0), v, epsilon = 1e-12);
        let (v, _) = bezier_ref(-0.5);
        assert_abs_diff_eq!(tck.eval_one(-0.5, 0), v, epsilon = 1e-12);
    }

    #[test]
    fn test_partition_of_unity() {
        let t = [0.0, 0.0, 0.0, 1.0, 2.0, 2.5, 4.0, 4.0, 4.0];
        let k = 2;
        let mut out = [0.0; MAXDEG + 1];
        for x in [0.0, 0.3, 1.0, 2.2, 3.9, 4.0] {
            let l = find_interval(&t, k, x);
            basis_funs(&t, k, l, x, &mut out);
            let total: f64 = out[..=k].iter().sum();
            assert_abs_diff_eq!(total, 1.0, epsilon = 1e-14);
            assert!(out[..=k].iter().all(|&b| b >= 0.0));
        }
    }

    #[test]
    fn test_find_interval_clips() {
        let t = [0.0, 0.0, 1.0, 2.0, 3.0, 3.0];
        assert_eq!(find_interval(&t, 1, -1.0), 1);
        assert_eq!(find_interval(&t, 1, 0.0), 1);
        assert_eq!(find_interval(&t, 1, 1.5), 2);
        assert_eq!(find_interval(&t, 1, 3.0), 3);
        assert_eq!(find_interval(&t, 1, 7.0), 3);
    }

    #[test]
    fn test_tck_validation() {
        assert!(Tck::new(vec![0.0, 1.0], vec![1.0], 0).is_err());
        assert!(Tck::new(vec![0.0, 0.0, 1.0, 1.0], vec![1.0], 1).is_err());
        assert!(Tck::new(vec![0.0, 0.0, 1.0, 0.5], vec![1.0, 2.0], 1).is_err());
        // Too few coefficients for the degree, even with matching knots
        let short = Tck::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0], vec![1.0, 2.0], 3);
        assert!(matches!(short, Err(crate::Error::InvalidInput(_))));
        assert!(Tck::new(vec![0.0, 0.0, f64::NAN, 1.0], vec![1.0, 2.0], 1).is_err());
    }
}
