//! Tensor-product B-spline surfaces over rectilinear grids.
//!
//! The surface is `s(x, y) = sum_pq c[p, q] Bx_p(x) By_q(y)`, with one knot
//! vector per axis. Because the data lie on a grid, the fit separates into
//! 1D solves along each axis: with collocation matrices `Bx` and `By`,
//! interpolation solves `Bx C By' = Z`, and smoothing solves the penalized
//! normal equations one axis at a time.
use log::debug;
use nalgebra::DMatrix;

use crate::bspline::fit::{search_lambda, Collocation};
use crate::bspline::{basis_funs, find_interval, MAXDEG};
use crate::{Error, Result};

/// Options for bivariate spline fits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BisplOptions {
    /// Degree along x
    pub kx: usize,
    /// Degree along y
    pub ky: usize,
    /// Smoothing factor: upper bound on the residual sum of squares.
    /// Defaults to 0, so the surface interpolates the grid values; pass a
    /// positive `s` (e.g. `m - sqrt(2 m)` for `m` noisy samples) to smooth.
    pub s: f64,
    /// Maximum number of knots along x, `10 * nx` if not set
    pub nxest: Option<usize>,
    /// Maximum number of knots along y, `10 * ny` if not set
    pub nyest: Option<usize>,
}

impl Default for BisplOptions {
    fn default() -> Self {
        Self {
            kx: 3,
            ky: 3,
            s: 0.0,
            nxest: None,
            nyest: None,
        }
    }
}

impl BisplOptions {
    pub fn kx(mut self, kx: usize) -> Self {
        self.kx = kx;
        self
    }

    pub fn ky(mut self, ky: usize) -> Self {
        self.ky = ky;
        self
    }

    pub fn s(mut self, s: f64) -> Self {
        self.s = s;
        self
    }

    pub fn nxest(mut self, nxest: usize) -> Self {
        self.nxest = Some(nxest);
        self
    }

    pub fn nyest(mut self, nyest: usize) -> Self {
        self.nyest = Some(nyest);
        self
    }
}

/// A fitted tensor-product spline surface.
#[derive(Clone, Debug)]
pub struct Bispline {
    tx: Vec<f64>,
    ty: Vec<f64>,
    kx: usize,
    ky: usize,
    /// Coefficients in C order, `c[p * ncy + q]`
    c: Vec<f64>,
    /// Residual sum of squares at the grid points
    fp: f64,
}

fn check_axis(name: &str, v: &[f64]) -> Result<()> {
    if !v.windows(2).all(|w| w[1] > w[0]) {
        return Err(Error::invalid(format!(
            "grid axis {name} must be strictly increasing"
        )));
    }
    Ok(())
}

impl Bispline {
    /// Fit a surface to values `z` on the grid `x` by `y`,
    /// with `z` in C order (`z[i * ny + j]` at `(x[i], y[j])`).
    ///
    /// # Errors
    /// * If `z.len() != x.len() * y.len()`, or an axis is not strictly increasing
    /// * If a degree is outside `1..=5`, or an axis has too few points for it
    /// * If the fit needs more knots than `nxest` / `nyest` allow
    /// * If `s` is negative or not finite
    pub fn new(x: &[f64], y: &[f64], z: &[f64], opts: BisplOptions) -> Result<Self> {
        let (nx, ny) = (x.len(), y.len());
        if z.len() != nx * ny {
            return Err(Error::invalid(format!(
                "grid of {nx}x{ny} points needs {} values, got {}",
                nx * ny,
                z.len()
            )));
        }
        check_axis("x", x)?;
        check_axis("y", y)?;
        if !(opts.s >= 0.0 && opts.s.is_finite()) {
            return Err(Error::invalid(format!(
                "smoothing factor must be finite and >= 0, got {}",
                opts.s
            )));
        }

        let colx = Collocation::new(x, opts.kx)?;
        let coly = Collocation::new(y, opts.ky)?;
        let nxest = opts.nxest.unwrap_or(10 * nx);
        let nyest = opts.nyest.unwrap_or(10 * ny);
        if colx.t.len() > nxest || coly.t.len() > nyest {
            return Err(Error::invalid(format!(
                "fit needs {} x {} knots, more than nxest={nxest}, nyest={nyest} allow",
                colx.t.len(),
                coly.t.len()
            )));
        }

        let zmat = DMatrix::from_row_slice(nx, ny, z);
        let ssr_of = |c: &DMatrix<f64>| -> f64 {
            let fitted = colx.apply(&coly.apply(&c.transpose()).transpose());
            (fitted - &zmat).norm_squared()
        };

        let c = if opts.s == 0.0 {
            let a = colx.interpolate(&zmat)?;
            coly.interpolate(&a.transpose())?.transpose()
        } else {
            let solve = |lambda: f64| -> Result<DMatrix<f64>> {
                let a = colx.smooth(lambda, &zmat)?;
                Ok(coly.smooth(lambda, &a.transpose())?.transpose())
            };
            let scale = (colx.lambda_scale() * coly.lambda_scale()).sqrt();
            let lambda = search_lambda(scale, opts.s, |lambda| solve(lambda).map(|c| ssr_of(&c)))?;
            solve(lambda)?
        };
        let fp = ssr_of(&c);

        debug!(
            "fit bivariate spline: {nx}x{ny} grid, kx={}, ky={}, s={:e}, fp={fp:e}",
            colx.k, coly.k, opts.s
        );

        // Row-major copy of the ncx x ncy coefficient matrix
        let c = c.transpose().as_slice().to_vec();
        Ok(Self {
            tx: colx.t,
            ty: coly.t,
            kx: opts.kx,
            ky: opts.ky,
            c,
            fp,
        })
    }

    /// Knot vectors along x and y
    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.tx, &self.ty)
    }

    pub fn degrees(&self) -> (usize, usize) {
        (self.kx, self.ky)
    }

    /// Residual sum of squares at the grid points
    pub fn residual(&self) -> f64 {
        self.fp
    }

    /// Evaluate the surface at a single point.
    pub fn eval_one(&self, p: [f64; 2]) -> f64 {
        let (kx, ky) = (self.kx, self.ky);
        let ncy = self.ty.len() - ky - 1;

        let lx = find_interval(&self.tx, kx, p[0]);
        let ly = find_interval(&self.ty, ky, p[1]);
        let mut bx = [0.0; MAXDEG + 1];
        let mut by = [0.0; MAXDEG + 1];
        basis_funs(&self.tx, kx, lx, p[0], &mut bx);
        basis_funs(&self.ty, ky, ly, p[1], &mut by);

        let mut v = 0.0;
        for (i, bxi) in bx[..=kx].iter().enumerate() {
            let row = (lx - kx + i) * ncy;
            for (j, byj) in by[..=ky].iter().enumerate() {
                v += bxi * byj * self.c[row + ly - ky + j];
            }
        }
        v
    }

    /// Evaluate the surface at scattered points, one at a time.
    pub fn eval(&self, points: &[[f64; 2]]) -> Vec<f64> {
        points.iter().map(|&p| self.eval_one(p)).collect()
    }
}
