//! Radial basis function networks for scattered 2D data.
//!
//! The interpolant is a weighted sum of one radial function per data point,
//! `f(p) = sum_j w_j phi(|p - c_j|)`, with the data points as centers. The
//! weights solve `G w = z` for the matrix `G[i, j] = phi(|c_i - c_j|)`.
use log::debug;
use nalgebra::{DMatrix, DVector};

use crate::{Error, Result};

/// Radial function shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kernel {
    /// `sqrt(r^2 + p^2)`
    Multiquadric,
    /// `exp(-r^2 / (2 p^2))`
    Gauss,
}

impl Kernel {
    /// Kernel value at squared distance `rsq` with shape parameter `p`
    #[inline]
    pub fn eval(&self, rsq: f64, p: f64) -> f64 {
        match self {
            Kernel::Multiquadric => (rsq + p * p).sqrt(),
            Kernel::Gauss => (-0.5 * rsq / (p * p)).exp(),
        }
    }
}

/// Choice of the kernel shape parameter.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum RbfParam {
    /// Mean distance between all pairs of centers
    #[default]
    Estimate,
    Fixed(f64),
}

/// Method for solving for the weights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Train {
    /// Direct LU solve
    #[default]
    Linalg,
    /// Least-squares solve through the SVD, for (nearly) singular systems
    Lstsq,
}

/// Options for RBF networks.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct RbfOptions {
    pub param: RbfParam,
    pub train: Train,
    /// Singular values below `rcond` times the largest are treated as zero
    /// by [`Train::Lstsq`]. Defaults to machine precision times the number
    /// of centers.
    pub rcond: Option<f64>,
}

impl RbfOptions {
    pub fn param(mut self, param: RbfParam) -> Self {
        self.param = param;
        self
    }

    pub fn train(mut self, train: Train) -> Self {
        self.train = train;
        self
    }

    pub fn rcond(mut self, rcond: f64) -> Self {
        self.rcond = Some(rcond);
        self
    }
}

/// A trained RBF network.
#[derive(Clone, Debug)]
pub struct Rbf {
    kernel: Kernel,
    centers: Vec<[f64; 2]>,
    weights: Vec<f64>,
    param: f64,
}

#[inline]
fn dist_sq(a: [f64; 2], b: [f64; 2]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

/// Mean of the distances between all ordered pairs of centers,
/// including each center with itself.
pub fn estimate_param(centers: &[[f64; 2]]) -> f64 {
    let n = centers.len();
    let total: f64 = centers
        .iter()
        .map(|&a| centers.iter().map(|&b| dist_sq(a, b).sqrt()).sum::<f64>())
        .sum();
    total / (n * n) as f64
}

impl Rbf {
    /// Train a network with centers at the data points.
    ///
    /// # Errors
    /// * If `points` and `values` differ in length or are empty
    /// * If the shape parameter is not positive and finite
    /// * If the system cannot be solved
    pub fn new(points: &[[f64; 2]], values: &[f64], kernel: Kernel, opts: RbfOptions) -> Result<Self> {
        let n = points.len();
        if n != values.len() {
            return Err(Error::invalid(format!(
                "got {n} points but {} values",
                values.len()
            )));
        }
        if n == 0 {
            return Err(Error::invalid("no data points"));
        }

        let param = match opts.param {
            RbfParam::Estimate => estimate_param(points),
            RbfParam::Fixed(p) => p,
        };
        if !(param > 0.0 && param.is_finite()) {
            return Err(Error::invalid(format!(
                "kernel parameter must be positive and finite, got {param}"
            )));
        }

        let g = DMatrix::from_fn(n, n, |i, j| kernel.eval(dist_sq(points[i], points[j]), param));
        let z = DVector::from_column_slice(values);

        let w = match opts.train {
            Train::Linalg => g.lu().solve(&z),
            Train::Lstsq => {
                let svd = g.svd(true, true);
                let smax = svd.singular_values.max();
                let rcond = opts.rcond.unwrap_or(f64::EPSILON * n as f64);
                svd.solve(&z, rcond * smax).ok()
            }
        }
        .filter(|w| w.iter().all(|v| v.is_finite()))
        .ok_or_else(|| Error::invalid("singular RBF system, try Train::Lstsq"))?;

        debug!(
            "trained {kernel:?} RBF network: {n} centers, param={param:e}, train={:?}",
            opts.train
        );

        Ok(Self {
            kernel,
            centers: points.to_vec(),
            weights: w.as_slice().to_vec(),
            param,
        })
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Kernel shape parameter in use
    pub fn param(&self) -> f64 {
        self.param
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Evaluate at a single point.
    #[inline]
    pub fn eval_one(&self, p: [f64; 2]) -> f64 {
        self.centers
            .iter()
            .zip(&self.weights)
            .map(|(&c, w)| w * self.kernel.eval(dist_sq(p, c), self.param))
            .sum()
    }

    /// Evaluate at a batch of points.
    pub fn eval(&self, points: &[[f64; 2]]) -> Vec<f64> {
        points.iter().map(|&p| self.eval_one(p)).collect()
    }
}
