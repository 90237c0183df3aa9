//! Piecewise cubic, C1 continuous Clough-Tocher interpolation on a Delaunay
//! triangulation of scattered points.
//!
//! Each triangle is split at its centroid into three cubic Bezier patches.
//! The patches match the data values and the estimated gradients at the
//! vertices, and join with continuous first derivatives inside the triangle
//! and across triangle edges.
//!
//! Vertex gradients are estimated globally, by minimizing the approximate
//! curvature of the interpolant along all triangle edges with Gauss-Seidel
//! sweeps (Nielson 1983; Renka and Cline 1984).
//!
//! Outside the convex hull of the data, evaluation returns the fill value.
use log::{debug, trace, warn};

use super::delaunay::Triangulation;
use crate::{Error, Result};

/// Options for the Clough-Tocher interpolant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CtOptions {
    /// Convergence tolerance of the gradient estimation, absolute or
    /// relative to the gradient magnitude
    pub tol: f64,
    /// Maximum Gauss-Seidel sweeps of the gradient estimation
    pub maxiter: usize,
    /// Value returned outside the convex hull of the data
    pub fill_value: f64,
}

impl Default for CtOptions {
    fn default() -> Self {
        Self {
            tol: 1e-6,
            maxiter: 400,
            fill_value: f64::NAN,
        }
    }
}

impl CtOptions {
    pub fn tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = maxiter;
        self
    }

    pub fn fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }
}

/// Clough-Tocher interpolant over scattered 2D data.
#[derive(Clone, Debug)]
pub struct CloughTocher {
    tri: Triangulation,
    values: Vec<f64>,
    grads: Vec<[f64; 2]>,
    fill_value: f64,
}

impl CloughTocher {
    /// Triangulate the points and estimate gradients at the vertices.
    ///
    /// # Errors
    /// * If `points` and `values` differ in length
    /// * If the points cannot be triangulated (too few, non-finite, collinear)
    pub fn new(points: &[[f64; 2]], values: &[f64], opts: CtOptions) -> Result<Self> {
        if points.len() != values.len() {
            return Err(Error::invalid(format!(
                "got {} points but {} values",
                points.len(),
                values.len()
            )));
        }
        let tri = Triangulation::new(points)?;
        let grads = estimate_gradients(&tri, values, opts.tol, opts.maxiter);

        Ok(Self {
            tri,
            values: values.to_vec(),
            grads,
            fill_value: opts.fill_value,
        })
    }

    pub fn triangulation(&self) -> &Triangulation {
        &self.tri
    }

    /// Estimated gradient `[df/dx, df/dy]` at each data point
    pub fn gradients(&self) -> &[[f64; 2]] {
        &self.grads
    }

    /// Evaluate at a single point.
    pub fn eval_one(&self, p: [f64; 2]) -> f64 {
        self.eval_from(p, 0).0
    }

    /// Evaluate at a batch of points, starting each point location
    /// from the triangle of the previous point.
    pub fn eval(&self, points: &[[f64; 2]]) -> Vec<f64> {
        let mut start = 0;
        points
            .iter()
            .map(|&p| {
                let (v, t) = self.eval_from(p, start);
                start = t;
                v
            })
            .collect()
    }

    fn eval_from(&self, p: [f64; 2], start: usize) -> (f64, usize) {
        match self.tri.find_simplex(p, start) {
            Some(t) => {
                let b = self.tri.barycentric(t, p);
                (self.eval_in(t, b), t)
            }
            None => (self.fill_value, start),
        }
    }

    /// Evaluate the interpolant in triangle `t` at barycentric coordinates `b`.
    fn eval_in(&self, t: usize, b: [f64; 3]) -> f64 {
        let s = self.tri.simplices()[t];
        let [p1, p2, p3] = self.tri.vertices(t);
        let (f1, f2, f3) = (self.values[s[0]], self.values[s[1]], self.values[s[2]]);
        let (g1, g2, g3) = (self.grads[s[0]], self.grads[s[1]], self.grads[s[2]]);

        let e12 = [p2[0] - p1[0], p2[1] - p1[1]];
        let e23 = [p3[0] - p2[0], p3[1] - p2[1]];
        let e31 = [p1[0] - p3[0], p1[1] - p3[1]];
        let dot = |g: [f64; 2], e: [f64; 2]| g[0] * e[0] + g[1] * e[1];

        // Directional derivatives at each vertex along its two edges
        let df12 = dot(g1, e12);
        let df21 = -dot(g2, e12);
        let df23 = dot(g2, e23);
        let df32 = -dot(g3, e23);
        let df31 = dot(g3, e31);
        let df13 = -dot(g1, e31);

        // Bezier ordinates; index digits are the powers of (b1, b2, b3, b4)
        // with b4 the centroid coordinate
        let c3000 = f1;
        let c2100 = (df12 + 3.0 * c3000) / 3.0;
        let c2010 = (df13 + 3.0 * c3000) / 3.0;
        let c0300 = f2;
        let c1200 = (df21 + 3.0 * c0300) / 3.0;
        let c0210 = (df23 + 3.0 * c0300) / 3.0;
        let c0030 = f3;
        let c1020 = (df31 + 3.0 * c0030) / 3.0;
        let c0120 = (df32 + 3.0 * c0030) / 3.0;

        let c2001 = (c2100 + c2010 + c3000) / 3.0;
        let c0201 = (c1200 + c0300 + c0210) / 3.0;
        let c0021 = (c1020 + c0120 + c0030) / 3.0;

        // Cross-edge derivative directions, chosen from the centroids of
        // neighboring triangles so that neighbors agree and the result is
        // affine invariant
        let mut g = [-0.5; 3];
        for (k, gk) in g.iter_mut().enumerate() {
            let Some(u) = self.tri.neighbors()[t][k] else {
                continue;
            };
            let [q1, q2, q3] = self.tri.vertices(u);
            let centroid = [(q1[0] + q2[0] + q3[0]) / 3.0, (q1[1] + q2[1] + q3[1]) / 3.0];
            let c = self.tri.barycentric(t, centroid);
            *gk = match k {
                0 => (2.0 * c[2] + c[1] - 1.0) / (2.0 - 3.0 * c[2] - 3.0 * c[1]),
                1 => (2.0 * c[0] + c[2] - 1.0) / (2.0 - 3.0 * c[0] - 3.0 * c[2]),
                _ => (2.0 * c[1] + c[0] - 1.0) / (2.0 - 3.0 * c[1] - 3.0 * c[0]),
            };
        }

        let c0111 = (g[0] * (-c0300 + 3.0 * c0210 - 3.0 * c0120 + c0030)
            + (-c0300 + 2.0 * c0210 - c0120 + c0021 + c0201))
            / 2.0;
        let c1011 = (g[1] * (-c0030 + 3.0 * c1020 - 3.0 * c2010 + c3000)
            + (-c0030 + 2.0 * c1020 - c2010 + c2001 + c0021))
            / 2.0;
        let c1101 = (g[2] * (-c3000 + 3.0 * c2100 - 3.0 * c1200 + c0300)
            + (-c3000 + 2.0 * c2100 - c1200 + c2001 + c0201))
            / 2.0;

        let c1002 = (c1101 + c1011 + c2001) / 3.0;
        let c0102 = (c1101 + c0111 + c0201) / 3.0;
        let c0012 = (c1011 + c0111 + c0021) / 3.0;
        let c0003 = (c1002 + c0102 + c0012) / 3.0;

        // Coordinates in the sub-triangle holding the point;
        // one of b1, b2, b3 is zero
        let minval = b[0].min(b[1]).min(b[2]);
        let b1 = b[0] - minval;
        let b2 = b[1] - minval;
        let b3 = b[2] - minval;
        let b4 = 3.0 * minval;

        b1.powi(3) * c3000
            + 3.0 * b1 * b1 * b2 * c2100
            + 3.0 * b1 * b1 * b3 * c2010
            + 3.0 * b1 * b1 * b4 * c2001
            + 3.0 * b1 * b2 * b2 * c1200
            + 6.0 * b1 * b2 * b4 * c1101
            + 3.0 * b1 * b3 * b3 * c1020
            + 6.0 * b1 * b3 * b4 * c1011
            + 3.0 * b1 * b4 * b4 * c1002
            + b2.powi(3) * c0300
            + 3.0 * b2 * b2 * b3 * c0210
            + 3.0 * b2 * b2 * b4 * c0201
            + 3.0 * b2 * b3 * b3 * c0120
            + 6.0 * b2 * b3 * b4 * c0111
            + 3.0 * b2 * b4 * b4 * c0102
            + b3.powi(3) * c0030
            + 3.0 * b3 * b3 * b4 * c0021
            + 3.0 * b3 * b4 * b4 * c0012
            + b4.powi(3) * c0003
    }
}

/// Estimate gradients at the vertices of a triangulation by minimizing
/// the second derivative of the edge-wise cubic interpolant, integrated
/// along every edge.
///
/// Each vertex minimizes its own share of the total given the current
/// gradients of its neighbors, which is a 2x2 linear solve; sweeps repeat
/// until the largest change falls below `tol`.
fn estimate_gradients(tri: &Triangulation, values: &[f64], tol: f64, maxiter: usize) -> Vec<[f64; 2]> {
    let pts = tri.points();
    let nbrs = tri.vertex_neighbors();
    let mut grads = vec![[0.0; 2]; pts.len()];

    for iter in 0..maxiter {
        let mut err: f64 = 0.0;
        for (i, adj) in nbrs.iter().enumerate() {
            let mut q = [0.0; 3];
            let mut s = [0.0; 2];
            for &j in adj {
                let ex = pts[j][0] - pts[i][0];
                let ey = pts[j][1] - pts[i][1];
                let l3 = (ex * ex + ey * ey).sqrt().powi(3);

                // Derivative at the far vertex, along the edge towards i
                let df2 = -ex * grads[j][0] - ey * grads[j][1];
                let w = 6.0 * (values[i] - values[j]) - 2.0 * df2;

                q[0] += 4.0 * ex * ex / l3;
                q[1] += 4.0 * ex * ey / l3;
                q[2] += 4.0 * ey * ey / l3;
                s[0] += w * ex / l3;
                s[1] += w * ey / l3;
            }

            let det = q[0] * q[2] - q[1] * q[1];
            if det == 0.0 || !det.is_finite() {
                continue;
            }
            let r = [
                (q[2] * s[0] - q[1] * s[1]) / det,
                (-q[1] * s[0] + q[0] * s[1]) / det,
            ];

            let change = (grads[i][0] + r[0]).abs().max((grads[i][1] + r[1]).abs());
            grads[i] = [-r[0], -r[1]];
            err = err.max(change / r[0].abs().max(r[1].abs()).max(1.0));
        }

        trace!("gradient estimation sweep {iter}: change {err:e}");
        if err < tol {
            debug!("gradient estimation converged after {} sweeps", iter + 1);
            return grads;
        }
    }

    warn!("gradient estimation did not converge in {maxiter} sweeps, results may be inaccurate");
    grads
}
