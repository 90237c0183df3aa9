//! Incremental (Bowyer-Watson) Delaunay triangulation of 2D points.
//!
//! Points are inserted one at a time. Each insertion removes the connected
//! set of triangles whose circumcircle contains the new point and
//! re-triangulates the resulting cavity as a fan around it.
//!
//! The exterior is covered by ghost triangles, one per convex hull edge,
//! that share a symbolic vertex at infinity. A ghost triangle conflicts with
//! a point strictly outside its hull edge, so points beyond the current hull
//! extend it and the result always covers the convex hull of the input.
//! Ghosts are dropped at the end. Cost is quadratic in the number of points.
//!
//! All triangles are stored counter-clockwise. `neighbors[t][j]` is the
//! triangle across the edge opposite vertex `j` of triangle `t`, if any.
use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::{Error, Result};

/// Relative tolerance of the in-circle test. Points (nearly) on a
/// circumcircle count as outside.
const INCIRCLE_EPS: f64 = 1e-12;
/// Tolerance on barycentric coordinates for point location
const BARY_EPS: f64 = 100.0 * f64::EPSILON;
/// Looser tolerance used by the exhaustive search fallback
const BARY_EPS_BROAD: f64 = 1.5e-8;
/// Relative area below which the input counts as collinear
const COLLINEAR_EPS: f64 = 1e-12;

/// A triangulation of a set of points.
#[derive(Clone, Debug)]
pub struct Triangulation {
    points: Vec<[f64; 2]>,
    simplices: Vec<[usize; 3]>,
    neighbors: Vec<[Option<usize>; 3]>,
}

#[inline]
fn orient(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive if `d` is strictly inside the circumcircle of the
/// counter-clockwise triangle `abc`, beyond roundoff.
#[inline]
fn in_circle(a: [f64; 2], b: [f64; 2], c: [f64; 2], d: [f64; 2]) -> bool {
    let (adx, ady) = (a[0] - d[0], a[1] - d[1]);
    let (bdx, bdy) = (b[0] - d[0], b[1] - d[1]);
    let (cdx, cdy) = (c[0] - d[0], c[1] - d[1]);

    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;

    let det = alift * (bdx * cdy - cdx * bdy)
        + blift * (cdx * ady - adx * cdy)
        + clift * (adx * bdy - bdx * ady);
    let permanent = alift * ((bdx * cdy).abs() + (cdx * bdy).abs())
        + blift * ((cdx * ady).abs() + (adx * cdy).abs())
        + clift * ((adx * bdy).abs() + (bdx * ady).abs());

    det > INCIRCLE_EPS * permanent
}

/// Directed edges of a triangle, each paired with the vertex slot it is opposite to
#[inline]
fn edges(tri: &[usize; 3]) -> [(usize, usize); 3] {
    [(tri[1], tri[2]), (tri[2], tri[0]), (tri[0], tri[1])]
}

impl Triangulation {
    /// Triangulate `points`.
    ///
    /// Exact duplicates of an earlier point are left out of the triangulation.
    ///
    /// # Errors
    /// * If there are fewer than 3 points, non-finite coordinates,
    ///   or all points are collinear
    pub fn new(points: &[[f64; 2]]) -> Result<Self> {
        let n = points.len();
        if n < 3 {
            return Err(Error::invalid(format!(
                "need at least 3 points to triangulate, got {n}"
            )));
        }
        if points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::invalid("point coordinates must be finite"));
        }

        let Some([i0, i1, i2]) = initial_triangle(points) else {
            return Err(Error::invalid(
                "degenerate point set, all points are collinear",
            ));
        };

        // Index `n` is the vertex at infinity
        let ghost = n;
        let mut pts = points.to_vec();
        pts.push([f64::NAN; 2]);
        let mut tris: Vec<[usize; 3]> = vec![
            [i0, i1, i2],
            [i1, i0, ghost],
            [i2, i1, ghost],
            [i0, i2, ghost],
        ];

        let mut skipped = 0;
        for i in (0..n).filter(|i| ![i0, i1, i2].contains(i)) {
            if !insert(&pts, &mut tris, i, ghost) {
                skipped += 1;
            }
        }

        tris.retain(|t| !t.contains(&ghost));
        pts.truncate(n);

        let neighbors = build_neighbors(&tris);
        debug!(
            "triangulated {n} points into {} triangles ({skipped} duplicates skipped)",
            tris.len()
        );

        Ok(Self {
            points: pts,
            simplices: tris,
            neighbors,
        })
    }

    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// Vertex indices of each triangle, counter-clockwise
    pub fn simplices(&self) -> &[[usize; 3]] {
        &self.simplices
    }

    /// Triangle opposite each vertex of each triangle
    pub fn neighbors(&self) -> &[[Option<usize>; 3]] {
        &self.neighbors
    }

    /// Vertex coordinates of triangle `t`
    #[inline]
    pub fn vertices(&self, t: usize) -> [[f64; 2]; 3] {
        let s = &self.simplices[t];
        [self.points[s[0]], self.points[s[1]], self.points[s[2]]]
    }

    /// Barycentric coordinates of `p` with respect to triangle `t`
    #[inline]
    pub fn barycentric(&self, t: usize, p: [f64; 2]) -> [f64; 3] {
        let [a, b, c] = self.vertices(t);
        let det = orient(a, b, c);
        let b1 = orient(p, b, c) / det;
        let b2 = orient(a, p, c) / det;
        [b1, b2, 1.0 - b1 - b2]
    }

    /// Unique neighbor vertices of each vertex, along triangle edges
    pub fn vertex_neighbors(&self) -> Vec<Vec<usize>> {
        let mut sets: Vec<HashSet<usize>> = vec![HashSet::new(); self.points.len()];
        for tri in &self.simplices {
            for (a, b) in edges(tri) {
                sets[a].insert(b);
                sets[b].insert(a);
            }
        }
        sets.into_iter()
            .map(|s| {
                let mut v: Vec<usize> = s.into_iter().collect();
                v.sort_unstable();
                v
            })
            .collect()
    }

    /// Triangle containing `p`, or `None` outside the triangulation.
    ///
    /// Walks across neighbors starting from triangle `start`, then falls back
    /// on checking every triangle.
    pub fn find_simplex(&self, p: [f64; 2], start: usize) -> Option<usize> {
        let ntri = self.simplices.len();
        let mut t = start.min(ntri - 1);
        for _ in 0..ntri {
            let bary = self.barycentric(t, p);
            if !bary.iter().all(|v| v.is_finite()) {
                break;
            }
            // Step towards the most negative coordinate
            let (j, bmin) = bary
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::INFINITY), |acc, (j, b)| if b < acc.1 { (j, b) } else { acc });
            if bmin >= -BARY_EPS {
                return Some(t);
            }
            match self.neighbors[t][j] {
                Some(next) => t = next,
                None => break,
            }
        }

        (0..ntri).find(|&t| {
            self.barycentric(t, p)
                .iter()
                .all(|&b| b >= -BARY_EPS_BROAD && b <= 1.0 + BARY_EPS_BROAD)
        })
    }
}

/// Seed triangle of the triangulation: the first point, the point farthest
/// from it, and the point farthest from the line through both.
fn initial_triangle(points: &[[f64; 2]]) -> Option<[usize; 3]> {
    let p0 = points[0];
    let dist = |p: &[f64; 2]| (p[0] - p0[0]).powi(2) + (p[1] - p0[1]).powi(2);
    let i1 = (1..points.len()).max_by(|&a, &b| dist(&points[a]).total_cmp(&dist(&points[b])))?;
    let d = dist(&points[i1]);
    if d == 0.0 {
        return None;
    }

    let area = |i: usize| orient(p0, points[i1], points[i]);
    let i2 = (1..points.len()).max_by(|&a, &b| area(a).abs().total_cmp(&area(b).abs()))?;
    if area(i2).abs() <= COLLINEAR_EPS * d {
        return None;
    }
    Some(if area(i2) > 0.0 {
        [0, i1, i2]
    } else {
        [0, i2, i1]
    })
}

/// Whether `p` lies strictly between `u` and `v` on the line through them
#[inline]
fn between(u: [f64; 2], v: [f64; 2], p: [f64; 2]) -> bool {
    let along_u = (p[0] - u[0]) * (v[0] - u[0]) + (p[1] - u[1]) * (v[1] - u[1]);
    let along_v = (p[0] - v[0]) * (u[0] - v[0]) + (p[1] - v[1]) * (u[1] - v[1]);
    along_u > 0.0 && along_v > 0.0
}

/// Whether inserting `p` destroys triangle `tri`.
///
/// For a ghost triangle the circumcircle degenerates to the open half-plane
/// beyond its hull edge, plus the open edge itself.
fn conflicts(pts: &[[f64; 2]], tri: &[usize; 3], ghost: usize, p: [f64; 2]) -> bool {
    match tri.iter().position(|&v| v == ghost) {
        None => in_circle(pts[tri[0]], pts[tri[1]], pts[tri[2]], p),
        Some(j) => {
            let (u, v) = (pts[tri[(j + 1) % 3]], pts[tri[(j + 2) % 3]]);
            let o = orient(u, v, p);
            o > 0.0 || (o == 0.0 && between(u, v, p))
        }
    }
}

/// Insert point `i` into the triangulation. Returns false if the point
/// duplicates an existing vertex and was skipped.
fn insert(pts: &[[f64; 2]], tris: &mut Vec<[usize; 3]>, i: usize, ghost: usize) -> bool {
    let p = pts[i];

    let containing = tris.iter().position(|t| {
        !t.contains(&ghost)
            && edges(t)
                .iter()
                .all(|&(a, b)| orient(pts[a], pts[b], p) >= 0.0)
    });
    if let Some(t) = containing {
        if tris[t].iter().any(|&v| pts[v] == p) {
            return false;
        }
        return insert_into(pts, tris, i, ghost, t);
    }

    // Outside the hull: start from every hull edge that sees the point
    let visible: Vec<usize> = (0..tris.len())
        .filter(|&t| tris[t].contains(&ghost) && conflicts(pts, &tris[t], ghost, p))
        .collect();
    if !visible.is_empty() {
        return grow_cavity(pts, tris, i, ghost, visible);
    }

    // Roundoff placed the point outside every triangle yet behind every hull
    // edge; take the triangle it is least outside of
    insert_nearest(pts, tris, i, ghost)
}

fn insert_nearest(pts: &[[f64; 2]], tris: &mut Vec<[usize; 3]>, i: usize, ghost: usize) -> bool {
    let p = pts[i];
    let score = |t: &[usize; 3]| {
        edges(t)
            .iter()
            .map(|&(a, b)| orient(pts[a], pts[b], p))
            .fold(f64::INFINITY, f64::min)
    };
    let best = (0..tris.len())
        .filter(|&t| !tris[t].contains(&ghost))
        .max_by(|&x, &y| score(&tris[x]).total_cmp(&score(&tris[y])));
    match best {
        Some(t) if !tris[t].iter().any(|&v| pts[v] == p) => insert_into(pts, tris, i, ghost, t),
        _ => false,
    }
}

/// Insert point `i`, known to lie in (or on the edge of) triangle `containing`
fn insert_into(
    pts: &[[f64; 2]],
    tris: &mut Vec<[usize; 3]>,
    i: usize,
    ghost: usize,
    containing: usize,
) -> bool {
    let p = pts[i];
    // Seed with the containing triangle, and any triangle across an edge
    // the point lies on
    let mut seeds = vec![containing];
    for (a, b) in edges(&tris[containing]) {
        if orient(pts[a], pts[b], p) <= 0.0 {
            if let Some(t) = tris.iter().position(|u| edges(u).contains(&(b, a))) {
                seeds.push(t);
            }
        }
    }
    grow_cavity(pts, tris, i, ghost, seeds)
}

fn grow_cavity(
    pts: &[[f64; 2]],
    tris: &mut Vec<[usize; 3]>,
    i: usize,
    ghost: usize,
    seeds: Vec<usize>,
) -> bool {
    let p = pts[i];
    let owner: HashMap<(usize, usize), usize> = tris
        .iter()
        .enumerate()
        .flat_map(|(t, tri)| edges(tri).into_iter().map(move |e| (e, t)))
        .collect();

    // Grow the cavity across edges into triangles in conflict with p
    let mut cavity: HashSet<usize> = seeds.iter().copied().collect();
    let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
    while let Some(t) = queue.pop_front() {
        for (a, b) in edges(&tris[t]) {
            if let Some(&u) = owner.get(&(b, a)) {
                if !cavity.contains(&u) && conflicts(pts, &tris[u], ghost, p) {
                    cavity.insert(u);
                    queue.push_back(u);
                }
            }
        }
    }

    // Edges to the vertex at infinity always give a valid ghost in the fan
    let faces_p = |a: usize, b: usize| a == ghost || b == ghost || orient(pts[a], pts[b], p) > 0.0;

    // Shrink until every finite boundary edge sees p on its inner side,
    // so the fan triangles are all counter-clockwise
    let boundary = loop {
        let boundary: Vec<(usize, usize, usize)> = cavity
            .iter()
            .flat_map(|&t| edges(&tris[t]).into_iter().map(move |(a, b)| (a, b, t)))
            .filter(|&(a, b, _)| owner.get(&(b, a)).map_or(true, |u| !cavity.contains(u)))
            .collect();
        let bad: Vec<usize> = boundary
            .iter()
            .filter(|&&(a, b, t)| !faces_p(a, b) && !seeds.contains(&t))
            .map(|&(_, _, t)| t)
            .collect();
        if bad.is_empty() {
            break boundary;
        }
        for t in bad {
            cavity.remove(&t);
        }
        cavity = connected(&cavity, &seeds, tris, &owner);
    };

    let mut kept: Vec<[usize; 3]> = tris
        .iter()
        .enumerate()
        .filter(|(t, _)| !cavity.contains(t))
        .map(|(_, tri)| *tri)
        .collect();
    kept.extend(
        boundary
            .into_iter()
            .filter(|&(a, b, _)| faces_p(a, b))
            .map(|(a, b, _)| [a, b, i]),
    );
    *tris = kept;
    true
}

/// Triangles of `cavity` reachable from the seeds across shared edges
fn connected(
    cavity: &HashSet<usize>,
    seeds: &[usize],
    tris: &[[usize; 3]],
    owner: &HashMap<(usize, usize), usize>,
) -> HashSet<usize> {
    let mut seen: HashSet<usize> = seeds.iter().copied().collect();
    let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
    while let Some(t) = queue.pop_front() {
        for (a, b) in edges(&tris[t]) {
            if let Some(&u) = owner.get(&(b, a)) {
                if cavity.contains(&u) && seen.insert(u) {
                    queue.push_back(u);
                }
            }
        }
    }
    seen
}

fn build_neighbors(tris: &[[usize; 3]]) -> Vec<[Option<usize>; 3]> {
    let owner: HashMap<(usize, usize), usize> = tris
        .iter()
        .enumerate()
        .flat_map(|(t, tri)| edges(tri).into_iter().map(move |e| (e, t)))
        .collect();
    tris.iter()
        .map(|tri| {
            let mut nb = [None; 3];
            for (j, (a, b)) in edges(tri).into_iter().enumerate() {
                nb[j] = owner.get(&(b, a)).copied();
            }
            nb
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{randn, rng_fixed_seed};
    use crate::utils::{linspace, meshgrid};
    use approx::assert_abs_diff_eq;

    fn area(tri: &Triangulation) -> f64 {
        (0..tri.simplices().len())
            .map(|t| {
                let [a, b, c] = tri.vertices(t);
                orient(a, b, c) / 2.0
            })
            .sum()
    }

    /// Area of the convex hull, by monotone chain
    fn hull_area(points: &[[f64; 2]]) -> f64 {
        let mut pts = points.to_vec();
        pts.sort_by(|a, b| a[0].total_cmp(&b[0]).then(a[1].total_cmp(&b[1])));
        let mut hull: Vec<[f64; 2]> = Vec::new();
        for pass in [pts.clone(), pts.iter().rev().copied().collect()] {
            let start = hull.len();
            for p in pass {
                while hull.len() >= start + 2
                    && orient(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
                {
                    hull.pop();
                }
                hull.push(p);
            }
            hull.pop();
        }
        (0..hull.len())
            .map(|i| {
                let (a, b) = (hull[i], hull[(i + 1) % hull.len()]);
                (a[0] * b[1] - b[0] * a[1]) / 2.0
            })
            .sum()
    }

    fn assert_delaunay(tri: &Triangulation) {
        for t in 0..tri.simplices().len() {
            let [a, b, c] = tri.vertices(t);
            assert!(orient(a, b, c) > 0.0, "triangle {t} is not counter-clockwise");
            for (v, p) in tri.points().iter().enumerate() {
                if tri.simplices()[t].contains(&v) {
                    continue;
                }
                assert!(!in_circle(a, b, c, *p), "point {v} inside circumcircle of {t}");
            }
        }
    }

    #[test]
    fn test_square() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        let tri = Triangulation::new(&pts).unwrap();
        assert_eq!(tri.simplices().len(), 2);
        assert_abs_diff_eq!(area(&tri), 1.0, epsilon = 1e-12);
        // The two triangles are each other's only neighbor
        let nb: usize = tri.neighbors().iter().flatten().filter(|n| n.is_some()).count();
        assert_eq!(nb, 2);
    }

    #[test]
    fn test_regular_grid() {
        let x = linspace(-5.0_f64, 5.0, 12);
        let pts: Vec<[f64; 2]> = meshgrid(vec![&x, &x]).iter().map(|p| [p[0], p[1]]).collect();
        let tri = Triangulation::new(&pts).unwrap();
        // Every grid cell is split in two
        assert_eq!(tri.simplices().len(), 2 * 11 * 11);
        assert_abs_diff_eq!(area(&tri), 100.0, epsilon = 1e-9);
        assert_delaunay(&tri);
    }

    #[test]
    fn test_random_points() {
        let mut rng = rng_fixed_seed();
        let n = 200;
        let xs = randn::<f64>(&mut rng, n);
        let ys = randn::<f64>(&mut rng, n);
        let pts: Vec<[f64; 2]> = xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect();
        let tri = Triangulation::new(&pts).unwrap();
        assert_delaunay(&tri);
        assert!(tri.simplices().len() > n && tri.simplices().len() <= 2 * n - 5);

        // Neighbor relations are symmetric
        for (t, nb) in tri.neighbors().iter().enumerate() {
            for u in nb.iter().flatten() {
                assert!(tri.neighbors()[*u].contains(&Some(t)));
            }
        }
    }

    #[test]
    fn test_covers_convex_hull() {
        let mut rng = rng_fixed_seed();
        for _ in 0..20 {
            let xs = randn::<f64>(&mut rng, 300);
            let ys = randn::<f64>(&mut rng, 300);
            let pts: Vec<[f64; 2]> = xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect();
            let tri = Triangulation::new(&pts).unwrap();
            assert_abs_diff_eq!(area(&tri), hull_area(&pts), epsilon = 1e-12);
            // Every point is a vertex of some triangle
            assert!(tri.vertex_neighbors().iter().all(|nb| !nb.is_empty()));
        }
    }

    #[test]
    fn test_thin_hull_triangles() {
        // Points close to a long hull edge give huge circumcircles
        let mut pts: Vec<[f64; 2]> = linspace(0.0_f64, 1.0, 40)
            .into_iter()
            .map(|x| [x, 1e-4 * x * (1.0 - x)])
            .collect();
        pts.push([0.5, -0.5]);
        pts.push([0.3, 1e-3]);
        let tri = Triangulation::new(&pts).unwrap();
        assert_abs_diff_eq!(area(&tri), hull_area(&pts), epsilon = 1e-12);
        for p in [[0.01, 1e-7], [0.99, 1e-7], [0.5, 1e-5]] {
            assert!(tri.find_simplex(p, 0).is_some(), "{p:?} not located");
        }
    }

    #[test]
    fn test_points_outside_initial_hull() {
        // Later points extend the hull in every direction, including
        // collinear with an existing hull edge
        let pts = [
            [0.0, 0.0],
            [1.0, 0.0],
            [0.5, 0.1],
            [2.0, 0.0],
            [-1.0, 0.0],
            [0.0, 3.0],
            [0.5, -2.0],
            [3.0, 3.0],
        ];
        let tri = Triangulation::new(&pts).unwrap();
        assert_abs_diff_eq!(area(&tri), hull_area(&pts), epsilon = 1e-12);
        assert_delaunay(&tri);
        assert!(tri.vertex_neighbors().iter().all(|nb| !nb.is_empty()));
    }

    #[test]
    fn test_find_simplex() {
        let pts = [[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0], [1.0, 1.2]];
        let tri = Triangulation::new(&pts).unwrap();
        for p in [[0.5, 0.2], [1.9, 1.9], [1.0, 1.2], [0.0, 0.0], [1.0, 0.0]] {
            let t = tri.find_simplex(p, 0).unwrap();
            let bary = tri.barycentric(t, p);
            assert!(bary.iter().all(|&b| b >= -1e-12));
            assert_abs_diff_eq!(bary.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        }
        assert!(tri.find_simplex([3.0, 1.0], 0).is_none());
        assert!(tri.find_simplex([-0.1, -0.1], 2).is_none());
    }

    #[test]
    fn test_vertex_neighbors() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let tri = Triangulation::new(&pts).unwrap();
        assert_eq!(tri.vertex_neighbors(), vec![vec![1, 2], vec![0, 2], vec![0, 1]]);
    }

    #[test]
    fn test_duplicates_skipped() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 0.0]];
        let tri = Triangulation::new(&pts).unwrap();
        assert_eq!(tri.simplices().len(), 1);
        assert_eq!(tri.points().len(), 4);
    }

    #[test]
    fn test_degenerate_input() {
        assert!(Triangulation::new(&[[0.0, 0.0], [1.0, 1.0]]).is_err());
        let line = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        assert!(matches!(
            Triangulation::new(&line),
            Err(Error::InvalidInput(_))
        ));
        assert!(Triangulation::new(&[[0.0, 0.0], [1.0, f64::NAN], [0.0, 1.0]]).is_err());
    }
}
