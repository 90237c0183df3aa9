//! Convenience methods for constructing grids in a way that echoes,
//! but does not exactly match, methods common in scripting languages.
use itertools::Itertools;
use num_traits::Float;

/// Generates evenly spaced values from start to stop,
/// including the endpoint.
pub fn linspace<T>(start: T, stop: T, n: usize) -> Vec<T>
where
    T: Float,
{
    if n < 2 {
        return vec![start; n];
    }
    let dx: T = (stop - start) / T::from(n - 1).unwrap_or_else(T::one);
    (0..n)
        .map(|i| start + T::from(i).unwrap_or_else(T::zero) * dx)
        .collect()
}

/// Generates a meshgrid in C ordering (x0, y0, z0, x0, y0, z1, ..., x0, yn, zn)
pub fn meshgrid<T>(x: Vec<&Vec<T>>) -> Vec<Vec<T>>
where
    T: Float,
{
    x.into_iter()
        .multi_cartesian_product()
        .map(|xx| xx.iter().map(|y| **y).collect())
        .collect()
}

/// Generates `n` evenly spaced points (vectors) on the segment from `a` to `b`.
///
/// With `endpoint`, the last point is `b`; otherwise the segment is divided
/// into `n` steps and `b` itself is left out.
///
/// # Panics
/// Panics if `a` and `b` have different lengths.
pub fn vlinspace<T>(a: &[T], b: &[T], n: usize, endpoint: bool) -> Vec<Vec<T>>
where
    T: Float,
{
    assert_eq!(a.len(), b.len(), "`a` and `b` must have equal length");
    let steps = match (endpoint, n) {
        (true, 0 | 1) => T::one(),
        (true, _) => T::from(n - 1).unwrap_or_else(T::one),
        (false, _) => T::from(n.max(1)).unwrap_or_else(T::one),
    };
    (0..n)
        .map(|i| {
            let f = T::from(i).unwrap_or_else(T::zero) / steps;
            a.iter().zip(b).map(|(&ai, &bi)| ai + (bi - ai) * f).collect()
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0_f64, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0_f64, 3.0, 1), vec![2.0]);
        assert!(linspace(2.0_f64, 3.0, 0).is_empty());
    }

    #[test]
    fn test_meshgrid_c_order() {
        let x = vec![0.0, 1.0];
        let y = vec![5.0, 6.0, 7.0];
        let grid = meshgrid(vec![&x, &y]);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0], vec![0.0, 5.0]);
        assert_eq!(grid[1], vec![0.0, 6.0]);
        assert_eq!(grid[3], vec![1.0, 5.0]);
    }

    #[test]
    fn test_vlinspace() {
        let a = [0.0, 0.0];
        let b = [2.0, 4.0];
        let pts = vlinspace(&a, &b, 3, true);
        assert_eq!(pts, vec![vec![0.0, 0.0], vec![1.0, 2.0], vec![2.0, 4.0]]);

        let pts = vlinspace(&a, &b, 4, false);
        assert_eq!(pts[3], vec![1.5, 3.0]);

        let pts = vlinspace(&a, &b, 1, true);
        assert_eq!(pts, vec![vec![0.0, 0.0]]);
    }
}
