#![allow(clippy::all)] // Clippy will attempt to remove black_box() internals

use criterion::*;
use gridgen::*;
use splinterp::{Interpol2D, Spline, SplineOptions};

fn bench_spline(c: &mut Criterion) {
    for npts in [10, 100, 400] {
        let mut group = c.benchmark_group(format!("Spline1D_{npts}-points"));

        group.bench_function(BenchmarkId::new("Fit cubic, s=0", npts), |b| {
            let (x, y) = gen_curve(npts);
            b.iter(|| black_box(Spline::new(&x, &y, SplineOptions::default()).unwrap()));
        });

        group.bench_function(BenchmarkId::new("Fit cubic, s>0", npts), |b| {
            let (x, y) = gen_curve(npts);
            let opts = SplineOptions::default().s(1e-3 * npts as f64).check_eps(false);
            b.iter(|| black_box(Spline::new(&x, &y, opts).unwrap()));
        });

        for size in [1, 1000].iter() {
            group.throughput(Throughput::Elements(*size as u64));
            group.bench_with_input(BenchmarkId::new("Eval", size), size, |b, &size| {
                let (x, y) = gen_curve(npts);
                let sp = Spline::new(&x, &y, SplineOptions::default()).unwrap();
                let obs = gen_interp_obs(&x, size);
                b.iter(|| black_box(sp.eval(&obs, 0)));
            });
        }
        group.finish();
    }
}

fn bench_interp2d(c: &mut Criterion) {
    for gridsize in [10, 20] {
        let mut group = c.benchmark_group(format!("Interpol2D_{gridsize}x{gridsize}-grid"));
        let samples = gen_grid_samples(gridsize);

        for name in ["rbf_multi", "rbf_gauss", "ct", "bispl"] {
            group.bench_function(BenchmarkId::new(format!("Fit {name}"), gridsize), |b| {
                b.iter(|| black_box(Interpol2D::from_name(&samples, name).unwrap()));
            });

            for size in [1, 1000].iter() {
                group.throughput(Throughput::Elements(*size as u64));
                group.bench_with_input(
                    BenchmarkId::new(format!("Eval {name}, Shuffled Order"), size),
                    size,
                    |b, &size| {
                        let inter = Interpol2D::from_name(&samples, name).unwrap();
                        let obs = gen_scattered_obs(&samples, size);
                        b.iter(|| black_box(inter.eval(&obs).unwrap()));
                    },
                );
            }
        }
        group.finish();
    }
}

criterion_group!(benches_spline, bench_spline);
criterion_group!(benches_interp2d, bench_interp2d);
criterion_main!(benches_spline, benches_interp2d,);

mod randn {
    use rand::distr::StandardUniform;
    use rand::rngs::StdRng;
    use rand::Rng;
    use rand::SeedableRng;

    /// Fixed random seed to support repeatable testing
    const SEED: [u8; 32] = [
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 15, 14, 13, 12, 11, 10, 9, 8, 7,
        6, 5, 4, 3, 2, 1,
    ];

    /// Get a random number generator with a const seed for repeatable testing
    pub fn rng_fixed_seed() -> StdRng {
        StdRng::from_seed(SEED)
    }

    /// Generate `n` random numbers using provided generator
    pub fn randn<T>(rng: &mut StdRng, n: usize) -> Vec<T>
    where
        StandardUniform: rand::distr::Distribution<T>,
    {
        let out: Vec<T> = (0..n).map(|_| rng.random::<T>()).collect();
        out
    }
}

mod gridgen {
    use super::randn::*;
    use rand::seq::SliceRandom;
    use splinterp::utils::*;
    use splinterp::{GridData, Samples2D};

    // Generate a smooth curve with some fake wiggle, sampled on an
    // irregular axis.
    pub fn gen_curve(size: usize) -> (Vec<f64>, Vec<f64>) {
        let mut rng = rng_fixed_seed();
        let mut x = linspace(0.0_f64, 10.0, size);
        let dx = randn::<f64>(&mut rng, size);
        let h = 10.0 / (size as f64);
        (1..size - 1).for_each(|i| x[i] += (dx[i] - 0.5) * 0.5 * h);
        let y = x.iter().map(|v| v.sin() + 0.1 * v * v).collect();
        (x, y)
    }

    // Generate shuffled observation points inside the sampled range.
    pub fn gen_interp_obs(x: &[f64], size: usize) -> Vec<f64> {
        let mut rng = rng_fixed_seed();
        let mut obs = linspace(x[0], x[x.len() - 1], size);
        obs.shuffle(&mut rng);
        obs
    }

    // Generate gridded samples of a smooth surface with some fake data values.
    pub fn gen_grid_samples(size: usize) -> Samples2D {
        let mut rng = rng_fixed_seed();
        let x = linspace(-5.0_f64, 5.0, size);
        let y = linspace(-5.0_f64, 5.0, size);
        let noise = randn::<f64>(&mut rng, size * size);
        let z: Vec<f64> = meshgrid(vec![&x, &y])
            .iter()
            .zip(noise)
            .map(|(p, dz)| (p[0] + 3.0).powi(2) + (p[1] + 4.0).powi(2) + 0.01 * dz)
            .collect();
        GridData::new(&x, &y, &z).unwrap().samples()
    }

    // Generate a set of shuffled observation points that are entirely inside
    // the convex hull of the samples.
    pub fn gen_scattered_obs(samples: &Samples2D, size: usize) -> Vec<[f64; 2]> {
        let mut rng = rng_fixed_seed();
        let (x, y) = samples.axes().unwrap();
        let m = (size as f64).sqrt().ceil() as usize;
        let xobs = linspace(x[1], x[x.len() - 2], m);
        let yobs = linspace(y[1], y[y.len() - 2], m);
        let mut obs: Vec<[f64; 2]> = meshgrid(vec![&xobs, &yobs])
            .iter()
            .map(|p| [p[0], p[1]])
            .collect();
        obs.shuffle(&mut rng);
        obs.truncate(size);
        obs
    }
}
