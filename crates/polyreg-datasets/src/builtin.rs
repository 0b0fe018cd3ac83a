use polyreg_core::{Matrix, Vector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(1e-10);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Generate synthetic classification data (Gaussian blobs).
///
/// Labels are the class indices `0..n_centers`. Centers are spread 5 units
/// apart along every axis.
pub fn make_blobs(
    n_samples: usize,
    n_features: usize,
    n_centers: usize,
    cluster_std: f64,
    seed: Option<u64>,
) -> (Matrix, Vector) {
    let mut rng = rng_from(seed);
    let n_centers = n_centers.max(1);

    let centers = Matrix::from_shape_fn((n_centers, n_features), |(c, _)| {
        c as f64 * 5.0 + rng.gen::<f64>()
    });

    let mut x = Matrix::zeros((n_samples, n_features));
    let mut y = Vector::zeros(n_samples);
    for i in 0..n_samples {
        // contiguous runs per class, the last one takes the remainder
        let c = (i / (n_samples / n_centers).max(1)).min(n_centers - 1);
        for f in 0..n_features {
            x[[i, f]] = centers[[c, f]] + gaussian(&mut rng) * cluster_std;
        }
        y[i] = c as f64;
    }
    (x, y)
}

/// Two classes in the plane split by the line `x0 + x1 = 0` with a gap of `margin`.
///
/// Points are uniform in `[-3, 3]²`; any that fall inside the gap are pushed out
/// along the normal. Label 1 lies on the positive side.
pub fn make_separable(n_samples: usize, margin: f64, seed: Option<u64>) -> (Matrix, Vector) {
    let mut rng = rng_from(seed);
    let normal = std::f64::consts::FRAC_1_SQRT_2;
    let half = margin / 2.0;

    let mut x = Matrix::zeros((n_samples, 2));
    let mut y = Vector::zeros(n_samples);
    for i in 0..n_samples {
        let a: f64 = rng.gen_range(-3.0..3.0);
        let b: f64 = rng.gen_range(-3.0..3.0);
        let mut distance = (a + b) * normal;
        // alternate classes so both are always present
        let positive = i % 2 == 1;
        if positive != (distance > 0.0) {
            distance = -distance;
        }
        let target = if positive { distance.max(half) } else { distance.min(-half) };
        let shift = (target - (a + b) * normal) * normal;
        x[[i, 0]] = a + shift;
        x[[i, 1]] = b + shift;
        y[i] = if positive { 1.0 } else { 0.0 };
    }
    (x, y)
}

/// Samples of `y = Σ coefficients[k] · x^k` plus Gaussian noise, `x` uniform in `[low, high)`.
pub fn make_polynomial(
    n_samples: usize,
    coefficients: &[f64],
    low: f64,
    high: f64,
    noise: f64,
    seed: Option<u64>,
) -> (Matrix, Vector) {
    let mut rng = rng_from(seed);

    let mut x = Matrix::zeros((n_samples, 1));
    let mut y = Vector::zeros(n_samples);
    for i in 0..n_samples {
        let v: f64 = rng.gen_range(low..high);
        let clean = coefficients.iter().rev().fold(0.0, |acc, &c| acc * v + c);
        x[[i, 0]] = v;
        y[i] = clean + gaussian(&mut rng) * noise;
    }
    (x, y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_blobs() {
        let (x, y) = make_blobs(100, 2, 3, 0.5, Some(42));
        assert_eq!(x.dim(), (100, 2));
        assert_eq!(y.len(), 100);
        for c in 0..3 {
            assert!(y.iter().any(|&l| l == c as f64));
        }
        assert_eq!(make_blobs(10, 2, 2, 0.5, Some(1)), make_blobs(10, 2, 2, 0.5, Some(1)));
    }

    #[test]
    fn test_make_separable_respects_margin() {
        let (x, y) = make_separable(200, 0.5, Some(7));
        for (row, &label) in x.rows().into_iter().zip(y.iter()) {
            let side = (row[0] + row[1]) * std::f64::consts::FRAC_1_SQRT_2;
            if label == 1.0 {
                assert!(side >= 0.25 - 1e-12, "{} {}", side, label);
            } else {
                assert!(side <= -0.25 + 1e-12, "{} {}", side, label);
            }
        }
        assert_eq!(y.sum(), 100.0);
    }

    #[test]
    fn test_make_polynomial() {
        let (x, y) = make_polynomial(50, &[1.0, 0.0, 2.0], -1.0, 1.0, 0.0, Some(3));
        assert_eq!(x.dim(), (50, 1));
        for i in 0..50 {
            let v = x[[i, 0]];
            assert!((y[i] - (1.0 + 2.0 * v * v)).abs() < 1e-12);
        }
    }
}
