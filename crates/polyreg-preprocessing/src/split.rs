use ndarray::Axis;
use polyreg_core::{validate_split, Matrix, RegressionError, RegressionResult};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Row indices `0..n` in a random order.
pub fn shuffled_indices(n: usize, seed: Option<u64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);
    indices
}

/// Number of training rows for `train_percent` of `n`, rounded down.
pub fn train_size(n: usize, train_percent: f64) -> usize {
    ((n as f64 * train_percent / 100.0).floor() as usize).min(n)
}

/// Shuffle rows and split into training and test sets.
///
/// `y` holds one row per instance. Returns `(X_train, X_test, y_train, y_test)`.
pub fn train_test_split(
    x: &Matrix,
    y: &Matrix,
    train_percent: f64,
    test_percent: f64,
    seed: Option<u64>,
) -> RegressionResult<(Matrix, Matrix, Matrix, Matrix)> {
    validate_split(train_percent, test_percent)?;
    let n = x.nrows();
    if y.nrows() != n {
        return Err(RegressionError::ShapeMismatch {
            context: "targets",
            expected: vec![n, y.ncols()],
            got: y.shape().to_vec(),
        });
    }
    if n == 0 {
        return Err(RegressionError::EmptyInput("cannot split an empty data set"));
    }

    let indices = shuffled_indices(n, seed);
    let (train, test) = indices.split_at(train_size(n, train_percent));

    Ok((
        x.select(Axis(0), train),
        x.select(Axis(0), test),
        y.select(Axis(0), train),
        y.select(Axis(0), test),
    ))
}
