use ndarray::Axis;
use polyreg_core::{Matrix, RegressionError, RegressionResult};
use polyreg_data::Dataset;
use polyreg_linear::LinearRegression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Upper bound on the samples one curve may hold.
pub const MAX_CURVE_POINTS: usize = 1_000_000;

/// Predictions of a fitted linear model along raw feature 0.
///
/// Feature 0 sweeps from its training minimum to its training maximum in
/// steps of `resolution`; any other raw features are held at their training
/// mean. Each sample is replayed through the data set's feature pipeline
/// before predicting. Returns `(feature, first output)` pairs.
pub fn model_curve(
    dataset: &Dataset,
    model: &LinearRegression,
    resolution: f64,
) -> RegressionResult<Vec<(f64, f64)>> {
    if !(resolution > 0.0 && resolution.is_finite()) {
        return Err(RegressionError::InvalidParameter {
            name: "resolution",
            value: resolution,
            reason: "must be > 0",
        });
    }
    let raw = dataset.x_train();
    let column = raw.column(0);
    let min = column.fold(f64::INFINITY, |a, &b| a.min(b));
    let max = column.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let mean = raw
        .mean_axis(Axis(0))
        .ok_or(RegressionError::EmptyInput("training split is empty"))?;

    let spans = ((max - min) / resolution).floor();
    if !(spans < MAX_CURVE_POINTS as f64) {
        return Err(RegressionError::InvalidParameter {
            name: "resolution",
            value: resolution,
            reason: "too fine for the feature range",
        });
    }
    let steps = spans as usize + 1;
    let mut samples = Matrix::zeros((steps, raw.ncols()));
    for (i, mut row) in samples.rows_mut().into_iter().enumerate() {
        row.assign(&mean);
        row[0] = min + i as f64 * resolution;
    }

    let prediction = model.predict(&dataset.map_features(&samples)?)?;
    Ok(samples
        .column(0)
        .iter()
        .zip(prediction.column(0))
        .map(|(&x, &y)| (x, y))
        .collect())
}

/// Write curve points under a `#Feature  #Target` header.
pub fn write_curve<W: Write>(mut out: W, points: &[(f64, f64)]) -> RegressionResult<()> {
    writeln!(out, "#Feature  #Target")?;
    for (x, y) in points {
        writeln!(out, "{} {}", x, y)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_curve_file(path: impl AsRef<Path>, points: &[(f64, f64)]) -> RegressionResult<()> {
    write_curve(BufWriter::new(File::create(path)?), points)
}
