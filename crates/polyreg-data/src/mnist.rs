use crate::dataset::Dataset;
use log::info;
use polyreg_core::{Matrix, RegressionError, RegressionResult};
use polyreg_pipeline::Transformer;
use polyreg_preprocessing::GlobalRangeScaler;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

pub const TRAIN_IMAGES: &str = "train-images.idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels.idx1-ubyte";
pub const TEST_IMAGES: &str = "t10k-images.idx3-ubyte";
pub const TEST_LABELS: &str = "t10k-labels.idx1-ubyte";

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

fn read_u32<R: Read>(reader: &mut R) -> RegressionResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn check_magic(found: u32, expected: u32) -> RegressionResult<()> {
    if found == expected {
        Ok(())
    } else {
        Err(RegressionError::Parse {
            line: 0,
            message: format!("bad IDX magic number {}, expected {}", found, expected),
        })
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_body<R: Read>(reader: R, len: usize) -> RegressionResult<Vec<u8>> {
    let mut body = Vec::new();
    reader.take(len as u64).read_to_end(&mut body)?;
    if body.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("IDX body holds {} of {} bytes", body.len(), len),
        )
        .into());
    }
    Ok(body)
}

fn header_overflow(n: usize, rows: usize, cols: usize) -> RegressionError {
    RegressionError::Parse {
        line: 0,
        message: format!("IDX header {} x {} x {} is too large", n, rows, cols),
    }
}

/// Read an IDX3 image file. Every image becomes one row of raw pixel values.
pub fn read_idx_images<R: Read>(mut reader: R) -> RegressionResult<Matrix> {
    check_magic(read_u32(&mut reader)?, IMAGE_MAGIC)?;
    let n = read_u32(&mut reader)? as usize;
    let rows = read_u32(&mut reader)? as usize;
    let cols = read_u32(&mut reader)? as usize;

    let pixels_per_image = rows
        .checked_mul(cols)
        .ok_or_else(|| header_overflow(n, rows, cols))?;
    let len = n
        .checked_mul(pixels_per_image)
        .filter(|&len| len <= isize::MAX as usize)
        .ok_or_else(|| header_overflow(n, rows, cols))?;

    let pixels = read_body(reader, len)?;
    Matrix::from_shape_vec((n, pixels_per_image), pixels.into_iter().map(f64::from).collect())
        .map_err(|e| RegressionError::Parse {
            line: 0,
            message: e.to_string(),
        })
}

/// Read an IDX1 label file.
pub fn read_idx_labels<R: Read>(mut reader: R) -> RegressionResult<Vec<f64>> {
    check_magic(read_u32(&mut reader)?, LABEL_MAGIC)?;
    let n = read_u32(&mut reader)? as usize;
    let labels = read_body(reader, n)?;
    Ok(labels.into_iter().map(f64::from).collect())
}

fn open(dir: &Path, name: &str) -> RegressionResult<BufReader<File>> {
    Ok(BufReader::new(File::open(dir.join(name))?))
}

/// Load the four MNIST files from `dir` as a pre-split data set.
///
/// Pixels are scaled by the global range of the training images.
pub fn load_mnist(dir: impl AsRef<Path>) -> RegressionResult<Dataset> {
    let dir = dir.as_ref();
    let train_images = read_idx_images(open(dir, TRAIN_IMAGES)?)?;
    let train_labels = read_idx_labels(open(dir, TRAIN_LABELS)?)?;
    let test_images = read_idx_images(open(dir, TEST_IMAGES)?)?;
    let test_labels = read_idx_labels(open(dir, TEST_LABELS)?)?;

    let mut scaler = GlobalRangeScaler::new();
    let train_x = scaler.fit_transform(&train_images)?;
    let test_x = scaler.transform(&test_images)?;
    info!(
        "Loaded MNIST: {} training and {} test images of {} pixels",
        train_x.nrows(),
        test_x.nrows(),
        train_x.ncols()
    );

    Dataset::from_parts(
        train_x,
        Matrix::from_shape_vec((train_labels.len(), 1), train_labels).map_err(|e| {
            RegressionError::Parse { line: 0, message: e.to_string() }
        })?,
        test_x,
        Matrix::from_shape_vec((test_labels.len(), 1), test_labels).map_err(|e| {
            RegressionError::Parse { line: 0, message: e.to_string() }
        })?,
    )
}
