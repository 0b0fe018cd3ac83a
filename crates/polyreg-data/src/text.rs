use csv::ReaderBuilder;
use log::debug;
use polyreg_core::{Matrix, RegressionError, RegressionResult, Vector};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read whitespace-delimited numbers, one instance per line, last column the target.
///
/// Lines starting with `#` and blank lines are skipped. Every remaining line
/// must carry the same number of values, at least two.
pub fn read_text<R: Read>(reader: R) -> RegressionResult<(Matrix, Vector)> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .from_reader(reader);

    let mut data = Vec::new();
    let mut width: Option<usize> = None;
    let mut n_rows = 0usize;

    for result in rdr.records() {
        let record = result.map_err(|e| RegressionError::Parse {
            line: e.position().map(|p| p.line() as usize).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(0);

        let values = record
            .iter()
            .flat_map(str::split_whitespace)
            .map(|field| {
                field.parse::<f64>().map_err(|_| RegressionError::Parse {
                    line,
                    message: format!("not a number: {:?}", field),
                })
            })
            .collect::<RegressionResult<Vec<f64>>>()?;
        if values.is_empty() {
            continue;
        }

        match width {
            None if values.len() < 2 => {
                return Err(RegressionError::Parse {
                    line,
                    message: "need at least one feature and a target".into(),
                });
            }
            None => width = Some(values.len()),
            Some(w) if w != values.len() => {
                return Err(RegressionError::Parse {
                    line,
                    message: format!("expected {} values, found {}", w, values.len()),
                });
            }
            Some(_) => {}
        }
        data.extend(values);
        n_rows += 1;
    }

    let width = width.ok_or(RegressionError::EmptyInput("no data lines"))?;
    let table = Matrix::from_shape_vec((n_rows, width), data).map_err(|e| RegressionError::Parse {
        line: 0,
        message: e.to_string(),
    })?;
    let features = table.slice(ndarray::s![.., ..width - 1]).to_owned();
    let targets = table.column(width - 1).to_owned();
    debug!("Read {} instances with {} features", n_rows, width - 1);
    Ok((features, targets))
}

/// Read a data file from disk. See [`read_text`].
pub fn read_text_file(path: impl AsRef<Path>) -> RegressionResult<(Matrix, Vector)> {
    read_text(File::open(path)?)
}
