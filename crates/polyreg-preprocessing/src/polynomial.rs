use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use polyreg_core::{Matrix, RegressionError, RegressionResult, Vector};
use polyreg_pipeline::Transformer;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Every exponent tuple with total degree in `[1, degree]`, one per row.
///
/// Rows are graded: all total-degree-1 terms first, then degree 2, and so on.
/// Within a degree, tuples are in descending lexicographic order, so the first
/// feature varies slowest. For two features and degree 2 that is
/// `(1,0) (0,1) (2,0) (1,1) (0,2)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExponentTable {
    degree: u32,
    rows: Array2<u32>,
}

/// Build the exponent table for `n_features` source columns.
pub fn exponents(n_features: usize, degree: u32) -> RegressionResult<ExponentTable> {
    if degree == 0 {
        return Err(RegressionError::InvalidDegree { degree });
    }
    if n_features == 0 {
        return Err(RegressionError::EmptyInput("exponent table needs at least one feature"));
    }

    let mut flat = Vec::new();
    let mut current = vec![0u32; n_features];
    for total in 1..=degree {
        push_compositions(total, 0, &mut current, &mut flat);
    }

    let n_rows = flat.len() / n_features;
    let rows = Array2::from_shape_vec((n_rows, n_features), flat).map_err(|_| {
        RegressionError::ShapeMismatch {
            context: "exponent table",
            expected: vec![n_rows, n_features],
            got: vec![n_rows * n_features],
        }
    })?;
    Ok(ExponentTable { degree, rows })
}

/// Append every way of splitting `remaining` over `current[col..]`.
fn push_compositions(remaining: u32, col: usize, current: &mut [u32], out: &mut Vec<u32>) {
    if col + 1 == current.len() {
        current[col] = remaining;
        out.extend_from_slice(current);
        return;
    }
    for e in (0..=remaining).rev() {
        current[col] = e;
        push_compositions(remaining - e, col + 1, current, out);
    }
}

impl ExponentTable {
    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn n_features(&self) -> usize {
        self.rows.ncols()
    }

    /// Number of output columns.
    pub fn len(&self) -> usize {
        self.rows.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.nrows() == 0
    }

    pub fn rows(&self) -> ArrayView2<'_, u32> {
        self.rows.view()
    }

    pub fn row(&self, r: usize) -> ArrayView1<'_, u32> {
        self.rows.row(r)
    }

    /// Map `x` to one column per exponent row, in table order.
    pub fn apply(&self, x: &Matrix) -> RegressionResult<Matrix> {
        if x.ncols() != self.n_features() {
            return Err(RegressionError::DimensionMismatch {
                expected: self.n_features(),
                got: x.ncols(),
            });
        }

        let m = x.nrows();
        let columns: Vec<Vector> = (0..self.len())
            .into_par_iter()
            .map(|r| {
                let mut col = Vector::ones(m);
                for (c, &e) in self.rows.row(r).iter().enumerate() {
                    if e == 0 {
                        continue;
                    }
                    Zip::from(&mut col)
                        .and(x.column(c))
                        .for_each(|acc, &v| *acc *= v.powi(e as i32));
                }
                col
            })
            .collect();

        let mut out = Matrix::zeros((m, columns.len()));
        for (j, col) in columns.iter().enumerate() {
            out.column_mut(j).assign(col);
        }
        Ok(out)
    }
}

/// Polynomial expansion of `x` up to `degree`.
///
/// `degree = 1` returns the original columns in their original order.
pub fn map_features(x: &Matrix, degree: u32) -> RegressionResult<Matrix> {
    exponents(x.ncols(), degree)?.apply(x)
}

/// Polynomial expansion that remembers the table it was fitted with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialFeatures {
    degree: u32,
    table: Option<ExponentTable>,
}

impl PolynomialFeatures {
    pub fn new(degree: u32) -> RegressionResult<Self> {
        if degree == 0 {
            return Err(RegressionError::InvalidDegree { degree });
        }
        Ok(PolynomialFeatures { degree, table: None })
    }

    pub fn degree(&self) -> u32 {
        self.degree
    }

    pub fn table(&self) -> Option<&ExponentTable> {
        self.table.as_ref()
    }

    /// Width of the expanded matrix, once fitted.
    pub fn n_output_features(&self) -> Option<usize> {
        self.table.as_ref().map(ExponentTable::len)
    }
}

impl Transformer for PolynomialFeatures {
    fn fit(&mut self, x: &Matrix) -> RegressionResult<()> {
        self.table = Some(exponents(x.ncols(), self.degree)?);
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> RegressionResult<Matrix> {
        self.table
            .as_ref()
            .ok_or(RegressionError::NotFitted("PolynomialFeatures"))?
            .apply(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::HashSet;

    fn binomial(n: u64, k: u64) -> u64 {
        (1..=k).fold(1, |acc, i| acc * (n + 1 - i) / i)
    }

    #[test]
    fn test_two_features_degree_two() {
        let table = exponents(2, 2).unwrap();
        assert_eq!(
            table.rows(),
            array![[1, 0], [0, 1], [2, 0], [1, 1], [0, 2]]
        );

        let out = map_features(&array![[2.0, 3.0]], 2).unwrap();
        assert_eq!(out, array![[2.0, 3.0, 4.0, 6.0, 9.0]]);
    }

    #[test]
    fn test_degree_one_is_identity() {
        let x = array![[1.5, -2.0, 0.0], [4.0, 5.0, 6.0]];
        assert_eq!(map_features(&x, 1).unwrap(), x);
    }

    #[test]
    fn test_table_size_and_degrees() {
        for n in 1..5usize {
            for d in 1..5u32 {
                let table = exponents(n, d).unwrap();
                let expected = binomial(n as u64 + d as u64, d as u64) - 1;
                assert_eq!(table.len() as u64, expected, "n={} d={}", n, d);

                let mut seen = HashSet::new();
                for row in table.rows().rows() {
                    let total: u32 = row.sum();
                    assert!((1..=d).contains(&total));
                    assert!(seen.insert(row.to_vec()), "duplicate row {:?}", row);
                }
            }
        }
    }

    #[test]
    fn test_table_is_deterministic() {
        assert_eq!(exponents(3, 3).unwrap(), exponents(3, 3).unwrap());
    }

    #[test]
    fn test_invalid_degree() {
        assert!(matches!(exponents(2, 0), Err(RegressionError::InvalidDegree { .. })));
        assert!(matches!(
            map_features(&array![[1.0]], 0),
            Err(RegressionError::InvalidDegree { .. })
        ));
        assert!(PolynomialFeatures::new(0).is_err());
        assert!(exponents(0, 2).is_err());
    }

    #[test]
    fn test_transformer_rejects_other_widths() {
        let mut poly = PolynomialFeatures::new(3).unwrap();
        assert!(poly.transform(&array![[1.0, 2.0]]).is_err());

        let out = poly.fit_transform(&array![[1.0, 2.0], [0.5, -1.0]]).unwrap();
        assert_eq!(out.ncols(), 9);
        assert_eq!(poly.n_output_features(), Some(9));
        assert!(matches!(
            poly.transform(&array![[1.0, 2.0, 3.0]]),
            Err(RegressionError::DimensionMismatch { expected: 2, got: 3 })
        ));
    }

    #[test]
    fn test_cubic_terms() {
        let out = map_features(&array![[2.0]], 3).unwrap();
        assert_eq!(out, array![[2.0, 4.0, 8.0]]);
    }
}
