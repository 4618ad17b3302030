//! Dense feature matrix and per-column standardization.

use crate::error::{ClusterError, Result};

/// Column scales below this are treated as zero variance.
const ZERO_SCALE: f64 = 10.0 * f64::EPSILON;

/// Row-major matrix of `f64` features, one row per message.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    /// A matrix with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a matrix from equally sized rows.
    ///
    /// # Errors
    /// Returns [`ClusterError::EmbeddingShape`] if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ClusterError::EmbeddingShape(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    /// Panics if `i` is out of bounds.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    /// Column `j` as an owned vector.
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.rows).map(|i| self.data[i * self.cols + j]).collect()
    }

    /// Euclidean distance between rows `a` and `b`.
    pub fn distance(&self, a: usize, b: usize) -> f64 {
        self.row(a)
            .iter()
            .zip(self.row(b))
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    /// Rescale every column to zero mean and unit variance.
    ///
    /// Statistics are computed from this matrix alone. Constant columns
    /// become all zeros.
    pub fn standardize(&self) -> FeatureMatrix {
        let mut data = self.data.clone();
        for j in 0..self.cols {
            let (mean, scale) = column_stats(&self.column(j));
            for i in 0..self.rows {
                let cell = &mut data[i * self.cols + j];
                *cell = (*cell - mean) / scale;
            }
        }
        FeatureMatrix {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }
}

/// Z-score a slice using its own mean and population standard deviation.
pub fn zscore(values: &[f64]) -> Vec<f64> {
    let (mean, scale) = column_stats(values);
    values.iter().map(|v| (v - mean) / scale).collect()
}

/// Mean and scale of a column; zero variance maps to a scale of 1.
fn column_stats(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 1.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
    let std = variance.sqrt();
    let scale = if std < ZERO_SCALE { 1.0 } else { std };
    (mean, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_from_rows_shape() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m.nrows(), 2);
        assert_eq!(m.ncols(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(0), vec![1.0, 3.0]);
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(ClusterError::EmbeddingShape(_))));
    }

    #[test]
    fn test_empty() {
        let m = FeatureMatrix::from_rows(Vec::new()).unwrap();
        assert!(m.is_empty());
        assert_eq!(m, FeatureMatrix::empty());
    }

    #[test]
    fn test_distance() {
        let m = FeatureMatrix::from_rows(vec![vec![0.0, 0.0], vec![3.0, 4.0]]).unwrap();
        assert!(approx(m.distance(0, 1), 5.0));
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let m = FeatureMatrix::from_rows(vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ])
        .unwrap()
        .standardize();

        for j in 0..2 {
            let col = m.column(j);
            let mean = col.iter().sum::<f64>() / 4.0;
            let var = col.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 4.0;
            assert!(approx(mean, 0.0));
            assert!(approx(var, 1.0));
        }
    }

    #[test]
    fn test_standardize_constant_column_is_zero() {
        let m = FeatureMatrix::from_rows(vec![vec![5.0, 1.0], vec![5.0, 2.0]])
            .unwrap()
            .standardize();
        assert_eq!(m.column(0), vec![0.0, 0.0]);
    }

    #[test]
    fn test_zscore_timestamps() {
        let z = zscore(&[1_700_000_000.0, 1_700_000_060.0, 1_700_000_120.0]);
        assert!(approx(z[1], 0.0));
        assert!(approx(z[0], -z[2]));
        assert!(approx(z[2], (1.5_f64).sqrt()));
    }

    #[test]
    fn test_zscore_single_value() {
        assert_eq!(zscore(&[42.0]), vec![0.0]);
    }
}
