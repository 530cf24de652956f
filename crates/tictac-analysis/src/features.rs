/// Dense row-major feature matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_cols: usize,
    data: Vec<f64>,
}

impl FeatureMatrix {
    #[must_use]
    pub fn with_columns(n_cols: usize) -> Self {
        Self {
            n_cols,
            data: vec![],
        }
    }

    /// Builds a matrix from rows of equal width.
    ///
    /// # Panics
    ///
    /// Panics if the rows differ in width.
    #[must_use]
    pub fn from_rows<I, R>(n_cols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[f64]>,
    {
        let mut matrix = Self::with_columns(n_cols);
        for row in rows {
            matrix.push_row(row.as_ref());
        }
        matrix
    }

    /// # Panics
    ///
    /// Panics if `row` does not have exactly [`Self::n_cols`] values.
    pub fn push_row(&mut self, row: &[f64]) {
        assert_eq!(row.len(), self.n_cols, "row width mismatch");
        self.data.extend_from_slice(row);
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.data.len().checked_div(self.n_cols).unwrap_or(0)
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn row(&self, index: usize) -> &[f64] {
        &self.data[index * self.n_cols..(index + 1) * self.n_cols]
    }

    /// All values, row after row.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> {
        self.data.chunks_exact(self.n_cols.max(1))
    }

    pub fn column(&self, col: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows().map(move |r| r[col])
    }

    pub fn rows_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.data.chunks_exact_mut(self.n_cols.max(1))
    }

    /// Rows at `indices`, in the order given.
    #[must_use]
    pub fn select(&self, indices: &[usize]) -> Self {
        Self::from_rows(self.n_cols, indices.iter().map(|&i| self.row(i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_columns() {
        let m = FeatureMatrix::from_rows(2, [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(1).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0]);
        assert_eq!(m.select(&[2, 0]).row(0), &[5.0, 6.0]);
        assert_eq!(m.as_slice(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_empty() {
        let m = FeatureMatrix::with_columns(4);
        assert!(m.is_empty());
        assert_eq!(m.n_rows(), 0);
        assert_eq!(m.rows().count(), 0);
    }
}
