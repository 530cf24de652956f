//! Stateful categorical encoders.
//!
//! Every encoder is fit once and never mutated afterwards; `transform`
//! methods take `&self`. Category universes are kept sorted, so the code of a
//! category is its rank among the categories observed at fit time.
//!
//! The two table encoders differ in how they treat a category that was not
//! seen during fit:
//!
//! - [`OrdinalEncoder`] fails with [`EncodeError::UnknownCategory`]
//! - [`OneHotEncoder`] emits an all-zero indicator block for that column
//!
//! [`OneHotEncoder::transform_partial_row`] treats a missing value the same
//! way as an unseen one. Callers that want ordinal encoding to tolerate bad
//! input must coerce the input before encoding.

use std::{collections::BTreeSet, fmt};

use crate::features::FeatureMatrix;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum EncodeError {
    #[display("column {column}: category '{category}' was not seen during fit")]
    UnknownCategory { column: usize, category: String },
    #[display("label '{label}' was not seen during fit")]
    UnknownLabel { label: String },
}

/// Bijection between the observed values of one variable and `0..k`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEncoder<C> {
    classes: Vec<C>,
}

impl<C> LabelEncoder<C>
where
    C: Ord + Clone + fmt::Display,
{
    #[must_use]
    pub fn fit<I>(values: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let classes = values
            .into_iter()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        Self { classes }
    }

    pub fn encode(&self, value: &C) -> Result<usize, EncodeError> {
        self.classes
            .binary_search(value)
            .map_err(|_| EncodeError::UnknownLabel {
                label: value.to_string(),
            })
    }

    #[must_use]
    pub fn decode(&self, code: usize) -> Option<&C> {
        self.classes.get(code)
    }

    #[must_use]
    pub fn classes(&self) -> &[C] {
        &self.classes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    fn position(&self, value: &C) -> Option<usize> {
        self.classes.binary_search(value).ok()
    }
}

/// Per-column integer encoding of a categorical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalEncoder<C> {
    columns: Vec<LabelEncoder<C>>,
}

impl<C> OrdinalEncoder<C>
where
    C: Ord + Clone + fmt::Display,
{
    /// Fits one category universe per column.
    ///
    /// # Panics
    ///
    /// Panics if a row does not have `n_cols` values.
    #[must_use]
    pub fn fit<I, R>(n_cols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[C]>,
    {
        let columns = collect_columns(n_cols, rows)
            .into_iter()
            .map(LabelEncoder::fit)
            .collect();
        Self { columns }
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn encode_value(&self, column: usize, value: &C) -> Result<usize, EncodeError> {
        self.columns[column]
            .position(value)
            .ok_or_else(|| EncodeError::UnknownCategory {
                column,
                category: value.to_string(),
            })
    }

    #[must_use]
    pub fn decode_value(&self, column: usize, code: usize) -> Option<&C> {
        self.columns.get(column)?.decode(code)
    }

    #[must_use]
    pub fn categories(&self, column: usize) -> &[C] {
        self.columns[column].classes()
    }

    #[expect(clippy::cast_precision_loss)]
    pub fn transform_row(&self, row: &[C]) -> Result<Vec<f64>, EncodeError> {
        assert_eq!(row.len(), self.n_cols(), "row width mismatch");
        row.iter()
            .enumerate()
            .map(|(column, value)| self.encode_value(column, value).map(|code| code as f64))
            .collect()
    }

    pub fn transform<I, R>(&self, rows: I) -> Result<FeatureMatrix, EncodeError>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[C]>,
    {
        let mut matrix = FeatureMatrix::with_columns(self.n_cols());
        for row in rows {
            matrix.push_row(&self.transform_row(row.as_ref())?);
        }
        Ok(matrix)
    }
}

/// Indicator encoding with one binary feature per (column, category) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder<C> {
    columns: Vec<LabelEncoder<C>>,
    offsets: Vec<usize>,
    n_features: usize,
}

impl<C> OneHotEncoder<C>
where
    C: Ord + Clone + fmt::Display,
{
    /// # Panics
    ///
    /// Panics if a row does not have `n_cols` values.
    #[must_use]
    pub fn fit<I, R>(n_cols: usize, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[C]>,
    {
        let columns = collect_columns(n_cols, rows)
            .into_iter()
            .map(LabelEncoder::fit)
            .collect::<Vec<_>>();
        let mut offsets = Vec::with_capacity(columns.len());
        let mut n_features = 0;
        for column in &columns {
            offsets.push(n_features);
            n_features += column.len();
        }
        Self {
            columns,
            offsets,
            n_features,
        }
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Width of the encoded output.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    #[must_use]
    pub fn categories(&self, column: usize) -> &[C] {
        self.columns[column].classes()
    }

    /// Feature names in output order, `"{column}={category}"`.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .flat_map(|(i, col)| col.classes().iter().map(move |c| format!("{i}={c}")))
            .collect()
    }

    /// Index of the first feature of `column`'s indicator block.
    #[must_use]
    pub fn block_offset(&self, column: usize) -> usize {
        self.offsets[column]
    }

    /// Encodes one row; an unseen category leaves its column's block all zero.
    #[must_use]
    pub fn transform_row(&self, row: &[C]) -> Vec<f64> {
        assert_eq!(row.len(), self.n_cols(), "row width mismatch");
        self.encode_values(row.iter().map(Some))
    }

    /// Encodes a row in which some values are missing.
    ///
    /// A missing value leaves its column's block all zero, exactly like an
    /// unseen category.
    #[must_use]
    pub fn transform_partial_row(&self, row: &[Option<C>]) -> Vec<f64> {
        assert_eq!(row.len(), self.n_cols(), "row width mismatch");
        self.encode_values(row.iter().map(Option::as_ref))
    }

    fn encode_values<'a, I>(&self, values: I) -> Vec<f64>
    where
        I: Iterator<Item = Option<&'a C>>,
        C: 'a,
    {
        let mut out = vec![0.0; self.n_features];
        for (column, value) in values.enumerate() {
            let Some(value) = value else {
                tracing::debug!(column, "missing category dropped");
                continue;
            };
            match self.columns[column].position(value) {
                Some(pos) => out[self.offsets[column] + pos] = 1.0,
                None => tracing::debug!(column, category = %value, "unseen category dropped"),
            }
        }
        out
    }

    #[must_use]
    pub fn transform<I, R>(&self, rows: I) -> FeatureMatrix
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[C]>,
    {
        let mut matrix = FeatureMatrix::with_columns(self.n_features);
        for row in rows {
            matrix.push_row(&self.transform_row(row.as_ref()));
        }
        matrix
    }
}

fn collect_columns<C, I, R>(n_cols: usize, rows: I) -> Vec<Vec<C>>
where
    C: Clone,
    I: IntoIterator<Item = R>,
    R: AsRef<[C]>,
{
    let mut columns = vec![vec![]; n_cols];
    for row in rows {
        let row = row.as_ref();
        assert_eq!(row.len(), n_cols, "row width mismatch");
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value.clone());
        }
    }
    columns
}
