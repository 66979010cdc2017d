//! Row/column labelled real-valued tables (conditions × nodes).

use std::sync::Arc;

use nalgebra::DMatrix;
use rustc_hash::FxHashMap;

use crate::engine::errors::SignalFlowError;

/// A dense table with named rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    rows: Vec<Arc<str>>,
    columns: Vec<Arc<str>>,
    values: DMatrix<f64>,
}

impl LabeledTable {
    pub fn new(
        rows: Vec<String>,
        columns: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, SignalFlowError> {
        if values.nrows() != rows.len() || values.ncols() != columns.len() {
            return Err(SignalFlowError::dimension_mismatch(
                "labeled table",
                format!("{}x{}", rows.len(), columns.len()),
                format!("{}x{}", values.nrows(), values.ncols()),
            ));
        }
        Ok(Self {
            rows: rows.into_iter().map(Arc::from).collect(),
            columns: columns.into_iter().map(Arc::from).collect(),
            values,
        })
    }

    pub(crate) fn from_parts(
        rows: Vec<Arc<str>>,
        columns: Vec<Arc<str>>,
        values: DMatrix<f64>,
    ) -> Self {
        debug_assert_eq!(values.shape(), (rows.len(), columns.len()));
        Self {
            rows,
            columns,
            values,
        }
    }

    pub fn rows(&self) -> &[Arc<str>] {
        &self.rows
    }

    pub fn columns(&self) -> &[Arc<str>] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let i = self.rows.iter().position(|r| r.as_ref() == row)?;
        let j = self.column_index(column)?;
        Some(self.values[(i, j)])
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.as_ref() == column)
    }

    /// Returns a table with the columns reordered (and possibly subset) to
    /// `order`. Every requested column must exist.
    pub fn select_columns<S: AsRef<str>>(&self, order: &[S]) -> Result<Self, SignalFlowError> {
        let lookup: FxHashMap<&str, usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(j, c)| (c.as_ref(), j))
            .collect();

        let mut indices = Vec::with_capacity(order.len());
        for name in order {
            let name = name.as_ref();
            let j = lookup.get(name).copied().ok_or_else(|| {
                SignalFlowError::Configuration(format!("column '{}' not found in table", name))
            })?;
            indices.push(j);
        }

        let values = self.values.select_columns(indices.iter());
        let columns = indices.iter().map(|&j| self.columns[j].clone()).collect();
        Ok(Self::from_parts(self.rows.clone(), columns, values))
    }
}
