//! The result table written in CSV mode.
//!
//! Columns: `id`, `top_class_name`, `top_class`, `top_3_classes_names`,
//! `top_3_classes`, one `probNN` column per class and one `featNNNN` column per
//! embedding dimension. Rows are kept in memory and written once at the end.

use crate::core::constants::{EMBEDDING_DIM, NUM_CLASSES};
use crate::core::{SubCellError, SubCellResult};
use crate::models::Prediction;
use crate::processors::ClassRanking;
use std::path::Path;

const LABEL_COLUMNS: [&str; 5] = [
    "id",
    "top_class_name",
    "top_class",
    "top_3_classes_names",
    "top_3_classes",
];

/// Column layout of the result table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    num_classes: usize,
    embedding_dim: usize,
    columns: Vec<String>,
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::new(NUM_CLASSES, EMBEDDING_DIM)
    }
}

impl TableSchema {
    /// Generates the column names for the given widths.
    pub fn new(num_classes: usize, embedding_dim: usize) -> Self {
        let mut columns: Vec<String> = LABEL_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend((0..num_classes).map(|i| format!("prob{:02}", i)));
        columns.extend((0..embedding_dim).map(|i| format!("feat{:04}", i)));
        Self {
            num_classes,
            embedding_dim,
            columns,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// Accumulated result rows.
#[derive(Debug, Clone, Default)]
pub struct ResultTable {
    schema: TableSchema,
    rows: Vec<Vec<String>>,
}

impl ResultTable {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Number of rows appended so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends the row for one processed image set.
    ///
    /// # Errors
    ///
    /// Fails if the prediction does not match the table widths.
    pub fn push(
        &mut self,
        id: &str,
        ranking: &ClassRanking,
        prediction: &Prediction,
    ) -> SubCellResult<()> {
        if prediction.probabilities.len() != self.schema.num_classes {
            return Err(SubCellError::invalid_input(format!(
                "'{}': model returned {} probabilities, the result table has {} columns",
                id,
                prediction.probabilities.len(),
                self.schema.num_classes
            )));
        }
        if prediction.embedding.len() != self.schema.embedding_dim {
            return Err(SubCellError::invalid_input(format!(
                "'{}': model returned an embedding of length {}, the result table has {} columns",
                id,
                prediction.embedding.len(),
                self.schema.embedding_dim
            )));
        }

        let mut row = Vec::with_capacity(self.schema.columns.len());
        row.push(id.to_string());
        row.push(ranking.top_class_name.clone());
        row.push(ranking.top_class.to_string());
        row.push(ranking.joined_names());
        row.push(ranking.joined_indexes_ascending());
        row.extend(prediction.probabilities.iter().map(f32::to_string));
        row.extend(prediction.embedding.iter().map(f32::to_string));
        self.rows.push(row);
        Ok(())
    }

    /// Writes the header and all rows to `path`, replacing any existing file.
    pub fn write_csv(&self, path: &Path) -> SubCellResult<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.schema.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer
            .flush()
            .map_err(|e| SubCellError::io("flush", path, e))?;
        Ok(())
    }
}
