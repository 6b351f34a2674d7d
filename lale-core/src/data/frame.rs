//! Rectangular table of JSON cells used as operator input and output.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::error::{LaleError, Result};

/// Labels, one cell per row.
pub type Labels = Vec<Value>;

/// Identifies a column either by name or by position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureRef {
    Index(usize),
    Name(String),
}

impl FeatureRef {
    /// Display name: the column name, or `f<idx>` for positional features.
    pub fn display_name(&self) -> String {
        match self {
            Self::Index(i) => format!("f{i}"),
            Self::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for FeatureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

impl From<&str> for FeatureRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for FeatureRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for FeatureRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A rectangular table: named columns and rows of JSON cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// Unchecked wire form of a [`Frame`].
#[derive(Deserialize)]
struct RawFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = LaleError;

    fn try_from(raw: RawFrame) -> Result<Self> {
        Frame::new(raw.columns, raw.rows)
    }
}

impl Frame {
    /// Build a frame, rejecting rows whose width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(LaleError::data(format!(
                "row {i} has {} cells but the frame has {} columns",
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Build a frame from rows without header names; columns are named `f0`, `f1`, ...
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Result<Self> {
        let width = rows.first().map_or(0, Vec::len);
        let columns = (0..width).map(|i| format!("f{i}")).collect();
        Self::new(columns, rows)
    }

    /// Build a frame from named columns of equal length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, v)| v.len() != n_rows) {
            return Err(LaleError::data(format!(
                "column '{name}' has {} values, expected {n_rows}",
                values.len()
            )));
        }
        let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
        let mut names = Vec::with_capacity(columns.len());
        for (name, values) in columns {
            names.push(name);
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Ok(Self {
            columns: names,
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[Value]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a feature reference to a column position.
    pub fn column_index(&self, feature: &FeatureRef) -> Result<usize> {
        match feature {
            FeatureRef::Index(i) if *i < self.columns.len() => Ok(*i),
            FeatureRef::Index(i) => Err(LaleError::data(format!(
                "column index {i} out of range for {} columns",
                self.columns.len()
            ))),
            FeatureRef::Name(name) => self
                .columns
                .iter()
                .position(|c| c == name)
                .ok_or_else(|| LaleError::data(format!("no column named '{name}'"))),
        }
    }

    /// Iterate over the cells of one column.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// True when every non-null cell of the column is a number.
    pub fn is_numeric_column(&self, index: usize) -> bool {
        self.column_values(index)
            .filter(|v| !v.is_null())
            .all(Value::is_number)
    }

    /// New frame holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Frame> {
        let rows = indices
            .iter()
            .map(|&i| {
                self.rows.get(i).cloned().ok_or_else(|| {
                    LaleError::data(format!(
                        "row index {i} out of range for {} rows",
                        self.rows.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Frame {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// New frame holding the given columns, in the given order.
    pub fn select_columns(&self, indices: &[usize]) -> Result<Frame> {
        if let Some(bad) = indices.iter().find(|&&i| i >= self.columns.len()) {
            return Err(LaleError::data(format!("column index {bad} out of range")));
        }
        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Frame { columns, rows })
    }

    /// New frame without the given columns.
    pub fn drop_columns(&self, indices: &[usize]) -> Frame {
        let keep: Vec<usize> = (0..self.columns.len())
            .filter(|i| !indices.contains(i))
            .collect();
        Frame {
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| keep.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }

    /// Replace the cells of an existing column.
    pub fn set_column(&mut self, index: usize, values: Vec<Value>) -> Result<()> {
        if index >= self.columns.len() {
            return Err(LaleError::data(format!("column index {index} out of range")));
        }
        self.check_height(&values)?;
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[index] = value;
        }
        Ok(())
    }

    /// Append a column at the right.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> Result<()> {
        if self.columns.is_empty() && self.rows.is_empty() {
            self.rows = vec![Vec::new(); values.len()];
        }
        self.check_height(&values)?;
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Remove a column and return it alongside the remaining frame, e.g. to
    /// separate a label column from the features.
    pub fn split_off_column(&self, feature: &FeatureRef) -> Result<(Frame, Labels)> {
        let index = self.column_index(feature)?;
        let labels = self.column_values(index).cloned().collect();
        Ok((self.drop_columns(&[index]), labels))
    }

    /// Append the rows of another frame with identical columns.
    pub fn append(&mut self, other: Frame) -> Result<()> {
        if other.columns != self.columns {
            return Err(LaleError::data("cannot append frames with different columns"));
        }
        self.rows.extend(other.rows);
        Ok(())
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }

    fn check_height(&self, values: &[Value]) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(LaleError::data(format!(
                "column has {} values but the frame has {} rows",
                values.len(),
                self.rows.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Frame {
        Frame::new(
            vec!["name".into(), "age".into(), "score".into()],
            vec![
                vec![json!("a"), json!(30), json!(1.5)],
                vec![json!("b"), json!(25), json!(null)],
                vec![json!("c"), json!(41), json!(2.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Frame::new(vec!["a".into()], vec![vec![json!(1), json!(2)]]).unwrap_err();
        assert!(err.to_string().contains("row 0"));
    }

    #[test]
    fn test_deserialize_checks_width() {
        let ragged = json!({"columns": ["sex", "age"], "rows": [["m"]]});
        let err = serde_json::from_value::<Frame>(ragged).unwrap_err();
        assert!(err.to_string().contains("row 0 has 1 cells"));

        let text = serde_json::to_string(&sample()).unwrap();
        let parsed: Frame = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_column_index_by_name_and_position() {
        let frame = sample();
        assert_eq!(frame.column_index(&"age".into()).unwrap(), 1);
        assert_eq!(frame.column_index(&FeatureRef::Index(2)).unwrap(), 2);
        assert!(frame.column_index(&FeatureRef::Index(3)).is_err());
        assert!(frame.column_index(&"missing".into()).is_err());
    }

    #[test]
    fn test_numeric_columns() {
        let frame = sample();
        assert!(!frame.is_numeric_column(0));
        assert!(frame.is_numeric_column(1));
        assert!(frame.is_numeric_column(2));
    }

    #[test]
    fn test_select_and_drop() {
        let frame = sample();
        let picked = frame.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.row(0).unwrap()[0], json!("c"));
        assert!(frame.select_rows(&[7]).is_err());

        let dropped = frame.drop_columns(&[0]);
        assert_eq!(dropped.columns(), &["age".to_string(), "score".to_string()]);
        assert_eq!(dropped.row_count(), 3);
    }

    #[test]
    fn test_split_off_column() {
        let (x, y) = sample().split_off_column(&"name".into()).unwrap();
        assert_eq!(x.column_count(), 2);
        assert_eq!(y, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn test_from_columns_and_push() {
        let mut frame = Frame::from_columns(vec![("x".into(), vec![json!(1), json!(2)])]).unwrap();
        frame.push_column("y", vec![json!(true), json!(false)]).unwrap();
        assert_eq!(frame.row(1).unwrap(), &[json!(2), json!(false)]);
        assert!(frame.push_column("z", vec![json!(1)]).is_err());
    }

    #[test]
    fn test_positional_feature_name() {
        assert_eq!(FeatureRef::Index(8).display_name(), "f8");
        let parsed: FeatureRef = serde_json::from_value(json!(12)).unwrap();
        assert_eq!(parsed, FeatureRef::Index(12));
        let parsed: FeatureRef = serde_json::from_value(json!("sex")).unwrap();
        assert_eq!(parsed, FeatureRef::Name("sex".into()));
    }
}
