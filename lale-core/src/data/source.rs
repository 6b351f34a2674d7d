//! CSV data source.

use serde_json::Value;
use std::path::PathBuf;

use crate::data::frame::Frame;
use crate::error::Result;

/// CSV file data source with a header row.
#[derive(Debug, Clone)]
pub struct CsvSource {
    pub path: PathBuf,
    pub delimiter: u8,
    /// Parse numeric-looking cells as numbers and empty cells as null.
    pub infer_types: bool,
}

impl CsvSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            infer_types: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load the whole file, optionally limiting the number of rows.
    pub async fn load(&self, limit: Option<usize>) -> Result<Frame> {
        let content = tokio::fs::read(&self.path).await?;
        let frame = self.parse(&content, limit)?;
        tracing::debug!(
            path = %self.path.display(),
            rows = frame.row_count(),
            columns = frame.column_count(),
            "Loaded CSV"
        );
        Ok(frame)
    }

    /// Parse CSV bytes into a frame.
    pub fn parse(&self, content: &[u8], limit: Option<usize>) -> Result<Frame> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .from_reader(content);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            if limit.is_some_and(|max| rows.len() >= max) {
                break;
            }
            let record = record?;
            let row = record
                .iter()
                .map(|cell| {
                    if self.infer_types {
                        parse_cell(cell)
                    } else {
                        Value::String(cell.to_string())
                    }
                })
                .collect();
            rows.push(row);
        }

        Frame::new(columns, rows)
    }
}

fn parse_cell(cell: &str) -> Value {
    if cell.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = cell.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Ok(f) = cell.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(cell.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_infers_types() {
        let source = CsvSource::new("inline.csv");
        let frame = source
            .parse(b"age,job,score\n30,\"clerk, senior\",1.5\n41,,2\n", None)
            .unwrap();
        assert_eq!(frame.column_count(), 3);
        assert_eq!(frame.row(0).unwrap(), &[json!(30), json!("clerk, senior"), json!(1.5)]);
        assert_eq!(frame.row(1).unwrap()[1], Value::Null);
    }

    #[test]
    fn test_parse_with_limit() {
        let source = CsvSource::new("inline.csv");
        let frame = source.parse(b"a\n1\n2\n3\n", Some(2)).unwrap();
        assert_eq!(frame.row_count(), 2);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "x;y\n1;a\n2;b\n").unwrap();
        let frame = CsvSource::new(&path)
            .with_delimiter(b';')
            .load(None)
            .await
            .unwrap();
        assert_eq!(frame.columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(frame.row_count(), 2);
    }
}
