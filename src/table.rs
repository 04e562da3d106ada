//! In-memory tables with named columns, and their CSV representation
//!
//! Raw data files and derived tables share the same representation: an
//! ordered list of column names, plus rows of dynamically typed cells. The
//! dataset is sparse, so every cell may be [`Value::Missing`].

use crate::{
    conference::ConferenceNameMap,
    error::{Error, Result},
};
use csv_async::{AsyncReaderBuilder, AsyncWriterBuilder};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt::{self, Display},
    io::ErrorKind,
    path::Path,
};
use tokio::{fs::File, io::AsyncWrite};

/// Cell of a [`Table`]
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// No data was recorded
    Missing,

    /// Integral number
    Int(i64),

    /// Finite floating-point number
    Float(f64),

    /// Anything else
    Text(Box<str>),
}
//
impl Value {
    /// Interpret a CSV field
    ///
    /// Empty fields and the usual dataframe "not available" markers are
    /// considered to be missing data.
    pub fn parse(field: &str) -> Self {
        const MISSING_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "None"];
        if field.is_empty() || MISSING_MARKERS.contains(&field) {
            Self::Missing
        } else if let Ok(int) = field.parse::<i64>() {
            Self::Int(int)
        } else if let Some(float) = field.parse::<f64>().ok().filter(|f| f.is_finite()) {
            Self::Float(float)
        } else {
            Self::Text(field.into())
        }
    }

    /// Build a float cell, turning undefined results into missing data
    pub fn float(x: f64) -> Self {
        if x.is_finite() {
            Self::Float(x)
        } else {
            Self::Missing
        }
    }

    /// Truth that this cell holds data
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// Numerical value of this cell, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Int(i) => Some(i as f64),
            Self::Float(f) => Some(f),
            Self::Missing | Self::Text(_) => None,
        }
    }

    /// Integral value of this cell, if it is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(i) => Some(i),
            Self::Float(f) if f.fract() == 0.0 => Some(f as i64),
            _ => None,
        }
    }

    /// Textual value of this cell, if it is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Total order used when sorting or grouping derived tables
    ///
    /// Missing data sorts first, then numbers, then text.
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        fn rank(v: &Value) -> u8 {
            match v {
                Value::Missing => 0,
                Value::Int(_) | Value::Float(_) => 1,
                Value::Text(_) => 2,
            }
        }
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (a, b) if rank(a) == 1 && rank(b) == 1 => {
                let (a, b) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                a.total_cmp(&b)
            }
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}
//
impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(t) => f.write_str(t),
        }
    }
}
//
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}
//
impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}
//
impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}
//
impl From<Option<f64>> for Value {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::float)
    }
}

/// Table with named columns
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Table {
    /// Name of the table, used in error messages
    name: Box<str>,

    /// Column names, in order
    columns: Box<[Box<str>]>,

    /// Rows, each of which has one cell per column
    rows: Vec<Box<[Value]>>,
}
//
impl Table {
    /// Set up an empty table
    pub fn new(name: impl Into<Box<str>>, columns: impl IntoIterator<Item = impl Into<Box<str>>>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Load a table from a CSV file with a header row
    ///
    /// If `conference_column` is specified, the conference codes that it
    /// contains are replaced with the associated display names.
    ///
    /// Following the usual dataframe convention, an empty first header denotes
    /// an index column, which is named after the table.
    pub async fn load(
        path: &Path,
        names: &ConferenceNameMap,
        conference_column: Option<&str>,
    ) -> Result<Self> {
        let name = path
            .file_stem()
            .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().into_owned());
        let file = File::open(path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                log::warn!("Data file {} is missing", path.display());
            }
            Error::DataUnavailable {
                path: path.into(),
                source,
            }
        })?;
        let csv_error = |source| Error::Csv {
            path: path.into(),
            source,
        };
        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            .create_reader(file);
        let headers = reader.headers().await.map_err(csv_error)?.clone();
        let mut table = Self::new(
            name.as_str(),
            headers
                .iter()
                .enumerate()
                .map(|(idx, header)| if idx == 0 && header.is_empty() { name.as_str() } else { header }),
        );
        let conference_idx = conference_column.map(|col| table.column(col)).transpose()?;

        let mut records = reader.records();
        while let Some(record) = records.next().await {
            let record = record.map_err(csv_error)?;
            let mut row = record.iter().map(Value::parse).collect::<Box<[_]>>();
            if let Some(idx) = conference_idx {
                if let Some(display_name) = row[idx].as_text().and_then(|code| names.normalize(code)) {
                    row[idx] = Value::from(display_name);
                }
            }
            table.rows.push(row);
        }
        if table.is_empty() {
            log::warn!("Data file {} holds no records", path.display());
        } else {
            log::debug!("Loaded {} rows from {}", table.len(), path.display());
        }
        Ok(table)
    }

    /// Write this table as CSV, header included
    pub async fn write_csv<W: AsyncWrite + Unpin>(&self, output: W) -> csv_async::Result<()> {
        let mut writer = AsyncWriterBuilder::new().create_writer(output);
        writer.write_record(self.columns.iter().map(|c| c.as_bytes())).await?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(ToString::to_string))
                .await?;
        }
        writer.flush().await?;
        Ok(())
    }

    /// Name of this table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column names
    pub fn columns(&self) -> &[Box<str>] {
        &self.columns
    }

    /// Rows
    pub fn rows(&self) -> &[Box<[Value]>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Truth that this table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, or a schema mismatch error
    pub fn column(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| &**c == name)
            .ok_or_else(|| Error::SchemaMismatch {
                table: self.name.clone(),
                column: name.into(),
            })
    }

    /// Numerical value of a cell, which must be either missing or numeric
    pub fn numeric(&self, row: &[Value], column: usize) -> Result<Option<f64>> {
        match &row[column] {
            Value::Missing => Ok(None),
            Value::Text(t) => Err(Error::NotNumeric {
                table: self.name.clone(),
                column: self.columns[column].clone(),
                value: t.clone(),
            }),
            v => Ok(v.as_f64()),
        }
    }

    /// Columns whose present cells are all numbers, with at least one of them
    ///
    /// This is what attribute selectors should offer.
    pub fn numeric_columns(&self) -> Vec<&str> {
        (self.columns.iter().enumerate())
            .filter(|&(idx, _)| {
                let mut present = self.rows.iter().map(|row| &row[idx]).filter(|v| v.is_present());
                let mut any = false;
                let all_numeric = present.all(|v| {
                    any = true;
                    v.as_f64().is_some()
                });
                any && all_numeric
            })
            .map(|(_, name)| &**name)
            .collect()
    }

    /// Append a row
    ///
    /// # Panics
    ///
    /// If the row does not have one cell per column.
    pub fn push(&mut self, row: impl Into<Box<[Value]>>) {
        let row = row.into();
        assert_eq!(
            row.len(),
            self.columns.len(),
            "rows should have one cell per column"
        );
        self.rows.push(row);
    }

    /// Sort rows with a comparator, preserving the order of equal rows
    pub fn sort_by(&mut self, mut compare: impl FnMut(&[Value], &[Value]) -> Ordering) {
        self.rows.sort_by(|a, b| compare(a, b));
    }

    /// Copy of this table with only the rows whose cell in some column passes
    /// a predicate
    pub fn filtered(&self, column: &str, mut keep: impl FnMut(&Value) -> bool) -> Result<Self> {
        let idx = self.column(column)?;
        Ok(Self {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: (self.rows.iter())
                .filter(|row| keep(&row[idx]))
                .cloned()
                .collect(),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Build a table from string literals, parsing them like CSV fields
    pub(crate) fn table(name: &str, columns: &[&str], rows: &[&[&str]]) -> Table {
        let mut table = Table::new(name, columns.iter().copied());
        for row in rows {
            table.push(row.iter().map(|f| Value::parse(f)).collect::<Vec<_>>());
        }
        table
    }

    #[test]
    fn fields_are_typed() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("2023"), Value::Int(2023));
        assert_eq!(Value::parse("4.5"), Value::Float(4.5));
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(Value::parse("inf"), Value::Text("inf".into()));
        assert_eq!(Value::parse("Accept"), Value::Text("Accept".into()));
    }

    #[test]
    fn values_sort_missing_numbers_text() {
        let mut values = vec![
            Value::from("b"),
            Value::Float(2.5),
            Value::Missing,
            Value::Int(3),
            Value::Int(1),
            Value::from("a"),
        ];
        values.sort_by(Value::total_cmp);
        assert_eq!(
            values,
            vec![
                Value::Missing,
                Value::Int(1),
                Value::Float(2.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn numeric_columns_skip_text_and_empty() {
        let t = table(
            "raw",
            &["meeting", "rating", "empty", "mixed"],
            &[&["cvpr", "3.5", "", "1"], &["iclr", "", "", "x"]],
        );
        assert_eq!(t.numeric_columns(), vec!["rating"]);
    }

    #[test]
    fn unknown_columns_are_schema_mismatches() {
        let t = table("raw", &["meeting"], &[]);
        assert!(matches!(
            t.column("year"),
            Err(Error::SchemaMismatch { table, column }) if &*table == "raw" && &*column == "year"
        ));
    }

    #[tokio::test]
    async fn loading_normalizes_conference_codes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(
            &path,
            "meeting,year,status,title\ncvpr,2021,Accept,cvpr\nUnknown,2022,,Other\n",
        )
        .unwrap();
        let t = Table::load(&path, ConferenceNameMap::builtin(), Some("meeting"))
            .await
            .unwrap();
        assert_eq!(t.name(), "raw");
        assert_eq!(t.len(), 2);
        assert_eq!(&*t.rows()[0], &[
            Value::from("CVPR"),
            Value::Int(2021),
            Value::from("Accept"),
            Value::from("cvpr"),
        ]);
        assert_eq!(t.rows()[1][0], Value::from("Unknown"));
        assert_eq!(t.rows()[1][2], Value::Missing);
    }

    #[tokio::test]
    async fn loading_names_the_index_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("node_info.csv");
        std::fs::write(&path, ",count\nMIT,12\n").unwrap();
        let t = Table::load(&path, ConferenceNameMap::builtin(), None).await.unwrap();
        let expected: [Box<str>; 2] = ["node_info".into(), "count".into()];
        assert_eq!(t.columns(), &expected);
    }

    #[tokio::test]
    async fn missing_files_are_unavailable() {
        let dir = TempDir::new().unwrap();
        let result = Table::load(&dir.path().join("nope.csv"), ConferenceNameMap::builtin(), None).await;
        assert!(matches!(result, Err(Error::DataUnavailable { .. })));
    }

    #[tokio::test]
    async fn tables_are_written_as_csv() {
        let t = table("t", &["a", "b"], &[&["x", "1.5"], &["", "2"]]);
        let mut out = Vec::new();
        t.write_csv(&mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "a,b\nx,1.5\n,2\n");
    }
}
