//! Derivations, which turn raw or previously derived tables into chart-ready
//! tables
//!
//! Every derivation is a pure function of its input tables and parameters.
//! Input columns are looked up by name before any processing takes place, so
//! that a malformed input file is reported as a schema mismatch.

pub mod career;
pub mod collaboration;
pub mod overview;
pub mod research;

use crate::{
    error::{Error, Result},
    table::{Table, Value},
    Year,
};
use std::{cmp::Ordering, collections::BTreeMap};

/// Grouping key made of table cells
///
/// Cells are compared with [`Value::total_cmp()`], so that groups come out
/// sorted in a deterministic order.
#[derive(Clone, Debug)]
pub(crate) struct GroupKey(pub Box<[Value]>);
//
impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
//
impl Eq for GroupKey {}
//
impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
//
impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.0.iter())
            .zip(other.0.iter())
            .map(|(a, b)| a.total_cmp(b))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| self.0.len().cmp(&other.0.len()))
    }
}

/// Rows of a table grouped by some columns, in key order
///
/// Rows where one of the key cells is missing are left out, as dataframe
/// grouping usually does.
pub(crate) fn group_rows<'table>(
    table: &'table Table,
    key_columns: &[usize],
) -> BTreeMap<GroupKey, Vec<&'table [Value]>> {
    let mut groups = BTreeMap::<_, Vec<_>>::new();
    for row in table.rows() {
        let key = key_columns.iter().map(|&c| row[c].clone()).collect::<Box<[_]>>();
        if key.iter().all(Value::is_present) {
            groups.entry(GroupKey(key)).or_default().push(&**row);
        }
    }
    groups
}

/// Distinct present values of a column within a group of rows, sorted
pub(crate) fn distinct(rows: &[&[Value]], column: usize) -> Vec<Value> {
    let mut values = (rows.iter())
        .map(|row| row[column].clone())
        .filter(Value::is_present)
        .collect::<Vec<_>>();
    values.sort_by(Value::total_cmp);
    values.dedup_by(|a, b| a.total_cmp(b).is_eq());
    values
}

/// Year recorded in some cell, if any
pub(crate) fn year(table: &Table, row: &[Value], column: usize) -> Result<Option<Year>> {
    let not_a_year = || Error::NotNumeric {
        table: table.name().into(),
        column: table.columns()[column].clone(),
        value: row[column].to_string().into(),
    };
    match &row[column] {
        Value::Missing => Ok(None),
        v => (v.as_i64())
            .and_then(|y| Year::try_from(y).ok())
            .map(Some)
            .ok_or_else(not_a_year),
    }
}

/// Year as a categorical chart axis value
pub(crate) fn year_label(year: &Value) -> Value {
    match year {
        Value::Missing => Value::Missing,
        other => Value::from(other.to_string().as_str()),
    }
}

/// Count as a table cell
pub(crate) fn count(n: usize) -> Value {
    Value::Int(n as i64)
}
