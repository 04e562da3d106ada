//! Derivations behind the overview page

use super::{count, group_rows, year, year_label};
use crate::{
    config::PaperColumns,
    error::{Error, Result},
    table::{Table, Value},
    Year, ABSENT_YEAR,
};
use std::collections::BTreeMap;

/// First and last year of each conference
///
/// Output columns are `Conference, min, max`, with one row per conference.
/// Records without a year are ignored.
pub fn time_ranges(papers: &Table, columns: &PaperColumns) -> Result<Table> {
    let conference = papers.column(&columns.conference)?;
    let year_col = papers.column(&columns.year)?;
    let mut ranges = BTreeMap::<&str, (Year, Year)>::new();
    for row in papers.rows() {
        let (Some(conf), Some(year)) = (row[conference].as_text(), year(papers, row, year_col)?) else {
            continue;
        };
        ranges
            .entry(conf)
            .and_modify(|(min, max)| {
                *min = (*min).min(year);
                *max = (*max).max(year);
            })
            .or_insert((year, year));
    }

    let mut output = Table::new("conf_time_data", ["Conference", "min", "max"]);
    for (conf, (min, max)) in ranges {
        output.push([Value::from(conf), Value::from(i64::from(min)), Value::from(i64::from(max))]);
    }
    Ok(output)
}

/// How the user may pick years for a conference
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum YearSelector {
    /// The conference has data for a single year, so there is nothing to pick
    Fixed(Year),

    /// Any sub-range of this range may be picked
    Range { min: Year, max: Year },
}
//
impl YearSelector {
    /// Selector for a range of years
    pub fn from_range(min: Year, max: Year) -> Self {
        debug_assert!(min <= max, "year ranges should not be reversed");
        if min >= max {
            Self::Fixed(min)
        } else {
            Self::Range { min, max }
        }
    }

    /// Look up the selector of some conference in the output of
    /// [`time_ranges()`]
    pub fn lookup(time_ranges: &Table, conference: &str) -> Result<Self> {
        let conf_col = time_ranges.column("Conference")?;
        let min_col = time_ranges.column("min")?;
        let max_col = time_ranges.column("max")?;
        let row = (time_ranges.rows().iter())
            .find(|row| row[conf_col].as_text() == Some(conference))
            .ok_or_else(|| Error::UnknownConference(conference.into()))?;
        match (year(time_ranges, row, min_col)?, year(time_ranges, row, max_col)?) {
            (Some(min), Some(max)) => Ok(Self::from_range(min, max)),
            _ => Err(Error::UnknownConference(conference.into())),
        }
    }

    /// Default selection, which covers every year
    pub fn full(self) -> (Year, Year) {
        match self {
            Self::Fixed(year) => (year, year),
            Self::Range { min, max } => (min, max),
        }
    }

    /// Turn a user request into a valid selection
    ///
    /// Unspecified bounds default to the full range, and requests are clamped
    /// to the available years. A fixed selector ignores the request.
    pub fn select(self, start: Option<Year>, end: Option<Year>) -> (Year, Year) {
        let (min, max) = self.full();
        let start = start.unwrap_or(min).clamp(min, max);
        let end = end.unwrap_or(max).clamp(min, max);
        (start.min(end), start.max(end))
    }
}

/// Number of records per conference and status
///
/// Output columns are `<conference>, <status>, count`, sorted by decreasing
/// count. Records without a status are left out.
pub fn status_counts(papers: &Table, columns: &PaperColumns) -> Result<Table> {
    let conference = papers.column(&columns.conference)?;
    let status = papers.column(&columns.status)?;
    let mut output = Table::new(
        "sunburst_data",
        [&*columns.conference, &*columns.status, "count"],
    );
    for (key, rows) in group_rows(papers, &[conference, status]) {
        output.push([key.0[0].clone(), key.0[1].clone(), count(rows.len())]);
    }
    // Groups come out sorted by key, so a stable sort keeps ties in key order
    output.sort_by(|a, b| b[2].total_cmp(&a[2]));
    Ok(output)
}

/// Fraction of the records of each conference where each attribute is present
///
/// Output columns are `Conference` followed by every other column of the
/// paper table, with one row per conference.
pub fn availability_ratios(papers: &Table, columns: &PaperColumns) -> Result<Table> {
    let conference = papers.column(&columns.conference)?;
    let attributes = (0..papers.columns().len())
        .filter(|&c| c != conference)
        .collect::<Vec<_>>();
    let mut output = Table::new(
        "attribute_data",
        std::iter::once("Conference").chain(attributes.iter().map(|&c| &*papers.columns()[c])),
    );
    for (key, rows) in group_rows(papers, &[conference]) {
        let total = rows.len() as f64;
        let row = std::iter::once(key.0[0].clone())
            .chain(attributes.iter().map(|&attr| {
                let present = rows.iter().filter(|row| row[attr].is_present()).count();
                Value::Float(present as f64 / total)
            }))
            .collect::<Vec<_>>();
        output.push(row);
    }
    Ok(output)
}

/// Which attributes are available for each record of a conference, over some
/// range of years
///
/// Records are sorted by year, and each becomes one output column named after
/// its position. Each attribute becomes one row, whose cells hold the record's
/// year when the attribute is present, and [`ABSENT_YEAR`] otherwise.
/// Attributes that no selected record has are dropped.
pub fn attribute_years(
    papers: &Table,
    columns: &PaperColumns,
    conference: &str,
    start: Year,
    end: Year,
) -> Result<Table> {
    let conf_col = papers.column(&columns.conference)?;
    let year_col = papers.column(&columns.year)?;
    let mut records = Vec::new();
    for row in papers.rows() {
        if row[conf_col].as_text() != Some(conference) {
            continue;
        }
        if let Some(year) = year(papers, row, year_col)?.filter(|y| (start..=end).contains(y)) {
            records.push((year, row));
        }
    }
    records.sort_by_key(|(year, _)| *year);

    let mut output = Table::new(
        "conf_attribute_data",
        std::iter::once("Attribute".to_owned()).chain((0..records.len()).map(|idx| idx.to_string())),
    );
    for (attr, name) in papers.columns().iter().enumerate() {
        if attr == conf_col || attr == year_col {
            continue;
        }
        if !records.iter().any(|(_, row)| row[attr].is_present()) {
            continue;
        }
        let row = std::iter::once(Value::from(&**name))
            .chain(records.iter().map(|(year, row)| {
                let year = if row[attr].is_present() { *year } else { ABSENT_YEAR };
                Value::from(i64::from(year))
            }))
            .collect::<Vec<_>>();
        output.push(row);
    }
    Ok(output)
}

/// Number of records per conference and year
///
/// Output columns are `Conference, Year, Count`. Years are text, as they are
/// meant to be used as a categorical axis.
pub fn annual_counts(papers: &Table, columns: &PaperColumns) -> Result<Table> {
    let conference = papers.column(&columns.conference)?;
    let year = papers.column(&columns.year)?;
    let mut output = Table::new("count_data", ["Conference", "Year", "Count"]);
    for (key, rows) in group_rows(papers, &[conference, year]) {
        output.push([key.0[0].clone(), year_label(&key.0[1]), count(rows.len())]);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;

    fn papers() -> Table {
        table(
            "raw",
            &["meeting", "year", "status", "title", "rating"],
            &[
                &["ICLR", "2021", "Accept", "p1", "5"],
                &["ICLR", "2019", "Reject", "p2", ""],
                &["ICLR", "2020", "Accept", "p3", "6"],
                &["CVPR", "2022", "", "p4", ""],
                &["CVPR", "2022", "Accept", "p5", ""],
            ],
        )
    }

    #[test]
    fn time_ranges_span_all_years() {
        let ranges = time_ranges(&papers(), &PaperColumns::default()).unwrap();
        let expected = table("conf_time_data", &["Conference", "min", "max"], &[
            &["CVPR", "2022", "2022"],
            &["ICLR", "2019", "2021"],
        ]);
        assert_eq!(ranges, expected);
    }

    #[test]
    fn degenerate_ranges_become_fixed_selectors() {
        let ranges = time_ranges(&papers(), &PaperColumns::default()).unwrap();
        let cvpr = YearSelector::lookup(&ranges, "CVPR").unwrap();
        assert_eq!(cvpr, YearSelector::Fixed(2022));
        assert_eq!(cvpr.select(Some(1990), Some(2030)), (2022, 2022));
        let iclr = YearSelector::lookup(&ranges, "ICLR").unwrap();
        assert_eq!(iclr, YearSelector::Range { min: 2019, max: 2021 });
        assert_eq!(iclr.select(Some(2020), None), (2020, 2021));
        assert_eq!(iclr.select(Some(2030), Some(1990)), (2019, 2021));
        assert!(matches!(
            YearSelector::lookup(&ranges, "ACL"),
            Err(Error::UnknownConference(_))
        ));
    }

    #[test]
    fn status_counts_skip_missing_status() {
        let counts = status_counts(&papers(), &PaperColumns::default()).unwrap();
        let expected = table("sunburst_data", &["meeting", "status", "count"], &[
            &["ICLR", "Accept", "2"],
            &["CVPR", "Accept", "1"],
            &["ICLR", "Reject", "1"],
        ]);
        assert_eq!(counts, expected);
    }

    #[test]
    fn availability_ratios_are_fractions() {
        let ratios = availability_ratios(&papers(), &PaperColumns::default()).unwrap();
        assert_eq!(&*ratios.columns()[0], "Conference");
        assert_eq!(ratios.len(), 2);
        let rating = ratios.column("rating").unwrap();
        let status = ratios.column("status").unwrap();
        assert_eq!(ratios.rows()[0][rating], Value::Float(0.0));
        assert_eq!(ratios.rows()[0][status], Value::Float(0.5));
        assert_eq!(ratios.rows()[1][rating], Value::Float(2.0 / 3.0));
        for row in ratios.rows() {
            for cell in &row[1..] {
                let ratio = cell.as_f64().unwrap();
                assert!((0.0..=1.0).contains(&ratio));
            }
        }
    }

    #[test]
    fn attribute_years_drop_absent_attributes() {
        let years = attribute_years(&papers(), &PaperColumns::default(), "ICLR", 2020, 2021).unwrap();
        let expected = table("conf_attribute_data", &["Attribute", "0", "1"], &[
            &["status", "2020", "2021"],
            &["title", "2020", "2021"],
            &["rating", "2020", "2021"],
        ]);
        assert_eq!(years, expected);

        let years = attribute_years(&papers(), &PaperColumns::default(), "ICLR", 2019, 2019).unwrap();
        assert_eq!(years.len(), 2);
        let cvpr = attribute_years(&papers(), &PaperColumns::default(), "CVPR", 2022, 2022).unwrap();
        let status = &cvpr.rows()[0];
        assert_eq!(&*status[0].to_string(), "status");
        assert_eq!(status[1], Value::Int(i64::from(ABSENT_YEAR)));
        assert_eq!(status[2], Value::Int(2022));
    }

    #[test]
    fn empty_year_selections_give_empty_tables() {
        let years = attribute_years(&papers(), &PaperColumns::default(), "ICLR", 2030, 2031).unwrap();
        assert_eq!(years.columns().len(), 1);
        assert_eq!(&*years.columns()[0], "Attribute");
        assert!(years.is_empty());
    }

    #[test]
    fn annual_counts_use_text_years() {
        let counts = annual_counts(&papers(), &PaperColumns::default()).unwrap();
        assert_eq!(counts.len(), 4);
        assert_eq!(&*counts.rows()[0], &[Value::from("CVPR"), Value::from("2022"), Value::Int(2)]);
        assert_eq!(&*counts.rows()[1], &[Value::from("ICLR"), Value::from("2019"), Value::Int(1)]);
    }

    #[test]
    fn missing_columns_are_reported() {
        let t = table("raw", &["meeting"], &[&["ICLR"]]);
        assert!(matches!(
            time_ranges(&t, &PaperColumns::default()),
            Err(Error::SchemaMismatch { column, .. }) if &*column == "year"
        ));
    }
}
