//! Derivations behind the scholar career page
//!
//! These work on two precomputed author tables. The first-author table has
//! one row per (author, conference, year) with the career statistics of the
//! author at that point, and the author table has one row per (author,
//! conference) with the delay before the author's first first-author paper.

use super::{count, distinct, group_rows, year_label, GroupKey};
use crate::{
    error::Result,
    table::{Table, Value},
};
use clap::ValueEnum;
use std::collections::BTreeMap;

/// Author name column of both author tables
pub const AUTHOR: &str = "author";

/// Conference column of both author tables
pub const MEETING: &str = "meeting";

/// Years since the author's first publication
pub const ELAPSED: &str = "elapsed";

/// Publication year
pub const YEAR: &str = "year";

/// Number of distinct conferences the author published in so far
pub const UNIQUE_MEETINGS: &str = "meeting_unique_count_upto_elapsed";

/// Number of papers of the author that year
pub const PAPER_COUNT: &str = "paper_count";

/// Years between first publication and first first-author paper
pub const INTERVAL: &str = "interval";

/// Human-readable label of [`ELAPSED`]
const ELAPSED_LABEL: &str = "Years Since First Publication";

/// Human-readable label of [`PAPER_COUNT`]
const PAPER_COUNT_LABEL: &str = "Annual Paper Count";

/// Chart of the scholar career page
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, ValueEnum)]
pub enum CareerMetric {
    /// Distinct conferences published in, by years since first publication
    DistinctConferences,

    /// Papers per year, by years since first publication
    AnnualPapers,

    /// Papers per year, by calendar year
    PaperCounts,

    /// Delay before the first first-author paper, by conference
    FirstAuthorInterval,

    /// Mean number of papers per scholar, by conference and year
    PublicationRate,
}
//
impl CareerMetric {
    /// Every career chart, in page order
    pub const ALL: [Self; 5] = [
        Self::DistinctConferences,
        Self::AnnualPapers,
        Self::PaperCounts,
        Self::FirstAuthorInterval,
        Self::PublicationRate,
    ];

    /// Name of the derived table
    pub fn name(self) -> &'static str {
        match self {
            Self::DistinctConferences => "unique_meeting",
            Self::AnnualPapers => "annual_paper",
            Self::PaperCounts => "paper_count",
            Self::FirstAuthorInterval => "interval",
            Self::PublicationRate => "paper_count_data",
        }
    }

    /// Title of the chart
    pub fn title(self) -> &'static str {
        match self {
            Self::DistinctConferences => "Conference Diversity Over Academic Career Span",
            Self::AnnualPapers => "Publication Output Over Academic Career Span",
            Self::PaperCounts => "Annual Publication Output by Scholar",
            Self::FirstAuthorInterval => {
                "Time Gap Between First Publication and First First-Authorship Across Conferences"
            }
            Self::PublicationRate => "Trends in Per-Scholar Publication Rates Across Conferences",
        }
    }

    /// Truth that this chart is computed from the author table rather than
    /// the first-author table
    pub fn uses_author_info(self) -> bool {
        self == Self::FirstAuthorInterval
    }

    /// Compute the chart's table from the appropriate author table
    pub fn derive(self, input: &Table) -> Result<Table> {
        match self {
            Self::DistinctConferences => distinct_conferences(input),
            Self::AnnualPapers => annual_papers(input),
            Self::PaperCounts => paper_counts(input),
            Self::FirstAuthorInterval => first_author_intervals(input),
            Self::PublicationRate => publication_rates(input),
        }
    }
}

/// Distinct values of the number of conferences published in, per years since
/// first publication and author
///
/// Output columns are `Years Since First Publication, Author, Number of
/// Distinct Conferences Published In`, the former being text.
pub fn distinct_conferences(first_author_info: &Table) -> Result<Table> {
    let elapsed = first_author_info.column(ELAPSED)?;
    let author = first_author_info.column(AUTHOR)?;
    let unique = first_author_info.column(UNIQUE_MEETINGS)?;
    let mut output = Table::new(
        "unique_meeting",
        [ELAPSED_LABEL, "Author", "Number of Distinct Conferences Published In"],
    );
    for (key, rows) in group_rows(first_author_info, &[elapsed, author]) {
        for value in distinct(&rows, unique) {
            output.push([year_label(&key.0[0]), key.0[1].clone(), value]);
        }
    }
    Ok(output)
}

/// Number of records per author and years since first publication
///
/// Output columns are `Author, Years Since First Publication, Annual Paper
/// Count`.
pub fn annual_papers(first_author_info: &Table) -> Result<Table> {
    let author = first_author_info.column(AUTHOR)?;
    let elapsed = first_author_info.column(ELAPSED)?;
    let mut output = Table::new("annual_paper", ["Author", ELAPSED_LABEL, PAPER_COUNT_LABEL]);
    for (key, rows) in group_rows(first_author_info, &[author, elapsed]) {
        output.push([key.0[0].clone(), key.0[1].clone(), count(rows.len())]);
    }
    Ok(output)
}

/// Distinct annual paper counts per year and author
///
/// Output columns are `Year, Author, Annual Paper Count`, the year being text.
pub fn paper_counts(first_author_info: &Table) -> Result<Table> {
    let year = first_author_info.column(YEAR)?;
    let author = first_author_info.column(AUTHOR)?;
    let paper_count = first_author_info.column(PAPER_COUNT)?;
    let mut output = Table::new("paper_count", ["Year", "Author", PAPER_COUNT_LABEL]);
    for (key, rows) in group_rows(first_author_info, &[year, author]) {
        for value in distinct(&rows, paper_count) {
            output.push([year_label(&key.0[0]), key.0[1].clone(), value]);
        }
    }
    Ok(output)
}

/// Distinct delays before the first first-author paper, per conference and
/// author
///
/// Output columns are `Conference, Author, Years Between First Publication and
/// First First-Author Paper`.
pub fn first_author_intervals(author_info: &Table) -> Result<Table> {
    let meeting = author_info.column(MEETING)?;
    let author = author_info.column(AUTHOR)?;
    let interval = author_info.column(INTERVAL)?;
    let mut output = Table::new(
        "interval",
        [
            "Conference",
            "Author",
            "Years Between First Publication and First First-Author Paper",
        ],
    );
    for (key, rows) in group_rows(author_info, &[meeting, author]) {
        for value in distinct(&rows, interval) {
            output.push([key.0[0].clone(), key.0[1].clone(), value]);
        }
    }
    Ok(output)
}

/// Mean number of papers per scholar, per year and conference
///
/// Each record is weighted by the number of known paper counts of its
/// (year, author, conference) group, and these weights are averaged over the
/// records of each (year, conference) pair. Output columns are `Year,
/// Conference, Number of Paper`.
pub fn publication_rates(first_author_info: &Table) -> Result<Table> {
    let year = first_author_info.column(YEAR)?;
    let author = first_author_info.column(AUTHOR)?;
    let meeting = first_author_info.column(MEETING)?;
    let paper_count = first_author_info.column(PAPER_COUNT)?;

    let scholar_counts = group_rows(first_author_info, &[year, author, meeting])
        .into_iter()
        .map(|(key, rows)| {
            let known = rows.iter().filter(|row| row[paper_count].is_present()).count();
            (key, known)
        })
        .collect::<BTreeMap<_, _>>();

    let mut output = Table::new("paper_count_data", ["Year", "Conference", "Number of Paper"]);
    for (key, rows) in group_rows(first_author_info, &[year, meeting]) {
        let counts = (rows.iter())
            .filter(|row| row[author].is_present())
            .filter_map(|row| {
                let scholar = GroupKey(Box::new([
                    row[year].clone(),
                    row[author].clone(),
                    row[meeting].clone(),
                ]));
                scholar_counts.get(&scholar).copied()
            })
            .collect::<Vec<_>>();
        let mean = if counts.is_empty() {
            Value::Missing
        } else {
            Value::float(counts.iter().sum::<usize>() as f64 / counts.len() as f64)
        };
        output.push([key.0[0].clone(), key.0[1].clone(), mean]);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, table::tests::table};

    fn first_author_info() -> Table {
        table(
            "first_author_info",
            &[AUTHOR, MEETING, YEAR, ELAPSED, PAPER_COUNT, UNIQUE_MEETINGS],
            &[
                &["alice", "ICLR", "2020", "0", "2", "1"],
                &["alice", "ICLR", "2020", "0", "2", "1"],
                &["alice", "CVPR", "2021", "1", "1", "2"],
                &["bob", "ICLR", "2020", "0", "1", "1"],
                &["bob", "ICLR", "2021", "1", "", "1"],
                &["", "ICLR", "2021", "3", "4", "1"],
            ],
        )
    }

    fn texts(table: &Table) -> Vec<Vec<String>> {
        (table.rows().iter())
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn distinct_conferences_are_listed_per_author() {
        let output = distinct_conferences(&first_author_info()).unwrap();
        assert_eq!(
            texts(&output),
            [
                ["0", "alice", "1"],
                ["0", "bob", "1"],
                ["1", "alice", "2"],
                ["1", "bob", "1"],
            ]
        );
        assert_eq!(output.rows()[0][0], Value::from("0"));
    }

    #[test]
    fn annual_papers_count_records() {
        let output = annual_papers(&first_author_info()).unwrap();
        assert_eq!(
            texts(&output),
            [
                ["alice", "0", "2"],
                ["alice", "1", "1"],
                ["bob", "0", "1"],
                ["bob", "1", "1"],
            ]
        );
    }

    #[test]
    fn paper_counts_skip_unknown_counts() {
        let output = paper_counts(&first_author_info()).unwrap();
        assert_eq!(
            texts(&output),
            [["2020", "alice", "2"], ["2020", "bob", "1"], ["2021", "alice", "1"]]
        );
    }

    #[test]
    fn intervals_are_listed_per_conference() {
        let author_info = table(
            "author_info",
            &[AUTHOR, MEETING, INTERVAL],
            &[
                &["alice", "ICLR", "2"],
                &["alice", "ICLR", "2"],
                &["alice", "ICLR", "3"],
                &["bob", "CVPR", "0"],
            ],
        );
        let output = CareerMetric::FirstAuthorInterval.derive(&author_info).unwrap();
        assert_eq!(
            texts(&output),
            [["CVPR", "bob", "0"], ["ICLR", "alice", "2"], ["ICLR", "alice", "3"]]
        );
    }

    #[test]
    fn publication_rates_average_scholar_groups() {
        let output = publication_rates(&first_author_info()).unwrap();
        // 2020 ICLR: alice's two records weigh 2 each and bob's record weighs
        // 1. 2021 ICLR: bob has no known paper count, and the anonymous record
        // is left out.
        let iclr_2020 = (5.0f64 / 3.0).to_string();
        assert_eq!(
            texts(&output),
            [
                ["2020", "ICLR", iclr_2020.as_str()],
                ["2021", "CVPR", "1"],
                ["2021", "ICLR", "0"],
            ]
        );
    }

    #[test]
    fn every_metric_checks_its_schema() {
        let empty = table("first_author_info", &[AUTHOR], &[]);
        for metric in CareerMetric::ALL {
            assert!(matches!(metric.derive(&empty), Err(Error::SchemaMismatch { .. })));
        }
    }
}
