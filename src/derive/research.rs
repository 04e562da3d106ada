//! Derivations behind the research page, which compares numeric paper
//! attributes

use super::year;
use crate::{
    config::PaperColumns,
    error::Result,
    table::{Table, Value},
    Year,
};

/// Attributes that the correlation matrix shows unless told otherwise
pub const DEFAULT_CORRELATION_ATTRIBUTES: &[&str] = &[
    "gs_citation",
    "rating_avg",
    "confidence_avg",
    "replies_avg",
    "authors#_avg",
    "correctness_avg",
    "presentation_avg",
    "recommendation_avg",
    "technical_novelty_avg",
    "empirical_novelty_avg",
    "soundness_avg",
    "contribution_avg",
];

/// Pairwise Pearson correlation of some attributes over one conference
///
/// Output columns are `Attribute` followed by the requested attributes, and
/// there is one row per requested attribute. Each coefficient is computed over
/// the records where both attributes are present. Coefficients that are
/// undefined, because there are fewer than two such records or one of the
/// attributes does not vary, are missing.
pub fn correlation(
    papers: &Table,
    columns: &PaperColumns,
    conference: &str,
    attributes: &[&str],
) -> Result<Table> {
    let conf_col = papers.column(&columns.conference)?;
    let attr_cols = (attributes.iter())
        .map(|attr| papers.column(attr))
        .collect::<Result<Vec<_>>>()?;

    // Extract the attribute values of the conference's records
    let mut samples = Vec::new();
    for row in papers.rows() {
        if row[conf_col].as_text() != Some(conference) {
            continue;
        }
        let sample = (attr_cols.iter())
            .map(|&c| papers.numeric(row, c))
            .collect::<Result<Vec<_>>>()?;
        samples.push(sample);
    }

    // Compute the upper triangle of the matrix, then mirror it
    let n = attributes.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let pairs = (samples.iter()).filter_map(|sample| Some((sample[i]?, sample[j]?)));
            let r = pearson(pairs, i == j);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    let mut output = Table::new(
        "corr_data",
        std::iter::once("Attribute").chain(attributes.iter().copied()),
    );
    for (attr, coefficients) in attributes.iter().zip(matrix) {
        let row = std::iter::once(Value::from(*attr))
            .chain(coefficients.into_iter().map(Value::from))
            .collect::<Vec<_>>();
        output.push(row);
    }
    Ok(output)
}

/// Pearson correlation coefficient of some pairs of observations
///
/// The self-correlation of a varying attribute is exactly 1.
fn pearson(pairs: impl Iterator<Item = (f64, f64)> + Clone, same_attribute: bool) -> Option<f64> {
    let (count, sum_x, sum_y) = (pairs.clone()).fold((0usize, 0.0, 0.0), |(n, sx, sy), (x, y)| {
        (n + 1, sx + x, sy + y)
    });
    if count < 2 {
        return None;
    }
    let (mean_x, mean_y) = (sum_x / count as f64, sum_y / count as f64);
    let (sxx, syy, sxy) = pairs.fold((0.0, 0.0, 0.0), |(sxx, syy, sxy), (x, y)| {
        let (dx, dy) = (x - mean_x, y - mean_y);
        (sxx + dx * dx, syy + dy * dy, sxy + dx * dy)
    });
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    if same_attribute {
        return Some(1.0);
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Distribution of an attribute across paper statuses, for one conference and
/// range of years
///
/// Output columns are `Status, Title, <attribute>`. Records without a status
/// are left out.
pub fn distribution_by_status(
    papers: &Table,
    columns: &PaperColumns,
    conference: &str,
    attribute: &str,
    start: Year,
    end: Year,
) -> Result<Table> {
    let conf_col = papers.column(&columns.conference)?;
    let year_col = papers.column(&columns.year)?;
    let status = papers.column(&columns.status)?;
    let title = papers.column(&columns.title)?;
    let attr = papers.column(attribute)?;
    let mut output = Table::new("violin_data", ["Status", "Title", attribute]);
    for row in papers.rows() {
        if row[conf_col].as_text() != Some(conference) || !row[status].is_present() {
            continue;
        }
        if year(papers, row, year_col)?.is_some_and(|y| (start..=end).contains(&y)) {
            output.push([row[status].clone(), row[title].clone(), row[attr].clone()]);
        }
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Error, table::tests::table};

    fn papers() -> Table {
        table(
            "numeric_raw",
            &["meeting", "year", "status", "title", "rating_avg", "gs_citation", "flat", "notes"],
            &[
                &["ICLR", "2020", "Accept", "a", "6", "100", "1", "x"],
                &["ICLR", "2020", "Reject", "b", "3", "10", "1", ""],
                &["ICLR", "2021", "Accept", "c", "8", "", "1", ""],
                &["ICLR", "2021", "", "d", "5", "40", "1", ""],
                &["CVPR", "2021", "Accept", "e", "1", "1000", "1", ""],
            ],
        )
    }

    fn coefficient(matrix: &Table, row: usize, col: usize) -> Option<f64> {
        matrix.rows()[row][col + 1].as_f64()
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let attributes = ["rating_avg", "gs_citation", "flat"];
        let matrix = correlation(&papers(), &PaperColumns::default(), "ICLR", &attributes).unwrap();
        assert_eq!(matrix.len(), 3);
        assert_eq!(coefficient(&matrix, 0, 0), Some(1.0));
        assert_eq!(coefficient(&matrix, 1, 1), Some(1.0));
        for i in 0..3 {
            for j in 0..3 {
                assert_eq!(coefficient(&matrix, i, j), coefficient(&matrix, j, i));
            }
        }
        // "flat" never varies, so its coefficients are undefined
        assert_eq!(matrix.rows()[2][3], Value::Missing);
        assert_eq!(matrix.rows()[0][3], Value::Missing);

        // rating/citation pairs are (6, 100), (3, 10) and (5, 40)
        let r = coefficient(&matrix, 0, 1).unwrap();
        let expected = 13.0 / 14.0;
        assert!((r - expected).abs() < 1e-9, "{r} != {expected}");
    }

    #[test]
    fn empty_attribute_selection_gives_empty_matrix() {
        let matrix = correlation(&papers(), &PaperColumns::default(), "ICLR", &[]).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.columns().len(), 1);
    }

    #[test]
    fn correlation_rejects_bad_attributes() {
        let result = correlation(&papers(), &PaperColumns::default(), "ICLR", &["missing"]);
        assert!(matches!(result, Err(Error::SchemaMismatch { .. })));
        let result = correlation(&papers(), &PaperColumns::default(), "ICLR", &["notes"]);
        assert!(matches!(result, Err(Error::NotNumeric { value, .. }) if &*value == "x"));
    }

    #[test]
    fn distribution_keeps_records_with_status() {
        let dist = distribution_by_status(
            &papers(),
            &PaperColumns::default(),
            "ICLR",
            "rating_avg",
            2021,
            2021,
        )
        .unwrap();
        let expected = table("violin_data", &["Status", "Title", "rating_avg"], &[&["Accept", "c", "8"]]);
        assert_eq!(dist, expected);
    }
}
