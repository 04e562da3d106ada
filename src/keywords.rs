//! Keyword trend images
//!
//! Keyword clouds are pre-rendered images, one per conference and year. They
//! are listed in a manifest CSV file with `conference, year, file` columns,
//! where relative file paths are resolved with respect to the manifest's
//! directory.

use crate::{
    conference::ConferenceNameMap,
    derive,
    error::{Error, Result},
    table::{Table, Value},
    Year,
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// Manifest column holding conference codes
const CONFERENCE: &str = "conference";

/// Manifest column holding years
const YEAR: &str = "year";

/// Manifest column holding image paths
const FILE: &str = "file";

/// How the user may pick the year of a conference's keyword cloud
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum KeywordYears {
    /// A single image is available
    Fixed(Year),

    /// Several images are available, for these sorted years
    Options(Box<[Year]>),
}

/// Index of the available keyword clouds
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct KeywordIndex(BTreeMap<Box<str>, BTreeMap<Year, PathBuf>>);
//
impl KeywordIndex {
    /// Load the manifest
    pub async fn load(manifest: &Path, names: &ConferenceNameMap) -> Result<Self> {
        let table = Table::load(manifest, names, Some(CONFERENCE)).await?;
        let base = manifest.parent().unwrap_or(Path::new(""));
        Self::from_manifest(&table, base)
    }

    /// Index a manifest table, resolving relative paths against `base`
    pub fn from_manifest(manifest: &Table, base: &Path) -> Result<Self> {
        let conference = manifest.column(CONFERENCE)?;
        let year_col = manifest.column(YEAR)?;
        let file = manifest.column(FILE)?;
        let mut index = BTreeMap::<Box<str>, BTreeMap<Year, PathBuf>>::new();
        for row in manifest.rows() {
            let (Value::Text(conf), Some(year)) = (&row[conference], derive::year(manifest, row, year_col)?) else {
                continue;
            };
            if !row[file].is_present() {
                return Err(Error::SchemaMismatch {
                    table: manifest.name().into(),
                    column: FILE.into(),
                });
            }
            let path = base.join(row[file].to_string());
            if index.entry(conf.clone()).or_default().insert(year, path).is_some() {
                log::warn!("Keyword manifest lists {conf} {year} more than once, keeping the last entry");
            }
        }
        Ok(Self(index))
    }

    /// Years for which a conference has a keyword cloud, if any
    pub fn years(&self, conference: &str) -> Option<KeywordYears> {
        let years = self.0.get(conference)?.keys().copied().collect::<Box<[_]>>();
        match *years {
            [] => None,
            [year] => Some(KeywordYears::Fixed(year)),
            _ => Some(KeywordYears::Options(years)),
        }
    }

    /// Image of some conference and year, if available
    pub fn image(&self, conference: &str, year: Year) -> Option<&Path> {
        self.0.get(conference)?.get(&year).map(PathBuf::as_path)
    }

    /// Table of available images, optionally restricted to one conference
    ///
    /// Output columns are `Conference, Year, Image`, sorted by conference then
    /// year.
    pub fn table(&self, conference: Option<&str>) -> Table {
        let mut output = Table::new("wordcloud", ["Conference", "Year", "Image"]);
        for (conf, images) in &self.0 {
            if conference.is_some_and(|c| c != &**conf) {
                continue;
            }
            for (year, path) in images {
                output.push([
                    Value::from(&**conf),
                    Value::from(i64::from(*year)),
                    Value::from(path.display().to_string().as_str()),
                ]);
            }
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;
    use tempfile::TempDir;

    fn manifest() -> Table {
        table(
            "manifest",
            &[CONFERENCE, YEAR, FILE],
            &[
                &["ICLR", "2022", "iclr_2022.png"],
                &["ICLR", "2020", "iclr_2020.png"],
                &["CVPR", "2021", "/abs/cvpr_2021.png"],
                &["", "2021", "orphan.png"],
            ],
        )
    }

    #[test]
    fn years_are_sorted_and_single_years_fixed() {
        let index = KeywordIndex::from_manifest(&manifest(), Path::new("clouds")).unwrap();
        assert_eq!(
            index.years("ICLR"),
            Some(KeywordYears::Options(vec![2020, 2022].into()))
        );
        assert_eq!(index.years("CVPR"), Some(KeywordYears::Fixed(2021)));
        assert_eq!(index.years("ACL"), None);
    }

    #[test]
    fn images_are_resolved_against_the_manifest() {
        let index = KeywordIndex::from_manifest(&manifest(), Path::new("clouds")).unwrap();
        assert_eq!(
            index.image("ICLR", 2020),
            Some(Path::new("clouds/iclr_2020.png"))
        );
        assert_eq!(index.image("CVPR", 2021), Some(Path::new("/abs/cvpr_2021.png")));
        assert_eq!(index.image("ICLR", 2021), None);
        assert_eq!(index.table(Some("ICLR")).len(), 2);
        assert_eq!(index.table(None).len(), 3);
    }

    #[tokio::test]
    async fn manifest_codes_are_normalized() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("manifest.csv");
        std::fs::write(&path, "conference,year,file\nnips,2019,nips_2019.png\n").unwrap();
        let index = KeywordIndex::load(&path, ConferenceNameMap::builtin()).await.unwrap();
        assert_eq!(index.years("NeurIPS"), Some(KeywordYears::Fixed(2019)));
        assert_eq!(
            index.image("NeurIPS", 2019),
            Some(dir.path().join("nips_2019.png").as_path())
        );
    }
}
