//! Dashboard configuration

use crate::Args;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

/// Final process configuration
///
/// This is the result of combining digested [`Args`] with the optional
/// on-disk layout description. Please refer to [`Args`] to know more about
/// common fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Directory where input data files are looked up
    pub data_dir: PathBuf,

    /// Directory where derived table artifacts are stored
    pub cache_dir: PathBuf,

    /// Names of the input files and of their columns
    pub layout: DataLayout,

    /// Recompute derived tables instead of trusting the cache
    pub refresh: bool,
}
//
impl Config {
    /// Determine process configuration from CLI arguments
    pub(crate) fn new(args: &Args) -> crate::Result<Arc<Self>> {
        let mut config = Self::with_data_dir(&args.data_dir);
        if let Some(path) = &args.layout {
            config.layout = DataLayout::load(path)?;
        }
        if let Some(cache_dir) = &args.cache_dir {
            config.cache_dir.clone_from(cache_dir);
        }
        config.refresh = args.refresh;
        Ok(Arc::new(config))
    }

    /// Configuration rooted at some data directory, with default settings
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            cache_dir: data_dir.join("cache"),
            data_dir,
            layout: DataLayout::default(),
            refresh: false,
        }
    }

    /// Location of an input file
    pub fn input(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

/// Where input data lives within the data directory, and how it is organized
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct DataLayout {
    /// Paper-level records
    pub papers: Box<str>,

    /// Variant of `papers` with extra numeric-only columns
    pub numeric_papers: Box<str>,

    /// Conference × attribute presence matrix of the overview heatmap
    pub availability: Box<str>,

    /// Per-author yearly records, with elapsed career time
    pub first_author_info: Box<str>,

    /// Per-author, per-conference first-authorship intervals
    pub author_info: Box<str>,

    /// Institution collaboration edge list
    pub collaboration_edges: Box<str>,

    /// Institution metadata, indexed by institution name
    pub collaboration_nodes: Box<str>,

    /// Manifest of keyword trend images
    pub keyword_manifest: Box<str>,

    /// Rendered collaboration network
    pub network_output: Box<str>,

    /// Column names of the paper tables
    pub columns: PaperColumns,
}
//
impl DataLayout {
    /// Load a layout description from a JSON file
    ///
    /// Fields which the file does not mention keep their default value.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let json = std::fs::read(path)
            .with_context(|| format!("reading data layout from {}", path.display()))?;
        serde_json::from_slice(&json)
            .with_context(|| format!("decoding data layout from {}", path.display()))
    }
}
//
impl Default for DataLayout {
    fn default() -> Self {
        Self {
            papers: "raw.csv".into(),
            numeric_papers: "numeric_raw.csv".into(),
            availability: "available.csv".into(),
            first_author_info: "first_author_info.csv".into(),
            author_info: "author_info.csv".into(),
            collaboration_edges: "adjmat_greater_than_50.csv".into(),
            collaboration_nodes: "node_info.csv".into(),
            keyword_manifest: "wordcloud/manifest.csv".into(),
            network_output: "graph.dot".into(),
            columns: PaperColumns::default(),
        }
    }
}

/// Names of the paper table columns that derivations rely on
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct PaperColumns {
    pub conference: Box<str>,
    pub year: Box<str>,
    pub status: Box<str>,
    pub title: Box<str>,
    pub author: Box<str>,
}
//
impl Default for PaperColumns {
    fn default() -> Self {
        Self {
            conference: "meeting".into(),
            year: "year".into(),
            status: "status".into(),
            title: "title".into(),
            author: "author".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn partial_layouts_keep_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("layout.json");
        std::fs::write(&path, r#"{ "papers": "papers.csv", "columns": { "conference": "venue" } }"#)
            .unwrap();
        let layout = DataLayout::load(&path).unwrap();
        assert_eq!(&*layout.papers, "papers.csv");
        assert_eq!(&*layout.numeric_papers, "numeric_raw.csv");
        assert_eq!(&*layout.columns.conference, "venue");
        assert_eq!(&*layout.columns.year, "year");
    }

    #[test]
    fn cache_lives_in_data_dir_by_default() {
        let config = Config::with_data_dir("data");
        assert_eq!(config.cache_dir, Path::new("data").join("cache"));
        assert_eq!(config.input("raw.csv"), Path::new("data").join("raw.csv"));
    }
}
