//! Dashboard session, which serves chart-ready tables
//!
//! Raw tables are loaded at most once per session, and every derived table
//! goes through the disk cache, so that charts only get computed once across
//! sessions.

use crate::{
    cache::{self, ArtifactKey, DataCache},
    conference::ConferenceNameMap,
    config::Config,
    derive::{
        career::{self, CareerMetric},
        collaboration::{self, CollaborationGraph},
        overview::{self, YearSelector},
        research,
    },
    error::{Error, Result},
    keywords::KeywordIndex,
    progress::{ProgressConfig, ProgressReport},
    table::Table,
    Year,
};
use std::{future::Future, io::ErrorKind, path::PathBuf, sync::Arc};
use tokio::sync::OnceCell;

/// Dashboard session
#[derive(Debug)]
pub struct Dashboard {
    /// Process configuration
    config: Arc<Config>,

    /// Conference naming scheme
    names: &'static ConferenceNameMap,

    /// Derived table cache
    cache: DataCache,

    /// Progress report
    report: ProgressReport,

    /// Paper table
    papers: OnceCell<Arc<Table>>,

    /// Paper table with extra numeric attributes
    numeric_papers: OnceCell<Arc<Table>>,

    /// Per-author yearly records
    first_author_info: OnceCell<Arc<Table>>,

    /// Per-author, per-conference first-authorship intervals
    author_info: OnceCell<Arc<Table>>,
}
//
impl Dashboard {
    /// Start a session
    pub fn new(config: Arc<Config>, names: &'static ConferenceNameMap, report: ProgressReport) -> Self {
        Self {
            cache: DataCache::new(config.cache_dir.clone()),
            config,
            names,
            report,
            papers: OnceCell::new(),
            numeric_papers: OnceCell::new(),
            first_author_info: OnceCell::new(),
            author_info: OnceCell::new(),
        }
    }

    /// Conference naming scheme
    pub fn names(&self) -> &'static ConferenceNameMap {
        self.names
    }

    /// Paper table
    pub async fn papers(&self) -> Result<Arc<Table>> {
        let layout = &self.config.layout;
        self.raw(&self.papers, &layout.papers, Some(&layout.columns.conference))
            .await
    }

    /// Paper table with extra numeric attributes
    pub async fn numeric_papers(&self) -> Result<Arc<Table>> {
        let layout = &self.config.layout;
        self.raw(
            &self.numeric_papers,
            &layout.numeric_papers,
            Some(&layout.columns.conference),
        )
        .await
    }

    /// Conference and year ranges covered by the paper table
    pub async fn time_ranges(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("conf_time_data"), || async {
            overview::time_ranges(&*self.papers().await?, &self.config.layout.columns)
        })
        .await
    }

    /// How the user may select years for some conference
    pub async fn year_selector(&self, conference: &str) -> Result<YearSelector> {
        YearSelector::lookup(&self.time_ranges().await?, conference)
    }

    /// Record counts per conference and status
    pub async fn status_counts(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("sunburst_data"), || async {
            overview::status_counts(&*self.papers().await?, &self.config.layout.columns)
        })
        .await
    }

    /// Precomputed conference × year availability matrix
    pub async fn availability_heatmap(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("available"), || async {
            let path = self.config.input(&self.config.layout.availability);
            Table::load(&path, self.names, None).await
        })
        .await
    }

    /// Fraction of records where each attribute is present, per conference
    pub async fn availability_ratios(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("attribute_data"), || async {
            overview::availability_ratios(&*self.papers().await?, &self.config.layout.columns)
        })
        .await
    }

    /// Attribute presence of each record of a conference over some years
    pub async fn attribute_years(&self, conference: &str, start: Year, end: Year) -> Result<Table> {
        let key = ArtifactKey::new("conf_attribute_data")
            .param("conference", conference)
            .param("start", start)
            .param("end", end);
        self.derived(key, || async {
            let papers = self.numeric_papers().await?;
            overview::attribute_years(&papers, &self.config.layout.columns, conference, start, end)
        })
        .await
    }

    /// Record counts per conference and year
    pub async fn annual_counts(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("count_data"), || async {
            overview::annual_counts(&*self.papers().await?, &self.config.layout.columns)
        })
        .await
    }

    /// Correlation matrix of some attributes over a conference
    pub async fn correlation(&self, conference: &str, attributes: &[&str]) -> Result<Table> {
        let key = ArtifactKey::new("corr_data")
            .param("conference", conference)
            .list_param("attributes", attributes);
        self.derived(key, || async {
            let papers = self.numeric_papers().await?;
            research::correlation(&papers, &self.config.layout.columns, conference, attributes)
        })
        .await
    }

    /// Distribution of an attribute across paper statuses
    pub async fn distribution(
        &self,
        conference: &str,
        attribute: &str,
        start: Year,
        end: Year,
    ) -> Result<Table> {
        let key = ArtifactKey::new("violin_data")
            .param("conference", conference)
            .param("attribute", attribute)
            .param("start", start)
            .param("end", end);
        self.derived(key, || async {
            let papers = self.numeric_papers().await?;
            research::distribution_by_status(
                &papers,
                &self.config.layout.columns,
                conference,
                attribute,
                start,
                end,
            )
        })
        .await
    }

    /// Number of authors of each paper
    pub async fn author_counts(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("author_number"), || async {
            collaboration::author_counts(&*self.papers().await?, &self.config.layout.columns)
        })
        .await
    }

    /// Average number of authors per paper, per conference and year
    pub async fn average_coauthors(&self) -> Result<Table> {
        self.derived(ArtifactKey::new("author_number_data"), || async {
            collaboration::average_coauthors(&self.author_counts().await?)
        })
        .await
    }

    /// One of the scholar career charts
    pub async fn career(&self, metric: CareerMetric) -> Result<Table> {
        self.derived(ArtifactKey::new(metric.name()), || async {
            let layout = &self.config.layout;
            let (cell, file) = if metric.uses_author_info() {
                (&self.author_info, &layout.author_info)
            } else {
                (&self.first_author_info, &layout.first_author_info)
            };
            let input = self.raw(cell, file, Some(career::MEETING)).await?;
            metric.derive(&input)
        })
        .await
    }

    /// Collaboration network, along with the location of its rendering
    ///
    /// The rendering is only written if it does not exist yet. If it cannot
    /// be written, the failure is logged and no location is returned.
    pub async fn network(&self) -> Result<(CollaborationGraph, Option<PathBuf>)> {
        let layout = &self.config.layout;
        let edges = Table::load(&self.config.input(&layout.collaboration_edges), self.names, None).await?;
        let nodes = Table::load(&self.config.input(&layout.collaboration_nodes), self.names, None).await?;
        let graph = collaboration::collaboration_graph(&edges, &nodes)?;

        let path = self.config.input(&layout.network_output);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            log::debug!("Reusing network rendering at {}", path.display());
            return Ok((graph, Some(path)));
        }
        let dot = collaboration::render_dot(&graph);
        match cache::write_atomically(&path, dot.as_bytes()).await {
            Ok(()) => {
                log::info!("Rendered collaboration network to {}", path.display());
                Ok((graph, Some(path)))
            }
            Err(e) => {
                log::warn!("Failed to render collaboration network to {}: {e}", path.display());
                Ok((graph, None))
            }
        }
    }

    /// Index of keyword trend images
    pub async fn keywords(&self) -> Result<KeywordIndex> {
        let manifest = self.config.input(&self.config.layout.keyword_manifest);
        KeywordIndex::load(&manifest, self.names).await
    }

    /// Compute every chart that does not depend on user input, returning how
    /// many could be computed
    ///
    /// Charts that cannot be computed are logged and skipped.
    pub async fn warm(&self) -> usize {
        const FIXED_CHARTS: usize = 7;
        let tracker = self.report.add(
            "Warming up cache",
            ProgressConfig::new(FIXED_CHARTS + CareerMetric::ALL.len()).dont_show_rate_eta(),
        );
        let mut warmed = 0;
        let mut record = |name: &str, result: Result<Table>| {
            match result {
                Ok(_) => warmed += 1,
                Err(e) => log::error!("Could not warm up {name}: {e}"),
            }
            tracker.make_progress(1);
        };
        record("time ranges", self.time_ranges().await);
        record("status counts", self.status_counts().await);
        record("availability heatmap", self.availability_heatmap().await);
        record("availability ratios", self.availability_ratios().await);
        record("annual counts", self.annual_counts().await);
        record("author counts", self.author_counts().await);
        record("average co-authors", self.average_coauthors().await);
        for metric in CareerMetric::ALL {
            record(metric.name(), self.career(metric).await);
        }
        warmed
    }

    /// Delete every cached chart, returning how many there were
    pub async fn clear_cache(&self) -> Result<usize> {
        self.cache.clear().await
    }

    /// Load a raw table, unless it was already loaded
    async fn raw(
        &self,
        cell: &OnceCell<Arc<Table>>,
        file: &str,
        conference_column: Option<&str>,
    ) -> Result<Arc<Table>> {
        cell.get_or_try_init(|| async {
            let table = Table::load(&self.config.input(file), self.names, conference_column).await?;
            Ok::<_, Error>(Arc::new(table))
        })
        .await
        .cloned()
    }

    /// Get a derived table from the cache, computing it on a miss
    async fn derived<F, Fut>(&self, key: ArtifactKey, compute: F) -> Result<Table>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Table>>,
    {
        if self.config.refresh {
            self.cache.invalidate(&key).await?;
        }
        let _spinner = if self.cache.contains(&key).await {
            None
        } else {
            Some(self.report.spinner(format!("Computing {key}")))
        };
        self.cache.get_or_compute(&key, compute).await
    }
}

/// Truth that an error means that some input data is not there
pub fn is_missing_data(error: &Error) -> bool {
    matches!(error, Error::DataUnavailable { source, .. } if source.kind() == ErrorKind::NotFound)
}
