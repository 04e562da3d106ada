//! This program serves the charts of a dashboard over a dataset of academic
//! conference papers. Every chart is backed by a table that is derived from
//! raw CSV files, cached on disk, and printed as CSV.

mod cache;
mod conference;
mod config;
mod dashboard;
mod derive;
mod error;
mod keywords;
mod progress;
mod report;
mod table;

use crate::{
    conference::ConferenceNameMap,
    config::Config,
    dashboard::Dashboard,
    derive::{career::CareerMetric, research::DEFAULT_CORRELATION_ATTRIBUTES},
    keywords::KeywordYears,
    progress::ProgressReport,
    report::Page,
    table::{Table, Value},
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use dialoguer::FuzzySelect;
use log::LevelFilter;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, BufWriter};

/// Chart-ready tables of the conference paper dashboard
///
/// Derived tables are cached on disk and trusted until deleted, so remember
/// to run `clear-cache` after updating the data files.
#[derive(Parser, Debug)]
#[command(version, author)]
struct Args {
    /// Directory holding the input data files
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory where derived tables are cached
    ///
    /// Defaults to the "cache" subdirectory of the data directory.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Recompute the requested charts instead of using cached ones
    #[arg(short, long)]
    refresh: bool,

    /// JSON description of the data file names and paper table columns
    ///
    /// Fields which are not specified keep their default value.
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Dashboard section to show
    #[command(subcommand)]
    command: Command,
}

/// Dashboard sections and maintenance operations
#[derive(Subcommand, Debug)]
enum Command {
    /// List supported conferences
    Conferences,

    /// Show every section of the overview page
    Overview(Selection),

    /// First and last year of each conference
    TimeRanges,

    /// Number of papers per conference and status
    StatusCounts,

    /// Availability of paper attributes per conference
    Availability {
        /// Show the precomputed conference × year availability matrix instead
        #[arg(long)]
        heatmap: bool,
    },

    /// Availability of paper attributes in a conference over some years
    Attributes(Selection),

    /// Number of papers per conference and year
    AnnualCounts(Filter),

    /// Correlation between numeric attributes of a conference's papers
    Correlation {
        #[command(flatten)]
        selection: Selection,

        /// Attributes to correlate, comma-separated
        ///
        /// Defaults to the usual review and citation metrics.
        #[arg(short, long, value_delimiter = ',')]
        attributes: Vec<Box<str>>,
    },

    /// Distribution of a numeric attribute across paper statuses
    Distribution {
        #[command(flatten)]
        selection: Selection,

        /// Attribute to show
        ///
        /// Will interactively prompt for a numeric attribute if not specified.
        #[arg(short, long)]
        attribute: Option<Box<str>>,
    },

    /// Number of authors of each paper
    AuthorCounts(Filter),

    /// Average number of co-authors per paper, per conference and year
    Coauthors(Filter),

    /// Scholar career statistics
    Careers {
        /// Chart to show, all of them by default
        #[arg(short, long)]
        metric: Option<CareerMetric>,

        #[command(flatten)]
        filter: Filter,
    },

    /// Institution collaboration network
    Network,

    /// Keyword trend images
    Keywords {
        /// Conference code or display name, all conferences by default
        #[arg(short, long)]
        conference: Option<Box<str>>,

        /// Year of the image to pick
        #[arg(short, long)]
        year: Option<Year>,
    },

    /// Compute every chart that does not depend on user input
    Warm,

    /// Delete every cached chart
    ClearCache,
}

/// Conference and years of interest
#[derive(clap::Args, Debug)]
struct Selection {
    /// Conference code or display name, e.g. "iclr"
    ///
    /// Will interactively prompt for a conference if not specified.
    #[arg(short, long)]
    conference: Option<Box<str>>,

    /// First year of interest, defaults to the conference's first year
    #[arg(long)]
    start: Option<Year>,

    /// Last year of interest, defaults to the conference's last year
    #[arg(long)]
    end: Option<Year>,
}
//
impl Selection {
    /// Pick a conference, prompting the user if needed
    fn conference(&self, names: &'static ConferenceNameMap) -> error::Result<&'static str> {
        match &self.conference {
            Some(conference) => names.resolve(conference),
            None => names.prompt(),
        }
    }

    /// Valid range of years for some conference
    async fn years(&self, dashboard: &Dashboard, conference: &str) -> error::Result<(Year, Year)> {
        let selector = dashboard.year_selector(conference).await?;
        Ok(selector.select(self.start, self.end))
    }

    /// Attribute availability chart of the selected conference and years
    async fn attribute_years(&self, dashboard: &Dashboard) -> error::Result<Table> {
        let conference = self.conference(dashboard.names())?;
        let (start, end) = self.years(dashboard, conference).await?;
        dashboard.attribute_years(conference, start, end).await
    }
}

/// Restriction of a chart to some conferences
#[derive(clap::Args, Debug)]
struct Filter {
    /// Conferences to show, comma-separated, all of them by default
    #[arg(long, value_delimiter = ',')]
    conferences: Vec<Box<str>>,
}
//
impl Filter {
    /// Apply the filter to a table, given the name of its conference column
    fn apply(
        &self,
        names: &ConferenceNameMap,
        column: &str,
        table: Table,
    ) -> error::Result<Table> {
        if self.conferences.is_empty() {
            return Ok(table);
        }
        let selected = (self.conferences.iter())
            .map(|conf| names.resolve(conf))
            .collect::<error::Result<Vec<_>>>()?;
        table.filtered(column, |cell| {
            cell.as_text().is_some_and(|conf| selected.iter().any(|s| *s == conf))
        })
    }

    /// Apply the filter to a chart, leaving it unavailable if it was
    fn chart(
        &self,
        names: &ConferenceNameMap,
        column: &str,
        chart: error::Result<Table>,
    ) -> error::Result<Table> {
        chart.and_then(|table| self.apply(names, column, table))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Set up logging
    setup_logging().map_err(|e| anyhow::format_err!("{e}"))?;

    // Decode CLI arguments and set up the dashboard
    let args = Args::parse();
    let config = Config::new(&args)?;
    let dashboard = Dashboard::new(config, ConferenceNameMap::builtin(), ProgressReport::new());

    // Show the requested section
    let mut page = Page::new(BufWriter::new(tokio::io::stdout()));
    let outcome = args.command.run(&dashboard, &mut page).await;
    let failures = page.failures();
    page.finish().await?;
    outcome?;
    anyhow::ensure!(failures == 0, "{failures} section(s) could not be shown");
    Ok(())
}
//
impl Command {
    /// Show a dashboard section or perform a maintenance operation
    async fn run<W: AsyncWrite + Unpin>(&self, dashboard: &Dashboard, page: &mut Page<W>) -> Result<()> {
        let names = dashboard.names();
        match self {
            Self::Conferences => {
                let mut table = Table::new("conferences", ["Code", "Conference", "Area"]);
                for info in names.iter() {
                    table.push([
                        Value::from(info.code),
                        Value::from(info.display_name),
                        Value::from(info.area.label()),
                    ]);
                }
                page.section("Supported conferences", Ok(table)).await?;
            }
            Self::Overview(selection) => {
                page.section("Available Conference Data", dashboard.availability_heatmap().await)
                    .await?;
                page.section("Attribute Availability Overview", dashboard.availability_ratios().await)
                    .await?;
                page.section(ATTRIBUTE_YEARS, selection.attribute_years(dashboard).await)
                    .await?;
                page.section(
                    "Proportion of Status Categories by Conference",
                    dashboard.status_counts().await,
                )
                .await?;
                page.section("Annual Paper Counts by Conference", dashboard.annual_counts().await)
                    .await?;
            }
            Self::TimeRanges => {
                page.section("Conference Time Ranges", dashboard.time_ranges().await)
                    .await?;
            }
            Self::StatusCounts => {
                page.section(
                    "Proportion of Status Categories by Conference",
                    dashboard.status_counts().await,
                )
                .await?;
            }
            Self::Availability { heatmap: true } => {
                page.section("Available Conference Data", dashboard.availability_heatmap().await)
                    .await?;
            }
            Self::Availability { heatmap: false } => {
                page.section("Attribute Availability Overview", dashboard.availability_ratios().await)
                    .await?;
            }
            Self::Attributes(selection) => {
                page.section(ATTRIBUTE_YEARS, selection.attribute_years(dashboard).await)
                    .await?;
            }
            Self::AnnualCounts(filter) => {
                let counts = filter.chart(names, "Conference", dashboard.annual_counts().await);
                page.section("Annual Paper Counts by Conference", counts).await?;
            }
            Self::Correlation {
                selection,
                attributes,
            } => {
                let conference = selection.conference(names)?;
                let chart = if attributes.is_empty() {
                    match dashboard.numeric_papers().await {
                        Ok(papers) => {
                            let numeric = papers.numeric_columns();
                            let defaults = (DEFAULT_CORRELATION_ATTRIBUTES.iter().copied())
                                .filter(|attr| numeric.contains(attr))
                                .collect::<Vec<_>>();
                            dashboard.correlation(conference, &defaults).await
                        }
                        Err(e) => Err(e),
                    }
                } else {
                    let attributes = attributes.iter().map(|a| &**a).collect::<Vec<_>>();
                    dashboard.correlation(conference, &attributes).await
                };
                page.section(&format!("Correlation of Attributes in {conference}"), chart)
                    .await?;
            }
            Self::Distribution {
                selection,
                attribute,
            } => {
                let conference = selection.conference(names)?;
                let attribute = match attribute {
                    Some(attribute) => attribute.clone(),
                    None => pick_attribute(&*dashboard.numeric_papers().await?)?,
                };
                let chart = match selection.years(dashboard, conference).await {
                    Ok((start, end)) => dashboard.distribution(conference, &attribute, start, end).await,
                    Err(e) => Err(e),
                };
                page.section(
                    &format!("Distribution of {attribute} by Paper Status in {conference}"),
                    chart,
                )
                .await?;
            }
            Self::AuthorCounts(filter) => {
                let counts = filter.chart(names, "Conference", dashboard.author_counts().await);
                page.section("Number of Authors per Paper", counts).await?;
            }
            Self::Coauthors(filter) => {
                let averages = filter.chart(names, "Conference", dashboard.average_coauthors().await);
                page.section("Average Number of Co-authors per Paper", averages)
                    .await?;
            }
            Self::Careers { metric, filter } => {
                let metrics = match metric {
                    Some(metric) => vec![*metric],
                    None => CareerMetric::ALL.to_vec(),
                };
                for metric in metrics {
                    let chart = dashboard.career(metric).await;
                    let by_conference = (chart.as_ref()).is_ok_and(|table| table.column("Conference").is_ok());
                    let chart = if by_conference {
                        filter.chart(names, "Conference", chart)
                    } else {
                        chart
                    };
                    page.section(metric.title(), chart).await?;
                }
            }
            Self::Network => match dashboard.network().await {
                Ok((graph, path)) => {
                    page.section("Collaboration Network Nodes", Ok(graph.nodes))
                        .await?;
                    page.section("Collaboration Network Edges", Ok(graph.edges))
                        .await?;
                    page.header("Collaboration Network Rendering").await?;
                    match path {
                        Some(path) => page.line(&path.display().to_string()).await?,
                        None => page.line("unavailable: rendering could not be written").await?,
                    }
                }
                Err(e) => page.section("Collaboration Network", Err(e)).await?,
            },
            Self::Keywords { conference, year } => {
                let index = match dashboard.keywords().await {
                    Ok(index) => index,
                    Err(e) => return page.section("Keyword Trends", Err(e)).await,
                };
                let Some(conference) = conference else {
                    return page.section("Keyword Trends", Ok(index.table(None))).await;
                };
                let conference = names.resolve(conference)?;
                let year = match (index.years(conference), year) {
                    (None, _) => None,
                    (Some(KeywordYears::Fixed(year)), _) => Some(year),
                    (Some(KeywordYears::Options(years)), Some(year)) => {
                        anyhow::ensure!(
                            years.contains(year),
                            "no {conference} keyword trends for {year}, pick one of {years:?}"
                        );
                        Some(*year)
                    }
                    (Some(KeywordYears::Options(years)), None) => years.last().copied(),
                };
                page.header(&format!("Keyword Trends in {conference}")).await?;
                match year.and_then(|year| Some((year, index.image(conference, year)?))) {
                    Some((year, image)) => {
                        page.line(&format!("{year},{}", image.display())).await?
                    }
                    None => page.line("unavailable: no keyword trends").await?,
                }
            }
            Self::Warm => {
                let warmed = dashboard.warm().await;
                page.header("Cache warm-up").await?;
                page.line(&format!("{warmed} charts ready")).await?;
            }
            Self::ClearCache => {
                let removed = dashboard.clear_cache().await?;
                page.header("Cache cleanup").await?;
                page.line(&format!("{removed} charts removed")).await?;
            }
        }
        Ok(())
    }
}

/// Ask the user to select a numeric attribute
fn pick_attribute(papers: &Table) -> Result<Box<str>> {
    let attributes = papers.numeric_columns();
    anyhow::ensure!(!attributes.is_empty(), "there is no numeric attribute to show");
    let idx = FuzzySelect::new()
        .with_prompt("Which attribute should I show?")
        .items(&attributes)
        .default(0)
        .interact()
        .context("prompting for an attribute")?;
    Ok(attributes[idx].into())
}

/// Title of the attribute availability section
const ATTRIBUTE_YEARS: &str = "Attribute Availability in Selected Conference and Time Range";

/// Use anyhow for Result type erasure
pub use anyhow::Result;

/// Year of Gregorian Calendar
pub type Year = i16;

/// Marker of attributes that a record lacks, in place of its year
///
/// This is larger than any real year, so that charts can map it to a
/// distinct color.
pub const ABSENT_YEAR: Year = Year::MAX;

/// Set up logging
fn setup_logging() -> syslog::Result<()> {
    syslog::init(
        syslog::Facility::LOG_USER,
        if cfg!(feature = "log-trace") {
            LevelFilter::Trace
        } else if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    const RAW: &str = "\
meeting,year,status,title,author,rating_avg
iclr,2020,Accept,a,A,6
iclr,2021,Reject,b,B,3
";

    fn dashboard(dir: &TempDir) -> Dashboard {
        std::fs::write(dir.path().join("raw.csv"), RAW).unwrap();
        Dashboard::new(
            Arc::new(Config::with_data_dir(dir.path())),
            ConferenceNameMap::builtin(),
            ProgressReport::hidden(),
        )
    }

    async fn show(command: Command, dashboard: &Dashboard) -> (String, usize) {
        let mut page = Page::new(Vec::new());
        command.run(dashboard, &mut page).await.unwrap();
        let failures = page.failures();
        (String::from_utf8(page.finish().await.unwrap()).unwrap(), failures)
    }

    #[tokio::test]
    async fn unknown_conferences_only_affect_their_section() {
        let dir = TempDir::new().unwrap();
        let dashboard = dashboard(&dir);
        let overview = Command::Overview(Selection {
            conference: Some("foo".into()),
            start: None,
            end: None,
        });
        let (output, failures) = show(overview, &dashboard).await;
        // The availability heatmap input is missing too
        assert_eq!(failures, 2);
        assert!(output.contains(&format!("# {ATTRIBUTE_YEARS}\nunavailable: unknown conference \"foo\"\n")));
        assert!(output.contains("# Proportion of Status Categories by Conference\nmeeting,status,count\n"));
        assert!(output.contains("# Annual Paper Counts by Conference\nConference,Year,Count\n"));
    }

    #[tokio::test]
    async fn unknown_filters_only_affect_filtered_sections() {
        let dir = TempDir::new().unwrap();
        let dashboard = dashboard(&dir);
        std::fs::write(
            dir.path().join("author_info.csv"),
            "author,meeting,interval\nA,iclr,2\n",
        )
        .unwrap();
        let careers = Command::Careers {
            metric: None,
            filter: Filter {
                conferences: vec!["foo".into()],
            },
        };
        let (output, failures) = show(careers, &dashboard).await;
        assert_eq!(failures, CareerMetric::ALL.len());
        assert_eq!(output.matches("\n# ").count() + 1, CareerMetric::ALL.len());
        assert!(output.contains(&format!(
            "# {}\nunavailable: unknown conference \"foo\"\n",
            CareerMetric::FirstAuthorInterval.title()
        )));
    }
}
