//! Derivations behind the collaboration page: authorship statistics and the
//! institution collaboration network

use super::group_rows;
use crate::{
    config::PaperColumns,
    error::{Error, Result},
    table::{Table, Value},
};
use petgraph::{
    dot::{Config, Dot},
    graphmap::DiGraphMap,
};
use std::collections::BTreeMap;

/// Name of the author count column of [`author_counts()`]
pub const AUTHOR_COUNT: &str = "Number of Authors per Paper";

/// Name of the average author count column of [`average_coauthors()`]
pub const AVERAGE_COAUTHORS: &str = "Average Number of Co-authors per Paper";

/// Number of authors listed in an author field
///
/// Author fields are lists of groups separated by commas, where each group is
/// itself a list of authors separated by semicolons. Missing fields have no
/// authors.
pub fn count_authors(field: &Value) -> usize {
    match field {
        Value::Missing => 0,
        Value::Text(authors) => count_in(authors),
        number => count_in(&number.to_string()),
    }
}
//
fn count_in(authors: &str) -> usize {
    authors.split(',').map(|group| group.split(';').count()).sum()
}

/// Number of authors of each paper
///
/// Output columns are `Conference, Year, Title, Number of Authors per Paper`,
/// in the order of the paper table.
pub fn author_counts(papers: &Table, columns: &PaperColumns) -> Result<Table> {
    let conference = papers.column(&columns.conference)?;
    let year = papers.column(&columns.year)?;
    let title = papers.column(&columns.title)?;
    let author = papers.column(&columns.author)?;
    let mut output = Table::new("author_number", ["Conference", "Year", "Title", AUTHOR_COUNT]);
    for row in papers.rows() {
        output.push([
            row[conference].clone(),
            row[year].clone(),
            row[title].clone(),
            Value::Int(count_authors(&row[author]) as i64),
        ]);
    }
    Ok(output)
}

/// Average number of authors per paper for each conference and year, computed
/// from the output of [`author_counts()`]
///
/// Output columns are `Conference, Average Number of Co-authors per Paper,
/// Year`. Papers without authors are left out of the average.
pub fn average_coauthors(author_counts: &Table) -> Result<Table> {
    let conference = author_counts.column("Conference")?;
    let year = author_counts.column("Year")?;
    let authors = author_counts.column(AUTHOR_COUNT)?;
    let mut output = Table::new(
        "author_number_data",
        ["Conference", AVERAGE_COAUTHORS, "Year"],
    );
    for (key, rows) in group_rows(author_counts, &[conference, year]) {
        let counts = (rows.iter())
            .filter_map(|row| row[authors].as_f64())
            .filter(|&n| n > 0.0)
            .collect::<Vec<_>>();
        if counts.is_empty() {
            continue;
        }
        let mean = counts.iter().sum::<f64>() / counts.len() as f64;
        output.push([key.0[0].clone(), Value::float(mean), key.0[1].clone()]);
    }
    Ok(output)
}

/// Chart-ready collaboration network
#[derive(Clone, Debug, PartialEq)]
pub struct CollaborationGraph {
    /// Directed edges, with columns `source, target, weight`
    pub edges: Table,

    /// Nodes appearing in at least one edge, with columns `node, size`
    pub nodes: Table,
}

/// Build the collaboration network from an edge list and node metadata
///
/// The edge list must have `source, target, weight` columns, and repeated
/// edges have their weights summed. The node table is indexed by its first
/// column and must have a `count` column, which becomes the node size.
pub fn collaboration_graph(edges: &Table, nodes: &Table) -> Result<CollaborationGraph> {
    let source = edges.column("source")?;
    let target = edges.column("target")?;
    let weight = edges.column("weight")?;
    let size = nodes.column("count")?;
    if nodes.columns().is_empty() {
        return Err(Error::SchemaMismatch {
            table: nodes.name().into(),
            column: "index".into(),
        });
    }

    let mut links = Vec::with_capacity(edges.len());
    for row in edges.rows() {
        let (Some(from), Some(to)) = (text_of(&row[source]), text_of(&row[target])) else {
            continue;
        };
        links.push((from, to, edges.numeric(row, weight)?.unwrap_or(0.0)));
    }
    let network = network(links.iter().map(|(from, to, w)| (&**from, &**to, *w)));

    let mut edge_list = network.all_edges().collect::<Vec<_>>();
    edge_list.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    let mut edge_table = Table::new("graph_edges", ["source", "target", "weight"]);
    for (from, to, &w) in edge_list {
        edge_table.push([Value::from(from), Value::from(to), Value::float(w)]);
    }

    let sizes = (nodes.rows().iter())
        .filter_map(|row| Some((text_of(&row[0])?, &row[size])))
        .collect::<BTreeMap<_, _>>();
    let mut names = network.nodes().collect::<Vec<_>>();
    names.sort_unstable();
    let mut node_table = Table::new("graph_nodes", ["node", "size"]);
    for name in names {
        match sizes.get(name) {
            Some(&node_size) if node_size.is_present() => {
                node_table.push([Value::from(name), node_size.clone()]);
            }
            _ => return Err(Error::MissingNode(name.into())),
        }
    }
    Ok(CollaborationGraph {
        edges: edge_table,
        nodes: node_table,
    })
}

/// Directed network of weighted links, repeated links having their weights
/// summed
fn network<'a>(links: impl IntoIterator<Item = (&'a str, &'a str, f64)>) -> DiGraphMap<&'a str, f64> {
    let mut network = DiGraphMap::<&str, f64>::new();
    for (from, to, weight) in links {
        match network.edge_weight_mut(from, to) {
            Some(total) => *total += weight,
            None => {
                network.add_edge(from, to, weight);
            }
        }
    }
    network
}

/// Textual representation of a node identifier
fn text_of(value: &Value) -> Option<Box<str>> {
    value.is_present().then(|| value.to_string().into())
}

/// Render a collaboration network as a Graphviz document
///
/// Node widths grow with node sizes and edge pen widths grow with edge
/// weights, both relative to the largest one.
pub fn render_dot(graph: &CollaborationGraph) -> String {
    let sizes = (graph.nodes.rows().iter())
        .filter_map(|row| Some((row[0].as_text()?, row[1].as_f64())))
        .collect::<BTreeMap<_, _>>();
    let mut network = network(graph.edges.rows().iter().filter_map(|row| {
        Some((row[0].as_text()?, row[1].as_text()?, row[2].as_f64().unwrap_or(0.0)))
    }));
    for &name in sizes.keys() {
        network.add_node(name);
    }

    let scale = |x: Option<f64>, max: f64| match x {
        Some(x) if max > 0.0 => x / max,
        _ => 0.0,
    };
    let max_size = sizes.values().flatten().copied().fold(0.0f64, f64::max);
    let max_weight = network.all_edges().map(|(_, _, &w)| w).fold(0.0f64, f64::max);
    let dot = Dot::with_attr_getters(
        &network,
        &[Config::EdgeNoLabel],
        &|_, (_, _, &weight)| {
            let pen_width = 0.5 + 4.5 * scale(Some(weight), max_weight);
            format!("penwidth={pen_width:.2} arrowhead=normal ")
        },
        &|_, (name, _)| {
            let size = sizes.get(name).copied().flatten();
            let width = 0.3 + 1.7 * scale(size, max_size).sqrt();
            format!("shape=circle fixedsize=true width={width:.2} ")
        },
    )
    .to_string();
    dot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::tests::table;

    #[test]
    fn authors_are_counted_across_nested_separators() {
        assert_eq!(count_authors(&Value::from("A;B, C")), 3);
        assert_eq!(count_authors(&Value::from("A")), 1);
        assert_eq!(count_authors(&Value::from("A;B;C,D,E;F")), 6);
        assert_eq!(count_authors(&Value::Missing), 0);
    }

    fn papers() -> Table {
        table(
            "raw",
            &["meeting", "year", "title", "author"],
            &[
                &["ICLR", "2020", "a", "A;B, C"],
                &["ICLR", "2020", "b", "A"],
                &["ICLR", "2020", "c", ""],
                &["ICLR", "2021", "d", ""],
                &["CVPR", "2021", "e", "X,Y"],
            ],
        )
    }

    #[test]
    fn author_counts_keep_paper_order() {
        let counts = author_counts(&papers(), &PaperColumns::default()).unwrap();
        let column = counts.column(AUTHOR_COUNT).unwrap();
        let counts = counts.rows().iter().map(|row| row[column].clone()).collect::<Vec<_>>();
        assert_eq!(
            counts,
            [3, 1, 0, 0, 2].map(Value::Int).to_vec()
        );
    }

    #[test]
    fn average_coauthors_ignore_authorless_papers() {
        let counts = author_counts(&papers(), &PaperColumns::default()).unwrap();
        let averages = average_coauthors(&counts).unwrap();
        let expected = table("author_number_data", &["Conference", AVERAGE_COAUTHORS, "Year"], &[
            &["CVPR", "2", "2021"],
            &["ICLR", "2", "2020"],
        ]);
        assert_eq!(averages.len(), expected.len());
        for (actual, expected) in averages.rows().iter().zip(expected.rows()) {
            assert_eq!(actual[0], expected[0]);
            assert_eq!(actual[1].as_f64(), expected[1].as_f64());
            assert_eq!(actual[2], expected[2]);
        }
    }

    fn graph_inputs() -> (Table, Table) {
        let edges = table(
            "adjmat",
            &["source", "target", "weight"],
            &[&["MIT", "CMU", "60"], &["CMU", "MIT", "55"], &["MIT", "CMU", "5"]],
        );
        let nodes = table(
            "node_info",
            &["node_info", "count"],
            &[&["CMU", "120"], &["MIT", "300"], &["ETH", "12"]],
        );
        (edges, nodes)
    }

    #[test]
    fn graph_merges_edges_and_sizes_nodes() {
        let (edges, nodes) = graph_inputs();
        let graph = collaboration_graph(&edges, &nodes).unwrap();
        let expected_edges = table("graph_edges", &["source", "target", "weight"], &[
            &["CMU", "MIT", "55.0"],
            &["MIT", "CMU", "65.0"],
        ]);
        let expected_nodes = table("graph_nodes", &["node", "size"], &[&["CMU", "120"], &["MIT", "300"]]);
        assert_eq!(graph.edges, expected_edges);
        assert_eq!(graph.nodes, expected_nodes);

        let dot = render_dot(&graph);
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("label = \"MIT\""));
        assert!(dot.contains("width=2.00"));
        assert!(dot.contains("penwidth=5.00"));
        assert_eq!(dot.matches("->").count(), 2);
    }

    #[test]
    fn graph_requires_node_metadata() {
        let (edges, _) = graph_inputs();
        let nodes = table("node_info", &["node_info", "count"], &[&["CMU", "120"]]);
        assert!(matches!(
            collaboration_graph(&edges, &nodes),
            Err(Error::MissingNode(node)) if &*node == "MIT"
        ));
    }
}
