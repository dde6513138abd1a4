//! Target inventory: which dataset graphs the store holds, and since when
//!
//! Graphs are enumerated with one SPARQL query; every final graph is then
//! asked for its `dcterms:modified` provenance value. Whether an entry counts
//! as corrupt is decided by a [`CorruptionRule`].

use crate::error::{Result, VirtuosoError};
use crate::sparql::SparqlClient;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use sparql_updater_core::vocab::{self, dcterms, TEMP_GRAPH_SUFFIX};
use sparql_updater_core::TargetEntry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Any triple counts: a dataset loaded from an empty archive holds only its
/// provenance statement.
const LIST_GRAPHS: &str = "SELECT DISTINCT ?g WHERE { GRAPH ?g { ?s ?p ?o } }";

/// Lists the datasets present at the target.
#[async_trait]
pub trait TargetInventory: fmt::Debug + Send + Sync {
    async fn list(&self) -> Result<Vec<TargetEntry>>;
}

/// When a target graph is treated as corrupt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptionRule {
    /// A leftover temp graph, or a final graph without a readable date
    #[default]
    TempGraph,
    /// As `TempGraph`, and also more than one modified value
    MultipleDates,
    /// Only a missing or unreadable date; temp graphs are not listed
    MissingDateOnly,
}

impl CorruptionRule {
    fn as_str(&self) -> &'static str {
        match self {
            CorruptionRule::TempGraph => "temp-graph",
            CorruptionRule::MultipleDates => "multiple-dates",
            CorruptionRule::MissingDateOnly => "missing-date-only",
        }
    }

    /// Turn the graphs found for one dataset into an inventory entry.
    ///
    /// `dates` are the raw modified values of the final graph (empty when
    /// there is no final graph). `None` means the dataset is not listed.
    pub fn judge(&self, graphs: &DatasetGraphs, dates: &[String]) -> Option<TargetEntry> {
        match self {
            CorruptionRule::MissingDateOnly if !graphs.has_final => return None,
            CorruptionRule::TempGraph | CorruptionRule::MultipleDates if graphs.has_temp => {
                tracing::warn!(dataset = %graphs.id, "SPARQL dataset was partially ingested");
                return Some(TargetEntry::corrupt(&graphs.id));
            }
            _ => {}
        }

        if *self == CorruptionRule::MultipleDates && dates.len() > 1 {
            tracing::warn!(dataset = %graphs.id, dates = dates.len(), "SPARQL dataset has several modified dates");
            return Some(TargetEntry::corrupt(&graphs.id));
        }

        match dates.first().map(|d| parse_timestamp(d)) {
            Some(Some(ts)) => {
                tracing::trace!(dataset = %graphs.id, modified = %ts, "SPARQL dataset date");
                Some(TargetEntry::new(&graphs.id, ts))
            }
            Some(None) => {
                tracing::warn!(dataset = %graphs.id, value = %dates[0], "SPARQL dataset has an unreadable modified date");
                Some(TargetEntry::corrupt(&graphs.id))
            }
            None => {
                tracing::warn!(dataset = %graphs.id, "SPARQL dataset has no modified date");
                Some(TargetEntry::corrupt(&graphs.id))
            }
        }
    }
}

impl fmt::Display for CorruptionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CorruptionRule {
    type Err = VirtuosoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "temp-graph" => Ok(CorruptionRule::TempGraph),
            "multiple-dates" => Ok(CorruptionRule::MultipleDates),
            "missing-date-only" => Ok(CorruptionRule::MissingDateOnly),
            other => Err(VirtuosoError::Config(format!(
                "unknown corruption rule '{other}' (expected temp-graph, multiple-dates or missing-date-only)"
            ))),
        }
    }
}

/// The graphs found at the target for one dataset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetGraphs {
    pub id: String,
    pub has_final: bool,
    pub has_temp: bool,
}

/// Group graph IRIs by dataset id, in order of first appearance.
///
/// IRIs outside `<graph_base><id>[_new]` are ignored.
pub fn group_graphs<'a>(
    pattern: &Regex,
    graph_iris: impl IntoIterator<Item = &'a str>,
) -> Vec<DatasetGraphs> {
    let mut order: Vec<DatasetGraphs> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for iri in graph_iris {
        let Some(caps) = pattern.captures(iri) else {
            continue;
        };
        let id = &caps[1];
        let temp = caps.get(2).is_some();
        let slot = *index.entry(id.to_string()).or_insert_with(|| {
            order.push(DatasetGraphs {
                id: id.to_string(),
                has_final: false,
                has_temp: false,
            });
            order.len() - 1
        });
        if temp {
            order[slot].has_temp = true;
        } else {
            order[slot].has_final = true;
        }
    }
    order
}

/// Pattern matching dataset graph IRIs under `graph_base`.
pub fn dataset_graph_pattern(graph_base: &str) -> Result<Regex> {
    Regex::new(&format!(
        "^{}([^/#?]+?)({})?$",
        regex::escape(graph_base),
        regex::escape(TEMP_GRAPH_SUFFIX)
    ))
    .map_err(|e| VirtuosoError::Config(format!("invalid graph base '{graph_base}': {e}")))
}

/// `xsd:dateTime` lexical form to UTC. Values without a zone are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// [`TargetInventory`] over the store's SPARQL endpoint.
#[derive(Debug)]
pub struct SparqlTargetInventory {
    client: SparqlClient,
    graph_base: String,
    pattern: Regex,
    rule: CorruptionRule,
}

impl SparqlTargetInventory {
    pub fn new(client: SparqlClient, graph_base: impl Into<String>) -> Result<Self> {
        let graph_base = graph_base.into();
        let pattern = dataset_graph_pattern(&graph_base)?;
        Ok(Self {
            client,
            graph_base,
            pattern,
            rule: CorruptionRule::default(),
        })
    }

    pub fn with_rule(mut self, rule: CorruptionRule) -> Self {
        self.rule = rule;
        self
    }

    async fn modified_dates(&self, dataset_id: &str) -> Result<Vec<String>> {
        let graph = vocab::graph_iri(&self.graph_base, dataset_id);
        let query = format!(
            "SELECT ?d WHERE {{ GRAPH <{graph}> {{ <{graph}> <{}> ?d }} }}",
            dcterms::MODIFIED
        );
        let rows = self.client.select(&query).await?;
        Ok(rows
            .into_iter()
            .filter_map(|mut row| row.remove("d"))
            .map(|term| term.value)
            .collect())
    }
}

#[async_trait]
impl TargetInventory for SparqlTargetInventory {
    async fn list(&self) -> Result<Vec<TargetEntry>> {
        tracing::info!(endpoint = %self.client.endpoint(), rule = %self.rule, "listing SPARQL datasets");
        let rows = self.client.select(LIST_GRAPHS).await?;
        let graphs = group_graphs(
            &self.pattern,
            rows.iter()
                .filter_map(|row| row.get("g"))
                .map(|term| term.value.as_str()),
        );

        let mut entries = Vec::with_capacity(graphs.len());
        for dataset in &graphs {
            let dates = if dataset.has_final {
                self.modified_dates(&dataset.id).await?
            } else {
                Vec::new()
            };
            if let Some(entry) = self.rule.judge(dataset, &dates) {
                entries.push(entry);
            }
        }
        tracing::info!(datasets = entries.len(), "SPARQL datasets listed");
        Ok(entries)
    }
}
