//! SPARQL protocol client
//!
//! Only SELECT queries are needed; results are read in the W3C
//! `application/sparql-results+json` format.

use crate::error::{Result, VirtuosoError};
use serde::Deserialize;
use std::collections::HashMap;

const SPARQL_RESULTS_JSON: &str = "application/sparql-results+json";

/// One bound value in a result row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RdfTerm {
    /// `uri`, `literal`, `typed-literal` or `bnode`
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default)]
    pub datatype: Option<String>,
    #[serde(default, rename = "xml:lang")]
    pub lang: Option<String>,
}

/// A result row: variable name to bound value (unbound variables are absent).
pub type Solution = HashMap<String, RdfTerm>;

#[derive(Debug, Deserialize)]
struct SelectResponse {
    results: SelectResults,
}

#[derive(Debug, Deserialize)]
struct SelectResults {
    bindings: Vec<Solution>,
}

/// Decode a SPARQL JSON SELECT response body.
pub fn parse_select(body: &str) -> Result<Vec<Solution>> {
    let response: SelectResponse = serde_json::from_str(body)?;
    Ok(response.results.bindings)
}

/// HTTP client for one SPARQL endpoint
#[derive(Debug, Clone)]
pub struct SparqlClient {
    endpoint: String,
    http: reqwest::Client,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Run a SELECT query and return its rows.
    pub async fn select(&self, query: &str) -> Result<Vec<Solution>> {
        tracing::trace!(endpoint = %self.endpoint, query, "SPARQL select");
        let resp = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, SPARQL_RESULTS_JSON)
            .form(&[("query", query)])
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(VirtuosoError::Query {
                status: status.as_u16(),
                body,
            });
        }
        let rows = parse_select(&body)?;
        tracing::debug!(rows = rows.len(), "SPARQL query finished");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select() {
        let body = r#"{
            "head": { "vars": ["g", "d"] },
            "results": { "bindings": [
                { "g": { "type": "uri", "value": "http://data.europeana.eu/dataset/1" },
                  "d": { "type": "typed-literal",
                         "datatype": "http://www.w3.org/2001/XMLSchema#dateTime",
                         "value": "2024-03-01T12:30:00Z" } },
                { "g": { "type": "uri", "value": "http://data.europeana.eu/dataset/2" } }
            ] }
        }"#;
        let rows = parse_select(body).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["g"].kind, "uri");
        assert_eq!(
            rows[0]["d"].datatype.as_deref(),
            Some("http://www.w3.org/2001/XMLSchema#dateTime")
        );
        assert!(!rows[1].contains_key("d"));
    }

    #[test]
    fn test_parse_select_rejects_garbage() {
        assert!(matches!(
            parse_select("<html>"),
            Err(VirtuosoError::Json(_))
        ));
    }
}
