//! RDF vocabulary constants and graph naming conventions
//!
//! The converter writes the provenance triple with these IRIs and the target
//! lister reads it back with the same ones, so both sides must agree.

/// Dublin Core terms
pub mod dcterms {
    /// dcterms:modified IRI
    pub const MODIFIED: &str = "http://purl.org/dc/terms/modified";
}

/// XSD vocabulary constants
pub mod xsd {
    /// xsd:dateTime IRI
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// Default prefix of dataset graph IRIs. The graph of dataset `42` is
/// `http://data.europeana.eu/dataset/42`, which is also the subject of its
/// provenance statement.
pub const DEFAULT_GRAPH_BASE: &str = "http://data.europeana.eu/dataset/";

/// Suffix appended to a dataset id to name its temp graph.
pub const TEMP_GRAPH_SUFFIX: &str = "_new";

/// Name of the temp graph for a dataset id (`42` -> `42_new`).
pub fn temp_graph_id(dataset_id: &str) -> String {
    format!("{dataset_id}{TEMP_GRAPH_SUFFIX}")
}

/// Strip the temp suffix, if any (`42_new` -> `42`).
pub fn final_graph_id(graph_id: &str) -> &str {
    graph_id
        .strip_suffix(TEMP_GRAPH_SUFFIX)
        .unwrap_or(graph_id)
}

/// Full graph IRI for a graph id under `base`.
pub fn graph_iri(base: &str, graph_id: &str) -> String {
    format!("{base}{graph_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_and_final_ids() {
        assert_eq!(temp_graph_id("2048"), "2048_new");
        assert_eq!(final_graph_id("2048_new"), "2048");
        assert_eq!(final_graph_id("2048"), "2048");
    }

    #[test]
    fn test_graph_iri() {
        assert_eq!(
            graph_iri(DEFAULT_GRAPH_BASE, "2048"),
            "http://data.europeana.eu/dataset/2048"
        );
    }
}
