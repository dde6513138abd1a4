//! isql script templates
//!
//! Templates are plain text with `##NAME##` placeholders; no SQL parsing is
//! involved.

use sparql_updater_core::vocab;
use std::path::PathBuf;

const CREATE_UPDATE: &str = include_str!("../templates/create_update_graph.sql");
const RENAME: &str = include_str!("../templates/rename_graph.sql");
const REMOVE: &str = include_str!("../templates/remove_graph.sql");

/// Renders the isql scripts for one store.
#[derive(Debug, Clone)]
pub struct IsqlTemplate {
    import_folder: PathBuf,
    graph_base: String,
}

impl IsqlTemplate {
    pub fn new(import_folder: impl Into<PathBuf>, graph_base: impl Into<String>) -> Self {
        Self {
            import_folder: import_folder.into(),
            graph_base: graph_base.into(),
        }
    }

    /// Load `<import>/<id>.ttl.gz` into graph `graph_id`.
    ///
    /// `graph_id` may be a temp graph id; the load file is always named after
    /// the dataset id.
    pub fn create_update(&self, graph_id: &str) -> String {
        let folder = self.import_folder.to_string_lossy();
        let folder = folder.trim_end_matches('/');
        self.render(CREATE_UPDATE, graph_id)
            .replace("##TTL_FILENAME##", vocab::final_graph_id(graph_id))
            .replace("##IMPORT_FOLDER##", folder)
    }

    /// Move the temp graph of `dataset_id` to its final name.
    pub fn rename(&self, dataset_id: &str) -> String {
        self.render(RENAME, dataset_id)
    }

    /// Drop the final graph, or the temp graph when `temp` is set.
    pub fn remove(&self, dataset_id: &str, temp: bool) -> String {
        if temp {
            self.render(REMOVE, &vocab::temp_graph_id(dataset_id))
        } else {
            self.render(REMOVE, dataset_id)
        }
    }

    fn render(&self, template: &str, graph_id: &str) -> String {
        template
            .replace("##GRAPH_BASE##", &self.graph_base)
            .replace("##DATASET_ID##", graph_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparql_updater_core::vocab::{DEFAULT_GRAPH_BASE, TEMP_GRAPH_SUFFIX};

    fn templates() -> IsqlTemplate {
        IsqlTemplate::new("/data/import/", DEFAULT_GRAPH_BASE)
    }

    #[test]
    fn test_create_update_temp_graph() {
        let script = templates().create_update("2048_new");
        assert!(script.contains("ld_dir('/data/import', '2048.ttl.gz', 'http://data.europeana.eu/dataset/2048_new');"));
        assert!(script.contains("FROM <http://data.europeana.eu/dataset/2048_new>"));
        assert!(script.contains("Result triples: "));
        assert!(!script.contains("##"));
    }

    #[test]
    fn test_rename() {
        let script = templates().rename("2048");
        assert!(script.contains("SET g = iri_to_id('http://data.europeana.eu/dataset/2048')"));
        assert!(script.contains("WHERE g = iri_to_id('http://data.europeana.eu/dataset/2048_new', 0)"));
    }

    #[test]
    fn test_remove_final_and_temp() {
        let t = templates();
        let final_graph = t.remove("2048", false);
        let temp_graph = t.remove("2048", true);
        assert!(final_graph.contains("iri_to_id('http://data.europeana.eu/dataset/2048', 0)"));
        assert!(temp_graph.contains(&format!(
            "iri_to_id('http://data.europeana.eu/dataset/2048{TEMP_GRAPH_SUFFIX}', 0)"
        )));
    }
}
