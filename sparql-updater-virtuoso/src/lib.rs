//! Virtuoso integration for the SPARQL updater
//!
//! # Architecture
//!
//! - [`template`]: the three isql scripts (create/update, rename, remove)
//! - [`executor`]: runs `isql` against a scratch script and captures its output
//! - [`graph_manager`]: [`GraphStore`] and its isql-backed implementation
//! - [`sparql`]: minimal SPARQL 1.1 protocol client (JSON results)
//! - [`inventory`]: [`TargetInventory`] listing dataset graphs over SPARQL

pub mod error;
pub mod executor;
pub mod graph_manager;
pub mod inventory;
pub mod sparql;
pub mod template;

pub use error::{Result, VirtuosoError};
pub use executor::{IsqlConnection, IsqlExecutor, ProcessOutput};
pub use graph_manager::{GraphStore, VirtuosoGraphManager};
pub use inventory::{CorruptionRule, SparqlTargetInventory, TargetInventory};
pub use sparql::{RdfTerm, Solution, SparqlClient};
pub use template::IsqlTemplate;
