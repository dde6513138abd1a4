//! Where dataset archives come from
//!
//! [`SourceInventory`] lists the published datasets and fetches one archive
//! at a time; [`MirrorDirectory`] implements it over a local directory such
//! as a mounted FTP share.

pub mod error;
pub mod mirror;

pub use error::{Result, SourceError};
pub use mirror::{MirrorDirectory, SourceInventory};
