//! Work with the cyclic voltammogram data packages of the echemdb.
//!
//! A [`Database`] holds data packages and a bibliography; iterating it yields
//! [`Entry`] values sorted by identifier, each joined with the bibliography
//! record of its source publication.

pub mod bibliography;
pub mod collect;
pub mod color;
pub mod config;
pub mod data;
pub mod database;
pub mod entry;
pub mod error;
pub mod figure;

pub use bibliography::{Bibliography, BibliographyRecord};
pub use config::Settings;
pub use data::model::DataPackage;
pub use database::{Database, Description, DiagnosticSink, LogSink, Verdict, PLOT_LIMIT};
pub use entry::{Entry, FieldLookup, THUMBNAIL_SIZE};
pub use error::DatabaseError;
pub use figure::Figure;
