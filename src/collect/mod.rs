//! Collectors supplying data packages and bibliography records, either from
//! a local directory or from the archive of the published website.

pub mod local;
pub mod remote;
