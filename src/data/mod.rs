/// Data layer: data packages, loading, and the bundled samples.
///
/// Architecture:
/// ```text
///  datapackage.json + *.csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse descriptor + CSV → DataPackage
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ DataPackage  │  descriptor metadata, Vec<Resource>
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Database  │  sorted entries, filters, lookups
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod samples;
