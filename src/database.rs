//! A database of cyclic voltammograms.
//!
//! Essentially a list of data packages with some convenience on top: entries
//! come out sorted by identifier, joined with their bibliography record, and
//! can be filtered, looked up and plotted.
//!
//! ```
//! use echemdb::Database;
//!
//! let database = Database::create_example().unwrap();
//! let alves = database.filter(|entry| {
//!     Some(entry.lookup_str("source.url")? == "https://doi.org/10.1039/C0CP01001D")
//! });
//! assert_eq!(alves.to_string(), "[Entry('alves_2011_electrochemistry_6010_f1a_solid')]");
//! ```

use std::convert::Infallible;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::bibliography::{Bibliography, BibliographyRecord};
use crate::collect::{local, remote};
use crate::color::generate_palette;
use crate::config::Settings;
use crate::data::model::DataPackage;
use crate::data::samples::{sample_bibliography, sample_packages};
use crate::entry::Entry;
use crate::error::DatabaseError;
use crate::figure::{Figure, Layout, Trace};

/// Most entries `plot` renders unless forced.
pub const PLOT_LIMIT: usize = 10;

/// Packages of the published website, relative to the extracted archive.
pub const REMOTE_PACKAGES: &str = "website-gh-pages/data/generated/svgdigitizer";

/// Bibliography files of the published website, relative to the extracted archive.
pub const REMOTE_BIBLIOGRAPHY: &str = "website-gh-pages/data/generated";

const EXAMPLE_KEYS: [&str; 2] = [
    "alves_2011_electrochemistry_6010",
    "engstfeld_2018_polycrystalline_17743",
];

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Receives debug diagnostics, e.g. why a filter dropped an entry.
pub trait DiagnosticSink: Send + Sync {
    fn debug(&self, message: &str);
}

/// Forwards diagnostics to the `log` facade under the `echemdb` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn debug(&self, message: &str) {
        log::debug!(target: "echemdb", "{message}");
    }
}

// ---------------------------------------------------------------------------
// Predicate results
// ---------------------------------------------------------------------------

/// What a filter predicate may return.
///
/// `None` means the predicate needed metadata the entry does not have; the
/// entry is then dropped like on `false`.
pub trait Verdict {
    fn verdict(self) -> Option<bool>;
}

impl Verdict for bool {
    fn verdict(self) -> Option<bool> {
        Some(self)
    }
}

impl Verdict for Option<bool> {
    fn verdict(self) -> Option<bool> {
        self
    }
}

// ---------------------------------------------------------------------------
// Description
// ---------------------------------------------------------------------------

/// Summary statistics of a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Description {
    #[serde(rename = "number of references")]
    pub number_of_references: usize,
    #[serde(rename = "number of entries")]
    pub number_of_entries: usize,
    pub materials: Vec<String>,
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// A collection of data packages with a bibliography to join them against.
#[derive(Clone)]
pub struct Database {
    packages: Vec<Arc<DataPackage>>,
    /// Shared with every database filtered from this one; never mutated.
    bibliography: Arc<Bibliography>,
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl Database {
    /// A database of `packages`; `records` are indexed by their own key.
    pub fn new<I>(packages: Vec<DataPackage>, records: I) -> Self
    where
        I: IntoIterator<Item = BibliographyRecord>,
    {
        Self::with_bibliography(packages, Arc::new(records.into_iter().collect()))
    }

    /// A database over an already built bibliography index.
    pub fn with_bibliography(packages: Vec<DataPackage>, bibliography: Arc<Bibliography>) -> Self {
        Database {
            packages: packages.into_iter().map(Arc::new).collect(),
            bibliography,
            diagnostics: Arc::new(LogSink),
        }
    }

    /// Create a database, fetching what is not given from the published website.
    ///
    /// Without `packages` the packages are downloaded and, unless
    /// `bibliography` is given, the bibliography as well. With `packages`
    /// but no `bibliography` the index is empty. Only the first case
    /// touches the network.
    pub fn open(
        packages: Option<Vec<DataPackage>>,
        bibliography: Option<Bibliography>,
        settings: &Settings,
    ) -> Result<Self> {
        let (packages, bibliography) = match packages {
            Some(packages) => (packages, bibliography.unwrap_or_default()),
            None => {
                let packages = remote::collect_datapackages(REMOTE_PACKAGES, settings)?;
                let bibliography = match bibliography {
                    Some(bibliography) => bibliography,
                    None => remote::collect_bibliography(REMOTE_BIBLIOGRAPHY, settings)?
                        .into_iter()
                        .collect(),
                };
                (packages, bibliography)
            }
        };

        log::info!(
            "Opened database with {} packages and {} references",
            packages.len(),
            bibliography.len()
        );
        Ok(Self::with_bibliography(packages, Arc::new(bibliography)))
    }

    /// The data packages published on the echemdb website.
    pub fn remote() -> Result<Self> {
        Self::open(None, None, &Settings::from_env())
    }

    /// The data packages and `.bib` files below a local directory.
    pub fn from_dir(path: &Path) -> Result<Self> {
        let packages = local::collect_datapackages(path)?;
        let records = local::collect_bibliography(path)?;
        log::info!(
            "Loaded {} packages and {} references from {}",
            packages.len(),
            records.len(),
            path.display()
        );
        Ok(Self::new(packages, records))
    }

    /// A small database of the bundled sample entries, for tests and demos.
    pub fn create_example() -> Result<Self> {
        let mut packages = Vec::new();
        let mut records = Vec::new();
        for key in EXAMPLE_KEYS {
            packages.extend(sample_packages(key)?);
            records.push(sample_bibliography(key)?);
        }
        Ok(Self::new(packages, records))
    }

    /// Route diagnostics to `sink` instead of the `log` facade.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// The packages in storage order.
    pub fn packages(&self) -> impl Iterator<Item = &DataPackage> {
        self.packages.iter().map(|p| p.as_ref())
    }

    fn sorted_packages(&self) -> Vec<&Arc<DataPackage>> {
        let mut sorted: Vec<&Arc<DataPackage>> = self.packages.iter().collect();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));
        sorted
    }

    fn entry<'a>(&'a self, package: &'a DataPackage) -> Entry<'a> {
        let record = Entry::new(package, None)
            .citation_key()
            .and_then(|key| self.bibliography.get(key));
        Entry::new(package, record)
    }

    /// All entries, sorted by identifier. Recomputed on every call.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        self.sorted_packages()
            .into_iter()
            .map(|package| self.entry(package))
            .collect()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Entry<'_>> {
        self.entries().into_iter()
    }

    /// The entry with this identifier.
    pub fn get(&self, identifier: &str) -> Result<Entry<'_>, DatabaseError> {
        let mut matches = self.iter().filter(|e| e.identifier() == identifier);
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(entry),
            (None, _) => Err(DatabaseError::NotFound {
                identifier: identifier.to_string(),
            }),
            (Some(_), Some(_)) => Err(DatabaseError::Ambiguous {
                identifier: identifier.to_string(),
            }),
        }
    }

    /// The subset of the database that satisfies `predicate`.
    ///
    /// Entries for which the predicate answers `None` (it needed metadata the
    /// entry lacks) are dropped and reported to the diagnostic sink.
    pub fn filter<P, R>(&self, predicate: P) -> Database
    where
        P: Fn(&Entry<'_>) -> R,
        R: Verdict,
    {
        match self.try_filter(|entry| Ok::<_, Infallible>(predicate(entry))) {
            Ok(database) => database,
            Err(never) => match never {},
        }
    }

    /// Like [`filter`](Self::filter), but the first error of `predicate` is returned.
    pub fn try_filter<P, R, E>(&self, predicate: P) -> Result<Database, E>
    where
        P: Fn(&Entry<'_>) -> Result<R, E>,
        R: Verdict,
    {
        let mut kept = Vec::new();
        for package in self.sorted_packages() {
            let entry = self.entry(package);
            match predicate(&entry)?.verdict() {
                Some(true) => kept.push(Arc::clone(package)),
                Some(false) => {}
                None => self.diagnostics.debug(&format!(
                    "Filter removed entry {entry} because a field the predicate reads is missing"
                )),
            }
        }

        Ok(Database {
            packages: kept,
            bibliography: Arc::clone(&self.bibliography),
            diagnostics: Arc::clone(&self.diagnostics),
        })
    }

    /// The bibliography records of the current entries only.
    pub fn bibliography(&self) -> Bibliography {
        self.iter()
            .filter_map(|entry| entry.bibliography())
            .cloned()
            .collect()
    }

    /// Working electrode materials in order of first appearance.
    pub fn materials(&self) -> Vec<String> {
        let mut materials: Vec<String> = Vec::new();
        for entry in self.iter() {
            match entry.working_electrode_material() {
                Some(material) => {
                    if !materials.iter().any(|m| m == material) {
                        materials.push(material.to_string());
                    }
                }
                None => self
                    .diagnostics
                    .debug(&format!("Entry {entry} has no working electrode material")),
            }
        }
        materials
    }

    /// Some statistics about the database.
    pub fn describe(&self) -> Description {
        Description {
            number_of_references: self.bibliography().len(),
            number_of_entries: self.len(),
            materials: self.materials(),
        }
    }

    /// Number of entries, without materializing them.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// A cyclic voltammogram (`j` vs `E`) of all entries.
    pub fn plot_default(&self) -> Result<Figure, DatabaseError> {
        self.plot("E", "j", false)
    }

    /// Overlay the `y` vs `x` curves of all entries.
    ///
    /// More than [`PLOT_LIMIT`] traces are unreadable, so larger databases
    /// are only plotted with `force`. Axis titles come from the first
    /// entry's units.
    pub fn plot(&self, x: &str, y: &str, force: bool) -> Result<Figure, DatabaseError> {
        if self.len() > PLOT_LIMIT && !force {
            return Err(DatabaseError::TooManyEntries {
                count: self.len(),
                limit: PLOT_LIMIT,
            });
        }

        let entries = self.entries();
        let (x_title, y_title) = match entries.first() {
            Some(first) => {
                let x = first.normalize_field_name(x)?;
                let y = first.normalize_field_name(y)?;
                (first.axis_label(x), first.axis_label(y))
            }
            None => (x.to_string(), y.to_string()),
        };

        let mut figure = Figure::new(Layout::overlay(x_title, y_title));
        for (entry, color) in entries.iter().zip(generate_palette(entries.len())) {
            let (xs, ys) = entry.curve(x, y)?;
            figure.add_trace(Trace::lines(
                entry.figure_name(),
                xs.to_vec(),
                ys.to_vec(),
                color,
            ));
        }
        Ok(figure)
    }
}

impl<'a> IntoIterator for &'a Database {
    type Item = Entry<'a>;
    type IntoIter = std::vec::IntoIter<Entry<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// `[Entry('a'), Entry('b')]`
impl fmt::Display for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.iter().map(|e| e.to_string()).collect();
        write!(f, "[{}]", entries.join(", "))
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("entries", &self.to_string())
            .field("references", &self.bibliography.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::entry::FieldLookup;
    use pretty_assertions::assert_eq;

    const ALVES: &str = "alves_2011_electrochemistry_6010_f1a_solid";
    const ENGSTFELD: &str = "engstfeld_2018_polycrystalline_17743_f4b_1";

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl DiagnosticSink for Collect {
        fn debug(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn alves_package() -> DataPackage {
        sample_packages("alves_2011_electrochemistry_6010").unwrap().remove(0)
    }

    /// `n` copies of the Alves curve named `entry_00`, `entry_01`, ...
    fn numbered(n: usize) -> Database {
        let package = alves_package();
        let packages = (0..n).map(|i| package.renamed(&format!("entry_{i:02}"))).collect();
        Database::new(packages, [])
    }

    fn identifiers(database: &Database) -> Vec<&str> {
        database.iter().map(|e| e.identifier()).collect()
    }

    #[test]
    fn test_empty_database() {
        let database = Database::new(Vec::new(), []);
        assert_eq!(database.len(), 0);
        assert!(database.is_empty());
        assert_eq!(database.to_string(), "[]");
        assert_eq!(database.materials(), Vec::<String>::new());
    }

    #[test]
    fn test_example_sorted() {
        let database = Database::create_example().unwrap();
        assert_eq!(identifiers(&database), [ALVES, ENGSTFELD]);
        assert_eq!(database.to_string(), format!("[Entry('{ALVES}'), Entry('{ENGSTFELD}')]"));
    }

    #[test]
    fn test_iteration_sorted_and_stable() {
        let package = alves_package();
        let packages = ["c", "a", "b"].iter().map(|n| package.renamed(n)).collect();
        let database = Database::new(packages, []);
        assert_eq!(identifiers(&database), ["a", "b", "c"]);
        assert_eq!(identifiers(&database), identifiers(&database));
        let names: Vec<&str> = database.packages().map(|p| p.name()).collect();
        assert_eq!(names, ["c", "a", "b"]);
    }

    #[test]
    fn test_bibliography_joined_by_citation_key() {
        let database = Database::create_example().unwrap();
        for entry in &database {
            let record = entry.bibliography().expect("sample entries are cited");
            assert_eq!(Some(record.key.as_str()), entry.citation_key());
        }

        let uncited = Database::new(vec![alves_package()], []);
        assert!(uncited.iter().all(|e| e.bibliography().is_none()));
    }

    #[test]
    fn test_get_round_trips() {
        let database = Database::create_example().unwrap();
        for entry in &database {
            assert_eq!(database.get(entry.identifier()).unwrap(), entry);
        }
    }

    #[test]
    fn test_get_round_trips_with_gaps() {
        let package = crate::data::loader::parse_datapackage(
            r#"{"resources": [{"name": "gap", "path": "gap.csv", "schema": {"fields": [
                {"name": "E", "type": "number", "unit": "V"},
                {"name": "j", "type": "number", "unit": "A / m2"}
            ]}}]}"#,
            |_| Ok("E,j\n0.1,1.0\n0.2,\n".to_string()),
        )
        .unwrap();
        assert!(package.primary().table.column("j").unwrap()[1].is_nan());

        let database = Database::new(vec![package], []);
        let entry = database.get("gap").unwrap();
        assert_eq!(database.get(entry.identifier()).unwrap(), entry);
        assert_eq!(database.iter().next().unwrap(), entry);
    }

    #[test]
    fn test_bibliography_follows_entry_order_ignoring_case() {
        let mut packages = Vec::new();
        let mut records = Vec::new();
        for key in EXAMPLE_KEYS.iter().rev() {
            packages.extend(sample_packages(key).unwrap());
            let mut record = sample_bibliography(key).unwrap();
            record.key = record.key.to_uppercase();
            records.push(record);
        }
        let database = Database::new(packages, records);

        assert!(database.iter().all(|e| e.bibliography().is_some()));
        assert_eq!(
            database.bibliography().keys().collect::<Vec<_>>(),
            ["ALVES_2011_ELECTROCHEMISTRY_6010", "ENGSTFELD_2018_POLYCRYSTALLINE_17743"]
        );
    }

    #[test]
    fn test_get_missing() {
        let database = Database::create_example().unwrap();
        let err = database.get("invalid_key").unwrap_err();
        assert!(matches!(&err, DatabaseError::NotFound { identifier } if identifier == "invalid_key"));
        assert_eq!(err.to_string(), "No database entry with identifier 'invalid_key'.");
    }

    #[test]
    fn test_get_ambiguous() {
        let package = alves_package();
        let database = Database::new(vec![package.clone(), package], []);
        assert!(matches!(
            database.get(ALVES),
            Err(DatabaseError::Ambiguous { identifier }) if identifier == ALVES
        ));
    }

    #[test]
    fn test_filter_by_url() {
        let database = Database::create_example().unwrap();
        let filtered = database.filter(|entry| {
            Some(entry.lookup_str("source.url")? == "https://doi.org/10.1039/C0CP01001D")
        });
        assert_eq!(identifiers(&filtered), [ALVES]);
        assert_eq!(database.len(), 2);
        assert!(Arc::ptr_eq(&database.bibliography, &filtered.bibliography));
    }

    #[test]
    fn test_filter_missing_field_drops_entry() {
        let sink = Arc::new(Collect::default());
        let database = Database::create_example()
            .unwrap()
            .with_diagnostics(sink.clone());

        let filtered = database.filter(|entry| entry.lookup("non.existant.property").map(|_| true));
        assert!(filtered.is_empty());
        assert_eq!(filtered.to_string(), "[]");

        let messages = sink.0.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains(ALVES));
    }

    #[test]
    fn test_filter_counts_matches() {
        let database = numbered(6);
        let even = database.filter(|entry| {
            entry.identifier().ends_with(['0', '2', '4', '6', '8'])
        });
        assert_eq!(even.len(), 3);
        assert_eq!(identifiers(&even), ["entry_00", "entry_02", "entry_04"]);
    }

    #[test]
    fn test_try_filter_propagates_errors() {
        let database = Database::create_example().unwrap();
        let result = database.try_filter(|entry| {
            if entry.identifier() == ENGSTFELD {
                Err(format!("cannot decide {entry}"))
            } else {
                Ok(true)
            }
        });
        assert_eq!(result.unwrap_err(), format!("cannot decide Entry('{ENGSTFELD}')"));

        let kept = database
            .try_filter(|entry| Ok::<_, String>(entry.working_electrode_material().map(|m| m == "Cu")))
            .unwrap();
        assert_eq!(identifiers(&kept), [ENGSTFELD]);
    }

    #[test]
    fn test_bibliography_is_projection() {
        let database = Database::create_example().unwrap();
        assert_eq!(database.bibliography().len(), 2);

        let filtered = database.filter(|entry| entry.identifier() == ENGSTFELD);
        let bibliography = filtered.bibliography();
        assert_eq!(bibliography.keys().collect::<Vec<_>>(), ["engstfeld_2018_polycrystalline_17743"]);
        assert_eq!(filtered.bibliography.len(), 2);
    }

    #[test]
    fn test_describe_example() {
        let database = Database::create_example().unwrap();
        assert_eq!(
            database.describe(),
            Description {
                number_of_references: 2,
                number_of_entries: 2,
                materials: vec!["Ru".to_string(), "Cu".to_string()],
            }
        );

        let json = serde_json::to_value(database.describe()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "number of references": 2,
                "number of entries": 2,
                "materials": ["Ru", "Cu"],
            })
        );
    }

    #[test]
    fn test_describe_counts_entries() {
        for n in [0, 1, 4] {
            let database = numbered(n);
            assert_eq!(database.describe().number_of_entries, database.len());
        }
        assert_eq!(numbered(4).materials(), ["Ru"]);
    }

    #[test]
    fn test_plot_example() {
        let database = Database::create_example().unwrap();
        let figure = database.plot_default().unwrap();
        assert_eq!(figure.traces().len(), 2);
        assert_eq!(figure.traces()[0].name, "Fig. 1a: solid");
        assert_eq!(figure.traces()[1].name, "Fig. 4b: 1");
        assert_eq!(figure.layout.xaxis.title, "E [V vs. RHE]");
        assert_eq!(figure.layout.yaxis.title, "j [A / m2]");
        assert_ne!(figure.traces()[0].line.color, figure.traces()[1].line.color);
    }

    #[test]
    fn test_plot_guard() {
        let database = numbered(11);
        let err = database.plot_default().unwrap_err();
        assert!(matches!(err, DatabaseError::TooManyEntries { count: 11, limit: 10 }));
        assert!(err.to_string().contains("`force`"));

        let figure = database.plot("E", "j", true).unwrap();
        assert_eq!(figure.traces().len(), 11);

        assert_eq!(numbered(10).plot_default().unwrap().traces().len(), 10);
    }

    #[test]
    fn test_plot_unknown_axis() {
        let database = Database::create_example().unwrap();
        assert!(matches!(
            database.plot("E", "x", false),
            Err(DatabaseError::NoAxis(name)) if name == "x"
        ));
    }

    #[test]
    fn test_open_with_packages_stays_local() {
        let settings = Settings {
            remote_url: "http://127.0.0.1:9/unreachable.zip".to_string(),
            cache_dir: std::env::temp_dir().join("echemdb-never-used"),
        };
        let database = Database::open(Some(vec![alves_package()]), None, &settings).unwrap();
        assert_eq!(database.len(), 1);
        assert_eq!(database.describe().number_of_references, 0);
        assert!(database.packages().all(|p| p.lookup("source").is_some()));
    }
}
