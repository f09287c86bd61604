//! Command-line interface of the `echemdb` binary.
//!
//! - `echemdb --example describe`
//! - `echemdb --data ./generated list --material Cu`
//! - `echemdb plot --x t --y E --out figure.json`
//! - `echemdb --example thumbnail engstfeld_2018_polycrystalline_17743_f4b_1 -o cu.png`
//! - `echemdb view`

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use echemdb::{Database, Settings, THUMBNAIL_SIZE};

/// Browse the cyclic voltammograms of the echemdb.
#[derive(Parser, Debug)]
#[command(name = "echemdb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub source: Source,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the database is read from. Without flags the published website
/// archive is downloaded (see `ECHEMDB_REMOTE_URL`, `ECHEMDB_CACHE_DIR`).
#[derive(Args, Debug)]
pub struct Source {
    /// Directory with data packages (`*.json` + `*.csv`) and `*.bib` files
    #[arg(long, global = true, conflicts_with = "example")]
    pub data: Option<PathBuf>,

    /// Use the bundled sample entries
    #[arg(long, global = true)]
    pub example: bool,
}

impl Source {
    pub fn open(&self) -> Result<Database> {
        match (&self.data, self.example) {
            (Some(dir), _) => Database::from_dir(dir),
            (None, true) => Database::create_example(),
            (None, false) => Database::open(None, None, &Settings::from_env()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the number of references, entries and the materials as JSON
    Describe {
        /// Only entries with this working electrode material
        #[arg(short, long)]
        material: Option<String>,
    },

    /// Print the identifiers of all entries
    List {
        /// Only entries with this working electrode material
        #[arg(short, long)]
        material: Option<String>,
    },

    /// Write a plotly figure of all entries as JSON
    Plot {
        /// Field on the x axis
        #[arg(short, long, default_value = "E")]
        x: String,

        /// Field on the y axis (`j` falls back to `I`)
        #[arg(short, long, default_value = "j")]
        y: String,

        /// Plot even when there are more than ten entries
        #[arg(short, long)]
        force: bool,

        /// Only entries with this working electrode material
        #[arg(short, long)]
        material: Option<String>,

        /// Output file; standard output when omitted
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Write a PNG thumbnail of a single entry's voltammogram
    Thumbnail {
        /// Identifier of the entry
        identifier: String,

        /// Output file
        #[arg(short, long)]
        out: PathBuf,

        /// Width in pixels
        #[arg(long, default_value_t = THUMBNAIL_SIZE.0)]
        width: u32,

        /// Height in pixels
        #[arg(long, default_value_t = THUMBNAIL_SIZE.1)]
        height: u32,
    },

    /// Open a window plotting the entries, filterable by material
    View,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Restrict `database` to entries whose working electrode is `material`.
pub fn by_material(database: Database, material: Option<&str>) -> Database {
    match material {
        Some(material) => database.filter(|entry| {
            Some(entry.working_electrode_material()? == material)
        }),
        None => database,
    }
}
