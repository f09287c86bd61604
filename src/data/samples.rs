//! Sample data packages bundled with the crate for tests and demos.

use anyhow::{bail, Context, Result};

use super::loader::parse_datapackage;
use super::model::DataPackage;
use crate::bibliography::{parse_bibtex, BibliographyRecord};

struct Sample {
    /// Citation key of the publication the curves were digitized from.
    key: &'static str,
    bibtex: &'static str,
    /// (descriptor, resource path, CSV)
    packages: &'static [(&'static str, &'static str, &'static str)],
}

const SAMPLES: &[Sample] = &[
    Sample {
        key: "alves_2011_electrochemistry_6010",
        bibtex: include_str!(
            "../../data/examples/alves_2011_electrochemistry_6010/alves_2011_electrochemistry_6010.bib"
        ),
        packages: &[(
            include_str!(
                "../../data/examples/alves_2011_electrochemistry_6010/alves_2011_electrochemistry_6010_f1a_solid.json"
            ),
            "alves_2011_electrochemistry_6010_f1a_solid.csv",
            include_str!(
                "../../data/examples/alves_2011_electrochemistry_6010/alves_2011_electrochemistry_6010_f1a_solid.csv"
            ),
        )],
    },
    Sample {
        key: "engstfeld_2018_polycrystalline_17743",
        bibtex: include_str!(
            "../../data/examples/engstfeld_2018_polycrystalline_17743/engstfeld_2018_polycrystalline_17743.bib"
        ),
        packages: &[(
            include_str!(
                "../../data/examples/engstfeld_2018_polycrystalline_17743/engstfeld_2018_polycrystalline_17743_f4b_1.json"
            ),
            "engstfeld_2018_polycrystalline_17743_f4b_1.csv",
            include_str!(
                "../../data/examples/engstfeld_2018_polycrystalline_17743/engstfeld_2018_polycrystalline_17743_f4b_1.csv"
            ),
        )],
    },
];

fn find(key: &str) -> Result<&'static Sample> {
    match SAMPLES.iter().find(|s| s.key == key) {
        Some(sample) => Ok(sample),
        None => {
            let known: Vec<&str> = SAMPLES.iter().map(|s| s.key).collect();
            bail!("No sample data for '{key}'. Available: {}", known.join(", "))
        }
    }
}

/// Citation keys with bundled sample data.
pub fn sample_keys() -> impl Iterator<Item = &'static str> {
    SAMPLES.iter().map(|s| s.key)
}

/// The bundled data packages digitized from the publication `key`.
pub fn sample_packages(key: &str) -> Result<Vec<DataPackage>> {
    let sample = find(key)?;
    sample
        .packages
        .iter()
        .map(|(descriptor, path, csv)| {
            parse_datapackage(descriptor, |requested| {
                if requested != *path {
                    bail!("Sample resource '{requested}' is not bundled");
                }
                Ok(csv.to_string())
            })
            .with_context(|| format!("loading sample {path}"))
        })
        .collect()
}

/// The bibliography record of the publication `key`.
pub fn sample_bibliography(key: &str) -> Result<BibliographyRecord> {
    let sample = find(key)?;
    parse_bibtex(sample.bibtex)?
        .into_iter()
        .find(|r| r.key == key)
        .with_context(|| format!("sample bibliography lacks '{key}'"))
}
