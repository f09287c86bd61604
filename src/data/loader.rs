use std::path::Path;

use anyhow::{bail, Context, Result};
use serde_json::{Map, Value as JsonValue};

use super::model::{DataPackage, Resource, Schema, Table};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a data package from its JSON descriptor. Resource CSV files are
/// resolved relative to the descriptor's directory.
pub fn load_datapackage(path: &Path) -> Result<DataPackage> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading descriptor {}", path.display()))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    parse_datapackage(&text, |resource_path| {
        let csv_path = dir.join(resource_path);
        std::fs::read_to_string(&csv_path)
            .with_context(|| format!("reading resource {}", csv_path.display()))
    })
    .with_context(|| format!("loading data package {}", path.display()))
}

/// Whether a parsed JSON document looks like a data package descriptor.
pub fn is_datapackage(value: &JsonValue) -> bool {
    value
        .get("resources")
        .and_then(JsonValue::as_array)
        .is_some_and(|r| !r.is_empty())
}

/// Parse a descriptor; `read_resource` supplies the CSV text for a resource path.
///
/// Expected layout (frictionless data package):
///
/// ```json
/// {
///   "resources": [{
///     "name": "alves_2011_electrochemistry_6010_f1a_solid",
///     "path": "alves_2011_electrochemistry_6010_f1a_solid.csv",
///     "schema": {"fields": [{"name": "E", "unit": "V", "reference": "RHE"}, ...]}
///   }],
///   "source": {...},
///   "system": {...}
/// }
/// ```
pub fn parse_datapackage<F>(text: &str, mut read_resource: F) -> Result<DataPackage>
where
    F: FnMut(&str) -> Result<String>,
{
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let JsonValue::Object(mut descriptor) = root else {
        bail!("Expected a JSON object as data package descriptor");
    };

    let resources = match descriptor.remove("resources") {
        Some(JsonValue::Array(resources)) => resources,
        _ => bail!("Descriptor has no 'resources' array"),
    };

    let mut parsed = Vec::with_capacity(resources.len());
    for (i, res) in resources.into_iter().enumerate() {
        let JsonValue::Object(res) = res else {
            bail!("Resource {i} is not a JSON object");
        };
        parsed.push(parse_resource(i, res, &mut read_resource)?);
    }

    Ok(DataPackage::new(descriptor, parsed)?)
}

fn parse_resource<F>(index: usize, mut res: Map<String, JsonValue>, read_resource: &mut F) -> Result<Resource>
where
    F: FnMut(&str) -> Result<String>,
{
    let name = res
        .get("name")
        .and_then(JsonValue::as_str)
        .with_context(|| format!("Resource {index}: missing 'name'"))?
        .to_string();

    let schema: Schema = match res.remove("schema") {
        Some(schema) => serde_json::from_value(schema)
            .with_context(|| format!("Resource '{name}': invalid schema"))?,
        None => Schema::default(),
    };

    let path = res
        .get("path")
        .and_then(JsonValue::as_str)
        .with_context(|| format!("Resource '{name}': missing 'path'"))?
        .to_string();

    let text = read_resource(&path)?;
    let table = parse_csv(&text, &schema).with_context(|| format!("Resource '{name}'"))?;

    Ok(Resource {
        name,
        path: Some(path),
        schema,
        table,
    })
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Parse a CSV table with a header row into numeric columns.
///
/// Every schema field must appear in the header; columns without a schema
/// field are kept as well. Empty cells become `NaN`.
pub fn parse_csv(text: &str, schema: &Schema) -> Result<Table> {
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for field in schema.field_names() {
        if !headers.iter().any(|h| h == field) {
            bail!("CSV missing '{field}' column");
        }
    }

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        for (col_idx, col) in columns.iter_mut().enumerate() {
            let cell = record.get(col_idx).unwrap_or("").trim();
            col.push(parse_cell(cell, row_no, &headers[col_idx])?);
        }
    }

    Ok(Table::from_columns(headers.into_iter().zip(columns).collect())?)
}

fn parse_cell(s: &str, row: usize, col: &str) -> Result<f64> {
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>()
        .with_context(|| format!("Row {row}, {col}: '{s}' is not a number"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "resources": [{
            "name": "sample_f1_a",
            "path": "sample_f1_a.csv",
            "schema": {"fields": [
                {"name": "E", "type": "number", "unit": "V", "reference": "RHE"},
                {"name": "j", "type": "number", "unit": "A / m2"}
            ]}
        }],
        "source": {"citation key": "sample", "figure": "1"}
    }"#;

    #[test]
    fn test_parse_datapackage() {
        let package = parse_datapackage(DESCRIPTOR, |path| {
            assert_eq!(path, "sample_f1_a.csv");
            Ok("E,j\n0.1,1.5\n0.2,\n".to_string())
        })
        .unwrap();

        assert_eq!(package.name(), "sample_f1_a");
        assert!(package.descriptor().contains_key("source"));
        assert!(!package.descriptor().contains_key("resources"));

        let table = &package.primary().table;
        assert_eq!(table.column("E"), Some(&[0.1, 0.2][..]));
        assert!(table.column("j").unwrap()[1].is_nan());
    }

    #[test]
    fn test_missing_schema_column() {
        let err = parse_datapackage(DESCRIPTOR, |_| Ok("E\n0.1\n".to_string())).unwrap_err();
        assert!(format!("{err:#}").contains("CSV missing 'j' column"));
    }

    #[test]
    fn test_not_a_number() {
        let err = parse_datapackage(DESCRIPTOR, |_| Ok("E,j\n0.1,abc\n".to_string())).unwrap_err();
        assert!(format!("{err:#}").contains("'abc' is not a number"));
    }

    #[test]
    fn test_descriptor_without_resources() {
        assert!(parse_datapackage(r#"{"resources": []}"#, |_| unreachable!()).is_err());
        assert!(!is_datapackage(&serde_json::json!({"source": {}})));
        assert!(is_datapackage(&serde_json::json!({"resources": [{}]})));
    }
}
