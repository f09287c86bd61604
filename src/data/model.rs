use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatabaseError;

// ---------------------------------------------------------------------------
// Field / Schema – the column description of a tabular resource
// ---------------------------------------------------------------------------

/// One column of a resource, e.g. `{"name": "E", "unit": "V", "reference": "RHE"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Reference electrode of a potential axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Schema keys we do not interpret.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Field {
    /// A numeric field with a unit.
    pub fn number(name: &str, unit: &str) -> Self {
        Field {
            name: name.to_string(),
            field_type: Some("number".to_string()),
            unit: Some(unit.to_string()),
            reference: None,
            extra: Map::new(),
        }
    }
}

/// Table schema of a resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// Table – column-major numeric data
// ---------------------------------------------------------------------------

/// Numeric data of a resource, stored per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl Table {
    /// Build a table from named columns. All columns must have the same length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, DatabaseError> {
        if let Some((_, first)) = columns.first() {
            let rows = first.len();
            if let Some((name, col)) = columns.iter().find(|(_, c)| c.len() != rows) {
                return Err(DatabaseError::RaggedTable {
                    column: name.clone(),
                    expected: rows,
                    actual: col.len(),
                });
            }
        }
        let (columns, values) = columns.into_iter().unzip();
        Ok(Table { columns, values })
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|i| self.values[i].as_slice())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Resource / DataPackage
// ---------------------------------------------------------------------------

/// A named tabular resource of a data package (one measured curve).
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub name: String,
    /// CSV file relative to the descriptor, if the resource was loaded from disk.
    pub path: Option<String>,
    pub schema: Schema,
    pub table: Table,
}

/// A self-describing bundle of resources plus free-form metadata
/// (`source`, `system`, `figure description`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct DataPackage {
    descriptor: Map<String, Value>,
    resources: Vec<Resource>,
}

impl DataPackage {
    /// Create a package. The first resource names the package, so there must be one.
    pub fn new(
        descriptor: Map<String, Value>,
        resources: Vec<Resource>,
    ) -> Result<Self, DatabaseError> {
        if resources.is_empty() {
            return Err(DatabaseError::EmptyPackage);
        }
        Ok(DataPackage {
            descriptor,
            resources,
        })
    }

    /// Name of the primary resource; sort key and entry identifier.
    pub fn name(&self) -> &str {
        &self.resources[0].name
    }

    /// The primary resource holding the curve.
    pub fn primary(&self) -> &Resource {
        &self.resources[0]
    }

    /// Metadata of the package without the `resources` key.
    pub fn descriptor(&self) -> &Map<String, Value> {
        &self.descriptor
    }

    /// A copy of this package whose primary resource carries another name.
    pub fn renamed(&self, name: &str) -> Self {
        let mut package = self.clone();
        package.resources[0].name = name.to_string();
        package
    }
}
