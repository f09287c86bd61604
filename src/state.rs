use std::collections::{BTreeMap, HashMap};

use echemdb::{Database, Figure};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full viewer state, independent of rendering.
pub struct AppState {
    /// Everything that was loaded.
    pub database: Option<Database>,

    /// Working electrode material → whether its entries are shown.
    pub materials: BTreeMap<String, bool>,

    /// Entries passing the material filter (cached).
    pub visible: Option<Database>,

    /// Fields on the axes.
    pub x_label: String,
    pub y_label: String,

    /// Plot more than ten entries anyway.
    pub force: bool,

    /// Figure of the visible entries (cached).
    pub figure: Option<Figure>,

    /// PNG thumbnails by identifier, rendered on first hover.
    pub thumbnails: HashMap<String, Option<Vec<u8>>>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            database: None,
            materials: BTreeMap::new(),
            visible: None,
            x_label: "E".to_string(),
            y_label: "j".to_string(),
            force: false,
            figure: None,
            thumbnails: HashMap::new(),
            status_message: None,
        }
    }
}

impl AppState {
    /// Ingest a newly loaded database and show all of its entries.
    pub fn set_database(&mut self, database: Database) {
        self.materials = database.materials().into_iter().map(|m| (m, true)).collect();
        self.database = Some(database);
        self.thumbnails.clear();
        self.status_message = None;
        self.refilter();
    }

    /// Recompute the visible entries after a filter change.
    pub fn refilter(&mut self) {
        let Some(database) = &self.database else {
            return;
        };
        let materials = &self.materials;
        self.visible = Some(database.filter(|entry| {
            let material = entry.working_electrode_material()?;
            Some(materials.get(material).copied().unwrap_or(false))
        }));
        self.replot();
    }

    /// Rebuild the figure after an axis, filter or `force` change.
    pub fn replot(&mut self) {
        let Some(visible) = &self.visible else {
            self.figure = None;
            return;
        };
        match visible.plot(&self.x_label, &self.y_label, self.force) {
            Ok(figure) => {
                self.figure = Some(figure);
                self.status_message = None;
            }
            Err(e) => {
                log::warn!("Cannot plot: {e}");
                self.figure = None;
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Field names offered for the axes, taken from the first visible entry.
    pub fn axis_choices(&self) -> Vec<String> {
        self.visible
            .as_ref()
            .and_then(|db| db.iter().next())
            .map(|entry| {
                entry
                    .package()
                    .primary()
                    .schema
                    .field_names()
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set_axes(&mut self, x_label: String, y_label: String) {
        self.x_label = x_label;
        self.y_label = y_label;
        self.replot();
    }

    /// Toggle whether entries of a material are shown.
    pub fn toggle_material(&mut self, material: &str) {
        if let Some(shown) = self.materials.get_mut(material) {
            *shown = !*shown;
        }
        self.refilter();
    }

    /// Show or hide all materials.
    pub fn set_all_materials(&mut self, shown: bool) {
        for value in self.materials.values_mut() {
            *value = shown;
        }
        self.refilter();
    }

    pub fn visible_count(&self) -> usize {
        self.visible.as_ref().map_or(0, Database::len)
    }
}
