use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use echemdb::{Database, Entry, THUMBNAIL_SIZE};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.database.is_none() {
        ui.label("No database loaded.");
        return;
    }

    // Clone what we need so we can mutate state inside the loop.
    let materials: Vec<(String, bool)> = state
        .materials
        .iter()
        .map(|(m, shown)| (m.clone(), *shown))
        .collect();
    let choices = state.axis_choices();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Axes ----
            ui.strong("Axes");
            let mut x_label = state.x_label.clone();
            let mut y_label = state.y_label.clone();
            axis_combo(ui, "x_axis", "x", &mut x_label, &choices);
            axis_combo(ui, "y_axis", "y", &mut y_label, &choices);
            if x_label != state.x_label || y_label != state.y_label {
                state.set_axes(x_label, y_label);
            }

            let mut force = state.force;
            if ui.checkbox(&mut force, "Plot more than 10 entries").changed() {
                state.force = force;
                state.replot();
            }
            ui.separator();

            // ---- Working electrode materials ----
            egui::CollapsingHeader::new(RichText::new("Working electrode").strong())
                .id_salt("materials")
                .default_open(true)
                .show(ui, |ui: &mut Ui| {
                    ui.horizontal(|ui: &mut Ui| {
                        if ui.small_button("All").clicked() {
                            state.set_all_materials(true);
                        }
                        if ui.small_button("None").clicked() {
                            state.set_all_materials(false);
                        }
                    });

                    for (material, shown) in &materials {
                        let mut checked = *shown;
                        if ui.checkbox(&mut checked, material.as_str()).changed() {
                            state.toggle_material(material);
                        }
                    }
                });
            ui.separator();

            // ---- Visible entries ----
            ui.strong("Entries");
            let thumbnails = &mut state.thumbnails;
            if let Some(visible) = &state.visible {
                for entry in visible {
                    ui.label(entry.identifier()).on_hover_ui(|ui: &mut Ui| {
                        if let Some(record) = entry.bibliography() {
                            ui.label(record.title().unwrap_or(&record.key));
                        }
                        let png = thumbnails
                            .entry(entry.identifier().to_string())
                            .or_insert_with(|| render_thumbnail(&entry));
                        if let Some(png) = png {
                            let uri = format!("bytes://{}.png", entry.identifier());
                            ui.add(egui::Image::from_bytes(uri, png.clone()));
                        }
                    });
                }
            }
        });
}

fn render_thumbnail(entry: &Entry<'_>) -> Option<Vec<u8>> {
    let (width, height) = THUMBNAIL_SIZE;
    match entry.thumbnail(width, height) {
        Ok(png) => Some(png),
        Err(e) => {
            log::debug!("No thumbnail for {}: {e}", entry.identifier());
            None
        }
    }
}

fn axis_combo(ui: &mut Ui, id: &str, label: &str, selected: &mut String, choices: &[String]) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(selected.as_str())
            .show_ui(ui, |ui: &mut Ui| {
                for choice in choices {
                    ui.selectable_value(selected, choice.clone(), choice.as_str());
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Load examples").clicked() {
                load(state, Database::create_example());
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(db) = &state.database {
            ui.label(format!(
                "{} entries loaded, {} visible",
                db.len(),
                state.visible_count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Folder dialog
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open a directory of data packages")
        .pick_folder();

    if let Some(path) = folder {
        load(state, Database::from_dir(&path));
    }
}

fn load(state: &mut AppState, result: anyhow::Result<Database>) {
    match result {
        Ok(database) => {
            log::info!("Loaded {} entries", database.len());
            state.set_database(database);
        }
        Err(e) => {
            log::error!("Failed to load database: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
