use eframe::egui::{Color32, Ui};
use egui_plot::{Line, Plot, PlotPoints};

use crate::state::AppState;

// ---------------------------------------------------------------------------
// CV plot (central panel)
// ---------------------------------------------------------------------------

/// Render the figure of the visible entries in the central panel.
pub fn cv_plot(ui: &mut Ui, state: &AppState) {
    let figure = match &state.figure {
        Some(figure) => figure,
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                let message = state
                    .status_message
                    .as_deref()
                    .unwrap_or("Open a directory of data packages  (File → Open folder…)");
                ui.heading(message);
            });
            return;
        }
    };

    Plot::new("cv_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label(figure.layout.xaxis.title.clone())
        .y_axis_label(figure.layout.yaxis.title.clone())
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            for trace in figure.traces() {
                let [r, g, b] = trace.line.color;

                // NaN samples would connect across gaps; drop them.
                let points: PlotPoints = trace
                    .x
                    .iter()
                    .zip(trace.y.iter())
                    .filter(|(xi, yi)| xi.is_finite() && yi.is_finite())
                    .map(|(&xi, &yi)| [xi, yi])
                    .collect();

                let line = Line::new(points)
                    .name(&trace.name)
                    .color(Color32::from_rgb(r, g, b))
                    .width(trace.line.width);

                plot_ui.line(line);
            }
        });
}
