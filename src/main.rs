mod app;
mod cli;
mod state;
mod ui;

use anyhow::{anyhow, Context, Result};
use app::ViewerApp;
use cli::{by_material, Cli, Commands};
use eframe::egui;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse_args();
    let database = cli.source.open()?;

    match cli.command {
        Commands::Describe { material } => {
            let database = by_material(database, material.as_deref());
            println!("{}", serde_json::to_string_pretty(&database.describe())?);
        }
        Commands::List { material } => {
            for entry in &by_material(database, material.as_deref()) {
                println!("{}", entry.identifier());
            }
        }
        Commands::Plot {
            x,
            y,
            force,
            material,
            out,
        } => {
            let database = by_material(database, material.as_deref());
            let json = database.plot(&x, &y, force)?.to_json()?;
            match out {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Commands::Thumbnail {
            identifier,
            out,
            width,
            height,
        } => {
            let png = database.get(&identifier)?.thumbnail(width, height)?;
            std::fs::write(&out, png).with_context(|| format!("writing {}", out.display()))?;
            log::info!("Wrote thumbnail of {identifier} to {}", out.display());
        }
        Commands::View => view(database)?,
    }

    Ok(())
}

fn view(database: echemdb::Database) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "echemdb – Cyclic Voltammograms",
        options,
        Box::new(|cc| {
            // Thumbnails in the entry list are PNG bytes.
            egui_extras::install_image_loaders(&cc.egui_ctx);
            Ok(Box::new(ViewerApp::new(database)))
        }),
    )
    .map_err(|e| anyhow!("viewer failed: {e}"))
}
