mod app;
mod config;
mod dataset;
mod model;
mod views;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::{FlareviewApp, Launch, ViewKind};
use config::{LayoutOptions, Overrides};
use model::FrameSelection;
use views::Extent;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Dataset JSON file.
    dataset: PathBuf,
    /// View width in pixels, or `auto` to fit the window.
    #[arg(long, default_value = "auto")]
    width: Extent,
    #[arg(long, value_enum, default_value_t = ViewKind::Bundle)]
    view: ViewKind,
    /// JSON file with layout options; missing fields keep their defaults.
    #[arg(long)]
    options: Option<PathBuf>,
    #[arg(long)]
    inactive_edge_opacity: Option<f32>,
    #[arg(long)]
    bundle_tension: Option<f32>,
    /// Seed for the initial force layout.
    #[arg(long)]
    seed: Option<u64>,
    /// Initial frame selection, `4` or `2:9`.
    #[arg(long)]
    frames: Option<FrameSelection>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let layout = match &args.options {
        Some(path) => LayoutOptions::load(path)?,
        None => LayoutOptions::default(),
    }
    .with_overrides(Overrides {
        inactive_edge_opacity: args.inactive_edge_opacity,
        bundle_tension: args.bundle_tension,
        seed: args.seed,
    })?;

    let launch = Launch {
        dataset: args.dataset,
        extent: args.width,
        view: args.view,
        layout,
        frames: args.frames,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 900.0]),
        ..Default::default()
    };

    eframe::run_native(
        "flareview",
        options,
        Box::new(move |cc| Ok(Box::new(FlareviewApp::new(cc, launch)))),
    )
    .map_err(|error| anyhow!("failed to start the viewer: {error}"))
}
