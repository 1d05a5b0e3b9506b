#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs a headless minimap session over a TOML
//! scene.

mod config;
mod scene;
mod session;

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use minimap_core::Event;
use minimap_rendering::TextureView;

use crate::{config::MinimapConfig, scene::SceneSpec, session::Session};

/// Headless minimap session.
#[derive(Debug, Parser)]
#[command(name = "minimap", about = "Scan a TOML scene and run the minimap systems headlessly")]
#[command(version)]
struct Cli {
    /// Component settings; defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene with floors, walls, obstacles, the agent path and scripted input.
    #[arg(long)]
    scene: PathBuf,

    /// Number of ticks to simulate.
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Writes the full map texture as a binary PPM.
    #[arg(long)]
    ppm: Option<PathBuf>,

    /// Writes the final viewport window as a binary PPM.
    #[arg(long)]
    viewport_ppm: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MinimapConfig::load(path)?,
        None => MinimapConfig::default(),
    };
    let scene = SceneSpec::load(&cli.scene)?;
    let mut session = Session::new(config, scene)?;
    session.run(cli.ticks)?;

    match session.ascii_viewport() {
        Some(text) => print!("{text}"),
        None => println!("no viewport was published"),
    }
    let count = |matches: fn(&Event) -> bool| {
        session
            .history()
            .iter()
            .filter(|event| matches(event))
            .count()
    };
    println!(
        "{} ticks, {} viewport refreshes, {} regions hidden, {} restored, {} restores refused",
        cli.ticks,
        count(|event| matches!(event, Event::ViewportRefreshed { .. })),
        count(|event| matches!(event, Event::RegionHidden { .. })),
        count(|event| matches!(event, Event::RegionRestored { .. })),
        count(|event| matches!(event, Event::RestoreRefused { .. })),
    );

    if let Some(path) = &cli.ppm {
        write_ppm(path, session.renderer().view())?;
        log::info!("wrote map texture to {}", path.display());
    }
    if let Some(path) = &cli.viewport_ppm {
        let image = session
            .viewport_image()
            .context("no viewport was published, nothing to write")?;
        write_ppm(path, image.view())?;
        log::info!("wrote viewport image to {}", path.display());
    }
    Ok(())
}

fn write_ppm(path: &Path, texture: TextureView<'_>) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    texture
        .write_ppm(&mut writer)
        .and_then(|()| writer.flush())
        .with_context(|| format!("failed to write {}", path.display()))
}
