//! Aggregated component settings loaded from TOML.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use minimap_rendering::{ColorConfig, RendererSettings};
use minimap_system_cursor::CursorSettings;
use minimap_system_region_toggle::ToggleSettings;
use minimap_system_scanner::ScannerSettings;
use minimap_system_viewport::ViewportSettings;
use serde::Deserialize;

const DEFAULT_TICK_MILLIS: u64 = 16;

/// Every tunable of a minimap session. Missing tables fall back to defaults.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MinimapConfig {
    pub(crate) tick_millis: u64,
    pub(crate) scanner: ScannerSettings,
    pub(crate) viewport: ViewportSettings,
    pub(crate) toggle: ToggleSettings,
    pub(crate) cursor: CursorSettings,
    pub(crate) renderer: RendererSettings,
    pub(crate) colors: ColorConfig,
}

impl Default for MinimapConfig {
    fn default() -> Self {
        Self {
            tick_millis: DEFAULT_TICK_MILLIS,
            scanner: ScannerSettings::default(),
            viewport: ViewportSettings::default(),
            toggle: ToggleSettings::default(),
            cursor: CursorSettings::default(),
            renderer: RendererSettings::default(),
            colors: ColorConfig::default(),
        }
    }
}

impl MinimapConfig {
    /// Reads and validates the configuration at `path`.
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read minimap config at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid minimap config at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).context("failed to parse minimap config toml contents")?;
        if config.tick_millis == 0 {
            bail!("tick_millis must be positive");
        }
        if config.viewport.width == 0 || config.viewport.height == 0 {
            bail!(
                "viewport must be at least one cell wide and tall (received {}x{})",
                config.viewport.width,
                config.viewport.height
            );
        }
        Ok(config)
    }

    /// Simulated time advanced per tick.
    pub(crate) const fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use minimap_system_viewport::RefreshCadence;

    #[test]
    fn empty_document_uses_defaults() {
        let config = MinimapConfig::parse("").expect("defaults are valid");
        assert_eq!(config, MinimapConfig::default());
        assert_eq!(config.tick(), Duration::from_millis(16));
    }

    #[test]
    fn nested_tables_override_component_settings() {
        let config = MinimapConfig::parse(
            r#"
            tick_millis = 50

            [scanner]
            auto_origin = true
            max_cells_per_object = 400

            [scanner.grid]
            width = 30
            height = 20
            cell_size = 0.5
            origin = [-5.0, 0.0, -5.0]

            [viewport]
            width = 8
            height = 6
            cadence = { interval = { millis = 250 } }

            [toggle]
            mask_size = 5
            protect_obstacles = false

            [cursor]
            invert_y = true

            [renderer]
            pixels_per_cell = 4
            flip_y = false

            [colors]
            wall = [0.8, 0.8, 0.8, 1.0]
            "#,
        )
        .expect("valid config");

        assert_eq!(config.tick_millis, 50);
        assert!(config.scanner.auto_origin);
        assert_eq!(config.scanner.max_cells_per_object, 400);
        assert_eq!(config.scanner.grid.width, 30);
        assert_eq!(config.scanner.grid.origin, Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(config.viewport.cadence, RefreshCadence::Interval { millis: 250 });
        assert_eq!(config.toggle.mask_size, 5);
        assert!(!config.toggle.protect_obstacles);
        assert!(config.cursor.invert_y);
        assert_eq!(config.renderer.pixels_per_cell, 4);
        assert!(!config.renderer.flip_y);
        assert_eq!(config.colors.wall.red, 0.8);
    }

    #[test]
    fn unknown_tables_and_zero_ticks_are_rejected() {
        assert!(MinimapConfig::parse("[bugs]\ncount = 3").is_err());
        assert!(MinimapConfig::parse("tick_millis = 0").is_err());
        assert!(MinimapConfig::parse("[viewport]\nwidth = 0").is_err());
    }
}
