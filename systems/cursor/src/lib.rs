#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure map-mode system that steers a cursor across the full grid and turns
//! input into region toggle commands.

use std::time::Duration;

use minimap_core::{CellCoord, CellRectSize, Command, Event};
use serde::{Deserialize, Serialize};

const DEFAULT_NAVIGATION_COOLDOWN_MS: u64 = 150;
const DEFAULT_MASK_SIZE: u32 = 9;

/// Cursor configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursorSettings {
    /// Minimum time between two cursor steps, in milliseconds.
    pub navigation_cooldown_ms: u64,
    /// Flips horizontal input.
    pub invert_x: bool,
    /// Flips vertical input.
    pub invert_y: bool,
    /// Edge length of the region requested when toggling walls.
    pub mask_size: u32,
}

impl CursorSettings {
    /// Navigation cooldown as a duration.
    #[must_use]
    pub const fn navigation_cooldown(&self) -> Duration {
        Duration::from_millis(self.navigation_cooldown_ms)
    }
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            navigation_cooldown_ms: DEFAULT_NAVIGATION_COOLDOWN_MS,
            invert_x: false,
            invert_y: false,
            mask_size: DEFAULT_MASK_SIZE,
        }
    }
}

/// Input snapshot distilled from adapter-provided frame input data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorInput {
    /// The player asked to enter or leave map mode on this frame.
    pub toggle_map_mode: bool,
    /// The player asked to hide or restore walls on this frame.
    pub toggle_walls: bool,
    /// Held horizontal direction: positive east, negative west.
    pub horizontal: i32,
    /// Held vertical direction: positive north, negative south.
    pub vertical: i32,
}

/// Map cursor that translates input into cursor moves and toggle commands.
#[derive(Clone, Debug, Default)]
pub struct MapCursor {
    settings: CursorSettings,
    grid_size: CellRectSize,
    position: CellCoord,
    map_mode: bool,
    region_active: bool,
    cooldown: Duration,
}

impl MapCursor {
    /// Creates a cursor for a grid that has not been scanned yet.
    #[must_use]
    pub fn new(settings: CursorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Cell under the cursor.
    #[must_use]
    pub const fn position(&self) -> CellCoord {
        self.position
    }

    /// Reports whether map mode is active.
    #[must_use]
    pub const fn is_map_mode(&self) -> bool {
        self.map_mode
    }

    /// Consumes events and frame input, emitting commands and cursor events.
    ///
    /// A [`Event::GridReset`] recentres the cursor; region events block
    /// movement while walls are hidden.
    pub fn handle(
        &mut self,
        events: &[Event],
        input: CursorInput,
        dt: Duration,
        commands: &mut Vec<Command>,
        emitted: &mut Vec<Event>,
    ) {
        for event in events {
            match event {
                Event::GridReset { size } => self.recentre(*size),
                Event::RegionHidden { .. } => self.region_active = true,
                Event::RegionRestored { .. } => self.region_active = false,
                _ => {}
            }
        }
        self.cooldown = self.cooldown.saturating_sub(dt);

        if input.toggle_map_mode {
            self.map_mode = !self.map_mode;
            emitted.push(Event::MapModeChanged {
                enabled: self.map_mode,
            });
        }
        if input.toggle_walls && self.map_mode {
            commands.push(Command::ToggleRegion {
                center: self.position,
                mask_size: self.settings.mask_size,
            });
        }
        if !self.map_mode || !self.cooldown.is_zero() {
            return;
        }

        let (mut dx, mut dy) = (input.horizontal.signum(), input.vertical.signum());
        if (dx, dy) == (0, 0) || self.region_active {
            return;
        }
        if self.settings.invert_x {
            dx = -dx;
        }
        if self.settings.invert_y {
            dy = -dy;
        }

        let target = self.position.offset(dx, dy);
        if self.contains(target) {
            emitted.push(Event::CursorMoved {
                from: self.position,
                to: target,
            });
            self.position = target;
        } else {
            log::trace!("cursor move to {target:?} rejected: outside the grid");
        }
        self.cooldown = self.settings.navigation_cooldown();
    }

    fn recentre(&mut self, size: CellRectSize) {
        self.grid_size = size;
        self.position = CellCoord::new(
            i32::try_from(size.width() / 2).unwrap_or(i32::MAX),
            i32::try_from(size.height() / 2).unwrap_or(i32::MAX),
        );
    }

    fn contains(&self, cell: CellCoord) -> bool {
        minimap_core::convert::is_in_bounds(cell, self.grid_size.width(), self.grid_size.height())
    }
}
