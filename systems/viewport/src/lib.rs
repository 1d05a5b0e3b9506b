#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Viewport system that follows the agent with a fixed-size window onto the
//! grid.

use std::time::Duration;

use minimap_core::{
    capability::AgentPositionProvider, convert, CellCoord, CellRect, CellRectSize, CellType, Event,
    ViewportSnapshot,
};
use minimap_grid::GridModel;
use serde::{Deserialize, Serialize};

const DEFAULT_WINDOW_WIDTH: u32 = 12;
const DEFAULT_WINDOW_HEIGHT: u32 = 12;

/// Decides when a tick recomputes the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshCadence {
    /// Recompute on every tick.
    EveryTick,
    /// Recompute whenever the agent enters a different cell.
    OnCellChange,
    /// Recompute whenever the agent enters a different cell, and in any case
    /// once the interval has elapsed since the previous refresh.
    Interval {
        /// Milliseconds between unconditional refreshes.
        millis: u64,
    },
}

impl Default for RefreshCadence {
    fn default() -> Self {
        Self::OnCellChange
    }
}

/// Viewport configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Number of window columns.
    pub width: u32,
    /// Number of window rows.
    pub height: u32,
    /// Refresh policy.
    pub cadence: RefreshCadence,
}

impl ViewportSettings {
    /// Window dimensions as a size descriptor.
    #[must_use]
    pub const fn size(&self) -> CellRectSize {
        CellRectSize::new(self.width, self.height)
    }
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            cadence: RefreshCadence::default(),
        }
    }
}

/// Tracks the agent and republishes the visible window when due.
#[derive(Clone, Debug, Default)]
pub struct ViewportWindow {
    settings: ViewportSettings,
    latest: Option<ViewportSnapshot>,
    last_agent_cell: Option<CellCoord>,
    since_refresh: Duration,
}

impl ViewportWindow {
    /// Creates a window that has not been refreshed yet.
    #[must_use]
    pub fn new(settings: ViewportSettings) -> Self {
        Self {
            settings,
            latest: None,
            last_agent_cell: None,
            since_refresh: Duration::ZERO,
        }
    }

    /// Settings the window was created with.
    #[must_use]
    pub const fn settings(&self) -> &ViewportSettings {
        &self.settings
    }

    /// Most recently published snapshot.
    #[must_use]
    pub fn latest(&self) -> Option<&ViewportSnapshot> {
        self.latest.as_ref()
    }

    /// Samples the agent once and recomputes the window when the cadence
    /// says so. Returns whether a new snapshot was published.
    pub fn tick<A>(
        &mut self,
        grid: &GridModel,
        agent: &A,
        dt: Duration,
        out: &mut Vec<Event>,
    ) -> bool
    where
        A: AgentPositionProvider + ?Sized,
    {
        self.since_refresh = self.since_refresh.saturating_add(dt);
        let Some(agent_cell) = sample_agent_cell(grid, agent) else {
            return false;
        };

        let moved = self.last_agent_cell != Some(agent_cell);
        let due = self.latest.is_none()
            || match self.settings.cadence {
                RefreshCadence::EveryTick => true,
                RefreshCadence::OnCellChange => moved,
                RefreshCadence::Interval { millis } => {
                    moved || self.since_refresh >= Duration::from_millis(millis)
                }
            };
        if due {
            self.publish(grid, agent_cell, out);
        }
        due
    }

    /// Recomputes the window regardless of the cadence.
    pub fn force_refresh<A>(&mut self, grid: &GridModel, agent: &A, out: &mut Vec<Event>) -> bool
    where
        A: AgentPositionProvider + ?Sized,
    {
        let Some(agent_cell) = sample_agent_cell(grid, agent) else {
            return false;
        };
        self.publish(grid, agent_cell, out);
        true
    }

    fn publish(&mut self, grid: &GridModel, agent_cell: CellCoord, out: &mut Vec<Event>) {
        let snapshot = capture(grid, self.settings.size(), agent_cell);
        log::trace!(
            "viewport refreshed at {:?} for agent cell {agent_cell:?}",
            snapshot.bounds().origin()
        );
        out.push(Event::ViewportRefreshed {
            snapshot: snapshot.clone(),
        });
        self.latest = Some(snapshot);
        self.last_agent_cell = Some(agent_cell);
        self.since_refresh = Duration::ZERO;
    }
}

fn sample_agent_cell<A>(grid: &GridModel, agent: &A) -> Option<CellCoord>
where
    A: AgentPositionProvider + ?Sized,
{
    let Some(geometry) = grid.geometry() else {
        log::debug!("viewport skipped: grid is not initialized");
        return None;
    };
    let Some(position) = agent.agent_position() else {
        log::debug!("viewport skipped: no agent position");
        return None;
    };
    Some(geometry.world_to_grid(position))
}

/// Grid rectangle shown by a window of `window` cells centred on the agent.
///
/// The start corner is clamped per axis to `[0, max(0, grid - window)]`, so
/// the window never leaves a grid that is at least as large as it.
#[must_use]
pub fn window_bounds(grid: CellRectSize, window: CellRectSize, agent: CellCoord) -> CellRect {
    let start = CellCoord::new(
        window_start(agent.x(), grid.width(), window.width()),
        window_start(agent.y(), grid.height(), window.height()),
    );
    CellRect::from_origin_and_size(start, window)
}

fn window_start(agent: i32, grid: u32, window: u32) -> i32 {
    let half = i32::try_from(window / 2).unwrap_or(i32::MAX);
    let max_start = i32::try_from(grid.saturating_sub(window)).unwrap_or(i32::MAX);
    agent.saturating_sub(half).clamp(0, max_start)
}

/// Builds the snapshot of the window around `agent_cell`.
///
/// Window cells outside the grid read as [`CellType::Empty`].
#[must_use]
pub fn capture(grid: &GridModel, window: CellRectSize, agent_cell: CellCoord) -> ViewportSnapshot {
    let bounds = window_bounds(grid.dimensions(), window, agent_cell);
    let width = i32::try_from(window.width()).unwrap_or(i32::MAX);
    let height = i32::try_from(window.height()).unwrap_or(i32::MAX);
    let mut cell_types: Vec<CellType> =
        Vec::with_capacity(usize::try_from(window.area()).unwrap_or(0));
    for view_y in 0..height {
        for view_x in 0..width {
            let cell = convert::window_to_grid(bounds, CellCoord::new(view_x, view_y));
            cell_types.push(grid.cell_type(cell));
        }
    }
    ViewportSnapshot::new(
        bounds,
        cell_types,
        convert::grid_to_window(bounds, agent_cell),
        grid.cell_type(agent_cell),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_centres_on_agent_away_from_edges() {
        let bounds = window_bounds(
            CellRectSize::new(50, 50),
            CellRectSize::new(12, 12),
            CellCoord::new(25, 30),
        );
        assert_eq!(bounds.origin(), CellCoord::new(19, 24));
    }

    #[test]
    fn window_clamps_at_both_edges() {
        let grid = CellRectSize::new(20, 20);
        let window = CellRectSize::new(12, 12);
        assert_eq!(
            window_bounds(grid, window, CellCoord::new(2, -5)).origin(),
            CellCoord::new(0, 0)
        );
        assert_eq!(
            window_bounds(grid, window, CellCoord::new(19, 40)).origin(),
            CellCoord::new(8, 8)
        );
    }

    #[test]
    fn small_grid_pins_window_to_origin() {
        let bounds = window_bounds(
            CellRectSize::new(5, 3),
            CellRectSize::new(12, 12),
            CellCoord::new(4, 2),
        );
        assert_eq!(bounds.origin(), CellCoord::new(0, 0));
    }

    #[test]
    fn default_cadence_follows_cell_changes() {
        let settings = ViewportSettings::default();
        assert_eq!(settings.size(), CellRectSize::new(12, 12));
        assert_eq!(settings.cadence, RefreshCadence::OnCellChange);
    }
}
