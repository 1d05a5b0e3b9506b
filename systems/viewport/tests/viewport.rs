use std::{cell::Cell, time::Duration};

use glam::Vec3;
use minimap_core::{CellCoord, CellRectSize, CellType, Event, ViewportSnapshot};
use minimap_grid::GridModel;
use minimap_system_viewport::{capture, RefreshCadence, ViewportSettings, ViewportWindow};
use proptest::prelude::*;

const FRAME: Duration = Duration::from_millis(16);

fn grid(width: u32, height: u32) -> GridModel {
    let mut grid = GridModel::new();
    let _ = grid
        .setup_grid(width, height, 1.0, Vec3::ZERO)
        .expect("valid grid");
    grid
}

fn centre_of(x: i32, y: i32) -> Vec3 {
    Vec3::new(x as f32 + 0.5, 0.0, y as f32 + 0.5)
}

fn window(width: u32, height: u32, cadence: RefreshCadence) -> ViewportWindow {
    ViewportWindow::new(ViewportSettings {
        width,
        height,
        cadence,
    })
}

fn refreshes(events: &[Event]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, Event::ViewportRefreshed { .. }))
        .count()
}

#[test]
fn northernmost_row_is_window_row_zero() {
    let mut grid = grid(10, 10);
    let _ = grid.set_cell(CellCoord::new(2, 9), CellType::Wall, None);
    let _ = grid.set_cell(CellCoord::new(1, 6), CellType::Floor, None);

    let snapshot = capture(&grid, CellRectSize::new(4, 4), CellCoord::new(1, 8));

    assert_eq!(snapshot.bounds().origin(), CellCoord::new(0, 6));
    assert_eq!(snapshot.cell_type(CellCoord::new(2, 0)), CellType::Wall);
    assert_eq!(snapshot.cell_type(CellCoord::new(1, 3)), CellType::Floor);
    assert_eq!(
        snapshot.agent_window_position(),
        Some(CellCoord::new(1, 1)),
        "agent at grid row 8 sits one row below the top"
    );
}

#[test]
fn agent_cell_type_is_reported() {
    let mut grid = grid(6, 6);
    let _ = grid.set_cell(CellCoord::new(3, 3), CellType::Floor, None);
    let snapshot = capture(&grid, CellRectSize::new(4, 4), CellCoord::new(3, 3));
    assert_eq!(snapshot.agent_cell_type(), CellType::Floor);
}

#[test]
fn cells_beyond_a_small_grid_read_empty() {
    let mut grid = grid(3, 2);
    let _ = grid.set_cell(CellCoord::new(0, 0), CellType::Wall, None);
    let snapshot = capture(&grid, CellRectSize::new(5, 5), CellCoord::new(1, 1));

    assert_eq!(snapshot.bounds().origin(), CellCoord::new(0, 0));
    assert_eq!(snapshot.cell_types().len(), 25);
    assert_eq!(snapshot.cell_type(CellCoord::new(0, 4)), CellType::Wall);
    assert_eq!(
        snapshot
            .cell_types()
            .iter()
            .filter(|cell| **cell == CellType::Wall)
            .count(),
        1
    );
}

#[test]
fn agent_outside_the_grid_reports_the_sentinel() {
    let grid = grid(20, 20);
    let snapshot = capture(&grid, CellRectSize::new(6, 6), CellCoord::new(-3, 5));
    assert_eq!(snapshot.agent_window_position(), None);
    assert_eq!(
        snapshot.agent_window_position_or_sentinel(),
        ViewportSnapshot::OUTSIDE_WINDOW
    );
    assert_eq!(snapshot.agent_cell_type(), CellType::Empty);
}

#[test]
fn first_tick_always_refreshes() {
    let grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::OnCellChange);
    let mut events = Vec::new();
    let agent = || Some(centre_of(4, 4));

    assert!(viewport.tick(&grid, &agent, FRAME, &mut events));
    assert!(!viewport.tick(&grid, &agent, FRAME, &mut events));
    assert_eq!(refreshes(&events), 1);
    assert!(viewport.latest().is_some());
}

#[test]
fn cell_change_cadence_ignores_movement_within_a_cell() {
    let grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::OnCellChange);
    let mut events = Vec::new();
    let position = Cell::new(Vec3::new(4.1, 0.0, 4.1));
    let agent = || Some(position.get());

    let _ = viewport.tick(&grid, &agent, FRAME, &mut events);
    position.set(Vec3::new(4.9, 0.0, 4.8));
    let _ = viewport.tick(&grid, &agent, FRAME, &mut events);
    assert_eq!(refreshes(&events), 1);

    position.set(Vec3::new(5.1, 0.0, 4.8));
    let _ = viewport.tick(&grid, &agent, FRAME, &mut events);
    assert_eq!(refreshes(&events), 2);
}

#[test]
fn every_tick_cadence_always_refreshes() {
    let grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::EveryTick);
    let mut events = Vec::new();
    let agent = || Some(centre_of(4, 4));
    for _ in 0..3 {
        let _ = viewport.tick(&grid, &agent, FRAME, &mut events);
    }
    assert_eq!(refreshes(&events), 3);
}

#[test]
fn interval_cadence_refreshes_a_stationary_agent() {
    let grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::Interval { millis: 100 });
    let mut events = Vec::new();
    let agent = || Some(centre_of(4, 4));

    let _ = viewport.tick(&grid, &agent, FRAME, &mut events);
    let _ = viewport.tick(&grid, &agent, Duration::from_millis(60), &mut events);
    assert_eq!(refreshes(&events), 1);
    let _ = viewport.tick(&grid, &agent, Duration::from_millis(60), &mut events);
    assert_eq!(refreshes(&events), 2);
}

#[test]
fn force_refresh_bypasses_cadence() {
    let mut grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::OnCellChange);
    let mut events = Vec::new();
    let agent = || Some(centre_of(4, 4));
    let _ = viewport.tick(&grid, &agent, FRAME, &mut events);

    let _ = grid.set_cell(CellCoord::new(4, 5), CellType::Wall, None);
    assert!(viewport.force_refresh(&grid, &agent, &mut events));
    let latest = viewport.latest().expect("snapshot published");
    let view = latest
        .grid_to_window(CellCoord::new(4, 5))
        .expect("cell visible");
    assert_eq!(latest.cell_type(view), CellType::Wall);
}

#[test]
fn missing_agent_or_grid_skips_the_tick() {
    let grid = grid(20, 20);
    let mut viewport = window(6, 6, RefreshCadence::EveryTick);
    let mut events = Vec::new();

    let absent = || -> Option<Vec3> { None };
    assert!(!viewport.tick(&grid, &absent, FRAME, &mut events));
    let uninitialized = GridModel::new();
    let agent = || Some(centre_of(1, 1));
    assert!(!viewport.tick(&uninitialized, &agent, FRAME, &mut events));
    assert!(events.is_empty());
    assert!(viewport.latest().is_none());
}

proptest! {
    #[test]
    fn window_stays_clamped_for_every_agent_position(
        grid_width in 1_u32..40,
        grid_height in 1_u32..40,
        window_width in 1_u32..16,
        window_height in 1_u32..16,
        agent_x in -60_i32..100,
        agent_y in -60_i32..100,
    ) {
        let grid = grid(grid_width, grid_height);
        let agent = CellCoord::new(agent_x, agent_y);
        let snapshot = capture(&grid, CellRectSize::new(window_width, window_height), agent);
        let origin = snapshot.bounds().origin();

        let max_x = grid_width.saturating_sub(window_width) as i32;
        let max_y = grid_height.saturating_sub(window_height) as i32;
        prop_assert!((0..=max_x).contains(&origin.x()));
        prop_assert!((0..=max_y).contains(&origin.y()));

        if grid_width >= window_width {
            prop_assert!(origin.x() + window_width as i32 <= grid_width as i32);
        }
        if grid_height >= window_height {
            prop_assert!(origin.y() + window_height as i32 <= grid_height as i32);
        }

        let inside_grid = (0..grid_width as i32).contains(&agent_x)
            && (0..grid_height as i32).contains(&agent_y);
        let window_fits = grid_width >= window_width && grid_height >= window_height;
        if inside_grid && window_fits {
            prop_assert!(snapshot.agent_window_position().is_some());
        }
        if let Some(view) = snapshot.agent_window_position() {
            prop_assert_eq!(snapshot.window_to_grid(view), agent);
        }
    }
}
