use std::time::Duration;

use minimap_core::{CellCoord, CellRectSize, Command, Event};
use minimap_system_cursor::{CursorInput, CursorSettings, MapCursor};

const FRAME: Duration = Duration::from_millis(16);

fn cursor_in_map_mode(settings: CursorSettings, width: u32, height: u32) -> MapCursor {
    let mut cursor = MapCursor::new(settings);
    let mut emitted = Vec::new();
    cursor.handle(
        &[Event::GridReset {
            size: CellRectSize::new(width, height),
        }],
        CursorInput {
            toggle_map_mode: true,
            ..CursorInput::default()
        },
        FRAME,
        &mut Vec::new(),
        &mut emitted,
    );
    assert_eq!(emitted, vec![Event::MapModeChanged { enabled: true }]);
    cursor
}

fn step(cursor: &mut MapCursor, horizontal: i32, vertical: i32, dt: Duration) -> Vec<Event> {
    let mut emitted = Vec::new();
    cursor.handle(
        &[],
        CursorInput {
            horizontal,
            vertical,
            ..CursorInput::default()
        },
        dt,
        &mut Vec::new(),
        &mut emitted,
    );
    emitted
}

#[test]
fn held_direction_moves_one_cell_per_cooldown() {
    let mut cursor = cursor_in_map_mode(CursorSettings::default(), 10, 10);
    assert_eq!(cursor.position(), CellCoord::new(5, 5));

    let emitted = step(&mut cursor, 1, 0, FRAME);
    assert_eq!(
        emitted,
        vec![Event::CursorMoved {
            from: CellCoord::new(5, 5),
            to: CellCoord::new(6, 5),
        }]
    );

    let _ = step(&mut cursor, 1, 0, Duration::from_millis(100));
    assert_eq!(cursor.position(), CellCoord::new(6, 5), "cooldown still running");

    let _ = step(&mut cursor, 1, 0, Duration::from_millis(50));
    assert_eq!(cursor.position(), CellCoord::new(7, 5), "cooldown elapsed");
}

#[test]
fn diagonal_input_moves_on_both_axes() {
    let mut cursor = cursor_in_map_mode(CursorSettings::default(), 10, 10);
    let _ = step(&mut cursor, -3, 2, FRAME);
    assert_eq!(cursor.position(), CellCoord::new(4, 6));
}

#[test]
fn inverted_axes_flip_the_step() {
    let settings = CursorSettings {
        invert_x: true,
        invert_y: true,
        ..CursorSettings::default()
    };
    let mut cursor = cursor_in_map_mode(settings, 10, 10);
    let _ = step(&mut cursor, 1, 1, FRAME);
    assert_eq!(cursor.position(), CellCoord::new(4, 4));
}

#[test]
fn moves_leaving_the_grid_are_rejected() {
    let settings = CursorSettings {
        navigation_cooldown_ms: 0,
        ..CursorSettings::default()
    };
    let mut cursor = cursor_in_map_mode(settings, 2, 2);
    assert_eq!(cursor.position(), CellCoord::new(1, 1));
    let emitted = step(&mut cursor, 1, 0, FRAME);
    assert!(emitted.is_empty());
    assert_eq!(cursor.position(), CellCoord::new(1, 1));
    let _ = step(&mut cursor, -1, -1, FRAME);
    assert_eq!(cursor.position(), CellCoord::new(0, 0));
}

#[test]
fn movement_requires_map_mode() {
    let mut cursor = MapCursor::new(CursorSettings::default());
    cursor.handle(
        &[Event::GridReset {
            size: CellRectSize::new(10, 10),
        }],
        CursorInput::default(),
        FRAME,
        &mut Vec::new(),
        &mut Vec::new(),
    );
    let emitted = step(&mut cursor, 1, 0, FRAME);
    assert!(emitted.is_empty());
    assert_eq!(cursor.position(), CellCoord::new(5, 5));
}

#[test]
fn movement_is_blocked_while_a_region_is_hidden() {
    let mut cursor = cursor_in_map_mode(CursorSettings::default(), 10, 10);
    let mut emitted = Vec::new();
    cursor.handle(
        &[Event::RegionHidden {
            center: CellCoord::new(5, 5),
            mask_size: 9,
            cells: Vec::new(),
        }],
        CursorInput {
            horizontal: 1,
            ..CursorInput::default()
        },
        FRAME,
        &mut Vec::new(),
        &mut emitted,
    );
    assert!(emitted.is_empty());

    cursor.handle(
        &[Event::RegionRestored { cells: Vec::new() }],
        CursorInput {
            horizontal: 1,
            ..CursorInput::default()
        },
        FRAME,
        &mut Vec::new(),
        &mut emitted,
    );
    assert_eq!(cursor.position(), CellCoord::new(6, 5));
}

#[test]
fn toggle_walls_requests_region_at_cursor_in_map_mode_only() {
    let mut cursor = MapCursor::new(CursorSettings::default());
    let mut commands = Vec::new();
    let toggle = CursorInput {
        toggle_walls: true,
        ..CursorInput::default()
    };
    cursor.handle(
        &[Event::GridReset {
            size: CellRectSize::new(20, 20),
        }],
        toggle,
        FRAME,
        &mut commands,
        &mut Vec::new(),
    );
    assert!(commands.is_empty(), "toggle ignored outside map mode");

    cursor.handle(
        &[],
        CursorInput {
            toggle_map_mode: true,
            toggle_walls: true,
            ..CursorInput::default()
        },
        FRAME,
        &mut commands,
        &mut Vec::new(),
    );
    assert_eq!(
        commands,
        vec![Command::ToggleRegion {
            center: CellCoord::new(10, 10),
            mask_size: 9,
        }]
    );
}
