//! Tick-driven session wiring every system to the headless scene.

use std::{mem, time::Duration};

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use minimap_core::{
    geometry::ProtectedVolumeSet, CellCoord, CellType, Command, Event, ObjectKind, OrientedBox,
    ViewportSnapshot,
};
use minimap_grid::GridModel;
use minimap_rendering::{compose_viewport, PickupMarkers, PixelImage, TextureRenderer};
use minimap_system_cursor::{CursorInput, MapCursor};
use minimap_system_region_toggle::{RegionToggle, ToggleCollaborators};
use minimap_system_scanner::SceneScanner;
use minimap_system_viewport::ViewportWindow;

use crate::{
    config::MinimapConfig,
    scene::{obstacle_volumes, AgentSpec, SceneHost, SceneSpec, ScriptStep},
};

/// Owns the grid, every system and the scene host for one run.
pub(crate) struct Session {
    config: MinimapConfig,
    grid: GridModel,
    scanner: SceneScanner,
    viewport: ViewportWindow,
    toggle: RegionToggle,
    cursor: MapCursor,
    renderer: TextureRenderer,
    pickups: PickupMarkers,
    host: SceneHost,
    volumes: ProtectedVolumeSet,
    agent: AgentSpec,
    agent_position: Option<Vec3>,
    script: Vec<ScriptStep>,
    pending: Vec<Event>,
    history: Vec<Event>,
    tick: u64,
    elapsed: Duration,
}

impl Session {
    /// Builds the systems and performs the initial scan.
    pub(crate) fn new(config: MinimapConfig, spec: SceneSpec) -> Result<Self> {
        let grid_settings = config.scanner.grid;
        let renderer = TextureRenderer::new(
            minimap_core::CellRectSize::new(grid_settings.width, grid_settings.height),
            config.renderer,
            config.colors,
        )
        .context("failed to allocate the minimap texture")?;

        let mut session = Self {
            config,
            grid: GridModel::new(),
            scanner: SceneScanner::new(config.scanner),
            viewport: ViewportWindow::new(config.viewport),
            toggle: RegionToggle::new(config.toggle),
            cursor: MapCursor::new(config.cursor),
            renderer,
            pickups: PickupMarkers::new(),
            host: SceneHost::from_spec(&spec),
            volumes: obstacle_volumes(&spec),
            agent_position: spec.agent.position_at(0.0),
            agent: spec.agent,
            script: spec.script,
            pending: Vec::new(),
            history: Vec::new(),
            tick: 0,
            elapsed: Duration::ZERO,
        };
        session.track_agent();
        session.apply(Command::ScanScene)?;
        for pickup in spec.pickups {
            let _ = session
                .pickups
                .register(pickup, &session.grid, &mut session.renderer);
        }
        Ok(session)
    }

    /// Runs `ticks` ticks.
    pub(crate) fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.step()?;
        }
        let _ = self.flush_events();
        Ok(())
    }

    /// One tick: agent sampling, scripted input and cursor commands, viewport
    /// refresh, highlight refresh, then a single renderer flush.
    pub(crate) fn step(&mut self) -> Result<()> {
        let dt = self.config.tick();
        self.elapsed += dt;
        self.agent_position = self
            .agent
            .position_at(self.agent.speed * self.elapsed.as_secs_f32());
        self.track_agent();

        let (input, mut commands) = self.scripted_input();
        let events = self.flush_events();
        self.cursor
            .handle(&events, input, dt, &mut commands, &mut self.pending);
        for command in commands {
            self.apply(command)?;
        }

        let position = self.agent_position;
        let agent = move || position;
        let _ = self.viewport.tick(&self.grid, &agent, dt, &mut self.pending);

        self.toggle.refresh_highlights(&self.grid, &mut self.renderer);
        let agent_cell = self.agent_cell();
        self.renderer.set_player_cell(&self.grid, agent_cell);
        self.renderer.end_frame();
        self.tick += 1;
        Ok(())
    }

    /// Executes one command against the systems.
    pub(crate) fn apply(&mut self, command: Command) -> Result<()> {
        let position = self.agent_position;
        let agent = move || position;
        match command {
            Command::ScanScene => {
                let summary = self
                    .scanner
                    .scan(&mut self.grid, &self.host, &mut self.pending)
                    .context("failed to scan the scene")?;
                log::debug!("scan summary: {summary:?}");
                self.renderer
                    .render_full_map(&self.grid)
                    .context("failed to render the scanned grid")?;
                self.toggle.refresh_highlights(&self.grid, &mut self.renderer);
                let _ = self
                    .viewport
                    .force_refresh(&self.grid, &agent, &mut self.pending);
            }
            Command::RegisterWall { object } => {
                let cells = self.scanner.register_wall(
                    &mut self.grid,
                    &object,
                    Some(&mut self.renderer),
                    &mut self.pending,
                );
                log::debug!("wall {:?} covers {} cells", object.handle, cells.len());
            }
            Command::ToggleRegion { center, mask_size } => {
                let collaborators = ToggleCollaborators {
                    entities: &mut self.host,
                    volumes: &self.volumes,
                    painter: Some(&mut self.renderer),
                };
                match self.toggle.toggle_region(
                    &self.grid,
                    center,
                    mask_size,
                    collaborators,
                    &mut self.pending,
                ) {
                    Ok(outcome) => log::debug!("toggle outcome: {outcome:?}"),
                    Err(error) => log::warn!("region toggle at {center:?} refused: {error}"),
                }
            }
            Command::RefreshViewport => {
                let _ = self
                    .viewport
                    .force_refresh(&self.grid, &agent, &mut self.pending);
            }
        }
        Ok(())
    }

    /// Events emitted so far, oldest first.
    pub(crate) fn history(&self) -> &[Event] {
        &self.history
    }

    /// Latest published viewport.
    pub(crate) fn snapshot(&self) -> Option<&ViewportSnapshot> {
        self.viewport.latest()
    }

    /// Full-map renderer.
    pub(crate) fn renderer(&self) -> &TextureRenderer {
        &self.renderer
    }

    /// Latest viewport as an image with hidden cells masked.
    pub(crate) fn viewport_image(&self) -> Option<PixelImage> {
        let snapshot = self.snapshot()?;
        let hidden = self.toggle.highlights_in_window(snapshot);
        Some(compose_viewport(snapshot, &hidden, self.renderer.colors()))
    }

    /// Latest viewport as text, northernmost row first.
    ///
    /// `@` agent, `~` hidden wall, `#` wall, `.` floor, blank empty.
    pub(crate) fn ascii_viewport(&self) -> Option<String> {
        let snapshot = self.snapshot()?;
        let hidden = self.toggle.highlights_in_window(snapshot);
        let mut text = String::with_capacity(snapshot.cell_types().len() + 16);
        for row in 0..snapshot.height() as i32 {
            for column in 0..snapshot.width() as i32 {
                let view = CellCoord::new(column, row);
                let glyph = if snapshot.agent_window_position() == Some(view) {
                    '@'
                } else if hidden.contains(&view) {
                    '~'
                } else {
                    match snapshot.cell_type(view) {
                        CellType::Wall => '#',
                        CellType::Floor => '.',
                        CellType::Empty => ' ',
                    }
                };
                text.push(glyph);
            }
            text.push('\n');
        }
        Some(text)
    }

    fn scripted_input(&mut self) -> (CursorInput, Vec<Command>) {
        let mut input = CursorInput::default();
        let mut commands = Vec::new();
        let steps: Vec<ScriptStep> = self
            .script
            .iter()
            .filter(|step| step.tick == self.tick)
            .copied()
            .collect();
        for step in steps {
            input.toggle_map_mode ^= step.map_mode;
            input.toggle_walls |= step.toggle_walls;
            input.horizontal += step.horizontal;
            input.vertical += step.vertical;
            if step.rescan {
                commands.push(Command::ScanScene);
            }
            if step.refresh {
                commands.push(Command::RefreshViewport);
            }
            if let Some(wall) = step.wall {
                let object = self.host.spawn(ObjectKind::Wall, &wall);
                commands.push(Command::RegisterWall { object });
            }
            if let Some(position) = step.pickup_collected {
                if !self
                    .pickups
                    .remove(position, &self.grid, &mut self.renderer)
                {
                    log::debug!("no pickup registered at {position}");
                }
            }
        }
        (input, commands)
    }

    fn track_agent(&mut self) {
        if let Some(position) = self.agent_position {
            self.volumes.set_agent(OrientedBox::new(
                position,
                self.agent.half_extents,
                Quat::IDENTITY,
            ));
        }
    }

    fn agent_cell(&self) -> Option<CellCoord> {
        let geometry = self.grid.geometry()?;
        Some(geometry.world_to_grid(self.agent_position?))
    }

    fn flush_events(&mut self) -> Vec<Event> {
        let events = mem::take(&mut self.pending);
        for event in &events {
            log::trace!("event: {event:?}");
        }
        self.history.extend(events.iter().cloned());
        events
    }
}
