#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pixel-buffer rendering of the minimap grid.
//!
//! [`TextureRenderer`] keeps one RGBA texel block per grid cell, batches
//! incremental writes behind a dirty flag and hands the buffer to an attached
//! [`DisplaySink`] at most once per frame.

mod overlay;
mod pickups;

use std::{
    collections::BTreeMap,
    io::{self, Write},
};

use glam::Vec2;
use minimap_core::{capability::CellPainter, CellCoord, CellRectSize, CellType};
use minimap_grid::GridModel;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use overlay::{compose_viewport, PixelImage};
pub use pickups::PickupMarkers;

/// RGBA color used when presenting the map.
///
/// Serialized as a `[red, green, blue, alpha]` array.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct Color {
    /// Red channel intensity in the range 0.0..=1.0.
    pub red: f32,
    /// Green channel intensity in the range 0.0..=1.0.
    pub green: f32,
    /// Blue channel intensity in the range 0.0..=1.0.
    pub blue: f32,
    /// Alpha channel intensity in the range 0.0..=1.0.
    pub alpha: f32,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Opaque red.
    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    /// Opaque yellow.
    pub const YELLOW: Self = Self::new(1.0, 0.92, 0.016, 1.0);
    /// Opaque cyan.
    pub const CYAN: Self = Self::new(0.0, 1.0, 1.0, 1.0);

    /// Creates a new color from floating point channels.
    #[must_use]
    pub const fn new(red: f32, green: f32, blue: f32, alpha: f32) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Creates an opaque color from byte RGB values.
    #[must_use]
    pub const fn from_rgb_u8(red: u8, green: u8, blue: u8) -> Self {
        Self {
            red: red as f32 / 255.0,
            green: green as f32 / 255.0,
            blue: blue as f32 / 255.0,
            alpha: 1.0,
        }
    }

    /// Composites `self` over `base` using straight alpha.
    #[must_use]
    pub fn over(self, base: Color) -> Self {
        let alpha = self.alpha + base.alpha * (1.0 - self.alpha);
        if alpha <= f32::EPSILON {
            return Self::new(0.0, 0.0, 0.0, 0.0);
        }
        let mix = |top: f32, bottom: f32| {
            (top * self.alpha + bottom * base.alpha * (1.0 - self.alpha)) / alpha
        };
        Self {
            red: mix(self.red, base.red),
            green: mix(self.green, base.green),
            blue: mix(self.blue, base.blue),
            alpha,
        }
    }
}

impl From<[f32; 4]> for Color {
    fn from([red, green, blue, alpha]: [f32; 4]) -> Self {
        Self::new(red, green, blue, alpha)
    }
}

impl From<Color> for [f32; 4] {
    fn from(color: Color) -> Self {
        [color.red, color.green, color.blue, color.alpha]
    }
}

/// Texel stored in the pixel buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgba8 {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel.
    pub alpha: u8,
}

impl Rgba8 {
    /// Creates a texel from byte channels.
    #[must_use]
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }
}

impl From<Color> for Rgba8 {
    fn from(color: Color) -> Self {
        let quantize = |channel: f32| (channel.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            red: quantize(color.red),
            green: quantize(color.green),
            blue: quantize(color.blue),
            alpha: quantize(color.alpha),
        }
    }
}

/// Palette used to paint cells and markers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Cells nothing was rasterized into.
    pub empty: Color,
    /// Walkable cells.
    pub floor: Color,
    /// Wall cells.
    pub wall: Color,
    /// Cell the agent stands on.
    pub player: Color,
    /// Cells whose walls are hidden.
    pub highlight: Color,
    /// Overlay composited over hidden cells in the viewport window.
    pub masked: Color,
    /// Registered pickup locations.
    pub pickup: Color,
}

impl ColorConfig {
    /// Resting color of a cell type.
    #[must_use]
    pub const fn color_for(&self, cell_type: CellType) -> Color {
        match cell_type {
            CellType::Empty => self.empty,
            CellType::Floor => self.floor,
            CellType::Wall => self.wall,
        }
    }
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            empty: Color::new(0.2, 0.2, 0.2, 0.0),
            floor: Color::BLACK,
            wall: Color::WHITE,
            player: Color::RED,
            highlight: Color::YELLOW,
            masked: Color::new(1.0, 1.0, 1.0, 0.3),
            pickup: Color::CYAN,
        }
    }
}

/// Orientation and resolution of the texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererSettings {
    /// Edge length in texels of one cell.
    pub pixels_per_cell: u32,
    /// Mirrors the texture horizontally.
    pub flip_x: bool,
    /// Mirrors the texture vertically so that north is texel row zero.
    pub flip_y: bool,
    /// Transposes the grid before the flips are applied.
    pub swap_xy: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            pixels_per_cell: 1,
            flip_x: false,
            flip_y: true,
            swap_xy: false,
        }
    }
}

/// Errors that can occur when sizing the texture.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RenderingError {
    /// A cell must cover at least one texel.
    #[error("pixels_per_cell must be positive (received {pixels_per_cell})")]
    InvalidPixelsPerCell {
        /// Provided value that failed validation.
        pixels_per_cell: u32,
    },
    /// The texel count does not fit in memory.
    #[error("a {width}x{height} grid does not fit in a texture")]
    TextureTooLarge {
        /// Grid width in cells.
        width: u32,
        /// Grid height in cells.
        height: u32,
    },
}

/// Borrowed view over a row-major texel buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureView<'a> {
    width: u32,
    height: u32,
    pixels: &'a [Rgba8],
}

impl<'a> TextureView<'a> {
    /// Wraps a buffer of `width * height` texels.
    #[must_use]
    pub const fn new(width: u32, height: u32, pixels: &'a [Rgba8]) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Width in texels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in texels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Texels, row zero first.
    #[must_use]
    pub const fn pixels(&self) -> &'a [Rgba8] {
        self.pixels
    }

    /// Writes the view as a binary PPM. Alpha is dropped.
    pub fn write_ppm<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "P6\n{} {}\n255\n", self.width, self.height)?;
        let mut bytes = Vec::with_capacity(self.pixels.len() * 3);
        for texel in self.pixels {
            bytes.extend_from_slice(&[texel.red, texel.green, texel.blue]);
        }
        writer.write_all(&bytes)
    }
}

/// Destination a renderer uploads its buffer to.
pub trait DisplaySink {
    /// Receives the full texture after a batch of changes.
    fn upload(&mut self, texture: TextureView<'_>);
}

/// Renders grid cells into an RGBA pixel buffer.
pub struct TextureRenderer {
    grid_size: CellRectSize,
    settings: RendererSettings,
    colors: ColorConfig,
    pixels: Vec<Rgba8>,
    dirty: bool,
    frame: u64,
    flushed_frame: Option<u64>,
    flushes: u64,
    player: Option<CellCoord>,
    markers: BTreeMap<CellCoord, Color>,
    sink: Option<Box<dyn DisplaySink>>,
}

impl std::fmt::Debug for TextureRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureRenderer")
            .field("grid_size", &self.grid_size)
            .field("settings", &self.settings)
            .field("dirty", &self.dirty)
            .field("frame", &self.frame)
            .field("has_sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl TextureRenderer {
    /// Allocates a buffer for a grid of `grid_size` cells filled with the
    /// empty color.
    pub fn new(
        grid_size: CellRectSize,
        settings: RendererSettings,
        colors: ColorConfig,
    ) -> Result<Self, RenderingError> {
        if settings.pixels_per_cell == 0 {
            return Err(RenderingError::InvalidPixelsPerCell {
                pixels_per_cell: 0,
            });
        }
        let texels = texel_count(grid_size, settings.pixels_per_cell)?;
        Ok(Self {
            grid_size,
            settings,
            colors,
            pixels: vec![Rgba8::from(colors.empty); texels],
            dirty: false,
            frame: 0,
            flushed_frame: None,
            flushes: 0,
            player: None,
            markers: BTreeMap::new(),
            sink: None,
        })
    }

    /// Routes flushed buffers to `sink`.
    pub fn attach_sink(&mut self, sink: Box<dyn DisplaySink>) {
        self.sink = Some(sink);
    }

    /// Palette in use.
    #[must_use]
    pub const fn colors(&self) -> &ColorConfig {
        &self.colors
    }

    /// Grid size the buffer is laid out for.
    #[must_use]
    pub const fn grid_size(&self) -> CellRectSize {
        self.grid_size
    }

    /// Texture dimensions in texels, after `swap_xy`.
    #[must_use]
    pub fn texture_size(&self) -> (u32, u32) {
        let (columns, rows) = self.oriented_dimensions();
        let ppc = self.settings.pixels_per_cell;
        (columns * ppc, rows * ppc)
    }

    /// Reports whether changes are waiting for a flush.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Number of flushes performed so far.
    #[must_use]
    pub const fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Current frame counter.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Borrowed view over the whole texture.
    #[must_use]
    pub fn view(&self) -> TextureView<'_> {
        let (width, height) = self.texture_size();
        TextureView::new(width, height, &self.pixels)
    }

    /// Rewrites every cell from the grid, resizing the buffer when the grid
    /// dimensions changed. Flushes when allowed.
    pub fn render_full_map(&mut self, grid: &GridModel) -> Result<(), RenderingError> {
        if !grid.is_initialized() {
            log::warn!("skipping full map render: grid is not initialized");
            return Ok(());
        }
        let size = grid.dimensions();
        if size != self.grid_size {
            let texels = texel_count(size, self.settings.pixels_per_cell)?;
            log::debug!(
                "resizing texture from {:?} to {:?}",
                self.grid_size,
                size
            );
            self.grid_size = size;
            self.pixels = vec![Rgba8::from(self.colors.empty); texels];
        }
        for cell in grid.cells() {
            let color = self.resting_color(cell.position(), cell.cell_type());
            let _ = self.write_cell(cell.position(), color.into());
        }
        if let Some(player) = self.player {
            let _ = self.write_cell(player, self.colors.player.into());
        }
        self.dirty = true;
        self.apply_changes();
        Ok(())
    }

    /// Paints one cell. Cells outside the grid are ignored.
    pub fn update_cell(&mut self, cell: CellCoord, color: Color) {
        if self.write_cell(cell, color.into()) {
            self.dirty = true;
        }
    }

    /// Paints `cell` with the highlight color, or back to the resting color
    /// of `cell_type`.
    pub fn set_cell_highlight(&mut self, cell: CellCoord, cell_type: CellType, highlighted: bool) {
        let color = if highlighted {
            self.colors.highlight
        } else {
            self.resting_color(cell, cell_type)
        };
        self.update_cell(cell, color);
    }

    /// Pins `color` as the resting color of `cell` until cleared with
    /// `None`. Marked cells keep their color when the player or a highlight
    /// leaves them.
    pub fn set_marker(&mut self, grid: &GridModel, cell: CellCoord, color: Option<Color>) {
        match color {
            Some(color) => {
                let _ = self.markers.insert(cell, color);
            }
            None => {
                let _ = self.markers.remove(&cell);
            }
        }
        if self.player != Some(cell) {
            let resting = self.resting_color(cell, grid.cell_type(cell));
            self.update_cell(cell, resting);
        }
    }

    /// Moves the player marker, repainting the previous cell from the grid.
    pub fn set_player_cell(&mut self, grid: &GridModel, cell: Option<CellCoord>) {
        if self.player == cell {
            return;
        }
        if let Some(previous) = self.player.take() {
            let resting = self.resting_color(previous, grid.cell_type(previous));
            self.update_cell(previous, resting);
        }
        if let Some(cell) = cell {
            self.update_cell(cell, self.colors.player);
        }
        self.player = cell;
    }

    /// Uploads pending changes unless a flush already happened this frame.
    pub fn apply_changes(&mut self) {
        if !self.dirty || self.flushed_frame == Some(self.frame) {
            return;
        }
        let (width, height) = self.texture_size();
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.upload(TextureView::new(width, height, &self.pixels));
        }
        self.dirty = false;
        self.flushed_frame = Some(self.frame);
        self.flushes += 1;
    }

    /// Flushes pending changes when allowed and advances the frame counter.
    pub fn end_frame(&mut self) {
        self.apply_changes();
        self.frame += 1;
    }

    /// Texel at `(x, y)` of the texture.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        let (width, height) = self.texture_size();
        if x >= width || y >= height {
            return None;
        }
        self.pixels
            .get(y as usize * width as usize + x as usize)
            .copied()
    }

    /// First texel of the block painted for `cell`.
    #[must_use]
    pub fn cell_pixel(&self, cell: CellCoord) -> Option<Rgba8> {
        let (x, y) = self.texel_origin(cell)?;
        self.pixel(x, y)
    }

    /// Normalised texture coordinates of the centre of `cell`, in grid
    /// orientation.
    #[must_use]
    pub fn grid_to_uv(&self, cell: CellCoord) -> Vec2 {
        if self.grid_size.width() == 0 || self.grid_size.height() == 0 {
            return Vec2::ZERO;
        }
        Vec2::new(
            (cell.x() as f32 + 0.5) / self.grid_size.width() as f32,
            (cell.y() as f32 + 0.5) / self.grid_size.height() as f32,
        )
    }

    fn resting_color(&self, cell: CellCoord, cell_type: CellType) -> Color {
        self.markers
            .get(&cell)
            .copied()
            .unwrap_or_else(|| self.colors.color_for(cell_type))
    }

    fn oriented_dimensions(&self) -> (u32, u32) {
        let (width, height) = (self.grid_size.width(), self.grid_size.height());
        if self.settings.swap_xy {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Swap first, then flips against the swapped dimensions.
    fn texel_origin(&self, cell: CellCoord) -> Option<(u32, u32)> {
        if !minimap_core::convert::is_in_bounds(
            cell,
            self.grid_size.width(),
            self.grid_size.height(),
        ) {
            return None;
        }
        let (mut x, mut y) = (cell.x() as u32, cell.y() as u32);
        if self.settings.swap_xy {
            std::mem::swap(&mut x, &mut y);
        }
        let (columns, rows) = self.oriented_dimensions();
        if self.settings.flip_x {
            x = columns - 1 - x;
        }
        if self.settings.flip_y {
            y = rows - 1 - y;
        }
        let ppc = self.settings.pixels_per_cell;
        Some((x * ppc, y * ppc))
    }

    fn write_cell(&mut self, cell: CellCoord, texel: Rgba8) -> bool {
        let Some((x, y)) = self.texel_origin(cell) else {
            return false;
        };
        let width = self.texture_size().0 as usize;
        let ppc = self.settings.pixels_per_cell as usize;
        for row in y as usize..y as usize + ppc {
            let start = row * width + x as usize;
            if let Some(block) = self.pixels.get_mut(start..start + ppc) {
                block.fill(texel);
            }
        }
        true
    }
}

impl CellPainter for TextureRenderer {
    fn paint_cell(&mut self, cell: CellCoord, cell_type: CellType) {
        let color = self.colors.color_for(cell_type);
        self.update_cell(cell, color);
    }

    fn set_cell_highlight(&mut self, cell: CellCoord, cell_type: CellType, highlighted: bool) {
        TextureRenderer::set_cell_highlight(self, cell, cell_type, highlighted);
    }

    fn apply_changes(&mut self) {
        TextureRenderer::apply_changes(self);
    }
}

fn texel_count(size: CellRectSize, pixels_per_cell: u32) -> Result<usize, RenderingError> {
    let too_large = RenderingError::TextureTooLarge {
        width: size.width(),
        height: size.height(),
    };
    let ppc = u64::from(pixels_per_cell);
    size.area()
        .checked_mul(ppc * ppc)
        .and_then(|texels| usize::try_from(texels).ok())
        .ok_or(too_large)
}
