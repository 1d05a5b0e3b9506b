//! Window-sized image composed from a viewport snapshot.

use minimap_core::{CellCoord, CellType, ViewportSnapshot};

use crate::{ColorConfig, Rgba8, TextureView};

/// Owned row-major image, row zero at the top.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelImage {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
}

impl PixelImage {
    /// Texel at `(x, y)`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Borrowed view, for sinks and PPM export.
    #[must_use]
    pub fn view(&self) -> TextureView<'_> {
        TextureView::new(self.width, self.height, &self.pixels)
    }
}

/// Draws one texel per window cell: resting colors, the masked overlay over
/// `hidden` window positions, and the player marker on top.
#[must_use]
pub fn compose_viewport(
    snapshot: &ViewportSnapshot,
    hidden: &[CellCoord],
    colors: &ColorConfig,
) -> PixelImage {
    let (width, height) = (snapshot.width(), snapshot.height());
    let mut pixels = Vec::with_capacity(snapshot.cell_types().len());
    for row in 0..height as i32 {
        for column in 0..width as i32 {
            let view = CellCoord::new(column, row);
            let resting = colors.color_for(snapshot.cell_type(view));
            let color = if snapshot.agent_window_position() == Some(view) {
                colors.player
            } else if hidden.contains(&view) {
                colors.masked.over(colors.color_for(CellType::Wall))
            } else {
                resting
            };
            pixels.push(Rgba8::from(color));
        }
    }
    PixelImage {
        width,
        height,
        pixels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use minimap_core::{CellRect, CellRectSize};

    #[test]
    fn composes_markers_over_resting_colors() {
        let bounds = CellRect::from_origin_and_size(CellCoord::new(0, 0), CellRectSize::new(2, 2));
        let snapshot = ViewportSnapshot::new(
            bounds,
            vec![CellType::Wall, CellType::Floor, CellType::Wall, CellType::Floor],
            Some(CellCoord::new(1, 1)),
            CellType::Floor,
        );
        let colors = ColorConfig {
            masked: Color::new(0.0, 0.0, 1.0, 1.0),
            ..ColorConfig::default()
        };

        let image = compose_viewport(&snapshot, &[CellCoord::new(0, 1)], &colors);

        assert_eq!(image.pixel(0, 0), Some(Rgba8::new(255, 255, 255, 255)));
        assert_eq!(image.pixel(1, 0), Some(Rgba8::new(0, 0, 0, 255)));
        assert_eq!(image.pixel(0, 1), Some(Rgba8::new(0, 0, 255, 255)));
        assert_eq!(image.pixel(1, 1), Some(Rgba8::from(Color::RED)));
        assert_eq!(image.view().pixels().len(), 4);
    }
}
