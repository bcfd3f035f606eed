use anyhow::{anyhow, Result};
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PremultipliedColorU8, Rect, Transform,
};

use crate::schema::GRID_GAP;

/// Offscreen raster that shapes are drawn onto before grid sampling.
/// Dimensions are floored to multiples of the sampling gap so every sampled
/// row starts at a full grid cell.
pub struct SampleSurface {
    pixmap: Pixmap,
}

impl SampleSurface {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let width = floor_to_gap(width);
        let height = floor_to_gap(height);
        let pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("invalid sample surface size {}x{}", width, height))?;
        Ok(Self { pixmap })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, rgb: (u8, u8, u8)) {
        let Some(rect) = Rect::from_xywh(x, y, w, h) else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(rgb.0, rgb.1, rgb.2, 255);
        paint.anti_alias = false;
        self.pixmap
            .fill_rect(rect, &paint, Transform::identity(), None);
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, radius: f32, rgb: (u8, u8, u8)) {
        if radius <= 0.0 {
            return;
        }
        let mut builder = PathBuilder::new();
        builder.push_circle(cx, cy, radius);
        let Some(path) = builder.finish() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(rgb.0, rgb.1, rgb.2, 255);
        paint.anti_alias = false;
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    /// Overwrites one pixel with an opaque color. Out-of-bounds writes are
    /// dropped silently.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: (u8, u8, u8)) {
        if x >= self.pixmap.width() || y >= self.pixmap.height() {
            return;
        }
        let index = (y * self.pixmap.width() + x) as usize;
        if let Some(color) = PremultipliedColorU8::from_rgba(rgb.0, rgb.1, rgb.2, 255) {
            self.pixmap.pixels_mut()[index] = color;
        }
    }

    /// Demultiplied RGBA at a pixel, or None when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<(u8, u8, u8, u8)> {
        if x >= self.pixmap.width() || y >= self.pixmap.height() {
            return None;
        }
        let index = (y * self.pixmap.width() + x) as usize;
        let premultiplied = self.pixmap.pixels()[index];
        let color = premultiplied.demultiply();
        Some((color.red(), color.green(), color.blue(), color.alpha()))
    }
}

fn floor_to_gap(value: u32) -> u32 {
    let floored = value - value % GRID_GAP;
    floored.max(GRID_GAP)
}
