use anyhow::Result;
use image::RgbaImage;

use crate::schema::{GRID_GAP, GRID_PALETTE, MAX_FONT_PX, MAX_SHAPE_SIZE};
use crate::surface::SampleSurface;
use crate::text::TextPainter;

const SHAPE_RGB: (u8, u8, u8) = (255, 0, 0);
const DEFAULT_POINT_RGB: (u8, u8, u8) = (255, 255, 255);

/// One sampled grid point of a rasterized shape, in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CloudPoint {
    pub x: f32,
    pub y: f32,
    pub rgb: (u8, u8, u8),
}

/// A rasterized shape reduced to grid points. `width` and `height` are the
/// sum of the minimum and maximum occupied coordinate on each axis, which is
/// what the centering compensation expects.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCloud {
    pub points: Vec<CloudPoint>,
    pub width: f32,
    pub height: f32,
}

/// Turns shape descriptions into point clouds by drawing them on an
/// offscreen surface and sampling it on the grid.
pub struct ShapeRasterizer {
    surface: SampleSurface,
    painter: TextPainter,
}

impl ShapeRasterizer {
    pub fn new(width: u32, height: u32, painter: TextPainter) -> Result<Self> {
        Ok(Self {
            surface: SampleSurface::new(width, height)?,
            painter,
        })
    }

    pub fn surface_width(&self) -> u32 {
        self.surface.width()
    }

    pub fn surface_height(&self) -> u32 {
        self.surface.height()
    }

    /// Draws `text` centered and as large as fits, then samples it. Numeric
    /// strings are allowed to fill the full height; words get a smaller
    /// fraction so multi-letter lines stay inside the surface.
    pub fn render_text(&mut self, text: &str) -> TargetCloud {
        let width = self.surface.width() as f32;
        let height = self.surface.height() as f32;

        let measured = self.painter.measure(text, MAX_FONT_PX);
        let height_fraction = if is_numeric(text) { 1.0 } else { 0.45 };
        let mut size = (height / MAX_FONT_PX) * height_fraction * MAX_FONT_PX;
        if measured > 0.0 {
            size = size.min((width / measured) * 0.8 * MAX_FONT_PX);
        }
        size = size.min(MAX_FONT_PX);

        self.surface.clear();
        self.painter
            .fill_text(&mut self.surface, text, width / 2.0, height / 2.0, size, SHAPE_RGB);
        self.sample_surface()
    }

    /// Builds a `w` x `h` grid of cells directly, one point per cell. No
    /// surface pass is needed since every cell is occupied.
    pub fn render_rectangle(&self, w: u32, h: u32) -> TargetCloud {
        let w = w.clamp(1, MAX_SHAPE_SIZE);
        let h = h.clamp(1, MAX_SHAPE_SIZE);
        let gap = GRID_GAP as f32;
        let mut points = Vec::with_capacity((w * h) as usize);
        for row in 0..h {
            for col in 0..w {
                points.push(CloudPoint {
                    x: col as f32 * gap,
                    y: row as f32 * gap,
                    rgb: DEFAULT_POINT_RGB,
                });
            }
        }
        TargetCloud {
            points,
            width: w as f32 * gap,
            height: h as f32 * gap,
        }
    }

    /// Draws a disc of `diameter` grid cells anchored at the top-left corner
    /// of the surface, then samples it.
    pub fn render_circle(&mut self, diameter: u32) -> TargetCloud {
        let diameter = diameter.clamp(1, MAX_SHAPE_SIZE);
        let radius = diameter as f32 / 2.0 * GRID_GAP as f32;
        self.surface.clear();
        self.surface.fill_circle(radius, radius, radius, SHAPE_RGB);
        self.sample_surface()
    }

    /// Paints a colored cell grid centered on the surface and samples it.
    /// Zero cells stay empty; an empty grid yields an empty cloud.
    pub fn render_custom_grid(&mut self, grid: &[Vec<u8>]) -> TargetCloud {
        self.surface.clear();
        let rows = grid.len();
        if rows == 0 {
            return self.sample_surface();
        }
        // Centering keys off the first row, like the rest of the layout;
        // an empty first row centers at the midpoint while later rows
        // still paint their own cells.
        let columns = grid.first().map_or(0, |row| row.len());

        let cell = GRID_GAP as f32;
        let start_x = (self.surface.width() as f32 - columns as f32 * cell) / 2.0;
        let start_y = (self.surface.height() as f32 - rows as f32 * cell) / 2.0;

        for (row_index, row) in grid.iter().enumerate() {
            for (col_index, &code) in row.iter().enumerate() {
                if code == 0 {
                    continue;
                }
                let Some(&rgb) = GRID_PALETTE.get((code - 1) as usize) else {
                    continue;
                };
                self.surface.fill_rect(
                    start_x + col_index as f32 * cell,
                    start_y + row_index as f32 * cell,
                    cell,
                    cell,
                    rgb,
                );
            }
        }
        self.sample_surface()
    }

    /// Scales a decoded image to fit the surface, centers it, and samples
    /// the opaque pixels. Nearest-neighbor keeps hard color edges intact.
    pub fn render_image(&mut self, image: &RgbaImage) -> TargetCloud {
        self.surface.clear();
        let (src_w, src_h) = image.dimensions();
        if src_w == 0 || src_h == 0 {
            return self.sample_surface();
        }

        let dst_w = self.surface.width();
        let dst_h = self.surface.height();
        let scale = (dst_w as f32 / src_w as f32).min(dst_h as f32 / src_h as f32);
        let out_w = ((src_w as f32 * scale).round() as u32).max(1);
        let out_h = ((src_h as f32 * scale).round() as u32).max(1);
        let offset_x = (dst_w - out_w.min(dst_w)) / 2;
        let offset_y = (dst_h - out_h.min(dst_h)) / 2;

        for dy in 0..out_h.min(dst_h) {
            let sy = ((dy as f32 + 0.5) / scale) as u32;
            let sy = sy.min(src_h - 1);
            for dx in 0..out_w.min(dst_w) {
                let sx = ((dx as f32 + 0.5) / scale) as u32;
                let sx = sx.min(src_w - 1);
                let pixel = image.get_pixel(sx, sy);
                if pixel.0[3] == 0 {
                    continue;
                }
                self.surface
                    .set_pixel(offset_x + dx, offset_y + dy, (pixel.0[0], pixel.0[1], pixel.0[2]));
            }
        }
        self.sample_surface()
    }

    /// Rasterizes nothing; the resulting cloud releases every dot.
    pub fn render_blank(&mut self) -> TargetCloud {
        self.surface.clear();
        self.sample_surface()
    }

    /// Walks the surface at grid intervals and keeps every sample with a
    /// nonzero alpha. Extents are min+max so a centered shape reports the
    /// surface size and an anchored shape reports its own size.
    fn sample_surface(&self) -> TargetCloud {
        let surface_w = self.surface.width() as f32;
        let surface_h = self.surface.height() as f32;

        let mut points = Vec::new();
        let mut min_x = surface_w;
        let mut min_y = surface_h;
        let mut max_x = 0.0f32;
        let mut max_y = 0.0f32;

        let mut y = 0;
        while y < self.surface.height() {
            let mut x = 0;
            while x < self.surface.width() {
                if let Some((r, g, b, a)) = self.surface.pixel(x, y) {
                    if a > 0 {
                        let fx = x as f32;
                        let fy = y as f32;
                        points.push(CloudPoint {
                            x: fx,
                            y: fy,
                            rgb: (r, g, b),
                        });
                        min_x = min_x.min(fx);
                        min_y = min_y.min(fy);
                        max_x = max_x.max(fx);
                        max_y = max_y.max(fy);
                    }
                }
                x += GRID_GAP;
            }
            y += GRID_GAP;
        }

        TargetCloud {
            width: max_x + min_x,
            height: max_y + min_y,
            points,
        }
    }
}

fn is_numeric(text: &str) -> bool {
    !text.is_empty() && text.trim().parse::<f64>().map_or(false, f64::is_finite)
}
