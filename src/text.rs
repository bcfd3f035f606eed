use anyhow::{anyhow, Result};
use fontdue::layout::{
    CoordinateSystem, HorizontalAlign, Layout, LayoutSettings, TextStyle, VerticalAlign, WrapStyle,
};
use fontdue::{Font, FontSettings};

use crate::glyph_atlas::PixelAtlas;
use crate::surface::SampleSurface;

/// Paints a single centered line of text onto a sample surface. The default
/// backend is the compiled-in pixel atlas; a TTF can be loaded instead when
/// nicer letterforms matter.
pub enum TextPainter {
    Atlas(PixelAtlas),
    Font(Box<Font>),
}

impl TextPainter {
    pub fn embedded() -> Self {
        Self::Atlas(PixelAtlas::new())
    }

    pub fn from_font_bytes(bytes: &[u8]) -> Result<Self> {
        let font = Font::from_bytes(bytes, FontSettings::default())
            .map_err(|message| anyhow!("failed to parse font: {message}"))?;
        Ok(Self::Font(Box::new(font)))
    }

    /// Advance width of `text` at `size_px`, in pixels.
    pub fn measure(&self, text: &str, size_px: f32) -> f32 {
        match self {
            Self::Atlas(atlas) => {
                let count = text.chars().count() as f32;
                if count == 0.0 {
                    return 0.0;
                }
                let scale = size_px / atlas.glyph_height() as f32;
                // Glyph cells plus one-column gaps between them.
                (count * (atlas.glyph_width() + 1) as f32 - 1.0) * scale
            }
            Self::Font(font) => text
                .chars()
                .map(|ch| font.metrics(ch, size_px).advance_width)
                .sum(),
        }
    }

    /// Draws `text` centered at (`cx`, `cy`), middle baseline.
    pub fn fill_text(
        &self,
        surface: &mut SampleSurface,
        text: &str,
        cx: f32,
        cy: f32,
        size_px: f32,
        rgb: (u8, u8, u8),
    ) {
        if text.is_empty() || size_px <= 0.0 {
            return;
        }
        match self {
            Self::Atlas(atlas) => {
                let scale = size_px / atlas.glyph_height() as f32;
                let total_width = self.measure(text, size_px);
                let mut pen_x = cx - total_width / 2.0;
                let top = cy - size_px / 2.0;
                for ch in text.chars() {
                    for gy in 0..atlas.glyph_height() {
                        for gx in 0..atlas.glyph_width() {
                            if atlas.sample(ch, gx, gy) {
                                surface.fill_rect(
                                    pen_x + gx as f32 * scale,
                                    top + gy as f32 * scale,
                                    scale,
                                    scale,
                                    rgb,
                                );
                            }
                        }
                    }
                    pen_x += (atlas.glyph_width() + 1) as f32 * scale;
                }
            }
            Self::Font(font) => {
                let total_width = self.measure(text, size_px);
                let mut layout = Layout::new(CoordinateSystem::PositiveYDown);
                layout.reset(&LayoutSettings {
                    x: cx - total_width / 2.0,
                    y: cy - size_px / 2.0,
                    max_width: None,
                    max_height: None,
                    horizontal_align: HorizontalAlign::Left,
                    vertical_align: VerticalAlign::Top,
                    line_height: 1.0,
                    wrap_style: WrapStyle::Letter,
                    wrap_hard_breaks: false,
                });
                layout.append(&[font.as_ref()], &TextStyle::new(text, size_px, 0));

                for glyph in layout.glyphs() {
                    if glyph.width == 0 || glyph.height == 0 {
                        continue;
                    }
                    let (_, coverage) = font.rasterize_config(glyph.key);
                    let origin_x = glyph.x.round() as i64;
                    let origin_y = glyph.y.round() as i64;
                    for row in 0..glyph.height {
                        for col in 0..glyph.width {
                            // Thresholded coverage keeps sampling binary like
                            // the atlas path.
                            if coverage[row * glyph.width + col] < 128 {
                                continue;
                            }
                            let px = origin_x + col as i64;
                            let py = origin_y + row as i64;
                            if px >= 0 && py >= 0 {
                                surface.set_pixel(px as u32, py as u32, rgb);
                            }
                        }
                    }
                }
            }
        }
    }
}
