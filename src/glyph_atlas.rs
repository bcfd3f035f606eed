use crate::glyph_atlas_data::{
    GlyphRows, ASCII_END, ASCII_START, FALLBACK_GLYPH, GLYPH_COUNT, GLYPH_HEIGHT, GLYPH_WIDTH,
    PIXEL_GLYPHS,
};

/// Compiled-in 5x7 pixel font covering printable ASCII. Characters outside
/// the range render as a solid block so missing glyphs stay visible.
#[derive(Debug, Clone)]
pub struct PixelAtlas {
    glyphs: &'static [GlyphRows; GLYPH_COUNT],
}

impl PixelAtlas {
    pub fn new() -> Self {
        Self {
            glyphs: &PIXEL_GLYPHS,
        }
    }

    pub fn glyph_width(&self) -> u32 {
        GLYPH_WIDTH
    }

    pub fn glyph_height(&self) -> u32 {
        GLYPH_HEIGHT
    }

    fn rows_for(&self, character: char) -> &'static GlyphRows {
        if character.is_ascii() {
            let byte = character as u8;
            if (ASCII_START..=ASCII_END).contains(&byte) {
                return &self.glyphs[(byte - ASCII_START) as usize];
            }
        }
        &FALLBACK_GLYPH
    }

    pub fn sample(&self, character: char, x: u32, y: u32) -> bool {
        if x >= GLYPH_WIDTH || y >= GLYPH_HEIGHT {
            return false;
        }
        let row_mask = self.rows_for(character)[y as usize];
        ((row_mask >> (GLYPH_WIDTH - 1 - x)) & 1) == 1
    }
}

impl Default for PixelAtlas {
    fn default() -> Self {
        Self::new()
    }
}
