use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Result};
use serde::Deserialize;

/// Spacing of the sampling grid in surface pixels. Shapes are rasterized
/// off-screen and then sampled every `GRID_GAP` pixels in both axes.
pub const GRID_GAP: u32 = 13;
/// Upper bound for rectangle/circle arguments, in grid cells.
pub const MAX_SHAPE_SIZE: u32 = 30;
/// Largest text size the fitting search will consider, in pixels.
pub const MAX_FONT_PX: f32 = 500.0;
/// Palette for custom-grid cells; code 0 is empty, codes 1..=7 index here.
pub const GRID_PALETTE: [(u8, u8, u8); 7] = [
    (0xEF, 0x74, 0xAC), // pink
    (0xF9, 0xBC, 0x95), // light brown
    (0xFA, 0xB0, 0x01), // orange
    (0x00, 0x00, 0x00), // black
    (0x02, 0xA6, 0xE5), // blue
    (0x67, 0x3C, 0x90), // violet
    (0x87, 0xBC, 0x36), // green
];

pub const DEFAULT_SEQUENCE: &str = "|#countdown 3|*|Happy|Birthday|to you|<3|#customShape|";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    #[serde(default = "default_canvas")]
    pub canvas: Resolution,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_sequence")]
    pub sequence: String,
    #[serde(default)]
    pub custom_shape: CustomShape,
    /// Named image assets usable as `#image <name>` in the sequence.
    /// Paths are resolved relative to the scene file at load time.
    #[serde(default)]
    pub images: BTreeMap<String, PathBuf>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            canvas: default_canvas(),
            fps: default_fps(),
            seed: 0,
            sequence: default_sequence(),
            custom_shape: CustomShape::default(),
            images: BTreeMap::new(),
        }
    }
}

impl Scene {
    pub fn validate(&self) -> Result<()> {
        if self.canvas.width == 0 || self.canvas.height == 0 {
            bail!(
                "canvas must be positive, got {}x{}",
                self.canvas.width,
                self.canvas.height
            );
        }
        if self.canvas.width < GRID_GAP || self.canvas.height < GRID_GAP {
            bail!(
                "canvas must be at least {GRID_GAP}x{GRID_GAP} to hold one sampling cell, got {}x{}",
                self.canvas.width,
                self.canvas.height
            );
        }
        if self.fps == 0 {
            bail!("fps must be > 0");
        }
        self.custom_shape.validate()?;
        for name in self.images.keys() {
            if name.trim().is_empty() {
                bail!("image names cannot be empty");
            }
            if name.contains(char::is_whitespace) {
                bail!("image name '{name}' cannot contain whitespace");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// A bitmap described as rows of palette codes. Rows may be ragged; missing
/// trailing cells count as empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomShape {
    #[serde(default)]
    pub grid: Vec<Vec<u8>>,
}

impl CustomShape {
    pub fn validate(&self) -> Result<()> {
        for (row_index, row) in self.grid.iter().enumerate() {
            for (col_index, &code) in row.iter().enumerate() {
                if code as usize > GRID_PALETTE.len() {
                    bail!(
                        "custom_shape.grid[{row_index}][{col_index}] has code {code}; \
                         valid codes are 0..={}",
                        GRID_PALETTE.len()
                    );
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.grid.iter().all(|row| row.is_empty())
    }

    pub fn columns(&self) -> usize {
        self.grid.iter().map(Vec::len).max().unwrap_or(0)
    }
}

fn default_canvas() -> Resolution {
    Resolution {
        width: 1280,
        height: 720,
    }
}

fn default_fps() -> u32 {
    60
}

fn default_sequence() -> String {
    DEFAULT_SEQUENCE.to_owned()
}
