pub mod dots;
pub mod engine;
pub mod glyph_atlas;
mod glyph_atlas_data;
pub mod rng;
pub mod scene;
pub mod schema;
pub mod sequencer;
pub mod shapes;
pub mod surface;
pub mod text;
pub mod transition;
